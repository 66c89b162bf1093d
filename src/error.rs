//! Error types for the pdf-question-extractor library.
//!
//! Errors are split by how far they are allowed to travel:
//!
//! * [`PipelineError`]: **Fatal**. The document cannot be processed at all
//!   (missing file, not a PDF, pdfium unavailable, bad configuration).
//!   Returned as `Err(PipelineError)` from the lower-level entry points and
//!   folded into a failed [`crate::output::PipelineResult`] by the orchestrator.
//!
//! * [`PipelineFailure`]: the reason a run ended with `success = false`.
//!   Its `Display` text is exactly what callers see in the `error` field.
//!
//! * [`OcrError`], [`StructureError`], [`BatchError`]: **Non-fatal**. A
//!   single page, LLM call or upload batch went wrong. These are logged and
//!   absorbed where they occur; they never abort the request on their own.

use std::path::PathBuf;
use thiserror::Error;

/// All fatal errors returned by the pdf-question-extractor library.
#[derive(Debug, Error)]
pub enum PipelineError {
    // ── Input errors ──────────────────────────────────────────────────────
    /// Input file was not found at the given path.
    #[error("PDF file not found: '{path}'")]
    FileNotFound { path: PathBuf },

    /// Process does not have read permission on the file.
    #[error("Permission denied reading '{path}'")]
    PermissionDenied { path: PathBuf },

    /// The file exists and was read, but is not a PDF.
    #[error("File is not a valid PDF: '{path}' (first bytes: {magic:?})")]
    NotAPdf { path: PathBuf, magic: Vec<u8> },

    /// The uploaded bytes could not be written to the staging directory.
    #[error("Failed to stage upload in '{dir}': {source}")]
    StagingFailed {
        dir: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // ── PDF errors ────────────────────────────────────────────────────────
    /// PDF header/trailer/xref is corrupt and cannot be parsed.
    #[error("PDF '{path}' is corrupt: {detail}")]
    CorruptPdf { path: PathBuf, detail: String },

    /// PDF requires a password; uploads never carry one.
    #[error("PDF '{path}' is encrypted and requires a password")]
    PasswordRequired { path: PathBuf },

    // ── Config errors ─────────────────────────────────────────────────────
    /// Builder validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// An HTTP client could not be constructed (TLS backend, bad timeout).
    #[error("Failed to build HTTP client: {0}")]
    HttpClient(String),

    // ── Pdfium binding errors ─────────────────────────────────────────────
    /// Could not bind to a pdfium library.
    #[error(
        "Failed to bind to pdfium library: {0}\n\
Set PDFIUM_LIB_PATH=/path/to/libpdfium or install pdfium system-wide."
    )]
    PdfiumBindingFailed(String),

    // ── Catch-all ─────────────────────────────────────────────────────────
    /// Unexpected internal error (e.g. a blocking task panicked).
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Why a pipeline run finished with `success = false`.
///
/// The display strings are part of the HTTP contract: the upload form shows
/// them verbatim.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PipelineFailure {
    /// Neither the text layer nor OCR produced any non-whitespace text.
    #[error("No text found in PDF")]
    NoTextExtracted,

    /// The text layer was empty and the OCR engine cannot run.
    #[error("OCR is not available: {reason}")]
    OcrUnavailable { reason: String },

    /// The text layer was empty and OCR failed on every page.
    #[error("OCR failed: {reason}")]
    OcrFailed { reason: String },

    /// The structurer returned no usable questions.
    #[error("No questions found in text")]
    NoQuestionsFound,

    /// Every upload batch was rejected or failed in transit.
    #[error("Failed to upload to Airtable")]
    UploadTotalFailed,

    /// A fatal [`PipelineError`], already rendered.
    #[error("{0}")]
    Fatal(String),
}

impl From<PipelineError> for PipelineFailure {
    fn from(e: PipelineError) -> Self {
        PipelineFailure::Fatal(e.to_string())
    }
}

/// A non-fatal OCR error.
#[derive(Debug, Clone, Error)]
pub enum OcrError {
    /// The OCR engine binary is missing or refuses to start.
    #[error("{0}")]
    Unavailable(String),

    /// OCR ran but failed on one page.
    #[error("Page {page}: {detail}")]
    PageFailed { page: usize, detail: String },

    /// A page could not be rasterised for OCR.
    #[error("Rasterisation failed: {0}")]
    Render(String),
}

/// Failure to turn extracted text into questions.
///
/// Always swallowed by [`crate::pipeline::structure::QuestionStructurer`],
/// which logs it and reports an empty question list instead.
#[derive(Debug, Error)]
pub enum StructureError {
    /// The chat-completion request never got a response.
    #[error("LLM request failed: {0}")]
    Request(String),

    /// The API answered with a non-success status.
    #[error("LLM API returned HTTP {status}: {body}")]
    Api { status: u16, body: String },

    /// The response carried no message content.
    #[error("LLM response contained no choices")]
    EmptyResponse,

    /// The content was not a JSON array of question objects.
    #[error("Could not parse questions from LLM response: {0}")]
    Parse(String),
}

/// A single upload batch that did not make it into Airtable.
#[derive(Debug, Clone, Error)]
pub enum BatchError {
    /// The request never reached the API or the response was unreadable.
    #[error("Batch {batch}: request failed: {detail}")]
    Transport { batch: usize, detail: String },

    /// The API rejected the batch.
    #[error("Batch {batch}: Airtable returned HTTP {status}: {body}")]
    Rejected {
        batch: usize,
        status: u16,
        body: String,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn failure_strings_are_stable() {
        assert_eq!(PipelineFailure::NoTextExtracted.to_string(), "No text found in PDF");
        assert_eq!(
            PipelineFailure::NoQuestionsFound.to_string(),
            "No questions found in text"
        );
        assert_eq!(
            PipelineFailure::UploadTotalFailed.to_string(),
            "Failed to upload to Airtable"
        );
    }

    #[test]
    fn ocr_failures_name_the_reason() {
        let unavailable = PipelineFailure::OcrUnavailable {
            reason: "tesseract not found".into(),
        };
        assert_eq!(unavailable.to_string(), "OCR is not available: tesseract not found");

        let failed = PipelineFailure::OcrFailed {
            reason: "Page 1: bad image".into(),
        };
        assert_eq!(failed.to_string(), "OCR failed: Page 1: bad image");
    }

    #[test]
    fn fatal_error_converts_to_failure() {
        let e = PipelineError::FileNotFound {
            path: PathBuf::from("/tmp/missing.pdf"),
        };
        let failure: PipelineFailure = e.into();
        assert!(failure.to_string().contains("missing.pdf"), "got: {failure}");
    }

    #[test]
    fn batch_error_display() {
        let e = BatchError::Rejected {
            batch: 2,
            status: 422,
            body: "INVALID_VALUE".into(),
        };
        let msg = e.to_string();
        assert!(msg.contains("Batch 2"));
        assert!(msg.contains("422"));
    }

    #[test]
    fn structure_error_display() {
        let e = StructureError::Api {
            status: 401,
            body: "unauthorized".into(),
        };
        assert!(e.to_string().contains("401"));
        assert!(StructureError::EmptyResponse.to_string().contains("no choices"));
    }
}
