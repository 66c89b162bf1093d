//! Pipeline orchestration: validate → extract → structure → upload.
//!
//! ```text
//! Validating ──▶ Extracting ──▶ empty? ──yes──▶ "No text found in PDF"
//!                                  │no
//!                                  ▼
//!                    [Structuring] ──▶ none? ──yes──▶ "No questions found in text"
//!                                  │
//!                                  ▼
//!                            Uploading ──▶ 0 stored? ──yes──▶ "Failed to upload to Airtable"
//!                                  │
//!                                  ▼
//!                               Success
//! ```
//!
//! Every outcome, including fatal input errors, ends up as a
//! [`PipelineResult`]; `process` never returns `Err` and never panics on bad
//! input. The only `Err` surfaced anywhere is from [`QuestionPipeline::new`]
//! (bad configuration) and [`QuestionPipeline::process_bytes`] (the upload
//! could not be written to disk).

use crate::config::{AirtableCredentials, PipelineConfig, StructuringMode};
use crate::error::{PipelineError, PipelineFailure};
use crate::output::{Extraction, PipelineResult};
use crate::pipeline::extract::TextExtractor;
use crate::pipeline::input::{stage_upload, validate_pdf};
use crate::pipeline::structure::QuestionStructurer;
use crate::pipeline::upload::AirtableUploader;
use crate::progress::{NoopProgressCallback, ProgressCallback, Stage};
use std::path::Path;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};

/// Characters of extracted text echoed at debug level.
const TEXT_SAMPLE_CHARS: usize = 1000;

/// A configured extraction pipeline. Cheap to share behind an `Arc`; holds
/// no per-request state.
pub struct QuestionPipeline {
    config: PipelineConfig,
    extractor: TextExtractor,
    structurer: Option<QuestionStructurer>,
    progress: ProgressCallback,
}

impl QuestionPipeline {
    /// Build the pipeline's clients from `config`.
    ///
    /// # Errors
    /// [`PipelineError::InvalidConfig`] or [`PipelineError::HttpClient`] when
    /// the LLM client cannot be constructed.
    pub fn new(config: PipelineConfig) -> Result<Self, PipelineError> {
        let extractor = TextExtractor::from_config(&config);
        let structurer = match config.mode {
            StructuringMode::Questions => Some(QuestionStructurer::from_config(&config)?),
            StructuringMode::RawText => None,
        };
        let progress = config
            .progress_callback
            .clone()
            .unwrap_or_else(|| Arc::new(NoopProgressCallback));

        Ok(Self {
            config,
            extractor,
            structurer,
            progress,
        })
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Run the full pipeline on a PDF already on disk.
    pub async fn process(&self, path: &Path, credentials: &AirtableCredentials) -> PipelineResult {
        let start = Instant::now();
        let result = match self.run(path, credentials).await {
            Ok(result) => {
                info!(
                    "{} ({}ms)",
                    result.message,
                    start.elapsed().as_millis()
                );
                result
            }
            Err(failure) => {
                warn!("Processing '{}' failed: {}", path.display(), failure);
                PipelineResult::failure(failure)
            }
        };
        self.progress.on_pipeline_complete(&result);
        result
    }

    /// Stage `bytes` under `upload_dir`, process them, and remove the staged
    /// file again, whatever the outcome.
    ///
    /// # Errors
    /// [`PipelineError::StagingFailed`] if the bytes could not be written.
    pub async fn process_bytes(
        &self,
        bytes: &[u8],
        file_name: &str,
        credentials: &AirtableCredentials,
        upload_dir: &Path,
    ) -> Result<PipelineResult, PipelineError> {
        let staged = stage_upload(bytes, file_name, upload_dir)?;
        info!(
            "Received '{}' ({} bytes)",
            staged.original_name(),
            bytes.len()
        );
        let result = self.process(staged.path(), credentials).await;
        drop(staged);
        Ok(result)
    }

    async fn run(
        &self,
        path: &Path,
        credentials: &AirtableCredentials,
    ) -> Result<PipelineResult, PipelineFailure> {
        info!("Processing PDF: {}", path.display());
        validate_pdf(path)?;

        // ── Step 1: Extract text ─────────────────────────────────────────
        self.progress.on_stage_start(Stage::Extracting);
        let extraction = self.extractor.extract(path).await?;
        let kind = extraction.kind();
        let text = match extraction {
            Extraction::NativeText(text) | Extraction::OcrText(text) => text,
            Extraction::OcrUnavailable { reason } => {
                return Err(PipelineFailure::OcrUnavailable { reason })
            }
            Extraction::OcrFailed { reason } => return Err(PipelineFailure::OcrFailed { reason }),
        };

        if text.trim().is_empty() {
            return Err(PipelineFailure::NoTextExtracted);
        }

        let char_count = text.chars().count();
        info!("Extracted {} characters ({:?})", char_count, kind);
        debug!(
            "Text sample: {}",
            text.chars().take(TEXT_SAMPLE_CHARS).collect::<String>()
        );
        self.progress
            .on_stage_complete(Stage::Extracting, &format!("{char_count} chars"));

        // Built before any network call so a bad base URL fails fast.
        let uploader = AirtableUploader::from_config(&self.config, credentials)?;

        // ── Step 2: Structure (questions mode only) ──────────────────────
        let Some(structurer) = &self.structurer else {
            return self.upload_raw_text(&uploader, &text).await;
        };

        self.progress.on_stage_start(Stage::Structuring);
        let questions = structurer.structure(&text).await;
        if questions.is_empty() {
            return Err(PipelineFailure::NoQuestionsFound);
        }
        self.progress.on_stage_complete(
            Stage::Structuring,
            &format!("{} questions", questions.len()),
        );

        // ── Step 3: Upload ───────────────────────────────────────────────
        self.progress.on_stage_start(Stage::Uploading);
        let summary = uploader.upload_questions(&questions).await;
        if summary.uploaded == 0 {
            return Err(PipelineFailure::UploadTotalFailed);
        }
        if summary.uploaded < questions.len() {
            warn!(
                "Only {} of {} questions were stored",
                summary.uploaded,
                questions.len()
            );
        }
        self.progress.on_stage_complete(
            Stage::Uploading,
            &format!("{} records", summary.uploaded),
        );

        Ok(PipelineResult::success(
            format!(
                "Successfully uploaded {} questions to Airtable",
                summary.uploaded
            ),
            summary.uploaded,
        ))
    }

    async fn upload_raw_text(
        &self,
        uploader: &AirtableUploader,
        text: &str,
    ) -> Result<PipelineResult, PipelineFailure> {
        self.progress.on_stage_start(Stage::Uploading);
        let summary = uploader.upload_raw_text(text).await;
        if summary.uploaded == 0 {
            return Err(PipelineFailure::UploadTotalFailed);
        }
        self.progress
            .on_stage_complete(Stage::Uploading, "1 record");
        Ok(PipelineResult::success(
            "Successfully uploaded extracted text to Airtable",
            summary.uploaded,
        ))
    }
}

impl std::fmt::Debug for QuestionPipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("QuestionPipeline")
            .field("config", &self.config)
            .field("structurer", &self.structurer)
            .finish_non_exhaustive()
    }
}

/// Process a single PDF with a one-off pipeline.
///
/// Configuration errors are reported as a failed result rather than `Err`,
/// matching [`QuestionPipeline::process`].
///
/// # Example
///
/// ```rust,no_run
/// use pdf_question_extractor::{process_pdf, AirtableCredentials, PipelineConfig};
///
/// # async fn run() -> Result<(), Box<dyn std::error::Error>> {
/// let config = PipelineConfig::builder().llm_api_key("sk-...").build()?;
/// let creds = AirtableCredentials::new("pat...", "app...");
/// let result = process_pdf("exam.pdf", config, &creds).await;
/// println!("{}", if result.success { &result.message } else { &result.error });
/// # Ok(())
/// # }
/// ```
pub async fn process_pdf(
    path: impl AsRef<Path>,
    config: PipelineConfig,
    credentials: &AirtableCredentials,
) -> PipelineResult {
    match QuestionPipeline::new(config) {
        Ok(pipeline) => pipeline.process(path.as_ref(), credentials).await,
        Err(e) => PipelineResult::failure(PipelineFailure::from(e)),
    }
}
