//! OCR: recognise text in rasterised pages.
//!
//! The default engine shells out to the `tesseract` command-line tool. The
//! command and language are plain configuration values handed to
//! [`TesseractCli::new`], so several pipelines in one process can point at
//! different installations.
//!
//! ## Why a subprocess?
//!
//! Linking libtesseract makes every build depend on the C library and its
//! headers. The CLI is the same engine, is what most hosts already have
//! installed, and a missing binary becomes a clean runtime
//! [`OcrError::Unavailable`] instead of a build failure.

use crate::error::OcrError;
use crate::pipeline::encode::encode_png;
use image::DynamicImage;
use std::io::{ErrorKind, Write};
use std::process::Command;
use tracing::debug;

/// Recognises text in a single page image. Blocking.
pub trait OcrEngine: Send + Sync {
    /// `Err(OcrError::Unavailable)` when the engine cannot run at all.
    fn check_available(&self) -> Result<(), OcrError>;

    /// Recognise one page.
    ///
    /// # Arguments
    /// * `page_num` — 1-indexed, used for error reporting
    fn recognize(&self, page_num: usize, image: &DynamicImage) -> Result<String, OcrError>;
}

/// [`OcrEngine`] backed by the `tesseract` CLI.
#[derive(Debug, Clone)]
pub struct TesseractCli {
    command: String,
    language: String,
}

impl TesseractCli {
    pub fn new(command: impl Into<String>, language: impl Into<String>) -> Self {
        Self {
            command: command.into(),
            language: language.into(),
        }
    }

    fn spawn_error(&self, e: std::io::Error) -> OcrError {
        if e.kind() == ErrorKind::NotFound {
            OcrError::Unavailable(format!("'{}' was not found on this system", self.command))
        } else {
            OcrError::Unavailable(format!("'{}' could not be started: {e}", self.command))
        }
    }
}

impl Default for TesseractCli {
    fn default() -> Self {
        Self::new("tesseract", "eng")
    }
}

impl OcrEngine for TesseractCli {
    fn check_available(&self) -> Result<(), OcrError> {
        let output = Command::new(&self.command)
            .arg("--version")
            .output()
            .map_err(|e| self.spawn_error(e))?;
        if !output.status.success() {
            return Err(OcrError::Unavailable(format!(
                "'{} --version' exited with {}",
                self.command, output.status
            )));
        }
        let version = String::from_utf8_lossy(&output.stdout);
        debug!(
            "OCR engine: {}",
            version.lines().next().unwrap_or("tesseract")
        );
        Ok(())
    }

    fn recognize(&self, page_num: usize, image: &DynamicImage) -> Result<String, OcrError> {
        let png = encode_png(image).map_err(|e| OcrError::PageFailed {
            page: page_num,
            detail: format!("PNG encoding failed: {e}"),
        })?;

        // tesseract reads from a path; the temp file is removed on drop.
        let mut file = tempfile::Builder::new()
            .prefix("pdfq-page-")
            .suffix(".png")
            .tempfile()
            .map_err(|e| OcrError::PageFailed {
                page: page_num,
                detail: format!("temp file: {e}"),
            })?;
        file.write_all(&png)
            .and_then(|_| file.flush())
            .map_err(|e| OcrError::PageFailed {
                page: page_num,
                detail: format!("temp file: {e}"),
            })?;

        let output = Command::new(&self.command)
            .arg(file.path())
            .arg("stdout")
            .arg("-l")
            .arg(&self.language)
            .output()
            .map_err(|e| self.spawn_error(e))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(OcrError::PageFailed {
                page: page_num,
                detail: format!("{} ({})", stderr.trim(), output.status),
            });
        }

        let text = String::from_utf8_lossy(&output.stdout).into_owned();
        debug!("Page {}: OCR produced {} chars", page_num, text.len());
        Ok(text)
    }
}
