//! Text extraction: native text layer first, OCR only when it is empty.
//!
//! ```text
//! page_texts ──▶ non-empty? ──yes──▶ NativeText
//!                    │no
//!                    ▼
//!           OCR available? ──no──▶ OcrUnavailable
//!                    │yes
//!                    ▼
//!        render_pages ──▶ recognise each page once ──▶ OcrText | OcrFailed
//! ```
//!
//! A page that fails OCR is logged and skipped; the document only counts as
//! failed when no page could be recognised. The whole decision runs in one
//! `spawn_blocking` task because every step talks to pdfium or a subprocess.

use crate::config::PipelineConfig;
use crate::error::{OcrError, PipelineError};
use crate::output::Extraction;
use crate::pipeline::ocr::{OcrEngine, TesseractCli};
use crate::pipeline::render::{PageRasterizer, PdfiumBackend, TextLayerReader};
use crate::progress::{NoopProgressCallback, PipelineProgressCallback, ProgressCallback};
use std::path::Path;
use std::sync::Arc;
use tracing::{info, warn};

/// Turns a PDF on disk into an [`Extraction`].
#[derive(Clone)]
pub struct TextExtractor {
    text_layer: Arc<dyn TextLayerReader>,
    rasterizer: Arc<dyn PageRasterizer>,
    ocr: Arc<dyn OcrEngine>,
    progress: ProgressCallback,
}

impl TextExtractor {
    pub fn new(
        text_layer: Arc<dyn TextLayerReader>,
        rasterizer: Arc<dyn PageRasterizer>,
        ocr: Arc<dyn OcrEngine>,
    ) -> Self {
        Self {
            text_layer,
            rasterizer,
            ocr,
            progress: Arc::new(NoopProgressCallback),
        }
    }

    /// Use the injected backends from `config`, falling back to pdfium and
    /// the tesseract CLI for whatever was not supplied.
    pub fn from_config(config: &PipelineConfig) -> Self {
        let pdfium = Arc::new(PdfiumBackend::new(
            config.pdfium_library_path.clone(),
            config.max_rendered_pixels,
        ));
        let text_layer = config
            .text_layer
            .clone()
            .unwrap_or_else(|| pdfium.clone() as Arc<dyn TextLayerReader>);
        let rasterizer = config
            .rasterizer
            .clone()
            .unwrap_or_else(|| pdfium as Arc<dyn PageRasterizer>);
        let ocr = config.ocr_engine.clone().unwrap_or_else(|| {
            Arc::new(TesseractCli::new(
                config.tesseract_cmd.clone(),
                config.ocr_language.clone(),
            )) as Arc<dyn OcrEngine>
        });

        let mut extractor = Self::new(text_layer, rasterizer, ocr);
        if let Some(cb) = &config.progress_callback {
            extractor.progress = Arc::clone(cb);
        }
        extractor
    }

    /// Extract all text from the PDF at `path`.
    ///
    /// # Errors
    /// Only fatal problems with the document itself (unreadable, corrupt,
    /// pdfium missing) are returned as `Err`. OCR trouble is reported through
    /// the [`Extraction::OcrUnavailable`] and [`Extraction::OcrFailed`]
    /// variants.
    pub async fn extract(&self, path: &Path) -> Result<Extraction, PipelineError> {
        let path = path.to_path_buf();
        let this = self.clone();

        tokio::task::spawn_blocking(move || this.extract_blocking(&path))
            .await
            .map_err(|e| PipelineError::Internal(format!("Extraction task panicked: {e}")))?
    }

    fn extract_blocking(&self, path: &Path) -> Result<Extraction, PipelineError> {
        let page_texts = self.text_layer.page_texts(path)?;
        let total_pages = page_texts.len();

        let mut native = String::new();
        for text in page_texts.into_iter().flatten() {
            if !text.is_empty() {
                native.push_str(&text);
                native.push('\n');
            }
        }

        if !native.trim().is_empty() {
            info!(
                "Native text layer: {} chars from {} pages",
                native.len(),
                total_pages
            );
            return Ok(Extraction::NativeText(native));
        }
        if total_pages == 0 {
            warn!("PDF has no pages");
            return Ok(Extraction::NativeText(native));
        }

        info!(
            "No native text in {} pages, falling back to OCR",
            total_pages
        );
        self.ocr_document(path)
    }

    fn ocr_document(&self, path: &Path) -> Result<Extraction, PipelineError> {
        if let Err(e) = self.ocr.check_available() {
            warn!("OCR unavailable: {}", e);
            return Ok(Extraction::OcrUnavailable {
                reason: e.to_string(),
            });
        }

        let images = match self.rasterizer.render_pages(path) {
            Ok(images) => images,
            Err(OcrError::Unavailable(reason)) => {
                warn!("OCR unavailable: {}", reason);
                return Ok(Extraction::OcrUnavailable { reason });
            }
            Err(e) => {
                warn!("Could not rasterise PDF for OCR: {}", e);
                return Ok(Extraction::OcrFailed {
                    reason: e.to_string(),
                });
            }
        };

        let total = images.len();
        let mut text = String::new();
        let mut recognised = 0usize;
        let mut first_error: Option<String> = None;

        for (idx, image) in images.iter().enumerate() {
            let page_num = idx + 1;
            self.progress.on_ocr_page(page_num, total);

            match self.ocr.recognize(page_num, image) {
                Ok(page_text) => {
                    text.push_str(&page_text);
                    text.push('\n');
                    recognised += 1;
                }
                Err(OcrError::Unavailable(reason)) => {
                    warn!("OCR engine became unavailable on page {}: {}", page_num, reason);
                    return Ok(Extraction::OcrUnavailable { reason });
                }
                Err(e) => {
                    warn!("OCR failed on page {}/{}: {}", page_num, total, e);
                    first_error.get_or_insert_with(|| e.to_string());
                }
            }
        }

        if recognised == 0 {
            return Ok(Extraction::OcrFailed {
                reason: first_error.unwrap_or_else(|| "no pages could be rendered".to_string()),
            });
        }

        info!(
            "OCR recognised {}/{} pages, {} chars",
            recognised,
            total,
            text.len()
        );
        Ok(Extraction::OcrText(text))
    }
}

impl std::fmt::Debug for TextExtractor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TextExtractor").finish_non_exhaustive()
    }
}
