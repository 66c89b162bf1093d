//! pdfium access: read the native text layer and rasterise pages for OCR.
//!
//! ## Why traits?
//!
//! The extractor only needs two capabilities from a PDF engine: "give me
//! each page's embedded text" and "give me each page as an image". Putting
//! them behind [`TextLayerReader`] and [`PageRasterizer`] lets tests drive
//! the native-text/OCR decision with in-memory fakes and lets deployments
//! swap the engine without touching the pipeline.
//!
//! ## Why cap pixels, not DPI?
//!
//! Exam papers come in every page size. `max_rendered_pixels` caps the
//! longest edge regardless of physical size, which keeps memory bounded
//! and is plenty for tesseract to read body text.
//!
//! All methods here are blocking; callers run them inside
//! `tokio::task::spawn_blocking`.

use crate::error::{OcrError, PipelineError};
use image::DynamicImage;
use pdfium_render::prelude::*;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Reads the embedded text of every page.
pub trait TextLayerReader: Send + Sync {
    /// One entry per page, in order. `None` means the page had no
    /// readable text; such pages are skipped by the extractor.
    fn page_texts(&self, path: &Path) -> Result<Vec<Option<String>>, PipelineError>;
}

/// Renders every page to an image for OCR.
pub trait PageRasterizer: Send + Sync {
    /// One image per page, in order.
    ///
    /// An engine that cannot be loaded must return
    /// [`OcrError::Unavailable`] so the pipeline reports "OCR is not
    /// available" rather than a generic failure.
    fn render_pages(&self, path: &Path) -> Result<Vec<DynamicImage>, OcrError>;
}

/// The default [`TextLayerReader`] and [`PageRasterizer`], backed by pdfium.
#[derive(Debug, Clone)]
pub struct PdfiumBackend {
    library_path: Option<PathBuf>,
    max_rendered_pixels: u32,
}

impl PdfiumBackend {
    /// `library_path` may name the shared library itself or the directory
    /// that contains it. `None` binds to the system library.
    pub fn new(library_path: Option<PathBuf>, max_rendered_pixels: u32) -> Self {
        Self {
            library_path,
            max_rendered_pixels,
        }
    }

    fn bind(&self) -> Result<Pdfium, String> {
        let bindings = match &self.library_path {
            Some(dir) if dir.is_dir() => {
                let lib_path =
                    Pdfium::pdfium_platform_library_name_at_path(dir.to_string_lossy().as_ref());
                debug!(dir = %dir.display(), "Binding pdfium from directory");
                Pdfium::bind_to_library(&lib_path)
            }
            Some(path) => {
                debug!(path = %path.display(), "Binding pdfium from explicit path");
                Pdfium::bind_to_library(path)
            }
            None => Pdfium::bind_to_system_library(),
        }
        .map_err(|e| e.to_string())?;
        Ok(Pdfium::new(bindings))
    }
}

impl TextLayerReader for PdfiumBackend {
    fn page_texts(&self, path: &Path) -> Result<Vec<Option<String>>, PipelineError> {
        let pdfium = self.bind().map_err(PipelineError::PdfiumBindingFailed)?;
        let document = pdfium
            .load_pdf_from_file(path, None)
            .map_err(|e| map_load_error(path, e))?;

        let pages = document.pages();
        info!("PDF loaded: {} pages", pages.len());

        let texts = pages
            .iter()
            .enumerate()
            .map(|(idx, page)| match page.text() {
                Ok(text) => {
                    let all = text.all();
                    if all.is_empty() {
                        None
                    } else {
                        Some(all)
                    }
                }
                Err(e) => {
                    debug!("Page {}: no text layer ({})", idx + 1, e);
                    None
                }
            })
            .collect();

        Ok(texts)
    }
}

impl PageRasterizer for PdfiumBackend {
    fn render_pages(&self, path: &Path) -> Result<Vec<DynamicImage>, OcrError> {
        let pdfium = self.bind().map_err(|e| {
            OcrError::Unavailable(format!("pdfium could not be loaded for rendering: {e}"))
        })?;
        let document = pdfium
            .load_pdf_from_file(path, None)
            .map_err(|e| OcrError::Render(e.to_string()))?;

        let render_config = PdfRenderConfig::new()
            .set_target_width(self.max_rendered_pixels as i32)
            .set_maximum_height(self.max_rendered_pixels as i32);

        let pages = document.pages();
        let mut images = Vec::with_capacity(pages.len() as usize);

        for (idx, page) in pages.iter().enumerate() {
            let bitmap = page
                .render_with_config(&render_config)
                .map_err(|e| OcrError::Render(format!("page {}: {}", idx + 1, e)))?;
            let image = bitmap.as_image();
            debug!(
                "Rendered page {} → {}x{} px",
                idx + 1,
                image.width(),
                image.height()
            );
            images.push(image);
        }

        Ok(images)
    }
}

/// Map pdfium load errors, singling out encrypted documents.
fn map_load_error(path: &Path, e: PdfiumError) -> PipelineError {
    let detail = format!("{e:?}");
    let lower = detail.to_lowercase();
    if lower.contains("password") || lower.contains("encrypt") {
        PipelineError::PasswordRequired {
            path: path.to_path_buf(),
        }
    } else {
        PipelineError::CorruptPdf {
            path: path.to_path_buf(),
            detail,
        }
    }
}
