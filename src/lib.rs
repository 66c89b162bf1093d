//! # pdf-question-extractor
//!
//! Pull math exam questions out of uploaded PDFs and store them in Airtable.
//!
//! ## Why this crate?
//!
//! Past papers arrive in two flavours: digitally typeset PDFs with a text
//! layer, and photocopies scanned to image-only PDFs. This crate reads the
//! text layer when there is one and falls back to OCR when there is not,
//! asks an LLM to split the text into discrete question records, and
//! batch-uploads them to an Airtable table.
//!
//! ## Pipeline Overview
//!
//! ```text
//! PDF
//!  │
//!  ├─ 1. Input      validate %PDF magic; stage uploads to a temp file
//!  ├─ 2. Extract    pdfium text layer (spawn_blocking)
//!  │                └─ empty? rasterise + tesseract OCR per page
//!  ├─ 3. Structure  OpenAI-compatible chat completion → JSON array of questions
//!  ├─ 4. Upload     Airtable create-records, batches of ≤ 10
//!  └─ 5. Result     {success, message, error}
//! ```
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use pdf_question_extractor::{AirtableCredentials, PipelineConfig, QuestionPipeline};
//! use std::path::Path;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = PipelineConfig::builder()
//!         .llm_api_key(std::env::var("DEEPSEEK_API_KEY")?)
//!         .build()?;
//!     let pipeline = QuestionPipeline::new(config)?;
//!     let creds = AirtableCredentials::new(
//!         std::env::var("AIRTABLE_API_KEY")?,
//!         std::env::var("AIRTABLE_BASE_ID")?,
//!     );
//!     let result = pipeline.process(Path::new("paper.pdf"), &creds).await;
//!     println!("{}", serde_json::to_string_pretty(&result)?);
//!     Ok(())
//! }
//! ```
//!
//! ## Feature Flags
//!
//! | Feature  | Default | Description |
//! |----------|---------|-------------|
//! | `server` | on      | axum HTTP server: upload form at `/`, JSON API at `/upload` |
//! | `cli`    | on      | Enables the `pdfq` binary (clap + anyhow + tracing-subscriber + indicatif) |
//!
//! Disable both when embedding the library:
//! ```toml
//! pdf-question-extractor = { version = "0.1", default-features = false }
//! ```
//!
//! ## Runtime Requirements
//!
//! | Dependency | Needed for | Configure with |
//! |------------|------------|----------------|
//! | pdfium     | every PDF  | `PipelineConfig::pdfium_library_path` / `PDFIUM_LIB_PATH` |
//! | tesseract  | scanned PDFs only | `PipelineConfig::tesseract_cmd` / `TESSERACT_CMD` |

// ── Modules ──────────────────────────────────────────────────────────────

pub mod config;
pub mod error;
pub mod output;
pub mod pipeline;
pub mod process;
pub mod progress;
pub mod prompts;
#[cfg(feature = "server")]
pub mod server;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use config::{AirtableCredentials, PipelineConfig, PipelineConfigBuilder, StructuringMode};
pub use error::{BatchError, OcrError, PipelineError, PipelineFailure, StructureError};
pub use output::{Extraction, ExtractionKind, PipelineResult, Question, UploadSummary};
pub use pipeline::extract::TextExtractor;
pub use pipeline::ocr::{OcrEngine, TesseractCli};
pub use pipeline::render::{PageRasterizer, PdfiumBackend, TextLayerReader};
pub use pipeline::structure::QuestionStructurer;
pub use pipeline::upload::AirtableUploader;
pub use process::{process_pdf, QuestionPipeline};
pub use progress::{NoopProgressCallback, PipelineProgressCallback, ProgressCallback, Stage};
