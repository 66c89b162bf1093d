//! Progress-callback trait for pipeline events.
//!
//! Inject an [`Arc<dyn PipelineProgressCallback>`] via
//! [`crate::config::PipelineConfigBuilder::progress_callback`] to receive
//! events as a document moves through extraction, structuring and upload.
//!
//! # Why callbacks instead of channels?
//!
//! Callers can forward events to a terminal spinner, a log line or a
//! channel without the library knowing how the host application reports
//! progress. The HTTP server uses the no-op default; the CLI drives an
//! `indicatif` spinner.
//!
//! # Example
//!
//! ```rust
//! use pdf_question_extractor::PipelineProgressCallback;
//! use std::sync::atomic::{AtomicUsize, Ordering};
//!
//! struct BatchCounter(AtomicUsize);
//!
//! impl PipelineProgressCallback for BatchCounter {
//!     fn on_batch_complete(&self, batch: usize, total: usize, uploaded: usize) {
//!         self.0.fetch_add(uploaded, Ordering::SeqCst);
//!         eprintln!("batch {batch}/{total}: {uploaded} records");
//!     }
//! }
//! ```

use crate::output::PipelineResult;
use std::fmt;
use std::sync::Arc;

/// Pipeline stages reported through [`PipelineProgressCallback`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Extracting,
    Structuring,
    Uploading,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Stage::Extracting => "extracting text",
            Stage::Structuring => "structuring questions",
            Stage::Uploading => "uploading to Airtable",
        };
        f.write_str(s)
    }
}

/// Called by the pipeline as a document is processed.
///
/// All methods have default no-op implementations so callers only override
/// what they care about. Events arrive in order from a single task.
pub trait PipelineProgressCallback: Send + Sync {
    /// A stage is about to start.
    fn on_stage_start(&self, stage: Stage) {
        let _ = stage;
    }

    /// A stage finished.
    ///
    /// # Arguments
    /// * `detail` — short human-readable summary, e.g. `"1234 chars"`
    fn on_stage_complete(&self, stage: Stage, detail: &str) {
        let _ = (stage, detail);
    }

    /// OCR is about to run on a page.
    ///
    /// # Arguments
    /// * `page_num`    — 1-indexed page number
    /// * `total_pages` — total pages being recognised
    fn on_ocr_page(&self, page_num: usize, total_pages: usize) {
        let _ = (page_num, total_pages);
    }

    /// An upload batch was accepted.
    ///
    /// # Arguments
    /// * `batch`    — 1-indexed batch number
    /// * `total`    — number of batches
    /// * `uploaded` — records created by this batch
    fn on_batch_complete(&self, batch: usize, total: usize, uploaded: usize) {
        let _ = (batch, total, uploaded);
    }

    /// An upload batch failed and was skipped.
    fn on_batch_error(&self, batch: usize, total: usize, error: &str) {
        let _ = (batch, total, error);
    }

    /// Called once with the final result, success or not.
    fn on_pipeline_complete(&self, result: &PipelineResult) {
        let _ = result;
    }
}

/// A no-op implementation for callers that don't need progress events.
///
/// This is the default when no callback is configured.
pub struct NoopProgressCallback;

impl PipelineProgressCallback for NoopProgressCallback {}

/// Convenience alias matching the type stored in [`crate::config::PipelineConfig`].
pub type ProgressCallback = Arc<dyn PipelineProgressCallback>;
