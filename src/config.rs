//! Configuration types for the question-extraction pipeline.
//!
//! All pipeline behaviour is controlled through [`PipelineConfig`], built via
//! its [`PipelineConfigBuilder`]. Nothing is read from the environment here:
//! the CLI and the HTTP server map their own flags and variables onto this
//! struct, so the library never picks up credentials behind the caller's back.
//!
//! Per-request Airtable credentials travel separately as
//! [`AirtableCredentials`], because the upload form supplies a fresh key and
//! base with every submission.

use crate::error::PipelineError;
use crate::pipeline::ocr::OcrEngine;
use crate::pipeline::render::{PageRasterizer, TextLayerReader};
use crate::progress::ProgressCallback;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

/// Largest batch the Airtable create-records endpoint accepts.
pub const AIRTABLE_MAX_BATCH: usize = 10;

/// Configuration for a pipeline run.
///
/// Built via [`PipelineConfig::builder()`] or using
/// [`PipelineConfig::default()`].
///
/// # Example
/// ```rust
/// use pdf_question_extractor::PipelineConfig;
///
/// let config = PipelineConfig::builder()
///     .llm_api_key("sk-test")
///     .model("deepseek-chat")
///     .batch_size(10)
///     .build()
///     .unwrap();
/// ```
#[derive(Clone)]
pub struct PipelineConfig {
    /// Whether extracted text is structured into questions or stored as-is.
    /// Default: [`StructuringMode::Questions`].
    pub mode: StructuringMode,

    // ── LLM ───────────────────────────────────────────────────────────────
    /// Base URL of an OpenAI-compatible chat-completion API.
    /// Default: `https://api.deepseek.com`.
    pub llm_api_base: String,

    /// Bearer token for the LLM API. Required in questions mode.
    pub llm_api_key: Option<String>,

    /// Model identifier. Default: `deepseek-chat`.
    pub model: String,

    /// Sampling temperature. Default: 0.1.
    ///
    /// Extraction should be deterministic; higher values make the model
    /// paraphrase questions instead of copying them.
    pub temperature: f32,

    /// Maximum tokens the LLM may generate. Default: 4000.
    ///
    /// A full exam paper produces a long JSON array; too low a limit truncates
    /// it mid-object and the whole response fails to parse.
    pub max_tokens: usize,

    /// Custom system prompt. If None, uses [`crate::prompts::QUESTION_EXTRACTION_PROMPT`].
    pub system_prompt: Option<String>,

    /// Timeout for one chat-completion call, in seconds. Default: 120.
    pub llm_timeout_secs: u64,

    // ── Airtable ──────────────────────────────────────────────────────────
    /// Base URL of the Airtable REST API. Default: `https://api.airtable.com`.
    pub airtable_api_base: String,

    /// Table that receives the records. Default: `Questions`.
    pub airtable_table: String,

    /// Records per create request. Range: 1–10. Default: 10.
    pub batch_size: usize,

    /// Value written to the `Source` field of every record. Default: `PDF Upload`.
    pub record_source: String,

    /// Timeout for one batch upload, in seconds. Default: 30.
    pub upload_timeout_secs: u64,

    // ── Extraction ────────────────────────────────────────────────────────
    /// Explicit pdfium shared library. If None, the system library is used.
    pub pdfium_library_path: Option<PathBuf>,

    /// Longest edge of a page rendered for OCR, in pixels. Default: 2000.
    pub max_rendered_pixels: u32,

    /// OCR command. Default: `tesseract` (resolved through `PATH`).
    pub tesseract_cmd: String,

    /// OCR language code passed to tesseract. Default: `eng`.
    pub ocr_language: String,

    /// Pre-constructed text-layer reader. Takes precedence over pdfium.
    pub text_layer: Option<Arc<dyn TextLayerReader>>,

    /// Pre-constructed page rasteriser. Takes precedence over pdfium.
    pub rasterizer: Option<Arc<dyn PageRasterizer>>,

    /// Pre-constructed OCR engine. Takes precedence over the tesseract CLI.
    pub ocr_engine: Option<Arc<dyn OcrEngine>>,

    /// Receives stage, OCR and batch events.
    pub progress_callback: Option<ProgressCallback>,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            mode: StructuringMode::default(),
            llm_api_base: "https://api.deepseek.com".to_string(),
            llm_api_key: None,
            model: "deepseek-chat".to_string(),
            temperature: 0.1,
            max_tokens: 4000,
            system_prompt: None,
            llm_timeout_secs: 120,
            airtable_api_base: "https://api.airtable.com".to_string(),
            airtable_table: "Questions".to_string(),
            batch_size: AIRTABLE_MAX_BATCH,
            record_source: "PDF Upload".to_string(),
            upload_timeout_secs: 30,
            pdfium_library_path: None,
            max_rendered_pixels: 2000,
            tesseract_cmd: "tesseract".to_string(),
            ocr_language: "eng".to_string(),
            text_layer: None,
            rasterizer: None,
            ocr_engine: None,
            progress_callback: None,
        }
    }
}

impl fmt::Debug for PipelineConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PipelineConfig")
            .field("mode", &self.mode)
            .field("llm_api_base", &self.llm_api_base)
            .field("llm_api_key", &self.llm_api_key.as_ref().map(|_| "<redacted>"))
            .field("model", &self.model)
            .field("temperature", &self.temperature)
            .field("max_tokens", &self.max_tokens)
            .field("airtable_api_base", &self.airtable_api_base)
            .field("airtable_table", &self.airtable_table)
            .field("batch_size", &self.batch_size)
            .field("pdfium_library_path", &self.pdfium_library_path)
            .field("tesseract_cmd", &self.tesseract_cmd)
            .field("ocr_language", &self.ocr_language)
            .field("text_layer", &self.text_layer.as_ref().map(|_| "<dyn TextLayerReader>"))
            .field("rasterizer", &self.rasterizer.as_ref().map(|_| "<dyn PageRasterizer>"))
            .field("ocr_engine", &self.ocr_engine.as_ref().map(|_| "<dyn OcrEngine>"))
            .finish()
    }
}

impl PipelineConfig {
    /// Create a new builder for `PipelineConfig`.
    pub fn builder() -> PipelineConfigBuilder {
        PipelineConfigBuilder {
            config: Self::default(),
        }
    }
}

/// Builder for [`PipelineConfig`].
pub struct PipelineConfigBuilder {
    config: PipelineConfig,
}

impl fmt::Debug for PipelineConfigBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PipelineConfigBuilder")
            .field("config", &self.config)
            .finish()
    }
}

impl PipelineConfigBuilder {
    pub fn mode(mut self, mode: StructuringMode) -> Self {
        self.config.mode = mode;
        self
    }

    pub fn llm_api_base(mut self, url: impl Into<String>) -> Self {
        self.config.llm_api_base = url.into();
        self
    }

    pub fn llm_api_key(mut self, key: impl Into<String>) -> Self {
        self.config.llm_api_key = Some(key.into());
        self
    }

    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.config.model = model.into();
        self
    }

    pub fn temperature(mut self, t: f32) -> Self {
        self.config.temperature = t.clamp(0.0, 2.0);
        self
    }

    pub fn max_tokens(mut self, n: usize) -> Self {
        self.config.max_tokens = n.max(1);
        self
    }

    pub fn system_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.config.system_prompt = Some(prompt.into());
        self
    }

    pub fn llm_timeout_secs(mut self, secs: u64) -> Self {
        self.config.llm_timeout_secs = secs.max(1);
        self
    }

    pub fn airtable_api_base(mut self, url: impl Into<String>) -> Self {
        self.config.airtable_api_base = url.into();
        self
    }

    pub fn airtable_table(mut self, table: impl Into<String>) -> Self {
        self.config.airtable_table = table.into();
        self
    }

    pub fn batch_size(mut self, n: usize) -> Self {
        self.config.batch_size = n.clamp(1, AIRTABLE_MAX_BATCH);
        self
    }

    pub fn record_source(mut self, source: impl Into<String>) -> Self {
        self.config.record_source = source.into();
        self
    }

    pub fn upload_timeout_secs(mut self, secs: u64) -> Self {
        self.config.upload_timeout_secs = secs.max(1);
        self
    }

    pub fn pdfium_library_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.pdfium_library_path = Some(path.into());
        self
    }

    pub fn max_rendered_pixels(mut self, px: u32) -> Self {
        self.config.max_rendered_pixels = px.max(100);
        self
    }

    pub fn tesseract_cmd(mut self, cmd: impl Into<String>) -> Self {
        self.config.tesseract_cmd = cmd.into();
        self
    }

    pub fn ocr_language(mut self, lang: impl Into<String>) -> Self {
        self.config.ocr_language = lang.into();
        self
    }

    pub fn text_layer(mut self, reader: Arc<dyn TextLayerReader>) -> Self {
        self.config.text_layer = Some(reader);
        self
    }

    pub fn rasterizer(mut self, rasterizer: Arc<dyn PageRasterizer>) -> Self {
        self.config.rasterizer = Some(rasterizer);
        self
    }

    pub fn ocr_engine(mut self, engine: Arc<dyn OcrEngine>) -> Self {
        self.config.ocr_engine = Some(engine);
        self
    }

    pub fn progress_callback(mut self, cb: ProgressCallback) -> Self {
        self.config.progress_callback = Some(cb);
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<PipelineConfig, PipelineError> {
        let c = &self.config;
        if c.mode == StructuringMode::Questions
            && c.llm_api_key.as_deref().map_or(true, |k| k.trim().is_empty())
        {
            return Err(PipelineError::InvalidConfig(
                "an LLM API key is required to structure questions".into(),
            ));
        }
        if c.batch_size == 0 || c.batch_size > AIRTABLE_MAX_BATCH {
            return Err(PipelineError::InvalidConfig(format!(
                "batch size must be 1–{AIRTABLE_MAX_BATCH}, got {}",
                c.batch_size
            )));
        }
        for (name, url) in [
            ("LLM base URL", &c.llm_api_base),
            ("Airtable base URL", &c.airtable_api_base),
        ] {
            reqwest::Url::parse(url).map_err(|e| {
                PipelineError::InvalidConfig(format!("{name} '{url}' is not a valid URL: {e}"))
            })?;
        }
        if c.airtable_table.trim().is_empty() {
            return Err(PipelineError::InvalidConfig(
                "Airtable table name must not be empty".into(),
            ));
        }
        Ok(self.config)
    }
}

// ── Enums ────────────────────────────────────────────────────────────────

/// What happens to extracted text before upload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum StructuringMode {
    /// Ask the LLM for a JSON array of questions and upload one record per
    /// question. (default)
    #[default]
    Questions,
    /// Skip the LLM and upload the extracted text as a single record.
    RawText,
}

// ── Credentials ──────────────────────────────────────────────────────────

/// Airtable credentials supplied by the caller for one request.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct AirtableCredentials {
    pub api_key: String,
    pub base_id: String,
}

impl AirtableCredentials {
    pub fn new(api_key: impl Into<String>, base_id: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            base_id: base_id.into(),
        }
    }

    /// Fill empty fields from `fallback`.
    pub fn or(self, fallback: Option<&AirtableCredentials>) -> Self {
        let Some(fb) = fallback else {
            return self;
        };
        Self {
            api_key: if self.api_key.trim().is_empty() {
                fb.api_key.clone()
            } else {
                self.api_key
            },
            base_id: if self.base_id.trim().is_empty() {
                fb.base_id.clone()
            } else {
                self.base_id
            },
        }
    }
}

impl fmt::Debug for AirtableCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AirtableCredentials")
            .field("api_key", &"<redacted>")
            .field("base_id", &self.base_id)
            .finish()
    }
}
