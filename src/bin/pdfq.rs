//! CLI binary for pdf-question-extractor.
//!
//! A thin shim over the library crate: `pdfq serve` runs the upload server,
//! `pdfq process` runs the pipeline once on a local file.

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};
use pdf_question_extractor::server::{self, ServerConfig};
use pdf_question_extractor::{
    AirtableCredentials, PipelineConfig, PipelineProgressCallback, PipelineResult,
    ProgressCallback, QuestionPipeline, Stage, StructuringMode,
};
use std::io;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

// ── ANSI colour helpers (no extra deps) ──────────────────────────────────────

fn green(s: &str) -> String {
    format!("\x1b[32m{s}\x1b[0m")
}
fn red(s: &str) -> String {
    format!("\x1b[31m{s}\x1b[0m")
}
fn dim(s: &str) -> String {
    format!("\x1b[2m{s}\x1b[0m")
}
fn bold(s: &str) -> String {
    format!("\x1b[1m{s}\x1b[0m")
}
fn cyan(s: &str) -> String {
    format!("\x1b[36m{s}\x1b[0m")
}

// ── CLI progress callback using indicatif ────────────────────────────────────

/// Terminal progress callback: a spinner whose message follows the current
/// stage, plus one log line per finished stage and upload batch.
struct CliProgressCallback {
    bar: ProgressBar,
}

impl CliProgressCallback {
    fn new() -> Arc<Self> {
        let bar = ProgressBar::new_spinner();
        let style = ProgressStyle::with_template("{spinner:.cyan} {prefix:.bold}  {msg}  {elapsed:.dim}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
            .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "⠿"]);
        bar.set_style(style);
        bar.set_prefix("Starting");
        bar.set_message("Opening PDF…");
        bar.enable_steady_tick(Duration::from_millis(80));
        Arc::new(Self { bar })
    }
}

impl PipelineProgressCallback for CliProgressCallback {
    fn on_stage_start(&self, stage: Stage) {
        let prefix = match stage {
            Stage::Extracting => "Extracting",
            Stage::Structuring => "Structuring",
            Stage::Uploading => "Uploading",
        };
        self.bar.set_prefix(prefix);
        self.bar.set_message(format!("{stage}…"));
    }

    fn on_stage_complete(&self, stage: Stage, detail: &str) {
        self.bar
            .println(format!("  {} {:<22} {}", green("✓"), stage.to_string(), dim(detail)));
    }

    fn on_ocr_page(&self, page_num: usize, total_pages: usize) {
        self.bar.set_prefix("OCR");
        self.bar.set_message(format!("page {page_num}/{total_pages}"));
    }

    fn on_batch_complete(&self, batch: usize, total: usize, uploaded: usize) {
        self.bar.set_message(format!("batch {batch}/{total}"));
        self.bar.println(format!(
            "    {} batch {:>2}/{:<2} {}",
            green("✓"),
            batch,
            total,
            dim(&format!("{uploaded} records"))
        ));
    }

    fn on_batch_error(&self, batch: usize, total: usize, error: &str) {
        // Truncate very long error messages to keep output tidy.
        let msg: String = if error.chars().count() > 80 {
            format!("{}\u{2026}", error.chars().take(79).collect::<String>())
        } else {
            error.to_string()
        };
        self.bar.println(format!(
            "    {} batch {:>2}/{:<2} {}",
            red("✗"),
            batch,
            total,
            red(&msg)
        ));
    }

    fn on_pipeline_complete(&self, result: &PipelineResult) {
        self.bar.finish_and_clear();
        if result.success {
            eprintln!("{} {}", green("✔"), bold(&result.message));
        } else {
            eprintln!("{} {}", red("✘"), bold(&result.error));
        }
    }
}

const AFTER_HELP: &str = r#"EXAMPLES:
  # Run the upload server on http://127.0.0.1:5000
  pdfq serve

  # Listen on all interfaces, default Airtable credentials from the environment
  AIRTABLE_API_KEY=pat... AIRTABLE_BASE_ID=app... pdfq serve --bind 0.0.0.0:8080

  # Process a single paper from the command line
  pdfq process paper.pdf --airtable-key pat... --airtable-base app...

  # Store the raw text instead of asking the LLM for questions
  pdfq process scan.pdf --raw-text --json

ENVIRONMENT VARIABLES:
  DEEPSEEK_API_KEY        LLM API key (any OpenAI-compatible provider)
  PDFQ_LLM_BASE_URL       LLM base URL (default https://api.deepseek.com)
  PDFQ_MODEL              LLM model ID (default deepseek-chat)
  AIRTABLE_API_KEY        Airtable token (server: fallback for empty form field)
  AIRTABLE_BASE_ID        Airtable base (server: fallback for empty form field)
  PDFQ_AIRTABLE_TABLE     Target table (default Questions)
  PDFIUM_LIB_PATH         libpdfium file or directory (default: system library)
  TESSERACT_CMD           tesseract executable (default tesseract)
  PDFQ_OCR_LANG           tesseract language (default eng)
  RUST_LOG                Overrides the log filter, e.g. pdf_question_extractor=debug
"#;

/// Extract math questions from PDFs into Airtable.
#[derive(Parser, Debug)]
#[command(
    name = "pdfq",
    version,
    about = "Extract math questions from PDFs (text layer or OCR) into Airtable",
    arg_required_else_help = true,
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long, global = true, env = "PDFQ_VERBOSE")]
    verbose: bool,

    /// Suppress all output except errors.
    #[arg(short, long, global = true, env = "PDFQ_QUIET")]
    quiet: bool,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Serve the upload form and JSON API.
    Serve(ServeArgs),
    /// Process one PDF and upload its questions.
    Process(ProcessArgs),
}

#[derive(Args, Debug)]
struct ServeArgs {
    /// Address to listen on.
    #[arg(long, env = "PDFQ_BIND", default_value = "127.0.0.1:5000")]
    bind: SocketAddr,

    /// Directory where uploads are staged while processing.
    #[arg(long, env = "PDFQ_UPLOAD_DIR", default_value = "uploads")]
    upload_dir: PathBuf,

    /// Maximum request size in MiB.
    #[arg(long, env = "PDFQ_MAX_UPLOAD_MB", default_value_t = 50)]
    max_upload_mb: usize,

    #[command(flatten)]
    airtable: AirtableArgs,

    #[command(flatten)]
    pipeline: PipelineArgs,
}

#[derive(Args, Debug)]
struct ProcessArgs {
    /// Local PDF file.
    input: PathBuf,

    /// Print the result as JSON on stdout.
    #[arg(long, env = "PDFQ_JSON")]
    json: bool,

    /// Disable the progress spinner.
    #[arg(long, env = "PDFQ_NO_PROGRESS")]
    no_progress: bool,

    #[command(flatten)]
    airtable: AirtableArgs,

    #[command(flatten)]
    pipeline: PipelineArgs,
}

#[derive(Args, Debug)]
struct AirtableArgs {
    /// Airtable personal access token.
    #[arg(long, env = "AIRTABLE_API_KEY", hide_env_values = true)]
    airtable_key: Option<String>,

    /// Airtable base ID (app...).
    #[arg(long, env = "AIRTABLE_BASE_ID")]
    airtable_base: Option<String>,
}

impl AirtableArgs {
    fn credentials(&self) -> Option<AirtableCredentials> {
        if self.airtable_key.is_none() && self.airtable_base.is_none() {
            return None;
        }
        Some(AirtableCredentials::new(
            self.airtable_key.clone().unwrap_or_default(),
            self.airtable_base.clone().unwrap_or_default(),
        ))
    }
}

#[derive(Args, Debug)]
struct PipelineArgs {
    /// LLM API key.
    #[arg(long, env = "DEEPSEEK_API_KEY", hide_env_values = true)]
    llm_api_key: Option<String>,

    /// Base URL of an OpenAI-compatible chat-completion API.
    #[arg(long, env = "PDFQ_LLM_BASE_URL", default_value = "https://api.deepseek.com")]
    llm_base_url: String,

    /// LLM model ID.
    #[arg(long, env = "PDFQ_MODEL", default_value = "deepseek-chat")]
    model: String,

    /// LLM temperature (0.0–2.0).
    #[arg(long, env = "PDFQ_TEMPERATURE", default_value_t = 0.1)]
    temperature: f32,

    /// Max LLM output tokens.
    #[arg(long, env = "PDFQ_MAX_TOKENS", default_value_t = 4000)]
    max_tokens: usize,

    /// Path to a text file containing a custom system prompt.
    #[arg(long, env = "PDFQ_SYSTEM_PROMPT")]
    system_prompt: Option<PathBuf>,

    /// LLM call timeout in seconds.
    #[arg(long, env = "PDFQ_LLM_TIMEOUT", default_value_t = 120)]
    llm_timeout: u64,

    /// Upload extracted text as one record instead of structuring questions.
    #[arg(long, env = "PDFQ_RAW_TEXT")]
    raw_text: bool,

    /// Base URL of the Airtable API.
    #[arg(long, env = "PDFQ_AIRTABLE_BASE_URL", default_value = "https://api.airtable.com")]
    airtable_base_url: String,

    /// Airtable table receiving the records.
    #[arg(long, env = "PDFQ_AIRTABLE_TABLE", default_value = "Questions")]
    airtable_table: String,

    /// Records per Airtable request (1–10).
    #[arg(long, env = "PDFQ_BATCH_SIZE", default_value_t = 10,
          value_parser = clap::value_parser!(u64).range(1..=10))]
    batch_size: u64,

    /// Value for the Source field of every record.
    #[arg(long, env = "PDFQ_RECORD_SOURCE", default_value = "PDF Upload")]
    record_source: String,

    /// Per-batch upload timeout in seconds.
    #[arg(long, env = "PDFQ_UPLOAD_TIMEOUT", default_value_t = 30)]
    upload_timeout: u64,

    /// libpdfium shared library, or the directory containing it.
    #[arg(long, env = "PDFIUM_LIB_PATH")]
    pdfium_lib_path: Option<PathBuf>,

    /// Longest edge of pages rendered for OCR, in pixels.
    #[arg(long, env = "PDFQ_MAX_PIXELS", default_value_t = 2000)]
    max_rendered_pixels: u32,

    /// tesseract executable.
    #[arg(long, env = "TESSERACT_CMD", default_value = "tesseract")]
    tesseract_cmd: String,

    /// tesseract language code(s), e.g. eng or eng+fra.
    #[arg(long, env = "PDFQ_OCR_LANG", default_value = "eng")]
    ocr_lang: String,
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let cli = Cli::parse();

    // ── Logging setup ────────────────────────────────────────────────────
    // Suppress INFO-level library logs when the spinner is active; the
    // spinner provides all the feedback that matters to the user.
    let show_progress = match &cli.command {
        Command::Process(p) => !cli.quiet && !p.no_progress && !p.json,
        Command::Serve(_) => false,
    };
    let filter = if cli.verbose {
        "debug"
    } else if cli.quiet || show_progress {
        "error"
    } else {
        "info"
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_writer(io::stderr)
        .init();

    match cli.command {
        Command::Serve(args) => run_serve(args).await,
        Command::Process(args) => run_process(args, show_progress, cli.quiet).await,
    }
}

async fn run_serve(args: ServeArgs) -> Result<ExitCode> {
    let config = build_config(&args.pipeline, None).await?;
    let pipeline = QuestionPipeline::new(config).context("Failed to initialise pipeline")?;

    let server_config = ServerConfig {
        bind_addr: args.bind,
        upload_dir: args.upload_dir,
        max_upload_bytes: args.max_upload_mb.saturating_mul(1024 * 1024),
        default_credentials: args.airtable.credentials(),
    };

    eprintln!(
        "{} Serving on {}",
        cyan("◆"),
        bold(&format!("http://{}", server_config.bind_addr))
    );
    server::serve(pipeline, server_config)
        .await
        .context("Server error")?;
    Ok(ExitCode::SUCCESS)
}

async fn run_process(args: ProcessArgs, show_progress: bool, quiet: bool) -> Result<ExitCode> {
    let credentials = args
        .airtable
        .credentials()
        .filter(|c| !c.api_key.is_empty() && !c.base_id.is_empty())
        .context("Airtable credentials are required: pass --airtable-key and --airtable-base or set AIRTABLE_API_KEY and AIRTABLE_BASE_ID")?;

    let progress: Option<ProgressCallback> = if show_progress {
        Some(CliProgressCallback::new() as Arc<dyn PipelineProgressCallback>)
    } else {
        None
    };

    let config = build_config(&args.pipeline, progress).await?;
    let pipeline = QuestionPipeline::new(config).context("Failed to initialise pipeline")?;

    let result = pipeline.process(&args.input, &credentials).await;

    if args.json {
        println!(
            "{}",
            serde_json::to_string_pretty(&result).context("Failed to serialise result")?
        );
    } else if !quiet && !show_progress {
        // The spinner callback already printed the final line.
        if result.success {
            println!("{}", result.message);
        } else {
            eprintln!("{} {}", red("Error:"), result.error);
        }
    }

    Ok(if result.success {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}

/// Map CLI args to `PipelineConfig`.
async fn build_config(
    args: &PipelineArgs,
    progress: Option<ProgressCallback>,
) -> Result<PipelineConfig> {
    let mode = if args.raw_text {
        StructuringMode::RawText
    } else {
        StructuringMode::Questions
    };

    let mut builder = PipelineConfig::builder()
        .mode(mode)
        .llm_api_base(&args.llm_base_url)
        .model(&args.model)
        .temperature(args.temperature)
        .max_tokens(args.max_tokens)
        .llm_timeout_secs(args.llm_timeout)
        .airtable_api_base(&args.airtable_base_url)
        .airtable_table(&args.airtable_table)
        .batch_size(args.batch_size as usize)
        .record_source(&args.record_source)
        .upload_timeout_secs(args.upload_timeout)
        .max_rendered_pixels(args.max_rendered_pixels)
        .tesseract_cmd(&args.tesseract_cmd)
        .ocr_language(&args.ocr_lang);

    if let Some(key) = &args.llm_api_key {
        builder = builder.llm_api_key(key);
    }
    if let Some(path) = &args.pdfium_lib_path {
        builder = builder.pdfium_library_path(path);
    }
    if let Some(path) = &args.system_prompt {
        let prompt = tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("Failed to read system prompt from {:?}", path))?;
        builder = builder.system_prompt(prompt);
    }
    if let Some(cb) = progress {
        builder = builder.progress_callback(cb);
    }

    builder.build().context(
        "Invalid configuration (set DEEPSEEK_API_KEY or pass --llm-api-key, or use --raw-text)",
    )
}
