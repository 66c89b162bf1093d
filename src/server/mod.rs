//! HTTP surface: an upload form at `/` and a JSON endpoint at `/upload`.
//!
//! Enabled by the `server` feature. The router is built by [`router`] so
//! tests can drive it with `tower::ServiceExt::oneshot` without binding a
//! socket; [`serve`] binds and runs it until Ctrl-C.
//!
//! Requests share one [`QuestionPipeline`] and keep no state between each
//! other; each upload is staged in its own temp file under
//! [`ServerConfig::upload_dir`] and removed when the request ends.

pub mod error;
pub mod handlers;

use crate::config::AirtableCredentials;
use crate::pipeline::input::default_upload_dir;
use crate::process::QuestionPipeline;
use axum::extract::DefaultBodyLimit;
use axum::routing::{get, post};
use axum::{middleware, Router};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, warn};

pub use error::ApiError;

/// Server-level settings. Pipeline settings live in
/// [`crate::config::PipelineConfig`].
#[derive(Clone)]
pub struct ServerConfig {
    /// Default: `127.0.0.1:5000`.
    pub bind_addr: SocketAddr,
    /// Where uploads are staged. Default: `uploads`.
    pub upload_dir: PathBuf,
    /// Request body limit in bytes. Default: 50 MiB.
    pub max_upload_bytes: usize,
    /// Used for any credential field the form leaves empty.
    pub default_credentials: Option<AirtableCredentials>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from(([127, 0, 0, 1], 5000)),
            upload_dir: default_upload_dir(),
            max_upload_bytes: 50 * 1024 * 1024,
            default_credentials: None,
        }
    }
}

impl std::fmt::Debug for ServerConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServerConfig")
            .field("bind_addr", &self.bind_addr)
            .field("upload_dir", &self.upload_dir)
            .field("max_upload_bytes", &self.max_upload_bytes)
            .field("default_credentials", &self.default_credentials)
            .finish()
    }
}

/// Shared handler state.
#[derive(Clone, Debug)]
pub struct AppState {
    pub pipeline: Arc<QuestionPipeline>,
    pub config: Arc<ServerConfig>,
}

impl AppState {
    pub fn new(pipeline: QuestionPipeline, config: ServerConfig) -> Self {
        Self {
            pipeline: Arc::new(pipeline),
            config: Arc::new(config),
        }
    }
}

/// Build the application router.
pub fn router(state: AppState) -> Router {
    let body_limit = state.config.max_upload_bytes;
    Router::new()
        .route("/", get(handlers::index))
        .route("/upload", post(handlers::upload))
        .fallback(handlers::not_found)
        .layer(middleware::map_response(handlers::json_error_envelope))
        .layer(DefaultBodyLimit::max(body_limit))
        .with_state(state)
}

/// Bind `config.bind_addr` and serve until Ctrl-C.
pub async fn serve(pipeline: QuestionPipeline, config: ServerConfig) -> std::io::Result<()> {
    tokio::fs::create_dir_all(&config.upload_dir).await?;
    let listener = tokio::net::TcpListener::bind(config.bind_addr).await?;
    info!(
        addr = %listener.local_addr()?,
        upload_dir = %config.upload_dir.display(),
        "Question extractor listening"
    );

    let app = router(AppState::new(pipeline, config));
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
}

async fn shutdown_signal() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => info!("Shutdown requested, finishing in-flight requests"),
        Err(e) => {
            warn!("Could not listen for Ctrl-C ({e}); running until killed");
            std::future::pending::<()>().await;
        }
    }
}
