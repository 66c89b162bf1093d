//! Axum handlers: the upload form and its submission endpoint.

use super::error::ApiError;
use super::AppState;
use crate::config::AirtableCredentials;
use crate::output::PipelineResult;
use axum::body::Bytes;
use axum::extract::{Multipart, State};
use axum::http::header::CONTENT_TYPE;
use axum::http::StatusCode;
use axum::response::{Html, IntoResponse, Response};
use axum::Json;
use tracing::{debug, info};

const INDEX_HTML: &str = include_str!("../../static/index.html");

/// Largest error body the envelope middleware will read back.
const MAX_ERROR_BODY: usize = 64 * 1024;

/// `GET /`
pub async fn index() -> Html<&'static str> {
    Html(INDEX_HTML)
}

/// Multipart fields of `POST /upload`.
#[derive(Default)]
struct UploadForm {
    api_key: String,
    base_id: String,
    file: Option<(String, Bytes)>,
}

/// `POST /upload`
///
/// Fields: `airtableKey`, `airtableBase`, `pdfFile`. Pipeline failures are
/// reported with `200 OK` and `success: false`; only a missing file or an
/// unreadable form is a 4xx.
pub async fn upload(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Json<PipelineResult>, ApiError> {
    let mut form = UploadForm::default();

    while let Some(field) = multipart.next_field().await? {
        let name = field.name().unwrap_or_default().to_string();
        match name.as_str() {
            "airtableKey" => form.api_key = field.text().await?,
            "airtableBase" => form.base_id = field.text().await?,
            "pdfFile" => {
                let file_name = field.file_name().unwrap_or_default().to_string();
                let bytes = field.bytes().await?;
                form.file = Some((file_name, bytes));
            }
            other => debug!("Ignoring form field '{}'", other),
        }
    }

    let (file_name, bytes) = form
        .file
        .filter(|(name, _)| !name.is_empty())
        .ok_or(ApiError::NoFileUploaded)?;

    let credentials = AirtableCredentials::new(form.api_key, form.base_id)
        .or(state.config.default_credentials.as_ref());

    info!("Upload received: '{}' ({} bytes)", file_name, bytes.len());
    let result = state
        .pipeline
        .process_bytes(&bytes, &file_name, &credentials, &state.config.upload_dir)
        .await
        .map_err(|e| ApiError::Internal(e.to_string()))?;

    Ok(Json(result))
}

/// Router fallback for unknown paths.
pub async fn not_found() -> impl IntoResponse {
    (
        StatusCode::NOT_FOUND,
        Json(PipelineResult::failure("Not Found")),
    )
}

/// Rewrite any non-JSON 4xx/5xx response into the JSON error envelope,
/// keeping its status. Covers 405s and extractor rejections that axum
/// renders as plain text.
pub async fn json_error_envelope(response: Response) -> Response {
    let status = response.status();
    if !(status.is_client_error() || status.is_server_error()) {
        return response;
    }
    let is_json = response
        .headers()
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| v.starts_with("application/json"));
    if is_json {
        return response;
    }

    let (_parts, body) = response.into_parts();
    let bytes = axum::body::to_bytes(body, MAX_ERROR_BODY)
        .await
        .unwrap_or_default();
    let text = String::from_utf8_lossy(&bytes).trim().to_string();
    let error = if text.is_empty() {
        status.canonical_reason().unwrap_or("Error").to_string()
    } else {
        text
    };

    (status, Json(PipelineResult::failure(error))).into_response()
}
