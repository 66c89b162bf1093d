//! HTTP error types with JSON responses.
//!
//! Every error leaves the server in the same `{success, message, error}`
//! envelope the upload form already understands for pipeline failures.

use crate::output::PipelineResult;
use axum::extract::multipart::MultipartError;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;

/// API-level errors with HTTP status mapping.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// The form had no `pdfFile` part, or its filename was empty.
    #[error("No PDF file uploaded.")]
    NoFileUploaded,

    /// The multipart body could not be read (malformed, too large).
    #[error("Invalid upload: {0}")]
    Multipart(#[from] MultipartError),

    #[error("{0}")]
    Internal(String),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::NoFileUploaded => StatusCode::BAD_REQUEST,
            ApiError::Multipart(e) => e.status(),
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!(error = %self, "Upload request failed");
        } else {
            tracing::warn!(error = %self, "Upload request rejected");
        }
        (status, Json(PipelineResult::failure(&self))).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn no_file_is_bad_request() {
        let e = ApiError::NoFileUploaded;
        assert_eq!(e.status(), StatusCode::BAD_REQUEST);
        assert_eq!(e.to_string(), "No PDF file uploaded.");
    }

    #[test]
    fn internal_is_server_error() {
        let response = ApiError::Internal("disk full".into()).into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
