//! API error types.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use thiserror::Error;
use tracing::error;

use recut_media::MediaError;

pub type ApiResult<T> = Result<T, ApiError>;

#[derive(Debug, Error)]
pub enum ApiError {
    /// Malformed `/trim` body
    #[error("invalid payload: {0}")]
    InvalidPayload(String),

    /// Malformed `/process` body
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    #[error("Internal error: {0}")]
    Internal(String),

    #[error(transparent)]
    Media(#[from] MediaError),
}

impl ApiError {
    pub fn invalid_payload(msg: impl Into<String>) -> Self {
        Self::InvalidPayload(msg.into())
    }

    pub fn invalid_request(msg: impl Into<String>) -> Self {
        Self::InvalidRequest(msg.into())
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }

    fn status_code(&self) -> StatusCode {
        match self {
            ApiError::InvalidPayload(_) | ApiError::InvalidRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Internal(_) | ApiError::Media(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Stable `error` field of the response body.
    pub fn error_label(&self) -> &'static str {
        match self {
            ApiError::InvalidPayload(_) => "invalid payload",
            ApiError::InvalidRequest(_) => "invalid request",
            ApiError::Internal(_) => "InternalError",
            ApiError::Media(e) => e.kind(),
        }
    }

    fn detail(&self) -> Option<String> {
        match self {
            ApiError::Media(e) => e.client_detail(),
            _ => None,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            error!(kind = self.error_label(), error = %self, "Request failed");
        }

        let body = ErrorResponse {
            error: self.error_label().to_string(),
            detail: self.detail(),
        };

        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_labels() {
        assert_eq!(ApiError::invalid_payload("url").error_label(), "invalid payload");
        assert_eq!(ApiError::internal("x").error_label(), "InternalError");
        assert_eq!(
            ApiError::from(MediaError::download_failed("403")).error_label(),
            "DownloadFailed"
        );
    }

    #[test]
    fn test_internal_detail_hidden() {
        assert_eq!(ApiError::internal("/tmp/secret").detail(), None);
        assert_eq!(ApiError::from(MediaError::internal("boom")).detail(), None);
        assert_eq!(
            ApiError::from(MediaError::tool_unavailable("ffmpeg")).detail().as_deref(),
            Some("ffmpeg not installed on server")
        );
    }

    #[test]
    fn test_status_codes() {
        assert_eq!(ApiError::invalid_request("eof").status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(
            ApiError::from(MediaError::extract_failed("bad")).status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }
}
