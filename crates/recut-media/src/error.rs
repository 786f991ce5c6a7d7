//! Error types for media operations.

use thiserror::Error;

/// Result type for media operations.
pub type MediaResult<T> = Result<T, MediaError>;

/// Errors that can occur while resolving, downloading or extracting media.
#[derive(Debug, Error)]
pub enum MediaError {
    #[error("{tool} is not available")]
    ToolUnavailable { tool: String },

    #[error("no usable encoding found in resolver metadata")]
    NoEncodingFound,

    #[error("resolver metadata could not be parsed: {0}")]
    MetadataParse(String),

    #[error("resolver failed: {detail}")]
    ResolveFailed { detail: String },

    #[error("extraction failed: {detail}")]
    ExtractFailed { detail: String },

    #[error("download failed: {detail}")]
    DownloadFailed { detail: String },

    #[error("{tool} timed out after {secs} seconds")]
    Timeout { tool: String, secs: u64 },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl MediaError {
    /// Create a tool-unavailable error.
    pub fn tool_unavailable(tool: impl Into<String>) -> Self {
        Self::ToolUnavailable { tool: tool.into() }
    }

    /// Create an extraction failure error.
    pub fn extract_failed(detail: impl Into<String>) -> Self {
        Self::ExtractFailed {
            detail: detail.into(),
        }
    }

    /// Create a download failure error.
    pub fn download_failed(detail: impl Into<String>) -> Self {
        Self::DownloadFailed {
            detail: detail.into(),
        }
    }

    /// Create an internal error.
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal(message.into())
    }

    /// Fatal errors abort the whole trim; everything else routes to the
    /// next fallback strategy.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            MediaError::ToolUnavailable { .. } | MediaError::Io(_) | MediaError::Internal(_)
        )
    }

    /// Stable error kind reported to clients.
    pub fn kind(&self) -> &'static str {
        match self {
            MediaError::ToolUnavailable { .. } => "ToolUnavailable",
            MediaError::NoEncodingFound
            | MediaError::MetadataParse(_)
            | MediaError::ResolveFailed { .. } => "ResolveFailed",
            MediaError::ExtractFailed { .. } => "ExtractFailed",
            MediaError::DownloadFailed { .. } => "DownloadFailed",
            MediaError::Timeout { .. } => "Timeout",
            MediaError::Io(_) | MediaError::Internal(_) => "InternalError",
        }
    }

    /// Diagnostic detail that is safe to show to a caller.
    ///
    /// Internal errors never expose detail.
    pub fn client_detail(&self) -> Option<String> {
        match self {
            MediaError::ToolUnavailable { tool } => Some(format!("{tool} not installed on server")),
            MediaError::ExtractFailed { detail }
            | MediaError::DownloadFailed { detail }
            | MediaError::ResolveFailed { detail } => Some(detail.clone()),
            MediaError::MetadataParse(msg) => Some(msg.clone()),
            MediaError::Timeout { .. } => Some(self.to_string()),
            MediaError::NoEncodingFound => None,
            MediaError::Io(_) | MediaError::Internal(_) => None,
        }
    }
}
