//! Produced clips and canned clip suggestions.

use serde::{Deserialize, Serialize};

/// MIME type of every produced clip.
pub const MP4_MIME_TYPE: &str = "video/mp4";

/// Final trimmed clip, held in memory until the response is written.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClipOutput {
    pub bytes: Vec<u8>,
    pub mime_type: &'static str,
    pub suggested_filename: String,
}

impl ClipOutput {
    pub fn mp4(bytes: Vec<u8>, suggested_filename: impl Into<String>) -> Self {
        Self {
            bytes,
            mime_type: MP4_MIME_TYPE,
            suggested_filename: suggested_filename.into(),
        }
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

/// A suggested clip returned by `/process`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClipSuggestion {
    pub id: String,
    pub title: String,
    pub start: f64,
    pub end: f64,
    pub thumbnail: String,
}
