//! Trim request payload and time-range normalisation.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

/// Shortest duration ever handed to ffmpeg, in seconds.
///
/// Degenerate ranges (`end <= start`) are floored to this value instead of
/// being rejected.
pub const MIN_CLIP_DURATION_SECS: f64 = 0.1;

/// Largest accepted `start`/`end`, about 115 days.
pub const MAX_TIMESTAMP_SECS: f64 = 10_000_000.0;

/// Reasons a trim payload is rejected before any work starts.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum TrimRequestError {
    #[error("payload is not a JSON object")]
    NotAnObject,
    #[error("url is missing or empty")]
    MissingUrl,
    #[error("{0} must be a number")]
    NotNumeric(&'static str),
    #[error("{0} must be between 0 and 10000000 seconds")]
    OutOfRange(&'static str),
}

/// A request to cut `[start, end]` (seconds) out of the media at `url`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrimRequest {
    pub url: String,
    pub start: f64,
    pub end: f64,
}

impl TrimRequest {
    /// Validate an untyped JSON body.
    ///
    /// `url` must be a non-empty string and `start`/`end` must be JSON
    /// numbers; strings that merely look numeric are rejected.
    pub fn from_value(value: &Value) -> Result<Self, TrimRequestError> {
        let obj = value.as_object().ok_or(TrimRequestError::NotAnObject)?;

        let url = obj
            .get("url")
            .and_then(Value::as_str)
            .map(str::trim)
            .filter(|u| !u.is_empty())
            .ok_or(TrimRequestError::MissingUrl)?;

        let start = number_field(obj, "start")?;
        let end = number_field(obj, "end")?;

        Ok(Self {
            url: url.to_string(),
            start,
            end,
        })
    }

    /// Normalised span used by every stage of the pipeline.
    pub fn span(&self) -> ClipSpan {
        ClipSpan::new(self.start, self.end)
    }
}

fn number_field(
    obj: &serde_json::Map<String, Value>,
    name: &'static str,
) -> Result<f64, TrimRequestError> {
    let n = obj
        .get(name)
        .and_then(Value::as_f64)
        .ok_or(TrimRequestError::NotNumeric(name))?;
    if !n.is_finite() || !(0.0..=MAX_TIMESTAMP_SECS).contains(&n) {
        return Err(TrimRequestError::OutOfRange(name));
    }
    Ok(n)
}

/// Start offset plus the duration actually requested from the tools.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ClipSpan {
    pub start: f64,
    pub end: f64,
}

impl ClipSpan {
    pub fn new(start: f64, end: f64) -> Self {
        Self { start, end }
    }

    /// `end - start`, floored at [`MIN_CLIP_DURATION_SECS`].
    pub fn duration(&self) -> f64 {
        (self.end - self.start).max(MIN_CLIP_DURATION_SECS)
    }

    /// Whole-second bounds for yt-dlp `--download-sections`.
    ///
    /// The end is kept at least one second past the start so the section
    /// is never empty. Out-of-range floats saturate.
    pub fn whole_seconds(&self) -> (u64, u64) {
        let start = self.start.floor() as u64;
        let end = (self.end.floor() as u64).max(start.saturating_add(1));
        (start, end)
    }
}
