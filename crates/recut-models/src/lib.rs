//! Shared data models for the Recut trim service.
//!
//! This crate provides Serde-serializable types for:
//! - Trim requests and normalised clip spans
//! - Resolved media sources and extraction modes
//! - Encode-mode configuration
//! - Produced clips and canned clip suggestions
//! - URL classification helpers

pub mod clip;
pub mod encoding;
pub mod source;
pub mod trim;
pub mod utils;

// Re-export common types
pub use clip::{ClipOutput, ClipSuggestion, MP4_MIME_TYPE};
pub use encoding::EncodingConfig;
pub use source::{ExtractMode, ResolvedSource, SourceInput, SourceKind};
pub use trim::{ClipSpan, TrimRequest, TrimRequestError, MAX_TIMESTAMP_SECS, MIN_CLIP_DURATION_SECS};
pub use utils::{
    classify_url, extract_host, extract_youtube_id, is_resolvable_url, is_youtube_domain,
    UrlClass, YoutubeIdError, YoutubeIdResult, RESOLVABLE_DOMAINS,
};
