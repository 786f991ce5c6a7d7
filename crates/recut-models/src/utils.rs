//! URL classification and parsing helpers.
//!
//! The trim pipeline only needs one decision from a URL: whether it points
//! at a streaming platform that must be resolved by yt-dlp first, or at a
//! media file that ffmpeg can open directly.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Platforms whose page URLs need a resolution step before ffmpeg can read them.
pub const RESOLVABLE_DOMAINS: &[&str] = &[
    "youtube.com",
    "youtu.be",
    "vimeo.com",
    "twitter.com",
    "x.com",
    "twitch.tv",
    "tiktok.com",
];

/// Outcome of classifying a source URL.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct UrlClass {
    pub resolvable: bool,
}

/// Classify a URL by hostname.
///
/// Never fails: anything that does not parse, or whose host is not a known
/// platform, is treated as a direct media URL.
pub fn classify_url(url: &str) -> UrlClass {
    UrlClass {
        resolvable: is_resolvable_url(url),
    }
}

/// Whether the URL's host is (a subdomain of) a known streaming platform.
pub fn is_resolvable_url(url: &str) -> bool {
    match extract_host(url) {
        Some(host) => RESOLVABLE_DOMAINS.iter().any(|domain| host_matches(&host, domain)),
        None => false,
    }
}

fn host_matches(host: &str, domain: &str) -> bool {
    host == domain
        || host
            .strip_suffix(domain)
            .is_some_and(|prefix| prefix.ends_with('.'))
}

/// Extract the lowercase hostname from a URL.
pub fn extract_host(url: &str) -> Option<String> {
    let parsed = url::Url::parse(url.trim()).ok()?;
    parsed.host_str().map(|h| h.to_ascii_lowercase())
}

/// Check if URL is from a YouTube domain.
pub fn is_youtube_domain(url: &str) -> bool {
    extract_host(url).is_some_and(|host| {
        host_matches(&host, "youtube.com") || host_matches(&host, "youtu.be")
    })
}

/// Errors that can occur during YouTube ID extraction.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum YoutubeIdError {
    #[error("URL is not a valid YouTube URL")]
    InvalidYoutubeUrl,
    #[error("Video ID has invalid format")]
    InvalidVideoId,
    #[error("Video ID not found in URL")]
    VideoIdNotFound,
}

/// Result type for YouTube ID extraction.
pub type YoutubeIdResult<T> = Result<T, YoutubeIdError>;

/// Markers that precede the 11-character video id, in lookup order.
const YOUTUBE_ID_MARKERS: &[&str] = &["?v=", "&v=", "youtu.be/", "/embed/", "/v/", "/shorts/"];

/// Extract the YouTube video ID from a watch, short, embed or shorts URL.
pub fn extract_youtube_id(url: &str) -> YoutubeIdResult<String> {
    let url = url.trim();

    if !is_youtube_domain(url) {
        return Err(YoutubeIdError::InvalidYoutubeUrl);
    }

    for marker in YOUTUBE_ID_MARKERS {
        if let Some(pos) = url.find(marker) {
            let rest = &url[pos + marker.len()..];
            let end = rest
                .find(|c| matches!(c, '&' | '#' | '?' | '/'))
                .unwrap_or(rest.len());
            let id = &rest[..end];
            if id.is_empty() {
                continue;
            }
            return validate_youtube_id(id);
        }
    }

    Err(YoutubeIdError::VideoIdNotFound)
}

fn validate_youtube_id(id: &str) -> YoutubeIdResult<String> {
    let valid_chars = id
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
    if id.len() != 11 || !valid_chars {
        return Err(YoutubeIdError::InvalidVideoId);
    }
    Ok(id.to_string())
}
