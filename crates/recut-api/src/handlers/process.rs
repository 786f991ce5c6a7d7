//! Clip suggestion handler.
//!
//! Suggestions are canned: a YouTube set with YouTube-hosted thumbnails,
//! and a generic set with placeholder thumbnails for everything else.

use axum::body::Bytes;
use axum::Json;
use serde::Serialize;
use serde_json::Value;

use recut_models::{extract_youtube_id, is_youtube_domain, ClipSuggestion};

use crate::error::{ApiError, ApiResult};

const YOUTUBE_CLIPS: [(&str, &str, f64, f64); 3] = [
    ("c1", "Key insight: Definition", 30.0, 48.0),
    ("c2", "Example explained", 210.0, 235.0),
    ("c3", "Practical tip", 420.0, 440.0),
];

const GENERIC_CLIPS: [(&str, &str, f64, f64); 3] = [
    ("c1", "Overview", 10.0, 28.0),
    ("c2", "Deep dive", 95.0, 122.0),
    ("c3", "Conclusion", 240.0, 260.0),
];

#[derive(Debug, Serialize)]
pub struct ProcessResponse {
    pub clips: Vec<ClipSuggestion>,
}

/// Suggest clips for `{url}`.
pub async fn process(body: Bytes) -> ApiResult<Json<ProcessResponse>> {
    let value: Value =
        serde_json::from_slice(&body).map_err(|e| ApiError::invalid_request(e.to_string()))?;
    let url = value.get("url").and_then(Value::as_str).unwrap_or_default();

    Ok(Json(ProcessResponse {
        clips: suggest_clips(url),
    }))
}

/// Canned suggestions for a source URL.
pub fn suggest_clips(url: &str) -> Vec<ClipSuggestion> {
    let youtube = is_youtube_domain(url);
    let video_id = youtube.then(|| extract_youtube_id(url).ok()).flatten();
    let set = if youtube { &YOUTUBE_CLIPS } else { &GENERIC_CLIPS };

    set.iter()
        .map(|&(id, title, start, end)| ClipSuggestion {
            id: id.to_string(),
            title: title.to_string(),
            start,
            end,
            thumbnail: match &video_id {
                Some(video_id) => format!("https://img.youtube.com/vi/{video_id}/hqdefault.jpg"),
                None => placeholder_thumbnail(title),
            },
        })
        .collect()
}

fn placeholder_thumbnail(text: &str) -> String {
    format!(
        "https://via.placeholder.com/320x180.png?text={}",
        urlencoding::encode(text)
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_youtube_suggestions() {
        let clips = suggest_clips("https://www.youtube.com/watch?v=dQw4w9WgXcQ");
        assert_eq!(clips.len(), 3);
        assert_eq!(clips[0].title, "Key insight: Definition");
        assert_eq!((clips[1].start, clips[1].end), (210.0, 235.0));
        assert!(clips
            .iter()
            .all(|c| c.thumbnail == "https://img.youtube.com/vi/dQw4w9WgXcQ/hqdefault.jpg"));
    }

    #[test]
    fn test_generic_suggestions() {
        let clips = suggest_clips("https://example.com/lecture.mp4");
        assert_eq!(clips[0].title, "Overview");
        assert_eq!(
            clips[1].thumbnail,
            "https://via.placeholder.com/320x180.png?text=Deep%20dive"
        );
    }

    #[test]
    fn test_youtube_without_id_uses_placeholders() {
        let clips = suggest_clips("https://www.youtube.com/feed/trending");
        assert_eq!(clips[0].title, "Key insight: Definition");
        assert_eq!(
            clips[0].thumbnail,
            "https://via.placeholder.com/320x180.png?text=Key%20insight%3A%20Definition"
        );
    }
}
