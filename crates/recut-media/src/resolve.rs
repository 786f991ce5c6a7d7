//! Remote resolution of platform URLs using yt-dlp.
//!
//! yt-dlp dumps JSON metadata for a page URL; from it we pick a directly
//! fetchable media URL plus the HTTP headers required to fetch it. Missing
//! headers cause 403s from the CDN that look exactly like a dead link, so
//! they are carried through verbatim.

use std::collections::BTreeMap;

use serde::{Deserialize, Deserializer};
use tracing::{debug, info, warn};

use recut_models::{ResolvedSource, SourceInput};

use crate::error::{MediaError, MediaResult};
use crate::pipeline::TrimTools;
use crate::runner::{Tool, ToolInvocation};

/// Format selector for metadata dumps: merged mp4/m4a pair first, then any
/// single mp4, then whatever yt-dlp considers best.
const RESOLVE_FORMAT: &str = "bv*[ext=mp4]+ba[ext=m4a]/b[ext=mp4]/bv*+ba/b";

/// Subset of yt-dlp's `--dump-single-json` output.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct YtDlpMetadata {
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub http_headers: BTreeMap<String, String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub formats: Vec<YtDlpFormat>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub requested_formats: Vec<YtDlpFormat>,
}

/// One encoding entry.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct YtDlpFormat {
    #[serde(default)]
    pub format_id: Option<String>,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub ext: Option<String>,
    #[serde(default)]
    pub vcodec: Option<String>,
    #[serde(default)]
    pub acodec: Option<String>,
    #[serde(default)]
    pub height: Option<f64>,
    #[serde(default)]
    pub tbr: Option<f64>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub http_headers: BTreeMap<String, String>,
}

impl YtDlpFormat {
    fn has_video(&self) -> bool {
        codec_present(&self.vcodec)
    }

    fn has_audio(&self) -> bool {
        codec_present(&self.acodec)
    }

    fn usable_url(&self) -> Option<&str> {
        self.url.as_deref().filter(|u| !u.is_empty())
    }

    fn is_mp4(&self) -> bool {
        self.ext.as_deref() == Some("mp4")
    }

    fn input(&self, fallback_headers: &BTreeMap<String, String>) -> Option<SourceInput> {
        let headers = if self.http_headers.is_empty() {
            fallback_headers.clone()
        } else {
            self.http_headers.clone()
        };
        self.usable_url()
            .map(|u| SourceInput::new(u).with_headers(headers))
    }
}

/// yt-dlp emits `null` for absent collections.
fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

fn codec_present(codec: &Option<String>) -> bool {
    codec
        .as_deref()
        .is_some_and(|c| !c.is_empty() && c != "none")
}

/// Pick a fetchable source from metadata.
///
/// Priority: (1) paired video+audio set, (2) best muxed MP4 stream,
/// (3) last entry in the format list, (4) top-level `url`.
pub fn select_source(meta: &YtDlpMetadata) -> Option<ResolvedSource> {
    let top_headers = &meta.http_headers;

    // (1) paired set
    let video = meta
        .requested_formats
        .iter()
        .find(|f| f.has_video() && f.usable_url().is_some());
    let audio = meta
        .requested_formats
        .iter()
        .find(|f| f.has_audio() && !f.has_video() && f.usable_url().is_some());
    if let (Some(video), Some(audio)) = (video, audio) {
        if let (Some(v), Some(a)) = (video.input(top_headers), audio.input(top_headers)) {
            debug!(
                video = ?video.format_id,
                audio = ?audio.format_id,
                "Selected paired encodings"
            );
            return Some(ResolvedSource::remote_with_headers(v.location, v.headers).with_audio(a));
        }
    }

    // (2) best single mp4 carrying both tracks
    let best_mp4 = meta
        .formats
        .iter()
        .filter(|f| f.is_mp4() && f.has_video() && f.has_audio() && f.usable_url().is_some())
        .max_by(|a, b| {
            let key = |f: &YtDlpFormat| (f.height.unwrap_or(0.0), f.tbr.unwrap_or(0.0));
            key(a)
                .partial_cmp(&key(b))
                .unwrap_or(std::cmp::Ordering::Equal)
        });
    if let Some(input) = best_mp4.and_then(|f| f.input(top_headers)) {
        debug!(format = ?best_mp4.and_then(|f| f.format_id.clone()), "Selected best mp4 stream");
        return Some(ResolvedSource::remote_with_headers(input.location, input.headers));
    }

    // (3) yt-dlp lists formats worst to best
    if let Some(input) = meta
        .formats
        .iter()
        .rev()
        .find_map(|f| f.input(top_headers))
    {
        debug!("Selected last listed format");
        return Some(ResolvedSource::remote_with_headers(input.location, input.headers));
    }

    // (4) single top-level url
    meta.url
        .as_deref()
        .filter(|u| !u.is_empty())
        .map(|u| ResolvedSource::remote_with_headers(u, top_headers.clone()))
}

/// Resolves platform URLs into direct media sources.
pub struct RemoteResolver<'a> {
    tools: &'a TrimTools,
}

impl<'a> RemoteResolver<'a> {
    pub fn new(tools: &'a TrimTools) -> Self {
        Self { tools }
    }

    fn invocation(&self, args: Vec<String>) -> ToolInvocation {
        ToolInvocation::new(Tool::YtDlp, self.tools.config.ytdlp_path.clone(), args)
    }

    /// `yt-dlp --version`; non-zero exit or spawn failure is `ToolUnavailable`.
    pub async fn probe(&self) -> MediaResult<()> {
        let inv = self.invocation(vec!["--version".to_string()]);
        match self.tools.runner.run(&inv).await {
            Ok(result) if result.success() => {
                debug!(
                    version = %String::from_utf8_lossy(&result.stdout).trim(),
                    "yt-dlp available"
                );
                Ok(())
            }
            Ok(result) => {
                warn!(exit_code = ?result.exit_code, "yt-dlp version probe failed");
                Err(MediaError::tool_unavailable(Tool::YtDlp.as_str()))
            }
            Err(MediaError::Timeout { .. }) => {
                Err(MediaError::tool_unavailable(Tool::YtDlp.as_str()))
            }
            Err(e) => Err(e),
        }
    }

    /// Dump metadata for `url` and select a source.
    ///
    /// Non-fatal errors (`ResolveFailed`, `MetadataParse`, `NoEncodingFound`)
    /// mean the caller should fall back to downloading.
    pub async fn resolve(&self, url: &str) -> MediaResult<ResolvedSource> {
        let inv = self.invocation(vec![
            "--dump-single-json".to_string(),
            "--no-playlist".to_string(),
            "--no-warnings".to_string(),
            "-f".to_string(),
            RESOLVE_FORMAT.to_string(),
            url.to_string(),
        ]);

        let result = match self.tools.runner.run(&inv).await {
            Ok(result) => result,
            Err(e @ MediaError::Timeout { .. }) => {
                return Err(MediaError::ResolveFailed {
                    detail: e.to_string(),
                })
            }
            Err(e) => return Err(e),
        };

        if !result.success() {
            return Err(MediaError::ResolveFailed {
                detail: result.stderr_snippet(self.tools.config.stderr_snippet_bytes),
            });
        }

        let meta: YtDlpMetadata = serde_json::from_slice(&result.stdout)
            .map_err(|e| MediaError::MetadataParse(e.to_string()))?;

        let source = select_source(&meta).ok_or(MediaError::NoEncodingFound)?;
        info!(
            url = %url,
            has_headers = !source.headers().is_empty(),
            paired = source.audio.is_some(),
            "Resolved remote source"
        );
        Ok(source)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn meta(value: serde_json::Value) -> YtDlpMetadata {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn test_paired_set_wins() {
        let m = meta(json!({
            "url": "https://top",
            "requested_formats": [
                {"format_id": "137", "url": "https://video", "vcodec": "avc1", "acodec": "none",
                 "http_headers": {"Cookie": "v=1"}},
                {"format_id": "140", "url": "https://audio", "vcodec": "none", "acodec": "mp4a"}
            ],
            "formats": [
                {"url": "https://muxed", "ext": "mp4", "vcodec": "avc1", "acodec": "mp4a"}
            ],
            "http_headers": {"User-Agent": "UA"}
        }));
        let src = select_source(&m).unwrap();
        assert_eq!(src.location(), "https://video");
        assert_eq!(src.headers().get("Cookie").map(String::as_str), Some("v=1"));
        let audio = src.audio.unwrap();
        assert_eq!(audio.location, "https://audio");
        // audio entry had no headers of its own, inherits the top-level ones
        assert_eq!(audio.headers.get("User-Agent").map(String::as_str), Some("UA"));
    }

    #[test]
    fn test_best_mp4_by_height() {
        let m = meta(json!({
            "formats": [
                {"url": "https://360", "ext": "mp4", "vcodec": "avc1", "acodec": "mp4a", "height": 360},
                {"url": "https://720", "ext": "mp4", "vcodec": "avc1", "acodec": "mp4a", "height": 720},
                {"url": "https://webm", "ext": "webm", "vcodec": "vp9", "acodec": "opus", "height": 1080},
                {"url": "https://vonly", "ext": "mp4", "vcodec": "avc1", "acodec": "none", "height": 1080}
            ]
        }));
        assert_eq!(select_source(&m).unwrap().location(), "https://720");
    }

    #[test]
    fn test_last_format_then_top_level() {
        let m = meta(json!({
            "formats": [
                {"url": "https://first", "ext": "webm"},
                {"url": "https://last", "ext": "webm", "http_headers": {"Referer": "r"}},
                {"ext": "webm"}
            ]
        }));
        let src = select_source(&m).unwrap();
        assert_eq!(src.location(), "https://last");
        assert_eq!(src.headers().get("Referer").map(String::as_str), Some("r"));

        let m = meta(json!({"url": "https://direct", "http_headers": {"X-Token": "t"}}));
        let src = select_source(&m).unwrap();
        assert_eq!(src.location(), "https://direct");
        assert_eq!(src.headers().get("X-Token").map(String::as_str), Some("t"));
    }

    #[test]
    fn test_nothing_usable() {
        let m = meta(json!({"formats": [{"ext": "mp4"}], "url": ""}));
        assert!(select_source(&m).is_none());
        assert!(select_source(&YtDlpMetadata::default()).is_none());
    }

    #[test]
    fn test_null_fields_tolerated() {
        let m = meta(json!({
            "formats": [{"url": "https://x", "ext": "mp4", "vcodec": "avc1", "acodec": "mp4a",
                         "height": null, "tbr": 812.5, "http_headers": null}],
            "requested_formats": null
        }));
        assert_eq!(select_source(&m).unwrap().location(), "https://x");
    }
}
