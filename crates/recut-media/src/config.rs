//! Trim pipeline configuration.

use std::path::PathBuf;
use std::time::Duration;

use recut_models::EncodingConfig;

/// Default per-subprocess timeout.
pub const DEFAULT_TOOL_TIMEOUT_SECS: u64 = 120;

/// Default number of stderr bytes kept for diagnostics.
pub const DEFAULT_STDERR_SNIPPET_BYTES: usize = 400;

/// Settings shared by the resolver, downloader and extractor.
#[derive(Debug, Clone)]
pub struct TrimConfig {
    /// Directory for request-scoped temp files
    pub temp_dir: PathBuf,
    /// Upper bound on any single ffmpeg / yt-dlp invocation
    pub tool_timeout: Duration,
    /// ffmpeg binary (name on PATH or absolute path)
    pub ffmpeg_path: String,
    /// yt-dlp binary (name on PATH or absolute path)
    pub ytdlp_path: String,
    /// Bytes of stderr kept in error details
    pub stderr_snippet_bytes: usize,
    /// Filename suggested in `Content-Disposition`
    pub clip_filename: String,
    /// Ask yt-dlp to re-encode at section boundaries for exact cuts
    pub section_force_keyframes: bool,
    /// Codec settings for encode mode
    pub encoding: EncodingConfig,
}

impl Default for TrimConfig {
    fn default() -> Self {
        Self {
            temp_dir: std::env::temp_dir(),
            tool_timeout: Duration::from_secs(DEFAULT_TOOL_TIMEOUT_SECS),
            ffmpeg_path: "ffmpeg".to_string(),
            ytdlp_path: "yt-dlp".to_string(),
            stderr_snippet_bytes: DEFAULT_STDERR_SNIPPET_BYTES,
            clip_filename: "clip.mp4".to_string(),
            section_force_keyframes: false,
            encoding: EncodingConfig::default(),
        }
    }
}

impl TrimConfig {
    /// Create config from environment variables.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        let encoding = EncodingConfig {
            codec: env_or("ENCODE_VIDEO_CODEC", defaults.encoding.codec.clone()),
            audio_codec: env_or("ENCODE_AUDIO_CODEC", defaults.encoding.audio_codec.clone()),
            preset: env_or("ENCODE_PRESET", defaults.encoding.preset.clone()),
            crf: std::env::var("ENCODE_CRF").ok().and_then(|s| s.parse().ok()),
            extra_args: Vec::new(),
        };

        Self {
            temp_dir: std::env::var("TRIM_TEMP_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.temp_dir),
            tool_timeout: Duration::from_secs(
                std::env::var("TOOL_TIMEOUT_SECS")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(DEFAULT_TOOL_TIMEOUT_SECS),
            ),
            ffmpeg_path: env_or("FFMPEG_PATH", defaults.ffmpeg_path),
            ytdlp_path: env_or("YTDLP_PATH", defaults.ytdlp_path),
            stderr_snippet_bytes: std::env::var("STDERR_SNIPPET_BYTES")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(DEFAULT_STDERR_SNIPPET_BYTES),
            clip_filename: env_or("CLIP_FILENAME", defaults.clip_filename),
            section_force_keyframes: std::env::var("SECTION_FORCE_KEYFRAMES")
                .map(|v| v == "true" || v == "1")
                .unwrap_or(false),
            encoding,
        }
    }

    /// Builder-style override of the temp directory.
    pub fn with_temp_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.temp_dir = dir.into();
        self
    }
}

fn env_or(key: &str, default: String) -> String {
    std::env::var(key)
        .ok()
        .filter(|v| !v.trim().is_empty())
        .unwrap_or(default)
}
