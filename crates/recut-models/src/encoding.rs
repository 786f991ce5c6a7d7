//! Encode-mode configuration for the extractor.
//!
//! Codec choices are configuration, not contract: copy mode never looks at
//! these values.

use serde::{Deserialize, Serialize};

/// Default video codec (H.264)
pub const DEFAULT_VIDEO_CODEC: &str = "libx264";
/// Default audio codec
pub const DEFAULT_AUDIO_CODEC: &str = "aac";
/// Default encoding preset, tuned for request latency rather than size
pub const DEFAULT_PRESET: &str = "veryfast";

/// Video/audio codec settings used when re-encoding a clip.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EncodingConfig {
    /// Video codec (e.g., "libx264", "h264_nvenc")
    #[serde(default = "default_video_codec")]
    pub codec: String,

    /// Encoding preset (e.g., "veryfast", "medium")
    #[serde(default = "default_preset")]
    pub preset: String,

    /// Constant Rate Factor; encoder default when unset
    #[serde(default)]
    pub crf: Option<u8>,

    /// Audio codec
    #[serde(default = "default_audio_codec")]
    pub audio_codec: String,

    /// Additional FFmpeg output arguments
    #[serde(default)]
    pub extra_args: Vec<String>,
}

fn default_video_codec() -> String {
    DEFAULT_VIDEO_CODEC.to_string()
}
fn default_preset() -> String {
    DEFAULT_PRESET.to_string()
}
fn default_audio_codec() -> String {
    DEFAULT_AUDIO_CODEC.to_string()
}

impl Default for EncodingConfig {
    fn default() -> Self {
        Self {
            codec: DEFAULT_VIDEO_CODEC.to_string(),
            preset: DEFAULT_PRESET.to_string(),
            crf: None,
            audio_codec: DEFAULT_AUDIO_CODEC.to_string(),
            extra_args: Vec::new(),
        }
    }
}

impl EncodingConfig {
    /// Returns a new config with updated CRF.
    pub fn with_crf(mut self, crf: u8) -> Self {
        self.crf = Some(crf);
        self
    }

    /// Convert to FFmpeg output arguments.
    pub fn to_ffmpeg_args(&self) -> Vec<String> {
        let mut args = vec![
            "-c:v".to_string(),
            self.codec.clone(),
            "-c:a".to_string(),
            self.audio_codec.clone(),
            "-preset".to_string(),
            self.preset.clone(),
        ];

        if let Some(crf) = self.crf {
            args.extend_from_slice(&["-crf".to_string(), crf.to_string()]);
        }

        args.extend(self.extra_args.iter().cloned());
        args
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_args() {
        let args = EncodingConfig::default().to_ffmpeg_args();
        assert_eq!(
            args,
            vec!["-c:v", "libx264", "-c:a", "aac", "-preset", "veryfast"]
        );
    }

    #[test]
    fn test_crf_and_extra_args() {
        let mut config = EncodingConfig::default().with_crf(23);
        config.extra_args = vec!["-pix_fmt".into(), "yuv420p".into()];
        let args = config.to_ffmpeg_args();
        assert!(args.windows(2).any(|w| w == ["-crf", "23"]));
        assert_eq!(args[args.len() - 2..], ["-pix_fmt", "yuv420p"]);
    }
}
