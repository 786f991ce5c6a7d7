//! Media sources handed to the extractor.

use std::collections::BTreeMap;
use std::fmt;
use std::path::Path;

use serde::{Deserialize, Serialize};

/// Where the extractor reads from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceKind {
    LocalFile,
    RemoteUrl,
}

impl fmt::Display for SourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SourceKind::LocalFile => write!(f, "local_file"),
            SourceKind::RemoteUrl => write!(f, "remote_url"),
        }
    }
}

/// One ffmpeg input: a location plus the HTTP headers needed to fetch it.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct SourceInput {
    pub location: String,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub headers: BTreeMap<String, String>,
}

impl SourceInput {
    pub fn new(location: impl Into<String>) -> Self {
        Self {
            location: location.into(),
            headers: BTreeMap::new(),
        }
    }

    pub fn with_headers(mut self, headers: BTreeMap<String, String>) -> Self {
        self.headers = headers;
        self
    }
}

/// A source the extractor can open.
///
/// Request-scoped and owned by the single in-flight trim. When yt-dlp
/// selects separate video and audio encodings, `audio` carries the second
/// input.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolvedSource {
    pub kind: SourceKind,
    pub primary: SourceInput,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub audio: Option<SourceInput>,
}

impl ResolvedSource {
    /// A direct remote URL with no extra headers.
    pub fn remote(url: impl Into<String>) -> Self {
        Self {
            kind: SourceKind::RemoteUrl,
            primary: SourceInput::new(url),
            audio: None,
        }
    }

    /// A remote URL that must be fetched with the given headers.
    pub fn remote_with_headers(url: impl Into<String>, headers: BTreeMap<String, String>) -> Self {
        Self {
            kind: SourceKind::RemoteUrl,
            primary: SourceInput::new(url).with_headers(headers),
            audio: None,
        }
    }

    /// A file on local disk.
    pub fn local(path: impl AsRef<Path>) -> Self {
        Self {
            kind: SourceKind::LocalFile,
            primary: SourceInput::new(path.as_ref().to_string_lossy()),
            audio: None,
        }
    }

    /// Attach a separate audio input.
    pub fn with_audio(mut self, audio: SourceInput) -> Self {
        self.audio = Some(audio);
        self
    }

    pub fn location(&self) -> &str {
        &self.primary.location
    }

    pub fn headers(&self) -> &BTreeMap<String, String> {
        &self.primary.headers
    }

    pub fn is_remote(&self) -> bool {
        self.kind == SourceKind::RemoteUrl
    }
}

/// How the extractor produces its output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExtractMode {
    /// Stream copy, no re-encoding.
    Copy,
    /// Full re-encode of video and audio.
    Encode,
}

impl ExtractMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            ExtractMode::Copy => "copy",
            ExtractMode::Encode => "encode",
        }
    }
}

impl fmt::Display for ExtractMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_constructors() {
        let src = ResolvedSource::remote("https://cdn.example.com/a.mp4");
        assert!(src.is_remote());
        assert!(src.headers().is_empty());
        assert!(src.audio.is_none());

        let local = ResolvedSource::local("/tmp/x.mp4");
        assert_eq!(local.kind, SourceKind::LocalFile);
        assert_eq!(local.location(), "/tmp/x.mp4");
    }

    #[test]
    fn test_headers_serialization_skipped_when_empty() {
        let json = serde_json::to_value(ResolvedSource::remote("u")).unwrap();
        assert!(json["primary"].get("headers").is_none());
        assert_eq!(json["kind"], "remote_url");
    }
}
