//! Clip extraction with ffmpeg.
//!
//! Copy mode is tried first because it is nearly free; it fails on cut
//! points that don't line up with keyframes the container can start on.
//! Encode mode always works and is the single automatic retry.

use tracing::{info, warn};

use recut_models::{ClipOutput, ClipSpan, ExtractMode, ResolvedSource};

use crate::command::FfmpegCommand;
use crate::error::{MediaError, MediaResult};
use crate::pipeline::TrimTools;
use crate::runner::{run_attempt, truncate_stderr, Attempt, Tool, ToolInvocation};
use crate::temp::TempArtifact;

/// Cuts time ranges out of a resolved source.
pub struct Extractor<'a> {
    tools: &'a TrimTools,
}

impl<'a> Extractor<'a> {
    pub fn new(tools: &'a TrimTools) -> Self {
        Self { tools }
    }

    /// Build the ffmpeg command for one mode.
    pub fn invocation(
        &self,
        source: &ResolvedSource,
        span: ClipSpan,
        mode: ExtractMode,
        output: &TempArtifact,
    ) -> ToolInvocation {
        let duration = span.duration();

        let mut cmd = FfmpegCommand::new(source.location(), output.path()).seek(span.start).duration(duration);
        if source.is_remote() {
            cmd = cmd.headers(source.headers());
        }

        if let Some(audio) = &source.audio {
            cmd = cmd
                .add_input(audio.location.clone())
                .seek(span.start)
                .duration(duration);
            if source.is_remote() {
                cmd = cmd.headers(&audio.headers);
            }
            cmd = cmd.map("0:v:0").map("1:a:0");
        }

        cmd = match mode {
            ExtractMode::Copy => cmd.codec_copy(),
            ExtractMode::Encode => cmd.output_args(self.tools.config.encoding.to_ffmpeg_args()),
        };

        let args = cmd.fragmented_mp4().build_args();
        ToolInvocation::new(Tool::Ffmpeg, self.tools.config.ffmpeg_path.clone(), args)
    }

    /// Run one mode into a fresh temp file.
    ///
    /// `Ok(Err(detail))` is a non-fatal failed attempt. The output file is
    /// removed when this returns either way.
    async fn attempt(
        &self,
        source: &ResolvedSource,
        span: ClipSpan,
        mode: ExtractMode,
        owner: &str,
    ) -> MediaResult<Result<ClipOutput, String>> {
        let output = TempArtifact::create(&self.tools.config.temp_dir, owner, "mp4")?;
        let inv = self.invocation(source, span, mode, &output);
        let snippet = self.tools.config.stderr_snippet_bytes;

        let detail = match run_attempt(self.tools.runner.as_ref(), &inv, snippet).await? {
            Attempt::Succeeded(_) => match output.read_bytes().await {
                Ok(bytes) if !bytes.is_empty() => {
                    info!(
                        mode = %mode,
                        kind = %source.kind,
                        bytes = bytes.len(),
                        "Extracted clip"
                    );
                    return Ok(Ok(ClipOutput::mp4(bytes, self.tools.config.clip_filename.clone())));
                }
                Ok(_) => "ffmpeg produced an empty file".to_string(),
                Err(e) => format!("ffmpeg output unreadable: {}", e),
            },
            Attempt::Failed(detail) => detail,
        };

        warn!(mode = %mode, kind = %source.kind, detail = %detail, "Extraction attempt failed");
        Ok(Err(detail))
    }

    /// Extract in a single mode.
    pub async fn extract(
        &self,
        source: &ResolvedSource,
        span: ClipSpan,
        mode: ExtractMode,
        owner: &str,
    ) -> MediaResult<ClipOutput> {
        self.attempt(source, span, mode, owner)
            .await?
            .map_err(|detail| self.failure(format!("{mode}: {detail}")))
    }

    /// Copy mode, then exactly one encode-mode retry on failure.
    pub async fn extract_with_fallback(
        &self,
        source: &ResolvedSource,
        span: ClipSpan,
        owner: &str,
    ) -> MediaResult<ClipOutput> {
        let copy_detail = match self.attempt(source, span, ExtractMode::Copy, owner).await? {
            Ok(clip) => return Ok(clip),
            Err(detail) => detail,
        };

        info!("Stream copy failed, retrying with re-encode");
        match self.attempt(source, span, ExtractMode::Encode, owner).await? {
            Ok(clip) => Ok(clip),
            Err(encode_detail) => Err(self.failure(format!(
                "copy: {copy_detail} | encode: {encode_detail}"
            ))),
        }
    }

    /// `ExtractFailed` with the detail held to the configured snippet size.
    fn failure(&self, detail: String) -> MediaError {
        MediaError::extract_failed(truncate_stderr(
            detail.as_bytes(),
            self.tools.config.stderr_snippet_bytes,
        ))
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;
    use std::sync::Arc;

    use super::*;
    use crate::config::TrimConfig;
    use crate::testing::{Call, Reply, ScriptedRunner};
    use recut_models::SourceInput;
    use tempfile::TempDir;

    fn headers(pairs: &[(&str, &str)]) -> BTreeMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_paired_source_maps_both_inputs() {
        let dir = TempDir::new().unwrap();
        let tools = TrimTools::new(
            Arc::new(ScriptedRunner::new()),
            Arc::new(TrimConfig::default().with_temp_dir(dir.path())),
        );
        let out = TempArtifact::create(dir.path(), "req", "mp4").unwrap();
        let source = ResolvedSource::remote_with_headers("https://v", headers(&[("Cookie", "a=1")]))
            .with_audio(SourceInput::new("https://a").with_headers(headers(&[("Cookie", "b=2")])));

        let inv = Extractor::new(&tools).invocation(
            &source,
            ClipSpan::new(1.0, 4.0),
            ExtractMode::Copy,
            &out,
        );

        let args = &inv.args;
        let inputs: Vec<_> = args
            .windows(2)
            .filter(|w| w[0] == "-i")
            .map(|w| w[1].as_str())
            .collect();
        assert_eq!(inputs, ["https://v", "https://a"]);
        let header_blocks: Vec<_> = args
            .windows(2)
            .filter(|w| w[0] == "-headers")
            .map(|w| w[1].as_str())
            .collect();
        assert_eq!(header_blocks, ["Cookie: a=1\r\n", "Cookie: b=2\r\n"]);
        assert!(args.windows(2).any(|w| w == ["-map", "0:v:0"]));
        assert!(args.windows(2).any(|w| w == ["-map", "1:a:0"]));
        assert_eq!(args.last().map(String::as_str), Some(out.arg().as_str()));
    }

    #[test]
    fn test_local_source_never_sends_headers() {
        let dir = TempDir::new().unwrap();
        let tools = TrimTools::new(
            Arc::new(ScriptedRunner::new()),
            Arc::new(TrimConfig::default().with_temp_dir(dir.path())),
        );
        let out = TempArtifact::create(dir.path(), "req", "mp4").unwrap();
        let mut source = ResolvedSource::local(dir.path().join("full.mp4"));
        source.primary.headers = headers(&[("Cookie", "stale")]);

        let inv = Extractor::new(&tools).invocation(
            &source,
            ClipSpan::new(0.0, 2.0),
            ExtractMode::Encode,
            &out,
        );
        assert!(!inv.has_arg("-headers"));
        assert_eq!(inv.arg_after("-preset"), Some("veryfast"));
    }

    #[tokio::test]
    async fn test_double_failure_detail_is_truncated_once() {
        let dir = TempDir::new().unwrap();
        let mut config = TrimConfig::default().with_temp_dir(dir.path());
        config.stderr_snippet_bytes = 40;
        let runner = ScriptedRunner::new()
            .on(Call::CopyExtract, Reply::fail("c".repeat(500)))
            .on(Call::EncodeExtract, Reply::fail("e".repeat(500)));
        let tools = TrimTools::new(Arc::new(runner), Arc::new(config));

        let err = Extractor::new(&tools)
            .extract_with_fallback(&ResolvedSource::remote("https://v"), ClipSpan::new(0.0, 1.0), "req")
            .await
            .unwrap_err();

        match err {
            MediaError::ExtractFailed { detail } => {
                assert_eq!(detail.len(), 40);
                assert!(detail.starts_with("copy: ccc"));
            }
            other => panic!("expected ExtractFailed, got {other:?}"),
        }
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
    }
}
