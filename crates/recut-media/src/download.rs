//! Fallback downloads using yt-dlp.
//!
//! Two strategies, tried in this order by the pipeline:
//! - a section download (`--download-sections`) that fetches only the
//!   requested range and is itself the finished clip;
//! - a full download recoded to MP4, which the extractor then trims.

use tracing::{info, warn};

use recut_models::ClipSpan;

use crate::error::{MediaError, MediaResult};
use crate::pipeline::TrimTools;
use crate::runner::{run_attempt, Attempt, Tool, ToolInvocation};
use crate::temp::TempArtifact;

/// Prefer HLS renditions, which support ranged section downloads.
const SECTION_FORMAT: &str = "bv*[ext=mp4][protocol=m3u8_native]+ba[ext=m4a][protocol=m3u8_native]/bv*[ext=mp4]+ba[ext=m4a]/b[ext=mp4]/b";

/// Format selector for whole-asset downloads.
const FULL_FORMAT: &str = "best[ext=mp4]/best";

/// Downloads remote media into request-scoped temp files.
pub struct Downloader<'a> {
    tools: &'a TrimTools,
}

impl<'a> Downloader<'a> {
    pub fn new(tools: &'a TrimTools) -> Self {
        Self { tools }
    }

    fn base_args() -> Vec<String> {
        vec![
            "--no-playlist".to_string(),
            "--no-warnings".to_string(),
            "--no-progress".to_string(),
            "--force-overwrites".to_string(),
        ]
    }

    /// Build the yt-dlp command for a section download.
    pub fn section_invocation(&self, url: &str, span: ClipSpan, output: &TempArtifact) -> ToolInvocation {
        let (start, end) = span.whole_seconds();
        let mut args = Self::base_args();
        args.extend([
            "--download-sections".to_string(),
            format!("*{}-{}", start, end),
            "-f".to_string(),
            SECTION_FORMAT.to_string(),
            "--merge-output-format".to_string(),
            "mp4".to_string(),
        ]);
        if self.tools.config.section_force_keyframes {
            args.push("--force-keyframes-at-cuts".to_string());
        }
        args.extend(["-o".to_string(), output.arg(), url.to_string()]);
        ToolInvocation::new(Tool::YtDlp, self.tools.config.ytdlp_path.clone(), args)
    }

    /// Build the yt-dlp command for a full download recoded to MP4.
    pub fn full_invocation(&self, url: &str, output: &TempArtifact) -> ToolInvocation {
        let mut args = Self::base_args();
        args.extend([
            "-f".to_string(),
            FULL_FORMAT.to_string(),
            "--recode-video".to_string(),
            "mp4".to_string(),
            "-o".to_string(),
            output.arg(),
            url.to_string(),
        ]);
        ToolInvocation::new(Tool::YtDlp, self.tools.config.ytdlp_path.clone(), args)
    }

    /// Fetch only `[floor(start), floor(end)]` into `output`.
    pub async fn download_section(
        &self,
        url: &str,
        span: ClipSpan,
        output: &TempArtifact,
    ) -> MediaResult<()> {
        info!(
            url = %url,
            start = span.start,
            end = span.end,
            output = %output.path().display(),
            "Attempting section download"
        );
        let inv = self.section_invocation(url, span, output);
        self.finish(&inv, output, "section").await
    }

    /// Fetch and recode the whole asset into `output`.
    pub async fn download_full(&self, url: &str, output: &TempArtifact) -> MediaResult<()> {
        info!(
            url = %url,
            output = %output.path().display(),
            "Attempting full download"
        );
        let inv = self.full_invocation(url, output);
        self.finish(&inv, output, "full").await
    }

    async fn finish(&self, inv: &ToolInvocation, output: &TempArtifact, what: &str) -> MediaResult<()> {
        let snippet = self.tools.config.stderr_snippet_bytes;
        let attempt = run_attempt(self.tools.runner.as_ref(), inv, snippet).await?;
        output.sweep_leftovers().await;

        match attempt {
            Attempt::Succeeded(_) => match output.size().await {
                0 => {
                    warn!(output = %output.path().display(), "yt-dlp reported success but wrote nothing");
                    Err(MediaError::download_failed(format!("{what} download produced no output file")))
                }
                size => {
                    info!(
                        output = %output.path().display(),
                        size_mb = size as f64 / (1024.0 * 1024.0),
                        "Downloaded {} successfully",
                        what
                    );
                    Ok(())
                }
            },
            Attempt::Failed(detail) => {
                warn!(detail = %detail, "{} download failed", what);
                Err(MediaError::download_failed(detail))
            }
        }
    }
}
