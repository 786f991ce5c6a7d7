//! Uniform subprocess execution for ffmpeg and yt-dlp.
//!
//! Every external tool call in the pipeline goes through [`ToolRunner`], so
//! tests can swap in a scripted runner and production gets one place that
//! enforces the timeout and kills children whose request went away.

use std::fmt;
use std::io::ErrorKind;
use std::process::Stdio;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use tokio::process::Command;
use tracing::{debug, warn};

use crate::error::{MediaError, MediaResult};
use crate::metrics;

/// External tools the pipeline knows about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Tool {
    Ffmpeg,
    YtDlp,
}

impl Tool {
    pub fn as_str(&self) -> &'static str {
        match self {
            Tool::Ffmpeg => "ffmpeg",
            Tool::YtDlp => "yt-dlp",
        }
    }
}

impl fmt::Display for Tool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A fully-built command line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolInvocation {
    pub tool: Tool,
    pub program: String,
    pub args: Vec<String>,
}

impl ToolInvocation {
    pub fn new(tool: Tool, program: impl Into<String>, args: Vec<String>) -> Self {
        Self {
            tool,
            program: program.into(),
            args,
        }
    }

    /// Value following `flag`, if present.
    pub fn arg_after(&self, flag: &str) -> Option<&str> {
        self.args
            .iter()
            .position(|a| a == flag)
            .and_then(|i| self.args.get(i + 1))
            .map(String::as_str)
    }

    pub fn has_arg(&self, arg: &str) -> bool {
        self.args.iter().any(|a| a == arg)
    }
}

/// Output of one subprocess invocation.
///
/// Exit code 0 is the only success signal; stderr is diagnostic only.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProcessResult {
    /// `None` when the process was terminated by a signal
    pub exit_code: Option<i32>,
    pub stdout: Vec<u8>,
    pub stderr: Vec<u8>,
}

impl ProcessResult {
    pub fn success(&self) -> bool {
        self.exit_code == Some(0)
    }

    /// Lossy, truncated stderr for error details.
    pub fn stderr_snippet(&self, max_bytes: usize) -> String {
        truncate_stderr(&self.stderr, max_bytes)
    }
}

/// Runs external tools.
#[async_trait]
pub trait ToolRunner: Send + Sync {
    /// Run to completion.
    ///
    /// Returns `Ok` for any process that exited, whatever its status.
    /// `ToolUnavailable` when the binary cannot be spawned, `Timeout` when
    /// it outlives the runner's bound.
    async fn run(&self, invocation: &ToolInvocation) -> MediaResult<ProcessResult>;
}

/// Runner backed by `tokio::process`.
///
/// Children are spawned with `kill_on_drop`, so dropping the future (client
/// disconnect, timeout) terminates the process.
#[derive(Debug, Clone)]
pub struct SystemToolRunner {
    timeout: Duration,
}

impl SystemToolRunner {
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }
}

#[async_trait]
impl ToolRunner for SystemToolRunner {
    async fn run(&self, invocation: &ToolInvocation) -> MediaResult<ProcessResult> {
        debug!(
            "Running {}: {} {}",
            invocation.tool,
            invocation.program,
            invocation.args.join(" ")
        );

        let child = Command::new(&invocation.program)
            .args(&invocation.args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| match e.kind() {
                ErrorKind::NotFound | ErrorKind::PermissionDenied => {
                    warn!(program = %invocation.program, error = %e, "Failed to spawn tool");
                    MediaError::tool_unavailable(invocation.tool.as_str())
                }
                _ => MediaError::Io(e),
            })?;

        let started = Instant::now();
        let output = match tokio::time::timeout(self.timeout, child.wait_with_output()).await {
            Ok(output) => output?,
            Err(_) => {
                // child was dropped with the future; kill_on_drop reaps it
                warn!(
                    tool = %invocation.tool,
                    timeout_secs = self.timeout.as_secs(),
                    "Tool timed out, killing process"
                );
                metrics::record_tool_duration(invocation.tool, started.elapsed());
                return Err(MediaError::Timeout {
                    tool: invocation.tool.to_string(),
                    secs: self.timeout.as_secs(),
                });
            }
        };
        metrics::record_tool_duration(invocation.tool, started.elapsed());

        let result = ProcessResult {
            exit_code: output.status.code(),
            stdout: output.stdout,
            stderr: output.stderr,
        };

        if !result.success() {
            debug!(
                tool = %invocation.tool,
                exit_code = ?result.exit_code,
                stderr = %String::from_utf8_lossy(&result.stderr),
                "Tool exited with failure"
            );
        }

        Ok(result)
    }
}

/// Outcome of one fallible tool attempt inside a strategy.
#[derive(Debug)]
pub(crate) enum Attempt {
    Succeeded(ProcessResult),
    /// Non-zero exit or timeout, with a truncated diagnostic
    Failed(String),
}

/// Run an invocation, folding non-fatal failures into [`Attempt::Failed`].
///
/// Only fatal errors (tool missing, IO) are returned as `Err`.
pub(crate) async fn run_attempt(
    runner: &dyn ToolRunner,
    invocation: &ToolInvocation,
    snippet_bytes: usize,
) -> MediaResult<Attempt> {
    match runner.run(invocation).await {
        Ok(result) if result.success() => Ok(Attempt::Succeeded(result)),
        Ok(result) => {
            let mut detail = result.stderr_snippet(snippet_bytes);
            if detail.is_empty() {
                detail = format!("{} exited with status {:?}", invocation.tool, result.exit_code);
            }
            Ok(Attempt::Failed(detail))
        }
        Err(e @ MediaError::Timeout { .. }) => Ok(Attempt::Failed(e.to_string())),
        Err(e) => Err(e),
    }
}

/// Lossy-decode and truncate stderr to at most `max_bytes`, on a char boundary.
pub fn truncate_stderr(stderr: &[u8], max_bytes: usize) -> String {
    let text = String::from_utf8_lossy(stderr);
    let text = text.trim();
    if text.len() <= max_bytes {
        return text.to_string();
    }
    let mut end = max_bytes;
    while !text.is_char_boundary(end) {
        end -= 1;
    }
    text[..end].to_string()
}
