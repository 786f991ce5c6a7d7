//! FFmpeg command builder.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use crate::error::{MediaError, MediaResult};

/// One `-i` input and the options that precede it.
#[derive(Debug, Clone)]
struct FfmpegInput {
    location: String,
    args: Vec<String>,
}

/// Builder for FFmpeg commands.
///
/// Input options (`seek`, `duration`, `headers`, `input_arg`) apply to the
/// most recently added input.
#[derive(Debug, Clone)]
pub struct FfmpegCommand {
    inputs: Vec<FfmpegInput>,
    /// Output file path
    output: PathBuf,
    /// Output arguments (after the last -i)
    output_args: Vec<String>,
    /// Whether to overwrite output
    overwrite: bool,
    /// Log level
    log_level: String,
}

impl FfmpegCommand {
    /// Create a new FFmpeg command with a single input.
    pub fn new(input: impl Into<String>, output: impl AsRef<Path>) -> Self {
        Self {
            inputs: vec![FfmpegInput {
                location: input.into(),
                args: Vec::new(),
            }],
            output: output.as_ref().to_path_buf(),
            output_args: Vec::new(),
            overwrite: true,
            log_level: "error".to_string(),
        }
    }

    /// Start another input; later input options apply to it.
    pub fn add_input(mut self, input: impl Into<String>) -> Self {
        self.inputs.push(FfmpegInput {
            location: input.into(),
            args: Vec::new(),
        });
        self
    }

    /// Add an argument before the current input's -i.
    pub fn input_arg(mut self, arg: impl Into<String>) -> Self {
        if let Some(input) = self.inputs.last_mut() {
            input.args.push(arg.into());
        }
        self
    }

    /// Add output arguments (after -i).
    pub fn output_arg(mut self, arg: impl Into<String>) -> Self {
        self.output_args.push(arg.into());
        self
    }

    /// Add multiple output arguments.
    pub fn output_args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.output_args.extend(args.into_iter().map(Into::into));
        self
    }

    /// Set seek position (before input).
    pub fn seek(self, seconds: f64) -> Self {
        self.input_arg("-ss").input_arg(format!("{:.3}", seconds))
    }

    /// Set duration (before input).
    pub fn duration(self, seconds: f64) -> Self {
        self.input_arg("-t").input_arg(format!("{:.3}", seconds))
    }

    /// Attach HTTP request headers to the current input.
    ///
    /// Values are passed through verbatim as `Key: Value\r\n` lines.
    pub fn headers(self, headers: &BTreeMap<String, String>) -> Self {
        if headers.is_empty() {
            return self;
        }
        let block: String = headers
            .iter()
            .map(|(k, v)| format!("{}: {}\r\n", k, v))
            .collect();
        self.input_arg("-headers").input_arg(block)
    }

    /// Copy all streams without re-encoding.
    pub fn codec_copy(self) -> Self {
        self.output_arg("-c").output_arg("copy")
    }

    /// Select a stream for the output.
    pub fn map(self, spec: impl Into<String>) -> Self {
        self.output_arg("-map").output_arg(spec)
    }

    /// Fragmented MP4 output, valid even if writing stops early.
    pub fn fragmented_mp4(self) -> Self {
        self.output_arg("-movflags")
            .output_arg("frag_keyframe+empty_moov")
            .output_arg("-f")
            .output_arg("mp4")
    }

    /// Set log level.
    pub fn log_level(mut self, level: impl Into<String>) -> Self {
        self.log_level = level.into();
        self
    }

    /// Build the command arguments.
    pub fn build_args(&self) -> Vec<String> {
        let mut args = Vec::new();

        if self.overwrite {
            args.push("-y".to_string());
        }
        args.push("-nostdin".to_string());
        args.push("-v".to_string());
        args.push(self.log_level.clone());

        for input in &self.inputs {
            args.extend(input.args.iter().cloned());
            args.push("-i".to_string());
            args.push(input.location.clone());
        }

        args.extend(self.output_args.iter().cloned());
        args.push(self.output.to_string_lossy().to_string());

        args
    }
}

/// Check if a tool binary resolves on PATH (or as a path).
pub fn check_tool(program: &str) -> MediaResult<PathBuf> {
    which::which(program).map_err(|_| MediaError::tool_unavailable(program))
}
