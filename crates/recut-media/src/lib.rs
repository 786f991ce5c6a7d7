//! ffmpeg / yt-dlp wrappers and the trim pipeline.
//!
//! This crate provides:
//! - A uniform, timeout-bounded subprocess runner (`ToolRunner`)
//! - Type-safe ffmpeg command building
//! - Scoped temporary files that delete themselves on every exit path
//! - yt-dlp metadata resolution and section/full downloads
//! - Copy-then-encode clip extraction
//! - An ordered strategy driver that turns a trim request into MP4 bytes

pub mod command;
pub mod config;
pub mod download;
pub mod error;
pub mod extract;
pub mod metrics;
pub mod pipeline;
pub mod resolve;
pub mod runner;
pub mod temp;

#[cfg(any(test, feature = "test-support"))]
pub mod testing;

pub use command::{check_tool, FfmpegCommand};
pub use config::TrimConfig;
pub use download::Downloader;
pub use error::{MediaError, MediaResult};
pub use extract::Extractor;
pub use pipeline::{
    DownloadFullThenExtract, DownloadSection, ExtractDirect, StrategyResult, TrimContext,
    TrimOutcome, TrimPipeline, TrimStrategy, TrimTools,
};
pub use resolve::{select_source, RemoteResolver, YtDlpFormat, YtDlpMetadata};
pub use runner::{truncate_stderr, ProcessResult, SystemToolRunner, Tool, ToolInvocation, ToolRunner};
pub use temp::TempArtifact;
