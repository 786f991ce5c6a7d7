//! Trim pipeline: classification, resolution and ordered fallback strategies.
//!
//! ```text
//! classify ──► resolvable? ──► probe yt-dlp (fatal if missing) ──► resolve
//!                  │                                                  │
//!                  └─ no: source = url                                │
//!                                                                     ▼
//!   ExtractDirect ──fail──► DownloadSection ──fail──► DownloadFullThenExtract
//!        │                        │                           │
//!        └────────── first success wins, temp files dropped ──┘
//! ```
//!
//! Stages run strictly in sequence; each strategy is independent and the
//! driver never loops.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, info, warn};

use recut_models::{classify_url, ClipOutput, ClipSpan, ResolvedSource, TrimRequest};

use crate::config::TrimConfig;
use crate::download::Downloader;
use crate::error::{MediaError, MediaResult};
use crate::extract::Extractor;
use crate::metrics;
use crate::resolve::RemoteResolver;
use crate::runner::ToolRunner;
use crate::temp::TempArtifact;

/// Runner plus configuration, shared by every stage.
#[derive(Clone)]
pub struct TrimTools {
    pub runner: Arc<dyn ToolRunner>,
    pub config: Arc<TrimConfig>,
}

impl TrimTools {
    pub fn new(runner: Arc<dyn ToolRunner>, config: Arc<TrimConfig>) -> Self {
        Self { runner, config }
    }
}

/// Per-request state visible to strategies.
#[derive(Debug, Clone)]
pub struct TrimContext<'a> {
    /// URL exactly as submitted
    pub url: &'a str,
    pub span: ClipSpan,
    /// Owner tag for temp files (request id)
    pub owner: &'a str,
    /// Direct source, when classification or resolution produced one
    pub source: Option<ResolvedSource>,
}

/// Result of one strategy.
#[derive(Debug)]
pub enum StrategyResult {
    Produced(ClipOutput),
    Skipped(&'static str),
    Failed(MediaError),
}

/// One way of turning a request into a clip.
#[async_trait]
pub trait TrimStrategy: Send + Sync {
    /// Strategy name for logs, metrics and the response header.
    fn name(&self) -> &'static str;

    async fn attempt(&self, tools: &TrimTools, ctx: &TrimContext<'_>) -> StrategyResult;
}

impl From<MediaResult<ClipOutput>> for StrategyResult {
    fn from(result: MediaResult<ClipOutput>) -> Self {
        match result {
            Ok(clip) => StrategyResult::Produced(clip),
            Err(e) => StrategyResult::Failed(e),
        }
    }
}

/// Cut straight from the resolved (or direct) remote URL.
pub struct ExtractDirect;

#[async_trait]
impl TrimStrategy for ExtractDirect {
    fn name(&self) -> &'static str {
        "extract_direct"
    }

    async fn attempt(&self, tools: &TrimTools, ctx: &TrimContext<'_>) -> StrategyResult {
        let Some(source) = &ctx.source else {
            return StrategyResult::Skipped("no direct source");
        };
        Extractor::new(tools)
            .extract_with_fallback(source, ctx.span, ctx.owner)
            .await
            .into()
    }
}

/// Download only the requested section; the download is the clip.
pub struct DownloadSection;

#[async_trait]
impl TrimStrategy for DownloadSection {
    fn name(&self) -> &'static str {
        "download_section"
    }

    async fn attempt(&self, tools: &TrimTools, ctx: &TrimContext<'_>) -> StrategyResult {
        let artifact = match TempArtifact::create_for_download(&tools.config.temp_dir, ctx.owner, "mp4") {
            Ok(artifact) => artifact,
            Err(e) => return StrategyResult::Failed(e.into()),
        };
        if let Err(e) = Downloader::new(tools)
            .download_section(ctx.url, ctx.span, &artifact)
            .await
        {
            return StrategyResult::Failed(e);
        }

        match artifact.read_bytes().await {
            Ok(bytes) => StrategyResult::Produced(ClipOutput::mp4(bytes, tools.config.clip_filename.clone())),
            Err(e) => StrategyResult::Failed(MediaError::download_failed(format!(
                "section download unreadable: {e}"
            ))),
        }
    }
}

/// Download the whole asset, then extract from the local copy.
pub struct DownloadFullThenExtract;

#[async_trait]
impl TrimStrategy for DownloadFullThenExtract {
    fn name(&self) -> &'static str {
        "download_full"
    }

    async fn attempt(&self, tools: &TrimTools, ctx: &TrimContext<'_>) -> StrategyResult {
        let artifact = match TempArtifact::create_for_download(&tools.config.temp_dir, ctx.owner, "mp4") {
            Ok(artifact) => artifact,
            Err(e) => return StrategyResult::Failed(e.into()),
        };
        if let Err(e) = Downloader::new(tools).download_full(ctx.url, &artifact).await {
            return StrategyResult::Failed(e);
        }

        let local = ResolvedSource::local(artifact.path());
        Extractor::new(tools)
            .extract_with_fallback(&local, ctx.span, ctx.owner)
            .await
            .into()
    }
}

/// A produced clip and the strategy that produced it.
#[derive(Debug)]
pub struct TrimOutcome {
    pub clip: ClipOutput,
    pub strategy: &'static str,
}

/// Ordered strategy driver.
pub struct TrimPipeline {
    tools: TrimTools,
    strategies: Vec<Box<dyn TrimStrategy>>,
}

impl TrimPipeline {
    /// Pipeline with the standard strategy order.
    pub fn new(tools: TrimTools) -> Self {
        Self::with_strategies(
            tools,
            vec![
                Box::new(ExtractDirect),
                Box::new(DownloadSection),
                Box::new(DownloadFullThenExtract),
            ],
        )
    }

    pub fn with_strategies(tools: TrimTools, strategies: Vec<Box<dyn TrimStrategy>>) -> Self {
        Self { tools, strategies }
    }

    pub fn tools(&self) -> &TrimTools {
        &self.tools
    }

    /// Produce the requested clip or the error from the last strategy tried.
    pub async fn run(&self, request: &TrimRequest, owner: &str) -> MediaResult<TrimOutcome> {
        let result = self.run_inner(request, owner).await;
        match &result {
            Ok(_) => metrics::record_trim("ok"),
            Err(e) => metrics::record_trim(e.kind()),
        }
        result
    }

    async fn run_inner(&self, request: &TrimRequest, owner: &str) -> MediaResult<TrimOutcome> {
        let span = request.span();
        let class = classify_url(&request.url);
        info!(
            url = %request.url,
            start = span.start,
            duration = span.duration(),
            resolvable = class.resolvable,
            "Starting trim"
        );

        let source = if class.resolvable {
            self.resolve(&request.url).await?
        } else {
            Some(ResolvedSource::remote(&request.url))
        };

        let ctx = TrimContext {
            url: &request.url,
            span,
            owner,
            source,
        };

        let mut last_error = None;
        for strategy in &self.strategies {
            let name = strategy.name();
            match strategy.attempt(&self.tools, &ctx).await {
                StrategyResult::Produced(clip) => {
                    metrics::record_strategy(name, "produced");
                    info!(strategy = name, bytes = clip.len(), "Trim complete");
                    return Ok(TrimOutcome { clip, strategy: name });
                }
                StrategyResult::Skipped(reason) => {
                    metrics::record_strategy(name, "skipped");
                    debug!(strategy = name, reason, "Strategy skipped");
                }
                StrategyResult::Failed(e) if e.is_fatal() => {
                    metrics::record_strategy(name, "failed");
                    warn!(strategy = name, error = %e, "Fatal error, aborting trim");
                    return Err(e);
                }
                StrategyResult::Failed(e) => {
                    metrics::record_strategy(name, "failed");
                    warn!(strategy = name, error = %e, "Strategy failed, falling back");
                    last_error = Some(e);
                }
            }
        }

        Err(last_error.unwrap_or_else(|| MediaError::internal("no trim strategy produced a clip")))
    }

    /// Probe then resolve. Only a missing tool is fatal here.
    async fn resolve(&self, url: &str) -> MediaResult<Option<ResolvedSource>> {
        let resolver = RemoteResolver::new(&self.tools);
        resolver.probe().await?;

        match resolver.resolve(url).await {
            Ok(source) => Ok(Some(source)),
            Err(e) if e.is_fatal() => Err(e),
            Err(e) => {
                warn!(url = %url, error = %e, "Remote resolution failed, falling back to download");
                Ok(None)
            }
        }
    }
}
