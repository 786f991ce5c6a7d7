//! Application state.

use std::sync::Arc;

use anyhow::Context;
use tokio::sync::Semaphore;

use recut_media::{SystemToolRunner, ToolRunner, TrimPipeline, TrimTools};

use crate::config::ApiConfig;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub config: ApiConfig,
    pub pipeline: Arc<TrimPipeline>,
    /// Admission control for trims; `None` when unlimited
    pub trim_slots: Option<Arc<Semaphore>>,
}

impl AppState {
    /// Create application state backed by real subprocesses.
    pub fn new(config: ApiConfig) -> anyhow::Result<Self> {
        std::fs::create_dir_all(&config.trim.temp_dir).with_context(|| {
            format!(
                "failed to create temp dir {}",
                config.trim.temp_dir.display()
            )
        })?;
        let runner = Arc::new(SystemToolRunner::new(config.trim.tool_timeout));
        Ok(Self::with_runner(config, runner))
    }

    /// Create application state around any tool runner.
    pub fn with_runner(config: ApiConfig, runner: Arc<dyn ToolRunner>) -> Self {
        let tools = TrimTools::new(runner, Arc::new(config.trim.clone()));
        let trim_slots = match config.max_concurrent_trims {
            0 => None,
            n => Some(Arc::new(Semaphore::new(n))),
        };

        Self {
            config,
            pipeline: Arc::new(TrimPipeline::new(tools)),
            trim_slots,
        }
    }
}
