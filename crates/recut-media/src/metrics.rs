//! Pipeline metrics.
//!
//! Emitted through the `metrics` facade; the API binary installs the
//! Prometheus recorder. Without a recorder these calls are no-ops.

use std::time::Duration;

use metrics::{counter, histogram};

use crate::runner::Tool;

/// Metric names as constants for consistency.
pub mod names {
    pub const TOOL_DURATION_SECONDS: &str = "recut_tool_duration_seconds";
    pub const TRIM_STRATEGY_TOTAL: &str = "recut_trim_strategy_total";
    pub const TRIMS_TOTAL: &str = "recut_trims_total";
}

/// Record wall time of one subprocess.
pub fn record_tool_duration(tool: Tool, elapsed: Duration) {
    let labels = [("tool", tool.as_str().to_string())];
    histogram!(names::TOOL_DURATION_SECONDS, &labels).record(elapsed.as_secs_f64());
}

/// Record one strategy attempt (`produced`, `skipped` or `failed`).
pub fn record_strategy(strategy: &str, result: &str) {
    let labels = [
        ("strategy", strategy.to_string()),
        ("result", result.to_string()),
    ];
    counter!(names::TRIM_STRATEGY_TOTAL, &labels).increment(1);
}

/// Record a finished trim by outcome (`ok` or an error kind).
pub fn record_trim(outcome: &str) {
    let labels = [("outcome", outcome.to_string())];
    counter!(names::TRIMS_TOTAL, &labels).increment(1);
}
