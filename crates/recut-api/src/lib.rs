//! Axum HTTP API server for clip trimming.
//!
//! This crate provides:
//! - `POST /trim`, returning the requested range as MP4 bytes
//! - `POST /process`, returning canned clip suggestions
//! - Liveness and tool-readiness probes
//! - Per-IP rate limiting, security headers and Prometheus metrics

pub mod config;
pub mod error;
pub mod handlers;
pub mod metrics;
pub mod middleware;
pub mod routes;
pub mod state;

pub use config::ApiConfig;
pub use error::{ApiError, ApiResult};
pub use routes::create_router;
pub use state::AppState;
