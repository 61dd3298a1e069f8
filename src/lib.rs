//! # quote-gate
//!
//! Load-adaptive admission and caching gateway in front of one serialized
//! quotes extractor.
//!
//! ## Overview
//!
//! A background monitor samples host CPU and memory and classifies pressure
//! into `normal`, `warn` or `throttle` with hysteresis. Every request to
//! `/quotes` is shaped by the current level: how long a cached result stays
//! valid, how long a caller may wait for admission, how much pacing delay is
//! added, and how often the resource is polled for readiness. Only one caller
//! at a time touches the resource; callers that cannot be admitted in time are
//! turned away with `429` rather than queued.
//!
//! ## Module Organization
//!
//! | Module | Description |
//! |--------|-------------|
//! | [`load`] | Load levels, thresholds and the sampling monitor |
//! | [`policy`] | Per-level cache TTL, pacing delay, admission timeout, poll floor |
//! | [`resilience`] | Admission limiter with live capacity changes |
//! | [`cache`] | Single-slot result cache with per-lookup TTL |
//! | [`extractor`] | The resource abstraction and the JSON snapshot extractor |
//! | [`pipeline`] | Per-request orchestration |
//! | [`context`] | Process-wide shared state |
//! | [`config`] | YAML and environment settings |
//! | [`server`] | `/health` and `/quotes` over axum |
//! | [`client`] | Consumer of a running gateway |
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use quote_gate::config::GateSettings;
//! use quote_gate::extractor::{resolve_target, SnapshotExtractor};
//! use quote_gate::load::SystemSampler;
//! use quote_gate::server::{self, ServerState};
//! use quote_gate::{GateContext, RequestPipeline};
//! use std::sync::Arc;
//! use tokio_util::sync::CancellationToken;
//!
//! #[tokio::main]
//! async fn main() -> quote_gate::Result<()> {
//!     let config = GateSettings::load()?.into_config()?;
//!     let ctx = Arc::new(GateContext::from_config(&config));
//!     let extractor = SnapshotExtractor::new(resolve_target(&config.target)?)?;
//!
//!     let shutdown = CancellationToken::new();
//!     ctx.monitor().spawn(SystemSampler::new(), shutdown.child_token());
//!
//!     let pipeline = Arc::new(RequestPipeline::new(ctx, Arc::new(extractor)));
//!     let listener = tokio::net::TcpListener::bind(config.bind).await?;
//!     server::serve(listener, ServerState::new(pipeline, config.retry_after), shutdown).await
//! }
//! ```

pub mod cache;
pub mod client;
pub mod config;
pub mod context;
pub mod error_code;
pub mod extractor;
pub mod load;
pub mod pipeline;
pub mod policy;
pub mod resilience;
pub mod server;

// Re-export main types for convenience
pub use context::{GateContext, GateSignals};
pub use error_code::GateErrorCode;
pub use extractor::{Extractor, Row};
pub use load::{LoadLevel, LoadMonitor, LoadStatus, Thresholds};
pub use pipeline::{PipelineError, PipelineResponse, QuotesPayload, QuotesRequest, RequestPipeline};
pub use policy::PolicyTable;

/// Install the global `tracing` subscriber.
///
/// `RUST_LOG` selects what is logged (default `info`); `GATE_LOG_FORMAT=json`
/// switches to JSON lines with span context.
pub fn init_tracing() -> Result<()> {
    use tracing_subscriber::EnvFilter;

    let filter = || EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let format = std::env::var("GATE_LOG_FORMAT").unwrap_or_default();
    let result = match format.as_str() {
        "json" => tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter())
            .with_current_span(true)
            .with_span_list(true)
            .try_init(),
        _ => tracing_subscriber::fmt().with_env_filter(filter()).try_init(),
    };
    result.map_err(|e| {
        Error::runtime_with_context(
            "tracing init failed",
            ErrorContext::new()
                .with_details(e.to_string())
                .with_source("logging"),
        )
    })
}

/// Result type alias for the library
pub type Result<T> = std::result::Result<T, Error>;

/// Error type for the library
pub mod error;
pub use error::{Error, ErrorContext};
