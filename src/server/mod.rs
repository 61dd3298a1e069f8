//! HTTP surface.
//!
//! | Route | Response |
//! |-------|----------|
//! | `GET /health` | 200 with target, load snapshot, admission and cache counters |
//! | `GET /quotes` | 200 payload, 429 busy (with `Retry-After`), 504 not ready |
//! | anything else | 404 |

mod error;
mod handlers;

pub use error::ApiError;
pub use handlers::{HealthResponse, QuotesQuery};

use crate::pipeline::{QuotesRequest, RequestPipeline};
use crate::Result;
use axum::routing::get;
use axum::Router;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tower_http::trace::TraceLayer;
use tracing::info;

/// Shared state behind every route.
#[derive(Clone)]
pub struct ServerState {
    pipeline: Arc<RequestPipeline>,
    retry_after: Duration,
    defaults: QuotesRequest,
}

impl ServerState {
    pub fn new(pipeline: Arc<RequestPipeline>, retry_after: Duration) -> Self {
        Self {
            pipeline,
            retry_after,
            defaults: QuotesRequest::default(),
        }
    }

    /// Request parameters used when the query string omits them.
    pub fn with_defaults(mut self, defaults: QuotesRequest) -> Self {
        self.defaults = defaults;
        self
    }

    pub fn pipeline(&self) -> &Arc<RequestPipeline> {
        &self.pipeline
    }
}

pub fn router(state: ServerState) -> Router {
    Router::new()
        .route("/health", get(handlers::health))
        .route("/quotes", get(handlers::quotes))
        .fallback(handlers::not_found)
        .with_state(state)
        .layer(TraceLayer::new_for_http())
}

/// Serve until `shutdown` is cancelled, then drain in-flight requests.
pub async fn serve(listener: TcpListener, state: ServerState, shutdown: CancellationToken) -> Result<()> {
    info!(addr = %listener.local_addr()?, "quote gate listening");
    axum::serve(listener, router(state))
        .with_graceful_shutdown(async move { shutdown.cancelled().await })
        .await?;
    info!("quote gate stopped");
    Ok(())
}
