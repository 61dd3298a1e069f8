//! Per-request orchestration.
//!
//! Every `/quotes` request runs the same sequence against the shared
//! [`GateContext`]:
//!
//! | Step | Action | Failure |
//! |------|--------|---------|
//! | 1 | Cache lookup with the current level's TTL | miss falls through |
//! | 2 | Admission, bounded by the level's timeout | [`PipelineError::AdmissionTimeout`] |
//! | 3 | Level-dependent pacing delay | none |
//! | 4 | Readiness wait inside the resource section | [`PipelineError::ExtractionTimeout`] |
//! | 5 | Extraction | degrades to zero rows |
//! | 6 | Dedup, stamp the level, store if the TTL allows | none |
//!
//! The load level is re-read at each decision point, so a request that spans a
//! level change follows whichever snapshot is current when it gets there.
//! The admission slot is released on every exit path, including cancellation.

use crate::context::GateContext;
use crate::extractor::{dedup_rows, Extractor, Row};
use crate::load::LoadLevel;
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::Mutex;
use tracing::{debug, info_span, warn, Instrument};

/// Caller-supplied knobs for one request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QuotesRequest {
    /// Upper bound on the readiness wait.
    pub ready_timeout: Duration,
    /// Requested readiness poll interval, subject to the level's floor.
    pub poll_interval: Duration,
}

impl QuotesRequest {
    pub const DEFAULT_READY_TIMEOUT: Duration = Duration::from_millis(15_000);
    pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(150);
}

impl Default for QuotesRequest {
    fn default() -> Self {
        Self {
            ready_timeout: Self::DEFAULT_READY_TIMEOUT,
            poll_interval: Self::DEFAULT_POLL_INTERVAL,
        }
    }
}

/// Successful `/quotes` body.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QuotesPayload {
    pub ok: bool,
    pub rows: Vec<Row>,
    /// Level current when the payload was produced.
    pub level: LoadLevel,
}

/// How a successful response was produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResponseSource {
    Cache,
    Fresh,
    /// Extraction failed; the payload carries no rows.
    Degraded { reason: String },
}

#[derive(Debug, Clone)]
pub struct PipelineResponse {
    pub payload: Arc<QuotesPayload>,
    pub source: ResponseSource,
}

/// Request-path failures. Both are transient and map to distinct HTTP statuses.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum PipelineError {
    #[error("Server is busy (level={level}). Retry soon.")]
    AdmissionTimeout { level: LoadLevel, waited: Duration },

    #[error("Timed out waiting for resource readiness")]
    ExtractionTimeout { level: LoadLevel, timeout: Duration },
}

impl PipelineError {
    pub fn level(&self) -> LoadLevel {
        match self {
            Self::AdmissionTimeout { level, .. } | Self::ExtractionTimeout { level, .. } => *level,
        }
    }
}

/// Runs requests against one serialized extractor.
pub struct RequestPipeline {
    ctx: Arc<GateContext>,
    target: String,
    resource: Mutex<Arc<dyn Extractor>>,
}

impl RequestPipeline {
    pub fn new(ctx: Arc<GateContext>, extractor: Arc<dyn Extractor>) -> Self {
        Self {
            ctx,
            target: extractor.target().to_string(),
            resource: Mutex::new(extractor),
        }
    }

    pub fn context(&self) -> &Arc<GateContext> {
        &self.ctx
    }

    /// The extractor's target, readable without entering the resource section.
    pub fn target(&self) -> &str {
        &self.target
    }

    pub async fn handle(&self, request: QuotesRequest) -> Result<PipelineResponse, PipelineError> {
        let span = info_span!("quotes", request_id = %uuid::Uuid::new_v4());
        self.run(request).instrument(span).await
    }

    async fn run(&self, request: QuotesRequest) -> Result<PipelineResponse, PipelineError> {
        let ctx = &self.ctx;
        let policy = ctx.policy();

        let level = ctx.level();
        if let Some(payload) = ctx.cache().lookup(policy.cache_ttl(level)) {
            debug!(%level, "served from cache");
            return Ok(PipelineResponse {
                payload,
                source: ResponseSource::Cache,
            });
        }

        let timeout = policy.admission_timeout(level);
        let _permit = ctx.limiter().admit(timeout).await.map_err(|e| {
            warn!(%level, waited_ms = e.waited.as_millis() as u64, "admission rejected");
            PipelineError::AdmissionTimeout {
                level,
                waited: e.waited,
            }
        })?;

        let delay = policy.extra_delay(ctx.level());
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }

        let (rows, source) = {
            let extractor = self.resource.lock().await;
            let level = ctx.level();
            let poll = policy.poll_interval(level, request.poll_interval);
            if !extractor.is_ready(request.ready_timeout, poll).await {
                warn!(
                    %level,
                    timeout_ms = request.ready_timeout.as_millis() as u64,
                    "resource not ready"
                );
                return Err(PipelineError::ExtractionTimeout {
                    level,
                    timeout: request.ready_timeout,
                });
            }
            match extractor.run().await {
                Ok(rows) => (rows, ResponseSource::Fresh),
                Err(err) => {
                    warn!(error = %err, "extraction failed; returning no rows");
                    (
                        Vec::new(),
                        ResponseSource::Degraded {
                            reason: err.to_string(),
                        },
                    )
                }
            }
        };

        let level = ctx.level();
        let payload = Arc::new(QuotesPayload {
            ok: true,
            rows: dedup_rows(rows),
            level,
        });
        if !policy.cache_ttl(level).is_zero() {
            ctx.cache().store(Arc::clone(&payload));
        }
        debug!(%level, rows = payload.rows.len(), "served fresh");
        Ok(PipelineResponse { payload, source })
    }
}

#[cfg(test)]
mod tests;
