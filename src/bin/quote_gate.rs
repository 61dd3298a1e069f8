//! quote-gate: load-adaptive gateway serving `/health` and `/quotes`.
//!
//! Settings come from the YAML file named by `GATE_CONFIG` and from `GATE_*`
//! environment variables. Ctrl-C drains in-flight requests and stops the load
//! monitor.

use anyhow::Context;
use quote_gate::config::GateSettings;
use quote_gate::extractor::{resolve_target, SnapshotExtractor};
use quote_gate::load::SystemSampler;
use quote_gate::server::{self, ServerState};
use quote_gate::{GateContext, RequestPipeline};
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    quote_gate::init_tracing()?;

    let config = GateSettings::load()
        .and_then(|settings| settings.into_config())
        .context("loading gateway settings")?;
    let target = resolve_target(&config.target)
        .with_context(|| format!("resolving target '{}'", config.target))?;
    let extractor = SnapshotExtractor::new(target)?;

    let ctx = Arc::new(GateContext::from_config(&config));
    let shutdown = CancellationToken::new();
    let monitor = ctx
        .monitor()
        .spawn(SystemSampler::new(), shutdown.child_token());

    let thresholds = ctx.monitor().thresholds();
    info!(
        warn_pct = thresholds.warn_pct(),
        throttle_pct = thresholds.throttle_pct(),
        recover_pct = thresholds.recover_pct(),
        interval_ms = ctx.monitor().interval().as_millis() as u64,
        max_inflight = config.max_inflight,
        "load policy configured"
    );

    let pipeline = Arc::new(RequestPipeline::new(Arc::clone(&ctx), Arc::new(extractor)));
    info!(source_url = pipeline.target(), "extractor ready");
    let state = ServerState::new(pipeline, config.retry_after);

    let listener = TcpListener::bind(config.bind)
        .await
        .with_context(|| format!("binding {}", config.bind))?;

    tokio::spawn({
        let shutdown = shutdown.clone();
        async move {
            if let Err(err) = tokio::signal::ctrl_c().await {
                warn!(error = %err, "cannot listen for ctrl-c; shutdown only via process signal");
                return;
            }
            info!("shutdown requested");
            shutdown.cancel();
        }
    });

    server::serve(listener, state, shutdown.clone()).await?;

    shutdown.cancel();
    match monitor.await {
        Ok(exit) => info!(?exit, "load monitor stopped"),
        Err(err) => warn!(error = %err, "load monitor task failed"),
    }
    Ok(())
}
