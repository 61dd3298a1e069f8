use super::level::{LoadLevel, LoadStatus, Thresholds};
use super::sampler::ResourceSampler;
use arc_swap::ArcSwap;
use chrono::Utc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Shortest accepted sampling interval.
pub const MIN_MONITOR_INTERVAL: Duration = Duration::from_millis(200);

/// Result of a single sampling tick.
#[derive(Debug, Clone, PartialEq)]
pub enum TickOutcome {
    /// A new snapshot replaced the previous one.
    Published { level: LoadLevel, changed: bool },
    /// Sampling failed; the previous snapshot stays in place.
    Skipped { reason: String },
}

/// Why the monitor task returned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MonitorExit {
    /// Sampling facility absent at startup; level pinned to `Normal`.
    Unavailable,
    Cancelled,
}

/// Periodic load sampler publishing an atomically swapped [`LoadStatus`].
///
/// Single writer (the monitor task), any number of readers. Readers always see
/// a whole snapshot, never a mix of fields from two ticks.
pub struct LoadMonitor {
    thresholds: Thresholds,
    interval: Duration,
    status: ArcSwap<LoadStatus>,
    available: AtomicBool,
}

impl LoadMonitor {
    pub fn new(thresholds: Thresholds, interval: Duration) -> Self {
        Self {
            thresholds,
            interval: interval.max(MIN_MONITOR_INTERVAL),
            status: ArcSwap::from_pointee(LoadStatus::initial()),
            available: AtomicBool::new(false),
        }
    }

    pub fn thresholds(&self) -> &Thresholds {
        &self.thresholds
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Current snapshot.
    pub fn status(&self) -> Arc<LoadStatus> {
        self.status.load_full()
    }

    pub fn level(&self) -> LoadLevel {
        self.status.load().level
    }

    /// `true` once a running monitor has confirmed the sampler works.
    pub fn monitoring_available(&self) -> bool {
        self.available.load(Ordering::Acquire)
    }

    /// Take one sample and publish the resulting snapshot.
    pub fn tick(&self, sampler: &mut dyn ResourceSampler) -> TickOutcome {
        let sample = match sampler.sample() {
            Ok(sample) => sample,
            Err(err) => {
                debug!(error = %err, "load sample skipped");
                return TickOutcome::Skipped {
                    reason: err.to_string(),
                };
            }
        };

        let prev = self.status.load().level;
        let level = self
            .thresholds
            .classify(sample.cpu_percent, sample.mem_percent, prev);

        self.status.store(Arc::new(LoadStatus {
            cpu_percent: sample.cpu_percent,
            mem_percent: sample.mem_percent,
            level,
            updated_at: Utc::now(),
        }));

        let changed = level != prev;
        if changed {
            if level == LoadLevel::Throttle {
                warn!(
                    from = %prev,
                    cpu = sample.cpu_percent,
                    mem = sample.mem_percent,
                    "load level entering throttle"
                );
            } else {
                info!(
                    from = %prev,
                    to = %level,
                    cpu = sample.cpu_percent,
                    mem = sample.mem_percent,
                    "load level changed"
                );
            }
        }
        TickOutcome::Published { level, changed }
    }

    /// Sampling loop. Returns when cancelled, or immediately if the sampler is unavailable.
    pub async fn run<S: ResourceSampler>(&self, mut sampler: S, cancel: CancellationToken) -> MonitorExit {
        if !sampler.is_available() {
            self.available.store(false, Ordering::Release);
            self.status.store(Arc::new(LoadStatus::initial()));
            warn!("resource sampling unavailable; load level pinned to normal");
            return MonitorExit::Unavailable;
        }

        self.available.store(true, Ordering::Release);
        info!(
            interval_ms = self.interval.as_millis() as u64,
            warn_pct = self.thresholds.warn_pct(),
            throttle_pct = self.thresholds.throttle_pct(),
            recover_pct = self.thresholds.recover_pct(),
            "load monitor started"
        );

        let warm_up = sampler.warm_up();
        if !warm_up.is_zero() {
            tokio::select! {
                _ = cancel.cancelled() => {
                    debug!("load monitor cancelled during warm-up");
                    return MonitorExit::Cancelled;
                }
                _ = tokio::time::sleep(warm_up) => {}
            }
        }

        let mut ticker = tokio::time::interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        loop {
            tokio::select! {
                _ = cancel.cancelled() => {
                    debug!("load monitor cancelled");
                    return MonitorExit::Cancelled;
                }
                _ = ticker.tick() => {
                    self.tick(&mut sampler);
                }
            }
        }
    }

    pub fn spawn<S: ResourceSampler>(
        self: &Arc<Self>,
        sampler: S,
        cancel: CancellationToken,
    ) -> JoinHandle<MonitorExit> {
        let monitor = Arc::clone(self);
        tokio::spawn(async move { monitor.run(sampler, cancel).await })
    }
}

impl Default for LoadMonitor {
    fn default() -> Self {
        Self::new(Thresholds::default(), Duration::from_secs(1))
    }
}
