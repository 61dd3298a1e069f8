use crate::cache::{CacheStats, ResultCache};
use crate::config::GateConfig;
use crate::load::{LoadLevel, LoadMonitor, LoadStatus};
use crate::pipeline::QuotesPayload;
use crate::policy::PolicyTable;
use crate::resilience::{AdmissionLimiter, AdmissionSnapshot};
use serde::Serialize;
use std::sync::Arc;

/// Process-wide gateway state shared by every request.
///
/// One of each: a load monitor, the policy table derived from configuration,
/// an admission limiter and the single-slot result cache. Constructed once at
/// startup and handed around behind an `Arc`.
pub struct GateContext {
    monitor: Arc<LoadMonitor>,
    policy: PolicyTable,
    limiter: AdmissionLimiter,
    cache: ResultCache<Arc<QuotesPayload>>,
}

impl GateContext {
    pub fn new(monitor: Arc<LoadMonitor>, policy: PolicyTable, max_inflight: usize) -> Self {
        Self {
            monitor,
            policy,
            limiter: AdmissionLimiter::new(max_inflight),
            cache: ResultCache::new(),
        }
    }

    /// Build the context described by a validated configuration.
    /// The monitor is created but not started.
    pub fn from_config(config: &GateConfig) -> Self {
        let monitor = Arc::new(LoadMonitor::new(
            config.thresholds,
            config.monitor_interval,
        ));
        Self::new(monitor, config.policy.clone(), config.max_inflight)
    }

    pub fn monitor(&self) -> &Arc<LoadMonitor> {
        &self.monitor
    }

    /// Level from the most recent load snapshot.
    pub fn level(&self) -> LoadLevel {
        self.monitor.level()
    }

    pub fn policy(&self) -> &PolicyTable {
        &self.policy
    }

    pub fn limiter(&self) -> &AdmissionLimiter {
        &self.limiter
    }

    pub fn cache(&self) -> &ResultCache<Arc<QuotesPayload>> {
        &self.cache
    }

    /// Facts about the gateway right now, for health reporting.
    pub fn signals(&self) -> GateSignals {
        GateSignals {
            load: LoadSignals {
                status: LoadStatus::clone(&self.monitor.status()),
                monitoring_available: self.monitor.monitoring_available(),
            },
            admission: self.limiter.snapshot(),
            cache: self.cache.stats(),
        }
    }
}

impl Default for GateContext {
    fn default() -> Self {
        Self::new(Arc::new(LoadMonitor::default()), PolicyTable::default(), 1)
    }
}

/// Runtime signals, facts only.
#[derive(Debug, Clone, Serialize)]
pub struct GateSignals {
    pub load: LoadSignals,
    pub admission: AdmissionSnapshot,
    pub cache: CacheStats,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LoadSignals {
    #[serde(flatten)]
    pub status: LoadStatus,
    pub monitoring_available: bool,
}
