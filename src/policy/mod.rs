//! Load-level policy table.
//!
//! A pure mapping from [`LoadLevel`] to the four operational knobs the request
//! pipeline consults. As pressure rises the gateway trades freshness for
//! throughput: longer cache lifetimes, a deliberate delay after admission,
//! shorter admission patience (fast 429s instead of queueing) and coarser
//! readiness polling.
//!
//! | Level | Cache TTL | Extra delay | Admission timeout | Min poll |
//! |-------|-----------|-------------|-------------------|----------|
//! | Normal | 0 (off) | 0 | 3.0 s | caller value |
//! | Warn | 1.0 s | 0.10 s | 1.5 s | 250 ms |
//! | Throttle | 2.0 s | 0.35 s | 0.75 s | 400 ms |
//!
//! ```rust
//! use quote_gate::load::LoadLevel;
//! use quote_gate::policy::PolicyTable;
//! use std::time::Duration;
//!
//! let table = PolicyTable::default();
//! let row = table.row(LoadLevel::Warn, Duration::from_millis(150));
//! assert_eq!(row.poll_interval, Duration::from_millis(250));
//! assert_eq!(row.cache_ttl, Duration::from_secs(1));
//! ```

use crate::load::LoadLevel;
use std::time::Duration;

/// Knobs for one load level.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LevelPolicy {
    /// Zero disables caching at this level.
    pub cache_ttl: Duration,
    pub extra_delay: Duration,
    pub admission_timeout: Duration,
    /// Floor applied to the caller's requested poll interval.
    pub min_poll: Duration,
}

impl LevelPolicy {
    pub const NORMAL: Self = Self {
        cache_ttl: Duration::ZERO,
        extra_delay: Duration::ZERO,
        admission_timeout: Duration::from_millis(3000),
        min_poll: Duration::ZERO,
    };

    pub const WARN: Self = Self {
        cache_ttl: Duration::from_millis(1000),
        extra_delay: Duration::from_millis(100),
        admission_timeout: Duration::from_millis(1500),
        min_poll: Duration::from_millis(250),
    };

    pub const THROTTLE: Self = Self {
        cache_ttl: Duration::from_millis(2000),
        extra_delay: Duration::from_millis(350),
        admission_timeout: Duration::from_millis(750),
        min_poll: Duration::from_millis(400),
    };
}

/// Parameters resolved for one decision: a level plus the caller's poll request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PolicyRow {
    pub level: LoadLevel,
    pub cache_ttl: Duration,
    pub extra_delay: Duration,
    pub admission_timeout: Duration,
    pub poll_interval: Duration,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PolicyTable {
    normal: LevelPolicy,
    warn: LevelPolicy,
    throttle: LevelPolicy,
}

impl PolicyTable {
    pub fn new(normal: LevelPolicy, warn: LevelPolicy, throttle: LevelPolicy) -> Self {
        Self {
            normal,
            warn,
            throttle,
        }
    }

    pub fn for_level(&self, level: LoadLevel) -> &LevelPolicy {
        match level {
            LoadLevel::Normal => &self.normal,
            LoadLevel::Warn => &self.warn,
            LoadLevel::Throttle => &self.throttle,
        }
    }

    pub fn cache_ttl(&self, level: LoadLevel) -> Duration {
        self.for_level(level).cache_ttl
    }

    pub fn extra_delay(&self, level: LoadLevel) -> Duration {
        self.for_level(level).extra_delay
    }

    pub fn admission_timeout(&self, level: LoadLevel) -> Duration {
        self.for_level(level).admission_timeout
    }

    /// The caller's poll interval, raised to the level's floor.
    pub fn poll_interval(&self, level: LoadLevel, requested: Duration) -> Duration {
        requested.max(self.for_level(level).min_poll)
    }

    pub fn row(&self, level: LoadLevel, requested_poll: Duration) -> PolicyRow {
        let p = self.for_level(level);
        PolicyRow {
            level,
            cache_ttl: p.cache_ttl,
            extra_delay: p.extra_delay,
            admission_timeout: p.admission_timeout,
            poll_interval: self.poll_interval(level, requested_poll),
        }
    }
}

impl Default for PolicyTable {
    fn default() -> Self {
        Self::new(LevelPolicy::NORMAL, LevelPolicy::WARN, LevelPolicy::THROTTLE)
    }
}
