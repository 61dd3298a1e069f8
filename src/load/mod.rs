//! Host load sensing.
//!
//! A [`LoadMonitor`] samples CPU and memory utilisation through a
//! [`ResourceSampler`] on a fixed interval, classifies the reading into a
//! [`LoadLevel`] using [`Thresholds`] with a one-sided hysteresis band around
//! `Throttle`, and publishes the result as an immutable [`LoadStatus`].
//!
//! | Transition | Condition |
//! |------------|-----------|
//! | any → Throttle | `max(cpu, mem) >= throttle_pct` |
//! | Throttle → Normal | `max(cpu, mem) < recover_pct` (Warn is skipped) |
//! | Normal ↔ Warn | plain comparison against `warn_pct` |
//!
//! Monitoring fails open: a host without a working sampler runs permanently
//! at `Normal`, and a failed tick keeps the previous snapshot.
//!
//! ```rust
//! use quote_gate::load::{LoadLevel, Thresholds};
//!
//! let t = Thresholds::new(75.0, 80.0, 70.0).unwrap();
//! assert_eq!(t.classify(72.0, 10.0, LoadLevel::Throttle), LoadLevel::Throttle);
//! assert_eq!(t.classify(69.9, 10.0, LoadLevel::Throttle), LoadLevel::Normal);
//! ```

mod level;
mod monitor;
mod sampler;

pub use level::{LoadLevel, LoadStatus, Thresholds};
pub use monitor::{LoadMonitor, MonitorExit, TickOutcome, MIN_MONITOR_INTERVAL};
pub use sampler::{ResourceSample, ResourceSampler, SampleError, SystemSampler};
