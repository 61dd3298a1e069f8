use std::time::Duration;
use sysinfo::System;
use thiserror::Error;

/// One CPU/memory reading, both in percent.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ResourceSample {
    pub cpu_percent: f64,
    pub mem_percent: f64,
}

impl ResourceSample {
    /// Rejects readings that are not finite percentages.
    pub fn checked(cpu_percent: f64, mem_percent: f64) -> Result<Self, SampleError> {
        for value in [cpu_percent, mem_percent] {
            if !value.is_finite() || value < 0.0 {
                return Err(SampleError::InvalidReading(format!(
                    "cpu={}, mem={}",
                    cpu_percent, mem_percent
                )));
            }
        }
        Ok(Self {
            cpu_percent: cpu_percent.min(100.0),
            mem_percent: mem_percent.min(100.0),
        })
    }
}

#[derive(Debug, Clone, Error, PartialEq)]
pub enum SampleError {
    #[error("resource sampling is not supported on this host")]
    Unsupported,

    #[error("invalid reading: {0}")]
    InvalidReading(String),

    #[error("sampling failed: {0}")]
    Failed(String),
}

/// Source of host load readings for the [`LoadMonitor`](super::LoadMonitor).
pub trait ResourceSampler: Send + 'static {
    /// Probed once before the first tick; `false` pins the level to `Normal`.
    fn is_available(&self) -> bool {
        true
    }

    /// Pause before the first sample so it reflects a real measurement window.
    fn warm_up(&self) -> Duration {
        Duration::ZERO
    }

    fn sample(&mut self) -> Result<ResourceSample, SampleError>;
}

/// Host-wide CPU and memory utilisation via `sysinfo`.
pub struct SystemSampler {
    sys: System,
}

impl SystemSampler {
    pub fn new() -> Self {
        let mut sys = System::new();
        // CPU usage is a delta between two refreshes; prime the first one.
        sys.refresh_cpu();
        sys.refresh_memory();
        Self { sys }
    }
}

impl Default for SystemSampler {
    fn default() -> Self {
        Self::new()
    }
}

impl ResourceSampler for SystemSampler {
    fn is_available(&self) -> bool {
        sysinfo::IS_SUPPORTED_SYSTEM
    }

    // CPU usage needs two refreshes at least this far apart.
    fn warm_up(&self) -> Duration {
        sysinfo::MINIMUM_CPU_UPDATE_INTERVAL
    }

    fn sample(&mut self) -> Result<ResourceSample, SampleError> {
        if !sysinfo::IS_SUPPORTED_SYSTEM {
            return Err(SampleError::Unsupported);
        }
        self.sys.refresh_cpu();
        self.sys.refresh_memory();

        let total = self.sys.total_memory();
        if total == 0 {
            return Err(SampleError::Failed("total memory reported as zero".into()));
        }
        let cpu = self.sys.global_cpu_info().cpu_usage() as f64;
        let mem = self.sys.used_memory() as f64 / total as f64 * 100.0;
        ResourceSample::checked(cpu, mem)
    }
}
