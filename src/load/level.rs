use crate::{Error, ErrorContext, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Discretized host pressure, ordered by severity.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum LoadLevel {
    #[default]
    Normal,
    Warn,
    Throttle,
}

impl LoadLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Normal => "normal",
            Self::Warn => "warn",
            Self::Throttle => "throttle",
        }
    }
}

impl fmt::Display for LoadLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Immutable load snapshot. Replaced wholesale on every monitor tick.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LoadStatus {
    pub cpu_percent: f64,
    pub mem_percent: f64,
    pub level: LoadLevel,
    pub updated_at: DateTime<Utc>,
}

impl LoadStatus {
    /// Status published before the first sample (and permanently when sampling is unavailable).
    pub fn initial() -> Self {
        Self {
            cpu_percent: 0.0,
            mem_percent: 0.0,
            level: LoadLevel::Normal,
            updated_at: Utc::now(),
        }
    }
}

impl Default for LoadStatus {
    fn default() -> Self {
        Self::initial()
    }
}

/// Percent thresholds driving level classification.
///
/// `recover_pct <= warn_pct < throttle_pct`. Entering `Throttle` requires
/// crossing `throttle_pct`; leaving it requires dropping below `recover_pct`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Thresholds {
    warn_pct: f64,
    throttle_pct: f64,
    recover_pct: f64,
}

impl Thresholds {
    pub fn new(warn_pct: f64, throttle_pct: f64, recover_pct: f64) -> Result<Self> {
        for (name, value) in [
            ("warn_pct", warn_pct),
            ("throttle_pct", throttle_pct),
            ("recover_pct", recover_pct),
        ] {
            if !value.is_finite() || !(0.0..=100.0).contains(&value) {
                return Err(Error::configuration_with_context(
                    "threshold must be a percentage between 0 and 100",
                    ErrorContext::new()
                        .with_field_path(name)
                        .with_details(format!("got {}", value))
                        .with_source("thresholds"),
                ));
            }
        }
        if !(recover_pct <= warn_pct && warn_pct < throttle_pct) {
            return Err(Error::configuration_with_context(
                "thresholds must satisfy recover <= warn < throttle",
                ErrorContext::new()
                    .with_details(format!(
                        "recover={}, warn={}, throttle={}",
                        recover_pct, warn_pct, throttle_pct
                    ))
                    .with_source("thresholds"),
            ));
        }
        Ok(Self {
            warn_pct,
            throttle_pct,
            recover_pct,
        })
    }

    pub fn warn_pct(&self) -> f64 {
        self.warn_pct
    }

    pub fn throttle_pct(&self) -> f64 {
        self.throttle_pct
    }

    pub fn recover_pct(&self) -> f64 {
        self.recover_pct
    }

    /// Next level from a CPU/memory reading and the previous level.
    pub fn classify(&self, cpu_percent: f64, mem_percent: f64, prev: LoadLevel) -> LoadLevel {
        let peak = cpu_percent.max(mem_percent);

        if prev == LoadLevel::Throttle {
            // Throttle exits straight to Normal, never through Warn.
            return if peak < self.recover_pct {
                LoadLevel::Normal
            } else {
                LoadLevel::Throttle
            };
        }

        if peak >= self.throttle_pct {
            LoadLevel::Throttle
        } else if peak >= self.warn_pct {
            LoadLevel::Warn
        } else {
            LoadLevel::Normal
        }
    }
}

impl Default for Thresholds {
    fn default() -> Self {
        Self {
            warn_pct: 75.0,
            throttle_pct: 80.0,
            recover_pct: 70.0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_thresholds_are_valid() {
        let t = Thresholds::default();
        assert!(Thresholds::new(t.warn_pct(), t.throttle_pct(), t.recover_pct()).is_ok());
    }

    #[test]
    fn test_entering_throttle_from_any_lower_level() {
        let t = Thresholds::default();
        for prev in [LoadLevel::Normal, LoadLevel::Warn] {
            assert_eq!(t.classify(80.0, 10.0, prev), LoadLevel::Throttle);
            assert_eq!(t.classify(10.0, 99.5, prev), LoadLevel::Throttle);
        }
    }

    #[test]
    fn test_throttle_hysteresis_band() {
        let t = Thresholds::new(75.0, 80.0, 70.0).unwrap();
        assert_eq!(t.classify(72.0, 0.0, LoadLevel::Throttle), LoadLevel::Throttle);
        assert_eq!(t.classify(70.0, 0.0, LoadLevel::Throttle), LoadLevel::Throttle);
        assert_eq!(t.classify(0.0, 78.0, LoadLevel::Throttle), LoadLevel::Throttle);
        assert_eq!(t.classify(69.9, 0.0, LoadLevel::Throttle), LoadLevel::Normal);
    }

    #[test]
    fn test_throttle_exit_skips_warn() {
        let t = Thresholds::new(60.0, 80.0, 60.0).unwrap();
        // 65 would be Warn from Normal, but from Throttle it holds.
        assert_eq!(t.classify(65.0, 0.0, LoadLevel::Throttle), LoadLevel::Throttle);
        assert_eq!(t.classify(59.0, 0.0, LoadLevel::Throttle), LoadLevel::Normal);
    }

    #[test]
    fn test_warn_to_normal_has_no_hysteresis() {
        let t = Thresholds::default();
        assert_eq!(t.classify(75.0, 0.0, LoadLevel::Normal), LoadLevel::Warn);
        assert_eq!(t.classify(74.9, 0.0, LoadLevel::Warn), LoadLevel::Normal);
    }

    #[test]
    fn test_peak_uses_max_of_cpu_and_mem() {
        let t = Thresholds::default();
        assert_eq!(t.classify(10.0, 76.0, LoadLevel::Normal), LoadLevel::Warn);
        assert_eq!(t.classify(76.0, 10.0, LoadLevel::Normal), LoadLevel::Warn);
    }

    #[test]
    fn test_invalid_orderings_rejected() {
        assert!(Thresholds::new(80.0, 80.0, 70.0).is_err());
        assert!(Thresholds::new(75.0, 80.0, 76.0).is_err());
        assert!(Thresholds::new(75.0, 120.0, 70.0).is_err());
        assert!(Thresholds::new(f64::NAN, 80.0, 70.0).is_err());
        // recover == warn is allowed
        assert!(Thresholds::new(75.0, 80.0, 75.0).is_ok());
    }

    #[test]
    fn test_out_of_range_threshold_names_its_setting() {
        let err = Thresholds::new(120.0, 130.0, 70.0).unwrap_err();
        let ctx = err.context().unwrap();
        assert_eq!(ctx.field_path.as_deref(), Some("warn_pct"));
        assert_eq!(ctx.source.as_deref(), Some("thresholds"));
        assert!(err.to_string().contains("field: warn_pct"));
    }

    #[test]
    fn test_levels_ordered_by_severity() {
        assert!(LoadLevel::Normal < LoadLevel::Warn);
        assert!(LoadLevel::Warn < LoadLevel::Throttle);
        assert_eq!(
            serde_json::to_string(&LoadLevel::Throttle).unwrap(),
            "\"throttle\""
        );
    }

    #[test]
    fn test_status_serializes_camel_case() {
        let status = LoadStatus::initial();
        let json = serde_json::to_value(&status).unwrap();
        assert_eq!(json["level"], "normal");
        assert!(json.get("cpuPercent").is_some());
        assert!(json.get("updatedAt").is_some());
    }
}
