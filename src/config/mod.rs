//! Gateway settings.
//!
//! [`GateSettings`] is the flat, serde-friendly form: every number is plain
//! (percentages, seconds as `f64`, poll floors in milliseconds) so it can be
//! written in YAML or set from `GATE_*` environment variables. Loading goes
//! defaults, then the optional YAML file named by `GATE_CONFIG`, then
//! environment overrides. [`GateSettings::into_config`] validates and turns
//! it into the typed [`GateConfig`] the rest of the crate consumes.
//!
//! ```rust
//! use quote_gate::config::GateSettings;
//! use quote_gate::load::LoadLevel;
//!
//! let settings = GateSettings::from_yaml_str("warn_pct: 60\nthrottle_pct: 90\n").unwrap();
//! let config = settings.into_config().unwrap();
//! assert_eq!(config.thresholds.classify(65.0, 0.0, LoadLevel::Normal), LoadLevel::Warn);
//! ```

use crate::load::Thresholds;
use crate::policy::{LevelPolicy, PolicyTable};
use crate::{Error, ErrorContext, Result};
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;
use tracing::warn;

/// Environment variable naming an optional YAML settings file.
pub const CONFIG_PATH_ENV: &str = "GATE_CONFIG";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GateSettings {
    pub warn_pct: f64,
    pub throttle_pct: f64,
    pub recover_pct: f64,
    /// Seconds between load samples; floored at 0.2 by the monitor.
    pub monitor_interval: f64,

    pub cache_ttl_normal: f64,
    pub cache_ttl_warn: f64,
    pub cache_ttl_throttle: f64,

    pub extra_delay_normal: f64,
    pub extra_delay_warn: f64,
    pub extra_delay_throttle: f64,

    pub acquire_timeout_normal: f64,
    pub acquire_timeout_warn: f64,
    pub acquire_timeout_throttle: f64,

    pub min_poll_ms_normal: u64,
    pub min_poll_ms_warn: u64,
    pub min_poll_ms_throttle: u64,

    pub max_inflight: usize,
    pub retry_after_secs: u64,
    pub bind: String,
    pub target: String,
}

impl Default for GateSettings {
    fn default() -> Self {
        Self {
            warn_pct: 75.0,
            throttle_pct: 80.0,
            recover_pct: 70.0,
            monitor_interval: 1.0,
            cache_ttl_normal: 0.0,
            cache_ttl_warn: 1.0,
            cache_ttl_throttle: 2.0,
            extra_delay_normal: 0.0,
            extra_delay_warn: 0.10,
            extra_delay_throttle: 0.35,
            acquire_timeout_normal: 3.0,
            acquire_timeout_warn: 1.5,
            acquire_timeout_throttle: 0.75,
            min_poll_ms_normal: 0,
            min_poll_ms_warn: 250,
            min_poll_ms_throttle: 400,
            max_inflight: 1,
            retry_after_secs: 2,
            bind: "0.0.0.0:8010".to_string(),
            target: "quotes.json".to_string(),
        }
    }
}

/// Validated runtime configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct GateConfig {
    pub thresholds: Thresholds,
    pub monitor_interval: Duration,
    pub policy: PolicyTable,
    pub max_inflight: usize,
    pub retry_after: Duration,
    pub bind: SocketAddr,
    pub target: String,
}

fn settings_error(field: &str, details: impl Into<String>) -> Error {
    Error::configuration_with_context(
        format!("invalid setting '{}'", field),
        ErrorContext::new()
            .with_field_path(field)
            .with_details(details)
            .with_source("settings"),
    )
}

fn seconds(field: &str, value: f64) -> Result<Duration> {
    Duration::try_from_secs_f64(value)
        .map_err(|_| settings_error(field, format!("expected non-negative seconds, got {}", value)))
}

/// Parse `raw` into `slot`, keeping the current value when it does not parse.
fn override_from<T: FromStr>(key: &str, raw: Option<String>, slot: &mut T) {
    let Some(raw) = raw else { return };
    match raw.trim().parse::<T>() {
        Ok(value) => *slot = value,
        Err(_) => warn!(key, value = %raw, "ignoring unparsable setting override"),
    }
}

impl GateSettings {
    pub fn from_yaml_str(yaml: &str) -> Result<Self> {
        Ok(serde_yaml::from_str(yaml)?)
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|e| {
            Error::configuration_with_context(
                "failed to read settings file",
                ErrorContext::new()
                    .with_field_path(CONFIG_PATH_ENV)
                    .with_details(format!("{}: {}", path.display(), e))
                    .with_source("settings"),
            )
        })?;
        Self::from_yaml_str(&text)
    }

    /// Defaults, then the `GATE_CONFIG` file if set, then `GATE_*` variables.
    pub fn load() -> Result<Self> {
        let mut settings = match std::env::var(CONFIG_PATH_ENV) {
            Ok(path) if !path.trim().is_empty() => Self::from_file(path.trim())?,
            _ => Self::default(),
        };
        settings.apply_overrides(|key| std::env::var(key).ok());
        Ok(settings)
    }

    /// Apply `GATE_*` overrides from `lookup`. Unparsable values are logged and skipped.
    pub fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        override_from("GATE_WARN_PCT", lookup("GATE_WARN_PCT"), &mut self.warn_pct);
        override_from("GATE_THROTTLE_PCT", lookup("GATE_THROTTLE_PCT"), &mut self.throttle_pct);
        override_from("GATE_RECOVER_PCT", lookup("GATE_RECOVER_PCT"), &mut self.recover_pct);
        override_from(
            "GATE_MONITOR_INTERVAL",
            lookup("GATE_MONITOR_INTERVAL"),
            &mut self.monitor_interval,
        );

        let per_level: [(&str, &mut f64); 9] = [
            ("GATE_CACHE_TTL_NORMAL", &mut self.cache_ttl_normal),
            ("GATE_CACHE_TTL_WARN", &mut self.cache_ttl_warn),
            ("GATE_CACHE_TTL_THROTTLE", &mut self.cache_ttl_throttle),
            ("GATE_EXTRA_DELAY_NORMAL", &mut self.extra_delay_normal),
            ("GATE_EXTRA_DELAY_WARN", &mut self.extra_delay_warn),
            ("GATE_EXTRA_DELAY_THROTTLE", &mut self.extra_delay_throttle),
            ("GATE_ACQUIRE_TIMEOUT_NORMAL", &mut self.acquire_timeout_normal),
            ("GATE_ACQUIRE_TIMEOUT_WARN", &mut self.acquire_timeout_warn),
            ("GATE_ACQUIRE_TIMEOUT_THROTTLE", &mut self.acquire_timeout_throttle),
        ];
        for (key, slot) in per_level {
            override_from(key, lookup(key), slot);
        }

        let floors: [(&str, &mut u64); 3] = [
            ("GATE_MIN_POLL_MS_NORMAL", &mut self.min_poll_ms_normal),
            ("GATE_MIN_POLL_MS_WARN", &mut self.min_poll_ms_warn),
            ("GATE_MIN_POLL_MS_THROTTLE", &mut self.min_poll_ms_throttle),
        ];
        for (key, slot) in floors {
            override_from(key, lookup(key), slot);
        }

        override_from("GATE_MAX_INFLIGHT", lookup("GATE_MAX_INFLIGHT"), &mut self.max_inflight);
        override_from(
            "GATE_RETRY_AFTER_SECS",
            lookup("GATE_RETRY_AFTER_SECS"),
            &mut self.retry_after_secs,
        );
        if let Some(bind) = lookup("GATE_BIND").filter(|s| !s.trim().is_empty()) {
            self.bind = bind.trim().to_string();
        }
        if let Some(target) = lookup("GATE_TARGET").filter(|s| !s.trim().is_empty()) {
            self.target = target.trim().to_string();
        }
    }

    pub fn validate(&self) -> Result<()> {
        self.build_config().map(|_| ())
    }

    pub fn into_config(self) -> Result<GateConfig> {
        self.build_config()
    }

    fn build_config(&self) -> Result<GateConfig> {
        let thresholds = Thresholds::new(self.warn_pct, self.throttle_pct, self.recover_pct)?;
        let monitor_interval = seconds("monitor_interval", self.monitor_interval)?;

        let level = |suffix: &str, ttl: f64, delay: f64, timeout: f64, floor_ms: u64| {
            Ok::<_, Error>(LevelPolicy {
                cache_ttl: seconds(&format!("cache_ttl_{}", suffix), ttl)?,
                extra_delay: seconds(&format!("extra_delay_{}", suffix), delay)?,
                admission_timeout: seconds(&format!("acquire_timeout_{}", suffix), timeout)?,
                min_poll: Duration::from_millis(floor_ms),
            })
        };
        let policy = PolicyTable::new(
            level(
                "normal",
                self.cache_ttl_normal,
                self.extra_delay_normal,
                self.acquire_timeout_normal,
                self.min_poll_ms_normal,
            )?,
            level(
                "warn",
                self.cache_ttl_warn,
                self.extra_delay_warn,
                self.acquire_timeout_warn,
                self.min_poll_ms_warn,
            )?,
            level(
                "throttle",
                self.cache_ttl_throttle,
                self.extra_delay_throttle,
                self.acquire_timeout_throttle,
                self.min_poll_ms_throttle,
            )?,
        );

        if self.max_inflight == 0 {
            return Err(settings_error("max_inflight", "must be at least 1"));
        }
        let bind = SocketAddr::from_str(self.bind.trim())
            .map_err(|e| settings_error("bind", format!("{}: {}", self.bind, e)))?;
        if self.target.trim().is_empty() {
            return Err(settings_error("target", "must not be empty"));
        }

        Ok(GateConfig {
            thresholds,
            monitor_interval,
            policy,
            max_inflight: self.max_inflight,
            retry_after: Duration::from_secs(self.retry_after_secs),
            bind,
            target: self.target.trim().to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::load::LoadLevel;
    use std::collections::HashMap;
    use std::io::Write;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults_produce_standard_policy() {
        let config = GateSettings::default().into_config().unwrap();
        assert_eq!(config.policy, PolicyTable::default());
        assert_eq!(config.thresholds, Thresholds::default());
        assert_eq!(config.monitor_interval, Duration::from_secs(1));
        assert_eq!(config.max_inflight, 1);
        assert_eq!(config.retry_after, Duration::from_secs(2));
        assert_eq!(config.bind.port(), 8010);
        assert_eq!(config.target, "quotes.json");
    }

    #[test]
    fn test_env_overrides_apply_per_field() {
        let mut settings = GateSettings::default();
        settings.apply_overrides(lookup_from(&[
            ("GATE_WARN_PCT", "60"),
            ("GATE_CACHE_TTL_THROTTLE", "5.5"),
            ("GATE_MIN_POLL_MS_WARN", "300"),
            ("GATE_MAX_INFLIGHT", "3"),
            ("GATE_TARGET", " https://example.com/q.json "),
        ]));
        assert_eq!(settings.warn_pct, 60.0);
        assert_eq!(settings.cache_ttl_throttle, 5.5);
        assert_eq!(settings.min_poll_ms_warn, 300);
        assert_eq!(settings.max_inflight, 3);
        assert_eq!(settings.target, "https://example.com/q.json");
        assert_eq!(settings.throttle_pct, 80.0);

        let config = settings.into_config().unwrap();
        assert_eq!(
            config.policy.cache_ttl(LoadLevel::Throttle),
            Duration::from_millis(5500)
        );
    }

    #[test]
    fn test_unparsable_override_keeps_default() {
        let mut settings = GateSettings::default();
        settings.apply_overrides(lookup_from(&[
            ("GATE_THROTTLE_PCT", "high"),
            ("GATE_MAX_INFLIGHT", "-1"),
        ]));
        assert_eq!(settings.throttle_pct, 80.0);
        assert_eq!(settings.max_inflight, 1);
    }

    #[test]
    fn test_threshold_ordering_enforced() {
        let settings = GateSettings {
            recover_pct: 78.0,
            ..GateSettings::default()
        };
        let err = settings.validate().unwrap_err();
        assert!(matches!(err, Error::Configuration { .. }));
    }

    #[test]
    fn test_negative_duration_rejected() {
        let settings = GateSettings {
            extra_delay_warn: -0.1,
            ..GateSettings::default()
        };
        let err = settings.into_config().unwrap_err();
        assert_eq!(
            err.context().and_then(|c| c.field_path.as_deref()),
            Some("extra_delay_warn")
        );
    }

    #[test]
    fn test_non_finite_interval_rejected() {
        let settings = GateSettings {
            monitor_interval: f64::NAN,
            ..GateSettings::default()
        };
        assert!(settings.validate().is_err());
    }

    #[test]
    fn test_zero_inflight_and_bad_bind_rejected() {
        let zero = GateSettings {
            max_inflight: 0,
            ..GateSettings::default()
        };
        assert!(zero.validate().is_err());

        let bind = GateSettings {
            bind: "localhost".into(),
            ..GateSettings::default()
        };
        assert!(bind.validate().is_err());
    }

    #[test]
    fn test_yaml_file_partial_override() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "throttle_pct: 90").unwrap();
        writeln!(file, "acquire_timeout_throttle: 0.5").unwrap();
        writeln!(file, "bind: 127.0.0.1:9000").unwrap();

        let settings = GateSettings::from_file(file.path()).unwrap();
        assert_eq!(settings.throttle_pct, 90.0);
        assert_eq!(settings.warn_pct, 75.0);

        let config = settings.into_config().unwrap();
        assert_eq!(
            config.policy.admission_timeout(LoadLevel::Throttle),
            Duration::from_millis(500)
        );
        assert_eq!(config.bind.port(), 9000);
    }

    #[test]
    fn test_missing_file_is_configuration_error() {
        let err = GateSettings::from_file("/no/such/gate.yaml").unwrap_err();
        assert!(matches!(err, Error::Configuration { .. }));
    }

    #[test]
    fn test_malformed_yaml_is_settings_error() {
        let err = GateSettings::from_yaml_str("warn_pct: [1, 2").unwrap_err();
        assert!(matches!(err, Error::Settings(_)));
    }
}
