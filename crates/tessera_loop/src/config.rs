//! Loop configuration

use crate::error::{LoopError, Result};
use serde::Deserialize;

/// Event name used by systems that do not pick one
pub const DEFAULT_EVENT: &str = "default";

/// Loop configuration.
///
/// Every field is optional in TOML; missing fields take their defaults.
///
/// ```toml
/// default_event = "heartbeat"
/// catch_panics = true
/// max_delta_time = 0.25
/// max_recorded_failures = 64
/// failed_run_hook_window = 8
/// ```
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct LoopConfig {
    /// Event for systems scheduled without `on_event`
    pub default_event: String,
    /// Isolate panicking systems instead of unwinding through the loop
    pub catch_panics: bool,
    /// Maximum frame delta in seconds (caps lag spikes)
    pub max_delta_time: f64,
    /// Failures kept for `take_failures`; oldest dropped first
    pub max_recorded_failures: usize,
    /// After a failed run, hook cells untouched for this many runs of the
    /// system are swept. 0 keeps them until the next successful run
    pub failed_run_hook_window: usize,
}

impl Default for LoopConfig {
    fn default() -> Self {
        Self {
            default_event: DEFAULT_EVENT.to_string(),
            catch_panics: true,
            max_delta_time: 0.25,
            max_recorded_failures: 64,
            failed_run_hook_window: 8,
        }
    }
}

impl LoopConfig {
    /// Parse and validate a configuration from TOML
    pub fn from_toml_str(source: &str) -> Result<Self> {
        let config: Self = toml::from_str(source)?;
        config.validate()?;
        Ok(config)
    }

    /// Check field ranges
    pub fn validate(&self) -> Result<()> {
        if !self.max_delta_time.is_finite() || self.max_delta_time < 0.0 {
            return Err(LoopError::InvalidConfig {
                field: "max_delta_time",
                reason: format!("must be a finite, non-negative number of seconds, got {}", self.max_delta_time),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = LoopConfig::default();
        assert_eq!(config.default_event, "default");
        assert!(config.catch_panics);
        assert_eq!(config.max_recorded_failures, 64);
        assert_eq!(config.failed_run_hook_window, 8);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_bad_max_delta_time_rejected() {
        for source in ["max_delta_time = -0.5", "max_delta_time = nan", "max_delta_time = inf"] {
            let result = LoopConfig::from_toml_str(source);
            assert!(
                matches!(result, Err(LoopError::InvalidConfig { field: "max_delta_time", .. })),
                "{source} accepted"
            );
        }

        let config = LoopConfig {
            max_delta_time: f64::NAN,
            ..LoopConfig::default()
        };
        assert!(config.validate().is_err());
        assert!(LoopConfig::from_toml_str("max_delta_time = 0.0").is_ok());
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config = LoopConfig::from_toml_str("default_event = \"heartbeat\"\nmax_delta_time = 0.1\n").unwrap();

        assert_eq!(config.default_event, "heartbeat");
        assert_eq!(config.max_delta_time, 0.1);
        assert!(config.catch_panics);
    }

    #[test]
    fn test_invalid_toml() {
        let result = LoopConfig::from_toml_str("catch_panics = \"sometimes\"");
        assert!(matches!(result, Err(LoopError::Config(_))));
    }
}
