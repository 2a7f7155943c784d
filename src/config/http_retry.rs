//! Serde-configurable retry policy for outbound HTTP calls.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use super::{duration_from_millis, duration_from_secs};

/// Jitter applied to retry backoff.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JitterSetting {
    /// Deterministic backoff.
    None,
    /// Randomized backoff within the computed bound.
    #[default]
    Full,
}

/// Retry policy for transaction-service and notification-channel calls.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct HttpRetryConfig {
    /// Maximum retry attempts for transient failures.
    #[serde(default = "defaults::max_retries")]
    pub max_retries: u32,
    /// Exponent base for the backoff curve.
    #[serde(default = "defaults::backoff_base")]
    pub backoff_base: u32,
    /// Delay before the first retry.
    #[serde(default = "defaults::initial_backoff", deserialize_with = "duration_from_millis")]
    pub initial_backoff_ms: Duration,
    /// Upper bound on any single backoff delay.
    #[serde(default = "defaults::max_backoff", deserialize_with = "duration_from_secs")]
    pub max_backoff_secs: Duration,
    /// Jitter mode.
    #[serde(default)]
    pub jitter: JitterSetting,
}

mod defaults {
    use std::time::Duration;

    pub(super) fn max_retries() -> u32 {
        3
    }

    pub(super) fn backoff_base() -> u32 {
        2
    }

    pub(super) fn initial_backoff() -> Duration {
        Duration::from_millis(250)
    }

    pub(super) fn max_backoff() -> Duration {
        Duration::from_secs(10)
    }
}

impl Default for HttpRetryConfig {
    fn default() -> Self {
        Self {
            max_retries: defaults::max_retries(),
            backoff_base: defaults::backoff_base(),
            initial_backoff_ms: defaults::initial_backoff(),
            max_backoff_secs: defaults::max_backoff(),
            jitter: JitterSetting::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deserializes_with_all_defaults() {
        let config: HttpRetryConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(config, HttpRetryConfig::default());
    }

    #[test]
    fn deserializes_partial_overrides() {
        let config: HttpRetryConfig =
            serde_json::from_str(r#"{"max_retries": 7, "jitter": "none"}"#).unwrap();
        assert_eq!(config.max_retries, 7);
        assert_eq!(config.jitter, JitterSetting::None);
        assert_eq!(config.initial_backoff_ms, Duration::from_millis(250));
    }
}
