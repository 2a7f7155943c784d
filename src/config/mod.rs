//! Application configuration.

mod app_config;
mod http_retry;

pub use app_config::{AppConfig, EmailProviderConfig};
pub use http_retry::{HttpRetryConfig, JitterSetting};

use serde::{Deserialize, Deserializer};
use std::time::Duration;

/// Deserializes a `Duration` from a number of seconds.
pub(crate) fn duration_from_secs<'de, D>(deserializer: D) -> Result<Duration, D::Error>
where
    D: Deserializer<'de>,
{
    let secs = u64::deserialize(deserializer)?;
    Ok(Duration::from_secs(secs))
}

/// Deserializes a `Duration` from a number of milliseconds.
pub(crate) fn duration_from_millis<'de, D>(deserializer: D) -> Result<Duration, D::Error>
where
    D: Deserializer<'de>,
{
    let ms = u64::deserialize(deserializer)?;
    Ok(Duration::from_millis(ms))
}
