//! Top-level application configuration, loaded from `configs/app.yaml`
//! with `SAFEWATCH__`-prefixed environment overrides.

use std::time::Duration;

use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;
use url::Url;

use super::{duration_from_secs, HttpRetryConfig};

fn default_poll_interval() -> Duration {
    Duration::from_secs(60)
}

fn default_max_concurrent_safes() -> usize {
    20
}

fn default_http_timeout() -> Duration {
    Duration::from_secs(30)
}

fn default_nonce_gap_threshold() -> i64 {
    5
}

fn default_transaction_page_limit() -> usize {
    10
}

fn default_shutdown_timeout() -> Duration {
    Duration::from_secs(30)
}

/// Credentials for the transactional email provider's HTTP API.
#[derive(Debug, Clone, Deserialize)]
pub struct EmailProviderConfig {
    /// Provider endpoint that accepts a JSON send request.
    pub api_url: Url,
    /// Bearer token.
    pub api_key: String,
    /// Sender address.
    pub from_address: String,
}

/// Application configuration for safewatch.
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    /// SQLite database URL.
    pub database_url: String,

    /// Seconds between poll cycles.
    #[serde(
        default = "default_poll_interval",
        rename = "poll_interval_secs",
        deserialize_with = "duration_from_secs"
    )]
    pub poll_interval: Duration,

    /// Maximum (wallet, network) groups processed concurrently per cycle.
    #[serde(default = "default_max_concurrent_safes")]
    pub max_concurrent_safes: usize,

    /// Timeout applied to every outbound HTTP call.
    #[serde(
        default = "default_http_timeout",
        rename = "http_timeout_secs",
        deserialize_with = "duration_from_secs"
    )]
    pub http_timeout: Duration,

    /// Nonce gaps strictly larger than this are flagged.
    #[serde(default = "default_nonce_gap_threshold")]
    pub nonce_gap_threshold: i64,

    /// Maximum transaction-service pages to follow per wallet per cycle.
    #[serde(default = "default_transaction_page_limit")]
    pub transaction_page_limit: usize,

    /// Base URL of the external dashboard, used for links in alerts.
    #[serde(default)]
    pub dashboard_base_url: Option<Url>,

    /// Email provider credentials; the email channel is disabled when unset.
    #[serde(default)]
    pub email: Option<EmailProviderConfig>,

    /// Retry policy for transaction-service calls.
    #[serde(default, rename = "http_retry")]
    pub http_retry_config: HttpRetryConfig,

    /// Maximum time to wait for graceful shutdown.
    #[serde(
        default = "default_shutdown_timeout",
        rename = "shutdown_timeout_secs",
        deserialize_with = "duration_from_secs"
    )]
    pub shutdown_timeout: Duration,
}

impl AppConfig {
    /// Loads configuration from `<config_dir>/app.yaml` plus environment
    /// overrides.
    pub fn new(config_dir: Option<&str>) -> Result<Self, ConfigError> {
        let config_dir = config_dir.unwrap_or("configs");
        Config::builder()
            .add_source(File::with_name(&format!("{config_dir}/app.yaml")))
            .add_source(Environment::with_prefix("SAFEWATCH").separator("__"))
            .build()?
            .try_deserialize()
    }

    /// Creates a builder for tests.
    #[cfg(test)]
    pub fn builder() -> AppConfigBuilder {
        AppConfigBuilder::default()
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            database_url: "sqlite::memory:".to_string(),
            poll_interval: default_poll_interval(),
            max_concurrent_safes: default_max_concurrent_safes(),
            http_timeout: default_http_timeout(),
            nonce_gap_threshold: default_nonce_gap_threshold(),
            transaction_page_limit: default_transaction_page_limit(),
            dashboard_base_url: None,
            email: None,
            http_retry_config: HttpRetryConfig::default(),
            shutdown_timeout: default_shutdown_timeout(),
        }
    }
}

/// Builder for [`AppConfig`] test instances.
#[cfg(test)]
#[derive(Default)]
pub struct AppConfigBuilder {
    config: AppConfig,
}

#[cfg(test)]
impl AppConfigBuilder {
    /// Sets the database URL.
    pub fn database_url(mut self, url: &str) -> Self {
        self.config.database_url = url.to_string();
        self
    }

    /// Sets the poll interval.
    pub fn poll_interval(mut self, interval: Duration) -> Self {
        self.config.poll_interval = interval;
        self
    }

    /// Sets the concurrency cap.
    pub fn max_concurrent_safes(mut self, cap: usize) -> Self {
        self.config.max_concurrent_safes = cap;
        self
    }

    /// Sets the dashboard base URL.
    pub fn dashboard_base_url(mut self, url: &str) -> Self {
        self.config.dashboard_base_url = Some(url.parse().expect("valid url"));
        self
    }

    /// Finalizes the config.
    pub fn build(self) -> AppConfig {
        self.config
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deserializes_yaml_with_defaults() {
        let yaml = "database_url: 'sqlite:test.db'";
        let config: AppConfig = Config::builder()
            .add_source(config::File::from_str(yaml, config::FileFormat::Yaml))
            .build()
            .unwrap()
            .try_deserialize()
            .unwrap();

        assert_eq!(config.poll_interval, Duration::from_secs(60));
        assert_eq!(config.max_concurrent_safes, 20);
        assert_eq!(config.nonce_gap_threshold, 5);
        assert!(config.email.is_none());
    }

    #[test]
    fn deserializes_overrides() {
        let yaml = "
            database_url: 'sqlite:test.db'
            poll_interval_secs: 15
            max_concurrent_safes: 4
            http_retry:
              max_retries: 1
            email:
              api_url: 'https://api.resend.com/emails'
              api_key: 'key'
              from_address: 'alerts@example.org'
        ";
        let config: AppConfig = Config::builder()
            .add_source(config::File::from_str(yaml, config::FileFormat::Yaml))
            .build()
            .unwrap()
            .try_deserialize()
            .unwrap();

        assert_eq!(config.poll_interval, Duration::from_secs(15));
        assert_eq!(config.max_concurrent_safes, 4);
        assert_eq!(config.http_retry_config.max_retries, 1);
        assert_eq!(config.email.unwrap().from_address, "alerts@example.org");
    }
}
