//! Construction of HTTP clients with retry middleware.

use std::time::Duration;

use reqwest_middleware::{ClientBuilder, ClientWithMiddleware};
use reqwest_retry::{policies::ExponentialBackoff, Jitter, RetryTransientMiddleware};

use crate::config::{HttpRetryConfig, JitterSetting};

/// Wraps a base client with an exponential-backoff retry policy.
///
/// The upstream services are third parties; every client also carries a
/// request timeout so a hung call cannot stall a poll cycle.
pub fn build_retryable_client(
    retry: &HttpRetryConfig,
    timeout: Duration,
) -> Result<ClientWithMiddleware, reqwest::Error> {
    let base_client = reqwest::Client::builder()
        .timeout(timeout)
        .connect_timeout(Duration::from_secs(10))
        .build()?;

    let builder = match retry.jitter {
        JitterSetting::None => ExponentialBackoff::builder().jitter(Jitter::None),
        JitterSetting::Full => ExponentialBackoff::builder().jitter(Jitter::Full),
    };
    let policy = builder
        .base(retry.backoff_base)
        .retry_bounds(retry.initial_backoff_ms, retry.max_backoff_secs)
        .build_with_max_retries(retry.max_retries);

    Ok(ClientBuilder::new(base_client)
        .with(RetryTransientMiddleware::new_with_policy(policy))
        .build())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builds_for_every_jitter_setting() {
        for jitter in [JitterSetting::None, JitterSetting::Full] {
            let config = HttpRetryConfig { jitter, ..Default::default() };
            assert!(build_retryable_client(&config, Duration::from_secs(5)).is_ok());
        }
    }
}
