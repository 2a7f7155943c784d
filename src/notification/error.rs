//! Error types for the notification dispatcher.

use thiserror::Error;

use crate::http_client::HttpClientPoolError;

/// Errors raised while delivering to a single channel.
#[derive(Debug, Error)]
pub enum NotificationError {
    /// The channel is misconfigured (missing provider, bad header, ...).
    #[error("channel configuration error: {0}")]
    Config(String),

    /// The payload could not be serialized.
    #[error("failed to encode payload: {0}")]
    Payload(#[from] serde_json::Error),

    /// The HTTP client pool could not provide a client.
    #[error("HTTP client error: {0}")]
    ClientPool(#[from] HttpClientPoolError),

    /// Transport-level failure talking to the channel endpoint.
    #[error("request error: {0}")]
    Request(#[from] reqwest_middleware::Error),

    /// The channel endpoint rejected the delivery.
    #[error("delivery failed: {0}")]
    DeliveryFailed(String),
}
