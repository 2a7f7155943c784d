//! The interface to the upstream transaction-indexing service.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
#[cfg(test)]
use mockall::automock;
use thiserror::Error;

use crate::models::{SafeInfo, SafeTransaction};
use crate::networks::Network;

/// Errors from the transaction source.
#[derive(Debug, Error)]
pub enum SourceError {
    /// The wallet is not indexed by the service on this network.
    #[error("safe {address} is not known to the transaction service for {network}")]
    SafeNotFound {
        /// The probed wallet address.
        address: String,
        /// The network the probe ran against.
        network: String,
    },

    /// Transport-level failure (DNS, connect, timeout, retry exhaustion).
    #[error("transaction service request failed: {0}")]
    Request(#[from] reqwest_middleware::Error),

    /// The service answered but the body could not be read or decoded.
    #[error("transaction service response error: {0}")]
    Response(#[from] reqwest::Error),

    /// The service answered with a status the client does not handle.
    #[error("transaction service returned status {status} for {url}")]
    UnexpectedStatus {
        /// HTTP status received.
        status: reqwest::StatusCode,
        /// Request URL, for the logs.
        url: String,
    },
}

impl SourceError {
    /// Whether the error means the wallet does not exist upstream, as
    /// opposed to a transient failure worth retrying next cycle.
    pub fn is_not_found(&self) -> bool {
        matches!(self, SourceError::SafeNotFound { .. })
    }
}

/// Read access to the per-network transaction-indexing API.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait TransactionSource: Send + Sync {
    /// Probes wallet existence and returns its on-chain metadata.
    async fn safe_info(
        &self,
        network: &'static Network,
        address: &str,
    ) -> Result<SafeInfo, SourceError>;

    /// Lists multisig transactions modified at or after `since`, oldest
    /// first as returned by the service. `None` fetches the full history.
    async fn transactions_modified_since(
        &self,
        network: &'static Network,
        address: &str,
        since: Option<DateTime<Utc>>,
    ) -> Result<Vec<SafeTransaction>, SourceError>;
}
