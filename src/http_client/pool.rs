//! A thread-safe pool of HTTP clients keyed by retry policy.
//!
//! Notification channels may each carry their own retry policy; the pool
//! guarantees one shared client per distinct policy so connection reuse
//! still works.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use reqwest_middleware::ClientWithMiddleware;
use thiserror::Error;
use tokio::sync::RwLock;

use super::client::build_retryable_client;
use crate::config::HttpRetryConfig;

/// Errors from the client pool.
#[derive(Debug, Error)]
pub enum HttpClientPoolError {
    /// Building the underlying `reqwest` client failed.
    #[error("failed to build HTTP client: {0}")]
    Build(#[from] reqwest::Error),
}

/// Pool of retry-configured HTTP clients.
pub struct HttpClientPool {
    timeout: Duration,
    clients: RwLock<HashMap<HttpRetryConfig, Arc<ClientWithMiddleware>>>,
}

impl HttpClientPool {
    /// Creates an empty pool whose clients all carry the given timeout.
    pub fn new(timeout: Duration) -> Self {
        Self { timeout, clients: RwLock::new(HashMap::new()) }
    }

    /// Returns the pooled client for a retry policy, creating it on first
    /// use.
    pub async fn get_or_create(
        &self,
        retry: &HttpRetryConfig,
    ) -> Result<Arc<ClientWithMiddleware>, HttpClientPoolError> {
        if let Some(client) = self.clients.read().await.get(retry) {
            return Ok(Arc::clone(client));
        }

        let mut clients = self.clients.write().await;
        // Another task may have created the client while we waited for the
        // write lock.
        if let Some(client) = clients.get(retry) {
            return Ok(Arc::clone(client));
        }
        let client = Arc::new(build_retryable_client(retry, self.timeout)?);
        clients.insert(retry.clone(), Arc::clone(&client));
        Ok(client)
    }

    /// Number of distinct clients currently pooled.
    #[cfg(test)]
    pub async fn len(&self) -> usize {
        self.clients.read().await.len()
    }
}
