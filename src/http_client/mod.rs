//! Retryable HTTP clients and a pool keyed by retry policy.

mod client;
mod pool;

pub use client::build_retryable_client;
pub use pool::{HttpClientPool, HttpClientPoolError};
