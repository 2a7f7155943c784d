//! HTTP client for the Safe transaction service.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::StatusCode;
use reqwest_middleware::ClientWithMiddleware;
use serde::Deserialize;

use super::traits::{SourceError, TransactionSource};
use crate::models::{SafeInfo, SafeTransaction};
use crate::networks::Network;

/// One page of the v2 multisig-transactions listing.
#[derive(Debug, Deserialize)]
struct TransactionPage {
    #[serde(default)]
    next: Option<String>,
    #[serde(default)]
    results: Vec<SafeTransaction>,
}

/// Client for the per-network Safe transaction service.
pub struct SafeTransactionService {
    client: Arc<ClientWithMiddleware>,
    /// Hard cap on pages followed per wallet per cycle, so one wallet with
    /// a deep history cannot stall the whole cycle.
    page_limit: usize,
}

impl SafeTransactionService {
    /// Creates a service client.
    pub fn new(client: Arc<ClientWithMiddleware>, page_limit: usize) -> Self {
        Self { client, page_limit: page_limit.max(1) }
    }

    async fn get_json<T: serde::de::DeserializeOwned>(
        &self,
        url: &str,
        not_found: impl FnOnce() -> SourceError,
    ) -> Result<T, SourceError> {
        let response = self.client.get(url).send().await?;
        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            return Err(not_found());
        }
        if !status.is_success() {
            return Err(SourceError::UnexpectedStatus { status, url: url.to_string() });
        }
        Ok(response.json::<T>().await?)
    }
}

#[async_trait]
impl TransactionSource for SafeTransactionService {
    #[tracing::instrument(skip(self), fields(network = %network.name), level = "debug")]
    async fn safe_info(
        &self,
        network: &'static Network,
        address: &str,
    ) -> Result<SafeInfo, SourceError> {
        let url = format!("{}/api/v1/safes/{}/", network.service_base, address);
        self.get_json(&url, || SourceError::SafeNotFound {
            address: address.to_string(),
            network: network.name.to_string(),
        })
        .await
    }

    #[tracing::instrument(skip(self), fields(network = %network.name), level = "debug")]
    async fn transactions_modified_since(
        &self,
        network: &'static Network,
        address: &str,
        since: Option<DateTime<Utc>>,
    ) -> Result<Vec<SafeTransaction>, SourceError> {
        let mut url = format!(
            "{}/api/v2/safes/{}/multisig-transactions/",
            network.service_base, address
        );
        if let Some(since) = since {
            url = format!(
                "{url}?modified__gte={}",
                urlencoding::encode(&since.to_rfc3339())
            );
        }

        let mut transactions = Vec::new();
        let mut pages_followed = 0;
        let mut next_url = Some(url);

        while let Some(url) = next_url {
            if pages_followed >= self.page_limit {
                tracing::warn!(
                    address,
                    page_limit = self.page_limit,
                    "transaction page limit reached, deferring the rest to the next cycle"
                );
                break;
            }
            let page: TransactionPage = self
                .get_json(&url, || SourceError::SafeNotFound {
                    address: address.to_string(),
                    network: network.name.to_string(),
                })
                .await?;
            transactions.extend(page.results);
            next_url = page.next;
            pages_followed += 1;
        }

        Ok(transactions)
    }
}
