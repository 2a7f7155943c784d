//! JSON webhook delivery with optional HMAC-SHA256 payload signing.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::Utc;
use hmac::{Hmac, Mac};
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, CONTENT_TYPE};
use reqwest_middleware::ClientWithMiddleware;
use sha2::Sha256;

use super::error::NotificationError;

type HmacSha256 = Hmac<Sha256>;

/// POSTs JSON payloads to a webhook endpoint.
pub struct WebhookNotifier {
    url: String,
    secret: Option<String>,
    headers: HashMap<String, String>,
    client: Arc<ClientWithMiddleware>,
}

impl WebhookNotifier {
    /// Creates a notifier for one endpoint.
    pub fn new(
        url: String,
        secret: Option<String>,
        headers: HashMap<String, String>,
        client: Arc<ClientWithMiddleware>,
    ) -> Self {
        Self { url, secret, headers, client }
    }

    /// Signs the serialized payload together with a millisecond timestamp.
    fn sign_payload(
        secret: &str,
        payload: &serde_json::Value,
    ) -> Result<(String, String), NotificationError> {
        // HmacSha256 accepts empty keys, so reject them explicitly.
        if secret.is_empty() {
            return Err(NotificationError::Config("signing secret cannot be empty".to_string()));
        }
        let timestamp = Utc::now().timestamp_millis();
        let mut mac = HmacSha256::new_from_slice(secret.as_bytes())
            .map_err(|e| NotificationError::Config(format!("invalid signing secret: {e}")))?;
        let serialized = serde_json::to_string(payload)?;
        mac.update(format!("{serialized}{timestamp}").as_bytes());
        let signature = hex::encode(mac.finalize().into_bytes());
        Ok((signature, timestamp.to_string()))
    }

    /// Sends the payload, failing on any non-success status.
    pub async fn post_json(&self, payload: &serde_json::Value) -> Result<(), NotificationError> {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

        if let Some(secret) = &self.secret {
            let (signature, timestamp) = Self::sign_payload(secret, payload)?;
            headers.insert(
                HeaderName::from_static("x-signature"),
                HeaderValue::from_str(&signature).map_err(|e| {
                    NotificationError::Config(format!("invalid signature header: {e}"))
                })?,
            );
            headers.insert(
                HeaderName::from_static("x-timestamp"),
                HeaderValue::from_str(&timestamp).map_err(|e| {
                    NotificationError::Config(format!("invalid timestamp header: {e}"))
                })?,
            );
        }

        for (key, value) in &self.headers {
            let name = HeaderName::from_bytes(key.as_bytes()).map_err(|e| {
                NotificationError::Config(format!("invalid header name {key}: {e}"))
            })?;
            let value = HeaderValue::from_str(value).map_err(|e| {
                NotificationError::Config(format!("invalid header value for {key}: {e}"))
            })?;
            headers.insert(name, value);
        }

        let response =
            self.client.post(self.url.as_str()).headers(headers).json(payload).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(NotificationError::DeliveryFailed(format!(
                "webhook endpoint answered with status {status}"
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use mockito::Matcher;
    use serde_json::json;

    use super::*;
    use crate::config::HttpRetryConfig;
    use crate::http_client::build_retryable_client;

    fn client() -> Arc<ClientWithMiddleware> {
        let retry = HttpRetryConfig { max_retries: 0, ..Default::default() };
        Arc::new(build_retryable_client(&retry, Duration::from_secs(2)).unwrap())
    }

    #[test]
    fn signing_rejects_empty_secret() {
        let result = WebhookNotifier::sign_payload("", &json!({"a": 1}));
        assert!(matches!(result, Err(NotificationError::Config(_))));
    }

    #[test]
    fn signature_is_hex_and_timestamp_is_numeric() {
        let (signature, timestamp) =
            WebhookNotifier::sign_payload("top-secret", &json!({"a": 1})).unwrap();
        assert!(hex::decode(&signature).is_ok());
        assert_eq!(signature.len(), 64);
        assert!(timestamp.parse::<i64>().is_ok());
    }

    #[tokio::test]
    async fn secret_adds_signature_headers() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/")
            .match_header("x-signature", Matcher::Regex("^[0-9a-f]{64}$".to_string()))
            .match_header("x-timestamp", Matcher::Regex("^[0-9]+$".to_string()))
            .match_header("content-type", "application/json")
            .with_status(200)
            .create_async()
            .await;

        let notifier =
            WebhookNotifier::new(server.url(), Some("top-secret".into()), HashMap::new(), client());
        notifier.post_json(&json!({"event_type": "safe_transaction"})).await.unwrap();
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn custom_headers_are_forwarded() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/")
            .match_header("x-api-key", "k-123")
            .with_status(200)
            .create_async()
            .await;

        let headers = HashMap::from([("x-api-key".to_string(), "k-123".to_string())]);
        let notifier = WebhookNotifier::new(server.url(), None, headers, client());
        notifier.post_json(&json!({})).await.unwrap();
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn non_success_status_is_a_delivery_failure() {
        let mut server = mockito::Server::new_async().await;
        server.mock("POST", "/").with_status(429).create_async().await;

        let notifier = WebhookNotifier::new(server.url(), None, HashMap::new(), client());
        let err = notifier.post_json(&json!({})).await.unwrap_err();
        assert!(matches!(err, NotificationError::DeliveryFailed(_)));
    }

    #[tokio::test]
    async fn invalid_header_name_is_a_config_error() {
        let headers = HashMap::from([("bad header!".to_string(), "v".to_string())]);
        let notifier =
            WebhookNotifier::new("http://localhost:1".into(), None, headers, client());
        let err = notifier.post_json(&json!({})).await.unwrap_err();
        assert!(matches!(err, NotificationError::Config(_)));
    }
}
