//! Email delivery through a transactional provider's HTTP API.
//!
//! The provider receives a JSON send request with both HTML and plain-text
//! bodies; the subject is prefixed for suspicious transactions.

use std::sync::Arc;

use reqwest_middleware::ClientWithMiddleware;
use serde_json::json;

use super::error::NotificationError;
use crate::config::EmailProviderConfig;
use crate::models::NotificationContext;

/// Sends alert emails via the configured provider.
pub struct EmailNotifier {
    provider: EmailProviderConfig,
    client: Arc<ClientWithMiddleware>,
}

impl EmailNotifier {
    /// Creates a notifier bound to one provider configuration.
    pub fn new(provider: EmailProviderConfig, client: Arc<ClientWithMiddleware>) -> Self {
        Self { provider, client }
    }

    /// Subject line; varies by suspicion.
    fn subject(ctx: &NotificationContext) -> String {
        if ctx.is_suspicious {
            format!("[SUSPICIOUS] Safe transaction on {} — nonce {}", ctx.network, ctx.nonce)
        } else {
            format!("Safe transaction on {} — nonce {}", ctx.network, ctx.nonce)
        }
    }

    /// Plain-text body.
    fn text_body(ctx: &NotificationContext) -> String {
        let mut body = format!(
            "Safe: {}\nNetwork: {}\nDescription: {}\nNonce: {}\nStatus: {}\nHash: {}\n",
            ctx.safe_address, ctx.network, ctx.description, ctx.nonce, ctx.status, ctx.safe_tx_hash
        );
        if !ctx.warnings.is_empty() {
            body.push_str("\nWarnings:\n");
            for warning in &ctx.warnings {
                body.push_str(&format!("- {warning}\n"));
            }
        }
        body.push_str(&format!("\nSafe App: {}\n", ctx.links.safe_app));
        if let Some(explorer) = &ctx.links.etherscan {
            body.push_str(&format!("Explorer: {explorer}\n"));
        }
        body
    }

    /// HTML body.
    fn html_body(ctx: &NotificationContext) -> String {
        let header_color = if ctx.is_suspicious { "#cc0000" } else { "#0066cc" };
        let mut rows = vec![
            ("Safe", ctx.safe_address.clone()),
            ("Network", ctx.network.clone()),
            ("Description", ctx.description.clone()),
            ("Nonce", ctx.nonce.to_string()),
            ("Status", ctx.status.clone()),
            ("Hash", ctx.safe_tx_hash.clone()),
        ];
        if let Some(execution_hash) = &ctx.execution_hash {
            rows.push(("Execution hash", execution_hash.clone()));
        }

        let mut body = String::from("<html><body>");
        body.push_str(&format!(
            "<h2 style='color: {header_color};'>{}</h2>",
            Self::subject(ctx)
        ));
        body.push_str("<table cellpadding='4'>");
        for (name, value) in rows {
            body.push_str(&format!(
                "<tr><td><strong>{name}</strong></td><td>{value}</td></tr>"
            ));
        }
        body.push_str("</table>");
        if !ctx.warnings.is_empty() {
            body.push_str(
                "<div style='margin: 10px 0; padding: 10px; background-color: #fff3f3; \
                 border-left: 4px solid #cc0000;'><strong>Warnings</strong><ul>",
            );
            for warning in &ctx.warnings {
                body.push_str(&format!("<li>{warning}</li>"));
            }
            body.push_str("</ul></div>");
        }
        body.push_str(&format!(
            "<p><a href='{}'>Open in Safe App</a></p>",
            ctx.links.safe_app
        ));
        body.push_str("</body></html>");
        body
    }

    /// Sends one alert email.
    pub async fn send(
        &self,
        to: &str,
        ctx: &NotificationContext,
    ) -> Result<(), NotificationError> {
        let payload = json!({
            "from": self.provider.from_address,
            "to": [to],
            "subject": Self::subject(ctx),
            "html": Self::html_body(ctx),
            "text": Self::text_body(ctx),
        });

        let response = self
            .client
            .post(self.provider.api_url.clone())
            .bearer_auth(&self.provider.api_key)
            .json(&payload)
            .send()
            .await?;
        let status = response.status();
        if !status.is_success() {
            return Err(NotificationError::DeliveryFailed(format!(
                "email provider answered with status {status}"
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use chrono::Utc;
    use mockito::Matcher;

    use super::*;
    use crate::config::HttpRetryConfig;
    use crate::http_client::build_retryable_client;
    use crate::models::analysis::RiskLevel;
    use crate::models::notification::NotificationLinks;

    fn context(suspicious: bool) -> NotificationContext {
        NotificationContext {
            safe_address: "0x5afe".into(),
            network: "ethereum".into(),
            safe_tx_hash: "0xaaa".into(),
            description: "changeThreshold(_threshold)".into(),
            nonce: 8,
            status: "pending".into(),
            execution_hash: None,
            risk_level: RiskLevel::Critical,
            is_suspicious: suspicious,
            warnings: vec!["Threshold Changed to 1".into()],
            links: NotificationLinks {
                safe_app: "https://app.safe.global/tx".into(),
                safe_monitor: None,
                etherscan: None,
            },
            timestamp: Utc::now(),
        }
    }

    fn notifier(api_url: String) -> EmailNotifier {
        let retry = HttpRetryConfig { max_retries: 0, ..Default::default() };
        let client = Arc::new(build_retryable_client(&retry, Duration::from_secs(2)).unwrap());
        EmailNotifier::new(
            EmailProviderConfig {
                api_url: api_url.parse().unwrap(),
                api_key: "key-123".into(),
                from_address: "alerts@example.org".into(),
            },
            client,
        )
    }

    #[test]
    fn subject_is_prefixed_for_suspicious_transactions() {
        assert!(EmailNotifier::subject(&context(true)).starts_with("[SUSPICIOUS]"));
        assert!(!EmailNotifier::subject(&context(false)).starts_with("[SUSPICIOUS]"));
    }

    #[test]
    fn bodies_carry_the_warning_list() {
        let ctx = context(true);
        assert!(EmailNotifier::text_body(&ctx).contains("- Threshold Changed to 1"));
        assert!(EmailNotifier::html_body(&ctx).contains("<li>Threshold Changed to 1</li>"));
    }

    #[tokio::test]
    async fn send_posts_html_and_text_parts_with_bearer_auth() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/emails")
            .match_header("authorization", "Bearer key-123")
            .match_body(Matcher::AllOf(vec![
                Matcher::PartialJson(serde_json::json!({
                    "from": "alerts@example.org",
                    "to": ["ops@example.org"],
                })),
                Matcher::Regex("html".to_string()),
                Matcher::Regex("text".to_string()),
            ]))
            .with_status(200)
            .create_async()
            .await;

        let notifier = notifier(format!("{}/emails", server.url()));
        notifier.send("ops@example.org", &context(true)).await.unwrap();
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn provider_rejection_is_a_delivery_failure() {
        let mut server = mockito::Server::new_async().await;
        server.mock("POST", "/emails").with_status(422).create_async().await;

        let notifier = notifier(format!("{}/emails", server.url()));
        let err = notifier.send("ops@example.org", &context(false)).await.unwrap_err();
        assert!(matches!(err, NotificationError::DeliveryFailed(_)));
    }
}
