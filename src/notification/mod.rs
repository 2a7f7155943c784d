//! Multi-channel notification dispatch.
//!
//! Given a monitor's channel list and a [`NotificationContext`], each
//! channel builds its own payload shape and performs its own network call.
//! A failure on one channel never prevents delivery attempts on the
//! remaining channels.

pub mod email;
pub mod error;
pub mod payload;
mod webhook;

use std::collections::HashMap;

use crate::config::{AppConfig, EmailProviderConfig};
use crate::http_client::HttpClientPool;
use crate::models::monitor::ChannelConfig;
use crate::models::NotificationContext;

use email::EmailNotifier;
use error::NotificationError;
use webhook::WebhookNotifier;

/// Dispatches alerts to configured channels, isolating per-channel
/// failures.
pub struct NotificationService {
    client_pool: HttpClientPool,
    email_provider: Option<EmailProviderConfig>,
}

impl NotificationService {
    /// Creates a dispatcher from application configuration.
    pub fn new(config: &AppConfig) -> Self {
        Self {
            client_pool: HttpClientPool::new(config.http_timeout),
            email_provider: config.email.clone(),
        }
    }

    /// Fans one alert out to every channel. Returns the number of channels
    /// delivered successfully; failures are logged per channel and never
    /// abort the remaining deliveries.
    pub async fn dispatch(&self, channels: &[ChannelConfig], ctx: &NotificationContext) -> usize {
        let mut delivered = 0;
        for channel in channels {
            match self.deliver(channel, ctx).await {
                Ok(()) => {
                    tracing::info!(
                        channel = channel.kind(),
                        safe_tx_hash = %ctx.safe_tx_hash,
                        "notification delivered"
                    );
                    delivered += 1;
                }
                Err(e) => {
                    tracing::error!(
                        channel = channel.kind(),
                        safe_tx_hash = %ctx.safe_tx_hash,
                        error = %e,
                        "notification delivery failed"
                    );
                }
            }
        }
        delivered
    }

    async fn deliver(
        &self,
        channel: &ChannelConfig,
        ctx: &NotificationContext,
    ) -> Result<(), NotificationError> {
        match channel {
            ChannelConfig::Webhook(config) => {
                let client = self.client_pool.get_or_create(&config.retry_policy).await?;
                let notifier = WebhookNotifier::new(
                    config.url.to_string(),
                    config.secret.clone(),
                    config.headers.clone().unwrap_or_default(),
                    client,
                );
                notifier.post_json(&payload::generic_webhook(ctx)).await
            }
            ChannelConfig::Discord(config) => {
                let client = self.client_pool.get_or_create(&config.retry_policy).await?;
                let notifier = WebhookNotifier::new(
                    config.webhook_url.to_string(),
                    None,
                    HashMap::new(),
                    client,
                );
                notifier.post_json(&payload::discord(ctx)).await
            }
            ChannelConfig::Slack(config) => {
                let client = self.client_pool.get_or_create(&config.retry_policy).await?;
                let notifier = WebhookNotifier::new(
                    config.webhook_url.to_string(),
                    None,
                    HashMap::new(),
                    client,
                );
                notifier.post_json(&payload::slack(ctx)).await
            }
            ChannelConfig::Telegram(config) => {
                let client = self.client_pool.get_or_create(&config.retry_policy).await?;
                let url =
                    format!("https://api.telegram.org/bot{}/sendMessage", config.bot_token);
                let notifier = WebhookNotifier::new(url, None, HashMap::new(), client);
                let payload = payload::telegram(
                    &config.chat_id,
                    config.disable_web_preview.unwrap_or(false),
                    ctx,
                );
                notifier.post_json(&payload).await
            }
            ChannelConfig::Email(config) => {
                let provider = self.email_provider.as_ref().ok_or_else(|| {
                    NotificationError::Config(
                        "email channel configured but no email provider is set".to_string(),
                    )
                })?;
                let client = self.client_pool.get_or_create(&config.retry_policy).await?;
                let notifier = EmailNotifier::new(provider.clone(), client);
                notifier.send(&config.to, ctx).await
            }
        }
    }
}
