//! Monitor configurations: a user's subscription to a (wallet, network)
//! pair, including its notification channel list.
//!
//! Monitors are created and edited by the external configuration API; the
//! pipeline only ever reads them.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use url::Url;

use crate::config::HttpRetryConfig;

/// Which transactions a monitor wants to be alerted about.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AlertType {
    /// Every transaction, including track-only bookkeeping.
    All,
    /// Suspicious or management transactions (the default).
    #[default]
    Suspicious,
    /// Management transactions only.
    Management,
}

/// Configuration for a generic webhook channel.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WebhookChannelConfig {
    /// Endpoint to POST the event payload to.
    pub url: Url,
    /// Optional HMAC-SHA256 signing secret.
    #[serde(default)]
    pub secret: Option<String>,
    /// Optional extra request headers.
    #[serde(default)]
    pub headers: Option<HashMap<String, String>>,
    /// Retry policy for the delivery call.
    #[serde(default)]
    pub retry_policy: HttpRetryConfig,
}

/// Configuration for a Discord webhook channel.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiscordChannelConfig {
    /// Discord incoming-webhook URL.
    pub webhook_url: Url,
    /// Retry policy for the delivery call.
    #[serde(default)]
    pub retry_policy: HttpRetryConfig,
}

/// Configuration for a Slack webhook channel.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SlackChannelConfig {
    /// Slack incoming-webhook URL.
    pub webhook_url: Url,
    /// Retry policy for the delivery call.
    #[serde(default)]
    pub retry_policy: HttpRetryConfig,
}

/// Configuration for a Telegram bot channel.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TelegramChannelConfig {
    /// Bot API token.
    pub bot_token: String,
    /// Chat to deliver to.
    pub chat_id: String,
    /// Whether to suppress link previews.
    #[serde(default)]
    pub disable_web_preview: Option<bool>,
    /// Retry policy for the delivery call.
    #[serde(default)]
    pub retry_policy: HttpRetryConfig,
}

/// Configuration for an email channel. Provider credentials are global
/// application configuration; only the recipient lives on the monitor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmailChannelConfig {
    /// Recipient address.
    pub to: String,
    /// Retry policy for the delivery call.
    #[serde(default)]
    pub retry_policy: HttpRetryConfig,
}

/// One configured notification channel.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ChannelConfig {
    /// Generic JSON webhook.
    Webhook(WebhookChannelConfig),
    /// Discord embed.
    Discord(DiscordChannelConfig),
    /// Slack block-kit message.
    Slack(SlackChannelConfig),
    /// Telegram bot message.
    Telegram(TelegramChannelConfig),
    /// Transactional email.
    Email(EmailChannelConfig),
}

impl ChannelConfig {
    /// Short channel label for logging.
    pub fn kind(&self) -> &'static str {
        match self {
            ChannelConfig::Webhook(_) => "webhook",
            ChannelConfig::Discord(_) => "discord",
            ChannelConfig::Slack(_) => "slack",
            ChannelConfig::Telegram(_) => "telegram",
            ChannelConfig::Email(_) => "email",
        }
    }
}

/// Per-monitor behavior settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MonitorSettings {
    /// Inactive monitors are never polled or notified.
    #[serde(default = "default_active")]
    pub active: bool,
    /// Alert-type selector.
    #[serde(default)]
    pub alert_type: AlertType,
    /// Legacy flag: restricts alerts to management operations regardless of
    /// `alert_type`.
    #[serde(default)]
    pub management_only: bool,
    /// Ordered notification channel list.
    #[serde(default)]
    pub channels: Vec<ChannelConfig>,
}

fn default_active() -> bool {
    true
}

impl Default for MonitorSettings {
    fn default() -> Self {
        Self {
            active: true,
            alert_type: AlertType::default(),
            management_only: false,
            channels: Vec::new(),
        }
    }
}

/// A user's subscription to one (wallet, network) pair.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Monitor {
    /// Unique monitor identifier.
    pub id: String,
    /// Owning user.
    pub user_id: String,
    /// Watched wallet address, normalized lowercase.
    pub safe_address: String,
    /// Network name from the registry.
    pub network: String,
    /// Creation timestamp; transactions submitted before it never notify.
    pub created_at: DateTime<Utc>,
    /// Behavior settings.
    pub settings: MonitorSettings,
}

impl Monitor {
    /// The (wallet, network) grouping key, case-normalized.
    pub fn pair_key(&self) -> (String, String) {
        (self.safe_address.to_lowercase(), self.network.to_lowercase())
    }

    /// The alert type after applying the legacy management-only override.
    pub fn effective_alert_type(&self) -> AlertType {
        if self.settings.management_only {
            AlertType::Management
        } else {
            self.settings.alert_type
        }
    }
}
