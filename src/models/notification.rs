//! The channel-independent view of an alert handed to the notification
//! dispatcher, plus the persisted dedup record.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use crate::models::analysis::RiskLevel;

/// Links included in every outgoing alert.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotificationLinks {
    /// Deep link into the Safe web app for this transaction.
    pub safe_app: String,
    /// Link to the monitoring dashboard, when a base URL is configured.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub safe_monitor: Option<String>,
    /// Block-explorer link, present once the transaction has executed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub etherscan: Option<String>,
}

/// Everything a channel needs to render one alert.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotificationContext {
    /// Watched wallet address.
    pub safe_address: String,
    /// Network display name.
    pub network: String,
    /// The wallet-contract transaction hash.
    pub safe_tx_hash: String,
    /// One-line description of what the transaction does.
    pub description: String,
    /// Wallet nonce.
    pub nonce: i64,
    /// Execution status label: `pending`, `executed` or `failed`.
    pub status: String,
    /// On-chain execution hash, once executed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub execution_hash: Option<String>,
    /// Aggregate risk level from the analyzer.
    pub risk_level: RiskLevel,
    /// Whether the analyzer flagged the transaction as suspicious.
    pub is_suspicious: bool,
    /// Analyzer warnings, in rule order.
    pub warnings: Vec<String>,
    /// Links for the reader.
    pub links: NotificationLinks,
    /// When the alert was generated.
    pub timestamp: DateTime<Utc>,
}

impl NotificationContext {
    /// The `alert_type` discriminator used in webhook payloads and email
    /// subjects.
    pub fn alert_label(&self) -> &'static str {
        if self.is_suspicious {
            "suspicious_transaction"
        } else {
            "transaction"
        }
    }
}

/// The dedup/audit row proving a (transaction, monitor) pair was notified.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct NotificationRecord {
    /// The wallet-contract transaction hash.
    pub safe_tx_hash: String,
    /// The monitor that was notified.
    pub monitor_id: String,
    /// When the notification was recorded.
    pub notified_at: DateTime<Utc>,
}
