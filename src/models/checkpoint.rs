//! Durable per-(wallet, network) polling cursor.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// The poll cursor for one (wallet, network) pair.
///
/// `last_tx_found_at` is the `modified__gte` lower bound for the next
/// incremental fetch; `last_polled_at` is bookkeeping for the dashboard.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct CheckpointState {
    /// Wallet address, normalized lowercase.
    pub safe_address: String,
    /// Network name.
    pub network: String,
    /// When the pair was last polled.
    pub last_polled_at: Option<DateTime<Utc>>,
    /// Processing timestamp of the last cycle that returned transactions.
    pub last_tx_found_at: Option<DateTime<Utc>>,
}
