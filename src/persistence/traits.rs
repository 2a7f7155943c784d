//! The state-store interface consumed by the engine.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
#[cfg(test)]
use mockall::automock;

use crate::models::analysis::SecurityAnalysisResult;
use crate::models::checkpoint::CheckpointState;
use crate::models::monitor::Monitor;
use crate::models::transaction::{SafeTransaction, StoredTransaction};
use crate::persistence::error::PersistenceError;

/// Durable state operations. Writes to the same (wallet, network) pair are
/// only ever issued by that pair's processing task, so no additional
/// locking is layered on top of the database.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait StateRepository: Send + Sync {
    /// All monitors whose settings mark them active.
    async fn active_monitors(&self) -> Result<Vec<Monitor>, PersistenceError>;

    /// The poll checkpoint for a (wallet, network) pair.
    async fn checkpoint(
        &self,
        safe_address: &str,
        network: &str,
    ) -> Result<Option<CheckpointState>, PersistenceError>;

    /// Records that the pair was polled at `at`.
    async fn touch_last_polled(
        &self,
        safe_address: &str,
        network: &str,
        at: DateTime<Utc>,
    ) -> Result<(), PersistenceError>;

    /// Advances the incremental-fetch lower bound to `at`.
    async fn advance_last_tx_found(
        &self,
        safe_address: &str,
        network: &str,
        at: DateTime<Utc>,
    ) -> Result<(), PersistenceError>;

    /// Loads a stored transaction by its hash within a pair.
    async fn stored_transaction(
        &self,
        safe_tx_hash: &str,
        safe_address: &str,
        network: &str,
    ) -> Result<Option<StoredTransaction>, PersistenceError>;

    /// Inserts a transaction or updates the stored copy in place; never
    /// duplicates the (hash, wallet, network) key.
    async fn upsert_transaction(
        &self,
        safe_address: &str,
        network: &str,
        tx: &SafeTransaction,
    ) -> Result<(), PersistenceError>;

    /// Highest nonce among stored transactions for a pair, excluding the
    /// named transaction so re-analysis never compares a nonce to itself.
    async fn highest_nonce(
        &self,
        safe_address: &str,
        network: &str,
        exclude_tx_hash: &str,
    ) -> Result<Option<i64>, PersistenceError>;

    /// Inserts or updates the analysis row for a transaction.
    async fn upsert_analysis(
        &self,
        safe_tx_hash: &str,
        safe_address: &str,
        network: &str,
        result: &SecurityAnalysisResult,
    ) -> Result<(), PersistenceError>;

    /// Insert-if-absent on the (transaction, monitor) dedup key. Returns
    /// `true` when this call created the record, `false` when it already
    /// existed — the idempotency verdict under concurrent dispatch.
    async fn record_notification(
        &self,
        safe_tx_hash: &str,
        monitor_id: &str,
        at: DateTime<Utc>,
    ) -> Result<bool, PersistenceError>;

    /// Whether a (transaction, monitor) pair has already been notified.
    async fn notification_exists(
        &self,
        safe_tx_hash: &str,
        monitor_id: &str,
    ) -> Result<bool, PersistenceError>;

    /// Flushes pending writes before shutdown.
    async fn flush(&self) -> Result<(), PersistenceError>;
}
