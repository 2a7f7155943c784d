//! SQLite-backed implementation of the state store.

use std::str::FromStr;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::sqlite::SqliteConnectOptions;
use sqlx::{FromRow, Row, SqlitePool};

use crate::models::analysis::SecurityAnalysisResult;
use crate::models::checkpoint::CheckpointState;
use crate::models::monitor::{AlertType, ChannelConfig, Monitor, MonitorSettings};
use crate::models::transaction::{SafeTransaction, StoredTransaction};
use crate::persistence::error::PersistenceError;
use crate::persistence::traits::StateRepository;

/// State store backed by a SQLite database.
pub struct SqliteStateRepository {
    pool: SqlitePool,
}

/// Row shape of the monitors table; `channels` is a JSON column.
#[derive(FromRow)]
struct MonitorRow {
    monitor_id: String,
    user_id: String,
    safe_address: String,
    network: String,
    active: bool,
    alert_type: String,
    management_only: bool,
    channels: String,
    created_at: DateTime<Utc>,
}

impl MonitorRow {
    fn into_monitor(self) -> Result<Monitor, PersistenceError> {
        let channels: Vec<ChannelConfig> = serde_json::from_str(&self.channels)?;
        let alert_type = match self.alert_type.as_str() {
            "all" => AlertType::All,
            "management" => AlertType::Management,
            _ => AlertType::Suspicious,
        };
        Ok(Monitor {
            id: self.monitor_id,
            user_id: self.user_id,
            safe_address: self.safe_address.to_lowercase(),
            network: self.network,
            created_at: self.created_at,
            settings: MonitorSettings {
                active: self.active,
                alert_type,
                management_only: self.management_only,
                channels,
            },
        })
    }
}

fn alert_type_column(alert_type: AlertType) -> &'static str {
    match alert_type {
        AlertType::All => "all",
        AlertType::Suspicious => "suspicious",
        AlertType::Management => "management",
    }
}

impl SqliteStateRepository {
    /// Connects to the database, creating the file if missing.
    #[tracing::instrument(level = "info")]
    pub async fn new(database_url: &str) -> Result<Self, PersistenceError> {
        let options = SqliteConnectOptions::from_str(database_url)
            .map_err(|e| PersistenceError::InvalidInput(e.to_string()))?
            .create_if_missing(true);
        let pool = SqlitePool::connect_with(options).await?;
        tracing::info!(database_url, "connected to SQLite database");
        Ok(Self { pool })
    }

    /// Runs pending schema migrations.
    #[tracing::instrument(skip(self), level = "info")]
    pub async fn run_migrations(&self) -> Result<(), PersistenceError> {
        sqlx::migrate!("./migrations").run(&self.pool).await.map_err(|e| {
            tracing::error!(error = %e, "database migration failed");
            PersistenceError::Migration(e.to_string())
        })?;
        tracing::info!("database migrations completed");
        Ok(())
    }

    /// Access to the underlying pool for callers with bespoke queries.
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Closes the connection pool gracefully.
    pub async fn close(&self) {
        self.pool.close().await;
    }

    /// Inserts a monitor row. The configuration API owns monitor writes;
    /// this seam exists for it and for tests.
    pub async fn add_monitor(&self, monitor: &Monitor) -> Result<(), PersistenceError> {
        let channels = serde_json::to_string(&monitor.settings.channels)?;
        sqlx::query(
            "INSERT INTO monitors \
             (monitor_id, user_id, safe_address, network, active, alert_type, management_only, channels, created_at) \
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(&monitor.id)
        .bind(&monitor.user_id)
        .bind(monitor.safe_address.to_lowercase())
        .bind(&monitor.network)
        .bind(monitor.settings.active)
        .bind(alert_type_column(monitor.settings.alert_type))
        .bind(monitor.settings.management_only)
        .bind(channels)
        .bind(monitor.created_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    /// Reads back the stored analysis JSON for a transaction, if any.
    pub async fn analysis_json(
        &self,
        safe_tx_hash: &str,
        safe_address: &str,
    ) -> Result<Option<String>, PersistenceError> {
        let row = sqlx::query(
            "SELECT result_json FROM analysis_results WHERE safe_tx_hash = ? AND safe_address = ?",
        )
        .bind(safe_tx_hash)
        .bind(safe_address.to_lowercase())
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(|r| r.get::<String, _>("result_json")))
    }
}

#[async_trait]
impl StateRepository for SqliteStateRepository {
    #[tracing::instrument(skip(self), level = "debug")]
    async fn active_monitors(&self) -> Result<Vec<Monitor>, PersistenceError> {
        let rows: Vec<MonitorRow> = sqlx::query_as(
            "SELECT monitor_id, user_id, safe_address, network, active, alert_type, \
             management_only, channels, created_at \
             FROM monitors WHERE active = 1 ORDER BY created_at",
        )
        .fetch_all(&self.pool)
        .await?;
        rows.into_iter().map(MonitorRow::into_monitor).collect()
    }

    #[tracing::instrument(skip(self), level = "debug")]
    async fn checkpoint(
        &self,
        safe_address: &str,
        network: &str,
    ) -> Result<Option<CheckpointState>, PersistenceError> {
        let checkpoint: Option<CheckpointState> = sqlx::query_as(
            "SELECT safe_address, network, last_polled_at, last_tx_found_at \
             FROM checkpoints WHERE safe_address = ? AND network = ?",
        )
        .bind(safe_address.to_lowercase())
        .bind(network)
        .fetch_optional(&self.pool)
        .await?;
        Ok(checkpoint)
    }

    #[tracing::instrument(skip(self), level = "debug")]
    async fn touch_last_polled(
        &self,
        safe_address: &str,
        network: &str,
        at: DateTime<Utc>,
    ) -> Result<(), PersistenceError> {
        sqlx::query(
            "INSERT INTO checkpoints (safe_address, network, last_polled_at) VALUES (?, ?, ?) \
             ON CONFLICT (safe_address, network) DO UPDATE SET last_polled_at = excluded.last_polled_at",
        )
        .bind(safe_address.to_lowercase())
        .bind(network)
        .bind(at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    #[tracing::instrument(skip(self), level = "debug")]
    async fn advance_last_tx_found(
        &self,
        safe_address: &str,
        network: &str,
        at: DateTime<Utc>,
    ) -> Result<(), PersistenceError> {
        sqlx::query(
            "INSERT INTO checkpoints (safe_address, network, last_tx_found_at) VALUES (?, ?, ?) \
             ON CONFLICT (safe_address, network) DO UPDATE SET last_tx_found_at = excluded.last_tx_found_at",
        )
        .bind(safe_address.to_lowercase())
        .bind(network)
        .bind(at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    #[tracing::instrument(skip(self), level = "debug")]
    async fn stored_transaction(
        &self,
        safe_tx_hash: &str,
        safe_address: &str,
        network: &str,
    ) -> Result<Option<StoredTransaction>, PersistenceError> {
        let stored: Option<StoredTransaction> = sqlx::query_as(
            "SELECT safe_tx_hash, safe_address, network, nonce, is_executed, confirmation_count, \
             submission_date, execution_date, execution_tx_hash, raw_json \
             FROM safe_transactions \
             WHERE safe_tx_hash = ? AND safe_address = ? AND network = ?",
        )
        .bind(safe_tx_hash)
        .bind(safe_address.to_lowercase())
        .bind(network)
        .fetch_optional(&self.pool)
        .await?;
        Ok(stored)
    }

    #[tracing::instrument(skip(self, tx), fields(safe_tx_hash = %tx.safe_tx_hash), level = "debug")]
    async fn upsert_transaction(
        &self,
        safe_address: &str,
        network: &str,
        tx: &SafeTransaction,
    ) -> Result<(), PersistenceError> {
        let raw_json = serde_json::to_string(tx)?;
        let now = Utc::now();
        sqlx::query(
            "INSERT INTO safe_transactions \
             (safe_tx_hash, safe_address, network, nonce, is_executed, confirmation_count, \
              submission_date, execution_date, execution_tx_hash, raw_json, first_seen_at, updated_at) \
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?) \
             ON CONFLICT (safe_tx_hash, safe_address, network) DO UPDATE SET \
               nonce = excluded.nonce, \
               is_executed = excluded.is_executed, \
               confirmation_count = excluded.confirmation_count, \
               submission_date = excluded.submission_date, \
               execution_date = excluded.execution_date, \
               execution_tx_hash = excluded.execution_tx_hash, \
               raw_json = excluded.raw_json, \
               updated_at = excluded.updated_at",
        )
        .bind(&tx.safe_tx_hash)
        .bind(safe_address.to_lowercase())
        .bind(network)
        .bind(tx.nonce)
        .bind(tx.is_executed)
        .bind(tx.confirmation_count() as i64)
        .bind(tx.submission_date)
        .bind(tx.execution_date)
        .bind(&tx.transaction_hash)
        .bind(raw_json)
        .bind(now)
        .bind(now)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    #[tracing::instrument(skip(self), level = "debug")]
    async fn highest_nonce(
        &self,
        safe_address: &str,
        network: &str,
        exclude_tx_hash: &str,
    ) -> Result<Option<i64>, PersistenceError> {
        let nonce: Option<i64> = sqlx::query_scalar(
            "SELECT MAX(nonce) FROM safe_transactions \
             WHERE safe_address = ? AND network = ? AND safe_tx_hash != ?",
        )
        .bind(safe_address.to_lowercase())
        .bind(network)
        .bind(exclude_tx_hash)
        .fetch_one(&self.pool)
        .await?;
        Ok(nonce)
    }

    #[tracing::instrument(skip(self, result), level = "debug")]
    async fn upsert_analysis(
        &self,
        safe_tx_hash: &str,
        safe_address: &str,
        network: &str,
        result: &SecurityAnalysisResult,
    ) -> Result<(), PersistenceError> {
        let result_json = serde_json::to_string(result)?;
        let risk_level = serde_json::to_value(result.risk_level)?
            .as_str()
            .unwrap_or("low")
            .to_string();
        sqlx::query(
            "INSERT INTO analysis_results \
             (safe_tx_hash, safe_address, network, risk_level, is_suspicious, result_json, analyzed_at) \
             VALUES (?, ?, ?, ?, ?, ?, ?) \
             ON CONFLICT (safe_tx_hash, safe_address) DO UPDATE SET \
               risk_level = excluded.risk_level, \
               is_suspicious = excluded.is_suspicious, \
               result_json = excluded.result_json, \
               analyzed_at = excluded.analyzed_at",
        )
        .bind(safe_tx_hash)
        .bind(safe_address.to_lowercase())
        .bind(network)
        .bind(risk_level)
        .bind(result.is_suspicious)
        .bind(result_json)
        .bind(Utc::now())
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    #[tracing::instrument(skip(self), level = "debug")]
    async fn record_notification(
        &self,
        safe_tx_hash: &str,
        monitor_id: &str,
        at: DateTime<Utc>,
    ) -> Result<bool, PersistenceError> {
        let result = sqlx::query(
            "INSERT INTO notification_records (safe_tx_hash, monitor_id, notified_at) \
             VALUES (?, ?, ?) \
             ON CONFLICT (safe_tx_hash, monitor_id) DO NOTHING",
        )
        .bind(safe_tx_hash)
        .bind(monitor_id)
        .bind(at)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    #[tracing::instrument(skip(self), level = "debug")]
    async fn notification_exists(
        &self,
        safe_tx_hash: &str,
        monitor_id: &str,
    ) -> Result<bool, PersistenceError> {
        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM notification_records WHERE safe_tx_hash = ? AND monitor_id = ?",
        )
        .bind(safe_tx_hash)
        .bind(monitor_id)
        .fetch_one(&self.pool)
        .await?;
        Ok(count > 0)
    }

    #[tracing::instrument(skip(self), level = "debug")]
    async fn flush(&self) -> Result<(), PersistenceError> {
        sqlx::query("PRAGMA wal_checkpoint(TRUNCATE)").execute(&self.pool).await?;
        Ok(())
    }
}
