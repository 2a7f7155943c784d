//! Per-(wallet, network) transaction processing: incremental fetch,
//! analysis, persistence and alert evaluation.

use std::sync::Arc;

use alloy::primitives::Address;
use chrono::Utc;

use crate::analyzer::{AnalysisContext, RiskAnalyzer};
use crate::engine::alert_manager::AlertManager;
use crate::models::monitor::Monitor;
use crate::models::transaction::SafeTransaction;
use crate::networks::Network;
use crate::persistence::error::PersistenceError;
use crate::persistence::traits::StateRepository;
use crate::providers::traits::{SourceError, TransactionSource};

/// Outcome of the wallet-info probe, used only to classify fetch failures.
enum ProbeOutcome {
    Exists(Option<String>),
    NotFound,
    Unavailable,
}

/// Processes one (wallet, network) pair per poll cycle.
pub struct SafeProcessor<S: StateRepository + ?Sized, T: TransactionSource + ?Sized> {
    state: Arc<S>,
    source: Arc<T>,
    analyzer: RiskAnalyzer,
    alerts: Arc<AlertManager<S>>,
}

impl<S: StateRepository + ?Sized, T: TransactionSource + ?Sized> SafeProcessor<S, T> {
    /// Creates a processor.
    pub fn new(
        state: Arc<S>,
        source: Arc<T>,
        analyzer: RiskAnalyzer,
        alerts: Arc<AlertManager<S>>,
    ) -> Self {
        Self { state, source, analyzer, alerts }
    }

    /// Runs one poll for a pair. Fetch failures are classified and logged;
    /// they never abort the cycle for other pairs.
    #[tracing::instrument(skip(self, monitors), fields(network = %network.name), level = "info")]
    pub async fn process_pair(
        &self,
        safe_address: &str,
        network: &'static Network,
        monitors: &[Monitor],
    ) {
        if let Err(e) =
            self.state.touch_last_polled(safe_address, network.name, Utc::now()).await
        {
            tracing::error!(safe = %safe_address, error = %e, "failed to update poll timestamp");
        }

        let since = match self.state.checkpoint(safe_address, network.name).await {
            Ok(checkpoint) => checkpoint.and_then(|c| c.last_tx_found_at),
            Err(e) => {
                tracing::error!(safe = %safe_address, error = %e, "failed to load checkpoint");
                return;
            }
        };

        // The probe supplies the wallet version for hash verification and
        // disambiguates "wallet not found" from "no transactions yet".
        let probe = match self.source.safe_info(network, safe_address).await {
            Ok(info) => ProbeOutcome::Exists(info.version),
            Err(e) if e.is_not_found() => ProbeOutcome::NotFound,
            Err(e) => {
                tracing::warn!(safe = %safe_address, error = %e, "wallet info probe failed");
                ProbeOutcome::Unavailable
            }
        };

        let transactions = match self
            .source
            .transactions_modified_since(network, safe_address, since)
            .await
        {
            Ok(transactions) => transactions,
            Err(e) => {
                match (&probe, &e) {
                    (ProbeOutcome::NotFound, _) | (_, SourceError::SafeNotFound { .. }) => {
                        tracing::info!(safe = %safe_address, "wallet not found on this network");
                    }
                    _ => {
                        tracing::warn!(safe = %safe_address, error = %e, "transaction fetch failed, retrying next cycle");
                    }
                }
                return;
            }
        };

        if transactions.is_empty() {
            if matches!(&probe, ProbeOutcome::Exists(_)) {
                tracing::debug!(safe = %safe_address, "wallet exists, no new transactions");
            }
            return;
        }

        // Hash verification runs only when the probe answered: without it
        // the wallet version is unknown, and recomputing against a guessed
        // version would raise false critical mismatch findings.
        let (chain_id, version) = match probe {
            ProbeOutcome::Exists(version) => (Some(network.chain_id), version),
            _ => (None, None),
        };

        tracing::info!(
            safe = %safe_address,
            count = transactions.len(),
            "processing transactions"
        );

        // Sequential within the pair, in service order; the checkpoint only
        // advances once a transaction's processing (success or logged
        // failure) completes, so a crash re-fetches from the last safe
        // point.
        for tx in &transactions {
            if let Err(e) = self
                .process_transaction(safe_address, network, monitors, tx, chain_id, version.as_deref())
                .await
            {
                tracing::error!(
                    safe = %safe_address,
                    safe_tx_hash = %tx.safe_tx_hash,
                    error = %e,
                    "transaction processing failed"
                );
            }
            if let Err(e) =
                self.state.advance_last_tx_found(safe_address, network.name, Utc::now()).await
            {
                tracing::error!(safe = %safe_address, error = %e, "failed to advance checkpoint");
            }
        }
    }

    /// Analyzes and persists one transaction, then evaluates alerts.
    async fn process_transaction(
        &self,
        safe_address: &str,
        network: &'static Network,
        monitors: &[Monitor],
        tx: &SafeTransaction,
        chain_id: Option<u64>,
        version: Option<&str>,
    ) -> Result<(), PersistenceError> {
        let stored = self
            .state
            .stored_transaction(&tx.safe_tx_hash, safe_address, network.name)
            .await?;

        let is_new = stored.is_none();
        if let Some(stored) = &stored {
            if !stored.differs_from(tx) {
                tracing::debug!(safe_tx_hash = %tx.safe_tx_hash, "transaction unchanged, skipping");
                return Ok(());
            }
        }

        let previous_nonce = self
            .state
            .highest_nonce(safe_address, network.name, &tx.safe_tx_hash)
            .await?;

        let ctx = AnalysisContext {
            chain_id,
            version: version.map(str::to_string),
            previous_nonce,
        };
        let wallet: Address = safe_address.parse().unwrap_or(Address::ZERO);
        let analysis = self.analyzer.analyze(tx, wallet, &ctx);

        self.state.upsert_transaction(safe_address, network.name, tx).await?;
        self.state
            .upsert_analysis(&tx.safe_tx_hash, safe_address, network.name, &analysis)
            .await?;

        tracing::info!(
            safe_tx_hash = %tx.safe_tx_hash,
            new = is_new,
            risk = ?analysis.risk_level,
            suspicious = analysis.is_suspicious,
            "transaction analyzed"
        );

        self.alerts.process(monitors, tx, &analysis, network).await;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, Utc};
    use mockall::predicate::eq;

    use super::*;
    use crate::config::AppConfig;
    use crate::models::safe_info::SafeInfo;
    use crate::models::transaction::StoredTransaction;
    use crate::networks;
    use crate::notification::NotificationService;
    use crate::persistence::traits::MockStateRepository;
    use crate::providers::traits::MockTransactionSource;
    use crate::test_helpers::{MonitorBuilder, SafeTransactionBuilder};

    const SAFE: &str = "0x5afe3855358e112b5647b952709e6165e1c1eeee";

    fn ethereum() -> &'static Network {
        networks::by_name("ethereum").unwrap()
    }

    fn safe_info() -> SafeInfo {
        SafeInfo {
            address: SAFE.to_string(),
            nonce: 9,
            threshold: 2,
            owners: vec!["0x1".into(), "0x2".into()],
            master_copy: None,
            version: Some("1.3.0".into()),
        }
    }

    fn processor(
        state: MockStateRepository,
        source: MockTransactionSource,
    ) -> SafeProcessor<MockStateRepository, MockTransactionSource> {
        let state = Arc::new(state);
        let config = Arc::new(AppConfig::builder().build());
        let dispatcher = Arc::new(NotificationService::new(&config));
        let alerts = Arc::new(AlertManager::new(Arc::clone(&state), dispatcher, config));
        SafeProcessor::new(state, Arc::new(source), RiskAnalyzer::default(), alerts)
    }

    fn baseline_state() -> MockStateRepository {
        let mut state = MockStateRepository::new();
        state.expect_touch_last_polled().returning(|_, _, _| Ok(()));
        state
    }

    #[tokio::test]
    async fn new_transaction_is_analyzed_persisted_and_checkpointed() {
        let mut state = baseline_state();
        state.expect_checkpoint().returning(|_, _| Ok(None));
        state.expect_advance_last_tx_found().times(1).returning(|_, _, _| Ok(()));
        state.expect_stored_transaction().returning(|_, _, _| Ok(None));
        state.expect_highest_nonce().returning(|_, _, _| Ok(Some(7)));
        state.expect_upsert_transaction().times(1).returning(|_, _, _| Ok(()));
        state
            .expect_upsert_analysis()
            .withf(|hash, _, _, analysis| hash == "0xaaa" && analysis.hash_verification.performed)
            .times(1)
            .returning(|_, _, _, _| Ok(()));

        let mut source = MockTransactionSource::new();
        source.expect_safe_info().returning(|_, _| Ok(safe_info()));
        source.expect_transactions_modified_since().times(1).returning(|_, _, _| {
            Ok(vec![SafeTransactionBuilder::new("0xaaa").nonce(8).build()])
        });

        // No monitors, so no notification expectations.
        processor(state, source).process_pair(SAFE, ethereum(), &[]).await;
    }

    #[tokio::test]
    async fn unchanged_transaction_skips_reanalysis_but_advances_checkpoint() {
        let tx = SafeTransactionBuilder::new("0xaaa").nonce(8).build();
        let stored = StoredTransaction {
            safe_tx_hash: "0xaaa".into(),
            safe_address: SAFE.into(),
            network: "ethereum".into(),
            nonce: 8,
            is_executed: false,
            confirmation_count: 0,
            submission_date: None,
            execution_date: None,
            execution_tx_hash: None,
            raw_json: String::new(),
        };

        let mut state = baseline_state();
        state.expect_checkpoint().returning(|_, _| Ok(None));
        state.expect_stored_transaction().returning(move |_, _, _| Ok(Some(stored.clone())));
        state.expect_upsert_transaction().times(0);
        state.expect_upsert_analysis().times(0);
        state.expect_advance_last_tx_found().times(1).returning(|_, _, _| Ok(()));

        let mut source = MockTransactionSource::new();
        source.expect_safe_info().returning(|_, _| Ok(safe_info()));
        source
            .expect_transactions_modified_since()
            .returning(move |_, _, _| Ok(vec![SafeTransactionBuilder::new("0xaaa").nonce(8).build()]));

        processor(state, source).process_pair(SAFE, ethereum(), &[]).await;
    }

    #[tokio::test]
    async fn changed_transaction_is_reanalyzed_in_place() {
        let stored = StoredTransaction {
            safe_tx_hash: "0xaaa".into(),
            safe_address: SAFE.into(),
            network: "ethereum".into(),
            nonce: 8,
            is_executed: false,
            confirmation_count: 0,
            submission_date: None,
            execution_date: None,
            execution_tx_hash: None,
            raw_json: String::new(),
        };

        let mut state = baseline_state();
        state.expect_checkpoint().returning(|_, _| Ok(None));
        state.expect_advance_last_tx_found().times(1).returning(|_, _, _| Ok(()));
        state.expect_stored_transaction().returning(move |_, _, _| Ok(Some(stored.clone())));
        state.expect_highest_nonce().returning(|_, _, _| Ok(Some(7)));
        state.expect_upsert_transaction().times(1).returning(|_, _, _| Ok(()));
        state.expect_upsert_analysis().times(1).returning(|_, _, _, _| Ok(()));

        let mut source = MockTransactionSource::new();
        source.expect_safe_info().returning(|_, _| Ok(safe_info()));
        source.expect_transactions_modified_since().returning(|_, _, _| {
            Ok(vec![SafeTransactionBuilder::new("0xaaa")
                .nonce(8)
                .executed(true)
                .transaction_hash("0xfeed")
                .build()])
        });

        processor(state, source).process_pair(SAFE, ethereum(), &[]).await;
    }

    #[tokio::test]
    async fn probe_failure_skips_hash_verification_but_still_analyzes() {
        let mut state = baseline_state();
        state.expect_checkpoint().returning(|_, _| Ok(None));
        state.expect_advance_last_tx_found().times(1).returning(|_, _, _| Ok(()));
        state.expect_stored_transaction().returning(|_, _, _| Ok(None));
        state.expect_highest_nonce().returning(|_, _, _| Ok(None));
        state.expect_upsert_transaction().times(1).returning(|_, _, _| Ok(()));
        state
            .expect_upsert_analysis()
            .withf(|_, _, _, analysis| !analysis.hash_verification.performed)
            .times(1)
            .returning(|_, _, _, _| Ok(()));

        let mut source = MockTransactionSource::new();
        source.expect_safe_info().returning(|_, _| {
            Err(SourceError::UnexpectedStatus {
                status: reqwest::StatusCode::SERVICE_UNAVAILABLE,
                url: "http://example.org".into(),
            })
        });
        source.expect_transactions_modified_since().returning(|_, _, _| {
            Ok(vec![SafeTransactionBuilder::new("0xaaa").nonce(8).build()])
        });

        processor(state, source).process_pair(SAFE, ethereum(), &[]).await;
    }

    #[tokio::test]
    async fn transient_fetch_failure_skips_the_pair_quietly() {
        let mut state = baseline_state();
        state.expect_checkpoint().returning(|_, _| Ok(None));
        state.expect_stored_transaction().times(0);
        state.expect_upsert_transaction().times(0);
        state.expect_advance_last_tx_found().times(0);

        let mut source = MockTransactionSource::new();
        source.expect_safe_info().returning(|_, _| Ok(safe_info()));
        source.expect_transactions_modified_since().returning(|_, _, _| {
            Err(SourceError::UnexpectedStatus {
                status: reqwest::StatusCode::BAD_GATEWAY,
                url: "http://example.org".into(),
            })
        });

        processor(state, source).process_pair(SAFE, ethereum(), &[]).await;
    }

    #[tokio::test]
    async fn missing_wallet_is_classified_and_skipped() {
        let mut state = baseline_state();
        state.expect_checkpoint().returning(|_, _| Ok(None));
        state.expect_advance_last_tx_found().times(0);

        let mut source = MockTransactionSource::new();
        source.expect_safe_info().returning(|_, _| {
            Err(SourceError::SafeNotFound { address: SAFE.into(), network: "ethereum".into() })
        });
        source.expect_transactions_modified_since().returning(|_, _, _| {
            Err(SourceError::SafeNotFound { address: SAFE.into(), network: "ethereum".into() })
        });

        processor(state, source).process_pair(SAFE, ethereum(), &[]).await;
    }

    #[tokio::test]
    async fn incremental_fetch_uses_the_checkpoint_lower_bound() {
        let since = Utc::now() - Duration::hours(3);
        let mut state = baseline_state();
        state.expect_checkpoint().returning(move |_, _| {
            Ok(Some(crate::models::CheckpointState {
                safe_address: SAFE.into(),
                network: "ethereum".into(),
                last_polled_at: Some(Utc::now()),
                last_tx_found_at: Some(since),
            }))
        });

        let mut source = MockTransactionSource::new();
        source.expect_safe_info().returning(|_, _| Ok(safe_info()));
        source
            .expect_transactions_modified_since()
            .with(
                mockall::predicate::always(),
                eq(SAFE),
                eq(Some(since)),
            )
            .times(1)
            .returning(|_, _, _| Ok(vec![]));

        processor(state, source).process_pair(SAFE, ethereum(), &[]).await;
    }

    #[tokio::test]
    async fn notification_flow_reaches_the_dedup_gate() {
        let monitor = MonitorBuilder::new("m1", SAFE).build();
        let mut state = baseline_state();
        state.expect_checkpoint().returning(|_, _| Ok(None));
        state.expect_advance_last_tx_found().times(1).returning(|_, _, _| Ok(()));
        state.expect_stored_transaction().returning(|_, _, _| Ok(None));
        state.expect_highest_nonce().returning(|_, _, _| Ok(None));
        state.expect_upsert_transaction().returning(|_, _, _| Ok(()));
        state.expect_upsert_analysis().returning(|_, _, _, _| Ok(()));
        state
            .expect_notification_exists()
            .with(eq("0xaaa"), eq("m1"))
            .times(1)
            .returning(|_, _| Ok(false));
        state
            .expect_record_notification()
            .times(1)
            .returning(|_, _, _| Ok(true));

        let mut source = MockTransactionSource::new();
        source.expect_safe_info().returning(|_, _| Ok(safe_info()));
        source.expect_transactions_modified_since().returning(|_, _, _| {
            Ok(vec![SafeTransactionBuilder::new("0xaaa")
                .decoded_method_param("changeThreshold", "_threshold", "1")
                .submission_date(Utc::now())
                .build()])
        });

        processor(state, source).process_pair(SAFE, ethereum(), &[monitor]).await;
    }
}
