//! Per-monitor alert evaluation and idempotent notification dispatch.
//!
//! The dedup gate is the state store's insert-if-absent on the
//! (transaction, monitor) key; this module never re-implements it with
//! ad hoc flags.

use std::sync::Arc;

use chrono::Utc;

use crate::config::AppConfig;
use crate::models::analysis::SecurityAnalysisResult;
use crate::models::monitor::{AlertType, Monitor};
use crate::models::notification::{NotificationContext, NotificationLinks};
use crate::models::transaction::SafeTransaction;
use crate::networks::Network;
use crate::notification::NotificationService;
use crate::persistence::traits::StateRepository;

/// Evaluates which monitors an analyzed transaction must notify and drives
/// the dispatcher.
pub struct AlertManager<S: StateRepository + ?Sized> {
    state: Arc<S>,
    dispatcher: Arc<NotificationService>,
    config: Arc<AppConfig>,
}

impl<S: StateRepository + ?Sized> AlertManager<S> {
    /// Creates an alert manager.
    pub fn new(
        state: Arc<S>,
        dispatcher: Arc<NotificationService>,
        config: Arc<AppConfig>,
    ) -> Self {
        Self { state, dispatcher, config }
    }

    /// Runs the alert pipeline for one analyzed transaction against every
    /// monitor of its (wallet, network) group. Returns how many monitors
    /// were notified. Failures are isolated per monitor.
    pub async fn process(
        &self,
        monitors: &[Monitor],
        tx: &SafeTransaction,
        analysis: &SecurityAnalysisResult,
        network: &'static Network,
    ) -> usize {
        let mut notified = 0;
        for monitor in monitors {
            match self.notify_monitor(monitor, tx, analysis, network).await {
                Ok(true) => notified += 1,
                Ok(false) => {}
                Err(e) => {
                    tracing::error!(
                        monitor_id = %monitor.id,
                        safe_tx_hash = %tx.safe_tx_hash,
                        error = %e,
                        "alert evaluation failed for monitor"
                    );
                }
            }
        }
        notified
    }

    /// Whether the monitor's filter admits this transaction. Any `P0`
    /// finding overrides the filter entirely.
    fn filter_admits(
        monitor: &Monitor,
        tx: &SafeTransaction,
        analysis: &SecurityAnalysisResult,
    ) -> bool {
        // Transactions submitted before the monitor existed never notify,
        // even on first sight.
        let Some(tx_timestamp) = tx.effective_timestamp() else {
            return false;
        };
        if tx_timestamp <= monitor.created_at {
            return false;
        }

        if analysis.has_p0() {
            return true;
        }
        match monitor.effective_alert_type() {
            AlertType::All => true,
            AlertType::Management => analysis.is_management,
            AlertType::Suspicious => analysis.is_suspicious || analysis.is_management,
        }
    }

    async fn notify_monitor(
        &self,
        monitor: &Monitor,
        tx: &SafeTransaction,
        analysis: &SecurityAnalysisResult,
        network: &'static Network,
    ) -> Result<bool, crate::persistence::PersistenceError> {
        if !Self::filter_admits(monitor, tx, analysis) {
            return Ok(false);
        }
        if self.state.notification_exists(&tx.safe_tx_hash, &monitor.id).await? {
            tracing::debug!(
                monitor_id = %monitor.id,
                safe_tx_hash = %tx.safe_tx_hash,
                "already notified, skipping"
            );
            return Ok(false);
        }

        let context = self.build_context(monitor, tx, analysis, network);
        let delivered =
            self.dispatcher.dispatch(&monitor.settings.channels, &context).await;
        tracing::info!(
            monitor_id = %monitor.id,
            safe_tx_hash = %tx.safe_tx_hash,
            channels = monitor.settings.channels.len(),
            delivered,
            risk = ?analysis.risk_level,
            "notification dispatched"
        );

        // Dispatch and record are not transactional; the unique key makes
        // a concurrent duplicate insert a no-op.
        let inserted =
            self.state.record_notification(&tx.safe_tx_hash, &monitor.id, Utc::now()).await?;
        if !inserted {
            tracing::warn!(
                monitor_id = %monitor.id,
                safe_tx_hash = %tx.safe_tx_hash,
                "notification record already present after dispatch"
            );
        }
        Ok(true)
    }

    fn build_context(
        &self,
        monitor: &Monitor,
        tx: &SafeTransaction,
        analysis: &SecurityAnalysisResult,
        network: &'static Network,
    ) -> NotificationContext {
        let status = if !tx.is_executed {
            "pending"
        } else if tx.is_successful == Some(false) {
            "failed"
        } else {
            "executed"
        };
        let description = analysis.decoded_summary.clone().unwrap_or_else(|| {
            if tx.has_call_data() {
                "contract interaction".to_string()
            } else {
                "no-op transaction".to_string()
            }
        });
        let safe_monitor = self.config.dashboard_base_url.as_ref().map(|base| {
            format!(
                "{}/transactions/{}",
                base.as_str().trim_end_matches('/'),
                tx.safe_tx_hash
            )
        });
        let etherscan =
            tx.transaction_hash.as_deref().map(|hash| network.explorer_tx_url(hash));

        NotificationContext {
            safe_address: monitor.safe_address.clone(),
            network: network.name.to_string(),
            safe_tx_hash: tx.safe_tx_hash.clone(),
            description,
            nonce: tx.nonce,
            status: status.to_string(),
            execution_hash: tx.transaction_hash.clone(),
            risk_level: analysis.risk_level,
            is_suspicious: analysis.is_suspicious,
            warnings: analysis.warnings.clone(),
            links: NotificationLinks {
                safe_app: network.safe_app_tx_url(&monitor.safe_address, &tx.safe_tx_hash),
                safe_monitor,
                etherscan,
            },
            timestamp: Utc::now(),
        }
    }
}

#[cfg(test)]
mod tests {
    use alloy::primitives::Address;
    use chrono::{Duration, Utc};
    use mockall::predicate::eq;

    use super::*;
    use crate::analyzer::{AnalysisContext, RiskAnalyzer};
    use crate::networks;
    use crate::persistence::traits::MockStateRepository;
    use crate::test_helpers::{MonitorBuilder, SafeTransactionBuilder};

    const SAFE: &str = "0x5afe3855358e112b5647b952709e6165e1c1eeee";

    fn manager(state: MockStateRepository) -> AlertManager<MockStateRepository> {
        let config = Arc::new(AppConfig::builder().dashboard_base_url("https://watch.example.org").build());
        let dispatcher = Arc::new(NotificationService::new(&config));
        AlertManager::new(Arc::new(state), dispatcher, config)
    }

    fn analyze(tx: &SafeTransaction) -> SecurityAnalysisResult {
        RiskAnalyzer::default().analyze(
            tx,
            SAFE.parse::<Address>().unwrap(),
            &AnalysisContext::default(),
        )
    }

    fn ethereum() -> &'static Network {
        networks::by_name("ethereum").unwrap()
    }

    #[tokio::test]
    async fn suppresses_transactions_older_than_the_monitor() {
        let tx = SafeTransactionBuilder::new("0xaaa")
            .decoded_method_param("changeThreshold", "_threshold", "1")
            .submission_date(Utc::now() - Duration::hours(2))
            .build();
        let analysis = analyze(&tx);
        assert!(analysis.has_p0());

        // Monitor created after the transaction was submitted: nothing may
        // reach the store, not even for a P0 finding.
        let mut state = MockStateRepository::new();
        state.expect_notification_exists().times(0);
        state.expect_record_notification().times(0);

        let monitor = MonitorBuilder::new("m1", SAFE).created_at(Utc::now()).build();
        let notified = manager(state).process(&[monitor], &tx, &analysis, ethereum()).await;
        assert_eq!(notified, 0);
    }

    #[tokio::test]
    async fn p0_overrides_a_management_only_filter_mismatch() {
        // Untrusted delegate call: P0 but not a management operation.
        let tx = SafeTransactionBuilder::new("0xaaa")
            .operation(crate::models::transaction::Operation::DelegateCall)
            .to("0x2222222222222222222222222222222222222222")
            .submission_date(Utc::now())
            .build();
        let analysis = analyze(&tx);
        assert!(analysis.has_p0());
        assert!(!analysis.is_management);

        let mut state = MockStateRepository::new();
        state
            .expect_notification_exists()
            .with(eq("0xaaa"), eq("m1"))
            .returning(|_, _| Ok(false));
        state
            .expect_record_notification()
            .with(eq("0xaaa"), eq("m1"), mockall::predicate::always())
            .times(1)
            .returning(|_, _, _| Ok(true));

        let monitor = MonitorBuilder::new("m1", SAFE)
            .alert_type(AlertType::Management)
            .build();
        let notified = manager(state).process(&[monitor], &tx, &analysis, ethereum()).await;
        assert_eq!(notified, 1);
    }

    #[tokio::test]
    async fn existing_record_prevents_a_second_dispatch() {
        let tx = SafeTransactionBuilder::new("0xaaa")
            .decoded_method_param("changeThreshold", "_threshold", "1")
            .submission_date(Utc::now())
            .build();
        let analysis = analyze(&tx);

        let mut state = MockStateRepository::new();
        state.expect_notification_exists().returning(|_, _| Ok(true));
        state.expect_record_notification().times(0);

        let monitor = MonitorBuilder::new("m1", SAFE).build();
        let notified = manager(state).process(&[monitor], &tx, &analysis, ethereum()).await;
        assert_eq!(notified, 0);
    }

    #[tokio::test]
    async fn suspicious_filter_skips_clean_transactions() {
        let tx = SafeTransactionBuilder::new("0xaaa").submission_date(Utc::now()).build();
        let analysis = analyze(&tx);
        assert!(!analysis.is_suspicious);

        let mut state = MockStateRepository::new();
        state.expect_notification_exists().times(0);
        state.expect_record_notification().times(0);

        let monitor = MonitorBuilder::new("m1", SAFE).build();
        let notified = manager(state).process(&[monitor], &tx, &analysis, ethereum()).await;
        assert_eq!(notified, 0);
    }

    #[tokio::test]
    async fn all_filter_admits_track_only_transactions() {
        let tx = SafeTransactionBuilder::new("0xaaa")
            .decoded_method("approveHash")
            .submission_date(Utc::now())
            .build();
        let analysis = analyze(&tx);
        assert!(!analysis.is_suspicious);
        assert!(!analysis.is_management);

        let mut state = MockStateRepository::new();
        state.expect_notification_exists().returning(|_, _| Ok(false));
        state.expect_record_notification().times(1).returning(|_, _, _| Ok(true));

        let monitor = MonitorBuilder::new("m1", SAFE).alert_type(AlertType::All).build();
        let notified = manager(state).process(&[monitor], &tx, &analysis, ethereum()).await;
        assert_eq!(notified, 1);
    }

    #[tokio::test]
    async fn management_transactions_reach_suspicious_monitors() {
        let tx = SafeTransactionBuilder::new("0xaaa")
            .decoded_method_param("changeThreshold", "_threshold", "1")
            .submission_date(Utc::now())
            .build();
        let analysis = analyze(&tx);

        let mut state = MockStateRepository::new();
        state.expect_notification_exists().returning(|_, _| Ok(false));
        state.expect_record_notification().times(1).returning(|_, _, _| Ok(true));

        let monitor = MonitorBuilder::new("m1", SAFE).alert_type(AlertType::Suspicious).build();
        let notified = manager(state).process(&[monitor], &tx, &analysis, ethereum()).await;
        assert_eq!(notified, 1);
    }

    #[tokio::test]
    async fn per_monitor_failures_are_isolated() {
        let tx = SafeTransactionBuilder::new("0xaaa")
            .decoded_method_param("changeThreshold", "_threshold", "1")
            .submission_date(Utc::now())
            .build();
        let analysis = analyze(&tx);

        let mut state = MockStateRepository::new();
        state.expect_notification_exists().with(eq("0xaaa"), eq("m1")).returning(|_, _| {
            Err(crate::persistence::PersistenceError::InvalidInput("boom".into()))
        });
        state
            .expect_notification_exists()
            .with(eq("0xaaa"), eq("m2"))
            .returning(|_, _| Ok(false));
        state.expect_record_notification().times(1).returning(|_, _, _| Ok(true));

        let monitors = vec![
            MonitorBuilder::new("m1", SAFE).build(),
            MonitorBuilder::new("m2", SAFE).build(),
        ];
        let notified = manager(state).process(&monitors, &tx, &analysis, ethereum()).await;
        assert_eq!(notified, 1);
    }

    #[test]
    fn context_builds_links_and_status() {
        let state = MockStateRepository::new();
        let manager = manager(state);
        let tx = SafeTransactionBuilder::new("0xaaa")
            .executed(true)
            .transaction_hash("0xfeed")
            .build();
        let analysis = analyze(&tx);
        let monitor = MonitorBuilder::new("m1", SAFE).build();

        let ctx = manager.build_context(&monitor, &tx, &analysis, ethereum());
        assert_eq!(ctx.status, "executed");
        assert_eq!(ctx.execution_hash.as_deref(), Some("0xfeed"));
        assert_eq!(ctx.links.etherscan.as_deref(), Some("https://etherscan.io/tx/0xfeed"));
        assert!(ctx.links.safe_monitor.as_deref().unwrap().contains("/transactions/0xaaa"));
        assert!(ctx.links.safe_app.contains("safe=eth:"));
    }
}
