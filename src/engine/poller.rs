//! The fixed-interval poll scheduler.
//!
//! Each cycle loads active monitors, groups them by (wallet, network) —
//! the unit of upstream API work — and processes the groups with bounded
//! concurrency. A new cycle only starts once the previous one has finished,
//! so total concurrency stays bounded by the semaphore width.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;

use crate::config::AppConfig;
use crate::engine::processor::SafeProcessor;
use crate::models::monitor::Monitor;
use crate::networks;
use crate::persistence::error::PersistenceError;
use crate::persistence::traits::StateRepository;
use crate::providers::traits::TransactionSource;

/// Drives poll cycles over all watched (wallet, network) pairs.
pub struct TransactionPoller<S, T>
where
    S: StateRepository + ?Sized + 'static,
    T: TransactionSource + ?Sized + 'static,
{
    config: Arc<AppConfig>,
    state: Arc<S>,
    processor: Arc<SafeProcessor<S, T>>,
    cancellation_token: CancellationToken,
}

impl<S, T> TransactionPoller<S, T>
where
    S: StateRepository + ?Sized + 'static,
    T: TransactionSource + ?Sized + 'static,
{
    /// Creates a poller.
    pub fn new(
        config: Arc<AppConfig>,
        state: Arc<S>,
        processor: Arc<SafeProcessor<S, T>>,
        cancellation_token: CancellationToken,
    ) -> Self {
        Self { config, state, processor, cancellation_token }
    }

    /// The long-running poll loop. Cycles run back to back with the
    /// configured interval of sleep in between; a slow cycle delays the
    /// next tick instead of overlapping it.
    pub async fn run(self) {
        loop {
            let delay = tokio::time::sleep(self.config.poll_interval);

            tokio::select! {
                biased;

                _ = self.cancellation_token.cancelled() => {
                    tracing::info!("poller received shutdown signal");
                    break;
                }

                _ = delay => {
                    if let Err(e) = self.run_cycle().await {
                        tracing::error!(error = %e, "poll cycle failed, retrying next interval");
                    }
                }
            }
        }
        tracing::info!("poller has shut down");
    }

    /// Runs one poll cycle over every active monitor group.
    pub async fn run_cycle(&self) -> Result<(), PersistenceError> {
        let monitors = self.state.active_monitors().await?;
        if monitors.is_empty() {
            tracing::debug!("no active monitors, skipping cycle");
            return Ok(());
        }

        let groups = group_by_pair(monitors);
        tracing::info!(groups = groups.len(), "starting poll cycle");

        let semaphore = Arc::new(Semaphore::new(self.config.max_concurrent_safes));
        let mut tasks: JoinSet<()> = JoinSet::new();

        for ((safe_address, network_name), group_monitors) in groups {
            let Some(network) = networks::by_name(&network_name) else {
                tracing::warn!(
                    safe = %safe_address,
                    network = %network_name,
                    "unknown network in monitor configuration, skipping group"
                );
                continue;
            };

            let semaphore = Arc::clone(&semaphore);
            let processor = Arc::clone(&self.processor);
            let cancellation_token = self.cancellation_token.clone();
            tasks.spawn(async move {
                let _permit = match semaphore.acquire_owned().await {
                    Ok(permit) => permit,
                    Err(_) => return,
                };
                if cancellation_token.is_cancelled() {
                    return;
                }
                processor.process_pair(&safe_address, network, &group_monitors).await;
            });
        }

        while let Some(result) = tasks.join_next().await {
            if let Err(e) = result {
                // A panic in one group must not take down the cycle.
                tracing::error!(error = %e, "wallet group task failed");
            }
        }

        tracing::debug!("poll cycle complete");
        Ok(())
    }
}

/// Groups monitors by their case-normalized (wallet, network) pair.
fn group_by_pair(monitors: Vec<Monitor>) -> HashMap<(String, String), Vec<Monitor>> {
    let mut groups: HashMap<(String, String), Vec<Monitor>> = HashMap::new();
    for monitor in monitors {
        groups.entry(monitor.pair_key()).or_default().push(monitor);
    }
    groups
}
