//! Lifecycle management: owns the poller, listens for shutdown signals,
//! and cleans up on the way out.

mod builder;

use std::sync::Arc;

use builder::SupervisorBuilder;
use thiserror::Error;
use tokio::signal;
use tokio_util::sync::CancellationToken;

use crate::config::AppConfig;
use crate::engine::poller::TransactionPoller;
use crate::persistence::error::PersistenceError;
use crate::persistence::traits::StateRepository;
use crate::providers::traits::TransactionSource;

/// Errors raised while assembling or running the supervisor.
#[derive(Debug, Error)]
pub enum SupervisorError {
    /// No configuration was provided to the builder.
    #[error("missing configuration for supervisor")]
    MissingConfig,

    /// No state repository was provided to the builder.
    #[error("missing state repository for supervisor")]
    MissingStateRepository,

    /// No transaction source was provided to the builder.
    #[error("missing transaction source for supervisor")]
    MissingTransactionSource,

    /// The state store failed during startup or shutdown.
    #[error("state store error: {0}")]
    Persistence(#[from] PersistenceError),
}

/// Owns all long-running services and manages their shutdown.
pub struct Supervisor<S: StateRepository + ?Sized + 'static> {
    config: Arc<AppConfig>,
    state: Arc<S>,
    poller: TransactionPoller<S, dyn TransactionSource>,
    cancellation_token: CancellationToken,
}

impl<S: StateRepository + ?Sized + 'static> Supervisor<S> {
    pub(crate) fn new(
        config: Arc<AppConfig>,
        state: Arc<S>,
        poller: TransactionPoller<S, dyn TransactionSource>,
        cancellation_token: CancellationToken,
    ) -> Self {
        Self { config, state, poller, cancellation_token }
    }

    /// Entry point for assembling a supervisor.
    pub fn builder() -> SupervisorBuilder<S> {
        SupervisorBuilder::new()
    }

    /// Runs until a shutdown signal arrives, then cleans up with a bounded
    /// timeout.
    pub async fn run(self) -> Result<(), SupervisorError> {
        let signal_token = self.cancellation_token.clone();
        tokio::spawn(async move {
            let ctrl_c = signal::ctrl_c();
            #[cfg(unix)]
            let terminate = async {
                match signal::unix::signal(signal::unix::SignalKind::terminate()) {
                    Ok(mut stream) => {
                        stream.recv().await;
                    }
                    Err(e) => {
                        tracing::error!(error = %e, "failed to register SIGTERM handler");
                        std::future::pending::<()>().await;
                    }
                }
            };
            #[cfg(not(unix))]
            let terminate = std::future::pending::<()>();

            tokio::select! {
                _ = ctrl_c => tracing::info!("SIGINT received, initiating graceful shutdown"),
                _ = terminate => tracing::info!("SIGTERM received, initiating graceful shutdown"),
            }
            signal_token.cancel();
        });

        tracing::info!(
            poll_interval = ?self.config.poll_interval,
            max_concurrent_safes = self.config.max_concurrent_safes,
            "supervisor started"
        );
        self.poller.run().await;

        tracing::info!("starting graceful resource cleanup");
        let cleanup = async {
            if let Err(e) = self.state.flush().await {
                tracing::error!(error = %e, "failed to flush state store during shutdown");
            }
        };
        if tokio::time::timeout(self.config.shutdown_timeout, cleanup).await.is_err() {
            tracing::warn!(
                timeout = ?self.config.shutdown_timeout,
                "cleanup did not finish within the shutdown timeout"
            );
        }

        tracing::info!("supervisor shutdown complete");
        Ok(())
    }
}
