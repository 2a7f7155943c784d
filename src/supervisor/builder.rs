//! Wires the engine components together.

use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use super::{Supervisor, SupervisorError};
use crate::analyzer::RiskAnalyzer;
use crate::config::AppConfig;
use crate::engine::alert_manager::AlertManager;
use crate::engine::poller::TransactionPoller;
use crate::engine::processor::SafeProcessor;
use crate::notification::NotificationService;
use crate::persistence::traits::StateRepository;
use crate::providers::traits::TransactionSource;

/// Assembles a [`Supervisor`] from its dependencies.
pub struct SupervisorBuilder<S: StateRepository + ?Sized + 'static> {
    config: Option<AppConfig>,
    state: Option<Arc<S>>,
    source: Option<Arc<dyn TransactionSource>>,
}

impl<S: StateRepository + ?Sized + 'static> SupervisorBuilder<S> {
    /// Creates an empty builder.
    pub fn new() -> Self {
        Self { config: None, state: None, source: None }
    }

    /// Sets the application configuration.
    pub fn config(mut self, config: AppConfig) -> Self {
        self.config = Some(config);
        self
    }

    /// Sets the state repository.
    pub fn state(mut self, state: Arc<S>) -> Self {
        self.state = Some(state);
        self
    }

    /// Sets the transaction source.
    pub fn source(mut self, source: Arc<dyn TransactionSource>) -> Self {
        self.source = Some(source);
        self
    }

    /// Builds the supervisor, wiring analyzer, dispatcher, alert manager,
    /// processor and poller together.
    pub fn build(self) -> Result<Supervisor<S>, SupervisorError> {
        let config = Arc::new(self.config.ok_or(SupervisorError::MissingConfig)?);
        let state = self.state.ok_or(SupervisorError::MissingStateRepository)?;
        let source = self.source.ok_or(SupervisorError::MissingTransactionSource)?;

        let dispatcher = Arc::new(NotificationService::new(&config));
        let alerts =
            Arc::new(AlertManager::new(Arc::clone(&state), dispatcher, Arc::clone(&config)));
        let analyzer = RiskAnalyzer::new(config.nonce_gap_threshold);
        let processor =
            Arc::new(SafeProcessor::new(Arc::clone(&state), source, analyzer, alerts));

        let cancellation_token = CancellationToken::new();
        let poller = TransactionPoller::new(
            Arc::clone(&config),
            Arc::clone(&state),
            processor,
            cancellation_token.clone(),
        );

        Ok(Supervisor::new(config, state, poller, cancellation_token))
    }
}

impl<S: StateRepository + ?Sized + 'static> Default for SupervisorBuilder<S> {
    fn default() -> Self {
        Self::new()
    }
}
