//! Builder-style fixtures shared by unit and integration tests.

use chrono::{DateTime, Duration, Utc};
use serde_json::json;

use crate::models::monitor::{AlertType, ChannelConfig, Monitor, MonitorSettings};
use crate::models::transaction::{
    Confirmation, DataDecoded, DecodedParameter, Operation, SafeTransaction,
};

/// Builds [`SafeTransaction`] fixtures with every field defaulted to its
/// zero value.
#[derive(Debug, Clone)]
pub struct SafeTransactionBuilder {
    tx: SafeTransaction,
}

impl SafeTransactionBuilder {
    /// Starts a fixture with the given reported hash.
    pub fn new(safe_tx_hash: &str) -> Self {
        let tx: SafeTransaction = serde_json::from_value(json!({
            "safeTxHash": safe_tx_hash,
            "nonce": 0
        }))
        .expect("minimal transaction shape must deserialize");
        Self { tx }
    }

    /// Sets the destination address.
    pub fn to(mut self, to: &str) -> Self {
        self.tx.to = Some(to.to_string());
        self
    }

    /// Sets the value in wei (decimal string).
    pub fn value(mut self, value: &str) -> Self {
        self.tx.value = Some(value.to_string());
        self
    }

    /// Sets the raw calldata hex.
    pub fn data(mut self, data: &str) -> Self {
        self.tx.data = Some(data.to_string());
        self
    }

    /// Sets the wallet nonce.
    pub fn nonce(mut self, nonce: i64) -> Self {
        self.tx.nonce = nonce;
        self
    }

    /// Sets the operation kind.
    pub fn operation(mut self, operation: Operation) -> Self {
        self.tx.operation = operation;
        self
    }

    /// Sets the refund gas price (decimal string).
    pub fn gas_price(mut self, gas_price: &str) -> Self {
        self.tx.gas_price = Some(gas_price.to_string());
        self
    }

    /// Sets the gas refund token address.
    pub fn gas_token(mut self, gas_token: &str) -> Self {
        self.tx.gas_token = Some(gas_token.to_string());
        self
    }

    /// Sets the refund receiver address.
    pub fn refund_receiver(mut self, refund_receiver: &str) -> Self {
        self.tx.refund_receiver = Some(refund_receiver.to_string());
        self
    }

    /// Sets the inner-call gas limit.
    pub fn safe_tx_gas(mut self, safe_tx_gas: u64) -> Self {
        self.tx.safe_tx_gas = safe_tx_gas;
        self
    }

    /// Sets the refund bookkeeping gas.
    pub fn base_gas(mut self, base_gas: u64) -> Self {
        self.tx.base_gas = base_gas;
        self
    }

    /// Sets the service's contract-trust flag.
    pub fn trusted(mut self, trusted: bool) -> Self {
        self.tx.trusted = trusted;
        self
    }

    /// Marks the transaction as executed with the given success flag.
    pub fn executed(mut self, successful: bool) -> Self {
        self.tx.is_executed = true;
        self.tx.is_successful = Some(successful);
        self.tx.execution_date = Some(Utc::now());
        self
    }

    /// Sets the on-chain execution hash.
    pub fn transaction_hash(mut self, hash: &str) -> Self {
        self.tx.transaction_hash = Some(hash.to_string());
        self
    }

    /// Sets the submission timestamp.
    pub fn submission_date(mut self, at: DateTime<Utc>) -> Self {
        self.tx.submission_date = Some(at);
        self
    }

    /// Attaches `n` owner confirmations.
    pub fn confirmations(mut self, n: usize) -> Self {
        self.tx.confirmations = Some(
            (0..n)
                .map(|i| Confirmation {
                    owner: format!("0x{i:040x}"),
                    submission_date: None,
                })
                .collect(),
        );
        self
    }

    /// Attaches decoded calldata with no parameters.
    pub fn decoded_method(mut self, method: &str) -> Self {
        self.tx.data_decoded =
            Some(DataDecoded { method: method.to_string(), parameters: None });
        self
    }

    /// Attaches decoded calldata with a single string parameter.
    pub fn decoded_method_param(mut self, method: &str, name: &str, value: &str) -> Self {
        self.tx.data_decoded = Some(DataDecoded {
            method: method.to_string(),
            parameters: Some(vec![DecodedParameter {
                name: name.to_string(),
                param_type: "uint256".to_string(),
                value: json!(value),
            }]),
        });
        self
    }

    /// Finalizes the fixture.
    pub fn build(self) -> SafeTransaction {
        self.tx
    }
}

/// Builds [`Monitor`] fixtures.
#[derive(Debug, Clone)]
pub struct MonitorBuilder {
    monitor: Monitor,
}

impl MonitorBuilder {
    /// Starts a fixture watching the given wallet on ethereum, created an
    /// hour ago so that fresh transactions pass the backfill gate.
    pub fn new(id: &str, safe_address: &str) -> Self {
        Self {
            monitor: Monitor {
                id: id.to_string(),
                user_id: "user-1".to_string(),
                safe_address: safe_address.to_lowercase(),
                network: "ethereum".to_string(),
                created_at: Utc::now() - Duration::hours(1),
                settings: MonitorSettings::default(),
            },
        }
    }

    /// Sets the network.
    pub fn network(mut self, network: &str) -> Self {
        self.monitor.network = network.to_string();
        self
    }

    /// Sets the creation timestamp.
    pub fn created_at(mut self, at: DateTime<Utc>) -> Self {
        self.monitor.created_at = at;
        self
    }

    /// Sets the alert-type selector.
    pub fn alert_type(mut self, alert_type: AlertType) -> Self {
        self.monitor.settings.alert_type = alert_type;
        self
    }

    /// Sets the legacy management-only flag.
    pub fn management_only(mut self, management_only: bool) -> Self {
        self.monitor.settings.management_only = management_only;
        self
    }

    /// Sets the active flag.
    pub fn active(mut self, active: bool) -> Self {
        self.monitor.settings.active = active;
        self
    }

    /// Appends a notification channel.
    pub fn channel(mut self, channel: ChannelConfig) -> Self {
        self.monitor.settings.channels.push(channel);
        self
    }

    /// Finalizes the fixture.
    pub fn build(self) -> Monitor {
        self.monitor
    }
}
