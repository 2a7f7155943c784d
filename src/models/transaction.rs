//! Safe multisig transaction structures as reported by the transaction
//! service, with explicit zero defaults for every numeric and address field.

use alloy::primitives::{Address, Bytes, U256};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use sqlx::FromRow;

/// Execution mode of a multisig operation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum Operation {
    /// Regular `CALL` to the target.
    #[default]
    Call,
    /// `DELEGATECALL` — the target's code runs in the wallet's own storage
    /// context.
    DelegateCall,
    /// Contract creation.
    Create,
}

impl TryFrom<u8> for Operation {
    type Error = String;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(Operation::Call),
            1 => Ok(Operation::DelegateCall),
            2 => Ok(Operation::Create),
            other => Err(format!("unknown operation kind: {other}")),
        }
    }
}

impl From<Operation> for u8 {
    fn from(op: Operation) -> u8 {
        match op {
            Operation::Call => 0,
            Operation::DelegateCall => 1,
            Operation::Create => 2,
        }
    }
}

/// A single owner confirmation attached to a transaction.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Confirmation {
    /// Address of the confirming owner.
    pub owner: String,
    /// When the confirmation was submitted.
    #[serde(default)]
    pub submission_date: Option<DateTime<Utc>>,
}

/// A decoded calldata parameter.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DecodedParameter {
    /// Parameter name from the contract ABI.
    pub name: String,
    /// Solidity type of the parameter.
    #[serde(rename = "type", default)]
    pub param_type: String,
    /// Parameter value; nested structures (e.g. multiSend batches) stay as
    /// raw JSON.
    #[serde(default)]
    pub value: serde_json::Value,
}

/// Decoded calldata as provided by the transaction service.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DataDecoded {
    /// Decoded method name.
    pub method: String,
    /// Decoded parameters, if the service provided them.
    #[serde(default)]
    pub parameters: Option<Vec<DecodedParameter>>,
}

impl DataDecoded {
    /// Returns a parameter value rendered as a string, if present.
    pub fn param_str(&self, name: &str) -> Option<String> {
        let params = self.parameters.as_ref()?;
        let value = &params.iter().find(|p| p.name == name)?.value;
        match value {
            serde_json::Value::String(s) => Some(s.clone()),
            serde_json::Value::Number(n) => Some(n.to_string()),
            serde_json::Value::Bool(b) => Some(b.to_string()),
            _ => None,
        }
    }
}

/// The known decoded method families, matched exhaustively by the analyzer.
///
/// Anything the service decodes that the pipeline has no special handling
/// for lands in `Other`; undecoded calldata lands in `Undecoded`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DecodedCall {
    /// `addOwnerWithThreshold(address,uint256)`
    AddOwnerWithThreshold {
        /// Owner being added.
        owner: String,
        /// New confirmation threshold.
        threshold: Option<String>,
    },
    /// `removeOwner(address,address,uint256)`
    RemoveOwner {
        /// Owner being removed.
        owner: String,
        /// New confirmation threshold.
        threshold: Option<String>,
    },
    /// `swapOwner(address,address,address)`
    SwapOwner {
        /// Owner being replaced.
        old_owner: String,
        /// Replacement owner.
        new_owner: String,
    },
    /// `changeThreshold(uint256)`
    ChangeThreshold {
        /// New confirmation threshold.
        threshold: Option<String>,
    },
    /// `enableModule(address)`
    EnableModule {
        /// Module being enabled.
        module: String,
    },
    /// `disableModule(address,address)`
    DisableModule {
        /// Module being disabled.
        module: String,
    },
    /// `setGuard(address)`
    SetGuard {
        /// New guard address (zero address clears the guard).
        guard: String,
    },
    /// `setFallbackHandler(address)`
    SetFallbackHandler {
        /// New fallback handler address.
        handler: String,
    },
    /// `changeMasterCopy(address)` — implementation swap on legacy proxies.
    ChangeMasterCopy {
        /// New mastercopy address.
        master_copy: String,
    },
    /// `setup(...)` — wallet initializer; must never run twice.
    Setup,
    /// `signMessage(bytes)`
    SignMessage,
    /// `approveHash(bytes32)`
    ApproveHash,
    /// `execTransaction(...)` — nested execution bookkeeping.
    ExecTransaction,
    /// `multiSend(bytes)` batch.
    MultiSend,
    /// Decoded method the pipeline has no dedicated handling for.
    Other(String),
    /// Calldata the service did not decode (or no calldata at all).
    Undecoded,
}

impl DecodedCall {
    /// Classifies decoded calldata into a method family.
    pub fn classify(decoded: Option<&DataDecoded>) -> Self {
        let Some(d) = decoded else {
            return DecodedCall::Undecoded;
        };
        let param = |name: &str| d.param_str(name).unwrap_or_default();
        match d.method.as_str() {
            "addOwnerWithThreshold" => DecodedCall::AddOwnerWithThreshold {
                owner: param("owner"),
                threshold: d.param_str("_threshold"),
            },
            "removeOwner" => DecodedCall::RemoveOwner {
                owner: param("owner"),
                threshold: d.param_str("_threshold"),
            },
            "swapOwner" => DecodedCall::SwapOwner {
                old_owner: param("oldOwner"),
                new_owner: param("newOwner"),
            },
            "changeThreshold" => {
                DecodedCall::ChangeThreshold { threshold: d.param_str("_threshold") }
            }
            "enableModule" => DecodedCall::EnableModule { module: param("module") },
            "disableModule" => DecodedCall::DisableModule { module: param("module") },
            "setGuard" => DecodedCall::SetGuard { guard: param("guard") },
            "setFallbackHandler" => {
                DecodedCall::SetFallbackHandler { handler: param("handler") }
            }
            "changeMasterCopy" => {
                DecodedCall::ChangeMasterCopy { master_copy: param("_masterCopy") }
            }
            "setup" => DecodedCall::Setup,
            "signMessage" => DecodedCall::SignMessage,
            "approveHash" => DecodedCall::ApproveHash,
            "execTransaction" => DecodedCall::ExecTransaction,
            "multiSend" => DecodedCall::MultiSend,
            other => DecodedCall::Other(other.to_string()),
        }
    }

    /// Whether this call changes wallet control or configuration.
    pub fn is_management(&self) -> bool {
        matches!(
            self,
            DecodedCall::AddOwnerWithThreshold { .. }
                | DecodedCall::RemoveOwner { .. }
                | DecodedCall::SwapOwner { .. }
                | DecodedCall::ChangeThreshold { .. }
                | DecodedCall::EnableModule { .. }
                | DecodedCall::DisableModule { .. }
                | DecodedCall::SetGuard { .. }
                | DecodedCall::SetFallbackHandler { .. }
                | DecodedCall::ChangeMasterCopy { .. }
                | DecodedCall::Setup
        )
    }
}

fn default_trusted() -> bool {
    true
}

/// Accepts a JSON number, a decimal string, or null.
fn u64_from_any<'de, D>(deserializer: D) -> Result<u64, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum NumOrStr {
        Num(u64),
        Str(String),
    }
    Ok(match Option::<NumOrStr>::deserialize(deserializer)? {
        None => 0,
        Some(NumOrStr::Num(n)) => n,
        Some(NumOrStr::Str(s)) => s.parse().unwrap_or(0),
    })
}

/// A single proposed or executed multisig transaction, as listed by the
/// transaction service's v2 multisig-transactions endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SafeTransaction {
    /// The wallet-contract-computed hash that owners sign.
    pub safe_tx_hash: String,
    /// Wallet address the transaction belongs to.
    #[serde(default)]
    pub safe: Option<String>,
    /// Destination address.
    #[serde(default)]
    pub to: Option<String>,
    /// Native value in wei, as a decimal string.
    #[serde(default)]
    pub value: Option<String>,
    /// Raw calldata as 0x-prefixed hex.
    #[serde(default)]
    pub data: Option<String>,
    /// Decoded calldata, when the service could decode it.
    #[serde(default)]
    pub data_decoded: Option<DataDecoded>,
    /// Operation kind.
    #[serde(default)]
    pub operation: Operation,
    /// Wallet nonce of the transaction.
    #[serde(default)]
    pub nonce: i64,
    /// Gas limit reserved for the inner call.
    #[serde(default, deserialize_with = "u64_from_any")]
    pub safe_tx_gas: u64,
    /// Gas reserved for refund bookkeeping (`dataGas` on pre-1.0 wallets).
    #[serde(default, deserialize_with = "u64_from_any")]
    pub base_gas: u64,
    /// Gas price used for the refund calculation, as a decimal string.
    #[serde(default)]
    pub gas_price: Option<String>,
    /// Token used for the gas refund; zero address means native token.
    #[serde(default)]
    pub gas_token: Option<String>,
    /// Address receiving the gas refund.
    #[serde(default)]
    pub refund_receiver: Option<String>,
    /// When the proposal was submitted to the service.
    #[serde(default)]
    pub submission_date: Option<DateTime<Utc>>,
    /// When the transaction executed on-chain, if it has.
    #[serde(default)]
    pub execution_date: Option<DateTime<Utc>>,
    /// Last modification timestamp reported by the service.
    #[serde(default)]
    pub modified: Option<DateTime<Utc>>,
    /// Whether the transaction has executed on-chain.
    #[serde(default)]
    pub is_executed: bool,
    /// Whether the on-chain execution succeeded; `None` until executed.
    #[serde(default)]
    pub is_successful: Option<bool>,
    /// On-chain transaction hash of the execution.
    #[serde(default)]
    pub transaction_hash: Option<String>,
    /// Owner confirmations collected so far.
    #[serde(default)]
    pub confirmations: Option<Vec<Confirmation>>,
    /// Whether the service marks the destination contract as trusted.
    #[serde(default = "default_trusted")]
    pub trusted: bool,
}

impl SafeTransaction {
    /// Destination address; the zero address when absent or unparsable.
    pub fn to_address(&self) -> Address {
        parse_address(self.to.as_deref())
    }

    /// Transferred value in wei; zero when absent or unparsable.
    pub fn value_wei(&self) -> U256 {
        parse_u256(self.value.as_deref())
    }

    /// Raw calldata bytes; empty when absent or unparsable.
    pub fn call_data(&self) -> Bytes {
        self.data
            .as_deref()
            .and_then(|d| hex::decode(d.trim_start_matches("0x")).ok())
            .map(Bytes::from)
            .unwrap_or_default()
    }

    /// Whether the transaction carries any calldata.
    pub fn has_call_data(&self) -> bool {
        !self.call_data().is_empty()
    }

    /// Refund gas price in wei; zero when absent.
    pub fn gas_price_wei(&self) -> U256 {
        parse_u256(self.gas_price.as_deref())
    }

    /// Gas refund token; the zero address when absent.
    pub fn gas_token_address(&self) -> Address {
        parse_address(self.gas_token.as_deref())
    }

    /// Refund receiver; the zero address when absent.
    pub fn refund_receiver_address(&self) -> Address {
        parse_address(self.refund_receiver.as_deref())
    }

    /// Number of owner confirmations collected.
    pub fn confirmation_count(&self) -> usize {
        self.confirmations.as_ref().map_or(0, Vec::len)
    }

    /// Submission timestamp, falling back to the execution timestamp.
    pub fn effective_timestamp(&self) -> Option<DateTime<Utc>> {
        self.submission_date.or(self.execution_date)
    }

    /// Classifies the decoded calldata into a method family.
    pub fn decoded_call(&self) -> DecodedCall {
        DecodedCall::classify(self.data_decoded.as_ref())
    }
}

fn parse_address(s: Option<&str>) -> Address {
    s.and_then(|a| a.parse::<Address>().ok()).unwrap_or(Address::ZERO)
}

fn parse_u256(s: Option<&str>) -> U256 {
    s.and_then(|v| v.parse::<U256>().ok()).unwrap_or(U256::ZERO)
}

/// The persisted form of a transaction, carrying only the columns the
/// pipeline needs for change detection plus the raw service JSON.
#[derive(Debug, Clone, FromRow)]
pub struct StoredTransaction {
    /// The wallet-contract-computed hash.
    pub safe_tx_hash: String,
    /// Wallet address (normalized lowercase).
    pub safe_address: String,
    /// Network name.
    pub network: String,
    /// Wallet nonce.
    pub nonce: i64,
    /// Whether the transaction had executed when last stored.
    pub is_executed: bool,
    /// Confirmation count when last stored.
    pub confirmation_count: i64,
    /// Submission timestamp.
    pub submission_date: Option<DateTime<Utc>>,
    /// Execution timestamp when last stored.
    pub execution_date: Option<DateTime<Utc>>,
    /// On-chain execution hash when last stored.
    pub execution_tx_hash: Option<String>,
    /// Full service JSON at last store.
    pub raw_json: String,
}

impl StoredTransaction {
    /// Whether an incoming copy of the same transaction carries changes that
    /// warrant re-analysis: execution status, confirmation count, execution
    /// date or execution hash.
    pub fn differs_from(&self, incoming: &SafeTransaction) -> bool {
        self.is_executed != incoming.is_executed
            || self.confirmation_count != incoming.confirmation_count() as i64
            || self.execution_date != incoming.execution_date
            || self.execution_tx_hash.as_deref() != incoming.transaction_hash.as_deref()
    }
}
