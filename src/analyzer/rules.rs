//! The individual risk rules. Each rule inspects one aspect of a decoded
//! transaction and contributes zero or more severity-tagged findings.

use alloy::primitives::{Address, U256};

use crate::models::analysis::{DetailKind, SecurityDetail, Severity};
use crate::models::transaction::{DecodedCall, Operation, SafeTransaction};

/// Canonical helper contracts that are legitimately invoked via delegate
/// call: MultiSend / MultiSendCallOnly, SignMessageLib and the official
/// migration libraries, across deployed versions. Lowercase.
const TRUSTED_DELEGATE_TARGETS: &[&str] = &[
    // MultiSend 1.1.1
    "0x8d29be29923b68abfdd21e541b9374737b49cdad",
    // MultiSend 1.3.0 (canonical + eip155 deployments)
    "0xa238cbeb142c10ef7ad8442c6d1f9e89e07e7761",
    "0x998739bfdaadde7c933b942a68053933098f9eda",
    // MultiSendCallOnly 1.3.0
    "0x40a2accbd92bca938b02010e17a5b8929b49130d",
    "0xa1dabef33b3b82c7814b6d82a79e50f4ac44102b",
    // MultiSend / MultiSendCallOnly 1.4.1
    "0x38869bf66a61cf6bdb996a6ae40d5853fd43b526",
    "0x9641d764fc13c8b624c04430c7356c1c7c8102e2",
    // SignMessageLib 1.3.0 / 1.4.1
    "0xa65387f16b013cf2af4605ad8aa5ec25a2cba3a2",
    "0x98ffbbf51bb33a056b08ddf711f289936aaff717",
    "0xd53cd0ab83d845ac265be939c57f53ad838012c9",
    // SafeMigration 1.4.1 and SafeToL2Migration
    "0x526643f69b81b008f46d95cd5ced5ec0edffdac6",
    "0xff83f6335d8930cbad1c0d439a841f01888d9f69",
];

/// Whether an address is a canonical delegate-call helper.
pub fn is_trusted_delegate_target(address: &str) -> bool {
    let normalized = address.to_lowercase();
    TRUSTED_DELEGATE_TARGETS.contains(&normalized.as_str())
}

fn one_native_unit() -> U256 {
    U256::from(10).pow(U256::from(18))
}

/// Gas-parameter integrity (rule 1): refund-related fields are zero on
/// normal transactions; a populated refund path can siphon value.
pub fn gas_parameter_findings(tx: &SafeTransaction) -> Vec<SecurityDetail> {
    let mut findings = Vec::new();

    let gas_price = tx.gas_price_wei();
    let gas_token = tx.gas_token_address();
    let refund_receiver = tx.refund_receiver_address();

    let mut non_default = Vec::new();
    if gas_price != U256::ZERO {
        non_default.push("gasPrice");
    }
    if gas_token != Address::ZERO {
        non_default.push("gasToken");
    }
    if refund_receiver != Address::ZERO {
        non_default.push("refundReceiver");
    }
    if tx.safe_tx_gas != 0 {
        non_default.push("safeTxGas");
    }
    if tx.base_gas != 0 {
        non_default.push("baseGas");
    }

    if !non_default.is_empty() {
        findings.push(SecurityDetail::new(
            DetailKind::GasParameters,
            Severity::High,
            format!("non-default gas parameters set: {}", non_default.join(", ")),
        ));
    }

    if gas_token != Address::ZERO && refund_receiver != Address::ZERO {
        let (severity, message) = if gas_price != U256::ZERO {
            (
                Severity::Critical,
                "gas token attack risk: gas token, refund receiver and gas price all set — \
                 possible hidden value transfer via refund",
            )
        } else {
            (Severity::High, "gas token attack risk: gas token and refund receiver both set")
        };
        findings.push(
            SecurityDetail::new(DetailKind::GasTokenAttack, severity, message)
                .with_value(refund_receiver.to_string()),
        );
    } else if gas_token != Address::ZERO {
        findings.push(
            SecurityDetail::new(
                DetailKind::GasTokenAttack,
                Severity::Medium,
                "custom gas token set",
            )
            .with_value(gas_token.to_string()),
        );
    } else if refund_receiver != Address::ZERO {
        findings.push(
            SecurityDetail::new(
                DetailKind::GasTokenAttack,
                Severity::Medium,
                "custom refund receiver set",
            )
            .with_value(refund_receiver.to_string()),
        );
    }

    findings
}

/// Delegate-call trust (rule 2): a delegate call hands the target full
/// control of the wallet's storage, so anything off the whitelist is a
/// wallet-takeover vector.
pub fn delegate_call_findings(tx: &SafeTransaction) -> Vec<SecurityDetail> {
    if tx.operation != Operation::DelegateCall {
        return Vec::new();
    }
    let target = tx.to.clone().unwrap_or_else(|| Address::ZERO.to_string());
    if is_trusted_delegate_target(&target) {
        vec![
            SecurityDetail::new(
                DetailKind::DelegateCall,
                Severity::Low,
                "delegate call to a known helper contract",
            )
            .with_value(target),
        ]
    } else {
        vec![
            SecurityDetail::new(
                DetailKind::DelegateCall,
                Severity::Critical,
                "untrusted delegate call — full compromise risk",
            )
            .with_value(target)
            .p0(),
        ]
    }
}

/// Large value transfer (rule 3): above 10 native units is medium, above
/// 100 is high.
pub fn value_transfer_findings(tx: &SafeTransaction) -> Vec<SecurityDetail> {
    let value = tx.value_wei();
    let unit = one_native_unit();
    let whole_units = value / unit;

    if whole_units > U256::from(100) {
        vec![
            SecurityDetail::new(
                DetailKind::LargeValue,
                Severity::High,
                format!("very large value transfer: {whole_units} native units"),
            )
            .with_value(value.to_string())
            .with_threshold(100),
        ]
    } else if whole_units > U256::from(10) {
        vec![
            SecurityDetail::new(
                DetailKind::LargeValue,
                Severity::Medium,
                format!("large value transfer: {whole_units} native units"),
            )
            .with_value(value.to_string())
            .with_threshold(10),
        ]
    } else {
        Vec::new()
    }
}

/// Governance/management operations (rule 4): anything that changes wallet
/// control is unconditionally critical; bookkeeping methods are tracked
/// but only alerted when the monitor wants everything.
pub fn management_findings(tx: &SafeTransaction, call: &DecodedCall) -> Vec<SecurityDetail> {
    let management = |message: String, value: Option<String>| {
        let mut detail =
            SecurityDetail::new(DetailKind::Management, Severity::Critical, message).p0();
        if let Some(value) = value {
            detail = detail.with_value(value);
        }
        vec![detail]
    };
    let track_only = |message: &str| {
        vec![
            SecurityDetail::new(DetailKind::Execution, Severity::Low, message).track_only(),
        ]
    };

    match call {
        DecodedCall::AddOwnerWithThreshold { owner, threshold } => management(
            match threshold {
                Some(t) => format!("Owner Added (threshold {t})"),
                None => "Owner Added".to_string(),
            },
            Some(owner.clone()),
        ),
        DecodedCall::RemoveOwner { owner, threshold } => management(
            match threshold {
                Some(t) => format!("Owner Removed (threshold {t})"),
                None => "Owner Removed".to_string(),
            },
            Some(owner.clone()),
        ),
        DecodedCall::SwapOwner { old_owner, new_owner } => management(
            format!("Owner Swapped: {old_owner} -> {new_owner}"),
            Some(new_owner.clone()),
        ),
        DecodedCall::ChangeThreshold { threshold } => management(
            match threshold {
                Some(t) => format!("Threshold Changed to {t}"),
                None => "Threshold Changed".to_string(),
            },
            threshold.clone(),
        ),
        DecodedCall::EnableModule { module } => {
            management("Module Enabled".to_string(), Some(module.clone()))
        }
        DecodedCall::DisableModule { module } => {
            management("Module Disabled".to_string(), Some(module.clone()))
        }
        DecodedCall::SetGuard { guard } => {
            management("Guard Changed".to_string(), Some(guard.clone()))
        }
        DecodedCall::SetFallbackHandler { handler } => {
            management("Fallback Handler Changed".to_string(), Some(handler.clone()))
        }
        DecodedCall::ChangeMasterCopy { master_copy } => {
            management("Master Copy Changed".to_string(), Some(master_copy.clone()))
        }
        DecodedCall::Setup => {
            management("Setup Re-invocation on an initialized wallet".to_string(), None)
        }
        DecodedCall::SignMessage => track_only("message signing recorded"),
        DecodedCall::ApproveHash => track_only("hash approval recorded"),
        DecodedCall::ExecTransaction => {
            if tx.is_executed && tx.is_successful == Some(false) {
                vec![SecurityDetail::new(
                    DetailKind::Execution,
                    Severity::Medium,
                    "transaction execution failed",
                )]
            } else {
                track_only("nested transaction execution recorded")
            }
        }
        DecodedCall::MultiSend
        | DecodedCall::Other(_)
        | DecodedCall::Undecoded => {
            if tx.is_executed && tx.is_successful == Some(false) {
                vec![SecurityDetail::new(
                    DetailKind::Execution,
                    Severity::Medium,
                    "transaction execution failed",
                )]
            } else {
                Vec::new()
            }
        }
    }
}

/// Unusual gas settings (rule 5).
pub fn unusual_gas_findings(tx: &SafeTransaction) -> Vec<SecurityDetail> {
    const GAS_LIMIT_CEILING: u64 = 1_000_000;

    let mut findings = Vec::new();
    if tx.safe_tx_gas > GAS_LIMIT_CEILING {
        findings.push(
            SecurityDetail::new(
                DetailKind::UnusualGas,
                Severity::Medium,
                format!("safeTxGas of {} is unusually high", tx.safe_tx_gas),
            )
            .with_threshold(GAS_LIMIT_CEILING),
        );
    }
    if tx.base_gas > GAS_LIMIT_CEILING {
        findings.push(
            SecurityDetail::new(
                DetailKind::UnusualGas,
                Severity::Medium,
                format!("baseGas of {} is unusually high", tx.base_gas),
            )
            .with_threshold(GAS_LIMIT_CEILING),
        );
    }
    if tx.gas_price_wei() == U256::ZERO && tx.gas_token_address() != Address::ZERO {
        findings.push(SecurityDetail::new(
            DetailKind::UnusualGas,
            Severity::Medium,
            "zero gas price with a custom gas token — possible gas manipulation",
        ));
    }
    findings
}

/// Untrusted contract interaction (rule 6): calldata sent to a contract the
/// upstream service does not mark trusted.
pub fn untrusted_contract_findings(tx: &SafeTransaction) -> Vec<SecurityDetail> {
    if tx.has_call_data() && !tx.trusted {
        vec![
            SecurityDetail::new(
                DetailKind::UntrustedContract,
                Severity::Medium,
                "calldata sent to a contract not marked trusted by the indexing service",
            )
            .with_value(tx.to.clone().unwrap_or_default()),
        ]
    } else {
        Vec::new()
    }
}
