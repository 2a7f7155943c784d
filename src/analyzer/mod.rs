//! The deterministic risk classifier.
//!
//! Runs the hash verifier and nonce sequencer, evaluates every heuristic
//! rule, and folds the findings into a single [`SecurityAnalysisResult`]
//! with a fixed aggregation order.

pub mod nonce;
pub mod rules;

use alloy::primitives::{Address, U256};

use crate::models::analysis::{
    DetailKind, HashVerification, RiskLevel, SecurityAnalysisResult, SecurityDetail, Severity,
};
use crate::models::transaction::{DecodedCall, SafeTransaction};
use crate::verifier;

/// Context supplied by the orchestrator for one analysis run.
#[derive(Debug, Clone, Default)]
pub struct AnalysisContext {
    /// Chain id of the network the wallet lives on. The orchestrator sets
    /// this to `None` when the wallet-info probe failed (the wallet version
    /// is unknown), which skips hash verification for the cycle.
    pub chain_id: Option<u64>,
    /// On-chain wallet version string from the info probe.
    pub version: Option<String>,
    /// Highest nonce previously stored for this wallet.
    pub previous_nonce: Option<i64>,
}

/// The rule engine. Stateless apart from its thresholds.
#[derive(Debug, Clone)]
pub struct RiskAnalyzer {
    nonce_gap_threshold: i64,
}

impl Default for RiskAnalyzer {
    fn default() -> Self {
        Self { nonce_gap_threshold: nonce::DEFAULT_GAP_THRESHOLD }
    }
}

impl RiskAnalyzer {
    /// Creates an analyzer with a custom nonce gap threshold.
    pub fn new(nonce_gap_threshold: i64) -> Self {
        Self { nonce_gap_threshold }
    }

    /// Analyzes one transaction against all rules.
    pub fn analyze(
        &self,
        tx: &SafeTransaction,
        safe_address: Address,
        ctx: &AnalysisContext,
    ) -> SecurityAnalysisResult {
        let mut details: Vec<SecurityDetail> = Vec::new();

        let hash_verification = match ctx.chain_id {
            Some(chain_id) => verifier::verify(tx, safe_address, chain_id, ctx.version.as_deref()),
            None => HashVerification::skipped(),
        };
        if hash_verification.performed && !hash_verification.verified {
            let forensic = format!(
                "computed {}, reported {}",
                hash_verification.computed_hash.as_deref().unwrap_or("?"),
                hash_verification.reported_hash.as_deref().unwrap_or("?"),
            );
            details.push(
                SecurityDetail::new(
                    DetailKind::HashVerification,
                    Severity::Critical,
                    "transaction hash verification failed",
                )
                .with_value(forensic)
                .p0(),
            );
        }

        let nonce_check = nonce::check(tx.nonce, ctx.previous_nonce, self.nonce_gap_threshold);
        if nonce_check.risky {
            if let (Some(severity), Some(message)) =
                (nonce_check.severity, nonce_check.message.clone())
            {
                let mut detail = SecurityDetail::new(DetailKind::NonceCheck, severity, message);
                if let Some(gap) = nonce_check.gap {
                    detail = detail.with_value(gap.to_string());
                }
                details.push(detail);
            }
        }

        let call = tx.decoded_call();
        details.extend(rules::gas_parameter_findings(tx));
        details.extend(rules::delegate_call_findings(tx));
        details.extend(rules::value_transfer_findings(tx));
        details.extend(rules::management_findings(tx, &call));
        details.extend(rules::unusual_gas_findings(tx));
        details.extend(rules::untrusted_contract_findings(tx));

        let (risk_level, is_suspicious) = aggregate(&details);
        let warnings = details
            .iter()
            .filter(|d| d.severity >= Severity::Medium || d.is_p0())
            .map(|d| d.message.clone())
            .collect();

        SecurityAnalysisResult {
            is_suspicious,
            risk_level,
            warnings,
            details,
            hash_verification,
            nonce_check,
            call_kind: tx.operation.into(),
            decoded_summary: decoded_summary(tx),
            is_management: call.is_management(),
        }
    }
}

/// Folds findings into the aggregate (risk level, suspicious) verdict.
///
/// Order matters and is covered by tests: P0 always wins, then critical
/// and high severities, then the medium/low counting rules.
fn aggregate(details: &[SecurityDetail]) -> (RiskLevel, bool) {
    if details.iter().any(SecurityDetail::is_p0) {
        return (RiskLevel::Critical, true);
    }
    if details.iter().any(|d| d.severity == Severity::Critical) {
        return (RiskLevel::Critical, true);
    }
    if details.iter().any(|d| d.severity == Severity::High) {
        return (RiskLevel::High, true);
    }
    let medium = details.iter().filter(|d| d.severity == Severity::Medium).count();
    let low = details.iter().filter(|d| d.severity == Severity::Low).count();
    if medium > 1 || (medium == 1 && low > 2) {
        return (RiskLevel::Medium, true);
    }
    if medium == 1 {
        return (RiskLevel::Medium, false);
    }
    (RiskLevel::Low, false)
}

/// One-line human summary of the decoded calldata, when available.
fn decoded_summary(tx: &SafeTransaction) -> Option<String> {
    if let Some(decoded) = &tx.data_decoded {
        let params = decoded
            .parameters
            .as_ref()
            .map(|ps| {
                ps.iter()
                    .map(|p| p.name.as_str())
                    .collect::<Vec<_>>()
                    .join(", ")
            })
            .unwrap_or_default();
        return Some(format!("{}({params})", decoded.method));
    }
    if tx.value_wei() > U256::ZERO && !tx.has_call_data() {
        return Some(format!("native transfer of {} wei", tx.value_wei()));
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::analysis::CallKind;
    use crate::models::transaction::Operation;
    use crate::test_helpers::SafeTransactionBuilder;

    fn safe() -> Address {
        "0x5afE3855358E112B5647B952709E6165e1c1eEEe".parse().unwrap()
    }

    fn analyzer() -> RiskAnalyzer {
        RiskAnalyzer::default()
    }

    #[test]
    fn clean_transaction_is_low_risk() {
        let tx = SafeTransactionBuilder::new("0x00").nonce(4).build();
        let result =
            analyzer().analyze(&tx, safe(), &AnalysisContext { previous_nonce: Some(3), ..Default::default() });
        assert_eq!(result.risk_level, RiskLevel::Low);
        assert!(!result.is_suspicious);
        assert!(!result.is_management);
        assert!(result.warnings.is_empty());
        assert_eq!(result.call_kind, CallKind::Call);
    }

    #[test]
    fn p0_forces_critical_regardless_of_other_findings() {
        // A single untrusted delegate call on an otherwise clean transaction.
        let tx = SafeTransactionBuilder::new("0x00")
            .operation(Operation::DelegateCall)
            .to("0x2222222222222222222222222222222222222222")
            .build();
        let result = analyzer().analyze(&tx, safe(), &AnalysisContext::default());
        assert_eq!(result.risk_level, RiskLevel::Critical);
        assert!(result.is_suspicious);
        assert!(result.has_p0());
    }

    #[test]
    fn hash_mismatch_surfaces_as_critical_p0_finding() {
        let tx = SafeTransactionBuilder::new(
            "0x1111111111111111111111111111111111111111111111111111111111111111",
        )
        .build();
        let ctx = AnalysisContext {
            chain_id: Some(1),
            version: Some("1.3.0".into()),
            ..Default::default()
        };
        let result = analyzer().analyze(&tx, safe(), &ctx);
        assert!(result.hash_verification.performed);
        assert!(!result.hash_verification.verified);
        let finding =
            result.details.iter().find(|d| d.kind == DetailKind::HashVerification).unwrap();
        assert!(finding.is_p0());
        assert_eq!(finding.message, "transaction hash verification failed");
        assert!(finding.value.as_deref().unwrap().contains("computed 0x"));
        assert_eq!(result.risk_level, RiskLevel::Critical);
    }

    #[test]
    fn hash_check_skipped_without_chain_id() {
        let tx = SafeTransactionBuilder::new("0xabc").build();
        let result = analyzer().analyze(&tx, safe(), &AnalysisContext::default());
        assert!(!result.hash_verification.performed);
        assert!(result.details.iter().all(|d| d.kind != DetailKind::HashVerification));
    }

    #[test]
    fn threshold_change_scenario_matches_end_to_end_expectations() {
        // Wallet threshold changed from 2 to 1: critical, suspicious, and the
        // warning names the change.
        let tx = SafeTransactionBuilder::new("0x00")
            .decoded_method_param("changeThreshold", "_threshold", "1")
            .nonce(8)
            .build();
        let ctx = AnalysisContext { previous_nonce: Some(7), ..Default::default() };
        let result = analyzer().analyze(&tx, safe(), &ctx);
        assert_eq!(result.risk_level, RiskLevel::Critical);
        assert!(result.is_suspicious);
        assert!(result.is_management);
        assert!(result.warnings.iter().any(|w| w.contains("Threshold Changed")));
        assert_eq!(result.decoded_summary.as_deref(), Some("changeThreshold(_threshold)"));
    }

    #[test]
    fn single_medium_is_medium_but_not_suspicious() {
        let tx = SafeTransactionBuilder::new("0x00")
            .value("11000000000000000000") // 11 native units
            .build();
        let result = analyzer().analyze(&tx, safe(), &AnalysisContext::default());
        assert_eq!(result.risk_level, RiskLevel::Medium);
        assert!(!result.is_suspicious);
    }

    #[test]
    fn two_mediums_become_suspicious() {
        let tx = SafeTransactionBuilder::new("0x00")
            .value("11000000000000000000")
            .to("0x2222222222222222222222222222222222222222")
            .data("0xdeadbeef")
            .trusted(false)
            .build();
        let result = analyzer().analyze(&tx, safe(), &AnalysisContext::default());
        assert_eq!(result.risk_level, RiskLevel::Medium);
        assert!(result.is_suspicious);
    }

    #[test]
    fn nonce_regression_is_critical() {
        let tx = SafeTransactionBuilder::new("0x00").nonce(0).build();
        let ctx = AnalysisContext { previous_nonce: Some(5), ..Default::default() };
        let result = analyzer().analyze(&tx, safe(), &ctx);
        assert!(result.nonce_check.risky);
        assert_eq!(result.risk_level, RiskLevel::Critical);
        assert!(result.is_suspicious);
    }

    #[test]
    fn track_only_findings_do_not_raise_risk() {
        let tx = SafeTransactionBuilder::new("0x00").decoded_method("signMessage").build();
        let result = analyzer().analyze(&tx, safe(), &AnalysisContext::default());
        assert_eq!(result.risk_level, RiskLevel::Low);
        assert!(!result.is_suspicious);
        assert!(result.details.iter().any(|d| d.track_only));
        assert!(result.warnings.is_empty());
    }

    #[test]
    fn gas_findings_reach_high_risk() {
        let tx = SafeTransactionBuilder::new("0x00")
            .gas_token("0x3333333333333333333333333333333333333333")
            .refund_receiver("0x4444444444444444444444444444444444444444")
            .build();
        let result = analyzer().analyze(&tx, safe(), &AnalysisContext::default());
        assert_eq!(result.risk_level, RiskLevel::High);
        assert!(result.is_suspicious);
    }
}
