//! Derived security-analysis structures: severity-tagged details, the
//! hash-verification and nonce-check sub-results, and the aggregate result.

use serde::{Deserialize, Serialize};

use crate::models::transaction::Operation;

/// Aggregate risk level of a transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RiskLevel {
    /// Nothing noteworthy.
    Low,
    /// Worth a look.
    Medium,
    /// Likely dangerous.
    High,
    /// Wallet control at stake.
    Critical,
}

/// Severity of a single finding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    /// Informational.
    Low,
    /// Worth a look.
    Medium,
    /// Likely dangerous.
    High,
    /// Wallet control at stake.
    Critical,
}

/// Priority marker for findings that override user notification filters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Priority {
    /// Unconditionally critical; forces notification regardless of the
    /// monitor's alert-type filter.
    P0,
}

/// The category a finding belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DetailKind {
    /// Recomputed transaction hash does not match the reported one.
    HashVerification,
    /// Nonce sequencing anomaly.
    NonceCheck,
    /// Non-default gas parameters.
    GasParameters,
    /// Gas token / refund receiver combination.
    GasTokenAttack,
    /// Delegate-call target trust.
    DelegateCall,
    /// Large native value transfer.
    LargeValue,
    /// Owner/threshold/module/guard/implementation change.
    Management,
    /// Execution bookkeeping (signing, approvals, exec status).
    Execution,
    /// Gas limits or price outside usual bounds.
    UnusualGas,
    /// Calldata sent to a contract the service does not mark trusted.
    UntrustedContract,
}

/// A single structured finding produced by the risk analyzer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SecurityDetail {
    /// Finding category.
    #[serde(rename = "type")]
    pub kind: DetailKind,
    /// Severity of this finding alone.
    pub severity: Severity,
    /// Human-readable description.
    pub message: String,
    /// Optional value the finding is about (an amount, an address, a hash).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
    /// Threshold the value was compared against, when applicable.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub threshold: Option<u64>,
    /// Present only on findings that override notification filters.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub priority: Option<Priority>,
    /// Tracked for completeness but only notified when the monitor's
    /// alert type is `all`.
    #[serde(default)]
    pub track_only: bool,
}

impl SecurityDetail {
    /// Creates a finding with no extra fields set.
    pub fn new(kind: DetailKind, severity: Severity, message: impl Into<String>) -> Self {
        Self {
            kind,
            severity,
            message: message.into(),
            value: None,
            threshold: None,
            priority: None,
            track_only: false,
        }
    }

    /// Attaches the value the finding is about.
    pub fn with_value(mut self, value: impl Into<String>) -> Self {
        self.value = Some(value.into());
        self
    }

    /// Attaches the threshold the value was compared against.
    pub fn with_threshold(mut self, threshold: u64) -> Self {
        self.threshold = Some(threshold);
        self
    }

    /// Marks the finding as filter-overriding.
    pub fn p0(mut self) -> Self {
        self.priority = Some(Priority::P0);
        self
    }

    /// Marks the finding as track-only.
    pub fn track_only(mut self) -> Self {
        self.track_only = true;
        self
    }

    /// Whether this finding overrides notification filters.
    pub fn is_p0(&self) -> bool {
        self.priority == Some(Priority::P0)
    }
}

/// Outcome of recomputing the transaction hash.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HashVerification {
    /// Whether the check ran at all (it needs the wallet version and chain
    /// id from the info probe).
    pub performed: bool,
    /// Whether the recomputed hash matched the reported one.
    pub verified: bool,
    /// The locally recomputed hash.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub computed_hash: Option<String>,
    /// The hash reported by the transaction service.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reported_hash: Option<String>,
}

impl HashVerification {
    /// A sub-result for the case where the check could not run.
    pub fn skipped() -> Self {
        Self { performed: false, verified: false, computed_hash: None, reported_hash: None }
    }
}

/// Outcome of the nonce sequencing check.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NonceCheck {
    /// Whether a previous nonce existed to compare against.
    pub performed: bool,
    /// Whether the gap was classified as risky.
    pub risky: bool,
    /// Signed gap between the current and previous nonce.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gap: Option<i64>,
    /// Severity of the anomaly, when risky.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub severity: Option<Severity>,
    /// Human-readable description, when risky.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl NonceCheck {
    /// A sub-result for the first transaction ever seen on a wallet.
    pub fn skipped() -> Self {
        Self { performed: false, risky: false, gap: None, severity: None, message: None }
    }
}

/// Call-type classification of the transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CallKind {
    /// Regular call.
    Call,
    /// Delegate call.
    DelegateCall,
    /// Contract creation.
    ContractCreation,
}

impl From<Operation> for CallKind {
    fn from(op: Operation) -> Self {
        match op {
            Operation::Call => CallKind::Call,
            Operation::DelegateCall => CallKind::DelegateCall,
            Operation::Create => CallKind::ContractCreation,
        }
    }
}

/// The full derived analysis for one transaction.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SecurityAnalysisResult {
    /// Whether the transaction is considered suspicious overall.
    pub is_suspicious: bool,
    /// Aggregate risk level.
    pub risk_level: RiskLevel,
    /// Ordered human-readable warnings.
    pub warnings: Vec<String>,
    /// All structured findings, in rule order.
    pub details: Vec<SecurityDetail>,
    /// Hash-verification sub-result.
    pub hash_verification: HashVerification,
    /// Nonce-check sub-result.
    pub nonce_check: NonceCheck,
    /// Call-type classification.
    pub call_kind: CallKind,
    /// One-line summary of the decoded calldata, when available.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub decoded_summary: Option<String>,
    /// Whether the transaction is a governance/management operation.
    pub is_management: bool,
}

impl SecurityAnalysisResult {
    /// Whether any finding carries the filter-overriding `P0` priority.
    pub fn has_p0(&self) -> bool {
        self.details.iter().any(SecurityDetail::is_p0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn severity_orders_low_to_critical() {
        assert!(Severity::Low < Severity::Medium);
        assert!(Severity::Medium < Severity::High);
        assert!(Severity::High < Severity::Critical);
    }

    #[test]
    fn detail_serializes_with_type_tag() {
        let detail = SecurityDetail::new(DetailKind::DelegateCall, Severity::Critical, "x").p0();
        let json = serde_json::to_value(&detail).unwrap();
        assert_eq!(json["type"], "delegate_call");
        assert_eq!(json["severity"], "critical");
        assert_eq!(json["priority"], "P0");
    }

    #[test]
    fn risk_level_serializes_lowercase() {
        assert_eq!(serde_json::to_value(RiskLevel::Critical).unwrap(), "critical");
    }
}
