//! Nonce sequencing checks.
//!
//! Pure classification of the gap between a transaction's nonce and the
//! highest nonce previously stored for the same wallet. Total over all
//! integer inputs; with no previous nonce the check is skipped.

use crate::models::analysis::{NonceCheck, Severity};

/// Nonce gaps strictly larger than this are flagged.
pub const DEFAULT_GAP_THRESHOLD: i64 = 5;

/// Classifies the nonce gap for a transaction.
pub fn check(current: i64, previous: Option<i64>, threshold: i64) -> NonceCheck {
    let Some(previous) = previous else {
        return NonceCheck::skipped();
    };
    let gap = current - previous;

    if gap < 0 {
        return risky(gap, Severity::Critical, "nonce decreased — highly suspicious");
    }
    if gap == 0 {
        return risky(gap, Severity::High, "same nonce used multiple times — possible replay");
    }
    if gap > threshold {
        let severity = if gap <= 2 * threshold { Severity::Medium } else { Severity::High };
        return risky(
            gap,
            severity,
            format!("nonce gap of {gap} exceeds threshold of {threshold}"),
        );
    }

    NonceCheck { performed: true, risky: false, gap: Some(gap), severity: None, message: None }
}

fn risky(gap: i64, severity: Severity, message: impl Into<String>) -> NonceCheck {
    NonceCheck {
        performed: true,
        risky: true,
        gap: Some(gap),
        severity: Some(severity),
        message: Some(message.into()),
    }
}
