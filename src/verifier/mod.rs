//! Recomputes the EIP-712 transaction hash a Safe contract would produce
//! and compares it against the hash reported by the transaction service.
//!
//! The typehashes are version-dependent: wallets below 1.3.0 use a domain
//! separator without the chain id, and wallets below 1.0.0 hash a `dataGas`
//! field where later versions hash `baseGas`. Both legacy formulas must be
//! reproduced exactly or every historical wallet would alarm.

use std::str::FromStr;

use alloy::primitives::{b256, keccak256, Address, B256, U256};
use thiserror::Error;

use crate::models::analysis::HashVerification;
use crate::models::transaction::SafeTransaction;

/// `keccak256("EIP712Domain(uint256 chainId,address verifyingContract)")`,
/// used by wallets >= 1.3.0.
pub const DOMAIN_TYPEHASH: B256 =
    b256!("47e79534a245952e8b16893a336b85a3d9ea9fa8c573f3d803afb92a79469218");

/// `keccak256("EIP712Domain(address verifyingContract)")`, used by wallets
/// below 1.3.0.
pub const DOMAIN_TYPEHASH_LEGACY: B256 =
    b256!("035aff83d86937d35b32e04f0ddc6ff469290eef2f1b692d8a815c89404d4749");

/// `keccak256("SafeTx(address to,uint256 value,bytes data,uint8 operation,
/// uint256 safeTxGas,uint256 baseGas,uint256 gasPrice,address gasToken,
/// address refundReceiver,uint256 nonce)")`, used by wallets >= 1.0.0.
pub const SAFE_TX_TYPEHASH: B256 =
    b256!("bb8310d486368db6bd6f849402fdd73ad53d316b5a4b2644ad6efe0f941286d8");

/// Pre-1.0.0 variant of the SafeTx typehash with `dataGas` in place of
/// `baseGas`.
pub const SAFE_TX_TYPEHASH_LEGACY: B256 =
    b256!("14d461bc7412367e924637b363c7bf29b8f47e2f84869f4426e5633d8af47b20");

/// Error parsing a wallet version string.
#[derive(Debug, Error)]
#[error("unparsable wallet version: {0}")]
pub struct VersionParseError(String);

/// A parsed `major.minor.patch` wallet version.
///
/// Build metadata suffixes such as `+L2` are ignored for comparison.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct SafeVersion {
    /// Major component.
    pub major: u32,
    /// Minor component.
    pub minor: u32,
    /// Patch component.
    pub patch: u32,
}

impl SafeVersion {
    /// Whether the domain separator includes the chain id (1.3.0 and later).
    pub fn domain_includes_chain_id(&self) -> bool {
        (self.major, self.minor) >= (1, 3)
    }

    /// Whether the message hash uses `baseGas` (1.0.0 and later) rather
    /// than the pre-1.0 `dataGas` field.
    pub fn uses_base_gas(&self) -> bool {
        self.major >= 1
    }

    /// Parses a version string, falling back to current-contract semantics
    /// when the string is missing or unparsable.
    pub fn parse_or_current(version: Option<&str>) -> Self {
        version.and_then(|v| v.parse().ok()).unwrap_or_default()
    }
}

impl Default for SafeVersion {
    fn default() -> Self {
        Self { major: 1, minor: 3, patch: 0 }
    }
}

impl FromStr for SafeVersion {
    type Err = VersionParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let core = s.split('+').next().unwrap_or(s).trim();
        let mut parts = core.split('.');
        let mut next = || -> Result<u32, VersionParseError> {
            match parts.next() {
                None => Ok(0),
                Some(p) => p.parse().map_err(|_| VersionParseError(s.to_string())),
            }
        };
        let major = next()?;
        let minor = next()?;
        let patch = next()?;
        if core.is_empty() {
            return Err(VersionParseError(s.to_string()));
        }
        Ok(Self { major, minor, patch })
    }
}

fn word_u256(value: U256) -> [u8; 32] {
    value.to_be_bytes::<32>()
}

fn word_address(address: Address) -> [u8; 32] {
    let mut word = [0u8; 32];
    word[12..].copy_from_slice(address.as_slice());
    word
}

/// Computes the wallet's EIP-712 domain separator.
pub fn domain_hash(version: SafeVersion, chain_id: u64, safe: Address) -> B256 {
    let mut encoded = Vec::with_capacity(96);
    if version.domain_includes_chain_id() {
        encoded.extend_from_slice(DOMAIN_TYPEHASH.as_slice());
        encoded.extend_from_slice(&word_u256(U256::from(chain_id)));
    } else {
        encoded.extend_from_slice(DOMAIN_TYPEHASH_LEGACY.as_slice());
    }
    encoded.extend_from_slice(&word_address(safe));
    keccak256(&encoded)
}

/// Computes the EIP-712 message hash over the transaction's raw fields.
///
/// Every absent field hashes as its zero value; absence never errors.
pub fn message_hash(version: SafeVersion, tx: &SafeTransaction) -> B256 {
    let typehash =
        if version.uses_base_gas() { SAFE_TX_TYPEHASH } else { SAFE_TX_TYPEHASH_LEGACY };
    let data_hash = keccak256(tx.call_data());
    let nonce = U256::from(tx.nonce.max(0) as u64);

    let mut encoded = Vec::with_capacity(11 * 32);
    encoded.extend_from_slice(typehash.as_slice());
    encoded.extend_from_slice(&word_address(tx.to_address()));
    encoded.extend_from_slice(&word_u256(tx.value_wei()));
    encoded.extend_from_slice(data_hash.as_slice());
    encoded.extend_from_slice(&word_u256(U256::from(u8::from(tx.operation))));
    encoded.extend_from_slice(&word_u256(U256::from(tx.safe_tx_gas)));
    encoded.extend_from_slice(&word_u256(U256::from(tx.base_gas)));
    encoded.extend_from_slice(&word_u256(tx.gas_price_wei()));
    encoded.extend_from_slice(&word_address(tx.gas_token_address()));
    encoded.extend_from_slice(&word_address(tx.refund_receiver_address()));
    encoded.extend_from_slice(&word_u256(nonce));
    keccak256(&encoded)
}

/// Combines the domain and message hashes into the final signable hash:
/// `keccak256(0x19 || 0x01 || domainHash || messageHash)`.
pub fn safe_tx_hash(
    version: SafeVersion,
    chain_id: u64,
    safe: Address,
    tx: &SafeTransaction,
) -> B256 {
    let domain = domain_hash(version, chain_id, safe);
    let message = message_hash(version, tx);
    let mut encoded = Vec::with_capacity(2 + 64);
    encoded.extend_from_slice(&[0x19, 0x01]);
    encoded.extend_from_slice(domain.as_slice());
    encoded.extend_from_slice(message.as_slice());
    keccak256(&encoded)
}

/// Recomputes the transaction hash and compares it (case-insensitively)
/// against the hash reported by the transaction service.
pub fn verify(
    tx: &SafeTransaction,
    safe: Address,
    chain_id: u64,
    version: Option<&str>,
) -> HashVerification {
    let version = SafeVersion::parse_or_current(version);
    let computed = safe_tx_hash(version, chain_id, safe, tx).to_string();
    let reported = tx.safe_tx_hash.clone();
    let verified = computed.eq_ignore_ascii_case(&reported);
    HashVerification {
        performed: true,
        verified,
        computed_hash: Some(computed),
        reported_hash: Some(reported),
    }
}
