//! Wallet metadata returned by the transaction service's info probe.

use serde::{Deserialize, Serialize};

/// On-chain wallet metadata from `GET /api/v1/safes/{address}`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SafeInfo {
    /// Checksummed wallet address.
    pub address: String,
    /// Current on-chain nonce.
    #[serde(default)]
    pub nonce: i64,
    /// Confirmation threshold.
    #[serde(default)]
    pub threshold: u32,
    /// Owner addresses.
    #[serde(default)]
    pub owners: Vec<String>,
    /// Implementation (mastercopy) address behind the proxy.
    #[serde(default)]
    pub master_copy: Option<String>,
    /// Contract version string, e.g. `"1.3.0"` or `"1.3.0+L2"`.
    #[serde(default)]
    pub version: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deserializes_probe_response() {
        let info: SafeInfo = serde_json::from_str(
            r#"{
                "address": "0x5afE3855358E112B5647B952709E6165e1c1eEEe",
                "nonce": 12,
                "threshold": 2,
                "owners": ["0x1", "0x2", "0x3"],
                "masterCopy": "0xd9Db270c1B5E3Bd161E8c8503c55cEABeE709552",
                "version": "1.3.0"
            }"#,
        )
        .unwrap();
        assert_eq!(info.threshold, 2);
        assert_eq!(info.owners.len(), 3);
        assert_eq!(info.version.as_deref(), Some("1.3.0"));
    }
}
