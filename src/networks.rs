//! Static registry of supported networks and their Safe transaction-service
//! endpoints.

/// A single supported network: chain id, upstream transaction-service base
/// URL, block-explorer base URL and the short-name prefix used by the Safe
/// web app for deep links.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Network {
    /// Canonical lowercase network name, e.g. `"ethereum"`.
    pub name: &'static str,
    /// EIP-155 chain id.
    pub chain_id: u64,
    /// Base URL of the Safe transaction service for this network.
    pub service_base: &'static str,
    /// Base URL of the dominant block explorer, used for transaction links.
    pub explorer_base: &'static str,
    /// Short-name prefix used in Safe app URLs (`eth:0x...`).
    pub short_name: &'static str,
}

/// All networks the pipeline knows how to poll.
static NETWORKS: &[Network] = &[
    Network {
        name: "ethereum",
        chain_id: 1,
        service_base: "https://safe-transaction-mainnet.safe.global",
        explorer_base: "https://etherscan.io",
        short_name: "eth",
    },
    Network {
        name: "sepolia",
        chain_id: 11155111,
        service_base: "https://safe-transaction-sepolia.safe.global",
        explorer_base: "https://sepolia.etherscan.io",
        short_name: "sep",
    },
    Network {
        name: "polygon",
        chain_id: 137,
        service_base: "https://safe-transaction-polygon.safe.global",
        explorer_base: "https://polygonscan.com",
        short_name: "matic",
    },
    Network {
        name: "bsc",
        chain_id: 56,
        service_base: "https://safe-transaction-bsc.safe.global",
        explorer_base: "https://bscscan.com",
        short_name: "bnb",
    },
    Network {
        name: "arbitrum",
        chain_id: 42161,
        service_base: "https://safe-transaction-arbitrum.safe.global",
        explorer_base: "https://arbiscan.io",
        short_name: "arb1",
    },
    Network {
        name: "optimism",
        chain_id: 10,
        service_base: "https://safe-transaction-optimism.safe.global",
        explorer_base: "https://optimistic.etherscan.io",
        short_name: "oeth",
    },
    Network {
        name: "base",
        chain_id: 8453,
        service_base: "https://safe-transaction-base.safe.global",
        explorer_base: "https://basescan.org",
        short_name: "base",
    },
    Network {
        name: "gnosis",
        chain_id: 100,
        service_base: "https://safe-transaction-gnosis-chain.safe.global",
        explorer_base: "https://gnosisscan.io",
        short_name: "gno",
    },
    Network {
        name: "avalanche",
        chain_id: 43114,
        service_base: "https://safe-transaction-avalanche.safe.global",
        explorer_base: "https://snowtrace.io",
        short_name: "avax",
    },
];

/// Looks up a network by its canonical name (case-insensitive).
pub fn by_name(name: &str) -> Option<&'static Network> {
    NETWORKS.iter().find(|n| n.name.eq_ignore_ascii_case(name))
}

/// Returns every supported network.
pub fn all() -> &'static [Network] {
    NETWORKS
}

impl Network {
    /// Safe web-app deep link for a transaction on this network.
    pub fn safe_app_tx_url(&self, safe_address: &str, safe_tx_hash: &str) -> String {
        format!(
            "https://app.safe.global/transactions/tx?safe={}:{}&id=multisig_{}_{}",
            self.short_name, safe_address, safe_address, safe_tx_hash
        )
    }

    /// Explorer link for an executed transaction hash.
    pub fn explorer_tx_url(&self, tx_hash: &str) -> String {
        format!("{}/tx/{}", self.explorer_base, tx_hash)
    }
}
