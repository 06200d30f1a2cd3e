//! # Ledger Configuration & Constants
//!
//! Every magic number the demo needs to talk to the XRP Ledger lives here,
//! next to [`LedgerConfig`], the explicit configuration value handed to the
//! connector. Nothing in this crate reads the environment; the binary does
//! that and builds a `LedgerConfig` from the result.

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

// ---------------------------------------------------------------------------
// Endpoints
// ---------------------------------------------------------------------------

/// Public Devnet JSON-RPC endpoint. Reset periodically, funded by faucet.
pub const DEFAULT_NODE_URL: &str = "https://s.devnet.rippletest.net:51234";

/// Devnet faucet. Accepts `{"destination": "<address>"}`.
pub const DEVNET_FAUCET_URL: &str = "https://faucet.devnet.rippletest.net/accounts";

/// Testnet faucet. Same request shape as Devnet.
pub const TESTNET_FAUCET_URL: &str = "https://faucet.altnet.rippletest.net/accounts";

/// Default listening port for the HTTP API.
pub const DEFAULT_APP_PORT: u16 = 8080;

// ---------------------------------------------------------------------------
// Units
// ---------------------------------------------------------------------------

/// Drops per XRP. The ledger stores native balances as integer drops.
pub const DROPS_PER_XRP: u64 = 1_000_000;

/// Native currency symbol, used when rendering balances.
pub const NATIVE_CURRENCY: &str = "XRP";

/// Transfer rate value that means "no fee". Rates are expressed as
/// `1_000_000_000 + fee`, so 1_005_000_000 charges 0.5%.
pub const TRANSFER_RATE_BASE: u32 = 1_000_000_000;

/// Highest transfer rate the ledger accepts (a 100% fee).
pub const MAX_TRANSFER_RATE: u32 = 2_000_000_000;

/// Valid non-zero tick sizes.
pub const TICK_SIZE_RANGE: std::ops::RangeInclusive<u8> = 3..=15;

/// Maximum domain length in bytes, after hex decoding.
pub const MAX_DOMAIN_BYTES: usize = 256;

/// Domain used by the default issuer/distributor settings: `example.com`.
pub const DEFAULT_DOMAIN_HEX: &str = "6578616D706C652E636F6D";

// ---------------------------------------------------------------------------
// Submission
// ---------------------------------------------------------------------------

/// Ledgers a transaction may wait before it expires.
pub const LAST_LEDGER_OFFSET: u32 = 20;

/// Upper bound on the autofilled fee, in drops (2 XRP).
pub const MAX_FEE_DROPS: u64 = 2_000_000;

/// How often `submit_and_wait` asks the server about a pending transaction.
pub const SUBMIT_POLL_INTERVAL: Duration = Duration::from_secs(1);

/// Default ceiling on how long `submit_and_wait` blocks.
pub const DEFAULT_SUBMIT_TIMEOUT: Duration = Duration::from_secs(60);

/// Per-request HTTP timeout for JSON-RPC and faucet calls.
pub const HTTP_REQUEST_TIMEOUT: Duration = Duration::from_secs(20);

/// Networks with an id at or below this value must not carry `NetworkID`.
pub const LEGACY_NETWORK_ID_LIMIT: u32 = 1024;

// ---------------------------------------------------------------------------
// LedgerConfig
// ---------------------------------------------------------------------------

/// Which faucet funds new accounts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FaucetNetwork {
    #[default]
    Devnet,
    Testnet,
}

impl FaucetNetwork {
    /// Faucet endpoint for this network.
    pub fn url(self) -> &'static str {
        match self {
            FaucetNetwork::Devnet => DEVNET_FAUCET_URL,
            FaucetNetwork::Testnet => TESTNET_FAUCET_URL,
        }
    }
}

impl fmt::Display for FaucetNetwork {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FaucetNetwork::Devnet => f.write_str("devnet"),
            FaucetNetwork::Testnet => f.write_str("testnet"),
        }
    }
}

impl FromStr for FaucetNetwork {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "devnet" => Ok(FaucetNetwork::Devnet),
            "testnet" | "altnet" => Ok(FaucetNetwork::Testnet),
            other => Err(format!("unknown faucet network: {other}")),
        }
    }
}

/// Connection settings for one ledger session.
///
/// Built once by the binary and cloned into every request-scoped client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LedgerConfig {
    /// JSON-RPC endpoint of a rippled server.
    pub node_url: String,
    /// Faucet used by `fund-devnet-account` / `POST /api/fund-account`.
    pub faucet: FaucetNetwork,
    /// Ceiling on `submit_and_wait`.
    pub submit_timeout: Duration,
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            node_url: DEFAULT_NODE_URL.to_string(),
            faucet: FaucetNetwork::Devnet,
            submit_timeout: DEFAULT_SUBMIT_TIMEOUT,
        }
    }
}

impl LedgerConfig {
    /// Config pointing at `node_url` with every other field defaulted.
    pub fn with_node_url(node_url: impl Into<String>) -> Self {
        Self {
            node_url: node_url.into(),
            ..Self::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_targets_devnet() {
        let cfg = LedgerConfig::default();
        assert_eq!(cfg.node_url, DEFAULT_NODE_URL);
        assert_eq!(cfg.faucet, FaucetNetwork::Devnet);
        assert_eq!(cfg.faucet.url(), DEVNET_FAUCET_URL);
    }

    #[test]
    fn test_faucet_network_parsing() {
        assert_eq!("Testnet".parse::<FaucetNetwork>(), Ok(FaucetNetwork::Testnet));
        assert_eq!("altnet".parse::<FaucetNetwork>(), Ok(FaucetNetwork::Testnet));
        assert_eq!("devnet".parse::<FaucetNetwork>(), Ok(FaucetNetwork::Devnet));
        assert!("mainnet".parse::<FaucetNetwork>().is_err());
    }

    #[test]
    fn test_transfer_rate_bounds_sanity() {
        assert!(TRANSFER_RATE_BASE < MAX_TRANSFER_RATE);
        assert_eq!(MAX_TRANSFER_RATE, 2 * TRANSFER_RATE_BASE);
    }

    #[test]
    fn test_default_domain_is_example_com() {
        let decoded = hex::decode(DEFAULT_DOMAIN_HEX).unwrap();
        assert_eq!(decoded, b"example.com");
    }
}
