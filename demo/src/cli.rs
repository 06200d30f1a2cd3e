//! # CLI Interface
//!
//! Defines the command-line argument structure for `xrpl-token-demo` using
//! `clap` derive. Ledger settings are global flags backed by environment
//! variables, so a `.env` file configures every subcommand at once.

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;
use std::time::Duration;

use xrpl_token_protocol::config::{
    FaucetNetwork, LedgerConfig, DEFAULT_APP_PORT, DEFAULT_NODE_URL, DEFAULT_SUBMIT_TIMEOUT,
};
use xrpl_token_protocol::transaction::Address;

use crate::logging::LogFormat;

/// Issue and move tokens on the XRP Ledger test networks.
///
/// Creates and funds accounts, configures issuer and distributor settings,
/// manages trust lines, transfers tokens, and serves the same operations
/// over HTTP with a small web front-end.
#[derive(Parser, Debug)]
#[command(
    name = "xrpl-token-demo",
    about = "XRPL token issuance demo",
    version,
    propagate_version = true,
    arg_required_else_help = true
)]
pub struct XrplDemoCli {
    /// JSON-RPC endpoint of the rippled server.
    #[arg(long, global = true, env = "XRPL_NODE_URL", default_value = DEFAULT_NODE_URL)]
    pub node_url: String,

    /// Faucet network used by `fund-devnet-account` (devnet or testnet).
    #[arg(long, global = true, env = "XRPL_FAUCET", default_value = "devnet")]
    pub faucet: FaucetNetwork,

    /// How long to wait for a submitted transaction to validate.
    #[arg(
        long,
        global = true,
        env = "XRPL_SUBMIT_TIMEOUT_SECS",
        default_value_t = DEFAULT_SUBMIT_TIMEOUT.as_secs()
    )]
    pub submit_timeout_secs: u64,

    /// Log output format.
    #[arg(long, global = true, env = "LOG_FORMAT", value_enum, default_value_t = LogFormat::Pretty)]
    pub log_format: LogFormat,

    #[command(subcommand)]
    pub command: Commands,
}

impl XrplDemoCli {
    pub fn ledger_config(&self) -> LedgerConfig {
        LedgerConfig {
            node_url: self.node_url.clone(),
            faucet: self.faucet,
            submit_timeout: Duration::from_secs(self.submit_timeout_secs),
        }
    }
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Create a new account locally and print its address and secret.
    CreateAccount,

    /// Fund an account from the test network faucet.
    FundDevnetAccount {
        /// Classic address to fund.
        address: Address,
    },

    /// Configure an account as a token issuer (default ripple, example.com domain).
    ConfigIssuer {
        /// Issuer account secret (sEd…).
        secret: String,
    },

    /// Configure an account as a token distributor (require auth, example.com domain).
    ConfigDistributor {
        /// Distributor account secret (sEd…).
        secret: String,
    },

    /// Create a trust line from the account to an issuer.
    CreateTrustline {
        /// Secret of the account extending trust.
        secret: String,
        /// Issuer address.
        issuer: Address,
        /// Token code: 3 characters or 40 hex digits.
        token: String,
        /// Trust limit.
        limit: String,
    },

    /// Issue or transfer tokens.
    TransferToken(TransferArgs),

    /// Freeze the trust line to a counterparty.
    FreezeTrustline(FreezeArgs),

    /// Lift the freeze on the trust line to a counterparty.
    UnfreezeTrustline(FreezeArgs),

    /// Print an account's XRP balance.
    GetBalance {
        address: Address,
    },

    /// List the tokens an account holds.
    GetTokens {
        address: Address,
    },

    /// Print every trust line of an account.
    GetTrustlines {
        address: Address,
    },

    /// Serve the HTTP API and web front-end.
    Serve(ServeArgs),
}

#[derive(Args, Debug)]
pub struct TransferArgs {
    /// Sender secret.
    pub secret: String,
    /// Receiver address.
    pub receiver: Address,
    /// Issuer address.
    pub issuer: Address,
    /// Token code.
    pub token: String,
    /// Amount the receiver should get.
    pub amount: String,

    /// Issuer transfer rate. When set, SendMax is raised to cover the fee.
    #[arg(long)]
    pub transfer_rate: Option<u32>,
}

#[derive(Args, Debug)]
pub struct FreezeArgs {
    /// Secret of the account changing its side of the line.
    pub secret: String,
    /// The other end of the trust line.
    pub counterparty: Address,
    /// Token code.
    pub token: String,
}

#[derive(Args, Debug)]
pub struct ServeArgs {
    /// Port for the HTTP API.
    #[arg(long, env = "APP_PORT", default_value_t = DEFAULT_APP_PORT)]
    pub port: u16,

    /// Directory with the web front-end.
    #[arg(long, env = "STATIC_DIR", default_value = "demo/static")]
    pub static_dir: PathBuf,
}
