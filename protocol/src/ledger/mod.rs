//! # Ledger Client Adapter
//!
//! The business layer talks to the ledger only through [`LedgerClient`]; how
//! the bytes travel is the implementation's concern.
//!
//! ```text
//! rpc.rs     JSON-RPC over HTTP(S) against a rippled node
//! faucet.rs  Test-network funding
//! memory.rs  In-process ledger double (feature `testing`)
//! ```
//!
//! A [`LedgerConnector`] hands out one client per unit of work (a CLI
//! command, an HTTP request). Clients are not shared across requests.

pub mod faucet;
#[cfg(feature = "testing")]
pub mod memory;
pub mod rpc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::transaction::{Address, SignedTransaction, Transaction};

pub use faucet::{Faucet, FaucetError, HttpFaucet};
pub use rpc::{JsonRpcClient, RpcConnector};

/// Result code of a successfully applied transaction.
pub const SUCCESS_RESULT: &str = "tesSUCCESS";

#[derive(Debug, Error)]
pub enum LedgerError {
    #[error("cannot reach ledger node: {0}")]
    Transport(String),

    #[error("{method} failed: {error} {message}")]
    Rpc {
        method: String,
        /// Node error token, e.g. `actNotFound`.
        error: String,
        message: String,
    },

    #[error("malformed {method} response: {detail}")]
    Malformed { method: String, detail: String },

    #[error("transaction rejected with {result}: {message}")]
    Rejected { result: String, message: String },
}

impl LedgerError {
    pub(crate) fn malformed(method: &str, detail: impl Into<String>) -> Self {
        Self::Malformed {
            method: method.to_string(),
            detail: detail.into(),
        }
    }
}

/// The parts of an account root the services use.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AccountInfo {
    pub balance_drops: u64,
    pub sequence: u32,
}

/// One trust line as seen from the queried account.
///
/// Field names match both the node's `account_lines` output and the JSON
/// the HTTP API returns. `*_peer` fields are the counterparty's side.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrustLine {
    /// Counterparty address.
    pub account: String,
    /// Positive when the queried account holds the token.
    pub balance: String,
    pub currency: String,
    pub limit: String,
    pub limit_peer: String,
    pub quality_in: u32,
    pub quality_out: u32,
    pub no_ripple: bool,
    pub no_ripple_peer: bool,
    pub authorized: bool,
    pub peer_authorized: bool,
    pub freeze: bool,
    pub freeze_peer: bool,
}

/// All trust lines of one account.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AccountLines {
    pub account: String,
    pub lines: Vec<TrustLine>,
    pub validated: bool,
}

/// Final state of a submitted transaction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubmitOutcome {
    pub hash: String,
    pub validated: bool,
    /// Engine result, e.g. `tesSUCCESS`. Empty when never validated.
    pub result: String,
}

impl SubmitOutcome {
    pub fn succeeded(&self) -> bool {
        self.result == SUCCESS_RESULT
    }
}

#[async_trait]
pub trait LedgerClient: Send + Sync {
    /// Fills `Sequence`, `Fee`, `LastLedgerSequence`, and `NetworkID` where
    /// the caller left them unset.
    async fn autofill(&self, tx: &mut Transaction) -> Result<(), LedgerError>;

    /// Submits a signed blob and blocks until it is validated, expires, or
    /// the client's timeout passes.
    async fn submit_and_wait(&self, signed: &SignedTransaction)
        -> Result<SubmitOutcome, LedgerError>;

    async fn account_info(&self, address: &Address) -> Result<AccountInfo, LedgerError>;

    async fn account_lines(&self, address: &Address) -> Result<AccountLines, LedgerError>;
}

#[async_trait]
pub trait LedgerConnector: Send + Sync {
    /// Opens a fresh client session.
    async fn connect(&self) -> Result<Box<dyn LedgerClient>, LedgerError>;
}
