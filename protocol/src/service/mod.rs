//! # Services
//!
//! Business logic between the presentation layer and the ledger adapter.
//! Each service owns one ledger session; build a fresh one per request.

pub mod error;
pub mod token;
pub mod wallet;

pub use error::ServiceError;
pub use token::{
    build_account_set, compute_send_max, encode_domain, ledger_transfer_rate, AccountSettings,
    FlagMutation, SettingFlag, TokenBalance, TokenService, TransferTokenOptions,
    TrustLineOptions, TrustLinesResponse, SETTING_FLAGS,
};
pub use wallet::{format_drops, WalletService};
