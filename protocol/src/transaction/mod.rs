//! # Transactions
//!
//! Construction, canonical serialization, and signing of the three
//! transaction types the token workflows need: `AccountSet`, `TrustSet`,
//! and `Payment`.
//!
//! ```text
//! types.rs    Addresses, currencies, amounts, flag constants
//! builder.rs  Unsigned transaction model
//! codec.rs    Canonical binary encoding and transaction ids
//! signing.rs  Ed25519 signing into a submittable blob
//! ```
//!
//! Lifecycle: build, autofill (ledger client), sign, submit, wait for
//! validation.

pub mod builder;
pub mod codec;
pub mod signing;
pub mod types;

pub use builder::{AccountSetFields, PaymentFields, Transaction, TransactionKind, TrustSetFields};
pub use codec::CodecError;
pub use signing::{sign_transaction, SignedTransaction, SigningError};
pub use types::{
    flags, AccountSetFlag, Address, Amount, Currency, IouValue, IssuedAmount, TransactionType,
    TypeError,
};
