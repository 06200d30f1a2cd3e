// Copyright (c) 2026 ALAS Technology. MIT License.
// See LICENSE for details.

//! # XRPL Token Protocol: Core Library
//!
//! Everything needed to issue and move a token on the XRP Ledger from a
//! small program: local wallets, a canonical transaction codec with Ed25519
//! signing, a JSON-RPC ledger client, and the services that turn intents
//! ("configure this issuer", "open a trust line", "pay 2000 FOO") into
//! validated transactions.
//!
//! ## Architecture
//!
//! - **config**: Network endpoints and ledger constants.
//! - **crypto**: Hashes and base58check encodings the ledger expects.
//! - **wallet**: Ed25519 keypairs, family seeds, classic addresses.
//! - **transaction**: Transaction model, binary codec, signing.
//! - **ledger**: The client adapter: JSON-RPC, faucet, in-memory double.
//! - **service**: Token and Wallet services.
//!
//! ## Design Philosophy
//!
//! 1. The services never name a transport; they hold a `LedgerClient`.
//! 2. Amounts are strings or integers end to end. No floats near money.
//! 3. A transaction is only "done" once a validated ledger says `tesSUCCESS`.

pub mod config;
pub mod crypto;
pub mod ledger;
pub mod service;
pub mod transaction;
pub mod wallet;
