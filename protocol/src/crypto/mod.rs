//! # Cryptographic Primitives
//!
//! Hashes and base58check encodings the ledger expects. Signing itself is
//! Ed25519 via `ed25519-dalek` or ECDSA over secp256k1 via `k256`, both
//! wrapped by [`crate::wallet::Wallet`].
//!
//! Nothing here is novel: every function is a thin, typed wrapper around an
//! audited implementation, arranged the way the ledger's formats require.

pub mod encoding;
pub mod hash;

pub use encoding::{
    decode_account_id, decode_seed, encode_account_id, encode_ed25519_seed,
    encode_secp256k1_seed, DecodedSeed, EncodingError,
};
pub use hash::{account_id_hash, prefixed_sha512_half, sha256, sha512_half};
