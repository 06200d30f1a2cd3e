//! Base58check encodings for addresses and family seeds.
//!
//! The ledger uses the Bitcoin base58check construction (version prefix,
//! payload, four-byte double-SHA-256 checksum) with its own alphabet, which
//! starts with `r`, hence every classic address starting with `r`.

use thiserror::Error;

/// Version byte of a classic address.
pub const ACCOUNT_ID_PREFIX: u8 = 0x00;

/// Version bytes of an Ed25519 family seed. Encodes to a leading `sEd`.
pub const ED25519_SEED_PREFIX: [u8; 3] = [0x01, 0xE1, 0x4B];

/// Version byte of a secp256k1 family seed. Encodes to a leading `s`.
pub const SECP256K1_SEED_PREFIX: u8 = 0x21;

/// Seed entropy length.
pub const SEED_ENTROPY_LENGTH: usize = 16;

/// Account id length.
pub const ACCOUNT_ID_LENGTH: usize = 20;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum EncodingError {
    #[error("not valid base58check: {0}")]
    Base58(String),

    #[error("unexpected payload length {actual} (expected {expected})")]
    Length { expected: usize, actual: usize },

    #[error("unexpected version prefix")]
    Prefix,
}

/// A decoded family seed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DecodedSeed {
    Ed25519([u8; SEED_ENTROPY_LENGTH]),
    Secp256k1([u8; SEED_ENTROPY_LENGTH]),
}

fn encode_check(payload: &[u8]) -> String {
    bs58::encode(payload)
        .with_alphabet(bs58::Alphabet::RIPPLE)
        .with_check()
        .into_string()
}

fn decode_check(s: &str) -> Result<Vec<u8>, EncodingError> {
    bs58::decode(s)
        .with_alphabet(bs58::Alphabet::RIPPLE)
        .with_check(None)
        .into_vec()
        .map_err(|e| EncodingError::Base58(e.to_string()))
}

/// Encodes a 20-byte account id as a classic `r…` address.
pub fn encode_account_id(account_id: &[u8; ACCOUNT_ID_LENGTH]) -> String {
    let mut payload = Vec::with_capacity(1 + ACCOUNT_ID_LENGTH);
    payload.push(ACCOUNT_ID_PREFIX);
    payload.extend_from_slice(account_id);
    encode_check(&payload)
}

/// Decodes a classic address back to its account id.
pub fn decode_account_id(address: &str) -> Result<[u8; ACCOUNT_ID_LENGTH], EncodingError> {
    let bytes = decode_check(address)?;
    if bytes.len() != 1 + ACCOUNT_ID_LENGTH {
        return Err(EncodingError::Length {
            expected: 1 + ACCOUNT_ID_LENGTH,
            actual: bytes.len(),
        });
    }
    if bytes[0] != ACCOUNT_ID_PREFIX {
        return Err(EncodingError::Prefix);
    }
    let mut id = [0u8; ACCOUNT_ID_LENGTH];
    id.copy_from_slice(&bytes[1..]);
    Ok(id)
}

/// Encodes Ed25519 seed entropy as an `sEd…` family seed.
pub fn encode_ed25519_seed(entropy: &[u8; SEED_ENTROPY_LENGTH]) -> String {
    let mut payload = Vec::with_capacity(ED25519_SEED_PREFIX.len() + SEED_ENTROPY_LENGTH);
    payload.extend_from_slice(&ED25519_SEED_PREFIX);
    payload.extend_from_slice(entropy);
    encode_check(&payload)
}

/// Encodes secp256k1 seed entropy as an `s…` family seed.
pub fn encode_secp256k1_seed(entropy: &[u8; SEED_ENTROPY_LENGTH]) -> String {
    let mut payload = Vec::with_capacity(1 + SEED_ENTROPY_LENGTH);
    payload.push(SECP256K1_SEED_PREFIX);
    payload.extend_from_slice(entropy);
    encode_check(&payload)
}

/// Decodes a family seed of either key type.
pub fn decode_seed(seed: &str) -> Result<DecodedSeed, EncodingError> {
    let bytes = decode_check(seed)?;
    let mut entropy = [0u8; SEED_ENTROPY_LENGTH];

    if bytes.len() == ED25519_SEED_PREFIX.len() + SEED_ENTROPY_LENGTH {
        if bytes[..3] != ED25519_SEED_PREFIX {
            return Err(EncodingError::Prefix);
        }
        entropy.copy_from_slice(&bytes[3..]);
        return Ok(DecodedSeed::Ed25519(entropy));
    }

    if bytes.len() == 1 + SEED_ENTROPY_LENGTH {
        if bytes[0] != SECP256K1_SEED_PREFIX {
            return Err(EncodingError::Prefix);
        }
        entropy.copy_from_slice(&bytes[1..]);
        return Ok(DecodedSeed::Secp256k1(entropy));
    }

    Err(EncodingError::Length {
        expected: ED25519_SEED_PREFIX.len() + SEED_ENTROPY_LENGTH,
        actual: bytes.len(),
    })
}
