//! # Hashing Utilities
//!
//! The three digests the ledger uses, and nothing else:
//!
//! - **SHA-512Half**: first 32 bytes of SHA-512. Transaction ids and
//!   Ed25519 key derivation from seed entropy.
//! - **SHA-256**: inner half of the account-id hash.
//! - **RIPEMD-160**: outer half of the account-id hash.
//!
//! Base58check checksums (double SHA-256) are handled by `bs58` itself.

use ripemd::Ripemd160;
use sha2::{Digest, Sha256, Sha512};

/// Compute the SHA-256 hash of the input data.
pub fn sha256(data: &[u8]) -> [u8; 32] {
    let mut hasher = Sha256::new();
    hasher.update(data);
    hasher.finalize().into()
}

/// First half of a SHA-512 digest.
///
/// ```
/// use xrpl_token_protocol::crypto::sha512_half;
///
/// let digest = sha512_half(b"ledger");
/// assert_eq!(digest.len(), 32);
/// ```
pub fn sha512_half(data: &[u8]) -> [u8; 32] {
    let mut hasher = Sha512::new();
    hasher.update(data);
    let full = hasher.finalize();
    let mut out = [0u8; 32];
    out.copy_from_slice(&full[..32]);
    out
}

/// SHA-512Half over `prefix || data`. Used for hash prefixes such as `TXN\0`.
pub fn prefixed_sha512_half(prefix: [u8; 4], data: &[u8]) -> [u8; 32] {
    let mut hasher = Sha512::new();
    hasher.update(prefix);
    hasher.update(data);
    let full = hasher.finalize();
    let mut out = [0u8; 32];
    out.copy_from_slice(&full[..32]);
    out
}

/// `RIPEMD160(SHA256(public_key))`, the 20-byte account id.
pub fn account_id_hash(public_key: &[u8]) -> [u8; 20] {
    let inner = sha256(public_key);
    let mut hasher = Ripemd160::new();
    hasher.update(inner);
    hasher.finalize().into()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sha256_known_vector() {
        assert_eq!(
            hex::encode(sha256(b"abc")),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }

    #[test]
    fn test_sha512_half_is_prefix_of_sha512() {
        // SHA-512("abc") begins with ddaf35a193617aba...
        let half = sha512_half(b"abc");
        assert_eq!(hex::encode(&half[..8]), "ddaf35a193617aba");
    }

    #[test]
    fn test_prefixed_hash_matches_manual_concat() {
        let prefix = *b"TXN\0";
        let mut joined = prefix.to_vec();
        joined.extend_from_slice(b"payload");
        assert_eq!(prefixed_sha512_half(prefix, b"payload"), sha512_half(&joined));
    }

    #[test]
    fn test_account_id_hash_is_deterministic() {
        let a = account_id_hash(&[0xED; 33]);
        let b = account_id_hash(&[0xED; 33]);
        let c = account_id_hash(&[0x02; 33]);
        assert_eq!(a, b);
        assert_ne!(a, c);
    }
}
