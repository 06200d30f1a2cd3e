//! # Wallets
//!
//! A [`Wallet`] is a keypair plus the classic address it controls,
//! reconstructible from its family seed. Ed25519 (`sEd…`) is the default;
//! secp256k1 (`s…`) seeds are accepted so older accounts can still sign.
//!
//! ## Derivation
//!
//! ```text
//! Ed25519
//! entropy (16 bytes)
//!   └─ SHA-512Half ──────────────► secret key
//!                                    └─ 0xED || public key (33 bytes)
//!
//! secp256k1
//! entropy || seq ─ SHA-512Half ──► root scalar (first seq that is valid)
//! root pub || 0 || subseq ───────► intermediate scalar
//!   root + intermediate (mod n) ─► account key
//!                                    └─ compressed public key (33 bytes)
//!
//! public key ─ RIPEMD160(SHA256(..)) ► account id ─ base58check ► r… address
//! ```
//!
//! Key bytes are never logged and `Debug` prints only the address.

use ed25519_dalek::Signer;
use k256::ecdsa::signature::hazmat::PrehashSigner;
use k256::elliptic_curve::sec1::ToEncodedPoint;
use k256::{NonZeroScalar, PublicKey, SecretKey};
use rand::rngs::OsRng;
use rand::RngCore;
use std::fmt;
use thiserror::Error;

use crate::crypto::{
    account_id_hash, decode_seed, encode_ed25519_seed, encode_secp256k1_seed, sha512_half,
    DecodedSeed, EncodingError,
};
use crate::transaction::Address;

/// Leading byte that marks a 33-byte public key as Ed25519.
pub const ED25519_KEY_PREFIX: u8 = 0xED;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum WalletError {
    #[error("invalid seed: {0}")]
    InvalidSeed(#[from] EncodingError),

    #[error("seed does not derive a valid secp256k1 key")]
    KeyDerivation,

    #[error("signing failed: {0}")]
    Signing(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyType {
    Ed25519,
    Secp256k1,
}

enum Keypair {
    Ed25519(ed25519_dalek::SigningKey),
    Secp256k1(k256::ecdsa::SigningKey),
}

pub struct Wallet {
    entropy: [u8; 16],
    keypair: Keypair,
    public_key: [u8; 33],
    address: Address,
}

impl Wallet {
    /// Fresh Ed25519 wallet from OS entropy.
    pub fn generate() -> Self {
        Self::from_entropy(random_entropy())
    }

    /// Fresh wallet of the given key type.
    pub fn generate_with(key_type: KeyType) -> Result<Self, WalletError> {
        match key_type {
            KeyType::Ed25519 => Ok(Self::generate()),
            KeyType::Secp256k1 => Self::from_secp256k1_entropy(random_entropy()),
        }
    }

    /// Reconstructs a wallet from its family seed.
    pub fn from_seed(seed: &str) -> Result<Self, WalletError> {
        match decode_seed(seed.trim())? {
            DecodedSeed::Ed25519(entropy) => Ok(Self::from_entropy(entropy)),
            DecodedSeed::Secp256k1(entropy) => Self::from_secp256k1_entropy(entropy),
        }
    }

    fn from_entropy(entropy: [u8; 16]) -> Self {
        let signing_key = ed25519_dalek::SigningKey::from_bytes(&sha512_half(&entropy));

        let mut public_key = [0u8; 33];
        public_key[0] = ED25519_KEY_PREFIX;
        public_key[1..].copy_from_slice(signing_key.verifying_key().as_bytes());

        Self::assemble(entropy, Keypair::Ed25519(signing_key), public_key)
    }

    fn from_secp256k1_entropy(entropy: [u8; 16]) -> Result<Self, WalletError> {
        let root = valid_scalar(&entropy)?;
        let root_public = compressed_public_key(&root);

        let mut family = Vec::with_capacity(37);
        family.extend_from_slice(&root_public);
        family.extend_from_slice(&0u32.to_be_bytes());
        let intermediate = valid_scalar(&family)?;

        let account = Option::<NonZeroScalar>::from(NonZeroScalar::new(*root + *intermediate))
            .ok_or(WalletError::KeyDerivation)?;
        let public_key = compressed_public_key(&account);

        Ok(Self::assemble(
            entropy,
            Keypair::Secp256k1(k256::ecdsa::SigningKey::from(account)),
            public_key,
        ))
    }

    fn assemble(entropy: [u8; 16], keypair: Keypair, public_key: [u8; 33]) -> Self {
        let address = Address::from_account_id(account_id_hash(&public_key));
        Self {
            entropy,
            keypair,
            public_key,
            address,
        }
    }

    pub fn key_type(&self) -> KeyType {
        match self.keypair {
            Keypair::Ed25519(_) => KeyType::Ed25519,
            Keypair::Secp256k1(_) => KeyType::Secp256k1,
        }
    }

    /// The family seed. This is the account secret; treat it accordingly.
    pub fn seed(&self) -> String {
        match self.key_type() {
            KeyType::Ed25519 => encode_ed25519_seed(&self.entropy),
            KeyType::Secp256k1 => encode_secp256k1_seed(&self.entropy),
        }
    }

    pub fn address(&self) -> &Address {
        &self.address
    }

    pub fn classic_address(&self) -> &str {
        self.address.as_str()
    }

    /// Public key as it appears in `SigningPubKey`.
    pub fn public_key(&self) -> &[u8; 33] {
        &self.public_key
    }

    pub fn public_key_hex(&self) -> String {
        hex::encode_upper(self.public_key)
    }

    /// Signs `message` for `TxnSignature`.
    ///
    /// Ed25519 signs the message itself. secp256k1 signs its SHA-512Half
    /// and returns a DER-encoded, low-S ECDSA signature.
    pub fn sign(&self, message: &[u8]) -> Result<Vec<u8>, WalletError> {
        match &self.keypair {
            Keypair::Ed25519(key) => Ok(key.sign(message).to_bytes().to_vec()),
            Keypair::Secp256k1(key) => {
                let signature: k256::ecdsa::Signature = key
                    .sign_prehash(&sha512_half(message))
                    .map_err(|e| WalletError::Signing(e.to_string()))?;
                Ok(signature.to_der().as_bytes().to_vec())
            }
        }
    }
}

impl fmt::Debug for Wallet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Wallet")
            .field("address", &self.address)
            .field("key_type", &self.key_type())
            .finish_non_exhaustive()
    }
}

fn random_entropy() -> [u8; 16] {
    let mut entropy = [0u8; 16];
    OsRng.fill_bytes(&mut entropy);
    entropy
}

/// SHA-512Half of `prefix || counter` for the first counter that yields a
/// scalar in `[1, n)`.
fn valid_scalar(prefix: &[u8]) -> Result<NonZeroScalar, WalletError> {
    let mut buf = Vec::with_capacity(prefix.len() + 4);
    for counter in 0..=u32::MAX {
        buf.clear();
        buf.extend_from_slice(prefix);
        buf.extend_from_slice(&counter.to_be_bytes());
        if let Ok(key) = SecretKey::from_slice(&sha512_half(&buf)) {
            return Ok(key.to_nonzero_scalar());
        }
    }
    Err(WalletError::KeyDerivation)
}

fn compressed_public_key(scalar: &NonZeroScalar) -> [u8; 33] {
    let point = PublicKey::from_secret_scalar(scalar).to_encoded_point(true);
    let mut out = [0u8; 33];
    out.copy_from_slice(point.as_bytes());
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use ed25519_dalek::{Signature, Verifier, VerifyingKey};
    use k256::ecdsa::signature::hazmat::PrehashVerifier;
    use k256::elliptic_curve::scalar::IsHigh;

    #[test]
    fn generate_produces_classic_address_and_seed() {
        let wallet = Wallet::generate();
        assert!(wallet.classic_address().starts_with('r'));
        assert!(wallet.seed().starts_with("sEd"));
        assert_eq!(wallet.public_key()[0], ED25519_KEY_PREFIX);
        assert_eq!(wallet.key_type(), KeyType::Ed25519);
    }

    #[test]
    fn seed_round_trip_restores_same_account() {
        let wallet = Wallet::generate();
        let restored = Wallet::from_seed(&wallet.seed()).unwrap();
        assert_eq!(restored.address(), wallet.address());
        assert_eq!(restored.public_key(), wallet.public_key());
    }

    #[test]
    fn distinct_wallets() {
        assert_ne!(Wallet::generate().address(), Wallet::generate().address());
    }

    #[test]
    fn ed25519_seed_derives_known_account() {
        let wallet = Wallet::from_seed("sEdSKaCy2JT7JaM7v95H9SxkhP9wS2r").unwrap();
        assert_eq!(
            wallet.public_key_hex(),
            "ED01FA53FA5A7E77798F882ECE20B1ABC00BB358A9E55A202D0D0676BD0CE37A63"
        );
        assert_eq!(wallet.classic_address(), "rLUEXYuLiQptky37CqLcm9USQpPiz5rkpD");
    }

    #[test]
    fn secp256k1_seed_derives_known_account() {
        let wallet = Wallet::from_seed("snoPBrXtMeMyMHUVTgbuqAfg1SUTb").unwrap();
        assert_eq!(wallet.key_type(), KeyType::Secp256k1);
        assert_eq!(
            wallet.public_key_hex(),
            "0330E7FC9D56BB25D6893BA3F317AE5BCF33B3291BD63DB32654A313222F7FD020"
        );
        assert_eq!(wallet.classic_address(), "rHb9CJAWyB4rj91VRWn96DkukG4bwdtyTh");
        assert_eq!(wallet.seed(), "snoPBrXtMeMyMHUVTgbuqAfg1SUTb");
    }

    #[test]
    fn ed25519_signature_verifies_against_public_key() {
        let wallet = Wallet::generate();
        let sig: [u8; 64] = wallet.sign(b"payload").unwrap().try_into().unwrap();
        let mut raw = [0u8; 32];
        raw.copy_from_slice(&wallet.public_key()[1..]);
        let vk = VerifyingKey::from_bytes(&raw).unwrap();
        assert!(vk.verify(b"payload", &Signature::from_bytes(&sig)).is_ok());
    }

    #[test]
    fn secp256k1_signature_is_low_s_der_over_half_hash() {
        let wallet = Wallet::generate_with(KeyType::Secp256k1).unwrap();
        assert!(matches!(wallet.public_key()[0], 0x02 | 0x03));

        let der = wallet.sign(b"payload").unwrap();
        assert_eq!(der[0], 0x30);
        let sig = k256::ecdsa::Signature::from_der(&der).unwrap();
        assert!(!bool::from(sig.s().is_high()));

        let vk = k256::ecdsa::VerifyingKey::from_sec1_bytes(wallet.public_key()).unwrap();
        assert!(vk.verify_prehash(&sha512_half(b"payload"), &sig).is_ok());

        let restored = Wallet::from_seed(&wallet.seed()).unwrap();
        assert_eq!(restored.address(), wallet.address());
    }

    #[test]
    fn rejects_garbage_seed() {
        assert!(matches!(
            Wallet::from_seed("not-a-seed"),
            Err(WalletError::InvalidSeed(_))
        ));
    }

    #[test]
    fn debug_hides_key_material() {
        let wallet = Wallet::generate();
        let out = format!("{wallet:?}");
        assert!(out.contains(wallet.classic_address()));
        assert!(!out.contains(&wallet.seed()));
    }
}
