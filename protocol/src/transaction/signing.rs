//! Transaction signing.
//!
//! Signing is a separate step from building because `Sequence`, `Fee`, and
//! `LastLedgerSequence` come from the ledger. The signer serializes the
//! transaction without `TxnSignature`, signs `STX\0 || bytes` with the
//! wallet's key, then serializes again with the signature to produce the
//! submittable blob.

use thiserror::Error;

use super::builder::Transaction;
use super::codec::{encode_transaction, signing_payload, transaction_hash, CodecError};
use crate::wallet::{Wallet, WalletError};

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SigningError {
    #[error("transaction account {tx_account} does not match signing wallet {wallet}")]
    AccountMismatch { tx_account: String, wallet: String },

    #[error("transaction must be autofilled before signing")]
    NotAutofilled,

    #[error(transparent)]
    Codec(#[from] CodecError),

    #[error(transparent)]
    Wallet(#[from] WalletError),
}

/// A signed transaction ready to submit.
#[derive(Debug, Clone)]
pub struct SignedTransaction {
    pub transaction: Transaction,
    /// Hex-encoded signed blob.
    pub tx_blob: String,
    /// Transaction id, uppercase hex.
    pub hash: String,
}

pub fn sign_transaction(
    wallet: &Wallet,
    tx: &Transaction,
) -> Result<SignedTransaction, SigningError> {
    if tx.account != *wallet.address() {
        return Err(SigningError::AccountMismatch {
            tx_account: tx.account.to_string(),
            wallet: wallet.address().to_string(),
        });
    }
    if !tx.is_autofilled() {
        return Err(SigningError::NotAutofilled);
    }

    let payload = signing_payload(tx, wallet.public_key())?;
    let signature = wallet.sign(&payload)?;
    let blob = encode_transaction(tx, wallet.public_key(), Some(&signature))?;

    Ok(SignedTransaction {
        transaction: tx.clone(),
        hash: transaction_hash(&blob),
        tx_blob: hex::encode_upper(blob),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transaction::builder::AccountSetFields;
    use crate::transaction::types::{Address, Amount, Currency, IssuedAmount};
    use crate::wallet::KeyType;

    fn filled(mut tx: Transaction) -> Transaction {
        tx.fee = Some(10);
        tx.sequence = Some(1);
        tx.last_ledger_sequence = Some(50);
        tx
    }

    #[test]
    fn sign_produces_blob_and_hash() {
        let wallet = Wallet::generate();
        let dest = Address::from_account_id([9; 20]);
        let tx = filled(Transaction::payment(
            wallet.address().clone(),
            dest,
            Amount::Drops(1_000_000),
            None,
        ));
        let signed = sign_transaction(&wallet, &tx).unwrap();
        assert_eq!(signed.hash.len(), 64);
        assert!(signed.tx_blob.starts_with("120000"));
        assert!(signed.tx_blob.contains(&wallet.public_key_hex()));
    }

    #[test]
    fn signing_is_deterministic() {
        let wallet = Wallet::generate();
        let tx = filled(Transaction::account_set(
            wallet.address().clone(),
            AccountSetFields::default(),
        ));
        let a = sign_transaction(&wallet, &tx).unwrap();
        let b = sign_transaction(&wallet, &tx).unwrap();
        assert_eq!(a.tx_blob, b.tx_blob);
        assert_eq!(a.hash, b.hash);
    }

    #[test]
    fn trust_set_known_answer() {
        let wallet = Wallet::from_seed("sEdSKaCy2JT7JaM7v95H9SxkhP9wS2r").unwrap();
        let issuer: Address = "rHb9CJAWyB4rj91VRWn96DkukG4bwdtyTh".parse().unwrap();
        let limit = IssuedAmount::new(Currency::parse("FOO").unwrap(), issuer, "1000").unwrap();
        let mut tx = Transaction::trust_set(wallet.address().clone(), limit);
        tx.fee = Some(12);
        tx.sequence = Some(7);
        tx.last_ledger_sequence = Some(120);

        let signed = sign_transaction(&wallet, &tx).unwrap();
        assert_eq!(
            signed.tx_blob,
            concat!(
                "12001422000000002400000007201B0000007863D5438D7EA4C680000000000000",
                "00000000000000464F4F0000000000B5F762798A53D543A014CAF8B297CFF8F2F9",
                "37E868400000000000000C7321ED01FA53FA5A7E77798F882ECE20B1ABC00BB358",
                "A9E55A202D0D0676BD0CE37A637440FD24D65D3242C7B825944774389630F61463",
                "53DD766139D1CA83A9CD7EE1C3C15BEECF989194509C61BA623ACBC90EDEE0F003",
                "B4C46EBB04610D2BE1CD2FBE068114D28B177E48D9A8D057E70F7E464B49836728",
                "1B98",
            )
        );
        assert_eq!(
            signed.hash,
            "E1BF9F2382ED89E9ADD4A5D7095840B3D27AE707E81F71FFB1F005D769185014"
        );
    }

    #[test]
    fn secp256k1_wallet_signs_with_der_signature() {
        let wallet = Wallet::from_seed("snoPBrXtMeMyMHUVTgbuqAfg1SUTb").unwrap();
        let tx = filled(Transaction::payment(
            wallet.address().clone(),
            Address::from_account_id([9; 20]),
            Amount::Drops(1_000_000),
            None,
        ));
        let signed = sign_transaction(&wallet, &tx).unwrap();
        // SigningPubKey is the compressed key, followed by a DER TxnSignature.
        let key_field = format!("7321{}74", wallet.public_key_hex());
        let at = signed.tx_blob.find(&key_field).unwrap() + key_field.len();
        let sig_len = u8::from_str_radix(&signed.tx_blob[at..at + 2], 16).unwrap();
        assert!((8..=72).contains(&sig_len));
        assert_eq!(&signed.tx_blob[at + 2..at + 4], "30");

        let again = sign_transaction(&wallet, &tx).unwrap();
        assert_eq!(signed.hash, again.hash);
        assert_eq!(wallet.key_type(), KeyType::Secp256k1);
    }

    #[test]
    fn rejects_foreign_account() {
        let wallet = Wallet::generate();
        let other = Wallet::generate();
        let tx = filled(Transaction::account_set(
            other.address().clone(),
            AccountSetFields::default(),
        ));
        assert!(matches!(
            sign_transaction(&wallet, &tx),
            Err(SigningError::AccountMismatch { .. })
        ));
    }

    #[test]
    fn rejects_unfilled_transaction() {
        let wallet = Wallet::generate();
        let tx = Transaction::account_set(wallet.address().clone(), AccountSetFields::default());
        assert_eq!(
            sign_transaction(&wallet, &tx).unwrap_err(),
            SigningError::NotAutofilled
        );
    }
}
