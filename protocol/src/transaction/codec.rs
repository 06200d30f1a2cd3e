//! Canonical binary serialization.
//!
//! Only the fields this crate produces are supported. Each field is written
//! as `header || value`, and fields are emitted in ascending
//! `(type code, field code)` order, which is what makes the encoding
//! canonical and therefore signable.
//!
//! ```text
//! type   code  fields used here
//! UInt16    1  TransactionType
//! UInt32    2  NetworkID, Flags, Sequence, TransferRate, LastLedgerSequence,
//!              SetFlag, ClearFlag
//! Amount    6  Amount, LimitAmount, Fee, SendMax
//! Blob      7  SigningPubKey, TxnSignature, Domain
//! AccountID 8  Account, Destination
//! UInt8    16  TickSize
//! ```

use thiserror::Error;

use super::builder::{Transaction, TransactionKind};
use super::types::{Amount, IouValue, TypeError};
use crate::crypto::prefixed_sha512_half;

/// Prefix of the bytes an account signs.
pub const SIGNING_PREFIX: [u8; 4] = *b"STX\0";

/// Prefix of the bytes hashed into a transaction id.
pub const TRANSACTION_ID_PREFIX: [u8; 4] = *b"TXN\0";

/// Largest native amount: 100 billion XRP in drops.
pub const MAX_DROPS: u64 = 100_000_000_000_000_000;

const NATIVE_POSITIVE_BIT: u64 = 0x4000_0000_0000_0000;
const ISSUED_BIT: u64 = 0x8000_0000_0000_0000;
const ISSUED_POSITIVE_BIT: u64 = 0x4000_0000_0000_0000;
const EXPONENT_BIAS: i32 = 97;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum CodecError {
    #[error("transaction is missing {0}; autofill it before signing")]
    MissingField(&'static str),

    #[error("native amount {0} exceeds the ledger maximum")]
    DropsOutOfRange(u64),

    #[error(transparent)]
    Value(#[from] TypeError),

    #[error("blob of {0} bytes is too long to encode")]
    BlobTooLong(usize),
}

// ---------------------------------------------------------------------------
// Field identifiers
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
struct Field {
    type_code: u8,
    nth: u8,
}

const fn field(type_code: u8, nth: u8) -> Field {
    Field { type_code, nth }
}

const TRANSACTION_TYPE: Field = field(1, 2);
const NETWORK_ID: Field = field(2, 1);
const FLAGS: Field = field(2, 2);
const SEQUENCE: Field = field(2, 4);
const TRANSFER_RATE: Field = field(2, 11);
const LAST_LEDGER_SEQUENCE: Field = field(2, 27);
const SET_FLAG: Field = field(2, 33);
const CLEAR_FLAG: Field = field(2, 34);
const AMOUNT: Field = field(6, 1);
const LIMIT_AMOUNT: Field = field(6, 3);
const FEE: Field = field(6, 8);
const SEND_MAX: Field = field(6, 9);
const SIGNING_PUB_KEY: Field = field(7, 3);
const TXN_SIGNATURE: Field = field(7, 4);
const DOMAIN: Field = field(7, 7);
const ACCOUNT: Field = field(8, 1);
const DESTINATION: Field = field(8, 3);
const TICK_SIZE: Field = field(16, 16);

/// Encodes a field header: one to three bytes depending on whether the
/// type and field codes fit in a nibble.
fn field_header(f: Field) -> Vec<u8> {
    match (f.type_code < 16, f.nth < 16) {
        (true, true) => vec![(f.type_code << 4) | f.nth],
        (true, false) => vec![f.type_code << 4, f.nth],
        (false, true) => vec![f.nth, f.type_code],
        (false, false) => vec![0, f.type_code, f.nth],
    }
}

/// Variable-length prefix for blobs and account ids.
fn length_prefix(len: usize) -> Result<Vec<u8>, CodecError> {
    match len {
        0..=192 => Ok(vec![len as u8]),
        193..=12_480 => {
            let rem = len - 193;
            Ok(vec![193 + (rem >> 8) as u8, (rem & 0xFF) as u8])
        }
        12_481..=918_744 => {
            let rem = len - 12_481;
            Ok(vec![
                241 + (rem >> 16) as u8,
                ((rem >> 8) & 0xFF) as u8,
                (rem & 0xFF) as u8,
            ])
        }
        _ => Err(CodecError::BlobTooLong(len)),
    }
}

fn vl(bytes: &[u8]) -> Result<Vec<u8>, CodecError> {
    let mut out = length_prefix(bytes.len())?;
    out.extend_from_slice(bytes);
    Ok(out)
}

// ---------------------------------------------------------------------------
// Amounts
// ---------------------------------------------------------------------------

/// The 64-bit value part of an issued-currency amount.
pub fn encode_iou_value(value: &IouValue) -> [u8; 8] {
    if value.is_zero() {
        return ISSUED_BIT.to_be_bytes();
    }
    let mut bits = ISSUED_BIT;
    if !value.negative {
        bits |= ISSUED_POSITIVE_BIT;
    }
    bits |= ((value.exponent + EXPONENT_BIAS) as u64) << 54;
    bits |= value.mantissa;
    bits.to_be_bytes()
}

pub fn encode_amount(amount: &Amount) -> Result<Vec<u8>, CodecError> {
    match amount {
        Amount::Drops(drops) => {
            if *drops > MAX_DROPS {
                return Err(CodecError::DropsOutOfRange(*drops));
            }
            Ok((drops | NATIVE_POSITIVE_BIT).to_be_bytes().to_vec())
        }
        Amount::Issued(issued) => {
            let mut out = Vec::with_capacity(48);
            out.extend_from_slice(&encode_iou_value(&issued.iou_value()?));
            out.extend_from_slice(&issued.currency.to_bytes());
            out.extend_from_slice(issued.issuer.account_id());
            Ok(out)
        }
    }
}

// ---------------------------------------------------------------------------
// Transactions
// ---------------------------------------------------------------------------

/// Serializes `tx` with the given public key.
///
/// With `signature = None` the output is the signing payload body (the
/// ledger excludes `TxnSignature` from what gets signed); with a signature
/// it is the submittable blob.
pub fn encode_transaction(
    tx: &Transaction,
    signing_pub_key: &[u8],
    signature: Option<&[u8]>,
) -> Result<Vec<u8>, CodecError> {
    let fee = tx.fee.ok_or(CodecError::MissingField("Fee"))?;
    let sequence = tx.sequence.ok_or(CodecError::MissingField("Sequence"))?;
    let last_ledger = tx
        .last_ledger_sequence
        .ok_or(CodecError::MissingField("LastLedgerSequence"))?;

    let mut fields: Vec<(Field, Vec<u8>)> = vec![
        (
            TRANSACTION_TYPE,
            tx.transaction_type().code().to_be_bytes().to_vec(),
        ),
        (FLAGS, tx.flags.to_be_bytes().to_vec()),
        (SEQUENCE, sequence.to_be_bytes().to_vec()),
        (LAST_LEDGER_SEQUENCE, last_ledger.to_be_bytes().to_vec()),
        (FEE, encode_amount(&Amount::Drops(fee))?),
        (SIGNING_PUB_KEY, vl(signing_pub_key)?),
        (ACCOUNT, vl(tx.account.account_id())?),
    ];

    if let Some(network_id) = tx.network_id {
        fields.push((NETWORK_ID, network_id.to_be_bytes().to_vec()));
    }
    if let Some(sig) = signature {
        fields.push((TXN_SIGNATURE, vl(sig)?));
    }

    match &tx.kind {
        TransactionKind::AccountSet(set) => {
            if let Some(domain) = &set.domain {
                fields.push((DOMAIN, vl(domain)?));
            }
            if let Some(rate) = set.transfer_rate {
                fields.push((TRANSFER_RATE, rate.to_be_bytes().to_vec()));
            }
            if let Some(tick) = set.tick_size {
                fields.push((TICK_SIZE, vec![tick]));
            }
            if let Some(flag) = set.set_flag {
                fields.push((SET_FLAG, flag.value().to_be_bytes().to_vec()));
            }
            if let Some(flag) = set.clear_flag {
                fields.push((CLEAR_FLAG, flag.value().to_be_bytes().to_vec()));
            }
        }
        TransactionKind::TrustSet(trust) => {
            let limit = Amount::Issued(trust.limit_amount.clone());
            fields.push((LIMIT_AMOUNT, encode_amount(&limit)?));
        }
        TransactionKind::Payment(payment) => {
            fields.push((AMOUNT, encode_amount(&payment.amount)?));
            fields.push((DESTINATION, vl(payment.destination.account_id())?));
            if let Some(send_max) = &payment.send_max {
                fields.push((SEND_MAX, encode_amount(send_max)?));
            }
        }
    }

    fields.sort_by_key(|(f, _)| *f);

    let mut out = Vec::with_capacity(256);
    for (f, value) in fields {
        out.extend_from_slice(&field_header(f));
        out.extend_from_slice(&value);
    }
    Ok(out)
}

/// The exact bytes an account signs: `STX\0 || body`.
pub fn signing_payload(tx: &Transaction, signing_pub_key: &[u8]) -> Result<Vec<u8>, CodecError> {
    let body = encode_transaction(tx, signing_pub_key, None)?;
    let mut payload = Vec::with_capacity(SIGNING_PREFIX.len() + body.len());
    payload.extend_from_slice(&SIGNING_PREFIX);
    payload.extend_from_slice(&body);
    Ok(payload)
}

/// Transaction id of a signed blob, as uppercase hex.
pub fn transaction_hash(blob: &[u8]) -> String {
    hex::encode_upper(prefixed_sha512_half(TRANSACTION_ID_PREFIX, blob))
}
