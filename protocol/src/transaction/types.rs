//! Core value types for ledger transactions.
//!
//! These are the validated building blocks every transaction is made of:
//! classic addresses, currency codes, issued-currency values, and amounts.
//! Each type parses untrusted text exactly once, so anything holding one of
//! these can encode it without re-checking.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

use crate::crypto::{decode_account_id, encode_account_id};

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Errors raised while parsing transaction value types.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TypeError {
    #[error("invalid address '{address}': {reason}")]
    InvalidAddress { address: String, reason: String },

    #[error("invalid currency code '{0}': use a 3-character code, a 4-20 character name, or 40 hex digits")]
    InvalidCurrency(String),

    #[error("invalid amount '{value}': {reason}")]
    InvalidAmount { value: String, reason: String },
}

// ---------------------------------------------------------------------------
// Address
// ---------------------------------------------------------------------------

/// A classic `r…` address together with the account id it encodes.
#[derive(Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Address {
    classic: String,
    account_id: [u8; 20],
}

impl Address {
    /// Parses and checksums a classic address.
    pub fn parse(s: &str) -> Result<Self, TypeError> {
        let trimmed = s.trim();
        let account_id = decode_account_id(trimmed).map_err(|e| TypeError::InvalidAddress {
            address: trimmed.to_string(),
            reason: e.to_string(),
        })?;
        Ok(Self {
            classic: trimmed.to_string(),
            account_id,
        })
    }

    /// Builds the address for a raw account id.
    pub fn from_account_id(account_id: [u8; 20]) -> Self {
        Self {
            classic: encode_account_id(&account_id),
            account_id,
        }
    }

    pub fn as_str(&self) -> &str {
        &self.classic
    }

    pub fn account_id(&self) -> &[u8; 20] {
        &self.account_id
    }
}

impl fmt::Debug for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Address({})", self.classic)
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.classic)
    }
}

impl FromStr for Address {
    type Err = TypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for Address {
    type Error = TypeError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<Address> for String {
    fn from(address: Address) -> Self {
        address.classic
    }
}

// ---------------------------------------------------------------------------
// Currency
// ---------------------------------------------------------------------------

/// Characters allowed in a standard three-character currency code besides
/// ASCII letters and digits.
const STANDARD_CODE_SYMBOLS: &str = "?!@#$%^&*<>(){}[]|";

/// An issued-currency code.
///
/// Three-character codes use the standard layout (bytes 12..15 of a zeroed
/// 160-bit field). Anything longer is a custom 160-bit code; readable names
/// of 4-20 characters are stored as their ASCII bytes, zero-padded.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub enum Currency {
    Standard([u8; 3]),
    Custom([u8; 20]),
}

impl Currency {
    pub fn parse(s: &str) -> Result<Self, TypeError> {
        let s = s.trim();
        let invalid = || TypeError::InvalidCurrency(s.to_string());

        if s.len() == 3 {
            let valid = s
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || STANDARD_CODE_SYMBOLS.contains(c));
            if !valid || s == "XRP" {
                return Err(invalid());
            }
            let mut code = [0u8; 3];
            code.copy_from_slice(s.as_bytes());
            return Ok(Currency::Standard(code));
        }

        if s.len() == 40 && s.chars().all(|c| c.is_ascii_hexdigit()) {
            let bytes = hex::decode(s).map_err(|_| invalid())?;
            if bytes[0] == 0 {
                // Leading zero byte is the standard layout; reject the ambiguity.
                return Err(invalid());
            }
            let mut code = [0u8; 20];
            code.copy_from_slice(&bytes);
            return Ok(Currency::Custom(code));
        }

        if (4..=20).contains(&s.len()) && s.chars().all(|c| c.is_ascii_graphic()) {
            let mut code = [0u8; 20];
            code[..s.len()].copy_from_slice(s.as_bytes());
            return Ok(Currency::Custom(code));
        }

        Err(invalid())
    }

    /// The 160-bit wire representation.
    pub fn to_bytes(&self) -> [u8; 20] {
        match self {
            Currency::Standard(code) => {
                let mut out = [0u8; 20];
                out[12..15].copy_from_slice(code);
                out
            }
            Currency::Custom(bytes) => *bytes,
        }
    }

    /// The code as the ledger's JSON APIs report it: the three characters for
    /// standard codes, 40 uppercase hex digits for custom ones.
    pub fn code(&self) -> String {
        match self {
            Currency::Standard(code) => String::from_utf8_lossy(code).into_owned(),
            Currency::Custom(bytes) => hex::encode_upper(bytes),
        }
    }

    /// Human-readable name for a code returned by the ledger.
    ///
    /// Custom codes that hold zero-padded printable ASCII decode back to the
    /// text; everything else is returned unchanged.
    pub fn display_name(code: &str) -> String {
        if code.len() == 40 {
            if let Ok(bytes) = hex::decode(code) {
                let text: Vec<u8> = bytes
                    .iter()
                    .copied()
                    .take_while(|b| *b != 0)
                    .collect();
                let padding_clean = bytes[text.len()..].iter().all(|b| *b == 0);
                if !text.is_empty() && padding_clean && text.iter().all(|b| b.is_ascii_graphic()) {
                    return String::from_utf8_lossy(&text).into_owned();
                }
            }
        }
        code.to_string()
    }
}

impl fmt::Debug for Currency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Currency({})", Currency::display_name(&self.code()))
    }
}

impl fmt::Display for Currency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&Currency::display_name(&self.code()))
    }
}

// ---------------------------------------------------------------------------
// IouValue
// ---------------------------------------------------------------------------

/// Smallest normalized issued-currency mantissa.
pub const MIN_IOU_MANTISSA: u64 = 1_000_000_000_000_000;

/// One past the largest normalized issued-currency mantissa.
pub const MAX_IOU_MANTISSA: u64 = 10_000_000_000_000_000;

pub const MIN_IOU_EXPONENT: i32 = -96;
pub const MAX_IOU_EXPONENT: i32 = 80;

/// Significant digits an issued-currency value can carry.
const IOU_PRECISION: usize = 16;

/// Largest exponent accepted in scientific notation before normalization.
const MAX_WRITTEN_EXPONENT: u32 = 1000;

/// An issued-currency value in the ledger's normalized floating form:
/// `mantissa * 10^exponent`, with the mantissa in
/// `[MIN_IOU_MANTISSA, MAX_IOU_MANTISSA)` unless the value is zero.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IouValue {
    pub negative: bool,
    pub mantissa: u64,
    pub exponent: i32,
}

impl IouValue {
    pub const ZERO: IouValue = IouValue {
        negative: false,
        mantissa: 0,
        exponent: 0,
    };

    pub fn is_zero(&self) -> bool {
        self.mantissa == 0
    }

    /// Parses decimal or scientific notation (`"2000"`, `"0.25"`, `"1e6"`).
    pub fn parse(s: &str) -> Result<Self, TypeError> {
        let raw = s.trim();
        let invalid = |reason: &str| TypeError::InvalidAmount {
            value: raw.to_string(),
            reason: reason.to_string(),
        };

        let (negative, unsigned) = match raw.strip_prefix('-') {
            Some(rest) => (true, rest),
            None => (false, raw.strip_prefix('+').unwrap_or(raw)),
        };

        let (number, mut exponent) = match unsigned.find(|c| c == 'e' || c == 'E') {
            Some(i) => {
                let exp = unsigned[i + 1..]
                    .parse::<i32>()
                    .map_err(|_| invalid("bad exponent"))?;
                if exp.unsigned_abs() > MAX_WRITTEN_EXPONENT {
                    return Err(invalid("exponent out of range"));
                }
                (&unsigned[..i], exp)
            }
            None => (unsigned, 0),
        };

        let (int_part, frac_part) = match number.split_once('.') {
            Some((i, f)) => (i, f),
            None => (number, ""),
        };

        if int_part.is_empty() && frac_part.is_empty() {
            return Err(invalid("no digits"));
        }
        if !int_part.chars().chain(frac_part.chars()).all(|c| c.is_ascii_digit()) {
            return Err(invalid("not a decimal number"));
        }

        let frac_len = i32::try_from(frac_part.len()).map_err(|_| invalid("too many digits"))?;
        exponent = exponent
            .checked_sub(frac_len)
            .ok_or_else(|| invalid("exponent out of range"))?;

        let digits = format!("{int_part}{frac_part}");
        let mut digits = digits.trim_start_matches('0');
        if digits.is_empty() {
            return Ok(Self::ZERO);
        }

        // Trailing zeros carry no precision; fold them into the exponent.
        while digits.len() > IOU_PRECISION && digits.ends_with('0') {
            digits = &digits[..digits.len() - 1];
            exponent = exponent
                .checked_add(1)
                .ok_or_else(|| invalid("exponent out of range"))?;
        }
        if digits.len() > IOU_PRECISION {
            return Err(invalid("more than 16 significant digits"));
        }

        let mut mantissa: u64 = digits.parse().map_err(|_| invalid("not a decimal number"))?;
        while mantissa < MIN_IOU_MANTISSA {
            mantissa *= 10;
            exponent = exponent
                .checked_sub(1)
                .ok_or_else(|| invalid("exponent out of range"))?;
        }

        if !(MIN_IOU_EXPONENT..=MAX_IOU_EXPONENT).contains(&exponent) {
            return Err(invalid("magnitude outside the ledger's range"));
        }

        Ok(Self {
            negative,
            mantissa,
            exponent,
        })
    }
}

impl FromStr for IouValue {
    type Err = TypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

// ---------------------------------------------------------------------------
// Amounts
// ---------------------------------------------------------------------------

/// An amount of an issued token: value, currency, and issuing account.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IssuedAmount {
    pub currency: Currency,
    pub issuer: Address,
    /// Decimal text as supplied; guaranteed to parse as an [`IouValue`].
    value: String,
}

impl IssuedAmount {
    pub fn new(currency: Currency, issuer: Address, value: &str) -> Result<Self, TypeError> {
        IouValue::parse(value)?;
        Ok(Self {
            currency,
            issuer,
            value: value.trim().to_string(),
        })
    }

    pub fn value(&self) -> &str {
        &self.value
    }

    pub fn iou_value(&self) -> Result<IouValue, TypeError> {
        IouValue::parse(&self.value)
    }
}

/// Either native drops or an issued-token amount.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Amount {
    Drops(u64),
    Issued(IssuedAmount),
}

// ---------------------------------------------------------------------------
// TransactionType
// ---------------------------------------------------------------------------

/// The transaction types this crate builds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TransactionType {
    Payment,
    AccountSet,
    TrustSet,
}

impl TransactionType {
    /// Wire code of the `TransactionType` field.
    pub fn code(self) -> u16 {
        match self {
            TransactionType::Payment => 0,
            TransactionType::AccountSet => 3,
            TransactionType::TrustSet => 20,
        }
    }
}

impl fmt::Display for TransactionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Payment => write!(f, "Payment"),
            Self::AccountSet => write!(f, "AccountSet"),
            Self::TrustSet => write!(f, "TrustSet"),
        }
    }
}

// ---------------------------------------------------------------------------
// Flags
// ---------------------------------------------------------------------------

/// Transaction-level (`Flags` field) bits.
pub mod flags {
    // AccountSet
    pub const TF_REQUIRE_DEST_TAG: u32 = 0x0001_0000;
    pub const TF_REQUIRE_AUTH: u32 = 0x0004_0000;
    pub const TF_DISALLOW_XRP: u32 = 0x0010_0000;

    // TrustSet
    pub const TF_SET_FREEZE: u32 = 0x0010_0000;
    pub const TF_CLEAR_FREEZE: u32 = 0x0020_0000;
}

/// Account-level settings toggled through `SetFlag` / `ClearFlag`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AccountSetFlag {
    RequireDest,
    RequireAuth,
    DisallowXrp,
    DefaultRipple,
    AllowTrustLineClawback,
}

impl AccountSetFlag {
    pub fn value(self) -> u32 {
        match self {
            AccountSetFlag::RequireDest => 1,
            AccountSetFlag::RequireAuth => 2,
            AccountSetFlag::DisallowXrp => 3,
            AccountSetFlag::DefaultRipple => 8,
            AccountSetFlag::AllowTrustLineClawback => 16,
        }
    }
}
