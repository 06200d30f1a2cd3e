//! Transaction construction.
//!
//! A [`Transaction`] is the unsigned, typed form of one ledger transaction:
//! the common fields every type shares plus a [`TransactionKind`] holding the
//! type-specific ones. Construction never touches the network; `Sequence`,
//! `Fee`, and `LastLedgerSequence` stay `None` until the ledger client
//! autofills them, and signing refuses a transaction that still has gaps.

use super::types::{AccountSetFlag, Address, Amount, IssuedAmount, TransactionType};

/// Type-specific fields of an `AccountSet`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AccountSetFields {
    /// Raw domain bytes (already hex-decoded).
    pub domain: Option<Vec<u8>>,
    /// Full ledger transfer rate (`1_000_000_000` = no fee).
    pub transfer_rate: Option<u32>,
    pub tick_size: Option<u8>,
    pub set_flag: Option<AccountSetFlag>,
    pub clear_flag: Option<AccountSetFlag>,
}

/// Type-specific fields of a `TrustSet`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrustSetFields {
    pub limit_amount: IssuedAmount,
}

/// Type-specific fields of a `Payment`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaymentFields {
    pub destination: Address,
    pub amount: Amount,
    pub send_max: Option<Amount>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransactionKind {
    AccountSet(AccountSetFields),
    TrustSet(TrustSetFields),
    Payment(PaymentFields),
}

/// An unsigned ledger transaction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transaction {
    /// Sending account.
    pub account: Address,
    /// `Flags` bitfield; see [`super::types::flags`].
    pub flags: u32,
    /// Fee in drops. Set by autofill.
    pub fee: Option<u64>,
    /// Account sequence. Set by autofill.
    pub sequence: Option<u32>,
    /// Expiry ledger. Set by autofill.
    pub last_ledger_sequence: Option<u32>,
    /// Only present on networks with an id above 1024.
    pub network_id: Option<u32>,
    pub kind: TransactionKind,
}

impl Transaction {
    fn new(account: Address, kind: TransactionKind) -> Self {
        Self {
            account,
            flags: 0,
            fee: None,
            sequence: None,
            last_ledger_sequence: None,
            network_id: None,
            kind,
        }
    }

    pub fn account_set(account: Address, fields: AccountSetFields) -> Self {
        Self::new(account, TransactionKind::AccountSet(fields))
    }

    pub fn trust_set(account: Address, limit_amount: IssuedAmount) -> Self {
        Self::new(account, TransactionKind::TrustSet(TrustSetFields { limit_amount }))
    }

    pub fn payment(
        account: Address,
        destination: Address,
        amount: Amount,
        send_max: Option<Amount>,
    ) -> Self {
        Self::new(
            account,
            TransactionKind::Payment(PaymentFields {
                destination,
                amount,
                send_max,
            }),
        )
    }

    /// ORs `flag` into the `Flags` field.
    pub fn set_flag_bits(&mut self, flag: u32) {
        self.flags |= flag;
    }

    pub fn has_flag(&self, flag: u32) -> bool {
        self.flags & flag == flag
    }

    pub fn transaction_type(&self) -> TransactionType {
        match self.kind {
            TransactionKind::AccountSet(_) => TransactionType::AccountSet,
            TransactionKind::TrustSet(_) => TransactionType::TrustSet,
            TransactionKind::Payment(_) => TransactionType::Payment,
        }
    }

    /// True once autofill has supplied every field signing needs.
    pub fn is_autofilled(&self) -> bool {
        self.fee.is_some() && self.sequence.is_some() && self.last_ledger_sequence.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transaction::types::{flags, Currency};

    fn addr(byte: u8) -> Address {
        Address::from_account_id([byte; 20])
    }

    #[test]
    fn test_new_transaction_is_not_autofilled() {
        let tx = Transaction::account_set(addr(1), AccountSetFields::default());
        assert!(!tx.is_autofilled());
        assert_eq!(tx.transaction_type(), TransactionType::AccountSet);
        assert_eq!(tx.flags, 0);
    }

    #[test]
    fn test_flag_bits_accumulate() {
        let limit = IssuedAmount::new(Currency::parse("FOO").unwrap(), addr(2), "0").unwrap();
        let mut tx = Transaction::trust_set(addr(1), limit);
        tx.set_flag_bits(flags::TF_SET_FREEZE);
        assert!(tx.has_flag(flags::TF_SET_FREEZE));
        assert!(!tx.has_flag(flags::TF_CLEAR_FREEZE));
    }

    #[test]
    fn test_payment_kind() {
        let tx = Transaction::payment(addr(1), addr(2), Amount::Drops(10), None);
        assert_eq!(tx.transaction_type(), TransactionType::Payment);
        match tx.kind {
            TransactionKind::Payment(p) => assert_eq!(p.destination, addr(2)),
            _ => panic!("expected payment"),
        }
    }
}
