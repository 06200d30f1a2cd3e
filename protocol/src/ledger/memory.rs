//! In-process ledger double.
//!
//! [`InMemoryLedger`] applies the three supported transaction types to an
//! account/trust-line table so services, the HTTP API, and the end-to-end
//! scenario can run without a node. It is one shared ledger: clones share
//! state, and it acts as its own [`LedgerConnector`] and [`Faucet`].
//!
//! Simplified rules: a flat fee, no reserves, no offers or paths. Payments
//! move issued tokens directly between a holder and its issuer, or between
//! two holders of the same issuer (charging the issuer's transfer rate).

use async_trait::async_trait;
use parking_lot::Mutex;
use rust_decimal::Decimal;
use std::collections::{BTreeMap, HashMap};
use std::str::FromStr;
use std::sync::Arc;

use super::faucet::{Faucet, FaucetError};
use super::{
    AccountInfo, AccountLines, LedgerClient, LedgerConnector, LedgerError, SubmitOutcome,
    TrustLine, SUCCESS_RESULT,
};
use crate::config::{LAST_LEDGER_OFFSET, TRANSFER_RATE_BASE};
use crate::transaction::{
    flags, AccountSetFields, AccountSetFlag, Address, Amount, IssuedAmount, PaymentFields,
    SignedTransaction, Transaction, TransactionKind,
};

/// Fee charged for every transaction, in drops.
pub const FLAT_FEE_DROPS: u64 = 10;

/// What the faucet hands out: 100 XRP.
pub const FAUCET_DROPS: u64 = 100_000_000;

const GENESIS_LEDGER_INDEX: u32 = 1_000;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AccountRoot {
    pub balance_drops: u64,
    pub sequence: u32,
    pub domain: Option<Vec<u8>>,
    pub transfer_rate: Option<u32>,
    pub tick_size: Option<u8>,
    pub default_ripple: bool,
    pub require_auth: bool,
    pub require_dest: bool,
    pub disallow_xrp: bool,
    pub allow_clawback: bool,
}

#[derive(Debug, Clone, Default)]
struct LineSide {
    limit: Decimal,
    authorized: bool,
    freeze: bool,
    no_ripple: bool,
}

/// A trust line between `low` and `high` (ordered by address text).
#[derive(Debug, Clone)]
struct Line {
    low: Address,
    high: Address,
    currency: String,
    /// Positive when `low` holds tokens issued by `high`.
    balance: Decimal,
    low_side: LineSide,
    high_side: LineSide,
}

impl Line {
    fn is_low(&self, account: &Address) -> bool {
        self.low == *account
    }

    fn side_mut(&mut self, account: &Address) -> &mut LineSide {
        if self.is_low(account) {
            &mut self.low_side
        } else {
            &mut self.high_side
        }
    }

    fn side(&self, account: &Address) -> &LineSide {
        if self.is_low(account) {
            &self.low_side
        } else {
            &self.high_side
        }
    }

    /// Balance seen from `account`.
    fn balance_for(&self, account: &Address) -> Decimal {
        if self.is_low(account) {
            self.balance
        } else {
            -self.balance
        }
    }

    fn credit(&mut self, holder: &Address, delta: Decimal) {
        if self.is_low(holder) {
            self.balance += delta;
        } else {
            self.balance -= delta;
        }
    }

    fn frozen(&self) -> bool {
        self.low_side.freeze || self.high_side.freeze
    }

    fn view_from(&self, account: &Address) -> TrustLine {
        let (me, peer, other) = if self.is_low(account) {
            (&self.low_side, &self.high_side, &self.high)
        } else {
            (&self.high_side, &self.low_side, &self.low)
        };
        TrustLine {
            account: other.to_string(),
            balance: self.balance_for(account).normalize().to_string(),
            currency: self.currency.clone(),
            limit: me.limit.normalize().to_string(),
            limit_peer: peer.limit.normalize().to_string(),
            quality_in: 0,
            quality_out: 0,
            no_ripple: me.no_ripple,
            no_ripple_peer: peer.no_ripple,
            authorized: me.authorized,
            peer_authorized: peer.authorized,
            freeze: me.freeze,
            freeze_peer: peer.freeze,
        }
    }
}

type LineKey = (String, String, String);

fn line_key(a: &Address, b: &Address, currency: &str) -> LineKey {
    let (low, high) = if a.as_str() <= b.as_str() { (a, b) } else { (b, a) };
    (low.to_string(), high.to_string(), currency.to_string())
}

#[derive(Debug, Default)]
struct State {
    ledger_index: u32,
    accounts: HashMap<Address, AccountRoot>,
    lines: BTreeMap<LineKey, Line>,
    applied: Vec<String>,
    withhold_validation: bool,
}

#[derive(Debug, Clone, Default)]
pub struct InMemoryLedger {
    state: Arc<Mutex<State>>,
}

impl InMemoryLedger {
    pub fn new() -> Self {
        let ledger = Self::default();
        ledger.state.lock().ledger_index = GENESIS_LEDGER_INDEX;
        ledger
    }

    /// Credits `drops` to `address`, creating the account if needed.
    pub fn fund(&self, address: &Address, drops: u64) {
        let mut state = self.state.lock();
        let root = state.accounts.entry(address.clone()).or_insert_with(|| AccountRoot {
            sequence: 1,
            ..Default::default()
        });
        root.balance_drops += drops;
    }

    pub fn account(&self, address: &Address) -> Option<AccountRoot> {
        self.state.lock().accounts.get(address).cloned()
    }

    /// When set, submissions are applied but never reported validated.
    pub fn withhold_validation(&self, withhold: bool) {
        self.state.lock().withhold_validation = withhold;
    }

    /// Hashes of every transaction applied so far, in order.
    pub fn applied_transactions(&self) -> Vec<String> {
        self.state.lock().applied.clone()
    }
}

fn account_not_found(method: &str) -> LedgerError {
    LedgerError::Rpc {
        method: method.to_string(),
        error: "actNotFound".to_string(),
        message: "Account not found.".to_string(),
    }
}

fn to_decimal(value: &str) -> Option<Decimal> {
    Decimal::from_str(value)
        .or_else(|_| Decimal::from_scientific(value))
        .ok()
}

impl State {
    /// Applies `tx` and returns its engine result.
    fn apply(&mut self, tx: &Transaction) -> String {
        let Some(root) = self.accounts.get(&tx.account) else {
            return "terNO_ACCOUNT".to_string();
        };
        match tx.sequence {
            Some(seq) if seq < root.sequence => return "tefPAST_SEQ".to_string(),
            Some(seq) if seq > root.sequence => return "terPRE_SEQ".to_string(),
            Some(_) => {}
            None => return "temBAD_SEQUENCE".to_string(),
        }
        let fee = tx.fee.unwrap_or(FLAT_FEE_DROPS);
        if root.balance_drops < fee {
            return "terINSUF_FEE_B".to_string();
        }

        let result = match &tx.kind {
            TransactionKind::AccountSet(fields) => self.apply_account_set(tx, fields),
            TransactionKind::TrustSet(fields) => self.apply_trust_set(tx, &fields.limit_amount),
            TransactionKind::Payment(fields) => self.apply_payment(&tx.account, fields),
        };

        // tem results never reach the ledger; everything else claims the fee.
        if !result.starts_with("tem") {
            if let Some(root) = self.accounts.get_mut(&tx.account) {
                root.balance_drops -= fee;
                root.sequence += 1;
            }
            self.ledger_index += 1;
        }
        result.to_string()
    }

    fn apply_account_set(&mut self, tx: &Transaction, fields: &AccountSetFields) -> &'static str {
        let Some(root) = self.accounts.get_mut(&tx.account) else {
            return "terNO_ACCOUNT";
        };
        if let Some(domain) = &fields.domain {
            root.domain = Some(domain.clone());
        }
        if let Some(rate) = fields.transfer_rate {
            root.transfer_rate = Some(rate);
        }
        if let Some(tick) = fields.tick_size {
            root.tick_size = Some(tick);
        }
        if tx.has_flag(flags::TF_REQUIRE_DEST_TAG) {
            root.require_dest = true;
        }
        if tx.has_flag(flags::TF_REQUIRE_AUTH) {
            root.require_auth = true;
        }
        if tx.has_flag(flags::TF_DISALLOW_XRP) {
            root.disallow_xrp = true;
        }
        for (flag, on) in [(fields.set_flag, true), (fields.clear_flag, false)] {
            match flag {
                Some(AccountSetFlag::RequireDest) => root.require_dest = on,
                Some(AccountSetFlag::RequireAuth) => root.require_auth = on,
                Some(AccountSetFlag::DisallowXrp) => root.disallow_xrp = on,
                Some(AccountSetFlag::DefaultRipple) => root.default_ripple = on,
                Some(AccountSetFlag::AllowTrustLineClawback) => root.allow_clawback = on,
                None => {}
            }
        }
        SUCCESS_RESULT
    }

    fn apply_trust_set(&mut self, tx: &Transaction, limit: &IssuedAmount) -> &'static str {
        if limit.issuer == tx.account {
            return "temDST_IS_SRC";
        }
        let Some(value) = to_decimal(limit.value()) else {
            return "temBAD_LIMIT";
        };
        if value.is_sign_negative() {
            return "temBAD_LIMIT";
        }
        let Some(issuer_root) = self.accounts.get(&limit.issuer) else {
            return "tecNO_DST";
        };
        let issuer_ripples = issuer_root.default_ripple;

        let currency = limit.currency.code();
        let key = line_key(&tx.account, &limit.issuer, &currency);
        let line = self.lines.entry(key).or_insert_with(|| {
            let (low, high) = if tx.account.as_str() <= limit.issuer.as_str() {
                (tx.account.clone(), limit.issuer.clone())
            } else {
                (limit.issuer.clone(), tx.account.clone())
            };
            let mut line = Line {
                low,
                high,
                currency: currency.clone(),
                balance: Decimal::ZERO,
                low_side: LineSide::default(),
                high_side: LineSide::default(),
            };
            line.side_mut(&limit.issuer).no_ripple = !issuer_ripples;
            line
        });

        let side = line.side_mut(&tx.account);
        side.limit = value;
        if tx.has_flag(flags::TF_SET_FREEZE) {
            side.freeze = true;
        }
        if tx.has_flag(flags::TF_CLEAR_FREEZE) {
            side.freeze = false;
        }
        SUCCESS_RESULT
    }

    fn apply_payment(&mut self, sender: &Address, payment: &PaymentFields) -> &'static str {
        if payment.destination == *sender {
            return "temREDUNDANT";
        }
        match &payment.amount {
            Amount::Drops(drops) => self.pay_native(sender, &payment.destination, *drops),
            Amount::Issued(amount) => {
                let send_max = match &payment.send_max {
                    Some(Amount::Issued(max)) => to_decimal(max.value()),
                    _ => None,
                };
                self.pay_issued(sender, &payment.destination, amount, send_max)
            }
        }
    }

    fn pay_native(&mut self, sender: &Address, destination: &Address, drops: u64) -> &'static str {
        if !self.accounts.contains_key(destination) {
            return "tecNO_DST";
        }
        let Some(from) = self.accounts.get_mut(sender) else {
            return "terNO_ACCOUNT";
        };
        if from.balance_drops < drops {
            return "tecUNFUNDED_PAYMENT";
        }
        from.balance_drops -= drops;
        if let Some(to) = self.accounts.get_mut(destination) {
            to.balance_drops += drops;
        }
        SUCCESS_RESULT
    }

    fn pay_issued(
        &mut self,
        sender: &Address,
        destination: &Address,
        amount: &IssuedAmount,
        send_max: Option<Decimal>,
    ) -> &'static str {
        let Some(value) = to_decimal(amount.value()) else {
            return "temBAD_AMOUNT";
        };
        if value <= Decimal::ZERO {
            return "temBAD_AMOUNT";
        }
        if !self.accounts.contains_key(destination) {
            return "tecNO_DST";
        }
        let issuer = &amount.issuer;
        let currency = amount.currency.code();
        let issuer_root = self.accounts.get(issuer).cloned().unwrap_or_default();

        if sender == issuer {
            let Some(line) = self.lines.get_mut(&line_key(destination, issuer, &currency)) else {
                return "tecPATH_DRY";
            };
            if issuer_root.require_auth && !line.side(issuer).authorized {
                return "tecPATH_DRY";
            }
            if line.balance_for(destination) + value > line.side(destination).limit {
                return "tecPATH_PARTIAL";
            }
            line.credit(destination, value);
            return SUCCESS_RESULT;
        }

        if destination == issuer {
            let Some(line) = self.lines.get_mut(&line_key(sender, issuer, &currency)) else {
                return "tecPATH_DRY";
            };
            if line.balance_for(sender) < value {
                return "tecPATH_PARTIAL";
            }
            line.credit(sender, -value);
            return SUCCESS_RESULT;
        }

        // Holder to holder, rippling through the issuer.
        let rate = issuer_root.transfer_rate.unwrap_or(TRANSFER_RATE_BASE);
        let Some(cost) = value
            .checked_mul(Decimal::from(rate))
            .and_then(|v| v.checked_div(Decimal::from(TRANSFER_RATE_BASE)))
        else {
            return "temBAD_AMOUNT";
        };
        if cost > send_max.unwrap_or(value) {
            return "tecPATH_PARTIAL";
        }

        let from_key = line_key(sender, issuer, &currency);
        let to_key = line_key(destination, issuer, &currency);
        let (Some(from), Some(to)) = (self.lines.get(&from_key), self.lines.get(&to_key)) else {
            return "tecPATH_DRY";
        };
        if from.frozen() || to.frozen() || from.side(issuer).no_ripple {
            return "tecPATH_DRY";
        }
        if from.balance_for(sender) < cost {
            return "tecPATH_PARTIAL";
        }
        if to.balance_for(destination) + value > to.side(destination).limit {
            return "tecPATH_PARTIAL";
        }

        if let Some(from) = self.lines.get_mut(&from_key) {
            from.credit(sender, -cost);
        }
        if let Some(to) = self.lines.get_mut(&to_key) {
            to.credit(destination, value);
        }
        SUCCESS_RESULT
    }
}

#[async_trait]
impl LedgerClient for InMemoryLedger {
    async fn autofill(&self, tx: &mut Transaction) -> Result<(), LedgerError> {
        let state = self.state.lock();
        let root = state
            .accounts
            .get(&tx.account)
            .ok_or_else(|| account_not_found("account_info"))?;
        tx.sequence.get_or_insert(root.sequence);
        tx.fee.get_or_insert(FLAT_FEE_DROPS);
        tx.last_ledger_sequence
            .get_or_insert(state.ledger_index + LAST_LEDGER_OFFSET);
        Ok(())
    }

    async fn submit_and_wait(
        &self,
        signed: &SignedTransaction,
    ) -> Result<SubmitOutcome, LedgerError> {
        let mut state = self.state.lock();
        let result = state.apply(&signed.transaction);

        if ["tem", "tef", "tel"].iter().any(|p| result.starts_with(p)) {
            return Err(LedgerError::Rejected {
                message: format!("{} rejected", signed.transaction.transaction_type()),
                result,
            });
        }
        if !result.starts_with("tes") && !result.starts_with("tec") {
            // ter results never make it into a validated ledger here.
            return Ok(SubmitOutcome {
                hash: signed.hash.clone(),
                validated: false,
                result: String::new(),
            });
        }

        state.applied.push(signed.hash.clone());
        Ok(SubmitOutcome {
            hash: signed.hash.clone(),
            validated: !state.withhold_validation,
            result,
        })
    }

    async fn account_info(&self, address: &Address) -> Result<AccountInfo, LedgerError> {
        let state = self.state.lock();
        let root = state
            .accounts
            .get(address)
            .ok_or_else(|| account_not_found("account_info"))?;
        Ok(AccountInfo {
            balance_drops: root.balance_drops,
            sequence: root.sequence,
        })
    }

    async fn account_lines(&self, address: &Address) -> Result<AccountLines, LedgerError> {
        let state = self.state.lock();
        if !state.accounts.contains_key(address) {
            return Err(account_not_found("account_lines"));
        }
        let lines = state
            .lines
            .values()
            .filter(|line| line.low == *address || line.high == *address)
            .map(|line| line.view_from(address))
            .collect();
        Ok(AccountLines {
            account: address.to_string(),
            lines,
            validated: true,
        })
    }
}

#[async_trait]
impl LedgerConnector for InMemoryLedger {
    async fn connect(&self) -> Result<Box<dyn LedgerClient>, LedgerError> {
        Ok(Box::new(self.clone()))
    }
}

#[async_trait]
impl Faucet for InMemoryLedger {
    async fn fund(&self, address: &Address) -> Result<(), FaucetError> {
        InMemoryLedger::fund(self, address, FAUCET_DROPS);
        Ok(())
    }
}

/// A connector whose node is never reachable.
#[derive(Debug, Clone, Default)]
pub struct UnreachableLedger;

#[async_trait]
impl LedgerConnector for UnreachableLedger {
    async fn connect(&self) -> Result<Box<dyn LedgerClient>, LedgerError> {
        Err(LedgerError::Transport("connection refused".to_string()))
    }
}

#[async_trait]
impl Faucet for UnreachableLedger {
    async fn fund(&self, _address: &Address) -> Result<(), FaucetError> {
        Err(FaucetError::Request("connection refused".to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transaction::{sign_transaction, Currency};
    use crate::wallet::Wallet;

    async fn submit(ledger: &InMemoryLedger, wallet: &Wallet, mut tx: Transaction) -> SubmitOutcome {
        ledger.autofill(&mut tx).await.unwrap();
        let signed = sign_transaction(wallet, &tx).unwrap();
        ledger.submit_and_wait(&signed).await.unwrap()
    }

    fn foo(issuer: &Wallet, value: &str) -> IssuedAmount {
        IssuedAmount::new(Currency::parse("FOO").unwrap(), issuer.address().clone(), value).unwrap()
    }

    #[tokio::test]
    async fn autofill_unknown_account() {
        let ledger = InMemoryLedger::new();
        let wallet = Wallet::generate();
        let mut tx = Transaction::account_set(wallet.address().clone(), AccountSetFields::default());
        let err = ledger.autofill(&mut tx).await.unwrap_err();
        assert!(matches!(err, LedgerError::Rpc { ref error, .. } if error == "actNotFound"));
    }

    #[tokio::test]
    async fn fee_and_sequence_are_consumed() {
        let ledger = InMemoryLedger::new();
        let wallet = Wallet::generate();
        ledger.fund(wallet.address(), 1_000);

        let outcome = submit(
            &ledger,
            &wallet,
            Transaction::account_set(wallet.address().clone(), AccountSetFields::default()),
        )
        .await;
        assert!(outcome.validated);
        assert!(outcome.succeeded());

        let info = ledger.account_info(wallet.address()).await.unwrap();
        assert_eq!(info.balance_drops, 1_000 - FLAT_FEE_DROPS);
        assert_eq!(info.sequence, 2);
    }

    #[tokio::test]
    async fn issue_and_hold_tokens() {
        let ledger = InMemoryLedger::new();
        let issuer = Wallet::generate();
        let holder = Wallet::generate();
        ledger.fund(issuer.address(), FAUCET_DROPS);
        ledger.fund(holder.address(), FAUCET_DROPS);

        let trust = Transaction::trust_set(holder.address().clone(), foo(&issuer, "100"));
        assert!(submit(&ledger, &holder, trust).await.succeeded());

        let pay = Transaction::payment(
            issuer.address().clone(),
            holder.address().clone(),
            Amount::Issued(foo(&issuer, "40")),
            None,
        );
        assert!(submit(&ledger, &issuer, pay).await.succeeded());

        let lines = ledger.account_lines(holder.address()).await.unwrap();
        assert_eq!(lines.lines.len(), 1);
        assert_eq!(lines.lines[0].balance, "40");
        assert_eq!(lines.lines[0].limit, "100");
        assert_eq!(lines.lines[0].account, issuer.classic_address());

        let issuer_view = ledger.account_lines(issuer.address()).await.unwrap();
        assert_eq!(issuer_view.lines[0].balance, "-40");
        assert_eq!(issuer_view.lines[0].limit_peer, "100");
    }

    #[tokio::test]
    async fn payment_over_limit_fails() {
        let ledger = InMemoryLedger::new();
        let issuer = Wallet::generate();
        let holder = Wallet::generate();
        ledger.fund(issuer.address(), FAUCET_DROPS);
        ledger.fund(holder.address(), FAUCET_DROPS);

        let trust = Transaction::trust_set(holder.address().clone(), foo(&issuer, "10"));
        submit(&ledger, &holder, trust).await;

        let pay = Transaction::payment(
            issuer.address().clone(),
            holder.address().clone(),
            Amount::Issued(foo(&issuer, "11")),
            None,
        );
        let outcome = submit(&ledger, &issuer, pay).await;
        assert!(outcome.validated);
        assert_eq!(outcome.result, "tecPATH_PARTIAL");
    }

    #[tokio::test]
    async fn withheld_validation() {
        let ledger = InMemoryLedger::new();
        let wallet = Wallet::generate();
        ledger.fund(wallet.address(), 1_000);
        ledger.withhold_validation(true);

        let outcome = submit(
            &ledger,
            &wallet,
            Transaction::account_set(wallet.address().clone(), AccountSetFields::default()),
        )
        .await;
        assert!(!outcome.validated);
    }

    #[tokio::test]
    async fn connector_shares_state() {
        let ledger = InMemoryLedger::new();
        let wallet = Wallet::generate();
        Faucet::fund(&ledger, wallet.address()).await.unwrap();

        let client = ledger.connect().await.unwrap();
        let info = client.account_info(wallet.address()).await.unwrap();
        assert_eq!(info.balance_drops, FAUCET_DROPS);
    }
}
