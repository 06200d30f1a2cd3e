//! Token Service: account settings, trust lines, freezes, and payments.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use tracing::{debug, info};

use super::ServiceError;
use crate::config::{
    DEFAULT_DOMAIN_HEX, MAX_DOMAIN_BYTES, MAX_TRANSFER_RATE, TICK_SIZE_RANGE, TRANSFER_RATE_BASE,
};
use crate::ledger::{LedgerClient, LedgerConnector, TrustLine};
use crate::transaction::{
    flags, sign_transaction, AccountSetFields, AccountSetFlag, Address, Amount, Currency,
    IouValue, IssuedAmount, Transaction,
};
use crate::wallet::Wallet;

/// Limit sent when freezing a line that does not exist yet.
const PLACEHOLDER_LIMIT: &str = "0";

// ---------------------------------------------------------------------------
// Account settings
// ---------------------------------------------------------------------------

/// Requested account configuration, in the JSON shape the web UI posts.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct AccountSettings {
    /// Hex, or plain text to be hex-encoded.
    pub domain: String,
    /// Either a full ledger rate or a fee in billionths (see
    /// [`ledger_transfer_rate`]). 0 leaves it unset.
    pub transfer_rate: u32,
    /// 0 leaves it unset.
    pub tick_size: u8,
    pub set_require_dest_tag: bool,
    pub set_require_auth: bool,
    #[serde(rename = "setDisallowXRP")]
    pub set_disallow_xrp: bool,
    pub set_asf_require_auth: bool,
    pub set_asf_default_ripple: bool,
    pub set_asf_allow_trust_line_clawback: bool,
}

impl AccountSettings {
    pub fn issuer_default() -> Self {
        Self {
            domain: DEFAULT_DOMAIN_HEX.to_string(),
            set_asf_default_ripple: true,
            ..Default::default()
        }
    }

    pub fn distributor_default() -> Self {
        Self {
            domain: DEFAULT_DOMAIN_HEX.to_string(),
            set_asf_require_auth: true,
            ..Default::default()
        }
    }
}

/// What enabling a setting does to the transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlagMutation {
    /// OR these bits into `Flags`.
    TxFlag(u32),
    /// Put this flag in `SetFlag`.
    AccountFlag(AccountSetFlag),
}

pub struct SettingFlag {
    pub name: &'static str,
    pub enabled: fn(&AccountSettings) -> bool,
    pub mutation: FlagMutation,
}

/// Every boolean setting and the mutation it maps to.
pub const SETTING_FLAGS: [SettingFlag; 6] = [
    SettingFlag {
        name: "setRequireDestTag",
        enabled: |s| s.set_require_dest_tag,
        mutation: FlagMutation::TxFlag(flags::TF_REQUIRE_DEST_TAG),
    },
    SettingFlag {
        name: "setRequireAuth",
        enabled: |s| s.set_require_auth,
        mutation: FlagMutation::TxFlag(flags::TF_REQUIRE_AUTH),
    },
    SettingFlag {
        name: "setDisallowXRP",
        enabled: |s| s.set_disallow_xrp,
        mutation: FlagMutation::TxFlag(flags::TF_DISALLOW_XRP),
    },
    SettingFlag {
        name: "setAsfRequireAuth",
        enabled: |s| s.set_asf_require_auth,
        mutation: FlagMutation::AccountFlag(AccountSetFlag::RequireAuth),
    },
    SettingFlag {
        name: "setAsfDefaultRipple",
        enabled: |s| s.set_asf_default_ripple,
        mutation: FlagMutation::AccountFlag(AccountSetFlag::DefaultRipple),
    },
    SettingFlag {
        name: "setAsfAllowTrustLineClawback",
        enabled: |s| s.set_asf_allow_trust_line_clawback,
        mutation: FlagMutation::AccountFlag(AccountSetFlag::AllowTrustLineClawback),
    },
];

/// Hex-encodes a domain unless every character is already a hex digit.
///
/// Encoding is over the UTF-8 bytes, so a non-ASCII character takes more
/// than two hex digits.
pub fn encode_domain(domain: &str) -> String {
    if domain.chars().all(|c| c.is_ascii_hexdigit()) {
        domain.to_string()
    } else {
        hex::encode(domain.as_bytes())
    }
}

/// Raw `Domain` bytes, or `None` for an empty domain.
fn domain_bytes(domain: &str) -> Result<Option<Vec<u8>>, ServiceError> {
    let domain = domain.trim();
    if domain.is_empty() {
        return Ok(None);
    }
    let bytes = hex::decode(encode_domain(domain))
        .map_err(|e| ServiceError::Validation(format!("domain is not valid hex: {e}")))?;
    if bytes.len() > MAX_DOMAIN_BYTES {
        return Err(ServiceError::Validation(format!(
            "domain is {} bytes; the ledger allows {MAX_DOMAIN_BYTES}",
            bytes.len()
        )));
    }
    Ok(Some(bytes))
}

/// Normalizes a transfer rate to the ledger's representation.
///
/// Values below `1_000_000_000` are read as a fee in billionths and added to
/// the no-fee base; larger values are taken as a full rate. 0 means unset.
pub fn ledger_transfer_rate(rate: u32) -> Result<Option<u32>, ServiceError> {
    let full = match rate {
        0 => return Ok(None),
        r if r < TRANSFER_RATE_BASE => TRANSFER_RATE_BASE + r,
        r => r,
    };
    if full > MAX_TRANSFER_RATE {
        return Err(ServiceError::Validation(format!(
            "transfer rate {rate} exceeds the maximum {MAX_TRANSFER_RATE}"
        )));
    }
    Ok(Some(full))
}

fn tick_size(size: u8) -> Result<Option<u8>, ServiceError> {
    match size {
        0 => Ok(None),
        s if TICK_SIZE_RANGE.contains(&s) => Ok(Some(s)),
        s => Err(ServiceError::Validation(format!(
            "tick size {s} must be 0 or between {} and {}",
            TICK_SIZE_RANGE.start(),
            TICK_SIZE_RANGE.end()
        ))),
    }
}

/// Builds the `AccountSet` for `settings`.
pub fn build_account_set(
    account: &Address,
    settings: &AccountSettings,
) -> Result<Transaction, ServiceError> {
    let mut tx_flags = 0u32;
    let mut account_flags = Vec::new();
    for flag in SETTING_FLAGS.iter().filter(|f| (f.enabled)(settings)) {
        match flag.mutation {
            FlagMutation::TxFlag(bits) => tx_flags |= bits,
            FlagMutation::AccountFlag(asf) => account_flags.push((flag.name, asf)),
        }
    }
    if account_flags.len() > 1 {
        let names: Vec<&str> = account_flags.iter().map(|(name, _)| *name).collect();
        return Err(ServiceError::Validation(format!(
            "an AccountSet carries one account flag; got {}",
            names.join(", ")
        )));
    }

    let fields = AccountSetFields {
        domain: domain_bytes(&settings.domain)?,
        transfer_rate: ledger_transfer_rate(settings.transfer_rate)?,
        tick_size: tick_size(settings.tick_size)?,
        set_flag: account_flags.first().map(|(_, asf)| *asf),
        clear_flag: None,
    };
    let mut tx = Transaction::account_set(account.clone(), fields);
    tx.set_flag_bits(tx_flags);
    Ok(tx)
}

// ---------------------------------------------------------------------------
// Transfers
// ---------------------------------------------------------------------------

fn parse_decimal(value: &str) -> Result<Decimal, ServiceError> {
    let value = value.trim();
    Decimal::from_str(value)
        .or_else(|_| Decimal::from_scientific(value))
        .map_err(|_| ServiceError::Validation(format!("invalid amount: {value}")))
}

/// Most the sender must be willing to spend so the receiver gets `amount`
/// after the issuer's transfer fee: `ceil(amount * rate / 1e9)`.
///
/// No rate (or 0) returns `amount` unchanged. `amount` must be a valid
/// issued-currency value either way.
pub fn compute_send_max(amount: &str, transfer_rate: Option<u32>) -> Result<String, ServiceError> {
    IouValue::parse(amount)?;
    let Some(rate) = transfer_rate.map(ledger_transfer_rate).transpose()?.flatten() else {
        return Ok(amount.trim().to_string());
    };
    let value = parse_decimal(amount)?;
    let send_max = value
        .checked_mul(Decimal::from(rate))
        .and_then(|v| v.checked_div(Decimal::from(TRANSFER_RATE_BASE)))
        .ok_or_else(|| {
            ServiceError::Validation(format!(
                "amount {} is too large to apply a transfer rate",
                amount.trim()
            ))
        })?
        .ceil();
    Ok(send_max.normalize().to_string())
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrustLineOptions {
    pub issuer_address: Address,
    pub token_name: String,
    /// Trust limit.
    pub amount: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransferTokenOptions {
    pub receiver_address: Address,
    pub issuer_address: Address,
    pub token_name: String,
    pub amount: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub send_max: Option<String>,
}

// ---------------------------------------------------------------------------
// Read models
// ---------------------------------------------------------------------------

/// One token an account holds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenBalance {
    pub token_name: String,
    pub issuer: String,
    pub balance: String,
    pub limit_amount: String,
}

impl From<TrustLine> for TokenBalance {
    fn from(line: TrustLine) -> Self {
        Self {
            token_name: Currency::display_name(&line.currency),
            issuer: line.account,
            balance: line.balance,
            limit_amount: line.limit,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrustLinesResponse {
    pub account: String,
    pub lines: Vec<TrustLine>,
    /// Whether the data came from a validated ledger.
    pub validated: bool,
}

// ---------------------------------------------------------------------------
// Service
// ---------------------------------------------------------------------------

pub struct TokenService {
    client: Box<dyn LedgerClient>,
}

impl TokenService {
    pub fn new(client: Box<dyn LedgerClient>) -> Self {
        Self { client }
    }

    /// Opens a ledger session for this service.
    pub async fn connect(connector: &dyn LedgerConnector) -> Result<Self, ServiceError> {
        let client = connector.connect().await.map_err(ServiceError::connection)?;
        Ok(Self::new(client))
    }

    /// Autofills, signs, submits, and waits. Returns the transaction hash.
    async fn submit(
        &self,
        operation: &'static str,
        wallet: &Wallet,
        mut tx: Transaction,
    ) -> Result<String, ServiceError> {
        self.client
            .autofill(&mut tx)
            .await
            .map_err(|e| ServiceError::submission("autofill", e))?;
        let signed = sign_transaction(wallet, &tx).map_err(|e| ServiceError::submission("sign", e))?;
        debug!(operation, hash = %signed.hash, "signed transaction");

        let outcome = self
            .client
            .submit_and_wait(&signed)
            .await
            .map_err(|e| ServiceError::submission("submit", e))?;

        if !outcome.validated {
            return Err(ServiceError::Unvalidated {
                operation,
                hash: outcome.hash,
            });
        }
        if !outcome.succeeded() {
            return Err(ServiceError::TransactionFailed {
                hash: outcome.hash,
                result: outcome.result,
            });
        }

        info!(operation, account = %wallet.address(), hash = %outcome.hash, "transaction validated");
        Ok(outcome.hash)
    }

    pub async fn configure_account(
        &self,
        wallet: &Wallet,
        settings: &AccountSettings,
    ) -> Result<String, ServiceError> {
        let tx = build_account_set(wallet.address(), settings)?;
        self.submit("AccountSet", wallet, tx).await
    }

    /// Configures an issuing account; defaults to default-ripple.
    pub async fn configure_issuer(
        &self,
        wallet: &Wallet,
        settings: Option<AccountSettings>,
    ) -> Result<String, ServiceError> {
        let settings = settings.unwrap_or_else(AccountSettings::issuer_default);
        self.configure_account(wallet, &settings).await
    }

    /// Configures a distributing account; defaults to require-auth.
    ///
    /// Transfer rate and tick size only matter on the issuer and are ignored.
    pub async fn configure_distributor(
        &self,
        wallet: &Wallet,
        settings: Option<AccountSettings>,
    ) -> Result<String, ServiceError> {
        let settings = AccountSettings {
            transfer_rate: 0,
            tick_size: 0,
            ..settings.unwrap_or_else(AccountSettings::distributor_default)
        };
        self.configure_account(wallet, &settings).await
    }

    pub async fn create_trust_line(
        &self,
        wallet: &Wallet,
        options: Option<&TrustLineOptions>,
    ) -> Result<String, ServiceError> {
        let options = options
            .ok_or_else(|| ServiceError::Validation("trust line options are required".into()))?;
        let currency = Currency::parse(&options.token_name)?;
        let limit = IssuedAmount::new(currency, options.issuer_address.clone(), &options.amount)?;
        if limit.iou_value()?.negative {
            return Err(ServiceError::Validation("trust limit cannot be negative".into()));
        }

        info!(
            account = %wallet.address(),
            issuer = %options.issuer_address,
            token = %currency,
            limit = %options.amount,
            "creating trust line"
        );
        let tx = Transaction::trust_set(wallet.address().clone(), limit);
        self.submit("TrustSet", wallet, tx).await
    }

    /// Current limit `wallet` has set on its line to `counterparty`.
    async fn current_limit(
        &self,
        holder: &Address,
        counterparty: &Address,
        currency: &Currency,
    ) -> Result<Option<String>, ServiceError> {
        let lines = self
            .client
            .account_lines(holder)
            .await
            .map_err(ServiceError::query)?;
        let code = currency.code();
        Ok(lines
            .lines
            .into_iter()
            .find(|line| line.account == counterparty.as_str() && line.currency == code)
            .map(|line| line.limit))
    }

    /// Sets or clears the freeze flag on the line between `wallet` and
    /// `counterparty`, keeping the limit the wallet already has on it.
    pub async fn set_trust_line_freeze(
        &self,
        wallet: &Wallet,
        counterparty: &Address,
        token: &str,
        frozen: bool,
    ) -> Result<String, ServiceError> {
        let currency = Currency::parse(token)?;
        let limit = self
            .current_limit(wallet.address(), counterparty, &currency)
            .await?
            .unwrap_or_else(|| PLACEHOLDER_LIMIT.to_string());

        let amount = IssuedAmount::new(currency, counterparty.clone(), &limit)?;
        let mut tx = Transaction::trust_set(wallet.address().clone(), amount);
        tx.set_flag_bits(if frozen {
            flags::TF_SET_FREEZE
        } else {
            flags::TF_CLEAR_FREEZE
        });

        info!(
            account = %wallet.address(),
            counterparty = %counterparty,
            token = %currency,
            frozen,
            %limit,
            "updating trust line freeze"
        );
        self.submit("TrustSet", wallet, tx).await
    }

    pub async fn freeze_trust_line(
        &self,
        wallet: &Wallet,
        counterparty: &Address,
        token: &str,
    ) -> Result<String, ServiceError> {
        self.set_trust_line_freeze(wallet, counterparty, token, true)
            .await
    }

    pub async fn unfreeze_trust_line(
        &self,
        wallet: &Wallet,
        counterparty: &Address,
        token: &str,
    ) -> Result<String, ServiceError> {
        self.set_trust_line_freeze(wallet, counterparty, token, false)
            .await
    }

    pub async fn transfer_token(
        &self,
        wallet: &Wallet,
        options: &TransferTokenOptions,
    ) -> Result<String, ServiceError> {
        let currency = Currency::parse(&options.token_name)?;
        let issuer = options.issuer_address.clone();
        let amount = IssuedAmount::new(currency, issuer.clone(), &options.amount)?;
        let value = amount.iou_value()?;
        if value.negative || value.is_zero() {
            return Err(ServiceError::Validation("transfer amount must be positive".into()));
        }

        let send_max = match options.send_max.as_deref().map(str::trim) {
            Some(max) if !max.is_empty() => {
                Some(Amount::Issued(IssuedAmount::new(currency, issuer, max)?))
            }
            _ => None,
        };

        info!(
            sender = %wallet.address(),
            receiver = %options.receiver_address,
            token = %currency,
            amount = %options.amount,
            send_max = ?options.send_max,
            "transferring token"
        );
        let tx = Transaction::payment(
            wallet.address().clone(),
            options.receiver_address.clone(),
            Amount::Issued(amount),
            send_max,
        );
        self.submit("Payment", wallet, tx).await
    }

    /// Simplified `{name, issuer, balance, limit}` view of every line.
    pub async fn get_token_balances(
        &self,
        holder: &Address,
    ) -> Result<Vec<TokenBalance>, ServiceError> {
        let lines = self
            .client
            .account_lines(holder)
            .await
            .map_err(ServiceError::query)?;
        Ok(lines.lines.into_iter().map(TokenBalance::from).collect())
    }

    pub async fn get_all_trust_lines(
        &self,
        holder: &Address,
    ) -> Result<TrustLinesResponse, ServiceError> {
        let lines = self
            .client
            .account_lines(holder)
            .await
            .map_err(ServiceError::query)?;
        Ok(TrustLinesResponse {
            account: lines.account,
            lines: lines.lines,
            validated: lines.validated,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ledger::{AccountInfo, AccountLines, LedgerError, SubmitOutcome};
    use crate::transaction::{SignedTransaction, TransactionKind};
    use async_trait::async_trait;
    use parking_lot::Mutex;
    use std::sync::Arc;

    /// Ledger that records submissions and answers from a script.
    #[derive(Clone)]
    struct Scripted {
        lines: Vec<TrustLine>,
        validated: bool,
        result: &'static str,
        submitted: Arc<Mutex<Vec<Transaction>>>,
    }

    impl Scripted {
        fn new() -> Self {
            Self {
                lines: Vec::new(),
                validated: true,
                result: "tesSUCCESS",
                submitted: Arc::new(Mutex::new(Vec::new())),
            }
        }

        fn service(&self) -> TokenService {
            TokenService::new(Box::new(self.clone()))
        }

        fn last(&self) -> Transaction {
            self.submitted.lock().last().cloned().expect("nothing submitted")
        }
    }

    #[async_trait]
    impl LedgerClient for Scripted {
        async fn autofill(&self, tx: &mut Transaction) -> Result<(), LedgerError> {
            tx.sequence = Some(1);
            tx.fee = Some(10);
            tx.last_ledger_sequence = Some(100);
            Ok(())
        }

        async fn submit_and_wait(
            &self,
            signed: &SignedTransaction,
        ) -> Result<SubmitOutcome, LedgerError> {
            self.submitted.lock().push(signed.transaction.clone());
            Ok(SubmitOutcome {
                hash: signed.hash.clone(),
                validated: self.validated,
                result: self.result.to_string(),
            })
        }

        async fn account_info(&self, _address: &Address) -> Result<AccountInfo, LedgerError> {
            Ok(AccountInfo {
                balance_drops: 0,
                sequence: 1,
            })
        }

        async fn account_lines(&self, address: &Address) -> Result<AccountLines, LedgerError> {
            Ok(AccountLines {
                account: address.to_string(),
                lines: self.lines.clone(),
                validated: true,
            })
        }
    }

    fn account_set_fields(tx: &Transaction) -> &AccountSetFields {
        match &tx.kind {
            TransactionKind::AccountSet(fields) => fields,
            other => panic!("expected AccountSet, got {other:?}"),
        }
    }

    fn trust_limit(tx: &Transaction) -> &IssuedAmount {
        match &tx.kind {
            TransactionKind::TrustSet(fields) => &fields.limit_amount,
            other => panic!("expected TrustSet, got {other:?}"),
        }
    }

    // -- pure helpers --------------------------------------------------------

    #[test]
    fn encode_domain_hex_is_unchanged() {
        for domain in ["6578616D706C652E636F6D", "abcdef", "0123456789ABCDEF"] {
            assert_eq!(encode_domain(domain), domain);
        }
    }

    #[test]
    fn encode_domain_text_is_hex_encoded() {
        let encoded = encode_domain("example.com");
        assert_eq!(encoded, "6578616d706c652e636f6d");
        assert_eq!(encoded.len(), 2 * "example.com".len());
    }

    #[test]
    fn encode_domain_non_ascii_uses_utf8_bytes() {
        // "é" is two UTF-8 bytes, so four hex digits.
        let encoded = encode_domain("café.example");
        assert_eq!(encoded, hex::encode("café.example".as_bytes()));
        assert_eq!(encoded.len(), 2 * "café.example".len());
        assert_eq!(encoded.len(), 2 * "café.example".chars().count() + 2);
    }

    #[test]
    fn domain_bytes_rules() {
        assert_eq!(domain_bytes("").unwrap(), None);
        assert_eq!(domain_bytes("6162").unwrap(), Some(b"ab".to_vec()));
        assert!(domain_bytes("abc").is_err());
        assert!(domain_bytes(&"x".repeat(MAX_DOMAIN_BYTES + 1)).is_err());
    }

    #[test]
    fn send_max_covers_transfer_fee() {
        assert_eq!(compute_send_max("1000", Some(1_005_000_000)).unwrap(), "1005");
        assert_eq!(compute_send_max("1000", Some(5_000_000)).unwrap(), "1005");
        assert_eq!(compute_send_max("1000", Some(0)).unwrap(), "1000");
        assert_eq!(compute_send_max("1000", None).unwrap(), "1000");
        assert_eq!(compute_send_max("10", Some(1_002_000_000)).unwrap(), "11");
        assert!(compute_send_max("ten", Some(1_002_000_000)).is_err());
        assert!(compute_send_max("ten", None).is_err());
    }

    #[test]
    fn send_max_for_huge_amount_is_rejected_not_overflowed() {
        let err = compute_send_max("1e25", Some(1_005_000_000)).unwrap_err();
        assert!(matches!(err, ServiceError::Validation(_)));
        assert!(err.to_string().contains("too large"));

        // Without a rate the amount passes through untouched.
        assert_eq!(compute_send_max("1e25", None).unwrap(), "1e25");
        assert!(compute_send_max("1e200", Some(1_005_000_000)).is_err());
    }

    #[test]
    fn transfer_rate_normalization() {
        assert_eq!(ledger_transfer_rate(0).unwrap(), None);
        assert_eq!(ledger_transfer_rate(2_000_000).unwrap(), Some(1_002_000_000));
        assert_eq!(ledger_transfer_rate(1_500_000_000).unwrap(), Some(1_500_000_000));
        assert!(ledger_transfer_rate(2_000_000_001).is_err());
    }

    #[test]
    fn tick_size_range() {
        assert_eq!(tick_size(0).unwrap(), None);
        assert_eq!(tick_size(5).unwrap(), Some(5));
        assert!(tick_size(2).is_err());
        assert!(tick_size(16).is_err());
    }

    #[test]
    fn settings_from_web_json() {
        let settings: AccountSettings = serde_json::from_str(
            r#"{"domain":"example.com","transferRate":5,"setDisallowXRP":true,"setAsfDefaultRipple":true}"#,
        )
        .unwrap();
        assert_eq!(settings.transfer_rate, 5);
        assert!(settings.set_disallow_xrp);
        assert!(settings.set_asf_default_ripple);
        assert!(!settings.set_require_auth);
    }

    #[test]
    fn flag_fan_out() {
        let account = Address::from_account_id([1; 20]);
        let settings = AccountSettings {
            set_require_dest_tag: true,
            set_disallow_xrp: true,
            set_asf_allow_trust_line_clawback: true,
            ..Default::default()
        };
        let tx = build_account_set(&account, &settings).unwrap();
        assert!(tx.has_flag(flags::TF_REQUIRE_DEST_TAG));
        assert!(tx.has_flag(flags::TF_DISALLOW_XRP));
        assert!(!tx.has_flag(flags::TF_REQUIRE_AUTH));
        assert_eq!(
            account_set_fields(&tx).set_flag,
            Some(AccountSetFlag::AllowTrustLineClawback)
        );
    }

    #[test]
    fn two_account_flags_rejected() {
        let account = Address::from_account_id([1; 20]);
        let settings = AccountSettings {
            set_asf_require_auth: true,
            set_asf_default_ripple: true,
            ..Default::default()
        };
        let err = build_account_set(&account, &settings).unwrap_err();
        assert!(matches!(err, ServiceError::Validation(ref m) if m.contains("setAsfRequireAuth")));
    }

    // -- service -------------------------------------------------------------

    #[tokio::test]
    async fn configure_issuer_defaults() {
        let ledger = Scripted::new();
        let wallet = Wallet::generate();
        let hash = ledger.service().configure_issuer(&wallet, None).await.unwrap();
        assert_eq!(hash.len(), 64);

        let tx = ledger.last();
        let fields = account_set_fields(&tx);
        assert_eq!(fields.set_flag, Some(AccountSetFlag::DefaultRipple));
        assert_eq!(fields.domain.as_deref(), Some(&b"example.com"[..]));
        assert_eq!(fields.transfer_rate, None);
    }

    #[tokio::test]
    async fn configure_distributor_drops_issuer_fields() {
        let ledger = Scripted::new();
        let wallet = Wallet::generate();
        let settings = AccountSettings {
            transfer_rate: 1_000_000,
            tick_size: 5,
            set_asf_require_auth: true,
            ..Default::default()
        };
        ledger
            .service()
            .configure_distributor(&wallet, Some(settings))
            .await
            .unwrap();

        let tx = ledger.last();
        let fields = account_set_fields(&tx);
        assert_eq!(fields.set_flag, Some(AccountSetFlag::RequireAuth));
        assert_eq!(fields.transfer_rate, None);
        assert_eq!(fields.tick_size, None);
    }

    #[tokio::test]
    async fn configure_distributor_defaults() {
        let ledger = Scripted::new();
        let wallet = Wallet::generate();
        ledger.service().configure_distributor(&wallet, None).await.unwrap();
        assert_eq!(
            account_set_fields(&ledger.last()).set_flag,
            Some(AccountSetFlag::RequireAuth)
        );
    }

    #[tokio::test]
    async fn unvalidated_is_an_error() {
        let mut ledger = Scripted::new();
        ledger.validated = false;
        let wallet = Wallet::generate();
        let err = ledger.service().configure_issuer(&wallet, None).await.unwrap_err();
        assert!(matches!(err, ServiceError::Unvalidated { operation: "AccountSet", .. }));
    }

    #[tokio::test]
    async fn failed_result_is_an_error() {
        let mut ledger = Scripted::new();
        ledger.result = "tecNO_PERMISSION";
        let wallet = Wallet::generate();
        let err = ledger.service().configure_issuer(&wallet, None).await.unwrap_err();
        assert!(matches!(err, ServiceError::TransactionFailed { ref result, .. } if result == "tecNO_PERMISSION"));
    }

    #[tokio::test]
    async fn create_trust_line_requires_options() {
        let ledger = Scripted::new();
        let wallet = Wallet::generate();
        let err = ledger.service().create_trust_line(&wallet, None).await.unwrap_err();
        assert!(matches!(err, ServiceError::Validation(_)));
        assert!(ledger.submitted.lock().is_empty());
    }

    #[tokio::test]
    async fn create_trust_line_sets_limit() {
        let ledger = Scripted::new();
        let wallet = Wallet::generate();
        let issuer = Address::from_account_id([7; 20]);
        let options = TrustLineOptions {
            issuer_address: issuer.clone(),
            token_name: "FOO".into(),
            amount: "1000000".into(),
        };
        ledger
            .service()
            .create_trust_line(&wallet, Some(&options))
            .await
            .unwrap();

        let tx = ledger.last();
        let limit = trust_limit(&tx);
        assert_eq!(limit.issuer, issuer);
        assert_eq!(limit.value(), "1000000");
        assert_eq!(limit.currency, Currency::parse("FOO").unwrap());
    }

    #[tokio::test]
    async fn freeze_and_unfreeze_keep_existing_limit() {
        let counterparty = Address::from_account_id([8; 20]);
        let mut ledger = Scripted::new();
        ledger.lines = vec![TrustLine {
            account: counterparty.to_string(),
            currency: "FOO".into(),
            limit: "500".into(),
            balance: "20".into(),
            ..Default::default()
        }];
        let wallet = Wallet::generate();
        let service = ledger.service();

        service.freeze_trust_line(&wallet, &counterparty, "FOO").await.unwrap();
        let frozen = ledger.last();
        assert!(frozen.has_flag(flags::TF_SET_FREEZE));
        assert!(!frozen.has_flag(flags::TF_CLEAR_FREEZE));
        assert_eq!(trust_limit(&frozen).value(), "500");

        service.unfreeze_trust_line(&wallet, &counterparty, "FOO").await.unwrap();
        let thawed = ledger.last();
        assert!(thawed.has_flag(flags::TF_CLEAR_FREEZE));
        assert!(!thawed.has_flag(flags::TF_SET_FREEZE));
        assert_eq!(trust_limit(&thawed).value(), "500");
    }

    #[tokio::test]
    async fn freeze_without_line_uses_placeholder() {
        let ledger = Scripted::new();
        let wallet = Wallet::generate();
        let counterparty = Address::from_account_id([8; 20]);
        ledger
            .service()
            .freeze_trust_line(&wallet, &counterparty, "FOO")
            .await
            .unwrap();
        assert_eq!(trust_limit(&ledger.last()).value(), PLACEHOLDER_LIMIT);
    }

    #[tokio::test]
    async fn transfer_token_with_send_max() {
        let ledger = Scripted::new();
        let wallet = Wallet::generate();
        let options = TransferTokenOptions {
            receiver_address: Address::from_account_id([2; 20]),
            issuer_address: Address::from_account_id([3; 20]),
            token_name: "FOO".into(),
            amount: "1000".into(),
            send_max: Some(compute_send_max("1000", Some(1_005_000_000)).unwrap()),
        };
        ledger.service().transfer_token(&wallet, &options).await.unwrap();

        match ledger.last().kind {
            TransactionKind::Payment(payment) => {
                assert_eq!(payment.destination, options.receiver_address);
                match payment.send_max {
                    Some(Amount::Issued(max)) => assert_eq!(max.value(), "1005"),
                    other => panic!("unexpected send_max {other:?}"),
                }
            }
            other => panic!("expected Payment, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn transfer_rejects_non_positive_amount() {
        let ledger = Scripted::new();
        let wallet = Wallet::generate();
        let options = TransferTokenOptions {
            receiver_address: Address::from_account_id([2; 20]),
            issuer_address: Address::from_account_id([3; 20]),
            token_name: "FOO".into(),
            amount: "0".into(),
            send_max: None,
        };
        let err = ledger.service().transfer_token(&wallet, &options).await.unwrap_err();
        assert!(matches!(err, ServiceError::Validation(_)));
    }

    #[tokio::test]
    async fn empty_collections_are_not_null() {
        let ledger = Scripted::new();
        let holder = Address::from_account_id([4; 20]);
        let service = ledger.service();

        let balances = service.get_token_balances(&holder).await.unwrap();
        assert!(balances.is_empty());
        assert_eq!(serde_json::to_string(&balances).unwrap(), "[]");

        let lines = service.get_all_trust_lines(&holder).await.unwrap();
        assert!(lines.lines.is_empty());
        let json = serde_json::to_value(&lines).unwrap();
        assert_eq!(json["lines"], serde_json::json!([]));
    }

    #[tokio::test]
    async fn token_balances_decode_custom_codes() {
        let mut ledger = Scripted::new();
        ledger.lines = vec![TrustLine {
            account: "rIssuer".into(),
            currency: Currency::parse("GOLDCOIN").unwrap().code(),
            balance: "12.5".into(),
            limit: "100".into(),
            ..Default::default()
        }];
        let balances = ledger
            .service()
            .get_token_balances(&Address::from_account_id([4; 20]))
            .await
            .unwrap();
        assert_eq!(
            balances,
            vec![TokenBalance {
                token_name: "GOLDCOIN".into(),
                issuer: "rIssuer".into(),
                balance: "12.5".into(),
                limit_amount: "100".into(),
            }]
        );
    }
}
