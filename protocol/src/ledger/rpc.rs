//! rippled JSON-RPC client.
//!
//! Every call is `POST {"method": m, "params": [p]}`; the node answers with
//! `{"result": {...}}` where `result.status == "error"` marks a failure.
//! Response parsing is split into plain functions so it can be tested
//! against canned payloads.

use async_trait::async_trait;
use serde_json::{json, Value};
use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, info, warn};

use super::{
    AccountInfo, AccountLines, LedgerClient, LedgerConnector, LedgerError, SubmitOutcome, TrustLine,
};
use crate::config::{
    LedgerConfig, HTTP_REQUEST_TIMEOUT, LAST_LEDGER_OFFSET, LEGACY_NETWORK_ID_LIMIT, MAX_FEE_DROPS,
    SUBMIT_POLL_INTERVAL,
};
use crate::transaction::{Address, SignedTransaction, Transaction};

/// Preliminary result classes that can never succeed later.
const FINAL_REJECTION_PREFIXES: [&str; 3] = ["tem", "tef", "tel"];

/// `tx` error while the transaction is not yet known to the node.
const TX_NOT_FOUND: &str = "txnNotFound";

pub struct JsonRpcClient {
    http: reqwest::Client,
    url: String,
    submit_timeout: Duration,
    network_id: Option<u32>,
}

impl JsonRpcClient {
    pub fn new(config: &LedgerConfig) -> Result<Self, LedgerError> {
        let http = reqwest::Client::builder()
            .timeout(HTTP_REQUEST_TIMEOUT)
            .build()
            .map_err(|e| LedgerError::Transport(e.to_string()))?;
        Ok(Self {
            http,
            url: config.node_url.clone(),
            submit_timeout: config.submit_timeout,
            network_id: None,
        })
    }

    pub fn node_url(&self) -> &str {
        &self.url
    }

    async fn call(&self, method: &str, params: Value) -> Result<Value, LedgerError> {
        let body = json!({ "method": method, "params": [params] });
        let response = self
            .http
            .post(&self.url)
            .json(&body)
            .send()
            .await
            .map_err(|e| LedgerError::Transport(e.to_string()))?;

        if !response.status().is_success() {
            return Err(LedgerError::Transport(format!(
                "{method}: HTTP {}",
                response.status()
            )));
        }

        let payload: Value = response
            .json()
            .await
            .map_err(|e| LedgerError::malformed(method, e.to_string()))?;
        extract_result(method, payload)
    }

    /// Pings `server_info` and records the network id.
    async fn handshake(&mut self) -> Result<(), LedgerError> {
        let result = self.call("server_info", json!({})).await?;
        self.network_id = parse_network_id(&result);
        debug!(url = %self.url, network_id = ?self.network_id, "ledger session opened");
        Ok(())
    }

    async fn current_ledger_index(&self) -> Result<u32, LedgerError> {
        let result = self.call("ledger_current", json!({})).await?;
        parse_u32(&result, "ledger_current", "ledger_current_index")
    }

    async fn validated_ledger_index(&self) -> Result<u32, LedgerError> {
        let result = self
            .call("ledger", json!({ "ledger_index": "validated" }))
            .await?;
        parse_u32(&result, "ledger", "ledger_index")
    }

    async fn open_ledger_fee(&self) -> Result<u64, LedgerError> {
        let result = self.call("fee", json!({})).await?;
        parse_fee(&result)
    }

    async fn poll_until_final(
        &self,
        hash: &str,
        last_ledger_sequence: Option<u32>,
    ) -> Result<SubmitOutcome, LedgerError> {
        let deadline = Instant::now() + self.submit_timeout;
        loop {
            tokio::time::sleep(SUBMIT_POLL_INTERVAL).await;

            match self.call("tx", json!({ "transaction": hash })).await {
                Ok(result) => {
                    let status = parse_tx_status(&result);
                    if status.validated {
                        return Ok(SubmitOutcome {
                            hash: hash.to_string(),
                            validated: true,
                            result: status.result.unwrap_or_default(),
                        });
                    }
                }
                Err(LedgerError::Rpc { error, .. }) if error == TX_NOT_FOUND => {}
                Err(e) => return Err(e),
            }

            if let Some(last) = last_ledger_sequence {
                if self.validated_ledger_index().await? > last {
                    warn!(hash, last_ledger_sequence = last, "transaction expired unvalidated");
                    return Ok(SubmitOutcome::unvalidated(hash));
                }
            }
            if Instant::now() >= deadline {
                warn!(hash, "timed out waiting for validation");
                return Ok(SubmitOutcome::unvalidated(hash));
            }
        }
    }
}

impl SubmitOutcome {
    fn unvalidated(hash: &str) -> Self {
        Self {
            hash: hash.to_string(),
            validated: false,
            result: String::new(),
        }
    }
}

impl Drop for JsonRpcClient {
    fn drop(&mut self) {
        debug!(url = %self.url, "ledger session closed");
    }
}

#[async_trait]
impl LedgerClient for JsonRpcClient {
    async fn autofill(&self, tx: &mut Transaction) -> Result<(), LedgerError> {
        if tx.sequence.is_none() {
            tx.sequence = Some(self.account_info(&tx.account).await?.sequence);
        }
        if tx.fee.is_none() {
            tx.fee = Some(self.open_ledger_fee().await?);
        }
        if tx.last_ledger_sequence.is_none() {
            let current = self.current_ledger_index().await?;
            tx.last_ledger_sequence = Some(current + LAST_LEDGER_OFFSET);
        }
        if tx.network_id.is_none() {
            tx.network_id = self.network_id.filter(|id| *id > LEGACY_NETWORK_ID_LIMIT);
        }
        Ok(())
    }

    async fn submit_and_wait(
        &self,
        signed: &SignedTransaction,
    ) -> Result<SubmitOutcome, LedgerError> {
        let result = self
            .call("submit", json!({ "tx_blob": signed.tx_blob }))
            .await?;
        let preliminary = parse_submit(&result)?;
        info!(hash = %signed.hash, result = %preliminary, "transaction submitted");

        self.poll_until_final(&signed.hash, signed.transaction.last_ledger_sequence)
            .await
    }

    async fn account_info(&self, address: &Address) -> Result<AccountInfo, LedgerError> {
        let result = self
            .call(
                "account_info",
                json!({ "account": address.as_str(), "ledger_index": "current" }),
            )
            .await?;
        parse_account_info(&result)
    }

    async fn account_lines(&self, address: &Address) -> Result<AccountLines, LedgerError> {
        let mut lines = Vec::new();
        let mut marker: Option<Value> = None;
        let mut validated;

        loop {
            let mut params = json!({ "account": address.as_str(), "ledger_index": "validated" });
            if let Some(m) = marker.take() {
                params["marker"] = m;
            }
            let page = parse_account_lines_page(&self.call("account_lines", params).await?)?;
            lines.extend(page.lines);
            validated = page.validated;
            match page.marker {
                Some(m) => marker = Some(m),
                None => break,
            }
        }

        Ok(AccountLines {
            account: address.to_string(),
            lines,
            validated,
        })
    }
}

/// Connects a fresh [`JsonRpcClient`] per call.
#[derive(Debug, Clone)]
pub struct RpcConnector {
    config: LedgerConfig,
}

impl RpcConnector {
    pub fn new(config: LedgerConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &LedgerConfig {
        &self.config
    }
}

#[async_trait]
impl LedgerConnector for RpcConnector {
    async fn connect(&self) -> Result<Box<dyn LedgerClient>, LedgerError> {
        let mut client = JsonRpcClient::new(&self.config)?;
        client.handshake().await?;
        Ok(Box::new(client))
    }
}

// ---------------------------------------------------------------------------
// Response parsing
// ---------------------------------------------------------------------------

fn extract_result(method: &str, payload: Value) -> Result<Value, LedgerError> {
    let result = match payload {
        Value::Object(mut map) => map
            .remove("result")
            .ok_or_else(|| LedgerError::malformed(method, "missing result"))?,
        _ => return Err(LedgerError::malformed(method, "not a JSON object")),
    };

    if result.get("status").and_then(Value::as_str) == Some("error") {
        let text = |key: &str| {
            result
                .get(key)
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string()
        };
        return Err(LedgerError::Rpc {
            method: method.to_string(),
            error: text("error"),
            message: text("error_message"),
        });
    }
    Ok(result)
}

/// Reads a number that the node may send either as JSON number or string.
fn parse_u64_field(value: &Value, method: &str, field: &str) -> Result<u64, LedgerError> {
    match value.get(field) {
        Some(Value::Number(n)) => n
            .as_u64()
            .ok_or_else(|| LedgerError::malformed(method, format!("{field} is not unsigned"))),
        Some(Value::String(s)) => s
            .parse()
            .map_err(|_| LedgerError::malformed(method, format!("{field} is not numeric: {s}"))),
        _ => Err(LedgerError::malformed(method, format!("missing {field}"))),
    }
}

fn parse_u32(value: &Value, method: &str, field: &str) -> Result<u32, LedgerError> {
    let n = parse_u64_field(value, method, field)?;
    u32::try_from(n).map_err(|_| LedgerError::malformed(method, format!("{field} out of range")))
}

fn parse_network_id(server_info: &Value) -> Option<u32> {
    server_info
        .get("info")
        .and_then(|info| info.get("network_id"))
        .and_then(Value::as_u64)
        .and_then(|id| u32::try_from(id).ok())
}

fn parse_account_info(result: &Value) -> Result<AccountInfo, LedgerError> {
    let data = result
        .get("account_data")
        .ok_or_else(|| LedgerError::malformed("account_info", "missing account_data"))?;
    Ok(AccountInfo {
        balance_drops: parse_u64_field(data, "account_info", "Balance")?,
        sequence: parse_u32(data, "account_info", "Sequence")?,
    })
}

/// Open-ledger fee in drops: the larger of base and open-ledger fee, capped.
fn parse_fee(result: &Value) -> Result<u64, LedgerError> {
    let drops = result
        .get("drops")
        .ok_or_else(|| LedgerError::malformed("fee", "missing drops"))?;
    let base = parse_u64_field(drops, "fee", "base_fee")?;
    let open = parse_u64_field(drops, "fee", "open_ledger_fee").unwrap_or(base);
    Ok(base.max(open).min(MAX_FEE_DROPS))
}

/// Returns the preliminary engine result, or an error for results that
/// are final failures.
fn parse_submit(result: &Value) -> Result<String, LedgerError> {
    let engine_result = result
        .get("engine_result")
        .and_then(Value::as_str)
        .ok_or_else(|| LedgerError::malformed("submit", "missing engine_result"))?
        .to_string();

    if FINAL_REJECTION_PREFIXES
        .iter()
        .any(|p| engine_result.starts_with(p))
    {
        let message = result
            .get("engine_result_message")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string();
        return Err(LedgerError::Rejected {
            result: engine_result,
            message,
        });
    }
    Ok(engine_result)
}

struct TxStatus {
    validated: bool,
    result: Option<String>,
}

fn parse_tx_status(result: &Value) -> TxStatus {
    TxStatus {
        validated: result
            .get("validated")
            .and_then(Value::as_bool)
            .unwrap_or(false),
        result: result
            .get("meta")
            .and_then(|m| m.get("TransactionResult"))
            .and_then(Value::as_str)
            .map(str::to_string),
    }
}

struct LinesPage {
    lines: Vec<TrustLine>,
    validated: bool,
    marker: Option<Value>,
}

fn parse_account_lines_page(result: &Value) -> Result<LinesPage, LedgerError> {
    let lines = match result.get("lines") {
        Some(raw) => serde_json::from_value(raw.clone())
            .map_err(|e| LedgerError::malformed("account_lines", e.to_string()))?,
        None => Vec::new(),
    };
    Ok(LinesPage {
        lines,
        validated: result
            .get("validated")
            .and_then(Value::as_bool)
            .unwrap_or(false),
        marker: result.get("marker").filter(|m| !m.is_null()).cloned(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extract_result_success() {
        let payload = json!({ "result": { "status": "success", "ledger_current_index": 42 } });
        let result = extract_result("ledger_current", payload).unwrap();
        assert_eq!(parse_u32(&result, "ledger_current", "ledger_current_index").unwrap(), 42);
    }

    #[test]
    fn extract_result_error() {
        let payload = json!({ "result": {
            "status": "error",
            "error": "actNotFound",
            "error_message": "Account not found."
        }});
        match extract_result("account_info", payload) {
            Err(LedgerError::Rpc { error, message, .. }) => {
                assert_eq!(error, "actNotFound");
                assert_eq!(message, "Account not found.");
            }
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn extract_result_missing() {
        assert!(matches!(
            extract_result("fee", json!({ "nope": 1 })),
            Err(LedgerError::Malformed { .. })
        ));
    }

    #[test]
    fn account_info_fields() {
        let result = json!({ "account_data": { "Balance": "100000000", "Sequence": 7 } });
        let info = parse_account_info(&result).unwrap();
        assert_eq!(info.balance_drops, 100_000_000);
        assert_eq!(info.sequence, 7);
    }

    #[test]
    fn parse_fee_takes_max_and_caps() {
        let normal = json!({ "drops": { "base_fee": "10", "open_ledger_fee": "12" } });
        assert_eq!(parse_fee(&normal).unwrap(), 12);

        let spike = json!({ "drops": { "base_fee": "10", "open_ledger_fee": "99999999" } });
        assert_eq!(parse_fee(&spike).unwrap(), MAX_FEE_DROPS);
    }

    #[test]
    fn parse_submit_rejects_final_failures() {
        let ok = json!({ "engine_result": "tesSUCCESS" });
        assert_eq!(parse_submit(&ok).unwrap(), "tesSUCCESS");

        let queued = json!({ "engine_result": "terQUEUED" });
        assert_eq!(parse_submit(&queued).unwrap(), "terQUEUED");

        let bad = json!({ "engine_result": "temBAD_FEE", "engine_result_message": "invalid fee" });
        match parse_submit(&bad) {
            Err(LedgerError::Rejected { result, message }) => {
                assert_eq!(result, "temBAD_FEE");
                assert_eq!(message, "invalid fee");
            }
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn tx_status_validated_and_pending() {
        let pending = parse_tx_status(&json!({ "validated": false }));
        assert!(!pending.validated);
        assert!(pending.result.is_none());

        let done = parse_tx_status(&json!({
            "validated": true,
            "meta": { "TransactionResult": "tecNO_LINE" }
        }));
        assert!(done.validated);
        assert_eq!(done.result.as_deref(), Some("tecNO_LINE"));
    }

    #[test]
    fn network_id_from_server_info() {
        assert_eq!(parse_network_id(&json!({ "info": { "network_id": 2 } })), Some(2));
        assert_eq!(parse_network_id(&json!({ "info": {} })), None);
    }

    #[test]
    fn account_lines_page_with_marker() {
        let result = json!({
            "account": "rHolder",
            "validated": true,
            "marker": "ABC",
            "lines": [{
                "account": "rIssuer",
                "balance": "2000",
                "currency": "FOO",
                "limit": "1000000",
                "limit_peer": "0",
                "quality_in": 0,
                "quality_out": 0,
                "no_ripple": true,
                "freeze": true
            }]
        });
        let page = parse_account_lines_page(&result).unwrap();
        assert!(page.validated);
        assert_eq!(page.marker, Some(json!("ABC")));
        assert_eq!(page.lines.len(), 1);
        let line = &page.lines[0];
        assert_eq!(line.balance, "2000");
        assert!(line.freeze);
        assert!(!line.freeze_peer);
        assert!(!line.authorized);
    }

    #[test]
    fn parse_account_lines_empty() {
        let page = parse_account_lines_page(&json!({ "validated": true, "lines": [] })).unwrap();
        assert!(page.lines.is_empty());
        assert!(page.marker.is_none());
    }
}
