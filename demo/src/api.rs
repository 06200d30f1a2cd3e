//! # HTTP API
//!
//! Builds the axum router behind `xrpl-token-demo serve`. Every `/api/*`
//! endpoint takes a JSON body, opens its own ledger session, runs one
//! service call, and drops the session before responding.
//!
//! ## Endpoints
//!
//! | Method | Path                        | Response                     |
//! |--------|-----------------------------|------------------------------|
//! | GET    | `/health`                   | `{"status":"ok"}`            |
//! | GET    | `/metrics`                  | Prometheus text format       |
//! | POST   | `/api/create-account`       | `{address, secret}`          |
//! | POST   | `/api/fund-account`         | `{success}`                  |
//! | POST   | `/api/configure-issuer`     | `{txHash}`                   |
//! | POST   | `/api/configure-distributor`| `{txHash}`                   |
//! | POST   | `/api/create-trustline`     | `{txHash}`                   |
//! | POST   | `/api/freeze-trustline`     | `{txHash}`                   |
//! | POST   | `/api/unfreeze-trustline`   | `{txHash}`                   |
//! | POST   | `/api/transfer-token`       | `{txHash}`                   |
//! | POST   | `/api/get-balance`          | `{balance}`                  |
//! | POST   | `/api/get-tokens`           | `{tokens}`                   |
//! | POST   | `/api/get-trustlines`       | `{account, lines, validated}`|
//!
//! Anything else falls through to the static front-end, when one is
//! configured. Failures always use the `{error, detail, code}` envelope.

use axum::{
    extract::{rejection::JsonRejection, State},
    http::{Method, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;
use tower_http::cors::{Any, CorsLayer};
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;

use xrpl_token_protocol::ledger::{Faucet, LedgerConnector};
use xrpl_token_protocol::service::{
    compute_send_max, AccountSettings, ServiceError, TokenBalance, TokenService,
    TransferTokenOptions, TrustLineOptions, TrustLinesResponse, WalletService,
};
use xrpl_token_protocol::transaction::Address;
use xrpl_token_protocol::wallet::Wallet;

use crate::metrics::{metrics_handler, SharedMetrics};

// ---------------------------------------------------------------------------
// Application State
// ---------------------------------------------------------------------------

/// Shared application state available to all request handlers.
///
/// Cheap to clone; everything sits behind `Arc`. Holds no ledger session,
/// only the means to open one.
#[derive(Clone)]
pub struct AppState {
    pub connector: Arc<dyn LedgerConnector>,
    pub faucet: Arc<dyn Faucet>,
    pub metrics: SharedMetrics,
}

impl AppState {
    fn submitted(&self, tx_hash: String) -> TxHashResponse {
        self.metrics.transactions_submitted_total.inc();
        TxHashResponse { tx_hash }
    }
}

// ---------------------------------------------------------------------------
// Router Construction
// ---------------------------------------------------------------------------

/// Builds the full axum [`Router`] with all API routes, CORS, and tracing.
///
/// With `static_dir` set, unmatched paths are served from that directory.
pub fn create_router(state: AppState, static_dir: Option<PathBuf>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers(Any);

    let mut router = Router::new()
        .route("/health", get(health_handler))
        .route("/metrics", get(metrics_handler))
        .route("/api/create-account", post(create_account_handler))
        .route("/api/fund-account", post(fund_account_handler))
        .route("/api/configure-issuer", post(configure_issuer_handler))
        .route("/api/configure-distributor", post(configure_distributor_handler))
        .route("/api/create-trustline", post(create_trustline_handler))
        .route("/api/freeze-trustline", post(freeze_trustline_handler))
        .route("/api/unfreeze-trustline", post(unfreeze_trustline_handler))
        .route("/api/transfer-token", post(transfer_token_handler))
        .route("/api/get-balance", post(get_balance_handler))
        .route("/api/get-tokens", post(get_tokens_handler))
        .route("/api/get-trustlines", post(get_trustlines_handler));

    if let Some(dir) = static_dir {
        router = router.fallback_service(ServeDir::new(dir));
    }

    router
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

// ---------------------------------------------------------------------------
// Request / Response Types
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
pub struct AddressRequest {
    pub address: Address,
}

#[derive(Debug, Deserialize)]
pub struct ConfigureAccountRequest {
    pub secret: String,
    /// Omitted options fall back to the role's defaults.
    #[serde(default)]
    pub options: Option<AccountSettings>,
}

#[derive(Debug, Deserialize)]
pub struct CreateTrustLineRequest {
    pub secret: String,
    #[serde(default)]
    pub options: Option<TrustLineOptions>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FreezeTrustLineRequest {
    pub secret: String,
    pub trustline_address: Address,
    pub token_name: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransferTokenRequest {
    pub sender_secret: String,
    pub receiver_address: Address,
    pub issuer_address: Address,
    pub token_name: String,
    /// Issuer transfer rate as a decimal string; empty or `"0"` means none.
    #[serde(default)]
    pub transfer_rate: String,
    pub amount: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct CreateAccountResponse {
    pub address: String,
    pub secret: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct FundAccountResponse {
    pub success: bool,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TxHashResponse {
    pub tx_hash: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct BalanceResponse {
    pub balance: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct TokensResponse {
    pub tokens: Vec<TokenBalance>,
}

/// The single failure shape every endpoint uses.
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorBody {
    pub error: String,
    pub detail: String,
    pub code: String,
}

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// A [`ServiceError`] rendered as an HTTP response.
pub struct ApiError(pub ServiceError);

impl ApiError {
    fn status(&self) -> StatusCode {
        match self.0 {
            ServiceError::Validation(_) => StatusCode::BAD_REQUEST,
            ServiceError::Connection(_) => StatusCode::BAD_GATEWAY,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<ServiceError> for ApiError {
    fn from(err: ServiceError) -> Self {
        Self(err)
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        Self(ServiceError::Validation(rejection.body_text()))
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!(code = self.0.code(), "{}", self.0);
        } else {
            tracing::warn!(code = self.0.code(), "{}", self.0);
        }
        let body = ErrorBody {
            error: self.0.summary().to_string(),
            detail: self.0.to_string(),
            code: self.0.code().to_string(),
        };
        (status, Json(body)).into_response()
    }
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

type Payload<T> = Result<Json<T>, JsonRejection>;

/// Decodes the body, runs `operation`, records metrics, and renders the
/// outcome.
async fn respond<Req, Res, Fut>(
    state: AppState,
    endpoint: &'static str,
    payload: Payload<Req>,
    operation: impl FnOnce(AppState, Req) -> Fut,
) -> Response
where
    Fut: Future<Output = Result<Res, ServiceError>>,
    Res: Serialize,
{
    let started = Instant::now();
    let result = match payload {
        Ok(Json(request)) => operation(state.clone(), request).await.map_err(ApiError),
        Err(rejection) => Err(ApiError::from(rejection)),
    };
    let elapsed = started.elapsed().as_secs_f64();

    match result {
        Ok(body) => {
            state.metrics.record(endpoint, "ok", elapsed);
            Json(body).into_response()
        }
        Err(err) => {
            state.metrics.record(endpoint, err.0.code(), elapsed);
            err.into_response()
        }
    }
}

/// `GET /health`: liveness check. Does not touch the ledger.
async fn health_handler() -> impl IntoResponse {
    (StatusCode::OK, Json(serde_json::json!({ "status": "ok" })))
}

/// `POST /api/create-account`: generates a wallet locally. Any body is
/// ignored.
async fn create_account_handler(State(state): State<AppState>) -> Response {
    let started = Instant::now();
    let wallet = WalletService::create_account();
    state
        .metrics
        .record("create-account", "ok", started.elapsed().as_secs_f64());
    Json(CreateAccountResponse {
        address: wallet.classic_address().to_string(),
        secret: wallet.seed(),
    })
    .into_response()
}

async fn fund_account_handler(
    State(state): State<AppState>,
    payload: Payload<AddressRequest>,
) -> Response {
    respond(state, "fund-account", payload, fund_account).await
}

async fn fund_account(
    state: AppState,
    req: AddressRequest,
) -> Result<FundAccountResponse, ServiceError> {
    WalletService::fund_account(state.faucet.as_ref(), &req.address).await?;
    Ok(FundAccountResponse { success: true })
}

async fn configure_issuer_handler(
    State(state): State<AppState>,
    payload: Payload<ConfigureAccountRequest>,
) -> Response {
    respond(state, "configure-issuer", payload, configure_issuer).await
}

async fn configure_issuer(
    state: AppState,
    req: ConfigureAccountRequest,
) -> Result<TxHashResponse, ServiceError> {
    let wallet = Wallet::from_seed(&req.secret)?;
    let service = TokenService::connect(state.connector.as_ref()).await?;
    let tx_hash = service.configure_issuer(&wallet, req.options).await?;
    Ok(state.submitted(tx_hash))
}

async fn configure_distributor_handler(
    State(state): State<AppState>,
    payload: Payload<ConfigureAccountRequest>,
) -> Response {
    respond(state, "configure-distributor", payload, configure_distributor).await
}

async fn configure_distributor(
    state: AppState,
    req: ConfigureAccountRequest,
) -> Result<TxHashResponse, ServiceError> {
    let wallet = Wallet::from_seed(&req.secret)?;
    let service = TokenService::connect(state.connector.as_ref()).await?;
    let tx_hash = service.configure_distributor(&wallet, req.options).await?;
    Ok(state.submitted(tx_hash))
}

async fn create_trustline_handler(
    State(state): State<AppState>,
    payload: Payload<CreateTrustLineRequest>,
) -> Response {
    respond(state, "create-trustline", payload, create_trustline).await
}

async fn create_trustline(
    state: AppState,
    req: CreateTrustLineRequest,
) -> Result<TxHashResponse, ServiceError> {
    let wallet = Wallet::from_seed(&req.secret)?;
    let service = TokenService::connect(state.connector.as_ref()).await?;
    let tx_hash = service
        .create_trust_line(&wallet, req.options.as_ref())
        .await?;
    Ok(state.submitted(tx_hash))
}

async fn freeze_trustline_handler(
    State(state): State<AppState>,
    payload: Payload<FreezeTrustLineRequest>,
) -> Response {
    respond(state, "freeze-trustline", payload, |state, req| {
        set_freeze(state, req, true)
    })
    .await
}

async fn unfreeze_trustline_handler(
    State(state): State<AppState>,
    payload: Payload<FreezeTrustLineRequest>,
) -> Response {
    respond(state, "unfreeze-trustline", payload, |state, req| {
        set_freeze(state, req, false)
    })
    .await
}

async fn set_freeze(
    state: AppState,
    req: FreezeTrustLineRequest,
    frozen: bool,
) -> Result<TxHashResponse, ServiceError> {
    let wallet = Wallet::from_seed(&req.secret)?;
    let service = TokenService::connect(state.connector.as_ref()).await?;
    let tx_hash = service
        .set_trust_line_freeze(&wallet, &req.trustline_address, &req.token_name, frozen)
        .await?;
    Ok(state.submitted(tx_hash))
}

async fn transfer_token_handler(
    State(state): State<AppState>,
    payload: Payload<TransferTokenRequest>,
) -> Response {
    respond(state, "transfer-token", payload, transfer_token).await
}

/// Parses the optional `transferRate` field.
fn parse_transfer_rate(raw: &str) -> Result<Option<u32>, ServiceError> {
    match raw.trim() {
        "" | "0" => Ok(None),
        value => value
            .parse::<u32>()
            .map(Some)
            .map_err(|e| ServiceError::Validation(format!("invalid transfer rate {value:?}: {e}"))),
    }
}

/// SendMax for a transfer; equals the amount when no transfer rate applies.
fn send_max_for(amount: &str, raw_rate: &str) -> Result<String, ServiceError> {
    compute_send_max(amount, parse_transfer_rate(raw_rate)?)
}

async fn transfer_token(
    state: AppState,
    req: TransferTokenRequest,
) -> Result<TxHashResponse, ServiceError> {
    let wallet = Wallet::from_seed(&req.sender_secret)?;
    let send_max = send_max_for(&req.amount, &req.transfer_rate)?;
    let options = TransferTokenOptions {
        receiver_address: req.receiver_address,
        issuer_address: req.issuer_address,
        token_name: req.token_name,
        amount: req.amount,
        send_max: Some(send_max),
    };

    let service = TokenService::connect(state.connector.as_ref()).await?;
    let tx_hash = service.transfer_token(&wallet, &options).await?;
    Ok(state.submitted(tx_hash))
}

async fn get_balance_handler(
    State(state): State<AppState>,
    payload: Payload<AddressRequest>,
) -> Response {
    respond(state, "get-balance", payload, get_balance).await
}

async fn get_balance(state: AppState, req: AddressRequest) -> Result<BalanceResponse, ServiceError> {
    let service = WalletService::connect(state.connector.as_ref()).await?;
    let balance = service.get_balance(&req.address).await?;
    Ok(BalanceResponse { balance })
}

async fn get_tokens_handler(
    State(state): State<AppState>,
    payload: Payload<AddressRequest>,
) -> Response {
    respond(state, "get-tokens", payload, get_tokens).await
}

async fn get_tokens(state: AppState, req: AddressRequest) -> Result<TokensResponse, ServiceError> {
    let service = TokenService::connect(state.connector.as_ref()).await?;
    let tokens = service.get_token_balances(&req.address).await?;
    Ok(TokensResponse { tokens })
}

async fn get_trustlines_handler(
    State(state): State<AppState>,
    payload: Payload<AddressRequest>,
) -> Response {
    respond(state, "get-trustlines", payload, get_trustlines).await
}

async fn get_trustlines(
    state: AppState,
    req: AddressRequest,
) -> Result<TrustLinesResponse, ServiceError> {
    let service = TokenService::connect(state.connector.as_ref()).await?;
    service.get_all_trust_lines(&req.address).await
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
