//! # Prometheus Metrics
//!
//! Request and transaction counters for the HTTP API, served at `/metrics`.
//! Everything lives in a dedicated [`prometheus::Registry`] so tests can
//! build as many instances as they like.

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use prometheus::{
    Encoder, HistogramOpts, HistogramVec, IntCounter, IntCounterVec, Opts, Registry, TextEncoder,
};
use std::sync::Arc;

use crate::api::AppState;

#[derive(Clone)]
pub struct ApiMetrics {
    registry: Registry,
    /// Requests by endpoint and outcome (`ok` or an error code).
    pub api_requests_total: IntCounterVec,
    /// Transactions that reached a validated ledger.
    pub transactions_submitted_total: IntCounter,
    /// Handler latency by endpoint.
    pub api_request_duration_seconds: HistogramVec,
}

impl ApiMetrics {
    pub fn new() -> Result<Self, prometheus::Error> {
        let registry = Registry::new_custom(Some("xrpl_token_demo".into()), None)?;

        let api_requests_total = IntCounterVec::new(
            Opts::new("api_requests_total", "API requests by endpoint and outcome"),
            &["endpoint", "outcome"],
        )?;
        registry.register(Box::new(api_requests_total.clone()))?;

        let transactions_submitted_total = IntCounter::new(
            "transactions_submitted_total",
            "Transactions submitted through the API and validated",
        )?;
        registry.register(Box::new(transactions_submitted_total.clone()))?;

        let api_request_duration_seconds = HistogramVec::new(
            HistogramOpts::new(
                "api_request_duration_seconds",
                "API handler latency in seconds",
            )
            .buckets(vec![0.01, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0, 30.0, 60.0]),
            &["endpoint"],
        )?;
        registry.register(Box::new(api_request_duration_seconds.clone()))?;

        Ok(Self {
            registry,
            api_requests_total,
            transactions_submitted_total,
            api_request_duration_seconds,
        })
    }

    pub fn record(&self, endpoint: &str, outcome: &str, seconds: f64) {
        self.api_requests_total
            .with_label_values(&[endpoint, outcome])
            .inc();
        self.api_request_duration_seconds
            .with_label_values(&[endpoint])
            .observe(seconds);
    }

    /// Encodes all registered metrics into the Prometheus text exposition format.
    pub fn encode(&self) -> Result<String, prometheus::Error> {
        let encoder = TextEncoder::new();
        let mut buffer = Vec::new();
        encoder.encode(&self.registry.gather(), &mut buffer)?;
        String::from_utf8(buffer).map_err(|e| prometheus::Error::Msg(e.to_string()))
    }
}

pub type SharedMetrics = Arc<ApiMetrics>;

/// Renders `/metrics` in Prometheus text format.
pub async fn metrics_handler(State(state): State<AppState>) -> impl IntoResponse {
    match state.metrics.encode() {
        Ok(body) => (
            StatusCode::OK,
            [("content-type", "text/plain; version=0.0.4; charset=utf-8")],
            body,
        )
            .into_response(),
        Err(e) => {
            tracing::error!("failed to encode metrics: {}", e);
            (StatusCode::INTERNAL_SERVER_ERROR, "metrics encoding failed").into_response()
        }
    }
}
