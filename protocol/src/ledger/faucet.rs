//! Test-network faucets.

use async_trait::async_trait;
use serde_json::json;
use thiserror::Error;
use tracing::info;

use crate::config::{FaucetNetwork, HTTP_REQUEST_TIMEOUT};
use crate::transaction::Address;

#[derive(Debug, Error)]
pub enum FaucetError {
    #[error("faucet request failed: {0}")]
    Request(String),

    #[error("faucet returned HTTP {status}: {body}")]
    Status { status: u16, body: String },
}

#[async_trait]
pub trait Faucet: Send + Sync {
    /// Asks the faucet to fund `address` with test currency.
    async fn fund(&self, address: &Address) -> Result<(), FaucetError>;
}

/// Faucet reached over HTTP.
#[derive(Debug, Clone)]
pub struct HttpFaucet {
    url: String,
}

impl HttpFaucet {
    pub fn new(url: impl Into<String>) -> Self {
        Self { url: url.into() }
    }

    pub fn for_network(network: FaucetNetwork) -> Self {
        Self::new(network.url())
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

#[async_trait]
impl Faucet for HttpFaucet {
    async fn fund(&self, address: &Address) -> Result<(), FaucetError> {
        let http = reqwest::Client::builder()
            .timeout(HTTP_REQUEST_TIMEOUT)
            .build()
            .map_err(|e| FaucetError::Request(e.to_string()))?;

        let response = http
            .post(&self.url)
            .json(&json!({ "destination": address.as_str() }))
            .send()
            .await
            .map_err(|e| FaucetError::Request(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(FaucetError::Status {
                status: status.as_u16(),
                body,
            });
        }

        info!(address = %address, faucet = %self.url, "faucet funded account");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{DEVNET_FAUCET_URL, TESTNET_FAUCET_URL};

    #[test]
    fn test_for_network_selects_url() {
        assert_eq!(HttpFaucet::for_network(FaucetNetwork::Devnet).url(), DEVNET_FAUCET_URL);
        assert_eq!(HttpFaucet::for_network(FaucetNetwork::Testnet).url(), TESTNET_FAUCET_URL);
    }
}
