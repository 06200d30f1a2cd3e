//! Wallet Service: account creation, funding, and XRP balances.

use tracing::info;

use super::ServiceError;
use crate::config::{DROPS_PER_XRP, NATIVE_CURRENCY};
use crate::ledger::{Faucet, LedgerClient, LedgerConnector};
use crate::transaction::Address;
use crate::wallet::Wallet;

/// Renders drops as `"{xrp}.{fraction:06} XRP"` without floating point.
pub fn format_drops(drops: u64) -> String {
    format!(
        "{}.{:06} {NATIVE_CURRENCY}",
        drops / DROPS_PER_XRP,
        drops % DROPS_PER_XRP
    )
}

pub struct WalletService {
    client: Box<dyn LedgerClient>,
}

impl WalletService {
    pub fn new(client: Box<dyn LedgerClient>) -> Self {
        Self { client }
    }

    pub async fn connect(connector: &dyn LedgerConnector) -> Result<Self, ServiceError> {
        let client = connector.connect().await.map_err(ServiceError::connection)?;
        Ok(Self::new(client))
    }

    /// Generates a new Ed25519 account locally. No ledger round trip.
    pub fn create_account() -> Wallet {
        let wallet = Wallet::generate();
        info!(address = %wallet.address(), "account created");
        wallet
    }

    pub async fn fund_account(faucet: &dyn Faucet, address: &Address) -> Result<(), ServiceError> {
        faucet.fund(address).await?;
        Ok(())
    }

    pub async fn get_balance(&self, address: &Address) -> Result<String, ServiceError> {
        let info = self
            .client
            .account_info(address)
            .await
            .map_err(ServiceError::query)?;
        Ok(format_drops(info.balance_drops))
    }
}
