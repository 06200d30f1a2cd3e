use thiserror::Error;

use crate::ledger::{FaucetError, LedgerError};
use crate::transaction::TypeError;
use crate::wallet::WalletError;

/// Errors surfaced by the token and wallet services.
///
/// Every variant carries a stable machine code (see [`ServiceError::code`])
/// that the HTTP layer puts in its error envelope.
#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("failed to connect to ledger: {0}")]
    Connection(String),

    #[error("invalid request: {0}")]
    Validation(String),

    #[error("{stage} failed: {detail}")]
    Submission { stage: &'static str, detail: String },

    #[error("{operation} transaction {hash} was not validated")]
    Unvalidated { operation: &'static str, hash: String },

    #[error("transaction {hash} failed with {result}")]
    TransactionFailed { hash: String, result: String },

    #[error("ledger query failed: {0}")]
    Query(String),

    #[error("failed to fund account: {0}")]
    Funding(String),
}

impl ServiceError {
    pub fn code(&self) -> &'static str {
        match self {
            Self::Connection(_) => "CONNECTION_ERROR",
            Self::Validation(_) => "VALIDATION_ERROR",
            Self::Submission { .. } => "SUBMISSION_ERROR",
            Self::Unvalidated { .. } => "UNVALIDATED_ERROR",
            Self::TransactionFailed { .. } => "TRANSACTION_FAILED",
            Self::Query(_) => "QUERY_ERROR",
            Self::Funding(_) => "FUND_ERROR",
        }
    }

    /// Short human-readable summary for the `error` field of API responses.
    pub fn summary(&self) -> &'static str {
        match self {
            Self::Connection(_) => "Ledger connection failed",
            Self::Validation(_) => "Invalid request",
            Self::Submission { .. } => "Transaction submission failed",
            Self::Unvalidated { .. } => "Transaction not validated",
            Self::TransactionFailed { .. } => "Transaction failed",
            Self::Query(_) => "Ledger query failed",
            Self::Funding(_) => "Account funding failed",
        }
    }

    pub(crate) fn submission(stage: &'static str, err: impl ToString) -> Self {
        Self::Submission {
            stage,
            detail: err.to_string(),
        }
    }

    pub fn connection(err: LedgerError) -> Self {
        Self::Connection(err.to_string())
    }

    pub(crate) fn query(err: LedgerError) -> Self {
        Self::Query(err.to_string())
    }
}

impl From<TypeError> for ServiceError {
    fn from(err: TypeError) -> Self {
        Self::Validation(err.to_string())
    }
}

impl From<WalletError> for ServiceError {
    fn from(err: WalletError) -> Self {
        Self::Validation(format!("invalid secret: {err}"))
    }
}

impl From<FaucetError> for ServiceError {
    fn from(err: FaucetError) -> Self {
        Self::Funding(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn codes_are_stable() {
        assert_eq!(ServiceError::Validation("x".into()).code(), "VALIDATION_ERROR");
        assert_eq!(ServiceError::Connection("x".into()).code(), "CONNECTION_ERROR");
        assert_eq!(ServiceError::submission("autofill", "boom").code(), "SUBMISSION_ERROR");
        assert_eq!(
            ServiceError::Unvalidated {
                operation: "Payment",
                hash: "AB".into()
            }
            .code(),
            "UNVALIDATED_ERROR"
        );
        assert_eq!(ServiceError::Funding("x".into()).code(), "FUND_ERROR");
    }

    #[test]
    fn submission_display_names_stage() {
        let err = ServiceError::submission("autofill", "actNotFound");
        assert_eq!(err.to_string(), "autofill failed: actNotFound");
    }

    #[test]
    fn bad_secret_is_validation() {
        let err: ServiceError = WalletError::KeyDerivation.into();
        assert!(matches!(err, ServiceError::Validation(_)));
    }
}
