use alloy::primitives::{B256, U256};
use rust_decimal::Decimal;
use serde::Serialize;
use thiserror::Error;

use crate::repository::RepositoryError;
use crate::service::types::ChainId;

/// How the orchestrator must react to a component error.
///
/// Classification lives on the error type, but only the orchestrator acts
/// on it; no other layer retries or reinterprets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorClass {
    /// Retry with exponential backoff up to the configured limit.
    Transient,
    /// Ends the cycle immediately; retrying the same request cannot help.
    Fatal,
    /// On-chain state must be re-queried before deciding; never blindly
    /// resubmit.
    Ambiguous,
}

#[derive(Debug, Clone, Error, Serialize)]
#[serde(tag = "type", content = "detail")]
pub enum FundingError {
    /// A chain RPC endpoint could not be reached or timed out.
    #[error("RPC unavailable: {0}")]
    RpcUnavailable(String),

    /// The aggregator API could not be reached or returned a server error.
    #[error("Liquidity provider unavailable: {0}")]
    ProviderUnavailable(String),

    /// The aggregator reports no viable conversion path for this pair.
    #[error("No route for conversion: {0}")]
    NoRoute(String),

    /// The quote's validity window elapsed before execution; a fresh quote
    /// must be fetched.
    #[error("Quote expired before execution")]
    QuoteExpired,

    /// The aggregator refused to build a transaction for this quote.
    #[error("Swap rejected by provider: {0}")]
    SwapRejected(String),

    /// Broadcasting the signed transaction failed before submission.
    #[error("Transaction broadcast failed: {0}")]
    BroadcastFailed(String),

    /// The broadcast transaction did not finalize within the timeout. The
    /// input funds may already be spent; chain state must be re-checked.
    #[error("Confirmation timeout for transaction {tx_hash}")]
    ConfirmationTimeout { tx_hash: B256 },

    /// The bridge API could not be reached or returned a server error.
    #[error("Bridge unavailable: {0}")]
    BridgeUnavailable(String),

    /// The bridge refused the transfer for this amount.
    #[error("Bridge rejected transfer: {0}")]
    BridgeRejected(String),

    /// The quoted price impact exceeds the configured ceiling.
    #[error("Price impact too high: {impact}%, maximum allowed: {max}%")]
    PriceImpactTooHigh { impact: Decimal, max: Decimal },

    /// Bridged funds arrived but the target balance is still short.
    #[error("Balance {balance} still below threshold {threshold} after funding")]
    BelowThreshold { balance: U256, threshold: U256 },

    /// No chain repository is registered under this identifier.
    #[error("Unknown chain: {0}")]
    UnknownChain(ChainId),

    /// The cycle was cancelled between steps during shutdown.
    #[error("Funding cycle cancelled")]
    Cancelled,

    /// An amount could not be parsed or converted.
    #[error("Invalid amount: {0}")]
    InvalidAmount(String),

    /// An unexpected internal error occurred.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl FundingError {
    pub fn classify(&self) -> ErrorClass {
        match self {
            FundingError::RpcUnavailable(_)
            | FundingError::ProviderUnavailable(_)
            | FundingError::QuoteExpired
            | FundingError::BroadcastFailed(_)
            | FundingError::BridgeUnavailable(_) => ErrorClass::Transient,

            FundingError::ConfirmationTimeout { .. } => ErrorClass::Ambiguous,

            FundingError::NoRoute(_)
            | FundingError::SwapRejected(_)
            | FundingError::BridgeRejected(_)
            | FundingError::PriceImpactTooHigh { .. }
            | FundingError::BelowThreshold { .. }
            | FundingError::UnknownChain(_)
            | FundingError::Cancelled
            | FundingError::InvalidAmount(_)
            | FundingError::Internal(_) => ErrorClass::Fatal,
        }
    }
}

impl From<RepositoryError> for FundingError {
    fn from(err: RepositoryError) -> Self {
        match err {
            RepositoryError::RpcError(msg)
            | RepositoryError::NetworkError(msg)
            | RepositoryError::ContractError(msg) => FundingError::RpcUnavailable(msg),
            RepositoryError::ParseError(msg) => FundingError::Internal(msg),
            RepositoryError::ApiError { status, message } => {
                FundingError::Internal(format!("unmapped API error ({status}): {message}"))
            }
            RepositoryError::Other(msg) => FundingError::Internal(msg),
        }
    }
}
