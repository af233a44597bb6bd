use alloy::primitives::{Address, B256, U256};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::service::FundingError;

/// Identifier of a blockchain network, matching the names used in the
/// configuration and by the bridge provider API (e.g. "base", "ethereum").
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ChainId(pub String);

impl ChainId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for ChainId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ChainId {
    fn from(name: &str) -> Self {
        ChainId(name.to_string())
    }
}

/// A token on some chain: either the chain's native gas currency or an
/// ERC20 contract.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TokenId {
    Native,
    Erc20(Address),
}

/// Balance snapshot, always a fixed-point integer in the token's smallest
/// unit. Floating point never appears here; human-readable formatting
/// happens only in logs via `utils::format_balance`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WalletBalance {
    pub chain: ChainId,
    pub token: TokenId,
    pub amount: U256,
}

/// A conversion quote from the liquidity aggregator.
///
/// Valid only for a short, provider-defined window; the swap endpoint
/// rejects stale routes and the pipeline re-fetches rather than failing the
/// cycle.
#[derive(Debug, Clone)]
pub struct ConversionQuote {
    pub input_token: Address,
    pub output_token: Address,
    pub in_amount: U256,
    pub out_amount: U256,
    pub price_impact_pct: Decimal,
    pub slippage_bps: u16,
    /// Opaque route payload, echoed back verbatim to the swap endpoint.
    pub route: serde_json::Value,
}

/// Confirmed swap outcome. Immutable once produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SwapResult {
    pub tx_hash: B256,
    /// Output actually received on-chain, not the quoted estimate.
    pub out_amount: U256,
    pub realized_impact_pct: Decimal,
}

/// Completed bridge transfer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BridgeResult {
    pub tx_hash: String,
    pub provider: String,
    /// Post-fee value delivered on the target chain. Authoritative for all
    /// subsequent sufficiency decisions; the requested amount is not.
    pub amount_received: U256,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FundingOutcome {
    SkippedSufficient,
    Funded,
    Failed,
}

/// Terminal record of one funding cycle. Written exactly once when the
/// cycle reaches a terminal state and never mutated afterwards; a new
/// trigger starts a new cycle with its own record.
#[derive(Debug, Clone, Serialize)]
pub struct FundingCycleResult {
    pub wallet: Address,
    pub outcome: FundingOutcome,
    pub balance_before: Option<U256>,
    pub quoted_out: Option<U256>,
    pub swapped_out: Option<U256>,
    pub bridged_received: Option<U256>,
    pub balance_after: Option<U256>,
    pub error: Option<FundingError>,
    pub completed_at: i64,
}

impl FundingCycleResult {
    pub fn is_sufficient(&self) -> bool {
        matches!(
            self.outcome,
            FundingOutcome::SkippedSufficient | FundingOutcome::Funded
        )
    }
}
