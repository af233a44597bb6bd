use std::str::FromStr;
use std::sync::Arc;

use alloy::primitives::{Address, U256};
use async_trait::async_trait;
use tracing::instrument;

use crate::repository::BridgeClient;
use crate::service::types::{BridgeResult, ChainId};
use crate::service::{FundingError, FundingResult};

/// Moves value from the source chain to the target chain via a bridge
/// provider.
///
/// The returned `amount_received` reflects the real post-fee value and must
/// drive all subsequent sufficiency decisions, never the requested amount.
#[async_trait]
pub trait BridgeExecutor: Send + Sync {
    async fn bridge(
        &self,
        amount: U256,
        source_chain: &ChainId,
        target_chain: &ChainId,
        destination: Address,
    ) -> FundingResult<BridgeResult>;
}

/// [`BridgeExecutor`] backed by the bridge provider's HTTP API.
pub struct HttpBridgeExecutor {
    client: Arc<BridgeClient>,
}

impl HttpBridgeExecutor {
    pub fn new(client: Arc<BridgeClient>) -> Self {
        Self { client }
    }
}

#[async_trait]
impl BridgeExecutor for HttpBridgeExecutor {
    #[instrument(skip(self), err)]
    async fn bridge(
        &self,
        amount: U256,
        source_chain: &ChainId,
        target_chain: &ChainId,
        destination: Address,
    ) -> FundingResult<BridgeResult> {
        let transfer = self
            .client
            .transfer(
                amount,
                source_chain.as_str(),
                target_chain.as_str(),
                destination,
            )
            .await
            .map_err(|e| {
                if e.is_rejection() {
                    FundingError::BridgeRejected(e.to_string())
                } else {
                    FundingError::BridgeUnavailable(e.to_string())
                }
            })?;

        let amount_received = U256::from_str(&transfer.amount_received)
            .map_err(|e| FundingError::Internal(format!("malformed bridge amount: {e}")))?;

        if amount_received < amount {
            tracing::debug!(
                "Bridge fees consumed {} of the requested amount",
                amount - amount_received
            );
        }

        Ok(BridgeResult {
            tx_hash: transfer.transaction_hash,
            provider: self.client.provider_name().to_string(),
            amount_received,
        })
    }
}
