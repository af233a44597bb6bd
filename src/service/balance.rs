use std::collections::HashMap;
use std::sync::Arc;

use alloy::primitives::Address;
use async_trait::async_trait;
use tracing::instrument;

use crate::repository::ChainRepository;
use crate::service::types::{ChainId, TokenId, WalletBalance};
use crate::service::{FundingError, FundingResult};

/// Reads native-gas and token balances for a wallet on a given chain.
///
/// Pure read, no side effects. Transport failures surface as
/// `RpcUnavailable` (retryable); a token account that does not exist yet
/// reads as a zero balance.
#[async_trait]
pub trait BalanceReader: Send + Sync {
    async fn read(
        &self,
        chain: &ChainId,
        wallet: Address,
        token: &TokenId,
    ) -> FundingResult<WalletBalance>;
}

/// [`BalanceReader`] over the per-chain RPC repositories.
pub struct ChainBalanceReader {
    chains: HashMap<ChainId, Arc<dyn ChainRepository>>,
}

impl ChainBalanceReader {
    pub fn new(chains: HashMap<ChainId, Arc<dyn ChainRepository>>) -> Self {
        Self { chains }
    }
}

#[async_trait]
impl BalanceReader for ChainBalanceReader {
    #[instrument(skip(self), err)]
    async fn read(
        &self,
        chain: &ChainId,
        wallet: Address,
        token: &TokenId,
    ) -> FundingResult<WalletBalance> {
        let repo = self
            .chains
            .get(chain)
            .ok_or_else(|| FundingError::UnknownChain(chain.clone()))?;

        let amount = match token {
            TokenId::Native => repo.native_balance(wallet).await?,
            TokenId::Erc20(address) => repo.token_balance(*address, wallet).await?,
        };

        Ok(WalletBalance {
            chain: chain.clone(),
            token: *token,
            amount,
        })
    }
}
