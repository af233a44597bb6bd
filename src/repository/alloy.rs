use std::sync::Arc;

use alloy::network::TransactionBuilder;
use alloy::primitives::{Address, B256, Bytes, U256};
use alloy::providers::Provider;
use alloy::rpc::types::TransactionRequest;
use async_trait::async_trait;
use tracing::instrument;

use crate::repository::contract::IERC20;
use crate::repository::{ChainRepository, RepoResult, RepositoryError};

/// [`ChainRepository`] backed by an alloy HTTP provider.
///
/// The provider is expected to carry a wallet filler when `signer` is set,
/// so `send_transaction` signs locally before broadcasting.
pub struct AlloyChainRepository<P> {
    provider: Arc<P>,
    signer: Option<Address>,
}

impl<P: Provider + Clone + 'static> AlloyChainRepository<P> {
    pub fn new(provider: Arc<P>) -> Self {
        Self {
            provider,
            signer: None,
        }
    }

    pub fn with_signer(provider: Arc<P>, signer: Address) -> Self {
        Self {
            provider,
            signer: Some(signer),
        }
    }
}

#[async_trait]
impl<P: Provider + Clone + Send + Sync + 'static> ChainRepository for AlloyChainRepository<P> {
    fn signer_address(&self) -> Option<Address> {
        self.signer
    }

    #[instrument(skip(self), err)]
    async fn native_balance(&self, address: Address) -> RepoResult<U256> {
        self.provider.get_balance(address).await.map_err(|e| {
            if e.to_string().contains("429") {
                tracing::warn!("Rate limited while getting native balance for {}", address);
            }
            RepositoryError::RpcError(e.to_string())
        })
    }

    #[instrument(skip(self), err)]
    async fn token_balance(&self, token: Address, owner: Address) -> RepoResult<U256> {
        let contract = IERC20::new(token, self.provider.clone());

        match contract.balanceOf(owner).call().await {
            Ok(balance) => Ok(balance),
            Err(e) => {
                // A call against an address with no code returns empty data
                // and fails to decode. That means the token account does not
                // exist on this chain yet: a zero balance, not an error.
                let code = self
                    .provider
                    .get_code_at(token)
                    .await
                    .map_err(|rpc| RepositoryError::RpcError(rpc.to_string()))?;

                if code.is_empty() {
                    tracing::debug!("No contract at {token}, reading balance as zero");
                    Ok(U256::ZERO)
                } else {
                    Err(RepositoryError::ContractError(e.to_string()))
                }
            }
        }
    }

    #[instrument(skip(self), err)]
    async fn token_decimals(&self, token: Address) -> RepoResult<u8> {
        let contract = IERC20::new(token, self.provider.clone());

        contract
            .decimals()
            .call()
            .await
            .map_err(|e| RepositoryError::ContractError(e.to_string()))
    }

    #[instrument(skip(self, data), err)]
    async fn send_transaction(&self, to: Address, data: Bytes, value: U256) -> RepoResult<B256> {
        if self.signer.is_none() {
            return Err(RepositoryError::Other(
                "no signing key configured for this chain".to_string(),
            ));
        }

        let request = TransactionRequest::default()
            .with_to(to)
            .with_input(data)
            .with_value(value);

        let pending = self
            .provider
            .send_transaction(request)
            .await
            .map_err(|e| RepositoryError::RpcError(e.to_string()))?;

        Ok(*pending.tx_hash())
    }

    #[instrument(skip(self), err)]
    async fn transaction_status(&self, tx_hash: B256) -> RepoResult<Option<bool>> {
        let receipt = self
            .provider
            .get_transaction_receipt(tx_hash)
            .await
            .map_err(|e| RepositoryError::RpcError(e.to_string()))?;

        Ok(receipt.map(|r| r.status()))
    }
}
