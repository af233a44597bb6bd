pub mod aggregator;
pub mod alloy;
pub mod bridge;
pub mod contract;
pub mod error;

use ::alloy::primitives::{Address, B256, Bytes, U256};
pub use aggregator::{AggregatorClient, QuoteResponse, SwapBuildResponse};
pub use alloy::AlloyChainRepository;
use async_trait::async_trait;
pub use bridge::{BridgeClient, TransferResponse};
pub use error::RepositoryError;

pub(crate) type RepoResult<T> = std::result::Result<T, RepositoryError>;

/// Trait for blockchain data access on a single chain.
///
/// One instance is constructed per chain endpoint (source and target).
/// Implementations handle RPC communication, local signing and error
/// conversion; everything above this seam is chain-agnostic.
#[async_trait]
pub trait ChainRepository: Send + Sync {
    /// Address of the configured signing key, if one was provided.
    fn signer_address(&self) -> Option<Address>;

    /// Retrieves the native gas balance for an address.
    ///
    /// # Returns
    ///
    /// * `Ok(U256)` - The balance in the chain's smallest native unit
    /// * `Err(RepositoryError)` - If the RPC call fails
    async fn native_balance(&self, address: Address) -> RepoResult<U256>;

    /// Retrieves an ERC20 token balance for an owner.
    ///
    /// A token contract that is not deployed at the given address reads as a
    /// zero balance rather than an error, so callers never have to special
    /// case accounts that do not exist yet.
    async fn token_balance(&self, token: Address, owner: Address) -> RepoResult<U256>;

    /// Retrieves the decimal count of an ERC20 token contract.
    async fn token_decimals(&self, token: Address) -> RepoResult<u8>;

    /// Signs and broadcasts a transaction built from prefabricated calldata.
    ///
    /// Returns the transaction hash once the node has accepted the
    /// submission. Acceptance is not confirmation; callers poll
    /// [`transaction_status`](Self::transaction_status) for finality.
    async fn send_transaction(&self, to: Address, data: Bytes, value: U256) -> RepoResult<B256>;

    /// Looks up the confirmation status of a broadcast transaction.
    ///
    /// # Returns
    ///
    /// * `Ok(Some(true))` - Mined and succeeded
    /// * `Ok(Some(false))` - Mined and reverted
    /// * `Ok(None)` - Not yet mined
    async fn transaction_status(&self, tx_hash: B256) -> RepoResult<Option<bool>>;
}
