use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use alloy::primitives::{Address, B256, Bytes, U256};
use async_trait::async_trait;
use tokio::sync::Mutex;
use tokio::time::Instant;
use tracing::instrument;

use crate::repository::{AggregatorClient, ChainRepository};
use crate::service::types::{ConversionQuote, SwapResult};
use crate::service::utils::realized_impact_pct;
use crate::service::{FundingError, FundingResult};

/// Turns an accepted quote into a signed, broadcast, confirmed transaction
/// on the source chain.
///
/// Broadcasting irreversibly consumes input-token balance regardless of the
/// later confirmation outcome, which is why a [`ConfirmationTimeout`]
/// obliges the caller to go through [`check_landed`](SwapExecutor::check_landed)
/// before any re-execution.
///
/// [`ConfirmationTimeout`]: FundingError::ConfirmationTimeout
#[async_trait]
pub trait SwapExecutor: Send + Sync {
    async fn execute(&self, quote: &ConversionQuote) -> FundingResult<SwapResult>;

    /// Re-checks authoritative chain state after a confirmation timeout.
    ///
    /// # Returns
    ///
    /// * `Ok(Some(result))` - The transaction landed; accept it as the swap
    ///   result and do not re-broadcast.
    /// * `Ok(None)` - The transaction definitively reverted; a fresh
    ///   execution is safe.
    /// * `Err(ConfirmationTimeout)` - Still pending; keep checking, never
    ///   re-broadcast.
    async fn check_landed(&self, tx_hash: B256) -> FundingResult<Option<SwapResult>>;
}

struct PendingSwap {
    tx_hash: B256,
    balance_before: U256,
    expected_out: U256,
}

/// [`SwapExecutor`] that requests a prebuilt transaction from the
/// aggregator, signs and broadcasts it through the source-chain repository,
/// and polls for the receipt.
pub struct AggregatorSwapExecutor {
    aggregator: Arc<AggregatorClient>,
    chain: Arc<dyn ChainRepository>,
    wallet: Address,
    /// Output token of the swap; the realized output amount is measured as
    /// the wallet's balance delta in this token.
    output_token: Address,
    confirm_timeout: Duration,
    poll_interval: Duration,
    /// Context of the most recent unresolved broadcast, kept so a timeout
    /// can later be resolved by `check_landed`.
    pending: Mutex<Option<PendingSwap>>,
}

impl AggregatorSwapExecutor {
    pub fn new(
        aggregator: Arc<AggregatorClient>,
        chain: Arc<dyn ChainRepository>,
        wallet: Address,
        output_token: Address,
        confirm_timeout: Duration,
        poll_interval: Duration,
    ) -> Self {
        Self {
            aggregator,
            chain,
            wallet,
            output_token,
            confirm_timeout,
            poll_interval,
            pending: Mutex::new(None),
        }
    }

    /// Builds the confirmed result from the recorded pre-broadcast state.
    async fn settle(&self, pending: PendingSwap) -> SwapResult {
        // The transaction is confirmed at this point. A failed balance read
        // must not bubble up as a retryable error, or the caller could
        // re-execute an already-landed swap; fall back to the quoted amount.
        let out_amount = match self
            .chain
            .token_balance(self.output_token, self.wallet)
            .await
        {
            Ok(balance_after) => balance_after.saturating_sub(pending.balance_before),
            Err(e) => {
                tracing::warn!(
                    "Post-swap balance read failed ({e}), falling back to quoted output"
                );
                pending.expected_out
            }
        };

        SwapResult {
            tx_hash: pending.tx_hash,
            out_amount,
            realized_impact_pct: realized_impact_pct(pending.expected_out, out_amount),
        }
    }
}

#[async_trait]
impl SwapExecutor for AggregatorSwapExecutor {
    #[instrument(skip(self, quote), err)]
    async fn execute(&self, quote: &ConversionQuote) -> FundingResult<SwapResult> {
        let build = self
            .aggregator
            .build_swap(&quote.route, self.wallet)
            .await
            .map_err(|e| {
                if e.is_rejection() {
                    let message = e.to_string();
                    if message.to_lowercase().contains("expired") {
                        FundingError::QuoteExpired
                    } else {
                        FundingError::SwapRejected(message)
                    }
                } else {
                    FundingError::ProviderUnavailable(e.to_string())
                }
            })?;

        let to = Address::from_str(&build.to)
            .map_err(|e| FundingError::Internal(format!("malformed swap target address: {e}")))?;
        let data = Bytes::from_str(&build.data)
            .map_err(|e| FundingError::Internal(format!("malformed swap calldata: {e}")))?;
        let value = match &build.value {
            Some(v) => U256::from_str(v)
                .map_err(|e| FundingError::Internal(format!("malformed swap value: {e}")))?,
            None => U256::ZERO,
        };

        let balance_before = self
            .chain
            .token_balance(self.output_token, self.wallet)
            .await
            .map_err(FundingError::from)?;

        let tx_hash = self
            .chain
            .send_transaction(to, data, value)
            .await
            .map_err(|e| FundingError::BroadcastFailed(e.to_string()))?;

        tracing::info!("Swap broadcast: {tx_hash}, awaiting confirmation");

        let context = PendingSwap {
            tx_hash,
            balance_before,
            expected_out: quote.out_amount,
        };

        let deadline = Instant::now() + self.confirm_timeout;
        loop {
            match self.chain.transaction_status(tx_hash).await {
                Ok(Some(true)) => return Ok(self.settle(context).await),
                Ok(Some(false)) => {
                    return Err(FundingError::SwapRejected(format!(
                        "transaction {tx_hash} reverted on-chain"
                    )));
                }
                Ok(None) => {}
                // The transaction is already out; an RPC hiccup while
                // polling must not abort the wait.
                Err(e) => tracing::warn!("Receipt poll failed ({e}), will retry"),
            }

            if Instant::now() >= deadline {
                // Park the context so check_landed can resolve it later
                *self.pending.lock().await = Some(context);
                return Err(FundingError::ConfirmationTimeout { tx_hash });
            }

            tokio::time::sleep(self.poll_interval).await;
        }
    }

    #[instrument(skip(self), err)]
    async fn check_landed(&self, tx_hash: B256) -> FundingResult<Option<SwapResult>> {
        let mut pending = self.pending.lock().await;

        match self.chain.transaction_status(tx_hash).await {
            Ok(Some(true)) => {
                let landed = pending
                    .take()
                    .filter(|p| p.tx_hash == tx_hash)
                    .ok_or_else(|| {
                        FundingError::Internal(format!("no pending swap recorded for {tx_hash}"))
                    })?;
                drop(pending);
                Ok(Some(self.settle(landed).await))
            }
            Ok(Some(false)) => {
                pending.take();
                Ok(None)
            }
            Ok(None) => Err(FundingError::ConfirmationTimeout { tx_hash }),
            Err(e) => Err(FundingError::RpcUnavailable(e.to_string())),
        }
    }
}
