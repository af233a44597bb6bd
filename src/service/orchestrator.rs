use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use alloy::network::EthereumWallet;
use alloy::primitives::{Address, U256};
use alloy::providers::ProviderBuilder;
use alloy::signers::local::PrivateKeySigner;
use anyhow::Context;
use rust_decimal::Decimal;
use std::str::FromStr;
use tokio_util::sync::CancellationToken;
use tracing::instrument;

use crate::config::Config;
use crate::repository::{
    AggregatorClient, AlloyChainRepository, BridgeClient, ChainRepository,
};
use crate::service::balance::{BalanceReader, ChainBalanceReader};
use crate::service::bridge::{BridgeExecutor, HttpBridgeExecutor};
use crate::service::error::ErrorClass;
use crate::service::quote::{AggregatorQuoteProvider, QuoteProvider};
use crate::service::retry::{with_retries, RetryPolicy};
use crate::service::swap::{AggregatorSwapExecutor, SwapExecutor};
use crate::service::types::{
    ChainId, ConversionQuote, FundingCycleResult, FundingOutcome, SwapResult, TokenId,
};
use crate::service::utils::{format_balance, parse_amount};
use crate::service::{FundingError, FundingResult};

/// Native gas decimals on the target chain (1 unit = 10^18 wei).
const NATIVE_DECIMALS: u8 = 18;

/// Immutable funding policy, resolved once at startup from configuration.
#[derive(Debug, Clone)]
pub struct FundingPolicy {
    pub wallet: Address,
    pub source_chain: ChainId,
    pub target_chain: ChainId,
    pub stable_token: Address,
    pub wrapped_native: Address,
    /// Smallest-unit native balance below which a cycle tops up.
    pub gas_threshold: U256,
    /// Smallest-unit stable amount converted per cycle.
    pub topup_amount: U256,
    pub slippage_bps: u16,
    pub max_price_impact_pct: Decimal,
    pub retry: RetryPolicy,
}

/// Drives one funding cycle at a time per wallet:
/// check balance, quote, swap, bridge, verify.
///
/// All four pipeline seams are trait objects so the state machine can be
/// exercised against stubs. This is the only layer that decides retry
/// versus fatal versus re-verify; the components below it just return
/// typed errors.
pub struct FundingOrchestrator {
    balances: Arc<dyn BalanceReader>,
    quotes: Arc<dyn QuoteProvider>,
    swaps: Arc<dyn SwapExecutor>,
    bridge: Arc<dyn BridgeExecutor>,
    policy: FundingPolicy,
    cancel: CancellationToken,
    /// Per-wallet in-flight guard: a cycle must hold the wallet's lock from
    /// before the balance check until its terminal state, so two cycles can
    /// never race on nonces or double-convert the same funds.
    locks: std::sync::Mutex<HashMap<Address, Arc<tokio::sync::Mutex<()>>>>,
    /// Last terminal result per wallet, for the status endpoint.
    last_results: std::sync::Mutex<HashMap<Address, FundingCycleResult>>,
}

impl FundingOrchestrator {
    pub fn new(
        balances: Arc<dyn BalanceReader>,
        quotes: Arc<dyn QuoteProvider>,
        swaps: Arc<dyn SwapExecutor>,
        bridge: Arc<dyn BridgeExecutor>,
        policy: FundingPolicy,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            balances,
            quotes,
            swaps,
            bridge,
            policy,
            cancel,
            locks: std::sync::Mutex::new(HashMap::new()),
            last_results: std::sync::Mutex::new(HashMap::new()),
        }
    }

    /// Wires the full pipeline from configuration: chain providers with the
    /// signing key, aggregator and bridge clients, and the resolved policy.
    /// The signing key and clients live for the process lifetime and are
    /// read-only after this returns.
    pub async fn build(config: &Config, cancel: CancellationToken) -> anyhow::Result<Arc<Self>> {
        let signer = PrivateKeySigner::from_str(&config.wallet.private_key)
            .context("invalid wallet private key")?;
        let wallet_address = signer.address();
        let wallet = EthereumWallet::from(signer);

        let source_provider = Arc::new(
            ProviderBuilder::new()
                .wallet(wallet.clone())
                .connect_http(
                    config
                        .source_chain
                        .rpc_url
                        .parse()
                        .context("invalid source chain RPC URL")?,
                ),
        );
        let target_provider = Arc::new(
            ProviderBuilder::new().wallet(wallet).connect_http(
                config
                    .target_chain
                    .rpc_url
                    .parse()
                    .context("invalid target chain RPC URL")?,
            ),
        );

        let source_repo: Arc<dyn ChainRepository> = Arc::new(AlloyChainRepository::with_signer(
            source_provider,
            wallet_address,
        ));
        let target_repo: Arc<dyn ChainRepository> = Arc::new(AlloyChainRepository::with_signer(
            target_provider,
            wallet_address,
        ));

        let source_chain = ChainId(config.source_chain.name.clone());
        let target_chain = ChainId(config.target_chain.name.clone());

        let stable_token = Address::from_str(&config.source_chain.stable_token)
            .context("invalid stable token address")?;
        let wrapped_native = Address::from_str(&config.source_chain.wrapped_native)
            .context("invalid wrapped native address")?;

        let stable_decimals = match config.source_chain.stable_decimals {
            Some(d) => d,
            None => source_repo
                .token_decimals(stable_token)
                .await
                .context("failed to discover stable token decimals")?,
        };

        let gas_threshold = parse_amount(&config.funding.gas_threshold, NATIVE_DECIMALS)
            .map_err(|e| anyhow::anyhow!("invalid gas_threshold: {e}"))?;
        let topup_amount = parse_amount(&config.funding.topup_amount, stable_decimals)
            .map_err(|e| anyhow::anyhow!("invalid topup_amount: {e}"))?;
        let max_price_impact_pct = Decimal::from_str(&config.funding.max_price_impact_pct)
            .context("invalid max_price_impact_pct")?;

        let http_timeout = Duration::from_secs(config.funding.http_timeout_secs);
        let aggregator = Arc::new(AggregatorClient::new(
            config.aggregator.base_url.clone(),
            http_timeout,
        )?);
        let bridge_client = Arc::new(BridgeClient::new(
            config.bridge.base_url.clone(),
            config.bridge.provider.clone(),
            http_timeout,
        )?);

        let mut chains: HashMap<ChainId, Arc<dyn ChainRepository>> = HashMap::new();
        chains.insert(source_chain.clone(), source_repo.clone());
        chains.insert(target_chain.clone(), target_repo);

        let policy = FundingPolicy {
            wallet: wallet_address,
            source_chain,
            target_chain,
            stable_token,
            wrapped_native,
            gas_threshold,
            topup_amount,
            slippage_bps: config.funding.slippage_bps,
            max_price_impact_pct,
            retry: RetryPolicy {
                max_attempts: config.funding.max_attempts,
                base_backoff: Duration::from_millis(config.funding.backoff_base_ms),
            },
        };

        tracing::info!(
            "Funding pipeline initialized: wallet={}, threshold={} native, topup={} stable",
            wallet_address,
            config.funding.gas_threshold,
            config.funding.topup_amount
        );

        Ok(Arc::new(Self::new(
            Arc::new(ChainBalanceReader::new(chains)),
            Arc::new(AggregatorQuoteProvider::new(aggregator.clone())),
            Arc::new(AggregatorSwapExecutor::new(
                aggregator,
                source_repo,
                wallet_address,
                wrapped_native,
                Duration::from_secs(config.funding.confirm_timeout_secs),
                Duration::from_millis(config.funding.confirm_poll_ms),
            )),
            Arc::new(HttpBridgeExecutor::new(bridge_client)),
            policy,
            cancel,
        )))
    }

    pub fn policy(&self) -> &FundingPolicy {
        &self.policy
    }

    /// Collaborator-facing gate, called before any gas-consuming operation.
    ///
    /// Returns true immediately when the target-chain balance is already at
    /// the threshold; otherwise blocks for one funding cycle and returns the
    /// post-cycle sufficiency. Funding failures never propagate as errors:
    /// the caller sees `false` and must defer its on-chain action.
    pub async fn ensure_sufficient_gas(&self, wallet: Address) -> bool {
        self.run_cycle(wallet).await.is_sufficient()
    }

    /// Runs funding cycles on a fixed interval until cancelled.
    pub async fn run_periodic(&self, interval: Duration) {
        loop {
            tokio::select! {
                _ = self.cancel.cancelled() => {
                    tracing::info!("Periodic funding loop stopped");
                    return;
                }
                _ = tokio::time::sleep(interval) => {
                    self.run_cycle(self.policy.wallet).await;
                }
            }
        }
    }

    /// Snapshot of the last terminal result per wallet.
    pub fn last_results(&self) -> HashMap<Address, FundingCycleResult> {
        self.last_results
            .lock()
            .expect("last_results lock poisoned")
            .clone()
    }

    /// Runs one complete funding cycle for `wallet`, serialized against any
    /// other cycle for the same wallet.
    #[instrument(skip(self))]
    pub async fn run_cycle(&self, wallet: Address) -> FundingCycleResult {
        let lock = self.wallet_lock(wallet);
        let _guard = lock.lock().await;

        let result = self.run_cycle_locked(wallet).await;

        match result.outcome {
            FundingOutcome::SkippedSufficient => {
                tracing::debug!("Funding cycle skipped, balance sufficient")
            }
            FundingOutcome::Funded => tracing::info!(
                "Funding cycle complete: bridged {} native to {wallet}",
                result
                    .bridged_received
                    .map(|v| format_balance(v, NATIVE_DECIMALS))
                    .unwrap_or_default()
            ),
            FundingOutcome::Failed => tracing::error!(
                "Funding cycle failed for {wallet}: {}",
                result
                    .error
                    .as_ref()
                    .map(ToString::to_string)
                    .unwrap_or_default()
            ),
        }

        self.last_results
            .lock()
            .expect("last_results lock poisoned")
            .insert(wallet, result.clone());

        result
    }

    fn wallet_lock(&self, wallet: Address) -> Arc<tokio::sync::Mutex<()>> {
        self.locks
            .lock()
            .expect("wallet locks poisoned")
            .entry(wallet)
            .or_default()
            .clone()
    }

    /// The cycle state machine proper. Holds the wallet lock via the caller.
    async fn run_cycle_locked(&self, wallet: Address) -> FundingCycleResult {
        let mut stages = Stages::default();

        // CheckingBalance
        let balance_before = match self.read_target_balance(wallet, "checking-balance").await {
            Ok(balance) => balance,
            Err(e) => return self.finish(wallet, FundingOutcome::Failed, stages, Some(e)),
        };
        stages.balance_before = Some(balance_before);

        if balance_before >= self.policy.gas_threshold {
            return self.finish(wallet, FundingOutcome::SkippedSufficient, stages, None);
        }

        tracing::info!(
            "Gas balance {} below threshold {}, starting funding cycle",
            format_balance(balance_before, NATIVE_DECIMALS),
            format_balance(self.policy.gas_threshold, NATIVE_DECIMALS)
        );

        if self.cancel.is_cancelled() {
            return self.finish(
                wallet,
                FundingOutcome::Failed,
                stages,
                Some(FundingError::Cancelled),
            );
        }

        // Quoting
        let quote = match self.fetch_quote().await {
            Ok(quote) => quote,
            Err(e) => return self.finish(wallet, FundingOutcome::Failed, stages, Some(e)),
        };
        stages.quoted_out = Some(quote.out_amount);

        if self.cancel.is_cancelled() {
            return self.finish(
                wallet,
                FundingOutcome::Failed,
                stages,
                Some(FundingError::Cancelled),
            );
        }

        // Swapping. From here on cancellation is no longer honored: once a
        // transaction may have been broadcast the cycle must reach
        // Verifying so its effect is recorded.
        let swap = match self.execute_swap(quote).await {
            Ok(swap) => swap,
            Err(e) => return self.finish(wallet, FundingOutcome::Failed, stages, Some(e)),
        };
        stages.swapped_out = Some(swap.out_amount);

        // Bridging: always the actual swap output, always to our own wallet
        let policy = &self.policy.retry;
        let bridged = match with_retries(policy, "bridging", || {
            self.bridge.bridge(
                swap.out_amount,
                &self.policy.source_chain,
                &self.policy.target_chain,
                wallet,
            )
        })
        .await
        {
            Ok(bridged) => bridged,
            Err(e) => return self.finish(wallet, FundingOutcome::Failed, stages, Some(e)),
        };
        stages.bridged_received = Some(bridged.amount_received);

        // Verifying
        let balance_after = match self.read_target_balance(wallet, "verifying").await {
            Ok(balance) => balance,
            Err(e) => return self.finish(wallet, FundingOutcome::Failed, stages, Some(e)),
        };
        stages.balance_after = Some(balance_after);

        if balance_after < self.policy.gas_threshold {
            let error = FundingError::BelowThreshold {
                balance: balance_after,
                threshold: self.policy.gas_threshold,
            };
            return self.finish(wallet, FundingOutcome::Failed, stages, Some(error));
        }

        self.finish(wallet, FundingOutcome::Funded, stages, None)
    }

    async fn read_target_balance(&self, wallet: Address, step: &str) -> FundingResult<U256> {
        let balance = with_retries(&self.policy.retry, step, || {
            self.balances
                .read(&self.policy.target_chain, wallet, &TokenId::Native)
        })
        .await?;
        Ok(balance.amount)
    }

    /// Fetches a quote for the fixed top-up amount and applies the
    /// price-impact ceiling. Exceeding the ceiling fails the cycle without
    /// retry; impact will not improve by asking again.
    async fn fetch_quote(&self) -> FundingResult<ConversionQuote> {
        let quote = with_retries(&self.policy.retry, "quoting", || {
            self.quotes.quote(
                self.policy.stable_token,
                self.policy.wrapped_native,
                self.policy.topup_amount,
                self.policy.slippage_bps,
            )
        })
        .await?;

        if quote.price_impact_pct > self.policy.max_price_impact_pct {
            return Err(FundingError::PriceImpactTooHigh {
                impact: quote.price_impact_pct,
                max: self.policy.max_price_impact_pct,
            });
        }

        Ok(quote)
    }

    /// Swap step with ambiguous-state handling.
    ///
    /// A confirmation timeout means the broadcast transaction may already
    /// have consumed the input funds, so this never re-executes without
    /// first resolving the original transaction through `check_landed`:
    /// landed is accepted as the result, reverted frees us to try again,
    /// still-pending is re-checked until the attempt budget runs out.
    async fn execute_swap(&self, quote: ConversionQuote) -> FundingResult<SwapResult> {
        let max_attempts = self.policy.retry.max_attempts;
        let mut quote = quote;
        let mut attempt = 1u32;

        loop {
            match self.swaps.execute(&quote).await {
                Ok(swap) => return Ok(swap),

                Err(FundingError::QuoteExpired) => {
                    if attempt >= max_attempts {
                        return Err(FundingError::QuoteExpired);
                    }
                    tracing::warn!("Quote expired before execution, re-fetching");
                    tokio::time::sleep(self.policy.retry.backoff(attempt)).await;
                    attempt += 1;
                    quote = self.fetch_quote().await?;
                }

                Err(FundingError::ConfirmationTimeout { tx_hash }) => loop {
                    match self.swaps.check_landed(tx_hash).await {
                        Ok(Some(swap)) => {
                            tracing::info!(
                                "Swap {tx_hash} landed after confirmation timeout, accepting"
                            );
                            return Ok(swap);
                        }
                        Ok(None) => {
                            // Definitively reverted; a fresh execution is safe
                            if attempt >= max_attempts {
                                return Err(FundingError::SwapRejected(format!(
                                    "transaction {tx_hash} reverted on-chain"
                                )));
                            }
                            tokio::time::sleep(self.policy.retry.backoff(attempt)).await;
                            attempt += 1;
                            break;
                        }
                        Err(e) => {
                            if attempt >= max_attempts {
                                return Err(e);
                            }
                            tracing::warn!("Swap {tx_hash} still unresolved ({e}), re-checking");
                            tokio::time::sleep(self.policy.retry.backoff(attempt)).await;
                            attempt += 1;
                        }
                    }
                },

                Err(e) if e.classify() == ErrorClass::Transient => {
                    if attempt >= max_attempts {
                        return Err(e);
                    }
                    tracing::warn!(
                        "Swap attempt {attempt}/{max_attempts} failed ({e}), retrying"
                    );
                    tokio::time::sleep(self.policy.retry.backoff(attempt)).await;
                    attempt += 1;
                }

                Err(e) => return Err(e),
            }
        }
    }

    fn finish(
        &self,
        wallet: Address,
        outcome: FundingOutcome,
        stages: Stages,
        error: Option<FundingError>,
    ) -> FundingCycleResult {
        FundingCycleResult {
            wallet,
            outcome,
            balance_before: stages.balance_before,
            quoted_out: stages.quoted_out,
            swapped_out: stages.swapped_out,
            bridged_received: stages.bridged_received,
            balance_after: stages.balance_after,
            error,
            completed_at: chrono::Utc::now().timestamp(),
        }
    }
}

#[derive(Default)]
struct Stages {
    balance_before: Option<U256>,
    quoted_out: Option<U256>,
    swapped_out: Option<U256>,
    bridged_received: Option<U256>,
    balance_after: Option<U256>,
}
