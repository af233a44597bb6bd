use std::str::FromStr;
use std::sync::Arc;

use alloy::primitives::{Address, U256};
use async_trait::async_trait;
use rust_decimal::Decimal;
use tracing::instrument;

use crate::repository::AggregatorClient;
use crate::service::types::ConversionQuote;
use crate::service::{FundingError, FundingResult};

/// Requests conversion quotes from the liquidity aggregator.
///
/// `in_amount` is always the smallest-unit integer; the decimal-to-integer
/// conversion happens once at the configuration boundary. The returned
/// price impact is surfaced unchanged so the orchestrator's ceiling policy
/// sees exactly what the provider reported.
#[async_trait]
pub trait QuoteProvider: Send + Sync {
    async fn quote(
        &self,
        input_token: Address,
        output_token: Address,
        in_amount: U256,
        slippage_bps: u16,
    ) -> FundingResult<ConversionQuote>;
}

/// [`QuoteProvider`] backed by the aggregator HTTP API.
pub struct AggregatorQuoteProvider {
    client: Arc<AggregatorClient>,
}

impl AggregatorQuoteProvider {
    pub fn new(client: Arc<AggregatorClient>) -> Self {
        Self { client }
    }
}

#[async_trait]
impl QuoteProvider for AggregatorQuoteProvider {
    #[instrument(skip(self), err)]
    async fn quote(
        &self,
        input_token: Address,
        output_token: Address,
        in_amount: U256,
        slippage_bps: u16,
    ) -> FundingResult<ConversionQuote> {
        let response = self
            .client
            .get_quote(input_token, output_token, in_amount, slippage_bps)
            .await
            .map_err(|e| {
                // A rejection means the aggregator found no viable path;
                // retrying the identical request cannot succeed.
                if e.is_rejection() {
                    FundingError::NoRoute(e.to_string())
                } else {
                    FundingError::ProviderUnavailable(e.to_string())
                }
            })?;

        let out_amount = U256::from_str(&response.out_amount).map_err(|e| {
            FundingError::Internal(format!("malformed aggregator out amount: {e}"))
        })?;

        let price_impact_pct = Decimal::from_str(&response.price_impact_pct).map_err(|e| {
            FundingError::Internal(format!("malformed aggregator price impact: {e}"))
        })?;

        Ok(ConversionQuote {
            input_token,
            output_token,
            in_amount,
            out_amount,
            price_impact_pct,
            slippage_bps,
            route: response.route,
        })
    }
}
