use std::time::Duration;

use alloy::primitives::{Address, U256};
use serde::{Deserialize, Serialize};
use tracing::instrument;

use crate::repository::{RepoResult, RepositoryError};

/// Quote returned by the liquidity aggregator.
///
/// Amounts are decimal strings in the token's smallest unit; `route` is an
/// opaque payload that must be echoed back verbatim when requesting the
/// prebuilt swap transaction.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuoteResponse {
    pub out_amount: String,
    pub price_impact_pct: String,
    pub route: serde_json::Value,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct SwapBuildRequest<'a> {
    route: &'a serde_json::Value,
    signer_public_key: String,
}

/// Unsigned transaction material returned by the aggregator's swap endpoint.
/// Signing happens locally; the aggregator never sees the private key.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SwapBuildResponse {
    pub to: String,
    pub data: String,
    #[serde(default)]
    pub value: Option<String>,
}

/// HTTP client for the liquidity aggregator API.
pub struct AggregatorClient {
    client: reqwest::Client,
    base_url: String,
}

impl AggregatorClient {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> RepoResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| RepositoryError::Other(e.to_string()))?;

        Ok(Self {
            client,
            base_url: base_url.into(),
        })
    }

    #[instrument(skip(self), err)]
    pub async fn get_quote(
        &self,
        input_token: Address,
        output_token: Address,
        amount: U256,
        slippage_bps: u16,
    ) -> RepoResult<QuoteResponse> {
        let url = format!(
            "{}/quote?inputToken={}&outputToken={}&amount={}&slippageBps={}",
            self.base_url, input_token, output_token, amount, slippage_bps
        );

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| RepositoryError::NetworkError(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(RepositoryError::ApiError {
                status: status.as_u16(),
                message,
            });
        }

        let quote = response
            .json::<QuoteResponse>()
            .await
            .map_err(|e| RepositoryError::ParseError(e.to_string()))?;

        tracing::debug!(
            "Quote {} -> {}: out_amount={}, impact={}%",
            input_token,
            output_token,
            quote.out_amount,
            quote.price_impact_pct
        );

        Ok(quote)
    }

    #[instrument(skip(self, route), err)]
    pub async fn build_swap(
        &self,
        route: &serde_json::Value,
        signer: Address,
    ) -> RepoResult<SwapBuildResponse> {
        let url = format!("{}/swap", self.base_url);

        let request = SwapBuildRequest {
            route,
            signer_public_key: signer.to_string(),
        };

        let response = self
            .client
            .post(&url)
            .json(&request)
            .send()
            .await
            .map_err(|e| RepositoryError::NetworkError(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(RepositoryError::ApiError {
                status: status.as_u16(),
                message,
            });
        }

        response
            .json::<SwapBuildResponse>()
            .await
            .map_err(|e| RepositoryError::ParseError(e.to_string()))
    }
}
