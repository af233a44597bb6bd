use std::time::Duration;

use alloy::primitives::{Address, U256};
use serde::{Deserialize, Serialize};
use tracing::instrument;

use crate::repository::{RepoResult, RepositoryError};

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct TransferRequest {
    amount: String,
    source_chain: String,
    target_chain: String,
    destination: String,
}

/// Bridge transfer receipt. `amount_received` is the post-fee value actually
/// delivered on the target chain and may be less than the requested amount.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransferResponse {
    pub transaction_hash: String,
    pub amount_received: String,
}

/// HTTP client for the bridge provider API.
pub struct BridgeClient {
    client: reqwest::Client,
    base_url: String,
    provider_name: String,
}

impl BridgeClient {
    pub fn new(
        base_url: impl Into<String>,
        provider_name: impl Into<String>,
        timeout: Duration,
    ) -> RepoResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| RepositoryError::Other(e.to_string()))?;

        Ok(Self {
            client,
            base_url: base_url.into(),
            provider_name: provider_name.into(),
        })
    }

    pub fn provider_name(&self) -> &str {
        &self.provider_name
    }

    #[instrument(skip(self), err)]
    pub async fn transfer(
        &self,
        amount: U256,
        source_chain: &str,
        target_chain: &str,
        destination: Address,
    ) -> RepoResult<TransferResponse> {
        let url = format!("{}/transfer", self.base_url);

        let request = TransferRequest {
            amount: amount.to_string(),
            source_chain: source_chain.to_string(),
            target_chain: target_chain.to_string(),
            destination: destination.to_string(),
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

        let transfer = response
            .json::<TransferResponse>()
            .await
            .map_err(|e| RepositoryError::ParseError(e.to_string()))?;

        tracing::debug!(
            "Bridge transfer {} -> {}: requested={}, received={}",
            source_chain,
            target_chain,
            amount,
            transfer.amount_received
        );

        Ok(transfer)
    }
}
