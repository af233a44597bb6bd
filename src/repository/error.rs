use thiserror::Error;

#[derive(Debug, Clone, Error)]
pub enum RepositoryError {
    #[error("RPC error: {0}")]
    RpcError(String),

    #[error("Contract call error: {0}")]
    ContractError(String),

    #[error("Network error: {0}")]
    NetworkError(String),

    #[error("Parse error: {0}")]
    ParseError(String),

    /// Non-success HTTP response from a provider API, with the status code
    /// preserved so callers can tell a rejection from an outage.
    #[error("API error ({status}): {message}")]
    ApiError { status: u16, message: String },

    #[error("{0}")]
    Other(String),
}

impl RepositoryError {
    /// True for 4xx responses, where the provider understood the request and
    /// refused it. 5xx and transport errors are outages, not rejections.
    pub fn is_rejection(&self) -> bool {
        matches!(self, RepositoryError::ApiError { status, .. } if (400..500).contains(status))
    }
}
