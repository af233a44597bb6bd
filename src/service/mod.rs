pub mod balance;
pub mod bridge;
pub mod error;
pub mod orchestrator;
pub mod quote;
pub mod retry;
pub mod swap;
pub mod types;
pub mod utils;


pub use balance::{BalanceReader, ChainBalanceReader};
pub use bridge::{BridgeExecutor, HttpBridgeExecutor};
pub use error::{ErrorClass, FundingError};
pub use orchestrator::{FundingOrchestrator, FundingPolicy};
pub use quote::{AggregatorQuoteProvider, QuoteProvider};
pub use retry::RetryPolicy;
pub use swap::{AggregatorSwapExecutor, SwapExecutor};
pub use types::*;

pub(crate) type FundingResult<T> = std::result::Result<T, FundingError>;
