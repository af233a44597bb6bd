pub mod app;
pub mod config;
pub mod middleware;
pub mod repository;
pub mod service;

pub use app::build_app;

// Re-export commonly used types for tests
pub use service::{
    BalanceReader, BridgeExecutor, BridgeResult, ChainId, ConversionQuote, FundingCycleResult,
    FundingError, FundingOrchestrator, FundingOutcome, FundingPolicy, QuoteProvider, RetryPolicy,
    SwapExecutor, SwapResult, TokenId, WalletBalance,
};
