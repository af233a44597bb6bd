use std::{fs, path::Path};

use dotenv::dotenv;
use envsubst::substitute;
use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub server: ServerConfig,
    pub source_chain: SourceChainConfig,
    pub target_chain: TargetChainConfig,
    pub aggregator: AggregatorConfig,
    pub bridge: BridgeConfig,
    pub wallet: WalletConfig,
    pub funding: FundingSettings,
}

impl Config {
    pub async fn from_yaml(path: impl AsRef<Path>) -> Self {
        dotenv().ok();

        let file_content =
            fs::read_to_string(path).expect("failed to read config file from path: {path}");

        let env_vars: std::collections::HashMap<String, String> = std::env::vars()
            .filter(|(key, _)| {
                key.starts_with("SERVER_")
                    || key.starts_with("WALLET_")
                    || key.starts_with("RPC_")
                    || key.starts_with("FUNDING_")
                    || key == "PRIVATE_KEY"
            })
            .collect();

        let interpolated = substitute(&file_content, &env_vars)
            .expect("Failed to substitute environment variables in YAML");

        let config: Config =
            serde_yaml::from_str(&interpolated).expect("Failed to parse YAML configuration");

        config
    }

    pub fn server_uri(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

/// Chain holding the stable token that funds conversions.
#[derive(Debug, Clone, Deserialize)]
pub struct SourceChainConfig {
    pub name: String,
    pub rpc_url: String,
    /// Stable token contract address.
    pub stable_token: String,
    /// Decimal count override for the stable token. Discovered on-chain at
    /// startup when absent.
    pub stable_decimals: Option<u8>,
    /// Wrapped native token the stable token is converted into before
    /// bridging.
    pub wrapped_native: String,
}

/// Chain whose native gas balance is kept above the threshold.
#[derive(Debug, Clone, Deserialize)]
pub struct TargetChainConfig {
    pub name: String,
    pub rpc_url: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AggregatorConfig {
    pub base_url: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct BridgeConfig {
    pub base_url: String,
    pub provider: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct WalletConfig {
    pub private_key: String,
}

/// Funding policy knobs. The pipeline takes these purely as constructor
/// parameters; no defaults are baked into the algorithms.
#[derive(Debug, Clone, Deserialize)]
pub struct FundingSettings {
    /// Target-chain native balance below which a cycle tops up, in
    /// human-readable native units (e.g. "0.003").
    pub gas_threshold: String,
    /// Stable-token amount converted per cycle, in human-readable units.
    /// A fixed top-up rather than the full shortfall, bounding the value
    /// at risk in any single cycle.
    pub topup_amount: String,
    pub slippage_bps: u16,
    pub max_price_impact_pct: String,
    pub max_attempts: u32,
    pub backoff_base_ms: u64,
    pub confirm_timeout_secs: u64,
    pub confirm_poll_ms: u64,
    pub http_timeout_secs: u64,
    pub check_interval_secs: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    #[serial_test::serial]
    async fn test_load_config_from_yaml() {
        let config = Config::from_yaml("config/test.yaml").await;

        assert_eq!(config.server.host, "0.0.0.0");
        assert_eq!(config.server.port, 8000);

        assert_eq!(config.source_chain.name, "base");
        assert_eq!(config.target_chain.name, "ethereum");
        assert_eq!(config.source_chain.stable_decimals, Some(6));

        assert_eq!(config.funding.slippage_bps, 50);
        assert_eq!(config.funding.max_attempts, 3);
        assert_eq!(config.funding.gas_threshold, "0.003");
        assert_eq!(config.funding.topup_amount, "10");

        // No signing key in the test fixture
        assert_eq!(config.wallet.private_key, "");
    }

    #[tokio::test]
    #[serial_test::serial]
    async fn test_config_with_env_vars() {
        unsafe {
            std::env::set_var("PRIVATE_KEY", "0xtest_private_key_123");
        }

        let config = Config::from_yaml("config/test.yaml").await;

        assert!(!config.source_chain.rpc_url.is_empty());
        assert!(config.funding.check_interval_secs > 0);

        unsafe {
            std::env::remove_var("PRIVATE_KEY");
        }
    }

    #[tokio::test]
    #[serial_test::serial]
    async fn test_config_debug_format() {
        let config = Config::from_yaml("config/test.yaml").await;

        let debug_output = format!("{:?}", config);
        assert!(debug_output.contains("Config"));
        assert!(debug_output.contains("source_chain"));
        assert!(debug_output.contains("funding"));
    }
}
