//! Configuration for order signing and transaction submission.

use crate::{Error, Result};
use alloy_primitives::Address;
use serde::Deserialize;
use std::env;

/// Application configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub node: NodeConfig,
    pub exchange: ExchangeConfig,
    #[serde(default)]
    pub gas: GasConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NodeConfig {
    pub rpc_url: String,
    /// Receipt and log polling interval.
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ExchangeConfig {
    #[serde(default = "default_chain_id")]
    pub chain_id: u64,
    pub exchange_address: Option<Address>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct GasConfig {
    #[serde(default = "default_gas_limit")]
    pub default_limit: u64,
    /// Percentage added on top of the node's gas price.
    #[serde(default = "default_price_bump_percent")]
    pub price_bump_percent: u32,
}

impl Default for GasConfig {
    fn default() -> Self {
        Self {
            default_limit: default_gas_limit(),
            price_bump_percent: default_price_bump_percent(),
        }
    }
}

fn default_poll_interval_ms() -> u64 {
    2_000
}

fn default_chain_id() -> u64 {
    1
}

fn default_gas_limit() -> u64 {
    200_000
}

fn default_price_bump_percent() -> u32 {
    20
}

fn parse_var<T: std::str::FromStr>(name: &str) -> Result<Option<T>>
where
    T::Err: std::fmt::Display,
{
    match env::var(name) {
        Ok(value) => value.trim().parse().map(Some).map_err(|e| Error::Config {
            message: format!("{} is invalid: {}", name, e),
        }),
        Err(_) => Ok(None),
    }
}

impl Config {
    /// Load configuration from environment variables.
    #[allow(clippy::result_large_err)]
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();

        Ok(Self {
            node: NodeConfig {
                rpc_url: env::var("RPC_URL").map_err(|_| Error::Config {
                    message: "RPC_URL environment variable not set".to_string(),
                })?,
                poll_interval_ms: parse_var("WATCH_POLL_INTERVAL_MS")?
                    .unwrap_or_else(default_poll_interval_ms),
            },
            exchange: ExchangeConfig {
                chain_id: parse_var("CHAIN_ID")?.unwrap_or_else(default_chain_id),
                exchange_address: parse_var("EXCHANGE_ADDRESS")?,
            },
            gas: GasConfig {
                default_limit: parse_var("GAS_LIMIT_DEFAULT")?.unwrap_or_else(default_gas_limit),
                price_bump_percent: parse_var("GAS_PRICE_BUMP_PERCENT")?
                    .unwrap_or_else(default_price_bump_percent),
            },
        })
    }

    /// Load configuration from a file, with `ZEROEX__SECTION__KEY` environment overrides.
    #[allow(clippy::result_large_err)]
    pub fn from_file(path: &str) -> Result<Self> {
        let settings = config::Config::builder()
            .add_source(config::File::with_name(path))
            .add_source(config::Environment::with_prefix("ZEROEX").separator("__"))
            .build()?;
        Ok(settings.try_deserialize()?)
    }

    /// Load configuration for testing (with defaults).
    pub fn test_config() -> Self {
        Self {
            node: NodeConfig {
                rpc_url: "http://127.0.0.1:8545".to_string(),
                poll_interval_ms: 10,
            },
            exchange: ExchangeConfig {
                chain_id: crate::signing::GANACHE_CHAIN_ID,
                exchange_address: None,
            },
            gas: GasConfig::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_gas_defaults() {
        let gas = GasConfig::default();
        assert_eq!(gas.default_limit, 200_000);
        assert_eq!(gas.price_bump_percent, 20);
    }

    #[test]
    fn test_from_file() {
        let path = env::temp_dir().join(format!("zeroex-config-{}.toml", std::process::id()));
        let mut file = std::fs::File::create(&path).unwrap();
        writeln!(
            file,
            r#"
[node]
rpc_url = "http://localhost:8545"

[exchange]
chain_id = 1337
exchange_address = "0x61935cbdd02287b511119ddb11aeb42f1593b7ef"
"#
        )
        .unwrap();

        let config = Config::from_file(path.to_str().unwrap()).unwrap();
        std::fs::remove_file(&path).ok();

        assert_eq!(config.node.rpc_url, "http://localhost:8545");
        assert_eq!(config.node.poll_interval_ms, 2_000);
        assert_eq!(config.exchange.chain_id, 1337);
        assert!(config.exchange.exchange_address.is_some());
        assert_eq!(config.gas.default_limit, 200_000);
    }

    #[test]
    fn test_missing_file_is_config_error() {
        let result = Config::from_file("/nonexistent/zeroex-config");
        assert!(matches!(result, Err(Error::ConfigFile(_))));
    }

    #[test]
    fn test_test_config() {
        let config = Config::test_config();
        assert_eq!(config.exchange.chain_id, 1337);
        assert_eq!(config.node.poll_interval_ms, 10);
    }
}
