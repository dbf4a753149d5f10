//! Gas limit and price providers.
//!
//! Transactions built for a contract method ask the provider with the
//! method's name; raw transfers ask without one.

use std::collections::HashMap;

use async_trait::async_trait;
use tracing::debug;

use crate::api::JsonRpcClient;
use crate::config::GasConfig;
use crate::Result;

/// Supplies gas limit and price for a transaction.
#[async_trait]
pub trait GasProvider: Send + Sync {
    async fn gas_limit(&self, method: Option<&str>) -> Result<u64>;

    async fn gas_price(&self, method: Option<&str>) -> Result<u128>;
}

/// Fixed gas price with per-method limit overrides.
#[derive(Debug, Clone)]
pub struct StaticGasProvider {
    default_limit: u64,
    gas_price: u128,
    method_limits: HashMap<String, u64>,
}

impl StaticGasProvider {
    pub fn new(default_limit: u64, gas_price: u128) -> Self {
        Self {
            default_limit,
            gas_price,
            method_limits: HashMap::new(),
        }
    }

    /// Use `limit` for calls to `method`.
    pub fn with_method_limit(mut self, method: impl Into<String>, limit: u64) -> Self {
        self.method_limits.insert(method.into(), limit);
        self
    }
}

#[async_trait]
impl GasProvider for StaticGasProvider {
    async fn gas_limit(&self, method: Option<&str>) -> Result<u64> {
        Ok(method
            .and_then(|m| self.method_limits.get(m).copied())
            .unwrap_or(self.default_limit))
    }

    async fn gas_price(&self, _method: Option<&str>) -> Result<u128> {
        Ok(self.gas_price)
    }
}

/// Node gas price plus a percentage bump for faster inclusion.
#[derive(Debug, Clone)]
pub struct RpcGasProvider {
    client: JsonRpcClient,
    limits: StaticGasProvider,
    price_bump_percent: u32,
}

impl RpcGasProvider {
    pub fn new(client: JsonRpcClient, config: &GasConfig) -> Self {
        Self {
            client,
            limits: StaticGasProvider::new(config.default_limit, 0),
            price_bump_percent: config.price_bump_percent,
        }
    }

    pub fn with_method_limit(mut self, method: impl Into<String>, limit: u64) -> Self {
        self.limits = self.limits.with_method_limit(method, limit);
        self
    }
}

/// `price * (100 + percent) / 100`, saturating.
fn bump(price: u128, percent: u32) -> u128 {
    price.saturating_add(price.saturating_mul(percent as u128) / 100)
}

#[async_trait]
impl GasProvider for RpcGasProvider {
    async fn gas_limit(&self, method: Option<&str>) -> Result<u64> {
        self.limits.gas_limit(method).await
    }

    async fn gas_price(&self, method: Option<&str>) -> Result<u128> {
        let base = self.client.gas_price().await?;
        let price = bump(base, self.price_bump_percent);
        debug!(base, price, method = method.unwrap_or("-"), "Gas price");
        Ok(price)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use tokio_test::{assert_err, assert_ok};

    #[tokio::test]
    async fn test_static_provider_method_overrides() {
        let gas = StaticGasProvider::new(100_000, 5).with_method_limit("fillOrder", 300_000);

        assert_eq!(assert_ok!(gas.gas_limit(Some("fillOrder")).await), 300_000);
        assert_eq!(assert_ok!(gas.gas_limit(Some("cancelOrder")).await), 100_000);
        assert_eq!(assert_ok!(gas.gas_limit(None).await), 100_000);
        assert_eq!(assert_ok!(gas.gas_price(None).await), 5);
    }

    #[tokio::test]
    async fn test_rpc_provider_limits_and_unreachable_node() {
        let mut config = Config::test_config();
        // Nothing listens on the discard port.
        config.node.rpc_url = "http://127.0.0.1:9".to_string();
        let client = JsonRpcClient::from_config(&config.node).unwrap();
        let gas = RpcGasProvider::new(client, &config.gas).with_method_limit("fillOrder", 400_000);

        assert_eq!(assert_ok!(gas.gas_limit(Some("fillOrder")).await), 400_000);
        assert_eq!(assert_ok!(gas.gas_limit(None).await), 200_000);
        assert_err!(gas.gas_price(None).await);
    }

    #[test]
    fn test_bump() {
        assert_eq!(bump(100, 20), 120);
        assert_eq!(bump(50_000_000_000, 0), 50_000_000_000);
        assert_eq!(bump(u128::MAX, 20), u128::MAX);
    }
}
