//! HTTP JSON-RPC node client.

use std::collections::VecDeque;
use std::time::Duration;

use alloy_primitives::{keccak256, Address, B256};
use async_trait::async_trait;
use futures_util::StreamExt;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use super::node::{LogStream, NodeClient};
use crate::config::NodeConfig;
use crate::types::transaction::quantity;
use crate::types::{Log, TransactionReceipt};
use crate::{Error, Result};

/// JSON-RPC client for an Ethereum node.
#[derive(Debug, Clone)]
pub struct JsonRpcClient {
    rpc_url: String,
    http_client: reqwest::Client,
    poll_interval: Duration,
}

impl JsonRpcClient {
    /// Create a client for `rpc_url`; log subscriptions poll every `poll_interval`.
    pub fn new(rpc_url: impl Into<String>, poll_interval: Duration) -> Result<Self> {
        let http_client = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .connect_timeout(Duration::from_secs(10))
            .build()?;
        Ok(Self {
            rpc_url: rpc_url.into(),
            http_client,
            poll_interval,
        })
    }

    pub fn from_config(config: &NodeConfig) -> Result<Self> {
        Self::new(
            config.rpc_url.clone(),
            Duration::from_millis(config.poll_interval_ms),
        )
    }

    pub fn rpc_url(&self) -> &str {
        &self.rpc_url
    }

    /// Get the current block number.
    pub async fn get_block_number(&self) -> Result<u64> {
        let hex: String = self
            .rpc_call("eth_blockNumber", serde_json::json!([]), Error::node_query)
            .await?
            .ok_or_else(|| Error::node_query("eth_blockNumber returned no result"))?;
        parse_quantity(&hex)
    }

    /// Get the current gas price in wei.
    pub async fn gas_price(&self) -> Result<u128> {
        let hex: String = self
            .rpc_call("eth_gasPrice", serde_json::json!([]), Error::node_query)
            .await?
            .ok_or_else(|| Error::node_query("eth_gasPrice returned no result"))?;
        u128::from_str_radix(hex.trim_start_matches("0x"), 16)
            .map_err(|e| Error::node_query(format!("Failed to parse gas price: {}", e)))
    }

    /// Get logs in `[from_block, to_block]` whose first topic is one of `signatures`.
    pub async fn get_logs(
        &self,
        address: Option<Address>,
        from_block: u64,
        to_block: u64,
        signatures: &[B256],
    ) -> Result<Vec<Log>> {
        let mut filter = serde_json::json!({
            "fromBlock": format!("0x{:x}", from_block),
            "toBlock": format!("0x{:x}", to_block),
            "topics": [signatures],
        });
        if let Some(address) = address {
            filter["address"] = serde_json::json!(address);
        }

        let logs: Option<Vec<Log>> = self
            .rpc_call("eth_getLogs", serde_json::json!([filter]), Error::node_query)
            .await?;
        Ok(logs.unwrap_or_default())
    }

    async fn rpc_call<T: DeserializeOwned>(
        &self,
        method: &str,
        params: serde_json::Value,
        fail: fn(String) -> Error,
    ) -> Result<Option<T>> {
        let request = JsonRpcRequest {
            jsonrpc: "2.0",
            id: 1,
            method,
            params,
        };

        let response = self
            .http_client
            .post(&self.rpc_url)
            .json(&request)
            .send()
            .await
            .map_err(|e| fail(format!("{} request failed: {}", method, e)))?;

        if !response.status().is_success() {
            return Err(fail(format!(
                "{} request failed: {}",
                method,
                response.status()
            )));
        }

        let body: JsonRpcResponse<T> = response
            .json()
            .await
            .map_err(|e| fail(format!("{} returned malformed response: {}", method, e)))?;

        if let Some(err) = body.error {
            return Err(fail(format!("{} error {}: {}", method, err.code, err.message)));
        }
        Ok(body.result)
    }
}

fn parse_quantity(hex: &str) -> Result<u64> {
    quantity::parse(hex)
        .map_err(|e| Error::node_query(format!("Failed to parse quantity {}: {}", hex, e)))
}

#[async_trait]
impl NodeClient for JsonRpcClient {
    async fn get_nonce(&self, address: Address) -> Result<u64> {
        let hex: String = self
            .rpc_call(
                "eth_getTransactionCount",
                serde_json::json!([address, "latest"]),
                Error::node_query,
            )
            .await?
            .ok_or_else(|| Error::node_query("Missing nonce result"))?;
        parse_quantity(&hex)
    }

    async fn send_raw_transaction(&self, raw: &[u8]) -> Result<B256> {
        let raw_hex = format!("0x{}", hex::encode(raw));
        let result: Result<Option<B256>> = self
            .rpc_call(
                "eth_sendRawTransaction",
                serde_json::json!([raw_hex]),
                Error::broadcast,
            )
            .await;

        match result {
            Ok(Some(hash)) => Ok(hash),
            Ok(None) => Err(Error::broadcast("Missing tx hash in response")),
            // The node already holds this exact payload; its hash is the payload hash.
            Err(Error::Broadcast { message }) if message.contains("already known") => {
                let hash = keccak256(raw);
                warn!(tx_hash = %hash, error = %message, "Transaction already known to node");
                Ok(hash)
            }
            Err(e) => Err(e),
        }
    }

    async fn get_receipt(&self, tx_hash: B256) -> Result<Option<TransactionReceipt>> {
        self.rpc_call(
            "eth_getTransactionReceipt",
            serde_json::json!([tx_hash]),
            Error::node_query,
        )
        .await
    }

    async fn subscribe_logs(
        &self,
        address: Option<Address>,
        event_signatures: Vec<B256>,
    ) -> Result<LogStream> {
        let from_block = self.get_block_number().await?;
        debug!(
            from_block,
            signatures = event_signatures.len(),
            "Subscribing to logs"
        );

        let poller = LogPoller {
            client: self.clone(),
            address,
            signatures: event_signatures,
            next_block: from_block,
            buffered: VecDeque::new(),
            failed: false,
        };

        Ok(futures_util::stream::unfold(poller, |mut poller| async move {
            poller.next_log().await.map(|item| (item, poller))
        })
        .boxed())
    }
}

/// Polls `eth_getLogs` over consecutive, non-overlapping block ranges.
struct LogPoller {
    client: JsonRpcClient,
    address: Option<Address>,
    signatures: Vec<B256>,
    next_block: u64,
    buffered: VecDeque<Log>,
    failed: bool,
}

impl LogPoller {
    async fn next_log(&mut self) -> Option<Result<Log>> {
        if self.failed {
            return None;
        }
        loop {
            if let Some(log) = self.buffered.pop_front() {
                return Some(Ok(log));
            }
            if let Err(e) = self.poll().await {
                self.failed = true;
                return Some(Err(e));
            }
        }
    }

    async fn poll(&mut self) -> Result<()> {
        let latest = self.client.get_block_number().await?;
        if latest >= self.next_block {
            let logs = self
                .client
                .get_logs(self.address, self.next_block, latest, &self.signatures)
                .await?;
            self.next_block = latest + 1;
            self.buffered.extend(logs);
        }
        if self.buffered.is_empty() {
            tokio::time::sleep(self.client.poll_interval).await;
        }
        Ok(())
    }
}

#[derive(Debug, Serialize)]
struct JsonRpcRequest<'a> {
    jsonrpc: &'a str,
    id: u64,
    method: &'a str,
    params: serde_json::Value,
}

#[derive(Debug, Deserialize)]
struct JsonRpcResponse<T> {
    result: Option<T>,
    error: Option<JsonRpcError>,
}

#[derive(Debug, Deserialize)]
struct JsonRpcError {
    code: i64,
    message: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_response_with_result() {
        let body: JsonRpcResponse<String> =
            serde_json::from_str(r#"{"jsonrpc":"2.0","id":1,"result":"0x1f"}"#).unwrap();
        assert_eq!(parse_quantity(&body.result.unwrap()).unwrap(), 31);
        assert!(body.error.is_none());
    }

    #[test]
    fn test_response_with_error() {
        let body: JsonRpcResponse<String> = serde_json::from_str(
            r#"{"jsonrpc":"2.0","id":1,"error":{"code":-32000,"message":"nonce too low"}}"#,
        )
        .unwrap();
        assert!(body.result.is_none());
        let err = body.error.unwrap();
        assert_eq!(err.code, -32000);
        assert_eq!(err.message, "nonce too low");
    }

    #[test]
    fn test_pending_receipt_is_null() {
        let body: JsonRpcResponse<TransactionReceipt> =
            serde_json::from_str(r#"{"jsonrpc":"2.0","id":1,"result":null}"#).unwrap();
        assert!(body.result.is_none());
    }

    #[test]
    fn test_parse_quantity_rejects_garbage() {
        assert!(matches!(
            parse_quantity("0xzz"),
            Err(Error::NodeQuery { .. })
        ));
    }

    #[tokio::test]
    async fn test_unreachable_node_is_node_query_error() {
        let client = JsonRpcClient::new("http://127.0.0.1:1", Duration::from_millis(10)).unwrap();
        let result = client.get_nonce(Address::ZERO).await;
        assert!(matches!(result, Err(Error::NodeQuery { .. })));

        let result = client.send_raw_transaction(&[0xc0]).await;
        assert!(matches!(result, Err(Error::Broadcast { .. })));
    }
}
