//! Node collaborator used by the transaction pipeline and watcher.

use alloy_primitives::{Address, B256};
use async_trait::async_trait;
use futures_util::stream::BoxStream;

use crate::types::{Log, TransactionReceipt};
use crate::Result;

/// Stream of logs matching a subscription. Dropping it ends the subscription.
pub type LogStream = BoxStream<'static, Result<Log>>;

/// The Ethereum node operations the submission flow depends on.
///
/// Retry and backoff for individual calls are the implementation's concern.
#[async_trait]
pub trait NodeClient: Send + Sync {
    /// Transaction count of `address` at the latest block.
    async fn get_nonce(&self, address: Address) -> Result<u64>;

    /// Broadcast an RLP-encoded signed transaction, returning its hash.
    async fn send_raw_transaction(&self, raw: &[u8]) -> Result<B256>;

    /// Receipt of `tx_hash`, or `None` while it is still pending.
    async fn get_receipt(&self, tx_hash: B256) -> Result<Option<TransactionReceipt>>;

    /// Logs emitted from the current block on whose first topic is one of
    /// `event_signatures`, optionally restricted to `address`.
    async fn subscribe_logs(
        &self,
        address: Option<Address>,
        event_signatures: Vec<B256>,
    ) -> Result<LogStream>;
}
