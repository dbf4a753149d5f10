//! Transactions, receipts and logs.

use alloy_primitives::{Address, Bytes, B256, U256};
use serde::{Deserialize, Serialize};

/// An unsigned legacy transaction for one submission attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransactionRequest {
    pub nonce: u64,
    pub from: Address,
    /// `None` only for contract creation, which the builder never emits.
    pub to: Option<Address>,
    pub value: U256,
    pub gas_limit: u64,
    pub gas_price: u128,
    pub data: Bytes,
    pub chain_id: u64,
}

/// A signed transaction ready for broadcast.
///
/// Not `Clone`: a signed payload is consumed by the broadcast that sends it.
#[derive(Debug, PartialEq, Eq)]
pub struct SignedTransaction {
    pub request: TransactionRequest,
    /// EIP-155 `v` (`chain_id * 2 + 35 + parity`).
    pub v: u64,
    pub r: B256,
    pub s: B256,
    /// RLP-encoded signed transaction.
    pub raw: Bytes,
    pub hash: B256,
}

impl SignedTransaction {
    pub fn raw_hex(&self) -> String {
        format!("0x{}", hex::encode(&self.raw))
    }
}

/// Ethereum log entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Log {
    pub address: Address,
    pub topics: Vec<B256>,
    pub data: Bytes,
    #[serde(default, with = "quantity::opt")]
    pub block_number: Option<u64>,
    #[serde(default)]
    pub transaction_hash: Option<B256>,
    #[serde(default, with = "quantity::opt")]
    pub log_index: Option<u64>,
}

impl Log {
    /// The event signature hash (`topics[0]`), absent for anonymous events.
    pub fn event_signature(&self) -> Option<B256> {
        self.topics.first().copied()
    }
}

/// Receipt of a mined transaction.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionReceipt {
    pub transaction_hash: B256,
    pub block_hash: B256,
    #[serde(with = "quantity")]
    pub block_number: u64,
    #[serde(with = "quantity")]
    pub gas_used: u64,
    #[serde(default, with = "quantity::opt")]
    pub status: Option<u64>,
    #[serde(default)]
    pub logs: Vec<Log>,
}

impl TransactionReceipt {
    /// Whether execution succeeded (post-Byzantium status `0x1`).
    pub fn succeeded(&self) -> bool {
        self.status == Some(1)
    }
}

/// Serde adapter for JSON-RPC hex quantities (`"0x1a"`).
pub(crate) mod quantity {
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn parse(value: &str) -> Result<u64, std::num::ParseIntError> {
        u64::from_str_radix(value.trim_start_matches("0x"), 16)
    }

    pub fn serialize<S: Serializer>(value: &u64, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&format!("0x{:x}", value))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<u64, D::Error> {
        let s = String::deserialize(deserializer)?;
        parse(&s).map_err(serde::de::Error::custom)
    }

    pub mod opt {
        use serde::{Deserialize, Deserializer, Serializer};

        pub fn serialize<S: Serializer>(
            value: &Option<u64>,
            serializer: S,
        ) -> Result<S::Ok, S::Error> {
            match value {
                Some(v) => super::serialize(v, serializer),
                None => serializer.serialize_none(),
            }
        }

        pub fn deserialize<'de, D: Deserializer<'de>>(
            deserializer: D,
        ) -> Result<Option<u64>, D::Error> {
            let s = Option::<String>::deserialize(deserializer)?;
            s.map(|s| super::parse(&s).map_err(serde::de::Error::custom))
                .transpose()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_receipt_from_rpc_json() {
        let json = serde_json::json!({
            "transactionHash": "0x1111111111111111111111111111111111111111111111111111111111111111",
            "blockHash": "0x2222222222222222222222222222222222222222222222222222222222222222",
            "blockNumber": "0x10",
            "gasUsed": "0x5208",
            "status": "0x1",
            "logs": [{
                "address": "0x61935cbdd02287b511119ddb11aeb42f1593b7ef",
                "topics": ["0x3333333333333333333333333333333333333333333333333333333333333333"],
                "data": "0x",
                "blockNumber": "0x10",
                "transactionHash": "0x1111111111111111111111111111111111111111111111111111111111111111",
                "logIndex": "0x0"
            }]
        });

        let receipt: TransactionReceipt = serde_json::from_value(json).unwrap();
        assert_eq!(receipt.block_number, 16);
        assert_eq!(receipt.gas_used, 21_000);
        assert!(receipt.succeeded());
        assert_eq!(receipt.logs.len(), 1);
        assert_eq!(
            receipt.logs[0].event_signature(),
            Some(B256::repeat_byte(0x33))
        );
        assert_eq!(receipt.logs[0].log_index, Some(0));
    }

    #[test]
    fn test_reverted_receipt() {
        let json = serde_json::json!({
            "transactionHash": "0x1111111111111111111111111111111111111111111111111111111111111111",
            "blockHash": "0x2222222222222222222222222222222222222222222222222222222222222222",
            "blockNumber": "0x1",
            "gasUsed": "0x1",
            "status": "0x0"
        });
        let receipt: TransactionReceipt = serde_json::from_value(json).unwrap();
        assert!(!receipt.succeeded());
        assert!(receipt.logs.is_empty());
    }
}
