//! EIP-712 domain and order schema for the 0x v3 exchange.
//!
//! The exchange contract verifies order signatures against a fixed domain
//! (`"0x Protocol"`, `"3.0.0"`) bound to the chain id and the exchange
//! address the order names. `OrderMapper` turns an [`Order`] into the typed
//! message and domain consumed by the typed-data encoder.

use alloy_primitives::{keccak256, Address, Bytes, B256, U256};
use alloy_sol_types::SolValue;

use super::typed_data::{TypedDataEncoder, TypedDataSchema, TypedMessage, TypedValue, DOMAIN_TYPE};
use crate::types::Order;
use crate::{Error, Result};

/// Chain ID for Ethereum mainnet.
pub const MAINNET_CHAIN_ID: u64 = 1;

/// Chain ID for the Ganache snapshot the 0x contracts are deployed to in tests.
pub const GANACHE_CHAIN_ID: u64 = 1337;

/// 0x v3 Exchange contract address on Ethereum mainnet.
pub const EXCHANGE_V3_ADDRESS: &str = "0x61935CbDd02287B511119DDb11Aeb42F1593b7Ef";

/// EIP-712 domain name of the exchange.
pub const EXCHANGE_DOMAIN_NAME: &str = "0x Protocol";

/// EIP-712 domain version of the exchange.
pub const EXCHANGE_DOMAIN_VERSION: &str = "3.0.0";

/// Name of the order struct type.
pub const ORDER_TYPE: &str = "Order";

/// Order members in the order the exchange hashes them.
const ORDER_FIELDS: [(&str, &str); 14] = [
    ("makerAddress", "address"),
    ("takerAddress", "address"),
    ("feeRecipientAddress", "address"),
    ("senderAddress", "address"),
    ("makerAssetAmount", "uint256"),
    ("takerAssetAmount", "uint256"),
    ("makerFee", "uint256"),
    ("takerFee", "uint256"),
    ("expirationTimeSeconds", "uint256"),
    ("salt", "uint256"),
    ("makerAssetData", "bytes"),
    ("takerAssetData", "bytes"),
    ("makerFeeAssetData", "bytes"),
    ("takerFeeAssetData", "bytes"),
];

const DOMAIN_FIELDS: [(&str, &str); 4] = [
    ("name", "string"),
    ("version", "string"),
    ("chainId", "uint256"),
    ("verifyingContract", "address"),
];

/// EIP-712 domain separator for order signing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Eip712Domain {
    /// Domain name.
    pub name: String,
    /// Domain version.
    pub version: String,
    /// Chain ID.
    pub chain_id: U256,
    /// Verifying contract address.
    pub verifying_contract: Address,
}

impl Eip712Domain {
    /// Create the exchange domain for a chain and exchange deployment.
    pub fn exchange(chain_id: u64, exchange_address: Address) -> Self {
        Self::custom(
            EXCHANGE_DOMAIN_NAME,
            EXCHANGE_DOMAIN_VERSION,
            chain_id,
            exchange_address,
        )
    }

    /// Create domain with custom parameters.
    pub fn custom(
        name: impl Into<String>,
        version: impl Into<String>,
        chain_id: u64,
        verifying_contract: Address,
    ) -> Self {
        Self {
            name: name.into(),
            version: version.into(),
            chain_id: U256::from(chain_id),
            verifying_contract,
        }
    }

    /// All four domain members as a typed message.
    pub fn to_message(&self) -> TypedMessage {
        TypedMessage::from([
            ("name".to_string(), TypedValue::String(self.name.clone())),
            ("version".to_string(), TypedValue::String(self.version.clone())),
            ("chainId".to_string(), TypedValue::Uint(self.chain_id)),
            (
                "verifyingContract".to_string(),
                TypedValue::Address(self.verifying_contract),
            ),
        ])
    }

    /// Compute the domain separator for the full four-member domain type.
    pub fn separator(&self) -> B256 {
        let domain_type_hash = keccak256(
            b"EIP712Domain(string name,string version,uint256 chainId,address verifyingContract)",
        );

        let name_hash = keccak256(self.name.as_bytes());
        let version_hash = keccak256(self.version.as_bytes());

        // Every member occupies a full word, so use standard (padded) ABI encoding.
        let encoded = (
            domain_type_hash,
            name_hash,
            version_hash,
            self.chain_id,
            self.verifying_contract,
        )
            .abi_encode();

        keccak256(&encoded)
    }
}

/// Parse transport-encoded asset data (`0x`-prefixed or bare hex).
pub fn parse_asset_data(value: &str) -> Result<Bytes> {
    let trimmed = value.trim();
    let digits = trimmed.strip_prefix("0x").unwrap_or(trimmed);
    hex::decode(digits)
        .map(Bytes::from)
        .map_err(|e| Error::InvalidOrder {
            message: format!("invalid asset data {:?}: {}", value, e),
        })
}

/// Maps orders onto the exchange's typed-data schema.
#[derive(Debug, Clone, Copy, Default)]
pub struct OrderMapper;

impl OrderMapper {
    /// The schema the exchange verifies orders against.
    pub fn schema() -> TypedDataSchema {
        TypedDataSchema::new()
            .with_type(DOMAIN_TYPE, &DOMAIN_FIELDS)
            .with_type(ORDER_TYPE, &ORDER_FIELDS)
    }

    /// The order as a typed message, one entry per order member.
    pub fn to_message(order: &Order) -> TypedMessage {
        let address = |a: Address| TypedValue::Address(a);
        let uint = |v: U256| TypedValue::Uint(v);
        let bytes = |b: &Bytes| TypedValue::Bytes(b.to_vec());

        TypedMessage::from([
            ("makerAddress".to_string(), address(order.maker_address())),
            ("takerAddress".to_string(), address(order.taker_address())),
            (
                "feeRecipientAddress".to_string(),
                address(order.fee_recipient_address()),
            ),
            ("senderAddress".to_string(), address(order.sender_address())),
            ("makerAssetAmount".to_string(), uint(order.maker_asset_amount())),
            ("takerAssetAmount".to_string(), uint(order.taker_asset_amount())),
            ("makerFee".to_string(), uint(order.maker_fee())),
            ("takerFee".to_string(), uint(order.taker_fee())),
            (
                "expirationTimeSeconds".to_string(),
                uint(order.expiration_time_seconds()),
            ),
            ("salt".to_string(), uint(order.salt())),
            ("makerAssetData".to_string(), bytes(order.maker_asset_data())),
            ("takerAssetData".to_string(), bytes(order.taker_asset_data())),
            (
                "makerFeeAssetData".to_string(),
                bytes(order.maker_fee_asset_data()),
            ),
            (
                "takerFeeAssetData".to_string(),
                bytes(order.taker_fee_asset_data()),
            ),
        ])
    }

    /// The exchange domain the order is signed under.
    pub fn to_domain(order: &Order) -> Eip712Domain {
        Eip712Domain::exchange(order.chain_id(), order.exchange_address())
    }

    /// The order hash: its EIP-712 digest under the exchange schema.
    pub fn order_hash(order: &Order) -> Result<B256> {
        Self::digest_with(&Self::schema(), order)
    }

    /// Digest of `order` under an explicit schema.
    pub fn digest_with(schema: &TypedDataSchema, order: &Order) -> Result<B256> {
        let encoder = TypedDataEncoder::new(schema);
        let digest = encoder.hash(ORDER_TYPE, &Self::to_message(order), &Self::to_domain(order))?;
        Ok(digest)
    }
}
