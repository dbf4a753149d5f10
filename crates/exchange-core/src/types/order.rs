//! 0x v3 limit orders.

use alloy_primitives::{Address, Bytes, U256};
use serde::{Deserialize, Serialize};

use crate::signing::domain::parse_asset_data;
use crate::signing::SignatureScheme;
use crate::{Error, Result};

/// An exchange order.
///
/// Orders are immutable: every member is fixed at construction through
/// [`OrderBuilder`]. Use [`Order::to_builder`] to derive a modified copy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Order {
    maker_address: Address,
    taker_address: Address,
    fee_recipient_address: Address,
    sender_address: Address,
    #[serde(with = "decimal_u256")]
    maker_asset_amount: U256,
    #[serde(with = "decimal_u256")]
    taker_asset_amount: U256,
    #[serde(with = "decimal_u256")]
    maker_fee: U256,
    #[serde(with = "decimal_u256")]
    taker_fee: U256,
    #[serde(with = "decimal_u256")]
    expiration_time_seconds: U256,
    #[serde(with = "decimal_u256")]
    salt: U256,
    maker_asset_data: Bytes,
    taker_asset_data: Bytes,
    maker_fee_asset_data: Bytes,
    taker_fee_asset_data: Bytes,
    exchange_address: Address,
    chain_id: u64,
}

impl Order {
    pub fn maker_address(&self) -> Address {
        self.maker_address
    }

    pub fn taker_address(&self) -> Address {
        self.taker_address
    }

    pub fn fee_recipient_address(&self) -> Address {
        self.fee_recipient_address
    }

    pub fn sender_address(&self) -> Address {
        self.sender_address
    }

    pub fn maker_asset_amount(&self) -> U256 {
        self.maker_asset_amount
    }

    pub fn taker_asset_amount(&self) -> U256 {
        self.taker_asset_amount
    }

    pub fn maker_fee(&self) -> U256 {
        self.maker_fee
    }

    pub fn taker_fee(&self) -> U256 {
        self.taker_fee
    }

    pub fn expiration_time_seconds(&self) -> U256 {
        self.expiration_time_seconds
    }

    pub fn salt(&self) -> U256 {
        self.salt
    }

    pub fn maker_asset_data(&self) -> &Bytes {
        &self.maker_asset_data
    }

    pub fn taker_asset_data(&self) -> &Bytes {
        &self.taker_asset_data
    }

    pub fn maker_fee_asset_data(&self) -> &Bytes {
        &self.maker_fee_asset_data
    }

    pub fn taker_fee_asset_data(&self) -> &Bytes {
        &self.taker_fee_asset_data
    }

    pub fn exchange_address(&self) -> Address {
        self.exchange_address
    }

    pub fn chain_id(&self) -> u64 {
        self.chain_id
    }

    /// A builder pre-filled with this order's members.
    pub fn to_builder(&self) -> OrderBuilder {
        OrderBuilder {
            maker_address: Some(self.maker_address),
            taker_address: self.taker_address,
            fee_recipient_address: self.fee_recipient_address,
            sender_address: self.sender_address,
            maker_asset_amount: self.maker_asset_amount,
            taker_asset_amount: self.taker_asset_amount,
            maker_fee: self.maker_fee,
            taker_fee: self.taker_fee,
            expiration_time_seconds: Some(self.expiration_time_seconds),
            salt: Some(self.salt),
            maker_asset_data: AssetData::Raw(self.maker_asset_data.clone()),
            taker_asset_data: AssetData::Raw(self.taker_asset_data.clone()),
            maker_fee_asset_data: AssetData::Raw(self.maker_fee_asset_data.clone()),
            taker_fee_asset_data: AssetData::Raw(self.taker_fee_asset_data.clone()),
            exchange_address: Some(self.exchange_address),
            chain_id: Some(self.chain_id),
        }
    }
}

/// A signed order ready for submission to a relayer or the exchange.
///
/// Only [`crate::signing::OrderSigner`] creates these.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SignedOrder {
    #[serde(flatten)]
    order: Order,
    signature: String,
}

impl SignedOrder {
    pub(crate) fn new(order: Order, signature: String) -> Self {
        Self { order, signature }
    }

    pub fn order(&self) -> &Order {
        &self.order
    }

    /// `0x`-prefixed signature: `v ‖ r ‖ s ‖ scheme`.
    pub fn signature(&self) -> &str {
        &self.signature
    }

    /// The scheme tag carried in the signature's last byte.
    pub fn scheme(&self) -> Result<SignatureScheme> {
        crate::signing::codec::decode_scheme(&self.signature)
    }
}

#[derive(Debug, Clone)]
enum AssetData {
    Raw(Bytes),
    Hex(String),
}

impl AssetData {
    fn resolve(self) -> Result<Bytes> {
        match self {
            AssetData::Raw(bytes) => Ok(bytes),
            AssetData::Hex(hex) => parse_asset_data(&hex),
        }
    }
}

impl Default for AssetData {
    fn default() -> Self {
        AssetData::Raw(Bytes::new())
    }
}

/// Order builder for creating orders with a fluent API.
///
/// Maker, expiration, exchange and chain id are required. Counterparty
/// addresses default to the zero address (anyone), amounts and fees to
/// zero, asset data to empty and the salt to a random value.
#[derive(Debug, Clone, Default)]
pub struct OrderBuilder {
    maker_address: Option<Address>,
    taker_address: Address,
    fee_recipient_address: Address,
    sender_address: Address,
    maker_asset_amount: U256,
    taker_asset_amount: U256,
    maker_fee: U256,
    taker_fee: U256,
    expiration_time_seconds: Option<U256>,
    salt: Option<U256>,
    maker_asset_data: AssetData,
    taker_asset_data: AssetData,
    maker_fee_asset_data: AssetData,
    taker_fee_asset_data: AssetData,
    exchange_address: Option<Address>,
    chain_id: Option<u64>,
}

impl OrderBuilder {
    /// Create a new order builder.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn maker_address(mut self, maker: Address) -> Self {
        self.maker_address = Some(maker);
        self
    }

    pub fn taker_address(mut self, taker: Address) -> Self {
        self.taker_address = taker;
        self
    }

    pub fn fee_recipient_address(mut self, recipient: Address) -> Self {
        self.fee_recipient_address = recipient;
        self
    }

    pub fn sender_address(mut self, sender: Address) -> Self {
        self.sender_address = sender;
        self
    }

    pub fn maker_asset_amount(mut self, amount: U256) -> Self {
        self.maker_asset_amount = amount;
        self
    }

    pub fn taker_asset_amount(mut self, amount: U256) -> Self {
        self.taker_asset_amount = amount;
        self
    }

    pub fn maker_fee(mut self, fee: U256) -> Self {
        self.maker_fee = fee;
        self
    }

    pub fn taker_fee(mut self, fee: U256) -> Self {
        self.taker_fee = fee;
        self
    }

    /// Set absolute expiration timestamp (unix seconds).
    pub fn expiration_time_seconds(mut self, timestamp: U256) -> Self {
        self.expiration_time_seconds = Some(timestamp);
        self
    }

    /// Set expiration in seconds from now.
    pub fn expires_in(mut self, seconds: u64) -> Self {
        use std::time::{SystemTime, UNIX_EPOCH};
        let now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs())
            .unwrap_or_default();
        self.expiration_time_seconds = Some(U256::from(now.saturating_add(seconds)));
        self
    }

    pub fn salt(mut self, salt: U256) -> Self {
        self.salt = Some(salt);
        self
    }

    /// Maker asset data as transport hex (`0x` prefix optional).
    pub fn maker_asset_data(mut self, hex: &str) -> Self {
        self.maker_asset_data = AssetData::Hex(hex.to_string());
        self
    }

    /// Taker asset data as transport hex (`0x` prefix optional).
    pub fn taker_asset_data(mut self, hex: &str) -> Self {
        self.taker_asset_data = AssetData::Hex(hex.to_string());
        self
    }

    /// Maker fee asset data as transport hex (`0x` prefix optional).
    pub fn maker_fee_asset_data(mut self, hex: &str) -> Self {
        self.maker_fee_asset_data = AssetData::Hex(hex.to_string());
        self
    }

    /// Taker fee asset data as transport hex (`0x` prefix optional).
    pub fn taker_fee_asset_data(mut self, hex: &str) -> Self {
        self.taker_fee_asset_data = AssetData::Hex(hex.to_string());
        self
    }

    pub fn exchange_address(mut self, exchange: Address) -> Self {
        self.exchange_address = Some(exchange);
        self
    }

    pub fn chain_id(mut self, chain_id: u64) -> Self {
        self.chain_id = Some(chain_id);
        self
    }

    /// Build the order.
    ///
    /// Fails if a required member is missing or asset data is not valid hex.
    pub fn build(self) -> Result<Order> {
        let missing = |field: &str| Error::InvalidOrder {
            message: format!("{} is required", field),
        };

        Ok(Order {
            maker_address: self.maker_address.ok_or_else(|| missing("makerAddress"))?,
            taker_address: self.taker_address,
            fee_recipient_address: self.fee_recipient_address,
            sender_address: self.sender_address,
            maker_asset_amount: self.maker_asset_amount,
            taker_asset_amount: self.taker_asset_amount,
            maker_fee: self.maker_fee,
            taker_fee: self.taker_fee,
            expiration_time_seconds: self
                .expiration_time_seconds
                .ok_or_else(|| missing("expirationTimeSeconds"))?,
            salt: self.salt.unwrap_or_else(random_salt),
            maker_asset_data: self.maker_asset_data.resolve()?,
            taker_asset_data: self.taker_asset_data.resolve()?,
            maker_fee_asset_data: self.maker_fee_asset_data.resolve()?,
            taker_fee_asset_data: self.taker_fee_asset_data.resolve()?,
            exchange_address: self
                .exchange_address
                .ok_or_else(|| missing("exchangeAddress"))?,
            chain_id: self.chain_id.ok_or_else(|| missing("chainId"))?,
        })
    }
}

/// Generate a random 256-bit salt for order uniqueness.
fn random_salt() -> U256 {
    U256::from_be_bytes(rand::random::<[u8; 32]>())
}

/// Serde adapter for the decimal-string amounts used on the 0x wire format.
mod decimal_u256 {
    use alloy_primitives::U256;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &U256, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&value.to_string())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<U256, D::Error> {
        let s = String::deserialize(deserializer)?;
        U256::from_str_radix(&s, 10).map_err(serde::de::Error::custom)
    }
}
