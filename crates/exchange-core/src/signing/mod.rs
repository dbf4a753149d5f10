//! Signing module for 0x exchange orders and transactions.
//!
//! # Architecture
//!
//! ```text
//! Order ──► OrderMapper ──► TypedDataEncoder ──► digest
//!                                                  │
//!                                    DigestSigner ◄┘
//!                                         │ (v, r, s)
//!                                         ▼
//!                              codec::encode(.., Eip712) ──► SignedOrder
//! ```
//!
//! # Example
//!
//! ```ignore
//! use exchange_core::signing::OrderSigner;
//! use alloy_signer_local::PrivateKeySigner;
//!
//! let signer = OrderSigner::new(PrivateKeySigner::from_str("0x...")?);
//!
//! let order = signer
//!     .order_builder()
//!     .maker_asset_amount(U256::from(1000))
//!     .taker_asset_amount(U256::from(2000))
//!     .maker_asset_data("0xf47261b0...")
//!     .taker_asset_data("0xf47261b0...")
//!     .expires_in(3600)
//!     .exchange_address(EXCHANGE_V3_ADDRESS.parse()?)
//!     .chain_id(MAINNET_CHAIN_ID)
//!     .build()?;
//!
//! let signed_order = signer.sign(&order).await?;
//! ```

pub mod codec;
pub mod domain;
pub mod signer;
pub mod transaction;
pub mod typed_data;

pub use codec::{DecodedSignature, RawSignature, SignatureScheme};

pub use domain::{
    Eip712Domain, OrderMapper, EXCHANGE_DOMAIN_NAME, EXCHANGE_DOMAIN_VERSION,
    EXCHANGE_V3_ADDRESS, GANACHE_CHAIN_ID, MAINNET_CHAIN_ID, ORDER_TYPE,
};

pub use signer::{is_valid_signature, recover_signer, DigestSigner, OrderSigner};

pub use transaction::TransactionSigner;

pub use typed_data::{TypedDataEncoder, TypedDataSchema, TypedField, TypedMessage, TypedValue};
