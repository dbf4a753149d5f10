//! Order signing for the 0x exchange.
//!
//! Provides EIP-712 typed data signing for orders and recovery of the
//! signing address from a signed order.

use alloy_primitives::{eip191_hash_message, Address, B256};
use alloy_signer_local::PrivateKeySigner;
use async_trait::async_trait;
use tracing::debug;

use super::codec::{self, RawSignature, SignatureScheme};
use super::domain::OrderMapper;
use super::typed_data::TypedDataSchema;
use crate::types::{Order, OrderBuilder, SignedOrder};
use crate::{Error, Result};

/// Signing primitive: signs a 32-byte digest without further hashing.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait DigestSigner: Send + Sync {
    /// Address whose key produces the signatures.
    fn address(&self) -> Address;

    /// Sign `digest`, returning `(v, r, s)` with `v` in `{0, 1}`.
    async fn sign_digest(&self, digest: &B256) -> Result<RawSignature>;
}

#[async_trait]
impl DigestSigner for PrivateKeySigner {
    fn address(&self) -> Address {
        alloy_signer::Signer::address(self)
    }

    async fn sign_digest(&self, digest: &B256) -> Result<RawSignature> {
        let signature = alloy_signer::Signer::sign_hash(self, digest)
            .await
            .map_err(|e| Error::signing(format!("Failed to sign digest: {}", e)))?;
        Ok(RawSignature::from(&signature))
    }
}

/// Order signer for the 0x exchange.
///
/// Handles EIP-712 signing of orders. The schema is fixed at construction;
/// it is the exchange schema unless one is supplied explicitly.
#[derive(Clone)]
pub struct OrderSigner<S = PrivateKeySigner> {
    signer: S,
    schema: TypedDataSchema,
}

impl<S: DigestSigner> OrderSigner<S> {
    /// Create a new order signer with the exchange order schema.
    pub fn new(signer: S) -> Self {
        Self::with_schema(signer, OrderMapper::schema())
    }

    /// Create a new order signer with a custom schema.
    pub fn with_schema(signer: S, schema: TypedDataSchema) -> Self {
        Self { signer, schema }
    }

    /// Get the signer's address.
    pub fn address(&self) -> Address {
        self.signer.address()
    }

    /// Get an order builder pre-configured with the maker address.
    pub fn order_builder(&self) -> OrderBuilder {
        OrderBuilder::new().maker_address(self.address())
    }

    /// Sign an order over its EIP-712 digest.
    pub async fn sign(&self, order: &Order) -> Result<SignedOrder> {
        self.sign_with_scheme(order, SignatureScheme::Eip712).await
    }

    /// Sign an order with an explicit scheme.
    ///
    /// `EthSign` signs the EIP-191 personal-message hash of the digest, the
    /// form produced by wallets that only expose `eth_sign`.
    pub async fn sign_with_scheme(
        &self,
        order: &Order,
        scheme: SignatureScheme,
    ) -> Result<SignedOrder> {
        // Schema validation happens here; a malformed message never reaches the key.
        let digest = OrderMapper::digest_with(&self.schema, order)?;
        let raw = self.signer.sign_digest(&scheme_prehash(digest, scheme)).await?;
        let signature = codec::encode(raw.v, &raw.r, &raw.s, scheme)?;

        debug!(
            order_hash = %digest,
            maker = %order.maker_address(),
            scheme = %scheme,
            "Signed order"
        );

        Ok(SignedOrder::new(order.clone(), signature))
    }
}

fn scheme_prehash(digest: B256, scheme: SignatureScheme) -> B256 {
    match scheme {
        SignatureScheme::Eip712 => digest,
        SignatureScheme::EthSign => eip191_hash_message(digest),
    }
}

/// Recover the address that signed `signed`.
///
/// Recomputes the order hash under the exchange schema and performs ECDSA
/// public key recovery against it.
pub fn recover_signer(signed: &SignedOrder) -> Result<Address> {
    let decoded = codec::decode(signed.signature())?;
    let digest = OrderMapper::order_hash(signed.order())?;
    let prehash = scheme_prehash(digest, decoded.scheme);

    decoded
        .signature
        .to_signature()
        .recover_address_from_prehash(&prehash)
        .map_err(|e| Error::invalid_signature(format!("recovery failed: {}", e)))
}

/// Whether `signed` carries a valid signature by `address`.
pub fn is_valid_signature(signed: &SignedOrder, address: Address) -> bool {
    recover_signer(signed).is_ok_and(|recovered| recovered == address)
}

impl<S: DigestSigner> std::fmt::Debug for OrderSigner<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OrderSigner")
            .field("address", &format!("{:?}", self.address()))
            .finish()
    }
}
