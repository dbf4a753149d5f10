//! EIP-155 transaction signing.

use alloy_consensus::transaction::RlpEcdsaEncodableTx;
use alloy_consensus::TxLegacy;
use alloy_network::TxSignerSync;
use alloy_primitives::{keccak256, Address, Bytes, TxKind, B256};
use alloy_signer_local::PrivateKeySigner;
use async_trait::async_trait;

use crate::types::{SignedTransaction, TransactionRequest};
use crate::{Error, Result};

/// Signs transaction requests, binding the request's chain id.
#[async_trait]
pub trait TransactionSigner: Send + Sync {
    /// Sending account.
    fn address(&self) -> Address;

    async fn sign_transaction(&self, request: TransactionRequest) -> Result<SignedTransaction>;
}

#[async_trait]
impl TransactionSigner for PrivateKeySigner {
    fn address(&self) -> Address {
        alloy_signer::Signer::address(self)
    }

    async fn sign_transaction(&self, request: TransactionRequest) -> Result<SignedTransaction> {
        if request.from != TransactionSigner::address(self) {
            return Err(Error::signing(format!(
                "request sender {} does not match signer {}",
                request.from,
                TransactionSigner::address(self)
            )));
        }

        let mut tx = TxLegacy {
            chain_id: Some(request.chain_id),
            nonce: request.nonce,
            gas_price: request.gas_price,
            gas_limit: request.gas_limit,
            to: request.to.map(TxKind::Call).unwrap_or(TxKind::Create),
            value: request.value,
            input: request.data.clone(),
        };

        let v_base = eip155_v_base(request.chain_id)?;
        let signature = self
            .sign_transaction_sync(&mut tx)
            .map_err(|e| Error::signing(format!("Failed to sign transaction: {}", e)))?;

        let mut encoded = Vec::new();
        tx.rlp_encode_signed(&signature, &mut encoded);

        Ok(SignedTransaction {
            request,
            v: v_base + signature.v() as u64,
            r: B256::from(signature.r().to_be_bytes::<32>()),
            s: B256::from(signature.s().to_be_bytes::<32>()),
            hash: keccak256(&encoded),
            raw: Bytes::from(encoded),
        })
    }
}

/// `chain_id * 2 + 35`, leaving room for the parity bit.
fn eip155_v_base(chain_id: u64) -> Result<u64> {
    chain_id
        .checked_mul(2)
        .and_then(|v| v.checked_add(35))
        .filter(|v| *v < u64::MAX)
        .ok_or_else(|| Error::signing(format!("chain id {} is too large for EIP-155", chain_id)))
}
