//! Unsigned transaction construction.

use alloy_primitives::{Address, Bytes, U256};
use exchange_core::gas::GasProvider;
use exchange_core::types::TransactionRequest;
use exchange_core::{Error, Result};
use tracing::debug;

/// A prepared contract call: method name, target contract and calldata.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContractInvocation {
    /// Method name, used to look up method-specific gas settings.
    pub method: String,
    pub contract: Address,
    pub data: Bytes,
}

impl ContractInvocation {
    pub fn new(method: impl Into<String>, contract: Address, data: impl Into<Bytes>) -> Self {
        Self {
            method: method.into(),
            contract,
            data: data.into(),
        }
    }
}

/// What a transaction targets.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TxTarget {
    Invocation {
        invocation: ContractInvocation,
        value: U256,
    },
    Raw {
        to: Option<Address>,
        value: U256,
        data: Bytes,
    },
}

/// Builds transaction requests for one sender on one chain.
pub struct TransactionBuilder<'a> {
    gas: &'a dyn GasProvider,
    from: Address,
    chain_id: u64,
}

impl<'a> TransactionBuilder<'a> {
    pub fn new(gas: &'a dyn GasProvider, from: Address, chain_id: u64) -> Self {
        Self {
            gas,
            from,
            chain_id,
        }
    }

    /// Build an unsigned request for `target` at `nonce`.
    ///
    /// Invocations take gas settings for their method; raw transactions take
    /// the provider's generic settings. A raw transaction without a
    /// destination is refused before the provider is consulted.
    pub async fn build(&self, target: &TxTarget, nonce: u64) -> Result<TransactionRequest> {
        let (to, value, data, method) = match target {
            TxTarget::Invocation { invocation, value } => (
                invocation.contract,
                *value,
                invocation.data.clone(),
                Some(invocation.method.as_str()),
            ),
            TxTarget::Raw { to, value, data } => {
                let to = to.ok_or_else(|| Error::CannotBuildTransaction {
                    message: "no contract invocation or destination address".to_string(),
                })?;
                (to, *value, data.clone(), None)
            }
        };

        let gas_limit = self.gas.gas_limit(method).await?;
        let gas_price = self.gas.gas_price(method).await?;

        debug!(
            nonce,
            to = %to,
            method = method.unwrap_or("-"),
            gas_limit,
            gas_price,
            "Built transaction"
        );

        Ok(TransactionRequest {
            nonce,
            from: self.from,
            to: Some(to),
            value,
            gas_limit,
            gas_price,
            data,
            chain_id: self.chain_id,
        })
    }
}
