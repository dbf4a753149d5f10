//! Wire encoding of order signatures.
//!
//! A signature travels as `0x` followed by 66 lower-case hex-encoded bytes:
//!
//! ```text
//! [0]      v (27 or 28)
//! [1..33]  r
//! [33..65] s
//! [65]     signature scheme tag
//! ```

use alloy_primitives::{Signature, B256, U256};

use crate::{Error, Result};

/// Encoded signature length in bytes, including the scheme tag.
pub const SIGNATURE_LEN: usize = 66;

const V_INDEX: usize = 0;
const R_RANGE: std::ops::Range<usize> = 1..33;
const S_RANGE: std::ops::Range<usize> = 33..65;
const SCHEME_INDEX: usize = 65;

/// Signature scheme tag understood by the exchange.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SignatureScheme {
    /// Signed the EIP-712 digest directly.
    Eip712 = 2,
    /// Signed the EIP-191 `eth_sign` hash of the digest.
    EthSign = 3,
}

impl SignatureScheme {
    /// Get the tag byte.
    pub fn as_u8(&self) -> u8 {
        match self {
            SignatureScheme::Eip712 => 2,
            SignatureScheme::EthSign => 3,
        }
    }
}

impl TryFrom<u8> for SignatureScheme {
    type Error = Error;

    fn try_from(tag: u8) -> Result<Self> {
        match tag {
            2 => Ok(SignatureScheme::Eip712),
            3 => Ok(SignatureScheme::EthSign),
            other => Err(Error::UnsupportedScheme(other)),
        }
    }
}

impl std::fmt::Display for SignatureScheme {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SignatureScheme::Eip712 => write!(f, "EIP712"),
            SignatureScheme::EthSign => write!(f, "ETH_SIGN"),
        }
    }
}

/// An ECDSA signature as produced by the signing primitive.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RawSignature {
    /// Recovery id, 0 or 1.
    pub v: u8,
    pub r: B256,
    pub s: B256,
}

impl RawSignature {
    /// Convert to an alloy signature for public key recovery.
    pub fn to_signature(&self) -> Signature {
        Signature::new(
            U256::from_be_bytes(self.r.0),
            U256::from_be_bytes(self.s.0),
            self.v == 1,
        )
    }
}

impl From<&Signature> for RawSignature {
    fn from(signature: &Signature) -> Self {
        Self {
            v: signature.v() as u8,
            r: B256::from(signature.r().to_be_bytes::<32>()),
            s: B256::from(signature.s().to_be_bytes::<32>()),
        }
    }
}

/// A fully decoded wire signature.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DecodedSignature {
    pub signature: RawSignature,
    pub scheme: SignatureScheme,
}

/// Encode `(v, r, s)` and a scheme tag into the wire format.
///
/// `v` may be given as a recovery id (0/1) or already offset (27/28).
pub fn encode(v: u8, r: &B256, s: &B256, scheme: SignatureScheme) -> Result<String> {
    let v = match v {
        0 | 1 => v + 27,
        27 | 28 => v,
        other => {
            return Err(Error::invalid_signature(format!(
                "invalid v value {}",
                other
            )))
        }
    };

    let mut bytes = [0u8; SIGNATURE_LEN];
    bytes[V_INDEX] = v;
    bytes[R_RANGE].copy_from_slice(r.as_slice());
    bytes[S_RANGE].copy_from_slice(s.as_slice());
    bytes[SCHEME_INDEX] = scheme.as_u8();
    Ok(format!("0x{}", hex::encode(bytes)))
}

/// Read the scheme tag from the last byte of a hex signature.
pub fn decode_scheme(signature: &str) -> Result<SignatureScheme> {
    let bytes = decode_hex(signature)?;
    let tag = bytes
        .last()
        .copied()
        .ok_or_else(|| Error::invalid_signature("empty signature"))?;
    SignatureScheme::try_from(tag)
}

/// Decode every component of a wire signature.
pub fn decode(signature: &str) -> Result<DecodedSignature> {
    let bytes = decode_hex(signature)?;
    if bytes.len() != SIGNATURE_LEN {
        return Err(Error::invalid_signature(format!(
            "expected {} bytes, got {}",
            SIGNATURE_LEN,
            bytes.len()
        )));
    }

    let v = match bytes[V_INDEX] {
        27 => 0,
        28 => 1,
        other => {
            return Err(Error::invalid_signature(format!(
                "invalid v byte {}",
                other
            )))
        }
    };
    let scheme = SignatureScheme::try_from(bytes[SCHEME_INDEX])?;

    Ok(DecodedSignature {
        signature: RawSignature {
            v,
            r: B256::from_slice(&bytes[R_RANGE]),
            s: B256::from_slice(&bytes[S_RANGE]),
        },
        scheme,
    })
}

fn decode_hex(signature: &str) -> Result<Vec<u8>> {
    let digits = signature.strip_prefix("0x").unwrap_or(signature);
    hex::decode(digits).map_err(|e| Error::invalid_signature(e.to_string()))
}
