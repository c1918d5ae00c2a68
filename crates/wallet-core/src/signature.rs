//! Signatures returned by the signing ceremony.

use std::collections::HashMap;

use crypto_utils::bytes::{decode_hex, left_pad};
use serde::{Deserialize, Serialize};

use crate::error::SigningError;

/// One signature as produced by the ceremony. Every field is hex.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeysignSignature {
    pub r: String,
    pub s: String,
    /// DER form of `(r, s)`. Empty for EdDSA.
    #[serde(default)]
    pub der_signature: String,
    /// Single recovery byte. Empty for EdDSA.
    #[serde(default)]
    pub recovery_id: String,
}

/// Signatures keyed by lowercase hex pre-image hash.
pub type SignatureMap = HashMap<String, KeysignSignature>;

impl KeysignSignature {
    /// Wraps a secp256k1 signature and its recovery id.
    pub fn from_ecdsa(signature: &k256::ecdsa::Signature, recovery_id: u8) -> Self {
        let bytes = signature.to_bytes();
        Self {
            r: hex::encode(&bytes[..32]),
            s: hex::encode(&bytes[32..]),
            der_signature: hex::encode(signature.to_der().as_bytes()),
            recovery_id: hex::encode([recovery_id]),
        }
    }

    /// Wraps a 64-byte ed25519 signature.
    pub fn from_ed25519(signature: &[u8; 64]) -> Self {
        Self {
            r: hex::encode(&signature[..32]),
            s: hex::encode(&signature[32..]),
            der_signature: String::new(),
            recovery_id: String::new(),
        }
    }

    /// `r || s`, each left-padded to 32 bytes. For ed25519 this is the
    /// signature itself.
    pub fn rs_bytes(&self) -> Result<[u8; 64], SigningError> {
        let r: [u8; 32] = left_pad(&decode_hex(&self.r)?)?;
        let s: [u8; 32] = left_pad(&decode_hex(&self.s)?)?;
        let mut out = [0u8; 64];
        out[..32].copy_from_slice(&r);
        out[32..].copy_from_slice(&s);
        Ok(out)
    }

    /// `r || s || v` with `v` the raw recovery id.
    pub fn rsv_bytes(&self) -> Result<[u8; 65], SigningError> {
        let recovery = decode_hex(&self.recovery_id)?;
        let v = match recovery.as_slice() {
            [v] => *v,
            _ => {
                return Err(SigningError::InvalidPayload(format!(
                    "recovery id must be one byte, got {:?}",
                    self.recovery_id
                )))
            }
        };
        let mut out = [0u8; 65];
        out[..64].copy_from_slice(&self.rs_bytes()?);
        out[64] = v;
        Ok(out)
    }

    pub fn der_bytes(&self) -> Result<Vec<u8>, SigningError> {
        if self.der_signature.is_empty() {
            return Err(SigningError::InvalidPayload("missing DER signature".into()));
        }
        Ok(decode_hex(&self.der_signature)?)
    }
}

/// Exact-match lookup; keys are never case-folded.
pub fn lookup<'a>(
    signatures: &'a SignatureMap,
    hash: &str,
) -> Result<&'a KeysignSignature, SigningError> {
    signatures
        .get(hash)
        .ok_or_else(|| SigningError::MissingSignature(hash.to_string()))
}
