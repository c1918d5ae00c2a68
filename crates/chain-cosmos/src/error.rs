use crypto_utils::CryptoError;
use thiserror::Error;

/// Cosmos SDK chain operation errors.
#[derive(Debug, Error)]
pub enum CosmosError {
    #[error("invalid public key: {0}")]
    InvalidPublicKey(String),

    #[error("invalid address: {0}")]
    InvalidAddress(String),

    #[error("invalid signature: {0}")]
    InvalidSignature(String),

    #[error("signature verification failed")]
    SignatureVerificationFailed,

    #[error("invalid memo: {0}")]
    InvalidMemo(String),

    #[error("invalid IBC timeout: {0}")]
    InvalidTimeout(String),

    #[error("decode error: {0}")]
    DecodeError(String),
}

impl From<CryptoError> for CosmosError {
    fn from(e: CryptoError) -> Self {
        CosmosError::DecodeError(e.to_string())
    }
}
