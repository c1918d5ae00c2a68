use crypto_utils::CryptoError;
use thiserror::Error;

/// Tron chain operation errors.
#[derive(Debug, Error)]
pub enum TronError {
    #[error("invalid public key: {0}")]
    InvalidPublicKey(String),

    #[error("invalid address: {0}")]
    InvalidAddress(String),

    #[error("invalid signature: {0}")]
    InvalidSignature(String),

    #[error("signature verification failed")]
    SignatureVerificationFailed,

    #[error("invalid block header: {0}")]
    InvalidBlockHeader(String),

    #[error("decode error: {0}")]
    DecodeError(String),
}

impl From<CryptoError> for TronError {
    fn from(e: CryptoError) -> Self {
        TronError::DecodeError(e.to_string())
    }
}
