use thiserror::Error;

/// XRP Ledger operation errors.
#[derive(Debug, Error)]
pub enum XrpError {
    #[error("invalid public key: {0}")]
    InvalidPublicKey(String),

    #[error("invalid address: {0}")]
    InvalidAddress(String),

    #[error("invalid signature: {0}")]
    InvalidSignature(String),

    #[error("signature verification failed")]
    SignatureVerificationFailed,

    #[error("invalid amount: {0}")]
    InvalidAmount(String),

    #[error("decode error: {0}")]
    DecodeError(String),
}
