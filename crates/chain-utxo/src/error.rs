use thiserror::Error;

/// UTXO chain operation errors.
#[derive(Debug, Error)]
pub enum UtxoError {
    #[error("invalid public key: {0}")]
    InvalidPublicKey(String),

    #[error("invalid address: {0}")]
    InvalidAddress(String),

    #[error("invalid utxo: {0}")]
    InvalidUtxo(String),

    #[error("insufficient funds: have {available} sat, need {required} sat")]
    InsufficientFunds { available: u64, required: u64 },

    #[error("transaction build error: {0}")]
    TransactionBuildError(String),

    #[error("sighash error: {0}")]
    SighashError(String),

    #[error("signature verification failed for input {0}")]
    SignatureVerificationFailed(usize),

    #[error("decode error: {0}")]
    DecodeError(String),
}
