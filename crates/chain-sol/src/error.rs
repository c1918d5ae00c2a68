use thiserror::Error;

/// Solana chain operation errors.
#[derive(Debug, Error)]
pub enum SolError {
    #[error("invalid public key: {0}")]
    InvalidPublicKey(String),

    #[error("invalid address: {0}")]
    InvalidAddress(String),

    #[error("invalid signature: {0}")]
    InvalidSignature(String),

    #[error("signature verification failed")]
    SignatureVerificationFailed,

    #[error("transaction build error: {0}")]
    TransactionBuildError(String),

    #[error("serialization error: {0}")]
    SerializationError(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_invalid_public_key() {
        let err = SolError::InvalidPublicKey("not on curve".into());
        assert_eq!(err.to_string(), "invalid public key: not on curve");
    }

    #[test]
    fn display_invalid_address() {
        let err = SolError::InvalidAddress("bad decode".into());
        assert_eq!(err.to_string(), "invalid address: bad decode");
    }

    #[test]
    fn display_invalid_signature() {
        let err = SolError::InvalidSignature("expected 64 bytes".into());
        assert_eq!(err.to_string(), "invalid signature: expected 64 bytes");
    }

    #[test]
    fn display_verification_failed() {
        assert_eq!(
            SolError::SignatureVerificationFailed.to_string(),
            "signature verification failed"
        );
    }

    #[test]
    fn display_transaction_build_error() {
        let err = SolError::TransactionBuildError("insufficient lamports".into());
        assert_eq!(
            err.to_string(),
            "transaction build error: insufficient lamports"
        );
    }

    #[test]
    fn display_serialization_error() {
        let err = SolError::SerializationError("compact-u16 overflow".into());
        assert_eq!(
            err.to_string(),
            "serialization error: compact-u16 overflow"
        );
    }

    #[test]
    fn error_trait_is_implemented() {
        let err: Box<dyn std::error::Error> =
            Box::new(SolError::InvalidAddress("test".into()));
        assert!(err.to_string().contains("test"));
    }
}
