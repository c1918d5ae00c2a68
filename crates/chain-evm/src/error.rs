use thiserror::Error;

/// EVM chain operation errors.
#[derive(Debug, Error)]
pub enum EvmError {
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

    #[error("encoding error: {0}")]
    EncodingError(String),

    #[error("decode error: {0}")]
    DecodeError(String),

    #[error("unsupported chain: {0}")]
    UnsupportedChain(u64),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_invalid_public_key() {
        let err = EvmError::InvalidPublicKey("not on curve".into());
        assert_eq!(err.to_string(), "invalid public key: not on curve");
    }

    #[test]
    fn display_invalid_address() {
        let err = EvmError::InvalidAddress("bad checksum".into());
        assert_eq!(err.to_string(), "invalid address: bad checksum");
    }

    #[test]
    fn display_signature_verification_failed() {
        assert_eq!(
            EvmError::SignatureVerificationFailed.to_string(),
            "signature verification failed"
        );
    }

    #[test]
    fn display_decode_error() {
        let err = EvmError::DecodeError("unexpected list".into());
        assert_eq!(err.to_string(), "decode error: unexpected list");
    }

    #[test]
    fn display_unsupported_chain() {
        let err = EvmError::UnsupportedChain(999);
        assert_eq!(err.to_string(), "unsupported chain: 999");
    }

    #[test]
    fn debug_format_works() {
        let err = EvmError::EncodingError("fail".into());
        assert!(format!("{err:?}").contains("EncodingError"));
    }
}
