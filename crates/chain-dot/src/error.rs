use thiserror::Error;

/// Substrate chain operation errors.
#[derive(Debug, Error)]
pub enum DotError {
    #[error("invalid public key: {0}")]
    InvalidPublicKey(String),

    #[error("invalid address: {0}")]
    InvalidAddress(String),

    #[error("invalid signature: {0}")]
    InvalidSignature(String),

    #[error("signature verification failed")]
    SignatureVerificationFailed,

    #[error("amount exceeds u128")]
    AmountOverflow,

    #[error("decode error: {0}")]
    DecodeError(String),
}

impl From<parity_scale_codec::Error> for DotError {
    fn from(e: parity_scale_codec::Error) -> Self {
        DotError::DecodeError(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_invalid_address() {
        let err = DotError::InvalidAddress("bad checksum".into());
        assert_eq!(err.to_string(), "invalid address: bad checksum");
    }

    #[test]
    fn display_verification_failed() {
        assert_eq!(
            DotError::SignatureVerificationFailed.to_string(),
            "signature verification failed"
        );
    }

    #[test]
    fn display_overflow() {
        assert_eq!(DotError::AmountOverflow.to_string(), "amount exceeds u128");
    }
}
