use thiserror::Error;

/// Errors raised while building, hashing or compiling a keysign payload.
///
/// Chain crate errors are carried through with their message intact,
/// prefixed with the chain family they came from.
#[derive(Debug, Error)]
pub enum SigningError {
    #[error("invalid payload: {0}")]
    InvalidPayload(String),

    #[error("missing signature for hash {0}")]
    MissingSignature(String),

    #[error("signature verification failed for hash {0}")]
    SignatureVerificationFailed(String),

    #[error("compile failed: {0}")]
    Compile(String),

    #[error("unsupported chain: {0}")]
    UnsupportedChain(String),

    #[error("key derivation failed: {0}")]
    KeyDerivation(String),
}

impl From<crypto_utils::CryptoError> for SigningError {
    fn from(e: crypto_utils::CryptoError) -> Self {
        SigningError::InvalidPayload(e.to_string())
    }
}

impl From<chain_utxo::UtxoError> for SigningError {
    fn from(e: chain_utxo::UtxoError) -> Self {
        SigningError::Compile(format!("UTXO: {e}"))
    }
}

impl From<chain_evm::EvmError> for SigningError {
    fn from(e: chain_evm::EvmError) -> Self {
        SigningError::Compile(format!("EVM: {e}"))
    }
}

impl From<chain_sol::SolError> for SigningError {
    fn from(e: chain_sol::SolError) -> Self {
        SigningError::Compile(format!("SOL: {e}"))
    }
}

impl From<chain_cosmos::CosmosError> for SigningError {
    fn from(e: chain_cosmos::CosmosError) -> Self {
        SigningError::Compile(format!("COSMOS: {e}"))
    }
}

impl From<chain_dot::DotError> for SigningError {
    fn from(e: chain_dot::DotError) -> Self {
        SigningError::Compile(format!("DOT: {e}"))
    }
}

impl From<chain_tron::TronError> for SigningError {
    fn from(e: chain_tron::TronError) -> Self {
        SigningError::Compile(format!("TRON: {e}"))
    }
}

impl From<chain_xrp::XrpError> for SigningError {
    fn from(e: chain_xrp::XrpError) -> Self {
        SigningError::Compile(format!("XRP: {e}"))
    }
}

impl From<chain_ada::AdaError> for SigningError {
    fn from(e: chain_ada::AdaError) -> Self {
        SigningError::Compile(format!("ADA: {e}"))
    }
}

impl From<bip32::Error> for SigningError {
    fn from(e: bip32::Error) -> Self {
        SigningError::KeyDerivation(e.to_string())
    }
}

/// Chain errors that can report a signature that did not verify.
pub(crate) trait VerificationFailure: Into<SigningError> {
    fn is_verification_failure(&self) -> bool;
}

macro_rules! verification_failure {
    ($($ty:ty),+) => {
        $(impl VerificationFailure for $ty {
            fn is_verification_failure(&self) -> bool {
                matches!(self, Self::SignatureVerificationFailed)
            }
        })+
    };
}

verification_failure!(
    chain_evm::EvmError,
    chain_sol::SolError,
    chain_cosmos::CosmosError,
    chain_dot::DotError,
    chain_tron::TronError,
    chain_xrp::XrpError,
    chain_ada::AdaError
);

/// Maps a chain error raised while compiling against the signature for
/// `hash`: a failed verification names the hash, anything else passes
/// through the `From` impls.
pub(crate) fn at_hash<E: VerificationFailure>(hash: &str) -> impl FnOnce(E) -> SigningError + '_ {
    move |e| {
        if e.is_verification_failure() {
            tracing::warn!(%hash, "signature verification failed");
            SigningError::SignatureVerificationFailed(hash.to_string())
        } else {
            e.into()
        }
    }
}
