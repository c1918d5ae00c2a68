use thiserror::Error;

/// Byte-level encoding and decoding errors.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum CryptoError {
    #[error("invalid hex: {0}")]
    InvalidHex(String),

    #[error("invalid length: expected {expected}, got {actual}")]
    InvalidLength { expected: usize, actual: usize },

    #[error("value out of range: {0}")]
    OutOfRange(String),

    #[error("malformed protobuf: {0}")]
    MalformedProto(String),
}
