//! # crypto-utils
//!
//! Byte-level building blocks shared by every chain crate: hex handling,
//! digests, big-endian integer trimming and a minimal protobuf wire codec.

pub mod bytes;
pub mod error;
pub mod hash;
pub mod proto;

pub use error::CryptoError;

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, CryptoError>;
