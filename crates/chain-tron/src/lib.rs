//! Tron chain support.
//!
//! - Base58Check addresses from secp256k1 keys
//! - `TransferContract` and TRC20 `TriggerSmartContract` transactions
//! - block references derived from a header snapshot
//! - compiled node JSON (`raw_data_hex`, `signature`, `txID`)

pub mod address;
pub mod error;
pub mod transaction;

pub use error::TronError;
pub use transaction::{BlockHeader, SignedTronTransaction, TronContract, TronTransaction};

pub type Result<T> = std::result::Result<T, TronError>;
