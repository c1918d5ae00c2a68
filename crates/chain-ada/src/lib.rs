//! Cardano (Shelley era) support.
//!
//! - enterprise addresses from ed25519 spending keys
//! - largest-first input selection with a fixed fee
//! - CBOR transaction bodies, vkey witnesses and decoding

pub mod address;
pub mod cbor;
pub mod error;
pub mod transaction;

pub use error::AdaError;
pub use transaction::{
    DecodedTransaction, SignedAdaTransaction, TransactionBody, TxIn, TxOut, Utxo,
};

pub type Result<T> = std::result::Result<T, AdaError>;
