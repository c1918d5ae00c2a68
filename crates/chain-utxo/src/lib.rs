//! UTXO-family chain support: Bitcoin, Litecoin, Bitcoin Cash, Dogecoin, Dash
//! and transparent Zcash.
//!
//! Provides address-to-script decoding, deterministic coin selection and
//! planning, per-input sighash computation, and compiling externally produced
//! DER signatures into a broadcast-ready transaction.

pub mod address;
pub mod error;
pub mod network;
pub mod transaction;
pub mod utxo;
pub mod zcash;

pub use error::UtxoError;
pub use network::{ScriptKind, UtxoChain};
pub use transaction::{SignedUtxoTx, UnsignedUtxoTx, UtxoSigningInput};
pub use utxo::Utxo;
