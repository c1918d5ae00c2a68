//! XRP Ledger support.
//!
//! - classic addresses (Ripple-alphabet Base58Check)
//! - the canonical binary codec for native `Payment` transactions
//! - `STX\0` signing hashes and DER signature compilation

pub mod address;
pub mod codec;
pub mod error;
pub mod transaction;

pub use error::XrpError;
pub use transaction::{Payment, PaymentMemo, SignedXrpTransaction};

pub type Result<T> = std::result::Result<T, XrpError>;
