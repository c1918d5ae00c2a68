//! Polkadot (Substrate) chain support.
//!
//! - SS58 addresses
//! - mortal eras
//! - signed `transfer_allow_death` extrinsics with configurable call
//!   indices and signed extensions

pub mod address;
pub mod era;
pub mod error;
pub mod extrinsic;

pub use era::Era;
pub use error::DotError;
pub use extrinsic::{
    ChainState, DecodedExtrinsic, DotTransaction, ExtrinsicConfig, SignedDotTransaction,
    TransferCall,
};

pub type Result<T> = std::result::Result<T, DotError>;
