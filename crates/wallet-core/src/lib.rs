//! Multi-chain transaction signing.
//!
//! This crate provides:
//! - the chain-agnostic keysign payload model
//! - one signing helper per chain family, turning a payload into the digests
//!   a threshold ceremony signs and compiling the signed transaction
//! - THORChain swap dispatch and ERC20 approve sequencing
//! - custom message signing, zero-signature simulation transactions
//! - non-hardened public key derivation from the vault master key

pub mod config;
pub mod error;
pub mod hd_derivation;
pub mod helpers;
pub mod payload;
pub mod signature;
pub mod signing_helper;
pub mod thorchain_swaps;
pub mod types;

pub use config::{AffiliateConfig, SigningConfig};
pub use error::SigningError;
pub use hd_derivation::{derive_chain_public_key, derive_public_key};
pub use helpers::{ChainSigningHelper, HelperRegistry, SigningInput};
pub use payload::{
    BlockChainSpecific, Coin, CustomMessagePayload, DeFiAction, IbcDenomTrace, KeysignPayload,
    SignedTransactionResult, SwapPayload, Vault,
};
pub use signature::{KeysignSignature, SignatureMap};
pub use signing_helper::{custom_message_hash, sign_custom_message, SigningHelper};
pub use thorchain_swaps::ThorChainSwaps;
pub use types::{Chain, ChainFamily};

pub type Result<T> = std::result::Result<T, SigningError>;
