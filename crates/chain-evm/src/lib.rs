//! Ethereum/EVM chain support.
//!
//! This crate provides:
//! - Ethereum address derivation from secp256k1 public keys (with EIP-55 checksums)
//! - EIP-1559 and legacy EIP-155 transaction encoding, decoding and compiling
//!   with externally produced recoverable signatures
//! - ERC-20 `transfer`/`approve` calldata
//! - THORChain router `depositWithExpiry` calldata
//! - EVM network definitions
//! - Minimal ABI encoding utilities

pub mod abi;
pub mod address;
pub mod chains;
pub mod erc20;
pub mod error;
pub mod router;
pub mod transaction;

pub use error::EvmError;
pub use transaction::{
    EvmTransaction, RecoverableSignature, SignedEvmTransaction, TxEnvelope,
};
