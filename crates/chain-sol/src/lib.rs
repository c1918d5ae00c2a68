//! Solana chain support.
//!
//! Messages are built and serialized by hand in Solana's compact wire
//! format; `ed25519-dalek` verifies the externally produced signatures and
//! `bs58` handles addresses. Aggregator-built transactions can be parsed,
//! have their blockhash patched and receive our signature in place.

pub mod address;
pub mod compute_budget;
pub mod error;
pub mod raw;
pub mod spl_token;
pub mod transaction;

pub use address::{parse_address, parse_hex_pubkey, pubkey_to_address, validate_address};
pub use compute_budget::PriorityFee;
pub use error::SolError;
pub use raw::{InstructionSummary, MessageLayout, RawTransaction};
pub use spl_token::derive_associated_token_address;
pub use transaction::{
    build_create_and_transfer_token, build_sol_transfer, build_token_transfer, SignedSolTransaction,
    SolTransaction,
};
