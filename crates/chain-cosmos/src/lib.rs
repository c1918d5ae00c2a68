//! Cosmos SDK chain support.
//!
//! - bech32 account addresses from secp256k1 keys
//! - bank, IBC, CosmWasm and THORChain/MayaChain messages
//! - SIGN_MODE_DIRECT sign docs, `TxRaw` compilation and decoding
//! - per-network parameters (chain id, prefix, denom, gas)

pub mod address;
pub mod chains;
pub mod error;
pub mod msg;
pub mod tx;

pub use chains::CosmosChainParams;
pub use error::CosmosError;
pub use msg::{Coin, CosmosMsg, IbcHeight, IbcRoute, IbcTimeout, ThorAsset, ThorCoin};
pub use tx::{CosmosTransaction, DecodedTx, Fee, SignedCosmosTransaction};

pub type Result<T> = std::result::Result<T, CosmosError>;
