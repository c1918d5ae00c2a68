//! Chain-agnostic transaction intent handed to the signing helpers.

use alloy_primitives::U256;
use serde::{Deserialize, Serialize};

use crate::error::SigningError;
use crate::types::{Chain, ChainFamily};

/// The coin being spent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Coin {
    pub chain: Chain,
    pub ticker: String,
    /// Sender address on `chain`.
    pub address: String,
    pub decimals: u8,
    /// Compressed secp256k1 key of the sender, for chains that sign with
    /// the coin key directly.
    pub hex_public_key: String,
    /// Token contract, mint, or denom. Empty for native coins.
    #[serde(default)]
    pub contract_address: String,
    pub is_native_token: bool,
}

impl Coin {
    /// Native coin of `chain` held at `address`.
    pub fn native(chain: Chain, address: &str, hex_public_key: &str) -> Self {
        Self {
            chain,
            ticker: chain.ticker().to_string(),
            address: address.to_string(),
            decimals: native_decimals(chain),
            hex_public_key: hex_public_key.to_string(),
            contract_address: String::new(),
            is_native_token: true,
        }
    }

    /// Token `ticker` at `contract_address` on `chain`.
    pub fn token(
        chain: Chain,
        ticker: &str,
        contract_address: &str,
        decimals: u8,
        address: &str,
        hex_public_key: &str,
    ) -> Self {
        Self {
            chain,
            ticker: ticker.to_string(),
            address: address.to_string(),
            decimals,
            hex_public_key: hex_public_key.to_string(),
            contract_address: contract_address.to_string(),
            is_native_token: false,
        }
    }
}

fn native_decimals(chain: Chain) -> u8 {
    match chain.family() {
        ChainFamily::Utxo => 8,
        ChainFamily::Evm => 18,
        ChainFamily::Cosmos | ChainFamily::Terra => 6,
        ChainFamily::ThorChain => 8,
        ChainFamily::MayaChain => 10,
        ChainFamily::Solana => 9,
        ChainFamily::Polkadot => 10,
        ChainFamily::Tron | ChainFamily::Ripple | ChainFamily::Cardano => 6,
    }
}

/// An unspent output as reported by the chain indexer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UtxoInfo {
    /// Transaction id, display order hex.
    pub hash: String,
    pub amount: u64,
    pub index: u32,
}

/// Denom trace of an IBC voucher, plus the source chain's latest block as
/// `<height>_<timeoutNanos>`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IbcDenomTrace {
    pub path: String,
    pub base_denom: String,
    pub latest_block: String,
}

/// Per-family chain state fetched right before signing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum BlockChainSpecific {
    Utxo {
        byte_fee: u64,
        send_max_amount: bool,
    },
    Ethereum {
        nonce: u64,
        gas_limit: u64,
        max_fee_per_gas_wei: u128,
        priority_fee_wei: u128,
    },
    Cosmos {
        account_number: u64,
        sequence: u64,
        gas: u64,
        /// Present for IBC transfers; carries the packet timeout.
        #[serde(default)]
        ibc_denom_trace: Option<IbcDenomTrace>,
    },
    ThorChain {
        account_number: u64,
        sequence: u64,
        fee: u64,
        is_deposit: bool,
    },
    MayaChain {
        account_number: u64,
        sequence: u64,
        is_deposit: bool,
    },
    Solana {
        /// Base58 blockhash.
        recent_block_hash: String,
        /// Micro-lamports per compute unit; zero falls back to the configured price.
        priority_fee: u64,
        /// Compute unit limit; zero falls back to the configured limit.
        priority_limit: u32,
        #[serde(default)]
        from_token_ata: Option<String>,
        #[serde(default)]
        to_token_ata: Option<String>,
    },
    Polkadot {
        genesis_hash: String,
        recent_block_hash: String,
        nonce: u64,
        spec_version: u32,
        transaction_version: u32,
        current_block_number: u64,
    },
    Tron {
        timestamp: i64,
        expiration: i64,
        block_header_timestamp: i64,
        block_header_number: i64,
        block_header_version: i32,
        block_header_tx_trie_root: String,
        block_header_parent_hash: String,
        block_header_witness_address: String,
        /// TRC20 fee limit in sun.
        gas_fee_estimation: u64,
    },
    Ripple {
        sequence: u32,
        /// Fee in drops.
        gas: u64,
        last_ledger_sequence: u32,
    },
    Cardano {
        byte_fee: u64,
        send_max_amount: bool,
        ttl: u64,
    },
}

impl BlockChainSpecific {
    pub fn name(&self) -> &'static str {
        match self {
            BlockChainSpecific::Utxo { .. } => "Utxo",
            BlockChainSpecific::Ethereum { .. } => "Ethereum",
            BlockChainSpecific::Cosmos { .. } => "Cosmos",
            BlockChainSpecific::ThorChain { .. } => "ThorChain",
            BlockChainSpecific::MayaChain { .. } => "MayaChain",
            BlockChainSpecific::Solana { .. } => "Solana",
            BlockChainSpecific::Polkadot { .. } => "Polkadot",
            BlockChainSpecific::Tron { .. } => "Tron",
            BlockChainSpecific::Ripple { .. } => "Ripple",
            BlockChainSpecific::Cardano { .. } => "Cardano",
        }
    }
}

/// Error for a chain-specific block that does not belong to the coin's chain.
pub(crate) fn mismatch(chain: Chain, specific: &BlockChainSpecific) -> SigningError {
    SigningError::InvalidPayload(format!(
        "{} chain specific data given for {chain}",
        specific.name()
    ))
}

/// ERC20 allowance granted before a router swap.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ERC20ApprovePayload {
    pub amount: U256,
    pub spender: String,
}

/// THORChain / MayaChain swap quote.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ThorChainSwapPayload {
    pub from_address: String,
    pub from_coin: Coin,
    pub to_coin: Coin,
    /// Inbound vault address for the source chain.
    pub vault_address: String,
    /// Router contract for EVM sources.
    #[serde(default)]
    pub router_address: Option<String>,
    pub from_amount: U256,
    pub to_amount_decimal: String,
    /// Minimum output in base units of the target asset, `0` for none.
    #[serde(default)]
    pub to_amount_limit: String,
    #[serde(default)]
    pub streaming_interval: String,
    #[serde(default)]
    pub streaming_quantity: String,
    /// Router deposit expiry, unix seconds.
    pub expiration_time: u64,
    #[serde(default)]
    pub is_affiliate: bool,
}

/// Transaction returned by an aggregator quote.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OneInchTransaction {
    pub from: String,
    pub to: String,
    /// Hex calldata for EVM, base64 transaction for Solana.
    pub data: String,
    /// Decimal wei.
    pub value: String,
    #[serde(default)]
    pub gas_price: String,
    #[serde(default)]
    pub gas: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OneInchQuote {
    pub dst_amount: String,
    pub tx: OneInchTransaction,
}

/// Aggregator swap quote.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OneInchSwapPayload {
    pub from_coin: Coin,
    pub to_coin: Coin,
    pub from_amount: U256,
    pub to_amount_decimal: String,
    pub quote: OneInchQuote,
}

/// Kyber aggregator quotes share the 1inch transaction shape.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum SwapPayload {
    ThorChain(ThorChainSwapPayload),
    MayaChain(ThorChainSwapPayload),
    OneInch(OneInchSwapPayload),
    Kyber(OneInchSwapPayload),
}

impl SwapPayload {
    pub fn from_coin(&self) -> &Coin {
        match self {
            SwapPayload::ThorChain(p) | SwapPayload::MayaChain(p) => &p.from_coin,
            SwapPayload::OneInch(p) | SwapPayload::Kyber(p) => &p.from_coin,
        }
    }

    /// The aggregator quote, for 1inch and Kyber swaps.
    pub fn aggregator(&self) -> Option<&OneInchSwapPayload> {
        match self {
            SwapPayload::OneInch(p) | SwapPayload::Kyber(p) => Some(p),
            SwapPayload::ThorChain(_) | SwapPayload::MayaChain(_) => None,
        }
    }
}

/// Contract interaction requested instead of a plain token transfer.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum DeFiAction {
    #[default]
    None,
    /// Withdraw from the Circle USDC account contract; the calldata is the
    /// memo.
    CircleUsdcWithdraw,
}

/// Everything needed to build one logical transaction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeysignPayload {
    pub coin: Coin,
    pub to_address: String,
    pub to_amount: U256,
    pub block_chain_specific: BlockChainSpecific,
    #[serde(default)]
    pub utxos: Vec<UtxoInfo>,
    #[serde(default)]
    pub memo: Option<String>,
    #[serde(default)]
    pub swap_payload: Option<SwapPayload>,
    #[serde(default)]
    pub approve_payload: Option<ERC20ApprovePayload>,
    #[serde(default)]
    pub defi_action: DeFiAction,
    pub vault_public_key_ecdsa: String,
    pub vault_local_party_id: String,
}

impl KeysignPayload {
    /// Memo with empty strings treated as absent.
    pub fn memo(&self) -> Option<&str> {
        self.memo.as_deref().filter(|m| !m.is_empty())
    }

    pub fn to_amount_u64(&self) -> Result<u64, SigningError> {
        amount_u64(self.to_amount)
    }

    pub fn to_amount_u128(&self) -> Result<u128, SigningError> {
        u128::try_from(self.to_amount)
            .map_err(|_| SigningError::InvalidPayload(format!("amount {} exceeds u128", self.to_amount)))
    }
}

pub(crate) fn amount_u64(amount: U256) -> Result<u64, SigningError> {
    u64::try_from(amount)
        .map_err(|_| SigningError::InvalidPayload(format!("amount {amount} exceeds u64")))
}

/// Key material of the vault, passed explicitly to every call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Vault {
    /// Compressed secp256k1 master public key.
    pub pub_key_ecdsa: String,
    /// Ed25519 public key.
    pub pub_key_eddsa: String,
    pub hex_chain_code: String,
    pub local_party_id: String,
}

/// Free-form message signed with the vault's Ethereum key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CustomMessagePayload {
    /// RPC method the request came from, e.g. `personal_sign`.
    pub method: String,
    pub message: String,
}

/// Broadcast-ready transaction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignedTransactionResult {
    pub raw_transaction: String,
    pub transaction_hash: String,
}
