use std::fmt;

use chain_cosmos::chains as cosmos;
use chain_cosmos::CosmosChainParams;
use chain_utxo::UtxoChain;
use serde::{Deserialize, Serialize};

/// Chains the signing engine can produce transactions for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Chain {
    // UTXO
    Bitcoin,
    BitcoinCash,
    Litecoin,
    Dogecoin,
    Dash,
    Zcash,
    // EVM
    Ethereum,
    Avalanche,
    Base,
    Blast,
    Arbitrum,
    Mantle,
    Polygon,
    Optimism,
    BscChain,
    CronosChain,
    ZkSync,
    // Cosmos SDK
    GaiaChain,
    Kujira,
    Dydx,
    Osmosis,
    Noble,
    Akash,
    Terra,
    TerraClassic,
    ThorChain,
    MayaChain,
    // Everything else
    Solana,
    Polkadot,
    Tron,
    Ripple,
    Cardano,
}

/// Signing-helper family a chain belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChainFamily {
    Utxo,
    Evm,
    Cosmos,
    Terra,
    ThorChain,
    MayaChain,
    Solana,
    Polkadot,
    Tron,
    Ripple,
    Cardano,
}

/// Signature scheme the ceremony runs for a chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignatureScheme {
    /// secp256k1 ECDSA.
    Ecdsa,
    /// Ed25519.
    EdDsa,
}

impl Chain {
    pub const ALL: [Chain; 32] = [
        Chain::Bitcoin,
        Chain::BitcoinCash,
        Chain::Litecoin,
        Chain::Dogecoin,
        Chain::Dash,
        Chain::Zcash,
        Chain::Ethereum,
        Chain::Avalanche,
        Chain::Base,
        Chain::Blast,
        Chain::Arbitrum,
        Chain::Mantle,
        Chain::Polygon,
        Chain::Optimism,
        Chain::BscChain,
        Chain::CronosChain,
        Chain::ZkSync,
        Chain::GaiaChain,
        Chain::Kujira,
        Chain::Dydx,
        Chain::Osmosis,
        Chain::Noble,
        Chain::Akash,
        Chain::Terra,
        Chain::TerraClassic,
        Chain::ThorChain,
        Chain::MayaChain,
        Chain::Solana,
        Chain::Polkadot,
        Chain::Tron,
        Chain::Ripple,
        Chain::Cardano,
    ];

    pub fn family(&self) -> ChainFamily {
        match self {
            Chain::Bitcoin
            | Chain::BitcoinCash
            | Chain::Litecoin
            | Chain::Dogecoin
            | Chain::Dash
            | Chain::Zcash => ChainFamily::Utxo,
            Chain::Ethereum
            | Chain::Avalanche
            | Chain::Base
            | Chain::Blast
            | Chain::Arbitrum
            | Chain::Mantle
            | Chain::Polygon
            | Chain::Optimism
            | Chain::BscChain
            | Chain::CronosChain
            | Chain::ZkSync => ChainFamily::Evm,
            Chain::GaiaChain
            | Chain::Kujira
            | Chain::Dydx
            | Chain::Osmosis
            | Chain::Noble
            | Chain::Akash => ChainFamily::Cosmos,
            Chain::Terra | Chain::TerraClassic => ChainFamily::Terra,
            Chain::ThorChain => ChainFamily::ThorChain,
            Chain::MayaChain => ChainFamily::MayaChain,
            Chain::Solana => ChainFamily::Solana,
            Chain::Polkadot => ChainFamily::Polkadot,
            Chain::Tron => ChainFamily::Tron,
            Chain::Ripple => ChainFamily::Ripple,
            Chain::Cardano => ChainFamily::Cardano,
        }
    }

    /// Native token ticker.
    pub fn ticker(&self) -> &'static str {
        match self {
            Chain::Bitcoin => "BTC",
            Chain::BitcoinCash => "BCH",
            Chain::Litecoin => "LTC",
            Chain::Dogecoin => "DOGE",
            Chain::Dash => "DASH",
            Chain::Zcash => "ZEC",
            Chain::Ethereum
            | Chain::Base
            | Chain::Blast
            | Chain::Arbitrum
            | Chain::Optimism
            | Chain::ZkSync => "ETH",
            Chain::Avalanche => "AVAX",
            Chain::Mantle => "MNT",
            Chain::Polygon => "POL",
            Chain::BscChain => "BNB",
            Chain::CronosChain => "CRO",
            Chain::GaiaChain => "ATOM",
            Chain::Kujira => "KUJI",
            Chain::Dydx => "DYDX",
            Chain::Osmosis => "OSMO",
            Chain::Noble => "USDC",
            Chain::Akash => "AKT",
            Chain::Terra => "LUNA",
            Chain::TerraClassic => "LUNC",
            Chain::ThorChain => "RUNE",
            Chain::MayaChain => "CACAO",
            Chain::Solana => "SOL",
            Chain::Polkadot => "DOT",
            Chain::Tron => "TRX",
            Chain::Ripple => "XRP",
            Chain::Cardano => "ADA",
        }
    }

    /// EIP-155 chain id, EVM chains only.
    pub fn evm_chain_id(&self) -> Option<u64> {
        match self {
            Chain::Ethereum => Some(1),
            Chain::Avalanche => Some(43114),
            Chain::Base => Some(8453),
            Chain::Blast => Some(81457),
            Chain::Arbitrum => Some(42161),
            Chain::Mantle => Some(5000),
            Chain::Polygon => Some(137),
            Chain::Optimism => Some(10),
            Chain::BscChain => Some(56),
            Chain::CronosChain => Some(25),
            Chain::ZkSync => Some(324),
            _ => None,
        }
    }

    /// BIP-44 style derivation path of the chain's account key.
    pub fn derivation_path(&self) -> &'static str {
        match self {
            Chain::Bitcoin => "m/84'/0'/0'/0/0",
            Chain::BitcoinCash => "m/44'/145'/0'/0/0",
            Chain::Litecoin => "m/84'/2'/0'/0/0",
            Chain::Dogecoin => "m/44'/3'/0'/0/0",
            Chain::Dash => "m/44'/5'/0'/0/0",
            Chain::Zcash => "m/44'/133'/0'/0/0",
            Chain::Ethereum
            | Chain::Avalanche
            | Chain::Base
            | Chain::Blast
            | Chain::Arbitrum
            | Chain::Mantle
            | Chain::Polygon
            | Chain::Optimism
            | Chain::BscChain
            | Chain::CronosChain
            | Chain::ZkSync => "m/44'/60'/0'/0/0",
            Chain::GaiaChain
            | Chain::Kujira
            | Chain::Dydx
            | Chain::Osmosis
            | Chain::Noble
            | Chain::Akash => "m/44'/118'/0'/0/0",
            Chain::Terra | Chain::TerraClassic => "m/44'/330'/0'/0/0",
            Chain::ThorChain | Chain::MayaChain => "m/44'/931'/0'/0/0",
            Chain::Solana => "m/44'/501'/0'/0'",
            Chain::Polkadot => "m/44'/354'/0'/0'/0'",
            Chain::Tron => "m/44'/195'/0'/0/0",
            Chain::Ripple => "m/44'/144'/0'/0/0",
            Chain::Cardano => "m/1852'/1815'/0'/0/0",
        }
    }

    pub fn signature_scheme(&self) -> SignatureScheme {
        match self {
            Chain::Solana | Chain::Polkadot | Chain::Cardano => SignatureScheme::EdDsa,
            _ => SignatureScheme::Ecdsa,
        }
    }

    /// Denom, address prefix and chain id of Cosmos SDK chains.
    pub fn cosmos_params(&self) -> Option<&'static CosmosChainParams> {
        match self {
            Chain::GaiaChain => Some(&cosmos::COSMOS_HUB),
            Chain::Kujira => Some(&cosmos::KUJIRA),
            Chain::Dydx => Some(&cosmos::DYDX),
            Chain::Osmosis => Some(&cosmos::OSMOSIS),
            Chain::Noble => Some(&cosmos::NOBLE),
            Chain::Akash => Some(&cosmos::AKASH),
            Chain::Terra => Some(&cosmos::TERRA),
            Chain::TerraClassic => Some(&cosmos::TERRA_CLASSIC),
            Chain::ThorChain => Some(&cosmos::THORCHAIN),
            Chain::MayaChain => Some(&cosmos::MAYACHAIN),
            _ => None,
        }
    }

    pub fn utxo_chain(&self) -> Option<UtxoChain> {
        match self {
            Chain::Bitcoin => Some(UtxoChain::Bitcoin),
            Chain::BitcoinCash => Some(UtxoChain::BitcoinCash),
            Chain::Litecoin => Some(UtxoChain::Litecoin),
            Chain::Dogecoin => Some(UtxoChain::Dogecoin),
            Chain::Dash => Some(UtxoChain::Dash),
            Chain::Zcash => Some(UtxoChain::Zcash),
            _ => None,
        }
    }

    /// Chain code used in THORChain / MayaChain asset notation.
    pub fn swap_chain_code(&self) -> Option<&'static str> {
        match self {
            Chain::Bitcoin => Some("BTC"),
            Chain::BitcoinCash => Some("BCH"),
            Chain::Litecoin => Some("LTC"),
            Chain::Dogecoin => Some("DOGE"),
            Chain::Dash => Some("DASH"),
            Chain::Ethereum => Some("ETH"),
            Chain::Avalanche => Some("AVAX"),
            Chain::BscChain => Some("BSC"),
            Chain::Base => Some("BASE"),
            Chain::Arbitrum => Some("ARB"),
            Chain::GaiaChain => Some("GAIA"),
            Chain::ThorChain => Some("THOR"),
            Chain::MayaChain => Some("MAYA"),
            Chain::Ripple => Some("XRP"),
            Chain::Tron => Some("TRON"),
            Chain::Kujira => Some("KUJI"),
            _ => None,
        }
    }
}

impl fmt::Display for Chain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{self:?}")
    }
}
