use serde::Serialize;

/// Definition of an EVM-compatible network.
#[derive(Debug, Clone, Serialize)]
pub struct EvmChain {
    pub chain_id: u64,
    pub name: &'static str,
    pub symbol: &'static str,
    pub decimals: u8,
    /// Network does not accept EIP-1559 envelopes reliably; sign legacy
    /// EIP-155 transactions with a single gas price.
    pub legacy_gas: bool,
}

const fn chain(chain_id: u64, name: &'static str, symbol: &'static str) -> EvmChain {
    EvmChain {
        chain_id,
        name,
        symbol,
        decimals: 18,
        legacy_gas: false,
    }
}

/// Ethereum Mainnet (chain ID 1).
pub const ETHEREUM: EvmChain = chain(1, "Ethereum", "ETH");

/// BNB Smart Chain (chain ID 56).
pub const BSC: EvmChain = EvmChain {
    legacy_gas: true,
    ..chain(56, "BNB Smart Chain", "BNB")
};

/// Avalanche C-Chain (chain ID 43114).
pub const AVALANCHE: EvmChain = chain(43114, "Avalanche C-Chain", "AVAX");

/// Polygon PoS (chain ID 137).
pub const POLYGON: EvmChain = chain(137, "Polygon", "POL");

/// Arbitrum One (chain ID 42161).
pub const ARBITRUM: EvmChain = chain(42161, "Arbitrum One", "ETH");

/// Optimism (chain ID 10).
pub const OPTIMISM: EvmChain = chain(10, "Optimism", "ETH");

/// Base (chain ID 8453).
pub const BASE: EvmChain = chain(8453, "Base", "ETH");

/// Blast (chain ID 81457).
pub const BLAST: EvmChain = chain(81457, "Blast", "ETH");

/// Cronos (chain ID 25).
pub const CRONOS: EvmChain = chain(25, "Cronos", "CRO");

/// zkSync Era (chain ID 324).
pub const ZKSYNC: EvmChain = chain(324, "zkSync Era", "ETH");

/// Mantle (chain ID 5000).
pub const MANTLE: EvmChain = chain(5000, "Mantle", "MNT");

/// All supported EVM chains.
const ALL_CHAINS: &[&EvmChain] = &[
    &ETHEREUM, &BSC, &AVALANCHE, &POLYGON, &ARBITRUM, &OPTIMISM, &BASE, &BLAST, &CRONOS,
    &ZKSYNC, &MANTLE,
];

/// Returns the chain definition for a given chain ID, or `None` if unsupported.
pub fn get_chain(chain_id: u64) -> Option<&'static EvmChain> {
    ALL_CHAINS.iter().find(|c| c.chain_id == chain_id).copied()
}

/// Returns all supported EVM chain definitions.
pub fn supported_chains() -> Vec<&'static EvmChain> {
    ALL_CHAINS.to_vec()
}
