use std::collections::BTreeMap;

use chain_dot::ExtrinsicConfig;
use serde::{Deserialize, Serialize};

use crate::error::SigningError;
use crate::types::Chain;

/// Gas used for aggregator swaps whose quote does not carry an estimate.
pub const DEFAULT_EVM_SWAP_GAS_LIMIT: u64 = 600_000;
pub const DEFAULT_SOLANA_PRIORITY_FEE_PRICE: u64 = 1_000_000;
pub const DEFAULT_SOLANA_PRIORITY_FEE_LIMIT: u32 = 100_000;

/// Tunables that are not part of a keysign payload. Supplied once when the
/// helper registry is built.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SigningConfig {
    pub polkadot: ExtrinsicConfig,
    pub evm_swap_gas_limit: u64,
    /// Per-chain Cosmos gas limits replacing the network defaults.
    pub cosmos_gas_limits: BTreeMap<Chain, u64>,
    pub solana_priority_fee_price: u64,
    pub solana_priority_fee_limit: u32,
    pub affiliate: AffiliateConfig,
}

/// Affiliate appended to THORChain / MayaChain swap memos.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AffiliateConfig {
    pub name: String,
    pub fee_bps: u32,
}

impl Default for SigningConfig {
    fn default() -> Self {
        Self {
            polkadot: ExtrinsicConfig::default(),
            evm_swap_gas_limit: DEFAULT_EVM_SWAP_GAS_LIMIT,
            cosmos_gas_limits: BTreeMap::new(),
            solana_priority_fee_price: DEFAULT_SOLANA_PRIORITY_FEE_PRICE,
            solana_priority_fee_limit: DEFAULT_SOLANA_PRIORITY_FEE_LIMIT,
            affiliate: AffiliateConfig::default(),
        }
    }
}

impl Default for AffiliateConfig {
    fn default() -> Self {
        Self {
            name: "va".into(),
            fee_bps: 50,
        }
    }
}

impl SigningConfig {
    /// Parses a JSON config; missing fields keep their defaults.
    pub fn from_json(json: &str) -> Result<Self, SigningError> {
        serde_json::from_str(json)
            .map_err(|e| SigningError::InvalidPayload(format!("config: {e}")))
    }

    /// Gas limit for a Cosmos SDK chain: the override if one is set, else
    /// the network default.
    pub fn cosmos_gas_limit(&self, chain: Chain) -> Result<u64, SigningError> {
        if let Some(gas) = self.cosmos_gas_limits.get(&chain) {
            return Ok(*gas);
        }
        chain
            .cosmos_params()
            .map(|p| p.gas_limit)
            .ok_or_else(|| SigningError::UnsupportedChain(format!("{chain} is not a Cosmos chain")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let config = SigningConfig::default();
        assert_eq!(config.evm_swap_gas_limit, 600_000);
        assert_eq!(config.solana_priority_fee_price, 1_000_000);
        assert_eq!(config.solana_priority_fee_limit, 100_000);
        assert_eq!(config.polkadot.module_index, 10);
        assert_eq!(config.affiliate.name, "va");
        assert_eq!(config.affiliate.fee_bps, 50);
    }

    #[test]
    fn partial_json_keeps_defaults() {
        let config = SigningConfig::from_json(
            r#"{"polkadot": {"module_index": 5}, "cosmos_gas_limits": {"Osmosis": 500000}}"#,
        )
        .unwrap();
        assert_eq!(config.polkadot.module_index, 5);
        assert_eq!(config.polkadot.era_period, 64);
        assert_eq!(config.evm_swap_gas_limit, 600_000);
        assert_eq!(config.cosmos_gas_limit(Chain::Osmosis).unwrap(), 500_000);
        assert_eq!(config.cosmos_gas_limit(Chain::GaiaChain).unwrap(), 200_000);
    }

    #[test]
    fn invalid_json_is_rejected() {
        let err = SigningConfig::from_json("{not json").unwrap_err();
        assert!(err.to_string().starts_with("invalid payload: config:"));
    }

    #[test]
    fn gas_limit_for_non_cosmos_chain() {
        let config = SigningConfig::default();
        assert!(matches!(
            config.cosmos_gas_limit(Chain::Solana),
            Err(SigningError::UnsupportedChain(_))
        ));
        assert_eq!(config.cosmos_gas_limit(Chain::MayaChain).unwrap(), 2_000_000_000);
    }
}
