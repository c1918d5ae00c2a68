/// Static parameters of a Cosmos SDK network.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CosmosChainParams {
    pub name: &'static str,
    pub chain_id: &'static str,
    /// Bech32 human-readable part of account addresses.
    pub hrp: &'static str,
    /// Fee (and native send) denom.
    pub denom: &'static str,
    /// Default gas limit.
    pub gas_limit: u64,
}

impl CosmosChainParams {
    /// IBC revision number: the numeric suffix of an `{name}-{N}` chain id,
    /// zero for any other shape.
    pub fn revision_number(&self) -> u64 {
        self.chain_id
            .rsplit_once('-')
            .and_then(|(_, n)| n.parse().ok())
            .unwrap_or(0)
    }
}

pub const DEFAULT_GAS_LIMIT: u64 = 200_000;
pub const TERRA_GAS_LIMIT: u64 = 300_000;
pub const THORCHAIN_GAS_LIMIT: u64 = 20_000_000;
pub const MAYACHAIN_GAS_LIMIT: u64 = 2_000_000_000;

const fn params(
    name: &'static str,
    chain_id: &'static str,
    hrp: &'static str,
    denom: &'static str,
    gas_limit: u64,
) -> CosmosChainParams {
    CosmosChainParams {
        name,
        chain_id,
        hrp,
        denom,
        gas_limit,
    }
}

pub const COSMOS_HUB: CosmosChainParams =
    params("Cosmos", "cosmoshub-4", "cosmos", "uatom", DEFAULT_GAS_LIMIT);
pub const OSMOSIS: CosmosChainParams =
    params("Osmosis", "osmosis-1", "osmo", "uosmo", TERRA_GAS_LIMIT);
pub const KUJIRA: CosmosChainParams =
    params("Kujira", "kaiyo-1", "kujira", "ukuji", DEFAULT_GAS_LIMIT);
pub const DYDX: CosmosChainParams =
    params("Dydx", "dydx-mainnet-1", "dydx", "adydx", DEFAULT_GAS_LIMIT);
pub const NOBLE: CosmosChainParams =
    params("Noble", "noble-1", "noble", "uusdc", DEFAULT_GAS_LIMIT);
pub const AKASH: CosmosChainParams =
    params("Akash", "akashnet-2", "akash", "uakt", DEFAULT_GAS_LIMIT);
pub const TERRA: CosmosChainParams =
    params("Terra", "phoenix-1", "terra", "uluna", TERRA_GAS_LIMIT);
pub const TERRA_CLASSIC: CosmosChainParams =
    params("TerraClassic", "columbus-5", "terra", "uluna", TERRA_GAS_LIMIT);
pub const THORCHAIN: CosmosChainParams =
    params("THORChain", "thorchain-1", "thor", "rune", THORCHAIN_GAS_LIMIT);
pub const MAYACHAIN: CosmosChainParams = params(
    "MayaChain",
    "mayachain-mainnet-v1",
    "maya",
    "cacao",
    MAYACHAIN_GAS_LIMIT,
);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn gas_limits() {
        for chain in [TERRA, TERRA_CLASSIC, OSMOSIS] {
            assert_eq!(chain.gas_limit, 300_000, "{}", chain.name);
        }
        for chain in [COSMOS_HUB, KUJIRA, DYDX, NOBLE, AKASH] {
            assert_eq!(chain.gas_limit, 200_000, "{}", chain.name);
        }
        assert_eq!(THORCHAIN.gas_limit, 20_000_000);
        assert_eq!(MAYACHAIN.gas_limit, 2_000_000_000);
    }

    #[test]
    fn revision_numbers_follow_chain_id_suffix() {
        assert_eq!(COSMOS_HUB.revision_number(), 4);
        assert_eq!(OSMOSIS.revision_number(), 1);
        assert_eq!(AKASH.revision_number(), 2);
        assert_eq!(TERRA_CLASSIC.revision_number(), 5);
        assert_eq!(MAYACHAIN.revision_number(), 0);
    }

    #[test]
    fn terra_networks_share_prefix_not_chain_id() {
        assert_eq!(TERRA.hrp, TERRA_CLASSIC.hrp);
        assert_ne!(TERRA.chain_id, TERRA_CLASSIC.chain_id);
    }
}
