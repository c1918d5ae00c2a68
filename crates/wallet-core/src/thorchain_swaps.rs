//! Swaps routed through THORChain.
//!
//! A swap pays `from_amount` of the source asset into a THORChain inbound
//! vault with a memo naming the destination. Apart from EVM tokens, which
//! go through the router contract, the transaction is an ordinary transfer
//! on the source chain, so the payload is rewritten and handed to that
//! chain's helper.

use tracing::debug;

use crate::config::{AffiliateConfig, SigningConfig};
use crate::error::SigningError;
use crate::helpers::{
    ChainSigningHelper, CosmosHelper, EvmHelper, RippleHelper, SigningInput, ThorChainHelper,
    TronHelper, UtxoHelper,
};
use crate::payload::{BlockChainSpecific, KeysignPayload, ThorChainSwapPayload, Vault};
use crate::types::Chain;

#[derive(Debug, Clone)]
pub struct ThorChainSwaps {
    utxo: UtxoHelper,
    evm: EvmHelper,
    cosmos: CosmosHelper,
    thorchain: ThorChainHelper,
    affiliate: AffiliateConfig,
}

impl ThorChainSwaps {
    pub fn new(config: &SigningConfig) -> Self {
        Self {
            utxo: UtxoHelper,
            evm: EvmHelper::new(config),
            cosmos: CosmosHelper::new(config),
            thorchain: ThorChainHelper::new(config),
            affiliate: config.affiliate.clone(),
        }
    }

    /// Signing input for the swap transaction on the source chain.
    pub fn build_input(
        &self,
        swap: &ThorChainSwapPayload,
        payload: &KeysignPayload,
        vault: &Vault,
        nonce_increment: u64,
    ) -> Result<SigningInput, SigningError> {
        let source = swap.from_coin.chain;
        let memo = match payload.memo() {
            Some(memo) => memo.to_string(),
            None => build_swap_memo(swap, &self.affiliate)?,
        };
        debug!(%source, to = %swap.to_coin.chain, nonce_increment, "building thorchain swap");

        match source {
            Chain::Ethereum | Chain::BscChain | Chain::Avalanche | Chain::Base | Chain::Arbitrum => {
                self.evm
                    .build_thorchain_swap(payload, vault, swap, &memo, nonce_increment)
            }
            Chain::Bitcoin | Chain::Litecoin | Chain::Dogecoin | Chain::BitcoinCash => {
                self.utxo.build_input(&to_vault(payload, swap, memo), vault)
            }
            Chain::ThorChain => {
                let mut deposit = to_vault(payload, swap, memo);
                if let BlockChainSpecific::ThorChain { is_deposit, .. } = &mut deposit.block_chain_specific {
                    *is_deposit = true;
                }
                self.thorchain.build_input(&deposit, vault)
            }
            Chain::GaiaChain => self.cosmos.build_input(&to_vault(payload, swap, memo), vault),
            Chain::Ripple => RippleHelper.build_input(&to_vault(payload, swap, memo), vault),
            Chain::Tron => TronHelper.build_input(&to_vault(payload, swap, memo), vault),
            other => Err(SigningError::UnsupportedChain(format!(
                "thorchain swaps from {other}"
            ))),
        }
    }
}

/// The payload as a plain transfer of the swap amount into the inbound vault.
fn to_vault(payload: &KeysignPayload, swap: &ThorChainSwapPayload, memo: String) -> KeysignPayload {
    KeysignPayload {
        to_address: swap.vault_address.clone(),
        to_amount: swap.from_amount,
        memo: Some(memo),
        swap_payload: None,
        approve_payload: None,
        defi_action: Default::default(),
        ..payload.clone()
    }
}

/// `=:{ASSET}:{destination}:{limit}/{interval}/{quantity}[:{affiliate}:{bps}]`
pub fn build_swap_memo(
    swap: &ThorChainSwapPayload,
    affiliate: &AffiliateConfig,
) -> Result<String, SigningError> {
    let to = &swap.to_coin;
    let chain = to
        .chain
        .swap_chain_code()
        .ok_or_else(|| SigningError::UnsupportedChain(format!("thorchain swaps to {}", to.chain)))?;
    let mut asset = format!("{chain}.{}", to.ticker.to_uppercase());
    if !to.is_native_token && !to.contract_address.is_empty() {
        asset.push('-');
        asset.push_str(&to.contract_address.to_uppercase());
    }

    let or = |value: &str, default: &'static str| -> String {
        if value.is_empty() {
            default.to_string()
        } else {
            value.to_string()
        }
    };
    let mut memo = format!(
        "=:{asset}:{}:{}/{}/{}",
        to.address,
        or(&swap.to_amount_limit, "0"),
        or(&swap.streaming_interval, "1"),
        or(&swap.streaming_quantity, "0"),
    );
    if swap.is_affiliate && !affiliate.name.is_empty() {
        memo.push_str(&format!(":{}:{}", affiliate.name, affiliate.fee_bps));
    }
    Ok(memo)
}
