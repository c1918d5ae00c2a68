use alloy_primitives::{Address, U256};
use chain_evm::address::parse_address;
use chain_evm::transaction::{build_erc20_transfer, build_transfer};
use chain_evm::{erc20, router};
use crypto_utils::bytes::{decode_hex, is_hex};
use tracing::debug;

use super::{ChainSigningHelper, SigningInput};
use crate::config::SigningConfig;
use crate::error::SigningError;
use crate::hd_derivation::derive_chain_public_key;
use crate::payload::{
    mismatch, BlockChainSpecific, DeFiAction, ERC20ApprovePayload, KeysignPayload,
    OneInchSwapPayload, ThorChainSwapPayload, Vault,
};
use crate::types::Chain;

/// Native and ERC20 transfers on EVM chains, plus the approve, router and
/// aggregator calls swaps need. Signs with the vault key derived at
/// `m/44/60/0/0/0`.
#[derive(Debug, Clone)]
pub struct EvmHelper {
    swap_gas_limit: u64,
}

struct Fees {
    nonce: u64,
    gas_limit: u64,
    max_fee: u128,
    priority_fee: u128,
}

/// A contract call or value transfer, before fees and nonce are applied.
struct Call {
    to: Address,
    value: U256,
    data: Vec<u8>,
    gas_limit: Option<u64>,
}

impl EvmHelper {
    pub fn new(config: &SigningConfig) -> Self {
        Self {
            swap_gas_limit: config.evm_swap_gas_limit,
        }
    }

    /// Plain transfer with its nonce moved forward by `nonce_increment`.
    pub fn build_transfer(
        &self,
        payload: &KeysignPayload,
        vault: &Vault,
        nonce_increment: u64,
    ) -> Result<SigningInput, SigningError> {
        let coin = &payload.coin;
        if payload.defi_action == DeFiAction::CircleUsdcWithdraw {
            return self.build_usdc_withdraw(payload, vault, nonce_increment);
        }
        let to = parse_address(&payload.to_address)?;
        if coin.is_native_token {
            let call = Call {
                to,
                value: payload.to_amount,
                data: payload.memo().map(memo_data).transpose()?.unwrap_or_default(),
                gas_limit: None,
            };
            return self.build_call(payload, vault, call, nonce_increment);
        }

        let contract = parse_address(&coin.contract_address)?;
        let fees = fees(payload, nonce_increment)?;
        let tx = build_erc20_transfer(
            chain_id(coin.chain)?,
            fees.nonce,
            contract,
            to,
            payload.to_amount,
            fees.priority_fee,
            fees.max_fee,
            fees.gas_limit,
        );
        debug!(chain = %coin.chain, nonce = fees.nonce, "built erc20 transfer");
        Ok(SigningInput::Evm {
            tx,
            public_key: public_key(vault, coin.chain)?,
        })
    }

    /// Circle USDC withdraw: a zero-value call to the coin's contract with
    /// the memo as calldata.
    fn build_usdc_withdraw(
        &self,
        payload: &KeysignPayload,
        vault: &Vault,
        nonce_increment: u64,
    ) -> Result<SigningInput, SigningError> {
        let memo = payload
            .memo()
            .filter(|m| !m.trim().is_empty())
            .ok_or_else(|| SigningError::InvalidPayload("empty memo for usdc withdraw".into()))?;
        if payload.coin.is_native_token || payload.coin.contract_address.is_empty() {
            return Err(SigningError::InvalidPayload(
                "usdc withdraw needs a token contract".into(),
            ));
        }
        let call = Call {
            to: parse_address(&payload.coin.contract_address)?,
            value: U256::ZERO,
            data: memo_data(memo)?,
            gas_limit: None,
        };
        debug!(chain = %payload.coin.chain, "building usdc withdraw");
        self.build_call(payload, vault, call, nonce_increment)
    }

    /// `approve(spender, amount)` on the coin's token contract.
    pub fn build_approve(
        &self,
        payload: &KeysignPayload,
        vault: &Vault,
        approve: &ERC20ApprovePayload,
    ) -> Result<SigningInput, SigningError> {
        let call = Call {
            to: parse_address(&payload.coin.contract_address)?,
            value: U256::ZERO,
            data: erc20::encode_approve(parse_address(&approve.spender)?, approve.amount),
            gas_limit: None,
        };
        self.build_call(payload, vault, call, 0)
    }

    /// Swap into THORChain. Native coins go straight to the inbound vault
    /// with the memo as calldata; tokens are deposited through the router.
    pub fn build_thorchain_swap(
        &self,
        payload: &KeysignPayload,
        vault: &Vault,
        swap: &ThorChainSwapPayload,
        memo: &str,
        nonce_increment: u64,
    ) -> Result<SigningInput, SigningError> {
        if swap.vault_address.is_empty() {
            return Err(SigningError::InvalidPayload("swap vault address is empty".into()));
        }
        let inbound = parse_address(&swap.vault_address)?;

        let call = if swap.from_coin.is_native_token {
            Call {
                to: inbound,
                value: swap.from_amount,
                data: memo_data(memo)?,
                gas_limit: None,
            }
        } else {
            let router_address = swap
                .router_address
                .as_deref()
                .filter(|r| !r.is_empty())
                .ok_or_else(|| SigningError::InvalidPayload("router address is required for token swaps".into()))?;
            if swap.from_coin.contract_address.is_empty() {
                return Err(SigningError::InvalidPayload(
                    "contract address is required for token swaps".into(),
                ));
            }
            Call {
                to: parse_address(router_address)?,
                value: U256::ZERO,
                data: router::encode_deposit_with_expiry(
                    inbound,
                    parse_address(&swap.from_coin.contract_address)?,
                    swap.from_amount,
                    memo,
                    swap.expiration_time,
                ),
                gas_limit: None,
            }
        };
        self.build_call(payload, vault, call, nonce_increment)
    }

    /// Swap through an aggregator quote. A quote without a gas estimate
    /// uses the configured swap gas.
    pub fn build_one_inch_swap(
        &self,
        payload: &KeysignPayload,
        vault: &Vault,
        swap: &OneInchSwapPayload,
        nonce_increment: u64,
    ) -> Result<SigningInput, SigningError> {
        let quote = &swap.quote.tx;
        let value = if quote.value.is_empty() {
            U256::ZERO
        } else {
            quote
                .value
                .parse::<U256>()
                .map_err(|e| SigningError::InvalidPayload(format!("quote value {:?}: {e}", quote.value)))?
        };
        let gas_limit = if quote.gas == 0 {
            self.swap_gas_limit
        } else {
            quote.gas
        };
        let call = Call {
            to: parse_address(&quote.to)?,
            value,
            data: decode_hex(&quote.data)?,
            gas_limit: Some(gas_limit),
        };
        self.build_call(payload, vault, call, nonce_increment)
    }

    fn build_call(
        &self,
        payload: &KeysignPayload,
        vault: &Vault,
        call: Call,
        nonce_increment: u64,
    ) -> Result<SigningInput, SigningError> {
        let chain = payload.coin.chain;
        let fees = fees(payload, nonce_increment)?;
        let tx = build_transfer(
            chain_id(chain)?,
            fees.nonce,
            call.to,
            call.value,
            fees.priority_fee,
            fees.max_fee,
            call.gas_limit.unwrap_or(fees.gas_limit),
            call.data,
        );
        debug!(%chain, nonce = fees.nonce, to = %tx.to, "built evm transaction");
        Ok(SigningInput::Evm {
            tx,
            public_key: public_key(vault, chain)?,
        })
    }
}

impl ChainSigningHelper for EvmHelper {
    fn build_input(
        &self,
        payload: &KeysignPayload,
        vault: &Vault,
    ) -> Result<SigningInput, SigningError> {
        self.build_transfer(payload, vault, 0)
    }
}

fn fees(payload: &KeysignPayload, nonce_increment: u64) -> Result<Fees, SigningError> {
    match &payload.block_chain_specific {
        BlockChainSpecific::Ethereum {
            nonce,
            gas_limit,
            max_fee_per_gas_wei,
            priority_fee_wei,
        } => Ok(Fees {
            nonce: nonce
                .checked_add(nonce_increment)
                .ok_or_else(|| SigningError::InvalidPayload("nonce overflow".into()))?,
            gas_limit: *gas_limit,
            max_fee: *max_fee_per_gas_wei,
            priority_fee: *priority_fee_wei,
        }),
        other => Err(mismatch(payload.coin.chain, other)),
    }
}

fn chain_id(chain: Chain) -> Result<u64, SigningError> {
    chain
        .evm_chain_id()
        .ok_or_else(|| SigningError::UnsupportedChain(format!("{chain} is not an EVM chain")))
}

fn public_key(vault: &Vault, chain: Chain) -> Result<Vec<u8>, SigningError> {
    Ok(decode_hex(&derive_chain_public_key(vault, chain)?)?)
}

/// `0x`-prefixed hex is taken as raw bytes, anything else as UTF-8.
pub(crate) fn memo_data(memo: &str) -> Result<Vec<u8>, SigningError> {
    if memo.starts_with("0x") && is_hex(memo) {
        Ok(decode_hex(memo)?)
    } else {
        Ok(memo.as_bytes().to_vec())
    }
}
