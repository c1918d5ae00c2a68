use chain_cosmos::address::decode_address;
use chain_cosmos::{Coin, CosmosMsg, CosmosTransaction, Fee, ThorAsset, ThorCoin};
use crypto_utils::bytes::decode_hex;
use tracing::debug;

use super::{ChainSigningHelper, SigningInput};
use crate::config::SigningConfig;
use crate::error::SigningError;
use crate::hd_derivation::derive_chain_public_key;
use crate::payload::{mismatch, BlockChainSpecific, KeysignPayload, Vault};
use crate::types::Chain;

/// THORChain and MayaChain sends and `MsgDeposit`s. Fees are paid by the
/// network out of the sent asset, so the fee carries gas only.
#[derive(Debug, Clone)]
pub struct ThorChainHelper {
    config: SigningConfig,
}

impl ThorChainHelper {
    pub fn new(config: &SigningConfig) -> Self {
        Self {
            config: config.clone(),
        }
    }
}

impl ChainSigningHelper for ThorChainHelper {
    fn build_input(
        &self,
        payload: &KeysignPayload,
        vault: &Vault,
    ) -> Result<SigningInput, SigningError> {
        let coin = &payload.coin;
        let chain = coin.chain;
        let asset_chain = match chain {
            Chain::ThorChain => "THOR",
            Chain::MayaChain => "MAYA",
            other => {
                return Err(SigningError::UnsupportedChain(format!(
                    "{other} is not THORChain or MayaChain"
                )))
            }
        };
        let (account_number, sequence, is_deposit) = match &payload.block_chain_specific {
            BlockChainSpecific::ThorChain {
                account_number,
                sequence,
                is_deposit,
                ..
            } if chain == Chain::ThorChain => (*account_number, *sequence, *is_deposit),
            BlockChainSpecific::MayaChain {
                account_number,
                sequence,
                is_deposit,
            } if chain == Chain::MayaChain => (*account_number, *sequence, *is_deposit),
            other => return Err(mismatch(chain, other)),
        };
        let params = chain
            .cosmos_params()
            .ok_or_else(|| SigningError::UnsupportedChain(chain.to_string()))?;

        let from = decode_address(&coin.address, params.hrp)?;
        let memo = payload.memo().unwrap_or_default();
        let message = if is_deposit {
            let ticker = if coin.is_native_token {
                chain.ticker().to_string()
            } else {
                coin.ticker.to_uppercase()
            };
            let (amount, decimals) = if payload.to_amount.is_zero() {
                ("0".to_string(), 0)
            } else {
                (payload.to_amount.to_string(), i64::from(coin.decimals))
            };
            CosmosMsg::ThorDeposit {
                coins: vec![ThorCoin {
                    asset: ThorAsset::native(asset_chain, &ticker),
                    amount,
                    decimals,
                }],
                memo: memo.to_string(),
                signer: from,
            }
        } else {
            let denom = if coin.is_native_token {
                params.denom.to_string()
            } else {
                coin.contract_address.clone()
            };
            CosmosMsg::ThorSend {
                from_address: from,
                to_address: decode_address(&payload.to_address, params.hrp)?,
                amount: vec![Coin::new(denom, payload.to_amount)],
            }
        };

        let fee = Fee {
            amount: Vec::new(),
            gas_limit: self.config.cosmos_gas_limit(chain)?,
        };
        let public_key = decode_hex(&derive_chain_public_key(vault, chain)?)?;
        let tx = CosmosTransaction::new(
            message,
            memo,
            &public_key,
            sequence,
            fee,
            params.chain_id,
            account_number,
        )?;
        debug!(%chain, is_deposit, sequence, "built thorchain transaction");
        Ok(SigningInput::Cosmos(tx))
    }
}
