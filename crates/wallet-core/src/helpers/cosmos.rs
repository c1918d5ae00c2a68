use chain_cosmos::msg::{parse_ibc_memo, IbcRoute};
use chain_cosmos::{Coin, CosmosChainParams, CosmosMsg, CosmosTransaction, Fee, IbcTimeout};
use crypto_utils::bytes::decode_hex;
use tracing::debug;

use super::{ChainSigningHelper, SigningInput};
use crate::config::SigningConfig;
use crate::error::SigningError;
use crate::payload::{
    mismatch, BlockChainSpecific, Coin as PayloadCoin, IbcDenomTrace, KeysignPayload, Vault,
};
use crate::types::ChainFamily;

/// Terra stable-denom sends pay a fixed gas and a second fee coin.
const TERRA_DENOM_GAS: u64 = 1_000_000;
const TERRA_STABLE_FEE: (&str, u64) = ("uusd", 1_000_000);

/// Bank sends, IBC transfers and Terra CW20 transfers on Cosmos SDK chains.
#[derive(Debug, Clone)]
pub struct CosmosHelper {
    config: SigningConfig,
}

struct Account<'a> {
    account_number: u64,
    sequence: u64,
    gas: u64,
    ibc_denom_trace: Option<&'a IbcDenomTrace>,
}

impl CosmosHelper {
    pub fn new(config: &SigningConfig) -> Self {
        Self {
            config: config.clone(),
        }
    }

    fn message(
        &self,
        payload: &KeysignPayload,
        params: &CosmosChainParams,
        ibc_denom_trace: Option<&IbcDenomTrace>,
    ) -> Result<(CosmosMsg, String), SigningError> {
        let coin = &payload.coin;
        let amount = payload.to_amount.to_string();
        let memo = payload.memo().unwrap_or_default().to_string();

        if is_cw20(coin) {
            let msg = CosmosMsg::cw20_transfer(
                &coin.address,
                &coin.contract_address,
                &payload.to_address,
                &amount,
            );
            return Ok((msg, memo));
        }

        let denom = if coin.is_native_token {
            params.denom.to_string()
        } else if coin.chain.family() == ChainFamily::Terra
            || coin.contract_address.contains("factory/")
            || coin.contract_address.contains("ibc/")
        {
            coin.contract_address.clone()
        } else {
            params.denom.to_string()
        };
        let token = Coin::new(denom, &amount);

        if let Some(route) = parse_ibc_memo(&memo) {
            let timeout = ibc_timeout(&route, ibc_denom_trace, params)?;
            debug!(
                chain = %coin.chain,
                channel = %route.source_channel,
                timeout_height = timeout.height.revision_height,
                timeout_timestamp = timeout.timestamp,
                "ibc transfer"
            );
            let msg =
                CosmosMsg::ibc_transfer(&coin.address, &payload.to_address, token, route, timeout)?;
            return Ok((msg, String::new()));
        }

        let msg = CosmosMsg::Send {
            from_address: coin.address.clone(),
            to_address: payload.to_address.clone(),
            amount: vec![token],
        };
        Ok((msg, memo))
    }

    fn fee(
        &self,
        payload: &KeysignPayload,
        params: &CosmosChainParams,
        gas: u64,
    ) -> Result<Fee, SigningError> {
        let coin = &payload.coin;
        let terra_denom = coin.chain.family() == ChainFamily::Terra
            && !coin.is_native_token
            && !is_bank_denom(coin)
            && !is_cw20(coin);
        if terra_denom {
            let (stable, stable_amount) = TERRA_STABLE_FEE;
            return Ok(Fee {
                amount: vec![Coin::new(params.denom, gas), Coin::new(stable, stable_amount)],
                gas_limit: TERRA_DENOM_GAS,
            });
        }
        Ok(Fee {
            amount: vec![Coin::new(params.denom, gas)],
            gas_limit: self.config.cosmos_gas_limit(coin.chain)?,
        })
    }
}

impl ChainSigningHelper for CosmosHelper {
    fn build_input(
        &self,
        payload: &KeysignPayload,
        _vault: &Vault,
    ) -> Result<SigningInput, SigningError> {
        let chain = payload.coin.chain;
        let params = chain
            .cosmos_params()
            .ok_or_else(|| SigningError::UnsupportedChain(format!("{chain} is not a Cosmos chain")))?;
        let account = match &payload.block_chain_specific {
            BlockChainSpecific::Cosmos {
                account_number,
                sequence,
                gas,
                ibc_denom_trace,
            } => Account {
                account_number: *account_number,
                sequence: *sequence,
                gas: *gas,
                ibc_denom_trace: ibc_denom_trace.as_ref(),
            },
            other => return Err(mismatch(chain, other)),
        };

        let (message, memo) = self.message(payload, params, account.ibc_denom_trace)?;
        let fee = self.fee(payload, params, account.gas)?;
        let tx = CosmosTransaction::new(
            message,
            &memo,
            &decode_hex(&payload.coin.hex_public_key)?,
            account.sequence,
            fee,
            params.chain_id,
            account.account_number,
        )?;
        debug!(%chain, sequence = account.sequence, "built cosmos transaction");
        Ok(SigningInput::Cosmos(tx))
    }
}

/// Packet timeout of an IBC transfer. The denom trace's latest block sets
/// both the height and the timestamp; without a trace the memo's timestamp
/// is used. A transfer that ends up with neither is refused.
fn ibc_timeout(
    route: &IbcRoute,
    trace: Option<&IbcDenomTrace>,
    params: &CosmosChainParams,
) -> Result<IbcTimeout, SigningError> {
    let timeout = match trace {
        Some(trace) => IbcTimeout::from_latest_block(&trace.latest_block, params.revision_number())
            .map_err(|e| SigningError::InvalidPayload(e.to_string()))?,
        None => IbcTimeout::at(route.timeout_timestamp),
    };
    if timeout.is_zero() {
        return Err(SigningError::InvalidPayload(format!(
            "IBC transfer over {} has no timeout",
            route.source_channel
        )));
    }
    Ok(timeout)
}

/// IBC vouchers and token-factory denoms move through the bank module.
fn is_bank_denom(coin: &PayloadCoin) -> bool {
    let contract = coin.contract_address.to_ascii_lowercase();
    contract.starts_with("ibc/") || contract.starts_with("factory/")
}

fn is_cw20(coin: &PayloadCoin) -> bool {
    coin.chain.family() == ChainFamily::Terra
        && !coin.is_native_token
        && !is_bank_denom(coin)
        && coin.contract_address.contains("terra1")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::helpers::test_support::{coin_key, compressed, sign_ecdsa, vault};
    use crate::types::Chain;
    use alloy_primitives::U256;
    use chain_cosmos::tx::decode_envelope;

    fn payload(chain: Chain, memo: Option<&str>) -> KeysignPayload {
        let public = compressed(&coin_key());
        let hrp = chain.cosmos_params().unwrap().hrp;
        let address =
            chain_cosmos::address::pubkey_to_address(&hex::decode(&public).unwrap(), hrp).unwrap();
        let to = chain_cosmos::address::encode_address(hrp, &[0x42; 20]).unwrap();
        KeysignPayload {
            coin: PayloadCoin::native(chain, &address, &public),
            to_address: to,
            to_amount: U256::from(1_500_000u64),
            block_chain_specific: BlockChainSpecific::Cosmos {
                account_number: 12,
                sequence: 3,
                gas: 7_500,
                ibc_denom_trace: None,
            },
            utxos: Vec::new(),
            memo: memo.map(str::to_string),
            swap_payload: None,
            approve_payload: None,
            defi_action: Default::default(),
            vault_public_key_ecdsa: String::new(),
            vault_local_party_id: "device-1".into(),
        }
    }

    fn helper() -> CosmosHelper {
        CosmosHelper::new(&SigningConfig::default())
    }

    fn built(payload: &KeysignPayload) -> CosmosTransaction {
        match helper().build_input(payload, &vault()).unwrap() {
            SigningInput::Cosmos(tx) => tx,
            other => panic!("unexpected input {other:?}"),
        }
    }

    #[test]
    fn bank_send_round_trip() {
        let payload = payload(Chain::GaiaChain, Some("hi"));
        let hashes = helper().pre_image_hashes(&payload, &vault()).unwrap();
        assert_eq!(hashes.len(), 1);

        let signed = helper().sign(&payload, &vault(), &sign_ecdsa(&coin_key(), &hashes)).unwrap();
        assert!(signed.raw_transaction.contains("BROADCAST_MODE_SYNC"));
        assert_eq!(signed.transaction_hash.len(), 64);
        assert_eq!(signed.transaction_hash, signed.transaction_hash.to_uppercase());

        let decoded = decode_envelope(&signed.raw_transaction).unwrap();
        assert_eq!(decoded.memo, "hi");
        assert_eq!(decoded.sequence, 3);
        assert_eq!(decoded.fee.gas_limit, 200_000);
        assert_eq!(decoded.fee.amount, vec![Coin::new("uatom", 7_500u64)]);
    }

    fn with_trace(mut payload: KeysignPayload, latest_block: &str) -> KeysignPayload {
        if let BlockChainSpecific::Cosmos { ibc_denom_trace, .. } = &mut payload.block_chain_specific {
            *ibc_denom_trace = Some(IbcDenomTrace {
                path: "transfer/channel-141".into(),
                base_denom: "uosmo".into(),
                latest_block: latest_block.into(),
            });
        }
        payload
    }

    fn ibc_timeouts(tx: &CosmosTransaction) -> (chain_cosmos::IbcHeight, u64, String) {
        match &tx.messages[0] {
            CosmosMsg::IbcTransfer {
                timeout_height,
                timeout_timestamp,
                memo,
                ..
            } => (*timeout_height, *timeout_timestamp, memo.clone()),
            other => panic!("unexpected message {other:?}"),
        }
    }

    #[test]
    fn ibc_memo_routes_through_channel() {
        let payload = with_trace(
            payload(Chain::GaiaChain, Some("channel-0:channel-141:0:hello")),
            "22000000_1700000600000000000",
        );
        let tx = built(&payload);
        match &tx.messages[0] {
            CosmosMsg::IbcTransfer {
                source_channel,
                memo,
                timeout_height,
                timeout_timestamp,
                token,
                ..
            } => {
                assert_eq!(source_channel, "channel-141");
                assert_eq!(memo, "hello");
                assert_eq!(*timeout_timestamp, 1_700_000_600_000_000_000);
                assert_eq!(timeout_height.revision_number, 4);
                assert_eq!(timeout_height.revision_height, 22_001_000);
                assert_eq!(token.denom, "uatom");
            }
            other => panic!("unexpected message {other:?}"),
        }
        assert!(tx.memo.is_empty());
        assert_eq!(helper().pre_image_hashes(&payload, &vault()).unwrap().len(), 1);
    }

    #[test]
    fn ibc_timeout_falls_back_to_memo_without_trace() {
        let payload = payload(Chain::Osmosis, Some("channel-0:channel-0:1700000000000000000:gm"));
        let (height, timestamp, memo) = ibc_timeouts(&built(&payload));
        assert_eq!(timestamp, 1_700_000_000_000_000_000);
        assert_eq!(height, chain_cosmos::IbcHeight::default());
        assert_eq!(memo, "gm");
    }

    #[test]
    fn ibc_trace_wins_over_memo_timeout() {
        let payload = with_trace(
            payload(Chain::Osmosis, Some("channel-0:channel-0:1700000000000000000:gm")),
            "100_1800000000000000000",
        );
        let (height, timestamp, _) = ibc_timeouts(&built(&payload));
        assert_eq!(timestamp, 1_800_000_000_000_000_000);
        assert_eq!(height.revision_number, 1);
        assert_eq!(height.revision_height, 1_100);
    }

    #[test]
    fn ibc_without_any_timeout_is_rejected() {
        for memo in ["channel-0:channel-141:0:hello", "channel-0:channel-141:later:hello"] {
            let payload = payload(Chain::GaiaChain, Some(memo));
            let err = helper().build_input(&payload, &vault()).unwrap_err();
            assert!(matches!(err, SigningError::InvalidPayload(ref m) if m.contains("timeout")), "{memo}");
        }
    }

    #[test]
    fn ibc_non_numeric_memo_timeout_uses_trace() {
        let payload = with_trace(
            payload(Chain::GaiaChain, Some("channel-0:channel-141:later:hello")),
            "5_1700000600000000000",
        );
        let (height, timestamp, memo) = ibc_timeouts(&built(&payload));
        assert_eq!(timestamp, 1_700_000_600_000_000_000);
        assert_eq!(height.revision_height, 1_005);
        assert_eq!(memo, "hello");
    }

    #[test]
    fn ibc_nested_memo_is_last_part() {
        let payload = with_trace(
            payload(Chain::GaiaChain, Some("channel-0:channel-141:0:swap:osmo1pool:final")),
            "5_1700000600000000000",
        );
        let (_, _, memo) = ibc_timeouts(&built(&payload));
        assert_eq!(memo, "final");
    }

    #[test]
    fn malformed_latest_block_is_rejected() {
        let payload = with_trace(
            payload(Chain::GaiaChain, Some("channel-0:channel-141:0:hello")),
            "not-a-block",
        );
        assert!(matches!(
            helper().build_input(&payload, &vault()),
            Err(SigningError::InvalidPayload(_))
        ));
    }

    #[test]
    fn ibc_denom_is_sent_as_is() {
        let mut payload = payload(Chain::Osmosis, None);
        payload.coin.is_native_token = false;
        payload.coin.contract_address = "ibc/27394FB092D2ECCD56123C74F36E4C1F926001CEADA9CA97EA622B25F41E5EB2".into();
        let tx = built(&payload);
        let CosmosMsg::Send { amount, .. } = &tx.messages[0] else {
            panic!("expected bank send");
        };
        assert_eq!(amount[0].denom, payload.coin.contract_address);
        assert_eq!(tx.fee.gas_limit, 300_000);
        assert_eq!(tx.chain_id, "osmosis-1");
    }

    #[test]
    fn terra_cw20_executes_contract() {
        let mut payload = payload(Chain::Terra, None);
        payload.coin.is_native_token = false;
        payload.coin.contract_address = "terra1nsuqsk6kh58ulczatwev87ttq2z6r3pusulg9r24mfj2fvtzd4uq3exn26".into();
        let tx = built(&payload);
        let CosmosMsg::ExecuteContract { contract, msg, .. } = &tx.messages[0] else {
            panic!("expected execute contract");
        };
        assert_eq!(contract, &payload.coin.contract_address);
        let body = String::from_utf8(msg.clone()).unwrap();
        assert!(body.contains("\"amount\": \"1500000\""));
        assert!(body.contains(&payload.to_address));
    }

    #[test]
    fn terra_classic_stable_denom_pays_two_fee_coins() {
        let mut payload = payload(Chain::TerraClassic, None);
        payload.coin.is_native_token = false;
        payload.coin.contract_address = "uusd".into();
        let tx = built(&payload);
        assert_eq!(tx.fee.gas_limit, 1_000_000);
        assert_eq!(tx.fee.amount.len(), 2);
        let CosmosMsg::Send { amount, .. } = &tx.messages[0] else {
            panic!("expected bank send");
        };
        assert_eq!(amount[0].denom, "uusd");
    }

    #[test]
    fn gas_override_applies() {
        let mut config = SigningConfig::default();
        config.cosmos_gas_limits.insert(Chain::Kujira, 450_000);
        let payload = payload(Chain::Kujira, None);
        let SigningInput::Cosmos(tx) = CosmosHelper::new(&config).build_input(&payload, &vault()).unwrap() else {
            panic!("expected cosmos input");
        };
        assert_eq!(tx.fee.gas_limit, 450_000);
    }

    #[test]
    fn wrong_key_fails_verification() {
        let payload = payload(Chain::Noble, None);
        let hashes = helper().pre_image_hashes(&payload, &vault()).unwrap();
        let other = k256::ecdsa::SigningKey::from_slice(&[0x66; 32]).unwrap();
        let err = helper().sign(&payload, &vault(), &sign_ecdsa(&other, &hashes)).unwrap_err();
        assert!(matches!(err, SigningError::SignatureVerificationFailed(ref h) if *h == hashes[0]));
    }
}
