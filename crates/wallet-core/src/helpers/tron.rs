use chain_tron::address::parse_address;
use chain_tron::{BlockHeader, TronContract, TronTransaction};
use crypto_utils::bytes::decode_hex;
use tracing::debug;

use super::{ChainSigningHelper, SigningInput};
use crate::error::SigningError;
use crate::hd_derivation::derive_chain_public_key;
use crate::payload::{mismatch, BlockChainSpecific, KeysignPayload, Vault};

/// TRX transfers and TRC20 `transfer` calls.
#[derive(Debug, Clone, Copy, Default)]
pub struct TronHelper;

impl ChainSigningHelper for TronHelper {
    fn build_input(
        &self,
        payload: &KeysignPayload,
        vault: &Vault,
    ) -> Result<SigningInput, SigningError> {
        let coin = &payload.coin;
        let BlockChainSpecific::Tron {
            timestamp,
            expiration,
            block_header_timestamp,
            block_header_number,
            block_header_version,
            block_header_tx_trie_root,
            block_header_parent_hash,
            block_header_witness_address,
            gas_fee_estimation,
        } = &payload.block_chain_specific
        else {
            return Err(mismatch(coin.chain, &payload.block_chain_specific));
        };

        let header = BlockHeader {
            timestamp: *block_header_timestamp,
            number: *block_header_number,
            version: *block_header_version,
            tx_trie_root: decode_hex(block_header_tx_trie_root)?,
            parent_hash: decode_hex(block_header_parent_hash)?,
            witness_address: decode_hex(block_header_witness_address)?,
        };
        let owner = parse_address(&coin.address)?;
        let to = parse_address(&payload.to_address)?;

        let (contract, fee_limit) = if coin.is_native_token {
            let amount = i64::try_from(payload.to_amount_u64()?).map_err(|_| {
                SigningError::InvalidPayload(format!("amount {} exceeds int64", payload.to_amount))
            })?;
            (TronContract::Transfer { owner, to, amount }, 0)
        } else {
            let contract = parse_address(&coin.contract_address)?;
            let amount = payload.to_amount.to_be_bytes::<32>();
            let fee_limit = i64::try_from(*gas_fee_estimation).map_err(|_| {
                SigningError::InvalidPayload(format!("fee limit {gas_fee_estimation} exceeds int64"))
            })?;
            (TronContract::trc20_transfer(owner, contract, &to, &amount)?, fee_limit)
        };

        let tx = TronTransaction::new(
            &header,
            contract,
            *timestamp,
            *expiration,
            fee_limit,
            payload.memo().unwrap_or_default(),
        );
        debug!(
            native = coin.is_native_token,
            block = header.number,
            fee_limit,
            "built tron transaction"
        );
        Ok(SigningInput::Tron {
            tx,
            public_key: decode_hex(&derive_chain_public_key(vault, coin.chain)?)?,
        })
    }
}
