use chain_dot::address::parse_polkadot_address;
use chain_dot::{ChainState, DotTransaction, ExtrinsicConfig};
use crypto_utils::bytes::decode_hex_array;
use tracing::debug;

use super::{ChainSigningHelper, SigningInput};
use crate::config::SigningConfig;
use crate::error::SigningError;
use crate::payload::{mismatch, BlockChainSpecific, KeysignPayload, Vault};

/// DOT `transfer_allow_death` extrinsics signed by the vault EdDSA key.
#[derive(Debug, Clone)]
pub struct PolkadotHelper {
    extrinsic: ExtrinsicConfig,
}

impl PolkadotHelper {
    pub fn new(config: &SigningConfig) -> Self {
        Self {
            extrinsic: config.polkadot.clone(),
        }
    }
}

impl ChainSigningHelper for PolkadotHelper {
    fn build_input(
        &self,
        payload: &KeysignPayload,
        vault: &Vault,
    ) -> Result<SigningInput, SigningError> {
        let state = match &payload.block_chain_specific {
            BlockChainSpecific::Polkadot {
                genesis_hash,
                recent_block_hash,
                nonce,
                spec_version,
                transaction_version,
                current_block_number,
            } => ChainState {
                nonce: *nonce,
                spec_version: *spec_version,
                transaction_version: *transaction_version,
                genesis_hash: decode_hex_array(genesis_hash)?,
                block_hash: decode_hex_array(recent_block_hash)?,
                current_block: *current_block_number,
            },
            other => return Err(mismatch(payload.coin.chain, other)),
        };

        let dest = parse_polkadot_address(&payload.to_address)?;
        let nonce = state.nonce;
        let tx = DotTransaction::transfer(&self.extrinsic, dest, payload.to_amount_u128()?, state);
        debug!(nonce, spec_version = tx.spec_version, "built polkadot extrinsic");
        Ok(SigningInput::Polkadot {
            tx,
            public_key: decode_hex_array(&vault.pub_key_eddsa)?,
        })
    }
}
