use chain_xrp::address::parse_address;
use chain_xrp::{Payment, PaymentMemo};
use crypto_utils::bytes::decode_hex;
use tracing::debug;

use super::{ChainSigningHelper, SigningInput};
use crate::error::SigningError;
use crate::payload::{mismatch, BlockChainSpecific, KeysignPayload, Vault};

/// Native XRP payments. Signs with the coin's own public key.
#[derive(Debug, Clone, Copy, Default)]
pub struct RippleHelper;

impl ChainSigningHelper for RippleHelper {
    fn build_input(
        &self,
        payload: &KeysignPayload,
        _vault: &Vault,
    ) -> Result<SigningInput, SigningError> {
        let coin = &payload.coin;
        let (sequence, fee, last_ledger_sequence) = match &payload.block_chain_specific {
            BlockChainSpecific::Ripple {
                sequence,
                gas,
                last_ledger_sequence,
            } => (*sequence, *gas, *last_ledger_sequence),
            other => return Err(mismatch(coin.chain, other)),
        };

        let payment = Payment {
            account: parse_address(&coin.address)?,
            destination: parse_address(&payload.to_address)?,
            amount: payload.to_amount_u64()?,
            fee,
            sequence,
            last_ledger_sequence,
            flags: 0,
            memo: PaymentMemo::from_memo(payload.memo()),
            signing_pub_key: decode_hex(&coin.hex_public_key)?,
        };
        debug!(sequence, fee, "built xrp payment");
        Ok(SigningInput::Ripple(payment))
    }
}
