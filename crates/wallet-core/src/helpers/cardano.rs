use chain_ada::address::parse_address;
use chain_ada::transaction::plan_transfer;
use chain_ada::Utxo;
use crypto_utils::bytes::decode_hex_array;
use tracing::{debug, warn};

use super::{ChainSigningHelper, SigningInput};
use crate::error::SigningError;
use crate::payload::{mismatch, BlockChainSpecific, KeysignPayload, Vault};

/// ADA transfers from the UTXOs on the payload, with change returned to the
/// coin address. Signs with the vault EdDSA key.
#[derive(Debug, Clone, Copy, Default)]
pub struct CardanoHelper;

impl ChainSigningHelper for CardanoHelper {
    fn build_input(
        &self,
        payload: &KeysignPayload,
        vault: &Vault,
    ) -> Result<SigningInput, SigningError> {
        let coin = &payload.coin;
        let (byte_fee, send_max_amount, ttl) = match &payload.block_chain_specific {
            BlockChainSpecific::Cardano {
                byte_fee,
                send_max_amount,
                ttl,
            } => (*byte_fee, *send_max_amount, *ttl),
            other => return Err(mismatch(coin.chain, other)),
        };
        if send_max_amount {
            warn!("send-max is not supported for cardano, sending the exact amount");
        }

        let utxos = payload
            .utxos
            .iter()
            .map(|u| -> Result<Utxo, SigningError> {
                Ok(Utxo {
                    tx_hash: decode_hex_array(&u.hash)?,
                    index: u64::from(u.index),
                    amount: u.amount,
                })
            })
            .collect::<Result<Vec<_>, _>>()?;

        let body = plan_transfer(
            &utxos,
            parse_address(&payload.to_address)?,
            payload.to_amount_u64()?,
            parse_address(&coin.address)?,
            byte_fee,
            ttl,
        )?;
        debug!(
            inputs = body.inputs.len(),
            outputs = body.outputs.len(),
            fee = body.fee,
            "planned cardano transaction"
        );
        Ok(SigningInput::Cardano {
            body,
            public_key: decode_hex_array(&vault.pub_key_eddsa)?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::helpers::test_support::{ed25519_key, sign_eddsa, vault};
    use crate::payload::{Coin, UtxoInfo};
    use crate::types::Chain;
    use alloy_primitives::U256;
    use chain_ada::address::enterprise_address;
    use chain_ada::transaction::decode_signed;

    fn payload(amount: u64, send_max_amount: bool) -> KeysignPayload {
        let owner = ed25519_key().verifying_key().to_bytes();
        KeysignPayload {
            coin: Coin::native(Chain::Cardano, &enterprise_address(&owner).unwrap(), &hex::encode(owner)),
            to_address: enterprise_address(&[0x3c; 32]).unwrap(),
            to_amount: U256::from(amount),
            block_chain_specific: BlockChainSpecific::Cardano {
                byte_fee: 180_000,
                send_max_amount,
                ttl: 150_000_000,
            },
            utxos: vec![
                UtxoInfo {
                    hash: hex::encode([0xa1; 32]),
                    amount: 5_000_000,
                    index: 0,
                },
                UtxoInfo {
                    hash: hex::encode([0xa2; 32]),
                    amount: 3_000_000,
                    index: 1,
                },
            ],
            memo: None,
            swap_payload: None,
            approve_payload: None,
            defi_action: Default::default(),
            vault_public_key_ecdsa: String::new(),
            vault_local_party_id: "device-1".into(),
        }
    }

    #[test]
    fn transfer_round_trip() {
        let payload = payload(6_000_000, false);
        let hashes = CardanoHelper.pre_image_hashes(&payload, &vault()).unwrap();
        assert_eq!(hashes.len(), 1);

        let signed = CardanoHelper.sign(&payload, &vault(), &sign_eddsa(&hashes)).unwrap();
        assert_eq!(signed.transaction_hash, hashes[0]);

        let decoded = decode_signed(&hex::decode(&signed.raw_transaction).unwrap()).unwrap();
        assert_eq!(decoded.body.inputs.len(), 2);
        assert_eq!(decoded.body.fee, 180_000);
        assert_eq!(decoded.body.ttl, 150_000_000);
        assert_eq!(decoded.body.outputs[0].amount, 6_000_000);
        assert_eq!(decoded.body.outputs[1].amount, 8_000_000 - 6_000_000 - 180_000);
        assert_eq!(decoded.witnesses[0].0, ed25519_key().verifying_key().to_bytes().to_vec());
    }

    #[test]
    fn send_max_is_ignored() {
        let exact = CardanoHelper.pre_image_hashes(&payload(1_000_000, false), &vault()).unwrap();
        let max = CardanoHelper.pre_image_hashes(&payload(1_000_000, true), &vault()).unwrap();
        assert_eq!(exact, max);
    }

    #[test]
    fn insufficient_funds_is_a_compile_error() {
        let err = CardanoHelper
            .build_input(&payload(9_000_000, false), &vault())
            .unwrap_err();
        assert!(matches!(err, SigningError::Compile(ref m) if m.starts_with("ADA: ")));
    }
}
