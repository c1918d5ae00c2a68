use chain_utxo::address::address_to_script;
use chain_utxo::transaction::build_transaction;
use chain_utxo::{Utxo, UtxoSigningInput};
use crypto_utils::bytes::decode_hex;
use tracing::debug;

use super::{ChainSigningHelper, SigningInput};
use crate::error::SigningError;
use crate::payload::{mismatch, BlockChainSpecific, KeysignPayload, Vault};

/// Bitcoin, Bitcoin Cash, Litecoin, Dogecoin, Dash and transparent Zcash.
/// Signs with the coin's own public key.
#[derive(Debug, Clone, Copy, Default)]
pub struct UtxoHelper;

impl ChainSigningHelper for UtxoHelper {
    fn build_input(
        &self,
        payload: &KeysignPayload,
        _vault: &Vault,
    ) -> Result<SigningInput, SigningError> {
        let coin = &payload.coin;
        let chain = coin
            .chain
            .utxo_chain()
            .ok_or_else(|| SigningError::UnsupportedChain(format!("{} is not a UTXO chain", coin.chain)))?;
        let (byte_fee, send_max_amount) = match &payload.block_chain_specific {
            BlockChainSpecific::Utxo {
                byte_fee,
                send_max_amount,
            } => (*byte_fee, *send_max_amount),
            other => return Err(mismatch(coin.chain, other)),
        };

        let lock_script = address_to_script(chain, &coin.address)?.into_bytes();
        let utxos = payload
            .utxos
            .iter()
            .map(|u| Utxo {
                txid: u.hash.clone(),
                vout: u.index,
                amount_sat: u.amount,
                script_pubkey: lock_script.clone(),
            })
            .collect();

        let input = UtxoSigningInput {
            chain,
            utxos,
            to_address: payload.to_address.clone(),
            amount_sat: payload.to_amount_u64()?,
            change_address: coin.address.clone(),
            byte_fee,
            use_max_amount: send_max_amount,
            memo: payload.memo().map(str::to_string),
        };
        let tx = build_transaction(&input)?;
        debug!(
            %chain,
            inputs = tx.tx.input.len(),
            fee = tx.fee_sat,
            change = tx.change_sat,
            "planned utxo transaction"
        );

        Ok(SigningInput::Utxo {
            tx,
            public_key: decode_hex(&coin.hex_public_key)?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::helpers::test_support::{coin_key, compressed, sign_ecdsa, vault};
    use crate::payload::{Coin, UtxoInfo};
    use crate::types::Chain;
    use alloy_primitives::U256;
    use chain_utxo::UtxoChain;

    fn payload(chain: Chain, amount: u64, utxos: &[u64]) -> KeysignPayload {
        let key = coin_key();
        let public = compressed(&key);
        let utxo_chain = chain.utxo_chain().unwrap();
        let address =
            chain_utxo::address::pubkey_to_address(utxo_chain, &hex::decode(&public).unwrap()).unwrap();
        let other = other_address(utxo_chain);
        KeysignPayload {
            coin: Coin::native(chain, &address, &public),
            to_address: other,
            to_amount: U256::from(amount),
            block_chain_specific: BlockChainSpecific::Utxo {
                byte_fee: 10,
                send_max_amount: false,
            },
            utxos: utxos
                .iter()
                .enumerate()
                .map(|(i, amount)| UtxoInfo {
                    hash: format!("{:064x}", i + 1),
                    amount: *amount,
                    index: i as u32,
                })
                .collect(),
            memo: None,
            swap_payload: None,
            approve_payload: None,
            defi_action: Default::default(),
            vault_public_key_ecdsa: String::new(),
            vault_local_party_id: "device-1".into(),
        }
    }

    fn other_address(chain: UtxoChain) -> String {
        let key = k256::ecdsa::SigningKey::from_slice(&[0x55; 32]).unwrap();
        chain_utxo::address::pubkey_to_address(chain, &key.verifying_key().to_sec1_bytes()).unwrap()
    }

    #[test]
    fn one_sorted_hash_per_selected_input() {
        let payload = payload(Chain::Bitcoin, 6_000, &[5_000, 3_000]);
        let hashes = UtxoHelper.pre_image_hashes(&payload, &vault()).unwrap();
        assert_eq!(hashes.len(), 2);
        let mut sorted = hashes.clone();
        sorted.sort();
        assert_eq!(hashes, sorted);
        assert!(hashes.iter().all(|h| h.len() == 64));
    }

    #[test]
    fn signs_and_decodes_back() {
        for chain in [Chain::Bitcoin, Chain::Litecoin, Chain::Dogecoin, Chain::BitcoinCash, Chain::Dash, Chain::Zcash] {
            let mut payload = payload(chain, 4_000, &[5_000_000, 3_000]);
            if chain == Chain::Dogecoin {
                payload.utxos[0].amount = 500_000_000;
                payload.to_amount = U256::from(200_000_000u64);
            }
            let hashes = UtxoHelper.pre_image_hashes(&payload, &vault()).unwrap();
            let signatures = sign_ecdsa(&coin_key(), &hashes);
            let signed = UtxoHelper.sign(&payload, &vault(), &signatures).unwrap();

            let raw = hex::decode(&signed.raw_transaction).unwrap();
            let payments = chain_utxo::transaction::decode_payments(chain.utxo_chain().unwrap(), &raw).unwrap();
            let amount = payload.to_amount_u64().unwrap();
            assert_eq!(payments[0], (payload.to_address.clone(), amount), "{chain}");
            assert_eq!(signed.transaction_hash.len(), 64);
        }
    }

    #[test]
    fn zcash_send_is_a_sapling_v4_transaction() {
        let payload = payload(Chain::Zcash, 40_000, &[5_000_000]);
        let hashes = UtxoHelper.pre_image_hashes(&payload, &vault()).unwrap();
        let signed = UtxoHelper.sign(&payload, &vault(), &sign_ecdsa(&coin_key(), &hashes)).unwrap();
        assert!(signed.raw_transaction.starts_with("0400008085202f89"));
        assert!(payload.to_address.starts_with("t1"));
        let raw = hex::decode(&signed.raw_transaction).unwrap();
        assert_eq!(signed.transaction_hash, chain_utxo::zcash::txid(&raw));
    }

    #[test]
    fn missing_signature_names_the_hash() {
        let payload = payload(Chain::Bitcoin, 6_000, &[5_000, 3_000]);
        let hashes = UtxoHelper.pre_image_hashes(&payload, &vault()).unwrap();
        let mut signatures = sign_ecdsa(&coin_key(), &hashes);
        signatures.remove(&hashes[1]);
        let err = UtxoHelper.sign(&payload, &vault(), &signatures).unwrap_err();
        assert!(matches!(err, SigningError::MissingSignature(ref h) if *h == hashes[1]));
    }

    #[test]
    fn wrong_key_fails_verification() {
        let payload = payload(Chain::Litecoin, 4_000, &[5_000_000]);
        let hashes = UtxoHelper.pre_image_hashes(&payload, &vault()).unwrap();
        let wrong = k256::ecdsa::SigningKey::from_slice(&[0x66; 32]).unwrap();
        let signatures = sign_ecdsa(&wrong, &hashes);
        let err = UtxoHelper.sign(&payload, &vault(), &signatures).unwrap_err();
        assert!(matches!(err, SigningError::SignatureVerificationFailed(ref h) if *h == hashes[0]));
    }

    #[test]
    fn rejects_foreign_chain_data() {
        let mut payload = payload(Chain::Bitcoin, 4_000, &[5_000_000]);
        payload.block_chain_specific = BlockChainSpecific::Cardano {
            byte_fee: 1,
            send_max_amount: false,
            ttl: 1,
        };
        assert!(matches!(
            UtxoHelper.build_input(&payload, &vault()),
            Err(SigningError::InvalidPayload(_))
        ));
    }
}
