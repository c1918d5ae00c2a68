//! Entry point for a keysign: which digests to sign, and the compiled
//! transaction once the signatures are back.
//!
//! One payload can need more than one transaction. An ERC20 approve is
//! signed ahead of the swap it unlocks, so the swap's nonce moves up by one
//! and both digests go into the same ceremony.

use chain_evm::transaction::verify_recoverable;
use chain_evm::RecoverableSignature;
use crypto_utils::bytes::decode_hex;
use crypto_utils::hash::keccak256;
use tracing::debug;

use crate::config::SigningConfig;
use crate::error::{at_hash, SigningError};
use crate::hd_derivation::derive_chain_public_key;
use crate::helpers::evm::memo_data;
use crate::helpers::{EvmHelper, HelperRegistry, SigningInput, SolanaHelper};
use crate::payload::{CustomMessagePayload, KeysignPayload, SignedTransactionResult, SwapPayload, Vault};
use crate::signature::{lookup, SignatureMap};
use crate::thorchain_swaps::ThorChainSwaps;
use crate::types::{Chain, ChainFamily};

#[derive(Clone)]
pub struct SigningHelper {
    registry: HelperRegistry,
    evm: EvmHelper,
    solana: SolanaHelper,
    swaps: ThorChainSwaps,
}

impl SigningHelper {
    pub fn new(config: &SigningConfig) -> Result<Self, SigningError> {
        Ok(Self::with_registry(HelperRegistry::new(config)?, config))
    }

    /// Dispatches plain transfers through `registry` instead of the
    /// built-in helpers.
    pub fn with_registry(registry: HelperRegistry, config: &SigningConfig) -> Self {
        Self {
            registry,
            evm: EvmHelper::new(config),
            solana: SolanaHelper::new(config),
            swaps: ThorChainSwaps::new(config),
        }
    }

    /// Every digest the ceremony must sign for `payload`, sorted.
    pub fn get_keysign_messages(
        &self,
        payload: &KeysignPayload,
        vault: &Vault,
    ) -> Result<Vec<String>, SigningError> {
        let mut hashes = Vec::new();
        if let Some(approve) = self.approve_input(payload, vault)? {
            hashes.extend(approve.pre_image_hashes()?);
        }
        hashes.extend(self.main_input(payload, vault)?.pre_image_hashes()?);
        hashes.sort();
        debug!(chain = %payload.coin.chain, count = hashes.len(), "keysign messages");
        Ok(hashes)
    }

    /// The main transaction of `payload`: the swap if there is one, else
    /// the transfer.
    pub fn get_signed_transaction(
        &self,
        payload: &KeysignPayload,
        vault: &Vault,
        signatures: &SignatureMap,
    ) -> Result<SignedTransactionResult, SigningError> {
        self.main_input(payload, vault)?.sign(signatures)
    }

    /// The ERC20 approve that precedes the main transaction.
    pub fn signed_approve_transaction(
        &self,
        payload: &KeysignPayload,
        vault: &Vault,
        signatures: &SignatureMap,
    ) -> Result<SignedTransactionResult, SigningError> {
        self.approve_input(payload, vault)?
            .ok_or_else(|| SigningError::InvalidPayload("payload has no approve".into()))?
            .sign(signatures)
    }

    /// The main transaction with zeroed signatures, for fee simulation.
    pub fn zero_signed_transaction(
        &self,
        payload: &KeysignPayload,
        vault: &Vault,
    ) -> Result<String, SigningError> {
        self.main_input(payload, vault)?.zero_signed()
    }

    fn approve_input(
        &self,
        payload: &KeysignPayload,
        vault: &Vault,
    ) -> Result<Option<SigningInput>, SigningError> {
        payload
            .approve_payload
            .as_ref()
            .map(|approve| self.evm.build_approve(payload, vault, approve))
            .transpose()
    }

    fn main_input(&self, payload: &KeysignPayload, vault: &Vault) -> Result<SigningInput, SigningError> {
        let nonce_increment = u64::from(payload.approve_payload.is_some());
        match &payload.swap_payload {
            Some(SwapPayload::ThorChain(swap)) => {
                debug!(from = %swap.from_coin.chain, "dispatching thorchain swap");
                self.swaps.build_input(swap, payload, vault, nonce_increment)
            }
            Some(SwapPayload::OneInch(swap)) => {
                debug!(from = %swap.from_coin.chain, "dispatching 1inch swap");
                if payload.coin.chain == Chain::Solana {
                    self.solana.build_swap(payload, vault, swap)
                } else {
                    self.evm.build_one_inch_swap(payload, vault, swap, nonce_increment)
                }
            }
            Some(SwapPayload::Kyber(swap)) => {
                debug!(from = %swap.from_coin.chain, "dispatching kyber swap");
                if payload.coin.chain.family() != ChainFamily::Evm {
                    return Err(SigningError::UnsupportedChain(format!(
                        "kyber swaps from {}",
                        payload.coin.chain
                    )));
                }
                self.evm.build_one_inch_swap(payload, vault, swap, nonce_increment)
            }
            Some(SwapPayload::MayaChain(swap))
                if swap.from_coin.chain.family() == ChainFamily::Evm && !swap.from_coin.is_native_token =>
            {
                Err(SigningError::UnsupportedChain(format!(
                    "mayachain swaps of {} tokens",
                    swap.from_coin.chain
                )))
            }
            _ if nonce_increment > 0 && payload.coin.chain.family() == ChainFamily::Evm => {
                self.evm.build_transfer(payload, vault, nonce_increment)
            }
            _ => {
                debug!(chain = %payload.coin.chain, "dispatching to registry");
                self.registry.get(payload.coin.chain)?.build_input(payload, vault)
            }
        }
    }
}

/// Hex keccak-256 of a custom message. `0x` hex is signed as bytes, any
/// other text as UTF-8.
pub fn custom_message_hash(message: &CustomMessagePayload) -> Result<String, SigningError> {
    Ok(hex::encode(keccak256(&memo_data(&message.message)?)))
}

/// `r || s || v` hex of the custom message signature, checked against the
/// vault's Ethereum key.
pub fn sign_custom_message(
    message: &CustomMessagePayload,
    vault: &Vault,
    signatures: &SignatureMap,
) -> Result<String, SigningError> {
    let digest = keccak256(&memo_data(&message.message)?);
    let hash = hex::encode(digest);
    let signature = RecoverableSignature::from_rsv(&lookup(signatures, &hash)?.rsv_bytes()?)?;
    let public_key = decode_hex(&derive_chain_public_key(vault, Chain::Ethereum)?)?;
    let verified = verify_recoverable(&public_key, &digest, &signature).map_err(at_hash(&hash))?;
    debug!(method = %message.method, %hash, "signed custom message");
    Ok(hex::encode(verified.to_rsv()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::helpers::test_support::{chain_key, compressed, sign_ecdsa, vault};
    use crate::payload::{
        BlockChainSpecific, Coin, ERC20ApprovePayload, OneInchQuote, OneInchSwapPayload,
        OneInchTransaction,
    };
    use alloy_primitives::U256;

    const USDC: &str = "0xa0b86991c6218b36c1d19d4a2e9eb0ce3606eb48";
    const SPENDER: &str = "0xd37bbe5744d730a1d98d8dc97c42f0ca46ad7146";

    fn helper() -> SigningHelper {
        SigningHelper::new(&SigningConfig::default()).unwrap()
    }

    fn eth_payload(coin: Coin) -> KeysignPayload {
        KeysignPayload {
            coin,
            to_address: "0x00000000000000000000000000000000000000aa".into(),
            to_amount: U256::from(1_000_000u64),
            block_chain_specific: BlockChainSpecific::Ethereum {
                nonce: 3,
                gas_limit: 80_000,
                max_fee_per_gas_wei: 30_000_000_000,
                priority_fee_wei: 1_000_000_000,
            },
            utxos: Vec::new(),
            memo: None,
            swap_payload: None,
            approve_payload: None,
            defi_action: Default::default(),
            vault_public_key_ecdsa: vault().pub_key_ecdsa,
            vault_local_party_id: "device-1".into(),
        }
    }

    fn eth_address() -> String {
        let public = compressed(&chain_key(Chain::Ethereum));
        chain_evm::address::pubkey_to_address(&hex::decode(public).unwrap()).unwrap()
    }

    fn usdc_with_approve() -> KeysignPayload {
        let mut payload = eth_payload(Coin::token(Chain::Ethereum, "USDC", USDC, 6, &eth_address(), ""));
        payload.approve_payload = Some(ERC20ApprovePayload {
            amount: U256::from(1_000_000u64),
            spender: SPENDER.into(),
        });
        payload
    }

    #[test]
    fn approve_and_transfer_share_one_ceremony() {
        let payload = usdc_with_approve();
        let hashes = helper().get_keysign_messages(&payload, &vault()).unwrap();
        assert_eq!(hashes.len(), 2);
        let mut sorted = hashes.clone();
        sorted.sort();
        assert_eq!(hashes, sorted);

        let signatures = sign_ecdsa(&chain_key(Chain::Ethereum), &hashes);
        let approve = helper().signed_approve_transaction(&payload, &vault(), &signatures).unwrap();
        let main = helper().get_signed_transaction(&payload, &vault(), &signatures).unwrap();
        let (approve_tx, _) = chain_evm::transaction::decode_signed(&hex::decode(&approve.raw_transaction).unwrap()).unwrap();
        let (main_tx, _) = chain_evm::transaction::decode_signed(&hex::decode(&main.raw_transaction).unwrap()).unwrap();
        assert_eq!(approve_tx.nonce, 3);
        assert_eq!(main_tx.nonce, 4);
        assert_eq!(&approve_tx.data[..4], &[0x09, 0x5e, 0xa7, 0xb3]);
    }

    #[test]
    fn approve_requires_approve_payload() {
        let payload = eth_payload(Coin::native(Chain::Ethereum, &eth_address(), ""));
        let err = helper()
            .signed_approve_transaction(&payload, &vault(), &SignatureMap::new())
            .unwrap_err();
        assert!(matches!(err, SigningError::InvalidPayload(_)));
    }

    #[test]
    fn maya_token_swap_is_unsupported() {
        let mut payload = usdc_with_approve();
        let coin = payload.coin.clone();
        payload.swap_payload = Some(SwapPayload::MayaChain(crate::payload::ThorChainSwapPayload {
            from_address: coin.address.clone(),
            from_coin: coin,
            to_coin: Coin::native(Chain::MayaChain, "maya1dest", ""),
            vault_address: SPENDER.into(),
            router_address: Some(SPENDER.into()),
            from_amount: U256::from(1u64),
            to_amount_decimal: "1".into(),
            to_amount_limit: String::new(),
            streaming_interval: String::new(),
            streaming_quantity: String::new(),
            expiration_time: 0,
            is_affiliate: false,
        }));
        assert!(matches!(
            helper().get_keysign_messages(&payload, &vault()),
            Err(SigningError::UnsupportedChain(_))
        ));
    }

    fn kyber_swap(coin: Coin) -> SwapPayload {
        SwapPayload::Kyber(OneInchSwapPayload {
            from_coin: coin.clone(),
            to_coin: coin.clone(),
            from_amount: U256::from(5u8),
            to_amount_decimal: "5".into(),
            quote: OneInchQuote {
                dst_amount: "5".into(),
                tx: OneInchTransaction {
                    from: coin.address,
                    to: SPENDER.into(),
                    data: "0xe21fd0e9".into(),
                    value: "5".into(),
                    gas_price: String::new(),
                    gas: 250_000,
                },
            },
        })
    }

    #[test]
    fn kyber_swap_calls_the_router() {
        let mut payload = eth_payload(Coin::native(Chain::Ethereum, &eth_address(), ""));
        payload.swap_payload = Some(kyber_swap(payload.coin.clone()));
        let hashes = helper().get_keysign_messages(&payload, &vault()).unwrap();
        let signatures = sign_ecdsa(&chain_key(Chain::Ethereum), &hashes);
        let signed = helper().get_signed_transaction(&payload, &vault(), &signatures).unwrap();
        let (tx, _) = chain_evm::transaction::decode_signed(&hex::decode(&signed.raw_transaction).unwrap()).unwrap();
        assert_eq!(tx.data, vec![0xe2, 0x1f, 0xd0, 0xe9]);
        assert_eq!(tx.gas_limit, 250_000);
        assert_eq!(tx.value, U256::from(5u8));
    }

    #[test]
    fn kyber_swap_outside_evm_is_unsupported() {
        let mut payload = eth_payload(Coin::native(Chain::Solana, "So1ana", ""));
        payload.swap_payload = Some(kyber_swap(payload.coin.clone()));
        assert!(matches!(
            helper().get_keysign_messages(&payload, &vault()),
            Err(SigningError::UnsupportedChain(_))
        ));
    }

    #[test]
    fn zero_signed_is_not_available_for_evm() {
        let payload = eth_payload(Coin::native(Chain::Ethereum, &eth_address(), ""));
        assert!(matches!(
            helper().zero_signed_transaction(&payload, &vault()),
            Err(SigningError::UnsupportedChain(_))
        ));
    }

    #[test]
    fn custom_message_hash_of_text_and_hex() {
        let text = CustomMessagePayload {
            method: "personal_sign".into(),
            message: "hello".into(),
        };
        assert_eq!(
            custom_message_hash(&text).unwrap(),
            "1c8aff950685c2ed4bc3174f3472287b56d9517b9c948127319a09a7a36deac8"
        );
        let bytes = CustomMessagePayload {
            method: "personal_sign".into(),
            message: format!("0x{}", hex::encode("hello")),
        };
        assert_eq!(custom_message_hash(&bytes).unwrap(), custom_message_hash(&text).unwrap());
    }

    #[test]
    fn custom_message_signature_is_rsv() {
        let message = CustomMessagePayload {
            method: "eth_sign".into(),
            message: "gm".into(),
        };
        let hash = custom_message_hash(&message).unwrap();
        let signatures = sign_ecdsa(&chain_key(Chain::Ethereum), &[hash.clone()]);
        let signed = sign_custom_message(&message, &vault(), &signatures).unwrap();
        assert_eq!(signed.len(), 130);
        assert!(matches!(&signed[128..], "00" | "01"));
        assert_eq!(&signed[..64], signatures[&hash].r);
    }

    #[test]
    fn custom_message_from_another_key_fails() {
        let message = CustomMessagePayload {
            method: "personal_sign".into(),
            message: "gm".into(),
        };
        let hash = custom_message_hash(&message).unwrap();
        let signatures = sign_ecdsa(&chain_key(Chain::Tron), &[hash.clone()]);
        let err = sign_custom_message(&message, &vault(), &signatures).unwrap_err();
        assert!(matches!(err, SigningError::SignatureVerificationFailed(ref h) if *h == hash));
    }
}
