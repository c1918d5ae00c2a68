//! Per-family signing helpers.
//!
//! A helper turns a [`KeysignPayload`] into a [`SigningInput`]; the input
//! knows which digests the ceremony must sign and how to compile the
//! transaction once the signatures come back.

pub mod cardano;
pub mod cosmos;
pub mod evm;
pub mod polkadot;
pub mod ripple;
pub mod solana;
pub mod thorchain;
pub mod tron;
pub mod utxo;

use std::collections::HashMap;
use std::sync::Arc;

use chain_ada::TransactionBody;
use chain_cosmos::CosmosTransaction;
use chain_dot::DotTransaction;
use chain_evm::{EvmTransaction, RecoverableSignature};
use chain_sol::{RawTransaction, SolTransaction};
use chain_tron::TronTransaction;
use chain_utxo::{UnsignedUtxoTx, UtxoError};
use chain_xrp::Payment;
use tracing::debug;

use crate::config::SigningConfig;
use crate::error::{at_hash, SigningError};
use crate::payload::{KeysignPayload, SignedTransactionResult, Vault};
use crate::signature::{lookup, SignatureMap};
use crate::types::{Chain, ChainFamily as F};

pub use cardano::CardanoHelper;
pub use cosmos::CosmosHelper;
pub use evm::EvmHelper;
pub use polkadot::PolkadotHelper;
pub use ripple::RippleHelper;
pub use solana::SolanaHelper;
pub use thorchain::ThorChainHelper;
pub use tron::TronHelper;
pub use utxo::UtxoHelper;

/// A built, not yet signed, chain transaction.
#[derive(Debug, Clone)]
pub enum SigningInput {
    Utxo {
        tx: UnsignedUtxoTx,
        public_key: Vec<u8>,
    },
    Evm {
        tx: EvmTransaction,
        public_key: Vec<u8>,
    },
    Cosmos(CosmosTransaction),
    Solana {
        tx: SolTransaction,
        fee_payer: [u8; 32],
    },
    /// Aggregator-built Solana transaction, signed in place.
    SolanaRaw {
        tx: RawTransaction,
        signer: [u8; 32],
    },
    Polkadot {
        tx: DotTransaction,
        public_key: [u8; 32],
    },
    Tron {
        tx: TronTransaction,
        public_key: Vec<u8>,
    },
    Ripple(Payment),
    Cardano {
        body: TransactionBody,
        public_key: [u8; 32],
    },
}

impl SigningInput {
    /// Lowercase hex digests to be signed, sorted.
    pub fn pre_image_hashes(&self) -> Result<Vec<String>, SigningError> {
        let mut hashes = match self {
            SigningInput::Utxo { tx, .. } => tx.sighashes()?.iter().map(hex::encode).collect(),
            SigningInput::Evm { tx, .. } => vec![hex::encode(tx.signing_hash())],
            SigningInput::Cosmos(tx) => vec![hex::encode(tx.signing_hash())],
            SigningInput::Solana { tx, .. } => vec![hex::encode(tx.serialize_message()?)],
            SigningInput::SolanaRaw { tx, .. } => vec![hex::encode(&tx.message)],
            SigningInput::Polkadot { tx, .. } => vec![hex::encode(tx.signing_payload())],
            SigningInput::Tron { tx, .. } => vec![hex::encode(tx.signing_hash())],
            SigningInput::Ripple(payment) => vec![hex::encode(payment.signing_hash()?)],
            SigningInput::Cardano { body, .. } => vec![hex::encode(body.hash())],
        };
        hashes.sort();
        Ok(hashes)
    }

    /// Transaction carrying all-zero signatures, for fee simulation: base64
    /// wire bytes on Solana, hex extrinsic on Polkadot.
    pub fn zero_signed(&self) -> Result<String, SigningError> {
        match self {
            SigningInput::Solana { tx, .. } => Ok(tx.zero_signed()?),
            SigningInput::Polkadot { tx, .. } => Ok(hex::encode(tx.zero_signed())),
            _ => Err(SigningError::UnsupportedChain(
                "zero-signed transactions exist for Solana and Polkadot only".into(),
            )),
        }
    }

    /// Looks up, verifies and attaches every required signature.
    pub fn sign(&self, signatures: &SignatureMap) -> Result<SignedTransactionResult, SigningError> {
        let result = match self {
            SigningInput::Utxo { tx, public_key } => {
                let hashes: Vec<String> = tx.sighashes()?.iter().map(hex::encode).collect();
                let ders = hashes
                    .iter()
                    .map(|hash| lookup(signatures, hash)?.der_bytes())
                    .collect::<Result<Vec<_>, _>>()?;
                let signed = tx.compile(public_key, &ders).map_err(|e| match e {
                    UtxoError::SignatureVerificationFailed(index) => {
                        let hash = hashes.get(index).cloned().unwrap_or_default();
                        tracing::warn!(%hash, index, "utxo signature verification failed");
                        SigningError::SignatureVerificationFailed(hash)
                    }
                    other => other.into(),
                })?;
                SignedTransactionResult {
                    raw_transaction: hex::encode(signed.raw),
                    transaction_hash: signed.txid,
                }
            }
            SigningInput::Evm { tx, public_key } => {
                let hash = hex::encode(tx.signing_hash());
                let sig = RecoverableSignature::from_rsv(&lookup(signatures, &hash)?.rsv_bytes()?)?;
                let signed = tx.compile(public_key, &sig).map_err(at_hash(&hash))?;
                SignedTransactionResult {
                    raw_transaction: hex::encode(signed.raw),
                    transaction_hash: signed.tx_hash,
                }
            }
            SigningInput::Cosmos(tx) => {
                let hash = hex::encode(tx.signing_hash());
                let rs = lookup(signatures, &hash)?.rs_bytes()?;
                let signed = tx.compile(&rs).map_err(at_hash(&hash))?;
                SignedTransactionResult {
                    raw_transaction: signed.raw,
                    transaction_hash: signed.tx_hash,
                }
            }
            SigningInput::Solana { tx, fee_payer } => {
                let hash = hex::encode(tx.serialize_message()?);
                let rs = lookup(signatures, &hash)?.rs_bytes()?;
                let signed = tx.compile(fee_payer, &rs).map_err(at_hash(&hash))?;
                SignedTransactionResult {
                    raw_transaction: signed.raw,
                    transaction_hash: signed.tx_hash,
                }
            }
            SigningInput::SolanaRaw { tx, signer } => {
                let hash = hex::encode(&tx.message);
                let rs = lookup(signatures, &hash)?.rs_bytes()?;
                let mut tx = tx.clone();
                tx.apply_signature(signer, &rs).map_err(at_hash(&hash))?;
                let signed = tx.to_signed();
                SignedTransactionResult {
                    raw_transaction: signed.raw,
                    transaction_hash: signed.tx_hash,
                }
            }
            SigningInput::Polkadot { tx, public_key } => {
                let hash = hex::encode(tx.signing_payload());
                let rs = lookup(signatures, &hash)?.rs_bytes()?;
                let signed = tx.compile(public_key, &rs).map_err(at_hash(&hash))?;
                SignedTransactionResult {
                    raw_transaction: signed.raw,
                    transaction_hash: signed.tx_hash,
                }
            }
            SigningInput::Tron { tx, public_key } => {
                let hash = hex::encode(tx.signing_hash());
                let rs = lookup(signatures, &hash)?.rs_bytes()?;
                let signed = tx.compile(public_key, &rs).map_err(at_hash(&hash))?;
                SignedTransactionResult {
                    raw_transaction: signed.raw,
                    transaction_hash: signed.tx_id,
                }
            }
            SigningInput::Ripple(payment) => {
                let hash = hex::encode(payment.signing_hash()?);
                let der = lookup(signatures, &hash)?.der_bytes()?;
                let signed = payment.compile(&der).map_err(at_hash(&hash))?;
                SignedTransactionResult {
                    raw_transaction: signed.raw,
                    transaction_hash: String::new(),
                }
            }
            SigningInput::Cardano { body, public_key } => {
                let hash = hex::encode(body.hash());
                let rs = lookup(signatures, &hash)?.rs_bytes()?;
                let signed = body.compile(public_key, &rs).map_err(at_hash(&hash))?;
                SignedTransactionResult {
                    raw_transaction: signed.raw,
                    transaction_hash: signed.tx_hash,
                }
            }
        };
        debug!(hash = %result.transaction_hash, "signed transaction");
        Ok(result)
    }
}

/// Builds signing inputs for one chain family.
pub trait ChainSigningHelper: Send + Sync {
    fn build_input(&self, payload: &KeysignPayload, vault: &Vault)
        -> Result<SigningInput, SigningError>;

    fn pre_image_hashes(
        &self,
        payload: &KeysignPayload,
        vault: &Vault,
    ) -> Result<Vec<String>, SigningError> {
        self.build_input(payload, vault)?.pre_image_hashes()
    }

    fn sign(
        &self,
        payload: &KeysignPayload,
        vault: &Vault,
        signatures: &SignatureMap,
    ) -> Result<SignedTransactionResult, SigningError> {
        self.build_input(payload, vault)?.sign(signatures)
    }
}

/// Chain to helper table. Immutable once built.
#[derive(Clone)]
pub struct HelperRegistry {
    helpers: HashMap<Chain, Arc<dyn ChainSigningHelper>>,
}

impl HelperRegistry {
    /// Registers the built-in helper of every supported chain.
    pub fn new(config: &SigningConfig) -> Result<Self, SigningError> {
        let utxo: Arc<dyn ChainSigningHelper> = Arc::new(UtxoHelper);
        let evm: Arc<dyn ChainSigningHelper> = Arc::new(EvmHelper::new(config));
        let cosmos: Arc<dyn ChainSigningHelper> = Arc::new(CosmosHelper::new(config));
        let thorchain: Arc<dyn ChainSigningHelper> = Arc::new(ThorChainHelper::new(config));

        let mut helpers = HashMap::new();
        for chain in Chain::ALL {
            let helper: Arc<dyn ChainSigningHelper> = match chain.family() {
                F::Utxo => utxo.clone(),
                F::Evm => evm.clone(),
                F::Cosmos | F::Terra => cosmos.clone(),
                F::ThorChain | F::MayaChain => thorchain.clone(),
                F::Solana => Arc::new(SolanaHelper::new(config)),
                F::Polkadot => Arc::new(PolkadotHelper::new(config)),
                F::Tron => Arc::new(TronHelper),
                F::Ripple => Arc::new(RippleHelper),
                F::Cardano => Arc::new(CardanoHelper),
            };
            helpers.insert(chain, helper);
        }
        Self::from_helpers(helpers)
    }

    /// Uses the given table; every chain must have a helper.
    pub fn from_helpers(
        helpers: HashMap<Chain, Arc<dyn ChainSigningHelper>>,
    ) -> Result<Self, SigningError> {
        let missing: Vec<String> = Chain::ALL
            .iter()
            .filter(|chain| !helpers.contains_key(chain))
            .map(ToString::to_string)
            .collect();
        if !missing.is_empty() {
            return Err(SigningError::UnsupportedChain(format!(
                "no helper registered for {}",
                missing.join(", ")
            )));
        }
        Ok(Self { helpers })
    }

    pub fn get(&self, chain: Chain) -> Result<Arc<dyn ChainSigningHelper>, SigningError> {
        self.helpers
            .get(&chain)
            .cloned()
            .ok_or_else(|| SigningError::UnsupportedChain(chain.to_string()))
    }
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn registry_covers_every_chain() {
        let registry = HelperRegistry::new(&SigningConfig::default()).unwrap();
        for chain in Chain::ALL {
            assert!(registry.get(chain).is_ok(), "{chain}");
        }
    }

    #[test]
    fn registry_rejects_missing_helper() {
        let mut helpers: HashMap<Chain, Arc<dyn ChainSigningHelper>> = HashMap::new();
        helpers.insert(Chain::Ripple, Arc::new(RippleHelper));
        let err = HelperRegistry::from_helpers(helpers).err().unwrap();
        assert!(matches!(err, SigningError::UnsupportedChain(_)));
        assert!(err.to_string().contains("Bitcoin"));
        assert!(!err.to_string().contains("Ripple,"));
    }

    #[test]
    fn registry_is_send_and_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<HelperRegistry>();
    }
}
