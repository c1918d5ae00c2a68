//! Shelley transaction bodies, witness sets and signed transactions.

use crypto_utils::hash::blake2b_256;
use ed25519_dalek::{Signature, Verifier, VerifyingKey};
use tracing::debug;

use crate::cbor::Cbor;
use crate::error::AdaError;

const BODY_INPUTS: u64 = 0;
const BODY_OUTPUTS: u64 = 1;
const BODY_FEE: u64 = 2;
const BODY_TTL: u64 = 3;
const WITNESS_VKEYS: u64 = 0;

/// An unspent output owned by the sender.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Utxo {
    pub tx_hash: [u8; 32],
    pub index: u64,
    /// Lovelace.
    pub amount: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct TxIn {
    pub tx_hash: [u8; 32],
    pub index: u64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TxOut {
    /// Raw address bytes.
    pub address: Vec<u8>,
    pub amount: u64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransactionBody {
    pub inputs: Vec<TxIn>,
    pub outputs: Vec<TxOut>,
    pub fee: u64,
    pub ttl: u64,
}

/// Broadcast-ready output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignedAdaTransaction {
    /// Hex of `[body, witness_set, true, null]`.
    pub raw: String,
    /// Hex BLAKE2b-256 of the body.
    pub tx_hash: String,
}

/// Builds a transfer with a fixed `fee`, selecting inputs largest-first.
/// Change goes back to `change_address` when non-zero.
pub fn plan_transfer(
    utxos: &[Utxo],
    to_address: Vec<u8>,
    amount: u64,
    change_address: Vec<u8>,
    fee: u64,
    ttl: u64,
) -> Result<TransactionBody, AdaError> {
    if amount == 0 {
        return Err(AdaError::TransactionBuildError("amount must be > 0".into()));
    }
    let needed = amount
        .checked_add(fee)
        .ok_or_else(|| AdaError::TransactionBuildError("amount overflow".into()))?;

    let mut candidates = utxos.to_vec();
    candidates.sort_by(|a, b| b.amount.cmp(&a.amount).then(a.tx_hash.cmp(&b.tx_hash)));

    let mut selected = Vec::new();
    let mut total: u64 = 0;
    for utxo in candidates {
        if total >= needed {
            break;
        }
        total = total.saturating_add(utxo.amount);
        selected.push(TxIn {
            tx_hash: utxo.tx_hash,
            index: utxo.index,
        });
    }
    if total < needed {
        return Err(AdaError::InsufficientFunds {
            needed,
            available: total,
        });
    }
    selected.sort();

    let mut outputs = vec![TxOut {
        address: to_address,
        amount,
    }];
    let change = total - needed;
    if change > 0 {
        outputs.push(TxOut {
            address: change_address,
            amount: change,
        });
    }

    Ok(TransactionBody {
        inputs: selected,
        outputs,
        fee,
        ttl,
    })
}

impl TransactionBody {
    pub fn to_cbor(&self) -> Cbor {
        let inputs = self
            .inputs
            .iter()
            .map(|i| Cbor::Array(vec![Cbor::Bytes(i.tx_hash.to_vec()), Cbor::Unsigned(i.index)]))
            .collect();
        let outputs = self
            .outputs
            .iter()
            .map(|o| Cbor::Array(vec![Cbor::Bytes(o.address.clone()), Cbor::Unsigned(o.amount)]))
            .collect();
        Cbor::Map(vec![
            (BODY_INPUTS, Cbor::Array(inputs)),
            (BODY_OUTPUTS, Cbor::Array(outputs)),
            (BODY_FEE, Cbor::Unsigned(self.fee)),
            (BODY_TTL, Cbor::Unsigned(self.ttl)),
        ])
    }

    pub fn encode(&self) -> Vec<u8> {
        self.to_cbor().encode()
    }

    /// BLAKE2b-256 of the CBOR body: the single signing hash and the
    /// transaction id.
    pub fn hash(&self) -> [u8; 32] {
        blake2b_256(&self.encode())
    }

    pub fn from_cbor(value: &Cbor) -> Result<Self, AdaError> {
        let inputs = value
            .get(BODY_INPUTS)?
            .as_array()?
            .iter()
            .map(|i| {
                let pair = i.as_array()?;
                match pair {
                    [hash, index] => Ok(TxIn {
                        tx_hash: hash
                            .as_bytes()?
                            .try_into()
                            .map_err(|_| AdaError::Cbor("input hash must be 32 bytes".into()))?,
                        index: index.as_u64()?,
                    }),
                    _ => Err(AdaError::Cbor("input must be a pair".into())),
                }
            })
            .collect::<Result<Vec<_>, _>>()?;
        let outputs = value
            .get(BODY_OUTPUTS)?
            .as_array()?
            .iter()
            .map(|o| match o.as_array()? {
                [address, amount] => Ok(TxOut {
                    address: address.as_bytes()?.to_vec(),
                    amount: amount.as_u64()?,
                }),
                _ => Err(AdaError::Cbor("output must be a pair".into())),
            })
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self {
            inputs,
            outputs,
            fee: value.get(BODY_FEE)?.as_u64()?,
            ttl: value.get(BODY_TTL)?.as_u64()?,
        })
    }

    /// Verifies an ed25519 signature over [`Self::hash`] and assembles the
    /// signed transaction.
    pub fn compile(
        &self,
        public_key: &[u8; 32],
        signature: &[u8],
    ) -> Result<SignedAdaTransaction, AdaError> {
        let hash = self.hash();
        let key = VerifyingKey::from_bytes(public_key)
            .map_err(|e| AdaError::InvalidPublicKey(e.to_string()))?;
        let sig = Signature::from_slice(signature)
            .map_err(|e| AdaError::InvalidSignature(e.to_string()))?;
        key.verify(&hash, &sig)
            .map_err(|_| AdaError::SignatureVerificationFailed)?;

        let witness = Cbor::Array(vec![
            Cbor::Bytes(public_key.to_vec()),
            Cbor::Bytes(sig.to_bytes().to_vec()),
        ]);
        let witness_set = Cbor::Map(vec![(WITNESS_VKEYS, Cbor::Array(vec![witness]))]);
        let tx = Cbor::Array(vec![self.to_cbor(), witness_set, Cbor::Bool(true), Cbor::Null]);

        let tx_hash = hex::encode(hash);
        debug!(%tx_hash, "compiled cardano transaction");
        Ok(SignedAdaTransaction {
            raw: hex::encode(tx.encode()),
            tx_hash,
        })
    }
}

/// A decoded signed transaction: the body and its vkey witnesses.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedTransaction {
    pub body: TransactionBody,
    pub witnesses: Vec<(Vec<u8>, Vec<u8>)>,
}

pub fn decode_signed(raw: &[u8]) -> Result<DecodedTransaction, AdaError> {
    let tx = Cbor::decode(raw)?;
    let parts = tx.as_array()?;
    let (body, witness_set) = match parts {
        [body, witness_set, ..] => (body, witness_set),
        _ => return Err(AdaError::Cbor("transaction must have body and witnesses".into())),
    };
    let witnesses = witness_set
        .get(WITNESS_VKEYS)?
        .as_array()?
        .iter()
        .map(|w| match w.as_array()? {
            [vkey, sig] => Ok((vkey.as_bytes()?.to_vec(), sig.as_bytes()?.to_vec())),
            _ => Err(AdaError::Cbor("witness must be a pair".into())),
        })
        .collect::<Result<Vec<_>, _>>()?;
    Ok(DecodedTransaction {
        body: TransactionBody::from_cbor(body)?,
        witnesses,
    })
}
