use bitcoin::absolute::LockTime;
use bitcoin::consensus;
use bitcoin::hashes::Hash;
use bitcoin::script::{Builder, PushBytesBuf, Script, ScriptBuf};
use bitcoin::sighash::{EcdsaSighashType, SighashCache};
use bitcoin::transaction::Version;
use bitcoin::{Amount, OutPoint, Sequence, Transaction, TxIn, TxOut, Txid, Witness};
use k256::ecdsa::signature::hazmat::PrehashVerifier;
use k256::ecdsa::{Signature, VerifyingKey};
use tracing::debug;

use crate::address::{address_to_script, script_to_address};
use crate::error::UtxoError;
use crate::network::{ScriptKind, UtxoChain};
use crate::utxo::{self, Utxo, UtxoSelection};
use crate::zcash;

/// Estimated virtual size of a P2WPKH input (in vbytes).
/// Breakdown: 41 bytes non-witness + ~27 witness bytes / 4 = ~68 vbytes per input.
const P2WPKH_INPUT_VBYTES: u64 = 68;

/// Size of a P2PKH input with a compressed key and a worst-case DER signature.
const P2PKH_INPUT_BYTES: u64 = 148;

/// Fixed segwit overhead: version + locktime + marker/flag + counts.
const SEGWIT_OVERHEAD_VBYTES: u64 = 11;

/// Fixed legacy overhead: version + locktime + counts.
const LEGACY_OVERHEAD_BYTES: u64 = 10;

/// Largest OP_RETURN payload relayed by default policy.
pub const MAX_OP_RETURN_BYTES: usize = 80;

/// Everything needed to plan and sign a UTXO transfer.
#[derive(Debug, Clone)]
pub struct UtxoSigningInput {
    pub chain: UtxoChain,
    pub utxos: Vec<Utxo>,
    pub to_address: String,
    pub amount_sat: u64,
    pub change_address: String,
    /// Fee rate in satoshis per (virtual) byte.
    pub byte_fee: u64,
    /// Spend every UTXO to the destination, paying the fee out of the amount.
    pub use_max_amount: bool,
    pub memo: Option<String>,
}

/// A planned transaction with empty signatures.
#[derive(Debug, Clone)]
pub struct UnsignedUtxoTx {
    pub chain: UtxoChain,
    pub tx: Transaction,
    /// The outputs being spent, in input order.
    pub prevouts: Vec<TxOut>,
    pub fee_sat: u64,
    pub change_sat: u64,
}

/// A fully signed transaction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignedUtxoTx {
    pub raw: Vec<u8>,
    /// Display-order transaction id.
    pub txid: String,
}

fn compact_size_len(n: usize) -> u64 {
    match n {
        0..=0xfc => 1,
        0xfd..=0xffff => 3,
        0x1_0000..=0xffff_ffff => 5,
        _ => 9,
    }
}

/// Serialized size of an output with the given locking script.
pub fn output_size(script: &Script) -> u64 {
    8 + compact_size_len(script.len()) + script.len() as u64
}

/// Estimate the fee for a transaction of `kind` spending `num_inputs` into
/// `outputs`.
pub fn estimate_fee(kind: ScriptKind, num_inputs: usize, outputs: &[&Script], byte_fee: u64) -> u64 {
    let (overhead, per_input) = match kind {
        ScriptKind::P2wpkh => (SEGWIT_OVERHEAD_VBYTES, P2WPKH_INPUT_VBYTES),
        ScriptKind::P2pkh => (LEGACY_OVERHEAD_BYTES, P2PKH_INPUT_BYTES),
    };
    let outputs: u64 = outputs.iter().map(|s| output_size(s)).sum();
    (overhead + num_inputs as u64 * per_input + outputs) * byte_fee
}

fn memo_script(memo: Option<&str>) -> Result<Option<ScriptBuf>, UtxoError> {
    let memo = match memo {
        Some(m) if !m.is_empty() => m,
        _ => return Ok(None),
    };
    if memo.len() > MAX_OP_RETURN_BYTES {
        return Err(UtxoError::TransactionBuildError(format!(
            "memo is {} bytes, limit is {MAX_OP_RETURN_BYTES}",
            memo.len()
        )));
    }
    let push = PushBytesBuf::try_from(memo.as_bytes().to_vec())
        .map_err(|e| UtxoError::TransactionBuildError(format!("memo push: {e}")))?;
    Ok(Some(ScriptBuf::new_op_return(push)))
}

fn txout(value: u64, script_pubkey: ScriptBuf) -> TxOut {
    TxOut {
        value: Amount::from_sat(value),
        script_pubkey,
    }
}

/// Plan the transaction: select inputs, compute the fee and change, and lay
/// out the outputs as `[destination, change?, memo?]`.
pub fn build_transaction(input: &UtxoSigningInput) -> Result<UnsignedUtxoTx, UtxoError> {
    let chain = input.chain;
    let kind = chain.script_kind();
    let dust = chain.dust_threshold();

    let recipient = address_to_script(chain, &input.to_address)?;
    let change = address_to_script(chain, &input.change_address)?;
    let memo = memo_script(input.memo.as_deref())?;

    let mut fee_outputs: Vec<&Script> = vec![recipient.as_script()];
    if let Some(memo) = &memo {
        fee_outputs.push(memo.as_script());
    }

    // Selection only has to cover the change-less fee; change is added
    // afterwards when it clears the dust threshold.
    let (selection, outputs, fee_sat, change_sat) = if input.use_max_amount {
        let selection = utxo::select_all(&input.utxos)?;
        let fee = estimate_fee(kind, selection.selected.len(), &fee_outputs, input.byte_fee);
        let send = selection.total_sat.saturating_sub(fee);
        if send < dust {
            return Err(UtxoError::InsufficientFunds {
                available: selection.total_sat,
                required: fee + dust,
            });
        }
        let outputs = vec![txout(send, recipient)];
        (selection, outputs, fee, 0)
    } else {
        if input.amount_sat < dust {
            return Err(UtxoError::TransactionBuildError(format!(
                "amount {} is below the dust threshold of {dust}",
                input.amount_sat
            )));
        }

        let mut with_change = fee_outputs.clone();
        with_change.insert(1, change.as_script());

        let selection = utxo::select_utxos(&input.utxos, input.amount_sat, |n| {
            estimate_fee(kind, n, &fee_outputs, input.byte_fee)
        })?;
        let n = selection.selected.len();
        let fee_with_change = estimate_fee(kind, n, &with_change, input.byte_fee);
        let change_sat = selection
            .total_sat
            .saturating_sub(input.amount_sat.saturating_add(fee_with_change));

        let mut outputs = vec![txout(input.amount_sat, recipient)];
        if change_sat >= dust {
            outputs.push(txout(change_sat, change));
            (selection, outputs, fee_with_change, change_sat)
        } else {
            // Dust change is left to the miner.
            let fee = selection.total_sat - input.amount_sat;
            (selection, outputs, fee, 0)
        }
    };

    let mut outputs = outputs;
    if let Some(memo) = memo {
        outputs.push(txout(0, memo));
    }

    let (inputs, prevouts) = build_inputs(&selection)?;
    let version = match kind {
        ScriptKind::P2wpkh => Version::TWO,
        ScriptKind::P2pkh => Version::ONE,
    };

    debug!(
        %chain,
        inputs = inputs.len(),
        outputs = outputs.len(),
        fee_sat,
        "planned utxo transaction"
    );

    Ok(UnsignedUtxoTx {
        chain,
        tx: Transaction {
            version,
            lock_time: LockTime::ZERO,
            input: inputs,
            output: outputs,
        },
        prevouts,
        fee_sat,
        change_sat,
    })
}

fn build_inputs(selection: &UtxoSelection) -> Result<(Vec<TxIn>, Vec<TxOut>), UtxoError> {
    let mut inputs = Vec::with_capacity(selection.selected.len());
    let mut prevouts = Vec::with_capacity(selection.selected.len());

    for utxo in &selection.selected {
        let txid: Txid = utxo
            .txid
            .parse()
            .map_err(|e| UtxoError::InvalidUtxo(format!("invalid txid {}: {e}", utxo.txid)))?;

        inputs.push(TxIn {
            previous_output: OutPoint::new(txid, utxo.vout),
            script_sig: ScriptBuf::new(),
            sequence: Sequence::MAX,
            witness: Witness::default(),
        });
        prevouts.push(txout(utxo.amount_sat, ScriptBuf::from(utxo.script_pubkey.clone())));
    }

    Ok((inputs, prevouts))
}

/// BIP143-style digest with the BCH fork id (replay-protected sighash).
fn forkid_sighash(
    tx: &Transaction,
    input_index: usize,
    script_code: &Script,
    value: Amount,
    sighash_type: u32,
) -> [u8; 32] {
    let mut prevouts = Vec::with_capacity(tx.input.len() * 36);
    let mut sequences = Vec::with_capacity(tx.input.len() * 4);
    for txin in &tx.input {
        prevouts.extend_from_slice(&consensus::serialize(&txin.previous_output));
        sequences.extend_from_slice(&txin.sequence.0.to_le_bytes());
    }
    let mut outputs = Vec::new();
    for txout in &tx.output {
        outputs.extend_from_slice(&consensus::serialize(txout));
    }

    let txin = &tx.input[input_index];
    let mut preimage = Vec::with_capacity(200);
    preimage.extend_from_slice(&tx.version.0.to_le_bytes());
    preimage.extend_from_slice(&crypto_utils::hash::double_sha256(&prevouts));
    preimage.extend_from_slice(&crypto_utils::hash::double_sha256(&sequences));
    preimage.extend_from_slice(&consensus::serialize(&txin.previous_output));
    preimage.extend_from_slice(&consensus::serialize(&script_code.to_owned()));
    preimage.extend_from_slice(&value.to_sat().to_le_bytes());
    preimage.extend_from_slice(&txin.sequence.0.to_le_bytes());
    preimage.extend_from_slice(&crypto_utils::hash::double_sha256(&outputs));
    preimage.extend_from_slice(&tx.lock_time.to_consensus_u32().to_le_bytes());
    preimage.extend_from_slice(&sighash_type.to_le_bytes());

    crypto_utils::hash::double_sha256(&preimage)
}

impl UnsignedUtxoTx {
    /// One signing digest per input, in input order.
    pub fn sighashes(&self) -> Result<Vec<[u8; 32]>, UtxoError> {
        let mut cache = SighashCache::new(&self.tx);
        let mut out = Vec::with_capacity(self.tx.input.len());

        for (index, prevout) in self.prevouts.iter().enumerate() {
            let script = prevout.script_pubkey.as_script();
            let digest = match (self.chain, self.chain.script_kind()) {
                (UtxoChain::Zcash, _) => {
                    zcash::sighash(&self.tx, &self.prevouts, index, self.chain.sighash_type())?
                }
                (UtxoChain::BitcoinCash, _) => {
                    forkid_sighash(&self.tx, index, script, prevout.value, self.chain.sighash_type())
                }
                (_, ScriptKind::P2wpkh) => cache
                    .p2wpkh_signature_hash(index, script, prevout.value, EcdsaSighashType::All)
                    .map_err(|e| UtxoError::SighashError(e.to_string()))?
                    .to_byte_array(),
                (_, ScriptKind::P2pkh) => cache
                    .legacy_signature_hash(index, script, self.chain.sighash_type())
                    .map_err(|e| UtxoError::SighashError(e.to_string()))?
                    .to_byte_array(),
            };
            out.push(digest);
        }

        Ok(out)
    }

    /// Attach one DER signature per input and serialize.
    ///
    /// Every signature is verified against `pubkey` and its input's digest
    /// before anything is assembled; one bad signature fails the whole
    /// transaction.
    pub fn compile(&self, pubkey: &[u8], signatures: &[Vec<u8>]) -> Result<SignedUtxoTx, UtxoError> {
        if signatures.len() != self.tx.input.len() {
            return Err(UtxoError::TransactionBuildError(format!(
                "expected {} signatures, got {}",
                self.tx.input.len(),
                signatures.len()
            )));
        }

        let verifying_key = VerifyingKey::from_sec1_bytes(pubkey)
            .map_err(|e| UtxoError::InvalidPublicKey(e.to_string()))?;
        let digests = self.sighashes()?;
        let sighash_byte = self.chain.sighash_type() as u8;

        let mut signed = self.tx.clone();
        for (index, (digest, der)) in digests.iter().zip(signatures).enumerate() {
            let signature = verify_der(&verifying_key, digest, der)
                .map_err(|_| UtxoError::SignatureVerificationFailed(index))?;

            let mut sig_bytes = signature.to_der().as_bytes().to_vec();
            sig_bytes.push(sighash_byte);

            match self.chain.script_kind() {
                ScriptKind::P2wpkh => {
                    let mut witness = Witness::new();
                    witness.push(&sig_bytes);
                    witness.push(pubkey);
                    signed.input[index].witness = witness;
                }
                ScriptKind::P2pkh => {
                    let sig_push = PushBytesBuf::try_from(sig_bytes)
                        .map_err(|e| UtxoError::TransactionBuildError(e.to_string()))?;
                    let key_push = PushBytesBuf::try_from(pubkey.to_vec())
                        .map_err(|e| UtxoError::TransactionBuildError(e.to_string()))?;
                    signed.input[index].script_sig = Builder::new()
                        .push_slice(sig_push)
                        .push_slice(key_push)
                        .into_script();
                }
            }
        }

        let (raw, txid) = match self.chain {
            UtxoChain::Zcash => {
                let raw = zcash::serialize(&signed);
                let txid = zcash::txid(&raw);
                (raw, txid)
            }
            _ => (consensus::serialize(&signed), signed.compute_txid().to_string()),
        };
        debug!(chain = %self.chain, %txid, "compiled utxo transaction");
        Ok(SignedUtxoTx { raw, txid })
    }
}

/// Verify a DER signature over a prehashed digest.
///
/// High-S signatures are normalized first; the normalized form is returned
/// so it can be embedded in the transaction.
pub fn verify_der(key: &VerifyingKey, digest: &[u8; 32], der: &[u8]) -> Result<Signature, UtxoError> {
    let signature =
        Signature::from_der(der).map_err(|e| UtxoError::DecodeError(format!("DER: {e}")))?;
    let signature = signature.normalize_s().unwrap_or(signature);
    key.verify_prehash(digest, &signature)
        .map_err(|_| UtxoError::SignatureVerificationFailed(0))?;
    Ok(signature)
}

/// Parse a serialized transaction.
pub fn decode_transaction(raw: &[u8]) -> Result<Transaction, UtxoError> {
    consensus::deserialize(raw).map_err(|e| UtxoError::DecodeError(e.to_string()))
}

/// `(address, amount)` for every non-data output.
pub fn decode_payments(chain: UtxoChain, raw: &[u8]) -> Result<Vec<(String, u64)>, UtxoError> {
    let tx = match chain {
        UtxoChain::Zcash => zcash::decode(raw)?,
        _ => decode_transaction(raw)?,
    };
    tx.output
        .iter()
        .filter(|out| !out.script_pubkey.is_op_return())
        .map(|out| Ok((script_to_address(chain, &out.script_pubkey)?, out.value.to_sat())))
        .collect()
}
