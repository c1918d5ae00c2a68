//! Zcash transparent transactions.
//!
//! Planning, coin selection and script handling are shared with the other
//! UTXO chains; only the wire format and the signature digest differ. Zcash
//! transfers are serialized in the Sapling (v4) format with empty shielded
//! bundles and signed with the ZIP-243 digest.

use bitcoin::absolute::LockTime;
use bitcoin::consensus;
use bitcoin::transaction::Version;
use bitcoin::{Transaction, TxIn, TxOut};

use crate::error::UtxoError;

/// `fOverwintered | 4`.
pub const TX_VERSION: u32 = 0x8000_0004;

/// Sapling version group id.
pub const VERSION_GROUP_ID: u32 = 0x892f_2085;

/// Consensus branch id the digest commits to (little-endian `f04dec4d`).
pub const CONSENSUS_BRANCH_ID: u32 = 0x4dec_4df0;

/// Transparent-only transactions never expire.
const EXPIRY_HEIGHT: u32 = 0;

fn blake2b_256(personal: &[u8; 16], data: &[u8]) -> [u8; 32] {
    let hash = blake2b_simd::Params::new()
        .hash_length(32)
        .personal(personal)
        .hash(data);
    let mut out = [0u8; 32];
    out.copy_from_slice(hash.as_bytes());
    out
}

fn sighash_personal(branch_id: u32) -> [u8; 16] {
    let mut personal = [0u8; 16];
    personal[..12].copy_from_slice(b"ZcashSigHash");
    personal[12..].copy_from_slice(&branch_id.to_le_bytes());
    personal
}

/// ZIP-243 digest for transparent input `index`, spending `prevouts[index]`.
pub fn sighash(
    tx: &Transaction,
    prevouts: &[TxOut],
    index: usize,
    sighash_type: u32,
) -> Result<[u8; 32], UtxoError> {
    let txin = tx
        .input
        .get(index)
        .ok_or_else(|| UtxoError::SighashError(format!("input {index} out of range")))?;
    let prevout = prevouts
        .get(index)
        .ok_or_else(|| UtxoError::SighashError(format!("no prevout for input {index}")))?;

    let mut outpoints = Vec::with_capacity(tx.input.len() * 36);
    let mut sequences = Vec::with_capacity(tx.input.len() * 4);
    for input in &tx.input {
        outpoints.extend_from_slice(&consensus::serialize(&input.previous_output));
        sequences.extend_from_slice(&input.sequence.0.to_le_bytes());
    }
    let mut outputs = Vec::new();
    for output in &tx.output {
        outputs.extend_from_slice(&consensus::serialize(output));
    }

    let mut preimage = Vec::with_capacity(300);
    preimage.extend_from_slice(&TX_VERSION.to_le_bytes());
    preimage.extend_from_slice(&VERSION_GROUP_ID.to_le_bytes());
    preimage.extend_from_slice(&blake2b_256(b"ZcashPrevoutHash", &outpoints));
    preimage.extend_from_slice(&blake2b_256(b"ZcashSequencHash", &sequences));
    preimage.extend_from_slice(&blake2b_256(b"ZcashOutputsHash", &outputs));
    // JoinSplits, shielded spends and shielded outputs are all empty.
    preimage.extend_from_slice(&[0u8; 96]);
    preimage.extend_from_slice(&tx.lock_time.to_consensus_u32().to_le_bytes());
    preimage.extend_from_slice(&EXPIRY_HEIGHT.to_le_bytes());
    preimage.extend_from_slice(&0i64.to_le_bytes());
    preimage.extend_from_slice(&sighash_type.to_le_bytes());
    preimage.extend_from_slice(&consensus::serialize(&txin.previous_output));
    preimage.extend_from_slice(&consensus::serialize(&prevout.script_pubkey));
    preimage.extend_from_slice(&prevout.value.to_sat().to_le_bytes());
    preimage.extend_from_slice(&txin.sequence.0.to_le_bytes());

    Ok(blake2b_256(&sighash_personal(CONSENSUS_BRANCH_ID), &preimage))
}

/// Serialize `tx` as a v4 transaction with empty shielded parts.
pub fn serialize(tx: &Transaction) -> Vec<u8> {
    let mut raw = Vec::with_capacity(256);
    raw.extend_from_slice(&TX_VERSION.to_le_bytes());
    raw.extend_from_slice(&VERSION_GROUP_ID.to_le_bytes());
    raw.extend_from_slice(&consensus::serialize(&tx.input));
    raw.extend_from_slice(&consensus::serialize(&tx.output));
    raw.extend_from_slice(&tx.lock_time.to_consensus_u32().to_le_bytes());
    raw.extend_from_slice(&EXPIRY_HEIGHT.to_le_bytes());
    raw.extend_from_slice(&0i64.to_le_bytes());
    // nShieldedSpend, nShieldedOutput, nJoinSplit
    raw.extend_from_slice(&[0, 0, 0]);
    raw
}

/// Display-order id of a serialized v4 transaction.
pub fn txid(raw: &[u8]) -> String {
    let mut hash = crypto_utils::hash::double_sha256(raw);
    hash.reverse();
    hex::encode(hash)
}

fn read_u32(raw: &[u8], at: usize) -> Result<u32, UtxoError> {
    raw.get(at..at + 4)
        .and_then(|b| b.try_into().ok())
        .map(u32::from_le_bytes)
        .ok_or_else(|| UtxoError::DecodeError("truncated zcash transaction".into()))
}

/// Parse a transparent-only v4 transaction back into its inputs and outputs.
pub fn decode(raw: &[u8]) -> Result<Transaction, UtxoError> {
    if read_u32(raw, 0)? != TX_VERSION || read_u32(raw, 4)? != VERSION_GROUP_ID {
        return Err(UtxoError::DecodeError("not a sapling v4 transaction".into()));
    }

    let mut at = 8;
    let (input, used): (Vec<TxIn>, usize) = consensus::deserialize_partial(&raw[at..])
        .map_err(|e| UtxoError::DecodeError(format!("inputs: {e}")))?;
    at += used;
    let (output, used): (Vec<TxOut>, usize) = consensus::deserialize_partial(&raw[at..])
        .map_err(|e| UtxoError::DecodeError(format!("outputs: {e}")))?;
    at += used;
    let lock_time = read_u32(raw, at)?;

    let shielded = raw
        .get(at + 16..)
        .ok_or_else(|| UtxoError::DecodeError("truncated zcash transaction".into()))?;
    if shielded != [0, 0, 0] {
        return Err(UtxoError::DecodeError("shielded components are not supported".into()));
    }

    Ok(Transaction {
        version: Version(TX_VERSION as i32),
        lock_time: LockTime::from_consensus(lock_time),
        input,
        output,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::address::{pubkey_to_address, pubkey_to_script};
    use crate::network::UtxoChain;
    use crate::transaction::{build_transaction, decode_payments, UtxoSigningInput};
    use crate::utxo::Utxo;
    use bitcoin::hashes::Hash;
    use k256::ecdsa::signature::hazmat::PrehashSigner;
    use k256::ecdsa::{Signature, SigningKey};

    fn signing_key() -> SigningKey {
        SigningKey::from_bytes(&[0x42; 32].into()).unwrap()
    }

    fn pubkey(key: &SigningKey) -> Vec<u8> {
        key.verifying_key().to_sec1_bytes().to_vec()
    }

    fn zcash_input(amounts: &[u64], amount_sat: u64) -> UtxoSigningInput {
        let key = signing_key();
        let own = pubkey_to_address(UtxoChain::Zcash, &pubkey(&key)).unwrap();
        let script = pubkey_to_script(UtxoChain::Zcash, &pubkey(&key)).unwrap();
        UtxoSigningInput {
            chain: UtxoChain::Zcash,
            utxos: amounts
                .iter()
                .enumerate()
                .map(|(i, &amount_sat)| Utxo {
                    txid: format!("{:02x}", i + 0x11).repeat(32),
                    vout: i as u32,
                    amount_sat,
                    script_pubkey: script.to_bytes(),
                })
                .collect(),
            to_address: own.clone(),
            amount_sat,
            change_address: own,
            byte_fee: 10,
            use_max_amount: false,
            memo: None,
        }
    }

    #[test]
    fn personalization_carries_branch_id() {
        let personal = sighash_personal(CONSENSUS_BRANCH_ID);
        assert_eq!(&personal[..12], b"ZcashSigHash");
        assert_eq!(hex::encode(&personal[12..]), "f04dec4d");
    }

    #[test]
    fn digests_are_per_input_and_not_bitcoin_legacy() {
        let unsigned = build_transaction(&zcash_input(&[200_000, 150_000], 300_000)).unwrap();
        let digests = unsigned.sighashes().unwrap();
        assert_eq!(digests.len(), 2);
        assert_ne!(digests[0], digests[1]);

        let legacy = bitcoin::sighash::SighashCache::new(&unsigned.tx)
            .legacy_signature_hash(0, &unsigned.prevouts[0].script_pubkey, 0x01)
            .unwrap()
            .to_byte_array();
        assert_ne!(digests[0], legacy);
    }

    #[test]
    fn digest_commits_to_spent_amount() {
        let unsigned = build_transaction(&zcash_input(&[200_000], 50_000)).unwrap();
        let mut other = unsigned.prevouts.clone();
        other[0].value = bitcoin::Amount::from_sat(200_001);
        let a = sighash(&unsigned.tx, &unsigned.prevouts, 0, 1).unwrap();
        let b = sighash(&unsigned.tx, &other, 0, 1).unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn out_of_range_input_rejected() {
        let unsigned = build_transaction(&zcash_input(&[200_000], 50_000)).unwrap();
        assert!(sighash(&unsigned.tx, &unsigned.prevouts, 1, 1).is_err());
    }

    #[test]
    fn compiled_transaction_is_sapling_v4() {
        let key = signing_key();
        let input = zcash_input(&[200_000, 150_000], 300_000);
        let unsigned = build_transaction(&input).unwrap();
        let signatures: Vec<Vec<u8>> = unsigned
            .sighashes()
            .unwrap()
            .iter()
            .map(|digest| {
                let sig: Signature = key.sign_prehash(digest).unwrap();
                sig.to_der().as_bytes().to_vec()
            })
            .collect();

        let signed = unsigned.compile(&pubkey(&key), &signatures).unwrap();
        assert_eq!(hex::encode(&signed.raw[..8]), "0400008085202f89");
        assert_eq!(signed.txid, txid(&signed.raw));

        let decoded = decode(&signed.raw).unwrap();
        assert_eq!(decoded.input.len(), 2);
        assert!(!decoded.input[0].script_sig.is_empty());
        assert_eq!(serialize(&decoded), signed.raw);

        let payments = decode_payments(UtxoChain::Zcash, &signed.raw).unwrap();
        assert_eq!(payments[0], (input.to_address.clone(), 300_000));
    }

    #[test]
    fn bitcoin_bytes_are_not_zcash() {
        assert!(decode(&[0x02, 0, 0, 0, 0, 0]).is_err());
        assert!(decode(&[]).is_err());
    }
}
