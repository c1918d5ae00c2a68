use alloy_primitives::{Address, Bytes, U256};
use alloy_rlp::{Decodable, Encodable, RlpDecodable, RlpEncodable};
use crypto_utils::hash::keccak256;
use k256::ecdsa::signature::hazmat::PrehashVerifier;
use k256::ecdsa::{RecoveryId, Signature, VerifyingKey};
use tracing::debug;

use crate::chains;
use crate::erc20;
use crate::error::EvmError;

/// Transaction envelope used on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TxEnvelope {
    /// EIP-1559 dynamic fee transaction (type 0x02).
    Eip1559,
    /// Pre-typed EIP-155 transaction with a single gas price.
    Legacy,
}

impl TxEnvelope {
    /// Envelope a chain signs with: legacy for chains flagged so in the
    /// registry, EIP-1559 everywhere else.
    pub fn for_chain(chain_id: u64) -> Self {
        match chains::get_chain(chain_id) {
            Some(chain) if chain.legacy_gas => TxEnvelope::Legacy,
            _ => TxEnvelope::Eip1559,
        }
    }
}

/// An unsigned EVM transaction.
///
/// For legacy envelopes `max_fee_per_gas` is the gas price and the priority
/// fee is ignored.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EvmTransaction {
    pub chain_id: u64,
    pub nonce: u64,
    pub max_priority_fee_per_gas: u128,
    pub max_fee_per_gas: u128,
    pub gas_limit: u64,
    pub to: Address,
    /// Transfer value in wei.
    pub value: U256,
    /// Calldata (empty for plain transfers).
    pub data: Vec<u8>,
    pub envelope: TxEnvelope,
}

/// A compiled transaction ready for broadcast.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignedEvmTransaction {
    /// Encoded signed transaction (with the 0x02 type byte for EIP-1559).
    pub raw: Vec<u8>,
    /// Keccak-256 of `raw` as a 0x-prefixed hex string.
    pub tx_hash: String,
}

/// A secp256k1 signature with its recovery id, as produced by the signers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RecoverableSignature {
    pub r: [u8; 32],
    pub s: [u8; 32],
    pub recovery_id: u8,
}

impl RecoverableSignature {
    /// Parses a 65-byte `r || s || v` signature. `v` may be 0/1 or 27/28.
    pub fn from_rsv(bytes: &[u8]) -> Result<Self, EvmError> {
        if bytes.len() != 65 {
            return Err(EvmError::InvalidSignature(format!(
                "expected 65 bytes, got {}",
                bytes.len()
            )));
        }
        let mut r = [0u8; 32];
        let mut s = [0u8; 32];
        r.copy_from_slice(&bytes[..32]);
        s.copy_from_slice(&bytes[32..64]);
        let v = bytes[64];
        let recovery_id = if v >= 27 { v - 27 } else { v };
        Ok(Self { r, s, recovery_id })
    }

    /// Serializes as `r || s || v` with `v` in 0/1 form.
    pub fn to_rsv(&self) -> [u8; 65] {
        let mut out = [0u8; 65];
        out[..32].copy_from_slice(&self.r);
        out[32..64].copy_from_slice(&self.s);
        out[64] = self.recovery_id;
        out
    }
}

/// Verifies a recoverable signature over `prehash` against `pubkey` (SEC1)
/// and returns it in canonical form: low-S, with the recovery id that
/// actually recovers `pubkey`.
pub fn verify_recoverable(
    pubkey: &[u8],
    prehash: &[u8; 32],
    sig: &RecoverableSignature,
) -> Result<RecoverableSignature, EvmError> {
    let key = VerifyingKey::from_sec1_bytes(pubkey)
        .map_err(|e| EvmError::InvalidPublicKey(e.to_string()))?;

    let mut rs = [0u8; 64];
    rs[..32].copy_from_slice(&sig.r);
    rs[32..].copy_from_slice(&sig.s);
    let parsed =
        Signature::from_slice(&rs).map_err(|e| EvmError::InvalidSignature(e.to_string()))?;
    let normalized = parsed.normalize_s().unwrap_or(parsed);

    if key.verify_prehash(prehash, &normalized).is_err() {
        debug!(hash = %hex::encode(prehash), "evm signature does not match key");
        return Err(EvmError::SignatureVerificationFailed);
    }

    let recovery_id = RecoveryId::trial_recovery_from_prehash(&key, prehash, &normalized)
        .map_err(|_| EvmError::SignatureVerificationFailed)?;

    let bytes = normalized.to_bytes();
    let mut r = [0u8; 32];
    let mut s = [0u8; 32];
    r.copy_from_slice(&bytes[..32]);
    s.copy_from_slice(&bytes[32..]);
    Ok(RecoverableSignature {
        r,
        s,
        recovery_id: recovery_id.to_byte(),
    })
}

/// Builds a native value transfer.
#[allow(clippy::too_many_arguments)]
pub fn build_transfer(
    chain_id: u64,
    nonce: u64,
    to: Address,
    value: U256,
    max_priority_fee: u128,
    max_fee: u128,
    gas_limit: u64,
    data: Vec<u8>,
) -> EvmTransaction {
    EvmTransaction {
        chain_id,
        nonce,
        max_priority_fee_per_gas: max_priority_fee,
        max_fee_per_gas: max_fee,
        gas_limit,
        to,
        value,
        data,
        envelope: TxEnvelope::for_chain(chain_id),
    }
}

/// Builds an ERC-20 `transfer(address,uint256)` call to `token_contract`
/// with zero value.
#[allow(clippy::too_many_arguments)]
pub fn build_erc20_transfer(
    chain_id: u64,
    nonce: u64,
    token_contract: Address,
    to: Address,
    amount: U256,
    max_priority_fee: u128,
    max_fee: u128,
    gas_limit: u64,
) -> EvmTransaction {
    build_transfer(
        chain_id,
        nonce,
        token_contract,
        U256::ZERO,
        max_priority_fee,
        max_fee,
        gas_limit,
        erc20::encode_transfer(to, amount),
    )
}

impl EvmTransaction {
    /// Bytes whose Keccak-256 is signed.
    ///
    /// EIP-1559: `0x02 || rlp([chain_id, nonce, max_priority_fee, max_fee,
    /// gas_limit, to, value, data, access_list])`.
    /// Legacy: `rlp([nonce, gas_price, gas_limit, to, value, data, chain_id, 0, 0])`.
    pub fn signing_payload(&self) -> Vec<u8> {
        let mut out = Vec::new();
        match self.envelope {
            TxEnvelope::Eip1559 => {
                out.push(0x02);
                UnsignedDynamicFeeFields {
                    chain_id: self.chain_id,
                    nonce: self.nonce,
                    max_priority_fee_per_gas: self.max_priority_fee_per_gas,
                    max_fee_per_gas: self.max_fee_per_gas,
                    gas_limit: self.gas_limit,
                    to: self.to,
                    value: self.value,
                    data: Bytes::from(self.data.clone()),
                    access_list: Vec::new(),
                }
                .encode(&mut out);
            }
            TxEnvelope::Legacy => {
                UnsignedLegacyFields {
                    nonce: self.nonce,
                    gas_price: self.max_fee_per_gas,
                    gas_limit: self.gas_limit,
                    to: self.to,
                    value: self.value,
                    data: Bytes::from(self.data.clone()),
                    chain_id: self.chain_id,
                    zero_r: 0,
                    zero_s: 0,
                }
                .encode(&mut out);
            }
        }
        out
    }

    /// Keccak-256 of the signing payload.
    pub fn signing_hash(&self) -> [u8; 32] {
        keccak256(&self.signing_payload())
    }

    /// Verifies `sig` against `pubkey` and assembles the signed transaction.
    pub fn compile(
        &self,
        pubkey: &[u8],
        sig: &RecoverableSignature,
    ) -> Result<SignedEvmTransaction, EvmError> {
        let hash = self.signing_hash();
        let sig = verify_recoverable(pubkey, &hash, sig)?;
        let r = U256::from_be_bytes(sig.r);
        let s = U256::from_be_bytes(sig.s);

        let mut raw = Vec::new();
        match self.envelope {
            TxEnvelope::Eip1559 => {
                raw.push(0x02);
                SignedDynamicFeeFields {
                    chain_id: self.chain_id,
                    nonce: self.nonce,
                    max_priority_fee_per_gas: self.max_priority_fee_per_gas,
                    max_fee_per_gas: self.max_fee_per_gas,
                    gas_limit: self.gas_limit,
                    to: self.to,
                    value: self.value,
                    data: Bytes::from(self.data.clone()),
                    access_list: Vec::new(),
                    y_parity: sig.recovery_id,
                    r,
                    s,
                }
                .encode(&mut raw);
            }
            TxEnvelope::Legacy => {
                let v = self
                    .chain_id
                    .checked_mul(2)
                    .and_then(|x| x.checked_add(35 + u64::from(sig.recovery_id)))
                    .ok_or_else(|| {
                        EvmError::EncodingError(format!("chain id {} overflows v", self.chain_id))
                    })?;
                SignedLegacyFields {
                    nonce: self.nonce,
                    gas_price: self.max_fee_per_gas,
                    gas_limit: self.gas_limit,
                    to: self.to,
                    value: self.value,
                    data: Bytes::from(self.data.clone()),
                    v,
                    r,
                    s,
                }
                .encode(&mut raw);
            }
        }

        let tx_hash = format!("0x{}", hex::encode(keccak256(&raw)));
        debug!(chain_id = self.chain_id, %tx_hash, "compiled evm transaction");
        Ok(SignedEvmTransaction { raw, tx_hash })
    }
}

/// Decodes a signed transaction back into its fields and signature.
pub fn decode_signed(raw: &[u8]) -> Result<(EvmTransaction, RecoverableSignature), EvmError> {
    let first = *raw
        .first()
        .ok_or_else(|| EvmError::DecodeError("empty transaction".into()))?;

    if first == 0x02 {
        let mut buf = &raw[1..];
        let fields = SignedDynamicFeeFields::decode(&mut buf)
            .map_err(|e| EvmError::DecodeError(e.to_string()))?;
        if !buf.is_empty() {
            return Err(EvmError::DecodeError("trailing bytes".into()));
        }
        let tx = EvmTransaction {
            chain_id: fields.chain_id,
            nonce: fields.nonce,
            max_priority_fee_per_gas: fields.max_priority_fee_per_gas,
            max_fee_per_gas: fields.max_fee_per_gas,
            gas_limit: fields.gas_limit,
            to: fields.to,
            value: fields.value,
            data: fields.data.to_vec(),
            envelope: TxEnvelope::Eip1559,
        };
        let sig = RecoverableSignature {
            r: fields.r.to_be_bytes::<32>(),
            s: fields.s.to_be_bytes::<32>(),
            recovery_id: fields.y_parity,
        };
        return Ok((tx, sig));
    }

    if first < 0xc0 {
        return Err(EvmError::DecodeError(format!(
            "unsupported transaction type 0x{first:02x}"
        )));
    }

    let mut buf = raw;
    let fields =
        SignedLegacyFields::decode(&mut buf).map_err(|e| EvmError::DecodeError(e.to_string()))?;
    if fields.v < 35 {
        return Err(EvmError::DecodeError(format!(
            "pre-EIP-155 v value {}",
            fields.v
        )));
    }
    let tx = EvmTransaction {
        chain_id: (fields.v - 35) / 2,
        nonce: fields.nonce,
        max_priority_fee_per_gas: fields.gas_price,
        max_fee_per_gas: fields.gas_price,
        gas_limit: fields.gas_limit,
        to: fields.to,
        value: fields.value,
        data: fields.data.to_vec(),
        envelope: TxEnvelope::Legacy,
    };
    let sig = RecoverableSignature {
        r: fields.r.to_be_bytes::<32>(),
        s: fields.s.to_be_bytes::<32>(),
        recovery_id: ((fields.v - 35) % 2) as u8,
    };
    Ok((tx, sig))
}

// ---------------------------------------------------------------------------
// RLP structures
// ---------------------------------------------------------------------------

#[derive(RlpEncodable)]
struct UnsignedDynamicFeeFields {
    chain_id: u64,
    nonce: u64,
    max_priority_fee_per_gas: u128,
    max_fee_per_gas: u128,
    gas_limit: u64,
    to: Address,
    value: U256,
    data: Bytes,
    access_list: Vec<AccessListItem>,
}

#[derive(RlpEncodable, RlpDecodable)]
struct SignedDynamicFeeFields {
    chain_id: u64,
    nonce: u64,
    max_priority_fee_per_gas: u128,
    max_fee_per_gas: u128,
    gas_limit: u64,
    to: Address,
    value: U256,
    data: Bytes,
    access_list: Vec<AccessListItem>,
    y_parity: u8,
    r: U256,
    s: U256,
}

#[derive(RlpEncodable)]
struct UnsignedLegacyFields {
    nonce: u64,
    gas_price: u128,
    gas_limit: u64,
    to: Address,
    value: U256,
    data: Bytes,
    chain_id: u64,
    zero_r: u8,
    zero_s: u8,
}

#[derive(RlpEncodable, RlpDecodable)]
struct SignedLegacyFields {
    nonce: u64,
    gas_price: u128,
    gas_limit: u64,
    to: Address,
    value: U256,
    data: Bytes,
    v: u64,
    r: U256,
    s: U256,
}

/// An EIP-2930 access list entry. Always empty in transactions built here,
/// but decoded when present.
#[derive(Debug, Clone, RlpEncodable, RlpDecodable)]
struct AccessListItem {
    address: Address,
    storage_keys: Vec<U256>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use k256::ecdsa::SigningKey;

    const DEAD: Address = Address::new([
        0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0xde, 0xad,
    ]);

    fn test_key() -> SigningKey {
        let mut bytes = [0u8; 32];
        bytes[31] = 1;
        SigningKey::from_slice(&bytes).unwrap()
    }

    fn pubkey(key: &SigningKey) -> Vec<u8> {
        key.verifying_key().to_sec1_bytes().to_vec()
    }

    fn sign(key: &SigningKey, hash: &[u8; 32]) -> RecoverableSignature {
        let (sig, recid) = key.sign_prehash_recoverable(hash).unwrap();
        let bytes = sig.to_bytes();
        let mut r = [0u8; 32];
        let mut s = [0u8; 32];
        r.copy_from_slice(&bytes[..32]);
        s.copy_from_slice(&bytes[32..]);
        RecoverableSignature {
            r,
            s,
            recovery_id: recid.to_byte(),
        }
    }

    fn one_eth(chain_id: u64) -> EvmTransaction {
        build_transfer(
            chain_id,
            0,
            DEAD,
            U256::from(1_000_000_000_000_000_000u128),
            1_000_000_000,
            50_000_000_000,
            21_000,
            Vec::new(),
        )
    }

    #[test]
    fn envelope_per_chain() {
        assert_eq!(TxEnvelope::for_chain(1), TxEnvelope::Eip1559);
        assert_eq!(TxEnvelope::for_chain(56), TxEnvelope::Legacy);
        assert_eq!(TxEnvelope::for_chain(424242), TxEnvelope::Eip1559);
    }

    #[test]
    fn eip1559_payload_starts_with_type_byte() {
        let payload = one_eth(1).signing_payload();
        assert_eq!(payload[0], 0x02);
        assert!(payload[1] >= 0xc0);
    }

    #[test]
    fn legacy_payload_is_rlp_list_with_chain_id() {
        let tx = one_eth(56);
        let payload = tx.signing_payload();
        assert!(payload[0] >= 0xc0);
        // Trailing chain_id, 0, 0.
        assert_eq!(&payload[payload.len() - 3..], &[56, 0x80, 0x80]);
    }

    #[test]
    fn signing_hash_is_deterministic() {
        assert_eq!(one_eth(1).signing_hash(), one_eth(1).signing_hash());
        assert_ne!(one_eth(1).signing_hash(), one_eth(137).signing_hash());
    }

    #[test]
    fn compile_eip1559_roundtrip() {
        let key = test_key();
        let tx = one_eth(1);
        let sig = sign(&key, &tx.signing_hash());
        let signed = tx.compile(&pubkey(&key), &sig).unwrap();

        assert_eq!(signed.raw[0], 0x02);
        assert_eq!(signed.tx_hash, format!("0x{}", hex::encode(keccak256(&signed.raw))));

        let (decoded, decoded_sig) = decode_signed(&signed.raw).unwrap();
        assert_eq!(decoded, tx);
        assert_eq!(decoded_sig, sig);
    }

    #[test]
    fn compile_legacy_roundtrip() {
        let key = test_key();
        let tx = one_eth(56);
        let sig = sign(&key, &tx.signing_hash());
        let signed = tx.compile(&pubkey(&key), &sig).unwrap();

        let (decoded, decoded_sig) = decode_signed(&signed.raw).unwrap();
        assert_eq!(decoded.chain_id, 56);
        assert_eq!(decoded.envelope, TxEnvelope::Legacy);
        assert_eq!(decoded.value, tx.value);
        assert_eq!(decoded_sig.recovery_id, sig.recovery_id);
    }

    #[test]
    fn compile_fixes_wrong_recovery_id() {
        let key = test_key();
        let tx = one_eth(1);
        let mut sig = sign(&key, &tx.signing_hash());
        let expected = sig.recovery_id;
        sig.recovery_id ^= 1;
        let signed = tx.compile(&pubkey(&key), &sig).unwrap();
        let (_, decoded_sig) = decode_signed(&signed.raw).unwrap();
        assert_eq!(decoded_sig.recovery_id, expected);
    }

    #[test]
    fn compile_rejects_signature_over_other_tx() {
        let key = test_key();
        let sig = sign(&key, &one_eth(1).signing_hash());
        let mutated = EvmTransaction {
            nonce: 1,
            ..one_eth(1)
        };
        assert!(matches!(
            mutated.compile(&pubkey(&key), &sig),
            Err(EvmError::SignatureVerificationFailed)
        ));
    }

    #[test]
    fn compile_rejects_other_key() {
        let key = test_key();
        let other = SigningKey::from_slice(&[7u8; 32]).unwrap();
        let tx = one_eth(1);
        let sig = sign(&key, &tx.signing_hash());
        assert!(tx.compile(&pubkey(&other), &sig).is_err());
    }

    #[test]
    fn erc20_transfer_targets_contract() {
        let token = Address::repeat_byte(0xa0);
        let tx = build_erc20_transfer(1, 5, token, DEAD, U256::from(100u64), 1, 2, 65_000);
        assert_eq!(tx.to, token);
        assert_eq!(tx.value, U256::ZERO);
        assert_eq!(erc20::decode_transfer(&tx.data).unwrap(), (DEAD, U256::from(100u64)));
    }

    #[test]
    fn rsv_parses_both_v_forms() {
        let mut bytes = [0u8; 65];
        bytes[64] = 28;
        assert_eq!(RecoverableSignature::from_rsv(&bytes).unwrap().recovery_id, 1);
        bytes[64] = 0;
        assert_eq!(RecoverableSignature::from_rsv(&bytes).unwrap().recovery_id, 0);
        assert!(RecoverableSignature::from_rsv(&bytes[..64]).is_err());
    }

    #[test]
    fn decode_rejects_garbage() {
        assert!(decode_signed(&[]).is_err());
        assert!(decode_signed(&[0x01, 0xc0]).is_err());
        assert!(decode_signed(&[0x02, 0xc0]).is_err());
    }

    #[test]
    fn zero_value_encodes_as_empty_string() {
        let mut buf = Vec::new();
        U256::ZERO.encode(&mut buf);
        assert_eq!(buf, vec![0x80]);
    }

    proptest::proptest! {
        #![proptest_config(proptest::prelude::ProptestConfig::with_cases(32))]

        #[test]
        fn signed_dynamic_fee_tx_decodes_to_itself(
            nonce: u64,
            value: u128,
            priority in 0u128..1_000_000_000_000,
            gas_limit in 21_000u64..10_000_000,
            data in proptest::collection::vec(proptest::prelude::any::<u8>(), 0..200),
        ) {
            let key = test_key();
            let tx = build_transfer(
                1,
                nonce,
                DEAD,
                U256::from(value),
                priority,
                priority + 1,
                gas_limit,
                data,
            );
            let sig = sign(&key, &tx.signing_hash());
            let signed = tx.compile(&pubkey(&key), &sig).unwrap();
            let (decoded, decoded_sig) = decode_signed(&signed.raw).unwrap();
            proptest::prop_assert_eq!(decoded, tx);
            proptest::prop_assert_eq!(decoded_sig, sig);
        }
    }
}
