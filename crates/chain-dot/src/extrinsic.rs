//! Signed `balances.transfer_allow_death` extrinsics (format version 4).

use crypto_utils::hash::blake2b_256;
use ed25519_dalek::{Signature, Verifier, VerifyingKey};
use parity_scale_codec::{Compact, Decode, Encode, Input};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::era::Era;
use crate::error::DotError;

/// Signed extrinsic, version 4.
const SIGNED_V4: u8 = 0x84;
const MULTI_ADDRESS_ID: u8 = 0x00;
const MULTI_SIGNATURE_ED25519: u8 = 0x00;
/// Payloads longer than this are signed through their BLAKE2b-256 hash.
const MAX_UNHASHED_PAYLOAD: usize = 256;

/// Runtime-dependent extrinsic layout.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExtrinsicConfig {
    /// Pallet index of `Balances`.
    pub module_index: u8,
    /// Call index of `transfer_allow_death`.
    pub method_index: u8,
    pub era_period: u64,
    /// Include `ChargeAssetTxPayment` (asset id `None`) instead of the plain tip.
    pub charge_asset_tx_payment: bool,
    /// Include `CheckMetadataHash` (mode disabled, hash `None`).
    pub check_metadata_hash: bool,
}

impl Default for ExtrinsicConfig {
    fn default() -> Self {
        Self {
            module_index: 10,
            method_index: 0,
            era_period: 64,
            charge_asset_tx_payment: true,
            check_metadata_hash: true,
        }
    }
}

/// `[module][method] ++ MultiAddress::Id(dest) ++ Compact<u128>(amount)`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransferCall {
    pub module_index: u8,
    pub method_index: u8,
    pub dest: [u8; 32],
    pub amount: u128,
}

impl Encode for TransferCall {
    fn encode_to<T: parity_scale_codec::Output + ?Sized>(&self, dest: &mut T) {
        dest.push_byte(self.module_index);
        dest.push_byte(self.method_index);
        dest.push_byte(MULTI_ADDRESS_ID);
        dest.write(&self.dest);
        Compact(self.amount).encode_to(dest);
    }
}

impl Decode for TransferCall {
    fn decode<I: Input>(input: &mut I) -> Result<Self, parity_scale_codec::Error> {
        let module_index = input.read_byte()?;
        let method_index = input.read_byte()?;
        if input.read_byte()? != MULTI_ADDRESS_ID {
            return Err("unsupported destination address kind".into());
        }
        let dest = <[u8; 32]>::decode(input)?;
        let amount = <Compact<u128>>::decode(input)?.0;
        Ok(Self {
            module_index,
            method_index,
            dest,
            amount,
        })
    }
}

/// Everything needed to sign and encode a transfer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DotTransaction {
    pub call: TransferCall,
    pub era: Era,
    pub nonce: u64,
    pub tip: u128,
    pub spec_version: u32,
    pub transaction_version: u32,
    pub genesis_hash: [u8; 32],
    /// Hash of the block the era is anchored to.
    pub block_hash: [u8; 32],
    pub charge_asset_tx_payment: bool,
    pub check_metadata_hash: bool,
}

/// Chain state a transfer is signed against.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChainState {
    pub nonce: u64,
    pub spec_version: u32,
    pub transaction_version: u32,
    pub genesis_hash: [u8; 32],
    pub block_hash: [u8; 32],
    pub current_block: u64,
}

/// Broadcast-ready output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignedDotTransaction {
    /// Hex of the encoded extrinsic, no prefix.
    pub raw: String,
    /// `0x` + BLAKE2b-256 of the first 32 bytes of the extrinsic.
    pub tx_hash: String,
}

impl DotTransaction {
    pub fn transfer(config: &ExtrinsicConfig, dest: [u8; 32], amount: u128, state: ChainState) -> Self {
        Self {
            call: TransferCall {
                module_index: config.module_index,
                method_index: config.method_index,
                dest,
                amount,
            },
            era: Era::mortal(config.era_period, state.current_block),
            nonce: state.nonce,
            tip: 0,
            spec_version: state.spec_version,
            transaction_version: state.transaction_version,
            genesis_hash: state.genesis_hash,
            block_hash: state.block_hash,
            charge_asset_tx_payment: config.charge_asset_tx_payment,
            check_metadata_hash: config.check_metadata_hash,
        }
    }

    fn signed_extra(&self) -> Vec<u8> {
        let mut out = Vec::new();
        self.era.encode_to(&mut out);
        Compact(self.nonce).encode_to(&mut out);
        Compact(self.tip).encode_to(&mut out);
        if self.charge_asset_tx_payment {
            None::<u32>.encode_to(&mut out);
        }
        if self.check_metadata_hash {
            out.push(0);
        }
        out
    }

    fn additional_signed(&self) -> Vec<u8> {
        let mut out = Vec::new();
        self.spec_version.encode_to(&mut out);
        self.transaction_version.encode_to(&mut out);
        out.extend_from_slice(&self.genesis_hash);
        out.extend_from_slice(&self.block_hash);
        if self.check_metadata_hash {
            None::<[u8; 32]>.encode_to(&mut out);
        }
        out
    }

    /// The bytes the signer signs: the raw payload, or its BLAKE2b-256 hash
    /// when longer than 256 bytes.
    pub fn signing_payload(&self) -> Vec<u8> {
        let mut payload = self.call.encode();
        payload.extend_from_slice(&self.signed_extra());
        payload.extend_from_slice(&self.additional_signed());
        if payload.len() > MAX_UNHASHED_PAYLOAD {
            blake2b_256(&payload).to_vec()
        } else {
            payload
        }
    }

    /// Encodes the signed extrinsic with its compact length prefix.
    pub fn encode_signed(&self, signer: &[u8; 32], signature: &[u8; 64]) -> Vec<u8> {
        let mut body = vec![SIGNED_V4, MULTI_ADDRESS_ID];
        body.extend_from_slice(signer);
        body.push(MULTI_SIGNATURE_ED25519);
        body.extend_from_slice(signature);
        body.extend_from_slice(&self.signed_extra());
        self.call.encode_to(&mut body);

        let mut out = Compact(body.len() as u32).encode();
        out.extend_from_slice(&body);
        out
    }

    /// Verifies an ed25519 signature over [`Self::signing_payload`] and
    /// encodes the extrinsic.
    pub fn compile(
        &self,
        public_key: &[u8; 32],
        signature: &[u8],
    ) -> Result<SignedDotTransaction, DotError> {
        let key = VerifyingKey::from_bytes(public_key)
            .map_err(|e| DotError::InvalidPublicKey(e.to_string()))?;
        let sig = Signature::from_slice(signature)
            .map_err(|e| DotError::InvalidSignature(e.to_string()))?;
        key.verify(&self.signing_payload(), &sig)
            .map_err(|_| DotError::SignatureVerificationFailed)?;

        let encoded = self.encode_signed(public_key, &sig.to_bytes());
        let tx_hash = extrinsic_hash(&encoded);
        debug!(%tx_hash, "compiled polkadot extrinsic");
        Ok(SignedDotTransaction {
            raw: hex::encode(encoded),
            tx_hash,
        })
    }

    /// Extrinsic carrying an all-zero signature from an all-zero signer, for
    /// fee simulation.
    ///
    /// The signer is a fixed zero key rather than a freshly generated one, so
    /// every cosigner produces identical bytes. Fee queries only read the
    /// encoded length and call, which match a real signed extrinsic.
    pub fn zero_signed(&self) -> Vec<u8> {
        self.encode_signed(&[0u8; 32], &[0u8; 64])
    }
}

/// `0x` + hex BLAKE2b-256 over the first 32 bytes of an encoded extrinsic.
pub fn extrinsic_hash(encoded: &[u8]) -> String {
    let head = &encoded[..encoded.len().min(32)];
    format!("0x{}", hex::encode(blake2b_256(head)))
}

/// Fields recovered from an encoded signed transfer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedExtrinsic {
    pub signer: [u8; 32],
    pub signature: [u8; 64],
    pub era: Era,
    pub nonce: u64,
    pub tip: u128,
    pub call: TransferCall,
}

/// Decodes an extrinsic produced by [`DotTransaction::encode_signed`] under
/// the same `config`.
pub fn decode_extrinsic(
    encoded: &[u8],
    config: &ExtrinsicConfig,
) -> Result<DecodedExtrinsic, DotError> {
    let input = &mut &encoded[..];
    let len = <Compact<u32>>::decode(input)?.0 as usize;
    if input.len() != len {
        return Err(DotError::DecodeError(format!(
            "length prefix {len} does not match body of {} bytes",
            input.len()
        )));
    }
    if input.read_byte()? != SIGNED_V4 {
        return Err(DotError::DecodeError("not a signed v4 extrinsic".into()));
    }
    if input.read_byte()? != MULTI_ADDRESS_ID {
        return Err(DotError::DecodeError("unsupported signer address kind".into()));
    }
    let signer = <[u8; 32]>::decode(input)?;
    if input.read_byte()? != MULTI_SIGNATURE_ED25519 {
        return Err(DotError::DecodeError("unsupported signature kind".into()));
    }
    let signature = <[u8; 64]>::decode(input)?;
    let era = Era::decode(input)?;
    let nonce = <Compact<u64>>::decode(input)?.0;
    let tip = <Compact<u128>>::decode(input)?.0;
    if config.charge_asset_tx_payment {
        let _asset_id = Option::<u32>::decode(input)?;
    }
    if config.check_metadata_hash {
        let _mode = input.read_byte()?;
    }
    let call = TransferCall::decode(input)?;
    if !input.is_empty() {
        return Err(DotError::DecodeError("trailing bytes after call".into()));
    }
    Ok(DecodedExtrinsic {
        signer,
        signature,
        era,
        nonce,
        tip,
        call,
    })
}
