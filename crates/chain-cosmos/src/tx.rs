//! `SignDoc` construction (SIGN_MODE_DIRECT), `TxRaw` compilation and the
//! sync-broadcast JSON envelope.

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use crypto_utils::hash::sha256;
use crypto_utils::proto::{ProtoReader, ProtoWriter};
use k256::ecdsa::signature::hazmat::PrehashVerifier;
use k256::ecdsa::{Signature, VerifyingKey};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::address::compress_pubkey;
use crate::error::CosmosError;
use crate::msg::{Coin, CosmosMsg};

pub const SECP256K1_PUBKEY_URL: &str = "/cosmos.crypto.secp256k1.PubKey";
pub const BROADCAST_MODE_SYNC: &str = "BROADCAST_MODE_SYNC";

const SIGN_MODE_DIRECT: u64 = 1;

/// Transaction fee: gas limit plus the coins paid for it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Fee {
    pub amount: Vec<Coin>,
    pub gas_limit: u64,
}

impl Fee {
    fn encode(&self) -> Vec<u8> {
        let mut w = ProtoWriter::new();
        for coin in &self.amount {
            w.message(1, &coin.encode());
        }
        w.uint64(2, self.gas_limit).finish()
    }

    fn decode(buf: &[u8]) -> Result<Self, CosmosError> {
        let mut fee = Fee {
            amount: Vec::new(),
            gas_limit: 0,
        };
        for (field, value) in ProtoReader::new(buf).fields()? {
            match field {
                1 => fee.amount.push(Coin::decode(value.as_bytes()?)?),
                2 => fee.gas_limit = value.as_u64()?,
                _ => {}
            }
        }
        Ok(fee)
    }
}

/// An unsigned single-signer Cosmos transaction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CosmosTransaction {
    pub messages: Vec<CosmosMsg>,
    pub memo: String,
    /// Compressed secp256k1 key of the signer.
    pub public_key: [u8; 33],
    pub sequence: u64,
    pub fee: Fee,
    pub chain_id: String,
    pub account_number: u64,
}

/// Broadcast-ready output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignedCosmosTransaction {
    /// `{"mode":"BROADCAST_MODE_SYNC","tx_bytes":"<base64>"}`
    pub raw: String,
    /// Uppercase hex SHA-256 of the `TxRaw` bytes.
    pub tx_hash: String,
}

#[derive(Debug, Serialize, Deserialize)]
struct BroadcastEnvelope {
    mode: String,
    tx_bytes: String,
}

impl CosmosTransaction {
    pub fn new(
        message: CosmosMsg,
        memo: &str,
        public_key: &[u8],
        sequence: u64,
        fee: Fee,
        chain_id: &str,
        account_number: u64,
    ) -> Result<Self, CosmosError> {
        Ok(Self {
            messages: vec![message],
            memo: memo.to_string(),
            public_key: compress_pubkey(public_key)?,
            sequence,
            fee,
            chain_id: chain_id.to_string(),
            account_number,
        })
    }

    pub fn body_bytes(&self) -> Vec<u8> {
        let mut w = ProtoWriter::new();
        for msg in &self.messages {
            w.message(1, &msg.to_any());
        }
        w.string(2, &self.memo).finish()
    }

    pub fn auth_info_bytes(&self) -> Vec<u8> {
        let pubkey = ProtoWriter::new().bytes(1, &self.public_key).finish();
        let pubkey_any = ProtoWriter::new()
            .string(1, SECP256K1_PUBKEY_URL)
            .bytes(2, &pubkey)
            .finish();
        let single = ProtoWriter::new().uint64(1, SIGN_MODE_DIRECT).finish();
        let mode_info = ProtoWriter::new().message(1, &single).finish();
        let signer_info = ProtoWriter::new()
            .message(1, &pubkey_any)
            .message(2, &mode_info)
            .uint64(3, self.sequence)
            .finish();

        ProtoWriter::new()
            .message(1, &signer_info)
            .message(2, &self.fee.encode())
            .finish()
    }

    pub fn sign_doc_bytes(&self) -> Vec<u8> {
        ProtoWriter::new()
            .bytes(1, &self.body_bytes())
            .bytes(2, &self.auth_info_bytes())
            .string(3, &self.chain_id)
            .uint64(4, self.account_number)
            .finish()
    }

    /// The single digest to sign: SHA-256 of the `SignDoc`.
    pub fn signing_hash(&self) -> [u8; 32] {
        sha256(&self.sign_doc_bytes())
    }

    /// Verifies a 64-byte `r || s` signature and produces the broadcast
    /// envelope.
    pub fn compile(&self, signature: &[u8]) -> Result<SignedCosmosTransaction, CosmosError> {
        let hash = self.signing_hash();
        let sig = verify_signature(&self.public_key, &hash, signature)?;

        let tx_raw = ProtoWriter::new()
            .bytes(1, &self.body_bytes())
            .bytes(2, &self.auth_info_bytes())
            .bytes(3, &sig.to_bytes())
            .finish();

        let envelope = BroadcastEnvelope {
            mode: BROADCAST_MODE_SYNC.into(),
            tx_bytes: BASE64.encode(&tx_raw),
        };
        let raw = serde_json::to_string(&envelope)
            .map_err(|e| CosmosError::DecodeError(e.to_string()))?;
        let tx_hash = tx_hash_from_envelope(&raw)?;
        debug!(chain_id = %self.chain_id, %tx_hash, "compiled cosmos transaction");
        Ok(SignedCosmosTransaction { raw, tx_hash })
    }
}

/// Verifies `r || s` over a prehashed digest. High-S signatures are
/// normalized first; the normalized form is returned.
pub fn verify_signature(
    public_key: &[u8],
    hash: &[u8; 32],
    signature: &[u8],
) -> Result<Signature, CosmosError> {
    let key = VerifyingKey::from_sec1_bytes(public_key)
        .map_err(|e| CosmosError::InvalidPublicKey(e.to_string()))?;
    let sig = Signature::from_slice(signature)
        .map_err(|e| CosmosError::InvalidSignature(e.to_string()))?;
    let sig = sig.normalize_s().unwrap_or(sig);
    key.verify_prehash(hash, &sig)
        .map_err(|_| CosmosError::SignatureVerificationFailed)?;
    Ok(sig)
}

/// Recomputes the transaction hash from a broadcast envelope.
pub fn tx_hash_from_envelope(raw: &str) -> Result<String, CosmosError> {
    let envelope: BroadcastEnvelope =
        serde_json::from_str(raw).map_err(|e| CosmosError::DecodeError(e.to_string()))?;
    let tx_bytes = BASE64
        .decode(envelope.tx_bytes)
        .map_err(|e| CosmosError::DecodeError(e.to_string()))?;
    Ok(hex::encode_upper(sha256(&tx_bytes)))
}

/// Contents of a decoded `TxRaw`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedTx {
    pub messages: Vec<CosmosMsg>,
    pub memo: String,
    pub public_key: Vec<u8>,
    pub sequence: u64,
    pub fee: Fee,
    pub signatures: Vec<Vec<u8>>,
}

/// Decodes `TxRaw` bytes.
pub fn decode_tx_raw(tx_raw: &[u8]) -> Result<DecodedTx, CosmosError> {
    let mut decoded = DecodedTx {
        messages: Vec::new(),
        memo: String::new(),
        public_key: Vec::new(),
        sequence: 0,
        fee: Fee {
            amount: Vec::new(),
            gas_limit: 0,
        },
        signatures: Vec::new(),
    };

    for (field, value) in ProtoReader::new(tx_raw).fields()? {
        match field {
            1 => {
                for (f, v) in ProtoReader::new(value.as_bytes()?).fields()? {
                    match f {
                        1 => decoded.messages.push(CosmosMsg::from_any(v.as_bytes()?)?),
                        2 => decoded.memo = v.as_str()?.to_string(),
                        _ => {}
                    }
                }
            }
            2 => decode_auth_info(value.as_bytes()?, &mut decoded)?,
            3 => decoded.signatures.push(value.as_bytes()?.to_vec()),
            _ => {}
        }
    }
    Ok(decoded)
}

/// Decodes the `tx_bytes` of a broadcast envelope.
pub fn decode_envelope(raw: &str) -> Result<DecodedTx, CosmosError> {
    let envelope: BroadcastEnvelope =
        serde_json::from_str(raw).map_err(|e| CosmosError::DecodeError(e.to_string()))?;
    let tx_bytes = BASE64
        .decode(envelope.tx_bytes)
        .map_err(|e| CosmosError::DecodeError(e.to_string()))?;
    decode_tx_raw(&tx_bytes)
}

fn decode_auth_info(buf: &[u8], out: &mut DecodedTx) -> Result<(), CosmosError> {
    for (field, value) in ProtoReader::new(buf).fields()? {
        match field {
            1 => {
                for (f, v) in ProtoReader::new(value.as_bytes()?).fields()? {
                    match f {
                        1 => {
                            let any = v.as_bytes()?;
                            if let Some(key_msg) = crypto_utils::proto::find_field(any, 2)? {
                                if let Some(key) =
                                    crypto_utils::proto::find_field(key_msg.as_bytes()?, 1)?
                                {
                                    out.public_key = key.as_bytes()?.to_vec();
                                }
                            }
                        }
                        3 => out.sequence = v.as_u64()?,
                        _ => {}
                    }
                }
            }
            2 => out.fee = Fee::decode(value.as_bytes()?)?,
            _ => {}
        }
    }
    Ok(())
}
