//! `Transaction.raw` protobuf encoding, block references and compiled JSON.

use crypto_utils::bytes::left_pad;
use crypto_utils::hash::sha256;
use crypto_utils::proto::{ProtoReader, ProtoWriter};
use k256::ecdsa::signature::hazmat::PrehashVerifier;
use k256::ecdsa::{RecoveryId, Signature, VerifyingKey};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::address::{decompress_pubkey, TronAddress};
use crate::error::TronError;

pub const TRANSFER_CONTRACT_URL: &str = "type.googleapis.com/protocol.TransferContract";
pub const TRIGGER_SMART_CONTRACT_URL: &str = "type.googleapis.com/protocol.TriggerSmartContract";

const TRANSFER_CONTRACT_TYPE: u64 = 1;
const TRIGGER_SMART_CONTRACT_TYPE: u64 = 31;

const TRC20_TRANSFER_SELECTOR: [u8; 4] = [0xa9, 0x05, 0x9c, 0xbb];

/// Snapshot of the reference block header (`BlockHeader.raw`).
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct BlockHeader {
    pub timestamp: i64,
    pub number: i64,
    pub version: i32,
    pub tx_trie_root: Vec<u8>,
    pub parent_hash: Vec<u8>,
    pub witness_address: Vec<u8>,
}

impl BlockHeader {
    pub fn raw_bytes(&self) -> Vec<u8> {
        ProtoWriter::new()
            .int64(1, self.timestamp)
            .bytes(2, &self.tx_trie_root)
            .bytes(3, &self.parent_hash)
            .int64(7, self.number)
            .bytes(9, &self.witness_address)
            .int64(10, i64::from(self.version))
            .finish()
    }

    /// SHA-256 of the raw header with the first 8 bytes replaced by the
    /// big-endian block number.
    pub fn block_id(&self) -> [u8; 32] {
        let mut id = sha256(&self.raw_bytes());
        id[..8].copy_from_slice(&self.number.to_be_bytes());
        id
    }

    /// Bytes 6..8 of the big-endian block number.
    pub fn ref_block_bytes(&self) -> [u8; 2] {
        let number = self.number.to_be_bytes();
        [number[6], number[7]]
    }

    /// Bytes 8..16 of the block id.
    pub fn ref_block_hash(&self) -> [u8; 8] {
        let id = self.block_id();
        let mut out = [0u8; 8];
        out.copy_from_slice(&id[8..16]);
        out
    }
}

/// The single contract carried by a transaction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TronContract {
    Transfer {
        owner: TronAddress,
        to: TronAddress,
        amount: i64,
    },
    TriggerSmartContract {
        owner: TronAddress,
        contract: TronAddress,
        call_value: i64,
        data: Vec<u8>,
    },
}

impl TronContract {
    /// TRC20 `transfer(address,uint256)` call. `amount` is big-endian.
    pub fn trc20_transfer(
        owner: TronAddress,
        contract: TronAddress,
        to: &TronAddress,
        amount: &[u8],
    ) -> Result<Self, TronError> {
        let amount: [u8; 32] = left_pad(amount)?;
        let mut data = Vec::with_capacity(4 + 64);
        data.extend_from_slice(&TRC20_TRANSFER_SELECTOR);
        data.extend_from_slice(&[0u8; 12]);
        data.extend_from_slice(&to[1..]);
        data.extend_from_slice(&amount);
        Ok(TronContract::TriggerSmartContract {
            owner,
            contract,
            call_value: 0,
            data,
        })
    }

    fn encode(&self) -> Vec<u8> {
        let (kind, url, value) = match self {
            TronContract::Transfer { owner, to, amount } => (
                TRANSFER_CONTRACT_TYPE,
                TRANSFER_CONTRACT_URL,
                ProtoWriter::new()
                    .bytes(1, owner)
                    .bytes(2, to)
                    .int64(3, *amount)
                    .finish(),
            ),
            TronContract::TriggerSmartContract {
                owner,
                contract,
                call_value,
                data,
            } => (
                TRIGGER_SMART_CONTRACT_TYPE,
                TRIGGER_SMART_CONTRACT_URL,
                ProtoWriter::new()
                    .bytes(1, owner)
                    .bytes(2, contract)
                    .int64(3, *call_value)
                    .bytes(4, data)
                    .finish(),
            ),
        };
        let parameter = ProtoWriter::new().string(1, url).bytes(2, &value).finish();
        ProtoWriter::new()
            .uint64(1, kind)
            .message(2, &parameter)
            .finish()
    }

    fn decode(buf: &[u8]) -> Result<Self, TronError> {
        let mut kind = 0;
        let mut value: &[u8] = &[];
        for (field, v) in ProtoReader::new(buf).fields()? {
            match field {
                1 => kind = v.as_u64()?,
                2 => {
                    if let Some(inner) = crypto_utils::proto::find_field(v.as_bytes()?, 2)? {
                        value = inner.as_bytes()?;
                    }
                }
                _ => {}
            }
        }

        let mut owner = [0u8; 21];
        let mut target = [0u8; 21];
        let mut amount = 0i64;
        let mut data = Vec::new();
        for (field, v) in ProtoReader::new(value).fields()? {
            match field {
                1 => owner = address_field(v.as_bytes()?)?,
                2 => target = address_field(v.as_bytes()?)?,
                3 => amount = v.as_u64()? as i64,
                4 => data = v.as_bytes()?.to_vec(),
                _ => {}
            }
        }

        match kind {
            TRANSFER_CONTRACT_TYPE => Ok(TronContract::Transfer {
                owner,
                to: target,
                amount,
            }),
            TRIGGER_SMART_CONTRACT_TYPE => Ok(TronContract::TriggerSmartContract {
                owner,
                contract: target,
                call_value: amount,
                data,
            }),
            other => Err(TronError::DecodeError(format!(
                "unsupported contract type {other}"
            ))),
        }
    }
}

fn address_field(bytes: &[u8]) -> Result<TronAddress, TronError> {
    bytes
        .try_into()
        .map_err(|_| TronError::DecodeError(format!("address of {} bytes", bytes.len())))
}

/// Unsigned `Transaction.raw`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TronTransaction {
    pub ref_block_bytes: [u8; 2],
    pub ref_block_hash: [u8; 8],
    pub expiration: i64,
    pub memo: String,
    pub contract: TronContract,
    pub timestamp: i64,
    pub fee_limit: i64,
}

/// Broadcast-ready output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignedTronTransaction {
    /// `{"raw_data_hex":..,"signature":[..],"txID":..}`
    pub raw: String,
    pub tx_id: String,
}

#[derive(Debug, Serialize, Deserialize)]
struct TransactionJson {
    raw_data_hex: String,
    signature: Vec<String>,
    #[serde(rename = "txID")]
    tx_id: String,
}

impl TronTransaction {
    pub fn new(
        header: &BlockHeader,
        contract: TronContract,
        timestamp: i64,
        expiration: i64,
        fee_limit: i64,
        memo: &str,
    ) -> Self {
        Self {
            ref_block_bytes: header.ref_block_bytes(),
            ref_block_hash: header.ref_block_hash(),
            expiration,
            memo: memo.to_string(),
            contract,
            timestamp,
            fee_limit,
        }
    }

    pub fn raw_data_bytes(&self) -> Vec<u8> {
        ProtoWriter::new()
            .bytes(1, &self.ref_block_bytes)
            .bytes(4, &self.ref_block_hash)
            .int64(8, self.expiration)
            .string(10, &self.memo)
            .message(11, &self.contract.encode())
            .int64(14, self.timestamp)
            .int64(18, self.fee_limit)
            .finish()
    }

    /// SHA-256 of `raw_data`; also the transaction id.
    pub fn signing_hash(&self) -> [u8; 32] {
        sha256(&self.raw_data_bytes())
    }

    /// Verifies `r || s` against the uncompressed form of `public_key`,
    /// recomputes the recovery id and emits the node JSON.
    pub fn compile(
        &self,
        public_key: &[u8],
        signature: &[u8],
    ) -> Result<SignedTronTransaction, TronError> {
        let hash = self.signing_hash();
        let uncompressed = decompress_pubkey(public_key)?;
        let key = VerifyingKey::from_sec1_bytes(&uncompressed)
            .map_err(|e| TronError::InvalidPublicKey(e.to_string()))?;
        let rs = signature
            .get(..64)
            .ok_or_else(|| TronError::InvalidSignature(format!("{} bytes", signature.len())))?;
        let sig =
            Signature::from_slice(rs).map_err(|e| TronError::InvalidSignature(e.to_string()))?;
        let sig = sig.normalize_s().unwrap_or(sig);
        key.verify_prehash(&hash, &sig)
            .map_err(|_| TronError::SignatureVerificationFailed)?;
        let recovery_id = RecoveryId::trial_recovery_from_prehash(&key, &hash, &sig)
            .map_err(|_| TronError::SignatureVerificationFailed)?;

        let mut full = sig.to_bytes().to_vec();
        full.push(recovery_id.to_byte());

        let tx_id = hex::encode(hash);
        let json = TransactionJson {
            raw_data_hex: hex::encode(self.raw_data_bytes()),
            signature: vec![hex::encode(full)],
            tx_id: tx_id.clone(),
        };
        let raw =
            serde_json::to_string(&json).map_err(|e| TronError::DecodeError(e.to_string()))?;
        debug!(%tx_id, "compiled tron transaction");
        Ok(SignedTronTransaction { raw, tx_id })
    }

    /// Decodes `raw_data` bytes.
    pub fn decode(raw_data: &[u8]) -> Result<Self, TronError> {
        let mut ref_block_bytes = [0u8; 2];
        let mut ref_block_hash = [0u8; 8];
        let mut expiration = 0;
        let mut memo = String::new();
        let mut contract = None;
        let mut timestamp = 0;
        let mut fee_limit = 0;

        for (field, value) in ProtoReader::new(raw_data).fields()? {
            match field {
                1 => ref_block_bytes = fixed(value.as_bytes()?)?,
                4 => ref_block_hash = fixed(value.as_bytes()?)?,
                8 => expiration = value.as_u64()? as i64,
                10 => memo = value.as_str()?.to_string(),
                11 => contract = Some(TronContract::decode(value.as_bytes()?)?),
                14 => timestamp = value.as_u64()? as i64,
                18 => fee_limit = value.as_u64()? as i64,
                _ => {}
            }
        }

        Ok(Self {
            ref_block_bytes,
            ref_block_hash,
            expiration,
            memo,
            contract: contract
                .ok_or_else(|| TronError::DecodeError("transaction without contract".into()))?,
            timestamp,
            fee_limit,
        })
    }
}

fn fixed<const N: usize>(bytes: &[u8]) -> Result<[u8; N], TronError> {
    bytes
        .try_into()
        .map_err(|_| TronError::DecodeError(format!("expected {N} bytes, got {}", bytes.len())))
}

/// Parses compiled JSON back into the transaction and its signatures.
pub fn decode_json(raw: &str) -> Result<(TronTransaction, Vec<Vec<u8>>, String), TronError> {
    let json: TransactionJson =
        serde_json::from_str(raw).map_err(|e| TronError::DecodeError(e.to_string()))?;
    let raw_data = hex::decode(&json.raw_data_hex)
        .map_err(|e| TronError::DecodeError(format!("raw_data_hex: {e}")))?;
    let signatures = json
        .signature
        .iter()
        .map(|s| hex::decode(s).map_err(|e| TronError::DecodeError(format!("signature: {e}"))))
        .collect::<Result<Vec<_>, _>>()?;
    Ok((TronTransaction::decode(&raw_data)?, signatures, json.tx_id))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::address::{parse_address, pubkey_to_address_bytes};
    use k256::ecdsa::SigningKey;

    fn header() -> BlockHeader {
        BlockHeader {
            timestamp: 1_700_000_000_000,
            number: 56_789_012,
            version: 30,
            tx_trie_root: vec![0x11; 32],
            parent_hash: vec![0x22; 32],
            witness_address: hex::decode("41f16412b9a17ee9408646e2a21e16478f72ed1e95").unwrap(),
        }
    }

    fn signer() -> SigningKey {
        SigningKey::from_slice(&[0x24; 32]).unwrap()
    }

    fn owner() -> TronAddress {
        let pubkey = signer().verifying_key().to_encoded_point(true);
        pubkey_to_address_bytes(pubkey.as_bytes()).unwrap()
    }

    fn native(amount: i64) -> TronTransaction {
        let to = parse_address("TR7NHqjeKQxGTCi8q8ZY4pL8otSzgjLj6t").unwrap();
        TronTransaction::new(
            &header(),
            TronContract::Transfer {
                owner: owner(),
                to,
                amount,
            },
            1_700_000_001_000,
            1_700_000_061_000,
            0,
            "",
        )
    }

    #[test]
    fn block_reference() {
        let header = header();
        let number = 56_789_012i64.to_be_bytes();
        assert_eq!(header.ref_block_bytes(), [number[6], number[7]]);
        let id = header.block_id();
        assert_eq!(&id[..8], &number);
        assert_eq!(&header.ref_block_hash(), &id[8..16]);
    }

    #[test]
    fn trc20_calldata() {
        let to = parse_address("TR7NHqjeKQxGTCi8q8ZY4pL8otSzgjLj6t").unwrap();
        let contract =
            TronContract::trc20_transfer(owner(), to, &to, &1_000_000u64.to_be_bytes()).unwrap();
        let TronContract::TriggerSmartContract { data, call_value, .. } = contract else {
            panic!("expected trigger smart contract");
        };
        assert_eq!(call_value, 0);
        assert_eq!(data.len(), 68);
        assert_eq!(&data[..4], &TRC20_TRANSFER_SELECTOR);
        assert_eq!(&data[16..36], &to[1..]);
        assert_eq!(&data[60..], &1_000_000u64.to_be_bytes());
    }

    #[test]
    fn raw_data_decodes() {
        let tx = TronTransaction {
            memo: "hi".into(),
            fee_limit: 800_000,
            ..native(5_000_000)
        };
        assert_eq!(TronTransaction::decode(&tx.raw_data_bytes()).unwrap(), tx);
    }

    #[test]
    fn compile_emits_json_with_recovery_byte() {
        let tx = native(1_000_000);
        let (sig, recid) = signer().sign_prehash_recoverable(&tx.signing_hash()).unwrap();
        let pubkey = signer().verifying_key().to_encoded_point(true);

        let signed = tx.compile(pubkey.as_bytes(), &sig.to_bytes()).unwrap();
        assert_eq!(signed.tx_id, hex::encode(tx.signing_hash()));

        let json: serde_json::Value = serde_json::from_str(&signed.raw).unwrap();
        assert_eq!(json["txID"], signed.tx_id.as_str());
        let sig_hex = json["signature"][0].as_str().unwrap();
        assert_eq!(sig_hex.len(), 130);
        assert_eq!(&sig_hex[128..], format!("{:02x}", recid.to_byte()));

        let (decoded, signatures, tx_id) = decode_json(&signed.raw).unwrap();
        assert_eq!(decoded, tx);
        assert_eq!(signatures.len(), 1);
        assert_eq!(tx_id, signed.tx_id);
    }

    #[test]
    fn stale_signature_rejected() {
        let (sig, _) = signer()
            .sign_prehash_recoverable(&native(1).signing_hash())
            .unwrap();
        let pubkey = signer().verifying_key().to_encoded_point(false);
        assert!(matches!(
            native(2).compile(pubkey.as_bytes(), &sig.to_bytes()),
            Err(TronError::SignatureVerificationFailed)
        ));
    }

    proptest::proptest! {
        #[test]
        fn raw_data_survives_decode(
            amount in 0i64..i64::MAX,
            fee_limit in 0i64..1_000_000_000_000,
            expiration in 0i64..4_000_000_000_000,
            memo in "[ -~]{0,64}",
            data in proptest::collection::vec(proptest::prelude::any::<u8>(), 0..100),
            trc20: bool,
        ) {
            let to = parse_address("TR7NHqjeKQxGTCi8q8ZY4pL8otSzgjLj6t").unwrap();
            let contract = if trc20 {
                TronContract::TriggerSmartContract {
                    owner: owner(),
                    contract: to,
                    call_value: amount,
                    data,
                }
            } else {
                TronContract::Transfer { owner: owner(), to, amount }
            };
            let tx = TronTransaction::new(
                &header(),
                contract,
                1_700_000_001_000,
                expiration,
                fee_limit,
                &memo,
            );
            proptest::prop_assert_eq!(TronTransaction::decode(&tx.raw_data_bytes()).unwrap(), tx);
        }
    }
}
