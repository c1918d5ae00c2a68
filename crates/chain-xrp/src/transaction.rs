//! Canonical `Payment` serialization and signing.

use crypto_utils::hash::sha512_half;
use k256::ecdsa::signature::hazmat::PrehashVerifier;
use k256::ecdsa::{Signature, VerifyingKey};
use tracing::debug;

use crate::address::AccountId;
use crate::codec::{
    decode_native_amount, encode_native_amount, read_array, read_field_id, read_u8, read_vl,
    write_field_id, write_vl, ARRAY_END, OBJECT_END, TYPE_ACCOUNT, TYPE_AMOUNT, TYPE_ARRAY,
    TYPE_BLOB, TYPE_OBJECT, TYPE_UINT16, TYPE_UINT32,
};
use crate::error::XrpError;

/// Prefix of single-signed transaction signing data (`STX\0`).
pub const SIGNING_PREFIX: [u8; 4] = [0x53, 0x54, 0x58, 0x00];

const PAYMENT_TYPE: u16 = 0;

// (type, field) pairs
const TRANSACTION_TYPE: (u8, u8) = (TYPE_UINT16, 2);
const FLAGS: (u8, u8) = (TYPE_UINT32, 2);
const SEQUENCE: (u8, u8) = (TYPE_UINT32, 4);
const DESTINATION_TAG: (u8, u8) = (TYPE_UINT32, 14);
const LAST_LEDGER_SEQUENCE: (u8, u8) = (TYPE_UINT32, 27);
const AMOUNT: (u8, u8) = (TYPE_AMOUNT, 1);
const FEE: (u8, u8) = (TYPE_AMOUNT, 8);
const SIGNING_PUB_KEY: (u8, u8) = (TYPE_BLOB, 3);
const TXN_SIGNATURE: (u8, u8) = (TYPE_BLOB, 4);
const MEMO_DATA: (u8, u8) = (TYPE_BLOB, 13);
const ACCOUNT: (u8, u8) = (TYPE_ACCOUNT, 1);
const DESTINATION: (u8, u8) = (TYPE_ACCOUNT, 3);
const MEMO: (u8, u8) = (TYPE_OBJECT, 10);
const MEMOS: (u8, u8) = (TYPE_ARRAY, 9);

/// How a free-form memo is attached to a payment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PaymentMemo {
    None,
    DestinationTag(u32),
    MemoData(Vec<u8>),
}

impl PaymentMemo {
    /// A memo that parses as `u32` is a destination tag; any other
    /// non-empty memo is carried as UTF-8 `MemoData`.
    pub fn from_memo(memo: Option<&str>) -> Self {
        match memo {
            None | Some("") => PaymentMemo::None,
            Some(text) => match text.parse::<u32>() {
                Ok(tag) => PaymentMemo::DestinationTag(tag),
                Err(_) => PaymentMemo::MemoData(text.as_bytes().to_vec()),
            },
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Payment {
    pub account: AccountId,
    pub destination: AccountId,
    /// Drops.
    pub amount: u64,
    /// Drops.
    pub fee: u64,
    pub sequence: u32,
    pub last_ledger_sequence: u32,
    pub flags: u32,
    pub memo: PaymentMemo,
    /// Compressed secp256k1 key of the signer.
    pub signing_pub_key: Vec<u8>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignedXrpTransaction {
    /// Hex of the signed blob.
    pub raw: String,
}

fn field(out: &mut Vec<u8>, (type_code, field_code): (u8, u8)) {
    write_field_id(out, type_code, field_code);
}

impl Payment {
    /// Canonical field order: type code, then field code.
    fn serialize(&self, signature: Option<&[u8]>) -> Result<Vec<u8>, XrpError> {
        let mut out = Vec::with_capacity(256);

        field(&mut out, TRANSACTION_TYPE);
        out.extend_from_slice(&PAYMENT_TYPE.to_be_bytes());
        field(&mut out, FLAGS);
        out.extend_from_slice(&self.flags.to_be_bytes());
        field(&mut out, SEQUENCE);
        out.extend_from_slice(&self.sequence.to_be_bytes());
        if let PaymentMemo::DestinationTag(tag) = self.memo {
            field(&mut out, DESTINATION_TAG);
            out.extend_from_slice(&tag.to_be_bytes());
        }
        if self.last_ledger_sequence > 0 {
            field(&mut out, LAST_LEDGER_SEQUENCE);
            out.extend_from_slice(&self.last_ledger_sequence.to_be_bytes());
        }
        field(&mut out, AMOUNT);
        out.extend_from_slice(&encode_native_amount(self.amount)?);
        field(&mut out, FEE);
        out.extend_from_slice(&encode_native_amount(self.fee)?);
        field(&mut out, SIGNING_PUB_KEY);
        write_vl(&mut out, &self.signing_pub_key)?;
        if let Some(signature) = signature {
            field(&mut out, TXN_SIGNATURE);
            write_vl(&mut out, signature)?;
        }
        field(&mut out, ACCOUNT);
        write_vl(&mut out, &self.account)?;
        field(&mut out, DESTINATION);
        write_vl(&mut out, &self.destination)?;
        if let PaymentMemo::MemoData(data) = &self.memo {
            field(&mut out, MEMOS);
            field(&mut out, MEMO);
            field(&mut out, MEMO_DATA);
            write_vl(&mut out, data)?;
            out.push(OBJECT_END);
            out.push(ARRAY_END);
        }
        Ok(out)
    }

    /// SHA-512Half of `STX\0` followed by the unsigned serialization.
    pub fn signing_hash(&self) -> Result<[u8; 32], XrpError> {
        let mut data = SIGNING_PREFIX.to_vec();
        data.extend_from_slice(&self.serialize(None)?);
        Ok(sha512_half(&data))
    }

    /// Verifies a DER signature against `signing_pub_key` and emits the
    /// signed blob carrying its low-S DER form.
    pub fn compile(&self, der_signature: &[u8]) -> Result<SignedXrpTransaction, XrpError> {
        let hash = self.signing_hash()?;
        let key = VerifyingKey::from_sec1_bytes(&self.signing_pub_key)
            .map_err(|e| XrpError::InvalidPublicKey(e.to_string()))?;
        let sig = Signature::from_der(der_signature)
            .map_err(|e| XrpError::InvalidSignature(e.to_string()))?;
        let sig = sig.normalize_s().unwrap_or(sig);
        key.verify_prehash(&hash, &sig)
            .map_err(|_| XrpError::SignatureVerificationFailed)?;

        let blob = self.serialize(Some(sig.to_der().as_bytes()))?;
        debug!(bytes = blob.len(), "compiled xrp payment");
        Ok(SignedXrpTransaction {
            raw: hex::encode(blob),
        })
    }

    /// Decodes a (signed or unsigned) payment blob.
    pub fn decode(blob: &[u8]) -> Result<(Self, Option<Vec<u8>>), XrpError> {
        let mut buf = blob;
        let mut payment = Payment {
            account: [0; 20],
            destination: [0; 20],
            amount: 0,
            fee: 0,
            sequence: 0,
            last_ledger_sequence: 0,
            flags: 0,
            memo: PaymentMemo::None,
            signing_pub_key: Vec::new(),
        };
        let mut signature = None;

        while !buf.is_empty() {
            let id = read_field_id(&mut buf)?;
            match id {
                TRANSACTION_TYPE => {
                    let kind = u16::from_be_bytes(read_array(&mut buf)?);
                    if kind != PAYMENT_TYPE {
                        return Err(XrpError::DecodeError(format!(
                            "unsupported transaction type {kind}"
                        )));
                    }
                }
                FLAGS => payment.flags = u32::from_be_bytes(read_array(&mut buf)?),
                SEQUENCE => payment.sequence = u32::from_be_bytes(read_array(&mut buf)?),
                DESTINATION_TAG => {
                    payment.memo =
                        PaymentMemo::DestinationTag(u32::from_be_bytes(read_array(&mut buf)?))
                }
                LAST_LEDGER_SEQUENCE => {
                    payment.last_ledger_sequence = u32::from_be_bytes(read_array(&mut buf)?)
                }
                AMOUNT => payment.amount = decode_native_amount(&read_array(&mut buf)?)?,
                FEE => payment.fee = decode_native_amount(&read_array(&mut buf)?)?,
                SIGNING_PUB_KEY => payment.signing_pub_key = read_vl(&mut buf)?.to_vec(),
                TXN_SIGNATURE => signature = Some(read_vl(&mut buf)?.to_vec()),
                ACCOUNT => payment.account = account_field(read_vl(&mut buf)?)?,
                DESTINATION => payment.destination = account_field(read_vl(&mut buf)?)?,
                MEMOS => payment.memo = PaymentMemo::MemoData(decode_memos(&mut buf)?),
                (t, f) => {
                    return Err(XrpError::DecodeError(format!(
                        "unsupported field ({t}, {f})"
                    )))
                }
            }
        }
        Ok((payment, signature))
    }
}

fn account_field(bytes: &[u8]) -> Result<AccountId, XrpError> {
    bytes
        .try_into()
        .map_err(|_| XrpError::DecodeError(format!("account of {} bytes", bytes.len())))
}

fn decode_memos(buf: &mut &[u8]) -> Result<Vec<u8>, XrpError> {
    let mut data = Vec::new();
    loop {
        match buf.first() {
            Some(&ARRAY_END) => {
                read_u8(buf)?;
                return Ok(data);
            }
            Some(&OBJECT_END) => {
                read_u8(buf)?;
            }
            Some(_) => match read_field_id(buf)? {
                MEMO => {}
                MEMO_DATA => data = read_vl(buf)?.to_vec(),
                (t, f) => {
                    return Err(XrpError::DecodeError(format!(
                        "unsupported memo field ({t}, {f})"
                    )))
                }
            },
            None => return Err(XrpError::DecodeError("unterminated memos".into())),
        }
    }
}
