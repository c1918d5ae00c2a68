//! Parsing and patching of already-serialized transactions.
//!
//! Aggregator swaps arrive as a base64 wire transaction built by a third
//! party. Only the recent blockhash is replaced before signing, and our
//! signature is written into the slot of the matching signer. Both legacy
//! and v0 (`0x80` prefixed) messages are accepted.

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;

use crate::address::pubkey_to_address;
use crate::compute_budget::COMPUTE_BUDGET_PROGRAM_ID;
use crate::error::SolError;
use crate::spl_token::{ASSOCIATED_TOKEN_PROGRAM_ID, TOKEN_PROGRAM_ID};
use crate::transaction::{
    decode_compact_u16, encode_wire, verify_ed25519, CompiledInstruction, SignedSolTransaction,
    MEMO_PROGRAM_ID, SYSTEM_PROGRAM_ID,
};

const VERSION_PREFIX_MASK: u8 = 0x80;

/// A wire transaction split into its signature slots and message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawTransaction {
    pub signatures: Vec<[u8; 64]>,
    pub message: Vec<u8>,
}

/// Parsed view of a message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MessageLayout {
    /// `None` for legacy messages.
    pub version: Option<u8>,
    pub num_required_signatures: u8,
    pub num_readonly_signed: u8,
    pub num_readonly_unsigned: u8,
    /// Static account keys only; v0 lookup-table accounts are not resolved.
    pub account_keys: Vec<[u8; 32]>,
    pub recent_blockhash: [u8; 32],
    /// Offset of the blockhash inside the message bytes.
    pub blockhash_offset: usize,
    pub instructions: Vec<CompiledInstruction>,
}

/// Human-oriented summary of one instruction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstructionSummary {
    pub program_id: String,
    pub program_name: Option<&'static str>,
    pub instruction_type: Option<String>,
    pub accounts_count: usize,
    pub data_len: usize,
}

struct Cursor<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> Cursor<'a> {
    fn take(&mut self, n: usize) -> Result<&'a [u8], SolError> {
        let end = self.pos.checked_add(n).filter(|&end| end <= self.data.len());
        let end = end.ok_or_else(|| {
            SolError::SerializationError(format!("truncated message at offset {}", self.pos))
        })?;
        let slice = &self.data[self.pos..end];
        self.pos = end;
        Ok(slice)
    }

    fn byte(&mut self) -> Result<u8, SolError> {
        Ok(self.take(1)?[0])
    }

    fn compact(&mut self) -> Result<usize, SolError> {
        let (value, used) = decode_compact_u16(&self.data[self.pos.min(self.data.len())..])?;
        self.pos += used;
        Ok(value as usize)
    }

    fn key(&mut self) -> Result<[u8; 32], SolError> {
        let mut key = [0u8; 32];
        key.copy_from_slice(self.take(32)?);
        Ok(key)
    }
}

impl RawTransaction {
    pub fn parse(wire: &[u8]) -> Result<Self, SolError> {
        let mut cursor = Cursor { data: wire, pos: 0 };
        let count = cursor.compact()?;
        let mut signatures = Vec::with_capacity(count);
        for _ in 0..count {
            let mut sig = [0u8; 64];
            sig.copy_from_slice(cursor.take(64)?);
            signatures.push(sig);
        }
        let message = wire[cursor.pos..].to_vec();
        if message.is_empty() {
            return Err(SolError::SerializationError("missing message".into()));
        }
        Ok(Self {
            signatures,
            message,
        })
    }

    pub fn from_base64(encoded: &str) -> Result<Self, SolError> {
        let wire = BASE64
            .decode(encoded.trim())
            .map_err(|e| SolError::SerializationError(format!("invalid base64: {e}")))?;
        Self::parse(&wire)
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        encode_wire(&self.signatures, &self.message)
    }

    pub fn layout(&self) -> Result<MessageLayout, SolError> {
        parse_message(&self.message)
    }

    /// Replaces the recent blockhash, keeping every other byte intact.
    pub fn set_recent_blockhash(&mut self, blockhash: &[u8; 32]) -> Result<(), SolError> {
        let offset = self.layout()?.blockhash_offset;
        self.message[offset..offset + 32].copy_from_slice(blockhash);
        Ok(())
    }

    /// Verifies `signature` over the message and places it in the slot of
    /// the signer whose key is `pubkey`.
    pub fn apply_signature(&mut self, pubkey: &[u8; 32], signature: &[u8]) -> Result<(), SolError> {
        let layout = self.layout()?;
        let signers = (layout.num_required_signatures as usize).min(layout.account_keys.len());
        let slot = layout.account_keys[..signers]
            .iter()
            .position(|k| k == pubkey)
            .ok_or_else(|| {
                SolError::InvalidPublicKey("key is not a signer of this transaction".into())
            })?;

        if self.signatures.len() != layout.num_required_signatures as usize {
            return Err(SolError::SerializationError(format!(
                "{} signature slots for {} required signers",
                self.signatures.len(),
                layout.num_required_signatures
            )));
        }

        self.signatures[slot] = verify_ed25519(pubkey, &self.message, signature)?;
        Ok(())
    }

    pub fn to_signed(&self) -> SignedSolTransaction {
        SignedSolTransaction::from_wire(&self.to_bytes())
    }

    /// Summaries of every instruction, naming well-known programs.
    pub fn describe_instructions(&self) -> Result<Vec<InstructionSummary>, SolError> {
        let layout = self.layout()?;
        Ok(layout
            .instructions
            .iter()
            .map(|ix| {
                let program = layout.account_keys.get(ix.program_id_index as usize);
                InstructionSummary {
                    program_id: program
                        .map(pubkey_to_address)
                        .unwrap_or_else(|| "unknown".to_string()),
                    program_name: program.and_then(program_name),
                    instruction_type: program.and_then(|p| instruction_type(p, &ix.data)),
                    accounts_count: ix.account_indices.len(),
                    data_len: ix.data.len(),
                }
            })
            .collect())
    }
}

/// Parses a legacy or v0 message.
pub fn parse_message(message: &[u8]) -> Result<MessageLayout, SolError> {
    let mut cursor = Cursor {
        data: message,
        pos: 0,
    };

    let first = cursor.byte()?;
    let (version, num_required_signatures) = if first & VERSION_PREFIX_MASK != 0 {
        let version = first & !VERSION_PREFIX_MASK;
        if version != 0 {
            return Err(SolError::SerializationError(format!(
                "unsupported message version {version}"
            )));
        }
        (Some(version), cursor.byte()?)
    } else {
        (None, first)
    };
    let num_readonly_signed = cursor.byte()?;
    let num_readonly_unsigned = cursor.byte()?;

    let num_keys = cursor.compact()?;
    let mut account_keys = Vec::with_capacity(num_keys);
    for _ in 0..num_keys {
        account_keys.push(cursor.key()?);
    }

    let blockhash_offset = cursor.pos;
    let recent_blockhash = cursor.key()?;

    let num_instructions = cursor.compact()?;
    let mut instructions = Vec::with_capacity(num_instructions);
    for _ in 0..num_instructions {
        let program_id_index = cursor.byte()?;
        let n = cursor.compact()?;
        let account_indices = cursor.take(n)?.to_vec();
        let len = cursor.compact()?;
        let data = cursor.take(len)?.to_vec();
        instructions.push(CompiledInstruction {
            program_id_index,
            account_indices,
            data,
        });
    }

    if version.is_some() {
        let lookups = cursor.compact()?;
        for _ in 0..lookups {
            cursor.key()?;
            let writable = cursor.compact()?;
            cursor.take(writable)?;
            let readonly = cursor.compact()?;
            cursor.take(readonly)?;
        }
    }

    if cursor.pos != message.len() {
        return Err(SolError::SerializationError(format!(
            "{} trailing bytes after message",
            message.len() - cursor.pos
        )));
    }

    Ok(MessageLayout {
        version,
        num_required_signatures,
        num_readonly_signed,
        num_readonly_unsigned,
        account_keys,
        recent_blockhash,
        blockhash_offset,
        instructions,
    })
}

/// `TokenzQdBNbLqP5VEhdkAS6EPFLC1PHnBqCXEpPxuEb`
const TOKEN_2022_PROGRAM_ID: [u8; 32] = [
    0x06, 0xdd, 0xf6, 0xe1, 0xee, 0x75, 0x8f, 0xde, 0x18, 0x42, 0x5d, 0xbc, 0xe4, 0x6c, 0xcd,
    0xda, 0xb6, 0x1a, 0xfc, 0x4d, 0x83, 0xb9, 0x0d, 0x27, 0xfe, 0xbd, 0xf9, 0x28, 0xd8, 0xa1,
    0x8b, 0xfc,
];

fn program_name(program: &[u8; 32]) -> Option<&'static str> {
    match *program {
        SYSTEM_PROGRAM_ID => Some("System Program"),
        TOKEN_PROGRAM_ID => Some("Token Program"),
        TOKEN_2022_PROGRAM_ID => Some("Token-2022 Program"),
        ASSOCIATED_TOKEN_PROGRAM_ID => Some("Associated Token Program"),
        COMPUTE_BUDGET_PROGRAM_ID => Some("Compute Budget Program"),
        MEMO_PROGRAM_ID => Some("Memo Program"),
        _ => None,
    }
}

fn instruction_type(program: &[u8; 32], data: &[u8]) -> Option<String> {
    if *program == ASSOCIATED_TOKEN_PROGRAM_ID {
        return Some("Create Associated Token Account".into());
    }
    let discriminator = *data.first()?;
    let name = match *program {
        SYSTEM_PROGRAM_ID => match discriminator {
            0 => "Create Account".to_string(),
            2 => "Transfer".to_string(),
            3 => "Assign".to_string(),
            4 => "Create Account With Seed".to_string(),
            9 => "Transfer With Seed".to_string(),
            other => format!("System ({other})"),
        },
        TOKEN_PROGRAM_ID | TOKEN_2022_PROGRAM_ID => match discriminator {
            0 => "Initialize Mint".to_string(),
            1 => "Initialize Account".to_string(),
            3 => "Transfer".to_string(),
            7 => "Mint To".to_string(),
            8 => "Burn".to_string(),
            9 => "Close Account".to_string(),
            12 => "Transfer Checked".to_string(),
            other => format!("Token ({other})"),
        },
        COMPUTE_BUDGET_PROGRAM_ID => match discriminator {
            1 => "Request Heap Frame".to_string(),
            2 => "Set Compute Unit Limit".to_string(),
            3 => "Set Compute Unit Price".to_string(),
            other => format!("Compute Budget ({other})"),
        },
        _ => return None,
    };
    Some(name)
}
