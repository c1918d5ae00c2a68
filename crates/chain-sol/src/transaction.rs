//! Solana legacy message building, wire format and signature compilation.
//!
//! ```text
//! Transaction:
//!   num_signatures          compact-u16
//!   signatures              64 bytes * num_signatures
//!   message:
//!     num_required_sigs     u8
//!     num_readonly_signed   u8
//!     num_readonly_unsigned u8
//!     num_accounts          compact-u16
//!     account_keys          32 bytes * num_accounts
//!     recent_blockhash      32 bytes
//!     num_instructions      compact-u16
//!     instructions[]
//!
//! Instruction:
//!   program_id_index        u8
//!   num_accounts            compact-u16
//!   account_indices         u8 * num_accounts
//!   data_len                compact-u16
//!   data                    u8 * data_len
//! ```

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use ed25519_dalek::{Signature, Verifier, VerifyingKey};
use tracing::debug;

use crate::compute_budget::PriorityFee;
use crate::error::SolError;
use crate::spl_token;

/// The System Program: 32 zero bytes (`11111111111111111111111111111111`).
pub const SYSTEM_PROGRAM_ID: [u8; 32] = [0u8; 32];

/// `MemoSq4gqABAXKb96qnH8TysNcWxMyWCqXgDLGmfcHr`
pub const MEMO_PROGRAM_ID: [u8; 32] = [
    0x05, 0x4a, 0x53, 0x5a, 0x99, 0x29, 0x21, 0x06, 0x4d, 0x24, 0xe8, 0x71, 0x60, 0xda, 0x38,
    0x7c, 0x7c, 0x35, 0xb5, 0xdd, 0xbc, 0x92, 0xbb, 0x81, 0xe4, 0x1f, 0xa8, 0x40, 0x41, 0x05,
    0x44, 0x8d,
];

const SYSTEM_TRANSFER_IX_INDEX: u32 = 2;

// ---------------------------------------------------------------------------
// Compact-u16 encoding
// ---------------------------------------------------------------------------

/// Encodes a `u16` in Solana's compact-u16 (7 bits per byte) format.
pub fn encode_compact_u16(value: u16) -> Vec<u8> {
    let mut val = value as u32;
    let mut out = Vec::with_capacity(3);

    loop {
        let mut byte = (val & 0x7f) as u8;
        val >>= 7;
        if val > 0 {
            byte |= 0x80;
        }
        out.push(byte);
        if val == 0 {
            break;
        }
    }

    out
}

/// Decodes a compact-u16, returning `(value, bytes_consumed)`.
pub fn decode_compact_u16(data: &[u8]) -> Result<(u16, usize), SolError> {
    let mut value: u32 = 0;
    let mut consumed = 0usize;

    loop {
        let byte = *data.get(consumed).ok_or_else(|| {
            SolError::SerializationError(
                "unexpected end of data while decoding compact-u16".into(),
            )
        })?;
        value |= ((byte & 0x7f) as u32) << (7 * consumed);
        consumed += 1;

        if byte & 0x80 == 0 {
            break;
        }
        if consumed == 3 {
            return Err(SolError::SerializationError(
                "compact-u16 longer than 3 bytes".into(),
            ));
        }
    }

    u16::try_from(value)
        .map(|v| (v, consumed))
        .map_err(|_| SolError::SerializationError("compact-u16 value overflow".into()))
}

fn compact_len(len: usize, what: &str) -> Result<Vec<u8>, SolError> {
    u16::try_from(len)
        .map(encode_compact_u16)
        .map_err(|_| SolError::SerializationError(format!("too many {what}: {len}")))
}

// ---------------------------------------------------------------------------
// Data structures
// ---------------------------------------------------------------------------

/// A single account reference in an instruction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SolAccountMeta {
    pub pubkey: [u8; 32],
    pub is_signer: bool,
    pub is_writable: bool,
}

impl SolAccountMeta {
    pub fn writable(pubkey: [u8; 32], is_signer: bool) -> Self {
        Self {
            pubkey,
            is_signer,
            is_writable: true,
        }
    }

    pub fn readonly(pubkey: [u8; 32], is_signer: bool) -> Self {
        Self {
            pubkey,
            is_signer,
            is_writable: false,
        }
    }
}

/// An instruction before account references are compiled into indices.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SolInstruction {
    pub program_id: [u8; 32],
    pub accounts: Vec<SolAccountMeta>,
    pub data: Vec<u8>,
}

/// An instruction whose accounts are indices into the message account keys.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompiledInstruction {
    pub program_id_index: u8,
    pub account_indices: Vec<u8>,
    pub data: Vec<u8>,
}

/// A compiled legacy message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SolTransaction {
    /// Account keys in canonical order: writable signers (fee payer first),
    /// read-only signers, writable non-signers, read-only non-signers.
    pub account_keys: Vec<[u8; 32]>,
    pub num_required_signatures: u8,
    pub num_readonly_signed: u8,
    pub num_readonly_unsigned: u8,
    pub recent_blockhash: [u8; 32],
    pub compiled_instructions: Vec<CompiledInstruction>,
}

/// A signed transaction ready for `sendTransaction`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignedSolTransaction {
    /// Base64 of the wire transaction.
    pub raw: String,
    /// Base64 of the first 64 characters of `raw`.
    pub tx_hash: String,
}

impl SignedSolTransaction {
    pub fn from_wire(wire: &[u8]) -> Self {
        let raw = BASE64.encode(wire);
        let head: String = raw.chars().take(64).collect();
        let tx_hash = BASE64.encode(head.as_bytes());
        Self { raw, tx_hash }
    }
}

// ---------------------------------------------------------------------------
// Transaction building
// ---------------------------------------------------------------------------

/// Builds a native SOL transfer, optionally followed by a memo instruction.
pub fn build_sol_transfer(
    from: &[u8; 32],
    to: &[u8; 32],
    lamports: u64,
    recent_blockhash: &[u8; 32],
    priority_fee: Option<PriorityFee>,
    memo: Option<&str>,
) -> Result<SolTransaction, SolError> {
    if lamports == 0 {
        return Err(SolError::TransactionBuildError(
            "lamports must be > 0".into(),
        ));
    }

    let mut instructions = priority_instructions(priority_fee);
    instructions.push(system_transfer(from, to, lamports));
    if let Some(memo) = memo.filter(|m| !m.is_empty()) {
        instructions.push(memo_instruction(memo));
    }
    compile_transaction(&instructions, from, recent_blockhash)
}

/// Builds an SPL token transfer between two existing token accounts.
#[allow(clippy::too_many_arguments)]
pub fn build_token_transfer(
    owner: &[u8; 32],
    mint: &[u8; 32],
    from_token_account: &[u8; 32],
    to_token_account: &[u8; 32],
    amount: u64,
    decimals: u8,
    recent_blockhash: &[u8; 32],
    priority_fee: Option<PriorityFee>,
) -> Result<SolTransaction, SolError> {
    let mut instructions = priority_instructions(priority_fee);
    instructions.push(spl_token::build_transfer_checked(
        from_token_account,
        mint,
        to_token_account,
        owner,
        amount,
        decimals,
    )?);
    compile_transaction(&instructions, owner, recent_blockhash)
}

/// Builds an SPL token transfer that first creates the recipient's
/// associated token account.
#[allow(clippy::too_many_arguments)]
pub fn build_create_and_transfer_token(
    owner: &[u8; 32],
    recipient: &[u8; 32],
    mint: &[u8; 32],
    from_token_account: &[u8; 32],
    amount: u64,
    decimals: u8,
    recent_blockhash: &[u8; 32],
    priority_fee: Option<PriorityFee>,
) -> Result<SolTransaction, SolError> {
    let recipient_ata = spl_token::derive_associated_token_address(recipient, mint)?;
    let mut instructions = priority_instructions(priority_fee);
    instructions.push(spl_token::build_create_associated_account(
        owner, recipient, mint,
    )?);
    instructions.push(spl_token::build_transfer_checked(
        from_token_account,
        mint,
        &recipient_ata,
        owner,
        amount,
        decimals,
    )?);
    compile_transaction(&instructions, owner, recent_blockhash)
}

fn priority_instructions(priority_fee: Option<PriorityFee>) -> Vec<SolInstruction> {
    priority_fee
        .map(|fee| fee.instructions().to_vec())
        .unwrap_or_default()
}

/// Compiles instructions into a message with a single fee payer at index 0.
pub fn compile_transaction(
    instructions: &[SolInstruction],
    fee_payer: &[u8; 32],
    recent_blockhash: &[u8; 32],
) -> Result<SolTransaction, SolError> {
    let mut entries: Vec<SolAccountMeta> = Vec::new();
    let mut upsert = |pubkey: [u8; 32], signer: bool, writable: bool| {
        if let Some(entry) = entries.iter_mut().find(|e| e.pubkey == pubkey) {
            entry.is_signer |= signer;
            entry.is_writable |= writable;
        } else {
            entries.push(SolAccountMeta {
                pubkey,
                is_signer: signer,
                is_writable: writable,
            });
        }
    };

    upsert(*fee_payer, true, true);
    for ix in instructions {
        for meta in &ix.accounts {
            upsert(meta.pubkey, meta.is_signer, meta.is_writable);
        }
        upsert(ix.program_id, false, false);
    }

    // Stable: insertion order within a class keeps the fee payer first.
    entries.sort_by_key(|e| match (e.is_signer, e.is_writable) {
        (true, true) => 0u8,
        (true, false) => 1,
        (false, true) => 2,
        (false, false) => 3,
    });

    if entries.len() > u8::MAX as usize {
        return Err(SolError::TransactionBuildError(format!(
            "too many accounts: {}",
            entries.len()
        )));
    }

    let count = |f: fn(&SolAccountMeta) -> bool| entries.iter().filter(|e| f(e)).count() as u8;
    let num_required_signatures = count(|e| e.is_signer);
    let num_readonly_signed = count(|e| e.is_signer && !e.is_writable);
    let num_readonly_unsigned = count(|e| !e.is_signer && !e.is_writable);

    let account_keys: Vec<[u8; 32]> = entries.iter().map(|e| e.pubkey).collect();
    let index_of = |key: &[u8; 32]| -> Result<u8, SolError> {
        account_keys
            .iter()
            .position(|k| k == key)
            .map(|i| i as u8)
            .ok_or_else(|| SolError::TransactionBuildError("account not in account keys".into()))
    };

    let mut compiled = Vec::with_capacity(instructions.len());
    for ix in instructions {
        compiled.push(CompiledInstruction {
            program_id_index: index_of(&ix.program_id)?,
            account_indices: ix
                .accounts
                .iter()
                .map(|meta| index_of(&meta.pubkey))
                .collect::<Result<_, _>>()?,
            data: ix.data.clone(),
        });
    }

    Ok(SolTransaction {
        account_keys,
        num_required_signatures,
        num_readonly_signed,
        num_readonly_unsigned,
        recent_blockhash: *recent_blockhash,
        compiled_instructions: compiled,
    })
}

impl SolTransaction {
    /// Serializes the message; these are the bytes the signers sign.
    pub fn serialize_message(&self) -> Result<Vec<u8>, SolError> {
        let mut buf = Vec::with_capacity(256);
        buf.push(self.num_required_signatures);
        buf.push(self.num_readonly_signed);
        buf.push(self.num_readonly_unsigned);

        buf.extend_from_slice(&compact_len(self.account_keys.len(), "accounts")?);
        for key in &self.account_keys {
            buf.extend_from_slice(key);
        }
        buf.extend_from_slice(&self.recent_blockhash);

        buf.extend_from_slice(&compact_len(self.compiled_instructions.len(), "instructions")?);
        for ix in &self.compiled_instructions {
            buf.push(ix.program_id_index);
            buf.extend_from_slice(&compact_len(ix.account_indices.len(), "account indices")?);
            buf.extend_from_slice(&ix.account_indices);
            buf.extend_from_slice(&compact_len(ix.data.len(), "data bytes")?);
            buf.extend_from_slice(&ix.data);
        }
        Ok(buf)
    }

    /// Verifies the fee payer's signature over the message and assembles
    /// the wire transaction.
    pub fn compile(
        &self,
        fee_payer_pubkey: &[u8; 32],
        signature: &[u8],
    ) -> Result<SignedSolTransaction, SolError> {
        if self.account_keys.first() != Some(fee_payer_pubkey) {
            return Err(SolError::InvalidPublicKey(
                "key is not the fee payer of this message".into(),
            ));
        }
        if self.num_required_signatures != 1 {
            return Err(SolError::TransactionBuildError(format!(
                "expected a single signer, message requires {}",
                self.num_required_signatures
            )));
        }

        let message = self.serialize_message()?;
        let sig = verify_ed25519(fee_payer_pubkey, &message, signature)?;
        let wire = encode_wire(&[sig], &message);
        let signed = SignedSolTransaction::from_wire(&wire);
        debug!(tx_hash = %signed.tx_hash, "compiled solana transaction");
        Ok(signed)
    }

    /// Wire transaction with an all-zero signature per required signer,
    /// as accepted by `simulateTransaction` with `sigVerify: false`.
    pub fn zero_signed(&self) -> Result<String, SolError> {
        let message = self.serialize_message()?;
        let sigs = vec![[0u8; 64]; self.num_required_signatures as usize];
        Ok(BASE64.encode(encode_wire(&sigs, &message)))
    }
}

/// Concatenates the signature section and the message.
pub fn encode_wire(signatures: &[[u8; 64]], message: &[u8]) -> Vec<u8> {
    let mut wire = Vec::with_capacity(3 + signatures.len() * 64 + message.len());
    // Signature counts are bounded by the u8 header field.
    wire.extend_from_slice(&encode_compact_u16(signatures.len() as u16));
    for sig in signatures {
        wire.extend_from_slice(sig);
    }
    wire.extend_from_slice(message);
    wire
}

/// Verifies an ed25519 signature and returns it as a fixed array.
pub fn verify_ed25519(
    pubkey: &[u8; 32],
    message: &[u8],
    signature: &[u8],
) -> Result<[u8; 64], SolError> {
    let key = VerifyingKey::from_bytes(pubkey)
        .map_err(|e| SolError::InvalidPublicKey(e.to_string()))?;
    let sig_bytes: [u8; 64] = signature.try_into().map_err(|_| {
        SolError::InvalidSignature(format!("expected 64 bytes, got {}", signature.len()))
    })?;
    key.verify(message, &Signature::from_bytes(&sig_bytes))
        .map_err(|_| SolError::SignatureVerificationFailed)?;
    Ok(sig_bytes)
}

fn system_transfer(from: &[u8; 32], to: &[u8; 32], lamports: u64) -> SolInstruction {
    let mut data = Vec::with_capacity(12);
    data.extend_from_slice(&SYSTEM_TRANSFER_IX_INDEX.to_le_bytes());
    data.extend_from_slice(&lamports.to_le_bytes());

    SolInstruction {
        program_id: SYSTEM_PROGRAM_ID,
        accounts: vec![
            SolAccountMeta::writable(*from, true),
            SolAccountMeta::writable(*to, false),
        ],
        data,
    }
}

fn memo_instruction(memo: &str) -> SolInstruction {
    SolInstruction {
        program_id: MEMO_PROGRAM_ID,
        accounts: Vec::new(),
        data: memo.as_bytes().to_vec(),
    }
}
