//! Solana addresses are the Base58 encoding of a raw 32-byte key; there is
//! no hashing step.

use crate::error::SolError;

/// Encodes a 32-byte Ed25519 public key (or program id) as an address.
pub fn pubkey_to_address(pubkey: &[u8; 32]) -> String {
    bs58::encode(pubkey).into_string()
}

/// Decodes an address into its 32 raw bytes.
pub fn parse_address(address: &str) -> Result<[u8; 32], SolError> {
    let bytes = bs58::decode(address)
        .into_vec()
        .map_err(|e| SolError::InvalidAddress(format!("base58 decode failed: {e}")))?;

    bytes.try_into().map_err(|v: Vec<u8>| {
        SolError::InvalidAddress(format!("expected 32 bytes, got {}", v.len()))
    })
}

/// Parses a hex-encoded Ed25519 public key (the vault EdDSA key form).
pub fn parse_hex_pubkey(hex_key: &str) -> Result<[u8; 32], SolError> {
    let bytes = hex::decode(hex_key.trim_start_matches("0x"))
        .map_err(|e| SolError::InvalidPublicKey(format!("invalid hex: {e}")))?;
    bytes.try_into().map_err(|v: Vec<u8>| {
        SolError::InvalidPublicKey(format!("expected 32 bytes, got {}", v.len()))
    })
}

/// Returns `true` when `address` decodes to exactly 32 bytes.
pub fn validate_address(address: &str) -> bool {
    parse_address(address).is_ok()
}
