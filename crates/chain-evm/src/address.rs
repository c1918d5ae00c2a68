use alloy_primitives::Address;
use crypto_utils::hash::keccak256;
use k256::elliptic_curve::sec1::ToEncodedPoint;
use k256::PublicKey;

use crate::error::EvmError;

/// Derives an EIP-55 checksummed address from a secp256k1 public key in any
/// SEC1 form (33-byte compressed or 65-byte uncompressed).
///
/// The address is the last 20 bytes of Keccak-256 over the 64-byte
/// uncompressed key without its 0x04 prefix.
pub fn pubkey_to_address(pubkey: &[u8]) -> Result<String, EvmError> {
    let key = PublicKey::from_sec1_bytes(pubkey)
        .map_err(|e| EvmError::InvalidPublicKey(format!("invalid secp256k1 key: {e}")))?;
    let uncompressed = key.to_encoded_point(false);
    let hash = keccak256(&uncompressed.as_bytes()[1..]);
    checksum_address(&format!("0x{}", hex::encode(&hash[12..])))
}

/// Parses a 0x-prefixed hex address.
pub fn parse_address(address: &str) -> Result<Address, EvmError> {
    let hex_part = address
        .strip_prefix("0x")
        .or_else(|| address.strip_prefix("0X"))
        .ok_or_else(|| EvmError::InvalidAddress("address must start with 0x".into()))?;

    if hex_part.len() != 40 {
        return Err(EvmError::InvalidAddress(format!(
            "expected 40 hex characters, got {}",
            hex_part.len()
        )));
    }

    let bytes = hex::decode(hex_part)
        .map_err(|e| EvmError::InvalidAddress(format!("invalid hex: {e}")))?;
    Ok(Address::from_slice(&bytes))
}

/// Validates an address string.
///
/// All-lowercase and all-uppercase addresses are accepted as-is; mixed case
/// must carry a valid EIP-55 checksum.
pub fn validate_address(address: &str) -> Result<bool, EvmError> {
    parse_address(address)?;
    let hex_part = &address[2..];

    let is_all_lower = hex_part.chars().all(|c| !c.is_ascii_uppercase());
    let is_all_upper = hex_part.chars().all(|c| !c.is_ascii_lowercase());
    if is_all_lower || is_all_upper {
        return Ok(true);
    }

    Ok(checksum_address(address)? == address)
}

/// Applies EIP-55 mixed-case checksum encoding to an address.
pub fn checksum_address(address: &str) -> Result<String, EvmError> {
    let parsed = parse_address(address)?;
    let hex_part = hex::encode(parsed.as_slice());
    let hash = keccak256(hex_part.as_bytes());

    let mut checksummed = String::with_capacity(42);
    checksummed.push_str("0x");
    for (i, c) in hex_part.chars().enumerate() {
        // Nibble i of the hash decides the case of character i.
        let byte = hash[i / 2];
        let nibble = if i % 2 == 0 { byte >> 4 } else { byte & 0x0f };
        if c.is_ascii_alphabetic() && nibble >= 8 {
            checksummed.push(c.to_ascii_uppercase());
        } else {
            checksummed.push(c);
        }
    }
    Ok(checksummed)
}
