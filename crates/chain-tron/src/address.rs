//! Tron addresses: Base58Check of `0x41 || keccak256(pubkey)[12..]`.

use crypto_utils::hash::keccak256;
use k256::elliptic_curve::sec1::ToEncodedPoint;
use k256::PublicKey;

use crate::error::TronError;

pub const ADDRESS_PREFIX: u8 = 0x41;

/// 21-byte address including the `0x41` prefix.
pub type TronAddress = [u8; 21];

/// Returns the 65-byte uncompressed form of any SEC1 secp256k1 key.
pub fn decompress_pubkey(pubkey: &[u8]) -> Result<[u8; 65], TronError> {
    let key = PublicKey::from_sec1_bytes(pubkey)
        .map_err(|e| TronError::InvalidPublicKey(e.to_string()))?;
    let point = key.to_encoded_point(false);
    let mut out = [0u8; 65];
    out.copy_from_slice(point.as_bytes());
    Ok(out)
}

pub fn pubkey_to_address_bytes(pubkey: &[u8]) -> Result<TronAddress, TronError> {
    let uncompressed = decompress_pubkey(pubkey)?;
    let hash = keccak256(&uncompressed[1..]);
    let mut out = [0u8; 21];
    out[0] = ADDRESS_PREFIX;
    out[1..].copy_from_slice(&hash[12..]);
    Ok(out)
}

pub fn pubkey_to_address(pubkey: &[u8]) -> Result<String, TronError> {
    Ok(encode_address(&pubkey_to_address_bytes(pubkey)?))
}

pub fn encode_address(address: &TronAddress) -> String {
    bs58::encode(address).with_check().into_string()
}

/// Decodes a Base58Check address (`T...`).
pub fn parse_address(address: &str) -> Result<TronAddress, TronError> {
    let raw = bs58::decode(address)
        .with_check(None)
        .into_vec()
        .map_err(|e| TronError::InvalidAddress(format!("base58check decode failed: {e}")))?;
    let bytes: TronAddress = raw.try_into().map_err(|v: Vec<u8>| {
        TronError::InvalidAddress(format!("expected 21 bytes, got {}", v.len()))
    })?;
    if bytes[0] != ADDRESS_PREFIX {
        return Err(TronError::InvalidAddress(format!(
            "unexpected prefix 0x{:02x}",
            bytes[0]
        )));
    }
    Ok(bytes)
}
