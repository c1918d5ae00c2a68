//! SS58 addresses: `base58(prefix || pubkey || checksum[..2])` where the
//! checksum is BLAKE2b-512 over `"SS58PRE" || prefix || pubkey`.

use crypto_utils::hash::blake2b_512;

use crate::error::DotError;

pub const POLKADOT_SS58_PREFIX: u8 = 0;
pub const GENERIC_SS58_PREFIX: u8 = 42;

const SS58_CONTEXT: &[u8] = b"SS58PRE";
const CHECKSUM_LEN: usize = 2;

fn checksum(payload: &[u8]) -> [u8; CHECKSUM_LEN] {
    let mut preimage = Vec::with_capacity(SS58_CONTEXT.len() + payload.len());
    preimage.extend_from_slice(SS58_CONTEXT);
    preimage.extend_from_slice(payload);
    let hash = blake2b_512(&preimage);
    [hash[0], hash[1]]
}

/// Encodes a 32-byte account id with a single-byte network prefix.
pub fn encode_address(pubkey: &[u8; 32], prefix: u8) -> String {
    let mut payload = Vec::with_capacity(1 + 32 + CHECKSUM_LEN);
    payload.push(prefix);
    payload.extend_from_slice(pubkey);
    let check = checksum(&payload);
    payload.extend_from_slice(&check);
    bs58::encode(payload).into_string()
}

/// Decodes an address, returning `(prefix, account id)`.
pub fn decode_address(address: &str) -> Result<(u8, [u8; 32]), DotError> {
    let raw = bs58::decode(address)
        .into_vec()
        .map_err(|e| DotError::InvalidAddress(format!("base58 decode failed: {e}")))?;
    if raw.len() != 1 + 32 + CHECKSUM_LEN {
        return Err(DotError::InvalidAddress(format!(
            "expected 35 bytes, got {}",
            raw.len()
        )));
    }
    if raw[0] >= 64 {
        return Err(DotError::InvalidAddress(format!(
            "unsupported prefix byte {}",
            raw[0]
        )));
    }
    let (payload, check) = raw.split_at(33);
    if checksum(payload) != check {
        return Err(DotError::InvalidAddress("bad checksum".into()));
    }
    let mut account = [0u8; 32];
    account.copy_from_slice(&payload[1..]);
    Ok((payload[0], account))
}

/// Decodes a Polkadot (prefix 0) address.
pub fn parse_polkadot_address(address: &str) -> Result<[u8; 32], DotError> {
    match decode_address(address)? {
        (POLKADOT_SS58_PREFIX, account) => Ok(account),
        (prefix, _) => Err(DotError::InvalidAddress(format!(
            "expected polkadot prefix, got {prefix}"
        ))),
    }
}
