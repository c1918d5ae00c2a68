//! Classic addresses: Base58Check (Ripple alphabet) of
//! `0x00 || RIPEMD-160(SHA-256(pubkey))`.

use bs58::Alphabet;
use crypto_utils::hash::hash160;

use crate::error::XrpError;

const ACCOUNT_ID_VERSION: u8 = 0x00;

pub type AccountId = [u8; 20];

pub fn pubkey_to_account_id(pubkey: &[u8]) -> Result<AccountId, XrpError> {
    if pubkey.len() != 33 {
        return Err(XrpError::InvalidPublicKey(format!(
            "expected 33-byte compressed key, got {}",
            pubkey.len()
        )));
    }
    Ok(hash160(pubkey))
}

pub fn encode_address(account: &AccountId) -> String {
    bs58::encode(account)
        .with_alphabet(Alphabet::RIPPLE)
        .with_check_version(ACCOUNT_ID_VERSION)
        .into_string()
}

pub fn pubkey_to_address(pubkey: &[u8]) -> Result<String, XrpError> {
    Ok(encode_address(&pubkey_to_account_id(pubkey)?))
}

pub fn parse_address(address: &str) -> Result<AccountId, XrpError> {
    let raw = bs58::decode(address)
        .with_alphabet(Alphabet::RIPPLE)
        .with_check(Some(ACCOUNT_ID_VERSION))
        .into_vec()
        .map_err(|e| XrpError::InvalidAddress(format!("base58check decode failed: {e}")))?;
    // Version byte is kept in the decoded output.
    raw.get(1..)
        .and_then(|body| body.try_into().ok())
        .ok_or_else(|| XrpError::InvalidAddress(format!("expected 21 bytes, got {}", raw.len())))
}
