use bip32::{ChainCode, ChildNumber, ExtendedKey, ExtendedKeyAttrs, Prefix, XPub};
use crypto_utils::bytes::decode_hex_array;
use tracing::trace;

use crate::error::SigningError;
use crate::payload::Vault;
use crate::types::Chain;

/// Derives a child public key from a master public key and chain code
/// using non-hardened BIP-32 steps only.
///
/// `path` looks like `m/44/60/0/0/0`; the leading `m` is optional. Every
/// component must be a decimal index below 2^31. Hardened components
/// (`44'` or `44h`) cannot be derived from a public key and are rejected.
///
/// Returns the compressed SEC1 key as lowercase hex.
pub fn derive_public_key(
    master_public_key_hex: &str,
    chain_code_hex: &str,
    path: &str,
) -> Result<String, SigningError> {
    let key_bytes: [u8; 33] = decode_hex_array(master_public_key_hex)
        .map_err(|e| SigningError::KeyDerivation(format!("master public key: {e}")))?;
    let chain_code: ChainCode = decode_hex_array(chain_code_hex)
        .map_err(|e| SigningError::KeyDerivation(format!("chain code: {e}")))?;

    let extended = ExtendedKey {
        prefix: Prefix::XPUB,
        attrs: ExtendedKeyAttrs {
            depth: 0,
            parent_fingerprint: [0u8; 4],
            child_number: ChildNumber(0),
            chain_code,
        },
        key_bytes,
    };
    let mut xpub = XPub::try_from(extended)?;

    for index in parse_path(path)? {
        xpub = xpub.derive_child(ChildNumber::new(index, false)?)?;
    }

    let derived = hex::encode(xpub.to_bytes());
    trace!(%path, "derived public key");
    Ok(derived)
}

/// Derives the vault's secp256k1 key for `chain`, dropping the hardened
/// marks of the chain's derivation path.
pub fn derive_chain_public_key(vault: &Vault, chain: Chain) -> Result<String, SigningError> {
    let path = chain.derivation_path().replace('\'', "");
    derive_public_key(&vault.pub_key_ecdsa, &vault.hex_chain_code, &path)
}

fn parse_path(path: &str) -> Result<Vec<u32>, SigningError> {
    let trimmed = path.trim();
    let rest = trimmed
        .strip_prefix("m/")
        .or_else(|| trimmed.strip_prefix("M/"))
        .unwrap_or(trimmed);
    if rest.is_empty() || rest == "m" || rest == "M" {
        return Ok(Vec::new());
    }

    rest.split('/')
        .map(|component| {
            if component.ends_with('\'') || component.ends_with('h') || component.ends_with('H') {
                return Err(SigningError::KeyDerivation(format!(
                    "hardened step {component} in {path}"
                )));
            }
            let index: u32 = component.parse().map_err(|_| {
                SigningError::KeyDerivation(format!("invalid path component {component:?} in {path}"))
            })?;
            if index & ChildNumber::HARDENED_FLAG != 0 {
                return Err(SigningError::KeyDerivation(format!(
                    "index {index} is in the hardened range"
                )));
            }
            Ok(index)
        })
        .collect()
}
