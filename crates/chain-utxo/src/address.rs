use bech32::Hrp;
use bitcoin::hashes::Hash;
use bitcoin::script::{Script, ScriptBuf};
use bitcoin::{PubkeyHash, ScriptHash, WPubkeyHash, WitnessProgram, WitnessVersion};

use crate::error::UtxoError;
use crate::network::{ScriptKind, UtxoChain};

/// Decodes an address of `chain` into the locking script it pays to.
///
/// Accepts segwit (bech32/bech32m), base58check P2PKH/P2SH and, for Bitcoin
/// Cash, CashAddr with or without the `bitcoincash:` prefix.
pub fn address_to_script(chain: UtxoChain, address: &str) -> Result<ScriptBuf, UtxoError> {
    if let Some(hrp) = chain.bech32_hrp() {
        if address.to_ascii_lowercase().starts_with(&format!("{hrp}1")) {
            return segwit_to_script(hrp, address);
        }
    }

    if let Some(prefix) = chain.cashaddr_prefix() {
        if let Some(script) = cashaddr::decode_to_script(prefix, address)? {
            return Ok(script);
        }
    }

    base58_to_script(chain, address)
}

fn segwit_to_script(expected_hrp: &str, address: &str) -> Result<ScriptBuf, UtxoError> {
    let (hrp, version, program) = bech32::segwit::decode(address)
        .map_err(|e| UtxoError::InvalidAddress(format!("bech32 decode failed: {e}")))?;
    if !hrp.as_str().eq_ignore_ascii_case(expected_hrp) {
        return Err(UtxoError::InvalidAddress(format!(
            "expected hrp {expected_hrp}, got {}",
            hrp.as_str()
        )));
    }

    let version = WitnessVersion::try_from(version.to_u8())
        .map_err(|e| UtxoError::InvalidAddress(format!("witness version: {e}")))?;
    let program = WitnessProgram::new(version, &program)
        .map_err(|e| UtxoError::InvalidAddress(format!("witness program: {e}")))?;
    Ok(ScriptBuf::new_witness_program(&program))
}

fn base58_to_script(chain: UtxoChain, address: &str) -> Result<ScriptBuf, UtxoError> {
    let payload = bs58::decode(address)
        .with_check(None)
        .into_vec()
        .map_err(|e| UtxoError::InvalidAddress(format!("base58check decode failed: {e}")))?;
    let prefix_len = chain.p2pkh_version().len();
    if payload.len() != prefix_len + 20 {
        return Err(UtxoError::InvalidAddress(format!(
            "expected {}-byte payload, got {}",
            prefix_len + 20,
            payload.len()
        )));
    }

    let (version, body) = payload.split_at(prefix_len);
    let mut hash = [0u8; 20];
    hash.copy_from_slice(body);
    match version {
        v if v == chain.p2pkh_version() => Ok(ScriptBuf::new_p2pkh(&PubkeyHash::from_byte_array(hash))),
        v if v == chain.p2sh_version() => Ok(ScriptBuf::new_p2sh(&ScriptHash::from_byte_array(hash))),
        v => Err(UtxoError::InvalidAddress(format!(
            "version prefix {} does not belong to {chain}",
            hex::encode(v)
        ))),
    }
}

/// Renders a locking script back into an address of `chain`.
pub fn script_to_address(chain: UtxoChain, script: &Script) -> Result<String, UtxoError> {
    let bytes = script.as_bytes();

    if script.is_p2pkh() {
        return encode_hash(chain, false, &bytes[3..23]);
    }
    if script.is_p2sh() {
        return encode_hash(chain, true, &bytes[2..22]);
    }
    if script.is_witness_program() {
        let hrp = chain.bech32_hrp().ok_or_else(|| {
            UtxoError::InvalidAddress(format!("{chain} has no segwit addresses"))
        })?;
        let hrp = Hrp::parse(hrp).map_err(|e| UtxoError::InvalidAddress(e.to_string()))?;
        let version = script
            .witness_version()
            .ok_or_else(|| UtxoError::InvalidAddress("missing witness version".into()))?;
        let fe = bech32::Fe32::try_from(version.to_num())
            .map_err(|e| UtxoError::InvalidAddress(e.to_string()))?;
        return bech32::segwit::encode(hrp, fe, &bytes[2..])
            .map_err(|e| UtxoError::InvalidAddress(e.to_string()));
    }

    Err(UtxoError::InvalidAddress(format!(
        "unsupported script {}",
        hex::encode(bytes)
    )))
}

fn encode_hash(chain: UtxoChain, is_script: bool, hash: &[u8]) -> Result<String, UtxoError> {
    if let Some(prefix) = chain.cashaddr_prefix() {
        return cashaddr::encode(prefix, is_script, hash);
    }
    let version = if is_script {
        chain.p2sh_version()
    } else {
        chain.p2pkh_version()
    };
    let mut payload = Vec::with_capacity(version.len() + 20);
    payload.extend_from_slice(version);
    payload.extend_from_slice(hash);
    Ok(bs58::encode(payload).with_check().into_string())
}

/// Locking script for the wallet's own key under the chain's script family.
pub fn pubkey_to_script(chain: UtxoChain, pubkey: &[u8]) -> Result<ScriptBuf, UtxoError> {
    if pubkey.len() != 33 {
        return Err(UtxoError::InvalidPublicKey(format!(
            "expected 33-byte compressed key, got {}",
            pubkey.len()
        )));
    }
    let hash = crypto_utils::hash::hash160(pubkey);
    Ok(match chain.script_kind() {
        ScriptKind::P2wpkh => ScriptBuf::new_p2wpkh(&WPubkeyHash::from_byte_array(hash)),
        ScriptKind::P2pkh => ScriptBuf::new_p2pkh(&PubkeyHash::from_byte_array(hash)),
    })
}

/// Address of the wallet's own key.
pub fn pubkey_to_address(chain: UtxoChain, pubkey: &[u8]) -> Result<String, UtxoError> {
    script_to_address(chain, &pubkey_to_script(chain, pubkey)?)
}

/// Returns `true` if `address` decodes for `chain`.
pub fn validate_address(chain: UtxoChain, address: &str) -> bool {
    address_to_script(chain, address).is_ok()
}

/// CashAddr encoding for Bitcoin Cash.
mod cashaddr {
    use bitcoin::hashes::Hash;
    use bitcoin::script::ScriptBuf;
    use bitcoin::{PubkeyHash, ScriptHash};

    use crate::error::UtxoError;

    const CHARSET: &[u8; 32] = b"qpzry9x8gf2tvdw0s3jn54khce6mua7l";
    const CHECKSUM_LEN: usize = 8;

    fn polymod(values: &[u8]) -> u64 {
        const GENERATORS: [u64; 5] = [
            0x98f2bc8e61,
            0x79b76d99e2,
            0xf33e5fb3c4,
            0xae2eabe2a8,
            0x1e4f43e470,
        ];
        let mut c: u64 = 1;
        for &d in values {
            let c0 = (c >> 35) as u8;
            c = ((c & 0x07_ffff_ffff) << 5) ^ u64::from(d);
            for (bit, generator) in GENERATORS.iter().enumerate() {
                if c0 & (1 << bit) != 0 {
                    c ^= generator;
                }
            }
        }
        c ^ 1
    }

    fn prefix_values(prefix: &str) -> Vec<u8> {
        let mut out: Vec<u8> = prefix.bytes().map(|b| b & 0x1f).collect();
        out.push(0);
        out
    }

    fn convert_bits(data: &[u8], from: u32, to: u32, pad: bool) -> Option<Vec<u8>> {
        let mut acc: u32 = 0;
        let mut bits: u32 = 0;
        let max = (1u32 << to) - 1;
        let max_acc = (1u32 << (from + to - 1)) - 1;
        let mut out = Vec::new();
        for &value in data {
            let v = u32::from(value);
            if v >> from != 0 {
                return None;
            }
            acc = ((acc << from) | v) & max_acc;
            bits += from;
            while bits >= to {
                bits -= to;
                out.push(((acc >> bits) & max) as u8);
            }
        }
        if pad {
            if bits > 0 {
                out.push(((acc << (to - bits)) & max) as u8);
            }
        } else if bits >= from || ((acc << (to - bits)) & max) != 0 {
            return None;
        }
        Some(out)
    }

    pub(super) fn encode(prefix: &str, is_script: bool, hash: &[u8]) -> Result<String, UtxoError> {
        if hash.len() != 20 {
            return Err(UtxoError::InvalidAddress(format!(
                "cashaddr hash must be 20 bytes, got {}",
                hash.len()
            )));
        }
        let version_byte: u8 = if is_script { 0x08 } else { 0x00 };
        let mut payload = vec![version_byte];
        payload.extend_from_slice(hash);
        let data = convert_bits(&payload, 8, 5, true)
            .ok_or_else(|| UtxoError::InvalidAddress("cashaddr bit conversion".into()))?;

        let mut check_input = prefix_values(prefix);
        check_input.extend_from_slice(&data);
        check_input.extend_from_slice(&[0u8; CHECKSUM_LEN]);
        let checksum = polymod(&check_input);

        let mut out = String::with_capacity(prefix.len() + 1 + data.len() + CHECKSUM_LEN);
        out.push_str(prefix);
        out.push(':');
        for &d in &data {
            out.push(CHARSET[d as usize] as char);
        }
        for i in 0..CHECKSUM_LEN {
            let d = ((checksum >> (5 * (7 - i))) & 0x1f) as usize;
            out.push(CHARSET[d] as char);
        }
        Ok(out)
    }

    /// Decodes a CashAddr string. Returns `Ok(None)` when the input is not
    /// CashAddr at all (so the caller can fall back to base58).
    pub(super) fn decode_to_script(
        prefix: &str,
        address: &str,
    ) -> Result<Option<ScriptBuf>, UtxoError> {
        let lower = address.to_ascii_lowercase();
        let body = match lower.split_once(':') {
            Some((p, body)) if p == prefix => body,
            Some(_) => return Ok(None),
            None if lower.starts_with('q') || lower.starts_with('p') => lower.as_str(),
            None => return Ok(None),
        };

        let mut values = Vec::with_capacity(body.len());
        for c in body.bytes() {
            match CHARSET.iter().position(|&x| x == c) {
                Some(v) => values.push(v as u8),
                None => return Ok(None),
            }
        }
        if values.len() <= CHECKSUM_LEN {
            return Err(UtxoError::InvalidAddress("cashaddr too short".into()));
        }

        let mut check_input = prefix_values(prefix);
        check_input.extend_from_slice(&values);
        if polymod(&check_input) != 0 {
            return Err(UtxoError::InvalidAddress("cashaddr checksum mismatch".into()));
        }

        let data = &values[..values.len() - CHECKSUM_LEN];
        let payload = convert_bits(data, 5, 8, false)
            .ok_or_else(|| UtxoError::InvalidAddress("cashaddr padding".into()))?;
        if payload.len() != 21 {
            return Err(UtxoError::InvalidAddress(format!(
                "unsupported cashaddr payload of {} bytes",
                payload.len()
            )));
        }

        let mut hash = [0u8; 20];
        hash.copy_from_slice(&payload[1..]);
        match payload[0] {
            0x00 => Ok(Some(ScriptBuf::new_p2pkh(&PubkeyHash::from_byte_array(hash)))),
            0x08 => Ok(Some(ScriptBuf::new_p2sh(&ScriptHash::from_byte_array(hash)))),
            v => Err(UtxoError::InvalidAddress(format!(
                "unsupported cashaddr version {v:#04x}"
            ))),
        }
    }
}
