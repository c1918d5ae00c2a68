//! Digest helpers used by the chain crates.
//!
//! | Function        | Used by                                  |
//! |-----------------|------------------------------------------|
//! | `sha256`        | Cosmos sign docs, Tron txid, Solana PDAs |
//! | `double_sha256` | base58check, BCH forkid sighash          |
//! | `keccak256`     | EVM transaction hash, custom messages    |
//! | `sha512_half`   | XRPL signing hash                        |
//! | `blake2b_256`   | Cardano body hash, Substrate payloads    |
//! | `blake2b_224`   | Cardano key hashes                       |
//! | `hash160`       | UTXO public-key hashes                   |

use ripemd::Ripemd160;
use sha2::{Digest, Sha256, Sha512};
use sha3::Keccak256;

pub fn sha256(data: &[u8]) -> [u8; 32] {
    Sha256::digest(data).into()
}

pub fn double_sha256(data: &[u8]) -> [u8; 32] {
    sha256(&sha256(data))
}

pub fn keccak256(data: &[u8]) -> [u8; 32] {
    Keccak256::digest(data).into()
}

/// First 32 bytes of SHA-512.
pub fn sha512_half(data: &[u8]) -> [u8; 32] {
    let full = Sha512::digest(data);
    let mut out = [0u8; 32];
    out.copy_from_slice(&full[..32]);
    out
}

pub fn blake2b_256(data: &[u8]) -> [u8; 32] {
    let hash = blake2b_simd::Params::new().hash_length(32).hash(data);
    let mut out = [0u8; 32];
    out.copy_from_slice(hash.as_bytes());
    out
}

pub fn blake2b_224(data: &[u8]) -> [u8; 28] {
    let hash = blake2b_simd::Params::new().hash_length(28).hash(data);
    let mut out = [0u8; 28];
    out.copy_from_slice(hash.as_bytes());
    out
}

/// Full 64-byte blake2b, as used by the SS58 checksum.
pub fn blake2b_512(data: &[u8]) -> [u8; 64] {
    let hash = blake2b_simd::Params::new().hash_length(64).hash(data);
    let mut out = [0u8; 64];
    out.copy_from_slice(hash.as_bytes());
    out
}

/// RIPEMD160(SHA256(data)).
pub fn hash160(data: &[u8]) -> [u8; 20] {
    Ripemd160::digest(Sha256::digest(data)).into()
}
