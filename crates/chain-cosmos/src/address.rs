use bech32::{Bech32, Hrp};
use crypto_utils::hash::hash160;
use k256::elliptic_curve::sec1::ToEncodedPoint;
use k256::PublicKey;

use crate::error::CosmosError;

/// Derives the bech32 account address (`hrp1...`) of a secp256k1 key:
/// RIPEMD-160(SHA-256(compressed key)).
pub fn pubkey_to_address(pubkey: &[u8], hrp: &str) -> Result<String, CosmosError> {
    let compressed = compress_pubkey(pubkey)?;
    encode_address(hrp, &hash160(&compressed))
}

/// Normalizes any SEC1 secp256k1 key to its 33-byte compressed form.
pub fn compress_pubkey(pubkey: &[u8]) -> Result<[u8; 33], CosmosError> {
    let key = PublicKey::from_sec1_bytes(pubkey)
        .map_err(|e| CosmosError::InvalidPublicKey(e.to_string()))?;
    let point = key.to_encoded_point(true);
    let mut out = [0u8; 33];
    out.copy_from_slice(point.as_bytes());
    Ok(out)
}

pub fn encode_address(hrp: &str, data: &[u8]) -> Result<String, CosmosError> {
    let hrp = Hrp::parse(hrp).map_err(|e| CosmosError::InvalidAddress(e.to_string()))?;
    bech32::encode::<Bech32>(hrp, data).map_err(|e| CosmosError::InvalidAddress(e.to_string()))
}

/// Decodes an address and checks its prefix, returning the raw account bytes.
pub fn decode_address(address: &str, expected_hrp: &str) -> Result<Vec<u8>, CosmosError> {
    let (hrp, data) =
        bech32::decode(address).map_err(|e| CosmosError::InvalidAddress(e.to_string()))?;
    if hrp.as_str() != expected_hrp {
        return Err(CosmosError::InvalidAddress(format!(
            "expected prefix {expected_hrp}, got {}",
            hrp.as_str()
        )));
    }
    Ok(data)
}

#[cfg(test)]
mod tests {
    use super::*;

    const GENERATOR: &str = "0279be667ef9dcbbac55a06295ce870b07029bfcdb2dce28d959f2815b16f81798";

    #[test]
    fn address_vectors() {
        let key = hex::decode(GENERATOR).unwrap();
        assert_eq!(
            pubkey_to_address(&key, "cosmos").unwrap(),
            "cosmos1w508d6qejxtdg4y5r3zarvary0c5xw7k6ah60c"
        );
        assert_eq!(
            pubkey_to_address(&key, "thor").unwrap(),
            "thor1w508d6qejxtdg4y5r3zarvary0c5xw7ku6wp68"
        );
        assert_eq!(
            pubkey_to_address(&key, "maya").unwrap(),
            "maya1w508d6qejxtdg4y5r3zarvary0c5xw7kudsdvh"
        );
    }

    #[test]
    fn decode_checks_prefix() {
        let data = decode_address("terra1w508d6qejxtdg4y5r3zarvary0c5xw7kued6dc", "terra").unwrap();
        assert_eq!(hex::encode(data), "751e76e8199196d454941c45d1b3a323f1433bd6");
        assert!(decode_address("terra1w508d6qejxtdg4y5r3zarvary0c5xw7kued6dc", "cosmos").is_err());
        assert!(decode_address("terra1w508d6qejxtdg4y5r3zarvary0c5xw7kued6dd", "terra").is_err());
    }

    #[test]
    fn compress_accepts_uncompressed() {
        let key = hex::decode(GENERATOR).unwrap();
        let parsed = PublicKey::from_sec1_bytes(&key).unwrap();
        let uncompressed = parsed.to_encoded_point(false);
        assert_eq!(compress_pubkey(uncompressed.as_bytes()).unwrap().to_vec(), key);
        assert!(compress_pubkey(&[1, 2, 3]).is_err());
    }
}
