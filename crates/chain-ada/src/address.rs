//! Shelley addresses (bech32, `addr` prefix).

use bech32::{Bech32, Hrp};
use crypto_utils::hash::blake2b_224;

use crate::error::AdaError;

/// Header byte of a mainnet enterprise address with a key payment credential.
pub const ENTERPRISE_MAINNET_HEADER: u8 = 0x61;
pub const MAINNET_HRP: &str = "addr";

/// `0x61 || blake2b-224(spending key)`.
pub fn enterprise_address_bytes(spending_key: &[u8; 32]) -> [u8; 29] {
    let mut out = [0u8; 29];
    out[0] = ENTERPRISE_MAINNET_HEADER;
    out[1..].copy_from_slice(&blake2b_224(spending_key));
    out
}

pub fn enterprise_address(spending_key: &[u8; 32]) -> Result<String, AdaError> {
    encode_address(&enterprise_address_bytes(spending_key))
}

pub fn encode_address(bytes: &[u8]) -> Result<String, AdaError> {
    let hrp = Hrp::parse(MAINNET_HRP).map_err(|e| AdaError::InvalidAddress(e.to_string()))?;
    bech32::encode::<Bech32>(hrp, bytes).map_err(|e| AdaError::InvalidAddress(e.to_string()))
}

/// Decodes a bech32 Shelley address into its raw bytes.
pub fn parse_address(address: &str) -> Result<Vec<u8>, AdaError> {
    let (hrp, data) =
        bech32::decode(address).map_err(|e| AdaError::InvalidAddress(e.to_string()))?;
    if hrp.as_str() != MAINNET_HRP {
        return Err(AdaError::InvalidAddress(format!(
            "expected prefix {MAINNET_HRP}, got {}",
            hrp.as_str()
        )));
    }
    if data.is_empty() {
        return Err(AdaError::InvalidAddress("empty address payload".into()));
    }
    Ok(data)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn enterprise_vector() {
        let bytes = enterprise_address_bytes(&[0x11; 32]);
        assert_eq!(
            hex::encode(&bytes[1..]),
            "8cf0020fd6584f7b130db5ca0229c51f934821a2eb07c1df512d8aca"
        );
        assert_eq!(
            enterprise_address(&[0x11; 32]).unwrap(),
            "addr1vxx0qqs06evy77cnpk6u5q3fc50exjpp5t4s0swl2ykc4jsqhd0pa"
        );
    }

    #[test]
    fn parse_restores_bytes() {
        let address = enterprise_address(&[0x11; 32]).unwrap();
        assert_eq!(
            parse_address(&address).unwrap(),
            enterprise_address_bytes(&[0x11; 32]).to_vec()
        );
    }

    #[test]
    fn wrong_prefix_rejected() {
        let err = parse_address("cosmos1w508d6qejxtdg4y5r3zarvary0c5xw7k6ah60c").unwrap_err();
        assert!(err.to_string().contains("expected prefix addr"));
    }
}
