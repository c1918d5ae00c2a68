use crate::error::CryptoError;

/// Strips an optional `0x`/`0X` prefix.
pub fn strip_hex_prefix(s: &str) -> &str {
    s.strip_prefix("0x")
        .or_else(|| s.strip_prefix("0X"))
        .unwrap_or(s)
}

/// Returns `true` if `s` (with an optional `0x` prefix) is non-empty,
/// even-length hex.
pub fn is_hex(s: &str) -> bool {
    let body = strip_hex_prefix(s);
    !body.is_empty() && body.len() % 2 == 0 && body.chars().all(|c| c.is_ascii_hexdigit())
}

/// Decodes a hex string, tolerating a `0x` prefix.
pub fn decode_hex(s: &str) -> Result<Vec<u8>, CryptoError> {
    hex::decode(strip_hex_prefix(s)).map_err(|e| CryptoError::InvalidHex(e.to_string()))
}

/// Decodes a hex string into an exact-size array.
pub fn decode_hex_array<const N: usize>(s: &str) -> Result<[u8; N], CryptoError> {
    let bytes = decode_hex(s)?;
    to_array(&bytes)
}

/// Copies a slice into an exact-size array.
pub fn to_array<const N: usize>(bytes: &[u8]) -> Result<[u8; N], CryptoError> {
    bytes.try_into().map_err(|_| CryptoError::InvalidLength {
        expected: N,
        actual: bytes.len(),
    })
}

/// Returns the slice with leading zero bytes removed.
///
/// An all-zero input yields an empty slice, which is how RLP and the
/// big-integer fields of most wire formats represent zero.
pub fn trim_leading_zeros(bytes: &[u8]) -> &[u8] {
    let start = bytes.iter().position(|&b| b != 0).unwrap_or(bytes.len());
    &bytes[start..]
}

/// Left-pads a big-endian integer to `N` bytes.
///
/// Leading zeros in the input are ignored, so a Java-style sign byte does not
/// count against the width.
pub fn left_pad<const N: usize>(bytes: &[u8]) -> Result<[u8; N], CryptoError> {
    let trimmed = trim_leading_zeros(bytes);
    if trimmed.len() > N {
        return Err(CryptoError::OutOfRange(format!(
            "{} bytes do not fit in {N}",
            trimmed.len()
        )));
    }
    let mut out = [0u8; N];
    out[N - trimmed.len()..].copy_from_slice(trimmed);
    Ok(out)
}

/// Minimal big-endian encoding of a `u128`; zero encodes as an empty vector.
pub fn u128_to_minimal_be(value: u128) -> Vec<u8> {
    trim_leading_zeros(&value.to_be_bytes()).to_vec()
}

/// Interprets up to 16 big-endian bytes as a `u128`.
pub fn u128_from_be(bytes: &[u8]) -> Result<u128, CryptoError> {
    let padded: [u8; 16] = left_pad(bytes)?;
    Ok(u128::from_be_bytes(padded))
}
