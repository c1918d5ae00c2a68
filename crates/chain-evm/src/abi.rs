//! Minimal ABI encoding for EVM function calls.
//!
//! Just enough to build ERC-20 and THORChain router calldata without pulling
//! in a full ABI parser. Static parameters occupy one word in the head;
//! dynamic ones (`String`, `Bytes`) place an offset in the head and their
//! length-prefixed, right-padded contents in the tail.

use alloy_primitives::{Address, U256};

/// A single ABI-encoded parameter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AbiParam {
    /// A 20-byte address, left-padded to 32 bytes.
    Address(Address),
    /// A 256-bit unsigned integer.
    Uint256(U256),
    /// Dynamic UTF-8 string.
    String(String),
    /// Dynamic bytes.
    Bytes(Vec<u8>),
}

impl AbiParam {
    fn is_dynamic(&self) -> bool {
        matches!(self, AbiParam::String(_) | AbiParam::Bytes(_))
    }
}

/// Encodes a function call with the given 4-byte selector and ABI parameters.
///
/// The output is `selector || head || tail`.
pub fn encode_function_call(selector: [u8; 4], params: &[AbiParam]) -> Vec<u8> {
    let mut data = Vec::with_capacity(4 + params.len() * 32);
    data.extend_from_slice(&selector);
    data.extend_from_slice(&encode_params(params));
    data
}

/// Encodes a parameter tuple without a selector.
pub fn encode_params(params: &[AbiParam]) -> Vec<u8> {
    let head_len = params.len() * 32;
    let mut head = Vec::with_capacity(head_len);
    let mut tail = Vec::new();

    for param in params {
        if param.is_dynamic() {
            head.extend_from_slice(&uint_word(U256::from(head_len + tail.len())));
            tail.extend_from_slice(&encode_dynamic(param));
        } else {
            head.extend_from_slice(&encode_static(param));
        }
    }

    head.extend_from_slice(&tail);
    head
}

fn uint_word(value: U256) -> [u8; 32] {
    value.to_be_bytes::<32>()
}

fn encode_static(param: &AbiParam) -> [u8; 32] {
    match param {
        AbiParam::Address(addr) => {
            let mut word = [0u8; 32];
            word[12..].copy_from_slice(addr.as_slice());
            word
        }
        AbiParam::Uint256(value) => uint_word(*value),
        AbiParam::String(_) | AbiParam::Bytes(_) => [0u8; 32],
    }
}

fn encode_dynamic(param: &AbiParam) -> Vec<u8> {
    let bytes: &[u8] = match param {
        AbiParam::String(s) => s.as_bytes(),
        AbiParam::Bytes(b) => b,
        _ => &[],
    };
    let padded_len = bytes.len().div_ceil(32) * 32;
    let mut out = Vec::with_capacity(32 + padded_len);
    out.extend_from_slice(&uint_word(U256::from(bytes.len())));
    out.extend_from_slice(bytes);
    out.resize(32 + padded_len, 0);
    out
}

/// Reads the 32-byte word at `index` (after any selector has been stripped).
pub fn word_at(data: &[u8], index: usize) -> Option<[u8; 32]> {
    let start = index.checked_mul(32)?;
    let slice = data.get(start..start + 32)?;
    let mut word = [0u8; 32];
    word.copy_from_slice(slice);
    Some(word)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn static_params_are_one_word_each() {
        let data = encode_function_call(
            [0xa9, 0x05, 0x9c, 0xbb],
            &[
                AbiParam::Address(Address::repeat_byte(0x11)),
                AbiParam::Uint256(U256::from(1000u64)),
            ],
        );
        assert_eq!(data.len(), 4 + 64);
        assert_eq!(&data[4..16], &[0u8; 12]);
        assert_eq!(&data[16..36], &[0x11; 20]);
        assert_eq!(data[67], 0xe8);
        assert_eq!(data[66], 0x03);
    }

    #[test]
    fn string_goes_to_tail_with_offset() {
        let encoded = encode_params(&[
            AbiParam::Uint256(U256::from(7u64)),
            AbiParam::String("hello".into()),
        ]);
        // head: 2 words, tail: length word + one padded word
        assert_eq!(encoded.len(), 4 * 32);
        assert_eq!(U256::from_be_bytes(word_at(&encoded, 1).unwrap()), U256::from(64u64));
        assert_eq!(U256::from_be_bytes(word_at(&encoded, 2).unwrap()), U256::from(5u64));
        assert_eq!(&encoded[96..101], b"hello");
        assert!(encoded[101..].iter().all(|&b| b == 0));
    }

    #[test]
    fn empty_string_has_length_word_only() {
        let encoded = encode_params(&[AbiParam::String(String::new())]);
        assert_eq!(encoded.len(), 64);
        assert_eq!(U256::from_be_bytes(word_at(&encoded, 0).unwrap()), U256::from(32u64));
        assert_eq!(U256::from_be_bytes(word_at(&encoded, 1).unwrap()), U256::ZERO);
    }

    #[test]
    fn word_at_out_of_range() {
        assert!(word_at(&[0u8; 40], 1).is_none());
    }
}
