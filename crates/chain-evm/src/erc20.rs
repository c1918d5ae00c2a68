use alloy_primitives::{Address, U256};

use crate::abi::{encode_function_call, word_at, AbiParam};
use crate::error::EvmError;

/// Function selector for `transfer(address,uint256)`: `0xa9059cbb`.
pub const TRANSFER_SELECTOR: [u8; 4] = [0xa9, 0x05, 0x9c, 0xbb];

/// Function selector for `approve(address,uint256)`: `0x095ea7b3`.
pub const APPROVE_SELECTOR: [u8; 4] = [0x09, 0x5e, 0xa7, 0xb3];

/// Encodes an ERC-20 `transfer(address,uint256)` call.
pub fn encode_transfer(to: Address, amount: U256) -> Vec<u8> {
    encode_function_call(
        TRANSFER_SELECTOR,
        &[AbiParam::Address(to), AbiParam::Uint256(amount)],
    )
}

/// Encodes an ERC-20 `approve(address,uint256)` call.
pub fn encode_approve(spender: Address, amount: U256) -> Vec<u8> {
    encode_function_call(
        APPROVE_SELECTOR,
        &[AbiParam::Address(spender), AbiParam::Uint256(amount)],
    )
}

fn decode_address_amount(selector: [u8; 4], data: &[u8]) -> Result<(Address, U256), EvmError> {
    if data.len() != 68 || data[..4] != selector {
        return Err(EvmError::DecodeError(format!(
            "expected {} call, got {} bytes",
            hex::encode(selector),
            data.len()
        )));
    }
    let body = &data[4..];
    let (Some(addr_word), Some(amount_word)) = (word_at(body, 0), word_at(body, 1)) else {
        return Err(EvmError::DecodeError("truncated calldata".into()));
    };
    if addr_word[..12].iter().any(|&b| b != 0) {
        return Err(EvmError::DecodeError("address word is not left-padded".into()));
    }
    Ok((
        Address::from_slice(&addr_word[12..]),
        U256::from_be_bytes(amount_word),
    ))
}

/// Decodes `transfer(address,uint256)` calldata into `(recipient, amount)`.
pub fn decode_transfer(data: &[u8]) -> Result<(Address, U256), EvmError> {
    decode_address_amount(TRANSFER_SELECTOR, data)
}

/// Decodes `approve(address,uint256)` calldata into `(spender, amount)`.
pub fn decode_approve(data: &[u8]) -> Result<(Address, U256), EvmError> {
    decode_address_amount(APPROVE_SELECTOR, data)
}
