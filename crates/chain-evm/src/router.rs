//! THORChain router calls.
//!
//! ERC-20 swaps into THORChain do not transfer to the vault directly; the
//! token is deposited through the router contract together with the swap
//! memo and an expiry after which the router refuses the deposit.

use alloy_primitives::{Address, U256};

use crate::abi::{encode_function_call, AbiParam};

/// Selector for `depositWithExpiry(address,address,uint256,string,uint256)`.
pub const DEPOSIT_WITH_EXPIRY_SELECTOR: [u8; 4] = [0x44, 0xbc, 0x93, 0x7b];

/// Encodes `depositWithExpiry(vault, asset, amount, memo, expiry)`.
pub fn encode_deposit_with_expiry(
    vault: Address,
    asset: Address,
    amount: U256,
    memo: &str,
    expiry: u64,
) -> Vec<u8> {
    encode_function_call(
        DEPOSIT_WITH_EXPIRY_SELECTOR,
        &[
            AbiParam::Address(vault),
            AbiParam::Address(asset),
            AbiParam::Uint256(amount),
            AbiParam::String(memo.to_string()),
            AbiParam::Uint256(U256::from(expiry)),
        ],
    )
}
