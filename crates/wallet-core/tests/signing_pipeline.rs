//! End-to-end keysign flows through the public API: payload -> digests ->
//! signatures from local keys -> compiled transaction -> decoded back.

use std::str::FromStr;

use alloy_primitives::U256;
use bip32::{ChildNumber, XPrv};
use k256::ecdsa::SigningKey;
use proptest::prelude::*;
use wallet_core::payload::{ERC20ApprovePayload, ThorChainSwapPayload, UtxoInfo};
use wallet_core::IbcDenomTrace;
use wallet_core::{
    BlockChainSpecific, Chain, Coin, KeysignPayload, KeysignSignature, SignatureMap, SigningConfig,
    SigningError, SigningHelper, SwapPayload, Vault,
};

fn master() -> XPrv {
    XPrv::new([0x42u8; 32]).unwrap()
}

fn vault() -> Vault {
    let master = master();
    Vault {
        pub_key_ecdsa: hex::encode(master.public_key().to_bytes()),
        pub_key_eddsa: hex::encode(ed25519_dalek::SigningKey::from_bytes(&[9u8; 32]).verifying_key().to_bytes()),
        hex_chain_code: hex::encode(master.attrs().chain_code),
        local_party_id: "device-1".into(),
    }
}

fn chain_key(chain: Chain) -> SigningKey {
    let mut key = master();
    for part in chain.derivation_path().replace('\'', "").split('/').skip(1) {
        key = key
            .derive_child(ChildNumber::new(part.parse().unwrap(), false).unwrap())
            .unwrap();
    }
    key.private_key().clone()
}

fn sign(key: &SigningKey, hashes: &[String]) -> SignatureMap {
    hashes
        .iter()
        .map(|hash| {
            let (sig, recid) = key.sign_prehash_recoverable(&hex::decode(hash).unwrap()).unwrap();
            (hash.clone(), KeysignSignature::from_ecdsa(&sig, recid.to_byte()))
        })
        .collect()
}

fn public_hex(key: &SigningKey) -> String {
    hex::encode(key.verifying_key().to_sec1_bytes())
}

fn eth_address() -> String {
    let public = chain_key(Chain::Ethereum).verifying_key().to_sec1_bytes();
    chain_evm::address::pubkey_to_address(&public).unwrap()
}

fn helper() -> SigningHelper {
    SigningHelper::new(&SigningConfig::default()).unwrap()
}

fn eth_payload(amount: U256) -> KeysignPayload {
    KeysignPayload {
        coin: Coin::native(Chain::Ethereum, &eth_address(), ""),
        to_address: "0x000000000000000000000000000000000000dEaD".into(),
        to_amount: amount,
        block_chain_specific: BlockChainSpecific::Ethereum {
            nonce: 0,
            gas_limit: 21_000,
            max_fee_per_gas_wei: 50_000_000_000,
            priority_fee_wei: 1_000_000_000,
        },
        utxos: Vec::new(),
        memo: None,
        swap_payload: None,
        approve_payload: None,
        defi_action: Default::default(),
        vault_public_key_ecdsa: vault().pub_key_ecdsa,
        vault_local_party_id: "device-1".into(),
    }
}

// ─── EVM ───────────────────────────────────────────────────────────

#[test]
fn eth_one_ether_transfer() {
    let one_eth = U256::from_str("1000000000000000000").unwrap();
    let payload = eth_payload(one_eth);
    let hashes = helper().get_keysign_messages(&payload, &vault()).unwrap();
    assert_eq!(hashes.len(), 1);

    let signed = helper()
        .get_signed_transaction(&payload, &vault(), &sign(&chain_key(Chain::Ethereum), &hashes))
        .unwrap();
    let raw = hex::decode(&signed.raw_transaction).unwrap();
    assert_eq!(raw[0], 0x02);

    let (tx, _) = chain_evm::transaction::decode_signed(&raw).unwrap();
    assert_eq!(tx.value, one_eth);
    assert_eq!(tx.chain_id, 1);
    assert_eq!(tx.gas_limit, 21_000);
    assert_eq!(
        tx.to,
        chain_evm::address::parse_address("0x000000000000000000000000000000000000dEaD").unwrap()
    );
}

#[test]
fn changed_amount_rejects_old_signature() {
    let payload = eth_payload(U256::from(1_000u64));
    let hashes = helper().get_keysign_messages(&payload, &vault()).unwrap();
    let signatures = sign(&chain_key(Chain::Ethereum), &hashes);

    let mutated = eth_payload(U256::from(1_001u64));
    let err = helper()
        .get_signed_transaction(&mutated, &vault(), &signatures)
        .unwrap_err();
    assert!(matches!(err, SigningError::MissingSignature(_)));
}

#[test]
fn uppercase_hash_key_is_not_found() {
    let payload = eth_payload(U256::from(1_000u64));
    let hashes = helper().get_keysign_messages(&payload, &vault()).unwrap();
    let signatures: SignatureMap = sign(&chain_key(Chain::Ethereum), &hashes)
        .into_iter()
        .map(|(hash, sig)| (hash.to_uppercase(), sig))
        .collect();
    let err = helper()
        .get_signed_transaction(&payload, &vault(), &signatures)
        .unwrap_err();
    assert!(matches!(err, SigningError::MissingSignature(ref h) if *h == hashes[0]));
}

// ─── UTXO ──────────────────────────────────────────────────────────

#[test]
fn bitcoin_spends_both_inputs() {
    let key = SigningKey::from_slice(&[0x31; 32]).unwrap();
    let public = public_hex(&key);
    let from = chain_utxo::address::pubkey_to_address(
        chain_utxo::UtxoChain::Bitcoin,
        &key.verifying_key().to_sec1_bytes(),
    )
    .unwrap();
    let to = chain_utxo::address::pubkey_to_address(
        chain_utxo::UtxoChain::Bitcoin,
        &SigningKey::from_slice(&[0x32; 32]).unwrap().verifying_key().to_sec1_bytes(),
    )
    .unwrap();
    let payload = KeysignPayload {
        coin: Coin::native(Chain::Bitcoin, &from, &public),
        to_address: to.clone(),
        to_amount: U256::from(6_000u64),
        block_chain_specific: BlockChainSpecific::Utxo {
            byte_fee: 1,
            send_max_amount: false,
        },
        utxos: vec![
            UtxoInfo {
                hash: "11".repeat(32),
                amount: 5_000,
                index: 0,
            },
            UtxoInfo {
                hash: "22".repeat(32),
                amount: 3_000,
                index: 1,
            },
        ],
        memo: None,
        swap_payload: None,
        approve_payload: None,
        defi_action: Default::default(),
        vault_public_key_ecdsa: vault().pub_key_ecdsa,
        vault_local_party_id: "device-1".into(),
    };

    let hashes = helper().get_keysign_messages(&payload, &vault()).unwrap();
    assert_eq!(hashes.len(), 2);
    assert!(hashes[0] < hashes[1]);

    let signed = helper()
        .get_signed_transaction(&payload, &vault(), &sign(&key, &hashes))
        .unwrap();
    let payments = chain_utxo::transaction::decode_payments(
        chain_utxo::UtxoChain::Bitcoin,
        &hex::decode(&signed.raw_transaction).unwrap(),
    )
    .unwrap();
    assert_eq!(payments[0], (to, 6_000));
}

// ─── Cosmos ────────────────────────────────────────────────────────

#[test]
fn gaia_ibc_transfer_over_channel_141() {
    let key = SigningKey::from_slice(&[0x33; 32]).unwrap();
    let public = public_hex(&key);
    let from =
        chain_cosmos::address::pubkey_to_address(&key.verifying_key().to_sec1_bytes(), "cosmos").unwrap();
    let payload = KeysignPayload {
        coin: Coin::native(Chain::GaiaChain, &from, &public),
        to_address: chain_cosmos::address::encode_address("osmo", &[0x44; 20]).unwrap(),
        to_amount: U256::from(250_000u64),
        block_chain_specific: BlockChainSpecific::Cosmos {
            account_number: 7,
            sequence: 1,
            gas: 7_500,
            ibc_denom_trace: Some(IbcDenomTrace {
                path: "transfer/channel-141".into(),
                base_denom: "uosmo".into(),
                latest_block: "22000000_1700000600000000000".into(),
            }),
        },
        utxos: Vec::new(),
        memo: Some("channel-0:channel-141:0:hello".into()),
        swap_payload: None,
        approve_payload: None,
        defi_action: Default::default(),
        vault_public_key_ecdsa: vault().pub_key_ecdsa,
        vault_local_party_id: "device-1".into(),
    };

    let hashes = helper().get_keysign_messages(&payload, &vault()).unwrap();
    assert_eq!(hashes.len(), 1);
    let signed = helper()
        .get_signed_transaction(&payload, &vault(), &sign(&key, &hashes))
        .unwrap();
    let decoded = chain_cosmos::tx::decode_envelope(&signed.raw_transaction).unwrap();
    assert_eq!(decoded.memo, "");
    match &decoded.messages[0] {
        chain_cosmos::CosmosMsg::IbcTransfer {
            source_channel,
            memo,
            timeout_height,
            timeout_timestamp,
            ..
        } => {
            assert_eq!(source_channel, "channel-141");
            assert_eq!(memo, "hello");
            assert_eq!(timeout_height.revision_number, 4);
            assert_eq!(timeout_height.revision_height, 22_001_000);
            assert_eq!(*timeout_timestamp, 1_700_000_600_000_000_000);
        }
        other => panic!("unexpected message {other:?}"),
    }
}

#[test]
fn ibc_transfer_without_timeout_is_refused() {
    let key = SigningKey::from_slice(&[0x33; 32]).unwrap();
    let from =
        chain_cosmos::address::pubkey_to_address(&key.verifying_key().to_sec1_bytes(), "cosmos").unwrap();
    let payload = KeysignPayload {
        coin: Coin::native(Chain::GaiaChain, &from, &public_hex(&key)),
        to_address: chain_cosmos::address::encode_address("osmo", &[0x44; 20]).unwrap(),
        to_amount: U256::from(250_000u64),
        block_chain_specific: BlockChainSpecific::Cosmos {
            account_number: 7,
            sequence: 1,
            gas: 7_500,
            ibc_denom_trace: None,
        },
        utxos: Vec::new(),
        memo: Some("channel-0:channel-141:soon:hello".into()),
        swap_payload: None,
        approve_payload: None,
        defi_action: Default::default(),
        vault_public_key_ecdsa: vault().pub_key_ecdsa,
        vault_local_party_id: "device-1".into(),
    };
    assert!(matches!(
        helper().get_keysign_messages(&payload, &vault()),
        Err(SigningError::InvalidPayload(_))
    ));
}

// ─── Approve + swap ────────────────────────────────────────────────

#[test]
fn approve_then_thorchain_swap() {
    let usdc = "0xa0b86991c6218b36c1d19d4a2e9eb0ce3606eb48";
    let router = "0xd37bbe5744d730a1d98d8dc97c42f0ca46ad7146";
    let from_coin = Coin::token(Chain::Ethereum, "USDC", usdc, 6, &eth_address(), "");
    let mut payload = eth_payload(U256::ZERO);
    payload.coin = from_coin.clone();
    payload.block_chain_specific = BlockChainSpecific::Ethereum {
        nonce: 11,
        gas_limit: 150_000,
        max_fee_per_gas_wei: 40_000_000_000,
        priority_fee_wei: 1_000_000_000,
    };
    payload.approve_payload = Some(ERC20ApprovePayload {
        amount: U256::from(100_000_000u64),
        spender: router.into(),
    });
    payload.swap_payload = Some(SwapPayload::ThorChain(ThorChainSwapPayload {
        from_address: eth_address(),
        from_coin,
        to_coin: Coin::native(Chain::Bitcoin, "bc1qdestination", ""),
        vault_address: "0x00000000000000000000000000000000000000bb".into(),
        router_address: Some(router.into()),
        from_amount: U256::from(100_000_000u64),
        to_amount_decimal: "0.0015".into(),
        to_amount_limit: "150000".into(),
        streaming_interval: "1".into(),
        streaming_quantity: "0".into(),
        expiration_time: 1_700_000_900,
        is_affiliate: true,
    }));

    let hashes = helper().get_keysign_messages(&payload, &vault()).unwrap();
    assert_eq!(hashes.len(), 2);
    assert!(hashes[0] < hashes[1]);

    let signatures = sign(&chain_key(Chain::Ethereum), &hashes);
    let approve = helper()
        .signed_approve_transaction(&payload, &vault(), &signatures)
        .unwrap();
    let swap = helper()
        .get_signed_transaction(&payload, &vault(), &signatures)
        .unwrap();

    let (approve_tx, _) =
        chain_evm::transaction::decode_signed(&hex::decode(&approve.raw_transaction).unwrap()).unwrap();
    let (swap_tx, _) =
        chain_evm::transaction::decode_signed(&hex::decode(&swap.raw_transaction).unwrap()).unwrap();
    assert_eq!(approve_tx.nonce, 11);
    assert_eq!(swap_tx.nonce, 12);
    assert_eq!(swap_tx.to, chain_evm::address::parse_address(router).unwrap());
    assert_eq!(&swap_tx.data[..4], &[0x44, 0xbc, 0x93, 0x7b]);
    let mut expected = vec![
        hex::encode(approve_tx.signing_hash()),
        hex::encode(swap_tx.signing_hash()),
    ];
    expected.sort();
    assert_eq!(hashes, expected);
}

// ─── Determinism ───────────────────────────────────────────────────

#[test]
fn same_payload_same_output() {
    let payload = eth_payload(U256::from(123_456u64));
    let first = helper().get_keysign_messages(&payload, &vault()).unwrap();
    let second = helper().get_keysign_messages(&payload, &vault()).unwrap();
    assert_eq!(first, second);

    let signatures = sign(&chain_key(Chain::Ethereum), &first);
    let a = helper().get_signed_transaction(&payload, &vault(), &signatures).unwrap();
    let b = helper().get_signed_transaction(&payload, &vault(), &signatures).unwrap();
    assert_eq!(a, b);
}

proptest! {
    #[test]
    fn utxo_hashes_are_sorted(amounts in proptest::collection::vec(2_000u64..50_000, 1..6)) {
        let key = SigningKey::from_slice(&[0x35; 32]).unwrap();
        let from = chain_utxo::address::pubkey_to_address(
            chain_utxo::UtxoChain::Litecoin,
            &key.verifying_key().to_sec1_bytes(),
        )
        .unwrap();
        let total: u64 = amounts.iter().sum();
        let payload = KeysignPayload {
            coin: Coin::native(Chain::Litecoin, &from, &public_hex(&key)),
            to_address: from.clone(),
            to_amount: U256::ZERO,
            block_chain_specific: BlockChainSpecific::Utxo { byte_fee: 1, send_max_amount: true },
            utxos: amounts
                .iter()
                .enumerate()
                .map(|(i, amount)| UtxoInfo { hash: format!("{:064x}", i + 7), amount: *amount, index: i as u32 })
                .collect(),
            memo: None,
            swap_payload: None,
            approve_payload: None,
            defi_action: Default::default(),
            vault_public_key_ecdsa: String::new(),
            vault_local_party_id: "device-1".into(),
        };
        prop_assume!(total > 5_000);
        let hashes = helper().get_keysign_messages(&payload, &vault()).unwrap();
        prop_assert_eq!(hashes.len(), amounts.len());
        let mut sorted = hashes.clone();
        sorted.sort();
        prop_assert_eq!(hashes, sorted);
    }
}
