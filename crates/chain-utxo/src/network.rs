use std::fmt;

/// Locking-script family used for the wallet's own outputs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScriptKind {
    /// Native SegWit v0, signed with the BIP143 digest.
    P2wpkh,
    /// Legacy pay-to-pubkey-hash.
    P2pkh,
}

/// Supported UTXO chains.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UtxoChain {
    Bitcoin,
    BitcoinCash,
    Litecoin,
    Dogecoin,
    Dash,
    /// Transparent (t-address) Zcash.
    Zcash,
}

/// BCH signatures commit to `SIGHASH_ALL | SIGHASH_FORKID`.
pub const SIGHASH_ALL_FORKID: u32 = 0x41;

/// `SIGHASH_ALL`.
pub const SIGHASH_ALL: u32 = 0x01;

impl UtxoChain {
    pub const ALL: [UtxoChain; 6] = [
        UtxoChain::Bitcoin,
        UtxoChain::BitcoinCash,
        UtxoChain::Litecoin,
        UtxoChain::Dogecoin,
        UtxoChain::Dash,
        UtxoChain::Zcash,
    ];

    pub fn script_kind(self) -> ScriptKind {
        match self {
            UtxoChain::Bitcoin | UtxoChain::Litecoin => ScriptKind::P2wpkh,
            UtxoChain::BitcoinCash
            | UtxoChain::Dogecoin
            | UtxoChain::Dash
            | UtxoChain::Zcash => ScriptKind::P2pkh,
        }
    }

    /// Sighash flag appended to every signature.
    pub fn sighash_type(self) -> u32 {
        match self {
            UtxoChain::BitcoinCash => SIGHASH_ALL_FORKID,
            _ => SIGHASH_ALL,
        }
    }

    /// Base58 version prefix for pay-to-pubkey-hash addresses. Zcash uses
    /// two bytes.
    pub fn p2pkh_version(self) -> &'static [u8] {
        match self {
            UtxoChain::Bitcoin | UtxoChain::BitcoinCash => &[0x00],
            UtxoChain::Litecoin => &[0x30],
            UtxoChain::Dogecoin => &[0x1e],
            UtxoChain::Dash => &[0x4c],
            UtxoChain::Zcash => &[0x1c, 0xb8],
        }
    }

    /// Base58 version prefix for pay-to-script-hash addresses.
    pub fn p2sh_version(self) -> &'static [u8] {
        match self {
            UtxoChain::Bitcoin | UtxoChain::BitcoinCash => &[0x05],
            UtxoChain::Litecoin => &[0x32],
            UtxoChain::Dogecoin => &[0x16],
            UtxoChain::Dash => &[0x10],
            UtxoChain::Zcash => &[0x1c, 0xbd],
        }
    }

    /// Human-readable part of segwit addresses, where the chain has them.
    pub fn bech32_hrp(self) -> Option<&'static str> {
        match self {
            UtxoChain::Bitcoin => Some("bc"),
            UtxoChain::Litecoin => Some("ltc"),
            _ => None,
        }
    }

    /// CashAddr prefix, Bitcoin Cash only.
    pub fn cashaddr_prefix(self) -> Option<&'static str> {
        match self {
            UtxoChain::BitcoinCash => Some("bitcoincash"),
            _ => None,
        }
    }

    /// Outputs below this value are not relayed.
    pub fn dust_threshold(self) -> u64 {
        match self {
            UtxoChain::Dogecoin => 1_000_000,
            UtxoChain::Litecoin => 1_000,
            _ => 546,
        }
    }

    pub fn ticker(self) -> &'static str {
        match self {
            UtxoChain::Bitcoin => "BTC",
            UtxoChain::BitcoinCash => "BCH",
            UtxoChain::Litecoin => "LTC",
            UtxoChain::Dogecoin => "DOGE",
            UtxoChain::Dash => "DASH",
            UtxoChain::Zcash => "ZEC",
        }
    }
}

impl fmt::Display for UtxoChain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            UtxoChain::Bitcoin => "bitcoin",
            UtxoChain::BitcoinCash => "bitcoin-cash",
            UtxoChain::Litecoin => "litecoin",
            UtxoChain::Dogecoin => "dogecoin",
            UtxoChain::Dash => "dash",
            UtxoChain::Zcash => "zcash",
        };
        f.write_str(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn segwit_chains() {
        assert_eq!(UtxoChain::Bitcoin.script_kind(), ScriptKind::P2wpkh);
        assert_eq!(UtxoChain::Litecoin.script_kind(), ScriptKind::P2wpkh);
    }

    #[test]
    fn legacy_chains() {
        for chain in [
            UtxoChain::BitcoinCash,
            UtxoChain::Dogecoin,
            UtxoChain::Dash,
            UtxoChain::Zcash,
        ] {
            assert_eq!(chain.script_kind(), ScriptKind::P2pkh);
            assert!(chain.bech32_hrp().is_none());
        }
    }

    #[test]
    fn only_bch_uses_forkid() {
        for chain in UtxoChain::ALL {
            let expected = if chain == UtxoChain::BitcoinCash { 0x41 } else { 0x01 };
            assert_eq!(chain.sighash_type(), expected);
        }
    }

    #[test]
    fn version_bytes() {
        assert_eq!(UtxoChain::Dogecoin.p2pkh_version(), [30]);
        assert_eq!(UtxoChain::Dash.p2pkh_version(), [76]);
        assert_eq!(UtxoChain::Litecoin.p2sh_version(), [50]);
        assert_eq!(UtxoChain::Zcash.p2pkh_version(), [0x1c, 0xb8]);
    }

    #[test]
    fn display_names() {
        assert_eq!(UtxoChain::Bitcoin.to_string(), "bitcoin");
        assert_eq!(UtxoChain::BitcoinCash.to_string(), "bitcoin-cash");
    }
}
