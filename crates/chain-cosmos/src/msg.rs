//! Protobuf messages carried in a Cosmos `TxBody`.

use crypto_utils::proto::{ProtoReader, ProtoWriter};

use crate::error::CosmosError;

pub const MSG_SEND_URL: &str = "/cosmos.bank.v1beta1.MsgSend";
pub const MSG_TRANSFER_URL: &str = "/ibc.applications.transfer.v1.MsgTransfer";
pub const MSG_EXECUTE_CONTRACT_URL: &str = "/cosmwasm.wasm.v1.MsgExecuteContract";
pub const THOR_MSG_DEPOSIT_URL: &str = "/types.MsgDeposit";
pub const THOR_MSG_SEND_URL: &str = "/types.MsgSend";

const IBC_TRANSFER_PORT: &str = "transfer";

/// Blocks past the latest known height after which an IBC packet times out.
pub const IBC_TIMEOUT_HEIGHT_OFFSET: u64 = 1_000;

/// `cosmos.base.v1beta1.Coin`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Coin {
    pub denom: String,
    pub amount: String,
}

impl Coin {
    pub fn new(denom: impl Into<String>, amount: impl ToString) -> Self {
        Self {
            denom: denom.into(),
            amount: amount.to_string(),
        }
    }

    pub fn encode(&self) -> Vec<u8> {
        ProtoWriter::new()
            .string(1, &self.denom)
            .string(2, &self.amount)
            .finish()
    }

    pub fn decode(buf: &[u8]) -> Result<Self, CosmosError> {
        let mut coin = Coin::new("", "");
        for (field, value) in ProtoReader::new(buf).fields()? {
            match field {
                1 => coin.denom = value.as_str()?.to_string(),
                2 => coin.amount = value.as_str()?.to_string(),
                _ => {}
            }
        }
        if coin.amount.is_empty() {
            coin.amount = "0".into();
        }
        Ok(coin)
    }
}

/// THORChain/MayaChain asset identifier (`common.Asset`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ThorAsset {
    pub chain: String,
    pub symbol: String,
    pub ticker: String,
    pub synth: bool,
    pub trade: bool,
    pub secured: bool,
}

impl ThorAsset {
    /// The native asset of a THORChain-style network, e.g. `THOR.RUNE`.
    pub fn native(chain: &str, ticker: &str) -> Self {
        Self {
            chain: chain.into(),
            symbol: ticker.into(),
            ticker: ticker.into(),
            synth: false,
            trade: false,
            secured: false,
        }
    }

    fn encode(&self) -> Vec<u8> {
        ProtoWriter::new()
            .string(1, &self.chain)
            .string(2, &self.symbol)
            .string(3, &self.ticker)
            .bool(4, self.synth)
            .bool(5, self.trade)
            .bool(6, self.secured)
            .finish()
    }

    fn decode(buf: &[u8]) -> Result<Self, CosmosError> {
        let mut asset = ThorAsset::native("", "");
        for (field, value) in ProtoReader::new(buf).fields()? {
            match field {
                1 => asset.chain = value.as_str()?.to_string(),
                2 => asset.symbol = value.as_str()?.to_string(),
                3 => asset.ticker = value.as_str()?.to_string(),
                4 => asset.synth = value.as_u64()? != 0,
                5 => asset.trade = value.as_u64()? != 0,
                6 => asset.secured = value.as_u64()? != 0,
                _ => {}
            }
        }
        Ok(asset)
    }
}

/// `common.Coin` as used by `MsgDeposit`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ThorCoin {
    pub asset: ThorAsset,
    pub amount: String,
    pub decimals: i64,
}

impl ThorCoin {
    fn encode(&self) -> Vec<u8> {
        ProtoWriter::new()
            .message(1, &self.asset.encode())
            .string(2, &self.amount)
            .int64(3, self.decimals)
            .finish()
    }

    fn decode(buf: &[u8]) -> Result<Self, CosmosError> {
        let mut coin = ThorCoin {
            asset: ThorAsset::native("", ""),
            amount: "0".into(),
            decimals: 0,
        };
        for (field, value) in ProtoReader::new(buf).fields()? {
            match field {
                1 => coin.asset = ThorAsset::decode(value.as_bytes()?)?,
                2 => coin.amount = value.as_str()?.to_string(),
                3 => coin.decimals = value.as_u64()? as i64,
                _ => {}
            }
        }
        Ok(coin)
    }
}

/// Parsed IBC routing memo: `action:sourceChannel:timeout:...:memo`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IbcRoute {
    pub source_channel: String,
    /// Nanoseconds since the epoch; zero when the memo carries none.
    pub timeout_timestamp: u64,
    pub memo: String,
}

/// `ibc.core.client.v1.Height`
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct IbcHeight {
    pub revision_number: u64,
    pub revision_height: u64,
}

impl IbcHeight {
    fn encode(&self) -> Vec<u8> {
        ProtoWriter::new()
            .uint64(1, self.revision_number)
            .uint64(2, self.revision_height)
            .finish()
    }

    fn decode(buf: &[u8]) -> Result<Self, CosmosError> {
        let mut height = IbcHeight::default();
        for (field, value) in ProtoReader::new(buf).fields()? {
            match field {
                1 => height.revision_number = value.as_u64()?,
                2 => height.revision_height = value.as_u64()?,
                _ => {}
            }
        }
        Ok(height)
    }
}

/// When an IBC packet stops being relayable. At least one of the two must be
/// non-zero for the packet to be accepted.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct IbcTimeout {
    pub height: IbcHeight,
    /// Nanoseconds since the epoch.
    pub timestamp: u64,
}

impl IbcTimeout {
    /// Timeout from a `<height>_<timeoutNanos>` latest-block marker: the
    /// height is pushed [`IBC_TIMEOUT_HEIGHT_OFFSET`] blocks ahead.
    pub fn from_latest_block(latest_block: &str, revision_number: u64) -> Result<Self, CosmosError> {
        let (height, nanos) = latest_block.split_once('_').ok_or_else(|| {
            CosmosError::InvalidTimeout(format!(
                "latest block {latest_block:?} is not <height>_<nanos>"
            ))
        })?;
        let height: u64 = height.parse().map_err(|_| {
            CosmosError::InvalidTimeout(format!("latest block height {height:?} is not a number"))
        })?;
        let timestamp: u64 = nanos.parse().map_err(|_| {
            CosmosError::InvalidTimeout(format!("latest block timeout {nanos:?} is not a number"))
        })?;
        Ok(IbcTimeout {
            height: IbcHeight {
                revision_number,
                revision_height: height.saturating_add(IBC_TIMEOUT_HEIGHT_OFFSET),
            },
            timestamp,
        })
    }

    /// Timestamp-only timeout.
    pub fn at(timestamp: u64) -> Self {
        IbcTimeout {
            height: IbcHeight::default(),
            timestamp,
        }
    }

    pub fn is_zero(&self) -> bool {
        self.timestamp == 0 && self.height.revision_height == 0
    }
}

/// Recognizes an IBC routing memo. Anything with fewer than four
/// `:`-separated parts, or whose second part is not a channel, is a plain
/// memo. A timeout that is not a number reads as zero.
pub fn parse_ibc_memo(memo: &str) -> Option<IbcRoute> {
    let parts: Vec<&str> = memo.split(':').collect();
    if parts.len() < 4 || !parts[1].starts_with("channel-") {
        return None;
    }
    Some(IbcRoute {
        source_channel: parts[1].to_string(),
        timeout_timestamp: parts[2].parse().unwrap_or(0),
        memo: parts[parts.len() - 1].to_string(),
    })
}

/// A single message of a Cosmos transaction body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CosmosMsg {
    Send {
        from_address: String,
        to_address: String,
        amount: Vec<Coin>,
    },
    IbcTransfer {
        source_port: String,
        source_channel: String,
        token: Coin,
        sender: String,
        receiver: String,
        timeout_height: IbcHeight,
        timeout_timestamp: u64,
        memo: String,
    },
    ExecuteContract {
        sender: String,
        contract: String,
        msg: Vec<u8>,
        funds: Vec<Coin>,
    },
    ThorDeposit {
        coins: Vec<ThorCoin>,
        memo: String,
        signer: Vec<u8>,
    },
    ThorSend {
        from_address: Vec<u8>,
        to_address: Vec<u8>,
        amount: Vec<Coin>,
    },
}

impl CosmosMsg {
    /// IBC transfer on the `transfer` port routed by `route`, expiring at
    /// `timeout`.
    pub fn ibc_transfer(
        sender: &str,
        receiver: &str,
        token: Coin,
        route: IbcRoute,
        timeout: IbcTimeout,
    ) -> Result<Self, CosmosError> {
        if timeout.is_zero() {
            return Err(CosmosError::InvalidTimeout(
                "IBC transfer needs a timeout height or timestamp".into(),
            ));
        }
        Ok(CosmosMsg::IbcTransfer {
            source_port: IBC_TRANSFER_PORT.into(),
            source_channel: route.source_channel,
            token,
            sender: sender.into(),
            receiver: receiver.into(),
            timeout_height: timeout.height,
            timeout_timestamp: timeout.timestamp,
            memo: route.memo,
        })
    }

    /// CW20 `transfer` execute message.
    pub fn cw20_transfer(sender: &str, contract: &str, recipient: &str, amount: &str) -> Self {
        let msg = format!(
            "{{\"transfer\": {{ \"amount\": \"{amount}\", \"recipient\": \"{recipient}\" }} }}"
        );
        CosmosMsg::ExecuteContract {
            sender: sender.into(),
            contract: contract.into(),
            msg: msg.into_bytes(),
            funds: Vec::new(),
        }
    }

    pub fn type_url(&self) -> &'static str {
        match self {
            CosmosMsg::Send { .. } => MSG_SEND_URL,
            CosmosMsg::IbcTransfer { .. } => MSG_TRANSFER_URL,
            CosmosMsg::ExecuteContract { .. } => MSG_EXECUTE_CONTRACT_URL,
            CosmosMsg::ThorDeposit { .. } => THOR_MSG_DEPOSIT_URL,
            CosmosMsg::ThorSend { .. } => THOR_MSG_SEND_URL,
        }
    }

    /// Encodes the message value (without the `Any` wrapper).
    pub fn encode_value(&self) -> Vec<u8> {
        let mut w = ProtoWriter::new();
        match self {
            CosmosMsg::Send {
                from_address,
                to_address,
                amount,
            } => {
                w.string(1, from_address).string(2, to_address);
                for coin in amount {
                    w.message(3, &coin.encode());
                }
            }
            CosmosMsg::IbcTransfer {
                source_port,
                source_channel,
                token,
                sender,
                receiver,
                timeout_height,
                timeout_timestamp,
                memo,
            } => {
                w.string(1, source_port)
                    .string(2, source_channel)
                    .message(3, &token.encode())
                    .string(4, sender)
                    .string(5, receiver)
                    .message(6, &timeout_height.encode())
                    .uint64(7, *timeout_timestamp)
                    .string(8, memo);
            }
            CosmosMsg::ExecuteContract {
                sender,
                contract,
                msg,
                funds,
            } => {
                w.string(1, sender).string(2, contract).bytes(3, msg);
                for coin in funds {
                    w.message(5, &coin.encode());
                }
            }
            CosmosMsg::ThorDeposit {
                coins,
                memo,
                signer,
            } => {
                for coin in coins {
                    w.message(1, &coin.encode());
                }
                w.string(2, memo).bytes(3, signer);
            }
            CosmosMsg::ThorSend {
                from_address,
                to_address,
                amount,
            } => {
                w.bytes(1, from_address).bytes(2, to_address);
                for coin in amount {
                    w.message(3, &coin.encode());
                }
            }
        }
        w.finish()
    }

    /// Encodes as `google.protobuf.Any`.
    pub fn to_any(&self) -> Vec<u8> {
        ProtoWriter::new()
            .string(1, self.type_url())
            .bytes(2, &self.encode_value())
            .finish()
    }

    /// Decodes a `google.protobuf.Any` holding one of the supported messages.
    pub fn from_any(buf: &[u8]) -> Result<Self, CosmosError> {
        let mut type_url = "";
        let mut value: &[u8] = &[];
        for (field, v) in ProtoReader::new(buf).fields()? {
            match field {
                1 => type_url = v.as_str()?,
                2 => value = v.as_bytes()?,
                _ => {}
            }
        }
        let fields = ProtoReader::new(value).fields()?;
        let str_field = |n: u32| -> Result<String, CosmosError> {
            match fields.iter().find(|(f, _)| *f == n) {
                Some((_, v)) => Ok(v.as_str()?.to_string()),
                None => Ok(String::new()),
            }
        };
        let bytes_field = |n: u32| -> Result<Vec<u8>, CosmosError> {
            match fields.iter().find(|(f, _)| *f == n) {
                Some((_, v)) => Ok(v.as_bytes()?.to_vec()),
                None => Ok(Vec::new()),
            }
        };
        let coins = |n: u32| -> Result<Vec<Coin>, CosmosError> {
            fields
                .iter()
                .filter(|(f, _)| *f == n)
                .map(|(_, v)| Coin::decode(v.as_bytes()?))
                .collect()
        };

        match type_url {
            MSG_SEND_URL => Ok(CosmosMsg::Send {
                from_address: str_field(1)?,
                to_address: str_field(2)?,
                amount: coins(3)?,
            }),
            MSG_TRANSFER_URL => {
                let token = coins(3)?
                    .into_iter()
                    .next()
                    .ok_or_else(|| CosmosError::DecodeError("transfer without token".into()))?;
                let timeout_height = match fields.iter().find(|(f, _)| *f == 6) {
                    Some((_, v)) => IbcHeight::decode(v.as_bytes()?)?,
                    None => IbcHeight::default(),
                };
                let timeout_timestamp = match fields.iter().find(|(f, _)| *f == 7) {
                    Some((_, v)) => v.as_u64()?,
                    None => 0,
                };
                Ok(CosmosMsg::IbcTransfer {
                    source_port: str_field(1)?,
                    source_channel: str_field(2)?,
                    token,
                    sender: str_field(4)?,
                    receiver: str_field(5)?,
                    timeout_height,
                    timeout_timestamp,
                    memo: str_field(8)?,
                })
            }
            MSG_EXECUTE_CONTRACT_URL => Ok(CosmosMsg::ExecuteContract {
                sender: str_field(1)?,
                contract: str_field(2)?,
                msg: bytes_field(3)?,
                funds: coins(5)?,
            }),
            THOR_MSG_DEPOSIT_URL => Ok(CosmosMsg::ThorDeposit {
                coins: fields
                    .iter()
                    .filter(|(f, _)| *f == 1)
                    .map(|(_, v)| ThorCoin::decode(v.as_bytes()?))
                    .collect::<Result<_, _>>()?,
                memo: str_field(2)?,
                signer: bytes_field(3)?,
            }),
            THOR_MSG_SEND_URL => Ok(CosmosMsg::ThorSend {
                from_address: bytes_field(1)?,
                to_address: bytes_field(2)?,
                amount: coins(3)?,
            }),
            other => Err(CosmosError::DecodeError(format!(
                "unsupported message type {other}"
            ))),
        }
    }
}
