//! The subset of CBOR used by Shelley transactions: unsigned integers,
//! byte strings, arrays, maps with integer keys, booleans and null.

use crate::error::AdaError;

const MAJOR_UNSIGNED: u8 = 0;
const MAJOR_BYTES: u8 = 2;
const MAJOR_ARRAY: u8 = 4;
const MAJOR_MAP: u8 = 5;
const MAJOR_SIMPLE: u8 = 7;

const SIMPLE_FALSE: u8 = 20;
const SIMPLE_TRUE: u8 = 21;
const SIMPLE_NULL: u8 = 22;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Cbor {
    Unsigned(u64),
    Bytes(Vec<u8>),
    Array(Vec<Cbor>),
    /// Entries are written in the order given.
    Map(Vec<(u64, Cbor)>),
    Bool(bool),
    Null,
}

fn write_head(out: &mut Vec<u8>, major: u8, value: u64) {
    let major = major << 5;
    match value {
        0..=23 => out.push(major | value as u8),
        24..=0xff => out.extend_from_slice(&[major | 24, value as u8]),
        0x100..=0xffff => {
            out.push(major | 25);
            out.extend_from_slice(&(value as u16).to_be_bytes());
        }
        0x1_0000..=0xffff_ffff => {
            out.push(major | 26);
            out.extend_from_slice(&(value as u32).to_be_bytes());
        }
        _ => {
            out.push(major | 27);
            out.extend_from_slice(&value.to_be_bytes());
        }
    }
}

impl Cbor {
    pub fn encode(&self) -> Vec<u8> {
        let mut out = Vec::new();
        self.encode_to(&mut out);
        out
    }

    pub fn encode_to(&self, out: &mut Vec<u8>) {
        match self {
            Cbor::Unsigned(v) => write_head(out, MAJOR_UNSIGNED, *v),
            Cbor::Bytes(b) => {
                write_head(out, MAJOR_BYTES, b.len() as u64);
                out.extend_from_slice(b);
            }
            Cbor::Array(items) => {
                write_head(out, MAJOR_ARRAY, items.len() as u64);
                for item in items {
                    item.encode_to(out);
                }
            }
            Cbor::Map(entries) => {
                write_head(out, MAJOR_MAP, entries.len() as u64);
                for (key, value) in entries {
                    write_head(out, MAJOR_UNSIGNED, *key);
                    value.encode_to(out);
                }
            }
            Cbor::Bool(b) => {
                let simple = if *b { SIMPLE_TRUE } else { SIMPLE_FALSE };
                out.push((MAJOR_SIMPLE << 5) | simple);
            }
            Cbor::Null => out.push((MAJOR_SIMPLE << 5) | SIMPLE_NULL),
        }
    }

    /// Decodes exactly one item spanning all of `buf`.
    pub fn decode(buf: &[u8]) -> Result<Self, AdaError> {
        let mut cursor = buf;
        let value = Self::decode_from(&mut cursor)?;
        if !cursor.is_empty() {
            return Err(AdaError::Cbor(format!("{} trailing bytes", cursor.len())));
        }
        Ok(value)
    }

    /// Decodes one item from the front of `buf`, advancing it.
    pub fn decode_from(buf: &mut &[u8]) -> Result<Self, AdaError> {
        let (major, info) = read_initial(buf)?;
        match major {
            MAJOR_UNSIGNED => Ok(Cbor::Unsigned(read_argument(buf, info)?)),
            MAJOR_BYTES => {
                let len = to_len(read_argument(buf, info)?)?;
                Ok(Cbor::Bytes(take(buf, len)?.to_vec()))
            }
            MAJOR_ARRAY => {
                let len = to_len(read_argument(buf, info)?)?;
                let mut items = Vec::with_capacity(len.min(1024));
                for _ in 0..len {
                    items.push(Self::decode_from(buf)?);
                }
                Ok(Cbor::Array(items))
            }
            MAJOR_MAP => {
                let len = to_len(read_argument(buf, info)?)?;
                let mut entries = Vec::with_capacity(len.min(1024));
                for _ in 0..len {
                    let key = match Self::decode_from(buf)? {
                        Cbor::Unsigned(k) => k,
                        other => {
                            return Err(AdaError::Cbor(format!(
                                "unsupported map key {other:?}"
                            )))
                        }
                    };
                    entries.push((key, Self::decode_from(buf)?));
                }
                Ok(Cbor::Map(entries))
            }
            MAJOR_SIMPLE => match info {
                SIMPLE_FALSE => Ok(Cbor::Bool(false)),
                SIMPLE_TRUE => Ok(Cbor::Bool(true)),
                SIMPLE_NULL => Ok(Cbor::Null),
                other => Err(AdaError::Cbor(format!("unsupported simple value {other}"))),
            },
            other => Err(AdaError::Cbor(format!("unsupported major type {other}"))),
        }
    }

    pub fn as_u64(&self) -> Result<u64, AdaError> {
        match self {
            Cbor::Unsigned(v) => Ok(*v),
            other => Err(AdaError::Cbor(format!("expected unsigned, got {other:?}"))),
        }
    }

    pub fn as_bytes(&self) -> Result<&[u8], AdaError> {
        match self {
            Cbor::Bytes(b) => Ok(b),
            other => Err(AdaError::Cbor(format!("expected bytes, got {other:?}"))),
        }
    }

    pub fn as_array(&self) -> Result<&[Cbor], AdaError> {
        match self {
            Cbor::Array(items) => Ok(items),
            other => Err(AdaError::Cbor(format!("expected array, got {other:?}"))),
        }
    }

    pub fn as_map(&self) -> Result<&[(u64, Cbor)], AdaError> {
        match self {
            Cbor::Map(entries) => Ok(entries),
            other => Err(AdaError::Cbor(format!("expected map, got {other:?}"))),
        }
    }

    /// Value under `key` in a map.
    pub fn get(&self, key: u64) -> Result<&Cbor, AdaError> {
        self.as_map()?
            .iter()
            .find(|(k, _)| *k == key)
            .map(|(_, v)| v)
            .ok_or_else(|| AdaError::Cbor(format!("missing map key {key}")))
    }
}

fn read_initial(buf: &mut &[u8]) -> Result<(u8, u8), AdaError> {
    let byte = take(buf, 1)?[0];
    Ok((byte >> 5, byte & 0x1f))
}

fn read_argument(buf: &mut &[u8], info: u8) -> Result<u64, AdaError> {
    let width = match info {
        0..=23 => return Ok(u64::from(info)),
        24 => 1,
        25 => 2,
        26 => 4,
        27 => 8,
        other => {
            return Err(AdaError::Cbor(format!(
                "unsupported additional info {other}"
            )))
        }
    };
    let mut be = [0u8; 8];
    be[8 - width..].copy_from_slice(take(buf, width)?);
    Ok(u64::from_be_bytes(be))
}

fn to_len(value: u64) -> Result<usize, AdaError> {
    usize::try_from(value).map_err(|_| AdaError::Cbor("length too large".into()))
}

fn take<'a>(buf: &mut &'a [u8], n: usize) -> Result<&'a [u8], AdaError> {
    let slice: &'a [u8] = *buf;
    if slice.len() < n {
        return Err(AdaError::Cbor("unexpected end of data".into()));
    }
    let (head, rest) = slice.split_at(n);
    *buf = rest;
    Ok(head)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn integer_heads() {
        assert_eq!(Cbor::Unsigned(23).encode(), vec![0x17]);
        assert_eq!(Cbor::Unsigned(24).encode(), vec![0x18, 0x18]);
        assert_eq!(Cbor::Unsigned(1000).encode(), vec![0x19, 0x03, 0xe8]);
        assert_eq!(
            Cbor::Unsigned(1_000_000).encode(),
            vec![0x1a, 0x00, 0x0f, 0x42, 0x40]
        );
    }

    #[test]
    fn simple_values() {
        assert_eq!(Cbor::Bool(true).encode(), vec![0xf5]);
        assert_eq!(Cbor::Bool(false).encode(), vec![0xf4]);
        assert_eq!(Cbor::Null.encode(), vec![0xf6]);
    }

    #[test]
    fn nested_structure() {
        let value = Cbor::Array(vec![
            Cbor::Map(vec![(0, Cbor::Bytes(vec![1, 2])), (2, Cbor::Unsigned(7))]),
            Cbor::Bool(true),
            Cbor::Null,
        ]);
        let encoded = value.encode();
        assert_eq!(hex::encode(&encoded), "83a2004201020207f5f6");
        assert_eq!(Cbor::decode(&encoded).unwrap(), value);
    }

    #[test]
    fn rejects_truncated_and_trailing() {
        assert!(Cbor::decode(&[0x42, 0x01]).is_err());
        assert!(Cbor::decode(&[0x01, 0x02]).is_err());
        assert!(Cbor::decode(&[]).is_err());
    }

    proptest! {
        #[test]
        fn unsigned_round_trip(v in any::<u64>()) {
            prop_assert_eq!(Cbor::decode(&Cbor::Unsigned(v).encode()).unwrap(), Cbor::Unsigned(v));
        }
    }
}
