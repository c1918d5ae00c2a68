//! Minimal protobuf wire codec.
//!
//! Only the pieces the Cosmos and Tron transaction formats need: varints,
//! length-delimited fields and proto3 default omission. Scalar fields equal
//! to their default value are not written; embedded messages always are.

use crate::error::CryptoError;

const WIRE_VARINT: u8 = 0;
const WIRE_FIXED64: u8 = 1;
const WIRE_LEN: u8 = 2;
const WIRE_FIXED32: u8 = 5;

/// Appends `value` as a base-128 varint.
pub fn encode_varint(mut value: u64, out: &mut Vec<u8>) {
    while value >= 0x80 {
        out.push((value as u8) | 0x80);
        value >>= 7;
    }
    out.push(value as u8);
}

/// Decodes a varint from the start of `buf`, returning the value and the
/// number of bytes consumed.
pub fn decode_varint(buf: &[u8]) -> Result<(u64, usize), CryptoError> {
    let mut value: u64 = 0;
    for (i, &byte) in buf.iter().enumerate().take(10) {
        value |= u64::from(byte & 0x7f) << (7 * i);
        if byte & 0x80 == 0 {
            return Ok((value, i + 1));
        }
    }
    Err(CryptoError::MalformedProto("truncated varint".into()))
}

/// Builder for a single protobuf message.
#[derive(Debug, Default, Clone)]
pub struct ProtoWriter {
    buf: Vec<u8>,
}

impl ProtoWriter {
    pub fn new() -> Self {
        Self::default()
    }

    fn key(&mut self, field: u32, wire: u8) {
        encode_varint((u64::from(field) << 3) | u64::from(wire), &mut self.buf);
    }

    /// `uint64`/`int64`/enum field; zero is omitted.
    pub fn uint64(&mut self, field: u32, value: u64) -> &mut Self {
        if value != 0 {
            self.key(field, WIRE_VARINT);
            encode_varint(value, &mut self.buf);
        }
        self
    }

    /// `int64` field carried as two's complement; zero is omitted.
    pub fn int64(&mut self, field: u32, value: i64) -> &mut Self {
        self.uint64(field, value as u64)
    }

    pub fn bool(&mut self, field: u32, value: bool) -> &mut Self {
        self.uint64(field, u64::from(value))
    }

    /// `bytes` field; empty is omitted.
    pub fn bytes(&mut self, field: u32, value: &[u8]) -> &mut Self {
        if !value.is_empty() {
            self.len_delimited(field, value);
        }
        self
    }

    /// `string` field; empty is omitted.
    pub fn string(&mut self, field: u32, value: &str) -> &mut Self {
        self.bytes(field, value.as_bytes())
    }

    /// Embedded message. Always written, even when empty.
    pub fn message(&mut self, field: u32, encoded: &[u8]) -> &mut Self {
        self.len_delimited(field, encoded);
        self
    }

    fn len_delimited(&mut self, field: u32, value: &[u8]) {
        self.key(field, WIRE_LEN);
        encode_varint(value.len() as u64, &mut self.buf);
        self.buf.extend_from_slice(value);
    }

    pub fn finish(&mut self) -> Vec<u8> {
        std::mem::take(&mut self.buf)
    }
}

/// A decoded field value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProtoValue<'a> {
    Varint(u64),
    Fixed64(u64),
    Bytes(&'a [u8]),
    Fixed32(u32),
}

impl<'a> ProtoValue<'a> {
    pub fn as_u64(&self) -> Result<u64, CryptoError> {
        match self {
            ProtoValue::Varint(v) | ProtoValue::Fixed64(v) => Ok(*v),
            ProtoValue::Fixed32(v) => Ok(u64::from(*v)),
            ProtoValue::Bytes(_) => Err(CryptoError::MalformedProto(
                "expected scalar, found length-delimited".into(),
            )),
        }
    }

    pub fn as_bytes(&self) -> Result<&'a [u8], CryptoError> {
        match self {
            ProtoValue::Bytes(b) => Ok(b),
            _ => Err(CryptoError::MalformedProto(
                "expected length-delimited field".into(),
            )),
        }
    }

    pub fn as_str(&self) -> Result<&'a str, CryptoError> {
        std::str::from_utf8(self.as_bytes()?)
            .map_err(|e| CryptoError::MalformedProto(format!("invalid utf-8: {e}")))
    }
}

/// Sequential field reader over an encoded message.
#[derive(Debug, Clone)]
pub struct ProtoReader<'a> {
    buf: &'a [u8],
    pos: usize,
}

impl<'a> ProtoReader<'a> {
    pub fn new(buf: &'a [u8]) -> Self {
        Self { buf, pos: 0 }
    }

    fn take(&mut self, n: usize) -> Result<&'a [u8], CryptoError> {
        let end = self
            .pos
            .checked_add(n)
            .filter(|&end| end <= self.buf.len())
            .ok_or_else(|| CryptoError::MalformedProto("field runs past end".into()))?;
        let slice = &self.buf[self.pos..end];
        self.pos = end;
        Ok(slice)
    }

    fn varint(&mut self) -> Result<u64, CryptoError> {
        let (value, used) = decode_varint(&self.buf[self.pos..])?;
        self.pos += used;
        Ok(value)
    }

    /// Returns the next `(field number, value)` pair, or `None` at the end.
    pub fn next_field(&mut self) -> Result<Option<(u32, ProtoValue<'a>)>, CryptoError> {
        if self.pos >= self.buf.len() {
            return Ok(None);
        }
        let key = self.varint()?;
        let field = u32::try_from(key >> 3)
            .map_err(|_| CryptoError::MalformedProto("field number too large".into()))?;
        let value = match (key & 0x07) as u8 {
            WIRE_VARINT => ProtoValue::Varint(self.varint()?),
            WIRE_FIXED64 => {
                let raw = self.take(8)?;
                let mut le = [0u8; 8];
                le.copy_from_slice(raw);
                ProtoValue::Fixed64(u64::from_le_bytes(le))
            }
            WIRE_LEN => {
                let len = usize::try_from(self.varint()?)
                    .map_err(|_| CryptoError::MalformedProto("length too large".into()))?;
                ProtoValue::Bytes(self.take(len)?)
            }
            WIRE_FIXED32 => {
                let raw = self.take(4)?;
                let mut le = [0u8; 4];
                le.copy_from_slice(raw);
                ProtoValue::Fixed32(u32::from_le_bytes(le))
            }
            other => {
                return Err(CryptoError::MalformedProto(format!(
                    "unsupported wire type {other}"
                )))
            }
        };
        Ok(Some((field, value)))
    }

    /// Collects every field of the message.
    pub fn fields(mut self) -> Result<Vec<(u32, ProtoValue<'a>)>, CryptoError> {
        let mut out = Vec::new();
        while let Some(field) = self.next_field()? {
            out.push(field);
        }
        Ok(out)
    }
}

/// First occurrence of `field` in an encoded message.
pub fn find_field<'a>(buf: &'a [u8], field: u32) -> Result<Option<ProtoValue<'a>>, CryptoError> {
    Ok(ProtoReader::new(buf)
        .fields()?
        .into_iter()
        .find(|(f, _)| *f == field)
        .map(|(_, v)| v))
}
