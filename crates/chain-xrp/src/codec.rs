//! Field-level pieces of the XRPL canonical binary format.

use crate::error::XrpError;

pub const TYPE_UINT16: u8 = 1;
pub const TYPE_UINT32: u8 = 2;
pub const TYPE_AMOUNT: u8 = 6;
pub const TYPE_BLOB: u8 = 7;
pub const TYPE_ACCOUNT: u8 = 8;
pub const TYPE_OBJECT: u8 = 14;
pub const TYPE_ARRAY: u8 = 15;

pub const OBJECT_END: u8 = 0xe1;
pub const ARRAY_END: u8 = 0xf1;

/// Native amounts are limited to 10^17 drops.
pub const MAX_DROPS: u64 = 100_000_000_000_000_000;
const POSITIVE_NATIVE: u64 = 0x4000_0000_0000_0000;

/// Appends the field id for `(type_code, field_code)`.
pub fn write_field_id(out: &mut Vec<u8>, type_code: u8, field_code: u8) {
    match (type_code < 16, field_code < 16) {
        (true, true) => out.push((type_code << 4) | field_code),
        (true, false) => out.extend_from_slice(&[type_code << 4, field_code]),
        (false, true) => out.extend_from_slice(&[field_code, type_code]),
        (false, false) => out.extend_from_slice(&[0, type_code, field_code]),
    }
}

/// Reads a field id, returning `(type_code, field_code)`.
pub fn read_field_id(buf: &mut &[u8]) -> Result<(u8, u8), XrpError> {
    let first = read_u8(buf)?;
    let type_code = first >> 4;
    let field_code = first & 0x0f;
    match (type_code, field_code) {
        (0, 0) => Ok((read_u8(buf)?, read_u8(buf)?)),
        (0, f) => Ok((read_u8(buf)?, f)),
        (t, 0) => Ok((t, read_u8(buf)?)),
        (t, f) => Ok((t, f)),
    }
}

/// Variable-length prefix (up to 918744 bytes).
pub fn write_vl(out: &mut Vec<u8>, data: &[u8]) -> Result<(), XrpError> {
    let len = data.len();
    if len <= 192 {
        out.push(len as u8);
    } else if len <= 12_480 {
        let v = len - 193;
        out.extend_from_slice(&[193 + (v >> 8) as u8, (v & 0xff) as u8]);
    } else if len <= 918_744 {
        let v = len - 12_481;
        out.extend_from_slice(&[
            241 + (v >> 16) as u8,
            ((v >> 8) & 0xff) as u8,
            (v & 0xff) as u8,
        ]);
    } else {
        return Err(XrpError::DecodeError(format!("blob of {len} bytes too long")));
    }
    out.extend_from_slice(data);
    Ok(())
}

pub fn read_vl<'a>(buf: &mut &'a [u8]) -> Result<&'a [u8], XrpError> {
    let b0 = usize::from(read_u8(buf)?);
    let len = if b0 <= 192 {
        b0
    } else if b0 <= 240 {
        193 + ((b0 - 193) << 8) + usize::from(read_u8(buf)?)
    } else if b0 <= 254 {
        let b1 = usize::from(read_u8(buf)?);
        let b2 = usize::from(read_u8(buf)?);
        12_481 + ((b0 - 241) << 16) + (b1 << 8) + b2
    } else {
        return Err(XrpError::DecodeError("invalid length prefix".into()));
    };
    take(buf, len)
}

/// Encodes a native XRP amount in drops.
pub fn encode_native_amount(drops: u64) -> Result<[u8; 8], XrpError> {
    if drops > MAX_DROPS {
        return Err(XrpError::InvalidAmount(format!("{drops} drops exceeds 10^17")));
    }
    Ok((POSITIVE_NATIVE | drops).to_be_bytes())
}

pub fn decode_native_amount(bytes: &[u8; 8]) -> Result<u64, XrpError> {
    let raw = u64::from_be_bytes(*bytes);
    if raw & 0x8000_0000_0000_0000 != 0 {
        return Err(XrpError::InvalidAmount("issued currency amount".into()));
    }
    Ok(raw & !POSITIVE_NATIVE)
}

pub fn read_u8(buf: &mut &[u8]) -> Result<u8, XrpError> {
    Ok(take(buf, 1)?[0])
}

pub fn read_array<const N: usize>(buf: &mut &[u8]) -> Result<[u8; N], XrpError> {
    let mut out = [0u8; N];
    out.copy_from_slice(take(buf, N)?);
    Ok(out)
}

fn take<'a>(buf: &mut &'a [u8], n: usize) -> Result<&'a [u8], XrpError> {
    if buf.len() < n {
        return Err(XrpError::DecodeError("unexpected end of data".into()));
    }
    let slice: &'a [u8] = *buf;
    let (head, rest) = slice.split_at(n);
    *buf = rest;
    Ok(head)
}
