//! Protobuf-compatible wire primitives
//!
//! Only the subset the metadata schema needs: varints, length-delimited
//! fields, and skipping of unknown fixed-width fields. Messages implement
//! [`WireMessage`] by writing their non-default fields in field-number order
//! and merging fields one at a time on decode.

use bytes::{Buf, BufMut};
use thiserror::Error;

/// Errors produced while decoding schema messages
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DecodeError {
    #[error("unexpected end of input")]
    Truncated,

    #[error("varint longer than 10 bytes")]
    VarintOverflow,

    #[error("invalid wire type {0}")]
    InvalidWireType(u8),

    #[error("invalid field number")]
    InvalidFieldNumber,

    #[error("field {field} has wire type {found:?}, expected {expected:?}")]
    WrongWireType {
        field: u32,
        expected: WireType,
        found: WireType,
    },

    #[error("field {0} conflicts with an already decoded payload branch")]
    ConflictingOneOf(u32),

    #[error("invalid UTF-8 in field {0}")]
    InvalidUtf8(u32),
}

/// Wire types understood by the codec
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum WireType {
    Varint,
    Fixed64,
    LengthDelimited,
    Fixed32,
}

impl WireType {
    fn from_bits(bits: u8) -> Result<Self, DecodeError> {
        match bits {
            0 => Ok(WireType::Varint),
            1 => Ok(WireType::Fixed64),
            2 => Ok(WireType::LengthDelimited),
            5 => Ok(WireType::Fixed32),
            other => Err(DecodeError::InvalidWireType(other)),
        }
    }

    fn bits(self) -> u64 {
        match self {
            WireType::Varint => 0,
            WireType::Fixed64 => 1,
            WireType::LengthDelimited => 2,
            WireType::Fixed32 => 5,
        }
    }
}

/// A message with a fixed field numbering
pub trait WireMessage: Default + Sized {
    /// Append every non-default field to `buf`
    fn encode_raw(&self, buf: &mut Vec<u8>);

    /// Consume one field whose key has already been read
    fn merge_field(
        &mut self,
        field: u32,
        wire_type: WireType,
        buf: &mut &[u8],
    ) -> Result<(), DecodeError>;

    fn encode_to_vec(&self) -> Vec<u8> {
        let mut buf = Vec::new();
        self.encode_raw(&mut buf);
        buf
    }

    /// Merge all fields in `buf` into `self`
    fn merge(&mut self, mut buf: &[u8]) -> Result<(), DecodeError> {
        while !buf.is_empty() {
            let (field, wire_type) = decode_key(&mut buf)?;
            self.merge_field(field, wire_type, &mut buf)?;
        }
        Ok(())
    }

    fn decode(buf: &[u8]) -> Result<Self, DecodeError> {
        let mut message = Self::default();
        message.merge(buf)?;
        Ok(message)
    }
}

pub fn encode_varint(mut value: u64, buf: &mut impl BufMut) {
    while value >= 0x80 {
        buf.put_u8((value as u8 & 0x7f) | 0x80);
        value >>= 7;
    }
    buf.put_u8(value as u8);
}

pub fn decode_varint<B: Buf>(buf: &mut B) -> Result<u64, DecodeError> {
    let mut value = 0u64;
    for i in 0..10 {
        if !buf.has_remaining() {
            return Err(DecodeError::Truncated);
        }
        let byte = buf.get_u8();
        value |= u64::from(byte & 0x7f) << (i * 7);
        if byte < 0x80 {
            return Ok(value);
        }
    }
    Err(DecodeError::VarintOverflow)
}

fn encode_key(field: u32, wire_type: WireType, buf: &mut impl BufMut) {
    encode_varint((u64::from(field) << 3) | wire_type.bits(), buf);
}

fn decode_key(buf: &mut &[u8]) -> Result<(u32, WireType), DecodeError> {
    let key = decode_varint(buf)?;
    let wire_type = WireType::from_bits((key & 0x7) as u8)?;
    let field = u32::try_from(key >> 3).map_err(|_| DecodeError::InvalidFieldNumber)?;
    if field == 0 {
        return Err(DecodeError::InvalidFieldNumber);
    }
    Ok((field, wire_type))
}

fn take_len_delimited<'a>(buf: &mut &'a [u8]) -> Result<&'a [u8], DecodeError> {
    let len = decode_varint(buf)?;
    let len = usize::try_from(len).map_err(|_| DecodeError::Truncated)?;
    if buf.len() < len {
        return Err(DecodeError::Truncated);
    }
    let (head, tail) = buf.split_at(len);
    *buf = tail;
    Ok(head)
}

fn take_fixed(buf: &mut &[u8], len: usize) -> Result<(), DecodeError> {
    if buf.len() < len {
        return Err(DecodeError::Truncated);
    }
    buf.advance(len);
    Ok(())
}

fn expect(field: u32, expected: WireType, found: WireType) -> Result<(), DecodeError> {
    if expected == found {
        Ok(())
    } else {
        Err(DecodeError::WrongWireType {
            field,
            expected,
            found,
        })
    }
}

/// Skip a field this schema does not know about
pub fn skip_field(wire_type: WireType, buf: &mut &[u8]) -> Result<(), DecodeError> {
    match wire_type {
        WireType::Varint => decode_varint(buf).map(|_| ()),
        WireType::Fixed64 => take_fixed(buf, 8),
        WireType::LengthDelimited => take_len_delimited(buf).map(|_| ()),
        WireType::Fixed32 => take_fixed(buf, 4),
    }
}

// === Field writers ===

pub fn write_uint64(field: u32, value: u64, buf: &mut Vec<u8>) {
    encode_key(field, WireType::Varint, buf);
    encode_varint(value, buf);
}

pub fn write_uint32(field: u32, value: u32, buf: &mut Vec<u8>) {
    write_uint64(field, u64::from(value), buf);
}

/// Enums are int32 on the wire; negative values are sign-extended to ten bytes
pub fn write_enum(field: u32, value: i32, buf: &mut Vec<u8>) {
    write_uint64(field, i64::from(value) as u64, buf);
}

pub fn write_string(field: u32, value: &str, buf: &mut Vec<u8>) {
    encode_key(field, WireType::LengthDelimited, buf);
    encode_varint(value.len() as u64, buf);
    buf.put_slice(value.as_bytes());
}

pub fn write_message<M: WireMessage>(field: u32, message: &M, buf: &mut Vec<u8>) {
    let nested = message.encode_to_vec();
    encode_key(field, WireType::LengthDelimited, buf);
    encode_varint(nested.len() as u64, buf);
    buf.put_slice(&nested);
}

// === Field readers ===

pub fn read_uint64(field: u32, wire_type: WireType, buf: &mut &[u8]) -> Result<u64, DecodeError> {
    expect(field, WireType::Varint, wire_type)?;
    decode_varint(buf)
}

pub fn read_uint32(field: u32, wire_type: WireType, buf: &mut &[u8]) -> Result<u32, DecodeError> {
    read_uint64(field, wire_type, buf).map(|v| v as u32)
}

pub fn read_enum(field: u32, wire_type: WireType, buf: &mut &[u8]) -> Result<i32, DecodeError> {
    read_uint64(field, wire_type, buf).map(|v| v as i32)
}

pub fn read_string(field: u32, wire_type: WireType, buf: &mut &[u8]) -> Result<String, DecodeError> {
    expect(field, WireType::LengthDelimited, wire_type)?;
    let bytes = take_len_delimited(buf)?;
    String::from_utf8(bytes.to_vec()).map_err(|_| DecodeError::InvalidUtf8(field))
}

/// Merge a nested message into `target`
pub fn read_message<M: WireMessage>(
    field: u32,
    wire_type: WireType,
    buf: &mut &[u8],
    target: &mut M,
) -> Result<(), DecodeError> {
    expect(field, WireType::LengthDelimited, wire_type)?;
    let bytes = take_len_delimited(buf)?;
    target.merge(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_varint_boundaries() {
        for value in [0u64, 1, 127, 128, 300, u32::MAX as u64, u64::MAX] {
            let mut buf = Vec::new();
            encode_varint(value, &mut buf);
            let mut slice = buf.as_slice();
            assert_eq!(decode_varint(&mut slice).unwrap(), value);
            assert!(slice.is_empty());
        }
    }

    #[test]
    fn test_varint_known_encoding() {
        let mut buf = Vec::new();
        encode_varint(300, &mut buf);
        assert_eq!(buf, vec![0xac, 0x02]);
    }

    #[test]
    fn test_varint_truncated() {
        let mut slice: &[u8] = &[0x80, 0x80];
        assert_eq!(decode_varint(&mut slice), Err(DecodeError::Truncated));
    }

    #[test]
    fn test_varint_overflow() {
        let bytes = [0xffu8; 11];
        let mut slice: &[u8] = &bytes;
        assert_eq!(decode_varint(&mut slice), Err(DecodeError::VarintOverflow));
    }

    #[test]
    fn test_negative_enum_is_ten_bytes() {
        let mut buf = Vec::new();
        write_enum(1, -1, &mut buf);
        assert_eq!(buf.len(), 11);

        let mut slice = &buf[1..];
        assert_eq!(read_enum(1, WireType::Varint, &mut slice).unwrap(), -1);
    }

    #[test]
    fn test_skip_unknown_wire_types() {
        let mut buf: &[u8] = &[0x01, 0x02, 0x03, 0x04, 0xaa];
        skip_field(WireType::Fixed32, &mut buf).unwrap();
        assert_eq!(buf, &[0xaa]);

        let mut buf: &[u8] = &[0x02, 0x10, 0x20, 0xbb];
        skip_field(WireType::LengthDelimited, &mut buf).unwrap();
        assert_eq!(buf, &[0xbb]);

        let mut buf: &[u8] = &[0x01, 0x02];
        assert_eq!(
            skip_field(WireType::Fixed64, &mut buf),
            Err(DecodeError::Truncated)
        );
    }

    #[test]
    fn test_key_rejects_field_zero_and_bad_wire_type() {
        let mut buf: &[u8] = &[0x00];
        assert_eq!(decode_key(&mut buf), Err(DecodeError::InvalidFieldNumber));

        let mut buf: &[u8] = &[0x0b];
        assert_eq!(decode_key(&mut buf), Err(DecodeError::InvalidWireType(3)));
    }

    #[test]
    fn test_string_wrong_wire_type() {
        let mut buf: &[u8] = &[0x01];
        assert_eq!(
            read_string(1, WireType::Varint, &mut buf),
            Err(DecodeError::WrongWireType {
                field: 1,
                expected: WireType::LengthDelimited,
                found: WireType::Varint,
            })
        );
    }
}
