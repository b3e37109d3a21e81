//! Conversion between raw value bytes and [`Value`].
//!
//! Decoding is lossless: a value decoded from bytes
//! encodes back to the very same bytes.
//! Text which is not valid UTF-8 and numbers whose length is not
//! a multiple of the number size are kept as raw bytes.

use crate::tag::{read_u16, read_u32, write_u16, write_u32};
use byteordered::byteorder::{BigEndian, ByteOrder, LittleEndian};
use byteordered::Endianness;
use dicomkit_core::value::C;
use dicomkit_core::{Tag, Value, ValueType, VrKind, VR};
use snafu::{Backtrace, Snafu};

#[derive(Debug, Snafu)]
#[non_exhaustive]
pub enum Error {
    /// Sequences are not primitive values
    #[snafu(display("Cannot encode {} as a primitive value", value_type))]
    NotPrimitive {
        value_type: ValueType,
        backtrace: Backtrace,
    },
}

pub type Result<T, E = Error> = std::result::Result<T, E>;

fn read_u64(bytes: &[u8], order: Endianness) -> u64 {
    match order {
        Endianness::Little => LittleEndian::read_u64(bytes),
        Endianness::Big => BigEndian::read_u64(bytes),
    }
}

fn write_u64(out: &mut Vec<u8>, value: u64, order: Endianness) {
    let mut bytes = [0; 8];
    match order {
        Endianness::Little => LittleEndian::write_u64(&mut bytes, value),
        Endianness::Big => BigEndian::write_u64(&mut bytes, value),
    }
    out.extend_from_slice(&bytes);
}

/// Decode the raw bytes of a primitive value of the given VR.
pub fn decode_value(bytes: &[u8], vr: VR, order: Endianness) -> Value {
    if bytes.is_empty() {
        return Value::Empty;
    }

    macro_rules! numbers {
        ($size: expr, $variant: ident, $read: expr) => {{
            if bytes.len() % $size != 0 {
                return Value::Bytes(bytes.to_vec());
            }
            let values: C<_> = bytes.chunks_exact($size).map($read).collect();
            Value::$variant(values)
        }};
    }

    match vr.kind() {
        VrKind::Text => match String::from_utf8(bytes.to_vec()) {
            Ok(s) => Value::Str(s),
            Err(e) => Value::Bytes(e.into_bytes()),
        },
        VrKind::Numeric => match vr {
            VR::AT => numbers!(4, Tags, |c: &[u8]| Tag(
                read_u16(&c[0..2], order),
                read_u16(&c[2..4], order)
            )),
            VR::US => numbers!(2, U16, |c: &[u8]| read_u16(c, order)),
            VR::SS => numbers!(2, I16, |c: &[u8]| read_u16(c, order) as i16),
            VR::UL => numbers!(4, U32, |c: &[u8]| read_u32(c, order)),
            VR::SL => numbers!(4, I32, |c: &[u8]| read_u32(c, order) as i32),
            VR::FL => numbers!(4, F32, |c: &[u8]| f32::from_bits(read_u32(c, order))),
            VR::UV => numbers!(8, U64, |c: &[u8]| read_u64(c, order)),
            VR::SV => numbers!(8, I64, |c: &[u8]| read_u64(c, order) as i64),
            VR::FD => numbers!(8, F64, |c: &[u8]| f64::from_bits(read_u64(c, order))),
            _ => Value::Bytes(bytes.to_vec()),
        },
        VrKind::Binary | VrKind::Sequence => Value::Bytes(bytes.to_vec()),
    }
}

/// Append the raw bytes of a primitive value to `out`.
pub fn encode_value(out: &mut Vec<u8>, value: &Value, order: Endianness) -> Result<()> {
    match value {
        Value::Empty => {}
        Value::Str(s) => out.extend_from_slice(s.as_bytes()),
        Value::Bytes(b) => out.extend_from_slice(b),
        Value::Tags(v) => {
            for tag in v {
                write_u16(out, tag.group(), order);
                write_u16(out, tag.element(), order);
            }
        }
        Value::U16(v) => v.iter().for_each(|&n| write_u16(out, n, order)),
        Value::I16(v) => v.iter().for_each(|&n| write_u16(out, n as u16, order)),
        Value::U32(v) => v.iter().for_each(|&n| write_u32(out, n, order)),
        Value::I32(v) => v.iter().for_each(|&n| write_u32(out, n as u32, order)),
        Value::F32(v) => v.iter().for_each(|&n| write_u32(out, n.to_bits(), order)),
        Value::U64(v) => v.iter().for_each(|&n| write_u64(out, n, order)),
        Value::I64(v) => v.iter().for_each(|&n| write_u64(out, n as u64, order)),
        Value::F64(v) => v.iter().for_each(|&n| write_u64(out, n.to_bits(), order)),
        Value::Sequence(_) | Value::PixelSequence(_) => {
            return NotPrimitiveSnafu {
                value_type: value.value_type(),
            }
            .fail()
        }
    }
    Ok(())
}

/// The size of the words making up a value of this VR,
/// for VRs whose raw bytes depend on the byte order.
pub fn word_size(vr: VR) -> Option<usize> {
    match vr {
        VR::AT | VR::OW | VR::SS | VR::US => Some(2),
        VR::FL | VR::OF | VR::OL | VR::SL | VR::UL => Some(4),
        VR::FD | VR::OD | VR::OV | VR::SV | VR::UV => Some(8),
        _ => None,
    }
}

/// Append `bytes` to `out` with each word of `word_size` bytes reversed.
/// A trailing partial word is copied as is.
pub fn extend_swapped(out: &mut Vec<u8>, bytes: &[u8], word_size: usize) {
    let mut words = bytes.chunks_exact(word_size);
    for word in &mut words {
        out.extend(word.iter().rev());
    }
    out.extend_from_slice(words.remainder());
}

#[cfg(test)]
mod tests {
    use super::*;
    use smallvec::smallvec;

    #[test]
    fn numbers_follow_byte_order() {
        let raw = [0x00, 0x02, 0x01, 0x00];
        assert_eq!(
            decode_value(&raw, VR::US, Endianness::Little),
            Value::U16(smallvec![0x0200, 0x0001])
        );
        assert_eq!(
            decode_value(&raw, VR::US, Endianness::Big),
            Value::U16(smallvec![0x0002, 0x0100])
        );
        assert_eq!(
            decode_value(&raw, VR::UL, Endianness::Little),
            Value::U32(smallvec![0x0001_0200])
        );
    }

    #[test]
    fn odd_numbers_stay_raw() {
        let raw = [0x01, 0x02, 0x03];
        assert_eq!(
            decode_value(&raw, VR::US, Endianness::Little),
            Value::Bytes(vec![1, 2, 3])
        );
    }

    #[test]
    fn text_and_invalid_text() {
        assert_eq!(
            decode_value(b"CT", VR::CS, Endianness::Little),
            Value::Str("CT".to_string())
        );
        assert_eq!(
            decode_value(&[0xC9, b'A'], VR::PN, Endianness::Little),
            Value::Bytes(vec![0xC9, b'A'])
        );
        assert_eq!(decode_value(&[], VR::PN, Endianness::Little), Value::Empty);
    }

    #[test]
    fn values_encode_to_the_same_bytes() {
        let cases: &[(&[u8], VR)] = &[
            (&[0x10, 0x00, 0x20, 0x00], VR::AT),
            (&[0xfe, 0xff], VR::SS),
            (&[0x00, 0x00, 0x80, 0x3f], VR::FL),
            (&[0, 0, 0, 0, 0, 0, 0xf0, 0x3f], VR::FD),
            (b"1.2.840.10008.1.2\0", VR::UI),
            (&[0xde, 0xad, 0xbe, 0xef], VR::OB),
        ];
        for &(raw, vr) in cases {
            for order in [Endianness::Little, Endianness::Big] {
                let value = decode_value(raw, vr, order);
                let mut out = Vec::new();
                encode_value(&mut out, &value, order).unwrap();
                assert_eq!(out, raw, "{} in {:?}", vr, order);
            }
        }
    }

    #[test]
    fn words_are_swapped_by_size() {
        let mut out = Vec::new();
        extend_swapped(&mut out, &[1, 2, 3, 4, 5], word_size(VR::OW).unwrap());
        assert_eq!(out, [2, 1, 4, 3, 5]);

        out.clear();
        extend_swapped(&mut out, &[1, 2, 3, 4, 5, 6, 7, 8], word_size(VR::OF).unwrap());
        assert_eq!(out, [4, 3, 2, 1, 8, 7, 6, 5]);

        assert_eq!(word_size(VR::OB), None);
        assert_eq!(word_size(VR::UN), None);
        assert_eq!(word_size(VR::OD), Some(8));
    }

    #[test]
    fn sequences_are_not_primitive() {
        let mut out = Vec::new();
        assert!(encode_value(&mut out, &Value::Sequence(vec![]), Endianness::Little).is_err());
    }
}
