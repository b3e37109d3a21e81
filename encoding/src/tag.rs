//! Tag codec.
//!
//! A tag is stored as two independent 2-byte numbers, group then element.
//! The byte order applies to each half separately,
//! so the group always comes first regardless of the byte order.

use byteordered::byteorder::{BigEndian, ByteOrder, LittleEndian};
use byteordered::Endianness;
use dicomkit_core::Tag;
use snafu::{ensure, Backtrace, Snafu};

/// Error raised when there are not enough bytes to decode a field.
#[derive(Debug, Snafu)]
#[snafu(display(
    "Truncated input at position {}: needed {} bytes, {} available",
    position,
    needed,
    available
))]
pub struct TruncatedInputError {
    pub position: usize,
    pub needed: usize,
    pub available: usize,
    backtrace: Backtrace,
}

/// Obtain `len` bytes from `buf` at `position`,
/// failing with [`TruncatedInputError`] if they are not all there.
pub fn take(buf: &[u8], position: usize, len: usize) -> Result<&[u8], TruncatedInputError> {
    let available = buf.len().saturating_sub(position);
    ensure!(
        available >= len,
        TruncatedInputSnafu {
            position,
            needed: len,
            available,
        }
    );
    Ok(&buf[position..position + len])
}

/// Read a 16-bit number in the given byte order.
/// `bytes` must have at least 2 bytes.
#[inline]
pub(crate) fn read_u16(bytes: &[u8], order: Endianness) -> u16 {
    match order {
        Endianness::Little => LittleEndian::read_u16(bytes),
        Endianness::Big => BigEndian::read_u16(bytes),
    }
}

/// Read a 32-bit number in the given byte order.
/// `bytes` must have at least 4 bytes.
#[inline]
pub(crate) fn read_u32(bytes: &[u8], order: Endianness) -> u32 {
    match order {
        Endianness::Little => LittleEndian::read_u32(bytes),
        Endianness::Big => BigEndian::read_u32(bytes),
    }
}

#[inline]
pub(crate) fn write_u16(out: &mut Vec<u8>, value: u16, order: Endianness) {
    let mut bytes = [0; 2];
    match order {
        Endianness::Little => LittleEndian::write_u16(&mut bytes, value),
        Endianness::Big => BigEndian::write_u16(&mut bytes, value),
    }
    out.extend_from_slice(&bytes);
}

#[inline]
pub(crate) fn write_u32(out: &mut Vec<u8>, value: u32, order: Endianness) {
    let mut bytes = [0; 4];
    match order {
        Endianness::Little => LittleEndian::write_u32(&mut bytes, value),
        Endianness::Big => BigEndian::write_u32(&mut bytes, value),
    }
    out.extend_from_slice(&bytes);
}

/// Decode the tag at the start of `bytes`.
pub fn decode_tag(bytes: &[u8], order: Endianness) -> Result<Tag, TruncatedInputError> {
    decode_tag_at(bytes, 0, order)
}

/// Decode the tag found at `position` in `buf`.
pub fn decode_tag_at(buf: &[u8], position: usize, order: Endianness) -> Result<Tag, TruncatedInputError> {
    let bytes = take(buf, position, 4)?;
    Ok(Tag(read_u16(&bytes[0..2], order), read_u16(&bytes[2..4], order)))
}

/// Encode a tag into its 4-byte form.
pub fn encode_tag(tag: Tag, order: Endianness) -> [u8; 4] {
    let mut out = [0; 4];
    match order {
        Endianness::Little => {
            LittleEndian::write_u16(&mut out[0..2], tag.group());
            LittleEndian::write_u16(&mut out[2..4], tag.element());
        }
        Endianness::Big => {
            BigEndian::write_u16(&mut out[0..2], tag.group());
            BigEndian::write_u16(&mut out[2..4], tag.element());
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decode_in_both_orders() {
        let bytes = [0x10, 0x00, 0x20, 0x00];
        assert_eq!(
            decode_tag(&bytes, Endianness::Little).unwrap(),
            Tag(0x0010, 0x0020)
        );
        assert_eq!(
            decode_tag(&bytes, Endianness::Big).unwrap(),
            Tag(0x1000, 0x2000)
        );
    }

    #[test]
    fn encode_keeps_group_first() {
        let tag = Tag(0x7FE0, 0x0010);
        assert_eq!(encode_tag(tag, Endianness::Little), [0xE0, 0x7F, 0x10, 0x00]);
        assert_eq!(encode_tag(tag, Endianness::Big), [0x7F, 0xE0, 0x00, 0x10]);
        for order in [Endianness::Little, Endianness::Big] {
            assert_eq!(decode_tag(&encode_tag(tag, order), order).unwrap(), tag);
        }
    }

    #[test]
    fn truncated_tag() {
        let err = decode_tag(&[0x08, 0x00, 0x16], Endianness::Little).unwrap_err();
        assert_eq!(err.needed, 4);
        assert_eq!(err.available, 3);

        let err = decode_tag_at(&[0x08, 0x00, 0x16, 0x00], 6, Endianness::Little).unwrap_err();
        assert_eq!(err.available, 0);
    }
}
