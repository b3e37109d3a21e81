//! Encoding of data element headers and sequence item headers,
//! the mirror of [`decode`](crate::decode).

use crate::tag::{encode_tag, write_u16, write_u32};
use crate::transfer_syntax::{Encoding, VrDialect};
use byteordered::Endianness;
use dicomkit_core::header::{DataElementHeader, Length, SequenceItemHeader};
use dicomkit_core::{HasLength, Header, Tag, VR};
use snafu::{ensure, Backtrace, Snafu};

#[derive(Debug, Snafu)]
#[non_exhaustive]
pub enum Error {
    /// The value does not fit in the 2-byte length field of its VR.
    #[snafu(display("Length {} of element {} does not fit VR {}", length, tag, vr))]
    LengthOverflow {
        tag: Tag,
        vr: VR,
        length: Length,
        backtrace: Backtrace,
    },
}

pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Append the header of a data element to `out`.
/// Returns the number of bytes written.
pub fn encode_header(out: &mut Vec<u8>, header: &DataElementHeader, encoding: Encoding) -> Result<usize> {
    let order = encoding.endianness;
    out.extend_from_slice(&encode_tag(header.tag(), order));

    if header.tag().group() == 0xFFFE {
        write_u32(out, header.length().0, order);
        return Ok(8);
    }

    match encoding.dialect {
        VrDialect::Explicit => {
            let vr = header.vr();
            out.extend_from_slice(&vr.to_bytes());
            if vr.has_long_length() {
                // 2 reserved bytes
                out.extend_from_slice(&[0, 0]);
                write_u32(out, header.length().0, order);
                Ok(12)
            } else {
                let len = header.length().0;
                ensure!(
                    len <= u32::from(u16::MAX),
                    LengthOverflowSnafu {
                        tag: header.tag(),
                        vr,
                        length: header.length(),
                    }
                );
                write_u16(out, len as u16, order);
                Ok(8)
            }
        }
        VrDialect::Implicit => {
            write_u32(out, header.length().0, order);
            Ok(8)
        }
    }
}

/// Append an item, item delimiter or sequence delimiter header to `out`.
pub fn encode_item_header(out: &mut Vec<u8>, header: SequenceItemHeader, order: Endianness) {
    out.extend_from_slice(&encode_tag(header.tag(), order));
    write_u32(out, header.length().0, order);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decode::decode_header;
    use dicomkit_dictionary_std::StandardDataDictionary;

    #[test]
    fn explicit_le_short_and_long() {
        let mut out = Vec::new();
        let header = DataElementHeader::new(Tag(0x0010, 0x0010), VR::PN, Length(8));
        assert_eq!(encode_header(&mut out, &header, Encoding::EXPLICIT_VR_LE).unwrap(), 8);
        assert_eq!(out, [0x10, 0x00, 0x10, 0x00, b'P', b'N', 0x08, 0x00]);

        out.clear();
        let header = DataElementHeader::new(Tag(0x0008, 0x1140), VR::SQ, Length::UNDEFINED);
        assert_eq!(encode_header(&mut out, &header, Encoding::EXPLICIT_VR_LE).unwrap(), 12);
        #[rustfmt::skip]
        let expected = [
            0x08, 0x00, 0x40, 0x11,
            b'S', b'Q', 0x00, 0x00,
            0xff, 0xff, 0xff, 0xff,
        ];
        assert_eq!(out, expected);
    }

    #[test]
    fn headers_decode_back() {
        let dict = StandardDataDictionary;
        for encoding in [Encoding::EXPLICIT_VR_LE, Encoding::EXPLICIT_VR_BE, Encoding::IMPLICIT_VR_LE] {
            let header = DataElementHeader::new(Tag(0x0028, 0x0010), VR::US, Length(2));
            let mut out = Vec::new();
            let size = encode_header(&mut out, &header, encoding).unwrap();
            let (decoded, decoded_size) = decode_header(&out, 0, encoding, &dict).unwrap();
            assert_eq!(decoded, header);
            assert_eq!(decoded_size, size);
        }
    }

    #[test]
    fn short_length_overflow() {
        let mut out = Vec::new();
        let header = DataElementHeader::new(Tag(0x0010, 0x0010), VR::PN, Length(70_000));
        assert!(encode_header(&mut out, &header, Encoding::EXPLICIT_VR_LE).is_err());
        // implicit VR always has room
        assert!(encode_header(&mut out, &header, Encoding::IMPLICIT_VR_LE).is_ok());
    }

    #[test]
    fn delimiters() {
        let mut out = Vec::new();
        encode_item_header(&mut out, SequenceItemHeader::ItemDelimiter, Endianness::Little);
        encode_item_header(&mut out, SequenceItemHeader::SequenceDelimiter, Endianness::Big);
        #[rustfmt::skip]
        let expected = [
            0xfe, 0xff, 0x0d, 0xe0, 0x00, 0x00, 0x00, 0x00,
            0xff, 0xfe, 0xe0, 0xdd, 0x00, 0x00, 0x00, 0x00,
        ];
        assert_eq!(out, expected);
    }
}
