//! Decoding of data element headers and sequence item headers.
//!
//! Explicit VR headers come in two shapes:
//!
//! ```text
//! tag(4) VR(2) length(2)                    -- 8 bytes
//! tag(4) VR(2) reserved(2) length(4)        -- 12 bytes, see VR::has_long_length
//! ```
//!
//! Implicit VR headers are always `tag(4) length(4)`,
//! with the VR taken from the data dictionary.
//! Item and delimiter headers (group FFFE) never carry a VR.

use crate::tag::{decode_tag_at, read_u16, read_u32, take, TruncatedInputError};
use crate::transfer_syntax::{Encoding, VrDialect};
use byteordered::Endianness;
use dicomkit_core::header::{DataElementHeader, Length, SequenceItemHeader, SequenceItemHeaderError};
use dicomkit_core::{DataDictionary, Tag, VR};
use snafu::{Backtrace, OptionExt, ResultExt, Snafu};

#[derive(Debug, Snafu)]
#[non_exhaustive]
pub enum Error {
    /// the buffer ended in the middle of a header field
    #[snafu(display("Could not read header field `{}`", field))]
    TruncatedInput {
        field: &'static str,
        source: TruncatedInputError,
    },
    #[snafu(display(
        "Unsupported VR {:?} for element {} at position {}",
        String::from_utf8_lossy(code),
        tag,
        position
    ))]
    UnsupportedVR {
        tag: Tag,
        code: [u8; 2],
        position: usize,
        backtrace: Backtrace,
    },
    #[snafu(display("Bad sequence item header at position {}", position))]
    BadSequenceHeader {
        position: usize,
        source: SequenceItemHeaderError,
    },
}

pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Size of an item or delimiter header: tag and 4-byte length.
pub const ITEM_HEADER_SIZE: usize = 8;

/// Decode the data element header starting at `position`.
///
/// Returns the header and the number of bytes it occupies,
/// so that the value starts at `position + size`.
pub fn decode_header<D>(
    buf: &[u8],
    position: usize,
    encoding: Encoding,
    dict: &D,
) -> Result<(DataElementHeader, usize)>
where
    D: DataDictionary + ?Sized,
{
    let order = encoding.endianness;
    let tag = decode_tag_at(buf, position, order).context(TruncatedInputSnafu { field: "tag" })?;

    if tag.group() == 0xFFFE {
        // item delimiters do not have VR or reserved field
        let len = decode_length(buf, position + 4, order)?;
        return Ok((DataElementHeader::new(tag, VR::UN, len), ITEM_HEADER_SIZE));
    }

    match encoding.dialect {
        VrDialect::Explicit => {
            let bytes = take(buf, position + 4, 2).context(TruncatedInputSnafu { field: "VR" })?;
            let code = [bytes[0], bytes[1]];
            let vr = VR::from_binary(code).context(UnsupportedVRSnafu {
                tag,
                code,
                position,
            })?;

            if vr.has_long_length() {
                // 2 reserved bytes, then 4 bytes for data length
                take(buf, position + 6, 2).context(TruncatedInputSnafu { field: "reserved" })?;
                let len = decode_length(buf, position + 8, order)?;
                Ok((DataElementHeader::new(tag, vr, len), 12))
            } else {
                let bytes =
                    take(buf, position + 6, 2).context(TruncatedInputSnafu { field: "length" })?;
                let len = u32::from(read_u16(bytes, order));
                Ok((DataElementHeader::new(tag, vr, Length(len)), 8))
            }
        }
        VrDialect::Implicit => {
            // group length elements are always UL
            let vr = dict.vr_for_tag(tag);
            let len = decode_length(buf, position + 4, order)?;
            Ok((DataElementHeader::new(tag, vr, len), 8))
        }
    }
}

/// Decode a 4-byte length field.
pub fn decode_length(buf: &[u8], position: usize, order: Endianness) -> Result<Length> {
    let bytes = take(buf, position, 4).context(TruncatedInputSnafu { field: "length" })?;
    Ok(Length(read_u32(bytes, order)))
}

/// Decode the item, item delimiter or sequence delimiter header
/// starting at `position`.
pub fn decode_item_header(
    buf: &[u8],
    position: usize,
    order: Endianness,
) -> Result<SequenceItemHeader> {
    let tag = decode_tag_at(buf, position, order)
        .context(TruncatedInputSnafu { field: "item tag" })?;
    let len = decode_length(buf, position + 4, order)?;
    SequenceItemHeader::new(tag, len).context(BadSequenceHeaderSnafu { position })
}

#[cfg(test)]
mod tests {
    use super::*;
    use dicomkit_core::header::{HasLength, Header};
    use dicomkit_dictionary_std::StandardDataDictionary;
    use matches::assert_matches;

    #[rustfmt::skip]
    const RAW_EXPLICIT_LE: &[u8] = &[
        0x02, 0x00, 0x02, 0x00,  // (0002,0002) MediaStorageSOPClassUID
            b'U', b'I',          // VR: UI
            0x1a, 0x00,          // Length: 26
        0x08, 0x00, 0x40, 0x11,  // (0008,1140) ReferencedImageSequence
            b'S', b'Q',          // VR: SQ
            0x00, 0x00,          // reserved
            0xff, 0xff, 0xff, 0xff, // Length: undefined
        0xfe, 0xff, 0x00, 0xe0,  // (FFFE,E000) Item
            0x10, 0x00, 0x00, 0x00, // Length: 16
    ];

    #[test]
    fn explicit_le_headers() {
        let dict = StandardDataDictionary;
        let (header, size) = decode_header(RAW_EXPLICIT_LE, 0, Encoding::EXPLICIT_VR_LE, &dict).unwrap();
        assert_eq!(header.tag(), Tag(0x0002, 0x0002));
        assert_eq!(header.vr(), VR::UI);
        assert_eq!(header.length(), Length(26));
        assert_eq!(size, 8);

        let (header, size) = decode_header(RAW_EXPLICIT_LE, 8, Encoding::EXPLICIT_VR_LE, &dict).unwrap();
        assert_eq!(header.tag(), Tag(0x0008, 0x1140));
        assert_eq!(header.vr(), VR::SQ);
        assert!(header.length().is_undefined());
        assert_eq!(size, 12);

        // item header has no VR
        let (header, size) = decode_header(RAW_EXPLICIT_LE, 20, Encoding::EXPLICIT_VR_LE, &dict).unwrap();
        assert!(header.is_item());
        assert_eq!(header.length(), Length(16));
        assert_eq!(size, 8);
    }

    #[rustfmt::skip]
    const RAW_IMPLICIT_LE: &[u8] = &[
        0x00, 0x00, 0x00, 0x01,  // (0000,0100) CommandField
            0x02, 0x00, 0x00, 0x00, // Length: 2
        0x00, 0x00, 0x00, 0x00,  // (0000,0000) CommandGroupLength
            0x04, 0x00, 0x00, 0x00, // Length: 4
        0x09, 0x00, 0x00, 0x00,  // (0009,0000) private group length
            0x04, 0x00, 0x00, 0x00, // Length: 4
    ];

    #[test]
    fn implicit_le_headers_use_dictionary() {
        let dict = StandardDataDictionary;
        let (header, size) = decode_header(RAW_IMPLICIT_LE, 0, Encoding::IMPLICIT_VR_LE, &dict).unwrap();
        assert_eq!(header.tag(), Tag(0x0000, 0x0100));
        assert_eq!(header.vr(), VR::US);
        assert_eq!(size, 8);

        let (header, _) = decode_header(RAW_IMPLICIT_LE, 8, Encoding::IMPLICIT_VR_LE, &dict).unwrap();
        assert_eq!(header.vr(), VR::UL);
        let (header, _) = decode_header(RAW_IMPLICIT_LE, 16, Encoding::IMPLICIT_VR_LE, &dict).unwrap();
        assert_eq!(header.vr(), VR::UL);
    }

    #[test]
    fn explicit_be_header() {
        #[rustfmt::skip]
        let raw: &[u8] = &[
            0x00, 0x28, 0x00, 0x10,  // (0028,0010) Rows
                b'U', b'S',          // VR: US
                0x00, 0x02,          // Length: 2
        ];
        let dict = StandardDataDictionary;
        let (header, _) = decode_header(raw, 0, Encoding::EXPLICIT_VR_BE, &dict).unwrap();
        assert_eq!(header.tag(), Tag(0x0028, 0x0010));
        assert_eq!(header.length(), Length(2));
    }

    #[test]
    fn unsupported_vr_and_truncation() {
        let dict = StandardDataDictionary;
        let raw = [0x10, 0x00, 0x10, 0x00, b'Z', b'Z', 0x00, 0x00];
        assert_matches!(
            decode_header(&raw, 0, Encoding::EXPLICIT_VR_LE, &dict),
            Err(Error::UnsupportedVR { code: [b'Z', b'Z'], .. })
        );

        let raw = [0x10, 0x00, 0x10, 0x00, b'P', b'N', 0x08];
        assert_matches!(
            decode_header(&raw, 0, Encoding::EXPLICIT_VR_LE, &dict),
            Err(Error::TruncatedInput { field: "length", .. })
        );
    }

    #[test]
    fn item_headers() {
        assert_eq!(
            decode_item_header(RAW_EXPLICIT_LE, 20, Endianness::Little).unwrap(),
            SequenceItemHeader::Item { len: Length(16) }
        );
        assert_matches!(
            decode_item_header(RAW_EXPLICIT_LE, 0, Endianness::Little),
            Err(Error::BadSequenceHeader { position: 0, .. })
        );
    }
}
