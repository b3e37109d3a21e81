//! Element writing, the mirror of [`reader`](crate::reader).
//!
//! Primitive values are written with the length of their encoded bytes.
//! Sequences and items of undefined length are closed with delimiters;
//! those of defined length have their length recomputed from the
//! encoded content, so that edits inside items stay consistent.
use crate::context::ReadContext;
use dicomkit_core::header::{DataElementHeader, HasLength, Header, Length, SequenceItemHeader};
use dicomkit_core::{Element, Fragment, Item, Tag, Value, VR};
use dicomkit_encoding::encode::{self, encode_header, encode_item_header};
use dicomkit_encoding::primitive::{self, encode_value};
use dicomkit_encoding::Encoding;
use snafu::{Backtrace, ResultExt, Snafu};
use std::convert::TryFrom;

#[derive(Debug, Snafu)]
#[non_exhaustive]
pub enum Error {
    #[snafu(display("Could not write header of element {}", tag))]
    WriteHeader {
        tag: Tag,
        #[snafu(backtrace)]
        source: encode::Error,
    },
    #[snafu(display("Could not write value of element {}", tag))]
    WriteValue {
        tag: Tag,
        #[snafu(backtrace)]
        source: primitive::Error,
    },
    #[snafu(display("Content of element {} is too long ({} bytes)", tag, len))]
    ContentTooLong {
        tag: Tag,
        len: usize,
        backtrace: Backtrace,
    },
}

pub type Result<T, E = Error> = std::result::Result<T, E>;

fn content_length(tag: Tag, len: usize) -> Result<Length> {
    match u32::try_from(len) {
        Ok(len) if len != Length::UNDEFINED.0 => Ok(Length(len)),
        _ => ContentTooLongSnafu { tag, len }.fail(),
    }
}

/// Append the encoded form of `element` to `out`.
pub fn write_element(out: &mut Vec<u8>, element: &Element, encoding: Encoding) -> Result<()> {
    let tag = element.tag();
    let vr = element.vr();
    let order = encoding.endianness;

    match element.value() {
        Value::Sequence(items) => {
            // unknown content is always encoded as Implicit VR Little Endian
            let item_encoding = if vr == VR::UN {
                Encoding::IMPLICIT_VR_LE
            } else {
                encoding
            };
            if element.length().is_undefined() {
                let header = DataElementHeader::new(tag, vr, Length::UNDEFINED);
                encode_header(out, &header, encoding).context(WriteHeaderSnafu { tag })?;
                for item in items {
                    write_item(out, tag, item, item_encoding)?;
                }
                encode_item_header(out, SequenceItemHeader::SequenceDelimiter, order);
            } else {
                let mut body = Vec::new();
                for item in items {
                    write_item(&mut body, tag, item, item_encoding)?;
                }
                let header = DataElementHeader::new(tag, vr, content_length(tag, body.len())?);
                encode_header(out, &header, encoding).context(WriteHeaderSnafu { tag })?;
                out.extend_from_slice(&body);
            }
        }
        Value::PixelSequence(fragments) => {
            let header = DataElementHeader::new(tag, vr, Length::UNDEFINED);
            encode_header(out, &header, encoding).context(WriteHeaderSnafu { tag })?;
            for fragment in fragments {
                write_fragment(out, tag, fragment, encoding)?;
            }
            encode_item_header(out, SequenceItemHeader::SequenceDelimiter, order);
        }
        value => {
            let mut body = Vec::new();
            match (value, primitive::word_size(vr)) {
                // raw words were kept in the byte order they were read in
                (Value::Bytes(bytes), Some(size)) if element.byte_order() != order => {
                    primitive::extend_swapped(&mut body, bytes, size)
                }
                _ => encode_value(&mut body, value, order).context(WriteValueSnafu { tag })?,
            }
            let header = DataElementHeader::new(tag, vr, content_length(tag, body.len())?);
            encode_header(out, &header, encoding).context(WriteHeaderSnafu { tag })?;
            out.extend_from_slice(&body);
        }
    }
    Ok(())
}

fn write_item(out: &mut Vec<u8>, sequence: Tag, item: &Item, encoding: Encoding) -> Result<()> {
    let order = encoding.endianness;
    if item.length().is_undefined() {
        encode_item_header(out, SequenceItemHeader::Item { len: Length::UNDEFINED }, order);
        for element in item.elements() {
            write_element(out, element, encoding)?;
        }
        encode_item_header(out, SequenceItemHeader::ItemDelimiter, order);
    } else {
        let mut body = Vec::new();
        for element in item.elements() {
            write_element(&mut body, element, encoding)?;
        }
        let len = content_length(sequence, body.len())?;
        encode_item_header(out, SequenceItemHeader::Item { len }, order);
        out.extend_from_slice(&body);
    }
    Ok(())
}

fn write_fragment(out: &mut Vec<u8>, tag: Tag, fragment: &Fragment, encoding: Encoding) -> Result<()> {
    let len = content_length(tag, fragment.data().len())?;
    encode_item_header(out, SequenceItemHeader::Item { len }, encoding.endianness);
    out.extend_from_slice(fragment.data());
    Ok(())
}

/// Append all root `elements` to `out`,
/// each in the encoding the context assigns to it.
pub fn write_elements<'e, I>(out: &mut Vec<u8>, elements: I, context: &ReadContext) -> Result<()>
where
    I: IntoIterator<Item = &'e Element>,
{
    for element in elements {
        write_element(out, element, context.encoding_for(element))?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{ElementReader, ReadContext};
    use dicomkit_dictionary_std::StandardDataDictionary;
    use dicomkit_encoding::Endianness;
    use rstest::rstest;

    fn round_trip(raw: &[u8], encoding: Encoding) {
        let context = ReadContext::new(encoding);
        let reader = ElementReader::new(raw, StandardDataDictionary, context);
        let elements = reader.read_to_end(0).unwrap();
        let mut out = Vec::new();
        write_elements(&mut out, &elements, &context).unwrap();
        assert_eq!(out, raw);
    }

    #[rustfmt::skip]
    const NESTED_EXPLICIT_LE: &[u8] = &[
        0x08, 0x00, 0x40, 0x11,  // (0008,1140) ReferencedImageSequence
            b'S', b'Q', 0x00, 0x00,
            0xff, 0xff, 0xff, 0xff, // Length: undefined
        0xfe, 0xff, 0x00, 0xe0,  // (FFFE,E000) Item
            0xff, 0xff, 0xff, 0xff, // Length: undefined
        0x08, 0x00, 0x50, 0x11,  // (0008,1150) ReferencedSOPClassUID
            b'U', b'I', 0x04, 0x00,
            b'1', b'.', b'2', 0x00,
        0xfe, 0xff, 0x0d, 0xe0,  // (FFFE,E00D) ItemDelimitationItem
            0x00, 0x00, 0x00, 0x00,
        0xfe, 0xff, 0x00, 0xe0,  // (FFFE,E000) Item
            0x0c, 0x00, 0x00, 0x00, // Length: 12
        0x08, 0x00, 0x55, 0x11,  // (0008,1155) ReferencedSOPInstanceUID
            b'U', b'I', 0x04, 0x00,
            b'1', b'.', b'3', 0x00,
        0xfe, 0xff, 0xdd, 0xe0,  // (FFFE,E0DD) SequenceDelimitationItem
            0x00, 0x00, 0x00, 0x00,
        0x10, 0x00, 0x10, 0x00,  // (0010,0010) PatientName
            b'P', b'N', 0x03, 0x00, // odd length is kept
            b'D', b'o', b'e',
        0xe0, 0x7f, 0x10, 0x00,  // (7FE0,0010) PixelData
            b'O', b'B', 0x00, 0x00,
            0xff, 0xff, 0xff, 0xff,
        0xfe, 0xff, 0x00, 0xe0,  // (FFFE,E000) Item
            0x00, 0x00, 0x00, 0x00,
        0xfe, 0xff, 0x00, 0xe0,  // (FFFE,E000) Item
            0x02, 0x00, 0x00, 0x00,
            0xab, 0xcd,
        0xfe, 0xff, 0xdd, 0xe0,  // (FFFE,E0DD) SequenceDelimitationItem
            0x00, 0x00, 0x00, 0x00,
    ];

    #[rustfmt::skip]
    const DEFINED_IMPLICIT_LE: &[u8] = &[
        0x08, 0x00, 0x40, 0x11,  // (0008,1140) ReferencedImageSequence
            0x14, 0x00, 0x00, 0x00, // Length: 20
        0xfe, 0xff, 0x00, 0xe0,  // (FFFE,E000) Item
            0x0c, 0x00, 0x00, 0x00, // Length: 12
        0x08, 0x00, 0x50, 0x11,  // (0008,1150) ReferencedSOPClassUID
            0x04, 0x00, 0x00, 0x00,
            b'1', b'.', b'2', 0x00,
        0x28, 0x00, 0x10, 0x00,  // (0028,0010) Rows
            0x02, 0x00, 0x00, 0x00,
            0x00, 0x02,
    ];

    #[rstest]
    #[case(NESTED_EXPLICIT_LE, Encoding::EXPLICIT_VR_LE)]
    #[case(DEFINED_IMPLICIT_LE, Encoding::IMPLICIT_VR_LE)]
    fn written_bytes_match_source(#[case] raw: &[u8], #[case] encoding: Encoding) {
        round_trip(raw, encoding);
    }

    #[test]
    fn defined_lengths_are_recomputed() {
        let context = ReadContext::new(Encoding::IMPLICIT_VR_LE);
        let reader = ElementReader::new(DEFINED_IMPLICIT_LE, StandardDataDictionary, context);
        let (sq, _) = reader.read_element(0).unwrap();

        let uid = Element::create(Tag(0x0008, 0x1150), VR::UI, Value::from("1.2.840")).unwrap();
        let item = Item::decoded(
            Length(0),
            sq.items().unwrap()[0].offsets().unwrap(),
            vec![uid],
            Tag(0x0008, 0x1140),
        );
        let mut edited = sq.clone();
        edited.set_value(Value::Sequence(vec![item])).unwrap();

        let mut out = Vec::new();
        write_element(&mut out, &edited, Encoding::IMPLICIT_VR_LE).unwrap();
        // "1.2.840" is padded to 8 bytes
        #[rustfmt::skip]
        let expected: &[u8] = &[
            0x08, 0x00, 0x40, 0x11,
                0x18, 0x00, 0x00, 0x00, // Length: 24
            0xfe, 0xff, 0x00, 0xe0,
                0x10, 0x00, 0x00, 0x00, // Length: 16
            0x08, 0x00, 0x50, 0x11,
                0x08, 0x00, 0x00, 0x00,
                b'1', b'.', b'2', b'.', b'8', b'4', b'0', 0x00,
        ];
        assert_eq!(out, expected);
    }

    #[test]
    fn raw_words_follow_target_byte_order() {
        let pixels = Element::new(
            DataElementHeader::new(Tag(0x7FE0, 0x0010), VR::OW, Length(6)),
            Endianness::Little,
            Value::Bytes(vec![1, 2, 3, 4, 5, 6]),
        );
        let mut out = Vec::new();
        write_element(&mut out, &pixels, Encoding::EXPLICIT_VR_BE).unwrap();
        assert_eq!(&out[12..], &[2, 1, 4, 3, 6, 5]);

        // same order, untouched
        out.clear();
        write_element(&mut out, &pixels, Encoding::EXPLICIT_VR_LE).unwrap();
        assert_eq!(&out[12..], &[1, 2, 3, 4, 5, 6]);

        // odd-length numbers kept raw swap whole words only
        let rows = Element::new(
            DataElementHeader::new(Tag(0x0028, 0x0010), VR::US, Length(3)),
            Endianness::Big,
            Value::Bytes(vec![1, 2, 3]),
        );
        out.clear();
        write_element(&mut out, &rows, Encoding::IMPLICIT_VR_LE).unwrap();
        assert_eq!(&out[8..], &[2, 1, 3]);

        // bytes without words are never swapped
        let other = Element::new(
            DataElementHeader::new(Tag(0x0009, 0x0010), VR::OB, Length(2)),
            Endianness::Little,
            Value::Bytes(vec![1, 2]),
        );
        out.clear();
        write_element(&mut out, &other, Encoding::EXPLICIT_VR_BE).unwrap();
        assert_eq!(&out[12..], &[1, 2]);
    }

    #[test]
    fn new_items_are_delimited() {
        let uid = Element::create(Tag(0x0008, 0x1150), VR::UI, Value::from("1.2")).unwrap();
        let sq = Element::create(
            Tag(0x0008, 0x1140),
            VR::SQ,
            Value::Sequence(vec![Item::new(vec![uid])]),
        )
        .unwrap();
        let mut out = Vec::new();
        write_element(&mut out, &sq, Encoding::EXPLICIT_VR_LE).unwrap();
        // new sequences get a computed length, new items a delimiter
        assert_eq!(&out[8..12], &[28, 0, 0, 0]);
        assert_eq!(&out[out.len() - 8..], &[0xfe, 0xff, 0x0d, 0xe0, 0, 0, 0, 0]);

        let context = ReadContext::new(Encoding::EXPLICIT_VR_LE);
        let reader = ElementReader::new(&out[..], StandardDataDictionary, context);
        let (read, next) = reader.read_element(0).unwrap();
        assert_eq!(next, out.len());
        let items = read.items().unwrap();
        assert_eq!(items[0].elements()[0].value().to_str().unwrap(), "1.2");
    }

    #[test]
    fn meta_elements_keep_explicit_le() {
        let context = ReadContext::with_meta_group_length(Encoding::IMPLICIT_VR_LE, 0);
        let ts = Element::create(Tag(0x0002, 0x0010), VR::UI, Value::from("1.2.840.10008.1.2"))
            .unwrap();
        let rows = Element::create(Tag(0x0028, 0x0010), VR::US, Value::from(16_u16)).unwrap();
        let mut out = Vec::new();
        write_elements(&mut out, [&ts, &rows], &context).unwrap();
        assert_eq!(&out[4..6], b"UI");
        assert_eq!(&out[out.len() - 10..out.len() - 2], &[0x28, 0x00, 0x10, 0x00, 0x02, 0x00, 0x00, 0x00]);
    }
}
