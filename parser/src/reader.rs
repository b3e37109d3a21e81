//! Element-level reading of an in-memory DICOM buffer.
//!
//! The reader decodes one root element at a time.
//! Sequences and encapsulated pixel data are read eagerly,
//! so every returned element owns its whole subtree.
use crate::context::ReadContext;
use dicomkit_core::header::{HasLength, Header};
use dicomkit_core::{DataDictionary, Element, Offsets, Tag, Value, VR};
use dicomkit_encoding::decode::{self, decode_header};
use dicomkit_encoding::primitive::decode_value;
use dicomkit_encoding::tag::{take, TruncatedInputError};
use dicomkit_encoding::Encoding;
use snafu::{Backtrace, ResultExt, Snafu};

/// Maximum sequence nesting accepted by default.
pub const DEFAULT_MAX_DEPTH: usize = 64;

#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
#[non_exhaustive]
pub enum Error {
    #[snafu(display("Could not read header at position {}", position))]
    ReadHeader {
        position: usize,
        #[snafu(backtrace)]
        source: decode::Error,
    },
    #[snafu(display("Could not read value of element {}", tag))]
    ReadValue {
        tag: Tag,
        source: TruncatedInputError,
    },
    #[snafu(display(
        "Undefined length for element {} with VR {} at position {}",
        tag,
        vr,
        position
    ))]
    UndefinedLength {
        tag: Tag,
        vr: VR,
        position: usize,
        backtrace: Backtrace,
    },
    #[snafu(display("Unexpected tag {} at position {}", tag, position))]
    UnexpectedTag {
        tag: Tag,
        position: usize,
        backtrace: Backtrace,
    },
    #[snafu(display(
        "Content of {} runs to position {}, past its declared end {}",
        tag,
        position,
        end
    ))]
    LengthOverrun {
        tag: Tag,
        end: usize,
        position: usize,
        backtrace: Backtrace,
    },
    #[snafu(display(
        "Undefined length for pixel data fragment at position {}",
        position
    ))]
    UndefinedFragmentLength {
        position: usize,
        backtrace: Backtrace,
    },
    #[snafu(display(
        "Sequence nesting deeper than {} levels at position {}",
        max_depth,
        position
    ))]
    ExcessiveNesting {
        max_depth: usize,
        position: usize,
        backtrace: Backtrace,
    },
}

pub type Result<T, E = Error> = std::result::Result<T, E>;

impl Error {
    /// Whether the error was caused by the buffer ending too soon.
    pub fn is_truncated(&self) -> bool {
        match self {
            Error::ReadHeader { source, .. } => {
                matches!(source, decode::Error::TruncatedInput { .. })
            }
            Error::ReadValue { .. } => true,
            _ => false,
        }
    }

    /// Whether the error was caused by an unknown VR code.
    pub fn is_unsupported_vr(&self) -> bool {
        matches!(
            self,
            Error::ReadHeader {
                source: decode::Error::UnsupportedVR { .. },
                ..
            }
        )
    }
}

/// A reader of data elements over a byte buffer.
#[derive(Debug)]
pub struct ElementReader<'a, D> {
    pub(crate) buf: &'a [u8],
    pub(crate) dict: D,
    context: ReadContext,
    pub(crate) max_depth: usize,
}

impl<'a, D> ElementReader<'a, D>
where
    D: DataDictionary,
{
    pub fn new(buf: &'a [u8], dict: D, context: ReadContext) -> Self {
        ElementReader {
            buf,
            dict,
            context,
            max_depth: DEFAULT_MAX_DEPTH,
        }
    }

    /// Change the maximum sequence nesting depth.
    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }

    pub fn context(&self) -> &ReadContext {
        &self.context
    }

    /// Mutable access to the context,
    /// so that the meta boundary can be moved once it is known.
    pub fn context_mut(&mut self) -> &mut ReadContext {
        &mut self.context
    }

    pub fn buffer(&self) -> &'a [u8] {
        self.buf
    }

    /// Read the root element starting at `position`.
    ///
    /// Returns the element and the position of the next root element.
    /// Pixel Data is the last element of a data set:
    /// once read, the returned position is the end of the buffer.
    pub fn read_element(&self, position: usize) -> Result<(Element, usize)> {
        let encoding = self.context.encoding_at(position);
        let (element, next) = self.read_element_in(position, encoding, 0)?;
        if element.tag() == Tag::PIXEL_DATA {
            if next < self.buf.len() {
                tracing::warn!(
                    "Ignoring {} bytes after pixel data",
                    self.buf.len() - next
                );
            }
            return Ok((element, self.buf.len()));
        }
        Ok((element, next))
    }

    /// Read all root elements from `position` to the end of the buffer.
    pub fn read_to_end(&self, mut position: usize) -> Result<Vec<Element>> {
        let mut elements = Vec::new();
        while position < self.buf.len() {
            let (element, next) = self.read_element(position)?;
            elements.push(element);
            position = next;
        }
        Ok(elements)
    }

    /// Read an element at any depth with the given encoding.
    pub(crate) fn read_element_in(
        &self,
        position: usize,
        encoding: Encoding,
        depth: usize,
    ) -> Result<(Element, usize)> {
        let (header, header_size) =
            decode_header(self.buf, position, encoding, &self.dict).context(ReadHeaderSnafu { position })?;
        let data = position + header_size;
        let tag = header.tag();
        let order = encoding.endianness;

        let (value, end) = match (header.vr(), header.length().get()) {
            (VR::SQ, len) => {
                let (items, end) = self.read_sequence(tag, data, len, encoding, depth + 1)?;
                (Value::Sequence(items), end)
            }
            (VR::OB, None) | (VR::OW, None) | (VR::OF, None) if tag == Tag::PIXEL_DATA => {
                let (fragments, end) = self.read_fragments(data, order)?;
                (Value::PixelSequence(fragments), end)
            }
            (VR::UN, None) => {
                // unknown content of undefined length is a sequence
                // in Implicit VR Little Endian
                let (items, end) =
                    self.read_sequence(tag, data, None, Encoding::IMPLICIT_VR_LE, depth + 1)?;
                (Value::Sequence(items), end)
            }
            (vr, None) => {
                return UndefinedLengthSnafu { tag, vr, position }.fail();
            }
            (vr, Some(len)) => {
                let len = len as usize;
                let bytes = take(self.buf, data, len).context(ReadValueSnafu { tag })?;
                (decode_value(bytes, vr, order), data + len)
            }
        };

        let element = Element::new(header, order, value).with_offsets(Offsets {
            start: position,
            data,
            end,
        });
        Ok((element, end))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dicomkit_core::value::C;
    use dicomkit_dictionary_std::StandardDataDictionary;
    use matches::assert_matches;
    use smallvec::smallvec;

    #[rustfmt::skip]
    const RAW_EXPLICIT_LE: &[u8] = &[
        0x08, 0x00, 0x60, 0x00,  // (0008,0060) Modality
            b'C', b'S',          // VR: CS
            0x02, 0x00,          // Length: 2
            b'M', b'R',
        0x28, 0x00, 0x10, 0x00,  // (0028,0010) Rows
            b'U', b'S',          // VR: US
            0x02, 0x00,          // Length: 2
            0x00, 0x02,          // 512
    ];

    #[test]
    fn read_primitive_elements() {
        let reader = ElementReader::new(
            RAW_EXPLICIT_LE,
            StandardDataDictionary,
            ReadContext::new(Encoding::EXPLICIT_VR_LE),
        );
        let (modality, next) = reader.read_element(0).unwrap();
        assert_eq!(modality.tag(), Tag(0x0008, 0x0060));
        assert_eq!(modality.value(), &Value::Str("MR".to_string()));
        assert_eq!(
            modality.offsets(),
            Some(Offsets {
                start: 0,
                data: 8,
                end: 10
            })
        );
        assert_eq!(next, 10);

        let (rows, next) = reader.read_element(next).unwrap();
        let expected: C<u16> = smallvec![512];
        assert_eq!(rows.value(), &Value::U16(expected));
        assert_eq!(next, RAW_EXPLICIT_LE.len());
    }

    #[test]
    fn read_to_end_reads_everything() {
        let reader = ElementReader::new(
            RAW_EXPLICIT_LE,
            StandardDataDictionary,
            ReadContext::new(Encoding::EXPLICIT_VR_LE),
        );
        let elements = reader.read_to_end(0).unwrap();
        assert_eq!(elements.len(), 2);
    }

    #[test]
    fn bytes_after_pixel_data_are_dropped() {
        #[rustfmt::skip]
        let raw: &[u8] = &[
            0xe0, 0x7f, 0x10, 0x00,  // (7FE0,0010) PixelData
                b'O', b'W', 0x00, 0x00,
                0x02, 0x00, 0x00, 0x00, // Length: 2
                0x01, 0x02,
            // padding left by some writers
            0x00, 0x00, 0x00,
        ];
        let reader = ElementReader::new(
            raw,
            StandardDataDictionary,
            ReadContext::new(Encoding::EXPLICIT_VR_LE),
        );
        let (pixels, next) = reader.read_element(0).unwrap();
        assert_eq!(pixels.value(), &Value::Bytes(vec![0x01, 0x02]));
        assert_eq!(pixels.offsets().unwrap().end, 14);
        assert_eq!(next, raw.len());
        assert_eq!(reader.read_to_end(0).unwrap().len(), 1);
    }

    #[test]
    fn truncated_value() {
        let raw = &RAW_EXPLICIT_LE[..9];
        let reader = ElementReader::new(
            raw,
            StandardDataDictionary,
            ReadContext::new(Encoding::EXPLICIT_VR_LE),
        );
        let err = reader.read_element(0).unwrap_err();
        assert!(err.is_truncated());
        assert_matches!(err, Error::ReadValue { .. });
    }

    #[test]
    fn truncated_header() {
        let raw = &RAW_EXPLICIT_LE[..6];
        let reader = ElementReader::new(
            raw,
            StandardDataDictionary,
            ReadContext::new(Encoding::EXPLICIT_VR_LE),
        );
        assert!(reader.read_element(0).unwrap_err().is_truncated());
    }

    #[test]
    fn unsupported_vr() {
        let raw = [0x08, 0x00, 0x60, 0x00, b'X', b'X', 0x00, 0x00];
        let reader = ElementReader::new(
            &raw[..],
            StandardDataDictionary,
            ReadContext::new(Encoding::EXPLICIT_VR_LE),
        );
        assert!(reader.read_element(0).unwrap_err().is_unsupported_vr());
    }

    #[test]
    fn undefined_length_on_primitive_vr() {
        #[rustfmt::skip]
        let raw: &[u8] = &[
            0x10, 0x00, 0x10, 0x00,  // (0010,0010) PatientName
                0xff, 0xff, 0xff, 0xff, // Length: undefined
        ];
        let reader = ElementReader::new(
            raw,
            StandardDataDictionary,
            ReadContext::new(Encoding::IMPLICIT_VR_LE),
        );
        assert_matches!(
            reader.read_element(0),
            Err(Error::UndefinedLength { vr: VR::PN, .. })
        );
    }

    #[test]
    fn implicit_vr_uses_dictionary() {
        #[rustfmt::skip]
        let raw: &[u8] = &[
            0x28, 0x00, 0x11, 0x00,  // (0028,0011) Columns
                0x02, 0x00, 0x00, 0x00, // Length: 2
                0x00, 0x01,          // 256
            0x09, 0x00, 0x10, 0x00,  // (0009,0010) private
                0x02, 0x00, 0x00, 0x00, // Length: 2
                b'A', b'B',
        ];
        let reader = ElementReader::new(
            raw,
            StandardDataDictionary,
            ReadContext::new(Encoding::IMPLICIT_VR_LE),
        );
        let elements = reader.read_to_end(0).unwrap();
        assert_eq!(elements[0].vr(), VR::US);
        assert_eq!(elements[0].value().to_int::<u16>().unwrap(), 256);
        assert_eq!(elements[1].vr(), VR::LO);
    }

    #[test]
    fn meta_group_stays_explicit_le() {
        #[rustfmt::skip]
        let raw: &[u8] = &[
            0x02, 0x00, 0x13, 0x00,  // (0002,0013) ImplementationVersionName
                b'S', b'H',          // VR: SH
                0x04, 0x00,          // Length: 4
                b'T', b'E', b'S', b'T',
            0x00, 0x28, 0x00, 0x10,  // (0028,0010) Rows
                b'U', b'S',          // VR: US
                0x00, 0x02,          // Length: 2
                0x01, 0x00,          // 256
        ];
        let context = ReadContext {
            encoding: Encoding::EXPLICIT_VR_BE,
            meta_limit: Some(12),
        };
        let reader = ElementReader::new(raw, StandardDataDictionary, context);
        let elements = reader.read_to_end(0).unwrap();
        assert_eq!(elements[0].tag(), Tag(0x0002, 0x0013));
        assert_eq!(elements[1].tag(), Tag(0x0028, 0x0010));
        assert_eq!(elements[1].value().to_int::<u16>().unwrap(), 256);
    }
}
