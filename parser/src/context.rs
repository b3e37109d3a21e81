use dicomkit_core::{Element, Header};
use dicomkit_encoding::Encoding;

/// Size of everything before the first meta element after the group length:
/// the 128-byte preamble, the `DICM` magic code
/// and the 12 bytes of the File Meta Information Group Length element.
pub const META_BASE_OFFSET: usize = 144;

/// The encoding layout of a data set buffer.
///
/// Root elements starting before the meta limit
/// belong to the File Meta Information group
/// and are always Explicit VR Little Endian.
/// Everything else uses the encoding of the data set.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct ReadContext {
    /// encoding of the data set after the meta group
    pub encoding: Encoding,
    /// position where the meta group ends, if the buffer has one
    pub meta_limit: Option<usize>,
}

impl ReadContext {
    /// A context for a buffer without File Meta Information,
    /// where all elements share the same encoding.
    pub fn new(encoding: Encoding) -> Self {
        ReadContext {
            encoding,
            meta_limit: None,
        }
    }

    /// A context for a DICOM file, given the value of
    /// File Meta Information Group Length (0 until it is known).
    pub fn with_meta_group_length(encoding: Encoding, group_length: u32) -> Self {
        ReadContext {
            encoding,
            meta_limit: Some(META_BASE_OFFSET + group_length as usize),
        }
    }

    pub fn set_meta_group_length(&mut self, group_length: u32) {
        self.meta_limit = Some(META_BASE_OFFSET + group_length as usize);
    }

    /// The encoding of a root element starting at `position`.
    pub fn encoding_at(&self, position: usize) -> Encoding {
        match self.meta_limit {
            Some(limit) if position < limit => Encoding::EXPLICIT_VR_LE,
            _ => self.encoding,
        }
    }

    /// The encoding in which a root element is written back.
    ///
    /// Elements read from a buffer keep the side of the meta boundary
    /// where they ended.
    /// Elements without offsets are placed by group:
    /// group 0002 is meta, anything else follows the data set.
    pub fn encoding_for(&self, element: &Element) -> Encoding {
        let limit = match self.meta_limit {
            Some(limit) => limit,
            None => return self.encoding,
        };
        let in_meta = match element.offsets() {
            Some(offsets) => offsets.end <= limit,
            None => element.tag().group() == 0x0002,
        };
        if in_meta {
            Encoding::EXPLICIT_VR_LE
        } else {
            self.encoding
        }
    }
}
