//! Transfer syntax descriptors.
//!
//! Only two properties of a transfer syntax matter to the codec:
//! whether the VR is explicit and the byte order.
//! Compressed transfer syntaxes encode their data sets
//! in Explicit VR Little Endian and keep pixel data in fragments,
//! which are carried as opaque bytes.

use byteordered::Endianness;
use std::fmt;

/// Implicit VR Little Endian
pub const IMPLICIT_VR_LITTLE_ENDIAN: &str = "1.2.840.10008.1.2";
/// Explicit VR Little Endian
pub const EXPLICIT_VR_LITTLE_ENDIAN: &str = "1.2.840.10008.1.2.1";
/// Deflated Explicit VR Little Endian
pub const DEFLATED_EXPLICIT_VR_LITTLE_ENDIAN: &str = "1.2.840.10008.1.2.1.99";
/// Explicit VR Big Endian (retired)
pub const EXPLICIT_VR_BIG_ENDIAN: &str = "1.2.840.10008.1.2.2";
/// JPEG Baseline (Process 1)
pub const JPEG_BASELINE: &str = "1.2.840.10008.1.2.4.50";

/// Whether each element header carries its VR.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum VrDialect {
    Explicit,
    Implicit,
}

/// The VR dialect and byte order of an encoded data set.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct Encoding {
    pub dialect: VrDialect,
    pub endianness: Endianness,
}

impl Encoding {
    pub const IMPLICIT_VR_LE: Encoding = Encoding {
        dialect: VrDialect::Implicit,
        endianness: Endianness::Little,
    };
    pub const EXPLICIT_VR_LE: Encoding = Encoding {
        dialect: VrDialect::Explicit,
        endianness: Endianness::Little,
    };
    pub const EXPLICIT_VR_BE: Encoding = Encoding {
        dialect: VrDialect::Explicit,
        endianness: Endianness::Big,
    };

    pub fn is_explicit(self) -> bool {
        self.dialect == VrDialect::Explicit
    }
}

impl fmt::Display for Encoding {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let dialect = match self.dialect {
            VrDialect::Explicit => "Explicit VR",
            VrDialect::Implicit => "Implicit VR",
        };
        let order = match self.endianness {
            Endianness::Little => "Little Endian",
            Endianness::Big => "Big Endian",
        };
        write!(f, "{} {}", dialect, order)
    }
}

/// A transfer syntax: its UID and the encoding it implies.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct TransferSyntax {
    uid: String,
    encoding: Encoding,
}

impl TransferSyntax {
    /// Describe the transfer syntax with the given UID.
    ///
    /// Implicit VR Little Endian and Explicit VR Big Endian are recognized;
    /// anything else is Explicit VR Little Endian.
    /// Trailing padding in the UID is ignored.
    pub fn from_uid(uid: &str) -> Self {
        let uid = uid.trim_end_matches(|c: char| c == '\0' || c == ' ');
        let encoding = match uid {
            IMPLICIT_VR_LITTLE_ENDIAN => Encoding::IMPLICIT_VR_LE,
            EXPLICIT_VR_BIG_ENDIAN => Encoding::EXPLICIT_VR_BE,
            _ => Encoding::EXPLICIT_VR_LE,
        };
        TransferSyntax {
            uid: uid.to_string(),
            encoding,
        }
    }

    /// The default transfer syntax for DICOM, Implicit VR Little Endian.
    pub fn implicit_vr_le() -> Self {
        TransferSyntax::from_uid(IMPLICIT_VR_LITTLE_ENDIAN)
    }

    /// Explicit VR Little Endian.
    pub fn explicit_vr_le() -> Self {
        TransferSyntax::from_uid(EXPLICIT_VR_LITTLE_ENDIAN)
    }

    /// Explicit VR Big Endian.
    pub fn explicit_vr_be() -> Self {
        TransferSyntax::from_uid(EXPLICIT_VR_BIG_ENDIAN)
    }

    pub fn uid(&self) -> &str {
        &self.uid
    }

    pub fn encoding(&self) -> Encoding {
        self.encoding
    }

    pub fn dialect(&self) -> VrDialect {
        self.encoding.dialect
    }

    pub fn endianness(&self) -> Endianness {
        self.encoding.endianness
    }
}

impl Default for TransferSyntax {
    fn default() -> Self {
        TransferSyntax::explicit_vr_le()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("1.2.840.10008.1.2", VrDialect::Implicit, Endianness::Little)]
    #[case("1.2.840.10008.1.2\0", VrDialect::Implicit, Endianness::Little)]
    #[case("1.2.840.10008.1.2.1", VrDialect::Explicit, Endianness::Little)]
    #[case("1.2.840.10008.1.2.2", VrDialect::Explicit, Endianness::Big)]
    #[case("1.2.840.10008.1.2.4.50", VrDialect::Explicit, Endianness::Little)]
    #[case("1.2.3.4.5", VrDialect::Explicit, Endianness::Little)]
    fn uid_to_encoding(#[case] uid: &str, #[case] dialect: VrDialect, #[case] order: Endianness) {
        let ts = TransferSyntax::from_uid(uid);
        assert_eq!(ts.dialect(), dialect);
        assert_eq!(ts.endianness(), order);
        assert!(!ts.uid().ends_with('\0'));
    }
}
