//! The concept of a DICOM data dictionary.
//!
//! The codec and the network layer consult a dictionary as a read-only
//! service: to find the VR of an implicitly encoded element,
//! to translate attribute names into tags,
//! and to check whether a transfer syntax or SOP class is supported.

use crate::header::{Tag, VR};
use std::fmt::Debug;

/// Type trait for a dictionary of DICOM attributes.
///
/// The methods herein have no generic parameters, so as to enable being
/// used as a trait object.
pub trait DataDictionary: Debug {
    /// The type of the dictionary entry.
    type Entry: DictionaryEntry;

    /// Fetch an entry by its usual alias (e.g. "PatientName" or "SOPInstanceUID").
    /// Aliases are case sensitive and not separated by spaces.
    fn by_name(&self, name: &str) -> Option<&Self::Entry>;

    /// Fetch an entry by its tag.
    fn by_tag(&self, tag: Tag) -> Option<&Self::Entry>;

    /// The VR to assume for an implicitly encoded element.
    ///
    /// Group length elements `(gggg,0000)` are always UL.
    /// Unknown attributes are UN.
    fn vr_for_tag(&self, tag: Tag) -> VR {
        if tag.is_group_length() {
            return VR::UL;
        }
        self.by_tag(tag).map(|e| e.vr()).unwrap_or(VR::UN)
    }

    /// The alias of the attribute with the given tag.
    fn name_for_tag(&self, tag: Tag) -> Option<&str> {
        self.by_tag(tag).map(|e| e.alias())
    }

    /// The tag of the attribute with the given alias.
    fn tag_for_name(&self, name: &str) -> Option<Tag> {
        self.by_name(name).map(|e| e.tag())
    }

    /// Whether data sets in this transfer syntax can be handled.
    fn is_supported_transfer_syntax(&self, uid: &str) -> bool;

    /// Whether objects of this SOP class can be handled.
    fn is_supported_sop_class(&self, uid: &str) -> bool;
}

/// The dictionary entry data type, representing a DICOM attribute.
pub trait DictionaryEntry {
    /// The attribute tag.
    fn tag(&self) -> Tag;
    /// The alias of the attribute, with no spaces, usually in UpperCamelCase.
    fn alias(&self) -> &str;
    /// The _typical_ value representation of the attribute.
    fn vr(&self) -> VR;
}

/// A data type for a dictionary entry with a string slice for its alias.
#[derive(Debug, PartialEq, Eq, Clone)]
pub struct DictionaryEntryRef<'a> {
    /// The attribute tag
    pub tag: Tag,
    /// The alias of the attribute, with no spaces, usually InCapitalizedCamelCase
    pub alias: &'a str,
    /// The _typical_ value representation of the attribute
    pub vr: VR,
}

impl<'a> DictionaryEntry for DictionaryEntryRef<'a> {
    fn tag(&self) -> Tag {
        self.tag
    }
    fn alias(&self) -> &str {
        self.alias
    }
    fn vr(&self) -> VR {
        self.vr
    }
}

impl<D: DataDictionary + ?Sized> DataDictionary for &D {
    type Entry = D::Entry;

    fn by_name(&self, name: &str) -> Option<&Self::Entry> {
        (**self).by_name(name)
    }

    fn by_tag(&self, tag: Tag) -> Option<&Self::Entry> {
        (**self).by_tag(tag)
    }

    fn is_supported_transfer_syntax(&self, uid: &str) -> bool {
        (**self).is_supported_transfer_syntax(uid)
    }

    fn is_supported_sop_class(&self, uid: &str) -> bool {
        (**self).is_supported_sop_class(uid)
    }
}
