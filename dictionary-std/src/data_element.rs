use crate::tags::ENTRIES;
use crate::uids::{SERVICE_SOP_CLASSES, STORAGE_SOP_CLASSES, SUPPORTED_TRANSFER_SYNTAXES};
use dicomkit_core::dictionary::{DataDictionary, DictionaryEntryRef};
use dicomkit_core::header::{Tag, VR};
use once_cell::sync::Lazy;
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::fmt::{Display, Formatter};

static DICT: Lazy<StandardDataDictionaryRegistry> = Lazy::new(init_dictionary);

/// Retrieve a singleton instance of the standard dictionary registry.
///
/// The unit type [`StandardDataDictionary`]
/// already provides a lazy loaded singleton implementing the necessary traits.
#[inline]
pub fn registry() -> &'static StandardDataDictionaryRegistry {
    &DICT
}

/// The data struct actually containing the standard dictionary.
#[derive(Debug)]
pub struct StandardDataDictionaryRegistry {
    /// mapping: name → entry
    by_name: HashMap<&'static str, &'static DictionaryEntryRef<'static>>,
    /// mapping: tag → entry
    by_tag: HashMap<Tag, &'static DictionaryEntryRef<'static>>,
    transfer_syntaxes: HashSet<&'static str>,
    sop_classes: HashSet<&'static str>,
}

impl StandardDataDictionaryRegistry {
    fn new() -> StandardDataDictionaryRegistry {
        StandardDataDictionaryRegistry {
            by_name: HashMap::with_capacity(ENTRIES.len() + 1),
            by_tag: HashMap::with_capacity(ENTRIES.len()),
            transfer_syntaxes: HashSet::new(),
            sop_classes: HashSet::new(),
        }
    }

    /// record the given dictionary entry reference
    fn index(&mut self, entry: &'static DictionaryEntryRef<'static>) -> &mut Self {
        self.by_name.insert(entry.alias, entry);
        self.by_tag.insert(entry.tag, entry);
        self
    }
}

/// Generic Group Length dictionary entry.
static GROUP_LENGTH_ENTRY: DictionaryEntryRef<'static> = DictionaryEntryRef {
    tag: Tag(0x0000, 0x0000),
    alias: "GenericGroupLength",
    vr: VR::UL,
};

/// Generic Private Creator dictionary entry.
static PRIVATE_CREATOR_ENTRY: DictionaryEntryRef<'static> = DictionaryEntryRef {
    tag: Tag(0x0009, 0x0010),
    alias: "PrivateCreator",
    vr: VR::LO,
};

/// A data element dictionary which consults
/// the library's global DICOM attribute registry.
///
/// This is the type which would generally be used
/// whenever a data element dictionary is needed,
/// such as when reading DICOM objects.
///
/// The dictionary index is automatically initialized upon the first use.
///
/// The table covers the command group, the file meta group,
/// the usual patient, study, series and image attributes,
/// and the Query/Retrieve matching keys.
/// It is not the full standard registry:
/// an attribute outside of it has no name,
/// and under Implicit VR its value is read as `UN` bytes.
/// Such elements are still written back unchanged.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct StandardDataDictionary;

impl StandardDataDictionary {
    fn indexed_tag(tag: Tag) -> Option<&'static DictionaryEntryRef<'static>> {
        registry().by_tag.get(&tag).copied().or_else(|| {
            // private creator
            if tag.0 & 1 == 1 && (0x0010..=0x00FF).contains(&tag.1) {
                return Some(&PRIVATE_CREATOR_ENTRY);
            }
            if tag.is_group_length() {
                return Some(&GROUP_LENGTH_ENTRY);
            }
            None
        })
    }
}

impl DataDictionary for StandardDataDictionary {
    type Entry = DictionaryEntryRef<'static>;

    fn by_name(&self, name: &str) -> Option<&Self::Entry> {
        registry().by_name.get(name).copied()
    }

    fn by_tag(&self, tag: Tag) -> Option<&Self::Entry> {
        StandardDataDictionary::indexed_tag(tag)
    }

    fn is_supported_transfer_syntax(&self, uid: &str) -> bool {
        registry().transfer_syntaxes.contains(trim_uid(uid))
    }

    fn is_supported_sop_class(&self, uid: &str) -> bool {
        registry().sop_classes.contains(trim_uid(uid))
    }
}

impl Display for StandardDataDictionary {
    fn fmt(&self, f: &mut Formatter) -> Result<(), fmt::Error> {
        f.write_str("Standard DICOM Data Dictionary")
    }
}

/// UIDs are padded with a trailing null byte to even length.
fn trim_uid(uid: &str) -> &str {
    uid.trim_end_matches(|c: char| c == '\0' || c == ' ')
}

fn init_dictionary() -> StandardDataDictionaryRegistry {
    let mut d = StandardDataDictionaryRegistry::new();
    for entry in ENTRIES {
        d.index(entry);
    }
    // generic group length is not a table entry,
    // inserting it manually
    d.by_name.insert("GenericGroupLength", &GROUP_LENGTH_ENTRY);
    d.transfer_syntaxes
        .extend(SUPPORTED_TRANSFER_SYNTAXES.iter().copied());
    d.sop_classes.extend(STORAGE_SOP_CLASSES.iter().copied());
    d.sop_classes.extend(SERVICE_SOP_CLASSES.iter().copied());
    d
}
