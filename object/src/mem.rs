//! The in-memory DICOM object.
//!
//! All elements live in a single vector sorted by tag.
//! The File Meta Information group and the rest of the data set
//! are views over that vector,
//! so that every element is in exactly one of the two.
use crate::file::ReadOptions;
use crate::{
    AccessByNameError, AccessError, IncompatibleValueSnafu, MissingMagicSnafu,
    NoSuchAttributeNameSnafu, NoSuchDataElementAliasSnafu, NoSuchDataElementTagSnafu,
    ParseDataSetSnafu, PrintDataSetSnafu, ReadError, SetError, UnknownAttributeSnafu,
    UnsupportedSOPClassSnafu, UnsupportedTransferSyntaxSnafu, WriteError,
};
use dicomkit_core::header::Header;
use dicomkit_core::{
    DataDictionary, DataElementHeader, Element, Endianness, Length, NaiveDate, NaiveDateTime,
    NaiveTime, Tag, Value, VR,
};
use dicomkit_dictionary_std::{tags, StandardDataDictionary};
use dicomkit_encoding::{Encoding, TransferSyntax};
use dicomkit_parser::{write_element, write_elements, ElementReader, ReadContext};
use snafu::{ensure, OptionExt, ResultExt};
use std::borrow::Cow;
use std::path::Path;
use tracing::{debug, warn};

/// Size of the file preamble.
pub const PREAMBLE_SIZE: usize = 128;

/// The magic code following the preamble.
pub const MAGIC: &[u8; 4] = b"DICM";

/// A DICOM data set held in memory.
#[derive(Debug, Clone, PartialEq)]
pub struct DataSet<D = StandardDataDictionary> {
    dict: D,
    /// layout of the source buffer, used again when writing
    context: ReadContext,
    transfer_syntax: TransferSyntax,
    group_length: u32,
    /// present if the data set has a file header
    preamble: Option<Vec<u8>>,
    elements: Vec<Element>,
}

impl DataSet<StandardDataDictionary> {
    /// Create an empty DICOM file data set,
    /// with a zero preamble and Explicit VR Little Endian.
    ///
    /// It starts with a File Meta Information Group Length element,
    /// which is kept up to date as meta elements are set.
    pub fn new() -> Self {
        DataSet::new_with_dict(StandardDataDictionary)
    }

    /// Create an empty data set without file header,
    /// such as a command set or a data set sent over the network.
    pub fn without_header(transfer_syntax: TransferSyntax) -> Self {
        DataSet::without_header_with_dict(transfer_syntax, StandardDataDictionary)
    }

    /// Load a DICOM file from its bytes, with the default options.
    pub fn load(bytes: &[u8]) -> Result<Self, ReadError> {
        ReadOptions::new().load(bytes)
    }
}

impl Default for DataSet<StandardDataDictionary> {
    fn default() -> Self {
        DataSet::new()
    }
}

impl<D> DataSet<D>
where
    D: DataDictionary,
{
    pub fn new_with_dict(dict: D) -> Self {
        let group_length = Element::new(
            DataElementHeader::new(tags::FILE_META_INFORMATION_GROUP_LENGTH, VR::UL, Length(4)),
            Endianness::Little,
            Value::from(0_u32),
        );
        DataSet {
            dict,
            context: ReadContext::with_meta_group_length(Encoding::EXPLICIT_VR_LE, 0),
            transfer_syntax: TransferSyntax::explicit_vr_le(),
            group_length: 0,
            preamble: Some(vec![0; PREAMBLE_SIZE]),
            elements: vec![group_length],
        }
    }

    pub fn without_header_with_dict(transfer_syntax: TransferSyntax, dict: D) -> Self {
        DataSet {
            dict,
            context: ReadContext::new(transfer_syntax.encoding()),
            transfer_syntax,
            group_length: 0,
            preamble: None,
            elements: Vec::new(),
        }
    }

    /// Decode a data set from `bytes`.
    ///
    /// Loading is all or nothing:
    /// on failure no partial data set is returned.
    pub(crate) fn load_with_options(bytes: &[u8], options: ReadOptions<D>) -> Result<Self, ReadError> {
        let ReadOptions {
            dictionary,
            read_header,
            validate,
            max_depth,
            transfer_syntax,
        } = options;

        let (preamble, context, start) = if read_header {
            ensure!(
                bytes.len() >= PREAMBLE_SIZE + MAGIC.len()
                    && &bytes[PREAMBLE_SIZE..PREAMBLE_SIZE + MAGIC.len()] == MAGIC,
                MissingMagicSnafu
            );
            (
                Some(bytes[..PREAMBLE_SIZE].to_vec()),
                ReadContext::with_meta_group_length(Encoding::EXPLICIT_VR_LE, 0),
                PREAMBLE_SIZE + MAGIC.len(),
            )
        } else {
            (None, ReadContext::new(transfer_syntax.encoding()), 0)
        };
        // the data set encoding is known once the meta group is read
        let mut transfer_syntax = if read_header {
            TransferSyntax::explicit_vr_le()
        } else {
            transfer_syntax
        };
        let mut group_length = 0;

        let mut elements = Vec::new();
        let context = {
            let mut reader = ElementReader::new(bytes, &dictionary, context).with_max_depth(max_depth);
            let mut position = start;
            while position < bytes.len() {
                let (element, next) = reader.read_element(position).context(ParseDataSetSnafu)?;
                let tag = element.tag();

                if read_header && tag == tags::FILE_META_INFORMATION_GROUP_LENGTH {
                    match element.value().to_int::<u32>() {
                        Ok(len) => {
                            group_length = len;
                            reader.context_mut().set_meta_group_length(len);
                        }
                        Err(e) => warn!("Ignoring bad meta group length: {}", e),
                    }
                } else if read_header && tag == tags::TRANSFER_SYNTAX_UID {
                    let uid = element.value().to_str().map(Cow::into_owned).unwrap_or_default();
                    if validate {
                        ensure!(
                            dictionary.is_supported_transfer_syntax(&uid),
                            UnsupportedTransferSyntaxSnafu { uid }
                        );
                    }
                    transfer_syntax = TransferSyntax::from_uid(&uid);
                    reader.context_mut().encoding = transfer_syntax.encoding();
                    debug!("Data set encoding: {}", transfer_syntax.encoding());
                } else if validate && tag == tags::SOP_CLASS_UID {
                    let uid = element.value().to_str().map(Cow::into_owned).unwrap_or_default();
                    ensure!(
                        dictionary.is_supported_sop_class(&uid),
                        UnsupportedSOPClassSnafu { uid }
                    );
                }

                elements.push(element);
                position = next;
            }
            *reader.context()
        };

        elements.sort_by_key(|e| e.tag());
        debug!("Loaded {} elements", elements.len());

        Ok(DataSet {
            dict: dictionary,
            context,
            transfer_syntax,
            group_length,
            preamble,
            elements,
        })
    }

    /// Encode the data set, including the preamble and magic code
    /// if it has a file header.
    ///
    /// An unmodified data set is encoded to the exact bytes it was read from.
    pub fn to_bytes(&self) -> Result<Vec<u8>, WriteError> {
        let mut out = Vec::new();
        if let Some(preamble) = &self.preamble {
            out.extend_from_slice(preamble);
            out.extend_from_slice(MAGIC);
        }
        write_elements(&mut out, &self.elements, &self.context).context(PrintDataSetSnafu)?;
        Ok(out)
    }

    /// Encode the data set into a file at the given path.
    pub fn write_file<P: AsRef<Path>>(&self, path: P) -> Result<(), WriteError> {
        let path = path.as_ref();
        let bytes = self.to_bytes()?;
        std::fs::write(path, bytes).context(crate::WriteFileSnafu { filename: path })
    }

    /// Encode the data set into a file,
    /// converting the data set to another transfer syntax if one is given.
    pub fn write_file_with<P: AsRef<Path>>(
        &self,
        path: P,
        transfer_syntax: Option<TransferSyntax>,
    ) -> Result<(), WriteError>
    where
        D: Clone,
    {
        match transfer_syntax {
            None => self.write_file(path),
            Some(ts) => {
                let mut converted = self.clone();
                converted
                    .set_transfer_syntax(ts)
                    .context(crate::ChangeTransferSyntaxSnafu)?;
                converted.write_file(path)
            }
        }
    }

    pub fn dictionary(&self) -> &D {
        &self.dict
    }

    pub fn transfer_syntax(&self) -> &TransferSyntax {
        &self.transfer_syntax
    }

    /// The encoding of the data set after the meta group.
    pub fn encoding(&self) -> Encoding {
        self.context.encoding
    }

    /// The value of File Meta Information Group Length.
    pub fn group_length(&self) -> u32 {
        self.group_length
    }

    pub fn preamble(&self) -> Option<&[u8]> {
        self.preamble.as_deref()
    }

    /// Whether the data set has a preamble, magic code and meta group.
    pub fn has_header(&self) -> bool {
        self.preamble.is_some()
    }

    /// All elements, sorted by tag.
    pub fn elements(&self) -> &[Element] {
        &self.elements
    }

    /// The elements of the File Meta Information group.
    pub fn meta_elements(&self) -> impl Iterator<Item = &Element> {
        self.elements.iter().filter(|e| e.tag().group() == 0x0002)
    }

    /// The elements outside of the File Meta Information group.
    pub fn dataset_elements(&self) -> impl Iterator<Item = &Element> {
        self.elements.iter().filter(|e| e.tag().group() != 0x0002)
    }

    pub fn len(&self) -> usize {
        self.elements.len()
    }

    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }

    /// Resolve an attribute name, or a tag in text form, into a tag.
    pub fn resolve(&self, name: &str) -> Option<Tag> {
        self.dict.tag_for_name(name).or_else(|| name.parse().ok())
    }

    fn index_of(&self, tag: Tag) -> Result<usize, usize> {
        self.elements.binary_search_by_key(&tag, |e| e.tag())
    }

    pub fn get(&self, tag: Tag) -> Option<&Element> {
        self.index_of(tag).ok().map(|i| &self.elements[i])
    }

    pub fn element(&self, tag: Tag) -> Result<&Element, AccessError> {
        self.get(tag).context(NoSuchDataElementTagSnafu { tag })
    }

    /// Look up an element by attribute name (`"PatientName"`)
    /// or by tag text (`"0010,0010"`, `"00100010"`).
    pub fn element_by_name(&self, name: &str) -> Result<&Element, AccessByNameError> {
        let tag = self.resolve(name).context(NoSuchAttributeNameSnafu { name })?;
        self.get(tag)
            .context(NoSuchDataElementAliasSnafu { tag, alias: name })
    }

    /// Insert an element, replacing any element with the same tag.
    /// Returns the replaced element.
    pub fn put(&mut self, element: Element) -> Option<Element> {
        let tag = element.tag();
        let old = match self.index_of(tag) {
            Ok(i) => Some(std::mem::replace(&mut self.elements[i], element)),
            Err(i) => {
                self.elements.insert(i, element);
                None
            }
        };
        self.after_change(tag);
        old
    }

    /// Set the value of the attribute with the given name.
    ///
    /// An existing element keeps its VR and the value is checked against it.
    /// A new element takes its VR from the dictionary.
    pub fn set<V>(&mut self, name: &str, value: V) -> Result<&Element, SetError>
    where
        V: Into<Value>,
    {
        let tag = self.resolve(name).context(UnknownAttributeSnafu { name })?;
        self.set_tag(tag, value)
    }

    /// Set the value of the element with the given tag.
    pub fn set_tag<V>(&mut self, tag: Tag, value: V) -> Result<&Element, SetError>
    where
        V: Into<Value>,
    {
        let value = value.into();
        let index = match self.index_of(tag) {
            Ok(i) => {
                self.elements[i]
                    .set_value(value)
                    .context(IncompatibleValueSnafu { tag })?;
                i
            }
            Err(i) => {
                let vr = self.dict.vr_for_tag(tag);
                let mut element = Element::create(tag, vr, value).context(IncompatibleValueSnafu { tag })?;
                if tag.group() != 0x0002 {
                    element.set_byte_order(self.context.encoding.endianness);
                }
                self.elements.insert(i, element);
                i
            }
        };
        self.after_change(tag);
        Ok(&self.elements[index])
    }

    /// Remove the element with the given tag.
    pub fn remove(&mut self, tag: Tag) -> Option<Element> {
        let i = self.index_of(tag).ok()?;
        let element = self.elements.remove(i);
        self.after_change(tag);
        Some(element)
    }

    /// Remove the element with the given attribute name.
    pub fn remove_by_name(&mut self, name: &str) -> Result<Element, AccessByNameError> {
        let tag = self.resolve(name).context(NoSuchAttributeNameSnafu { name })?;
        self.remove(tag)
            .context(NoSuchDataElementAliasSnafu { tag, alias: name })
    }

    /// Change the transfer syntax of the data set.
    ///
    /// Elements after the meta group will be written with its encoding.
    pub fn set_transfer_syntax(&mut self, transfer_syntax: TransferSyntax) -> Result<(), SetError> {
        if self.has_header() {
            self.set_tag(tags::TRANSFER_SYNTAX_UID, transfer_syntax.uid())?;
        } else {
            self.context.encoding = transfer_syntax.encoding();
            self.transfer_syntax = transfer_syntax;
        }
        Ok(())
    }

    fn after_change(&mut self, tag: Tag) {
        if tag == tags::TRANSFER_SYNTAX_UID {
            let uid = self
                .get(tag)
                .and_then(|e| e.value().to_str().ok().map(Cow::into_owned));
            if let Some(uid) = uid {
                let ts = TransferSyntax::from_uid(&uid);
                self.context.encoding = ts.encoding();
                self.transfer_syntax = ts;
            }
        }
        if tag.group() == 0x0002 && tag != tags::FILE_META_INFORMATION_GROUP_LENGTH {
            self.update_group_length();
        }
    }

    /// Recompute File Meta Information Group Length from the meta elements.
    fn update_group_length(&mut self) {
        let mut len = 0;
        for element in self
            .meta_elements()
            .filter(|e| e.tag() != tags::FILE_META_INFORMATION_GROUP_LENGTH)
        {
            let mut out = Vec::new();
            if let Err(e) = write_element(&mut out, element, Encoding::EXPLICIT_VR_LE) {
                warn!("Could not compute meta group length: {}", e);
                return;
            }
            len += out.len();
        }
        let len = len as u32;
        if len == self.group_length {
            return;
        }
        if let Ok(i) = self.index_of(tags::FILE_META_INFORMATION_GROUP_LENGTH) {
            if self.elements[i].set_value(Value::from(len)).is_ok() {
                self.group_length = len;
            }
        }
    }

    fn value_of(&self, name: &str) -> Option<&Value> {
        self.get(self.resolve(name)?).map(Element::value)
    }

    /// The text value of an attribute, without padding.
    pub fn string(&self, name: &str) -> Option<String> {
        self.value_of(name)?.to_str().ok().map(Cow::into_owned)
    }

    pub fn integer16(&self, name: &str) -> Option<i16> {
        self.value_of(name)?.to_int().ok()
    }

    pub fn integer32(&self, name: &str) -> Option<i32> {
        self.value_of(name)?.to_int().ok()
    }

    pub fn unsigned16(&self, name: &str) -> Option<u16> {
        self.value_of(name)?.to_int().ok()
    }

    pub fn unsigned32(&self, name: &str) -> Option<u32> {
        self.value_of(name)?.to_int().ok()
    }

    pub fn date(&self, name: &str) -> Option<NaiveDate> {
        self.value_of(name)?.to_date().ok()
    }

    pub fn time(&self, name: &str) -> Option<NaiveTime> {
        self.value_of(name)?.to_time().ok()
    }

    pub fn datetime(&self, name: &str) -> Option<NaiveDateTime> {
        self.value_of(name)?.to_datetime().ok()
    }
}

impl<'a, D> IntoIterator for &'a DataSet<D> {
    type Item = &'a Element;
    type IntoIter = std::slice::Iter<'a, Element>;

    fn into_iter(self) -> Self::IntoIter {
        self.elements.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dicomkit_core::Offsets;
    use matches::assert_matches;

    fn is_sorted(obj: &DataSet) -> bool {
        obj.elements().windows(2).all(|w| w[0].tag() <= w[1].tag())
    }

    fn partitions_are_consistent(obj: &DataSet) -> bool {
        let meta = obj.meta_elements().count();
        let rest = obj.dataset_elements().count();
        meta + rest == obj.len() && obj.meta_elements().all(|e| e.tag().group() == 2)
    }

    #[test]
    fn set_keeps_elements_sorted() {
        let mut obj = DataSet::new();
        obj.set("PatientName", "Doe^John").unwrap();
        obj.set("Modality", "MR").unwrap();
        obj.set("Rows", 512_u16).unwrap();
        obj.set("TransferSyntaxUID", "1.2.840.10008.1.2").unwrap();
        obj.set("0008,0016", "1.2.840.10008.5.1.4.1.1.4").unwrap();
        assert!(is_sorted(&obj));
        assert!(partitions_are_consistent(&obj));
        assert_eq!(obj.meta_elements().count(), 2);

        obj.remove_by_name("Modality").unwrap();
        assert!(is_sorted(&obj));
        assert!(partitions_are_consistent(&obj));
        assert!(obj.get(tags::MODALITY).is_none());
    }

    #[test]
    fn set_existing_checks_vr() {
        let mut obj = DataSet::new();
        obj.set("Rows", 256_u16).unwrap();
        // text on a US element
        assert_matches!(
            obj.set("Rows", "many"),
            Err(SetError::IncompatibleValue { .. })
        );
        assert_eq!(obj.unsigned16("Rows"), Some(256));
        // in range numbers are cast
        obj.set("Rows", 128_u32).unwrap();
        assert_eq!(obj.element(tags::ROWS).unwrap().vr(), VR::US);
        assert_eq!(obj.unsigned16("Rows"), Some(128));

        assert_matches!(
            obj.set("NoSuchAttribute", "x"),
            Err(SetError::UnknownAttribute { .. })
        );
    }

    #[test]
    fn transfer_syntax_follows_meta_element() {
        let mut obj = DataSet::new();
        assert_eq!(obj.encoding(), Encoding::EXPLICIT_VR_LE);
        obj.set("TransferSyntaxUID", "1.2.840.10008.1.2").unwrap();
        assert_eq!(obj.encoding(), Encoding::IMPLICIT_VR_LE);
        assert_eq!(obj.transfer_syntax().uid(), "1.2.840.10008.1.2");
        // 8 byte header + 18 bytes of padded UID
        assert_eq!(obj.group_length(), 26);
        assert_eq!(obj.unsigned32("FileMetaInformationGroupLength"), Some(26));
    }

    #[test]
    fn soft_accessors() {
        let mut obj = DataSet::new();
        obj.set("PatientName", "Doe^John").unwrap();
        obj.set("StudyDate", "20240131").unwrap();
        obj.set("StudyTime", "101530").unwrap();
        obj.set("PatientID", "12").unwrap();

        assert_eq!(obj.string("PatientName").as_deref(), Some("Doe^John"));
        assert_eq!(obj.date("StudyDate"), NaiveDate::from_ymd_opt(2024, 1, 31));
        assert_eq!(obj.time("StudyTime"), NaiveTime::from_hms_opt(10, 15, 30));
        assert_eq!(obj.integer32("PatientID"), Some(12));

        // absent or mismatched values are None
        assert_eq!(obj.string("Modality"), None);
        assert_eq!(obj.date("PatientName"), None);
        assert_eq!(obj.integer16("Nonsense"), None);
        assert_eq!(obj.datetime("AcquisitionDateTime"), None);
    }

    #[test]
    fn lookup_by_name_and_tag_text() {
        let mut obj = DataSet::new();
        obj.set("PatientID", "ABC").unwrap();
        let by_name = obj.element_by_name("PatientID").unwrap();
        let by_code = obj.element_by_name("00100020").unwrap();
        assert_eq!(by_name, by_code);
        assert_matches!(
            obj.element_by_name("PatientName"),
            Err(AccessByNameError::NoSuchDataElementAlias { .. })
        );
        assert_matches!(
            obj.element_by_name("NotAnAttribute"),
            Err(AccessByNameError::NoSuchAttributeName { .. })
        );
    }

    #[test]
    fn put_replaces() {
        let mut obj = DataSet::without_header(TransferSyntax::implicit_vr_le());
        let a = Element::create(tags::PATIENT_ID, VR::LO, Value::from("A")).unwrap();
        let b = Element::create(tags::PATIENT_ID, VR::LO, Value::from("B")).unwrap();
        assert!(obj.put(a).is_none());
        let old = obj.put(b).unwrap();
        assert_eq!(old.value().to_str().unwrap(), "A");
        assert_eq!(obj.len(), 1);
        assert_eq!(obj.string("PatientID").as_deref(), Some("B"));
    }

    #[test]
    fn new_data_set_bytes() {
        let obj = DataSet::new();
        let bytes = obj.to_bytes().unwrap();
        assert_eq!(bytes.len(), PREAMBLE_SIZE + 4 + 12);
        assert_eq!(&bytes[128..132], b"DICM");
        assert_eq!(&bytes[132..136], &[0x02, 0x00, 0x00, 0x00]);

        let headerless = DataSet::without_header(TransferSyntax::implicit_vr_le());
        assert!(headerless.to_bytes().unwrap().is_empty());
    }

    #[test]
    fn modified_elements_lose_offsets() {
        let mut obj = DataSet::without_header(TransferSyntax::implicit_vr_le());
        let elem = Element::create(tags::PATIENT_ID, VR::LO, Value::from("A"))
            .unwrap()
            .with_offsets(Offsets {
                start: 0,
                data: 8,
                end: 10,
            });
        obj.put(elem);
        obj.set("PatientID", "BB").unwrap();
        assert_eq!(obj.element(tags::PATIENT_ID).unwrap().offsets(), None);
    }
}
