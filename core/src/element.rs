//! Data elements, sequence items and pixel data fragments.
//!
//! Ownership flows downwards:
//! a sequence element owns its items and each item owns its child elements.
//! Children keep a [`Parent`] identifier of their enclosing container,
//! which is only useful for lookups and never keeps anything alive.

use crate::header::{DataElementHeader, HasLength, Header, Length, Tag, VR};
use crate::value::{IncompatibleValueError, Value};
use byteordered::Endianness;
use std::fmt;

/// Byte offsets of an element or item in the buffer it was read from.
///
/// `data - start` is the header size,
/// and `end - data` is the value length once delimiters are accounted for.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub struct Offsets {
    /// position of the first byte of the tag
    pub start: usize,
    /// position of the first byte of the value
    pub data: usize,
    /// position right after the value (and its delimiters, if any)
    pub end: usize,
}

/// A non-owning reference to the item enclosing an element:
/// the tag of the sequence and the index of the item in it.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub struct Parent {
    pub sequence: Tag,
    pub item: usize,
}

/// A DICOM data element.
#[derive(Debug, Clone, PartialEq)]
pub struct Element {
    header: DataElementHeader,
    byte_order: Endianness,
    offsets: Option<Offsets>,
    value: Value,
    parent: Option<Parent>,
}

impl HasLength for Element {
    #[inline]
    fn length(&self) -> Length {
        self.header.length()
    }
}

impl Header for Element {
    #[inline]
    fn tag(&self) -> Tag {
        self.header.tag()
    }
}

impl Element {
    /// Create an element as decoded from a byte source.
    /// The value is taken as is.
    pub fn new(header: DataElementHeader, byte_order: Endianness, value: Value) -> Self {
        Element {
            header,
            byte_order,
            offsets: None,
            value,
            parent: None,
        }
    }

    /// Create a new element with the given value,
    /// adapted to the VR and with its length computed.
    pub fn create<T: Into<Tag>>(tag: T, vr: VR, value: Value) -> Result<Self, IncompatibleValueError> {
        let mut elem = Element::new(
            DataElementHeader::new(tag, vr, Length(0)),
            Endianness::Little,
            Value::Empty,
        );
        elem.set_value(value)?;
        Ok(elem)
    }

    /// Attach the offsets at which this element was found.
    pub fn with_offsets(mut self, offsets: Offsets) -> Self {
        self.offsets = Some(offsets);
        self
    }

    /// Attach a reference to the enclosing item.
    pub fn with_parent(mut self, parent: Parent) -> Self {
        self.parent = Some(parent);
        self
    }

    pub fn header(&self) -> &DataElementHeader {
        &self.header
    }

    pub fn vr(&self) -> VR {
        self.header.vr
    }

    pub fn byte_order(&self) -> Endianness {
        self.byte_order
    }

    pub fn set_byte_order(&mut self, byte_order: Endianness) {
        self.byte_order = byte_order;
    }

    /// Byte offsets in the source buffer.
    /// Elements created or modified in memory have none.
    pub fn offsets(&self) -> Option<Offsets> {
        self.offsets
    }

    pub fn parent(&self) -> Option<Parent> {
        self.parent
    }

    pub fn value(&self) -> &Value {
        &self.value
    }

    pub fn value_mut(&mut self) -> &mut Value {
        &mut self.value
    }

    pub fn into_value(self) -> Value {
        self.value
    }

    /// Replace the value, checking it against the element's VR.
    ///
    /// The length is recomputed and the source offsets are forgotten,
    /// since they no longer describe this element.
    pub fn set_value(&mut self, value: Value) -> Result<(), IncompatibleValueError> {
        let value = value.coerce(self.header.vr)?;
        self.header.len = match (&value, value.byte_len()) {
            (_, Some(len)) => Length(len as u32),
            (Value::PixelSequence(_), None) => Length::UNDEFINED,
            (_, None) if self.header.len.is_undefined() => Length::UNDEFINED,
            // computed when the sequence is written
            (_, None) => Length(0),
        };
        self.value = value;
        self.offsets = None;
        Ok(())
    }

    /// The items of a sequence element.
    pub fn items(&self) -> Option<&[Item]> {
        self.value.items()
    }

    /// The fragments of an encapsulated pixel data element.
    pub fn fragments(&self) -> Option<&[Fragment]> {
        self.value.fragments()
    }
}

impl fmt::Display for Element {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "{} {} {} [{}]",
            self.tag(),
            self.vr(),
            self.length(),
            self.value
        )
    }
}

/// An item of a data sequence.
#[derive(Debug, Clone, PartialEq)]
pub struct Item {
    length: Length,
    offsets: Option<Offsets>,
    elements: Vec<Element>,
    sequence: Option<Tag>,
}

impl HasLength for Item {
    #[inline]
    fn length(&self) -> Length {
        self.length
    }
}

impl Item {
    /// Create an item with the elements given,
    /// to be written with an undefined length.
    pub fn new(mut elements: Vec<Element>) -> Self {
        elements.sort_by_key(|e| e.tag());
        Item {
            length: Length::UNDEFINED,
            offsets: None,
            elements,
            sequence: None,
        }
    }

    /// Create an item as decoded from a byte source.
    pub fn decoded(length: Length, offsets: Offsets, elements: Vec<Element>, sequence: Tag) -> Self {
        Item {
            length,
            offsets: Some(offsets),
            elements,
            sequence: Some(sequence),
        }
    }

    pub fn offsets(&self) -> Option<Offsets> {
        self.offsets
    }

    /// The tag of the sequence containing this item, if known.
    pub fn sequence(&self) -> Option<Tag> {
        self.sequence
    }

    pub fn elements(&self) -> &[Element] {
        &self.elements
    }

    /// Look up a child element by tag.
    pub fn element(&self, tag: Tag) -> Option<&Element> {
        self.elements
            .binary_search_by_key(&tag, |e| e.tag())
            .ok()
            .map(|i| &self.elements[i])
    }

    pub fn into_elements(self) -> Vec<Element> {
        self.elements
    }
}

/// A fragment of encapsulated pixel data:
/// an opaque blob, usually part of a compressed frame.
#[derive(Debug, Clone, PartialEq)]
pub struct Fragment {
    offsets: Option<Offsets>,
    data: Vec<u8>,
}

impl HasLength for Fragment {
    #[inline]
    fn length(&self) -> Length {
        Length(self.data.len() as u32)
    }
}

impl Fragment {
    pub fn new(data: Vec<u8>) -> Self {
        Fragment {
            offsets: None,
            data,
        }
    }

    pub fn decoded(offsets: Offsets, data: Vec<u8>) -> Self {
        Fragment {
            offsets: Some(offsets),
            data,
        }
    }

    pub fn offsets(&self) -> Option<Offsets> {
        self.offsets
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn set_value_recomputes_length() {
        let mut e = Element::create(Tag(0x0010, 0x0010), VR::PN, Value::from("Doe^John"))
            .unwrap()
            .with_offsets(Offsets {
                start: 0,
                data: 8,
                end: 16,
            });
        assert_eq!(e.length(), Length(8));

        e.set_value(Value::from("Doe^Jane^X")).unwrap();
        assert_eq!(e.length(), Length(10));
        assert_eq!(e.offsets(), None);

        assert!(e.set_value(Value::from(vec![1_u8, 2, 3])).is_err());
    }

    #[test]
    fn item_lookup_is_sorted() {
        let item = Item::new(vec![
            Element::create(Tag(0x0010, 0x0020), VR::LO, Value::from("ID")).unwrap(),
            Element::create(Tag(0x0008, 0x0100), VR::SH, Value::from("T-D1100")).unwrap(),
        ]);
        assert_eq!(item.elements()[0].tag(), Tag(0x0008, 0x0100));
        assert!(item.element(Tag(0x0010, 0x0020)).is_some());
        assert!(item.element(Tag(0x0010, 0x0010)).is_none());
        assert!(item.length().is_undefined());
    }
}
