//! This is the core library of dicomkit,
//! containing the data types shared by the codec and the network layer:
//!
//! - [`Tag`], [`VR`] and [`Length`] in [`header`];
//! - the [`Value`] sum type in [`value`];
//! - [`Element`], [`Item`] and [`Fragment`] in [`element`];
//! - the [`DataDictionary`] service trait in [`dictionary`].
pub mod dictionary;
pub mod element;
pub mod header;
pub mod value;

pub use dictionary::{DataDictionary, DictionaryEntry, DictionaryEntryRef};
pub use element::{Element, Fragment, Item, Offsets, Parent};
pub use header::{
    DataElementHeader, HasLength, Header, Length, SequenceItemHeader, Tag, VrKind, VR,
};
pub use value::{ConvertValueError, IncompatibleValueError, Value, ValueType, C};

// re-export the byte order type used in element metadata
pub use byteordered::Endianness;
// re-export the chrono types returned by the date/time accessors
pub use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
