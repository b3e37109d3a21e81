//! This crate contains a high-level abstraction for reading and manipulating
//! DICOM objects held in memory.
//!
//! A [`DataSet`] is an ordered collection of data elements,
//! split into the File Meta Information group (group 0002)
//! and the rest of the data set.
//! It remembers the layout it was read with,
//! so that an unmodified object is written back byte for byte.
//!
//! Loading a DICOM file can be done with [`open_file`].
//! For additional reading options, use [`ReadOptions`].
//!
//! ```no_run
//! use dicomkit_object::open_file;
//! # fn foo() -> Result<(), Box<dyn std::error::Error>> {
//! let obj = open_file("0001.dcm")?;
//! let patient_name = obj.element_by_name("PatientName")?.value().to_str()?;
//! let rows = obj.unsigned16("Rows");
//! # Ok(())
//! # }
//! ```
//!
//! Objects can be modified in place and written back:
//!
//! ```no_run
//! # use dicomkit_object::DataSet;
//! # fn something(mut obj: DataSet) -> Result<(), Box<dyn std::error::Error>> {
//! obj.set("PatientName", "Doe^John")?;
//! obj.remove_by_name("PatientBirthDate")?;
//! obj.write_file("0001_new.dcm")?;
//! # Ok(())
//! # }
//! ```
pub mod dump;
pub mod file;
pub mod json;
pub mod mem;

pub use dicomkit_core::{Element, Item, Tag, Value, VR};
pub use dicomkit_dictionary_std::StandardDataDictionary;
pub use dicomkit_encoding::TransferSyntax;
pub use file::{open_file, ReadOptions};
pub use mem::DataSet;

use dicomkit_core::IncompatibleValueError;
use snafu::{Backtrace, Snafu};

/// An error which may occur when loading a DICOM object
#[derive(Debug, Snafu)]
#[non_exhaustive]
pub enum ReadError {
    #[snafu(display("Could not open file '{}'", filename.display()))]
    OpenFile {
        filename: std::path::PathBuf,
        backtrace: Backtrace,
        source: std::io::Error,
    },
    /// the 4 bytes after the preamble are not "DICM"
    #[snafu(display("Missing DICM magic code"))]
    MissingMagic { backtrace: Backtrace },
    #[snafu(display("Could not parse data set"))]
    ParseDataSet {
        #[snafu(backtrace)]
        source: dicomkit_parser::reader::Error,
    },
    #[snafu(display("Unsupported transfer syntax `{}`", uid))]
    UnsupportedTransferSyntax { uid: String, backtrace: Backtrace },
    #[snafu(display("Unsupported SOP class `{}`", uid))]
    UnsupportedSOPClass { uid: String, backtrace: Backtrace },
}

impl ReadError {
    /// Whether the data ended before the data set was complete.
    pub fn is_truncated(&self) -> bool {
        match self {
            ReadError::ParseDataSet { source } => source.is_truncated(),
            _ => false,
        }
    }
}

/// An error which may occur when writing a DICOM object
#[derive(Debug, Snafu)]
#[non_exhaustive]
pub enum WriteError {
    #[snafu(display("Could not write to file '{}'", filename.display()))]
    WriteFile {
        filename: std::path::PathBuf,
        backtrace: Backtrace,
        source: std::io::Error,
    },
    #[snafu(display("Could not print data set"))]
    PrintDataSet {
        #[snafu(backtrace)]
        source: dicomkit_parser::writer::Error,
    },
    #[snafu(display("Could not change transfer syntax"))]
    ChangeTransferSyntax {
        #[snafu(backtrace)]
        source: SetError,
    },
}

/// An error which may occur when looking up a DICOM object's attributes.
#[derive(Debug, Snafu)]
#[non_exhaustive]
pub enum AccessError {
    #[snafu(display("No such data element with tag {}", tag))]
    NoSuchDataElementTag { tag: Tag, backtrace: Backtrace },
}

/// An error which may occur when looking up an attribute by name.
#[derive(Debug, Snafu)]
#[non_exhaustive]
pub enum AccessByNameError {
    #[snafu(display("No such data element {} (with tag {})", alias, tag))]
    NoSuchDataElementAlias {
        tag: Tag,
        alias: String,
        backtrace: Backtrace,
    },
    #[snafu(display("Unknown data attribute named `{}`", name))]
    NoSuchAttributeName { name: String, backtrace: Backtrace },
}

/// An error which may occur when setting an attribute.
#[derive(Debug, Snafu)]
#[non_exhaustive]
pub enum SetError {
    #[snafu(display("Unknown data attribute named `{}`", name))]
    UnknownAttribute { name: String, backtrace: Backtrace },
    #[snafu(display("Could not set value of element {}", tag))]
    IncompatibleValue {
        tag: Tag,
        source: IncompatibleValueError,
        backtrace: Backtrace,
    },
}

pub type Result<T, E = ReadError> = std::result::Result<T, E>;
