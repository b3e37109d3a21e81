//! This crate reads and writes DICOM data elements
//! from and to in-memory byte buffers.
//!
//! - [`reader`] contains [`ElementReader`],
//!   which decodes one root element at a time, descending into sequences;
//! - [`sequence`] holds the algorithms for item-delimited content:
//!   defined and undefined length sequences, and pixel data fragments;
//! - [`writer`] is the mirror of the reader.
//!
//! Both sides share a [`ReadContext`],
//! which decides the encoding of each root element
//! from its position relative to the File Meta Information boundary.
pub mod reader;
pub mod sequence;
pub mod writer;

mod context;

pub use context::ReadContext;
pub use reader::{ElementReader, DEFAULT_MAX_DEPTH};
pub use writer::{write_element, write_elements};
