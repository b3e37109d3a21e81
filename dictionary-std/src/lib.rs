//! This crate implements the standard DICOM dictionary used by dicomkit.
//!
//! - [`data_element`] holds the run-time dictionary of attributes,
//!   provided as a singleton behind the unit type [`StandardDataDictionary`].
//!   It also answers whether a transfer syntax or SOP class is supported.
//! - [`tags`] maps attribute aliases to DICOM tags at compile time.
//! - [`uids`] declares the normative unique identifiers in use.
//!
//! The table is curated: it covers the command and file meta groups
//! and the attributes commonly found in patient, study, series and image
//! modules. Unknown attributes resolve to the VR `UN`.
pub mod data_element;
pub mod tags;
pub mod uids;

pub use data_element::{registry, StandardDataDictionary, StandardDataDictionaryRegistry};
