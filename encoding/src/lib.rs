//! DICOM encoding and decoding primitives.
//!
//! This crate provides the byte-level building blocks
//! used by the data set parser and writer:
//!
//! - [`tag`]: the 4-byte attribute tag codec;
//! - [`decode`] and [`encode`]: data element and item headers
//!   under explicit or implicit VR, in either byte order;
//! - [`primitive`]: conversion between raw value bytes and [`Value`];
//! - [`transfer_syntax`]: mapping a transfer syntax UID
//!   to its VR dialect and byte order.
//!
//! All functions work on in-memory byte slices with an explicit position,
//! so that callers can keep track of element offsets.
//!
//! [`Value`]: dicomkit_core::Value

pub mod decode;
pub mod encode;
pub mod primitive;
pub mod tag;
pub mod transfer_syntax;

pub use byteordered::Endianness;
pub use decode::{decode_header, decode_item_header};
pub use encode::{encode_header, encode_item_header};
pub use tag::{decode_tag, encode_tag};
pub use transfer_syntax::{Encoding, TransferSyntax, VrDialect};
