//! This crate contains the types and methods needed to interact
//! with DICOM nodes through the upper layer protocol.
//!
//! - The [`pdu`] module
//!   provides data structures representing _protocol data units_,
//!   their binary codec,
//!   and a frame decoder cutting an inbound byte stream into PDUs.
//! - The [`association`] module
//!   holds the association state machine,
//!   presentation context negotiation,
//!   and the driver running associations over TCP.
//! - The [`dimse`] module
//!   encodes, decodes and reassembles DIMSE messages
//!   (C-ECHO, C-FIND, C-STORE, C-MOVE, C-GET, C-CANCEL).
//! - The [`client`] and [`server`] modules
//!   build service class users and providers on top of the above.
//!
//! ## Features
//! * `async`: Enables `DicomServer::run_async`,
//!   accepting connections from a tokio listener.

pub mod association;
pub mod client;
pub mod dimse;
pub mod pdu;
pub mod server;

/// The current implementation class UID generically referring to dicomkit.
///
/// Automatically generated as per the standard, part 5, section B.2.
///
/// This UID may change in future versions,
/// even between patch versions.
pub const IMPLEMENTATION_CLASS_UID: &str = "2.25.262113928047158135402119587233402712517";

/// The current implementation version name generically referring to dicomkit.
///
/// This name may change in future versions,
/// even between patch versions.
pub const IMPLEMENTATION_VERSION_NAME: &str = "DICOMKIT 0.1.0";

// re-exports

pub use association::{Association, ContextIdAllocator};
pub use client::{ClientOptions, DicomClient};
pub use pdu::{read_pdu, write_pdu, Pdu, PduFrameDecoder};
pub use server::{DicomServer, ServerOptions, ServiceProvider};
