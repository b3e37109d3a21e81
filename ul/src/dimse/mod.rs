//! DICOM Message Service Element (DIMSE) module
//!
//! DIMSE messages travel over an established association
//! as a command set, optionally followed by a data set,
//! each split into presentation data value (PDV) fragments.
//! This module encodes and decodes command sets,
//! reassembles messages out of PDVs,
//! and fragments outgoing messages into P-DATA-TF PDUs.
pub mod command;
pub mod message;

pub use command::{
    Command, CommandField, Priority, QueryRetrieveLevel, Status, StatusClass, SubOperations,
};
pub use message::{decode_data_set, dispatch_command, encode_data_set, Message, MessageAssembler};

use snafu::{Backtrace, Snafu};

#[derive(Debug, Snafu)]
#[non_exhaustive]
pub enum Error {
    /// the command field holds an operation this implementation does not know
    #[snafu(display("Unrecognized DIMSE command field {:#06x}", command_field))]
    UnrecognizedDIMSECommand {
        command_field: u16,
        backtrace: Backtrace,
    },

    #[snafu(display("Command set has no Command Field"))]
    MissingCommandField { backtrace: Backtrace },

    #[snafu(display("Could not decode command set"))]
    DecodeCommand {
        #[snafu(backtrace)]
        source: dicomkit_object::ReadError,
    },

    #[snafu(display("Could not encode command set"))]
    EncodeCommand {
        #[snafu(backtrace)]
        source: dicomkit_object::WriteError,
    },

    #[snafu(display("Could not decode data set in {}", transfer_syntax))]
    DecodeDataSet {
        transfer_syntax: String,
        #[snafu(backtrace)]
        source: dicomkit_object::ReadError,
    },

    #[snafu(display("Could not encode data set in {}", transfer_syntax))]
    EncodeDataSet {
        transfer_syntax: String,
        #[snafu(backtrace)]
        source: dicomkit_object::WriteError,
    },

    #[snafu(display("Could not set command attribute"))]
    SetAttribute {
        #[snafu(backtrace)]
        source: dicomkit_object::SetError,
    },

    #[snafu(display("Unexpected {} fragment", kind))]
    UnexpectedFragment {
        kind: &'static str,
        backtrace: Backtrace,
    },

    #[snafu(display(
        "Fragment for presentation context {} while assembling a message for context {}",
        got,
        expected
    ))]
    PresentationContextMismatch {
        expected: u8,
        got: u8,
        backtrace: Backtrace,
    },

    #[snafu(display("P-DATA-TF PDU too short ({} bytes)", length))]
    ShortPData { length: usize, backtrace: Backtrace },

    #[snafu(display("Not a P-DATA-TF PDU (type {:#04x})", pdu_type))]
    NotPData { pdu_type: u8, backtrace: Backtrace },
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
