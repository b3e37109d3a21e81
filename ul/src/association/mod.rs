//! DICOM association module
//!
//! An association is driven by a state machine ([`Association`])
//! which consumes [events](Event) and tells the caller
//! which [actions](Action) to carry out:
//! PDUs to send, completions to deliver, and when to close the transport.
//! The machine performs no I/O of its own.
//! [`Connection`] runs it over a blocking TCP stream.
//!
//! Presentation context identifiers for new negotiations
//! come from a [`ContextIdAllocator`].
pub mod context;
pub mod machine;
pub mod transport;

pub use context::{check_transfer_syntax, ContextIdAllocator, PresentationContextNegotiated};
pub use machine::{AcceptorPolicy, Action, Association, Event, Outcome, Role, State};
pub use transport::{Connection, SocketOptions, Step};

use crate::pdu::{AbortRQSource, Pdu};
use snafu::{Backtrace, Snafu};

#[derive(Debug, Snafu)]
#[non_exhaustive]
#[snafu(visibility(pub(crate)))]
pub enum Error {
    /// the connection was closed before the pending request completed
    #[snafu(display("Connection closed"))]
    ConnectionClosed { backtrace: Backtrace },

    #[snafu(display("Transport error"))]
    TransportError {
        source: std::io::Error,
        backtrace: Backtrace,
    },

    #[snafu(display("Could not connect to peer"))]
    Connect {
        source: std::io::Error,
        backtrace: Backtrace,
    },

    #[snafu(display("Could not configure socket"))]
    ConfigureSocket {
        source: std::io::Error,
        backtrace: Backtrace,
    },

    #[snafu(display("Association aborted ({:?})", abort_source))]
    Aborted {
        abort_source: AbortRQSource,
        backtrace: Backtrace,
    },

    #[snafu(display("Unexpected PDU {} in state {:?}", pdu.short_description(), state))]
    UnexpectedPdu {
        pdu: Box<Pdu>,
        state: State,
        backtrace: Backtrace,
    },

    #[snafu(display("Could not decode incoming PDU"))]
    DecodePdu {
        #[snafu(backtrace)]
        source: crate::pdu::ReadError,
    },

    #[snafu(display("Could not encode outgoing PDU"))]
    EncodePdu {
        #[snafu(backtrace)]
        source: crate::pdu::WriteError,
    },

    #[snafu(display("DIMSE message error"))]
    Dimse {
        #[snafu(backtrace)]
        source: crate::dimse::Error,
    },

    #[snafu(display("Cannot {} in state {:?}", event, state))]
    InvalidState {
        state: State,
        event: &'static str,
        backtrace: Backtrace,
    },

    /// only one request may be awaiting replies at a time
    #[snafu(display("Another request is still pending"))]
    RequestPending { backtrace: Backtrace },

    #[snafu(display("Presentation context {} was not accepted", id))]
    UnknownPresentationContext { id: u8, backtrace: Backtrace },
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
