//! Association requester module
//!
//! The module provides an abstraction for a DICOM association
//! in which this application entity is the one requesting the association.
//! See [`ClientOptions`] for details and examples on how to create an association.
use crate::association::{
    Association, Connection, ContextIdAllocator, Event, Outcome, PresentationContextNegotiated,
    SocketOptions, State,
};
use crate::dimse::{
    decode_data_set, encode_data_set, Command, CommandField, Message, Priority,
    QueryRetrieveLevel, Status, StatusClass,
};
use crate::pdu::{
    AssociationRJ, AssociationRQ, PduFrameDecoder, PresentationContextProposed,
    UserVariableItem, DEFAULT_MAX_PDU,
};
use crate::{IMPLEMENTATION_CLASS_UID, IMPLEMENTATION_VERSION_NAME};
use dicomkit_dictionary_std::{tags, uids};
use dicomkit_object::DataSet;
use snafu::{ensure, Backtrace, OptionExt, ResultExt, Snafu};
use std::net::ToSocketAddrs;
use std::time::Duration;
use tracing::{debug, warn};

#[derive(Debug, Snafu)]
#[non_exhaustive]
pub enum Error {
    /// missing abstract syntax to begin negotiation
    MissingAbstractSyntax { backtrace: Backtrace },

    #[snafu(display("Invalid maximum PDU length"))]
    InvalidMaxPdu {
        #[snafu(backtrace)]
        source: crate::pdu::ReadError,
    },

    #[snafu(display("Association rejected: {:?}, {}", association_rj.result, association_rj.source))]
    AssociationRejected {
        association_rj: AssociationRJ,
        backtrace: Backtrace,
    },

    #[snafu(display("Association failed"))]
    Association {
        #[snafu(backtrace)]
        source: crate::association::Error,
    },

    #[snafu(display("DIMSE message error"))]
    Dimse {
        #[snafu(backtrace)]
        source: crate::dimse::Error,
    },

    #[snafu(display("Could not set attribute of query"))]
    SetAttribute {
        #[snafu(backtrace)]
        source: dicomkit_object::SetError,
    },

    #[snafu(display("No accepted presentation context for {}", sop_class_uid))]
    NoAcceptedPresentationContext {
        sop_class_uid: String,
        backtrace: Backtrace,
    },

    #[snafu(display("Data set has no {}", attribute))]
    MissingAttribute {
        attribute: &'static str,
        backtrace: Backtrace,
    },

    #[snafu(display("Expected {} but received {}", expected, got))]
    UnexpectedResponse {
        expected: CommandField,
        got: CommandField,
        backtrace: Backtrace,
    },

    #[snafu(display("Unexpected association outcome {:?}", outcome))]
    UnexpectedOutcome {
        outcome: Box<Outcome>,
        backtrace: Backtrace,
    },

    #[snafu(display("Response has no status"))]
    MissingStatus { backtrace: Backtrace },

    #[snafu(display("Query failed with status {}", status))]
    QueryFailed { status: Status, backtrace: Backtrace },
}

pub type Result<T, E = Error> = std::result::Result<T, E>;

/// A DICOM association builder for a client node.
/// The final outcome is a [`DicomClient`].
///
/// This is the standard way of requesting and establishing
/// an association with another DICOM node,
/// that one usually taking the role of a service class provider (SCP).
///
/// ## Basic usage
///
/// ```no_run
/// # use dicomkit_ul::client::ClientOptions;
/// # use dicomkit_dictionary_std::uids;
/// # fn run() -> Result<(), Box<dyn std::error::Error>> {
/// let mut client = ClientOptions::new()
///     .calling_ae_title("ECHO-SCU")
///     .with_abstract_syntax(uids::VERIFICATION)
///     .establish("129.168.0.5:104")?;
/// let status = client.echo()?;
/// client.release()?;
/// # Ok(())
/// # }
/// ```
///
/// Presentation context identifiers are taken from the options' own allocator,
/// so they are distinct within one negotiation.
#[derive(Debug)]
pub struct ClientOptions {
    calling_ae_title: String,
    called_ae_title: String,
    presentation_contexts: Vec<PresentationContextProposed>,
    context_ids: ContextIdAllocator,
    max_pdu_length: u32,
    strict: bool,
    socket: SocketOptions,
}

impl Default for ClientOptions {
    fn default() -> Self {
        ClientOptions {
            calling_ae_title: "THIS-SCU".to_string(),
            called_ae_title: "ANY-SCP".to_string(),
            presentation_contexts: Vec::new(),
            context_ids: ContextIdAllocator::new(),
            max_pdu_length: DEFAULT_MAX_PDU,
            strict: true,
            socket: SocketOptions::default(),
        }
    }
}

impl ClientOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Define the calling application entity title for the association.
    ///
    /// The default is `THIS-SCU`.
    pub fn calling_ae_title<T: Into<String>>(mut self, calling_ae_title: T) -> Self {
        self.calling_ae_title = calling_ae_title.into();
        self
    }

    /// Define the called application entity title for the association,
    /// which refers to the target DICOM node.
    ///
    /// The default is `ANY-SCP`.
    pub fn called_ae_title<T: Into<String>>(mut self, called_ae_title: T) -> Self {
        self.called_ae_title = called_ae_title.into();
        self
    }

    /// Propose a presentation context with the given transfer syntaxes,
    /// in order of preference.
    pub fn with_presentation_context<T, I>(mut self, abstract_syntax_uid: T, transfer_syntaxes: I) -> Self
    where
        T: Into<String>,
        I: IntoIterator,
        I::Item: Into<String>,
    {
        let id = self.context_ids.next_id();
        self.presentation_contexts.push(PresentationContextProposed {
            id,
            abstract_syntax: abstract_syntax_uid.into(),
            transfer_syntaxes: transfer_syntaxes.into_iter().map(Into::into).collect(),
        });
        self
    }

    /// Propose a presentation context for the given abstract syntax,
    /// with Explicit VR Little Endian and Implicit VR Little Endian.
    pub fn with_abstract_syntax<T: Into<String>>(self, abstract_syntax_uid: T) -> Self {
        self.with_presentation_context(
            abstract_syntax_uid,
            [uids::EXPLICIT_VR_LITTLE_ENDIAN, uids::IMPLICIT_VR_LITTLE_ENDIAN],
        )
    }

    /// Override the maximum PDU length
    /// that this application entity will admit.
    pub fn max_pdu_length(mut self, value: u32) -> Self {
        self.max_pdu_length = value;
        self
    }

    /// Override strict mode:
    /// whether receiving PDUs must not
    /// surpass the negotiated maximum PDU length.
    pub fn strict(mut self, strict: bool) -> Self {
        self.strict = strict;
        self
    }

    pub fn read_timeout(mut self, timeout: Duration) -> Self {
        self.socket = self.socket.read_timeout(timeout);
        self
    }

    pub fn write_timeout(mut self, timeout: Duration) -> Self {
        self.socket = self.socket.write_timeout(timeout);
        self
    }

    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.socket = self.socket.connect_timeout(timeout);
        self
    }

    pub fn socket_options(mut self, socket: SocketOptions) -> Self {
        self.socket = socket;
        self
    }

    /// Initiate the TCP connection to the given address
    /// and request a new DICOM association,
    /// negotiating the presentation contexts in the process.
    pub fn establish<A: ToSocketAddrs>(self, address: A) -> Result<DicomClient> {
        DicomClient::connect(address, self)
    }

    fn into_request(self) -> (AssociationRQ, u32, bool, SocketOptions) {
        let ClientOptions {
            calling_ae_title,
            called_ae_title,
            presentation_contexts,
            max_pdu_length,
            strict,
            socket,
            ..
        } = self;
        let request = AssociationRQ {
            protocol_version: 1,
            calling_ae_title,
            called_ae_title,
            application_context_name: uids::DICOM_APPLICATION_CONTEXT.to_string(),
            presentation_contexts,
            user_variables: vec![
                UserVariableItem::MaxLength(max_pdu_length),
                UserVariableItem::ImplementationClassUID(IMPLEMENTATION_CLASS_UID.to_string()),
                UserVariableItem::ImplementationVersionName(
                    IMPLEMENTATION_VERSION_NAME.to_string(),
                ),
            ],
        };
        (request, max_pdu_length, strict, socket)
    }
}

/// A DICOM upper level association from the perspective
/// of a requesting application entity.
///
/// The association is released when the value is dropped,
/// unless [`release`](DicomClient::release) or [`abort`](DicomClient::abort)
/// was called first.
#[derive(Debug)]
pub struct DicomClient {
    connection: Connection,
    association: Association,
    message_id: u16,
}

impl DicomClient {
    /// Connect to `address` and negotiate an association.
    ///
    /// A rejection by the peer is returned as [`Error::AssociationRejected`],
    /// carrying the result, source and reason given.
    pub fn connect<A: ToSocketAddrs>(address: A, options: ClientOptions) -> Result<Self> {
        ensure!(
            !options.presentation_contexts.is_empty(),
            MissingAbstractSyntaxSnafu
        );
        let (request, max_pdu_length, strict, socket) = options.into_request();
        let decoder =
            PduFrameDecoder::with_max_pdu_length(max_pdu_length, strict).context(InvalidMaxPduSnafu)?;
        let mut connection =
            Connection::connect(address, &socket, decoder).context(AssociationSnafu)?;
        let mut association = Association::requestor(request);

        match connection
            .run(&mut association, Event::Connect)
            .context(AssociationSnafu)?
        {
            Outcome::Accepted => {
                debug!(
                    "Association with {} established",
                    association.peer_ae_title()
                );
                Ok(DicomClient {
                    connection,
                    association,
                    message_id: 0,
                })
            }
            Outcome::Rejected(association_rj) => AssociationRejectedSnafu { association_rj }.fail(),
            outcome => UnexpectedOutcomeSnafu {
                outcome: Box::new(outcome),
            }
            .fail(),
        }
    }

    /// The underlying association state machine.
    pub fn association(&self) -> &Association {
        &self.association
    }

    /// All presentation contexts settled by negotiation, accepted or not.
    pub fn presentation_contexts(&self) -> &[PresentationContextNegotiated] {
        self.association.presentation_contexts()
    }

    /// The accepted presentation contexts for the given abstract syntax.
    pub fn accepted_presentation_contexts_for(
        &self,
        sop_class_uid: &str,
    ) -> Vec<&PresentationContextNegotiated> {
        self.association
            .accepted_presentation_contexts_for(sop_class_uid)
    }

    /// The maximum PDU length announced by the other node.
    pub fn acceptor_max_pdu_length(&self) -> u32 {
        self.association.peer_max_pdu_length()
    }

    fn next_message_id(&mut self) -> u16 {
        self.message_id = self.message_id.wrapping_add(1).max(1);
        self.message_id
    }

    fn context_for(&self, sop_class_uids: &[&str]) -> Result<PresentationContextNegotiated> {
        sop_class_uids
            .iter()
            .find_map(|uid| {
                self.association
                    .accepted_presentation_contexts_for(uid)
                    .first()
                    .map(|pc| (*pc).clone())
            })
            .context(NoAcceptedPresentationContextSnafu {
                sop_class_uid: sop_class_uids.join(", "),
            })
    }

    fn expect_message(outcome: Outcome, expected: CommandField) -> Result<Message> {
        match outcome {
            Outcome::Message(message) => {
                let got = message.command.field();
                ensure!(got == expected, UnexpectedResponseSnafu { expected, got });
                Ok(message)
            }
            outcome => UnexpectedOutcomeSnafu {
                outcome: Box::new(outcome),
            }
            .fail(),
        }
    }

    /// Send a request and wait for its first reply.
    fn request(&mut self, message: Message, expected: CommandField) -> Result<Message> {
        let outcome = self
            .connection
            .run(&mut self.association, Event::Request(message))
            .context(AssociationSnafu)?;
        Self::expect_message(outcome, expected)
    }

    /// Wait for the next reply to a request still pending.
    fn next_reply(&mut self, expected: CommandField) -> Result<Message> {
        let outcome = self
            .connection
            .wait(&mut self.association)
            .context(AssociationSnafu)?;
        Self::expect_message(outcome, expected)
    }

    /// Verify the connection to the other node with a C-ECHO.
    pub fn echo(&mut self) -> Result<Status> {
        let pc = self.context_for(&[uids::VERIFICATION])?;
        let id = self.next_message_id();
        let command = Command::echo_rq(id).context(DimseSnafu)?;
        let reply = self.request(Message::new(pc.id, command, None), CommandField::CEchoRsp)?;
        reply.command.status().context(MissingStatusSnafu)
    }

    /// Query the other node with a C-FIND at the given level,
    /// collecting the identifiers of all pending responses.
    ///
    /// The Query/Retrieve Level of `query` is set from `level`.
    pub fn find(&mut self, query: &DataSet, level: QueryRetrieveLevel) -> Result<Vec<DataSet>> {
        let models: &[&str] = match level {
            QueryRetrieveLevel::Patient => {
                &[uids::PATIENT_ROOT_QUERY_RETRIEVE_INFORMATION_MODEL_FIND]
            }
            _ => &[
                uids::STUDY_ROOT_QUERY_RETRIEVE_INFORMATION_MODEL_FIND,
                uids::PATIENT_ROOT_QUERY_RETRIEVE_INFORMATION_MODEL_FIND,
            ],
        };
        let pc = self.context_for(models)?;

        let mut identifier = query.clone();
        identifier
            .set_tag(tags::QUERY_RETRIEVE_LEVEL, level.as_str())
            .context(SetAttributeSnafu)?;
        let data = encode_data_set(&identifier, &pc.transfer_syntax).context(DimseSnafu)?;

        let id = self.next_message_id();
        let command =
            Command::find_rq(id, &pc.abstract_syntax, Priority::Medium).context(DimseSnafu)?;
        let mut reply = self.request(
            Message::new(pc.id, command, Some(data)),
            CommandField::CFindRsp,
        )?;

        let mut results = Vec::new();
        loop {
            let status = reply.command.status().context(MissingStatusSnafu)?;
            if !status.is_pending() {
                ensure!(
                    status.class() != StatusClass::Failure,
                    QueryFailedSnafu { status }
                );
                if status.class() != StatusClass::Success {
                    warn!("C-FIND ended with status {}", status);
                }
                return Ok(results);
            }
            if let Some(data) = &reply.data {
                results.push(decode_data_set(data, &pc.transfer_syntax).context(DimseSnafu)?);
            }
            reply = self.next_reply(CommandField::CFindRsp)?;
        }
    }

    /// Send each data set to the other node with a C-STORE.
    ///
    /// `progress` is called after each data set
    /// with its index and the status returned for it.
    /// The statuses are returned in order.
    pub fn store<'d, I, F>(&mut self, datasets: I, mut progress: F) -> Result<Vec<Status>>
    where
        I: IntoIterator<Item = &'d DataSet>,
        F: FnMut(usize, Status),
    {
        let mut statuses = Vec::new();
        for (i, dataset) in datasets.into_iter().enumerate() {
            let status = self.store_one(dataset)?;
            progress(i, status);
            statuses.push(status);
        }
        Ok(statuses)
    }

    fn store_one(&mut self, dataset: &DataSet) -> Result<Status> {
        let sop_class_uid = dataset
            .string("SOPClassUID")
            .or_else(|| dataset.string("MediaStorageSOPClassUID"))
            .context(MissingAttributeSnafu {
                attribute: "SOP Class UID",
            })?;
        let sop_instance_uid = dataset
            .string("SOPInstanceUID")
            .or_else(|| dataset.string("MediaStorageSOPInstanceUID"))
            .context(MissingAttributeSnafu {
                attribute: "SOP Instance UID",
            })?;
        let pc = self.context_for(&[sop_class_uid.as_str()])?;
        let data = encode_data_set(dataset, &pc.transfer_syntax).context(DimseSnafu)?;

        let id = self.next_message_id();
        let command = Command::store_rq(id, &sop_class_uid, &sop_instance_uid, Priority::Medium)
            .context(DimseSnafu)?;
        let reply = self.request(
            Message::new(pc.id, command, Some(data)),
            CommandField::CStoreRsp,
        )?;
        let status = reply.command.status().context(MissingStatusSnafu)?;
        debug!("Stored {}: {}", sop_instance_uid, status);
        Ok(status)
    }

    /// Gracefully release the association with the other node.
    pub fn release(mut self) -> Result<()> {
        self.release_impl()
    }

    /// Abort the association without waiting for the other node.
    pub fn abort(mut self) -> Result<()> {
        self.connection
            .step(&mut self.association, Event::Abort)
            .context(AssociationSnafu)?;
        Ok(())
    }

    fn release_impl(&mut self) -> Result<()> {
        if self.association.state() != State::Established {
            return Ok(());
        }
        match self
            .connection
            .run(&mut self.association, Event::Release)
            .context(AssociationSnafu)?
        {
            Outcome::Released => Ok(()),
            outcome => UnexpectedOutcomeSnafu {
                outcome: Box::new(outcome),
            }
            .fail(),
        }
    }
}

impl Drop for DicomClient {
    fn drop(&mut self) {
        let _ = self.release_impl();
        self.connection.close();
    }
}
