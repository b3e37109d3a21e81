//! Association acceptor module
//!
//! A [`DicomServer`] listens for association requests
//! and serves each accepted connection on its own thread
//! (or blocking task, see [`DicomServer::run_async`]).
//! What the server does with the messages it receives
//! is up to a [`ServiceProvider`].
use crate::association::{
    AcceptorPolicy, Association, Connection, Event, PresentationContextNegotiated, SocketOptions,
};
use crate::dimse::{
    decode_data_set, encode_data_set, Command, CommandField, Message, QueryRetrieveLevel, Status,
    SubOperations,
};
use crate::pdu::{PduFrameDecoder, DEFAULT_MAX_PDU};
use dicomkit_dictionary_std::uids;
use dicomkit_object::DataSet;
use snafu::{Backtrace, ResultExt, Snafu};
use std::net::{TcpListener, TcpStream, ToSocketAddrs};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

#[derive(Debug, Snafu)]
#[non_exhaustive]
pub enum Error {
    #[snafu(display("Could not bind listener"))]
    Bind {
        source: std::io::Error,
        backtrace: Backtrace,
    },

    #[snafu(display("Could not read listener address"))]
    LocalAddr {
        source: std::io::Error,
        backtrace: Backtrace,
    },

    #[snafu(display("Invalid maximum PDU length"))]
    InvalidMaxPdu {
        #[snafu(backtrace)]
        source: crate::pdu::ReadError,
    },

    #[snafu(display("Association failed"))]
    Association {
        #[snafu(backtrace)]
        source: crate::association::Error,
    },

    #[snafu(display("Could not build response"))]
    Dimse {
        #[snafu(backtrace)]
        source: crate::dimse::Error,
    },

    #[cfg(feature = "async")]
    #[snafu(display("Could not accept connection"))]
    Accept {
        source: std::io::Error,
        backtrace: Backtrace,
    },
}

pub type Result<T, E = Error> = std::result::Result<T, E>;

/// What was received alongside a C-STORE data set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreMeta {
    pub calling_ae_title: String,
    pub sop_class_uid: String,
    pub sop_instance_uid: String,
    /// the transfer syntax the data set was sent in
    pub transfer_syntax: String,
}

/// The services offered by a [`DicomServer`].
///
/// Each method has a default:
/// echoes succeed, queries match nothing, and nothing is stored.
pub trait ServiceProvider: Send + Sync + 'static {
    /// The status to answer a C-ECHO from `calling_ae_title` with.
    fn validate_echo(&self, calling_ae_title: &str) -> Status {
        let _ = calling_ae_title;
        Status::SUCCESS
    }

    /// The data sets matching a C-FIND identifier at the given level.
    fn query(&self, level: QueryRetrieveLevel, identifier: &DataSet) -> Vec<DataSet> {
        let _ = (level, identifier);
        Vec::new()
    }

    /// Keep a received data set, returning whether it was stored.
    fn store(&self, meta: &StoreMeta, dataset: DataSet) -> bool {
        let _ = (meta, dataset);
        false
    }
}

/// Options for a [`DicomServer`].
///
/// No abstract syntax is accepted unless added with
/// [`with_abstract_syntax`](ServerOptions::with_abstract_syntax)
/// or [`promiscuous`](ServerOptions::promiscuous) is set.
#[derive(Debug, Clone)]
#[non_exhaustive]
pub struct ServerOptions {
    pub ae_title: String,
    pub accept_any_called_ae_title: bool,
    pub abstract_syntaxes: Vec<String>,
    pub transfer_syntaxes: Vec<String>,
    pub promiscuous: bool,
    pub max_pdu_length: u32,
    pub strict: bool,
    pub socket: SocketOptions,
}

impl Default for ServerOptions {
    fn default() -> Self {
        ServerOptions {
            ae_title: "THIS-SCP".to_string(),
            accept_any_called_ae_title: false,
            abstract_syntaxes: Vec::new(),
            transfer_syntaxes: Vec::new(),
            promiscuous: false,
            max_pdu_length: DEFAULT_MAX_PDU,
            strict: true,
            socket: SocketOptions::default(),
        }
    }
}

impl ServerOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Define the application entity title of this node.
    ///
    /// The default is `THIS-SCP`.
    pub fn ae_title<T: Into<String>>(mut self, ae_title: T) -> Self {
        self.ae_title = ae_title.into();
        self
    }

    /// Accept association requests whatever AE title they call.
    pub fn accept_any_called_ae_title(mut self, accept: bool) -> Self {
        self.accept_any_called_ae_title = accept;
        self
    }

    /// Include this abstract syntax
    /// in the list of proposed presentation contexts to accept.
    pub fn with_abstract_syntax<T: Into<String>>(mut self, abstract_syntax_uid: T) -> Self {
        self.abstract_syntaxes.push(abstract_syntax_uid.into());
        self
    }

    /// Restrict the transfer syntaxes to accept.
    /// If none is given, any supported transfer syntax is accepted.
    pub fn with_transfer_syntax<T: Into<String>>(mut self, transfer_syntax_uid: T) -> Self {
        self.transfer_syntaxes.push(transfer_syntax_uid.into());
        self
    }

    /// Accept any abstract syntax proposed.
    pub fn promiscuous(mut self, promiscuous: bool) -> Self {
        self.promiscuous = promiscuous;
        self
    }

    pub fn max_pdu_length(mut self, value: u32) -> Self {
        self.max_pdu_length = value;
        self
    }

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

    fn policy(&self) -> AcceptorPolicy {
        AcceptorPolicy {
            ae_title: self.ae_title.clone(),
            accept_any_called_ae_title: self.accept_any_called_ae_title,
            abstract_syntaxes: self.abstract_syntaxes.clone(),
            transfer_syntaxes: self.transfer_syntaxes.clone(),
            promiscuous: self.promiscuous,
            max_pdu_length: self.max_pdu_length,
        }
    }
}

/// A DICOM node accepting associations.
#[derive(Debug)]
pub struct DicomServer<P> {
    options: Arc<ServerOptions>,
    provider: Arc<P>,
}

impl<P> Clone for DicomServer<P> {
    fn clone(&self) -> Self {
        DicomServer {
            options: Arc::clone(&self.options),
            provider: Arc::clone(&self.provider),
        }
    }
}

impl<P> DicomServer<P>
where
    P: ServiceProvider,
{
    pub fn new(options: ServerOptions, provider: P) -> Self {
        DicomServer {
            options: Arc::new(options),
            provider: Arc::new(provider),
        }
    }

    pub fn options(&self) -> &ServerOptions {
        &self.options
    }

    /// Bind a listener to `address`.
    pub fn bind<A: ToSocketAddrs>(&self, address: A) -> Result<TcpListener> {
        let listener = TcpListener::bind(address).context(BindSnafu)?;
        info!(
            "{} listening on {}",
            self.options.ae_title,
            listener.local_addr().context(LocalAddrSnafu)?
        );
        Ok(listener)
    }

    /// Bind to `address` and serve connections until the listener fails.
    pub fn run<A: ToSocketAddrs>(&self, address: A) -> Result<()> {
        let listener = self.bind(address)?;
        self.serve(listener)
    }

    /// Serve the connections coming to `listener`,
    /// each on its own thread.
    pub fn serve(&self, listener: TcpListener) -> Result<()> {
        for stream in listener.incoming() {
            match stream {
                Ok(stream) => {
                    let server = self.clone();
                    std::thread::spawn(move || {
                        if let Err(e) = server.serve_connection(stream) {
                            warn!("Connection failed: {}", snafu::Report::from_error(e));
                        }
                    });
                }
                Err(e) => warn!("Could not accept connection: {}", e),
            }
        }
        Ok(())
    }

    /// Serve connections accepted by a tokio listener,
    /// each on a blocking task.
    #[cfg(feature = "async")]
    pub async fn run_async(&self, listener: tokio::net::TcpListener) -> Result<()> {
        loop {
            let (stream, peer) = listener.accept().await.context(AcceptSnafu)?;
            debug!("Accepted connection from {}", peer);
            let server = self.clone();
            tokio::task::spawn_blocking(move || {
                let stream = match stream.into_std().and_then(|s| {
                    s.set_nonblocking(false)?;
                    Ok(s)
                }) {
                    Ok(stream) => stream,
                    Err(e) => {
                        warn!("Could not take over connection: {}", e);
                        return;
                    }
                };
                if let Err(e) = server.serve_connection(stream) {
                    warn!("Connection failed: {}", snafu::Report::from_error(e));
                }
            });
        }
    }

    /// Run one association over an accepted stream until it ends.
    pub fn serve_connection(&self, stream: TcpStream) -> Result<()> {
        let peer = stream.peer_addr().ok();
        let decoder =
            PduFrameDecoder::with_max_pdu_length(self.options.max_pdu_length, self.options.strict)
                .context(InvalidMaxPduSnafu)?;
        let mut connection =
            Connection::from_stream(stream, &self.options.socket, decoder).context(AssociationSnafu)?;
        let mut association = Association::acceptor(self.options.policy());

        let mut event = connection.next_event();
        loop {
            let step = connection
                .step(&mut association, event)
                .context(AssociationSnafu)?;
            for message in step.indications {
                for reply in self.respond(&association, message)? {
                    connection
                        .step(&mut association, Event::Send(reply))
                        .context(AssociationSnafu)?;
                }
            }
            if association.state().is_terminal() {
                break;
            }
            event = connection.next_event();
        }
        debug!(
            "Association with {} ({}) ended in state {:?}",
            association.peer_ae_title(),
            peer.map(|p| p.to_string()).unwrap_or_default(),
            association.state()
        );
        Ok(())
    }

    /// The messages answering one indication.
    fn respond(&self, association: &Association, message: Message) -> Result<Vec<Message>> {
        let pc = match association
            .presentation_contexts()
            .iter()
            .find(|pc| pc.id == message.presentation_context_id && pc.is_accepted())
        {
            Some(pc) => pc.clone(),
            None => {
                warn!(
                    "Message on unknown presentation context {}",
                    message.presentation_context_id
                );
                return Ok(Vec::new());
            }
        };
        let command = &message.command;
        let id = command.message_id().unwrap_or_default();
        let sop_class_uid = command
            .affected_sop_class_uid()
            .unwrap_or_else(|| pc.abstract_syntax.clone());

        let replies = match command.field() {
            CommandField::CEchoRq => {
                let status = self.provider.validate_echo(association.peer_ae_title());
                let rsp = Command::echo_rsp(id, status).context(DimseSnafu)?;
                vec![Message::new(pc.id, rsp, None)]
            }
            CommandField::CFindRq => self.respond_find(&pc, id, &sop_class_uid, message.data)?,
            CommandField::CStoreRq => {
                let status = self.store(association, &pc, command, message.data);
                let sop_instance_uid = command.affected_sop_instance_uid().unwrap_or_default();
                let rsp = Command::store_rsp(id, &sop_class_uid, &sop_instance_uid, status)
                    .context(DimseSnafu)?;
                vec![Message::new(pc.id, rsp, None)]
            }
            CommandField::CMoveRq => {
                let rsp = Command::move_rsp(
                    id,
                    &sop_class_uid,
                    Status::SOP_CLASS_NOT_SUPPORTED,
                    SubOperations::default(),
                )
                .context(DimseSnafu)?;
                vec![Message::new(pc.id, rsp, None)]
            }
            CommandField::CGetRq => {
                let rsp = Command::get_rsp(
                    id,
                    &sop_class_uid,
                    Status::SOP_CLASS_NOT_SUPPORTED,
                    SubOperations::default(),
                )
                .context(DimseSnafu)?;
                vec![Message::new(pc.id, rsp, None)]
            }
            CommandField::CCancelRq => {
                debug!("C-CANCEL received after the operation completed");
                Vec::new()
            }
            field => {
                warn!("Ignoring {} from {}", field, association.peer_ae_title());
                Vec::new()
            }
        };
        Ok(replies)
    }

    fn respond_find(
        &self,
        pc: &PresentationContextNegotiated,
        id: u16,
        sop_class_uid: &str,
        data: Option<Vec<u8>>,
    ) -> Result<Vec<Message>> {
        let identifier = data
            .as_deref()
            .map(|bytes| decode_data_set(bytes, &pc.transfer_syntax));
        let identifier = match identifier {
            Some(Ok(identifier)) => identifier,
            Some(Err(e)) => {
                warn!("Bad C-FIND identifier: {}", e);
                let rsp = Command::find_rsp(id, sop_class_uid, Status::UNABLE_TO_PROCESS)
                    .context(DimseSnafu)?;
                return Ok(vec![Message::new(pc.id, rsp, None)]);
            }
            None => DataSet::without_header(dicomkit_object::TransferSyntax::from_uid(
                &pc.transfer_syntax,
            )),
        };

        let level = identifier
            .string("QueryRetrieveLevel")
            .and_then(|level| QueryRetrieveLevel::from_str(&level));
        let level = match level {
            Some(level) => level,
            None => {
                warn!("C-FIND without a valid Query/Retrieve Level");
                let rsp = Command::find_rsp(id, sop_class_uid, Status::UNABLE_TO_PROCESS)
                    .context(DimseSnafu)?;
                return Ok(vec![Message::new(pc.id, rsp, None)]);
            }
        };

        let mut replies = Vec::new();
        for matched in self.provider.query(level, &identifier) {
            let data = encode_data_set(&matched, &pc.transfer_syntax).context(DimseSnafu)?;
            let rsp = Command::find_rsp(id, sop_class_uid, Status::PENDING).context(DimseSnafu)?;
            replies.push(Message::new(pc.id, rsp, Some(data)));
        }
        let rsp = Command::find_rsp(id, sop_class_uid, Status::SUCCESS).context(DimseSnafu)?;
        replies.push(Message::new(pc.id, rsp, None));
        Ok(replies)
    }

    fn store(
        &self,
        association: &Association,
        pc: &PresentationContextNegotiated,
        command: &Command,
        data: Option<Vec<u8>>,
    ) -> Status {
        let dataset = match data
            .as_deref()
            .map(|bytes| decode_data_set(bytes, &pc.transfer_syntax))
        {
            Some(Ok(dataset)) => dataset,
            Some(Err(e)) => {
                warn!("Bad C-STORE data set: {}", e);
                return Status::UNABLE_TO_PROCESS;
            }
            None => {
                warn!("C-STORE without a data set");
                return Status::UNABLE_TO_PROCESS;
            }
        };
        let meta = StoreMeta {
            calling_ae_title: association.peer_ae_title().to_string(),
            sop_class_uid: command
                .affected_sop_class_uid()
                .unwrap_or_else(|| pc.abstract_syntax.clone()),
            sop_instance_uid: command.affected_sop_instance_uid().unwrap_or_default(),
            transfer_syntax: pc.transfer_syntax.clone(),
        };
        if self.provider.store(&meta, dataset) {
            Status::SUCCESS
        } else {
            Status::UNABLE_TO_PROCESS
        }
    }
}

/// The abstract syntaxes of the services a [`ServiceProvider`] answers:
/// verification, C-FIND query models and the known storage SOP classes.
pub fn default_abstract_syntaxes() -> Vec<String> {
    std::iter::once(uids::VERIFICATION)
        .chain([
            uids::PATIENT_ROOT_QUERY_RETRIEVE_INFORMATION_MODEL_FIND,
            uids::STUDY_ROOT_QUERY_RETRIEVE_INFORMATION_MODEL_FIND,
        ])
        .chain(uids::STORAGE_SOP_CLASSES.iter().copied())
        .map(String::from)
        .collect()
}
