//! Running an association over a blocking TCP stream.
use super::machine::{Action, Association, Event, Outcome};
use super::{ConfigureSocketSnafu, ConnectSnafu, ConnectionClosedSnafu, EncodePduSnafu, Result};
use crate::dimse::Message;
use crate::pdu::{write_pdu, PduFrameDecoder, MAXIMUM_PDU_SIZE};
use snafu::ResultExt;
use std::collections::VecDeque;
use std::io::{ErrorKind, Read, Write};
use std::net::{Shutdown, TcpStream, ToSocketAddrs};
use std::time::Duration;
use tracing::{debug, trace};

/// Timeouts applied to the TCP socket.
///
/// The association itself keeps no timers;
/// a read that times out surfaces as a transport error.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[non_exhaustive]
pub struct SocketOptions {
    pub read_timeout: Option<Duration>,
    pub write_timeout: Option<Duration>,
    pub connect_timeout: Option<Duration>,
}

impl SocketOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn read_timeout(mut self, timeout: Duration) -> Self {
        self.read_timeout = Some(timeout);
        self
    }

    pub fn write_timeout(mut self, timeout: Duration) -> Self {
        self.write_timeout = Some(timeout);
        self
    }

    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = Some(timeout);
        self
    }
}

/// What a single round of [`Connection::step`] produced.
#[derive(Debug, Default)]
pub struct Step {
    /// the completion of the pending request, if it came
    pub completion: Option<Result<Outcome>>,
    /// messages which no request was waiting for
    pub indications: Vec<Message>,
}

/// A TCP connection carrying one association.
#[derive(Debug)]
pub struct Connection {
    stream: TcpStream,
    decoder: PduFrameDecoder,
    write_buffer: Vec<u8>,
    read_buffer: Vec<u8>,
}

impl Connection {
    /// Connect to the first address of `address` that answers.
    pub fn connect<A: ToSocketAddrs>(
        address: A,
        options: &SocketOptions,
        decoder: PduFrameDecoder,
    ) -> Result<Self> {
        let stream = match options.connect_timeout {
            Some(timeout) => {
                let mut last_error = None;
                let mut connected = None;
                for addr in address.to_socket_addrs().context(ConnectSnafu)? {
                    match TcpStream::connect_timeout(&addr, timeout) {
                        Ok(stream) => {
                            connected = Some(stream);
                            break;
                        }
                        Err(e) => last_error = Some(e),
                    }
                }
                match connected {
                    Some(stream) => stream,
                    None => {
                        let e = last_error.unwrap_or_else(|| {
                            std::io::Error::new(ErrorKind::InvalidInput, "no address to connect to")
                        });
                        return Err(e).context(ConnectSnafu);
                    }
                }
            }
            None => TcpStream::connect(address).context(ConnectSnafu)?,
        };
        Connection::from_stream(stream, options, decoder)
    }

    /// Wrap an already connected stream, such as one accepted by a listener.
    pub fn from_stream(
        stream: TcpStream,
        options: &SocketOptions,
        decoder: PduFrameDecoder,
    ) -> Result<Self> {
        stream
            .set_read_timeout(options.read_timeout)
            .context(ConfigureSocketSnafu)?;
        stream
            .set_write_timeout(options.write_timeout)
            .context(ConfigureSocketSnafu)?;
        Ok(Connection {
            stream,
            decoder,
            write_buffer: Vec::with_capacity(MAXIMUM_PDU_SIZE as usize),
            read_buffer: vec![0; 8192],
        })
    }

    pub fn peer_addr(&self) -> Option<std::net::SocketAddr> {
        self.stream.peer_addr().ok()
    }

    /// Wait for the next thing to happen on the stream.
    pub fn next_event(&mut self) -> Event {
        loop {
            match self.decoder.next_frame() {
                Ok(Some(frame)) => {
                    return match frame.decode() {
                        Ok(pdu) => Event::Received(pdu),
                        Err(e) => Event::Malformed(e),
                    }
                }
                Ok(None) => {}
                Err(e) => return Event::Malformed(e),
            }
            match self.stream.read(&mut self.read_buffer) {
                Ok(0) => return Event::Closed,
                Ok(n) => {
                    trace!("Read {} bytes", n);
                    self.decoder.feed(&self.read_buffer[..n]);
                }
                Err(e) if e.kind() == ErrorKind::Interrupted => {}
                Err(e) => return Event::TransportError(e),
            }
        }
    }

    /// Hand `event` to the association and carry out the resulting actions.
    pub fn step(&mut self, association: &mut Association, event: Event) -> Result<Step> {
        let mut queue: VecDeque<Action> = association.handle(event)?.into();
        let mut step = Step::default();
        while let Some(action) = queue.pop_front() {
            match action {
                Action::Send(pdu) => {
                    trace!("Sending {}", pdu.short_description());
                    self.write_buffer.clear();
                    write_pdu(&mut self.write_buffer, &pdu).context(EncodePduSnafu)?;
                    if let Err(e) = self.stream.write_all(&self.write_buffer) {
                        queue.extend(association.handle(Event::TransportError(e))?);
                    }
                }
                Action::Complete(result) => step.completion = Some(result),
                Action::Indication(message) => step.indications.push(message),
                Action::Close => self.close(),
            }
        }
        Ok(step)
    }

    /// Hand `event` to the association,
    /// then keep reading until the pending request completes.
    ///
    /// Messages arriving in the meantime which no request waits for
    /// are logged and dropped.
    pub fn run(&mut self, association: &mut Association, event: Event) -> Result<Outcome> {
        let mut event = event;
        loop {
            let step = self.step(association, event)?;
            for message in step.indications {
                debug!("Dropping unsolicited {}", message.command.field());
            }
            if let Some(completion) = step.completion {
                return completion;
            }
            if association.state().is_terminal() {
                return ConnectionClosedSnafu.fail();
            }
            event = self.next_event();
        }
    }

    /// Read until the pending request completes again,
    /// such as for the next reply to a request with pending status.
    pub fn wait(&mut self, association: &mut Association) -> Result<Outcome> {
        let event = self.next_event();
        self.run(association, event)
    }

    /// Shut down both halves of the stream.
    pub fn close(&mut self) {
        if let Err(e) = self.stream.shutdown(Shutdown::Both) {
            trace!("Shutdown: {}", e);
        }
    }
}
