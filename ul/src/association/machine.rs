//! The association state machine.
//!
//! [`Association::handle`] takes one [`Event`] at a time
//! and returns the [`Action`]s the driver must carry out, in order.
use super::context::{negotiate, trim_uid, PresentationContextNegotiated};
use super::{
    AbortedSnafu, ConnectionClosedSnafu, DecodePduSnafu, DimseSnafu, Error, InvalidStateSnafu,
    RequestPendingSnafu, Result, TransportSnafu, UnexpectedPduSnafu,
    UnknownPresentationContextSnafu,
};
use crate::dimse::{Message, MessageAssembler};
use crate::pdu::{
    max_length_of, AbortRQServiceProviderReason, AbortRQSource, AssociationAC, AssociationRJ,
    AssociationRJResult, AssociationRJServiceProviderASCEReason, AssociationRJServiceUserReason,
    AssociationRJSource, AssociationRQ, PresentationContextResult, Pdu, UserVariableItem,
    DEFAULT_MAX_PDU,
};
use crate::{IMPLEMENTATION_CLASS_UID, IMPLEMENTATION_VERSION_NAME};
use dicomkit_dictionary_std::uids;
use snafu::{ensure, IntoError};
use tracing::{debug, trace, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Role {
    /// the side opening the association (service class user)
    Requestor,
    /// the side listening for associations (service class provider)
    Acceptor,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum State {
    Idle,
    Negotiating,
    Established,
    Releasing,
    Closed,
    Aborted,
    Rejected,
}

impl State {
    /// Whether no further PDUs may flow in this state.
    pub fn is_terminal(self) -> bool {
        matches!(self, State::Closed | State::Aborted | State::Rejected)
    }
}

/// Something that happened to an association.
#[derive(Debug)]
pub enum Event {
    /// the transport is connected and negotiation may start (requestor only)
    Connect,
    /// a whole PDU arrived
    Received(Pdu),
    /// send a message and wait for its replies
    Request(Message),
    /// send a message without waiting for anything,
    /// such as a response to an indication
    Send(Message),
    /// ask the peer to release the association
    Release,
    /// abort the association
    Abort,
    /// the transport was closed by the peer
    Closed,
    TransportError(std::io::Error),
    /// an inbound frame could not be decoded
    Malformed(crate::pdu::ReadError),
}

/// What the driver must do in response to an event.
#[derive(Debug)]
pub enum Action {
    Send(Pdu),
    /// deliver the result of the pending request
    Complete(Result<Outcome>),
    /// a message arrived which no request is waiting for
    Indication(Message),
    /// tear down the transport
    Close,
}

/// The successful result of a request.
#[derive(Debug)]
pub enum Outcome {
    Accepted,
    /// the acceptor refused the association;
    /// this is a regular outcome, not an error
    Rejected(AssociationRJ),
    /// a reply to the pending request;
    /// if its status is pending, more replies will follow
    Message(Message),
    Released,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Pending {
    Negotiation,
    Request,
    Release,
}

/// How an acceptor judges association requests.
#[derive(Debug, Clone)]
pub struct AcceptorPolicy {
    pub ae_title: String,
    /// accept requests whatever their called AE title
    pub accept_any_called_ae_title: bool,
    pub abstract_syntaxes: Vec<String>,
    /// accept any abstract syntax, listed or not
    pub promiscuous: bool,
    /// transfer syntaxes to accept; empty accepts any the codec supports
    pub transfer_syntaxes: Vec<String>,
    pub max_pdu_length: u32,
}

/// One side of a DICOM association.
#[derive(Debug)]
pub struct Association {
    role: Role,
    state: State,
    pending: Option<Pending>,
    request: Option<AssociationRQ>,
    policy: Option<AcceptorPolicy>,
    assembler: MessageAssembler,
    presentation_contexts: Vec<PresentationContextNegotiated>,
    local_max_pdu_length: u32,
    peer_max_pdu_length: u32,
    peer_ae_title: String,
}

impl Association {
    /// An association which will propose `request` on [`Event::Connect`].
    pub fn requestor(request: AssociationRQ) -> Self {
        let local_max_pdu_length = max_length_of(&request.user_variables).unwrap_or(DEFAULT_MAX_PDU);
        Association {
            role: Role::Requestor,
            state: State::Idle,
            pending: None,
            peer_ae_title: request.called_ae_title.clone(),
            request: Some(request),
            policy: None,
            assembler: MessageAssembler::new(),
            presentation_contexts: Vec::new(),
            local_max_pdu_length,
            peer_max_pdu_length: DEFAULT_MAX_PDU,
        }
    }

    /// An association waiting for a request, to be judged by `policy`.
    pub fn acceptor(policy: AcceptorPolicy) -> Self {
        Association {
            role: Role::Acceptor,
            state: State::Idle,
            pending: None,
            request: None,
            local_max_pdu_length: policy.max_pdu_length,
            policy: Some(policy),
            assembler: MessageAssembler::new(),
            presentation_contexts: Vec::new(),
            peer_max_pdu_length: DEFAULT_MAX_PDU,
            peer_ae_title: String::new(),
        }
    }

    pub fn role(&self) -> Role {
        self.role
    }

    pub fn state(&self) -> State {
        self.state
    }

    /// Whether a request is waiting for its completion.
    pub fn is_awaiting(&self) -> bool {
        self.pending.is_some()
    }

    /// The AE title of the other side.
    pub fn peer_ae_title(&self) -> &str {
        &self.peer_ae_title
    }

    pub fn local_max_pdu_length(&self) -> u32 {
        self.local_max_pdu_length
    }

    /// The largest PDU the peer announced it will take.
    pub fn peer_max_pdu_length(&self) -> u32 {
        self.peer_max_pdu_length
    }

    /// All presentation contexts settled by negotiation, accepted or not.
    pub fn presentation_contexts(&self) -> &[PresentationContextNegotiated] {
        &self.presentation_contexts
    }

    /// The accepted presentation contexts for the given abstract syntax.
    pub fn accepted_presentation_contexts_for(
        &self,
        sop_class_uid: &str,
    ) -> Vec<&PresentationContextNegotiated> {
        let sop_class_uid = trim_uid(sop_class_uid);
        self.presentation_contexts
            .iter()
            .filter(|pc| pc.is_accepted() && pc.abstract_syntax == sop_class_uid)
            .collect()
    }

    /// Process one event.
    ///
    /// An `Err` means the event was refused outright
    /// (for instance a request while another one is pending)
    /// and the association was left untouched.
    /// Protocol failures are reported through [`Action::Complete`] instead.
    pub fn handle(&mut self, event: Event) -> Result<Vec<Action>> {
        let mut actions = Vec::new();
        match event {
            Event::Connect => {
                ensure!(
                    self.role == Role::Requestor && self.state == State::Idle,
                    InvalidStateSnafu {
                        state: self.state,
                        event: "connect",
                    }
                );
                let request = match &self.request {
                    Some(request) => request.clone(),
                    None => {
                        return InvalidStateSnafu {
                            state: self.state,
                            event: "connect",
                        }
                        .fail()
                    }
                };
                self.transition(State::Negotiating);
                self.pending = Some(Pending::Negotiation);
                actions.push(Action::Send(request.into()));
            }
            Event::Request(message) => {
                self.ensure_established("send a request")?;
                ensure!(self.pending.is_none(), RequestPendingSnafu);
                self.send_message(&message, &mut actions)?;
                self.pending = Some(Pending::Request);
            }
            Event::Send(message) => {
                self.ensure_established("send a message")?;
                self.send_message(&message, &mut actions)?;
            }
            Event::Release => {
                self.ensure_established("release")?;
                ensure!(self.pending.is_none(), RequestPendingSnafu);
                self.transition(State::Releasing);
                self.pending = Some(Pending::Release);
                actions.push(Action::Send(Pdu::ReleaseRQ));
            }
            Event::Abort => {
                if !self.state.is_terminal() {
                    actions.push(Action::Send(Pdu::AbortRQ {
                        source: AbortRQSource::ServiceUser,
                    }));
                    self.transition(State::Aborted);
                    self.fail(
                        AbortedSnafu {
                            abort_source: AbortRQSource::ServiceUser,
                        }
                        .build(),
                        &mut actions,
                    );
                    actions.push(Action::Close);
                }
            }
            Event::Closed => {
                if !self.state.is_terminal() {
                    if self.state != State::Idle {
                        debug!("Connection closed in state {:?}", self.state);
                    }
                    self.transition(State::Aborted);
                    self.fail(ConnectionClosedSnafu.build(), &mut actions);
                }
            }
            Event::TransportError(e) => {
                if !self.state.is_terminal() {
                    warn!("Transport error in state {:?}: {}", self.state, e);
                    self.transition(State::Aborted);
                    self.fail(TransportSnafu.into_error(e), &mut actions);
                    actions.push(Action::Close);
                }
            }
            Event::Malformed(e) => {
                if !self.state.is_terminal() {
                    warn!("Malformed PDU in state {:?}: {}", self.state, e);
                    self.abort_with(
                        AbortRQServiceProviderReason::InvalidPduParameter,
                        DecodePduSnafu.into_error(e),
                        &mut actions,
                    );
                }
            }
            Event::Received(pdu) => {
                if self.state.is_terminal() {
                    debug!(
                        "Ignoring {} in state {:?}",
                        pdu.short_description(),
                        self.state
                    );
                } else {
                    trace!("Received {}", pdu.short_description());
                    self.on_pdu(pdu, &mut actions);
                }
            }
        }
        Ok(actions)
    }

    fn ensure_established(&self, event: &'static str) -> Result<()> {
        ensure!(
            self.state == State::Established,
            InvalidStateSnafu {
                state: self.state,
                event,
            }
        );
        Ok(())
    }

    fn transition(&mut self, state: State) {
        if self.state != state {
            debug!("Association {:?}: {:?} -> {:?}", self.role, self.state, state);
            self.state = state;
        }
    }

    /// Fail the pending request, if there is one.
    fn fail(&mut self, error: Error, actions: &mut Vec<Action>) {
        if self.pending.take().is_some() {
            actions.push(Action::Complete(Err(error)));
        } else {
            debug!("Association ended: {}", error);
        }
    }

    fn complete(&mut self, outcome: Outcome, actions: &mut Vec<Action>) {
        self.pending = None;
        actions.push(Action::Complete(Ok(outcome)));
    }

    fn abort_with(
        &mut self,
        reason: AbortRQServiceProviderReason,
        error: Error,
        actions: &mut Vec<Action>,
    ) {
        actions.push(Action::Send(Pdu::AbortRQ {
            source: AbortRQSource::ServiceProvider(reason),
        }));
        self.transition(State::Aborted);
        self.fail(error, actions);
        actions.push(Action::Close);
    }

    fn send_message(&self, message: &Message, actions: &mut Vec<Action>) -> Result<()> {
        let id = message.presentation_context_id;
        ensure!(
            self.presentation_contexts
                .iter()
                .any(|pc| pc.id == id && pc.is_accepted()),
            UnknownPresentationContextSnafu { id }
        );
        trace!("Sending {}", message.command.field());
        let pdus = message
            .to_pdus(self.peer_max_pdu_length)
            .map_err(|e| DimseSnafu.into_error(e))?;
        actions.extend(pdus.into_iter().map(Action::Send));
        Ok(())
    }

    fn on_pdu(&mut self, pdu: Pdu, actions: &mut Vec<Action>) {
        match (self.role, self.state, pdu) {
            (Role::Requestor, State::Negotiating, Pdu::AssociationAC(ac)) => {
                self.on_association_ac(ac);
                self.transition(State::Established);
                self.complete(Outcome::Accepted, actions);
            }
            (Role::Requestor, State::Negotiating, Pdu::AssociationRJ(rj)) => {
                warn!("Association rejected: {:?}, {}", rj.result, rj.source);
                self.transition(State::Rejected);
                self.complete(Outcome::Rejected(rj), actions);
                actions.push(Action::Close);
            }
            (Role::Acceptor, State::Idle, Pdu::AssociationRQ(rq)) => {
                self.transition(State::Negotiating);
                self.on_association_rq(rq, actions);
            }
            (_, State::Established, Pdu::PData { data }) => {
                for pdv in data {
                    match self.assembler.push(pdv) {
                        Ok(Some(message)) => self.on_message(message, actions),
                        Ok(None) => {}
                        Err(e) => {
                            warn!("Bad DIMSE message: {}", e);
                            self.abort_with(
                                AbortRQServiceProviderReason::InvalidPduParameter,
                                DimseSnafu.into_error(e),
                                actions,
                            );
                            return;
                        }
                    }
                }
            }
            (_, State::Releasing, Pdu::PData { data }) => {
                debug!("Discarding {} PDVs received while releasing", data.len());
            }
            (_, State::Established, Pdu::ReleaseRQ) => {
                actions.push(Action::Send(Pdu::ReleaseRP));
                self.transition(State::Closed);
                self.fail(ConnectionClosedSnafu.build(), actions);
                actions.push(Action::Close);
            }
            // release collision: answer and keep waiting for our own reply
            (_, State::Releasing, Pdu::ReleaseRQ) => {
                actions.push(Action::Send(Pdu::ReleaseRP));
            }
            (_, State::Releasing, Pdu::ReleaseRP) => {
                self.transition(State::Closed);
                self.complete(Outcome::Released, actions);
                actions.push(Action::Close);
            }
            (_, _, Pdu::AbortRQ { source }) => {
                warn!("Association aborted by peer: {:?}", source);
                self.transition(State::Aborted);
                self.fail(
                    AbortedSnafu {
                        abort_source: source,
                    }
                    .build(),
                    actions,
                );
                actions.push(Action::Close);
            }
            (_, state, pdu @ Pdu::Unknown { .. }) => {
                self.abort_with(
                    AbortRQServiceProviderReason::UnrecognizedPdu,
                    UnexpectedPduSnafu {
                        pdu: Box::new(pdu),
                        state,
                    }
                    .build(),
                    actions,
                );
            }
            (_, state, pdu) => {
                warn!("Unexpected {} in state {:?}", pdu.short_description(), state);
                self.abort_with(
                    AbortRQServiceProviderReason::UnexpectedPdu,
                    UnexpectedPduSnafu {
                        pdu: Box::new(pdu),
                        state,
                    }
                    .build(),
                    actions,
                );
            }
        }
    }

    fn on_association_ac(&mut self, ac: AssociationAC) {
        let proposed = self
            .request
            .as_ref()
            .map(|rq| rq.presentation_contexts.as_slice())
            .unwrap_or_default();
        self.presentation_contexts = ac
            .presentation_contexts
            .iter()
            .map(|result| PresentationContextNegotiated {
                id: result.id,
                abstract_syntax: proposed
                    .iter()
                    .find(|pc| pc.id == result.id)
                    .map(|pc| trim_uid(&pc.abstract_syntax).to_string())
                    .unwrap_or_default(),
                transfer_syntax: trim_uid(&result.transfer_syntax).to_string(),
                reason: result.reason,
            })
            .collect();
        self.peer_max_pdu_length = max_length_of(&ac.user_variables).unwrap_or(DEFAULT_MAX_PDU);
        debug!(
            "Association accepted with {} of {} presentation contexts",
            self.presentation_contexts
                .iter()
                .filter(|pc| pc.is_accepted())
                .count(),
            self.presentation_contexts.len()
        );
    }

    fn on_association_rq(&mut self, rq: AssociationRQ, actions: &mut Vec<Action>) {
        let policy = match &self.policy {
            Some(policy) => policy.clone(),
            None => return,
        };

        let refusal = if rq.protocol_version & 0x0001 == 0 {
            Some(AssociationRJSource::ServiceProviderASCE(
                AssociationRJServiceProviderASCEReason::ProtocolVersionNotSupported,
            ))
        } else if trim_uid(&rq.application_context_name) != uids::DICOM_APPLICATION_CONTEXT {
            Some(AssociationRJSource::ServiceUser(
                AssociationRJServiceUserReason::ApplicationContextNameNotSupported,
            ))
        } else if !policy.accept_any_called_ae_title
            && rq.called_ae_title.trim() != policy.ae_title.trim()
        {
            Some(AssociationRJSource::ServiceUser(
                AssociationRJServiceUserReason::CalledAETitleNotRecognized,
            ))
        } else {
            None
        };

        if let Some(source) = refusal {
            warn!(
                "Rejecting association from {} to {}: {}",
                rq.calling_ae_title, rq.called_ae_title, source
            );
            actions.push(Action::Send(
                AssociationRJ {
                    result: AssociationRJResult::Permanent,
                    source,
                }
                .into(),
            ));
            self.transition(State::Rejected);
            actions.push(Action::Close);
            return;
        }

        self.presentation_contexts = rq
            .presentation_contexts
            .iter()
            .map(|pc| {
                negotiate(
                    pc,
                    &policy.abstract_syntaxes,
                    &policy.transfer_syntaxes,
                    policy.promiscuous,
                )
            })
            .collect();
        self.peer_max_pdu_length = max_length_of(&rq.user_variables).unwrap_or(DEFAULT_MAX_PDU);
        self.peer_ae_title = rq.calling_ae_title.clone();

        let ac = AssociationAC {
            protocol_version: 1,
            calling_ae_title: rq.calling_ae_title,
            called_ae_title: rq.called_ae_title,
            application_context_name: uids::DICOM_APPLICATION_CONTEXT.to_string(),
            presentation_contexts: self
                .presentation_contexts
                .iter()
                .map(|pc| PresentationContextResult {
                    id: pc.id,
                    reason: pc.reason,
                    transfer_syntax: pc.transfer_syntax.clone(),
                })
                .collect(),
            user_variables: vec![
                UserVariableItem::MaxLength(self.local_max_pdu_length),
                UserVariableItem::ImplementationClassUID(IMPLEMENTATION_CLASS_UID.to_string()),
                UserVariableItem::ImplementationVersionName(
                    IMPLEMENTATION_VERSION_NAME.to_string(),
                ),
            ],
        };
        actions.push(Action::Send(ac.into()));
        self.transition(State::Established);
    }

    fn on_message(&mut self, message: Message, actions: &mut Vec<Action>) {
        if self.pending == Some(Pending::Request) && message.command.field().is_response() {
            let more = message
                .command
                .status()
                .map(|status| status.is_pending())
                .unwrap_or(false);
            if !more {
                self.pending = None;
            }
            actions.push(Action::Complete(Ok(Outcome::Message(message))));
        } else {
            actions.push(Action::Indication(message));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dimse::{Command, CommandField, Status};
    use crate::pdu::{PDataValue, PDataValueType, PresentationContextProposed};
    use matches::assert_matches;

    fn request(called: &str) -> AssociationRQ {
        AssociationRQ {
            protocol_version: 1,
            calling_ae_title: "STORE-SCU".to_string(),
            called_ae_title: called.to_string(),
            application_context_name: uids::DICOM_APPLICATION_CONTEXT.to_string(),
            presentation_contexts: vec![PresentationContextProposed {
                id: 1,
                abstract_syntax: uids::VERIFICATION.to_string(),
                transfer_syntaxes: vec![uids::IMPLICIT_VR_LITTLE_ENDIAN.to_string()],
            }],
            user_variables: vec![UserVariableItem::MaxLength(16_384)],
        }
    }

    fn policy(ae_title: &str) -> AcceptorPolicy {
        AcceptorPolicy {
            ae_title: ae_title.to_string(),
            accept_any_called_ae_title: false,
            abstract_syntaxes: vec![uids::VERIFICATION.to_string()],
            promiscuous: false,
            transfer_syntaxes: Vec::new(),
            max_pdu_length: 16_384,
        }
    }

    fn sent(actions: Vec<Action>) -> Vec<Pdu> {
        actions
            .into_iter()
            .filter_map(|action| match action {
                Action::Send(pdu) => Some(pdu),
                _ => None,
            })
            .collect()
    }

    /// Run both sides up to an established association.
    fn establish() -> (Association, Association) {
        let mut scu = Association::requestor(request("ANY-SCP"));
        let mut scp = Association::acceptor(policy("ANY-SCP"));
        let rq = sent(scu.handle(Event::Connect).unwrap()).remove(0);
        let ac = sent(scp.handle(Event::Received(rq)).unwrap()).remove(0);
        let actions = scu.handle(Event::Received(ac)).unwrap();
        assert_matches!(actions.as_slice(), [Action::Complete(Ok(Outcome::Accepted))]);
        (scu, scp)
    }

    #[test]
    fn wrong_called_ae_title_is_rejected() {
        let mut scp = Association::acceptor(policy("Y"));
        let actions = scp.handle(Event::Received(request("X").into())).unwrap();
        let pdus = sent(actions);
        assert_eq!(
            pdus,
            vec![Pdu::AssociationRJ(AssociationRJ {
                result: AssociationRJResult::Permanent,
                source: AssociationRJSource::ServiceUser(
                    AssociationRJServiceUserReason::CalledAETitleNotRecognized
                ),
            })]
        );
        assert_eq!(scp.state(), State::Rejected);
    }

    #[test]
    fn requestor_sees_rejection_as_outcome() {
        let mut scu = Association::requestor(request("X"));
        scu.handle(Event::Connect).unwrap();
        assert_eq!(scu.state(), State::Negotiating);
        let rj = AssociationRJ {
            result: AssociationRJResult::Permanent,
            source: AssociationRJSource::ServiceUser(
                AssociationRJServiceUserReason::CalledAETitleNotRecognized,
            ),
        };
        let actions = scu.handle(Event::Received(rj.into())).unwrap();
        assert_matches!(
            actions.as_slice(),
            [Action::Complete(Ok(Outcome::Rejected(_))), Action::Close]
        );
        assert_eq!(scu.state(), State::Rejected);
    }

    #[test]
    fn negotiated_contexts() {
        let (scu, scp) = establish();
        assert_eq!(scu.state(), State::Established);
        assert_eq!(scp.state(), State::Established);
        assert_eq!(scp.peer_ae_title(), "STORE-SCU");
        let accepted = scu.accepted_presentation_contexts_for(uids::VERIFICATION);
        assert_eq!(accepted.len(), 1);
        assert_eq!(accepted[0].transfer_syntax, uids::IMPLICIT_VR_LITTLE_ENDIAN);
        assert!(scu
            .accepted_presentation_contexts_for(uids::CT_IMAGE_STORAGE)
            .is_empty());
    }

    #[test]
    fn echo_exchange() {
        let (mut scu, mut scp) = establish();
        let rq = Message::new(1, Command::echo_rq(1).unwrap(), None);
        let pdus = sent(scu.handle(Event::Request(rq)).unwrap());
        assert!(scu.is_awaiting());

        let mut indications = Vec::new();
        for pdu in pdus {
            for action in scp.handle(Event::Received(pdu)).unwrap() {
                if let Action::Indication(message) = action {
                    indications.push(message);
                }
            }
        }
        assert_eq!(indications.len(), 1);
        assert_eq!(indications[0].command.field(), CommandField::CEchoRq);

        let rsp = Message::new(1, Command::echo_rsp(1, Status::SUCCESS).unwrap(), None);
        let pdus = sent(scp.handle(Event::Send(rsp)).unwrap());
        let mut actions = Vec::new();
        for pdu in pdus {
            actions.extend(scu.handle(Event::Received(pdu)).unwrap());
        }
        match actions.as_slice() {
            [Action::Complete(Ok(Outcome::Message(message)))] => {
                assert_eq!(message.command.status(), Some(Status::SUCCESS))
            }
            other => panic!("unexpected actions {:?}", other),
        }
        assert!(!scu.is_awaiting());
    }

    #[test]
    fn one_request_at_a_time() {
        let (mut scu, _) = establish();
        let rq = Message::new(1, Command::echo_rq(1).unwrap(), None);
        scu.handle(Event::Request(rq.clone())).unwrap();
        assert_matches!(
            scu.handle(Event::Request(rq)),
            Err(Error::RequestPending { .. })
        );
    }

    #[test]
    fn unknown_context_is_refused() {
        let (mut scu, _) = establish();
        let rq = Message::new(5, Command::echo_rq(1).unwrap(), None);
        assert_matches!(
            scu.handle(Event::Request(rq)),
            Err(Error::UnknownPresentationContext { id: 5, .. })
        );
    }

    #[test]
    fn close_while_pending() {
        let (mut scu, _) = establish();
        let rq = Message::new(1, Command::echo_rq(1).unwrap(), None);
        scu.handle(Event::Request(rq)).unwrap();
        let actions = scu.handle(Event::Closed).unwrap();
        assert_matches!(
            actions.as_slice(),
            [Action::Complete(Err(Error::ConnectionClosed { .. }))]
        );
        assert_eq!(scu.state(), State::Aborted);
        assert!(!scu.is_awaiting());
    }

    #[test]
    fn release_handshake() {
        let (mut scu, mut scp) = establish();
        let pdus = sent(scu.handle(Event::Release).unwrap());
        assert_eq!(pdus, vec![Pdu::ReleaseRQ]);
        assert_eq!(scu.state(), State::Releasing);

        let reply = scp.handle(Event::Received(Pdu::ReleaseRQ)).unwrap();
        assert_matches!(reply.as_slice(), [Action::Send(Pdu::ReleaseRP), Action::Close]);
        assert_eq!(scp.state(), State::Closed);

        let actions = scu.handle(Event::Received(Pdu::ReleaseRP)).unwrap();
        assert_matches!(
            actions.as_slice(),
            [Action::Complete(Ok(Outcome::Released)), Action::Close]
        );
        assert_eq!(scu.state(), State::Closed);
    }

    #[test]
    fn unexpected_pdu_aborts() {
        let (mut scu, _) = establish();
        let actions = scu.handle(Event::Received(Pdu::ReleaseRP)).unwrap();
        assert_matches!(
            actions.as_slice(),
            [
                Action::Send(Pdu::AbortRQ {
                    source: AbortRQSource::ServiceProvider(
                        AbortRQServiceProviderReason::UnexpectedPdu
                    )
                }),
                Action::Close
            ]
        );
        assert_eq!(scu.state(), State::Aborted);
    }

    #[test]
    fn unknown_command_field_aborts() {
        let (_, mut scp) = establish();
        let mut command = Command::echo_rq(1).unwrap().encode().unwrap();
        // value of (0000,0100) CommandField
        let field = command
            .windows(8)
            .position(|w| w == [0x00, 0x00, 0x00, 0x01, 0x02, 0x00, 0x00, 0x00])
            .unwrap()
            + 8;
        command[field..field + 2].copy_from_slice(&0x0099_u16.to_le_bytes());

        let pdu = Pdu::PData {
            data: vec![PDataValue {
                presentation_context_id: 1,
                value_type: PDataValueType::Command,
                is_last: true,
                data: command,
            }],
        };
        let actions = scp.handle(Event::Received(pdu)).unwrap();
        assert_matches!(
            actions.as_slice(),
            [
                Action::Send(Pdu::AbortRQ {
                    source: AbortRQSource::ServiceProvider(_)
                }),
                Action::Close
            ]
        );
        assert_eq!(scp.state(), State::Aborted);
    }

    #[test]
    fn peer_abort_fails_pending_request() {
        let (mut scu, _) = establish();
        let rq = Message::new(1, Command::echo_rq(1).unwrap(), None);
        scu.handle(Event::Request(rq)).unwrap();
        let actions = scu
            .handle(Event::Received(Pdu::AbortRQ {
                source: AbortRQSource::ServiceUser,
            }))
            .unwrap();
        assert_matches!(
            actions.as_slice(),
            [
                Action::Complete(Err(Error::Aborted {
                    abort_source: AbortRQSource::ServiceUser,
                    ..
                })),
                Action::Close
            ]
        );
    }
}
