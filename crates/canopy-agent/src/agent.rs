use thiserror::Error;

use canopy_codec::envelope::{decode_envelope_cbor, Action, EnvelopeV1};
use canopy_core::ids::correlation_hex;
use canopy_core::{new_correlation_id, CorrelationId, FormatId};
use canopy_transport::adapter::{send_envelope, ChannelAdapter};

use crate::config::AgentConfig;

/// Established session with the host wrapper.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionHandle {
    /// Correlation id of the successful handshake.
    pub correlation_id: CorrelationId,
}

/// Outcomes surfaced by one `tick`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AgentEvent {
    /// Handshake completed; the session is usable.
    SessionEstablished(SessionHandle),
    /// Handshake timed out or was rejected; callers branch on absence,
    /// never on an error.
    SessionEmpty,
    /// The wrapper confirmed the requested format.
    FormatConfirmed(FormatId),
    /// The wrapper rejected the requested format, or the wait timed out.
    FormatRejected { format: FormatId, timed_out: bool },
}

/// Contract errors raised by agent operations.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum AgentError {
    /// `request_format` called with no established session.
    #[error("no established session")]
    NoSession,
    /// Second format request while one is in flight; caller misuse.
    #[error("a format request is already in flight")]
    RequestInFlight,
}

#[derive(Debug, Clone)]
struct PendingHandshake {
    correlation_id: CorrelationId,
    deadline_step: u64,
}

#[derive(Debug, Clone)]
struct PendingRequest {
    correlation_id: CorrelationId,
    format: FormatId,
    deadline_step: u64,
}

type InboundHandler = Box<dyn FnMut(&EnvelopeV1)>;

/// Creative-side agent bound to one host wrapper peer.
///
/// Owns its channel endpoint; all protocol waiting is resolved by `tick`,
/// which drains inbound traffic and expires deadlines.
pub struct CreativeAgent<A: ChannelAdapter> {
    adapter: A,
    host: A::Peer,
    config: AgentConfig,
    session: Option<SessionHandle>,
    pending_handshake: Option<PendingHandshake>,
    pending_request: Option<PendingRequest>,
    listeners: Vec<InboundHandler>,
}

impl<A: ChannelAdapter> CreativeAgent<A> {
    pub fn new(adapter: A, host: A::Peer, config: AgentConfig) -> Self {
        Self {
            adapter,
            host,
            config,
            session: None,
            pending_handshake: None,
            pending_request: None,
            listeners: Vec::new(),
        }
    }

    /// The established session, if any.
    pub fn session(&self) -> Option<&SessionHandle> {
        self.session.as_ref()
    }

    /// Whether a format request is currently awaiting its response.
    pub fn request_in_flight(&self) -> bool {
        self.pending_request.is_some()
    }

    /// Mutable access to the underlying channel (test/simulation wiring).
    pub fn adapter_mut(&mut self) -> &mut A {
        &mut self.adapter
    }

    /// Registers an inbound-envelope listener for the agent's lifetime.
    ///
    /// Every decoded inbound envelope reaches every listener, including
    /// envelopes already consumed by correlation matching; out-of-band
    /// pushes from the wrapper arrive the same way.
    pub fn on_message(&mut self, handler: impl FnMut(&EnvelopeV1) + 'static) {
        self.listeners.push(Box::new(handler));
    }

    /// Begins the session handshake by sending `SESSION_INIT`.
    ///
    /// Idempotent: with a session established or a handshake pending, the
    /// existing correlation id is returned and nothing is sent.
    pub fn start_session(&mut self, now_step: u64) -> CorrelationId {
        if let Some(session) = &self.session {
            return session.correlation_id;
        }
        if let Some(pending) = &self.pending_handshake {
            return pending.correlation_id;
        }
        let correlation_id = new_correlation_id();
        self.pending_handshake = Some(PendingHandshake {
            correlation_id,
            deadline_step: now_step + self.config.handshake_timeout_steps,
        });
        self.send(&EnvelopeV1::for_session(Action::SessionInit, correlation_id));
        correlation_id
    }

    /// Sends `REQUEST_FORMAT{format}` over the established session.
    ///
    /// Exactly one request may be outstanding; a second concurrent request
    /// is caller misuse and fails loudly.
    pub fn request_format(
        &mut self,
        format: FormatId,
        now_step: u64,
    ) -> Result<CorrelationId, AgentError> {
        if self.session.is_none() {
            return Err(AgentError::NoSession);
        }
        if self.pending_request.is_some() {
            return Err(AgentError::RequestInFlight);
        }
        let correlation_id = new_correlation_id();
        self.pending_request = Some(PendingRequest {
            correlation_id,
            format: format.clone(),
            deadline_step: now_step + self.config.request_timeout_steps,
        });
        self.send(&EnvelopeV1::for_format(
            Action::RequestFormat,
            correlation_id,
            format,
        ));
        Ok(correlation_id)
    }

    /// Drains inbound traffic, resolves correlated responses, and expires
    /// deadlines. Undecodable envelopes and unexpected actions/correlations
    /// are ignored.
    pub fn tick(&mut self, now_step: u64) -> Vec<AgentEvent> {
        let mut events = Vec::new();

        while let Some((_, bytes)) = self.adapter.recv() {
            let envelope = match decode_envelope_cbor(&bytes) {
                Ok(envelope) => envelope,
                Err(_) => continue,
            };
            for listener in &mut self.listeners {
                listener(&envelope);
            }
            self.correlate(&envelope, &mut events);
        }

        if let Some(pending) = &self.pending_handshake {
            if now_step >= pending.deadline_step {
                tracing::debug!(
                    correlation = %correlation_hex(&pending.correlation_id),
                    "session handshake timed out"
                );
                self.pending_handshake = None;
                events.push(AgentEvent::SessionEmpty);
            }
        }
        if let Some(pending) = &self.pending_request {
            if now_step >= pending.deadline_step {
                let format = pending.format.clone();
                tracing::debug!(%format, "format request timed out; treating as rejected");
                self.pending_request = None;
                events.push(AgentEvent::FormatRejected {
                    format,
                    timed_out: true,
                });
            }
        }
        events
    }

    fn correlate(&mut self, envelope: &EnvelopeV1, events: &mut Vec<AgentEvent>) {
        match envelope.action {
            Action::SessionAck => {
                let matches = self
                    .pending_handshake
                    .as_ref()
                    .is_some_and(|p| p.correlation_id == envelope.correlation_id);
                if matches {
                    self.pending_handshake = None;
                    let handle = SessionHandle {
                        correlation_id: envelope.correlation_id,
                    };
                    self.session = Some(handle.clone());
                    events.push(AgentEvent::SessionEstablished(handle));
                }
            }
            Action::FormatConfirmed | Action::FormatRejected => {
                let matches = self
                    .pending_request
                    .as_ref()
                    .is_some_and(|p| p.correlation_id == envelope.correlation_id);
                let Some(format) = envelope.format.clone() else {
                    return;
                };
                if matches {
                    self.pending_request = None;
                    events.push(if envelope.action == Action::FormatConfirmed {
                        AgentEvent::FormatConfirmed(format)
                    } else {
                        AgentEvent::FormatRejected {
                            format,
                            timed_out: false,
                        }
                    });
                }
            }
            // The agent never consumes its own outbound action kinds.
            Action::SessionInit | Action::RequestFormat => {}
        }
    }

    fn send(&mut self, envelope: &EnvelopeV1) {
        if let Err(err) = send_envelope(&mut self.adapter, &self.host, envelope) {
            tracing::warn!(error = %err, "failed to encode outbound envelope");
        }
    }
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;
    use std::rc::Rc;

    use canopy_codec::envelope::{decode_envelope_cbor, encode_envelope_cbor, Action, EnvelopeV1};
    use canopy_core::FormatId;
    use canopy_transport::adapter::InMemoryChannel;

    use super::{AgentConfig, AgentError, AgentEvent, CreativeAgent};

    fn agent() -> CreativeAgent<InMemoryChannel> {
        CreativeAgent::new(
            InMemoryChannel::default(),
            "wrapper".to_string(),
            AgentConfig::default(),
        )
    }

    fn established_agent(now_step: u64) -> CreativeAgent<InMemoryChannel> {
        let mut agent = agent();
        let correlation = agent.start_session(now_step);
        agent.adapter_mut().enqueue_inbound(
            "wrapper",
            encode_envelope_cbor(&EnvelopeV1::for_session(Action::SessionAck, correlation))
                .expect("encode should succeed"),
        );
        let events = agent.tick(now_step);
        assert!(matches!(events[0], AgentEvent::SessionEstablished(_)));
        agent.adapter_mut().take_outbound();
        agent
    }

    #[test]
    fn start_session_sends_init_and_is_idempotent() {
        let mut agent = agent();
        let first = agent.start_session(1);
        let second = agent.start_session(2);
        assert_eq!(first, second, "pending handshake should be reused");

        let outbound = agent.adapter_mut().take_outbound();
        assert_eq!(outbound.len(), 1, "repeat start must not resend");
        let envelope = decode_envelope_cbor(&outbound[0].1).expect("decode should succeed");
        assert_eq!(envelope.action, Action::SessionInit);
        assert_eq!(envelope.correlation_id, first);
    }

    #[test]
    fn matching_ack_establishes_the_session() {
        let agent = established_agent(1);
        assert!(agent.session().is_some());
    }

    #[test]
    fn ack_with_wrong_correlation_is_ignored() {
        let mut agent = agent();
        agent.start_session(1);
        agent.adapter_mut().enqueue_inbound(
            "wrapper",
            encode_envelope_cbor(&EnvelopeV1::for_session(Action::SessionAck, [0xEE; 16]))
                .expect("encode should succeed"),
        );
        let events = agent.tick(2);
        assert!(events.is_empty());
        assert!(agent.session().is_none());
    }

    #[test]
    fn handshake_timeout_resolves_empty_not_error() {
        let mut agent = agent();
        agent.start_session(1);
        assert!(agent.tick(5).is_empty(), "deadline not reached yet");
        let events = agent.tick(9);
        assert_eq!(events, vec![AgentEvent::SessionEmpty]);
        assert!(agent.session().is_none());
    }

    #[test]
    fn request_format_requires_a_session() {
        let mut agent = agent();
        assert_eq!(
            agent.request_format(FormatId::TopScroll, 1),
            Err(AgentError::NoSession)
        );
    }

    #[test]
    fn second_concurrent_request_fails_loudly() {
        let mut agent = established_agent(1);
        agent
            .request_format(FormatId::TopScroll, 2)
            .expect("first request should be accepted");
        assert_eq!(
            agent.request_format(FormatId::Skins, 2),
            Err(AgentError::RequestInFlight)
        );
    }

    #[test]
    fn confirmed_response_resolves_the_request() {
        let mut agent = established_agent(1);
        let correlation = agent
            .request_format(FormatId::TopScroll, 2)
            .expect("request should be accepted");
        agent.adapter_mut().enqueue_inbound(
            "wrapper",
            encode_envelope_cbor(&EnvelopeV1::for_format(
                Action::FormatConfirmed,
                correlation,
                FormatId::TopScroll,
            ))
            .expect("encode should succeed"),
        );
        let events = agent.tick(3);
        assert_eq!(events, vec![AgentEvent::FormatConfirmed(FormatId::TopScroll)]);
        assert!(!agent.request_in_flight());
    }

    #[test]
    fn request_timeout_is_surfaced_as_rejection() {
        let mut agent = established_agent(1);
        agent
            .request_format(FormatId::Midscroll, 2)
            .expect("request should be accepted");
        let events = agent.tick(2 + AgentConfig::default().request_timeout_steps);
        assert_eq!(
            events,
            vec![AgentEvent::FormatRejected {
                format: FormatId::Midscroll,
                timed_out: true,
            }]
        );
    }

    #[test]
    fn listeners_see_every_inbound_envelope_including_consumed_ones() {
        let mut agent = agent();
        let seen: Rc<RefCell<Vec<Action>>> = Rc::default();
        let sink = Rc::clone(&seen);
        agent.on_message(move |envelope| sink.borrow_mut().push(envelope.action));

        let correlation = agent.start_session(1);
        agent.adapter_mut().enqueue_inbound(
            "wrapper",
            encode_envelope_cbor(&EnvelopeV1::for_session(Action::SessionAck, correlation))
                .expect("encode should succeed"),
        );
        // Out-of-band push with an unrelated correlation.
        agent.adapter_mut().enqueue_inbound(
            "wrapper",
            encode_envelope_cbor(&EnvelopeV1::for_format(
                Action::FormatRejected,
                [0x77; 16],
                FormatId::Takeover,
            ))
            .expect("encode should succeed"),
        );
        agent.tick(2);
        assert_eq!(
            *seen.borrow(),
            vec![Action::SessionAck, Action::FormatRejected]
        );
    }

    #[test]
    fn garbage_bytes_are_ignored() {
        let mut agent = agent();
        agent.start_session(1);
        agent
            .adapter_mut()
            .enqueue_inbound("wrapper", vec![0xDE, 0xAD]);
        assert!(agent.tick(2).is_empty());
    }
}
