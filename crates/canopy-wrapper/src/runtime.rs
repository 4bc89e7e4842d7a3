use canopy_codec::envelope::{decode_envelope_cbor, Action, EnvelopeV1};
use canopy_core::ids::correlation_hex;
use canopy_core::{CorrelationId, FormatId};
use canopy_transport::adapter::{send_envelope, ChannelAdapter};

use crate::policy::RejectReason;
use crate::registry::FormatRegistry;
use crate::wrapper::Wrapper;

/// One creative bound to one wrapper for the embedded document's lifetime.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionBinding<P> {
    pub peer: P,
    pub correlation_id: CorrelationId,
}

/// Observable outcomes of one wrapper pump.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WrapperPumpEvent {
    /// A creative completed the handshake and is now bound.
    SessionBound,
    /// A format request was confirmed and the format is active.
    Confirmed(FormatId),
    /// A format request was rejected; the reason stays publisher-side.
    Rejected { format: FormatId, reason: RejectReason },
    /// The debounced teardown expired and the wrapper reset itself.
    TeardownExpired,
}

/// Stateful wrapper-side protocol endpoint.
///
/// Owns the wrapper, its channel endpoint, and the session binding; drains
/// inbound envelopes, answers handshakes, and drives the activation state
/// machine for format requests. Unknown actions, undecodable envelopes, and
/// traffic from non-bound peers are ignored — the channel authenticates
/// nothing.
pub struct WrapperRuntime<A: ChannelAdapter> {
    pub wrapper: Wrapper,
    pub adapter: A,
    session: Option<SessionBinding<A::Peer>>,
}

impl<A: ChannelAdapter> WrapperRuntime<A> {
    pub fn new(wrapper: Wrapper, adapter: A) -> Self {
        Self {
            wrapper,
            adapter,
            session: None,
        }
    }

    pub fn session(&self) -> Option<&SessionBinding<A::Peer>> {
        self.session.as_ref()
    }

    /// Drains inbound traffic, then advances the wrapper's timers.
    pub fn pump_once(&mut self, registry: &FormatRegistry, now_step: u64) -> Vec<WrapperPumpEvent> {
        let mut events = Vec::new();
        while let Some((peer, bytes)) = self.adapter.recv() {
            let envelope = match decode_envelope_cbor(&bytes) {
                Ok(envelope) => envelope,
                Err(_) => continue,
            };
            self.handle_envelope(registry, peer, envelope, &mut events);
        }
        if self.wrapper.tick(registry, now_step) {
            events.push(WrapperPumpEvent::TeardownExpired);
        }
        events
    }

    fn handle_envelope(
        &mut self,
        registry: &FormatRegistry,
        peer: A::Peer,
        envelope: EnvelopeV1,
        events: &mut Vec<WrapperPumpEvent>,
    ) {
        match envelope.action {
            Action::SessionInit => self.handle_session_init(peer, envelope.correlation_id, events),
            Action::RequestFormat => {
                self.handle_request_format(registry, peer, envelope, events);
            }
            // Response actions are creative-bound; a wrapper never consumes
            // them.
            Action::SessionAck | Action::FormatConfirmed | Action::FormatRejected => {}
        }
    }

    fn handle_session_init(
        &mut self,
        peer: A::Peer,
        correlation_id: CorrelationId,
        events: &mut Vec<WrapperPumpEvent>,
    ) {
        let retry_from_bound_peer = match &self.session {
            None => false,
            // Handshake retry from the bound creative: re-ack, no rebind.
            Some(binding) if binding.peer == peer => true,
            // A second creative cannot steal the binding.
            Some(_) => return,
        };
        if !retry_from_bound_peer {
            tracing::debug!(
                correlation = %correlation_hex(&correlation_id),
                "binding creative session"
            );
            self.session = Some(SessionBinding {
                peer: peer.clone(),
                correlation_id,
            });
            events.push(WrapperPumpEvent::SessionBound);
        }
        self.reply(&peer, EnvelopeV1::for_session(Action::SessionAck, correlation_id));
    }

    fn handle_request_format(
        &mut self,
        registry: &FormatRegistry,
        peer: A::Peer,
        envelope: EnvelopeV1,
        events: &mut Vec<WrapperPumpEvent>,
    ) {
        let bound = self
            .session
            .as_ref()
            .is_some_and(|binding| binding.peer == peer);
        if !bound {
            return;
        }
        let Some(format) = envelope.format else {
            return;
        };
        match self.wrapper.handle_request(registry, &format) {
            Ok(()) => {
                self.reply(
                    &peer,
                    EnvelopeV1::for_format(
                        Action::FormatConfirmed,
                        envelope.correlation_id,
                        format.clone(),
                    ),
                );
                events.push(WrapperPumpEvent::Confirmed(format));
            }
            Err(reason) => {
                self.reply(
                    &peer,
                    EnvelopeV1::for_format(
                        Action::FormatRejected,
                        envelope.correlation_id,
                        format.clone(),
                    ),
                );
                events.push(WrapperPumpEvent::Rejected { format, reason });
            }
        }
    }

    fn reply(&mut self, peer: &A::Peer, envelope: EnvelopeV1) {
        if let Err(err) = send_envelope(&mut self.adapter, peer, &envelope) {
            tracing::warn!(error = %err, "failed to encode outbound envelope");
        }
    }
}
