use std::collections::VecDeque;
use std::hash::Hash;

use canopy_codec::envelope::{encode_envelope_cbor, EnvelopeV1};
use canopy_codec::error::CodecError;

/// Coarse per-channel health counters for developer diagnostics.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChannelHealthSnapshot {
    pub outbound_send_ok: u64,
    pub outbound_send_err: u64,
    pub inbound_received: u64,
}

/// Byte-oriented cross-context channel contract.
///
/// Delivery is best-effort with wildcard trust: no acknowledgment, no
/// ordering guarantee, and no sender authentication. Every consumer must
/// validate action and correlation before acting on inbound bytes.
pub trait ChannelAdapter {
    /// Opaque peer handle addressing one cross-context destination.
    type Peer: Clone + Eq + Hash;
    /// Channel-specific send error.
    type Error;

    /// Attempts best-effort delivery of a byte payload to a peer.
    fn send(&mut self, peer: &Self::Peer, bytes: &[u8]) -> Result<(), Self::Error>;
    /// Returns the next inbound payload and its sending peer.
    fn recv(&mut self) -> Option<(Self::Peer, Vec<u8>)>;

    /// Best-effort channel health counters.
    fn health_snapshot(&self) -> ChannelHealthSnapshot {
        ChannelHealthSnapshot::default()
    }
}

/// Encodes an envelope and sends it over the channel.
///
/// Send failures are swallowed: the channel is best-effort and the protocol
/// recovers through timeouts, not delivery errors.
pub fn send_envelope<A: ChannelAdapter>(
    adapter: &mut A,
    peer: &A::Peer,
    envelope: &EnvelopeV1,
) -> Result<(), CodecError> {
    let bytes = encode_envelope_cbor(envelope)?;
    let _ = adapter.send(peer, &bytes);
    Ok(())
}

/// In-memory channel for tests and simulations.
#[derive(Debug, Default, Clone)]
pub struct InMemoryChannel {
    inbound: VecDeque<(String, Vec<u8>)>,
    outbound: Vec<(String, Vec<u8>)>,
    drop_outbound: bool,
    send_ok: u64,
    send_err: u64,
    recv_ok: u64,
}

impl InMemoryChannel {
    /// Queues bytes as inbound traffic from `peer`.
    pub fn enqueue_inbound(&mut self, peer: impl Into<String>, bytes: Vec<u8>) {
        self.inbound.push_back((peer.into(), bytes));
    }

    /// Drains and returns all outbound sends captured so far.
    pub fn take_outbound(&mut self) -> Vec<(String, Vec<u8>)> {
        std::mem::take(&mut self.outbound)
    }

    /// If enabled, outbound sends are dropped (best-effort loss simulation).
    pub fn set_drop_outbound(&mut self, drop_outbound: bool) {
        self.drop_outbound = drop_outbound;
    }
}

impl ChannelAdapter for InMemoryChannel {
    type Peer = String;
    type Error = &'static str;

    fn send(&mut self, peer: &Self::Peer, bytes: &[u8]) -> Result<(), Self::Error> {
        if self.drop_outbound {
            self.send_err += 1;
            return Ok(());
        }
        self.outbound.push((peer.clone(), bytes.to_vec()));
        self.send_ok += 1;
        Ok(())
    }

    fn recv(&mut self) -> Option<(Self::Peer, Vec<u8>)> {
        let msg = self.inbound.pop_front();
        if msg.is_some() {
            self.recv_ok += 1;
        }
        msg
    }

    fn health_snapshot(&self) -> ChannelHealthSnapshot {
        ChannelHealthSnapshot {
            outbound_send_ok: self.send_ok,
            outbound_send_err: self.send_err,
            inbound_received: self.recv_ok,
        }
    }
}

/// Routes all captured outbound messages from one in-memory channel into
/// another channel's inbound queue, tagging them as sent by `from_peer`.
pub fn route_in_memory_outbound(
    from_channel: &mut InMemoryChannel,
    to_channel: &mut InMemoryChannel,
    from_peer: impl Into<String>,
) -> usize {
    let from_peer = from_peer.into();
    let outbound = from_channel.take_outbound();
    let moved = outbound.len();
    for (_, bytes) in outbound {
        to_channel.enqueue_inbound(from_peer.clone(), bytes);
    }
    moved
}
