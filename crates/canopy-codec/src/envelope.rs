use serde::{Deserialize, Serialize};

use canopy_core::{CorrelationId, FormatId};

use crate::error::CodecError;

/// Envelope schema version for `EnvelopeV1`.
pub const ENVELOPE_V1_VERSION: u16 = 1;

/// Closed set of cross-context protocol actions.
///
/// Decoding an envelope whose action is outside this set fails, and every
/// consumer treats that failure as "ignore the envelope" rather than an
/// error: the channel is broadcast-style and unauthenticated, so unknown
/// traffic is expected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Action {
    SessionInit,
    SessionAck,
    RequestFormat,
    FormatConfirmed,
    FormatRejected,
}

impl Action {
    /// Whether envelopes with this action must carry a format identifier.
    pub fn requires_format(self) -> bool {
        matches!(
            self,
            Action::RequestFormat | Action::FormatConfirmed | Action::FormatRejected
        )
    }
}

/// One cross-context protocol message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnvelopeV1 {
    /// Wire version.
    pub version: u16,
    /// Protocol action.
    pub action: Action,
    /// Correlates a response with its request.
    pub correlation_id: CorrelationId,
    /// Format identifier for format-bearing actions.
    pub format: Option<FormatId>,
    /// Opaque payload bytes, action-specific.
    pub payload: Option<Vec<u8>>,
}

impl EnvelopeV1 {
    /// Builds a format-bearing envelope.
    pub fn for_format(action: Action, correlation_id: CorrelationId, format: FormatId) -> Self {
        Self {
            version: ENVELOPE_V1_VERSION,
            action,
            correlation_id,
            format: Some(format),
            payload: None,
        }
    }

    /// Builds a session-phase envelope with no format.
    pub fn for_session(action: Action, correlation_id: CorrelationId) -> Self {
        Self {
            version: ENVELOPE_V1_VERSION,
            action,
            correlation_id,
            format: None,
            payload: None,
        }
    }

    /// Validates envelope invariants.
    pub fn validate(&self) -> Result<(), CodecError> {
        if self.version != ENVELOPE_V1_VERSION {
            return Err(CodecError::InvalidEnvelope("unsupported envelope version"));
        }
        if self.action.requires_format() && self.format.is_none() {
            return Err(CodecError::InvalidEnvelope(
                "format-bearing action without format",
            ));
        }
        Ok(())
    }
}

/// Encodes an `EnvelopeV1` as CBOR after validation.
pub fn encode_envelope_cbor(envelope: &EnvelopeV1) -> Result<Vec<u8>, CodecError> {
    envelope.validate()?;
    let mut bytes = Vec::new();
    ciborium::ser::into_writer(envelope, &mut bytes)
        .map_err(|e| CodecError::Encode(e.to_string()))?;
    Ok(bytes)
}

/// Decodes and validates a CBOR envelope.
pub fn decode_envelope_cbor(bytes: &[u8]) -> Result<EnvelopeV1, CodecError> {
    let envelope: EnvelopeV1 =
        ciborium::de::from_reader(bytes).map_err(|e| CodecError::Decode(e.to_string()))?;
    envelope.validate()?;
    Ok(envelope)
}
