//! Canopy wire codec primitives.
//!
//! Defines the canonical cross-context envelope schema and CBOR
//! encode/decode helpers. Envelopes are the only contract between the
//! publisher-side wrapper and the creative-side agent.

pub mod envelope;
pub mod error;
