//! Deterministic two-context simulation harness for the negotiation
//! protocol: one wrapper runtime and one creative agent wired through
//! routed in-memory channels.

pub mod scenarios;
