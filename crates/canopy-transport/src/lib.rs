//! Cross-context channel abstraction for Canopy.
//!
//! The platform channel is best-effort, unordered, and unauthenticated;
//! correlation and timeouts live in the protocol layers above.

pub mod adapter;
