//! Core Canopy primitives shared across crates.
//!
//! Includes format identifiers, correlation ids, slot descriptors, and base
//! errors.

pub mod error;
pub mod format;
pub mod ids;
pub mod slot;

pub use error::CanopyError;
pub use format::FormatId;
pub use ids::{new_correlation_id, CorrelationId};
pub use slot::SlotDescriptor;
