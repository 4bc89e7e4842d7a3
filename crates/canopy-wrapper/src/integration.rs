use thiserror::Error;

use canopy_core::FormatId;

/// Failure outcome of a setup hook.
///
/// Hook failures are recoverable control flow, never panics: the wrapper
/// reverses partial work and surfaces a rejection to the creative.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("hook failed: {0}")]
pub struct HookError(pub String);

impl HookError {
    pub fn new(reason: impl Into<String>) -> Self {
        Self(reason.into())
    }
}

/// Publisher-supplied adaptation hook for one format.
///
/// Composed with the format's own recipe: `setup` runs before the recipe's
/// visual setup and may veto the activation. `close` fires only on an
/// explicit close; `reset` fires on every reversal where `setup` completed.
/// Neither is invoked when `setup` itself failed.
pub trait FormatIntegration {
    /// Format this hook adapts.
    fn id(&self) -> FormatId;

    /// Opaque publisher configuration bag.
    fn options(&self) -> serde_json::Value {
        serde_json::Value::Null
    }

    /// Pre-activation adaptation; a failure vetoes the format.
    fn setup(&mut self) -> Result<(), HookError>;

    /// Explicit-close signal.
    fn close(&mut self) {}

    /// Reversal of completed setup work.
    fn reset(&mut self) {}
}
