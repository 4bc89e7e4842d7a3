use serde::{Deserialize, Serialize};

/// Normalized ad metadata produced by a demand-side-platform adapter.
///
/// Read-only input to format setup; the wrapper never mutates it and never
/// reaches back into platform-specific globals itself.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SlotDescriptor {
    /// Stable identifier of the rendered ad element.
    pub element_id: String,
    /// Rendered size as `(width, height)` in pixels.
    pub size: (u32, u32),
    /// Ad markup, or a reference to it.
    pub markup: String,
    /// Originating adapter plugin name.
    pub plugin_name: String,
}
