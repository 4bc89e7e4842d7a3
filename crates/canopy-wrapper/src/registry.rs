use std::collections::HashMap;

use canopy_core::{FormatId, SlotDescriptor};

use crate::integration::HookError;
use crate::layout::SlotSurface;

/// Visual recipe for one format: symmetric setup/reset against the wrapper
/// surface and, when available, the rendered ad element's descriptor.
pub trait FormatRecipe {
    fn id(&self) -> FormatId;
    fn description(&self) -> &str;
    /// Applies the format's layout/content changes; a failure aborts the
    /// activation and triggers reversal.
    fn setup(&self, surface: &mut SlotSurface, slot: Option<&SlotDescriptor>)
        -> Result<(), HookError>;
    /// Reverses recipe-specific side effects (layout properties themselves
    /// are restored from the wrapper's baseline).
    fn reset(&self, surface: &mut SlotSurface);
}

/// Lookup table from format identifier to visual recipe.
///
/// Duplicate registration for the same identifier overwrites the previous
/// entry; custom recipes register alongside the built-ins.
#[derive(Default)]
pub struct FormatRegistry {
    entries: HashMap<FormatId, Box<dyn FormatRecipe>>,
}

impl FormatRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a recipe under its own identifier, overwriting any
    /// previous entry.
    pub fn register(&mut self, recipe: Box<dyn FormatRecipe>) {
        self.entries.insert(recipe.id(), recipe);
    }

    pub fn get(&self, id: &FormatId) -> Option<&dyn FormatRecipe> {
        self.entries.get(id).map(|recipe| &**recipe)
    }

    pub fn contains(&self, id: &FormatId) -> bool {
        self.entries.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Static description of all registered formats for external tooling.
    ///
    /// Not part of the runtime protocol; consumed by build-time tooling.
    pub fn manifest(&self) -> serde_json::Value {
        let mut formats: Vec<serde_json::Value> = self
            .entries
            .values()
            .map(|recipe| {
                serde_json::json!({
                    "id": recipe.id().as_str(),
                    "description": recipe.description(),
                })
            })
            .collect();
        formats.sort_by(|a, b| a["id"].as_str().cmp(&b["id"].as_str()));
        serde_json::json!({ "formats": formats })
    }
}
