use std::collections::{HashMap, HashSet};

use canopy_core::SlotDescriptor;

/// Depth guard for ancestor walks over the embedded-document tree.
///
/// The original adapter walked `window.parent` chains recursively; hostile
/// or cyclic input must terminate, so the traversal is bounded.
pub const MAX_ANCESTOR_DEPTH: usize = 10;

/// Demand-side-platform adapter boundary.
///
/// An adapter resolves the rendered ad behind `source_element_id` into a
/// normalized descriptor. `None` means "no slot" — an adapter mismatch is
/// not an error.
pub trait SlotAdapter {
    /// Name of the originating plugin, stamped into descriptors.
    fn plugin_name(&self) -> &str;
    /// Resolves a descriptor for the given source element, if this adapter
    /// recognizes it.
    fn resolve_slot(&self, source_element_id: &str) -> Option<SlotDescriptor>;
}

/// Explicit ownership tree of embedded documents.
///
/// Nodes are element identifiers; edges point from a nested document to the
/// document that embeds it. Slots are bound to the node that hosts them.
#[derive(Debug, Default)]
pub struct EmbedTree {
    parents: HashMap<String, String>,
    slots: HashMap<String, SlotDescriptor>,
}

impl EmbedTree {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records that `child` is embedded inside `parent`.
    pub fn insert_edge(&mut self, child: impl Into<String>, parent: impl Into<String>) {
        self.parents.insert(child.into(), parent.into());
    }

    /// Binds a slot descriptor to a hosting node.
    pub fn bind_slot(&mut self, node: impl Into<String>, descriptor: SlotDescriptor) {
        self.slots.insert(node.into(), descriptor);
    }

    /// Walks from `start` toward the root looking for a bound slot.
    ///
    /// The walk visits at most `MAX_ANCESTOR_DEPTH` ancestors and stops on
    /// a repeated node, so cyclic parent links terminate.
    pub fn find_hosting_slot(&self, start: &str) -> Option<&SlotDescriptor> {
        let mut visited: HashSet<&str> = HashSet::new();
        let mut node = start;
        for _ in 0..=MAX_ANCESTOR_DEPTH {
            if let Some(descriptor) = self.slots.get(node) {
                return Some(descriptor);
            }
            if !visited.insert(node) {
                return None;
            }
            node = self.parents.get(node)?;
        }
        None
    }
}

/// Slot adapter backed by an embed tree, for simulations and tests.
pub struct TreeSlotAdapter {
    tree: EmbedTree,
    plugin: String,
}

impl TreeSlotAdapter {
    pub fn new(tree: EmbedTree, plugin: impl Into<String>) -> Self {
        Self {
            tree,
            plugin: plugin.into(),
        }
    }
}

impl SlotAdapter for TreeSlotAdapter {
    fn plugin_name(&self) -> &str {
        &self.plugin
    }

    fn resolve_slot(&self, source_element_id: &str) -> Option<SlotDescriptor> {
        self.tree.find_hosting_slot(source_element_id).cloned()
    }
}
