use std::collections::BTreeMap;

/// Ordered layout-property snapshot used for baseline comparison.
pub type LayoutSnapshot = BTreeMap<String, String>;

/// Abstract stand-in for the wrapper's host element and its internal layer.
///
/// Format recipes are the only mutators; the wrapper captures a baseline
/// before setup and `restore_layout` puts the properties back bit-for-bit.
#[derive(Debug, Default, Clone)]
pub struct SlotSurface {
    layout: BTreeMap<String, String>,
    content: String,
    close_control_visible: bool,
    scroll_cue_visible: bool,
}

impl SlotSurface {
    /// Sets one layout property.
    pub fn set_style(&mut self, property: impl Into<String>, value: impl Into<String>) {
        self.layout.insert(property.into(), value.into());
    }

    /// Removes one layout property.
    pub fn clear_style(&mut self, property: &str) {
        self.layout.remove(property);
    }

    /// Reads one layout property.
    pub fn style(&self, property: &str) -> Option<&str> {
        self.layout.get(property).map(String::as_str)
    }

    /// Clones the current layout properties.
    pub fn layout_snapshot(&self) -> LayoutSnapshot {
        self.layout.clone()
    }

    /// Replaces the layout properties with a previously captured snapshot.
    pub fn restore_layout(&mut self, snapshot: LayoutSnapshot) {
        self.layout = snapshot;
    }

    /// Replaces the ad-facing content region.
    pub fn set_content(&mut self, markup: impl Into<String>) {
        self.content = markup.into();
    }

    pub fn content(&self) -> &str {
        &self.content
    }

    /// Standard-UI close control on the wrapper's internal layer.
    pub fn set_close_control(&mut self, visible: bool) {
        self.close_control_visible = visible;
    }

    pub fn close_control_visible(&self) -> bool {
        self.close_control_visible
    }

    /// Standard-UI scroll-cue control on the wrapper's internal layer.
    pub fn set_scroll_cue(&mut self, visible: bool) {
        self.scroll_cue_visible = visible;
    }

    pub fn scroll_cue_visible(&self) -> bool {
        self.scroll_cue_visible
    }
}
