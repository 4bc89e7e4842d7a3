use canopy_core::{FormatId, SlotDescriptor};

use crate::integration::HookError;
use crate::layout::SlotSurface;
use crate::registry::{FormatRecipe, FormatRegistry};

/// Data-driven recipe shared by all built-in formats.
///
/// The real visual recipes are DOM/CSS work owned by the format packages;
/// here each built-in is the abstract layout mutation the wrapper applies
/// and must symmetrically reverse.
#[derive(Clone)]
struct BuiltinRecipe {
    id: FormatId,
    description: &'static str,
    styles: &'static [(&'static str, &'static str)],
    close_control: bool,
    scroll_cue: bool,
    adopt_slot_markup: bool,
}

impl FormatRecipe for BuiltinRecipe {
    fn id(&self) -> FormatId {
        self.id.clone()
    }

    fn description(&self) -> &str {
        self.description
    }

    fn setup(
        &self,
        surface: &mut SlotSurface,
        slot: Option<&SlotDescriptor>,
    ) -> Result<(), HookError> {
        for (property, value) in self.styles {
            surface.set_style(*property, *value);
        }
        if let Some(slot) = slot {
            surface.set_style("--creative-width", format!("{}px", slot.size.0));
            surface.set_style("--creative-height", format!("{}px", slot.size.1));
            if self.adopt_slot_markup {
                surface.set_content(slot.markup.clone());
            }
        }
        surface.set_close_control(self.close_control);
        surface.set_scroll_cue(self.scroll_cue);
        Ok(())
    }

    fn reset(&self, surface: &mut SlotSurface) {
        surface.set_close_control(false);
        surface.set_scroll_cue(false);
        if self.adopt_slot_markup {
            surface.set_content("");
        }
    }
}

const BUILTINS: &[BuiltinRecipe] = &[
    BuiltinRecipe {
        id: FormatId::TopScroll,
        description: "Full-bleed scroller pinned above the page content",
        styles: &[
            ("height", "100vh"),
            ("position", "sticky"),
            ("top", "0"),
            ("overflow", "hidden"),
        ],
        close_control: true,
        scroll_cue: true,
        adopt_slot_markup: true,
    },
    BuiltinRecipe {
        id: FormatId::Midscroll,
        description: "Full-viewport scroller revealed mid-article",
        styles: &[
            ("height", "100vh"),
            ("position", "relative"),
            ("clip-path", "inset(0)"),
        ],
        close_control: false,
        scroll_cue: false,
        adopt_slot_markup: true,
    },
    BuiltinRecipe {
        id: FormatId::DoubleMidscroll,
        description: "Two-viewport scroller with a parallax hand-off",
        styles: &[
            ("height", "200vh"),
            ("position", "relative"),
            ("clip-path", "inset(0)"),
        ],
        close_control: false,
        scroll_cue: false,
        adopt_slot_markup: true,
    },
    BuiltinRecipe {
        id: FormatId::Skins,
        description: "Page skin framing the publisher content column",
        styles: &[
            ("position", "fixed"),
            ("inset", "0"),
            ("pointer-events", "none"),
            ("z-index", "1"),
        ],
        close_control: false,
        scroll_cue: false,
        adopt_slot_markup: false,
    },
    BuiltinRecipe {
        id: FormatId::Takeover,
        description: "Viewport takeover above all page content",
        styles: &[
            ("position", "fixed"),
            ("inset", "0"),
            ("z-index", "2147483646"),
        ],
        close_control: true,
        scroll_cue: false,
        adopt_slot_markup: true,
    },
    BuiltinRecipe {
        id: FormatId::WelcomePage,
        description: "Interstitial welcome page shown before the content",
        styles: &[
            ("position", "fixed"),
            ("inset", "0"),
            ("background", "rgba(0,0,0,0.85)"),
            ("z-index", "2147483646"),
        ],
        close_control: true,
        scroll_cue: false,
        adopt_slot_markup: true,
    },
];

/// Registry pre-populated with every built-in format recipe.
pub fn builtin_registry() -> FormatRegistry {
    let mut registry = FormatRegistry::new();
    for builtin in BUILTINS {
        registry.register(Box::new(builtin.clone()));
    }
    registry
}
