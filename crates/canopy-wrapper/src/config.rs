use crate::builtin::builtin_registry;
use crate::integration::FormatIntegration;
use crate::registry::{FormatRecipe, FormatRegistry};

/// Deferred remote-configuration loader (`configUrlResolver` analogue).
///
/// Resolved at most once, before the registry is built.
pub trait RemoteConfigSource {
    /// Additional format recipes fetched from remote configuration.
    fn load_formats(&self) -> Vec<Box<dyn FormatRecipe>>;
}

/// Page-scoped configuration registry.
///
/// Replaces the original global singleton: constructed explicitly once at
/// page start, consumed into the format registry handed by reference to
/// every wrapper created afterwards, and dropped only on page unload.
/// Unrecognized configuration is ignored by construction — the builder only
/// accepts what the wrapper understands.
#[derive(Default)]
pub struct PageConfig {
    custom_formats: Vec<Box<dyn FormatRecipe>>,
    integrations: Vec<Box<dyn FormatIntegration>>,
    remote: Option<Box<dyn RemoteConfigSource>>,
}

impl PageConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a custom format recipe (the `formats` option).
    pub fn with_format(mut self, recipe: Box<dyn FormatRecipe>) -> Self {
        self.custom_formats.push(recipe);
        self
    }

    /// Adds an integration hook (the `formatIntegrations` option).
    ///
    /// Hooks are handed out to the wrapper being configured; they remain a
    /// per-wrapper concern, not a page-global one.
    pub fn with_integration(mut self, integration: Box<dyn FormatIntegration>) -> Self {
        self.integrations.push(integration);
        self
    }

    /// Installs the deferred remote-config loader.
    pub fn with_remote_source(mut self, source: Box<dyn RemoteConfigSource>) -> Self {
        self.remote = Some(source);
        self
    }

    /// Builds the page's format registry: built-ins first, then custom and
    /// remote recipes, so later entries overwrite earlier ones.
    pub fn into_registry(self) -> FormatRegistry {
        self.into_parts().0
    }

    /// Splits the configuration into the shared registry and the
    /// integration hooks to install on the wrapper.
    pub fn into_parts(mut self) -> (FormatRegistry, Vec<Box<dyn FormatIntegration>>) {
        let mut registry = builtin_registry();
        for recipe in self.custom_formats {
            registry.register(recipe);
        }
        if let Some(remote) = self.remote.take() {
            for recipe in remote.load_formats() {
                registry.register(recipe);
            }
        }
        (registry, self.integrations)
    }
}

#[cfg(test)]
mod tests {
    use super::{PageConfig, RemoteConfigSource};
    use crate::integration::HookError;
    use crate::layout::SlotSurface;
    use crate::registry::FormatRecipe;
    use canopy_core::{FormatId, SlotDescriptor};

    struct PlainRecipe {
        id: FormatId,
        description: &'static str,
    }

    impl FormatRecipe for PlainRecipe {
        fn id(&self) -> FormatId {
            self.id.clone()
        }

        fn description(&self) -> &str {
            self.description
        }

        fn setup(
            &self,
            _surface: &mut SlotSurface,
            _slot: Option<&SlotDescriptor>,
        ) -> Result<(), HookError> {
            Ok(())
        }

        fn reset(&self, _surface: &mut SlotSurface) {}
    }

    struct StaticRemote;

    impl RemoteConfigSource for StaticRemote {
        fn load_formats(&self) -> Vec<Box<dyn FormatRecipe>> {
            vec![Box::new(PlainRecipe {
                id: FormatId::TopScroll,
                description: "remote override",
            })]
        }
    }

    #[test]
    fn custom_formats_register_alongside_builtins() {
        let registry = PageConfig::new()
            .with_format(Box::new(PlainRecipe {
                id: FormatId::Custom("TEST_FORMAT".to_string()),
                description: "test format",
            }))
            .into_registry();

        assert!(registry.contains(&FormatId::Custom("TEST_FORMAT".to_string())));
        assert!(registry.contains(&FormatId::TopScroll));
        assert_eq!(registry.len(), 7);
    }

    #[test]
    fn integrations_are_handed_out_for_per_wrapper_installation() {
        struct PassingIntegration;

        impl crate::integration::FormatIntegration for PassingIntegration {
            fn id(&self) -> FormatId {
                FormatId::Skins
            }

            fn setup(&mut self) -> Result<(), crate::integration::HookError> {
                Ok(())
            }
        }

        let (registry, integrations) = PageConfig::new()
            .with_integration(Box::new(PassingIntegration))
            .into_parts();
        assert_eq!(registry.len(), 6);
        assert_eq!(integrations.len(), 1);
        assert_eq!(integrations[0].id(), FormatId::Skins);
    }

    #[test]
    fn remote_recipes_overwrite_builtins_by_identifier() {
        let registry = PageConfig::new()
            .with_remote_source(Box::new(StaticRemote))
            .into_registry();

        let entry = registry.get(&FormatId::TopScroll).expect("entry expected");
        assert_eq!(entry.description(), "remote override");
        assert_eq!(registry.len(), 6);
    }
}
