use std::collections::{HashMap, HashSet};

use canopy_core::{FormatId, SlotDescriptor};

use crate::integration::FormatIntegration;
use crate::layout::{LayoutSnapshot, SlotSurface};
use crate::policy::{evaluate_policy, parse_format_list, RejectReason};
use crate::registry::FormatRegistry;

/// Activation lifecycle of one wrapper instance.
///
/// `Idle` is both initial and final; the intermediate states are traversed
/// strictly sequentially within one activation, and any request arriving
/// while the machine is away from `Idle` is rejected, never queued.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActivationState {
    Idle,
    AwaitingPolicyCheck,
    AwaitingIntegrationSetup,
    AwaitingFormatSetup,
    Active,
    Closing,
    Resetting,
}

/// Per-wrapper policy and lifecycle tunables.
#[derive(Debug, Clone)]
pub struct WrapperConfig {
    /// Allow-list; empty means every format is allowed.
    pub allowed_formats: HashSet<FormatId>,
    /// Exclusions; always win over the allow-list.
    pub excluded_formats: HashSet<FormatId>,
    /// Debounce window between detach and teardown, in abstract steps.
    pub teardown_debounce_steps: u64,
}

impl Default for WrapperConfig {
    fn default() -> Self {
        Self {
            allowed_formats: HashSet::new(),
            excluded_formats: HashSet::new(),
            teardown_debounce_steps: 4,
        }
    }
}

impl WrapperConfig {
    /// Reads the `allowed-formats` / `exclude-formats` element attributes.
    pub fn from_attributes(allowed: Option<&str>, excluded: Option<&str>) -> Self {
        Self {
            allowed_formats: allowed.map(parse_format_list).unwrap_or_default(),
            excluded_formats: excluded.map(parse_format_list).unwrap_or_default(),
            ..Self::default()
        }
    }
}

/// Publisher-side host for one ad slot's format lifecycle.
///
/// Transport-free: envelope handling lives in `runtime::WrapperRuntime`,
/// which drives this machine. `force_format` and `simulate_format` drive it
/// directly with no creative present.
pub struct Wrapper {
    config: WrapperConfig,
    state: ActivationState,
    current_format: Option<FormatId>,
    surface: SlotSurface,
    baseline: Option<LayoutSnapshot>,
    integrations: HashMap<FormatId, Box<dyn FormatIntegration>>,
    integration_ran: bool,
    slot: Option<SlotDescriptor>,
    attached: bool,
    pending_teardown: Option<u64>,
}

impl Wrapper {
    /// Creates a mounted wrapper.
    pub fn new(config: WrapperConfig) -> Self {
        Self {
            config,
            state: ActivationState::Idle,
            current_format: None,
            surface: SlotSurface::default(),
            baseline: None,
            integrations: HashMap::new(),
            integration_ran: false,
            slot: None,
            attached: true,
            pending_teardown: None,
        }
    }

    pub fn state(&self) -> ActivationState {
        self.state
    }

    pub fn current_format(&self) -> Option<&FormatId> {
        self.current_format.as_ref()
    }

    pub fn surface(&self) -> &SlotSurface {
        &self.surface
    }

    pub fn surface_mut(&mut self) -> &mut SlotSurface {
        &mut self.surface
    }

    pub fn is_attached(&self) -> bool {
        self.attached
    }

    pub fn teardown_pending(&self) -> bool {
        self.pending_teardown.is_some()
    }

    /// Installs this wrapper's integration hook for one format.
    ///
    /// Integrations are per wrapper instance, so the same format can carry
    /// different publisher adaptation on different pages.
    pub fn set_integration(&mut self, integration: Box<dyn FormatIntegration>) {
        self.integrations.insert(integration.id(), integration);
    }

    /// Supplies the slot descriptor produced by the adapter boundary.
    pub fn set_slot(&mut self, slot: Option<SlotDescriptor>) {
        self.slot = slot;
    }

    pub fn slot(&self) -> Option<&SlotDescriptor> {
        self.slot.as_ref()
    }

    pub fn allowed_formats(&self) -> &HashSet<FormatId> {
        &self.config.allowed_formats
    }

    /// Replaces the allow-list. Never retroactive: an already active format
    /// stays active.
    pub fn set_allowed_formats(&mut self, formats: impl IntoIterator<Item = FormatId>) {
        self.config.allowed_formats = formats.into_iter().collect();
    }

    /// Replaces the ad-facing content region. Purely a content operation;
    /// no state-machine effect.
    pub fn change_content(&mut self, markup: impl Into<String>) {
        self.surface.set_content(markup);
    }

    /// Restores the layout properties to the pre-activation baseline.
    ///
    /// Part of every reversal, and public so custom recipes can guarantee
    /// symmetric cleanup themselves.
    pub fn reset_css(&mut self) {
        if let Some(baseline) = self.baseline.take() {
            self.surface.restore_layout(baseline);
        }
    }

    /// Full request path: policy check, integration setup, format setup.
    ///
    /// This is what a live `REQUEST_FORMAT` runs; `simulate_format` is the
    /// sessionless developer entry point to the same path.
    pub fn handle_request(
        &mut self,
        registry: &FormatRegistry,
        format: &FormatId,
    ) -> Result<(), RejectReason> {
        if self.state != ActivationState::Idle {
            tracing::debug!(%format, state = ?self.state, "request rejected: wrapper busy");
            return Err(RejectReason::AlreadyActive);
        }
        self.state = ActivationState::AwaitingPolicyCheck;
        if let Err(reason) = self.check_policy(registry, format) {
            tracing::debug!(%format, %reason, "request rejected by policy");
            self.state = ActivationState::Idle;
            return Err(reason);
        }
        self.run_setup(registry, format)
    }

    /// Developer/test twin of a live `REQUEST_FORMAT`: same policy checks,
    /// no creative session required.
    pub fn simulate_format(
        &mut self,
        registry: &FormatRegistry,
        format: &FormatId,
    ) -> Result<(), RejectReason> {
        self.handle_request(registry, format)
    }

    /// Host-driven activation bypassing policy and the creative handshake.
    ///
    /// If a different format is active it is implicitly reset first; setup
    /// failures reverse partial work exactly like the normal path.
    pub fn force_format(
        &mut self,
        registry: &FormatRegistry,
        format: &FormatId,
    ) -> Result<(), RejectReason> {
        if !registry.contains(format) {
            return Err(RejectReason::UnknownFormat);
        }
        if self.state == ActivationState::Active {
            self.reset(registry);
        }
        self.run_setup(registry, format)
    }

    /// Explicit close: user control, forced-close API, or publisher request.
    /// Returns whether a format was actually torn down.
    pub fn close(&mut self, registry: &FormatRegistry) -> bool {
        self.reverse(registry, ActivationState::Closing, true)
    }

    /// Reversal without the explicit user-close signal (teardown expiry or
    /// an explicit reset call).
    pub fn reset(&mut self, registry: &FormatRegistry) -> bool {
        self.reverse(registry, ActivationState::Resetting, false)
    }

    /// Lifecycle: the wrapper (re)entered the document.
    ///
    /// Cancels a pending debounced teardown, preserving `current_format`
    /// untouched; this is what makes DOM reparenting loss-free.
    pub fn on_attach(&mut self, _now_step: u64) {
        self.attached = true;
        if self.pending_teardown.take().is_some() {
            tracing::debug!("teardown cancelled by remount");
        }
    }

    /// Lifecycle: the wrapper left the document.
    ///
    /// With a format active, teardown is debounced rather than immediate so
    /// an unmount/remount pair within the window is a no-op.
    pub fn on_detach(&mut self, now_step: u64) {
        self.attached = false;
        if self.state == ActivationState::Active && self.pending_teardown.is_none() {
            self.pending_teardown = Some(now_step + self.config.teardown_debounce_steps);
        }
    }

    /// Fires the debounced teardown once its deadline passes while the
    /// wrapper is still detached. Returns whether a reversal ran.
    pub fn tick(&mut self, registry: &FormatRegistry, now_step: u64) -> bool {
        let Some(deadline) = self.pending_teardown else {
            return false;
        };
        if self.attached || now_step < deadline {
            return false;
        }
        self.pending_teardown = None;
        tracing::debug!("debounced teardown expired; resetting wrapper");
        self.reset(registry)
    }

    /// Permanent unmount: cancels any timer and reverses immediately. The
    /// wrapper stays detached afterwards.
    pub fn destroy(&mut self, registry: &FormatRegistry) {
        self.attached = false;
        self.pending_teardown = None;
        self.reset(registry);
    }

    fn check_policy(
        &self,
        registry: &FormatRegistry,
        format: &FormatId,
    ) -> Result<(), RejectReason> {
        evaluate_policy(
            &self.config.allowed_formats,
            &self.config.excluded_formats,
            format,
        )?;
        if self.current_format.is_some() {
            return Err(RejectReason::AlreadyActive);
        }
        if !registry.contains(format) {
            return Err(RejectReason::UnknownFormat);
        }
        Ok(())
    }

    fn run_setup(
        &mut self,
        registry: &FormatRegistry,
        format: &FormatId,
    ) -> Result<(), RejectReason> {
        self.state = ActivationState::AwaitingIntegrationSetup;
        let mut integration_ran = false;
        if let Some(integration) = self.integrations.get_mut(format) {
            if let Err(err) = integration.setup() {
                // Setup never completed, so close/reset are not invoked.
                tracing::warn!(%format, error = %err, "integration setup failed");
                self.state = ActivationState::Idle;
                return Err(RejectReason::IntegrationSetup(err.0));
            }
            integration_ran = true;
        }

        self.state = ActivationState::AwaitingFormatSetup;
        self.baseline = Some(self.surface.layout_snapshot());
        let Some(recipe) = registry.get(format) else {
            // force_format pre-checks this; the normal path cannot get here.
            self.baseline = None;
            self.state = ActivationState::Idle;
            return Err(RejectReason::UnknownFormat);
        };
        if let Err(err) = recipe.setup(&mut self.surface, self.slot.as_ref()) {
            tracing::warn!(%format, error = %err, "format setup failed");
            // Same reversal order as `reverse`: the recipe undoes its
            // non-layout side effects (controls, adopted markup), then the
            // baseline restores layout.
            recipe.reset(&mut self.surface);
            self.reset_css();
            if integration_ran {
                if let Some(integration) = self.integrations.get_mut(format) {
                    integration.reset();
                }
            }
            self.state = ActivationState::Idle;
            return Err(RejectReason::FormatSetup(err.0));
        }

        self.integration_ran = integration_ran;
        self.current_format = Some(format.clone());
        self.state = ActivationState::Active;
        Ok(())
    }

    fn reverse(
        &mut self,
        registry: &FormatRegistry,
        phase: ActivationState,
        explicit_close: bool,
    ) -> bool {
        let Some(format) = self.current_format.take() else {
            return false;
        };
        self.state = phase;
        if let Some(recipe) = registry.get(&format) {
            recipe.reset(&mut self.surface);
        }
        self.reset_css();
        if self.integration_ran {
            if let Some(integration) = self.integrations.get_mut(&format) {
                if explicit_close {
                    integration.close();
                }
                integration.reset();
            }
        }
        self.integration_ran = false;
        self.state = ActivationState::Idle;
        true
    }
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;
    use std::rc::Rc;

    use canopy_core::{FormatId, SlotDescriptor};

    use super::{ActivationState, Wrapper, WrapperConfig};
    use crate::builtin::builtin_registry;
    use crate::integration::{FormatIntegration, HookError};
    use crate::layout::SlotSurface;
    use crate::policy::RejectReason;
    use crate::registry::{FormatRecipe, FormatRegistry};

    #[derive(Default)]
    struct HookLog {
        calls: Vec<&'static str>,
    }

    struct RecordingIntegration {
        id: FormatId,
        fail_setup: bool,
        log: Rc<RefCell<HookLog>>,
    }

    impl FormatIntegration for RecordingIntegration {
        fn id(&self) -> FormatId {
            self.id.clone()
        }

        fn setup(&mut self) -> Result<(), HookError> {
            self.log.borrow_mut().calls.push("integration.setup");
            if self.fail_setup {
                return Err(HookError::new("vetoed"));
            }
            Ok(())
        }

        fn close(&mut self) {
            self.log.borrow_mut().calls.push("integration.close");
        }

        fn reset(&mut self) {
            self.log.borrow_mut().calls.push("integration.reset");
        }
    }

    struct FailingRecipe;

    impl FormatRecipe for FailingRecipe {
        fn id(&self) -> FormatId {
            FormatId::Custom("BROKEN".to_string())
        }

        fn description(&self) -> &str {
            "always fails setup after touching layout"
        }

        fn setup(
            &self,
            surface: &mut SlotSurface,
            _slot: Option<&SlotDescriptor>,
        ) -> Result<(), HookError> {
            surface.set_style("height", "100vh");
            Err(HookError::new("broken recipe"))
        }

        fn reset(&self, _surface: &mut SlotSurface) {}
    }

    /// Fails setup only after mutating surface state the layout baseline
    /// does not cover.
    struct MessyFailingRecipe;

    impl FormatRecipe for MessyFailingRecipe {
        fn id(&self) -> FormatId {
            FormatId::Custom("MESSY".to_string())
        }

        fn description(&self) -> &str {
            "fails setup after toggling controls and adopting markup"
        }

        fn setup(
            &self,
            surface: &mut SlotSurface,
            _slot: Option<&SlotDescriptor>,
        ) -> Result<(), HookError> {
            surface.set_style("height", "100vh");
            surface.set_close_control(true);
            surface.set_scroll_cue(true);
            surface.set_content("<div>half-rendered creative</div>");
            Err(HookError::new("failed mid-setup"))
        }

        fn reset(&self, surface: &mut SlotSurface) {
            surface.set_close_control(false);
            surface.set_scroll_cue(false);
            surface.set_content("");
        }
    }

    fn wrapper() -> Wrapper {
        Wrapper::new(WrapperConfig::default())
    }

    #[test]
    fn successful_activation_reaches_active() {
        let registry = builtin_registry();
        let mut wrapper = wrapper();
        wrapper
            .handle_request(&registry, &FormatId::TopScroll)
            .expect("activation should succeed");
        assert_eq!(wrapper.state(), ActivationState::Active);
        assert_eq!(wrapper.current_format(), Some(&FormatId::TopScroll));
    }

    #[test]
    fn second_request_while_active_is_rejected_not_queued() {
        let registry = builtin_registry();
        let mut wrapper = wrapper();
        wrapper
            .handle_request(&registry, &FormatId::TopScroll)
            .expect("first activation should succeed");
        assert_eq!(
            wrapper.handle_request(&registry, &FormatId::Skins),
            Err(RejectReason::AlreadyActive)
        );
        assert_eq!(wrapper.current_format(), Some(&FormatId::TopScroll));
    }

    #[test]
    fn excluded_format_is_rejected_before_any_hook() {
        let registry = builtin_registry();
        let log = Rc::new(RefCell::new(HookLog::default()));
        let mut wrapper = Wrapper::new(WrapperConfig::from_attributes(None, Some("topscroll")));
        wrapper.set_integration(Box::new(RecordingIntegration {
            id: FormatId::TopScroll,
            fail_setup: false,
            log: Rc::clone(&log),
        }));

        assert_eq!(
            wrapper.handle_request(&registry, &FormatId::TopScroll),
            Err(RejectReason::Excluded)
        );
        assert!(log.borrow().calls.is_empty(), "no hook may run");
        assert_eq!(wrapper.state(), ActivationState::Idle);
    }

    #[test]
    fn integration_veto_skips_format_hooks_and_integration_teardown() {
        let registry = builtin_registry();
        let log = Rc::new(RefCell::new(HookLog::default()));
        let mut wrapper = wrapper();
        wrapper.set_integration(Box::new(RecordingIntegration {
            id: FormatId::Midscroll,
            fail_setup: true,
            log: Rc::clone(&log),
        }));

        let baseline = wrapper.surface().layout_snapshot();
        assert!(matches!(
            wrapper.handle_request(&registry, &FormatId::Midscroll),
            Err(RejectReason::IntegrationSetup(_))
        ));
        assert_eq!(log.borrow().calls, vec!["integration.setup"]);
        assert_eq!(wrapper.state(), ActivationState::Idle);
        assert_eq!(wrapper.surface().layout_snapshot(), baseline);
    }

    #[test]
    fn format_setup_failure_reverses_layout_and_integration() {
        let mut registry = FormatRegistry::new();
        registry.register(Box::new(FailingRecipe));
        let log = Rc::new(RefCell::new(HookLog::default()));
        let broken = FormatId::Custom("BROKEN".to_string());

        let mut wrapper = wrapper();
        wrapper.set_integration(Box::new(RecordingIntegration {
            id: broken.clone(),
            fail_setup: false,
            log: Rc::clone(&log),
        }));
        wrapper.surface_mut().set_style("height", "250px");
        let baseline = wrapper.surface().layout_snapshot();

        assert!(matches!(
            wrapper.handle_request(&registry, &broken),
            Err(RejectReason::FormatSetup(_))
        ));
        assert_eq!(
            log.borrow().calls,
            vec!["integration.setup", "integration.reset"],
            "close must not fire on setup failure"
        );
        assert_eq!(wrapper.surface().layout_snapshot(), baseline);
        assert_eq!(wrapper.state(), ActivationState::Idle);
    }

    #[test]
    fn format_setup_failure_reverses_non_layout_side_effects() {
        let mut registry = FormatRegistry::new();
        registry.register(Box::new(MessyFailingRecipe));
        let messy = FormatId::Custom("MESSY".to_string());

        let mut wrapper = wrapper();
        let baseline = wrapper.surface().layout_snapshot();
        assert!(matches!(
            wrapper.handle_request(&registry, &messy),
            Err(RejectReason::FormatSetup(_))
        ));
        assert!(
            !wrapper.surface().close_control_visible(),
            "close control must be reversed after setup failure"
        );
        assert!(!wrapper.surface().scroll_cue_visible());
        assert_eq!(wrapper.surface().content(), "");
        assert_eq!(wrapper.surface().layout_snapshot(), baseline);
        assert_eq!(wrapper.state(), ActivationState::Idle);
    }

    #[test]
    fn close_runs_full_reversal_in_order() {
        let registry = builtin_registry();
        let log = Rc::new(RefCell::new(HookLog::default()));
        let mut wrapper = wrapper();
        wrapper.set_integration(Box::new(RecordingIntegration {
            id: FormatId::Takeover,
            fail_setup: false,
            log: Rc::clone(&log),
        }));
        wrapper.surface_mut().set_style("height", "250px");
        let baseline = wrapper.surface().layout_snapshot();

        wrapper
            .handle_request(&registry, &FormatId::Takeover)
            .expect("activation should succeed");
        assert!(wrapper.close(&registry));
        assert_eq!(
            log.borrow().calls,
            vec!["integration.setup", "integration.close", "integration.reset"]
        );
        assert_eq!(wrapper.surface().layout_snapshot(), baseline);
        assert_eq!(wrapper.state(), ActivationState::Idle);
        assert!(wrapper.current_format().is_none());
    }

    #[test]
    fn reset_skips_the_explicit_close_signal() {
        let registry = builtin_registry();
        let log = Rc::new(RefCell::new(HookLog::default()));
        let mut wrapper = wrapper();
        wrapper.set_integration(Box::new(RecordingIntegration {
            id: FormatId::Takeover,
            fail_setup: false,
            log: Rc::clone(&log),
        }));

        wrapper
            .handle_request(&registry, &FormatId::Takeover)
            .expect("activation should succeed");
        assert!(wrapper.reset(&registry));
        assert_eq!(
            log.borrow().calls,
            vec!["integration.setup", "integration.reset"]
        );
    }

    #[test]
    fn force_format_bypasses_policy_and_resets_an_active_format() {
        let registry = builtin_registry();
        // Policy would reject everything but WELCOME_PAGE.
        let mut wrapper = Wrapper::new(WrapperConfig::from_attributes(
            Some("welcome_page"),
            None,
        ));
        wrapper
            .force_format(&registry, &FormatId::TopScroll)
            .expect("force should bypass the allow-list");
        assert_eq!(wrapper.current_format(), Some(&FormatId::TopScroll));

        wrapper
            .force_format(&registry, &FormatId::Takeover)
            .expect("force should replace the active format");
        assert_eq!(wrapper.current_format(), Some(&FormatId::Takeover));
    }

    #[test]
    fn force_format_still_requires_a_registered_recipe() {
        let registry = builtin_registry();
        let mut wrapper = wrapper();
        assert_eq!(
            wrapper.force_format(&registry, &FormatId::Custom("NOPE".to_string())),
            Err(RejectReason::UnknownFormat)
        );
        assert_eq!(wrapper.state(), ActivationState::Idle);
    }

    #[test]
    fn reparenting_within_the_window_preserves_the_format() {
        let registry = builtin_registry();
        let mut wrapper = wrapper();
        wrapper
            .handle_request(&registry, &FormatId::Midscroll)
            .expect("activation should succeed");

        wrapper.on_detach(10);
        assert!(wrapper.teardown_pending());
        wrapper.on_attach(11);
        assert!(!wrapper.teardown_pending());
        assert!(!wrapper.tick(&registry, 100), "no teardown after remount");
        assert_eq!(wrapper.current_format(), Some(&FormatId::Midscroll));
        assert_eq!(wrapper.state(), ActivationState::Active);
    }

    #[test]
    fn teardown_fires_exactly_once_after_the_window() {
        let registry = builtin_registry();
        let mut wrapper = wrapper();
        wrapper
            .handle_request(&registry, &FormatId::Midscroll)
            .expect("activation should succeed");

        wrapper.on_detach(10);
        assert!(!wrapper.tick(&registry, 12), "window not elapsed yet");
        assert!(wrapper.tick(&registry, 14), "teardown should fire");
        assert!(!wrapper.tick(&registry, 20), "teardown must not repeat");
        assert!(wrapper.current_format().is_none());
    }

    #[test]
    fn destroy_detaches_and_reverses_immediately() {
        let registry = builtin_registry();
        let mut wrapper = wrapper();
        wrapper
            .handle_request(&registry, &FormatId::Takeover)
            .expect("activation should succeed");
        wrapper.on_detach(10);

        wrapper.destroy(&registry);
        assert!(!wrapper.is_attached());
        assert!(!wrapper.teardown_pending());
        assert!(wrapper.current_format().is_none());
        assert_eq!(wrapper.state(), ActivationState::Idle);
    }

    #[test]
    fn allow_list_mutation_is_not_retroactive() {
        let registry = builtin_registry();
        let mut wrapper = wrapper();
        wrapper
            .handle_request(&registry, &FormatId::Skins)
            .expect("activation should succeed");
        wrapper.set_allowed_formats([FormatId::WelcomePage]);
        assert_eq!(wrapper.state(), ActivationState::Active);
        assert_eq!(wrapper.current_format(), Some(&FormatId::Skins));
    }

    #[test]
    fn change_content_has_no_state_machine_effect() {
        let mut wrapper = wrapper();
        wrapper.change_content("<p>house ad</p>");
        assert_eq!(wrapper.state(), ActivationState::Idle);
        assert_eq!(wrapper.surface().content(), "<p>house ad</p>");
    }
}
