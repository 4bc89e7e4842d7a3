use std::cell::RefCell;
use std::rc::Rc;

use canopy_agent::{AgentConfig, AgentEvent, CreativeAgent};
use canopy_core::{FormatId, SlotDescriptor};
use canopy_transport::adapter::{route_in_memory_outbound, InMemoryChannel};
use canopy_wrapper::{
    builtin_registry, FormatIntegration, FormatRecipe, FormatRegistry, HookError, SlotSurface,
    Wrapper, WrapperConfig, WrapperPumpEvent, WrapperRuntime,
};

/// Events produced by one simulated step on both sides of the channel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StepOutcome {
    pub wrapper_events: Vec<WrapperPumpEvent>,
    pub agent_events: Vec<AgentEvent>,
}

/// One wrapper and one creative agent wired through in-memory channels.
///
/// Traffic only moves when `step` routes it, which makes loss and timing
/// scenarios fully deterministic.
pub struct NegotiationPair {
    pub runtime: WrapperRuntime<InMemoryChannel>,
    pub agent: CreativeAgent<InMemoryChannel>,
    pub registry: FormatRegistry,
}

impl NegotiationPair {
    pub fn new() -> Self {
        Self::with_parts(WrapperConfig::default(), builtin_registry())
    }

    pub fn with_parts(config: WrapperConfig, registry: FormatRegistry) -> Self {
        Self {
            runtime: WrapperRuntime::new(Wrapper::new(config), InMemoryChannel::default()),
            agent: CreativeAgent::new(
                InMemoryChannel::default(),
                "wrapper".to_string(),
                AgentConfig::default(),
            ),
            registry,
        }
    }

    /// Routes pending traffic both ways and pumps both endpoints once.
    pub fn step(&mut self, now_step: u64) -> StepOutcome {
        route_in_memory_outbound(self.agent.adapter_mut(), &mut self.runtime.adapter, "creative");
        let wrapper_events = self.runtime.pump_once(&self.registry, now_step);
        route_in_memory_outbound(&mut self.runtime.adapter, self.agent.adapter_mut(), "wrapper");
        let agent_events = self.agent.tick(now_step);
        StepOutcome {
            wrapper_events,
            agent_events,
        }
    }

    /// Runs the handshake to completion. Panics if it does not establish
    /// within a few steps (it always should with traffic routed).
    pub fn establish_session(&mut self, now_step: u64) {
        self.agent.start_session(now_step);
        let outcome = self.step(now_step + 1);
        assert!(
            outcome
                .agent_events
                .iter()
                .any(|e| matches!(e, AgentEvent::SessionEstablished(_))),
            "handshake should establish in one routed step"
        );
    }
}

impl Default for NegotiationPair {
    fn default() -> Self {
        Self::new()
    }
}

/// Call log shared between recording hooks and assertions.
pub type CallLog = Rc<RefCell<Vec<&'static str>>>;

/// Integration hook that records its invocations and can veto setup.
pub struct RecordingIntegration {
    pub id: FormatId,
    pub fail_setup: bool,
    pub log: CallLog,
}

impl FormatIntegration for RecordingIntegration {
    fn id(&self) -> FormatId {
        self.id.clone()
    }

    fn setup(&mut self) -> Result<(), HookError> {
        self.log.borrow_mut().push("integration.setup");
        if self.fail_setup {
            return Err(HookError::new("vetoed by integration"));
        }
        Ok(())
    }

    fn close(&mut self) {
        self.log.borrow_mut().push("integration.close");
    }

    fn reset(&mut self) {
        self.log.borrow_mut().push("integration.reset");
    }
}

/// Recipe that records its invocations; layout effects mirror a minimal
/// full-bleed format.
pub struct RecordingRecipe {
    pub id: FormatId,
    pub log: CallLog,
}

impl FormatRecipe for RecordingRecipe {
    fn id(&self) -> FormatId {
        self.id.clone()
    }

    fn description(&self) -> &str {
        "recording recipe for simulations"
    }

    fn setup(
        &self,
        surface: &mut SlotSurface,
        _slot: Option<&SlotDescriptor>,
    ) -> Result<(), HookError> {
        self.log.borrow_mut().push("format.setup");
        surface.set_style("height", "100vh");
        Ok(())
    }

    fn reset(&self, _surface: &mut SlotSurface) {
        self.log.borrow_mut().push("format.reset");
    }
}
