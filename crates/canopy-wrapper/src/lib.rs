//! Publisher-side wrapper: the DOM-resident host for one high-impact slot.
//!
//! Owns the format-activation state machine, allowed/excluded-format policy,
//! the format registry and integration hooks, the layout baseline, and the
//! attach/detach lifecycle with debounced teardown.

pub mod builtin;
pub mod config;
pub mod integration;
pub mod layout;
pub mod policy;
pub mod registry;
pub mod runtime;
pub mod slot;
pub mod wrapper;

pub use builtin::builtin_registry;
pub use config::{PageConfig, RemoteConfigSource};
pub use integration::{FormatIntegration, HookError};
pub use layout::SlotSurface;
pub use policy::RejectReason;
pub use registry::{FormatRecipe, FormatRegistry};
pub use runtime::{SessionBinding, WrapperPumpEvent, WrapperRuntime};
pub use slot::{EmbedTree, SlotAdapter, TreeSlotAdapter};
pub use wrapper::{ActivationState, Wrapper, WrapperConfig};
