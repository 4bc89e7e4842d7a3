//! Creative-side negotiation agent.
//!
//! Runs inside the embedded creative document: establishes a session with
//! its host wrapper, issues format requests, and exposes an inbound-message
//! subscription. All waiting is expressed as step deadlines resolved by
//! `tick`.

pub mod agent;
pub mod config;

pub use agent::{AgentError, AgentEvent, CreativeAgent, SessionHandle};
pub use config::AgentConfig;
