/// Tunable timeouts for the creative agent, in abstract steps.
#[derive(Debug, Clone, Copy)]
pub struct AgentConfig {
    /// Steps to wait for `SESSION_ACK` before resolving the handshake empty.
    pub handshake_timeout_steps: u64,
    /// Steps to wait for a format response before treating it as rejected.
    pub request_timeout_steps: u64,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            handshake_timeout_steps: 8,
            request_timeout_steps: 16,
        }
    }
}
