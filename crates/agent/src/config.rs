use tracebench_core::protocol::{DEFAULT_AGENT_HOST, DEFAULT_AGENT_PORT};

use crate::runtime::AgentError;

pub const ENV_AGENT_HOST: &str = "TRACEBENCH_AGENT_HOST";
pub const ENV_AGENT_PORT: &str = "TRACEBENCH_AGENT_PORT";

/// Where the agent listens. Port `0` asks the OS for a free port; the bound
/// address is reported by [`crate::AgentRuntime::start`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AgentConfig {
    pub host: String,
    pub port: u16,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_AGENT_HOST.to_string(),
            port: DEFAULT_AGENT_PORT,
        }
    }
}

impl AgentConfig {
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
        }
    }

    /// Loopback config on an OS-assigned port.
    pub fn ephemeral() -> Self {
        Self::new(DEFAULT_AGENT_HOST, 0)
    }

    /// Defaults overridden by `TRACEBENCH_AGENT_HOST` / `TRACEBENCH_AGENT_PORT`.
    pub fn from_env() -> Result<Self, AgentError> {
        let mut cfg = Self::default();
        if let Some(host) = std::env::var(ENV_AGENT_HOST)
            .ok()
            .filter(|s| !s.is_empty())
        {
            cfg.host = host;
        }
        if let Some(port) = std::env::var(ENV_AGENT_PORT)
            .ok()
            .filter(|s| !s.is_empty())
        {
            cfg.port = port.parse().map_err(|_| {
                AgentError::InvalidConfig(format!("{ENV_AGENT_PORT}={port} is not a port number"))
            })?;
        }
        Ok(cfg)
    }

    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}
