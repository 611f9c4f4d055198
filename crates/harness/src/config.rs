use std::path::PathBuf;
use std::time::Duration;

use clap::Args;

use tracebench_agent::AgentConfig;
use tracebench_core::protocol::{DEFAULT_AGENT_HOST, DEFAULT_AGENT_PORT};

use crate::launcher::ServerEndpoint;

pub const DEFAULT_SERVER_HOST: &str = "127.0.0.1";
pub const DEFAULT_SERVER_PORT: u16 = 8080;
pub const DEFAULT_POLL_INTERVAL_MS: u64 = 1000;

/// Run-wide options. Every flag falls back to a `TRACEBENCH_*` variable.
#[derive(Debug, Clone, Args)]
pub struct HarnessConfig {
    /// Server control program under test (e.g. apachectl)
    #[arg(long, env = "TRACEBENCH_BIN_PATH", value_parser = existing_path)]
    pub bin_path: Option<PathBuf>,

    /// Prebuilt module to load for every test; skips variant builds
    #[arg(long, env = "TRACEBENCH_MODULE_PATH", value_parser = existing_path)]
    pub module_path: Option<PathBuf>,

    /// Directory for run logs; wiped and recreated at start
    #[arg(long, env = "TRACEBENCH_LOG_DIR")]
    pub log_dir: Option<PathBuf>,

    /// Module source tree; searched upwards from the working directory when unset
    #[arg(long, env = "TRACEBENCH_PROJECT_ROOT")]
    pub project_root: Option<PathBuf>,

    #[arg(long, env = "TRACEBENCH_AGENT_HOST", default_value = DEFAULT_AGENT_HOST)]
    pub agent_host: String,

    #[arg(long, env = "TRACEBENCH_AGENT_PORT", default_value_t = DEFAULT_AGENT_PORT)]
    pub agent_port: u16,

    #[arg(long, env = "TRACEBENCH_SERVER_HOST", default_value = DEFAULT_SERVER_HOST)]
    pub server_host: String,

    #[arg(long, env = "TRACEBENCH_SERVER_PORT", default_value_t = DEFAULT_SERVER_PORT)]
    pub server_port: u16,

    /// Interval between trace polls, in milliseconds
    #[arg(long, env = "TRACEBENCH_POLL_INTERVAL_MS", default_value_t = DEFAULT_POLL_INTERVAL_MS)]
    pub poll_interval_ms: u64,
}

impl Default for HarnessConfig {
    fn default() -> Self {
        Self {
            bin_path: None,
            module_path: None,
            log_dir: None,
            project_root: None,
            agent_host: DEFAULT_AGENT_HOST.to_string(),
            agent_port: DEFAULT_AGENT_PORT,
            server_host: DEFAULT_SERVER_HOST.to_string(),
            server_port: DEFAULT_SERVER_PORT,
            poll_interval_ms: DEFAULT_POLL_INTERVAL_MS,
        }
    }
}

impl HarnessConfig {
    pub fn agent_config(&self) -> AgentConfig {
        AgentConfig::new(self.agent_host.clone(), self.agent_port)
    }

    pub fn server_endpoint(&self) -> ServerEndpoint {
        ServerEndpoint::new(self.server_host.clone(), Some(self.server_port))
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }
}

fn existing_path(raw: &str) -> Result<PathBuf, String> {
    let path = std::path::absolute(raw).map_err(|e| format!("{raw}: {e}"))?;
    if !path.exists() {
        return Err(format!("{} does not exist", path.display()));
    }
    Ok(path)
}
