use std::time::Duration;

/// How often a session re-reads the agent while waiting for traces.
#[derive(Debug, Clone)]
pub struct PollConfig {
    pub interval: Duration,
}

impl Default for PollConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(1),
        }
    }
}

impl PollConfig {
    pub fn every(interval: Duration) -> Self {
        Self { interval }
    }
}
