use std::time::Duration;

use tokio::time::Instant;
use tracing::{debug, info};

use tracebench_core::protocol::SubmitResponse;
use tracebench_core::{SessionToken, Trace};

use crate::client::AgentClient;
use crate::error::Result;
use crate::poll::PollConfig;

/// A started agent session, as seen by one test.
///
/// Traces reach the agent from another process after an unknown delay, so
/// reads poll at a fixed interval until something shows up or the caller's
/// timeout runs out. Running out is a normal outcome, not an error.
pub struct AgentSession {
    client: AgentClient,
    token: SessionToken,
    poll: PollConfig,
}

impl AgentSession {
    pub(crate) fn new(client: AgentClient, token: SessionToken, poll: PollConfig) -> Self {
        Self {
            client,
            token,
            poll,
        }
    }

    pub fn token(&self) -> &SessionToken {
        &self.token
    }

    /// `true` as soon as the agent holds at least one trace for this session,
    /// `false` once `timeout` elapses without any.
    pub async fn wait_for_at_least_one_trace(&self, timeout: Duration) -> bool {
        match self.poll_until_non_empty(timeout).await {
            Some(traces) => {
                info!(token = %self.token, count = traces.len(), "received traces");
                true
            }
            None => false,
        }
    }

    /// Everything received for this session once at least one trace is
    /// present; empty if `timeout` elapses first.
    pub async fn get_traces(&self, timeout: Duration) -> Vec<Trace> {
        self.poll_until_non_empty(timeout)
            .await
            .unwrap_or_default()
    }

    /// Submit traces under this session's token.
    pub async fn submit(&self, traces: &[Trace]) -> Result<SubmitResponse> {
        self.client.submit_traces(&self.token, traces).await
    }

    async fn poll_until_non_empty(&self, timeout: Duration) -> Option<Vec<Trace>> {
        let deadline = Instant::now() + timeout;
        loop {
            // A single stalled request must not outlive the caller's deadline.
            let remaining = deadline.saturating_duration_since(Instant::now());
            match tokio::time::timeout(remaining, self.client.fetch_traces(&self.token)).await {
                Ok(Ok(traces)) if !traces.is_empty() => return Some(traces),
                Ok(Ok(_)) => {}
                // Transport hiccups count as "nothing yet"; the deadline bounds us.
                Ok(Err(e)) => debug!(token = %self.token, "trace poll failed: {e}"),
                Err(_) => debug!(token = %self.token, "trace poll cut off at deadline"),
            }

            let now = Instant::now();
            if now >= deadline {
                debug!(token = %self.token, ?timeout, "no traces before timeout");
                return None;
            }
            tokio::time::sleep(self.poll.interval.min(deadline - now)).await;
        }
    }
}
