use std::time::Duration;

use tracebench_core::protocol::{
    HealthResponse, SessionStartResponse, SubmitResponse, PATH_HEALTH, PATH_SESSION_START,
    PATH_SESSION_TRACES, QUERY_TOKEN,
};
use tracebench_core::{SessionToken, Trace};

use crate::error::{ClientError, Result};
use crate::poll::PollConfig;
use crate::session::AgentSession;

/// Typed HTTP client for the mock trace agent.
///
/// Cheap to clone; clones share the connection pool.
#[derive(Clone)]
pub struct AgentClient {
    client: reqwest::Client,
    base_url: String,
    poll: PollConfig,
}

impl AgentClient {
    /// Create a new client with the given base URL and per-request timeout.
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self::with_client(client, base_url))
    }

    /// Create from an existing `reqwest::Client`.
    pub fn with_client(client: reqwest::Client, base_url: &str) -> Self {
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            poll: PollConfig::default(),
        }
    }

    /// Poll settings handed to every session opened afterwards.
    pub fn with_poll(mut self, poll: PollConfig) -> Self {
        self.poll = poll;
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn session_url(&self, path: &str, token: &SessionToken) -> String {
        format!(
            "{}{}?{}={}",
            self.base_url,
            path,
            QUERY_TOKEN,
            urlencoding::encode(token.as_str())
        )
    }

    pub async fn health(&self) -> Result<HealthResponse> {
        let resp = self.client.get(self.url(PATH_HEALTH)).send().await?;
        parse_response(resp).await
    }

    /// Register a session and return a handle scoped to it. A random token
    /// is generated when none is given.
    pub async fn new_session(&self, token: Option<SessionToken>) -> Result<AgentSession> {
        let token = token.unwrap_or_else(SessionToken::random);
        let resp = self
            .client
            .get(self.session_url(PATH_SESSION_START, &token))
            .send()
            .await?;
        let ack: SessionStartResponse = parse_response(resp).await?;
        tracing::debug!(token = %ack.token, created = ack.created, "agent session started");
        Ok(AgentSession::new(self.clone(), token, self.poll.clone()))
    }

    pub async fn submit_traces(
        &self,
        token: &SessionToken,
        traces: &[Trace],
    ) -> Result<SubmitResponse> {
        let resp = self
            .client
            .post(self.session_url(PATH_SESSION_TRACES, token))
            .json(traces)
            .send()
            .await?;
        parse_response(resp).await
    }

    /// Single read of everything the agent holds for `token`.
    pub async fn fetch_traces(&self, token: &SessionToken) -> Result<Vec<Trace>> {
        let resp = self
            .client
            .get(self.session_url(PATH_SESSION_TRACES, token))
            .send()
            .await?;
        parse_response(resp).await
    }
}

/// Return the deserialized body on 2xx, or an error carrying the status and
/// body text.
async fn parse_response<T: serde::de::DeserializeOwned>(resp: reqwest::Response) -> Result<T> {
    let status = resp.status();
    if !status.is_success() {
        let body = resp.text().await.unwrap_or_default();
        return Err(ClientError::Status { status, body });
    }
    let body = resp.bytes().await?;
    serde_json::from_slice(&body).map_err(ClientError::Decode)
}
