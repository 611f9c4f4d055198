//! Routes, keys and response bodies spoken between the agent, its client
//! and tracers.

use serde::{Deserialize, Serialize};

/// Default agent bind host.
pub const DEFAULT_AGENT_HOST: &str = "127.0.0.1";
/// Default agent port. Tracers in the subject process are configured for it.
pub const DEFAULT_AGENT_PORT: u16 = 8136;

pub const PATH_HEALTH: &str = "/health";
pub const PATH_SESSION_START: &str = "/session/start";
pub const PATH_SESSION_TRACES: &str = "/session/traces";

/// Older spellings of the session routes, still accepted by the agent.
pub const PATH_LEGACY_SESSION_START: &str = "/test/session/start";
pub const PATH_LEGACY_SESSION_TRACES: &str = "/test/session/traces";

/// Tracer-native submission route.
pub const PATH_TRACER_TRACES: &str = "/v0.4/traces";

pub const QUERY_TOKEN: &str = "token";
pub const QUERY_LEGACY_TOKEN: &str = "test_session_token";

/// Header a tracer may set to pin its submission to a session.
pub const HEADER_SESSION_TOKEN: &str = "x-datadog-test-session-token";

/// Content type tracers use for msgpack-encoded submissions.
pub const CONTENT_TYPE_MSGPACK: &str = "application/msgpack";

/// `GET /health`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
}

/// `GET /session/start`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionStartResponse {
    pub token: String,
    /// `false` when the token was already known (start is idempotent).
    pub created: bool,
}

/// `POST /session/traces`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubmitResponse {
    pub token: String,
    pub accepted: usize,
    /// Traces held for the session after this submission.
    pub total: usize,
}
