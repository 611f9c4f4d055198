use axum::{
    body::Bytes,
    extract::{Query, State},
    http::{header, HeaderMap},
    Json,
};
use serde::Deserialize;

use tracebench_core::protocol::{
    SessionStartResponse, SubmitResponse, CONTENT_TYPE_MSGPACK, QUERY_LEGACY_TOKEN, QUERY_TOKEN,
};
use tracebench_core::{SessionToken, Trace, TracePayload};

use crate::error::ApiErr;
use crate::store::SessionStore;

#[derive(Debug, Deserialize)]
pub struct TokenQuery {
    token: Option<String>,
    test_session_token: Option<String>,
}

impl TokenQuery {
    /// `token` wins over the legacy key. Tokens are opaque and kept
    /// verbatim; only an empty one is rejected.
    fn require(self) -> Result<SessionToken, ApiErr> {
        let non_empty = |t: &String| !t.is_empty();
        self.token
            .filter(non_empty)
            .or(self.test_session_token.filter(non_empty))
            .map(SessionToken::from)
            .ok_or_else(|| {
                ApiErr::bad_request(format!(
                    "missing session token (query `{QUERY_TOKEN}` or `{QUERY_LEGACY_TOKEN}`)"
                ))
            })
    }
}

/// Decode a submission body. Msgpack when the content type says so,
/// JSON otherwise.
pub(crate) fn decode_payload(headers: &HeaderMap, body: &[u8]) -> Result<Vec<Trace>, ApiErr> {
    let is_msgpack = headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| v.starts_with(CONTENT_TYPE_MSGPACK));

    let payload: TracePayload = if is_msgpack {
        rmp_serde::from_slice(body)
            .map_err(|e| ApiErr::bad_request(format!("invalid msgpack trace payload: {e}")))?
    } else {
        serde_json::from_slice(body)
            .map_err(|e| ApiErr::bad_request(format!("invalid JSON trace payload: {e}")))?
    };
    Ok(payload.into_traces())
}

/// GET /session/start: register a session. Idempotent.
pub async fn start_session(
    State(store): State<SessionStore>,
    Query(query): Query<TokenQuery>,
) -> Result<Json<SessionStartResponse>, ApiErr> {
    let token = query.require()?;
    let created = store.start_session(&token);
    tracing::info!(%token, created, "session started");
    Ok(Json(SessionStartResponse {
        token: token.to_string(),
        created,
    }))
}

/// POST /session/traces: append one trace or a batch to a session.
pub async fn submit_traces(
    State(store): State<SessionStore>,
    Query(query): Query<TokenQuery>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<SubmitResponse>, ApiErr> {
    let token = query.require()?;
    let traces = decode_payload(&headers, &body)?;
    let accepted = traces.len();
    let total = store.append_traces(&token, traces);
    tracing::debug!(%token, accepted, total, "traces received");
    Ok(Json(SubmitResponse {
        token: token.to_string(),
        accepted,
        total,
    }))
}

/// GET /session/traces: everything received for the session so far.
pub async fn get_traces(
    State(store): State<SessionStore>,
    Query(query): Query<TokenQuery>,
) -> Result<Json<Vec<Trace>>, ApiErr> {
    let token = query.require()?;
    Ok(Json(store.traces(&token)))
}
