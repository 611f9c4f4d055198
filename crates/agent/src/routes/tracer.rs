use axum::{body::Bytes, extract::State, http::HeaderMap, Json};
use serde_json::{json, Value};

use tracebench_core::protocol::HEADER_SESSION_TOKEN;
use tracebench_core::SessionToken;

use crate::error::ApiErr;
use crate::routes::session::decode_payload;
use crate::store::SessionStore;

/// PUT|POST /v0.4/traces: submissions straight from a tracer.
///
/// The subject process does not know the per-test token, so unless the
/// session header is set the traces go to the most recently started session.
pub async fn receive(
    State(store): State<SessionStore>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<Value>, ApiErr> {
    let traces = decode_payload(&headers, &body)?;

    let token = headers
        .get(HEADER_SESSION_TOKEN)
        .and_then(|v| v.to_str().ok())
        .filter(|v| !v.is_empty())
        .map(SessionToken::from)
        .or_else(|| store.latest_session());

    match token {
        Some(token) => {
            let accepted = traces.len();
            let total = store.append_traces(&token, traces);
            tracing::debug!(%token, accepted, total, "tracer submission received");
        }
        None => {
            tracing::warn!(
                dropped = traces.len(),
                "tracer submission without session header and no session started; dropping"
            );
        }
    }

    Ok(Json(json!({ "rate_by_service": {} })))
}
