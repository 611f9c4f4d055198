//! Mock trace agent used by the integration harness.
//!
//! The subject process submits spans over HTTP; tests read them back per
//! session token. [`AgentRuntime`] hosts the service on its own thread so the
//! test thread never blocks on it.

pub mod config;
mod error;
pub mod routes;
pub mod runtime;
pub mod store;

use axum::{
    extract::{DefaultBodyLimit, FromRef},
    routing::{get, put},
    Router,
};
use tower_http::trace::TraceLayer;

use tracebench_core::protocol::{
    PATH_HEALTH, PATH_LEGACY_SESSION_START, PATH_LEGACY_SESSION_TRACES, PATH_SESSION_START,
    PATH_SESSION_TRACES, PATH_TRACER_TRACES,
};

pub use config::AgentConfig;
pub use error::ApiErr;
pub use runtime::{AgentError, AgentRuntime, RuntimeState};
pub use store::SessionStore;

/// Largest submission body accepted.
const MAX_PAYLOAD_BYTES: usize = 64 * 1024 * 1024;

/// State shared across all handlers.
#[derive(Clone)]
pub struct AppState {
    pub store: SessionStore,
}

impl FromRef<AppState> for SessionStore {
    fn from_ref(state: &AppState) -> Self {
        state.store.clone()
    }
}

/// Build the ingestion router over `store`.
pub fn router(store: SessionStore) -> Router {
    Router::new()
        .route(PATH_HEALTH, get(routes::health::health))
        .route(PATH_SESSION_START, get(routes::session::start_session))
        .route(
            PATH_LEGACY_SESSION_START,
            get(routes::session::start_session),
        )
        .route(
            PATH_SESSION_TRACES,
            get(routes::session::get_traces).post(routes::session::submit_traces),
        )
        .route(
            PATH_LEGACY_SESSION_TRACES,
            get(routes::session::get_traces).post(routes::session::submit_traces),
        )
        .route(
            PATH_TRACER_TRACES,
            put(routes::tracer::receive).post(routes::tracer::receive),
        )
        .layer(DefaultBodyLimit::max(MAX_PAYLOAD_BYTES))
        .layer(TraceLayer::new_for_http())
        .with_state(AppState { store })
}
