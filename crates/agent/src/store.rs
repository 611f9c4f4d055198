use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use tracebench_core::{SessionToken, Trace};

/// In-memory registry of session token → traces received for it.
///
/// Cloning hands out another handle to the same registry. Every operation
/// takes the single lock, so a reader never observes a half-applied append.
/// Sessions live until the process exits.
#[derive(Clone, Default)]
pub struct SessionStore {
    inner: Arc<Mutex<Sessions>>,
}

#[derive(Default)]
struct Sessions {
    traces: HashMap<SessionToken, Vec<Trace>>,
    /// Most recently started session; receives untokened tracer submissions.
    latest: Option<SessionToken>,
}

impl SessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Sessions> {
        self.inner.lock().expect("session store mutex poisoned")
    }

    /// Register a session. Returns `false` if the token was already known;
    /// its traces are left untouched either way.
    pub fn start_session(&self, token: &SessionToken) -> bool {
        let mut sessions = self.lock();
        let created = !sessions.traces.contains_key(token);
        if created {
            sessions.traces.insert(token.clone(), Vec::new());
        }
        sessions.latest = Some(token.clone());
        created
    }

    /// Append traces in arrival order, creating the session if needed.
    /// Returns the number of traces now held for the token.
    pub fn append_traces(&self, token: &SessionToken, traces: Vec<Trace>) -> usize {
        let mut sessions = self.lock();
        let entry = sessions.traces.entry(token.clone()).or_default();
        entry.extend(traces);
        entry.len()
    }

    /// Snapshot of everything received for `token` so far.
    pub fn traces(&self, token: &SessionToken) -> Vec<Trace> {
        self.lock().traces.get(token).cloned().unwrap_or_default()
    }

    pub fn latest_session(&self) -> Option<SessionToken> {
        self.lock().latest.clone()
    }

    pub fn contains(&self, token: &SessionToken) -> bool {
        self.lock().traces.contains_key(token)
    }

    pub fn session_count(&self) -> usize {
        self.lock().traces.len()
    }
}
