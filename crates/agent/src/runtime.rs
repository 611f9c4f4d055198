use std::net::SocketAddr;
use std::sync::mpsc::{sync_channel, SyncSender};
use std::thread::JoinHandle;

use axum::Router;
use tokio::net::TcpListener;
use tokio::sync::oneshot;
use tracing::{debug, info, warn};

use crate::config::AgentConfig;
use crate::store::SessionStore;

#[derive(Debug, thiserror::Error)]
pub enum AgentError {
    #[error("failed to bind agent on {addr}: {source}")]
    Bind {
        addr: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to build agent event loop: {0}")]
    EventLoop(#[source] std::io::Error),

    #[error("failed to spawn agent thread: {0}")]
    Spawn(#[source] std::io::Error),

    #[error("agent thread exited before it was ready")]
    StartupAborted,

    #[error("agent cannot start while {0:?}")]
    NotStopped(RuntimeState),

    #[error("agent server error: {0}")]
    Serve(#[source] std::io::Error),

    #[error("agent thread panicked")]
    Panicked,

    #[error("invalid agent configuration: {0}")]
    InvalidConfig(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RuntimeState {
    Stopped,
    Starting,
    Running,
    Stopping,
}

struct Running {
    local_addr: SocketAddr,
    shutdown: oneshot::Sender<()>,
    thread: JoinHandle<Result<(), AgentError>>,
}

/// Owns the agent's background thread and its private event loop.
///
/// `start` returns once the listener is bound, so the first request of the
/// first test cannot race the bind. `stop` lets in-flight requests finish
/// and joins the thread. The [`SessionStore`] outlives restarts.
pub struct AgentRuntime {
    config: AgentConfig,
    store: SessionStore,
    state: RuntimeState,
    running: Option<Running>,
}

impl AgentRuntime {
    pub fn new(config: AgentConfig) -> Self {
        Self {
            config,
            store: SessionStore::new(),
            state: RuntimeState::Stopped,
            running: None,
        }
    }

    pub fn config(&self) -> &AgentConfig {
        &self.config
    }

    pub fn store(&self) -> &SessionStore {
        &self.store
    }

    pub fn state(&self) -> RuntimeState {
        self.state
    }

    /// Bound address while running.
    pub fn local_addr(&self) -> Option<SocketAddr> {
        self.running.as_ref().map(|r| r.local_addr)
    }

    /// `http://<bound addr>` while running.
    pub fn base_url(&self) -> Option<String> {
        self.local_addr().map(|addr| format!("http://{addr}"))
    }

    /// Spawn the agent thread and block until it accepts connections.
    ///
    /// A bind failure is returned as [`AgentError::Bind`]; there is no retry.
    pub fn start(&mut self) -> Result<SocketAddr, AgentError> {
        if self.state != RuntimeState::Stopped {
            return Err(AgentError::NotStopped(self.state));
        }
        self.state = RuntimeState::Starting;

        let addr = self.config.bind_addr();
        let app = crate::router(self.store.clone());
        let (ready_tx, ready_rx) = sync_channel(1);
        let (shutdown_tx, shutdown_rx) = oneshot::channel();

        let thread_addr = addr.clone();
        let spawned = std::thread::Builder::new()
            .name("tracebench-agent".to_string())
            .spawn(move || serve_on_thread(thread_addr, app, ready_tx, shutdown_rx));
        let thread = match spawned {
            Ok(thread) => thread,
            Err(e) => {
                self.state = RuntimeState::Stopped;
                return Err(AgentError::Spawn(e));
            }
        };

        let ready = ready_rx.recv();
        match ready {
            Ok(Ok(local_addr)) => {
                info!(%local_addr, "agent listening");
                self.running = Some(Running {
                    local_addr,
                    shutdown: shutdown_tx,
                    thread,
                });
                self.state = RuntimeState::Running;
                Ok(local_addr)
            }
            Ok(Err(e)) => {
                let _ = thread.join();
                self.state = RuntimeState::Stopped;
                Err(e)
            }
            Err(_) => {
                // Sender dropped without a word: the thread died early.
                let joined = thread.join();
                self.state = RuntimeState::Stopped;
                match joined {
                    Err(_) => Err(AgentError::Panicked),
                    Ok(Err(e)) => Err(e),
                    Ok(Ok(())) => Err(AgentError::StartupAborted),
                }
            }
        }
    }

    /// Shut the agent down gracefully and join its thread.
    ///
    /// No-op unless running. Safe when the thread already exited on its own.
    pub fn stop(&mut self) -> Result<(), AgentError> {
        let Some(running) = self.running.take() else {
            return Ok(());
        };
        self.state = RuntimeState::Stopping;
        info!(local_addr = %running.local_addr, "stopping agent");

        // Err means the event loop is already gone; join below still reaps it.
        let _ = running.shutdown.send(());
        let joined = running.thread.join();
        self.state = RuntimeState::Stopped;

        match joined {
            Ok(result) => result,
            Err(_) => Err(AgentError::Panicked),
        }
    }
}

impl Drop for AgentRuntime {
    fn drop(&mut self) {
        if let Err(e) = self.stop() {
            warn!("agent shutdown on drop failed: {e}");
        }
    }
}

/// Body of the agent thread: private current-thread event loop, bind,
/// report readiness, serve until the shutdown signal fires.
fn serve_on_thread(
    addr: String,
    app: Router,
    ready: SyncSender<Result<SocketAddr, AgentError>>,
    shutdown: oneshot::Receiver<()>,
) -> Result<(), AgentError> {
    let event_loop = match tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
    {
        Ok(rt) => rt,
        Err(e) => {
            let _ = ready.send(Err(AgentError::EventLoop(e)));
            return Ok(());
        }
    };

    event_loop.block_on(async move {
        let bound = match TcpListener::bind(&addr).await {
            Ok(listener) => listener.local_addr().map(|local| (listener, local)),
            Err(e) => Err(e),
        };
        let (listener, local_addr) = match bound {
            Ok(bound) => bound,
            Err(source) => {
                let _ = ready.send(Err(AgentError::Bind { addr, source }));
                return Ok(());
            }
        };
        let _ = ready.send(Ok(local_addr));

        axum::serve(listener, app)
            .with_graceful_shutdown(async move {
                let _ = shutdown.await;
                debug!("agent shutdown signal received");
            })
            .await
            .map_err(AgentError::Serve)
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn start_returns_only_once_connectable() {
        let mut agent = AgentRuntime::new(AgentConfig::ephemeral());
        let addr = agent.start().expect("start agent");

        assert_eq!(agent.state(), RuntimeState::Running);
        std::net::TcpStream::connect(addr).expect("listener accepts right after start");

        agent.stop().expect("stop agent");
        assert_eq!(agent.state(), RuntimeState::Stopped);
        assert!(agent.local_addr().is_none());
    }

    #[test]
    fn stop_returns_after_the_listener_is_released() {
        let port = {
            let probe = std::net::TcpListener::bind("127.0.0.1:0").expect("pick port");
            probe.local_addr().expect("addr").port()
        };
        let mut agent = AgentRuntime::new(AgentConfig::new("127.0.0.1", port));
        agent.start().expect("start on fixed port");
        agent.stop().expect("stop");

        // Same fixed port, right away: the serving thread must be gone.
        std::net::TcpListener::bind(("127.0.0.1", port)).expect("port free after stop");
        agent.start().expect("restart on the same port");
        agent.stop().expect("second stop");
    }

    #[test]
    fn stop_is_a_noop_when_not_running() {
        let mut agent = AgentRuntime::new(AgentConfig::ephemeral());
        agent.stop().expect("stop before start");
        agent.start().expect("start");
        agent.stop().expect("first stop");
        agent.stop().expect("second stop");
        assert_eq!(agent.state(), RuntimeState::Stopped);
    }

    #[test]
    fn starting_twice_is_rejected() {
        let mut agent = AgentRuntime::new(AgentConfig::ephemeral());
        agent.start().expect("start");
        let err = agent.start().expect_err("second start must fail");
        assert!(matches!(err, AgentError::NotStopped(RuntimeState::Running)));
    }

    #[test]
    fn bind_conflict_is_reported() {
        let taken = std::net::TcpListener::bind("127.0.0.1:0").expect("reserve port");
        let port = taken.local_addr().expect("addr").port();

        let mut agent = AgentRuntime::new(AgentConfig::new("127.0.0.1", port));
        let err = agent.start().expect_err("bind must fail");

        assert!(matches!(err, AgentError::Bind { .. }), "got {err}");
        assert_eq!(agent.state(), RuntimeState::Stopped);
    }

    #[test]
    fn store_survives_restart() {
        let mut agent = AgentRuntime::new(AgentConfig::ephemeral());
        let token = tracebench_core::SessionToken::new("kept");
        agent.store().start_session(&token);

        agent.start().expect("start");
        agent.stop().expect("stop");
        agent.start().expect("restart");

        assert!(agent.store().contains(&token));
    }
}
