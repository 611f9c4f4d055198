use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use tracing::info;

use tracebench_agent::{AgentError, AgentRuntime};
use tracebench_agent_client::{AgentClient, AgentSession, ClientError, PollConfig};
use tracebench_core::SessionToken;
use tracebench_variants::{
    BuildError, BuildLayout, CommandRunner, SelectError, SystemRunner, TestCase, VariantBuilder,
    VariantSelector,
};

use crate::config::HarnessConfig;
use crate::launcher::{ApacheCtl, ServerEndpoint, ServerLauncher};
use crate::logdir::{TestLogDir, prepare_log_dir};

const AGENT_REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, thiserror::Error)]
pub enum HarnessError {
    #[error(transparent)]
    Build(#[from] BuildError),
    #[error(transparent)]
    Select(#[from] SelectError),
    #[error("mock agent: {0}")]
    Agent(#[from] AgentError),
    #[error("mock agent client: {0}")]
    Client(#[from] ClientError),
    #[error("log directory {path}: {source}")]
    LogDir { path: PathBuf, source: io::Error },
    #[error("cannot determine working directory: {0}")]
    CurrentDir(io::Error),
}

/// Pick the artifact source for this run: the `--module-path` override, or
/// builds of exactly the variants `tests` need.
pub fn select_variants(
    config: &HarnessConfig,
    tests: &[TestCase],
    runner: Box<dyn CommandRunner>,
) -> Result<VariantSelector, HarnessError> {
    if let Some(module) = &config.module_path {
        return Ok(VariantSelector::with_override(module.clone()));
    }

    let mut builder = match &config.project_root {
        Some(root) => VariantBuilder::new(root, BuildLayout::default(), runner)?,
        None => {
            let cwd = std::env::current_dir().map_err(HarnessError::CurrentDir)?;
            VariantBuilder::discover(&cwd, BuildLayout::default(), runner)?
        }
    };
    info!(root = %builder.project_root().display(), "module project root");
    Ok(VariantSelector::prepare(&mut builder, tests)?)
}

/// Everything one run shares: the started agent, the artifact selector and
/// the server launcher. Built once before the first test, torn down by
/// [`RunContext::finish`].
pub struct RunContext {
    log_dir: PathBuf,
    agent: AgentRuntime,
    client: AgentClient,
    selector: VariantSelector,
    launcher: Option<Arc<dyn ServerLauncher>>,
    endpoint: ServerEndpoint,
}

impl RunContext {
    /// Builds with real processes and controls the server with `apachectl`
    /// when `--bin-path` is set.
    pub fn bootstrap(config: HarnessConfig, tests: &[TestCase]) -> Result<Self, HarnessError> {
        let selector = select_variants(&config, tests, Box::new(SystemRunner))?;
        let launcher = config
            .bin_path
            .clone()
            .map(|bin| Arc::new(ApacheCtl::new(bin)) as Arc<dyn ServerLauncher>);
        Self::start(config, selector, launcher)
    }

    /// Bind the default artifact, prepare logs and start the agent. Any
    /// failure here aborts the whole run.
    pub fn start(
        config: HarnessConfig,
        mut selector: VariantSelector,
        launcher: Option<Arc<dyn ServerLauncher>>,
    ) -> Result<Self, HarnessError> {
        let module = selector.bind_default()?;
        info!(path = %module.display(), "default module");

        let log_dir = prepare_log_dir(config.log_dir.as_deref())?;

        let mut agent = AgentRuntime::new(config.agent_config());
        let addr = agent.start()?;
        let client = AgentClient::new(&format!("http://{addr}"), AGENT_REQUEST_TIMEOUT)?
            .with_poll(PollConfig::every(config.poll_interval()));

        Ok(Self {
            log_dir,
            agent,
            client,
            selector,
            launcher,
            endpoint: config.server_endpoint(),
        })
    }

    pub fn log_dir(&self) -> &Path {
        &self.log_dir
    }

    pub fn agent(&self) -> &AgentRuntime {
        &self.agent
    }

    pub fn client(&self) -> &AgentClient {
        &self.client
    }

    pub fn selector(&self) -> &VariantSelector {
        &self.selector
    }

    /// Per-test setup: bind the artifact the test needs, then open a fresh
    /// agent session named after it.
    pub async fn setup(&mut self, test: &TestCase) -> Result<TestEnv, HarnessError> {
        let module_path = self.selector.bind_for(test)?.to_path_buf();
        let session = self
            .client
            .new_session(Some(SessionToken::for_test(&test.name)))
            .await?;

        Ok(TestEnv {
            name: test.name.clone(),
            module_path,
            session,
            log_dir: TestLogDir::new(&self.log_dir, &test.name),
            endpoint: self.endpoint.clone(),
            launcher: self.launcher.clone(),
        })
    }

    /// Stop the agent. Logs stay on disk.
    pub fn finish(mut self) -> Result<(), HarnessError> {
        self.agent.stop()?;
        info!(path = %self.log_dir.display(), "run finished; logs kept");
        Ok(())
    }
}

/// What a single test gets to work with.
pub struct TestEnv {
    pub name: String,
    pub module_path: PathBuf,
    pub session: AgentSession,
    pub log_dir: TestLogDir,
    pub endpoint: ServerEndpoint,
    launcher: Option<Arc<dyn ServerLauncher>>,
}

impl TestEnv {
    pub fn server(&self) -> anyhow::Result<&dyn ServerLauncher> {
        self.launcher
            .as_deref()
            .ok_or_else(|| anyhow::anyhow!("no server control program configured (--bin-path)"))
    }

    /// `LoadModule` directive for the bound artifact.
    pub fn load_module_directive(&self) -> String {
        format!("LoadModule datadog_module {}", self.module_path.display())
    }
}
