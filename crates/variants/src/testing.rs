use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use crate::command::{CommandOutput, CommandRunner, Invocation};
use crate::layout::BuildLayout;

type FailWhen = Arc<dyn Fn(&Invocation) -> bool + Send + Sync>;

/// Command runner that records invocations instead of spawning them.
///
/// Every command succeeds unless it matches the `failing_when` predicate. A
/// successful `--build <dir>` drops an empty artifact into `<dir>` so the
/// builder's presence check passes. Clones share the call log.
#[derive(Clone)]
pub struct RecordingRunner {
    calls: Arc<Mutex<Vec<Invocation>>>,
    artifact_relpath: Option<PathBuf>,
    fail_when: Option<FailWhen>,
}

impl RecordingRunner {
    pub fn new(layout: &BuildLayout) -> Self {
        Self {
            calls: Arc::new(Mutex::new(Vec::new())),
            artifact_relpath: Some(layout.artifact_relpath.clone()),
            fail_when: None,
        }
    }

    /// Make matching commands exit with status 2.
    pub fn failing_when(
        mut self,
        predicate: impl Fn(&Invocation) -> bool + Send + Sync + 'static,
    ) -> Self {
        self.fail_when = Some(Arc::new(predicate));
        self
    }

    /// Compile "succeeds" without producing the artifact.
    pub fn without_artifact(mut self) -> Self {
        self.artifact_relpath = None;
        self
    }

    pub fn calls(&self) -> Vec<Invocation> {
        self.calls.lock().expect("call log poisoned").clone()
    }
}

impl CommandRunner for RecordingRunner {
    fn run(&self, invocation: &Invocation) -> std::io::Result<CommandOutput> {
        self.calls
            .lock()
            .expect("call log poisoned")
            .push(invocation.clone());

        if self.fail_when.as_ref().is_some_and(|f| f(invocation)) {
            return Ok(CommandOutput {
                exit_code: Some(2),
                stdout: String::new(),
                stderr: format!("simulated failure: {invocation}"),
            });
        }

        if let (Some(relpath), Some("--build"), Some(dir)) = (
            &self.artifact_relpath,
            invocation.args.first().map(String::as_str),
            invocation.args.get(1),
        ) {
            let artifact = PathBuf::from(dir).join(relpath);
            if let Some(parent) = artifact.parent() {
                std::fs::create_dir_all(parent)?;
            }
            std::fs::write(&artifact, b"")?;
        }

        Ok(CommandOutput {
            exit_code: Some(0),
            stdout: format!("ran: {invocation}"),
            stderr: String::new(),
        })
    }
}
