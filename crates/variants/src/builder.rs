use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use tracing::{debug, error, info};

use crate::command::{CommandRunner, Invocation};
use crate::error::{BuildError, BuildPhase};
use crate::key::VariantKey;
use crate::layout::BuildLayout;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BuildStatus {
    NotStarted,
    InProgress,
    Built,
    Failed,
}

/// One variant's build record. Frozen once `status` is `Built`.
#[derive(Debug, Clone)]
pub struct BuildVariant {
    pub key: VariantKey,
    pub build_dir: PathBuf,
    pub flags: Vec<String>,
    pub artifact_path: PathBuf,
    pub status: BuildStatus,
}

impl BuildVariant {
    fn planned(key: VariantKey, project_root: &Path, layout: &BuildLayout) -> Self {
        Self {
            key,
            build_dir: layout.build_dir(project_root, key),
            flags: layout.flags(key),
            artifact_path: layout.artifact_path(project_root, key),
            status: BuildStatus::NotStarted,
        }
    }
}

/// Walk up from `start` until a directory containing `marker` is found.
pub fn locate_project_root(start: &Path, marker: &str) -> Result<PathBuf, BuildError> {
    start
        .ancestors()
        .find(|dir| dir.join(marker).is_file())
        .map(Path::to_path_buf)
        .ok_or_else(|| BuildError::ProjectRootNotFound {
            start: start.to_path_buf(),
            marker: marker.to_string(),
        })
}

/// Builds module variants on demand, at most once per run each.
pub struct VariantBuilder {
    project_root: PathBuf,
    layout: BuildLayout,
    runner: Box<dyn CommandRunner>,
    registry: BTreeMap<VariantKey, BuildVariant>,
}

impl VariantBuilder {
    /// `project_root` must contain the layout's project marker.
    pub fn new(
        project_root: impl Into<PathBuf>,
        layout: BuildLayout,
        runner: Box<dyn CommandRunner>,
    ) -> Result<Self, BuildError> {
        let project_root = project_root.into();
        if !project_root.join(&layout.project_marker).is_file() {
            return Err(BuildError::ProjectRootNotFound {
                start: project_root,
                marker: layout.project_marker,
            });
        }
        Ok(Self {
            project_root,
            layout,
            runner,
            registry: BTreeMap::new(),
        })
    }

    /// Like [`VariantBuilder::new`], searching upwards from `start` for the root.
    pub fn discover(
        start: &Path,
        layout: BuildLayout,
        runner: Box<dyn CommandRunner>,
    ) -> Result<Self, BuildError> {
        let root = locate_project_root(start, &layout.project_marker)?;
        Self::new(root, layout, runner)
    }

    pub fn project_root(&self) -> &Path {
        &self.project_root
    }

    pub fn variant(&self, key: VariantKey) -> Option<&BuildVariant> {
        self.registry.get(&key)
    }

    pub fn status(&self, key: VariantKey) -> BuildStatus {
        self.registry
            .get(&key)
            .map_or(BuildStatus::NotStarted, |v| v.status)
    }

    /// Configure and compile `key`, returning the artifact path.
    ///
    /// A built variant returns its cached path without touching the
    /// toolchain. A failed variant is not retried.
    pub fn build(&mut self, key: VariantKey) -> Result<PathBuf, BuildError> {
        let variant = self
            .registry
            .entry(key)
            .or_insert_with(|| BuildVariant::planned(key, &self.project_root, &self.layout));

        match variant.status {
            BuildStatus::Built => {
                debug!(
                    variant = %key,
                    path = %variant.artifact_path.display(),
                    "reusing built module"
                );
                return Ok(variant.artifact_path.clone());
            }
            BuildStatus::Failed | BuildStatus::InProgress => {
                return Err(BuildError::PreviouslyFailed(key));
            }
            BuildStatus::NotStarted => {}
        }

        variant.status = BuildStatus::InProgress;
        info!(variant = %key, "building module {}", key.label());

        let result = run_build(
            self.runner.as_ref(),
            &self.project_root,
            &self.layout,
            key,
            &variant.artifact_path,
        );

        match &result {
            Ok(path) => {
                variant.status = BuildStatus::Built;
                info!(variant = %key, path = %path.display(), "module built {}", key.label());
            }
            Err(e) => {
                variant.status = BuildStatus::Failed;
                error!(variant = %key, "build failed: {e}");
            }
        }
        result
    }
}

fn run_build(
    runner: &dyn CommandRunner,
    project_root: &Path,
    layout: &BuildLayout,
    key: VariantKey,
    artifact: &Path,
) -> Result<PathBuf, BuildError> {
    info!(variant = %key, "configuring");
    run_phase(runner, key, BuildPhase::Configure, &layout.configure(project_root, key))?;

    info!(variant = %key, "compiling");
    run_phase(runner, key, BuildPhase::Compile, &layout.compile(project_root, key))?;

    if !artifact.exists() {
        return Err(BuildError::MissingArtifact {
            variant: key,
            path: artifact.to_path_buf(),
        });
    }
    Ok(artifact.to_path_buf())
}

fn run_phase(
    runner: &dyn CommandRunner,
    key: VariantKey,
    phase: BuildPhase,
    invocation: &Invocation,
) -> Result<(), BuildError> {
    debug!(variant = %key, %phase, command = %invocation, "running build phase");
    let output = runner.run(invocation).map_err(|source| BuildError::Spawn {
        variant: key,
        phase,
        command: invocation.to_string(),
        source,
    })?;

    if !output.success() {
        error!(variant = %key, %phase, "stdout: {}", output.stdout);
        error!(variant = %key, %phase, "stderr: {}", output.stderr);
        return Err(BuildError::PhaseFailed {
            variant: key,
            phase,
            exit_code: output.exit_code,
            stdout: output.stdout,
            stderr: output.stderr,
        });
    }
    Ok(())
}
