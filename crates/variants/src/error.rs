use std::fmt;
use std::path::PathBuf;

use crate::key::VariantKey;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BuildPhase {
    Configure,
    Compile,
}

impl fmt::Display for BuildPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            BuildPhase::Configure => "configure",
            BuildPhase::Compile => "compile",
        })
    }
}

/// Build failures. All of them abort the test run.
#[derive(Debug, thiserror::Error)]
pub enum BuildError {
    #[error("cannot find project root: no `{marker}` in {start} or its parents")]
    ProjectRootNotFound { start: PathBuf, marker: String },

    #[error("unknown module variant `{0}` (expected primary/no_rum or extended/rum)")]
    UnknownVariant(String),

    #[error("failed to run {phase} for {variant} variant (`{command}`): {source}")]
    Spawn {
        variant: VariantKey,
        phase: BuildPhase,
        command: String,
        #[source]
        source: std::io::Error,
    },

    #[error("{phase} of {variant} variant failed (exit {}): {}", fmt_exit(.exit_code), .stderr.trim())]
    PhaseFailed {
        variant: VariantKey,
        phase: BuildPhase,
        exit_code: Option<i32>,
        stdout: String,
        stderr: String,
    },

    #[error("built module not found at {path} ({variant} variant)")]
    MissingArtifact { variant: VariantKey, path: PathBuf },

    #[error("{0} variant already failed to build in this run")]
    PreviouslyFailed(VariantKey),
}

fn fmt_exit(code: &Option<i32>) -> String {
    code.map_or_else(|| "signal".to_string(), |c| c.to_string())
}

/// Per-test selection failures.
#[derive(Debug, thiserror::Error)]
pub enum SelectError {
    #[error(
        "variant unavailable: `{test}` requires the {variant} module, which was not built in this run"
    )]
    VariantUnavailable { test: String, variant: VariantKey },

    #[error("no module path available: nothing was built and no override was given")]
    NoArtifactAvailable,
}
