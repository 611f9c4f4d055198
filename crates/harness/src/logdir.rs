use std::io;
use std::path::{Path, PathBuf};

use tracing::{info, warn};

use crate::context::HarnessError;

const TEMP_LOG_PREFIX: &str = "log-httpd-tests-";

/// Create the run's log directory.
///
/// A requested directory is wiped and recreated so logs never mix across
/// runs. Without one, a fresh `log-httpd-tests-*` directory is made under the
/// working directory and kept after the run.
pub fn prepare_log_dir(requested: Option<&Path>) -> Result<PathBuf, HarnessError> {
    let dir = match requested {
        Some(dir) => {
            if dir.exists() {
                warn!(path = %dir.display(), "removing previous run logs");
                std::fs::remove_dir_all(dir).map_err(|source| log_dir_err(dir, source))?;
            }
            std::fs::create_dir_all(dir).map_err(|source| log_dir_err(dir, source))?;
            dir.to_path_buf()
        }
        None => tempfile::Builder::new()
            .prefix(TEMP_LOG_PREFIX)
            .tempdir_in(".")
            .map_err(|source| log_dir_err(Path::new("."), source))?
            .keep(),
    };
    info!(path = %dir.display(), "logs directory");
    Ok(dir)
}

fn log_dir_err(path: &Path, source: io::Error) -> HarnessError {
    HarnessError::LogDir {
        path: path.to_path_buf(),
        source,
    }
}

/// A test's own log directory. Created on first use only.
#[derive(Debug, Clone)]
pub struct TestLogDir {
    path: PathBuf,
}

impl TestLogDir {
    pub fn new(run_dir: &Path, test_name: &str) -> Self {
        Self {
            path: run_dir.join(dir_name(test_name)),
        }
    }

    /// Create the directory if needed and return it.
    pub fn path(&self) -> io::Result<&Path> {
        std::fs::create_dir_all(&self.path)?;
        Ok(&self.path)
    }
}

fn dir_name(test_name: &str) -> String {
    test_name
        .chars()
        .map(|c| match c {
            'a'..='z' | 'A'..='Z' | '0'..='9' | '-' | '_' | '.' | '[' | ']' => c,
            _ => '_',
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn requested_dir_is_wiped() {
        let tmp = tempfile::tempdir().expect("tempdir");
        let logs = tmp.path().join("logs");
        std::fs::create_dir_all(logs.join("old_test")).expect("stale dir");
        std::fs::write(logs.join("old_test/error_log"), "stale").expect("stale file");

        let dir = prepare_log_dir(Some(&logs)).expect("prepare");
        assert_eq!(dir, logs);
        assert!(dir.is_dir());
        assert_eq!(std::fs::read_dir(&dir).expect("read").count(), 0);
    }

    #[test]
    fn test_dir_is_created_lazily() {
        let tmp = tempfile::tempdir().expect("tempdir");
        let test_dir = TestLogDir::new(tmp.path(), "smoke::load_module");
        assert!(!tmp.path().join("smoke__load_module").exists());

        let path = test_dir.path().expect("create").to_path_buf();
        assert_eq!(path, tmp.path().join("smoke__load_module"));
        assert!(path.is_dir());
        // second call is fine
        test_dir.path().expect("exists");
    }

    #[test]
    fn parametrized_names_keep_brackets() {
        assert_eq!(dir_name("test_mpm[prefork]"), "test_mpm[prefork]");
        assert_eq!(dir_name("a/b c"), "a_b_c");
    }
}
