use std::path::{Path, PathBuf};

use crate::command::Invocation;
use crate::key::VariantKey;

/// Where and how each variant of the subject module is built.
#[derive(Debug, Clone)]
pub struct BuildLayout {
    /// File that marks the project root.
    pub project_marker: String,
    /// Configure/compile driver.
    pub cmake: String,
    pub primary_dir: String,
    pub extended_dir: String,
    /// Extra configure flags for the extended variant.
    pub extended_flags: Vec<String>,
    /// Artifact location relative to a variant's build directory.
    pub artifact_relpath: PathBuf,
}

impl Default for BuildLayout {
    fn default() -> Self {
        Self {
            project_marker: "CMakeLists.txt".to_string(),
            cmake: "cmake".to_string(),
            primary_dir: "build".to_string(),
            extended_dir: "build-rum".to_string(),
            extended_flags: vec!["-DHTTPD_DATADOG_ENABLE_RUM=ON".to_string()],
            artifact_relpath: PathBuf::from("mod_datadog").join("mod_datadog.so"),
        }
    }
}

impl BuildLayout {
    pub fn build_dir(&self, project_root: &Path, key: VariantKey) -> PathBuf {
        match key {
            VariantKey::Primary => project_root.join(&self.primary_dir),
            VariantKey::Extended => project_root.join(&self.extended_dir),
        }
    }

    pub fn flags(&self, key: VariantKey) -> Vec<String> {
        match key {
            VariantKey::Primary => Vec::new(),
            VariantKey::Extended => self.extended_flags.clone(),
        }
    }

    pub fn artifact_path(&self, project_root: &Path, key: VariantKey) -> PathBuf {
        self.build_dir(project_root, key).join(&self.artifact_relpath)
    }

    /// `cmake -B <dir> [flags] .`
    pub fn configure(&self, project_root: &Path, key: VariantKey) -> Invocation {
        let mut args = vec![
            "-B".to_string(),
            self.build_dir(project_root, key).display().to_string(),
        ];
        args.extend(self.flags(key));
        args.push(".".to_string());
        Invocation::new(&self.cmake, args).in_dir(project_root)
    }

    /// `cmake --build <dir> -j`
    pub fn compile(&self, project_root: &Path, key: VariantKey) -> Invocation {
        let args = vec![
            "--build".to_string(),
            self.build_dir(project_root, key).display().to_string(),
            "-j".to_string(),
        ];
        Invocation::new(&self.cmake, args).in_dir(project_root)
    }
}
