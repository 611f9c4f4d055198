use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};

use tracing::{debug, info};

use crate::builder::VariantBuilder;
use crate::error::{BuildError, SelectError};
use crate::key::VariantKey;

/// Test needs the module built with RUM support.
pub const MARKER_REQUIRES_RUM: &str = "requires_rum";
/// Fast checks that the module loads and emits traces.
pub const MARKER_SMOKE: &str = "smoke";
/// Stable enough to run in CI.
pub const MARKER_CI: &str = "ci";

/// A collected test and its declared markers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TestCase {
    pub name: String,
    pub markers: BTreeSet<String>,
}

impl TestCase {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            markers: BTreeSet::new(),
        }
    }

    pub fn with_marker(mut self, marker: &str) -> Self {
        self.markers.insert(marker.to_string());
        self
    }

    pub fn has_marker(&self, marker: &str) -> bool {
        self.markers.contains(marker)
    }

    /// Extended when marked `requires_rum`, primary otherwise.
    pub fn required_variant(&self) -> VariantKey {
        if self.has_marker(MARKER_REQUIRES_RUM) {
            VariantKey::Extended
        } else {
            VariantKey::Primary
        }
    }
}

/// Variants at least one of `tests` runs against.
pub fn required_variants(tests: &[TestCase]) -> BTreeSet<VariantKey> {
    tests.iter().map(TestCase::required_variant).collect()
}

/// Which artifact the server launcher should load right now.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ActiveVariantBinding {
    variant: Option<VariantKey>,
    artifact: Option<PathBuf>,
}

impl ActiveVariantBinding {
    pub fn artifact(&self) -> Option<&Path> {
        self.artifact.as_deref()
    }

    /// `None` for an override or when nothing is bound.
    pub fn variant(&self) -> Option<VariantKey> {
        self.variant
    }

    pub fn reset(&mut self) {
        self.variant = None;
        self.artifact = None;
    }

    fn bind(&mut self, variant: Option<VariantKey>, artifact: PathBuf) -> &Path {
        self.variant = variant;
        self.artifact.insert(artifact)
    }
}

enum ArtifactSource {
    /// User-supplied artifact; used for every test, nothing is built.
    Override(PathBuf),
    Built(BTreeMap<VariantKey, PathBuf>),
}

/// Decides, per test, which built artifact is active.
pub struct VariantSelector {
    source: ArtifactSource,
    binding: ActiveVariantBinding,
}

impl VariantSelector {
    /// Bypass building: every test binds to `artifact`.
    pub fn with_override(artifact: impl Into<PathBuf>) -> Self {
        let artifact = artifact.into();
        info!(path = %artifact.display(), "using user-provided module (skipping auto-build)");
        Self {
            source: ArtifactSource::Override(artifact),
            binding: ActiveVariantBinding::default(),
        }
    }

    /// Build exactly the variants `tests` need, before any of them runs.
    /// The first build failure aborts.
    pub fn prepare(builder: &mut VariantBuilder, tests: &[TestCase]) -> Result<Self, BuildError> {
        let needed = required_variants(tests);
        info!(
            primary = needed.contains(&VariantKey::Primary),
            extended = needed.contains(&VariantKey::Extended),
            "module variants needed"
        );

        let mut built = BTreeMap::new();
        for key in needed {
            built.insert(key, builder.build(key)?);
        }
        Ok(Self {
            source: ArtifactSource::Built(built),
            binding: ActiveVariantBinding::default(),
        })
    }

    pub fn is_override(&self) -> bool {
        matches!(self.source, ArtifactSource::Override(_))
    }

    /// Built variants, in key order. Empty for an override.
    pub fn available(&self) -> Vec<VariantKey> {
        match &self.source {
            ArtifactSource::Override(_) => Vec::new(),
            ArtifactSource::Built(built) => built.keys().copied().collect(),
        }
    }

    pub fn artifact_for(&self, key: VariantKey) -> Option<&Path> {
        match &self.source {
            ArtifactSource::Override(path) => Some(path),
            ArtifactSource::Built(built) => built.get(&key).map(PathBuf::as_path),
        }
    }

    pub fn binding(&self) -> &ActiveVariantBinding {
        &self.binding
    }

    /// Run-wide default before any test: primary if built, else extended.
    pub fn bind_default(&mut self) -> Result<&Path, SelectError> {
        self.binding.reset();
        match &self.source {
            ArtifactSource::Override(path) => Ok(self.binding.bind(None, path.clone())),
            ArtifactSource::Built(built) => {
                let (key, path) = [VariantKey::Primary, VariantKey::Extended]
                    .into_iter()
                    .find_map(|key| built.get(&key).map(|path| (key, path.clone())))
                    .ok_or(SelectError::NoArtifactAvailable)?;
                Ok(self.binding.bind(Some(key), path))
            }
        }
    }

    /// Rebind to the artifact `test` requires.
    ///
    /// Never falls back to a different variant: a missing one is an error for
    /// that test and leaves nothing bound.
    pub fn bind_for(&mut self, test: &TestCase) -> Result<&Path, SelectError> {
        self.binding.reset();
        let variant = test.required_variant();
        let path = match &self.source {
            ArtifactSource::Override(path) => {
                return Ok(self.binding.bind(None, path.clone()));
            }
            ArtifactSource::Built(built) => built.get(&variant).cloned(),
        };

        let path = path.ok_or_else(|| SelectError::VariantUnavailable {
            test: test.name.clone(),
            variant,
        })?;
        debug!(test = %test.name, %variant, path = %path.display(), "module bound");
        Ok(self.binding.bind(Some(variant), path))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layout::BuildLayout;
    use crate::testing::RecordingRunner;

    fn builder(root: &Path, runner: &RecordingRunner) -> VariantBuilder {
        std::fs::write(root.join("CMakeLists.txt"), "").expect("marker");
        VariantBuilder::new(root, BuildLayout::default(), Box::new(runner.clone()))
            .expect("builder")
    }

    #[test]
    fn marker_decides_required_variant() {
        assert_eq!(
            TestCase::new("plain").required_variant(),
            VariantKey::Primary
        );
        assert_eq!(
            TestCase::new("rum")
                .with_marker(MARKER_REQUIRES_RUM)
                .required_variant(),
            VariantKey::Extended
        );
        assert_eq!(
            TestCase::new("smoke")
                .with_marker(MARKER_SMOKE)
                .required_variant(),
            VariantKey::Primary
        );
    }

    #[test]
    fn only_needed_variants_are_built() {
        let dir = tempfile::tempdir().expect("tempdir");
        let runner = RecordingRunner::new(&BuildLayout::default());
        let mut builder = builder(dir.path(), &runner);

        let tests = vec![TestCase::new("a"), TestCase::new("b")];
        let selector = VariantSelector::prepare(&mut builder, &tests).expect("prepare");

        assert_eq!(selector.available(), vec![VariantKey::Primary]);
        assert_eq!(runner.calls().len(), 2);
        assert_eq!(
            builder.status(VariantKey::Extended),
            crate::BuildStatus::NotStarted
        );
    }

    #[test]
    fn no_tests_builds_nothing() {
        let dir = tempfile::tempdir().expect("tempdir");
        let runner = RecordingRunner::new(&BuildLayout::default());
        let mut builder = builder(dir.path(), &runner);

        let mut selector = VariantSelector::prepare(&mut builder, &[]).expect("prepare");
        assert!(runner.calls().is_empty());
        assert!(matches!(
            selector.bind_default(),
            Err(SelectError::NoArtifactAvailable)
        ));
    }

    #[test]
    fn binding_follows_each_test() {
        let dir = tempfile::tempdir().expect("tempdir");
        let runner = RecordingRunner::new(&BuildLayout::default());
        let mut builder = builder(dir.path(), &runner);

        let plain = TestCase::new("test_mpm");
        let rum = TestCase::new("test_rum_selective_disabling").with_marker(MARKER_REQUIRES_RUM);
        let mut selector =
            VariantSelector::prepare(&mut builder, &[plain.clone(), rum.clone()]).expect("prepare");

        let rum_path = selector.bind_for(&rum).expect("rum bound").to_path_buf();
        assert_eq!(selector.binding().variant(), Some(VariantKey::Extended));
        assert!(rum_path.starts_with(dir.path().join("build-rum")));

        let plain_path = selector.bind_for(&plain).expect("plain bound").to_path_buf();
        assert_eq!(selector.binding().variant(), Some(VariantKey::Primary));
        assert_eq!(selector.binding().artifact(), Some(plain_path.as_path()));
        assert_ne!(plain_path, rum_path);
    }

    #[test]
    fn unbuilt_variant_fails_without_fallback() {
        let dir = tempfile::tempdir().expect("tempdir");
        let runner = RecordingRunner::new(&BuildLayout::default());
        let mut builder = builder(dir.path(), &runner);

        let mut selector =
            VariantSelector::prepare(&mut builder, &[TestCase::new("plain")]).expect("prepare");
        selector
            .bind_for(&TestCase::new("plain"))
            .expect("plain bound");

        let late = TestCase::new("late_rum").with_marker(MARKER_REQUIRES_RUM);
        let err = selector.bind_for(&late).expect_err("must not substitute");

        assert!(err.to_string().contains("variant unavailable"));
        assert!(selector.binding().artifact().is_none());
    }

    #[test]
    fn default_prefers_primary() {
        let dir = tempfile::tempdir().expect("tempdir");
        let runner = RecordingRunner::new(&BuildLayout::default());
        let mut builder = builder(dir.path(), &runner);

        let tests = [
            TestCase::new("rum").with_marker(MARKER_REQUIRES_RUM),
            TestCase::new("plain"),
        ];
        let mut selector = VariantSelector::prepare(&mut builder, &tests).expect("prepare");
        selector.bind_default().expect("default");
        assert_eq!(selector.binding().variant(), Some(VariantKey::Primary));
    }

    #[test]
    fn override_binds_every_test() {
        let mut selector = VariantSelector::with_override("/opt/mod_datadog.so");
        let rum = TestCase::new("rum").with_marker(MARKER_REQUIRES_RUM);

        let path = selector.bind_for(&rum).expect("bound").to_path_buf();
        assert_eq!(path, PathBuf::from("/opt/mod_datadog.so"));
        assert_eq!(selector.binding().variant(), None);
        assert!(selector.is_override());
        assert!(selector.available().is_empty());
    }
}
