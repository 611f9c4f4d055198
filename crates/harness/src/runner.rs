use std::time::{Duration, Instant};

use tracing::{info, warn};

use tracebench_variants::TestCase;

use crate::context::{RunContext, TestEnv};
use crate::scenarios;

/// Result of running a single scenario.
pub struct TestResult {
    pub name: String,
    pub passed: bool,
    pub duration: Duration,
    pub error: Option<String>,
}

/// Aggregated results of a full run.
pub struct TestSuite {
    pub results: Vec<TestResult>,
}

impl TestSuite {
    pub fn passed(&self) -> usize {
        self.results.iter().filter(|r| r.passed).count()
    }

    pub fn failed(&self) -> usize {
        self.results.iter().filter(|r| !r.passed).count()
    }

    pub fn total(&self) -> usize {
        self.results.len()
    }
}

/// Every registered scenario whose name contains `filter`, with its markers.
pub fn collect(filter: Option<&str>) -> Vec<TestCase> {
    let mut tests = Vec::new();

    macro_rules! collect_scenario {
        ($module:ident :: $name:ident, [$($marker:ident),*]) => {
            let name = concat!(stringify!($module), "::", stringify!($name));
            if filter.is_none_or(|f| name.contains(f)) {
                tests.push(TestCase::new(name)$(.with_marker(stringify!($marker)))*);
            }
        };
    }

    crate::for_each_scenario!(collect_scenario);
    tests
}

/// Run `tests` one after another against the shared context.
///
/// Tests run sequentially: the active module binding and the server under
/// test are shared by the whole run.
pub async fn run_all(ctx: &mut RunContext, tests: &[TestCase]) -> TestSuite {
    let mut results = Vec::with_capacity(tests.len());
    for test in tests {
        let start = Instant::now();
        let result = run_one(ctx, test).await;
        let duration = start.elapsed();
        match &result {
            Ok(()) => info!(test = %test.name, ?duration, "passed"),
            Err(e) => warn!(test = %test.name, ?duration, "failed: {e:#}"),
        }
        results.push(TestResult {
            name: test.name.clone(),
            passed: result.is_ok(),
            duration,
            error: result.err().map(|e| format!("{e:#}")),
        });
    }
    TestSuite { results }
}

async fn run_one(ctx: &mut RunContext, test: &TestCase) -> anyhow::Result<()> {
    let env = ctx.setup(test).await?;
    dispatch(&test.name, &env).await
}

async fn dispatch(scenario: &str, env: &TestEnv) -> anyhow::Result<()> {
    macro_rules! dispatch_scenario {
        ($module:ident :: $name:ident, [$($marker:ident),*]) => {
            if scenario == concat!(stringify!($module), "::", stringify!($name)) {
                return scenarios::$module::$name(env).await;
            }
        };
    }

    crate::for_each_scenario!(dispatch_scenario);
    anyhow::bail!("no scenario registered as `{scenario}`")
}

#[cfg(test)]
mod tests {
    use super::*;
    use tracebench_variants::{MARKER_REQUIRES_RUM, MARKER_SMOKE, VariantKey};

    #[test]
    fn collects_every_scenario_with_markers() {
        let tests = collect(None);
        assert_eq!(tests.len(), 3);

        let rum = tests
            .iter()
            .find(|t| t.name == "rum::load_rum_module")
            .expect("rum scenario");
        assert!(rum.has_marker(MARKER_REQUIRES_RUM));
        assert_eq!(rum.required_variant(), VariantKey::Extended);

        let smoke = tests
            .iter()
            .find(|t| t.name == "smoke::load_module")
            .expect("smoke scenario");
        assert!(smoke.has_marker(MARKER_SMOKE));
        assert_eq!(smoke.required_variant(), VariantKey::Primary);
    }

    #[test]
    fn filter_matches_substrings() {
        let tests = collect(Some("smoke::"));
        assert_eq!(tests.len(), 2);
        assert!(tests.iter().all(|t| t.name.starts_with("smoke::")));
        assert!(collect(Some("no-such-scenario")).is_empty());
    }

    #[test]
    fn suite_counts() {
        let result = |name: &str, passed| TestResult {
            name: name.to_string(),
            passed,
            duration: Duration::ZERO,
            error: None,
        };
        let suite = TestSuite {
            results: vec![result("a", true), result("b", false), result("c", true)],
        };
        assert_eq!(suite.passed(), 2);
        assert_eq!(suite.failed(), 1);
        assert_eq!(suite.total(), 3);
    }
}
