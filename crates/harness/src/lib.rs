pub mod config;
pub mod context;
pub mod launcher;
pub mod logdir;
pub mod runner;
pub mod scenarios;

pub use config::HarnessConfig;
pub use context::{HarnessError, RunContext, TestEnv, select_variants};
pub use launcher::{ApacheCtl, ServerEndpoint, ServerLauncher};
pub use logdir::{TestLogDir, prepare_log_dir};

/// Invoke `$mac!(module::name, [markers...])` for every built-in scenario.
///
/// Single source of truth for the scenario list: collection in
/// `runner::collect` and dispatch in `runner::run_all` both expand it.
#[macro_export]
macro_rules! for_each_scenario {
    ($mac:ident) => {
        // smoke (2)
        $mac!(smoke::load_module, [smoke, ci]);
        $mac!(smoke::agent_roundtrip, [smoke, ci]);

        // rum (1)
        $mac!(rum::load_rum_module, [requires_rum]);
    };
}
