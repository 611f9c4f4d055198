use std::time::Duration;

use anyhow::ensure;

use tracebench_core::{Span, Trace};

use crate::context::TestEnv;

/// The server accepts the bound module in a configuration test.
pub async fn load_module(env: &TestEnv) -> anyhow::Result<()> {
    let server = env.server()?;
    ensure!(
        server.check_directives(&[env.load_module_directive()]),
        "server rejected {}",
        env.module_path.display()
    );
    Ok(())
}

/// A trace submitted under this test's session is read back unchanged.
pub async fn agent_roundtrip(env: &TestEnv) -> anyhow::Result<()> {
    let trace = Trace::new(vec![
        Span::new()
            .with("service", "tracebench")
            .with("name", "harness.self_check")
            .with("resource", env.name.as_str())
            .with("span_id", 1u64)
            .with("parent_id", 0u64),
    ]);
    env.session.submit(std::slice::from_ref(&trace)).await?;

    let traces = env.session.get_traces(Duration::from_secs(5)).await;
    ensure!(
        traces == vec![trace],
        "expected the submitted trace back, got {} trace(s)",
        traces.len()
    );
    Ok(())
}
