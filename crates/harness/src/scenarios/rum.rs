use anyhow::ensure;

use crate::context::TestEnv;

/// The RUM build loads. Only ever bound to the RUM-enabled artifact.
pub async fn load_rum_module(env: &TestEnv) -> anyhow::Result<()> {
    let server = env.server()?;
    ensure!(
        server.check_directives(&[env.load_module_directive()]),
        "server rejected RUM module {}",
        env.module_path.display()
    );
    Ok(())
}
