use tracebench_agent::{AgentConfig, AgentRuntime};
use tracing::info;

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "tracebench_agent=info,tower_http=info".into()),
        )
        .init();

    let config = AgentConfig::from_env()?;
    let mut agent = AgentRuntime::new(config);
    let addr = agent.start()?;
    info!("agent ready at http://{addr}, Ctrl+C to stop");

    tokio::signal::ctrl_c().await?;
    info!("received Ctrl+C");

    agent.stop()?;
    info!(sessions = agent.store().session_count(), "agent stopped");
    Ok(())
}
