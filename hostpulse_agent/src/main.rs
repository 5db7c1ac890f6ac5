use hostpulse_agent::config::AgentConfig;
use hostpulse_agent::probes::FsSource;
use hostpulse_agent::publish;
use hostpulse_agent::state::AgentState;
use std::sync::Arc;
use tokio::sync::watch;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    // Missing URL is the one fatal configuration error; everything past this
    // point is best-effort and must not take the process down.
    let cfg = AgentConfig::from_args(std::env::args())?;

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let state = AgentState::new(&cfg, Arc::new(FsSource), shutdown_rx.clone());

    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("shutdown signal received");
            let _ = shutdown_tx.send(true);
        }
    });

    info!(url = %cfg.url, interval_secs = cfg.publish_interval.as_secs(), "hostpulse agent starting");
    publish::run_publisher(state, cfg, shutdown_rx).await
}
