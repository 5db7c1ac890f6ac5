//! Publisher loop: collect, serialize, POST, sleep, repeat. Fire and forget:
//! a failed push is logged and dropped, never retried, and never blocks the
//! next tick.

use crate::collect::collect;
use crate::config::AgentConfig;
use crate::state::AgentState;
use reqwest::header::CONTENT_TYPE;
use tokio::sync::watch;
use tokio::time::sleep;
use tracing::{debug, warn};

pub async fn run_publisher(
    state: AgentState,
    cfg: AgentConfig,
    mut shutdown: watch::Receiver<bool>,
) -> anyhow::Result<()> {
    let client = reqwest::Client::builder()
        .timeout(cfg.publish_interval)
        .danger_accept_invalid_certs(cfg.insecure_tls)
        .build()?;

    loop {
        let snapshot = collect(&state, &cfg);
        match serde_json::to_vec(&snapshot) {
            Ok(body) => {
                match client
                    .post(&cfg.url)
                    .header(CONTENT_TYPE, "application/json; charset=utf-8")
                    .body(body)
                    .send()
                    .await
                {
                    Ok(resp) => debug!(status = %resp.status(), "pushed snapshot"),
                    Err(e) => warn!(error = %e, "snapshot push failed"),
                }
            }
            Err(e) => warn!(error = %e, "snapshot serialization failed"),
        }

        if *shutdown.borrow() {
            return Ok(());
        }
        tokio::select! {
            _ = sleep(cfg.publish_interval) => {}
            _ = shutdown.changed() => return Ok(()),
        }
    }
}
