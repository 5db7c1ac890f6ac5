//! Background rate samplers: one long-lived task per counter family (cpu,
//! disk, net). Each task sleeps a settle delay, takes a baseline counter
//! reading, then loops: sleep the sample period, read again, record
//! `(current - previous) / period` into the family's windows.
//!
//! The previous-reading state lives entirely inside each loop; snapshot
//! takers only ever see the published windows.

use crate::config::AgentConfig;
use crate::probes;
use crate::state::AgentState;
use crate::window::{rate_per_second, RateWindow};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::sleep;
use tracing::trace;

/// Start the three family samplers if they are not already running. Safe to
/// call from every collection tick; the per-family latches guarantee at most
/// one task per family no matter how many callers race the first tick.
pub fn ensure_samplers_started(state: &AgentState, cfg: &AgentConfig) {
    let settle = cfg.settle_delay;
    let period = cfg.sample_interval;
    let period_secs = cfg.sample_interval_secs();

    state.cpu_started.get_or_init(|| {
        let source = Arc::clone(&state.source);
        spawn_rate_sampler(
            "cpu",
            vec![Arc::clone(&state.cpu_total), Arc::clone(&state.cpu_idle)],
            move || {
                let (total, idle) = probes::read_cpu_times(source.as_ref());
                vec![total, idle]
            },
            settle,
            period,
            period_secs,
            state.shutdown.clone(),
        );
    });

    state.disk_started.get_or_init(|| {
        let source = Arc::clone(&state.source);
        spawn_rate_sampler(
            "disk",
            vec![Arc::clone(&state.disk_read), Arc::clone(&state.disk_write)],
            move || {
                let (read, write) = probes::read_disk_totals(source.as_ref());
                vec![read, write]
            },
            settle,
            period,
            period_secs,
            state.shutdown.clone(),
        );
    });

    state.net_started.get_or_init(|| {
        let source = Arc::clone(&state.source);
        spawn_rate_sampler(
            "net",
            vec![
                Arc::clone(&state.net_rx),
                Arc::clone(&state.net_tx),
                Arc::clone(&state.net_rx_pkts),
                Arc::clone(&state.net_tx_pkts),
            ],
            move || {
                let t = probes::read_net_totals(source.as_ref());
                vec![t.rx_bytes, t.tx_bytes, t.rx_packets, t.tx_packets]
            },
            settle,
            period,
            period_secs,
            state.shutdown.clone(),
        );
    });
}

/// One sampler loop. `read` returns the current absolute counter per window,
/// in window order; a failed read surfaces as zeros and simply produces a
/// bad sample for that interval — the window ages it out on its own.
///
/// `period_secs` (the configured period, not observed elapsed time) is the
/// rate divisor, so scheduling delay skews a sample slightly instead of
/// being corrected.
pub(crate) fn spawn_rate_sampler<F>(
    family: &'static str,
    windows: Vec<Arc<RateWindow>>,
    read: F,
    settle: Duration,
    period: Duration,
    period_secs: u64,
    mut shutdown: watch::Receiver<bool>,
) -> JoinHandle<()>
where
    F: Fn() -> Vec<u64> + Send + 'static,
{
    tokio::spawn(async move {
        if wait_or_shutdown(settle, &mut shutdown).await {
            return;
        }
        let mut prev = read();
        loop {
            if wait_or_shutdown(period, &mut shutdown).await {
                return;
            }
            let cur = read();
            for (idx, window) in windows.iter().enumerate() {
                let p = prev.get(idx).copied().unwrap_or(0);
                let c = cur.get(idx).copied().unwrap_or(0);
                window.record(rate_per_second(p, c, period_secs));
            }
            prev = cur;
            trace!(family, "recorded rate samples");
        }
    })
}

/// Sleep `d` unless shutdown fires first; true means stop the loop.
async fn wait_or_shutdown(d: Duration, shutdown: &mut watch::Receiver<bool>) -> bool {
    if *shutdown.borrow() {
        return true;
    }
    tokio::select! {
        _ = sleep(d) => false,
        _ = shutdown.changed() => true,
    }
}
