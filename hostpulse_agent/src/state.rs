//! Shared agent state: rolling windows, throttle gates, and the cached
//! values their background refreshes feed. Cloned freely; everything inside
//! is a shared handle.

use crate::config::AgentConfig;
use crate::probes::CounterSource;
use crate::throttle::OnceInDuration;
use crate::window::RateWindow;
use once_cell::sync::OnceCell;
use std::sync::atomic::{AtomicI64, AtomicU64};
use std::sync::{Arc, RwLock};
use tokio::sync::watch;

#[derive(Clone)]
pub struct AgentState {
    pub source: Arc<dyn CounterSource>,

    // Rolling rate windows, one per counter
    pub cpu_total: Arc<RateWindow>,
    pub cpu_idle: Arc<RateWindow>,
    pub disk_read: Arc<RateWindow>,
    pub disk_write: Arc<RateWindow>,
    pub net_rx: Arc<RateWindow>,
    pub net_tx: Arc<RateWindow>,
    pub net_rx_pkts: Arc<RateWindow>,
    pub net_tx_pkts: Arc<RateWindow>,

    // Single-start latches, one per sampler family. Distinct from the
    // throttle gates below: these fire exactly once for the process
    // lifetime.
    pub cpu_started: Arc<OnceCell<()>>,
    pub disk_started: Arc<OnceCell<()>>,
    pub net_started: Arc<OnceCell<()>>,

    // Throttled facts and the caches their runs fill
    pub ip_gate: OnceInDuration,
    pub login_gate: OnceInDuration,
    pub rss_gate: OnceInDuration,
    pub public_ip: Arc<RwLock<String>>,
    pub login_count: Arc<AtomicI64>,
    pub rss_cache: Arc<AtomicU64>,

    /// Flips to true exactly once; every background loop selects on it.
    pub shutdown: watch::Receiver<bool>,
}

impl AgentState {
    pub fn new(
        cfg: &AgentConfig,
        source: Arc<dyn CounterSource>,
        shutdown: watch::Receiver<bool>,
    ) -> Self {
        let window = || Arc::new(RateWindow::new(cfg.window_capacity));
        Self {
            source,
            cpu_total: window(),
            cpu_idle: window(),
            disk_read: window(),
            disk_write: window(),
            net_rx: window(),
            net_tx: window(),
            net_rx_pkts: window(),
            net_tx_pkts: window(),
            cpu_started: Arc::new(OnceCell::new()),
            disk_started: Arc::new(OnceCell::new()),
            net_started: Arc::new(OnceCell::new()),
            ip_gate: OnceInDuration::new(cfg.ip_lookup_cooldown),
            login_gate: OnceInDuration::new(cfg.login_lookup_cooldown),
            rss_gate: OnceInDuration::new(cfg.rss_lookup_cooldown),
            public_ip: Arc::new(RwLock::new(String::new())),
            login_count: Arc::new(AtomicI64::new(0)),
            rss_cache: Arc::new(AtomicU64::new(0)),
            shutdown,
        }
    }
}
