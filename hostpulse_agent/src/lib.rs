//! hostpulse: a host-metrics agent that samples OS counters in the
//! background and pushes one JSON snapshot per tick to a collector.
//!
//! The interesting machinery is [`window::RateWindow`] (per-family rolling
//! rate history, written by one background sampler, read lock-free by the
//! assembler) and [`throttle::OnceInDuration`] (at most one run of an
//! expensive probe per cooldown). Everything else is thin: /proc parsing in
//! [`probes`], aggregation in [`collect`], and the push loop in [`publish`].

pub mod collect;
pub mod config;
pub mod probes;
pub mod publish;
pub mod sampler;
pub mod state;
pub mod throttle;
pub mod types;
pub mod window;
