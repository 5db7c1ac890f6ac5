//! Rolling rate window: fixed-capacity FIFO of per-interval rate samples.
//!
//! One background sampler owns the writes for a window; any number of
//! snapshot takers read it concurrently. Writes build a fresh vector and
//! publish it by swapping the shared `Arc`, so a reader never observes a
//! window mid-rotation.

use std::sync::{Arc, RwLock};

/// Fixed-capacity history of per-second rates, oldest first.
///
/// The window is zero-filled at construction: before the first sampler
/// refresh every entry reads as zero, which consumers cannot distinguish
/// from "no traffic".
#[derive(Debug)]
pub struct RateWindow {
    capacity: usize,
    rates: RwLock<Arc<Vec<u64>>>,
}

impl RateWindow {
    /// Capacity is clamped to at least one entry; `record` relies on the
    /// window never being empty.
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            capacity,
            rates: RwLock::new(Arc::new(vec![0; capacity])),
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Evict the oldest entry and append `rate`. Writer-side only; the
    /// owning sampler is the single caller.
    pub fn record(&self, rate: u64) {
        let mut guard = self.rates.write().unwrap_or_else(|e| e.into_inner());
        let mut next = Vec::with_capacity(self.capacity);
        next.extend_from_slice(&guard[1..]);
        next.push(rate);
        *guard = Arc::new(next);
    }

    /// Current window contents, oldest first. Length is always `capacity`.
    pub fn current(&self) -> Arc<Vec<u64>> {
        Arc::clone(&self.rates.read().unwrap_or_else(|e| e.into_inner()))
    }
}

/// Per-interval rate from two absolute counter readings.
///
/// Divides by the configured period length, not observed elapsed time; a
/// scheduling-delayed sample therefore skews slightly rather than being
/// corrected, keeping rates comparable across windows. Counter resets
/// (current < previous) saturate to zero instead of wrapping.
pub fn rate_per_second(previous: u64, current: u64, period_secs: u64) -> u64 {
    current.saturating_sub(previous) / period_secs.max(1)
}
