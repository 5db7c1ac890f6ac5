//! Once-in-duration executor: runs a guarded action at most once per
//! cooldown window, coalescing concurrent callers.
//!
//! The gate is an explicit two-state machine (armed / cooling down). Winning
//! callers flip it to cooling-down, run the action, then arm a reset timer;
//! everyone else bounces off immediately without blocking on the in-flight
//! run. Because the gate stays cooling-down until its own timer fires, a
//! timer armed by run *k* can never clobber the gate state of run *k+1*.

use std::future::Future;
use std::sync::{Arc, Mutex};
use tokio::time::{sleep, Duration};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Gate {
    Armed,
    CoolingDown,
}

#[derive(Debug, Clone)]
pub struct OnceInDuration {
    cooldown: Duration,
    gate: Arc<Mutex<Gate>>,
}

impl OnceInDuration {
    pub fn new(cooldown: Duration) -> Self {
        Self {
            cooldown,
            gate: Arc::new(Mutex::new(Gate::Armed)),
        }
    }

    /// Claim the gate. Exactly one of any set of concurrent callers wins.
    fn begin(&self) -> bool {
        let mut gate = self.gate.lock().unwrap_or_else(|e| e.into_inner());
        match *gate {
            Gate::Armed => {
                *gate = Gate::CoolingDown;
                true
            }
            Gate::CoolingDown => false,
        }
    }

    /// Guard that arms the reset timer when dropped. Dropping on the unwind
    /// path too means a panicking action still re-arms the gate after the
    /// cooldown instead of wedging it in cooling-down for the process
    /// lifetime.
    fn rearm_guard(&self) -> RearmGuard {
        RearmGuard {
            gate: Arc::clone(&self.gate),
            cooldown: self.cooldown,
        }
    }

    /// Run `action` synchronously if the gate is armed. Returns whether this
    /// call was the one that ran it; losers return false without blocking.
    pub fn run<F: FnOnce()>(&self, action: F) -> bool {
        if !self.begin() {
            return false;
        }
        let _rearm = self.rearm_guard();
        action();
        true
    }

    /// Dispatch `action` on a background task if the gate is armed. The
    /// reset timer is armed only once the action finishes (or panics), so
    /// the cooldown is measured from completion like the synchronous path.
    pub fn run_detached<F>(&self, action: F) -> bool
    where
        F: Future<Output = ()> + Send + 'static,
    {
        if !self.begin() {
            return false;
        }
        let rearm = self.rearm_guard();
        tokio::spawn(async move {
            let _rearm = rearm;
            action.await;
        });
        true
    }
}

struct RearmGuard {
    gate: Arc<Mutex<Gate>>,
    cooldown: Duration,
}

impl Drop for RearmGuard {
    fn drop(&mut self) {
        let gate = Arc::clone(&self.gate);
        let cooldown = self.cooldown;
        tokio::spawn(async move {
            sleep(cooldown).await;
            *gate.lock().unwrap_or_else(|e| e.into_inner()) = Gate::Armed;
        });
    }
}
