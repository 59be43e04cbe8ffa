#![deny(
    trivial_numeric_casts,
    missing_docs,
    unsafe_code,
    unstable_features,
    unused_import_braces,
    unused_qualifications,
    unused_extern_crates,
    unused_results
)]
#![warn(rust_2021_compatibility, unreachable_pub)]

//! Monotonic clock source and fixed-period sleep loop used to pace the
//! mission executor's main loop.
//!
//! [`TimedLooper`] sleeps until the next scheduled tick, skipping the sleep
//! (and reporting an overrun) if the previous iteration ran long, rather than
//! trying to make up lost time. This mirrors the overrun policy used
//! throughout `component`: a slow tick never accumulates phase debt.

use std::{
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
    time::{Duration, Instant},
};

/// A fixed-period cooperative sleep loop.
///
/// Each call to [`TimedLooper::wait`] blocks until `dt` seconds have elapsed
/// since the previous call. If the caller's own work overran the period, the
/// sleep is skipped, an overrun is recorded, and the next deadline is
/// rebased on "now" instead of drifting further behind.
#[derive(Debug)]
pub struct TimedLooper {
    name: String,
    dt: Duration,
    next_tick: Option<Instant>,
    overrun_count: u64,
    running: Arc<AtomicBool>,
}

impl TimedLooper {
    /// Creates a new looper with the given period and name (used only for
    /// diagnostics).
    pub fn new(dt: Duration, name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            dt,
            next_tick: None,
            overrun_count: 0,
            running: Arc::new(AtomicBool::new(true)),
        }
    }

    /// Returns a handle that can be used to interrupt this looper (and any
    /// clone of it) from outside the loop, e.g. a Ctrl+C handler.
    pub fn interrupt_handle(&self) -> InterruptHandle {
        InterruptHandle {
            running: self.running.clone(),
        }
    }

    /// Returns the configured period.
    pub fn period(&self) -> Duration {
        self.dt
    }

    /// Returns the number of overruns observed so far.
    pub fn overrun_count(&self) -> u64 {
        self.overrun_count
    }

    /// Returns `true` while the loop should keep iterating. Becomes `false`
    /// once `interrupt_handle()` has been used to stop the loop.
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }

    /// Blocks until the next tick is due, then returns `true`. Returns
    /// `false` immediately (without sleeping) once the loop has been
    /// interrupted, so `while looper.wait() { ... }` terminates promptly.
    pub fn wait(&mut self) -> bool {
        if !self.is_running() {
            return false;
        }

        let now = Instant::now();
        let next_tick = self.next_tick.unwrap_or(now);

        if now >= next_tick {
            if self.next_tick.is_some() {
                self.overrun_count += 1;
                tracing::debug!(looper = %self.name, overrun_count = self.overrun_count, "looper overran its period, dropping accumulated phase");
            }
            self.next_tick = Some(now + self.dt);
        } else {
            std::thread::sleep(next_tick - now);
            self.next_tick = Some(next_tick + self.dt);
        }

        self.is_running()
    }
}

/// A handle that can interrupt a [`TimedLooper`] from another context, e.g. a
/// Ctrl+C signal handler registered with the `ctrlc` crate.
#[derive(Debug, Clone)]
pub struct InterruptHandle {
    running: Arc<AtomicBool>,
}

impl InterruptHandle {
    /// Signals the owning looper to stop at its next `wait()` call.
    pub fn interrupt(&self) {
        self.running.store(false, Ordering::Release);
    }

    /// Returns whether the owning looper has been interrupted.
    pub fn is_interrupted(&self) -> bool {
        !self.running.load(Ordering::Acquire)
    }
}

#[cfg(test)]
mod test {
    use std::time::Duration;

    use super::TimedLooper;

    #[test]
    fn ticks_at_configured_period() {
        let mut looper = TimedLooper::new(Duration::from_millis(5), "test");
        let start = std::time::Instant::now();
        for _ in 0..5 {
            assert!(looper.wait());
        }
        assert!(start.elapsed() >= Duration::from_millis(20));
        assert_eq!(looper.overrun_count(), 0);
    }

    #[test]
    fn overrun_resets_phase_instead_of_accumulating_debt() {
        let mut looper = TimedLooper::new(Duration::from_millis(5), "test");
        assert!(looper.wait());
        std::thread::sleep(Duration::from_millis(20));
        assert!(looper.wait());
        assert_eq!(looper.overrun_count(), 1);
    }

    #[test]
    fn interrupt_stops_the_loop() {
        let mut looper = TimedLooper::new(Duration::from_millis(1), "test");
        let handle = looper.interrupt_handle();
        handle.interrupt();
        assert!(!looper.wait());
    }
}
