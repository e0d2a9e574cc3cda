//! Monotonic time sources for latency instrumentation
//!
//! Sessions measure gate and cycle latency through a [`Clock`] so tests can
//! substitute a deterministic source.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

/// Monotonic time source
pub trait Clock: Send + Sync {
    /// Time since an arbitrary fixed origin; never decreases
    fn now(&self) -> Duration;

    /// Time elapsed since an earlier reading
    fn since(&self, earlier: Duration) -> Duration {
        self.now().saturating_sub(earlier)
    }
}

/// Wall-clock source backed by [`Instant`]
#[derive(Clone, Copy, Debug)]
pub struct MonotonicClock {
    origin: Instant,
}

impl MonotonicClock {
    /// Clock with its origin at the moment of creation
    #[must_use]
    pub fn new() -> Self {
        Self { origin: Instant::now() }
    }
}

impl Default for MonotonicClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for MonotonicClock {
    fn now(&self) -> Duration {
        self.origin.elapsed()
    }
}

/// Clock that never advances; every measured latency is zero
#[derive(Clone, Copy, Debug, Default)]
pub struct FrozenClock;

impl Clock for FrozenClock {
    fn now(&self) -> Duration {
        Duration::ZERO
    }
}

/// Clock that advances by a fixed step on every reading
#[derive(Debug)]
pub struct SteppingClock {
    step_ns: u64,
    ticks: AtomicU64,
}

impl SteppingClock {
    /// Clock advancing `step` per call to [`Clock::now`]
    #[must_use]
    pub fn new(step: Duration) -> Self {
        Self {
            step_ns: u64::try_from(step.as_nanos()).unwrap_or(u64::MAX),
            ticks: AtomicU64::new(0),
        }
    }
}

impl Clock for SteppingClock {
    fn now(&self) -> Duration {
        let tick = self.ticks.fetch_add(1, Ordering::Relaxed);
        Duration::from_nanos(tick.saturating_mul(self.step_ns))
    }
}
