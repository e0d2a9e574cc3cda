//! Analysis window sizing under load
//!
//! With [`DegradationPolicy::ShrinkWindow`] a degraded cycle halves the next
//! window, down to the configured floor, and a run of clean cycles doubles it
//! back toward the full size. [`DegradationPolicy::Observe`] always keeps the
//! full window.

use venturi_core::config::{DegradationPolicy, SessionConfig};

/// Effective analysis window of a session
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct WindowGovernor {
    policy: DegradationPolicy,
    full: usize,
    floor: usize,
    recovery_cycles: u32,
    current: usize,
    clean_streak: u32,
}

impl WindowGovernor {
    /// Start at the full window of `config`
    #[must_use]
    pub fn new(config: &SessionConfig) -> Self {
        let full = config.signal.window_size;
        Self {
            policy: config.degradation.policy,
            full,
            floor: config.degradation.min_window.clamp(1, full.max(1)),
            recovery_cycles: config.degradation.recovery_cycles,
            current: full,
            clean_streak: 0,
        }
    }

    /// Window length the next cycle analyses
    #[inline]
    #[must_use]
    pub const fn current(&self) -> usize {
        self.current
    }

    /// Governor after a completed cycle
    #[must_use]
    pub fn after_cycle(&self, degraded: bool) -> Self {
        if self.policy == DegradationPolicy::Observe {
            return *self;
        }

        let mut next = *self;
        if degraded {
            next.current = (self.current / 2).max(self.floor);
            next.clean_streak = 0;
        } else {
            next.clean_streak = self.clean_streak.saturating_add(1);
            if next.clean_streak >= self.recovery_cycles && self.current < self.full {
                next.current = self.current.saturating_mul(2).min(self.full);
                next.clean_streak = 0;
            }
        }
        next
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn shrinking(window: usize, floor: usize, recovery: u32) -> WindowGovernor {
        let mut config = SessionConfig::new(256.0, 1, window);
        config.degradation.policy = DegradationPolicy::ShrinkWindow;
        config.degradation.min_window = floor;
        config.degradation.recovery_cycles = recovery;
        WindowGovernor::new(&config)
    }

    #[test]
    fn test_observe_keeps_full_window() {
        let g = WindowGovernor::new(&SessionConfig::new(256.0, 1, 256));
        assert_eq!(g.after_cycle(true).current(), 256);
    }

    #[test]
    fn test_shrinks_to_floor() {
        let mut g = shrinking(256, 64, 4);
        g = g.after_cycle(true);
        assert_eq!(g.current(), 128);
        g = g.after_cycle(true).after_cycle(true).after_cycle(true);
        assert_eq!(g.current(), 64);
    }

    #[test]
    fn test_recovers_after_clean_cycles() {
        let mut g = shrinking(256, 64, 3).after_cycle(true).after_cycle(true);
        assert_eq!(g.current(), 64);

        g = g.after_cycle(false).after_cycle(false);
        assert_eq!(g.current(), 64);
        g = g.after_cycle(false);
        assert_eq!(g.current(), 128);

        // A degraded cycle resets the clean run
        g = g.after_cycle(false).after_cycle(true);
        assert_eq!(g.current(), 64);
    }

    #[test]
    fn test_never_grows_past_full() {
        let mut g = shrinking(256, 64, 1);
        for _ in 0..10 {
            g = g.after_cycle(false);
        }
        assert_eq!(g.current(), 256);
    }
}
