//! Wall-clock abstraction for deterministic testing.
//!
//! Decouples the causal engine and presence tracker from the system clock so
//! that adversarial-trace tests can drive time explicitly instead of
//! sleeping in real time.

/// Source of wall-clock milliseconds.
///
/// Timestamps from this trait are used for tie-breaks (the timestamp-ordered
/// winner rule) and liveness (`now - last_seen_ms`), never for causal
/// ordering -- that is the vector clock's job.
pub trait Clock {
    /// Current wall-clock time in milliseconds since the Unix epoch.
    ///
    /// # Invariants
    ///
    /// Must never go backwards within a single session.
    fn now_ms(&self) -> u64;
}

/// Production clock backed by [`std::time::SystemTime`].
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_ms(&self) -> u64 {
        std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .map(|d| u64::try_from(d.as_millis()).unwrap_or(u64::MAX))
            .unwrap_or(0)
    }
}

/// Deterministic clock for tests and the adversarial harness: an explicit
/// millisecond counter the caller advances by hand.
#[derive(Debug, Clone, Copy, Default)]
pub struct VirtualClock {
    now_ms: u64,
}

impl VirtualClock {
    /// A virtual clock starting at `now_ms`.
    #[must_use]
    pub const fn at(now_ms: u64) -> Self {
        Self { now_ms }
    }

    /// Move the clock forward by `delta_ms`.
    pub fn advance(&mut self, delta_ms: u64) {
        self.now_ms = self.now_ms.saturating_add(delta_ms);
    }

    /// Set the clock to an explicit value. Must not move it backwards.
    pub fn set(&mut self, now_ms: u64) {
        debug_assert!(now_ms >= self.now_ms, "virtual clock moved backwards");
        self.now_ms = now_ms.max(self.now_ms);
    }
}

impl Clock for VirtualClock {
    fn now_ms(&self) -> u64 {
        self.now_ms
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn virtual_clock_advances_monotonically() {
        let mut clock = VirtualClock::at(1_000);
        clock.advance(500);
        assert_eq!(clock.now_ms(), 1_500);
    }

    #[test]
    fn virtual_clock_set_clamps_to_current_on_backwards_request() {
        let mut clock = VirtualClock::at(1_000);
        clock.set(500);
        assert_eq!(clock.now_ms(), 1_000);
    }

    #[test]
    fn system_clock_reports_nonzero_time() {
        assert!(SystemClock.now_ms() > 0);
    }
}
