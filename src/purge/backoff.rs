//! # Fibonacci Backoff
//!
//! Progressive delay between namespace rescans after a failed listing call.
//! Grows more slowly than exponential backoff so a briefly unavailable API
//! server is retried promptly, while a persistently failing one is not hammered.
//!
//! Sequence for a 500ms minimum and 5s cap: 500ms, 500ms, 1s, 1.5s, 2.5s, 4s, 5s (max)
//!
//! ## Usage
//!
//! ```rust
//! use crd_purge::purge::backoff::FibonacciBackoff;
//! use std::time::Duration;
//!
//! let mut backoff = FibonacciBackoff::new(Duration::from_millis(500), Duration::from_secs(5));
//! assert_eq!(backoff.next_backoff(), Duration::from_millis(500));
//! assert_eq!(backoff.next_backoff(), Duration::from_millis(500));
//! assert_eq!(backoff.next_backoff(), Duration::from_millis(1000));
//! ```

use std::time::Duration;

/// Fibonacci backoff calculator
///
/// Each delay is the sum of the previous two, capped at `max`.
#[derive(Debug, Clone)]
pub struct FibonacciBackoff {
    /// Minimum delay (for reset)
    min: Duration,
    prev: Duration,
    current: Duration,
    max: Duration,
}

impl FibonacciBackoff {
    /// Create a new Fibonacci backoff bounded by `min` and `max`
    #[must_use]
    pub fn new(min: Duration, max: Duration) -> Self {
        Self {
            min,
            prev: Duration::ZERO,
            current: min.min(max),
            max,
        }
    }

    /// Get the next delay and advance the sequence
    pub fn next_backoff(&mut self) -> Duration {
        let result = self.current;
        let next = self.prev.saturating_add(self.current);
        self.prev = self.current;
        self.current = next.min(self.max);
        result
    }

    /// Reset the backoff to the initial state
    pub fn reset(&mut self) {
        self.prev = Duration::ZERO;
        self.current = self.min.min(self.max);
    }
}
