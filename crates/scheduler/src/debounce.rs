//! Trailing-edge debouncer driven by an explicit clock
//!
//! Rapid triggers inside the window restart it; only the last value
//! survives and is released once the window elapses without a new trigger.
//! The host polls it from its frame callback, so no timers or threads are
//! involved.

use std::time::{Duration, Instant};

/// Debouncer that coalesces a burst of triggers into one delayed value
#[derive(Debug, Clone)]
pub struct Debouncer<T> {
    delay: Duration,
    pending: Option<(Instant, T)>,
}

impl<T> Debouncer<T> {
    /// Create a debouncer with the given quiet window
    pub fn new(delay: Duration) -> Self {
        Self { delay, pending: None }
    }

    /// Quiet window length
    pub fn delay(&self) -> Duration {
        self.delay
    }

    /// Record a trigger at `now`, replacing any pending value
    pub fn trigger(&mut self, now: Instant, value: T) {
        self.pending = Some((now + self.delay, value));
    }

    /// Release the pending value if its window has elapsed
    pub fn poll(&mut self, now: Instant) -> Option<T> {
        match &self.pending {
            Some((deadline, _)) if now >= *deadline => self.pending.take().map(|(_, value)| value),
            _ => None,
        }
    }

    /// Drop the pending value without firing
    pub fn cancel(&mut self) -> Option<T> {
        self.pending.take().map(|(_, value)| value)
    }

    /// Check if a trigger is waiting for its window to elapse
    pub fn is_pending(&self) -> bool {
        self.pending.is_some()
    }

    /// When the pending value will be released
    pub fn deadline(&self) -> Option<Instant> {
        self.pending.as_ref().map(|(deadline, _)| *deadline)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const WINDOW: Duration = Duration::from_millis(300);

    #[test]
    fn test_fires_after_window() {
        let mut debounce = Debouncer::new(WINDOW);
        let t0 = Instant::now();

        debounce.trigger(t0, "zoom");
        assert_eq!(debounce.poll(t0 + Duration::from_millis(299)), None);
        assert_eq!(debounce.poll(t0 + WINDOW), Some("zoom"));
        assert!(!debounce.is_pending());
    }

    #[test]
    fn test_burst_coalesces_to_last_value() {
        let mut debounce = Debouncer::new(WINDOW);
        let t0 = Instant::now();

        for i in 0..10u32 {
            debounce.trigger(t0 + Duration::from_millis(50 * i as u64), i);
        }

        // Window restarts on every trigger
        assert_eq!(debounce.poll(t0 + Duration::from_millis(600)), None);
        assert_eq!(debounce.poll(t0 + Duration::from_millis(750)), Some(9));
        assert_eq!(debounce.poll(t0 + Duration::from_millis(2000)), None);
    }

    #[test]
    fn test_cancel_drops_pending() {
        let mut debounce = Debouncer::new(WINDOW);
        let t0 = Instant::now();

        debounce.trigger(t0, 1);
        assert_eq!(debounce.deadline(), Some(t0 + WINDOW));
        assert_eq!(debounce.cancel(), Some(1));
        assert_eq!(debounce.poll(t0 + WINDOW), None);
    }
}
