#![forbid(unsafe_code)]

//! Leading plus trailing edge throttle.
//!
//! The first value offered after a quiet period is released immediately.
//! Values offered within `interval` of the last release replace a single
//! pending slot, which [`Throttle::flush`] releases once the interval has
//! elapsed. Consecutive releases are therefore at least `interval` apart, and
//! the value released for any interval is the last one offered in it.

use std::time::Duration;

use web_time::Instant;

#[derive(Debug, Clone)]
pub struct Throttle<T> {
    interval: Duration,
    last_release: Option<Instant>,
    pending: Option<T>,
}

impl<T> Throttle<T> {
    #[must_use]
    pub const fn new(interval: Duration) -> Self {
        Self {
            interval,
            last_release: None,
            pending: None,
        }
    }

    /// Offer a value; returns it when it may be applied now.
    pub fn offer(&mut self, now: Instant, value: T) -> Option<T> {
        if self.is_open(now) {
            self.last_release = Some(now);
            self.pending = None;
            Some(value)
        } else {
            self.pending = Some(value);
            None
        }
    }

    /// Release the pending value if its interval has elapsed.
    pub fn flush(&mut self, now: Instant) -> Option<T> {
        if self.pending.is_some() && self.is_open(now) {
            self.last_release = Some(now);
            self.pending.take()
        } else {
            None
        }
    }

    /// Drop the pending value without releasing it.
    pub fn take_pending(&mut self) -> Option<T> {
        self.pending.take()
    }

    #[must_use]
    pub const fn has_pending(&self) -> bool {
        self.pending.is_some()
    }

    /// Instant at which the pending value becomes releasable.
    #[must_use]
    pub fn deadline(&self) -> Option<Instant> {
        match (&self.pending, self.last_release) {
            (Some(_), Some(last)) => Some(last + self.interval),
            _ => None,
        }
    }

    /// Forget the release history and any pending value.
    pub fn reset(&mut self) {
        self.last_release = None;
        self.pending = None;
    }

    fn is_open(&self, now: Instant) -> bool {
        self.last_release
            .is_none_or(|last| now.saturating_duration_since(last) >= self.interval)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MS_10: Duration = Duration::from_millis(10);
    const MS_50: Duration = Duration::from_millis(50);
    const MS_150: Duration = Duration::from_millis(150);

    #[test]
    fn first_offer_passes_through() {
        let mut throttle = Throttle::new(MS_150);
        assert_eq!(throttle.offer(Instant::now(), 1), Some(1));
    }

    #[test]
    fn offers_within_interval_coalesce_to_latest() {
        let mut throttle = Throttle::new(MS_150);
        let t = Instant::now();
        assert_eq!(throttle.offer(t, 1), Some(1));
        assert_eq!(throttle.offer(t + MS_10, 2), None);
        assert_eq!(throttle.offer(t + MS_50, 3), None);
        assert_eq!(throttle.flush(t + MS_50 + MS_10), None);
        assert_eq!(throttle.deadline(), Some(t + MS_150));
        assert_eq!(throttle.flush(t + MS_150), Some(3));
        assert!(!throttle.has_pending());
    }

    #[test]
    fn offer_after_interval_supersedes_pending() {
        let mut throttle = Throttle::new(MS_150);
        let t = Instant::now();
        throttle.offer(t, 1);
        throttle.offer(t + MS_10, 2);
        assert_eq!(throttle.offer(t + MS_150 + MS_10, 3), Some(3));
        assert_eq!(throttle.flush(t + MS_150 * 3), None);
    }

    #[test]
    fn reset_clears_history() {
        let mut throttle = Throttle::new(MS_150);
        let t = Instant::now();
        throttle.offer(t, 1);
        throttle.offer(t + MS_10, 2);
        throttle.reset();
        assert!(!throttle.has_pending());
        assert_eq!(throttle.offer(t + MS_10, 4), Some(4));
    }
}
