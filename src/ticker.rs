//! Real-time tick scheduling for a single-threaded dispatch loop
//!
//! The loop sleeps until [`Ticker::deadline`], then calls [`Ticker::take_due`]
//! and runs one countdown tick per returned unit. A late wakeup yields several
//! ticks so the countdown stays aligned with the wall clock.

use crate::constants::TICK_INTERVAL_MS;
use std::time::{Duration, Instant};

#[derive(Debug, Clone)]
pub struct Ticker {
    interval: Duration,
    next: Instant,
}

/// Default tick interval
pub fn tick_duration() -> Duration {
    Duration::from_millis(TICK_INTERVAL_MS)
}

impl Ticker {
    pub fn new(now: Instant) -> Self {
        Self::with_interval(now, tick_duration())
    }

    pub fn with_interval(now: Instant, interval: Duration) -> Self {
        Self {
            interval,
            next: now + interval,
        }
    }

    /// Instant at which the next tick is due
    pub fn deadline(&self) -> Instant {
        self.next
    }

    /// Time left until the next tick (zero if already due)
    pub fn wait_time(&self, now: Instant) -> Duration {
        self.next.saturating_duration_since(now)
    }

    /// Number of ticks due at `now`; advances the deadline past `now`
    pub fn take_due(&mut self, now: Instant) -> u32 {
        let mut due = 0;
        while self.next <= now {
            self.next += self.interval;
            due += 1;
        }
        due
    }

    /// Restart the phase so the next tick lands a full interval after `now`
    pub fn realign(&mut self, now: Instant) {
        self.next = now + self.interval;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tick_duration() {
        assert_eq!(tick_duration(), Duration::from_millis(1000));
    }

    #[test]
    fn test_nothing_due_before_deadline() {
        let start = Instant::now();
        let mut ticker = Ticker::new(start);
        assert_eq!(ticker.take_due(start + Duration::from_millis(999)), 0);
        assert_eq!(
            ticker.wait_time(start + Duration::from_millis(400)),
            Duration::from_millis(600)
        );
    }

    #[test]
    fn test_one_tick_at_deadline() {
        let start = Instant::now();
        let mut ticker = Ticker::new(start);
        assert_eq!(ticker.take_due(start + Duration::from_secs(1)), 1);
        assert_eq!(ticker.deadline(), start + Duration::from_secs(2));
    }

    #[test]
    fn test_late_wakeup_catches_up() {
        let start = Instant::now();
        let mut ticker = Ticker::new(start);
        assert_eq!(ticker.take_due(start + Duration::from_millis(3500)), 3);
        assert_eq!(ticker.deadline(), start + Duration::from_secs(4));
    }

    #[test]
    fn test_realign() {
        let start = Instant::now();
        let mut ticker = Ticker::new(start);
        let later = start + Duration::from_millis(1700);
        ticker.realign(later);
        assert_eq!(ticker.deadline(), later + Duration::from_secs(1));
    }
}
