//! One-second countdown engine.
//!
//! The engine does not own a thread or a timer. The dispatch loop calls
//! [`Countdown::tick`] once per elapsed second (see [`crate::ticker`]), which
//! keeps every mutation on a single queue.

use crate::constants::ADJUST_STEP_SECONDS;

/// Result of a tick on a running countdown
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Tick {
    /// Remaining seconds after this tick
    pub remaining_secs: u64,
    /// Set on the tick that reaches zero; the countdown has stopped itself
    pub finished: bool,
}

/// Direction of a manual adjustment
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Adjustment {
    Increase,
    Decrease,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Countdown {
    remaining_secs: u64,
    running: bool,
}

impl Countdown {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reset to `minutes` and start ticking
    pub fn start(&mut self, minutes: u32) {
        self.start_seconds(u64::from(minutes) * 60);
    }

    /// Reset to a raw number of seconds and start ticking
    pub fn start_seconds(&mut self, seconds: u64) {
        self.remaining_secs = seconds;
        self.running = true;
        log::debug!("Countdown started at {} seconds", seconds);
    }

    pub fn pause(&mut self) {
        if self.running {
            self.running = false;
            log::debug!("Countdown paused at {} seconds", self.remaining_secs);
        }
    }

    /// Continue ticking. No-op while running or when nothing is left.
    pub fn resume(&mut self) -> bool {
        if !self.running && self.remaining_secs > 0 {
            self.running = true;
            log::debug!("Countdown resumed at {} seconds", self.remaining_secs);
            true
        } else {
            false
        }
    }

    pub fn stop(&mut self) {
        self.running = false;
    }

    /// Advance one second. Returns `None` when the countdown is not running.
    pub fn tick(&mut self) -> Option<Tick> {
        if !self.running {
            return None;
        }

        self.remaining_secs = self.remaining_secs.saturating_sub(1);
        let finished = self.remaining_secs == 0;
        if finished {
            self.running = false;
        }

        Some(Tick {
            remaining_secs: self.remaining_secs,
            finished,
        })
    }

    /// Add or subtract [`ADJUST_STEP_SECONDS`], flooring at zero
    pub fn adjust(&mut self, adjustment: Adjustment) -> u64 {
        self.remaining_secs = match adjustment {
            Adjustment::Increase => self.remaining_secs.saturating_add(ADJUST_STEP_SECONDS),
            Adjustment::Decrease => self.remaining_secs.saturating_sub(ADJUST_STEP_SECONDS),
        };
        self.remaining_secs
    }

    pub fn remaining_secs(&self) -> u64 {
        self.remaining_secs
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    /// Remaining time split into (minutes, seconds)
    pub fn remaining_parts(&self) -> (u64, u64) {
        (self.remaining_secs / 60, self.remaining_secs % 60)
    }
}
