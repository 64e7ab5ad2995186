//! Input debouncing driven by caller-supplied instants.
//!
//! The debouncer never reads a clock. Hosts pass `now` on every input and
//! poll, which keeps it usable from real time and from simulated time alike.

use std::{ops::Add, time::Duration};

/// Holds back a value until no newer value arrived for `delay`.
#[derive(Debug, Clone)]
pub struct Debouncer<I> {
    delay: Duration,
    pending: Option<(String, I)>,
}

impl<I> Debouncer<I>
where
    I: Copy + Ord + Add<Duration, Output = I>,
{
    /// Debouncer releasing values `delay` after the last input.
    pub fn new(delay: Duration) -> Self {
        Self { delay, pending: None }
    }

    /// Record `value`, restarting the delay.
    pub fn input(&mut self, value: impl Into<String>, now: I) {
        self.pending = Some((value.into(), now + self.delay));
    }

    /// Release the pending value if its delay has passed.
    pub fn poll(&mut self, now: I) -> Option<String> {
        match &self.pending {
            Some((_, deadline)) if now >= *deadline => self.pending.take().map(|(value, _)| value),
            _ => None,
        }
    }

    /// Release the pending value immediately.
    pub fn flush(&mut self) -> Option<String> {
        self.pending.take().map(|(value, _)| value)
    }

    /// When the pending value will be released.
    pub fn deadline(&self) -> Option<I> {
        self.pending.as_ref().map(|(_, deadline)| *deadline)
    }

    /// Check if a value is waiting.
    pub fn is_pending(&self) -> bool {
        self.pending.is_some()
    }
}
