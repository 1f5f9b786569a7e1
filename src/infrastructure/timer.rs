use crate::types::constants::DEFAULT_RECONNECT_DELAY;
use std::time::Duration;

/// Reconnect delay schedule.
///
/// Walks through `intervals` on consecutive attempts and then sticks to the
/// last one. A single interval gives a fixed retry rate.
pub struct Timer {
    attempts: u32,
    intervals: Vec<Duration>,
}

impl Timer {
    pub fn new(intervals: Vec<Duration>) -> Self {
        Self {
            attempts: 0,
            intervals,
        }
    }

    /// Get the next delay duration
    pub fn next_delay(&mut self) -> Duration {
        let delay = self
            .intervals
            .get(self.attempts as usize)
            .or_else(|| self.intervals.last())
            .copied()
            .unwrap_or(Duration::from_millis(DEFAULT_RECONNECT_DELAY));

        self.attempts = self.attempts.saturating_add(1);
        delay
    }

    /// Reset the timer
    pub fn reset(&mut self) {
        self.attempts = 0;
    }
}

impl Default for Timer {
    fn default() -> Self {
        Self::new(vec![Duration::from_millis(DEFAULT_RECONNECT_DELAY)])
    }
}
