use std::time::{Duration, Instant};

/// One periodic datastore row.
#[derive(Debug, Clone, PartialEq)]
pub struct LogRecord {
    /// `MM-DD-YYYY HH:MM:SS`, or the time source placeholder.
    pub timestamp: String,
    pub temperature_c: f64,
    pub door_closed: bool,
}

/// Fixed-interval schedule for periodic records.
#[derive(Debug, Clone)]
pub struct PeriodicLogger {
    interval: Duration,
    last_logged: Instant,
}

impl PeriodicLogger {
    /// The first record is due one full `interval` after `now`.
    pub fn new(now: Instant, interval: Duration) -> Self {
        Self {
            interval,
            last_logged: now,
        }
    }

    pub fn is_due(&self, now: Instant) -> bool {
        now.saturating_duration_since(self.last_logged) >= self.interval
    }

    /// Restart the interval; called after every attempt, successful or not.
    pub fn mark_logged(&mut self, now: Instant) {
        self.last_logged = now;
    }

    pub fn last_logged(&self) -> Instant {
        self.last_logged
    }
}
