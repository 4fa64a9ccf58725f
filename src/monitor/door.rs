use std::time::{Duration, Instant};

/// Door position and timing of the current open episode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DoorState {
    pub is_closed: bool,
    pub prev_closed: bool,
    pub opened_at: Instant,
    /// Only meaningful while the door is open.
    pub open_duration: Duration,
    pub last_alert_sent: Instant,
    pub alert_sent_this_episode: bool,
}

/// The door has been open longer than allowed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DoorAlert {
    pub open_for: Duration,
}

impl DoorAlert {
    pub fn message(&self) -> String {
        format!("Door has been open for {}", format_duration(self.open_for))
    }
}

/// Tracks open episodes and decides when a door alert is due.
///
/// The first breach of an episode always alerts; further alerts in the same
/// episode wait for `alert_delay` since the previous one.
#[derive(Debug, Clone)]
pub struct DoorWatchdog {
    state: DoorState,
    open_too_long: Duration,
    alert_delay: Duration,
}

impl DoorWatchdog {
    /// `is_closed` is the door position sampled at startup.
    pub fn new(now: Instant, is_closed: bool, open_too_long: Duration, alert_delay: Duration) -> Self {
        Self {
            state: DoorState {
                is_closed,
                prev_closed: is_closed,
                opened_at: now,
                open_duration: Duration::ZERO,
                last_alert_sent: now,
                alert_sent_this_episode: false,
            },
            open_too_long,
            alert_delay,
        }
    }

    pub fn state(&self) -> &DoorState {
        &self.state
    }

    pub fn tick(&mut self, now: Instant, is_closed: bool) -> Option<DoorAlert> {
        let s = &mut self.state;
        s.prev_closed = s.is_closed;
        s.is_closed = is_closed;

        match (s.prev_closed, s.is_closed) {
            // Closed -> open: a new episode starts.
            (true, false) => {
                s.opened_at = now;
                s.open_duration = Duration::ZERO;
                s.alert_sent_this_episode = false;
                None
            }
            // Open -> closed.
            (false, true) => {
                s.alert_sent_this_episode = false;
                None
            }
            (true, true) => None,
            (false, false) => {
                s.open_duration = now.saturating_duration_since(s.opened_at);
                if s.open_duration <= self.open_too_long {
                    return None;
                }
                let cooled_down =
                    now.saturating_duration_since(s.last_alert_sent) >= self.alert_delay;
                if s.alert_sent_this_episode && !cooled_down {
                    return None;
                }
                s.last_alert_sent = now;
                s.alert_sent_this_episode = true;
                Some(DoorAlert {
                    open_for: s.open_duration,
                })
            }
        }
    }
}

/// Human-readable duration: `"2 min and 5 sec"`, `"1 min"`, `"45 sec"`.
/// Sub-second remainders are dropped.
pub fn format_duration(d: Duration) -> String {
    let secs = d.as_secs();
    let (minutes, seconds) = (secs / 60, secs % 60);
    match (minutes, seconds) {
        (0, s) => format!("{s} sec"),
        (m, 0) => format!("{m} min"),
        (m, s) => format!("{m} min and {s} sec"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const OPEN_TOO_LONG: Duration = Duration::from_secs(120);
    const ALERT_DELAY: Duration = Duration::from_secs(600);

    fn at(t0: Instant, secs: u64) -> Instant {
        t0 + Duration::from_secs(secs)
    }

    fn closed_watchdog(t0: Instant) -> DoorWatchdog {
        DoorWatchdog::new(t0, true, OPEN_TOO_LONG, ALERT_DELAY)
    }

    #[test]
    fn format_minutes_and_seconds() {
        assert_eq!(format_duration(Duration::from_millis(125_000)), "2 min and 5 sec");
    }

    #[test]
    fn format_whole_minutes() {
        assert_eq!(format_duration(Duration::from_millis(60_000)), "1 min");
        assert_eq!(format_duration(Duration::from_secs(600)), "10 min");
    }

    #[test]
    fn format_seconds_only() {
        assert_eq!(format_duration(Duration::from_millis(45_000)), "45 sec");
        assert_eq!(format_duration(Duration::from_millis(999)), "0 sec");
    }

    #[test]
    fn alert_message_names_duration() {
        let alert = DoorAlert {
            open_for: Duration::from_secs(125),
        };
        assert_eq!(alert.message(), "Door has been open for 2 min and 5 sec");
    }

    #[test]
    fn closed_door_never_alerts() {
        let t0 = Instant::now();
        let mut w = closed_watchdog(t0);
        for s in 0..2000 {
            assert_eq!(w.tick(at(t0, s), true), None);
        }
    }

    #[test]
    fn opening_starts_a_fresh_episode() {
        let t0 = Instant::now();
        let mut w = closed_watchdog(t0);
        assert_eq!(w.tick(at(t0, 10), false), None);

        let s = w.state();
        assert!(!s.is_closed);
        assert!(s.prev_closed);
        assert_eq!(s.opened_at, at(t0, 10));
        assert_eq!(s.open_duration, Duration::ZERO);
        assert!(!s.alert_sent_this_episode);
    }

    #[test]
    fn no_alert_at_exactly_the_threshold() {
        let t0 = Instant::now();
        let mut w = closed_watchdog(t0);
        w.tick(t0, false);
        assert_eq!(w.tick(at(t0, 120), false), None);
        assert_eq!(w.state().open_duration, OPEN_TOO_LONG);
    }

    #[test]
    fn first_breach_alerts_immediately() {
        let t0 = Instant::now();
        let mut w = closed_watchdog(t0);
        w.tick(t0, false);
        let alert = w.tick(at(t0, 121), false).unwrap();
        assert_eq!(alert.open_for, Duration::from_secs(121));
        assert!(w.state().alert_sent_this_episode);
        assert_eq!(w.state().last_alert_sent, at(t0, 121));
    }

    #[test]
    fn continuous_open_alerts_once_per_delay_window() {
        let t0 = Instant::now();
        let mut w = closed_watchdog(t0);
        w.tick(t0, false);

        let fired: Vec<u64> = (1..=1400)
            .filter(|&s| w.tick(at(t0, s), false).is_some())
            .collect();
        assert_eq!(fired, vec![121, 721, 1321]);
    }

    #[test]
    fn reopening_resets_the_episode_flag() {
        let t0 = Instant::now();
        let mut w = closed_watchdog(t0);
        w.tick(t0, false);
        assert!(w.tick(at(t0, 130), false).is_some());

        // Close, then reopen well inside the cooldown window.
        assert_eq!(w.tick(at(t0, 140), true), None);
        assert!(!w.state().alert_sent_this_episode);
        assert_eq!(w.tick(at(t0, 150), false), None);

        // The new episode breaches and alerts despite the recent alert.
        assert_eq!(w.tick(at(t0, 260), false), None);
        let alert = w.tick(at(t0, 271), false).unwrap();
        assert_eq!(alert.open_for, Duration::from_secs(121));
    }

    #[test]
    fn closing_transition_does_not_alert() {
        let t0 = Instant::now();
        let mut w = closed_watchdog(t0);
        w.tick(t0, false);
        assert_eq!(w.tick(at(t0, 500), true), None);
    }

    #[test]
    fn door_open_at_startup_counts_from_startup() {
        let t0 = Instant::now();
        let mut w = DoorWatchdog::new(t0, false, OPEN_TOO_LONG, ALERT_DELAY);
        assert_eq!(w.tick(at(t0, 100), false), None);
        assert!(w.tick(at(t0, 121), false).is_some());
    }
}
