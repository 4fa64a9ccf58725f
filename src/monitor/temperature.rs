use std::{
    fmt,
    time::{Duration, Instant},
};

use crate::config::{TempCooldownMode, Thresholds};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TemperatureReading {
    pub celsius: f64,
    pub sampled_at: Instant,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum TemperatureAlert {
    Over { celsius: f64, max: f64 },
    Under { celsius: f64, min: f64 },
}

impl fmt::Display for TemperatureAlert {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Over { celsius, max } => write!(
                f,
                "Temperature is {celsius:.1} C, above the maximum of {max:.1} C"
            ),
            Self::Under { celsius, min } => write!(
                f,
                "Temperature is {celsius:.1} C, below the minimum of {min:.1} C"
            ),
        }
    }
}

/// Compares sampled temperature against `[min, max]` behind a cooldown gate.
#[derive(Debug, Clone)]
pub struct TemperatureGuard {
    min: f64,
    max: f64,
    delay: Duration,
    mode: TempCooldownMode,
    last_checked: Instant,
    last_reading: Option<TemperatureReading>,
}

impl TemperatureGuard {
    pub fn new(now: Instant, thresholds: &Thresholds) -> Self {
        Self {
            min: thresholds.min_temp_c,
            max: thresholds.max_temp_c,
            delay: thresholds.temp_alert_delay,
            mode: thresholds.temp_cooldown_mode,
            last_checked: now,
            last_reading: None,
        }
    }

    pub fn last_checked(&self) -> Instant {
        self.last_checked
    }

    pub fn last_reading(&self) -> Option<TemperatureReading> {
        self.last_reading
    }

    /// Samples through `sample` only once the cooldown has elapsed.
    ///
    /// In [`TempCooldownMode::Gate`] the cooldown clock restarts whenever the
    /// gate opens, even for an in-range reading. In [`TempCooldownMode::Alert`]
    /// it restarts only when an alert fires. A failed sample restarts it in
    /// both modes, so a dead sensor is retried once per window.
    pub fn tick<E>(
        &mut self,
        now: Instant,
        sample: impl FnOnce() -> Result<f64, E>,
    ) -> Result<Option<TemperatureAlert>, E> {
        if now.saturating_duration_since(self.last_checked) < self.delay {
            return Ok(None);
        }
        if self.mode == TempCooldownMode::Gate {
            self.last_checked = now;
        }

        let celsius = match sample() {
            Ok(c) => c,
            Err(e) => {
                self.last_checked = now;
                return Err(e);
            }
        };
        self.last_reading = Some(TemperatureReading {
            celsius,
            sampled_at: now,
        });

        let alert = self.classify(celsius);
        if alert.is_some() {
            self.last_checked = now;
        }
        Ok(alert)
    }

    fn classify(&self, celsius: f64) -> Option<TemperatureAlert> {
        if celsius > self.max {
            Some(TemperatureAlert::Over {
                celsius,
                max: self.max,
            })
        } else if celsius < self.min {
            Some(TemperatureAlert::Under {
                celsius,
                min: self.min,
            })
        } else {
            None
        }
    }
}
