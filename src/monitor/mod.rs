pub mod door;
pub mod logger;
pub mod temperature;

use std::{
    future::Future,
    time::{Duration, Instant},
};

use anyhow::Result;
use tokio::time::{self, MissedTickBehavior};
use tracing::{debug, error, info, warn};

use crate::{
    clock::TimeSource,
    config::Thresholds,
    sensors::{DoorSensor, SensorError, TemperatureSensor},
};

use self::{
    door::DoorWatchdog,
    logger::{LogRecord, PeriodicLogger},
    temperature::TemperatureGuard,
};

/// Delivers a human-readable alert (SMS in production).
pub trait AlertSink {
    fn send_alert(&self, message: &str) -> impl Future<Output = Result<()>>;
}

/// Persists one periodic record to the remote datastore.
pub trait RecordStore {
    fn put_item(&self, record: &LogRecord) -> impl Future<Output = Result<()>>;
}

/// The control loop: one door watchdog, one temperature guard and one
/// periodic logger, evaluated in that order on every tick.
pub struct Monitor<D, T, C, A, R> {
    door_sensor: D,
    thermometer: T,
    clock: C,
    alerts: A,
    store: R,
    door: DoorWatchdog,
    guard: TemperatureGuard,
    logger: PeriodicLogger,
}

impl<D, T, C, A, R> Monitor<D, T, C, A, R>
where
    D: DoorSensor,
    T: TemperatureSensor,
    C: TimeSource,
    A: AlertSink,
    R: RecordStore,
{
    /// Samples the door once to seed its state. Cooldowns and the log
    /// schedule start at `now`, so nothing fires before a full interval.
    pub fn new(
        thresholds: &Thresholds,
        now: Instant,
        mut door_sensor: D,
        thermometer: T,
        clock: C,
        alerts: A,
        store: R,
    ) -> Result<Self, SensorError> {
        let is_closed = door_sensor.is_closed()?;
        Ok(Self {
            door_sensor,
            thermometer,
            clock,
            alerts,
            store,
            door: DoorWatchdog::new(
                now,
                is_closed,
                thresholds.open_too_long,
                thresholds.door_alert_delay,
            ),
            guard: TemperatureGuard::new(now, thresholds),
            logger: PeriodicLogger::new(now, thresholds.log_interval),
        })
    }

    pub fn door(&self) -> &DoorWatchdog {
        &self.door
    }

    pub fn guard(&self) -> &TemperatureGuard {
        &self.guard
    }

    /// Runs until `shutdown` resolves. Shutdown is only observed between
    /// ticks, never in the middle of one.
    pub async fn run(mut self, tick_interval: Duration, shutdown: impl Future<Output = ()>) {
        info!(
            tick_ms = tick_interval.as_millis() as u64,
            door_closed = self.door.state().is_closed,
            "Monitor loop started"
        );
        let mut ticker = time::interval(tick_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        tokio::pin!(shutdown);

        loop {
            tokio::select! {
                _ = &mut shutdown => break,
                _ = ticker.tick() => self.tick(Instant::now()).await,
            }
        }

        info!("Monitor loop stopped");
    }

    pub async fn tick(&mut self, now: Instant) {
        self.check_door(now).await;
        self.check_temperature(now).await;
        self.log_if_due(now).await;
    }

    async fn check_door(&mut self, now: Instant) {
        let is_closed = match self.door_sensor.is_closed() {
            Ok(v) => v,
            Err(e) => {
                warn!(error = %e, "Failed to read door sensor; skipping door check");
                return;
            }
        };

        let was_closed = self.door.state().is_closed;
        let alert = self.door.tick(now, is_closed);
        if was_closed != is_closed {
            info!(door_closed = is_closed, "Door state changed");
        }

        if let Some(alert) = alert {
            self.dispatch("door", alert.message()).await;
        }
    }

    async fn check_temperature(&mut self, now: Instant) {
        let thermometer = &mut self.thermometer;
        match self.guard.tick(now, || thermometer.read_celsius()) {
            Ok(Some(alert)) => self.dispatch("temperature", alert.to_string()).await,
            Ok(None) => {
                if let Some(r) = self.guard.last_reading().filter(|r| r.sampled_at == now) {
                    debug!(celsius = r.celsius, "Temperature within range");
                }
            }
            Err(e) => warn!(error = %e, "Failed to read temperature; skipping check"),
        }
    }

    async fn log_if_due(&mut self, now: Instant) {
        if !self.logger.is_due(now) {
            return;
        }

        match self.thermometer.read_celsius() {
            Ok(temperature_c) => {
                let door_closed = self.door_sensor.is_closed().unwrap_or_else(|e| {
                    warn!(error = %e, "Failed to read door sensor; logging last known state");
                    self.door.state().is_closed
                });
                let record = LogRecord {
                    timestamp: self.clock.now().await,
                    temperature_c,
                    door_closed,
                };
                match self.store.put_item(&record).await {
                    Ok(()) => info!(
                        timestamp = %record.timestamp,
                        temperature_c = record.temperature_c,
                        door_closed = record.door_closed,
                        "Reading logged"
                    ),
                    Err(e) => error!(error = %e, "Failed to log reading"),
                }
            }
            Err(e) => warn!(error = %e, "Failed to read temperature; skipping log"),
        }

        self.logger.mark_logged(now);
    }

    /// Failures are logged and otherwise ignored; cooldowns have already
    /// advanced.
    async fn dispatch(&self, kind: &'static str, message: String) {
        info!(kind, message = %message, "Sending alert");
        if let Err(e) = self.alerts.send_alert(&message).await {
            error!(kind, error = %e, "Failed to send alert");
        }
    }
}
