use std::{path::PathBuf, str::FromStr, time::Duration};

use anyhow::{bail, Context, Result};

use crate::clock::RetryPolicy;

// ---------------------------------------------------------------------------
// Modes
// ---------------------------------------------------------------------------

/// When the temperature guard advances its cooldown clock.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TempCooldownMode {
    /// Every time the check gate is entered, whether or not an alert fires.
    Gate,
    /// Only when an alert actually fires; the sensor is checked every tick.
    Alert,
}

impl FromStr for TempCooldownMode {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "gate" => Ok(Self::Gate),
            "alert" => Ok(Self::Alert),
            other => Err(anyhow::anyhow!("unknown temperature cooldown mode: {other:?}")),
        }
    }
}

/// Where wall-clock timestamps for log records come from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimeSourceKind {
    /// Run the configured date command as a subprocess.
    Command,
    /// Format the local system clock directly.
    System,
}

impl FromStr for TimeSourceKind {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "command" => Ok(Self::Command),
            "system" => Ok(Self::System),
            other => Err(anyhow::anyhow!("unknown time source: {other:?}")),
        }
    }
}

// ---------------------------------------------------------------------------
// Config
// ---------------------------------------------------------------------------

/// Alerting thresholds and timing windows consumed by the monitor loop.
#[derive(Debug, Clone)]
pub struct Thresholds {
    pub max_temp_c: f64,
    pub min_temp_c: f64,
    /// The door may stay open this long before it is reported.
    pub open_too_long: Duration,
    /// Minimum gap between two door alerts within one open episode.
    pub door_alert_delay: Duration,
    pub temp_alert_delay: Duration,
    pub temp_cooldown_mode: TempCooldownMode,
    pub log_interval: Duration,
}

#[derive(Debug, Clone)]
pub struct SensorConfig {
    pub door_pin: u32,
    pub door_active_low: bool,
    pub temp_pin: u32,
    pub temp_iio_device: PathBuf,
    pub temp_samples: usize,
    pub temp_scale: f64,
    pub temp_offset: f64,
}

#[derive(Debug, Clone)]
pub struct TimeConfig {
    pub source: TimeSourceKind,
    /// Program followed by its arguments.
    pub command: Vec<String>,
    pub retry: RetryPolicy,
}

#[derive(Debug, Clone)]
pub struct Config {
    pub thresholds: Thresholds,
    pub sensors: SensorConfig,
    pub time: TimeConfig,
    pub tick_interval: Duration,

    pub temboo_account: String,
    pub temboo_app_key_name: String,
    pub temboo_app_key_value: String,
    pub choreo_timeout: Duration,
    /// Raw choreo responses are written here when set.
    pub choreo_response_dir: Option<PathBuf>,

    pub aws_access_key_id: String,
    pub aws_secret_access_key: String,
    pub aws_region: String,
    pub dynamodb_table: String,

    pub twilio_account_sid: String,
    pub twilio_auth_token: String,
    pub twilio_from: String,
    pub alert_to: String,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        let config = Self {
            thresholds: Thresholds {
                max_temp_c: parse("MAX_TEMP_C", "-15")?,
                min_temp_c: parse("MIN_TEMP_C", "-19")?,
                open_too_long: Duration::from_secs(parse("OPEN_TOO_LONG_SECS", "120")?),
                door_alert_delay: Duration::from_secs(parse("DOOR_ALERT_DELAY_SECS", "600")?),
                temp_alert_delay: Duration::from_secs(parse("TEMP_ALERT_DELAY_SECS", "600")?),
                temp_cooldown_mode: parse("TEMP_COOLDOWN_MODE", "gate")?,
                log_interval: Duration::from_secs(parse("LOG_INTERVAL_SECS", "300")?),
            },
            sensors: SensorConfig {
                door_pin: parse("DOOR_PIN", "8")?,
                door_active_low: parse("DOOR_ACTIVE_LOW", "false")?,
                temp_pin: parse("TEMP_PIN", "0")?,
                temp_iio_device: optional("TEMP_IIO_DEVICE", "/sys/bus/iio/devices/iio:device0")
                    .into(),
                temp_samples: parse("TEMP_SAMPLES", "10")?,
                temp_scale: parse("TEMP_SCALE", "0.1")?,
                temp_offset: parse("TEMP_OFFSET", "-50")?,
            },
            time: TimeConfig {
                source: parse("TIME_SOURCE", "command")?,
                command: parse_command(&optional("TIME_COMMAND", "date +%m-%d-%Y %H:%M:%S"))?,
                retry: RetryPolicy {
                    timeout: Duration::from_millis(parse("TIME_TIMEOUT_MS", "1000")?),
                    initial_backoff: Duration::from_millis(parse("TIME_BACKOFF_MS", "10")?),
                    max_backoff: Duration::from_millis(parse("TIME_MAX_BACKOFF_MS", "100")?),
                },
            },
            tick_interval: Duration::from_millis(parse("TICK_INTERVAL_MS", "1000")?),

            temboo_account: required("TEMBOO_ACCOUNT")?,
            temboo_app_key_name: required("TEMBOO_APP_KEY_NAME")?,
            temboo_app_key_value: required("TEMBOO_APP_KEY_VALUE")?,
            choreo_timeout: Duration::from_secs(parse("CHOREO_TIMEOUT_SECS", "30")?),
            choreo_response_dir: std::env::var("CHOREO_RESPONSE_DIR")
                .ok()
                .filter(|s| !s.is_empty())
                .map(PathBuf::from),

            aws_access_key_id: required("AWS_ACCESS_KEY_ID")?,
            aws_secret_access_key: required("AWS_SECRET_ACCESS_KEY")?,
            aws_region: optional("AWS_REGION", "us-east-1"),
            dynamodb_table: required("DYNAMODB_TABLE")?,

            twilio_account_sid: required("TWILIO_ACCOUNT_SID")?,
            twilio_auth_token: required("TWILIO_AUTH_TOKEN")?,
            twilio_from: required("TWILIO_FROM")?,
            alert_to: required("ALERT_TO")?,
        };
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        validate_thresholds(&self.thresholds)?;
        if self.sensors.temp_samples == 0 {
            bail!("TEMP_SAMPLES must be at least 1");
        }
        if self.tick_interval.is_zero() {
            bail!("TICK_INTERVAL_MS must be greater than zero");
        }
        Ok(())
    }
}

fn validate_thresholds(t: &Thresholds) -> Result<()> {
    if !t.min_temp_c.is_finite() || !t.max_temp_c.is_finite() {
        bail!(
            "MIN_TEMP_C ({}) and MAX_TEMP_C ({}) must be finite numbers",
            t.min_temp_c,
            t.max_temp_c
        );
    }
    if t.min_temp_c >= t.max_temp_c {
        bail!(
            "MIN_TEMP_C ({}) must be below MAX_TEMP_C ({})",
            t.min_temp_c,
            t.max_temp_c
        );
    }
    Ok(())
}

/// Split `"program arg1 arg2..."` on the first space only: everything after it
/// is passed as a single argument, so format strings containing spaces survive.
fn parse_command(raw: &str) -> Result<Vec<String>> {
    let raw = raw.trim();
    if raw.is_empty() {
        bail!("TIME_COMMAND must not be empty");
    }
    Ok(match raw.split_once(' ') {
        Some((program, args)) => vec![program.to_owned(), args.trim().to_owned()],
        None => vec![raw.to_owned()],
    })
}

fn parse<T>(key: &str, default: &str) -> Result<T>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    let raw = optional(key, default);
    raw.trim()
        .parse()
        .map_err(|e| anyhow::anyhow!("{e}"))
        .with_context(|| format!("invalid value for {key}: {raw:?}"))
}

fn required(key: &str) -> Result<String> {
    std::env::var(key).with_context(|| format!("missing required env var: {key}"))
}

fn optional(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_owned())
}
