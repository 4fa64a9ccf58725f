//! Door reed switch and temperature probe, read through Linux sysfs.
//!
//! | Input       | File                                         | Meaning              |
//! |-------------|----------------------------------------------|----------------------|
//! | Door        | `/sys/class/gpio/gpio<PIN>/value`            | `1` = closed         |
//! | Temperature | `<iio device>/in_voltage<PIN>_raw`           | raw ADC counts       |

use std::{
    fs,
    path::{Path, PathBuf},
};

use thiserror::Error;

use crate::config::SensorConfig;

#[derive(Debug, Error)]
pub enum SensorError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("unexpected value {value:?} in {path}")]
    Parse { path: PathBuf, value: String },
    #[error("at least one sample is required")]
    NoSamples,
}

pub trait DoorSensor {
    /// `true` when the door is closed.
    fn is_closed(&mut self) -> Result<bool, SensorError>;
}

pub trait TemperatureSensor {
    fn read_celsius(&mut self) -> Result<f64, SensorError>;
}

fn read_trimmed(path: &Path) -> Result<String, SensorError> {
    fs::read_to_string(path)
        .map(|s| s.trim().to_owned())
        .map_err(|source| SensorError::Io {
            path: path.to_owned(),
            source,
        })
}

// ---------------------------------------------------------------------------
// Door
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct GpioDoor {
    value_path: PathBuf,
    active_low: bool,
}

impl GpioDoor {
    pub fn new(pin: u32, active_low: bool) -> Self {
        Self::at(format!("/sys/class/gpio/gpio{pin}/value"), active_low)
    }

    pub fn at(value_path: impl Into<PathBuf>, active_low: bool) -> Self {
        Self {
            value_path: value_path.into(),
            active_low,
        }
    }
}

impl DoorSensor for GpioDoor {
    fn is_closed(&mut self) -> Result<bool, SensorError> {
        let raw = read_trimmed(&self.value_path)?;
        let level = match raw.as_str() {
            "1" => true,
            "0" => false,
            _ => {
                return Err(SensorError::Parse {
                    path: self.value_path.clone(),
                    value: raw,
                })
            }
        };
        Ok(level != self.active_low)
    }
}

// ---------------------------------------------------------------------------
// Temperature
// ---------------------------------------------------------------------------

/// Averages `samples` raw ADC reads, then converts linearly:
/// `celsius = average * scale + offset`.
#[derive(Debug, Clone)]
pub struct AdcThermometer {
    raw_path: PathBuf,
    samples: usize,
    scale: f64,
    offset: f64,
}

impl AdcThermometer {
    pub fn new(config: &SensorConfig) -> Self {
        Self::at(
            config
                .temp_iio_device
                .join(format!("in_voltage{}_raw", config.temp_pin)),
            config.temp_samples,
            config.temp_scale,
            config.temp_offset,
        )
    }

    pub fn at(raw_path: impl Into<PathBuf>, samples: usize, scale: f64, offset: f64) -> Self {
        Self {
            raw_path: raw_path.into(),
            samples,
            scale,
            offset,
        }
    }

    fn read_raw(&self) -> Result<f64, SensorError> {
        let raw = read_trimmed(&self.raw_path)?;
        raw.parse::<f64>().map_err(|_| SensorError::Parse {
            path: self.raw_path.clone(),
            value: raw,
        })
    }
}

impl TemperatureSensor for AdcThermometer {
    fn read_celsius(&mut self) -> Result<f64, SensorError> {
        let samples = (0..self.samples)
            .map(|_| self.read_raw())
            .collect::<Result<Vec<_>, _>>()?;
        let avg = average(&samples).ok_or(SensorError::NoSamples)?;
        Ok(avg * self.scale + self.offset)
    }
}

/// Mean of `samples`, `None` when empty.
pub fn average(samples: &[f64]) -> Option<f64> {
    if samples.is_empty() {
        return None;
    }
    Some(samples.iter().sum::<f64>() / samples.len() as f64)
}
