//! Configuration using Figment.
//!
//! Settings are merged from built-in defaults, an optional TOML file and
//! environment variables prefixed with `DAQMX_`. Nested keys are separated by
//! a double underscore:
//!
//! ```text
//! DAQMX_TIMEOUTS__COUNTER_READ=5
//! DAQMX_LOGGING__LEVEL=debug
//! ```
//!
//! # Example
//!
//! ```toml
//! [timeouts]
//! acquisition_read = 10.0
//! analog_write = 0.5
//!
//! [logging]
//! level = "debug"
//! format = "compact"
//! ```

use std::path::Path;
use std::time::Duration;

use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};

use crate::error::{DaqmxError, Result};

/// Top-level configuration.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct DaqmxConfig {
    /// Driver call timeouts
    #[serde(default)]
    pub timeouts: Timeouts,
    /// Log output settings
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Per-call driver timeouts in seconds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Timeouts {
    /// Device acquisition read
    pub acquisition_read: f64,
    /// Analog output scalar write
    pub analog_write: f64,
    /// PWM frequency and duty rewrite
    pub pwm_write: f64,
    /// Edge counter scalar read
    pub counter_read: f64,
    /// Digital line write
    pub digital_write: f64,
    /// Buffer size of the continuous pulse train, in samples
    pub pwm_buffer: u64,
}

impl Default for Timeouts {
    fn default() -> Self {
        Self {
            acquisition_read: 10.0,
            analog_write: 0.5,
            pwm_write: 1.0,
            counter_read: 2.0,
            digital_write: 10.0,
            pwm_buffer: 1000,
        }
    }
}

impl Timeouts {
    /// Device acquisition read timeout.
    pub fn acquisition_read(&self) -> Result<Duration> {
        seconds("acquisition_read", self.acquisition_read)
    }

    /// Analog output write timeout.
    pub fn analog_write(&self) -> Result<Duration> {
        seconds("analog_write", self.analog_write)
    }

    /// PWM rewrite timeout.
    pub fn pwm_write(&self) -> Result<Duration> {
        seconds("pwm_write", self.pwm_write)
    }

    /// Counter read timeout.
    pub fn counter_read(&self) -> Result<Duration> {
        seconds("counter_read", self.counter_read)
    }

    /// Digital line write timeout.
    pub fn digital_write(&self) -> Result<Duration> {
        seconds("digital_write", self.digital_write)
    }

    fn entries(&self) -> [(&'static str, f64); 5] {
        [
            ("acquisition_read", self.acquisition_read),
            ("analog_write", self.analog_write),
            ("pwm_write", self.pwm_write),
            ("counter_read", self.counter_read),
            ("digital_write", self.digital_write),
        ]
    }
}

/// A timeout is a positive duration that `Duration` can represent.
fn seconds(name: &str, value: f64) -> Result<Duration> {
    match Duration::try_from_secs_f64(value) {
        Ok(duration) if !duration.is_zero() => Ok(duration),
        _ => Err(DaqmxError::Config {
            message: format!(
                "timeouts.{} must be a positive number of seconds, got {}",
                name, value
            ),
        }),
    }
}

/// Log output settings for the shell.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Default level (trace, debug, info, warn, error); `RUST_LOG` overrides it
    pub level: String,
    /// Output format (pretty, compact, json)
    pub format: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: "pretty".to_string(),
        }
    }
}

/// Valid values of `logging.level`.
pub const LOG_LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];

/// Valid values of `logging.format`.
pub const LOG_FORMATS: [&str; 3] = ["pretty", "compact", "json"];

impl DaqmxConfig {
    /// Load defaults overridden by `DAQMX_*` environment variables only.
    pub fn load() -> Result<Self> {
        Self::figment().extract().map_err(DaqmxError::from)
    }

    /// Load defaults, then `path` (if it exists), then `DAQMX_*` variables.
    pub fn load_from<P: AsRef<Path>>(path: P) -> Result<Self> {
        Figment::from(Serialized::defaults(Self::default()))
            .merge(Toml::file(path.as_ref()))
            .merge(Env::prefixed("DAQMX_").split("__"))
            .extract()
            .map_err(DaqmxError::from)
    }

    fn figment() -> Figment {
        Figment::from(Serialized::defaults(Self::default()))
            .merge(Env::prefixed("DAQMX_").split("__"))
    }

    /// Validate configuration after loading.
    pub fn validate(&self) -> Result<()> {
        for (name, value) in self.timeouts.entries() {
            seconds(name, value)?;
        }
        if self.timeouts.pwm_buffer == 0 {
            return Err(DaqmxError::Config {
                message: "timeouts.pwm_buffer must be at least 1".to_string(),
            });
        }

        if !LOG_LEVELS.contains(&self.logging.level.to_lowercase().as_str()) {
            return Err(DaqmxError::Config {
                message: format!(
                    "Invalid logging.level '{}'. Must be one of: {}",
                    self.logging.level,
                    LOG_LEVELS.join(", ")
                ),
            });
        }
        if !LOG_FORMATS.contains(&self.logging.format.to_lowercase().as_str()) {
            return Err(DaqmxError::Config {
                message: format!(
                    "Invalid logging.format '{}'. Must be one of: {}",
                    self.logging.format,
                    LOG_FORMATS.join(", ")
                ),
            });
        }
        Ok(())
    }
}
