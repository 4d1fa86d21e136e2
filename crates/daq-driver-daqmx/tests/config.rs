//! Configuration loading from TOML files.
//!
//! # Test Coverage
//!
//! | Test | Description |
//! |------|-------------|
//! | `test_partial_file_keeps_defaults` | Missing keys fall back to defaults |
//! | `test_missing_file_uses_defaults` | An absent file is not an error |
//! | `test_invalid_values_are_rejected` | `validate` catches bad timeouts and levels |
//! | `test_timeouts_reach_channels` | Loaded config is handed to the host |

use std::io::Write;
use std::sync::Arc;
use std::time::Duration;

use daq_driver_daqmx::mock::MockDriver;
use daq_driver_daqmx::{ChannelHost, DaqmxConfig, Timeouts};
use tempfile::NamedTempFile;

fn write_config(contents: &str) -> NamedTempFile {
    let mut file = tempfile::Builder::new()
        .suffix(".toml")
        .tempfile()
        .unwrap();
    file.write_all(contents.as_bytes()).unwrap();
    file.flush().unwrap();
    file
}

#[test]
fn test_partial_file_keeps_defaults() {
    let file = write_config(
        r#"
        [timeouts]
        counter_read = 5.0

        [logging]
        format = "json"
        "#,
    );

    let config = DaqmxConfig::load_from(file.path()).unwrap();
    config.validate().unwrap();
    assert_eq!(config.timeouts.counter_read().unwrap(), Duration::from_secs(5));
    assert_eq!(config.timeouts.analog_write().unwrap(), Duration::from_millis(500));
    assert_eq!(config.logging.level, "info");
    assert_eq!(config.logging.format, "json");
}

#[test]
fn test_missing_file_uses_defaults() {
    let dir = tempfile::tempdir().unwrap();
    let config = DaqmxConfig::load_from(dir.path().join("absent.toml")).unwrap();
    assert_eq!(config.timeouts, Timeouts::default());
}

#[test]
fn test_invalid_values_are_rejected() {
    let file = write_config("[timeouts]\npwm_write = 0.0\n");
    let config = DaqmxConfig::load_from(file.path()).unwrap();
    let err = config.validate().unwrap_err();
    assert!(err.to_string().contains("timeouts.pwm_write"));

    let file = write_config("[logging]\nlevel = \"loud\"\n");
    let config = DaqmxConfig::load_from(file.path()).unwrap();
    assert!(config.validate().is_err());
}

#[test]
fn test_malformed_file_is_an_error() {
    let file = write_config("[timeouts]\ncounter_read = \"soon\"\n");
    let err = DaqmxConfig::load_from(file.path()).unwrap_err();
    assert!(err.to_string().starts_with("Configuration error"));
}

#[test]
fn test_timeouts_reach_channels() {
    let file = write_config("[timeouts]\npwm_buffer = 250\n");
    let config = DaqmxConfig::load_from(file.path()).unwrap();

    let mock = Arc::new(MockDriver::new());
    let mut host = ChannelHost::new(mock.clone(), config);
    host.execute("create nidev NI1");
    host.execute("setup NI1 Dev1");
    host.execute("create nipwm pwm");
    host.execute("setup pwm 100 NI1 ctr0");

    assert_eq!(host.config().timeouts.pwm_buffer, 250);
    let handle = *mock.task_handles().last().unwrap();
    let task = mock.task(handle).unwrap();
    assert_eq!(
        task.implicit,
        Some((daq_driver_daqmx::SampleMode::Continuous, 250))
    );
}
