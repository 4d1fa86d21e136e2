//! Private Task Channel Tests
//!
//! Covers the channels that own a task of their own: analog output, digital
//! output, edge counter and PWM. Every setup tears the previous task down and
//! builds a fresh one, so these tests also watch the mock's live task count.
//!
//! # Test Coverage
//!
//! | Test | Description |
//! |------|-------------|
//! | `test_counter_reports_and_rebases` | write 100 -> 100, write 150 -> 50, read 0 |
//! | `test_counter_forwards_difference` | Counter deltas reach linked outputs |
//! | `test_counter_before_setup` | Reads fail until a task exists |
//! | `test_pwm_clamps_duty` | Duty outside (0, 1) is pinned to 0.001 / 0.999 |
//! | `test_pwm_setup_recreates_task` | Re-setup leaves exactly one live task |
//! | `test_digital_output_normalizes_level` | Non-zero writes drive the line high |
//! | `test_analog_output_range_and_write` | Range arguments and scalar writes |
//! | `test_unresolved_device_is_a_noop` | Setup against an unknown device keeps state |
//! | `test_analog_output_keeps_task_on_bad_address` | Address errors preserve the old task |
//! | `test_failed_setup_leaves_channel_unconfigured` | Driver failure drops the task |

use std::sync::Arc;

use daq_driver_daqmx::mock::{MockDriver, MockOp};
use daq_driver_daqmx::{ChannelHost, DaqmxConfig, DaqmxError, Param, Value};

// =============================================================================
// Test Configuration
// =============================================================================

fn host() -> (Arc<MockDriver>, ChannelHost) {
    let mock = Arc::new(MockDriver::new());
    let mut host = ChannelHost::new(mock.clone(), DaqmxConfig::default());
    host.execute("create nidev NI1");
    host.execute("setup NI1 Dev1");
    (mock, host)
}

// =============================================================================
// Counter
// =============================================================================

#[test]
fn test_counter_reports_and_rebases() {
    let (mock, mut host) = host();
    host.execute("create nicounter cnt");
    host.execute("setup cnt NI1 ctr0");

    mock.set_count("Dev1/ctr0", 100);
    assert_eq!(host.execute("read cnt"), "100");
    assert_eq!(host.execute("write cnt"), "100");

    mock.set_count("Dev1/ctr0", 150);
    assert_eq!(host.execute("write cnt"), "50");
    assert_eq!(host.execute("read cnt"), "0");
}

#[test]
fn test_counter_forwards_difference() {
    let (mock, mut host) = host();
    host.execute("create nicounter cnt");
    host.execute("setup cnt NI1 ctr1 /Dev1/PFI3");
    host.execute("create niao rate");
    host.execute("setup rate NI1 ao1");
    host.link("cnt", "rate").unwrap();

    mock.set_count("Dev1/ctr1", 42);
    assert_eq!(host.write("cnt", &[]).unwrap(), Value::Int(42));
    assert_eq!(mock.analog_output("Dev1/ao1"), Some(42.0));
}

#[test]
fn test_counter_before_setup() {
    let (_mock, mut host) = host();
    host.execute("create nicounter cnt");
    let err = host.read("cnt").unwrap_err();
    assert!(matches!(err, DaqmxError::NotConfigured { kind: "nicounter" }));
}

// =============================================================================
// PWM
// =============================================================================

#[test]
fn test_pwm_clamps_duty() {
    let (mock, mut host) = host();
    host.execute("create nipwm pwm");
    host.execute("setup pwm 250 NI1 ctr0");

    assert_eq!(host.execute("write pwm 1.5"), "0.999");
    assert_eq!(mock.pulse_output("Dev1/ctr0"), Some((250.0, 0.999)));

    assert_eq!(host.execute("write pwm -3"), "0.001");
    assert_eq!(host.execute("write pwm 0.4"), "0.4");
    assert_eq!(host.execute("read pwm"), "0.4");
}

#[test]
fn test_pwm_setup_recreates_task() {
    let (mock, mut host) = host();
    host.execute("create nipwm pwm");
    host.execute("setup pwm 250 NI1 ctr0 1");
    assert_eq!(host.execute("read pwm"), "0.999");
    let before = mock.live_tasks();

    host.execute("setup pwm 500 NI1 ctr0");
    assert_eq!(mock.live_tasks(), before);
    assert_eq!(mock.call_count(MockOp::CreateCoPulseChanFreq), 2);
    assert_eq!(mock.call_count(MockOp::WriteCtrFreq), 1);
    assert_eq!(host.execute("read pwm"), "0.999");

    host.execute("setup pwm 500 NI1 ctr0 0");
    assert_eq!(host.execute("read pwm"), "0.001");
}

// =============================================================================
// Analog and Digital Output
// =============================================================================

#[test]
fn test_digital_output_normalizes_level() {
    let (mock, mut host) = host();
    host.execute("create nido led");
    host.execute("setup led NI1 port0 line1");

    assert_eq!(host.execute("write led 7"), "1");
    assert_eq!(mock.digital_line("Dev1/port0/line1"), Some(1));
    assert_eq!(host.execute("write led 0"), "0");
    assert_eq!(mock.digital_line("Dev1/port0/line1"), Some(0));
}

#[test]
fn test_analog_output_range_and_write() {
    let (mock, mut host) = host();
    host.execute("create niao ao");
    host.setup(
        "ao",
        &[Param::from("NI1"), Param::from("ao0"), Param::from(0i64), Param::from(5i64)],
    )
    .unwrap();

    assert_eq!(host.execute("write ao 2.5"), "2.5");
    assert_eq!(mock.analog_output("Dev1/ao0"), Some(2.5));
    assert_eq!(host.execute("read ao"), "2.5");
}

#[test]
fn test_unresolved_device_is_a_noop() {
    let (mock, mut host) = host();
    host.execute("create niao ao");
    host.execute("setup ao NI1 ao0");
    let tasks = mock.live_tasks();

    assert_eq!(host.execute("setup ao NI5 ao1"), "");
    assert_eq!(mock.live_tasks(), tasks);
    assert_eq!(host.execute("write ao 1"), "1");
    assert_eq!(mock.analog_output("Dev1/ao0"), Some(1.0));
}

#[test]
fn test_analog_output_keeps_task_on_bad_address() {
    let (mock, mut host) = host();
    host.execute("create niao ao");
    host.execute("setup ao NI1 ao0");

    let long = "x".repeat(300);
    assert_eq!(host.execute(&format!("setup ao NI1 {}", long)), "");
    assert_eq!(host.execute("write ao 0.75"), "0.75");
    assert_eq!(mock.analog_output("Dev1/ao0"), Some(0.75));
}

#[test]
fn test_failed_setup_leaves_channel_unconfigured() {
    let (mock, mut host) = host();
    host.execute("create niao ao");
    mock.fail_next(MockOp::CreateAoVoltageChan);
    let tasks = mock.live_tasks();

    assert_eq!(host.execute("setup ao NI1 ao0"), "");
    assert_eq!(mock.live_tasks(), tasks);
    let err = host.write("ao", &[Param::from(1.0)]).unwrap_err();
    assert!(matches!(err, DaqmxError::NotConfigured { kind: "niao" }));
}
