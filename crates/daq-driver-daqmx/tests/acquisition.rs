//! Shared Analog Input Acquisition Tests
//!
//! Drives the host through command lines against the mock driver and checks
//! that device acquisitions reach the analog input channels attached to them
//! and whatever is linked downstream.
//!
//! # Test Coverage
//!
//! | Test | Description |
//! |------|-------------|
//! | `test_acquisition_reaches_linked_channels` | Averages flow device -> niai -> niao |
//! | `test_slots_follow_attach_order` | Slot indices are 0..N-1 in attach order |
//! | `test_acquisition_follows_links` | Values go to linked channels, not to the attach list |
//! | `test_short_read_keeps_previous_values` | Sample count mismatch leaves values alone |
//! | `test_acquire_without_inputs_fails` | A device with no slots cannot acquire |
//! | `test_oversized_sample_count_is_rejected` | Sample counts beyond the driver read size never reach a read |
//! | `test_capacity_limit` | The 101st analog input is refused |
//! | `test_failed_attach_still_claims_slot` | Driver failure during attach keeps the index |
//! | `test_unknown_device_claims_nothing` | Unresolved references leave slots free |
//! | `test_moving_channel_between_devices` | Re-setup on another device unlinks the old one |

use std::sync::Arc;

use daq_driver_daqmx::mock::{MockDriver, MockOp, MockSignal};
use daq_driver_daqmx::{ChannelHost, DaqmxConfig, DaqmxError, MAX_CHANNELS, MAX_SAMPLES_PER_CHANNEL};

// =============================================================================
// Test Configuration
// =============================================================================

fn host() -> (Arc<MockDriver>, ChannelHost) {
    let mock = Arc::new(MockDriver::new());
    let host = ChannelHost::new(mock.clone(), DaqmxConfig::default());
    (mock, host)
}

/// Host with `NI1` set up on `Dev1` at 100 Hz and 5 samples per channel.
fn host_with_device() -> (Arc<MockDriver>, ChannelHost) {
    let (mock, mut host) = host();
    host.execute("create nidev NI1");
    host.execute("setup NI1 Dev1 100 5");
    (mock, host)
}

// =============================================================================
// Data Flow
// =============================================================================

#[test]
fn test_acquisition_reaches_linked_channels() {
    let (mock, mut host) = host_with_device();
    mock.set_voltage("Dev1/ai0", 1.25);
    mock.set_signal("Dev1/ai1", MockSignal::Samples(vec![1.0, 2.0, 3.0, 4.0, 5.0]));

    host.execute("create niai ch0");
    host.execute("create niai ch1");
    assert_eq!(host.execute("setup ch0 NI1 ai0"), "0");
    assert_eq!(host.execute("setup ch1 NI1 ai1 RSE -5 5"), "1");

    host.execute("create niao out");
    host.execute("setup out NI1 ao0");
    host.execute("link ch1 out");

    assert_eq!(host.execute("write NI1"), "1.25 3 ");
    assert_eq!(host.execute("read ch0"), "1.25");
    assert_eq!(host.execute("read ch1"), "3");
    assert_eq!(host.execute("read out"), "3");
    assert_eq!(mock.analog_output("Dev1/ao0"), Some(3.0));
    assert_eq!(host.execute("read NI1"), "1.25 3 ");
}

#[test]
fn test_slots_follow_attach_order() {
    let (mock, mut host) = host_with_device();
    for i in 0..4 {
        host.execute(&format!("create niai ch{}", i));
        assert_eq!(
            host.execute(&format!("setup ch{} NI1 ai{}", i, i)),
            i.to_string()
        );
        mock.set_voltage(&format!("Dev1/ai{}", i), f64::from(i) * 0.5);
    }

    assert_eq!(host.execute("write NI1"), "0 0.5 1 1.5 ");
    assert_eq!(host.execute("read ch3"), "1.5");

    let device = host.device("NI1").unwrap();
    let device = device.lock();
    assert_eq!(device.channel_count(), 4);
    assert_eq!(device.attached().len(), 4);
    assert_eq!(mock.live_tasks(), 1);
}

#[test]
fn test_acquisition_follows_links() {
    let (mock, mut host) = host_with_device();
    host.execute("create nidev NI2");
    host.execute("setup NI2 Dev2 100 5");
    mock.set_voltage("Dev1/ai0", 2.5);

    host.execute("create niai ch0");
    host.execute("create niai other");
    host.execute("setup ch0 NI1 ai0");
    assert_eq!(host.execute("setup other NI2 ai0"), "0");
    host.execute("link NI1 other");

    assert_eq!(host.execute("write NI1"), "2.5 ");
    assert_eq!(host.execute("read other"), "2.5");

    let id = host.id_of("other").unwrap();
    let device = host.device("NI1").unwrap();
    assert!(!device.lock().attached().contains(&id));
}

#[test]
fn test_short_read_keeps_previous_values() {
    let (mock, mut host) = host_with_device();
    mock.set_voltage("Dev1/ai0", 2.0);
    host.execute("create niai ch0");
    host.execute("setup ch0 NI1 ai0");
    assert_eq!(host.execute("write NI1"), "2 ");

    mock.set_voltage("Dev1/ai0", 7.0);
    mock.withhold_samples(2);
    assert_eq!(host.execute("write NI1"), "");
    assert_eq!(host.execute("read ch0"), "2");
    assert_eq!(host.execute("read NI1"), "2 ");

    mock.withhold_samples(0);
    assert_eq!(host.execute("write NI1"), "7 ");
}

#[test]
fn test_acquire_without_inputs_fails() {
    let (_mock, mut host) = host_with_device();
    assert!(host.write("NI1", &[]).unwrap_err().to_string().contains("no analog input"));
}

#[test]
fn test_oversized_sample_count_is_rejected() {
    let (mock, mut host) = host_with_device();
    mock.set_voltage("Dev1/ai0", 0.25);

    assert_eq!(host.execute("setup NI1 Dev1 100 4611686018427387904"), "");
    let err = host
        .try_execute(&format!("setup NI1 Dev1 100 {}", MAX_SAMPLES_PER_CHANNEL + 1))
        .unwrap_err();
    assert!(matches!(err, DaqmxError::InvalidArgument { index: 2, .. }));

    host.execute("create niai ch0");
    assert_eq!(host.execute("setup ch0 NI1 ai0"), "0");
    assert_eq!(host.execute("write NI1"), "0.25 ");
    assert_eq!(host.device("NI1").unwrap().lock().samples_per_channel(), 5);
}

// =============================================================================
// Slot Bookkeeping
// =============================================================================

#[test]
fn test_capacity_limit() {
    let (mock, mut host) = host_with_device();
    for i in 0..MAX_CHANNELS {
        host.execute(&format!("create niai ch{}", i));
        assert_eq!(
            host.execute(&format!("setup ch{} NI1 ai{}", i, i)),
            i.to_string()
        );
    }

    host.execute("create niai extra");
    let err = host.try_execute("setup extra NI1 ai100").unwrap_err();
    assert!(err.to_string().contains("capacity is 100"));

    let device = host.device("NI1").unwrap();
    assert_eq!(device.lock().channel_count(), MAX_CHANNELS);
    assert_eq!(mock.call_count(MockOp::CreateAiVoltageChan), MAX_CHANNELS);
}

#[test]
fn test_failed_attach_still_claims_slot() {
    let (mock, mut host) = host_with_device();
    host.execute("create niai ch0");
    host.execute("create niai ch1");

    mock.fail_next(MockOp::CreateAiVoltageChan);
    assert_eq!(host.execute("setup ch0 NI1 ai0"), "0");
    assert_eq!(host.execute("setup ch1 NI1 ai1"), "1");

    let device = host.device("NI1").unwrap();
    assert_eq!(device.lock().channel_count(), 2);
}

#[test]
fn test_unknown_device_claims_nothing() {
    let (_mock, mut host) = host_with_device();
    host.execute("create niai ch0");
    assert_eq!(host.execute("setup ch0 NI7 ai0"), "");
    assert_eq!(host.execute("setup ch0 1 ai0"), "0");
}

#[test]
fn test_moving_channel_between_devices() {
    let (mock, mut host) = host_with_device();
    host.execute("create nidev NI2");
    host.execute("setup NI2 Dev2 100 5");
    mock.set_voltage("Dev1/ai0", 1.0);
    mock.set_voltage("Dev2/ai3", 4.0);

    host.execute("create niai ch0");
    host.execute("setup ch0 NI1 ai0");
    assert_eq!(host.linked("NI1"), vec!["ch0".to_string()]);

    assert_eq!(host.execute("setup ch0 NI2 ai3"), "0");
    assert!(host.linked("NI1").is_empty());
    assert_eq!(host.linked("NI2"), vec!["ch0".to_string()]);

    host.execute("write NI1");
    assert_eq!(host.execute("read ch0"), "0");
    host.execute("write NI2");
    assert_eq!(host.execute("read ch0"), "4");
}
