//! NI-DAQmx channel layer.
//!
//! This crate maps named logical channels onto the physical resources of one
//! or more NI-DAQmx boards and manages the driver tasks behind them.
//!
//! # Architecture
//!
//! ## Devices
//! - [`Device`] - One board. Owns a shared finite-acquisition task into which
//!   every attached analog input is appended, and averages each acquisition
//!   into one value per slot.
//! - [`DeviceRegistry`] - Insertion-ordered set of devices, looked up by id.
//!
//! ## Channels
//! - [`AnalogInputChannel`] (`niai`) - One slot of a device's shared task
//! - [`AnalogOutputChannel`] (`niao`) - Voltage output on a private task
//! - [`DigitalOutputChannel`] (`nido`) - Single line output on a private task
//! - [`CounterChannel`] (`nicounter`) - Edge counter with a movable zero point
//! - [`PwmChannel`] (`nipwm`) - Continuous pulse train with clamped duty
//!
//! Output, counter and PWM channels rebuild their private task on every
//! setup.
//!
//! ## Host
//! - [`ChannelHost`] - Creates channels by class name, dispatches `setup`,
//!   `write`, `read` and `help` commands and forwards write results along
//!   links between channels.
//!
//! ## Driver seam
//! - [`DaqmxDriver`] - The blocking driver call contract
//! - [`NiDaqmx`] - Real implementation (`hardware` feature)
//! - [`mock::MockDriver`] - In-memory implementation for tests and dry runs
//!
//! # Features
//!
//! - `hardware`: Link against the NI-DAQmx runtime and enable [`NiDaqmx`].
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//! use daq_driver_daqmx::{ChannelHost, DaqmxConfig, Param, Value};
//! use daq_driver_daqmx::mock::MockDriver;
//!
//! # fn example() -> daq_driver_daqmx::Result<()> {
//! let mock = Arc::new(MockDriver::new());
//! mock.set_count("Dev1/ctr0", 100);
//!
//! let mut host = ChannelHost::new(mock.clone(), DaqmxConfig::default());
//! host.create("nidev", "NI1")?;
//! host.setup("NI1", &[Param::from("Dev1")])?;
//! host.create("nicounter", "cnt")?;
//! host.setup("cnt", &[Param::from("NI1"), Param::from("ctr0")])?;
//!
//! assert_eq!(host.write("cnt", &[])?, Value::Int(100));
//! # Ok(())
//! # }
//! # example().unwrap();
//! ```

pub mod address;
pub mod channel;
pub mod config;
pub mod device;
pub mod driver;
pub mod error;
#[cfg(feature = "hardware")]
pub mod ffi;
pub mod host;
pub mod links;
pub mod mock;
pub mod registry;
pub mod sampler;
pub mod task;

pub use address::{compose, PhysicalAddress};
pub use channel::{
    AnalogInputChannel, AnalogOutputChannel, Channel, ChannelContext, ChannelId, ChannelKind,
    CounterChannel, DeviceChannel, DigitalOutputChannel, Param, PwmChannel, Value, WriteOutcome,
};
pub use config::{DaqmxConfig, LoggingConfig, Timeouts};
pub use device::{Attachment, Device, MAX_CHANNELS, MAX_SAMPLES_PER_CHANNEL};
pub use driver::{
    CountDirection, DaqmxDriver, Edge, IdleState, LineGrouping, PulseSpec, SampleClock,
    SampleMode, TaskHandle, TerminalConfig, VoltageRange,
};
pub use error::{DaqmxError, Result};
#[cfg(feature = "hardware")]
pub use ffi::NiDaqmx;
pub use host::ChannelHost;
pub use links::LinkGraph;
pub use registry::{DeviceRegistry, SharedDevice};
pub use sampler::AveragingSampler;
pub use task::Task;
