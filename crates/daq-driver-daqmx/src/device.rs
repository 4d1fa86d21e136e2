//! Shared analog-input acquisition device.
//!
//! A [`Device`] stands for one physical DAQ board. It owns a single driver
//! task into which every attached analog input channel is appended, so one
//! finite acquisition samples all of them at once. After each acquisition the
//! raw group-by-channel buffer is averaged into one value per channel slot.
//!
//! # Attach protocol
//!
//! Attaching stops the shared task, appends a voltage channel, reconfigures
//! the sample clock for the device's rate and sample count and starts the
//! task again. Slots are assigned in attach order starting at 0 and are never
//! reclaimed.

use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, error, info, warn};

use crate::address::compose;
use crate::channel::ChannelId;
use crate::driver::{DaqmxDriver, SampleClock, TaskHandle, TerminalConfig, VoltageRange};
use crate::error::{DaqmxError, Result};
use crate::sampler::AveragingSampler;
use crate::task::Task;

/// Number of analog input slots per device.
pub const MAX_CHANNELS: usize = 100;

/// Sample rate of a freshly created device, in Hz.
pub const DEFAULT_SAMPLE_RATE: f64 = 10.0;

/// Samples per channel of a freshly created device.
pub const DEFAULT_SAMPLES_PER_CHANNEL: usize = 1;

/// Largest samples-per-channel setting. A full device read must fit the
/// driver's 32-bit array size.
pub const MAX_SAMPLES_PER_CHANNEL: usize = u32::MAX as usize / MAX_CHANNELS;

/// Result of attaching an analog input to a device.
///
/// The slot is claimed even when the driver rejected part of the attach; the
/// driver failure is carried in `error`.
#[derive(Debug, Clone, PartialEq)]
pub struct Attachment {
    /// Slot assigned to the channel
    pub channel_index: usize,
    /// Driver failure that occurred while reconfiguring the shared task
    pub error: Option<DaqmxError>,
}

/// One physical acquisition board with its shared analog input task.
pub struct Device {
    id: ChannelId,
    name: String,
    driver: Arc<dyn DaqmxDriver>,
    task: Option<Task>,
    channel_count: usize,
    samples_per_channel: usize,
    sample_rate: f64,
    values: [f64; MAX_CHANNELS],
    attached: Vec<ChannelId>,
}

impl Device {
    /// Create a device with default timing and an empty shared task.
    ///
    /// If the task cannot be created now it is created on the first attach.
    pub fn create(id: ChannelId, driver: Arc<dyn DaqmxDriver>) -> Self {
        let task = match Task::create(&driver) {
            Ok(task) => Some(task),
            Err(e) => {
                warn!(device = %id, error = %e, "Could not create shared task, deferring to first attach");
                None
            }
        };

        Self {
            id,
            name: String::new(),
            driver,
            task,
            channel_count: 0,
            samples_per_channel: DEFAULT_SAMPLES_PER_CHANNEL,
            sample_rate: DEFAULT_SAMPLE_RATE,
            values: [0.0; MAX_CHANNELS],
            attached: Vec::new(),
        }
    }

    /// Set the resource name and, optionally, sampling rate and sample count.
    ///
    /// Already attached channels keep their configuration until the next
    /// attach reprograms the sample clock.
    pub fn setup(&mut self, name: &str, rate: Option<f64>, samples: Option<usize>) -> Result<()> {
        if let Some(rate) = rate {
            if rate.is_nan() || rate <= 0.0 {
                return Err(DaqmxError::InvalidArgument {
                    index: 1,
                    message: format!("sample rate must be positive, got {}", rate),
                });
            }
        }
        match samples {
            Some(0) => {
                return Err(DaqmxError::InvalidArgument {
                    index: 2,
                    message: "sample count must be at least 1".to_string(),
                });
            }
            Some(n) if n > MAX_SAMPLES_PER_CHANNEL => {
                return Err(DaqmxError::InvalidArgument {
                    index: 2,
                    message: format!(
                        "sample count must be at most {}, got {}",
                        MAX_SAMPLES_PER_CHANNEL, n
                    ),
                });
            }
            _ => {}
        }

        self.name = name.to_string();
        if let Some(rate) = rate {
            self.sample_rate = rate;
        }
        if let Some(samples) = samples {
            self.samples_per_channel = samples;
        }
        info!(
            device = %self.id,
            name = %self.name,
            rate = self.sample_rate,
            samples = self.samples_per_channel,
            "Device configured"
        );
        Ok(())
    }

    /// Append an analog voltage input on `terminal` to the shared task.
    ///
    /// Capacity and address errors claim no slot. Driver failures are logged
    /// and returned inside the [`Attachment`] with the slot still claimed.
    pub fn attach_analog_input(
        &mut self,
        channel: ChannelId,
        terminal: &str,
        config: TerminalConfig,
        range: VoltageRange,
    ) -> Result<Attachment> {
        if self.channel_count >= MAX_CHANNELS {
            return Err(DaqmxError::CapacityExceeded {
                device: self.name.clone(),
                capacity: MAX_CHANNELS,
            });
        }
        let address = compose(&self.name, &[terminal])?;

        let error = self.reconfigure(&address, config, range).err();
        if let Some(e) = &error {
            error!(device = %self.name, address = %address, error = %e, "Failed to attach analog input");
        }

        let channel_index = self.channel_count;
        self.channel_count += 1;
        if !self.attached.contains(&channel) {
            self.attached.push(channel);
        }
        debug!(device = %self.name, address = %address, channel = %channel, channel_index, "Analog input attached");

        Ok(Attachment {
            channel_index,
            error,
        })
    }

    fn reconfigure(
        &mut self,
        address: &str,
        config: TerminalConfig,
        range: VoltageRange,
    ) -> Result<()> {
        if self.task.is_none() {
            self.task = Some(Task::create(&self.driver)?);
        }
        let Some(task) = self.task.as_ref() else {
            return Err(DaqmxError::NotConfigured { kind: "nidev" });
        };

        if let Err(e) = task.stop() {
            warn!(device = %self.name, error = %e, "Failed to stop shared task before attach");
        }
        let driver = task.driver();
        driver.create_ai_voltage_chan(task.handle(), address, config, range)?;
        let clock = SampleClock::finite(self.sample_rate, self.samples_per_channel as u64);
        driver.cfg_samp_clk_timing(task.handle(), &clock)?;
        task.start()
    }

    /// Forget `channel` as a notification target. Its slot stays claimed.
    pub fn detach(&mut self, channel: ChannelId) {
        self.attached.retain(|c| *c != channel);
    }

    /// Run one finite acquisition and average it into the value slots.
    ///
    /// Returns the averaged values of all claimed slots. On a sample count
    /// mismatch the stored values are left untouched.
    pub fn acquire(&mut self, timeout: Duration) -> Result<&[f64]> {
        if self.channel_count == 0 {
            return Err(DaqmxError::NoChannelsAttached {
                device: self.name.clone(),
            });
        }
        let Some(task) = self.task.as_ref() else {
            return Err(DaqmxError::NotConfigured { kind: "nidev" });
        };

        task.restart()?;

        let sampler = AveragingSampler::new(self.samples_per_channel);
        let len = self
            .samples_per_channel
            .checked_mul(self.channel_count)
            .filter(|len| u32::try_from(*len).is_ok())
            .ok_or_else(|| DaqmxError::InvalidArgument {
                index: 2,
                message: format!(
                    "{} samples for {} channels exceed the driver read size",
                    self.samples_per_channel, self.channel_count
                ),
            })?;
        let mut buffer = vec![0.0; len];
        let read = task
            .driver()
            .read_analog_f64(task.handle(), timeout, &mut buffer)?;
        if read != self.samples_per_channel {
            return Err(DaqmxError::SampleCountMismatch {
                expected: self.samples_per_channel,
                actual: read,
            });
        }

        let means = sampler.reduce(&buffer, self.channel_count)?;
        self.values[..self.channel_count].copy_from_slice(&means);
        debug!(device = %self.name, channels = self.channel_count, "Acquisition complete");
        Ok(self.values())
    }

    /// Host-assigned id.
    pub fn id(&self) -> ChannelId {
        self.id
    }

    /// Resource name, empty until setup.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Number of claimed analog input slots.
    pub fn channel_count(&self) -> usize {
        self.channel_count
    }

    /// Samples read per channel in one acquisition.
    pub fn samples_per_channel(&self) -> usize {
        self.samples_per_channel
    }

    /// Sample clock rate in Hz.
    pub fn sample_rate(&self) -> f64 {
        self.sample_rate
    }

    /// Latest averaged values of all claimed slots.
    pub fn values(&self) -> &[f64] {
        &self.values[..self.channel_count]
    }

    /// Latest averaged value of one slot.
    pub fn value(&self, channel_index: usize) -> Option<f64> {
        self.values().get(channel_index).copied()
    }

    /// Channels attached to this device, in attach order.
    ///
    /// Bookkeeping for attach and detach only. Acquisitions reach channels
    /// through the host's link graph.
    pub fn attached(&self) -> &[ChannelId] {
        &self.attached
    }

    /// Handle of the shared task, if one exists.
    pub fn task_handle(&self) -> Option<TaskHandle> {
        self.task.as_ref().map(Task::handle)
    }
}

impl std::fmt::Debug for Device {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Device")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("task", &self.task)
            .field("channel_count", &self.channel_count)
            .field("samples_per_channel", &self.samples_per_channel)
            .field("sample_rate", &self.sample_rate)
            .finish()
    }
}
