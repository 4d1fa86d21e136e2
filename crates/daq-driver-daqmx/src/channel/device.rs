//! `nidev`: command adapter over a shared [`Device`](crate::device::Device).
//!
//! `setup <name> <device_name> | <sample_rate> | <samples>` names the board
//! and sets its timing, `write <name>` runs one acquisition and forwards the
//! averaged values to every linked channel, `read <name>` returns the stored
//! values.

use tracing::debug;

use super::{text_arg, Channel, ChannelContext, ChannelKind, Param, Value, WriteOutcome};
use crate::error::{DaqmxError, Result};
use crate::registry::SharedDevice;

/// Host-facing handle of a registered device.
pub struct DeviceChannel {
    device: SharedDevice,
}

impl DeviceChannel {
    /// Channel facade over a registered device.
    pub fn new(device: SharedDevice) -> Self {
        Self { device }
    }

    /// The shared device.
    pub fn device(&self) -> &SharedDevice {
        &self.device
    }
}

impl Channel for DeviceChannel {
    fn kind(&self) -> ChannelKind {
        ChannelKind::Device
    }

    fn setup(&mut self, _ctx: &mut ChannelContext<'_>, params: &[Param]) -> Result<Value> {
        let Some(name) = text_arg(params, 0) else {
            return Ok(Value::None);
        };
        let rate = params.get(1).map(|p| p.as_f64(1)).transpose()?;
        let samples = params
            .get(2)
            .map(|p| {
                let n = p.as_i64(2)?;
                usize::try_from(n).map_err(|_| DaqmxError::InvalidArgument {
                    index: 2,
                    message: format!("sample count must not be negative, got {}", n),
                })
            })
            .transpose()?;

        self.device.lock().setup(&name, rate, samples)?;
        Ok(Value::None)
    }

    fn write(&mut self, ctx: &mut ChannelContext<'_>, _params: &[Param]) -> Result<WriteOutcome> {
        let values = self
            .device
            .lock()
            .acquire(ctx.timeouts.acquisition_read()?)?
            .to_vec();
        debug!(channel = ctx.name, values = ?values, "Forwarding acquisition");

        let forward = values.iter().copied().map(Param::Float).collect();
        Ok(WriteOutcome::forwarded(Value::Floats(values), forward))
    }

    fn read(&mut self, _ctx: &mut ChannelContext<'_>) -> Result<Value> {
        Ok(Value::Floats(self.device.lock().values().to_vec()))
    }
}
