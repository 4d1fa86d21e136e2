//! `niao`: analog voltage output on a private task.
//!
//! Setup grammar: `<device> <terminal> | <min> <max>`. Every setup discards
//! the previous task and builds a new one. Writes are forwarded to linked
//! channels.

use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, info};

use super::{text_arg, Channel, ChannelContext, ChannelKind, Param, Value, WriteOutcome};
use crate::address::compose;
use crate::driver::{DaqmxDriver, VoltageRange};
use crate::error::{DaqmxError, Result};
use crate::task::{teardown, Task};

/// Analog output with its own task.
#[derive(Debug, Default)]
pub struct AnalogOutputChannel {
    task: Option<Task>,
    range: VoltageRange,
    address: Option<String>,
    value: f64,
}

impl AnalogOutputChannel {
    /// Unconfigured output, -10 to 10 V.
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuild the private task as one voltage output on `address`.
    pub fn configure(
        &mut self,
        driver: &Arc<dyn DaqmxDriver>,
        channel: &str,
        address: String,
        range: VoltageRange,
    ) -> Result<()> {
        teardown(&mut self.task, channel);
        let task = Task::build(driver, |task| {
            task.driver()
                .create_ao_voltage_chan(task.handle(), &address, range)
        })?;

        info!(channel, address = %address, min = range.min, max = range.max, "Analog output configured");
        self.task = Some(task);
        self.range = range;
        self.address = Some(address);
        Ok(())
    }

    /// Write one value. The range is enforced by the driver, not here.
    pub fn set(&mut self, value: f64, timeout: Duration) -> Result<()> {
        let task = self
            .task
            .as_ref()
            .ok_or(DaqmxError::NotConfigured { kind: "niao" })?;
        task.driver()
            .write_analog_scalar_f64(task.handle(), value, timeout)?;
        self.value = value;
        Ok(())
    }

    /// Last written value.
    pub fn value(&self) -> f64 {
        self.value
    }

    /// Output range of the current task.
    pub fn range(&self) -> VoltageRange {
        self.range
    }

    /// Physical address of the current task.
    pub fn address(&self) -> Option<&str> {
        self.address.as_deref()
    }

    /// Whether a task exists.
    pub fn is_configured(&self) -> bool {
        self.task.is_some()
    }
}

impl Channel for AnalogOutputChannel {
    fn kind(&self) -> ChannelKind {
        ChannelKind::AnalogOutput
    }

    fn setup(&mut self, ctx: &mut ChannelContext<'_>, params: &[Param]) -> Result<Value> {
        let (Some(device), Some(terminal)) = (params.first(), text_arg(params, 1)) else {
            return Ok(Value::None);
        };
        let range = match (params.get(2), params.get(3)) {
            (Some(min), Some(max)) => VoltageRange::new(min.as_f64(2)?, max.as_f64(3)?),
            _ => self.range,
        };

        let device = ctx.resolve_device(device)?;
        let address = compose(device.lock().name(), &[&terminal])?;
        self.configure(ctx.driver, ctx.name, address, range)?;
        Ok(Value::None)
    }

    fn write(&mut self, ctx: &mut ChannelContext<'_>, params: &[Param]) -> Result<WriteOutcome> {
        let Some(param) = params.first() else {
            return Ok(WriteOutcome::none());
        };
        let value = param.as_f64(0)?;
        self.set(value, ctx.timeouts.analog_write()?)?;
        debug!(channel = ctx.name, value, "Analog output written");
        Ok(WriteOutcome::forwarded(
            Value::Float(value),
            vec![Param::Float(value)],
        ))
    }

    fn read(&mut self, _ctx: &mut ChannelContext<'_>) -> Result<Value> {
        Ok(Value::Float(self.value))
    }
}
