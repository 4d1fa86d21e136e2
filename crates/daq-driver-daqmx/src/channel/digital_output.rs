//! `nido`: one digital output line on a private task.

use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, info};

use super::{text_arg, Channel, ChannelContext, ChannelKind, Param, Value, WriteOutcome};
use crate::address::compose;
use crate::driver::{DaqmxDriver, LineGrouping};
use crate::error::{DaqmxError, Result};
use crate::task::{teardown, Task};

/// Digital output line. Writes are not forwarded.
#[derive(Debug, Default)]
pub struct DigitalOutputChannel {
    task: Option<Task>,
    lines: Option<String>,
    value: u8,
}

impl DigitalOutputChannel {
    /// Output without a task.
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuild the private task over `lines`, one channel per line.
    pub fn configure(
        &mut self,
        driver: &Arc<dyn DaqmxDriver>,
        channel: &str,
        lines: String,
    ) -> Result<()> {
        teardown(&mut self.task, channel);
        let task = Task::build(driver, |task| {
            task.driver()
                .create_do_chan(task.handle(), &lines, LineGrouping::ChanPerLine)
        })?;

        info!(channel, lines = %lines, "Digital output configured");
        self.task = Some(task);
        self.lines = Some(lines);
        Ok(())
    }

    /// Drive the line low for zero and high for anything else.
    pub fn set(&mut self, value: i64, timeout: Duration) -> Result<u8> {
        let task = self
            .task
            .as_ref()
            .ok_or(DaqmxError::NotConfigured { kind: "nido" })?;
        let level = u8::from(value != 0);
        task.driver()
            .write_digital_lines(task.handle(), &[level], timeout)?;
        self.value = level;
        Ok(level)
    }

    /// Last written level.
    pub fn value(&self) -> u8 {
        self.value
    }

    /// Physical lines, once set up.
    pub fn lines(&self) -> Option<&str> {
        self.lines.as_deref()
    }
}

impl Channel for DigitalOutputChannel {
    fn kind(&self) -> ChannelKind {
        ChannelKind::DigitalOutput
    }

    fn setup(&mut self, ctx: &mut ChannelContext<'_>, params: &[Param]) -> Result<Value> {
        let (Some(device), Some(port), Some(line)) =
            (params.first(), text_arg(params, 1), text_arg(params, 2))
        else {
            return Ok(Value::None);
        };

        let device = ctx.resolve_device(device)?;
        let lines = compose(device.lock().name(), &[&port, &line])?;
        self.configure(ctx.driver, ctx.name, lines)?;
        Ok(Value::None)
    }

    fn write(&mut self, ctx: &mut ChannelContext<'_>, params: &[Param]) -> Result<WriteOutcome> {
        let Some(param) = params.first() else {
            return Ok(WriteOutcome::none());
        };
        let level = self.set(param.as_i64(0)?, ctx.timeouts.digital_write()?)?;
        debug!(channel = ctx.name, level, "Digital output written");
        Ok(WriteOutcome::reply(Value::Int(i64::from(level))))
    }

    fn read(&mut self, _ctx: &mut ChannelContext<'_>) -> Result<Value> {
        Ok(Value::Int(i64::from(self.value)))
    }
}
