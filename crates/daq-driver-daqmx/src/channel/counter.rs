//! `nicounter`: edge counter on a private task.
//!
//! The counter counts falling edges upward from zero. `read` reports the
//! count since the last reset without changing anything. `write` reports
//! and forwards the same difference, then moves the zero point to the
//! current raw count. The subtraction wraps, so a counter rollover still
//! yields the number of edges seen.

use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, info};

use super::{text_arg, Channel, ChannelContext, ChannelKind, Param, Value, WriteOutcome};
use crate::address::compose;
use crate::driver::{CountDirection, DaqmxDriver, Edge};
use crate::error::{DaqmxError, Result};
use crate::task::{teardown, Task};

/// Edge counter with a movable zero point.
#[derive(Debug, Default)]
pub struct CounterChannel {
    task: Option<Task>,
    counter: Option<String>,
    counts: u32,
    zero: u32,
}

impl CounterChannel {
    /// Counter without a task.
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuild the private task as a falling-edge counter on `counter`,
    /// optionally listening on `terminal` instead of the default input.
    pub fn configure(
        &mut self,
        driver: &Arc<dyn DaqmxDriver>,
        channel: &str,
        counter: String,
        terminal: Option<&str>,
    ) -> Result<()> {
        teardown(&mut self.task, channel);
        let task = Task::build(driver, |task| {
            let driver = task.driver();
            driver.create_ci_count_edges_chan(
                task.handle(),
                &counter,
                Edge::Falling,
                0,
                CountDirection::Up,
            )?;
            if let Some(terminal) = terminal {
                driver.set_ci_count_edges_term(task.handle(), &counter, terminal)?;
            }
            Ok(())
        })?;

        info!(channel, counter = %counter, terminal = ?terminal, "Counter configured");
        self.task = Some(task);
        self.counter = Some(counter);
        self.counts = 0;
        self.zero = 0;
        Ok(())
    }

    fn sample(&mut self, timeout: Duration) -> Result<u32> {
        let task = self
            .task
            .as_ref()
            .ok_or(DaqmxError::NotConfigured { kind: "nicounter" })?;
        let raw = task.driver().read_counter_scalar_u32(task.handle(), timeout)?;
        self.counts = raw;
        Ok(raw)
    }

    /// Edges since the last reset.
    pub fn count(&mut self, timeout: Duration) -> Result<u32> {
        let raw = self.sample(timeout)?;
        Ok(raw.wrapping_sub(self.zero))
    }

    /// Edges since the last reset; the current count becomes the new zero.
    pub fn reset(&mut self, timeout: Duration) -> Result<u32> {
        let raw = self.sample(timeout)?;
        let delta = raw.wrapping_sub(self.zero);
        self.zero = raw;
        Ok(delta)
    }

    /// Raw count at the last reset.
    pub fn zero(&self) -> u32 {
        self.zero
    }

    /// Raw count at the last read.
    pub fn counts(&self) -> u32 {
        self.counts
    }

    /// Physical counter, once set up.
    pub fn counter(&self) -> Option<&str> {
        self.counter.as_deref()
    }
}

impl Channel for CounterChannel {
    fn kind(&self) -> ChannelKind {
        ChannelKind::Counter
    }

    fn setup(&mut self, ctx: &mut ChannelContext<'_>, params: &[Param]) -> Result<Value> {
        let (Some(device), Some(counter)) = (params.first(), text_arg(params, 1)) else {
            return Ok(Value::None);
        };
        let terminal = text_arg(params, 2);

        let device = ctx.resolve_device(device)?;
        let counter = compose(device.lock().name(), &[&counter])?;
        self.configure(ctx.driver, ctx.name, counter, terminal.as_deref())?;
        Ok(Value::None)
    }

    fn write(&mut self, ctx: &mut ChannelContext<'_>, _params: &[Param]) -> Result<WriteOutcome> {
        let delta = self.reset(ctx.timeouts.counter_read()?)?;
        debug!(channel = ctx.name, delta, zero = self.zero, "Counter reset");
        Ok(WriteOutcome::forwarded(
            Value::Int(i64::from(delta)),
            vec![Param::Int(i64::from(delta))],
        ))
    }

    fn read(&mut self, ctx: &mut ChannelContext<'_>) -> Result<Value> {
        let count = self.count(ctx.timeouts.counter_read()?)?;
        Ok(Value::Int(i64::from(count)))
    }
}
