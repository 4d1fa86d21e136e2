//! `nipwm`: continuous pulse train on a private counter output task.
//!
//! Setup grammar: `<frequency> <device> <counter> | <idle_state>`. An idle
//! state of 1 idles high with the duty cycle pinned near 100 %, any other
//! value idles low near 0 %. Writes set the duty cycle at the configured
//! frequency and forward the applied (clamped) duty.

use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, info, warn};

use super::{text_arg, Channel, ChannelContext, ChannelKind, Param, Value, WriteOutcome};
use crate::address::compose;
use crate::config::Timeouts;
use crate::driver::{DaqmxDriver, IdleState, PulseSpec, SampleMode};
use crate::error::{DaqmxError, Result};
use crate::task::{teardown, Task};

/// Smallest duty cycle the counter output is driven with.
pub const MIN_DUTY: f64 = 0.001;

/// Largest duty cycle the counter output is driven with.
pub const MAX_DUTY: f64 = 0.999;

/// Frequency of a freshly created channel, in Hz.
pub const DEFAULT_FREQUENCY: f64 = 1000.0;

/// Clamp a requested duty cycle to what the output can generate.
pub fn clamp_duty(duty: f64) -> f64 {
    if duty.is_nan() {
        return MIN_DUTY;
    }
    duty.clamp(MIN_DUTY, MAX_DUTY)
}

/// Counter output generating a pulse train.
#[derive(Debug)]
pub struct PwmChannel {
    task: Option<Task>,
    counter: Option<String>,
    frequency: f64,
    duty: f64,
    idle: IdleState,
}

impl Default for PwmChannel {
    fn default() -> Self {
        Self {
            task: None,
            counter: None,
            frequency: DEFAULT_FREQUENCY,
            duty: MIN_DUTY,
            idle: IdleState::Low,
        }
    }
}

impl PwmChannel {
    /// Idle-low PWM without a task.
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuild the private task as a continuous pulse train on `counter`.
    ///
    /// With `idle` given, the idle level and the matching duty cycle extreme
    /// are applied; without it the current ones are kept. A live task first
    /// gets the new frequency written in place, which may fail harmlessly.
    pub fn configure(
        &mut self,
        driver: &Arc<dyn DaqmxDriver>,
        channel: &str,
        frequency: f64,
        counter: String,
        idle: Option<IdleState>,
        timeouts: &Timeouts,
    ) -> Result<()> {
        let timeout = timeouts.pwm_write()?;
        let (idle, duty) = match idle {
            Some(IdleState::High) => (IdleState::High, MAX_DUTY),
            Some(IdleState::Low) => (IdleState::Low, MIN_DUTY),
            None => (self.idle, self.duty),
        };

        if let Some(task) = &self.task {
            if let Err(e) = task
                .driver()
                .write_ctr_freq(task.handle(), frequency, duty, timeout)
            {
                warn!(channel, error = %e, "In-place frequency update failed, rebuilding task");
            }
        }

        teardown(&mut self.task, channel);
        let pulse = PulseSpec {
            frequency,
            duty,
            idle,
            initial_delay: 0.0,
        };
        let task = Task::build(driver, |task| {
            let driver = task.driver();
            driver.create_co_pulse_chan_freq(task.handle(), &counter, &pulse)?;
            driver.cfg_implicit_timing(task.handle(), SampleMode::Continuous, timeouts.pwm_buffer)
        })?;

        info!(channel, counter = %counter, frequency, duty, idle = ?idle, "PWM configured");
        self.task = Some(task);
        self.counter = Some(counter);
        self.frequency = frequency;
        self.duty = duty;
        self.idle = idle;
        Ok(())
    }

    /// Apply a duty cycle at the current frequency. Returns the clamped duty.
    pub fn set_duty(&mut self, duty: f64, timeout: Duration) -> Result<f64> {
        let duty = clamp_duty(duty);
        let task = self
            .task
            .as_ref()
            .ok_or(DaqmxError::NotConfigured { kind: "nipwm" })?;
        task.driver()
            .write_ctr_freq(task.handle(), self.frequency, duty, timeout)?;
        self.duty = duty;
        Ok(duty)
    }

    /// Last applied duty cycle.
    pub fn duty(&self) -> f64 {
        self.duty
    }

    /// Pulse frequency in Hz.
    pub fn frequency(&self) -> f64 {
        self.frequency
    }

    /// Level between pulses.
    pub fn idle(&self) -> IdleState {
        self.idle
    }

    /// Physical counter, once set up.
    pub fn counter(&self) -> Option<&str> {
        self.counter.as_deref()
    }
}

impl Channel for PwmChannel {
    fn kind(&self) -> ChannelKind {
        ChannelKind::Pwm
    }

    fn setup(&mut self, ctx: &mut ChannelContext<'_>, params: &[Param]) -> Result<Value> {
        let (Some(frequency), Some(device), Some(counter)) =
            (params.first(), params.get(1), text_arg(params, 2))
        else {
            return Ok(Value::None);
        };
        let frequency = frequency.as_f64(0)?;
        let idle = params
            .get(3)
            .map(|p| p.as_i64(3))
            .transpose()?
            .map(|level| if level == 1 { IdleState::High } else { IdleState::Low });

        let device = ctx.resolve_device(device)?;
        let counter = compose(device.lock().name(), &[&counter])?;
        self.configure(
            ctx.driver,
            ctx.name,
            frequency,
            counter,
            idle,
            ctx.timeouts,
        )?;
        Ok(Value::None)
    }

    fn write(&mut self, ctx: &mut ChannelContext<'_>, params: &[Param]) -> Result<WriteOutcome> {
        let Some(param) = params.first() else {
            return Ok(WriteOutcome::none());
        };
        let duty = self.set_duty(param.as_f64(0)?, ctx.timeouts.pwm_write()?)?;
        debug!(channel = ctx.name, duty, "PWM duty applied");
        Ok(WriteOutcome::forwarded(
            Value::Float(duty),
            vec![Param::Float(duty)],
        ))
    }

    fn read(&mut self, _ctx: &mut ChannelContext<'_>) -> Result<Value> {
        Ok(Value::Float(self.duty))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::channel::fixture::Fixture;
    use crate::mock::{MockChannel, MockOp};

    const TIMEOUT: Duration = Duration::from_secs(1);

    fn configured(fx: &Fixture, idle: Option<IdleState>) -> PwmChannel {
        let mut pwm = PwmChannel::new();
        pwm.configure(&fx.driver, "pwm1", 500.0, "Dev1/ctr0".to_string(), idle, &fx.timeouts)
            .unwrap();
        pwm
    }

    #[test]
    fn test_defaults() {
        let pwm = PwmChannel::new();
        assert_eq!(pwm.frequency(), 1000.0);
        assert_eq!(pwm.duty(), MIN_DUTY);
        assert_eq!(pwm.idle(), IdleState::Low);
    }

    #[test]
    fn test_clamp_duty() {
        assert_eq!(clamp_duty(1.5), 0.999);
        assert_eq!(clamp_duty(-2.0), 0.001);
        assert_eq!(clamp_duty(0.25), 0.25);
        assert_eq!(clamp_duty(f64::NAN), 0.001);
    }

    #[test]
    fn test_idle_high_pins_duty() {
        let fx = Fixture::new();
        let pwm = configured(&fx, Some(IdleState::High));
        assert_eq!(pwm.duty(), MAX_DUTY);

        let handle = *fx.mock.task_handles().last().unwrap();
        let task = fx.mock.task(handle).unwrap();
        assert_eq!(task.implicit, Some((SampleMode::Continuous, 1000)));
        assert_eq!(
            task.channels,
            vec![MockChannel::PulseOutput {
                counter: "Dev1/ctr0".to_string(),
                pulse: PulseSpec {
                    frequency: 500.0,
                    duty: MAX_DUTY,
                    idle: IdleState::High,
                    initial_delay: 0.0,
                },
            }]
        );
    }

    #[test]
    fn test_reconfigure_rewrites_then_rebuilds() {
        let fx = Fixture::new();
        let mut pwm = configured(&fx, None);
        fx.mock.fail_next(MockOp::WriteCtrFreq);

        pwm.configure(&fx.driver, "pwm1", 2000.0, "Dev1/ctr0".to_string(), None, &fx.timeouts)
            .unwrap();

        assert_eq!(fx.mock.call_count(MockOp::WriteCtrFreq), 1);
        assert_eq!(fx.mock.call_count(MockOp::CreateCoPulseChanFreq), 2);
        assert_eq!(fx.mock.live_tasks(), 1);
        assert_eq!(pwm.frequency(), 2000.0);
    }

    #[test]
    fn test_set_duty_clamps_and_forwards() {
        let mut fx = Fixture::new();
        let id = fx.channel("pwm1");
        let mut pwm = configured(&fx, None);

        let outcome = pwm.write(&mut fx.ctx(id), &[Param::Float(1.5)]).unwrap();
        assert_eq!(outcome.forward, Some(vec![Param::Float(0.999)]));
        assert_eq!(fx.mock.pulse_output("Dev1/ctr0"), Some((500.0, 0.999)));

        pwm.write(&mut fx.ctx(id), &[Param::Int(-2)]).unwrap();
        assert_eq!(pwm.read(&mut fx.ctx(id)).unwrap(), Value::Float(0.001));
    }

    #[test]
    fn test_write_before_setup() {
        let mut pwm = PwmChannel::new();
        let err = pwm.set_duty(0.5, TIMEOUT).unwrap_err();
        assert!(matches!(err, DaqmxError::NotConfigured { kind: "nipwm" }));
        assert_eq!(pwm.duty(), MIN_DUTY);
    }
}
