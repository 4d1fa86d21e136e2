//! In-memory [`DaqmxDriver`] for tests and hardware-free runs.
//!
//! The mock keeps a table of tasks with the channels and timing configured on
//! them, serves analog samples from scripted [`MockSignal`]s, serves counter
//! values set with [`MockDriver::set_count`], and records every output that
//! was written. Failures can be injected per operation, either once or for
//! every subsequent call.
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//! use daq_driver_daqmx::mock::{MockDriver, MockOp};
//! use daq_driver_daqmx::DaqmxDriver;
//!
//! let mock = Arc::new(MockDriver::new());
//! mock.fail_next(MockOp::StartTask);
//!
//! let task = mock.create_task().unwrap();
//! assert!(mock.start_task(task).is_err());
//! assert!(mock.start_task(task).is_ok());
//! ```

use std::collections::{BTreeMap, HashMap};
use std::time::Duration;

use parking_lot::Mutex;
use tracing::trace;

use crate::driver::{
    CountDirection, DaqmxDriver, Edge, LineGrouping, PulseSpec, SampleClock, SampleMode,
    TaskHandle, TerminalConfig, VoltageRange,
};
use crate::error::{DaqmxError, Result};

/// Status code reported for injected failures.
pub const MOCK_FAILURE_CODE: i32 = -201003;

/// Status code reported when a call names a task that does not exist.
pub const INVALID_TASK_CODE: i32 = -200088;

/// Driver operations that can be observed and failed.
///
/// Each variant is named after its entry point, see [`MockOp::name`].
#[allow(missing_docs)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MockOp {
    CreateTask,
    StartTask,
    StopTask,
    ClearTask,
    CreateAiVoltageChan,
    CfgSampClkTiming,
    ReadAnalogF64,
    CreateAoVoltageChan,
    WriteAnalogScalarF64,
    CreateCoPulseChanFreq,
    CfgImplicitTiming,
    WriteCtrFreq,
    CreateCiCountEdgesChan,
    SetCiCountEdgesTerm,
    ReadCounterScalarU32,
    CreateDoChan,
    WriteDigitalLines,
}

impl MockOp {
    /// Name of the C entry point this operation stands for.
    pub fn name(self) -> &'static str {
        match self {
            Self::CreateTask => "DAQmxCreateTask",
            Self::StartTask => "DAQmxStartTask",
            Self::StopTask => "DAQmxStopTask",
            Self::ClearTask => "DAQmxClearTask",
            Self::CreateAiVoltageChan => "DAQmxCreateAIVoltageChan",
            Self::CfgSampClkTiming => "DAQmxCfgSampClkTiming",
            Self::ReadAnalogF64 => "DAQmxReadAnalogF64",
            Self::CreateAoVoltageChan => "DAQmxCreateAOVoltageChan",
            Self::WriteAnalogScalarF64 => "DAQmxWriteAnalogScalarF64",
            Self::CreateCoPulseChanFreq => "DAQmxCreateCOPulseChanFreq",
            Self::CfgImplicitTiming => "DAQmxCfgImplicitTiming",
            Self::WriteCtrFreq => "DAQmxWriteCtrFreq",
            Self::CreateCiCountEdgesChan => "DAQmxCreateCICountEdgesChan",
            Self::SetCiCountEdgesTerm => "DAQmxSetCICountEdgesTerm",
            Self::ReadCounterScalarU32 => "DAQmxReadCounterScalarU32",
            Self::CreateDoChan => "DAQmxCreateDOChan",
            Self::WriteDigitalLines => "DAQmxWriteDigitalLines",
        }
    }
}

/// A channel configured on a mock task.
#[derive(Debug, Clone, PartialEq)]
pub enum MockChannel {
    /// Voltage input added by `create_ai_voltage_chan`
    AnalogInput {
        /// Physical channel, e.g. `Dev1/ai0`
        physical: String,
        /// Input terminal configuration
        terminal: TerminalConfig,
        /// Expected voltage range
        range: VoltageRange,
    },
    /// Voltage output added by `create_ao_voltage_chan`
    AnalogOutput {
        /// Physical channel, e.g. `Dev1/ao0`
        physical: String,
        /// Output voltage range
        range: VoltageRange,
    },
    /// Pulse train added by `create_co_pulse_chan_freq`
    PulseOutput {
        /// Counter generating the pulses
        counter: String,
        /// Frequency, duty and idle level
        pulse: PulseSpec,
    },
    /// Edge counter added by `create_ci_count_edges_chan`
    EdgeCounter {
        /// Counter doing the counting
        counter: String,
        /// Edge that increments the count
        edge: Edge,
        /// Count at task start
        initial_count: u32,
        /// Up or down
        direction: CountDirection,
        /// Input terminal, if rerouted
        terminal: Option<String>,
    },
    /// Digital lines added by `create_do_chan`
    DigitalOutput {
        /// Lines, e.g. `Dev1/port0/line1`
        lines: String,
        /// Line grouping
        grouping: LineGrouping,
    },
}

/// Snapshot of a mock task.
#[derive(Debug, Clone, Default)]
pub struct MockTask {
    /// Channels in creation order
    pub channels: Vec<MockChannel>,
    /// Whether the task is currently started
    pub running: bool,
    /// Number of successful starts
    pub starts: usize,
    /// Sample clock, if configured
    pub clock: Option<SampleClock>,
    /// Implicit timing, if configured
    pub implicit: Option<(SampleMode, u64)>,
}

impl MockTask {
    fn analog_inputs(&self) -> Vec<&str> {
        self.channels
            .iter()
            .filter_map(|c| match c {
                MockChannel::AnalogInput { physical, .. } => Some(physical.as_str()),
                _ => None,
            })
            .collect()
    }

    fn first_counter(&self) -> Option<&str> {
        self.channels.iter().find_map(|c| match c {
            MockChannel::EdgeCounter { counter, .. } | MockChannel::PulseOutput { counter, .. } => {
                Some(counter.as_str())
            }
            _ => None,
        })
    }
}

/// Scripted analog input signal.
#[derive(Debug, Clone, PartialEq)]
pub enum MockSignal {
    /// Same value for every sample
    Constant(f64),
    /// Sample `n` is `values[n % values.len()]`
    Samples(Vec<f64>),
}

impl MockSignal {
    fn sample(&self, n: usize) -> f64 {
        match self {
            Self::Constant(v) => *v,
            Self::Samples(values) if values.is_empty() => 0.0,
            Self::Samples(values) => values[n % values.len()],
        }
    }
}

/// One recorded driver call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MockCall {
    /// Operation invoked
    pub op: MockOp,
    /// Task the call was issued against, if any
    pub task: Option<TaskHandle>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Failure {
    Once,
    Always,
}

#[derive(Default)]
struct MockState {
    next_handle: usize,
    tasks: BTreeMap<TaskHandle, MockTask>,
    signals: HashMap<String, MockSignal>,
    counts: HashMap<String, u32>,
    analog_outputs: HashMap<String, f64>,
    digital_lines: HashMap<String, u8>,
    pulses: HashMap<String, (f64, f64)>,
    calls: Vec<MockCall>,
    failures: HashMap<MockOp, Failure>,
    withheld_samples: usize,
    last_error: String,
}

impl MockState {
    /// Record the call and apply any injected failure.
    fn enter(&mut self, op: MockOp, task: Option<TaskHandle>) -> Result<()> {
        trace!(op = op.name(), ?task, "mock driver call");
        self.calls.push(MockCall { op, task });

        let injected = match self.failures.get(&op) {
            Some(Failure::Once) => {
                self.failures.remove(&op);
                true
            }
            Some(Failure::Always) => true,
            None => false,
        };
        if injected {
            return Err(self.fail(op, MOCK_FAILURE_CODE, "Injected failure"));
        }

        if let Some(task) = task {
            if !self.tasks.contains_key(&task) {
                return Err(self.fail(
                    op,
                    INVALID_TASK_CODE,
                    "Task specified is invalid or does not exist.",
                ));
            }
        }
        Ok(())
    }

    fn fail(&mut self, op: MockOp, code: i32, message: &str) -> DaqmxError {
        self.last_error = format!("{} (status {}) in {}", message, code, op.name());
        DaqmxError::driver(op.name(), code, self.last_error.clone())
    }

    fn task_mut(&mut self, task: TaskHandle) -> &mut MockTask {
        // enter() has already validated the handle
        self.tasks.entry(task).or_default()
    }
}

/// In-memory driver implementation.
#[derive(Default)]
pub struct MockDriver {
    state: Mutex<MockState>,
}

impl MockDriver {
    /// Create a mock with no tasks, no signals and no injected failures.
    pub fn new() -> Self {
        Self::default()
    }

    /// Script the samples served for an analog input address.
    pub fn set_signal(&self, physical: &str, signal: MockSignal) {
        self.state.lock().signals.insert(physical.to_string(), signal);
    }

    /// Serve a constant voltage on an analog input address.
    pub fn set_voltage(&self, physical: &str, volts: f64) {
        self.set_signal(physical, MockSignal::Constant(volts));
    }

    /// Set the raw count returned for a counter address.
    pub fn set_count(&self, counter: &str, count: u32) {
        self.state.lock().counts.insert(counter.to_string(), count);
    }

    /// Withhold `n` samples per channel from every analog read, simulating a
    /// short acquisition.
    pub fn withhold_samples(&self, n: usize) {
        self.state.lock().withheld_samples = n;
    }

    /// Fail the next call of `op`.
    pub fn fail_next(&self, op: MockOp) {
        self.state.lock().failures.insert(op, Failure::Once);
    }

    /// Fail every call of `op` until [`MockDriver::clear_failures`].
    pub fn fail_always(&self, op: MockOp) {
        self.state.lock().failures.insert(op, Failure::Always);
    }

    /// Remove all injected failures.
    pub fn clear_failures(&self) {
        self.state.lock().failures.clear();
    }

    /// All calls recorded so far.
    pub fn calls(&self) -> Vec<MockCall> {
        self.state.lock().calls.clone()
    }

    /// Number of recorded calls of `op`.
    pub fn call_count(&self, op: MockOp) -> usize {
        self.state.lock().calls.iter().filter(|c| c.op == op).count()
    }

    /// Number of tasks created and not yet cleared.
    pub fn live_tasks(&self) -> usize {
        self.state.lock().tasks.len()
    }

    /// Whether `task` exists.
    pub fn is_live(&self, task: TaskHandle) -> bool {
        self.state.lock().tasks.contains_key(&task)
    }

    /// Snapshot of a task.
    pub fn task(&self, task: TaskHandle) -> Option<MockTask> {
        self.state.lock().tasks.get(&task).cloned()
    }

    /// Handles of all live tasks, in creation order.
    pub fn task_handles(&self) -> Vec<TaskHandle> {
        self.state.lock().tasks.keys().copied().collect()
    }

    /// Last value written to an analog output address.
    pub fn analog_output(&self, physical: &str) -> Option<f64> {
        self.state.lock().analog_outputs.get(physical).copied()
    }

    /// Last value written to a digital line address.
    pub fn digital_line(&self, lines: &str) -> Option<u8> {
        self.state.lock().digital_lines.get(lines).copied()
    }

    /// Current `(frequency, duty)` of a pulse output counter.
    pub fn pulse_output(&self, counter: &str) -> Option<(f64, f64)> {
        self.state.lock().pulses.get(counter).copied()
    }
}

impl DaqmxDriver for MockDriver {
    fn create_task(&self) -> Result<TaskHandle> {
        let mut state = self.state.lock();
        state.enter(MockOp::CreateTask, None)?;
        state.next_handle += 1;
        let handle = TaskHandle::from_raw(0x1000 + state.next_handle);
        state.tasks.insert(handle, MockTask::default());
        Ok(handle)
    }

    fn start_task(&self, task: TaskHandle) -> Result<()> {
        let mut state = self.state.lock();
        state.enter(MockOp::StartTask, Some(task))?;
        let t = state.task_mut(task);
        t.running = true;
        t.starts += 1;
        Ok(())
    }

    fn stop_task(&self, task: TaskHandle) -> Result<()> {
        let mut state = self.state.lock();
        state.enter(MockOp::StopTask, Some(task))?;
        state.task_mut(task).running = false;
        Ok(())
    }

    fn clear_task(&self, task: TaskHandle) -> Result<()> {
        let mut state = self.state.lock();
        state.enter(MockOp::ClearTask, Some(task))?;
        state.tasks.remove(&task);
        Ok(())
    }

    fn create_ai_voltage_chan(
        &self,
        task: TaskHandle,
        physical_channel: &str,
        terminal: TerminalConfig,
        range: VoltageRange,
    ) -> Result<()> {
        let mut state = self.state.lock();
        state.enter(MockOp::CreateAiVoltageChan, Some(task))?;
        state.task_mut(task).channels.push(MockChannel::AnalogInput {
            physical: physical_channel.to_string(),
            terminal,
            range,
        });
        Ok(())
    }

    fn cfg_samp_clk_timing(&self, task: TaskHandle, clock: &SampleClock) -> Result<()> {
        let mut state = self.state.lock();
        state.enter(MockOp::CfgSampClkTiming, Some(task))?;
        state.task_mut(task).clock = Some(*clock);
        Ok(())
    }

    fn read_analog_f64(
        &self,
        task: TaskHandle,
        _timeout: Duration,
        buffer: &mut [f64],
    ) -> Result<usize> {
        let mut state = self.state.lock();
        state.enter(MockOp::ReadAnalogF64, Some(task))?;

        let t = state.task_mut(task).clone();
        let configured = t.clock.map(|c| c.samples_per_channel as usize).unwrap_or(1);
        let per_channel = configured.saturating_sub(state.withheld_samples);
        let inputs = t.analog_inputs();

        if buffer.len() < per_channel * inputs.len() {
            return Err(state.fail(
                MockOp::ReadAnalogF64,
                -200229,
                "Buffer is too small to fit read data.",
            ));
        }

        for (ch, physical) in inputs.iter().enumerate() {
            let signal = state.signals.get(*physical);
            for n in 0..per_channel {
                buffer[ch * per_channel + n] = signal.map_or(0.0, |s| s.sample(n));
            }
        }
        Ok(per_channel)
    }

    fn create_ao_voltage_chan(
        &self,
        task: TaskHandle,
        physical_channel: &str,
        range: VoltageRange,
    ) -> Result<()> {
        let mut state = self.state.lock();
        state.enter(MockOp::CreateAoVoltageChan, Some(task))?;
        state.task_mut(task).channels.push(MockChannel::AnalogOutput {
            physical: physical_channel.to_string(),
            range,
        });
        Ok(())
    }

    fn write_analog_scalar_f64(
        &self,
        task: TaskHandle,
        value: f64,
        _timeout: Duration,
    ) -> Result<()> {
        let mut state = self.state.lock();
        state.enter(MockOp::WriteAnalogScalarF64, Some(task))?;
        let physical = state.task_mut(task).channels.iter().find_map(|c| match c {
            MockChannel::AnalogOutput { physical, .. } => Some(physical.clone()),
            _ => None,
        });
        if let Some(physical) = physical {
            state.analog_outputs.insert(physical, value);
        }
        Ok(())
    }

    fn create_co_pulse_chan_freq(
        &self,
        task: TaskHandle,
        counter: &str,
        pulse: &PulseSpec,
    ) -> Result<()> {
        let mut state = self.state.lock();
        state.enter(MockOp::CreateCoPulseChanFreq, Some(task))?;
        state.task_mut(task).channels.push(MockChannel::PulseOutput {
            counter: counter.to_string(),
            pulse: *pulse,
        });
        state
            .pulses
            .insert(counter.to_string(), (pulse.frequency, pulse.duty));
        Ok(())
    }

    fn cfg_implicit_timing(
        &self,
        task: TaskHandle,
        mode: SampleMode,
        samples_per_channel: u64,
    ) -> Result<()> {
        let mut state = self.state.lock();
        state.enter(MockOp::CfgImplicitTiming, Some(task))?;
        state.task_mut(task).implicit = Some((mode, samples_per_channel));
        Ok(())
    }

    fn write_ctr_freq(
        &self,
        task: TaskHandle,
        frequency: f64,
        duty: f64,
        _timeout: Duration,
    ) -> Result<()> {
        let mut state = self.state.lock();
        state.enter(MockOp::WriteCtrFreq, Some(task))?;
        let counter = state.task_mut(task).first_counter().map(str::to_string);
        if let Some(counter) = counter {
            state.pulses.insert(counter, (frequency, duty));
        }
        Ok(())
    }

    fn create_ci_count_edges_chan(
        &self,
        task: TaskHandle,
        counter: &str,
        edge: Edge,
        initial_count: u32,
        direction: CountDirection,
    ) -> Result<()> {
        let mut state = self.state.lock();
        state.enter(MockOp::CreateCiCountEdgesChan, Some(task))?;
        state.task_mut(task).channels.push(MockChannel::EdgeCounter {
            counter: counter.to_string(),
            edge,
            initial_count,
            direction,
            terminal: None,
        });
        Ok(())
    }

    fn set_ci_count_edges_term(
        &self,
        task: TaskHandle,
        counter: &str,
        terminal: &str,
    ) -> Result<()> {
        let mut state = self.state.lock();
        state.enter(MockOp::SetCiCountEdgesTerm, Some(task))?;
        for channel in state.task_mut(task).channels.iter_mut() {
            if let MockChannel::EdgeCounter {
                counter: c,
                terminal: t,
                ..
            } = channel
            {
                if c == counter {
                    *t = Some(terminal.to_string());
                }
            }
        }
        Ok(())
    }

    fn read_counter_scalar_u32(&self, task: TaskHandle, _timeout: Duration) -> Result<u32> {
        let mut state = self.state.lock();
        state.enter(MockOp::ReadCounterScalarU32, Some(task))?;
        let counter = state.task_mut(task).first_counter().map(str::to_string);
        Ok(counter
            .and_then(|c| state.counts.get(&c).copied())
            .unwrap_or(0))
    }

    fn create_do_chan(&self, task: TaskHandle, lines: &str, grouping: LineGrouping) -> Result<()> {
        let mut state = self.state.lock();
        state.enter(MockOp::CreateDoChan, Some(task))?;
        state.task_mut(task).channels.push(MockChannel::DigitalOutput {
            lines: lines.to_string(),
            grouping,
        });
        Ok(())
    }

    fn write_digital_lines(
        &self,
        task: TaskHandle,
        data: &[u8],
        _timeout: Duration,
    ) -> Result<usize> {
        let mut state = self.state.lock();
        state.enter(MockOp::WriteDigitalLines, Some(task))?;
        let lines = state.task_mut(task).channels.iter().find_map(|c| match c {
            MockChannel::DigitalOutput { lines, .. } => Some(lines.clone()),
            _ => None,
        });
        match (lines, data.first()) {
            (Some(lines), Some(value)) => {
                state.digital_lines.insert(lines, *value);
                Ok(1)
            }
            _ => Ok(0),
        }
    }

    fn extended_error_info(&self) -> String {
        self.state.lock().last_error.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_handles_are_unique() {
        let mock = MockDriver::new();
        let a = mock.create_task().unwrap();
        let b = mock.create_task().unwrap();
        assert_ne!(a, b);
        assert_eq!(mock.live_tasks(), 2);
    }

    #[test]
    fn test_unknown_task_is_rejected() {
        let mock = MockDriver::new();
        let err = mock.start_task(TaskHandle::from_raw(42)).unwrap_err();
        assert!(matches!(
            err,
            DaqmxError::Driver {
                code: INVALID_TASK_CODE,
                ..
            }
        ));
        assert!(mock.extended_error_info().contains("DAQmxStartTask"));
    }

    #[test]
    fn test_fail_always_persists_until_cleared() {
        let mock = MockDriver::new();
        mock.fail_always(MockOp::CreateTask);
        assert!(mock.create_task().is_err());
        assert!(mock.create_task().is_err());
        mock.clear_failures();
        assert!(mock.create_task().is_ok());
    }

    #[test]
    fn test_read_groups_by_channel() {
        let mock = MockDriver::new();
        mock.set_signal("Dev1/ai0", MockSignal::Samples(vec![1.0, 2.0]));
        mock.set_voltage("Dev1/ai1", 5.0);

        let task = mock.create_task().unwrap();
        for physical in ["Dev1/ai0", "Dev1/ai1"] {
            mock.create_ai_voltage_chan(task, physical, TerminalConfig::Default, VoltageRange::default())
                .unwrap();
        }
        mock.cfg_samp_clk_timing(task, &SampleClock::finite(10.0, 3))
            .unwrap();

        let mut buffer = vec![0.0; 6];
        let read = mock
            .read_analog_f64(task, Duration::from_secs(1), &mut buffer)
            .unwrap();

        assert_eq!(read, 3);
        assert_eq!(buffer, vec![1.0, 2.0, 1.0, 5.0, 5.0, 5.0]);
    }

    #[test]
    fn test_withheld_samples_shorten_reads() {
        let mock = MockDriver::new();
        let task = mock.create_task().unwrap();
        mock.create_ai_voltage_chan(task, "Dev1/ai0", TerminalConfig::Default, VoltageRange::default())
            .unwrap();
        mock.cfg_samp_clk_timing(task, &SampleClock::finite(10.0, 5))
            .unwrap();
        mock.withhold_samples(1);

        let mut buffer = vec![0.0; 5];
        let read = mock
            .read_analog_f64(task, Duration::from_secs(1), &mut buffer)
            .unwrap();
        assert_eq!(read, 4);
    }
}
