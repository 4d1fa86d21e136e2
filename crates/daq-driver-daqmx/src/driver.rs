//! The vendor driver call contract.
//!
//! [`DaqmxDriver`] is the seam between the channel layer and NI-DAQmx. The
//! real implementation ([`crate::ffi::NiDaqmx`], `hardware` feature) forwards
//! each method to the C library; [`crate::mock::MockDriver`] keeps everything
//! in memory for tests and dry runs.
//!
//! Every call is blocking. Calls that can wait on hardware take an explicit
//! timeout. A negative driver status surfaces as [`DaqmxError::Driver`]
//! carrying the driver's extended error text.
//!
//! [`DaqmxError::Driver`]: crate::error::DaqmxError::Driver

use std::fmt;
use std::time::Duration;

use crate::error::Result;

/// Opaque handle to a driver task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TaskHandle(usize);

impl TaskHandle {
    /// Wrap a raw driver handle value.
    pub fn from_raw(raw: usize) -> Self {
        Self(raw)
    }

    /// Get the raw driver handle value.
    pub fn as_raw(self) -> usize {
        self.0
    }
}

impl fmt::Display for TaskHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#x}", self.0)
    }
}

/// Analog input wiring mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TerminalConfig {
    /// Let the driver pick the device default
    #[default]
    Default,
    /// Referenced single-ended
    Rse,
    /// Non-referenced single-ended
    Nrse,
    /// Differential
    Diff,
    /// Pseudo-differential
    PseudoDiff,
}

impl TerminalConfig {
    /// Parse the command-surface spelling (`RSE`, `NRSE`, `Diff`, `PseudoDiff`).
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "RSE" => Some(Self::Rse),
            "NRSE" => Some(Self::Nrse),
            "Diff" => Some(Self::Diff),
            "PseudoDiff" => Some(Self::PseudoDiff),
            _ => None,
        }
    }

    /// Convert to the raw `DAQmx_Val_*` value.
    pub fn to_raw(self) -> i32 {
        match self {
            Self::Default => daqmx_sys::DAQmx_Val_Cfg_Default,
            Self::Rse => daqmx_sys::DAQmx_Val_RSE,
            Self::Nrse => daqmx_sys::DAQmx_Val_NRSE,
            Self::Diff => daqmx_sys::DAQmx_Val_Diff,
            Self::PseudoDiff => daqmx_sys::DAQmx_Val_PseudoDiff,
        }
    }
}

/// Voltage range of an analog channel.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VoltageRange {
    /// Minimum voltage
    pub min: f64,
    /// Maximum voltage
    pub max: f64,
}

impl Default for VoltageRange {
    fn default() -> Self {
        Self {
            min: -10.0,
            max: 10.0,
        }
    }
}

impl VoltageRange {
    /// Create a new range.
    pub fn new(min: f64, max: f64) -> Self {
        Self { min, max }
    }
}

/// Signal edge.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Edge {
    /// Low to high
    Rising,
    /// High to low
    Falling,
}

impl Edge {
    /// Convert to the raw `DAQmx_Val_*` value.
    pub fn to_raw(self) -> i32 {
        match self {
            Self::Rising => daqmx_sys::DAQmx_Val_Rising,
            Self::Falling => daqmx_sys::DAQmx_Val_Falling,
        }
    }
}

/// Timing mode of a task.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SampleMode {
    /// Acquire or generate a fixed number of samples, then stop
    Finite,
    /// Run until the task is stopped
    Continuous,
}

impl SampleMode {
    /// Convert to the raw `DAQmx_Val_*` value.
    pub fn to_raw(self) -> i32 {
        match self {
            Self::Finite => daqmx_sys::DAQmx_Val_FiniteSamps,
            Self::Continuous => daqmx_sys::DAQmx_Val_ContSamps,
        }
    }
}

/// Sample clock configuration for a hardware-timed task.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SampleClock {
    /// Sampling rate in Hz
    pub rate: f64,
    /// Edge of the clock on which samples are taken
    pub active_edge: Edge,
    /// Finite or continuous acquisition
    pub mode: SampleMode,
    /// Samples to acquire per channel (buffer size in continuous mode)
    pub samples_per_channel: u64,
}

impl SampleClock {
    /// Finite acquisition on the rising edge of the onboard clock.
    pub fn finite(rate: f64, samples_per_channel: u64) -> Self {
        Self {
            rate,
            active_edge: Edge::Rising,
            mode: SampleMode::Finite,
            samples_per_channel,
        }
    }
}

/// Resting level of a counter output between pulses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum IdleState {
    /// Output sits low between pulses
    #[default]
    Low,
    /// Output sits high between pulses
    High,
}

impl IdleState {
    /// Convert to the raw `DAQmx_Val_*` value.
    pub fn to_raw(self) -> i32 {
        match self {
            Self::Low => daqmx_sys::DAQmx_Val_Low,
            Self::High => daqmx_sys::DAQmx_Val_High,
        }
    }
}

/// Pulse train definition for a counter output channel.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PulseSpec {
    /// Pulse frequency in Hz
    pub frequency: f64,
    /// Fraction of the period spent in the active state
    pub duty: f64,
    /// Output level between pulses
    pub idle: IdleState,
    /// Delay before the first pulse, in seconds
    pub initial_delay: f64,
}

/// Counting direction of an edge counter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CountDirection {
    /// Increment on each edge
    Up,
    /// Decrement on each edge
    Down,
}

impl CountDirection {
    /// Convert to the raw `DAQmx_Val_*` value.
    pub fn to_raw(self) -> i32 {
        match self {
            Self::Up => daqmx_sys::DAQmx_Val_CountUp,
            Self::Down => daqmx_sys::DAQmx_Val_CountDown,
        }
    }
}

/// How digital lines are grouped into virtual channels.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineGrouping {
    /// One virtual channel per line
    ChanPerLine,
    /// One virtual channel for all lines
    ChanForAllLines,
}

impl LineGrouping {
    /// Convert to the raw `DAQmx_Val_*` value.
    pub fn to_raw(self) -> i32 {
        match self {
            Self::ChanPerLine => daqmx_sys::DAQmx_Val_ChanPerLine,
            Self::ChanForAllLines => daqmx_sys::DAQmx_Val_ChanForAllLines,
        }
    }
}

/// Blocking call contract of the vendor DAQ driver.
///
/// Implementations must be shareable between the device registry and every
/// channel that owns a private task, hence `Send + Sync`.
pub trait DaqmxDriver: Send + Sync {
    /// Create an empty, unnamed task.
    fn create_task(&self) -> Result<TaskHandle>;

    /// Start (arm) a task.
    fn start_task(&self, task: TaskHandle) -> Result<()>;

    /// Stop a running task. Stopping an idle task succeeds.
    fn stop_task(&self, task: TaskHandle) -> Result<()>;

    /// Release a task and every channel in it.
    fn clear_task(&self, task: TaskHandle) -> Result<()>;

    /// Append one analog voltage input channel to a task.
    fn create_ai_voltage_chan(
        &self,
        task: TaskHandle,
        physical_channel: &str,
        terminal: TerminalConfig,
        range: VoltageRange,
    ) -> Result<()>;

    /// Configure the onboard sample clock of a task.
    fn cfg_samp_clk_timing(&self, task: TaskHandle, clock: &SampleClock) -> Result<()>;

    /// Read all available samples of every channel, grouped by channel, into
    /// `buffer`. Returns the number of samples read per channel.
    fn read_analog_f64(&self, task: TaskHandle, timeout: Duration, buffer: &mut [f64])
        -> Result<usize>;

    /// Append one analog voltage output channel to a task.
    fn create_ao_voltage_chan(
        &self,
        task: TaskHandle,
        physical_channel: &str,
        range: VoltageRange,
    ) -> Result<()>;

    /// Write a single value to an analog output task.
    fn write_analog_scalar_f64(&self, task: TaskHandle, value: f64, timeout: Duration)
        -> Result<()>;

    /// Append a frequency-defined pulse output channel to a task.
    fn create_co_pulse_chan_freq(
        &self,
        task: TaskHandle,
        counter: &str,
        pulse: &PulseSpec,
    ) -> Result<()>;

    /// Configure implicit (pulse-paced) timing.
    fn cfg_implicit_timing(
        &self,
        task: TaskHandle,
        mode: SampleMode,
        samples_per_channel: u64,
    ) -> Result<()>;

    /// Rewrite the frequency and duty cycle of a running pulse output.
    fn write_ctr_freq(
        &self,
        task: TaskHandle,
        frequency: f64,
        duty: f64,
        timeout: Duration,
    ) -> Result<()>;

    /// Append an edge-counting input channel to a task.
    fn create_ci_count_edges_chan(
        &self,
        task: TaskHandle,
        counter: &str,
        edge: Edge,
        initial_count: u32,
        direction: CountDirection,
    ) -> Result<()>;

    /// Override the input terminal an edge counter listens on.
    fn set_ci_count_edges_term(&self, task: TaskHandle, counter: &str, terminal: &str)
        -> Result<()>;

    /// Read the current count of an edge-counting task.
    fn read_counter_scalar_u32(&self, task: TaskHandle, timeout: Duration) -> Result<u32>;

    /// Append a digital output channel over `lines` to a task.
    fn create_do_chan(&self, task: TaskHandle, lines: &str, grouping: LineGrouping)
        -> Result<()>;

    /// Write one sample per line. Returns samples written per channel.
    fn write_digital_lines(&self, task: TaskHandle, data: &[u8], timeout: Duration)
        -> Result<usize>;

    /// Extended diagnostic text for the most recent failed call.
    fn extended_error_info(&self) -> String;
}
