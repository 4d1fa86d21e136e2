//! NI-DAQmx backed [`DaqmxDriver`].
//!
//! Every call checks the returned status. Negative codes fetch the extended
//! error text and become [`DaqmxError::Driver`]; positive codes are driver
//! warnings and are logged.

#![allow(unsafe_code)]

use std::ffi::CString;
use std::os::raw::c_char;
use std::ptr;
use std::time::Duration;

use tracing::{error, warn};

use crate::driver::{
    CountDirection, DaqmxDriver, Edge, LineGrouping, PulseSpec, SampleClock, SampleMode,
    TaskHandle, TerminalConfig, VoltageRange,
};
use crate::error::{DaqmxError, Result};

/// Size of the buffer receiving extended error text.
const ERROR_BUFFER_LEN: usize = 2048;

/// Driver talking to the installed NI-DAQmx runtime.
#[derive(Debug, Default)]
pub struct NiDaqmx {
    _private: (),
}

impl NiDaqmx {
    /// Driver backed by the linked NI-DAQmx library.
    pub fn new() -> Self {
        Self::default()
    }

    fn check(&self, operation: &'static str, status: i32) -> Result<()> {
        if daqmx_sys::failed(status) {
            let message = self.extended_error_info();
            error!(operation, status, message = %message, "DAQmx call failed");
            return Err(DaqmxError::driver(operation, status, message));
        }
        if status > 0 {
            warn!(operation, status, "DAQmx call returned a warning");
        }
        Ok(())
    }
}

fn raw(task: TaskHandle) -> daqmx_sys::TaskHandle {
    task.as_raw() as daqmx_sys::TaskHandle
}

fn c_string(value: &str) -> Result<CString> {
    CString::new(value).map_err(|_| DaqmxError::InvalidAddress {
        message: format!("'{}' contains a NUL byte", value.escape_debug()),
    })
}

fn seconds(timeout: Duration) -> f64 {
    timeout.as_secs_f64()
}

const EMPTY: *const c_char = c"".as_ptr();

impl DaqmxDriver for NiDaqmx {
    fn create_task(&self) -> Result<TaskHandle> {
        let mut handle: daqmx_sys::TaskHandle = ptr::null_mut();
        // SAFETY: EMPTY is a valid NUL-terminated string and handle is a valid out pointer
        let status = unsafe { daqmx_sys::DAQmxCreateTask(EMPTY, &mut handle) };
        self.check("DAQmxCreateTask", status)?;
        Ok(TaskHandle::from_raw(handle as usize))
    }

    fn start_task(&self, task: TaskHandle) -> Result<()> {
        // SAFETY: task was returned by DAQmxCreateTask and not yet cleared
        let status = unsafe { daqmx_sys::DAQmxStartTask(raw(task)) };
        self.check("DAQmxStartTask", status)
    }

    fn stop_task(&self, task: TaskHandle) -> Result<()> {
        // SAFETY: task was returned by DAQmxCreateTask and not yet cleared
        let status = unsafe { daqmx_sys::DAQmxStopTask(raw(task)) };
        self.check("DAQmxStopTask", status)
    }

    fn clear_task(&self, task: TaskHandle) -> Result<()> {
        // SAFETY: task was returned by DAQmxCreateTask; Task never clears twice
        let status = unsafe { daqmx_sys::DAQmxClearTask(raw(task)) };
        self.check("DAQmxClearTask", status)
    }

    fn create_ai_voltage_chan(
        &self,
        task: TaskHandle,
        physical_channel: &str,
        terminal: TerminalConfig,
        range: VoltageRange,
    ) -> Result<()> {
        let physical = c_string(physical_channel)?;
        // SAFETY: all strings outlive the call
        let status = unsafe {
            daqmx_sys::DAQmxCreateAIVoltageChan(
                raw(task),
                physical.as_ptr(),
                EMPTY,
                terminal.to_raw(),
                range.min,
                range.max,
                daqmx_sys::DAQmx_Val_Volts,
                ptr::null(),
            )
        };
        self.check("DAQmxCreateAIVoltageChan", status)
    }

    fn cfg_samp_clk_timing(&self, task: TaskHandle, clock: &SampleClock) -> Result<()> {
        // SAFETY: EMPTY selects the onboard clock
        let status = unsafe {
            daqmx_sys::DAQmxCfgSampClkTiming(
                raw(task),
                EMPTY,
                clock.rate,
                clock.active_edge.to_raw(),
                clock.mode.to_raw(),
                clock.samples_per_channel,
            )
        };
        self.check("DAQmxCfgSampClkTiming", status)
    }

    fn read_analog_f64(
        &self,
        task: TaskHandle,
        timeout: Duration,
        buffer: &mut [f64],
    ) -> Result<usize> {
        let mut read: i32 = 0;
        let len = u32::try_from(buffer.len()).map_err(|_| DaqmxError::InvalidArgument {
            index: 0,
            message: format!("read buffer of {} samples is too large", buffer.len()),
        })?;
        // SAFETY: buffer is valid for len samples and read is a valid out pointer
        let status = unsafe {
            daqmx_sys::DAQmxReadAnalogF64(
                raw(task),
                daqmx_sys::DAQmx_Val_Auto,
                seconds(timeout),
                daqmx_sys::DAQmx_Val_GroupByChannel,
                buffer.as_mut_ptr(),
                len,
                &mut read,
                ptr::null_mut(),
            )
        };
        self.check("DAQmxReadAnalogF64", status)?;
        Ok(usize::try_from(read).unwrap_or(0))
    }

    fn create_ao_voltage_chan(
        &self,
        task: TaskHandle,
        physical_channel: &str,
        range: VoltageRange,
    ) -> Result<()> {
        let physical = c_string(physical_channel)?;
        // SAFETY: all strings outlive the call
        let status = unsafe {
            daqmx_sys::DAQmxCreateAOVoltageChan(
                raw(task),
                physical.as_ptr(),
                EMPTY,
                range.min,
                range.max,
                daqmx_sys::DAQmx_Val_Volts,
                ptr::null(),
            )
        };
        self.check("DAQmxCreateAOVoltageChan", status)
    }

    fn write_analog_scalar_f64(
        &self,
        task: TaskHandle,
        value: f64,
        timeout: Duration,
    ) -> Result<()> {
        // SAFETY: plain values only
        let status = unsafe {
            daqmx_sys::DAQmxWriteAnalogScalarF64(
                raw(task),
                0,
                seconds(timeout),
                value,
                ptr::null_mut(),
            )
        };
        self.check("DAQmxWriteAnalogScalarF64", status)
    }

    fn create_co_pulse_chan_freq(
        &self,
        task: TaskHandle,
        counter: &str,
        pulse: &PulseSpec,
    ) -> Result<()> {
        let counter = c_string(counter)?;
        // SAFETY: all strings outlive the call
        let status = unsafe {
            daqmx_sys::DAQmxCreateCOPulseChanFreq(
                raw(task),
                counter.as_ptr(),
                EMPTY,
                daqmx_sys::DAQmx_Val_Hz,
                pulse.idle.to_raw(),
                pulse.initial_delay,
                pulse.frequency,
                pulse.duty,
            )
        };
        self.check("DAQmxCreateCOPulseChanFreq", status)
    }

    fn cfg_implicit_timing(
        &self,
        task: TaskHandle,
        mode: SampleMode,
        samples_per_channel: u64,
    ) -> Result<()> {
        // SAFETY: plain values only
        let status = unsafe {
            daqmx_sys::DAQmxCfgImplicitTiming(raw(task), mode.to_raw(), samples_per_channel)
        };
        self.check("DAQmxCfgImplicitTiming", status)
    }

    fn write_ctr_freq(
        &self,
        task: TaskHandle,
        frequency: f64,
        duty: f64,
        timeout: Duration,
    ) -> Result<()> {
        let mut written: i32 = 0;
        // SAFETY: one sample per channel is read from each single-element pointer
        let status = unsafe {
            daqmx_sys::DAQmxWriteCtrFreq(
                raw(task),
                1,
                0,
                seconds(timeout),
                daqmx_sys::DAQmx_Val_GroupByChannel,
                &frequency,
                &duty,
                &mut written,
                ptr::null_mut(),
            )
        };
        self.check("DAQmxWriteCtrFreq", status)
    }

    fn create_ci_count_edges_chan(
        &self,
        task: TaskHandle,
        counter: &str,
        edge: Edge,
        initial_count: u32,
        direction: CountDirection,
    ) -> Result<()> {
        let counter = c_string(counter)?;
        // SAFETY: all strings outlive the call
        let status = unsafe {
            daqmx_sys::DAQmxCreateCICountEdgesChan(
                raw(task),
                counter.as_ptr(),
                EMPTY,
                edge.to_raw(),
                initial_count,
                direction.to_raw(),
            )
        };
        self.check("DAQmxCreateCICountEdgesChan", status)
    }

    fn set_ci_count_edges_term(
        &self,
        task: TaskHandle,
        counter: &str,
        terminal: &str,
    ) -> Result<()> {
        let counter = c_string(counter)?;
        let terminal = c_string(terminal)?;
        // SAFETY: all strings outlive the call
        let status = unsafe {
            daqmx_sys::DAQmxSetCICountEdgesTerm(raw(task), counter.as_ptr(), terminal.as_ptr())
        };
        self.check("DAQmxSetCICountEdgesTerm", status)
    }

    fn read_counter_scalar_u32(&self, task: TaskHandle, timeout: Duration) -> Result<u32> {
        let mut value: u32 = 0;
        // SAFETY: value is a valid out pointer
        let status = unsafe {
            daqmx_sys::DAQmxReadCounterScalarU32(
                raw(task),
                seconds(timeout),
                &mut value,
                ptr::null_mut(),
            )
        };
        self.check("DAQmxReadCounterScalarU32", status)?;
        Ok(value)
    }

    fn create_do_chan(&self, task: TaskHandle, lines: &str, grouping: LineGrouping) -> Result<()> {
        let lines = c_string(lines)?;
        // SAFETY: all strings outlive the call
        let status = unsafe {
            daqmx_sys::DAQmxCreateDOChan(raw(task), lines.as_ptr(), EMPTY, grouping.to_raw())
        };
        self.check("DAQmxCreateDOChan", status)
    }

    fn write_digital_lines(
        &self,
        task: TaskHandle,
        data: &[u8],
        timeout: Duration,
    ) -> Result<usize> {
        let mut written: i32 = 0;
        // SAFETY: one sample per line is read from data, which the caller sized per line
        let status = unsafe {
            daqmx_sys::DAQmxWriteDigitalLines(
                raw(task),
                1,
                1,
                seconds(timeout),
                daqmx_sys::DAQmx_Val_GroupByChannel,
                data.as_ptr(),
                &mut written,
                ptr::null_mut(),
            )
        };
        self.check("DAQmxWriteDigitalLines", status)?;
        Ok(usize::try_from(written).unwrap_or(0))
    }

    fn extended_error_info(&self) -> String {
        let mut buffer = vec![0u8; ERROR_BUFFER_LEN];
        // SAFETY: buffer is writable for ERROR_BUFFER_LEN bytes
        let status = unsafe {
            daqmx_sys::DAQmxGetExtendedErrorInfo(
                buffer.as_mut_ptr() as *mut c_char,
                ERROR_BUFFER_LEN as u32,
            )
        };
        if daqmx_sys::failed(status) {
            return format!("extended error info unavailable (status {})", status);
        }
        let end = buffer.iter().position(|b| *b == 0).unwrap_or(buffer.len());
        String::from_utf8_lossy(&buffer[..end]).into_owned()
    }
}
