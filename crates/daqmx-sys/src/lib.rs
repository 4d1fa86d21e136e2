//! Low-level FFI declarations for the NI-DAQmx C library.
//!
//! This crate declares the raw, unsafe entry points of the NI-DAQmx ANSI C
//! API that `daq-driver-daqmx` consumes, together with the `DAQmx_Val_*`
//! constants they take. Only the calls needed for analog input/output,
//! digital line output, edge counting and pulse generation are declared.
//!
//! # Safety
//!
//! All functions in this crate are `unsafe` as they are direct FFI
//! declarations. For a safe wrapper, use the `daq-driver-daqmx` crate.
//!
//! # Features
//!
//! - `daqmx-sdk`: Link against the installed NI-DAQmx runtime. Without this
//!   feature the declarations still compile, but calling any of them fails
//!   at link time.
//!
//! # Example (unsafe)
//!
//! ```ignore
//! use daqmx_sys::*;
//! use std::ptr;
//!
//! unsafe {
//!     let mut task: TaskHandle = ptr::null_mut();
//!     let status = DAQmxCreateTask(c"".as_ptr(), &mut task);
//!     if !failed(status) {
//!         DAQmxClearTask(task);
//!     }
//! }
//! ```

#![allow(non_upper_case_globals)]
#![allow(non_camel_case_types)]
#![allow(non_snake_case)]
#![allow(unsafe_code)]
#![allow(missing_docs)]

use std::os::raw::{c_char, c_void};

/// Opaque handle to a configured DAQmx task.
pub type TaskHandle = *mut c_void;

pub type int32 = i32;
pub type uInt8 = u8;
pub type uInt32 = u32;
pub type uInt64 = u64;
pub type float64 = f64;
pub type bool32 = u32;

// Sample counts and data layout
pub const DAQmx_Val_Auto: int32 = -1;
pub const DAQmx_Val_GroupByChannel: bool32 = 0;
pub const DAQmx_Val_GroupByScanNumber: bool32 = 1;

// Analog input terminal configuration
pub const DAQmx_Val_Cfg_Default: int32 = -1;
pub const DAQmx_Val_RSE: int32 = 10083;
pub const DAQmx_Val_NRSE: int32 = 10078;
pub const DAQmx_Val_Diff: int32 = 10106;
pub const DAQmx_Val_PseudoDiff: int32 = 12529;

// Units
pub const DAQmx_Val_Volts: int32 = 10348;
pub const DAQmx_Val_Hz: int32 = 10373;

// Edges and sample modes
pub const DAQmx_Val_Rising: int32 = 10280;
pub const DAQmx_Val_Falling: int32 = 10171;
pub const DAQmx_Val_FiniteSamps: int32 = 10178;
pub const DAQmx_Val_ContSamps: int32 = 10123;

// Output idle states
pub const DAQmx_Val_High: int32 = 10192;
pub const DAQmx_Val_Low: int32 = 10214;
pub const DAQmx_Val_Tristate: int32 = 10310;
pub const DAQmx_Val_NoChange: int32 = 10160;

// Counter directions
pub const DAQmx_Val_CountUp: int32 = 10128;
pub const DAQmx_Val_CountDown: int32 = 10124;
pub const DAQmx_Val_ExtControlled: int32 = 10326;

// Digital line grouping
pub const DAQmx_Val_ChanPerLine: int32 = 0;
pub const DAQmx_Val_ChanForAllLines: int32 = 1;

/// Equivalent of the `DAQmxFailed` macro: negative status codes are errors,
/// positive ones are warnings.
#[inline]
pub fn failed(status: int32) -> bool {
    status < 0
}

extern "system" {
    pub fn DAQmxCreateTask(taskName: *const c_char, taskHandle: *mut TaskHandle) -> int32;
    pub fn DAQmxStartTask(taskHandle: TaskHandle) -> int32;
    pub fn DAQmxStopTask(taskHandle: TaskHandle) -> int32;
    pub fn DAQmxClearTask(taskHandle: TaskHandle) -> int32;

    pub fn DAQmxCreateAIVoltageChan(
        taskHandle: TaskHandle,
        physicalChannel: *const c_char,
        nameToAssignToChannel: *const c_char,
        terminalConfig: int32,
        minVal: float64,
        maxVal: float64,
        units: int32,
        customScaleName: *const c_char,
    ) -> int32;

    pub fn DAQmxCfgSampClkTiming(
        taskHandle: TaskHandle,
        source: *const c_char,
        rate: float64,
        activeEdge: int32,
        sampleMode: int32,
        sampsPerChanToAcquire: uInt64,
    ) -> int32;

    pub fn DAQmxReadAnalogF64(
        taskHandle: TaskHandle,
        numSampsPerChan: int32,
        timeout: float64,
        fillMode: bool32,
        readArray: *mut float64,
        arraySizeInSamps: uInt32,
        sampsPerChanRead: *mut int32,
        reserved: *mut bool32,
    ) -> int32;

    pub fn DAQmxCreateAOVoltageChan(
        taskHandle: TaskHandle,
        physicalChannel: *const c_char,
        nameToAssignToChannel: *const c_char,
        minVal: float64,
        maxVal: float64,
        units: int32,
        customScaleName: *const c_char,
    ) -> int32;

    pub fn DAQmxWriteAnalogScalarF64(
        taskHandle: TaskHandle,
        autoStart: bool32,
        timeout: float64,
        value: float64,
        reserved: *mut bool32,
    ) -> int32;

    pub fn DAQmxCreateCOPulseChanFreq(
        taskHandle: TaskHandle,
        counter: *const c_char,
        nameToAssignToChannel: *const c_char,
        units: int32,
        idleState: int32,
        initialDelay: float64,
        freq: float64,
        dutyCycle: float64,
    ) -> int32;

    pub fn DAQmxCfgImplicitTiming(
        taskHandle: TaskHandle,
        sampleMode: int32,
        sampsPerChan: uInt64,
    ) -> int32;

    pub fn DAQmxWriteCtrFreq(
        taskHandle: TaskHandle,
        numSampsPerChan: int32,
        autoStart: bool32,
        timeout: float64,
        dataLayout: bool32,
        frequency: *const float64,
        dutyCycle: *const float64,
        numSampsPerChanWritten: *mut int32,
        reserved: *mut bool32,
    ) -> int32;

    pub fn DAQmxCreateCICountEdgesChan(
        taskHandle: TaskHandle,
        counter: *const c_char,
        nameToAssignToChannel: *const c_char,
        edge: int32,
        initialCount: uInt32,
        countDirection: int32,
    ) -> int32;

    pub fn DAQmxSetCICountEdgesTerm(
        taskHandle: TaskHandle,
        channel: *const c_char,
        data: *const c_char,
    ) -> int32;

    pub fn DAQmxReadCounterScalarU32(
        taskHandle: TaskHandle,
        timeout: float64,
        value: *mut uInt32,
        reserved: *mut bool32,
    ) -> int32;

    pub fn DAQmxCreateDOChan(
        taskHandle: TaskHandle,
        lines: *const c_char,
        nameToAssignToLines: *const c_char,
        lineGrouping: int32,
    ) -> int32;

    pub fn DAQmxWriteDigitalLines(
        taskHandle: TaskHandle,
        numSampsPerChan: int32,
        autoStart: bool32,
        timeout: float64,
        dataLayout: bool32,
        writeArray: *const uInt8,
        sampsPerChanWritten: *mut int32,
        reserved: *mut bool32,
    ) -> int32;

    pub fn DAQmxGetExtendedErrorInfo(errorString: *mut c_char, bufferSize: uInt32) -> int32;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_terminal_constants() {
        assert_eq!(DAQmx_Val_Cfg_Default, -1);
        assert_eq!(DAQmx_Val_RSE, 10083);
        assert_eq!(DAQmx_Val_NRSE, 10078);
        assert_eq!(DAQmx_Val_Diff, 10106);
        assert_eq!(DAQmx_Val_PseudoDiff, 12529);
    }

    #[test]
    fn test_failed_status() {
        assert!(failed(-200279));
        assert!(!failed(0));
        // Positive codes are warnings, not failures
        assert!(!failed(200015));
    }
}
