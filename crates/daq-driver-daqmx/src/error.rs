//! Error types for DAQmx channel operations.
//!
//! Every failure the channel layer can observe is a [`DaqmxError`]. The
//! command host logs these and keeps running; the typed API returns them so
//! callers and tests can inspect what went wrong.

use thiserror::Error;

/// Result type alias for DAQmx channel operations.
pub type Result<T> = std::result::Result<T, DaqmxError>;

/// Errors that can occur when driving DAQmx tasks through logical channels.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum DaqmxError {
    /// A driver call reported a negative status code.
    #[error("DAQmx {operation} failed ({code}): {message}")]
    Driver {
        /// Name of the driver call that failed
        operation: &'static str,
        /// Status code returned by the driver
        code: i32,
        /// Extended error text reported by the driver
        message: String,
    },

    /// A setup referenced a device channel that is not registered.
    #[error("No NI device channel: {reference}")]
    DeviceNotFound {
        /// Name or id as given in the command
        reference: String,
    },

    /// A command named a channel that does not exist.
    #[error("Unknown channel '{name}'")]
    UnknownChannel {
        /// Name as given in the command
        name: String,
    },

    /// A create command named a channel class that does not exist.
    #[error("Unknown channel class '{name}'")]
    UnknownClass {
        /// Class as given in the command
        name: String,
    },

    /// A create command reused an existing channel name.
    #[error("Channel '{name}' already exists")]
    DuplicateChannel {
        /// Name already in use
        name: String,
    },

    /// An acquisition returned a different number of samples than configured.
    #[error("Wrong amount of samples read: expected {expected} per channel, got {actual}")]
    SampleCountMismatch {
        /// Configured samples per channel
        expected: usize,
        /// Samples per channel the driver returned
        actual: usize,
    },

    /// An acquisition was requested before any analog input was attached.
    #[error("Device '{device}' has no analog input channels attached")]
    NoChannelsAttached {
        /// Device channel name
        device: String,
    },

    /// The device cannot host another analog input channel.
    #[error("Device '{device}' is full: capacity is {capacity} analog input channels")]
    CapacityExceeded {
        /// Device channel name
        device: String,
        /// Maximum number of analog inputs
        capacity: usize,
    },

    /// A physical channel address could not be built.
    #[error("Invalid physical channel address: {message}")]
    InvalidAddress {
        /// What was wrong with the address
        message: String,
    },

    /// The channel has no live task; setup has not succeeded yet.
    #[error("{kind} channel is not configured")]
    NotConfigured {
        /// Channel class, e.g. `niao`
        kind: &'static str,
    },

    /// A command argument could not be converted to the expected type.
    #[error("Invalid argument {index}: {message}")]
    InvalidArgument {
        /// Zero-based position of the argument
        index: usize,
        /// What was expected
        message: String,
    },

    /// A command line could not be parsed.
    #[error("Invalid command: {message}")]
    InvalidCommand {
        /// Parse failure description
        message: String,
    },

    /// Configuration loading or validation failed.
    #[error("Configuration error: {message}")]
    Config {
        /// Loader or validation message
        message: String,
    },
}

impl DaqmxError {
    /// Build a driver error for `operation` from a status code and the
    /// driver's extended error text.
    pub fn driver(operation: &'static str, code: i32, message: impl Into<String>) -> Self {
        Self::Driver {
            operation,
            code,
            message: message.into(),
        }
    }

    /// Check if this error was reported by the hardware driver.
    pub fn is_hardware(&self) -> bool {
        matches!(self, Self::Driver { .. })
    }

    /// Check if this is an unresolved device or channel reference.
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            Self::DeviceNotFound { .. } | Self::UnknownChannel { .. } | Self::UnknownClass { .. }
        )
    }

    /// Check if this is an acquisition sample-count mismatch.
    pub fn is_count_mismatch(&self) -> bool {
        matches!(self, Self::SampleCountMismatch { .. })
    }
}

impl From<figment::Error> for DaqmxError {
    fn from(err: figment::Error) -> Self {
        Self::Config {
            message: err.to_string(),
        }
    }
}
