//! Physical channel address composition.
//!
//! NI-DAQmx names physical resources with slash-separated paths such as
//! `Dev1/ai0`, `Dev1/ctr0` or `Dev1/port0/line1`. [`PhysicalAddress`] builds
//! these from a device resource name and any number of segments.

use std::fmt;

use crate::error::{DaqmxError, Result};

/// Longest address the driver accepts, in bytes.
pub const MAX_ADDRESS_LEN: usize = 255;

/// A validated physical channel address.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PhysicalAddress(String);

impl PhysicalAddress {
    /// Start an address at the device resource name.
    pub fn device(name: &str) -> Result<Self> {
        check_segment(name)?;
        let address = Self(name.to_string());
        address.check_len()?;
        Ok(address)
    }

    /// Append one `/segment`.
    pub fn push(mut self, segment: &str) -> Result<Self> {
        check_segment(segment)?;
        self.0.push('/');
        self.0.push_str(segment);
        self.check_len()?;
        Ok(self)
    }

    /// Get the address as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Consume the address, returning the string.
    pub fn into_string(self) -> String {
        self.0
    }

    fn check_len(&self) -> Result<()> {
        if self.0.len() > MAX_ADDRESS_LEN {
            return Err(DaqmxError::InvalidAddress {
                message: format!(
                    "{} bytes exceeds the {} byte limit",
                    self.0.len(),
                    MAX_ADDRESS_LEN
                ),
            });
        }
        Ok(())
    }
}

impl fmt::Display for PhysicalAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for PhysicalAddress {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

fn check_segment(segment: &str) -> Result<()> {
    if segment.is_empty() {
        return Err(DaqmxError::InvalidAddress {
            message: "empty address segment".to_string(),
        });
    }
    Ok(())
}

/// Compose `device/seg1/seg2/...`.
///
/// ```
/// use daq_driver_daqmx::address::compose;
///
/// assert_eq!(compose("Dev1", &["port0", "line1"]).unwrap(), "Dev1/port0/line1");
/// ```
pub fn compose(device: &str, segments: &[&str]) -> Result<String> {
    segments
        .iter()
        .try_fold(PhysicalAddress::device(device)?, |address, segment| {
            address.push(segment)
        })
        .map(PhysicalAddress::into_string)
}
