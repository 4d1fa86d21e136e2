//! Reduction of raw acquisition blocks to one value per channel.

use crate::error::{DaqmxError, Result};

/// Averages a group-by-channel acquisition buffer.
///
/// The buffer holds `samples_per_channel` consecutive samples for channel 0,
/// then the same number for channel 1, and so on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AveragingSampler {
    samples_per_channel: usize,
}

impl AveragingSampler {
    /// Create a sampler for blocks of `samples_per_channel` samples.
    pub fn new(samples_per_channel: usize) -> Self {
        Self {
            samples_per_channel,
        }
    }

    /// Samples expected per channel block.
    pub fn samples_per_channel(&self) -> usize {
        self.samples_per_channel
    }

    /// Average each channel block of `buffer`, returning one mean per channel.
    pub fn reduce(&self, buffer: &[f64], channels: usize) -> Result<Vec<f64>> {
        let needed = self.samples_per_channel * channels;
        if self.samples_per_channel == 0 || buffer.len() < needed {
            return Err(DaqmxError::SampleCountMismatch {
                expected: self.samples_per_channel,
                actual: buffer.len().checked_div(channels).unwrap_or(0),
            });
        }

        Ok(buffer[..needed]
            .chunks_exact(self.samples_per_channel)
            .map(mean)
            .collect())
    }
}

/// Arithmetic mean of a non-empty block.
pub fn mean(block: &[f64]) -> f64 {
    block.iter().sum::<f64>() / block.len() as f64
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reduce_per_channel_blocks() {
        let sampler = AveragingSampler::new(3);
        let buffer = [1.0, 2.0, 3.0, 10.0, 10.0, 10.0];
        assert_eq!(sampler.reduce(&buffer, 2).unwrap(), vec![2.0, 10.0]);
    }

    #[test]
    fn test_reduce_rejects_short_buffer() {
        let sampler = AveragingSampler::new(4);
        let err = sampler.reduce(&[1.0; 7], 2).unwrap_err();
        assert!(err.is_count_mismatch());
    }

    #[test]
    fn test_single_sample_is_identity() {
        let sampler = AveragingSampler::new(1);
        assert_eq!(sampler.reduce(&[0.25, -1.5], 2).unwrap(), vec![0.25, -1.5]);
    }
}
