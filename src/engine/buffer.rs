//! Sample Buffer Management
//!
//! Channel-major float sample storage produced by offline renders and
//! consumed by the WAV encoder.

use crate::error::{BinauralError, Result};

// ============================================================================
// Sample Buffer
// ============================================================================

/// Rendered audio, one `Vec<f32>` per channel
#[derive(Debug, Clone, PartialEq)]
pub struct SampleBuffer {
    /// `samples[channel][frame]`
    pub samples: Vec<Vec<f32>>,
    sample_rate: u32,
}

impl SampleBuffer {
    /// Create a silent buffer
    ///
    /// # Errors
    /// * `RenderFailed` - the allocation could not be satisfied
    pub fn silent(num_channels: usize, num_frames: usize, sample_rate: u32) -> Result<Self> {
        let mut samples = Vec::with_capacity(num_channels);
        for _ in 0..num_channels {
            let mut channel = Vec::new();
            channel
                .try_reserve_exact(num_frames)
                .map_err(|e| BinauralError::RenderFailed {
                    reason: format!("cannot allocate {} frames: {}", num_frames, e),
                })?;
            channel.resize(num_frames, 0.0);
            samples.push(channel);
        }
        Ok(Self {
            samples,
            sample_rate,
        })
    }

    /// Wrap existing channel data
    ///
    /// # Panics
    /// If the channels have different lengths.
    pub fn from_channels(samples: Vec<Vec<f32>>, sample_rate: u32) -> Self {
        if let Some(first) = samples.first() {
            assert!(
                samples.iter().all(|c| c.len() == first.len()),
                "all channels must have the same length"
            );
        }
        Self {
            samples,
            sample_rate,
        }
    }

    pub fn num_channels(&self) -> usize {
        self.samples.len()
    }

    pub fn num_frames(&self) -> usize {
        self.samples.first().map(Vec::len).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.num_frames() == 0
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub fn duration_secs(&self) -> f64 {
        self.num_frames() as f64 / self.sample_rate as f64
    }

    pub fn channel(&self, index: usize) -> &[f32] {
        &self.samples[index]
    }

    /// Append `other` after this buffer, channel by channel
    ///
    /// # Errors
    /// * `RenderFailed` - channel count or sample rate differ
    pub fn append(&mut self, other: &SampleBuffer) -> Result<()> {
        if self.samples.is_empty() {
            self.samples = vec![Vec::new(); other.num_channels()];
            self.sample_rate = other.sample_rate;
        }
        if other.num_channels() != self.num_channels() || other.sample_rate != self.sample_rate {
            return Err(BinauralError::RenderFailed {
                reason: format!(
                    "cannot join {}ch/{}Hz audio onto {}ch/{}Hz audio",
                    other.num_channels(),
                    other.sample_rate,
                    self.num_channels(),
                    self.sample_rate
                ),
            });
        }
        for (dst, src) in self.samples.iter_mut().zip(&other.samples) {
            dst.extend_from_slice(src);
        }
        Ok(())
    }
}
