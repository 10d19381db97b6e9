//! Session configuration
//!
//! All timing constants of the engine live here so live playback and offline
//! export read the same values. Every field has a default, so a partial JSON
//! file only needs to name what it overrides.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{BinauralError, Result};

/// Output sample rate (44.1kHz)
pub const DEFAULT_SAMPLE_RATE: u32 = 44_100;

/// Carrier tone the binaural offset is centred on
pub const DEFAULT_BASE_TONE_HZ: f64 = 432.0;

/// Three hours of stereo 16-bit audio at 44.1kHz (~1.9 GB), under the 2 GiB file limit
pub const DEFAULT_MAX_FRAMES_PER_FILE: u64 = 3 * 60 * 60 * DEFAULT_SAMPLE_RATE as u64;

/// Engine configuration shared by playback and export sessions
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Output sample rate in Hz
    pub sample_rate: u32,
    /// Carrier frequency in Hz; left/right ears sit half a beat below/above it
    pub base_tone_hz: f64,
    /// Scheduler tick period in milliseconds
    pub tick_interval_ms: u64,
    /// Length of each gain ramp in a crossfade, in seconds
    pub crossfade_secs: f64,
    /// Delay between fade-out start and fade-in start, in seconds
    pub overlap_delay_secs: f64,
    /// Extra time after both fades before the crossfade commits, in seconds
    pub commit_margin_secs: f64,
    /// Near-zero value exponential gain ramps start from or end at
    pub gain_floor: f64,
    /// Frequency update interval for transition segments during offline render, in ms
    pub transition_update_ms: u64,
    /// Maximum session time rendered per offline chunk, in seconds
    pub chunk_secs: f64,
    /// Frame ceiling per output file
    pub max_frames_per_file: u64,
    /// Output attenuation applied before 16-bit quantization
    pub limiter: f64,
    /// Expected offline render speed as a multiple of realtime (progress estimate only)
    pub render_speed: f64,
    /// Split sessions longer than `max_frames_per_file` into `_part<N>` files
    pub split_files: bool,
    /// Render exports in `chunk_secs` slices instead of one pass per file
    pub chunked_export: bool,
    /// Include per-ear frequencies in frequency events
    pub show_ear_frequencies: bool,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            sample_rate: DEFAULT_SAMPLE_RATE,
            base_tone_hz: DEFAULT_BASE_TONE_HZ,
            tick_interval_ms: 100,
            crossfade_secs: 1.0,
            overlap_delay_secs: 2.0,
            commit_margin_secs: 0.1,
            gain_floor: 0.001,
            transition_update_ms: 50,
            chunk_secs: 30.0 * 60.0,
            max_frames_per_file: DEFAULT_MAX_FRAMES_PER_FILE,
            limiter: 0.98,
            render_speed: 50.0,
            split_files: true,
            chunked_export: true,
            show_ear_frequencies: true,
        }
    }
}

impl SessionConfig {
    /// Load a configuration from a JSON file and validate it
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        let config: SessionConfig = serde_json::from_str(&text)?;
        config.validate()?;
        Ok(config)
    }

    /// Write this configuration as pretty JSON
    pub fn save(&self, path: &Path) -> Result<()> {
        let text = serde_json::to_string_pretty(self)?;
        std::fs::write(path, text)?;
        Ok(())
    }

    /// Same configuration with a different carrier tone
    pub fn with_base_tone(mut self, base_tone_hz: f64) -> Self {
        self.base_tone_hz = base_tone_hz;
        self
    }

    /// Reject values the engine cannot run with
    pub fn validate(&self) -> Result<()> {
        let invalid = |reason: &str| {
            Err(BinauralError::InvalidConfig {
                reason: reason.to_string(),
            })
        };

        if self.sample_rate == 0 {
            return invalid("sample_rate must be positive");
        }
        if !(self.base_tone_hz > 0.0) {
            return invalid("base_tone_hz must be positive");
        }
        if self.tick_interval_ms == 0 {
            return invalid("tick_interval_ms must be positive");
        }
        if !(self.crossfade_secs > 0.0) || self.overlap_delay_secs < 0.0 {
            return invalid("crossfade_secs must be positive and overlap_delay_secs non-negative");
        }
        if self.commit_margin_secs < 0.0 {
            return invalid("commit_margin_secs must be non-negative");
        }
        if !(self.gain_floor > 0.0 && self.gain_floor < 1.0) {
            return invalid("gain_floor must be in (0, 1)");
        }
        if self.transition_update_ms == 0 {
            return invalid("transition_update_ms must be positive");
        }
        if !(self.chunk_secs > 0.0) {
            return invalid("chunk_secs must be positive");
        }
        let too_large = self
            .max_frames_per_file
            .checked_mul(4)
            .map_or(true, |bytes| bytes >= (1u64 << 32) - 44);
        if self.max_frames_per_file == 0 || too_large {
            return invalid("max_frames_per_file must fit a 32-bit RIFF size");
        }
        if !(self.limiter > 0.0 && self.limiter <= 1.0) {
            return invalid("limiter must be in (0, 1]");
        }
        if !(self.render_speed > 0.0) {
            return invalid("render_speed must be positive");
        }
        Ok(())
    }

    /// Chunk length in whole frames
    pub fn chunk_frames(&self) -> u64 {
        ((self.chunk_secs * self.sample_rate as f64).round() as u64).max(1)
    }
}
