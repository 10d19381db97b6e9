//! Audio engine capability interface
//!
//! The session core never generates samples itself. It creates voices
//! through these traits and schedules parameter changes on them; the engine
//! applies the changes sample-accurately on its own time base.

use std::fmt;

use super::buffer::SampleBuffer;
use super::param::Ramp;
use crate::error::Result;

/// Ear a tone generator plays into
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Channel {
    Left,
    Right,
}

impl Channel {
    pub const BOTH: [Channel; 2] = [Channel::Left, Channel::Right];

    /// Output channel index
    pub fn index(self) -> usize {
        match self {
            Channel::Left => 0,
            Channel::Right => 1,
        }
    }
}

impl fmt::Display for Channel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Channel::Left => write!(f, "left"),
            Channel::Right => write!(f, "right"),
        }
    }
}

/// A pair of sine generators (left/right ear) with per-ear gain
///
/// All times are in engine seconds. Scheduling calls never block.
pub trait Voice {
    /// Begin producing sound at `at`
    fn start(&mut self, at: f64);

    /// Stop producing sound at `at`
    fn stop(&mut self, at: f64) -> Result<()>;

    /// Switch the tone of one ear to `hz` at `at`
    fn set_frequency(&mut self, channel: Channel, hz: f64, at: f64);

    /// Jump the gain of one ear to `value` at `at`
    fn set_gain(&mut self, channel: Channel, value: f64, at: f64);

    /// Ramp the gain of one ear so it reaches `value` at `end_at`
    fn ramp_gain(&mut self, channel: Channel, value: f64, end_at: f64, ramp: Ramp);

    /// Drop gain and frequency changes scheduled at or after `from`
    fn cancel_scheduled(&mut self, from: f64);

    /// Release the voice from the engine; it produces nothing afterwards
    fn disconnect(&mut self) -> Result<()>;

    fn is_started(&self) -> bool;

    /// Set both ears at once
    fn set_ear_frequencies(&mut self, left_hz: f64, right_hz: f64, at: f64) {
        self.set_frequency(Channel::Left, left_hz, at);
        self.set_frequency(Channel::Right, right_hz, at);
    }

    fn set_gains(&mut self, value: f64, at: f64) {
        for channel in Channel::BOTH {
            self.set_gain(channel, value, at);
        }
    }

    fn ramp_gains(&mut self, value: f64, end_at: f64, ramp: Ramp) {
        for channel in Channel::BOTH {
            self.ramp_gain(channel, value, end_at, ramp);
        }
    }
}

/// Realtime engine: voice factory plus a suspendable clock
pub trait AudioEngine {
    type Voice: Voice;

    fn create_voice(&mut self) -> Result<Self::Voice>;

    /// Current engine time in seconds; frozen while suspended
    fn current_time(&self) -> f64;

    fn suspend(&mut self);

    fn resume(&mut self);
}

/// Factory for non-realtime render contexts
pub trait OfflineBackend {
    type Context: OfflineContext;

    /// Context rendering `num_frames` frames starting at absolute session
    /// frame `start_frame`. Voice times passed to the context are absolute
    /// session seconds.
    fn create_context(
        &self,
        num_channels: usize,
        start_frame: u64,
        num_frames: usize,
        sample_rate: u32,
    ) -> Result<Self::Context>;
}

/// One non-realtime render pass
pub trait OfflineContext {
    type Voice: Voice;

    fn create_voice(&mut self) -> Result<Self::Voice>;

    /// Render every scheduled voice
    ///
    /// `on_block(frames_done, frames_total)` is called as the render advances.
    fn render(self, on_block: &mut dyn FnMut(usize, usize)) -> Result<SampleBuffer>;
}
