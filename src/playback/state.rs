//! Playback state
//!
//! Owned by the playback scheduler and mutated only on its tick.

use std::fmt;

/// Exactly one of these holds at any time
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PlaybackStatus {
    /// No session running (default state)
    #[default]
    Stopped,
    /// Session is advancing
    Playing,
    /// Session is suspended and can resume where it left off
    Paused,
}

impl fmt::Display for PlaybackStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PlaybackStatus::Stopped => write!(f, "Stopped"),
            PlaybackStatus::Playing => write!(f, "Playing"),
            PlaybackStatus::Paused => write!(f, "Paused"),
        }
    }
}

/// Scheduler-owned view of a running session
#[derive(Debug, Clone, PartialEq, Default)]
pub struct PlaybackState {
    /// Session time in milliseconds, excluding paused intervals
    pub elapsed_ms: f64,
    /// Segment whose voice is currently active
    pub current_segment_index: usize,
    pub status: PlaybackStatus,
    pub is_crossfading: bool,
    /// A segment change was detected while a crossfade was in flight
    pub pending_segment_change: bool,
}

impl PlaybackState {
    pub fn is_playing(&self) -> bool {
        self.status == PlaybackStatus::Playing
    }

    pub fn is_paused(&self) -> bool {
        self.status == PlaybackStatus::Paused
    }

    pub fn is_stopped(&self) -> bool {
        self.status == PlaybackStatus::Stopped
    }

    /// Back to the stopped defaults
    pub fn reset(&mut self) {
        *self = Self::default();
    }
}
