//! Session segments
//!
//! A segment is one scheduled tone phase: either a fixed beat frequency or a
//! linear sweep between two beat frequencies.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Milliseconds per hour
pub const MS_PER_HOUR: u64 = 3_600_000;

/// Milliseconds per minute
pub const MS_PER_MINUTE: u64 = 60_000;

/// Segment shape
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SegmentKind {
    /// Constant beat frequency
    Stable,
    /// Linear sweep from `start_freq` to `end_freq`
    Transition,
}

impl fmt::Display for SegmentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SegmentKind::Stable => write!(f, "Stable"),
            SegmentKind::Transition => write!(f, "Transition"),
        }
    }
}

/// One timed beat-frequency phase of a session
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Segment {
    pub kind: SegmentKind,
    /// Beat frequency at the start of the segment, in Hz
    pub start_freq: f64,
    /// Beat frequency at the end of the segment, in Hz
    pub end_freq: f64,
    /// Segment length in milliseconds
    pub duration_ms: u64,
}

impl Segment {
    /// Fixed beat frequency for `duration_ms`
    pub fn stable(freq: f64, duration_ms: u64) -> Self {
        Self {
            kind: SegmentKind::Stable,
            start_freq: freq,
            end_freq: freq,
            duration_ms,
        }
    }

    /// Linear sweep from `start_freq` to `end_freq` over `duration_ms`
    pub fn transition(start_freq: f64, end_freq: f64, duration_ms: u64) -> Self {
        Self {
            kind: SegmentKind::Transition,
            start_freq,
            end_freq,
            duration_ms,
        }
    }

    /// Whether the invariants `duration > 0` and positive frequencies hold
    pub fn is_valid(&self) -> bool {
        self.duration_ms > 0
            && self.start_freq.is_finite()
            && self.end_freq.is_finite()
            && self.start_freq > 0.0
            && self.end_freq > 0.0
            && (self.kind == SegmentKind::Transition || self.start_freq == self.end_freq)
    }

    /// Beat frequency at `progress` through the segment
    ///
    /// `progress` is not clamped: values outside `[0, 1]` extrapolate a
    /// transition. Callers clamp.
    ///
    /// # Example
    /// ```
    /// use binaural::timeline::Segment;
    /// let seg = Segment::transition(10.0, 7.0, 3_600_000);
    /// assert_eq!(seg.frequency_at(0.5), 8.5);
    /// ```
    pub fn frequency_at(&self, progress: f64) -> f64 {
        match self.kind {
            SegmentKind::Stable => self.start_freq,
            SegmentKind::Transition => {
                self.start_freq + (self.end_freq - self.start_freq) * progress
            }
        }
    }

    /// Duration in seconds
    pub fn duration_secs(&self) -> f64 {
        self.duration_ms as f64 / 1000.0
    }

    /// Display text for the segment indicator
    pub fn describe(&self) -> String {
        let minutes = self.duration_ms as f64 / MS_PER_MINUTE as f64;
        match self.kind {
            SegmentKind::Stable => format!("{} Hz ({} min)", fmt_hz(self.start_freq), fmt_hz(minutes)),
            SegmentKind::Transition => format!(
                "{} Hz → {} Hz ({} min)",
                fmt_hz(self.start_freq),
                fmt_hz(self.end_freq),
                fmt_hz(minutes)
            ),
        }
    }
}

impl fmt::Display for Segment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.describe())
    }
}

/// Format a number without a trailing `.0` and with at most two decimals
fn fmt_hz(value: f64) -> String {
    let rounded = (value * 100.0).round() / 100.0;
    if rounded.fract() == 0.0 {
        format!("{:.0}", rounded)
    } else {
        let text = format!("{:.2}", rounded);
        text.trim_end_matches('0').to_string()
    }
}
