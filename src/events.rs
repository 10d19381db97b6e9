//! UI-facing session events
//!
//! Playback and export sessions report what a front end should display as
//! a stream of events; the session never touches presentation itself.

use std::fmt;

use serde::Serialize;

/// A state change for the UI to render
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum SessionEvent {
    /// A new segment became current
    SegmentChanged {
        index: usize,
        count: usize,
        text: String,
    },
    /// Elapsed and remaining session time
    Time { elapsed_ms: f64, remaining_ms: f64 },
    /// Live beat frequency, and per-ear tones when the ear display is enabled
    Frequency {
        binaural_hz: f64,
        ears: Option<(f64, f64)>,
    },
    /// Progress percentage, 0–100
    Progress { percent: f64 },
    /// Free-form status line (per-chunk / per-file export status)
    Status(String),
    /// Export finished
    Complete,
    /// Export failed; the message is already user-facing
    Error(String),
    /// Playback ended or was stopped; displays return to idle defaults
    Stopped,
}

impl fmt::Display for SessionEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SessionEvent::SegmentChanged { index, count, text } => {
                write!(f, "Segment {}/{}: {}", index + 1, count, text)
            }
            SessionEvent::Time {
                elapsed_ms,
                remaining_ms,
            } => write!(
                f,
                "{} elapsed, {} remaining",
                format_clock(*elapsed_ms),
                format_clock(*remaining_ms)
            ),
            SessionEvent::Frequency {
                binaural_hz,
                ears: Some((left, right)),
            } => write!(
                f,
                "Binaural {:.2} Hz (L {:.2} Hz / R {:.2} Hz)",
                binaural_hz, left, right
            ),
            SessionEvent::Frequency {
                binaural_hz,
                ears: None,
            } => write!(f, "Binaural {:.2} Hz", binaural_hz),
            SessionEvent::Progress { percent } => write!(f, "{:.0}%", percent),
            SessionEvent::Status(message) => write!(f, "{}", message),
            SessionEvent::Complete => write!(f, "Complete"),
            SessionEvent::Error(message) => write!(f, "{}", message),
            SessionEvent::Stopped => write!(f, "Stopped"),
        }
    }
}

/// Format milliseconds as `HH:MM:SS`, rounding down
pub fn format_clock(ms: f64) -> String {
    let total_secs = (ms.max(0.0) / 1000.0).floor() as u64;
    format!(
        "{:02}:{:02}:{:02}",
        total_secs / 3600,
        (total_secs / 60) % 60,
        total_secs % 60
    )
}
