//! Audio Engine Module
//!
//! The capability interface consumed by playback and export, plus a
//! software implementation:
//! - Voice / engine / offline-context traits
//! - Sample-accurate gain and frequency automation
//! - Software voice graph for realtime and offline use
//! - Clock sources
//! - Sample buffers

pub mod buffer;
pub mod clock;
pub mod graph;
pub mod offline;
pub mod param;
pub mod voice;

pub use buffer::SampleBuffer;
pub use clock::{Clock, ManualClock, SystemClock};
pub use graph::{SineVoice, SoftwareEngine, VoiceGraph, VoiceProbe};
pub use offline::{SoftwareOffline, SoftwareOfflineContext};
pub use param::{FrequencyTrack, GainParam, Ramp};
pub use voice::{AudioEngine, Channel, OfflineBackend, OfflineContext, Voice};
