//! Binaural - Binaural-Beat Session Engine
//!
//! Turns an instruction list such as `"10 to 7hz 1 hr, 4hz 30min"` into a
//! timeline of frequency segments and plays or exports it:
//! 1. Live playback - a ticking scheduler with sample-accurate crossfades
//! 2. Offline export - chunked rendering into one or more 16-bit WAV files
//!
//! # Architecture
//!
//! - `timeline`: parsing and the pure time → frequency functions both paths share
//! - `engine`: the audio engine capability traits and a software implementation
//! - `playback`: scheduler, crossfade state machine, task queue
//! - `export`: file planning, chunk renderer, WAV encoder, export sessions

pub mod cli;
pub mod config;
pub mod engine;
pub mod error;
pub mod events;
pub mod export;
pub mod playback;
pub mod timeline;

pub use config::SessionConfig;
pub use error::{BinauralError, Result};
pub use events::SessionEvent;
pub use timeline::{Segment, SegmentKind, Timeline};
