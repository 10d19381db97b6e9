//! Live playback
//!
//! A [`PlaybackSession`] ticks against an [`AudioEngine`](crate::engine::AudioEngine)
//! clock and hands segment changes to the [`CrossfadeEngine`], which alone
//! owns the live voices.

pub mod crossfade;
pub mod scheduler;
pub mod state;
pub mod tasks;

pub use crossfade::{CrossfadeEngine, CrossfadeState, CrossfadeTimings};
pub use scheduler::PlaybackSession;
pub use state::{PlaybackState, PlaybackStatus};
pub use tasks::TaskQueue;
