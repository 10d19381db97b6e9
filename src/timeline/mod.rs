//! Segment Timeline Module
//!
//! Shared by live playback and offline export:
//! - Instruction parsing into segments
//! - Segment frequency curves
//! - Elapsed time → segment/progress/frequency lookups

pub mod parser;
pub mod segment;
pub mod track;

pub use parser::{parse, parse_report, ParseReport};
pub use segment::{Segment, SegmentKind, MS_PER_HOUR, MS_PER_MINUTE};
pub use track::{ear_frequencies, Timeline};
