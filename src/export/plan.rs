//! Export planning
//!
//! Splits a session into output files (bounded by the per-file frame
//! ceiling) and each file into render chunks (bounded by the chunk length).
//! All boundaries are whole absolute session frames.

use chrono::{DateTime, TimeZone};
use serde::Serialize;

use crate::config::SessionConfig;
use crate::error::{BinauralError, Result};
use crate::timeline::Timeline;

/// File name prefix for exported sessions
pub const FILE_PREFIX: &str = "binaural_beats";

/// One render pass
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ChunkPlan {
    /// First absolute session frame
    pub start_frame: u64,
    pub num_frames: u64,
}

impl ChunkPlan {
    pub fn start_secs(&self, sample_rate: u32) -> f64 {
        self.start_frame as f64 / sample_rate as f64
    }

    pub fn duration_secs(&self, sample_rate: u32) -> f64 {
        self.num_frames as f64 / sample_rate as f64
    }
}

/// One output file
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FilePlan {
    /// 1-based part number; `None` for a single-file export
    pub part: Option<usize>,
    pub file_name: String,
    pub start_frame: u64,
    pub num_frames: u64,
    pub chunks: Vec<ChunkPlan>,
}

/// Complete file and chunk layout of an export
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExportPlan {
    pub sample_rate: u32,
    pub total_frames: u64,
    pub files: Vec<FilePlan>,
}

impl ExportPlan {
    /// Lay out files and chunks for `timeline`
    ///
    /// `stamp` provides the `YYYYMMDD_HHMM` part of the file names.
    ///
    /// # Errors
    /// * `SessionTooLong` - more frames than one file holds and splitting is off
    pub fn new<Tz: TimeZone>(
        timeline: &Timeline,
        config: &SessionConfig,
        stamp: &DateTime<Tz>,
    ) -> Result<Self>
    where
        Tz::Offset: std::fmt::Display,
    {
        let sample_rate = config.sample_rate;
        let total_frames = session_frames(timeline.total_duration_ms(), sample_rate);

        if total_frames > config.max_frames_per_file && !config.split_files {
            return Err(BinauralError::SessionTooLong {
                duration_secs: timeline.total_duration_secs(),
            });
        }

        let chunk_frames = if config.chunked_export {
            config.chunk_frames()
        } else {
            config.max_frames_per_file
        };

        let file_count = total_frames.div_ceil(config.max_frames_per_file).max(1) as usize;
        let files = (0..file_count)
            .map(|index| {
                let start_frame = index as u64 * config.max_frames_per_file;
                let num_frames = config.max_frames_per_file.min(total_frames - start_frame);
                let part = (file_count > 1).then_some(index + 1);
                FilePlan {
                    part,
                    file_name: file_name(stamp, part),
                    start_frame,
                    num_frames,
                    chunks: split_chunks(start_frame, num_frames, chunk_frames),
                }
            })
            .collect();

        Ok(Self {
            sample_rate,
            total_frames,
            files,
        })
    }

    pub fn chunk_count(&self) -> usize {
        self.files.iter().map(|f| f.chunks.len()).sum()
    }
}

/// Frames covering `duration_ms` at `sample_rate`, rounded to the nearest frame
pub fn session_frames(duration_ms: u64, sample_rate: u32) -> u64 {
    ((duration_ms as u128 * sample_rate as u128 + 500) / 1000) as u64
}

/// `binaural_beats_<YYYYMMDD_HHMM>[_part<N>].wav`
pub fn file_name<Tz: TimeZone>(stamp: &DateTime<Tz>, part: Option<usize>) -> String
where
    Tz::Offset: std::fmt::Display,
{
    let stamp = stamp.format("%Y%m%d_%H%M");
    match part {
        Some(n) => format!("{}_{}_part{}.wav", FILE_PREFIX, stamp, n),
        None => format!("{}_{}.wav", FILE_PREFIX, stamp),
    }
}

fn split_chunks(start_frame: u64, num_frames: u64, chunk_frames: u64) -> Vec<ChunkPlan> {
    let chunk_frames = chunk_frames.max(1);
    let mut chunks = Vec::new();
    let mut offset = 0;
    while offset < num_frames {
        let len = chunk_frames.min(num_frames - offset);
        chunks.push(ChunkPlan {
            start_frame: start_frame + offset,
            num_frames: len,
        });
        offset += len;
    }
    chunks
}
