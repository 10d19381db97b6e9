//! Offline chunk renderer
//!
//! Renders a window of the session into a [`SampleBuffer`] through an
//! [`OfflineBackend`]. Every overlapping segment gets its own voice scoped
//! to the chunk. Frequency automation is anchored to the segment start, not
//! the chunk start, so oscillator phase at any session frame is the same no
//! matter how the session is cut into chunks.

use std::time::Instant;

use tracing::{debug, instrument};

use crate::config::SessionConfig;
use crate::engine::{OfflineBackend, OfflineContext, Ramp, SampleBuffer, SoftwareOffline, Voice};
use crate::error::{BinauralError, Result};
use crate::timeline::{ear_frequencies, SegmentKind, Timeline};

/// Progress reported until the render actually returns
const PROGRESS_CAP: f64 = 0.95;

/// One rendered window of session audio
#[derive(Debug, Clone, PartialEq)]
pub struct RenderChunk {
    /// Session time of the first frame
    pub start_offset_secs: f64,
    pub duration_secs: f64,
    pub buffer: SampleBuffer,
}

/// Renders session windows with a given offline backend
pub struct ChunkRenderer<B: OfflineBackend = SoftwareOffline> {
    backend: B,
    config: SessionConfig,
}

impl ChunkRenderer<SoftwareOffline> {
    pub fn software(config: SessionConfig) -> Self {
        Self::new(SoftwareOffline, config)
    }
}

impl<B: OfflineBackend> ChunkRenderer<B> {
    pub fn new(backend: B, config: SessionConfig) -> Self {
        Self { backend, config }
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    /// Render `duration_secs` of session audio starting at `start_secs`
    ///
    /// Times are rounded to whole frames. `on_progress` receives a fraction
    /// in [0, 1].
    ///
    /// # Errors
    /// * `InvalidRenderWindow` - the window is empty or starts outside the session
    /// * `RenderFailed` - the backend could not render
    pub fn render_chunk(
        &self,
        timeline: &Timeline,
        start_secs: f64,
        duration_secs: f64,
        base_tone: f64,
        on_progress: &mut dyn FnMut(f64),
    ) -> Result<RenderChunk> {
        let invalid = || BinauralError::InvalidRenderWindow {
            start_secs,
            duration_secs,
        };
        if !start_secs.is_finite() || !duration_secs.is_finite() || start_secs < 0.0 {
            return Err(invalid());
        }

        let sample_rate = self.config.sample_rate as f64;
        let start_frame = (start_secs * sample_rate).round() as u64;
        let num_frames = (duration_secs * sample_rate).round() as u64;
        self.render_frames(timeline, start_frame, num_frames, base_tone, on_progress)
            .map_err(|e| match e {
                BinauralError::InvalidRenderWindow { .. } => invalid(),
                other => other,
            })
    }

    /// Render `num_frames` frames starting at absolute session frame `start_frame`
    #[instrument(skip(self, timeline, on_progress), fields(segments = timeline.len()))]
    pub fn render_frames(
        &self,
        timeline: &Timeline,
        start_frame: u64,
        num_frames: u64,
        base_tone: f64,
        on_progress: &mut dyn FnMut(f64),
    ) -> Result<RenderChunk> {
        let sample_rate = self.config.sample_rate;
        let rate = sample_rate as f64;
        let chunk_start = start_frame as f64 / rate;
        let duration_secs = num_frames as f64 / rate;
        let chunk_end = chunk_start + duration_secs;

        if num_frames == 0 || chunk_start >= timeline.total_duration_secs() {
            return Err(BinauralError::InvalidRenderWindow {
                start_secs: chunk_start,
                duration_secs,
            });
        }
        let frames = usize::try_from(num_frames).map_err(|_| BinauralError::RenderFailed {
            reason: format!("{} frames exceed addressable memory", num_frames),
        })?;

        let mut context = self
            .backend
            .create_context(2, start_frame, frames, sample_rate)?;

        let mut voices = 0;
        for index in 0..timeline.len() {
            let seg_start = timeline.segment_start_ms(index) as f64 / 1000.0;
            let seg_end = timeline.segment_end_ms(index) as f64 / 1000.0;
            if seg_end <= chunk_start || seg_start >= chunk_end {
                continue;
            }
            let mut voice = context.create_voice()?;
            self.schedule_segment(&mut voice, timeline, index, chunk_start, chunk_end, base_tone)?;
            voices += 1;
        }
        debug!(voices, chunk_start, duration_secs, "Scheduled offline chunk");

        // Wall-clock estimate; the true end is only known when render returns
        let expected_secs = (duration_secs / self.config.render_speed).max(f64::EPSILON);
        let started = Instant::now();
        let buffer = context.render(&mut |_, _| {
            let fraction = started.elapsed().as_secs_f64() / expected_secs;
            on_progress(fraction.min(PROGRESS_CAP));
        })?;
        on_progress(1.0);

        Ok(RenderChunk {
            start_offset_secs: chunk_start,
            duration_secs,
            buffer,
        })
    }

    fn schedule_segment<V: Voice>(
        &self,
        voice: &mut V,
        timeline: &Timeline,
        index: usize,
        chunk_start: f64,
        chunk_end: f64,
        base_tone: f64,
    ) -> Result<()> {
        let segment = timeline.segment(index);
        let start_ms = timeline.segment_start_ms(index);
        let seg_start = start_ms as f64 / 1000.0;
        let seg_end = timeline.segment_end_ms(index) as f64 / 1000.0;

        match segment.kind {
            SegmentKind::Stable => {
                let (left, right) = ear_frequencies(base_tone, segment.start_freq);
                voice.set_ear_frequencies(left, right, seg_start);
            }
            SegmentKind::Transition => {
                // Grid anchored to the segment start, up to the end of this chunk
                let step_ms = self.config.transition_update_ms;
                let mut offset_ms = 0u64;
                while offset_ms < segment.duration_ms {
                    let at = (start_ms + offset_ms) as f64 / 1000.0;
                    if at >= chunk_end {
                        break;
                    }
                    let progress = offset_ms as f64 / segment.duration_ms as f64;
                    let (left, right) = ear_frequencies(base_tone, segment.frequency_at(progress));
                    voice.set_ear_frequencies(left, right, at);
                    offset_ms += step_ms;
                }
            }
        }

        voice.start(seg_start.max(chunk_start));
        voice.stop(seg_end)?;

        let ends_in_chunk = seg_end <= chunk_end;
        let has_successor = index + 1 < timeline.len();
        if ends_in_chunk && has_successor {
            let in_chunk_secs = seg_end - seg_start.max(chunk_start);
            let fade = self.config.crossfade_secs.min(in_chunk_secs / 2.0);
            voice.set_gains(1.0, seg_end - fade);
            voice.ramp_gains(self.config.gain_floor, seg_end, Ramp::Exponential);
        }
        Ok(())
    }
}
