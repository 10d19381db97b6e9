//! Timeline: pure time → frequency mapping
//!
//! The same `Timeline` drives live playback and offline export, so both see
//! the identical frequency curve. All lookups are stateless.

use serde::Serialize;

use super::segment::Segment;
use crate::error::{BinauralError, Result};

/// Immutable ordered segment list with cumulative boundaries
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Timeline {
    segments: Vec<Segment>,
    /// `ends_ms[i]` = sum of durations of segments `0..=i`
    ends_ms: Vec<u64>,
}

impl Timeline {
    /// Build a timeline from parsed segments
    ///
    /// # Errors
    /// * `EmptySession` - no segments
    /// * `InvalidTimeline` - a segment violates its invariants
    pub fn new(segments: Vec<Segment>) -> Result<Self> {
        if segments.is_empty() {
            return Err(BinauralError::EmptySession);
        }
        if let Some((index, _)) = segments.iter().enumerate().find(|(_, s)| !s.is_valid()) {
            return Err(BinauralError::InvalidTimeline {
                reason: format!("segment {} has a non-positive duration or frequency", index),
            });
        }

        let mut total = 0u64;
        let mut ends_ms = Vec::with_capacity(segments.len());
        for segment in &segments {
            total = total
                .checked_add(segment.duration_ms)
                .ok_or_else(|| BinauralError::InvalidTimeline {
                    reason: "total duration overflows".to_string(),
                })?;
            ends_ms.push(total);
        }

        Ok(Self { segments, ends_ms })
    }

    /// Parse instruction text straight into a timeline
    pub fn parse(text: &str) -> Result<Self> {
        Self::new(super::parser::parse(text))
    }

    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    pub fn len(&self) -> usize {
        self.segments.len()
    }

    /// Always false: construction rejects empty timelines
    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    pub fn segment(&self, index: usize) -> &Segment {
        &self.segments[index]
    }

    /// Sum of all segment durations in milliseconds
    pub fn total_duration_ms(&self) -> u64 {
        *self.ends_ms.last().unwrap_or(&0)
    }

    pub fn total_duration_secs(&self) -> f64 {
        self.total_duration_ms() as f64 / 1000.0
    }

    /// Session time at which segment `index` starts, in milliseconds
    pub fn segment_start_ms(&self, index: usize) -> u64 {
        if index == 0 {
            0
        } else {
            self.ends_ms[index - 1]
        }
    }

    /// Session time at which segment `index` ends, in milliseconds
    pub fn segment_end_ms(&self, index: usize) -> u64 {
        self.ends_ms[index]
    }

    /// Index of the segment playing at `elapsed_ms`
    ///
    /// First segment whose cumulative end exceeds `elapsed_ms`. At or past
    /// the end of the session this is the last index, never out of bounds.
    pub fn segment_at(&self, elapsed_ms: f64) -> usize {
        let index = self.ends_ms.partition_point(|&end| end as f64 <= elapsed_ms);
        index.min(self.segments.len() - 1)
    }

    /// Time elapsed inside segment `index`, in milliseconds
    ///
    /// Negative before the segment starts and larger than its duration after
    /// it ends; callers clamp.
    pub fn offset_within_segment(&self, index: usize, elapsed_ms: f64) -> f64 {
        elapsed_ms - self.segment_start_ms(index) as f64
    }

    /// Clamped progress through segment `index` at `elapsed_ms`
    pub fn progress_within(&self, index: usize, elapsed_ms: f64) -> f64 {
        let duration = self.segments[index].duration_ms as f64;
        (self.offset_within_segment(index, elapsed_ms) / duration).clamp(0.0, 1.0)
    }

    /// Beat frequency of segment `index` at `elapsed_ms`, clamped to the segment
    pub fn frequency_in_segment(&self, index: usize, elapsed_ms: f64) -> f64 {
        self.segments[index].frequency_at(self.progress_within(index, elapsed_ms))
    }

    /// Beat frequency at `elapsed_ms` for whichever segment is playing then
    pub fn binaural_at(&self, elapsed_ms: f64) -> f64 {
        self.frequency_in_segment(self.segment_at(elapsed_ms), elapsed_ms)
    }
}

/// Left and right ear tone frequencies for a beat centred on `base_tone`
///
/// # Example
/// ```
/// use binaural::timeline::ear_frequencies;
/// assert_eq!(ear_frequencies(432.0, 10.0), (427.0, 437.0));
/// ```
pub fn ear_frequencies(base_tone: f64, beat: f64) -> (f64, f64) {
    (base_tone - beat / 2.0, base_tone + beat / 2.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::timeline::parse;
    use approx::assert_relative_eq;
    use test_case::test_case;

    fn three_segments() -> Timeline {
        // 0..1000 stable, 1000..3000 transition, 3000..3500 stable
        Timeline::new(vec![
            Segment::stable(4.0, 1000),
            Segment::transition(10.0, 6.0, 2000),
            Segment::stable(6.0, 500),
        ])
        .unwrap()
    }

    #[test]
    fn test_empty_timeline_rejected() {
        assert!(matches!(Timeline::new(vec![]), Err(BinauralError::EmptySession)));
        assert!(matches!(Timeline::parse("nothing here"), Err(BinauralError::EmptySession)));
    }

    #[test]
    fn test_invalid_segment_rejected() {
        let result = Timeline::new(vec![Segment::stable(4.0, 0)]);
        assert!(matches!(result, Err(BinauralError::InvalidTimeline { .. })));
    }

    #[test]
    fn test_total_duration() {
        let timeline = three_segments();
        assert_eq!(timeline.total_duration_ms(), 3500);
        assert_eq!(timeline.segment_start_ms(2), 3000);
        assert_eq!(timeline.segment_end_ms(1), 3000);
    }

    #[test_case(0.0, 0 ; "start")]
    #[test_case(999.9, 0 ; "just before first boundary")]
    #[test_case(1000.0, 1 ; "on first boundary")]
    #[test_case(2999.0, 1 ; "inside transition")]
    #[test_case(3000.0, 2 ; "on second boundary")]
    #[test_case(3500.0, 2 ; "at end")]
    #[test_case(1.0e9, 2 ; "far past end")]
    fn test_segment_at(elapsed: f64, expected: usize) {
        assert_eq!(three_segments().segment_at(elapsed), expected);
    }

    #[test]
    fn test_segment_at_is_monotonic() {
        let timeline = three_segments();
        let mut last = 0;
        for t in 0..3500 {
            let index = timeline.segment_at(t as f64);
            assert!(index >= last, "index went backwards at {}ms", t);
            last = index;
        }
    }

    #[test]
    fn test_offset_and_progress() {
        let timeline = three_segments();
        assert_eq!(timeline.offset_within_segment(1, 1500.0), 500.0);
        assert_eq!(timeline.progress_within(1, 1500.0), 0.25);
        assert_eq!(timeline.progress_within(1, 500.0), 0.0);
        assert_eq!(timeline.progress_within(1, 9000.0), 1.0);
    }

    #[test]
    fn test_binaural_at_follows_transition() {
        let timeline = three_segments();
        assert_eq!(timeline.binaural_at(0.0), 4.0);
        assert_eq!(timeline.binaural_at(1000.0), 10.0);
        assert_relative_eq!(timeline.binaural_at(2000.0), 8.0);
        assert_eq!(timeline.binaural_at(3200.0), 6.0);
    }

    #[test]
    fn test_end_to_end_frequencies() {
        let timeline = Timeline::new(parse("10 to 7hz 1 hr")).unwrap();
        assert_eq!(timeline.total_duration_ms(), 3_600_000);

        let beat = timeline.binaural_at(0.0);
        assert_eq!(ear_frequencies(432.0, beat), (427.0, 437.0));

        let beat = timeline.binaural_at(1_800_000.0);
        assert_relative_eq!(beat, 8.5);
        let (left, right) = ear_frequencies(432.0, beat);
        assert_relative_eq!(left, 427.75);
        assert_relative_eq!(right, 436.25);
    }
}
