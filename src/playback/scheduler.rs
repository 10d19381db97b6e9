//! Playback scheduler
//!
//! Drives one live session: on every tick it reads the engine clock, works
//! out which segment should be sounding, hands segment changes to the
//! crossfade engine and pushes the live frequency to the active voice.
//! Everything runs on the caller's thread; the engine does the sample work.

use std::collections::VecDeque;
use std::time::{Duration, Instant};

use log::{debug, info};
use uuid::Uuid;

use super::crossfade::{CrossfadeEngine, CrossfadeState, CrossfadeTimings};
use super::state::{PlaybackState, PlaybackStatus};
use crate::config::SessionConfig;
use crate::engine::AudioEngine;
use crate::error::Result;
use crate::events::SessionEvent;
use crate::timeline::{ear_frequencies, Timeline};

/// Undrained events kept per session; the oldest are dropped past this
pub const MAX_PENDING_EVENTS: usize = 4096;

/// One live playback request
pub struct PlaybackSession<E: AudioEngine> {
    id: Uuid,
    engine: E,
    timeline: Timeline,
    config: SessionConfig,
    state: PlaybackState,
    crossfade: CrossfadeEngine<E::Voice>,
    /// Engine time at which session time was zero
    start_ref: f64,
    events: VecDeque<SessionEvent>,
}

impl<E: AudioEngine> PlaybackSession<E> {
    pub fn new(engine: E, timeline: Timeline, config: SessionConfig) -> Self {
        let timings = CrossfadeTimings::from_config(&config);
        Self {
            id: Uuid::new_v4(),
            engine,
            timeline,
            config,
            state: PlaybackState::default(),
            crossfade: CrossfadeEngine::new(timings),
            start_ref: 0.0,
            events: VecDeque::new(),
        }
    }

    /// Parse `instructions` and build a session
    ///
    /// # Errors
    /// * `EmptySession` - no instruction could be parsed
    pub fn from_instructions(engine: E, instructions: &str, config: SessionConfig) -> Result<Self> {
        let timeline = Timeline::parse(instructions)?;
        Ok(Self::new(engine, timeline, config))
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn state(&self) -> &PlaybackState {
        &self.state
    }

    pub fn timeline(&self) -> &Timeline {
        &self.timeline
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    pub fn engine(&self) -> &E {
        &self.engine
    }

    pub fn engine_mut(&mut self) -> &mut E {
        &mut self.engine
    }

    /// Take the events emitted since the last call
    ///
    /// At most [`MAX_PENDING_EVENTS`] are kept between calls.
    pub fn drain_events(&mut self) -> Vec<SessionEvent> {
        self.events.drain(..).collect()
    }

    /// Start from the beginning of the timeline
    pub fn start(&mut self) -> Result<()> {
        if !self.state.is_stopped() {
            self.stop();
        }

        let now = self.engine.current_time();
        let (left, right) = self.ears(self.timeline.segment(0).frequency_at(0.0));
        self.crossfade.start_initial(&mut self.engine, left, right, now)?;

        self.start_ref = now;
        self.state.status = PlaybackStatus::Playing;
        info!(
            "Playback session {} started: {} segment(s), {:.0}s",
            self.id,
            self.timeline.len(),
            self.timeline.total_duration_secs()
        );
        self.emit_segment(0);
        self.tick()
    }

    /// Advance the session to the current engine time
    pub fn tick(&mut self) -> Result<()> {
        if !self.state.is_playing() {
            return Ok(());
        }

        let now = self.engine.current_time();
        let elapsed_ms = ((now - self.start_ref) * 1000.0).max(0.0);
        self.state.elapsed_ms = elapsed_ms;

        if let Some(committed) = self.crossfade.poll(now) {
            self.on_commit(committed, elapsed_ms, now)?;
        }

        let target = self.timeline.segment_at(elapsed_ms);
        if target != self.state.current_segment_index {
            self.request_segment(target, now)?;
        }

        let index = self.state.current_segment_index;
        let beat = self.timeline.frequency_in_segment(index, elapsed_ms);
        let (left, right) = self.ears(beat);
        self.crossfade.set_live_frequency(left, right, now);

        let total_ms = self.timeline.total_duration_ms() as f64;
        self.emit(SessionEvent::Time {
            elapsed_ms,
            remaining_ms: (total_ms - elapsed_ms).max(0.0),
        });
        self.emit(SessionEvent::Frequency {
            binaural_hz: beat,
            ears: self.config.show_ear_frequencies.then_some((left, right)),
        });
        self.emit(SessionEvent::Progress {
            percent: (elapsed_ms / total_ms * 100.0).min(100.0),
        });

        if elapsed_ms >= total_ms {
            info!("Playback session {} reached the end", self.id);
            self.stop();
        }
        Ok(())
    }

    fn request_segment(&mut self, target: usize, now: f64) -> Result<()> {
        match self.crossfade.state() {
            CrossfadeState::Fading { target: fading, .. } if fading == target => Ok(()),
            CrossfadeState::Fading { .. } => {
                if !self.state.pending_segment_change {
                    debug!("Segment {} due while crossfading; deferring", target);
                }
                self.state.pending_segment_change = true;
                Ok(())
            }
            CrossfadeState::Idle => self.begin_crossfade(target, now),
        }
    }

    fn begin_crossfade(&mut self, target: usize, now: f64) -> Result<()> {
        let (left, right) = self.ears(self.timeline.segment(target).frequency_at(0.0));
        let started = self
            .crossfade
            .start_crossfade(&mut self.engine, target, left, right, now)?;
        if started {
            self.state.is_crossfading = true;
        } else {
            self.state.pending_segment_change = true;
        }
        Ok(())
    }

    fn on_commit(&mut self, committed: usize, elapsed_ms: f64, now: f64) -> Result<()> {
        self.state.current_segment_index = committed;
        self.state.is_crossfading = false;
        self.state.pending_segment_change = false;
        self.emit_segment(committed);

        let due = self.timeline.segment_at(elapsed_ms);
        if due != committed {
            debug!("Segment {} still due after commit; follow-up crossfade", due);
            self.begin_crossfade(due, now)?;
        }
        Ok(())
    }

    /// Suspend the engine; session time stands still until `resume`
    pub fn pause(&mut self) {
        if !self.state.is_playing() {
            return;
        }
        self.engine.suspend();
        self.state.status = PlaybackStatus::Paused;
        info!(
            "Playback session {} paused at {:.1}s",
            self.id,
            self.state.elapsed_ms / 1000.0
        );
    }

    pub fn resume(&mut self) {
        if !self.state.is_paused() {
            return;
        }
        self.engine.resume();
        self.start_ref = self.engine.current_time() - self.state.elapsed_ms / 1000.0;
        self.state.status = PlaybackStatus::Playing;
        info!("Playback session {} resumed", self.id);
    }

    /// Silence everything and return to the idle defaults
    pub fn stop(&mut self) {
        if self.state.is_stopped() {
            return;
        }
        if self.state.is_paused() {
            self.engine.resume();
        }
        let now = self.engine.current_time();
        self.crossfade.stop_all(now);
        self.state.reset();
        self.emit(SessionEvent::Stopped);
        info!("Playback session {} stopped", self.id);
    }

    /// Tick at `pace` until the session stops or `limit` wall time passes
    ///
    /// Events are handed to `on_event` after every tick.
    pub fn run_for(
        &mut self,
        limit: Duration,
        pace: Duration,
        mut on_event: impl FnMut(SessionEvent),
    ) -> Result<()> {
        let started = Instant::now();
        loop {
            self.tick()?;
            for event in self.drain_events() {
                on_event(event);
            }
            if self.state.is_stopped() || started.elapsed() >= limit {
                return Ok(());
            }
            std::thread::sleep(pace);
        }
    }

    fn ears(&self, beat: f64) -> (f64, f64) {
        ear_frequencies(self.config.base_tone_hz, beat)
    }

    fn emit_segment(&mut self, index: usize) {
        self.emit(SessionEvent::SegmentChanged {
            index,
            count: self.timeline.len(),
            text: self.timeline.segment(index).describe(),
        });
    }

    fn emit(&mut self, event: SessionEvent) {
        if self.events.len() == MAX_PENDING_EVENTS {
            self.events.pop_front();
        }
        self.events.push_back(event);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::{ManualClock, SoftwareEngine};
    use crate::error::BinauralError;
    use crate::timeline::Segment;

    fn session(text: &str) -> (PlaybackSession<SoftwareEngine<ManualClock>>, ManualClock) {
        let clock = ManualClock::new();
        let engine = SoftwareEngine::new(clock.clone(), 1000);
        let session = PlaybackSession::from_instructions(engine, text, SessionConfig::default()).unwrap();
        (session, clock)
    }

    #[test]
    fn test_empty_instructions_rejected() {
        let engine = SoftwareEngine::new(ManualClock::new(), 1000);
        let result = PlaybackSession::from_instructions(engine, "nonsense", SessionConfig::default());
        assert!(matches!(result, Err(BinauralError::EmptySession)));
    }

    #[test]
    fn test_start_emits_segment_and_frequency() {
        let (mut session, _) = session("10hz 1min");
        session.start().unwrap();
        let events = session.drain_events();

        assert_eq!(
            events[0],
            SessionEvent::SegmentChanged {
                index: 0,
                count: 1,
                text: "10 Hz (1 min)".to_string()
            }
        );
        assert!(events.contains(&SessionEvent::Frequency {
            binaural_hz: 10.0,
            ears: Some((427.0, 437.0))
        }));
        assert!(session.state().is_playing());
    }

    #[test]
    fn test_ear_display_flag() {
        let clock = ManualClock::new();
        let engine = SoftwareEngine::new(clock, 1000);
        let config = SessionConfig {
            show_ear_frequencies: false,
            ..SessionConfig::default()
        };
        let mut session = PlaybackSession::from_instructions(engine, "4hz 1min", config).unwrap();
        session.start().unwrap();
        assert!(session.drain_events().contains(&SessionEvent::Frequency {
            binaural_hz: 4.0,
            ears: None
        }));
    }

    #[test]
    fn test_segment_change_starts_crossfade() {
        let (mut session, clock) = session("10hz 1min, 5hz 1min");
        session.start().unwrap();

        clock.set(60.0);
        session.tick().unwrap();
        assert!(session.state().is_crossfading);
        assert_eq!(session.state().current_segment_index, 0);
        assert_eq!(session.engine().connected_voices(), 2);

        clock.set(63.2);
        session.tick().unwrap();
        assert!(!session.state().is_crossfading);
        assert_eq!(session.state().current_segment_index, 1);
        assert_eq!(session.engine().connected_voices(), 1);
        assert_eq!(session.engine().probe(63.2)[0].left_hz, 429.5);
    }

    #[test]
    fn test_change_during_crossfade_is_deferred() {
        let timeline = Timeline::new(vec![
            Segment::stable(10.0, 60_000),
            Segment::stable(5.0, 1_000),
            Segment::stable(7.0, 60_000),
        ])
        .unwrap();
        let clock = ManualClock::new();
        let engine = SoftwareEngine::new(clock.clone(), 1000);
        let mut session = PlaybackSession::new(engine, timeline, SessionConfig::default());
        session.start().unwrap();

        clock.set(60.0);
        session.tick().unwrap();
        assert!(!session.state().pending_segment_change);

        // segment 2 becomes due while still fading toward segment 1
        clock.set(61.5);
        session.tick().unwrap();
        assert!(session.state().pending_segment_change);
        assert_eq!(session.engine().connected_voices(), 1);

        // commit clears the flag and starts exactly one follow-up
        clock.set(63.2);
        session.tick().unwrap();
        assert!(!session.state().pending_segment_change);
        assert_eq!(session.state().current_segment_index, 1);
        assert!(session.state().is_crossfading);
        assert_eq!(session.engine().connected_voices(), 2);
    }

    #[test]
    fn test_pause_freezes_session_time() {
        let (mut session, clock) = session("10hz 1min");
        session.start().unwrap();

        clock.set(10.0);
        session.tick().unwrap();
        session.pause();
        clock.set(30.0);
        session.tick().unwrap();
        assert_eq!(session.state().elapsed_ms, 10_000.0);

        session.resume();
        clock.set(35.0);
        session.tick().unwrap();
        assert!((session.state().elapsed_ms - 15_000.0).abs() < 1e-6);
    }

    #[test]
    fn test_stop_releases_voices() {
        let (mut session, clock) = session("10hz 1min, 5hz 1min");
        session.start().unwrap();
        clock.set(60.5);
        session.tick().unwrap();
        session.drain_events();

        session.stop();
        assert!(session.state().is_stopped());
        assert_eq!(session.engine().connected_voices(), 0);
        assert_eq!(session.drain_events(), vec![SessionEvent::Stopped]);

        // stopping twice is harmless
        session.stop();
        assert!(session.drain_events().is_empty());
    }

    #[test]
    fn test_stable_segment_keeps_one_frequency_per_ear() {
        let (mut session, clock) = session("10hz 1 hr");
        session.start().unwrap();
        for tick in 1..=3000 {
            clock.set(tick as f64 * 0.1);
            session.tick().unwrap();
        }
        assert_eq!(session.engine().probe(300.0)[0].frequency_events, 2);
    }

    #[test]
    fn test_undrained_events_are_bounded() {
        let (mut session, clock) = session("10 to 7hz 1 hr");
        session.start().unwrap();
        for tick in 1..=2000 {
            clock.set(tick as f64 * 0.1);
            session.tick().unwrap();
        }
        let events = session.drain_events();
        assert_eq!(events.len(), MAX_PENDING_EVENTS);
        assert!(matches!(events.last(), Some(SessionEvent::Progress { .. })));
        assert!(session.drain_events().is_empty());
    }

    #[test]
    fn test_reaching_the_end_stops() {
        let (mut session, clock) = session("10hz 1min");
        session.start().unwrap();
        clock.set(60.0);
        session.tick().unwrap();
        assert!(session.state().is_stopped());
        assert_eq!(session.state().elapsed_ms, 0.0);
        assert_eq!(session.drain_events().last(), Some(&SessionEvent::Stopped));
    }
}
