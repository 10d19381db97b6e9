//! Crossfade engine
//!
//! Two-state machine (`Idle`, `Fading`) that owns every live voice. A
//! crossfade fades the active voice out immediately, fades a new voice in
//! after the overlap delay, retires the old voice once its fade-out is done
//! and commits the handover after both fades. Crossfades are never nested:
//! a request while fading is refused and the caller remembers it.

use log::{debug, info, warn};

use super::tasks::TaskQueue;
use crate::config::SessionConfig;
use crate::engine::{AudioEngine, Ramp, Voice};
use crate::error::Result;

/// Crossfade timing, in engine seconds
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CrossfadeTimings {
    /// Length of each gain ramp
    pub fade_secs: f64,
    /// Fade-in start relative to fade-out start
    pub overlap_delay_secs: f64,
    /// Extra wait after both fades before committing
    pub commit_margin_secs: f64,
    /// Near-zero gain exponential ramps start from or end at
    pub gain_floor: f64,
}

impl CrossfadeTimings {
    pub fn from_config(config: &SessionConfig) -> Self {
        Self {
            fade_secs: config.crossfade_secs,
            overlap_delay_secs: config.overlap_delay_secs,
            commit_margin_secs: config.commit_margin_secs,
            gain_floor: config.gain_floor,
        }
    }

    /// Delay from crossfade start to commit
    pub fn commit_delay(&self) -> f64 {
        self.fade_secs + self.overlap_delay_secs + self.commit_margin_secs
    }
}

impl Default for CrossfadeTimings {
    fn default() -> Self {
        Self::from_config(&SessionConfig::default())
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum CrossfadeState {
    Idle,
    Fading { target: usize, started_at: f64 },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CrossfadeTask {
    /// Outgoing fade-out finished: zero, stop and disconnect the old voice
    RetireOutgoing,
    /// Both fades finished: the incoming voice becomes active
    Commit,
}

/// Owner of the `active` and `next` voices
pub struct CrossfadeEngine<V: Voice> {
    timings: CrossfadeTimings,
    state: CrossfadeState,
    active: Option<V>,
    next: Option<V>,
    tasks: TaskQueue<CrossfadeTask>,
}

impl<V: Voice> CrossfadeEngine<V> {
    pub fn new(timings: CrossfadeTimings) -> Self {
        Self {
            timings,
            state: CrossfadeState::Idle,
            active: None,
            next: None,
            tasks: TaskQueue::new(),
        }
    }

    pub fn state(&self) -> CrossfadeState {
        self.state
    }

    pub fn is_fading(&self) -> bool {
        matches!(self.state, CrossfadeState::Fading { .. })
    }

    pub fn has_active(&self) -> bool {
        self.active.is_some()
    }

    /// Scheduled retire/commit steps not yet run
    pub fn pending_tasks(&self) -> usize {
        self.tasks.len()
    }

    /// Engine time of the next scheduled step
    pub fn next_due(&self) -> Option<f64> {
        self.tasks.next_due()
    }

    /// Create the first voice of a session and fade it in from the floor
    pub fn start_initial<E>(&mut self, engine: &mut E, left_hz: f64, right_hz: f64, now: f64) -> Result<()>
    where
        E: AudioEngine<Voice = V>,
    {
        if self.active.is_some() || self.next.is_some() {
            debug!("Initial voice requested with voices alive; tearing them down first");
            self.stop_all(now);
        }

        let mut voice = engine.create_voice()?;
        voice.set_ear_frequencies(left_hz, right_hz, now);
        voice.set_gains(self.timings.gain_floor, now);
        voice.ramp_gains(1.0, now + self.timings.fade_secs, Ramp::Exponential);
        voice.start(now);
        self.active = Some(voice);
        Ok(())
    }

    /// Begin a crossfade to segment `target`
    ///
    /// Returns `Ok(false)` without touching any voice when a crossfade is
    /// already in flight; the caller records a pending change instead.
    pub fn start_crossfade<E>(
        &mut self,
        engine: &mut E,
        target: usize,
        left_hz: f64,
        right_hz: f64,
        now: f64,
    ) -> Result<bool>
    where
        E: AudioEngine<Voice = V>,
    {
        if self.is_fading() {
            debug!("Crossfade to segment {} refused: already fading", target);
            return Ok(false);
        }

        let timings = self.timings;
        let fade_in_start = now + timings.overlap_delay_secs;

        let mut incoming = engine.create_voice()?;
        incoming.set_ear_frequencies(left_hz, right_hz, now);
        incoming.set_gains(timings.gain_floor, now);
        incoming.set_gains(timings.gain_floor, fade_in_start);
        incoming.ramp_gains(1.0, fade_in_start + timings.fade_secs, Ramp::Exponential);
        incoming.start(now);

        if let Some(outgoing) = self.active.as_mut() {
            outgoing.cancel_scheduled(now);
            outgoing.set_gains(1.0, now);
            outgoing.ramp_gains(timings.gain_floor, now + timings.fade_secs, Ramp::Exponential);
            self.tasks
                .schedule(now + timings.fade_secs, CrossfadeTask::RetireOutgoing);
        }

        self.next = Some(incoming);
        self.tasks
            .schedule(now + timings.commit_delay(), CrossfadeTask::Commit);
        self.state = CrossfadeState::Fading {
            target,
            started_at: now,
        };
        info!("Crossfade to segment {} started at {:.3}s", target, now);
        Ok(true)
    }

    /// Run every step that has come due by `now`
    ///
    /// Returns the committed segment index when a crossfade completed.
    pub fn poll(&mut self, now: f64) -> Option<usize> {
        let mut committed = None;
        while let Some(task) = self.tasks.pop_due(now) {
            match task {
                CrossfadeTask::RetireOutgoing => {
                    if let Some(mut outgoing) = self.active.take() {
                        retire(&mut outgoing, now);
                    }
                }
                CrossfadeTask::Commit => committed = self.commit(now),
            }
        }
        committed
    }

    fn commit(&mut self, now: f64) -> Option<usize> {
        let CrossfadeState::Fading { target, .. } = self.state else {
            warn!("Crossfade commit fired while idle; ignoring");
            return None;
        };

        // A retire that never ran (e.g. clock jumped) must not orphan the old voice
        if let Some(mut stale) = self.active.take() {
            retire(&mut stale, now);
        }
        self.active = self.next.take();
        self.state = CrossfadeState::Idle;
        info!("Crossfade to segment {} committed at {:.3}s", target, now);
        Some(target)
    }

    /// Push live ear frequencies to the active voice
    pub fn set_live_frequency(&mut self, left_hz: f64, right_hz: f64, now: f64) {
        if let Some(voice) = self.active.as_mut() {
            voice.set_ear_frequencies(left_hz, right_hz, now);
        }
    }

    /// Silence and release every voice, dropping all scheduled steps
    pub fn stop_all(&mut self, now: f64) {
        self.tasks.clear();
        for mut voice in self.active.take().into_iter().chain(self.next.take()) {
            retire(&mut voice, now);
        }
        self.state = CrossfadeState::Idle;
    }
}

/// Force a voice to true zero, then stop and disconnect it
///
/// Exponential ramps only approach zero, so the gain is set explicitly.
/// Failures are logged; they never interrupt playback.
fn retire<V: Voice>(voice: &mut V, now: f64) {
    voice.cancel_scheduled(now);
    voice.set_gains(0.0, now);
    if voice.is_started() {
        if let Err(e) = voice.stop(now) {
            warn!("Failed to stop retired voice: {}", e);
        }
    }
    if let Err(e) = voice.disconnect() {
        warn!("Failed to disconnect retired voice: {}", e);
    }
}
