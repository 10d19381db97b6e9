//! Software voice graph
//!
//! A minimal sample-accurate implementation of the engine capability: each
//! voice is a pair of sine generators whose frequency and gain follow
//! automation tracks. The same graph backs the realtime [`SoftwareEngine`]
//! and the offline render contexts, so both produce identical curves.

use std::cell::RefCell;
use std::rc::Rc;

use log::debug;

use super::buffer::SampleBuffer;
use super::clock::{Clock, SystemClock};
use super::param::{FrequencyTrack, GainParam, Ramp};
use super::voice::{AudioEngine, Channel, Voice};
use crate::error::{BinauralError, Result};

// ============================================================================
// Graph
// ============================================================================

#[derive(Debug, Clone)]
struct VoiceNode {
    frequency: [FrequencyTrack; 2],
    gain: [GainParam; 2],
    start_at: Option<f64>,
    stop_at: Option<f64>,
}

impl VoiceNode {
    fn new() -> Self {
        Self {
            frequency: [FrequencyTrack::new(0.0), FrequencyTrack::new(0.0)],
            gain: [GainParam::new(1.0), GainParam::new(1.0)],
            start_at: None,
            stop_at: None,
        }
    }

    fn is_sounding(&self, time: f64) -> bool {
        match self.start_at {
            Some(start) => time >= start && self.stop_at.map_or(true, |stop| time < stop),
            None => false,
        }
    }
}

/// Voices connected to one output
#[derive(Debug)]
pub struct VoiceGraph {
    /// Disconnected voices leave `None` so ids are never reused
    nodes: Vec<Option<VoiceNode>>,
    sample_rate: u32,
}

pub(crate) type SharedGraph = Rc<RefCell<VoiceGraph>>;

impl VoiceGraph {
    pub fn new(sample_rate: u32) -> Self {
        Self {
            nodes: Vec::new(),
            sample_rate,
        }
    }

    pub(crate) fn shared(sample_rate: u32) -> SharedGraph {
        Rc::new(RefCell::new(Self::new(sample_rate)))
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    /// Number of voices still connected
    pub fn connected(&self) -> usize {
        self.nodes.iter().flatten().count()
    }

    fn add(&mut self) -> usize {
        self.nodes.push(Some(VoiceNode::new()));
        self.nodes.len() - 1
    }

    fn node_mut(&mut self, id: usize) -> Option<&mut VoiceNode> {
        self.nodes.get_mut(id).and_then(Option::as_mut)
    }

    /// Mix every connected voice into `out`
    ///
    /// `out[channel][n]` receives the frame at absolute frame
    /// `start_frame + n`. Sample times are derived from the absolute frame
    /// index, so any split of a range renders the same values.
    pub fn render_into(&self, start_frame: u64, out: &mut [Vec<f32>]) {
        let sample_rate = self.sample_rate as f64;
        let first_time = start_frame as f64 / sample_rate;

        for node in self.nodes.iter().flatten() {
            if node.start_at.is_none() {
                continue;
            }
            for channel in Channel::BOTH {
                let Some(dst) = out.get_mut(channel.index()) else {
                    continue;
                };
                let mut phase = node.frequency[channel.index()].cursor_from(first_time);
                let mut gain = node.gain[channel.index()].cursor_from(first_time);
                for (n, sample) in dst.iter_mut().enumerate() {
                    let time = (start_frame + n as u64) as f64 / sample_rate;
                    if !node.is_sounding(time) {
                        continue;
                    }
                    *sample += (gain.value_at(time) * phase.sine_at(time)) as f32;
                }
            }
        }
    }

    fn probe(&self, time: f64) -> Vec<VoiceProbe> {
        self.nodes
            .iter()
            .enumerate()
            .filter_map(|(id, node)| node.as_ref().map(|n| (id, n)))
            .map(|(id, node)| VoiceProbe {
                id,
                sounding: node.is_sounding(time),
                stop_at: node.stop_at,
                left_hz: node.frequency[0].value_at(time),
                right_hz: node.frequency[1].value_at(time),
                left_gain: node.gain[0].value_at(time),
                right_gain: node.gain[1].value_at(time),
                frequency_events: node.frequency[0].event_count()
                    + node.frequency[1].event_count(),
            })
            .collect()
    }
}

/// Snapshot of one connected voice at a point in time
#[derive(Debug, Clone, PartialEq)]
pub struct VoiceProbe {
    pub id: usize,
    pub sounding: bool,
    pub stop_at: Option<f64>,
    pub left_hz: f64,
    pub right_hz: f64,
    pub left_gain: f64,
    pub right_gain: f64,
    /// Scheduled frequency changes across both ears
    pub frequency_events: usize,
}

// ============================================================================
// Voice handle
// ============================================================================

/// Handle to a voice in a [`VoiceGraph`]
#[derive(Debug)]
pub struct SineVoice {
    graph: SharedGraph,
    id: usize,
    started: bool,
}

impl SineVoice {
    pub(crate) fn create(graph: &SharedGraph) -> Self {
        let id = graph.borrow_mut().add();
        Self {
            graph: Rc::clone(graph),
            id,
            started: false,
        }
    }

    pub fn id(&self) -> usize {
        self.id
    }

    fn with_node(&self, f: impl FnOnce(&mut VoiceNode)) {
        let mut graph = self.graph.borrow_mut();
        match graph.node_mut(self.id) {
            Some(node) => f(node),
            None => debug!("Ignoring automation on disconnected voice {}", self.id),
        }
    }
}

impl Voice for SineVoice {
    fn start(&mut self, at: f64) {
        if self.started {
            debug!("Voice {} already started", self.id);
            return;
        }
        self.started = true;
        self.with_node(|node| node.start_at = Some(at));
    }

    fn stop(&mut self, at: f64) -> Result<()> {
        if !self.started {
            return Err(BinauralError::VoiceTeardown {
                reason: format!("voice {} stopped before it was started", self.id),
            });
        }
        let mut graph = self.graph.borrow_mut();
        let node = graph
            .node_mut(self.id)
            .ok_or_else(|| BinauralError::VoiceTeardown {
                reason: format!("voice {} is already disconnected", self.id),
            })?;
        node.stop_at = Some(node.stop_at.map_or(at, |existing| existing.min(at)));
        Ok(())
    }

    fn set_frequency(&mut self, channel: Channel, hz: f64, at: f64) {
        self.with_node(|node| node.frequency[channel.index()].set_value_at(hz, at));
    }

    fn set_gain(&mut self, channel: Channel, value: f64, at: f64) {
        self.with_node(|node| node.gain[channel.index()].set_value_at(value, at));
    }

    fn ramp_gain(&mut self, channel: Channel, value: f64, end_at: f64, ramp: Ramp) {
        self.with_node(|node| node.gain[channel.index()].ramp_to_value_at(value, end_at, ramp));
    }

    fn cancel_scheduled(&mut self, from: f64) {
        self.with_node(|node| {
            for index in 0..2 {
                node.gain[index].cancel_from(from);
                node.frequency[index].cancel_from(from);
            }
        });
    }

    fn disconnect(&mut self) -> Result<()> {
        let mut graph = self.graph.borrow_mut();
        match graph.nodes.get_mut(self.id).and_then(Option::take) {
            Some(_) => Ok(()),
            None => Err(BinauralError::VoiceTeardown {
                reason: format!("voice {} is already disconnected", self.id),
            }),
        }
    }

    fn is_started(&self) -> bool {
        self.started
    }
}

// ============================================================================
// Realtime engine
// ============================================================================

/// Realtime engine over a [`VoiceGraph`]
///
/// Time comes from a [`Clock`]; suspended intervals are excluded, so engine
/// time stands still while suspended. Audio is pulled with
/// [`SoftwareEngine::render_block`] by whatever drives the output device.
pub struct SoftwareEngine<C: Clock = SystemClock> {
    graph: SharedGraph,
    clock: C,
    /// Total clock time spent suspended
    suspended_total: f64,
    /// Clock time at which the current suspension began
    suspended_at: Option<f64>,
}

impl<C: Clock> SoftwareEngine<C> {
    pub fn new(clock: C, sample_rate: u32) -> Self {
        Self {
            graph: VoiceGraph::shared(sample_rate),
            clock,
            suspended_total: 0.0,
            suspended_at: None,
        }
    }

    pub fn sample_rate(&self) -> u32 {
        self.graph.borrow().sample_rate()
    }

    /// Number of voices still connected
    pub fn connected_voices(&self) -> usize {
        self.graph.borrow().connected()
    }

    /// State of every connected voice at engine time `at`
    pub fn probe(&self, at: f64) -> Vec<VoiceProbe> {
        self.graph.borrow().probe(at)
    }

    /// Render `num_frames` frames starting at engine frame `start_frame`
    pub fn render_block(&self, start_frame: u64, num_frames: usize) -> Result<SampleBuffer> {
        let graph = self.graph.borrow();
        let mut buffer = SampleBuffer::silent(2, num_frames, graph.sample_rate())?;
        graph.render_into(start_frame, &mut buffer.samples);
        Ok(buffer)
    }
}

impl<C: Clock> AudioEngine for SoftwareEngine<C> {
    type Voice = SineVoice;

    fn create_voice(&mut self) -> Result<SineVoice> {
        Ok(SineVoice::create(&self.graph))
    }

    fn current_time(&self) -> f64 {
        let raw = self.suspended_at.unwrap_or_else(|| self.clock.now());
        raw - self.suspended_total
    }

    fn suspend(&mut self) {
        if self.suspended_at.is_none() {
            self.suspended_at = Some(self.clock.now());
        }
    }

    fn resume(&mut self) {
        if let Some(at) = self.suspended_at.take() {
            self.suspended_total += self.clock.now() - at;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::clock::ManualClock;
    use approx::assert_relative_eq;

    fn engine() -> (SoftwareEngine<ManualClock>, ManualClock) {
        let clock = ManualClock::new();
        (SoftwareEngine::new(clock.clone(), 1000), clock)
    }

    #[test]
    fn test_suspended_time_is_excluded() {
        let (mut engine, clock) = engine();
        clock.set(5.0);
        engine.suspend();
        clock.set(9.0);
        assert_eq!(engine.current_time(), 5.0);
        engine.resume();
        clock.set(10.0);
        assert_eq!(engine.current_time(), 6.0);
    }

    #[test]
    fn test_unstarted_voice_is_silent() {
        let (mut engine, _) = engine();
        let mut voice = engine.create_voice().unwrap();
        voice.set_ear_frequencies(100.0, 110.0, 0.0);
        let block = engine.render_block(0, 100).unwrap();
        assert!(block.channel(0).iter().all(|&s| s == 0.0));
    }

    #[test]
    fn test_started_voice_renders_sine() {
        let (mut engine, _) = engine();
        let mut voice = engine.create_voice().unwrap();
        voice.set_ear_frequencies(250.0, 125.0, 0.0);
        voice.start(0.0);
        let block = engine.render_block(0, 8).unwrap();
        // 250 Hz at 1 kHz: quarter cycle per frame
        assert_relative_eq!(block.channel(0)[1], 1.0, epsilon = 1e-6);
        assert_relative_eq!(block.channel(0)[2], 0.0, epsilon = 1e-6);
        assert_relative_eq!(block.channel(1)[2], 1.0, epsilon = 1e-6);
    }

    #[test]
    fn test_stop_gates_output() {
        let (mut engine, _) = engine();
        let mut voice = engine.create_voice().unwrap();
        voice.set_ear_frequencies(250.0, 250.0, 0.0);
        voice.start(0.0);
        voice.stop(0.004).unwrap();
        let block = engine.render_block(0, 8).unwrap();
        assert!(block.channel(0)[4..].iter().all(|&s| s == 0.0));
    }

    #[test]
    fn test_double_disconnect_is_reported() {
        let (mut engine, _) = engine();
        let mut voice = engine.create_voice().unwrap();
        voice.start(0.0);
        assert_eq!(engine.connected_voices(), 1);
        voice.disconnect().unwrap();
        assert_eq!(engine.connected_voices(), 0);
        assert!(matches!(
            voice.disconnect(),
            Err(BinauralError::VoiceTeardown { .. })
        ));
        assert!(voice.stop(1.0).is_err());
    }

    #[test]
    fn test_stop_before_start_is_an_error() {
        let (mut engine, _) = engine();
        let mut voice = engine.create_voice().unwrap();
        assert!(voice.stop(0.0).is_err());
    }

    #[test]
    fn test_probe_reports_automation() {
        let (mut engine, _) = engine();
        let mut voice = engine.create_voice().unwrap();
        voice.set_ear_frequencies(427.0, 437.0, 0.0);
        voice.set_gains(1.0, 0.0);
        voice.ramp_gains(0.5, 1.0, Ramp::Linear);
        voice.start(0.0);

        let probe = &engine.probe(0.5)[0];
        assert!(probe.sounding);
        assert_eq!(probe.left_hz, 427.0);
        assert_eq!(probe.right_hz, 437.0);
        assert_relative_eq!(probe.left_gain, 0.75);
    }
}
