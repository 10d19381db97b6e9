//! Playback Integration Tests
//!
//! Drives full sessions on the software engine with a hand-driven clock.

use binaural::engine::{ManualClock, SoftwareEngine};
use binaural::playback::PlaybackSession;
use binaural::{SessionConfig, SessionEvent};

type Session = PlaybackSession<SoftwareEngine<ManualClock>>;

fn session(instructions: &str) -> (Session, ManualClock) {
    let clock = ManualClock::new();
    let engine = SoftwareEngine::new(clock.clone(), 1000);
    let session = PlaybackSession::from_instructions(engine, instructions, SessionConfig::default())
        .expect("valid instructions");
    (session, clock)
}

fn frequency_events(events: &[SessionEvent]) -> Vec<SessionEvent> {
    events
        .iter()
        .filter(|e| matches!(e, SessionEvent::Frequency { .. }))
        .cloned()
        .collect()
}

// === End-to-End ===

#[test]
fn test_descending_hour_at_432() {
    let (mut session, clock) = session("10 to 7hz 1 hr");
    session.start().unwrap();

    let events = session.drain_events();
    assert_eq!(
        frequency_events(&events),
        vec![SessionEvent::Frequency {
            binaural_hz: 10.0,
            ears: Some((427.0, 437.0))
        }]
    );
    let probe = &session.engine().probe(0.0)[0];
    assert_eq!((probe.left_hz, probe.right_hz), (427.0, 437.0));

    clock.set(1800.0);
    session.tick().unwrap();
    let events = session.drain_events();
    assert_eq!(
        frequency_events(&events),
        vec![SessionEvent::Frequency {
            binaural_hz: 8.5,
            ears: Some((427.75, 436.25))
        }]
    );
    assert!(events.contains(&SessionEvent::Time {
        elapsed_ms: 1_800_000.0,
        remaining_ms: 1_800_000.0
    }));
    let probe = &session.engine().probe(1800.0)[0];
    assert_eq!((probe.left_hz, probe.right_hz), (427.75, 436.25));

    clock.set(3600.0);
    session.tick().unwrap();
    assert!(session.state().is_stopped());
    assert_eq!(session.state().elapsed_ms, 0.0);
    assert_eq!(session.state().current_segment_index, 0);
    assert_eq!(session.engine().connected_voices(), 0);
    assert_eq!(session.drain_events().last(), Some(&SessionEvent::Stopped));
}

#[test]
fn test_full_session_at_tick_rate() {
    let (mut session, clock) = session("4hz 1min, 8hz 1min, 6hz 1min");
    session.start().unwrap();

    let mut events = session.drain_events();
    let mut max_voices = 0;
    for tick in 1..=1801 {
        clock.set(tick as f64 * 0.1);
        session.tick().unwrap();
        max_voices = max_voices.max(session.engine().connected_voices());
        events.extend(session.drain_events());
    }

    let segments: Vec<usize> = events
        .iter()
        .filter_map(|e| match e {
            SessionEvent::SegmentChanged { index, .. } => Some(*index),
            _ => None,
        })
        .collect();
    assert_eq!(segments, vec![0, 1, 2]);
    assert!(max_voices <= 2, "at most two voices alive, saw {}", max_voices);
    assert_eq!(events.last(), Some(&SessionEvent::Stopped));
    assert_eq!(session.engine().connected_voices(), 0);
}

#[test]
fn test_crossfade_dips_to_gain_floor_between_fades() {
    let (mut session, clock) = session("4hz 1min, 8hz 1min");
    session.start().unwrap();
    clock.set(60.0);
    session.tick().unwrap();

    // Fade-out runs 60..61 while the incoming voice already sounds at the floor
    let probes = session.engine().probe(60.5);
    assert_eq!(probes.len(), 2);
    assert!(probes.iter().all(|p| p.sounding));
    let block = session.engine().render_block(60_000, 500).unwrap();
    assert!(block.channel(0).iter().any(|s| s.abs() > 0.5));

    // Outgoing voice retired at 61; fade-in does not begin until 62
    clock.set(61.05);
    session.tick().unwrap();
    assert_eq!(session.engine().connected_voices(), 1);
    let dip = session.engine().render_block(61_100, 800).unwrap();
    let peak = dip
        .channel(0)
        .iter()
        .chain(dip.channel(1))
        .fold(0.0_f32, |peak, s| peak.max(s.abs()));
    assert!(peak <= 0.001 + 1e-6, "dip peak {}", peak);
    assert!(peak > 0.0005, "incoming voice is silent, peak {}", peak);

    // Full level once the fade-in completes at 63
    let after = session.engine().render_block(63_000, 500).unwrap();
    assert!(after.channel(0).iter().any(|s| s.abs() > 0.5));
}

// === Pause / Resume / Stop ===

#[test]
fn test_pause_during_crossfade_then_resume() {
    let (mut session, clock) = session("4hz 1min, 8hz 1min");
    session.start().unwrap();
    clock.set(60.0);
    session.tick().unwrap();
    assert!(session.state().is_crossfading);

    clock.set(60.5);
    session.tick().unwrap();
    session.pause();
    clock.set(100.0);
    session.tick().unwrap();
    assert!(session.state().is_paused());
    assert!(session.state().is_crossfading);

    session.resume();
    // 39.5 s were spent paused, so the commit is due at clock 63.1 + 39.5
    clock.set(102.5);
    session.tick().unwrap();
    assert!(session.state().is_crossfading);

    clock.set(102.7);
    session.tick().unwrap();
    assert!(!session.state().is_crossfading);
    assert_eq!(session.state().current_segment_index, 1);
    assert!((session.state().elapsed_ms - 63_200.0).abs() < 1e-6);
}

#[test]
fn test_stop_mid_crossfade_leaves_nothing_behind() {
    let (mut session, clock) = session("4hz 1min, 8hz 1min");
    session.start().unwrap();
    clock.set(60.0);
    session.tick().unwrap();
    clock.set(60.5);
    session.tick().unwrap();

    session.stop();
    assert_eq!(session.engine().connected_voices(), 0);
    assert!(!session.state().is_crossfading);

    // No stale commit after stop, and a fresh start begins at segment 0
    clock.set(70.0);
    session.tick().unwrap();
    session.drain_events();
    session.start().unwrap();
    let events = session.drain_events();
    assert!(matches!(
        events.first(),
        Some(SessionEvent::SegmentChanged { index: 0, .. })
    ));
    assert_eq!(session.engine().connected_voices(), 1);
    assert_eq!(session.state().current_segment_index, 0);
}

#[test]
fn test_base_tone_override() {
    let clock = ManualClock::new();
    let engine = SoftwareEngine::new(clock, 1000);
    let config = SessionConfig::default().with_base_tone(200.0);
    let mut session = PlaybackSession::from_instructions(engine, "10hz 1min", config).unwrap();
    session.start().unwrap();

    let probe = &session.engine().probe(0.0)[0];
    assert_eq!((probe.left_hz, probe.right_hz), (195.0, 205.0));
}
