//! CLI Command Implementations
//!
//! Implements the actual logic for each CLI command.

use std::io::{self, Write};
use std::path::Path;
use std::time::Duration;

use log::{info, warn};

use crate::config::SessionConfig;
use crate::engine::{SoftwareEngine, SystemClock};
use crate::error::{BinauralError, Result};
use crate::events::{format_clock, SessionEvent};
use crate::export::ExportSession;
use crate::playback::PlaybackSession;
use crate::timeline::{parse_report, Timeline};

/// Load the configuration file if one was given, defaults otherwise.
pub fn load_config(path: Option<&Path>) -> Result<SessionConfig> {
    match path {
        Some(path) => {
            info!("Loading configuration: {}", path.display());
            SessionConfig::load(path)
        }
        None => Ok(SessionConfig::default()),
    }
}

/// Parse instructions and print the segments.
pub fn parse_instructions(instructions: &str, json: bool) -> Result<()> {
    let report = parse_report(instructions);
    for token in &report.rejected {
        warn!("Skipped unrecognised token: {:?}", token);
    }

    let timeline = Timeline::new(report.segments)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&timeline)?);
        return Ok(());
    }

    println!("Segments:");
    println!("{:-<60}", "");
    for (i, segment) in timeline.segments().iter().enumerate() {
        println!(
            "{:>3}. {:<32} starts at {}",
            i + 1,
            segment.describe(),
            format_clock(timeline.segment_start_ms(i) as f64)
        );
    }
    println!("{:-<60}", "");
    println!(
        "Total: {} | Skipped tokens: {}",
        format_clock(timeline.total_duration_ms() as f64),
        report.rejected.len()
    );

    Ok(())
}

/// Run a playback session on the software engine and print its events.
///
/// No audio device is attached; the session clock runs `speed` times faster
/// than realtime so long sessions can be followed quickly.
pub fn play(
    config: SessionConfig,
    instructions: &str,
    speed: f64,
    base_tone: Option<f64>,
) -> Result<()> {
    if !(speed > 0.0) {
        return Err(BinauralError::InvalidConfig {
            reason: format!("speed must be positive, got {}", speed),
        });
    }
    let config = apply_base_tone(config, base_tone);
    config.validate()?;

    let engine = SoftwareEngine::new(SystemClock::with_speed(speed), config.sample_rate);
    let mut session = PlaybackSession::from_instructions(engine, instructions, config)?;
    info!("Playing session {} at {}x", session.id(), speed);

    let pace = Duration::from_secs_f64(session.config().tick_interval_ms as f64 / 1000.0 / speed)
        .max(Duration::from_millis(1));
    // Generous ceiling in case the clock stalls
    let limit = Duration::from_secs_f64(session.timeline().total_duration_secs() / speed + 10.0);

    session.start()?;
    let mut line = LiveLine::default();
    session.run_for(limit, pace, |event| line.show(&event))?;
    session.stop();
    println!();

    Ok(())
}

/// Export a session to WAV and print a checksum per file.
pub fn export(
    config: SessionConfig,
    instructions: &str,
    output_dir: &Path,
    base_tone: Option<f64>,
) -> Result<()> {
    let config = apply_base_tone(config, base_tone);
    let session = ExportSession::from_instructions(instructions, config, output_dir)?;
    info!("Exporting session {} to {}", session.id(), output_dir.display());

    let files = session.run(&mut |event| match event {
        SessionEvent::Progress { percent } => {
            print!("\r{:>3.0}%", percent);
            let _ = io::stdout().flush();
        }
        SessionEvent::Status(message) => println!("\r{}", message),
        SessionEvent::Error(message) => eprintln!("\r{}", message),
        SessionEvent::Complete => println!("\rExport complete"),
        _ => {}
    })?;

    println!("{:-<60}", "");
    for file in &files {
        println!("{}", file.path.display());
        println!("  frames: {} | bytes: {}", file.num_frames, file.size_bytes);
        println!("  sha256: {}", file.sha256);
    }

    Ok(())
}

fn apply_base_tone(config: SessionConfig, base_tone: Option<f64>) -> SessionConfig {
    match base_tone {
        Some(hz) => config.with_base_tone(hz),
        None => config,
    }
}

/// Single status line that is rewritten in place
#[derive(Default)]
struct LiveLine {
    time: String,
    frequency: String,
}

impl LiveLine {
    fn show(&mut self, event: &SessionEvent) {
        match event {
            SessionEvent::SegmentChanged { .. } | SessionEvent::Stopped => {
                println!("\r{:<70}", event);
                return;
            }
            SessionEvent::Time { .. } => self.time = event.to_string(),
            SessionEvent::Frequency { .. } => self.frequency = event.to_string(),
            _ => return,
        }
        print!("\r{} | {}", self.time, self.frequency);
        let _ = io::stdout().flush();
    }
}
