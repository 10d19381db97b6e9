//! Export Integration Tests
//!
//! Renders sessions to WAV and checks the files with an independent reader.

use std::cell::Cell;
use std::fs;
use std::path::Path;

use binaural::engine::{OfflineBackend, SoftwareOffline, SoftwareOfflineContext};
use binaural::export::{concat_chunks, encode, ChunkRenderer, ExportSession, ExportedFile};
use binaural::{BinauralError, Result, SessionConfig, SessionEvent, Timeline};
use tempfile::tempdir;

fn config() -> SessionConfig {
    SessionConfig {
        sample_rate: 1000,
        chunk_secs: 25.0,
        ..SessionConfig::default()
    }
}

fn export(
    instructions: &str,
    config: SessionConfig,
    dir: &Path,
) -> (Result<Vec<ExportedFile>>, Vec<SessionEvent>) {
    let session = ExportSession::from_instructions(instructions, config, dir).unwrap();
    let mut events = Vec::new();
    let result = session.run(&mut |e| events.push(e));
    (result, events)
}

/// Backend that fails on the n-th context it is asked for
struct FailingBackend {
    calls: Cell<usize>,
    fail_at: usize,
}

impl OfflineBackend for FailingBackend {
    type Context = SoftwareOfflineContext;

    fn create_context(
        &self,
        num_channels: usize,
        start_frame: u64,
        num_frames: usize,
        sample_rate: u32,
    ) -> Result<SoftwareOfflineContext> {
        let call = self.calls.get();
        self.calls.set(call + 1);
        if call == self.fail_at {
            return Err(BinauralError::RenderFailed {
                reason: "render exploded".to_string(),
            });
        }
        SoftwareOffline.create_context(num_channels, start_frame, num_frames, sample_rate)
    }
}

// === File Format ===

#[test]
fn test_export_reads_back_with_hound() {
    let dir = tempdir().unwrap();
    let (result, _) = export("10 to 7hz 1min", config(), dir.path());
    let files = result.unwrap();
    assert_eq!(files.len(), 1);

    let bytes = fs::read(&files[0].path).unwrap();
    assert_eq!(bytes.len(), 44 + 60_000 * 4);
    assert_eq!(u32::from_le_bytes(bytes[4..8].try_into().unwrap()), 36 + 60_000 * 4);
    assert_eq!(u32::from_le_bytes(bytes[40..44].try_into().unwrap()), 60_000 * 4);

    let reader = hound::WavReader::open(&files[0].path).unwrap();
    let spec = reader.spec();
    assert_eq!(spec.channels, 2);
    assert_eq!(spec.sample_rate, 1000);
    assert_eq!(spec.bits_per_sample, 16);
    assert_eq!(spec.sample_format, hound::SampleFormat::Int);
    assert_eq!(reader.duration(), 60_000);

    let peak = reader
        .into_samples::<i16>()
        .map(|s| s.unwrap().unsigned_abs())
        .max()
        .unwrap();
    assert!(peak <= 32112, "limiter keeps peaks at or below 0.98 FS, got {}", peak);
    assert!(peak > 31000);
}

#[test]
fn test_file_name_pattern() {
    let dir = tempdir().unwrap();
    let (result, _) = export("4hz 1min", config(), dir.path());
    let files = result.unwrap();
    let name = files[0].path.file_name().unwrap().to_string_lossy().to_string();

    assert!(name.starts_with("binaural_beats_"));
    assert!(name.ends_with(".wav"));
    assert!(!name.contains("_part"));
    // binaural_beats_YYYYMMDD_HHMM.wav
    assert_eq!(name.len(), "binaural_beats_".len() + 13 + ".wav".len());
}

// === Chunk Stitching ===

#[test]
fn test_two_chunks_encode_like_one() {
    let timeline = Timeline::parse("10 to 7hz 1min, 4hz 1min").unwrap();
    let renderer = ChunkRenderer::software(config());

    let whole = renderer
        .render_chunk(&timeline, 30.0, 20.0, 432.0, &mut |_| {})
        .unwrap();
    let first = renderer
        .render_chunk(&timeline, 30.0, 12.5, 432.0, &mut |_| {})
        .unwrap();
    let second = renderer
        .render_chunk(&timeline, 42.5, 7.5, 432.0, &mut |_| {})
        .unwrap();

    let joined = concat_chunks(&[first.buffer, second.buffer]).unwrap();
    assert_eq!(encode(&joined).unwrap(), encode(&whole.buffer).unwrap());
}

#[test]
fn test_chunked_and_single_pass_exports_match() {
    let instructions = "10 to 7hz 1min, 4hz 1min";
    let chunked_dir = tempdir().unwrap();
    let single_dir = tempdir().unwrap();

    let (chunked, _) = export(instructions, config(), chunked_dir.path());
    let single_config = SessionConfig {
        chunked_export: false,
        ..config()
    };
    let (single, _) = export(instructions, single_config, single_dir.path());

    let chunked = chunked.unwrap();
    let single = single.unwrap();
    assert_eq!(chunked[0].sha256, single[0].sha256);
    assert_eq!(
        fs::read(&chunked[0].path).unwrap(),
        fs::read(&single[0].path).unwrap()
    );
}

// === Multi-File Split ===

#[test]
fn test_long_session_splits_into_parts() {
    let split_dir = tempdir().unwrap();
    let whole_dir = tempdir().unwrap();
    let split_config = SessionConfig {
        max_frames_per_file: 45_000,
        ..config()
    };

    let (parts, events) = export("10 to 7hz 1min, 4hz 1min", split_config, split_dir.path());
    let parts = parts.unwrap();
    assert_eq!(parts.len(), 3);
    assert_eq!(
        parts.iter().map(|f| f.num_frames).collect::<Vec<_>>(),
        vec![45_000, 45_000, 30_000]
    );
    for (i, part) in parts.iter().enumerate() {
        let name = part.path.file_name().unwrap().to_string_lossy().to_string();
        assert!(name.ends_with(&format!("_part{}.wav", i + 1)), "{}", name);
        assert_eq!(part.size_bytes, 44 + part.num_frames * 4);
    }
    assert_eq!(events.last(), Some(&SessionEvent::Complete));

    // Part bodies concatenate to the single-file body
    let (whole, _) = export("10 to 7hz 1min, 4hz 1min", config(), whole_dir.path());
    let whole = fs::read(&whole.unwrap()[0].path).unwrap();
    let mut joined = Vec::new();
    for part in &parts {
        joined.extend_from_slice(&fs::read(&part.path).unwrap()[44..]);
    }
    assert!(joined == whole[44..], "part bodies differ from single-file body");
}

#[test]
fn test_split_disabled_reports_error() {
    let dir = tempdir().unwrap();
    let config = SessionConfig {
        max_frames_per_file: 45_000,
        split_files: false,
        ..config()
    };

    let (result, events) = export("4hz 1min", config, dir.path());
    assert!(matches!(result, Err(BinauralError::SessionTooLong { .. })));
    match events.last() {
        Some(SessionEvent::Error(message)) => {
            assert!(message.starts_with("Error: "));
            assert!(message.ends_with(". Try smaller duration."));
        }
        other => panic!("Expected Error event, got: {:?}", other),
    }
    assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 0);
}

// === Failure Handling ===

#[test]
fn test_render_failure_abandons_file() {
    let dir = tempdir().unwrap();
    let backend = FailingBackend {
        calls: Cell::new(0),
        fail_at: 1,
    };
    let timeline = Timeline::parse("4hz 1min").unwrap();
    let session = ExportSession::with_backend(backend, timeline, config(), dir.path());

    let mut events = Vec::new();
    let result = session.run(&mut |e| events.push(e));

    assert!(matches!(result, Err(BinauralError::RenderFailed { .. })));
    assert_eq!(
        events.last(),
        Some(&SessionEvent::Error(
            "Error: render exploded. Try smaller duration.".to_string()
        ))
    );
    assert!(!events.contains(&SessionEvent::Complete));
    // the temporary file was removed and nothing was persisted
    assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 0);
}

#[test]
fn test_empty_instructions_rejected() {
    let dir = tempdir().unwrap();
    let result = ExportSession::from_instructions("nothing here", config(), dir.path());
    assert!(matches!(result, Err(BinauralError::EmptySession)));
}
