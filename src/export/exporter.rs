//! Export session
//!
//! Renders a whole session to one or more WAV files. Each file is written
//! chunk by chunk into a temporary file in the output directory and only
//! renamed into place once every frame is on disk, so a failed render never
//! leaves a truncated WAV behind.

use std::fs;
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};

use chrono::Local;
use serde::Serialize;
use sha2::{Digest, Sha256};
use tempfile::NamedTempFile;
use tracing::{error, info, instrument};
use uuid::Uuid;

use super::plan::{ExportPlan, FilePlan};
use super::renderer::ChunkRenderer;
use super::wav::WavStreamWriter;
use crate::config::SessionConfig;
use crate::engine::{OfflineBackend, SoftwareOffline};
use crate::error::{BinauralError, Result};
use crate::events::SessionEvent;
use crate::timeline::Timeline;

/// A finished output file
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExportedFile {
    pub path: PathBuf,
    pub part: Option<usize>,
    pub num_frames: u64,
    pub size_bytes: u64,
    /// Lowercase hex SHA-256 of the file contents
    pub sha256: String,
}

/// One export request
pub struct ExportSession<B: OfflineBackend = SoftwareOffline> {
    id: Uuid,
    timeline: Timeline,
    renderer: ChunkRenderer<B>,
    output_dir: PathBuf,
}

impl ExportSession<SoftwareOffline> {
    pub fn new(timeline: Timeline, config: SessionConfig, output_dir: impl Into<PathBuf>) -> Self {
        Self::with_backend(SoftwareOffline, timeline, config, output_dir)
    }

    /// Parse `instructions` and build an export on the software backend
    ///
    /// # Errors
    /// * `EmptySession` - no instruction could be parsed
    pub fn from_instructions(
        instructions: &str,
        config: SessionConfig,
        output_dir: impl Into<PathBuf>,
    ) -> Result<Self> {
        Ok(Self::new(Timeline::parse(instructions)?, config, output_dir))
    }
}

impl<B: OfflineBackend> ExportSession<B> {
    pub fn with_backend(
        backend: B,
        timeline: Timeline,
        config: SessionConfig,
        output_dir: impl Into<PathBuf>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            timeline,
            renderer: ChunkRenderer::new(backend, config),
            output_dir: output_dir.into(),
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn timeline(&self) -> &Timeline {
        &self.timeline
    }

    pub fn config(&self) -> &SessionConfig {
        self.renderer.config()
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    /// File and chunk layout this export would use if run now
    pub fn plan(&self) -> Result<ExportPlan> {
        ExportPlan::new(&self.timeline, self.config(), &Local::now())
    }

    /// Render every file, reporting through `on_event`
    ///
    /// Ends with `Complete` on success. On failure an `Error` event carries
    /// the user-facing message, the file being written is discarded and the
    /// error is returned.
    #[instrument(skip_all, fields(session = %self.id))]
    pub fn run(&self, on_event: &mut dyn FnMut(SessionEvent)) -> Result<Vec<ExportedFile>> {
        match self.run_inner(on_event) {
            Ok(files) => {
                on_event(SessionEvent::Progress { percent: 100.0 });
                on_event(SessionEvent::Complete);
                info!(files = files.len(), "Export complete");
                Ok(files)
            }
            Err(e) => {
                error!(code = e.error_code(), "Export failed: {}", e);
                on_event(SessionEvent::Error(export_error_message(&e)));
                Err(e)
            }
        }
    }

    fn run_inner(&self, on_event: &mut dyn FnMut(SessionEvent)) -> Result<Vec<ExportedFile>> {
        self.config().validate()?;
        fs::create_dir_all(&self.output_dir)?;

        let plan = self.plan()?;
        info!(
            files = plan.files.len(),
            chunks = plan.chunk_count(),
            frames = plan.total_frames,
            "Export planned"
        );

        let mut progress = ProgressTracker::new(plan.total_frames);
        let mut exported = Vec::with_capacity(plan.files.len());
        for file in &plan.files {
            exported.push(self.write_file(&plan, file, &mut progress, on_event)?);
        }
        Ok(exported)
    }

    fn write_file(
        &self,
        plan: &ExportPlan,
        file: &FilePlan,
        progress: &mut ProgressTracker,
        on_event: &mut dyn FnMut(SessionEvent),
    ) -> Result<ExportedFile> {
        let config = self.config();
        let part_label = match file.part {
            Some(n) => format!("part {}/{}", n, plan.files.len()),
            None => "file".to_string(),
        };

        // Dropping the temp file on any early return deletes it
        let temp = NamedTempFile::new_in(&self.output_dir)?;
        let sink = DigestWriter::new(BufWriter::new(temp));
        let mut writer = WavStreamWriter::new(
            sink,
            2,
            plan.sample_rate,
            file.num_frames,
            config.limiter as f32,
        )?;

        for (index, chunk) in file.chunks.iter().enumerate() {
            on_event(SessionEvent::Status(format!(
                "Rendering {} chunk {}/{}...",
                part_label,
                index + 1,
                file.chunks.len()
            )));

            let rendered = self.renderer.render_frames(
                &self.timeline,
                chunk.start_frame,
                chunk.num_frames,
                config.base_tone_hz,
                &mut |fraction| {
                    if let Some(percent) = progress.update(chunk.num_frames, fraction) {
                        on_event(SessionEvent::Progress { percent });
                    }
                },
            )?;
            writer.write_chunk(&rendered.buffer)?;
            progress.finish_chunk(chunk.num_frames);
        }

        let sink = writer.finish()?;
        let (buffered, digest, size_bytes) = sink.into_parts();
        let temp = buffered.into_inner().map_err(|e| e.into_error())?;

        let path = self.output_dir.join(&file.file_name);
        temp.persist(&path).map_err(|e| BinauralError::Io(e.error))?;
        info!(path = %path.display(), size_bytes, "Wrote export file");
        on_event(SessionEvent::Status(format!("Saved {}", file.file_name)));

        Ok(ExportedFile {
            path,
            part: file.part,
            num_frames: file.num_frames,
            size_bytes,
            sha256: digest,
        })
    }
}

/// Status line shown when an export fails
pub fn export_error_message(error: &BinauralError) -> String {
    let message = match error {
        BinauralError::RenderFailed { reason } => reason.clone(),
        other => other.to_string(),
    };
    format!("Error: {}. Try smaller duration.", message)
}

/// Overall export progress from per-chunk render fractions
struct ProgressTracker {
    total_frames: u64,
    done_frames: u64,
    last_percent: Option<u32>,
}

impl ProgressTracker {
    fn new(total_frames: u64) -> Self {
        Self {
            total_frames: total_frames.max(1),
            done_frames: 0,
            last_percent: None,
        }
    }

    /// Whole percent to report, if it changed
    fn update(&mut self, chunk_frames: u64, fraction: f64) -> Option<f64> {
        let frames = self.done_frames as f64 + chunk_frames as f64 * fraction.clamp(0.0, 1.0);
        let percent = (frames / self.total_frames as f64 * 100.0).floor() as u32;
        if self.last_percent == Some(percent) {
            return None;
        }
        self.last_percent = Some(percent);
        Some(percent as f64)
    }

    fn finish_chunk(&mut self, chunk_frames: u64) {
        self.done_frames += chunk_frames;
    }
}

/// Writer that hashes and counts everything passing through it
struct DigestWriter<W: Write> {
    inner: W,
    hasher: Sha256,
    bytes: u64,
}

impl<W: Write> DigestWriter<W> {
    fn new(inner: W) -> Self {
        Self {
            inner,
            hasher: Sha256::new(),
            bytes: 0,
        }
    }

    fn into_parts(self) -> (W, String, u64) {
        (self.inner, format!("{:x}", self.hasher.finalize()), self.bytes)
    }
}

impl<W: Write> Write for DigestWriter<W> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let written = self.inner.write(buf)?;
        self.hasher.update(&buf[..written]);
        self.bytes += written as u64;
        Ok(written)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.inner.flush()
    }
}
