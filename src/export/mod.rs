//! Offline export
//!
//! - File and chunk planning (`_part<N>` splitting, chunk lengths)
//! - Chunk rendering on an offline backend
//! - Streaming 16-bit PCM WAV encoding
//! - Export sessions writing checksummed files atomically

pub mod exporter;
pub mod plan;
pub mod renderer;
pub mod wav;

pub use exporter::{export_error_message, ExportSession, ExportedFile};
pub use plan::{file_name, ChunkPlan, ExportPlan, FilePlan};
pub use renderer::{ChunkRenderer, RenderChunk};
pub use wav::{concat_chunks, encode, encode_with_limiter, WavStreamWriter};
