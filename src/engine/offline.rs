//! Offline (non-realtime) rendering on the software voice graph

use log::debug;

use super::buffer::SampleBuffer;
use super::graph::{SharedGraph, SineVoice, VoiceGraph};
use super::voice::{OfflineBackend, OfflineContext};
use crate::error::{BinauralError, Result};

/// Offline backend built on [`VoiceGraph`]
#[derive(Debug, Clone, Copy, Default)]
pub struct SoftwareOffline;

impl OfflineBackend for SoftwareOffline {
    type Context = SoftwareOfflineContext;

    fn create_context(
        &self,
        num_channels: usize,
        start_frame: u64,
        num_frames: usize,
        sample_rate: u32,
    ) -> Result<SoftwareOfflineContext> {
        if !(1..=2).contains(&num_channels) {
            return Err(BinauralError::RenderFailed {
                reason: format!("{} output channels requested, only 1 or 2 supported", num_channels),
            });
        }
        if sample_rate == 0 {
            return Err(BinauralError::RenderFailed {
                reason: "sample rate must be positive".to_string(),
            });
        }
        Ok(SoftwareOfflineContext {
            graph: VoiceGraph::shared(sample_rate),
            num_channels,
            start_frame,
            num_frames,
            sample_rate,
        })
    }
}

/// One render pass over a fixed frame window
pub struct SoftwareOfflineContext {
    graph: SharedGraph,
    num_channels: usize,
    start_frame: u64,
    num_frames: usize,
    sample_rate: u32,
}

impl OfflineContext for SoftwareOfflineContext {
    type Voice = SineVoice;

    fn create_voice(&mut self) -> Result<SineVoice> {
        Ok(SineVoice::create(&self.graph))
    }

    fn render(self, on_block: &mut dyn FnMut(usize, usize)) -> Result<SampleBuffer> {
        let mut output = SampleBuffer::silent(self.num_channels, self.num_frames, self.sample_rate)?;
        let block = (self.sample_rate as usize).max(1);
        let graph = self.graph.borrow();
        debug!(
            "Offline render: {} voices, {} frames from frame {}",
            graph.connected(),
            self.num_frames,
            self.start_frame
        );

        let mut scratch = vec![Vec::new(); self.num_channels];
        let mut done = 0;
        while done < self.num_frames {
            let len = block.min(self.num_frames - done);
            for channel in scratch.iter_mut() {
                channel.clear();
                channel.resize(len, 0.0);
            }
            graph.render_into(self.start_frame + done as u64, &mut scratch);
            for (dst, src) in output.samples.iter_mut().zip(&scratch) {
                dst[done..done + len].copy_from_slice(src);
            }
            done += len;
            on_block(done, self.num_frames);
        }

        Ok(output)
    }
}
