//! 16-bit PCM WAV encoding
//!
//! Canonical 44-byte RIFF/WAVE header followed by interleaved little-endian
//! `i16` samples. Every sample is clamped to [-1, 1], attenuated by the
//! limiter, scaled by 32767 and rounded.
//!
//! Long exports never hold a whole file in memory: [`WavStreamWriter`]
//! writes the header for a known frame count up front and then appends one
//! chunk body at a time. The bytes are identical to encoding the
//! concatenated chunks in one go.

use std::io::Write;

use log::debug;

use crate::engine::SampleBuffer;
use crate::error::{BinauralError, Result};

/// Size of the canonical PCM header
pub const HEADER_LEN: usize = 44;

/// Output attenuation applied when no limiter is configured
pub const DEFAULT_LIMITER: f32 = 0.98;

const BITS_PER_SAMPLE: u16 = 16;
const BYTES_PER_SAMPLE: u64 = 2;
const PCM_FORMAT: u16 = 1;

/// Quantize one float sample to 16 bits
#[inline]
pub fn quantize(sample: f32, limiter: f32) -> i16 {
    (sample.clamp(-1.0, 1.0) * limiter * 32767.0).round() as i16
}

/// Build the 44-byte header for `num_frames` frames
///
/// # Errors
/// * `SessionTooLong` - the data size does not fit the 32-bit RIFF fields
pub fn header(num_channels: u16, sample_rate: u32, num_frames: u64) -> Result<[u8; HEADER_LEN]> {
    let block_align = num_channels as u64 * BYTES_PER_SAMPLE;
    let data_len = num_frames
        .checked_mul(block_align)
        .filter(|&len| len <= u32::MAX as u64 - 36)
        .ok_or_else(|| BinauralError::SessionTooLong {
            duration_secs: num_frames as f64 / sample_rate.max(1) as f64,
        })? as u32;
    let byte_rate = sample_rate * block_align as u32;

    let mut out = [0u8; HEADER_LEN];
    out[0..4].copy_from_slice(b"RIFF");
    out[4..8].copy_from_slice(&(36 + data_len).to_le_bytes());
    out[8..12].copy_from_slice(b"WAVE");
    out[12..16].copy_from_slice(b"fmt ");
    out[16..20].copy_from_slice(&16u32.to_le_bytes());
    out[20..22].copy_from_slice(&PCM_FORMAT.to_le_bytes());
    out[22..24].copy_from_slice(&num_channels.to_le_bytes());
    out[24..28].copy_from_slice(&sample_rate.to_le_bytes());
    out[28..32].copy_from_slice(&byte_rate.to_le_bytes());
    out[32..34].copy_from_slice(&(block_align as u16).to_le_bytes());
    out[34..36].copy_from_slice(&BITS_PER_SAMPLE.to_le_bytes());
    out[36..40].copy_from_slice(b"data");
    out[40..44].copy_from_slice(&data_len.to_le_bytes());
    Ok(out)
}

/// Encode a buffer as a complete WAV file with the default limiter
pub fn encode(buffer: &SampleBuffer) -> Result<Vec<u8>> {
    encode_with_limiter(buffer, DEFAULT_LIMITER)
}

pub fn encode_with_limiter(buffer: &SampleBuffer, limiter: f32) -> Result<Vec<u8>> {
    let num_frames = buffer.num_frames();
    let header = header(
        buffer.num_channels() as u16,
        buffer.sample_rate(),
        num_frames as u64,
    )?;

    let mut out = Vec::with_capacity(HEADER_LEN + num_frames * buffer.num_channels() * 2);
    out.extend_from_slice(&header);
    encode_body(buffer, limiter, &mut out);
    Ok(out)
}

/// Append the interleaved sample data of `buffer` to `out`
pub fn encode_body(buffer: &SampleBuffer, limiter: f32, out: &mut Vec<u8>) {
    match buffer.num_channels() {
        2 => {
            // Stereo fast path
            let (left, right) = (buffer.channel(0), buffer.channel(1));
            out.reserve(left.len() * 4);
            for (&l, &r) in left.iter().zip(right) {
                out.extend_from_slice(&quantize(l, limiter).to_le_bytes());
                out.extend_from_slice(&quantize(r, limiter).to_le_bytes());
            }
        }
        channels => {
            let num_frames = buffer.num_frames();
            out.reserve(num_frames * channels * 2);
            for frame in 0..num_frames {
                for channel in &buffer.samples {
                    out.extend_from_slice(&quantize(channel[frame], limiter).to_le_bytes());
                }
            }
        }
    }
}

/// Channel-major concatenation of chunk buffers
pub fn concat_chunks(chunks: &[SampleBuffer]) -> Result<SampleBuffer> {
    let sample_rate = chunks.first().map_or(0, SampleBuffer::sample_rate);
    let mut joined = SampleBuffer::from_channels(Vec::new(), sample_rate);
    for chunk in chunks {
        joined.append(chunk)?;
    }
    Ok(joined)
}

/// Streaming WAV writer for a file whose frame count is known up front
pub struct WavStreamWriter<W: Write> {
    inner: W,
    num_channels: usize,
    sample_rate: u32,
    limiter: f32,
    total_frames: u64,
    frames_written: u64,
    scratch: Vec<u8>,
}

impl<W: Write> WavStreamWriter<W> {
    /// Write the header for `total_frames` frames
    pub fn new(
        mut inner: W,
        num_channels: u16,
        sample_rate: u32,
        total_frames: u64,
        limiter: f32,
    ) -> Result<Self> {
        inner.write_all(&header(num_channels, sample_rate, total_frames)?)?;
        Ok(Self {
            inner,
            num_channels: num_channels as usize,
            sample_rate,
            limiter,
            total_frames,
            frames_written: 0,
            scratch: Vec::new(),
        })
    }

    pub fn frames_written(&self) -> u64 {
        self.frames_written
    }

    pub fn frames_remaining(&self) -> u64 {
        self.total_frames - self.frames_written
    }

    /// Append one chunk body
    ///
    /// # Errors
    /// * `RenderFailed` - layout mismatch or more frames than the header announced
    pub fn write_chunk(&mut self, chunk: &SampleBuffer) -> Result<()> {
        if chunk.num_channels() != self.num_channels || chunk.sample_rate() != self.sample_rate {
            return Err(BinauralError::RenderFailed {
                reason: format!(
                    "chunk layout {}ch/{}Hz does not match file {}ch/{}Hz",
                    chunk.num_channels(),
                    chunk.sample_rate(),
                    self.num_channels,
                    self.sample_rate
                ),
            });
        }
        let frames = chunk.num_frames() as u64;
        if frames > self.frames_remaining() {
            return Err(BinauralError::RenderFailed {
                reason: format!(
                    "chunk of {} frames overflows file ({} of {} written)",
                    frames, self.frames_written, self.total_frames
                ),
            });
        }

        self.scratch.clear();
        encode_body(chunk, self.limiter, &mut self.scratch);
        self.inner.write_all(&self.scratch)?;
        self.frames_written += frames;
        Ok(())
    }

    /// Flush and hand back the sink once every announced frame is written
    pub fn finish(mut self) -> Result<W> {
        if self.frames_written != self.total_frames {
            return Err(BinauralError::RenderFailed {
                reason: format!(
                    "file incomplete: {} of {} frames written",
                    self.frames_written, self.total_frames
                ),
            });
        }
        self.inner.flush()?;
        debug!("WAV stream finished: {} frames", self.total_frames);
        Ok(self.inner)
    }
}
