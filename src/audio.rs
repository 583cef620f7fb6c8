//! Audio buffers and resampling.
//!
//! Decoded uploads arrive as mono f32 PCM at the container's native rate;
//! the resampler brings them to the rate speech models expect.

use anyhow::{Context, Result};
use audioadapter_buffers::direct::SequentialSliceOfVecs;
use rubato::audioadapter::Adapter;
use rubato::{Fft, FixedSync, Resampler};

/// Sample rate expected by the speech recognition models.
pub const MODEL_SAMPLE_RATE: u32 = 16000;

/// Audio buffer containing mono f32 samples at a known sample rate.
#[derive(Debug, Clone)]
pub struct AudioBuffer {
    pub samples: Vec<f32>,
    pub sample_rate: u32,
}

impl AudioBuffer {
    /// Create a new audio buffer.
    pub fn new(samples: Vec<f32>, sample_rate: u32) -> Self {
        Self {
            samples,
            sample_rate,
        }
    }

    /// Duration of the buffer in seconds.
    pub fn duration_secs(&self) -> f32 {
        if self.sample_rate == 0 {
            return 0.0;
        }
        self.samples.len() as f32 / self.sample_rate as f32
    }
}

/// Convert multi-channel interleaved samples to mono by averaging all channels.
pub fn to_mono(samples: &[f32], channels: u16) -> Vec<f32> {
    if channels == 1 {
        return samples.to_vec();
    }

    let channels = channels as usize;
    samples
        .chunks_exact(channels)
        .map(|frame| frame.iter().sum::<f32>() / channels as f32)
        .collect()
}

/// Resampler for converting audio between sample rates.
pub struct AudioResampler {
    resampler: Fft<f32>,
    chunk_size_in: usize,
    ratio: f64,
}

impl AudioResampler {
    /// Create a new resampler.
    ///
    /// # Arguments
    /// * `input_rate` - Input sample rate in Hz
    /// * `output_rate` - Output sample rate in Hz
    /// * `chunk_size` - Number of input samples per processing chunk
    pub fn new(input_rate: u32, output_rate: u32, chunk_size: usize) -> Result<Self> {
        let resampler = Fft::new(
            input_rate as usize,
            output_rate as usize,
            chunk_size,
            1, // sub_chunks
            1, // channels
            FixedSync::Input,
        )
        .context("Failed to create resampler")?;

        Ok(Self {
            resampler,
            chunk_size_in: chunk_size,
            ratio: f64::from(output_rate) / f64::from(input_rate),
        })
    }

    /// Resample a complete buffer in one call.
    ///
    /// The input is zero-padded past the resampler's internal delay so the
    /// tail gets flushed, then the leading delay is trimmed and the output
    /// truncated, so the result covers exactly the input duration.
    pub fn process_all(&mut self, input: &[f32]) -> Result<Vec<f32>> {
        if input.is_empty() {
            return Ok(Vec::new());
        }

        let expected = (input.len() as f64 * self.ratio).round() as usize;
        let delay = self.resampler.output_delay();

        // Enough zero padding to push `delay + expected` frames out
        let flush = (delay as f64 / self.ratio).ceil() as usize + self.chunk_size_in;
        let mut padded = input.to_vec();
        let target_len = (input.len() + flush).div_ceil(self.chunk_size_in) * self.chunk_size_in;
        padded.resize(target_len, 0.0);

        let mut output = Vec::with_capacity(expected + delay + self.chunk_size_in);
        for chunk in padded.chunks_exact(self.chunk_size_in) {
            let input_vecs = vec![chunk.to_vec()];
            let input_adapter =
                SequentialSliceOfVecs::new(&input_vecs, 1, chunk.len()).expect("valid input");
            let resampled = self
                .resampler
                .process(&input_adapter, 0, None)
                .context("Resampling failed")?;

            for frame_idx in 0..resampled.frames() {
                output.push(resampled.read_sample(0, frame_idx).unwrap_or(0.0));
            }
        }

        output.drain(..delay.min(output.len()));
        output.truncate(expected);
        Ok(output)
    }

    /// Get the required input chunk size.
    pub fn chunk_size(&self) -> usize {
        self.chunk_size_in
    }
}

#[cfg(test)]
#[path = "audio_test.rs"]
mod tests;
