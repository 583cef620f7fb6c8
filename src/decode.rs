//! Audio file decoding.
//!
//! Turns encoded audio bytes (WAV, MP3, M4A/AAC, OGG, ...) into mono PCM at
//! the container's native sample rate. Codec work is delegated to symphonia;
//! this module only drives the probe/decode loop and downmixes to mono.

use std::io::Cursor;

use async_trait::async_trait;
use symphonia::core::audio::SampleBuffer;
use symphonia::core::codecs::DecoderOptions;
use symphonia::core::formats::FormatOptions;
use symphonia::core::io::MediaSourceStream;
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;
use tracing::{debug, warn};

use crate::audio::{AudioBuffer, to_mono};
use crate::error::PipelineError;

/// Decodes encoded audio bytes into mono PCM.
#[async_trait]
pub trait AudioDecoder: Send + Sync {
    /// Decode `bytes` to mono f32 samples at the source's native rate.
    async fn decode(&self, bytes: &[u8]) -> Result<AudioBuffer, PipelineError>;
}

/// Symphonia-backed decoder.
pub struct SymphoniaDecoder;

#[async_trait]
impl AudioDecoder for SymphoniaDecoder {
    async fn decode(&self, bytes: &[u8]) -> Result<AudioBuffer, PipelineError> {
        let bytes = bytes.to_vec();
        // Decoding is CPU-bound, keep it off the async workers.
        tokio::task::spawn_blocking(move || decode_bytes(&bytes))
            .await
            .map_err(|e| PipelineError::Decode(format!("decode task failed: {e}")))?
    }
}

fn decode_bytes(data: &[u8]) -> Result<AudioBuffer, PipelineError> {
    let cursor = Cursor::new(data.to_vec());
    let mss = MediaSourceStream::new(Box::new(cursor), Default::default());

    let probed = symphonia::default::get_probe()
        .format(
            &Hint::new(),
            mss,
            &FormatOptions::default(),
            &MetadataOptions::default(),
        )
        .map_err(|e| PipelineError::Decode(format!("probe: {e}")))?;

    let mut format = probed.format;

    let track = format
        .default_track()
        .ok_or_else(|| PipelineError::Decode("no audio track found".to_string()))?;

    let track_id = track.id;
    let codec_params = track.codec_params.clone();
    let source_rate = codec_params
        .sample_rate
        .ok_or_else(|| PipelineError::Decode("unknown sample rate".to_string()))?;

    let mut decoder = symphonia::default::get_codecs()
        .make(&codec_params, &DecoderOptions::default())
        .map_err(|e| PipelineError::Decode(format!("codec: {e}")))?;

    let mut interleaved: Vec<f32> = Vec::new();
    let mut channels: Option<usize> = None;

    loop {
        let packet = match format.next_packet() {
            Ok(p) => p,
            Err(symphonia::core::errors::Error::IoError(ref e))
                if e.kind() == std::io::ErrorKind::UnexpectedEof =>
            {
                break;
            }
            Err(e) => {
                return Err(PipelineError::Decode(format!("packet: {e}")));
            }
        };

        if packet.track_id() != track_id {
            continue;
        }

        let decoded = match decoder.decode(&packet) {
            Ok(d) => d,
            Err(symphonia::core::errors::Error::DecodeError(e)) => {
                warn!(error = %e, "Skipping corrupt audio frame");
                continue;
            }
            Err(e) => {
                return Err(PipelineError::Decode(format!("decode: {e}")));
            }
        };

        let spec = *decoded.spec();
        if decoded.frames() == 0 {
            continue;
        }
        channels.get_or_insert(spec.channels.count());

        let mut sample_buf = SampleBuffer::<f32>::new(decoded.capacity() as u64, spec);
        sample_buf.copy_interleaved_ref(decoded);
        interleaved.extend_from_slice(sample_buf.samples());
    }

    if interleaved.is_empty() {
        return Err(PipelineError::Decode("no audio samples decoded".to_string()));
    }

    let channels = channels.unwrap_or(1);
    let samples = to_mono(&interleaved, channels as u16);

    debug!(
        samples = samples.len(),
        sample_rate = source_rate,
        channels = channels,
        "Audio decoded to mono PCM"
    );

    Ok(AudioBuffer::new(samples, source_rate))
}

#[cfg(test)]
#[path = "decode_test.rs"]
mod tests;
