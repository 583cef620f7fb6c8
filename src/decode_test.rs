use super::*;
use std::io::Cursor;

/// Build an in-memory 16-bit PCM WAV with a low-frequency sine on every
/// channel.
fn wav_bytes(channels: u16, sample_rate: u32, frames: usize) -> Vec<u8> {
    let spec = hound::WavSpec {
        channels,
        sample_rate,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };

    let mut cursor = Cursor::new(Vec::new());
    {
        let mut writer = hound::WavWriter::new(&mut cursor, spec).unwrap();
        for i in 0..frames {
            let sample = ((i as f32 * 0.05).sin() * 8000.0) as i16;
            for _ in 0..channels {
                writer.write_sample(sample).unwrap();
            }
        }
        writer.finalize().unwrap();
    }
    cursor.into_inner()
}

#[test]
fn test_decode_mono_wav() {
    let bytes = wav_bytes(1, 22050, 4410);

    let buffer = decode_bytes(&bytes).unwrap();

    assert_eq!(buffer.sample_rate, 22050);
    assert_eq!(buffer.samples.len(), 4410);
}

#[test]
fn test_decode_preserves_native_rate() {
    let bytes = wav_bytes(1, 44100, 1000);

    let buffer = decode_bytes(&bytes).unwrap();

    assert_eq!(buffer.sample_rate, 44100);
}

#[test]
fn test_decode_stereo_downmixes_to_mono() {
    let bytes = wav_bytes(2, 16000, 2000);

    let buffer = decode_bytes(&bytes).unwrap();

    // One mono sample per stereo frame
    assert_eq!(buffer.samples.len(), 2000);
}

#[test]
fn test_decode_garbage_bytes_fails() {
    let garbage = vec![0xDE, 0xAD, 0xBE, 0xEF, 0x00, 0x01, 0x02, 0x03];

    let result = decode_bytes(&garbage);

    assert!(matches!(result, Err(PipelineError::Decode(_))));
}

#[test]
fn test_decode_empty_input_fails() {
    let result = decode_bytes(&[]);

    assert!(result.is_err());
}

#[test]
fn test_decode_wav_without_frames_fails() {
    let bytes = wav_bytes(1, 16000, 0);

    let result = decode_bytes(&bytes);

    assert!(matches!(result, Err(PipelineError::Decode(_))));
}

#[tokio::test]
async fn test_decoder_trait_decodes_off_thread() {
    let bytes = wav_bytes(1, 16000, 1600);

    let buffer = SymphoniaDecoder.decode(&bytes).await.unwrap();

    assert_eq!(buffer.sample_rate, 16000);
    assert_eq!(buffer.samples.len(), 1600);
}
