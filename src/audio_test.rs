use super::*;

#[test]
fn test_audio_buffer_creation() {
    let samples = vec![0.1, 0.2, 0.3, 0.4];
    let buffer = AudioBuffer::new(samples.clone(), 16000);

    assert_eq!(buffer.samples, samples);
    assert_eq!(buffer.sample_rate, 16000);
}

#[test]
fn test_audio_buffer_duration() {
    // 16000 samples at 16kHz = 1 second
    let samples = vec![0.0; 16000];
    let buffer = AudioBuffer::new(samples, 16000);

    assert!((buffer.duration_secs() - 1.0).abs() < f32::EPSILON);
}

#[test]
fn test_audio_buffer_duration_zero_rate() {
    let buffer = AudioBuffer::new(vec![0.0; 100], 0);

    assert!((buffer.duration_secs() - 0.0).abs() < f32::EPSILON);
}

#[test]
fn test_to_mono_passthrough() {
    let mono = vec![0.1, 0.2, 0.3];
    assert_eq!(to_mono(&mono, 1), mono);
}

#[test]
fn test_to_mono_stereo_average() {
    // Stereo: L=0.2, R=0.4 -> Mono: 0.3
    let stereo = vec![0.2, 0.4, 0.6, 0.8];
    let mono = to_mono(&stereo, 2);

    assert_eq!(mono.len(), 2);
    assert!((mono[0] - 0.3).abs() < f32::EPSILON);
    assert!((mono[1] - 0.7).abs() < f32::EPSILON);
}

#[test]
fn test_to_mono_empty() {
    let mono = to_mono(&[], 2);
    assert!(mono.is_empty());
}

#[test]
fn test_resampler_creation() {
    let resampler = AudioResampler::new(44100, 16000, 1024).unwrap();
    assert_eq!(resampler.chunk_size(), 1024);
}

#[test]
fn test_resampler_empty_input() {
    let mut resampler = AudioResampler::new(44100, 16000, 1024).unwrap();
    let output = resampler.process_all(&[]).unwrap();
    assert!(output.is_empty());
}

#[test]
fn test_resampler_downsample_length() {
    let mut resampler = AudioResampler::new(48000, 16000, 1024).unwrap();

    // One second of 440Hz sine at 48kHz
    let input: Vec<f32> = (0..48000)
        .map(|i| (i as f32 * 440.0 * 2.0 * std::f32::consts::PI / 48000.0).sin())
        .collect();

    let output = resampler.process_all(&input).unwrap();

    // 3:1 ratio, output covers exactly the input duration
    assert_eq!(output.len(), 16000);
}

#[test]
fn test_resampler_partial_chunk_input() {
    let mut resampler = AudioResampler::new(32000, 16000, 1024).unwrap();

    // Input shorter than one chunk still resamples to the expected length
    let input = vec![0.5_f32; 500];
    let output = resampler.process_all(&input).unwrap();

    assert_eq!(output.len(), 250);
}
