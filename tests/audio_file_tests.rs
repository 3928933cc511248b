// Integration tests for WAV file input
//
// Fixtures are generated into a temp directory so the tests do not depend on
// checked-in audio.

use anyhow::Result;
use soundtrack_finder::audio::{
    AudioBackend, AudioBackendConfig, AudioCapture, AudioFile, AudioSource, BackendCapture,
    FileBackend,
};
use std::io::Cursor;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tempfile::TempDir;

fn write_wav(dir: &Path, name: &str, spec: hound::WavSpec, frames: usize) -> Result<PathBuf> {
    let path = dir.join(name);
    let mut writer = hound::WavWriter::create(&path, spec)?;
    for i in 0..frames * spec.channels as usize {
        let value = ((i % 200) as i32 - 100) * 100;
        match (spec.sample_format, spec.bits_per_sample) {
            (hound::SampleFormat::Float, _) => writer.write_sample(value as f32 / 32768.0)?,
            (_, 16) => writer.write_sample(value as i16)?,
            (_, 24) => writer.write_sample(value << 8)?,
            _ => unreachable!("unused fixture format"),
        }
    }
    writer.finalize()?;
    Ok(path)
}

fn spec(sample_rate: u32, channels: u16, bits: u16, format: hound::SampleFormat) -> hound::WavSpec {
    hound::WavSpec {
        channels,
        sample_rate,
        bits_per_sample: bits,
        sample_format: format,
    }
}

#[test]
fn test_audio_file_open() -> Result<()> {
    let dir = TempDir::new()?;
    let path = write_wav(dir.path(), "mono.wav", spec(16000, 1, 16, hound::SampleFormat::Int), 8000)?;

    let audio = AudioFile::open(&path)?;

    assert_eq!(audio.sample_rate, 16000);
    assert_eq!(audio.channels, 1);
    assert_eq!(audio.samples.len(), 8000);
    assert!((audio.duration_seconds - 0.5).abs() < 1e-9);
    assert!(audio.path.contains("mono.wav"));

    Ok(())
}

#[test]
fn test_audio_file_nonexistent() {
    let result = AudioFile::open("/nonexistent/path/to/audio.wav");
    assert!(result.is_err(), "Opening nonexistent file should fail");
}

#[test]
fn test_audio_file_not_a_wav() -> Result<()> {
    let dir = TempDir::new()?;
    let path = dir.path().join("notes.wav");
    std::fs::write(&path, b"definitely not RIFF data")?;

    assert!(AudioFile::open(&path).is_err());
    Ok(())
}

#[test]
fn test_audio_file_24_bit_is_scaled_to_i16() -> Result<()> {
    let dir = TempDir::new()?;
    let path = write_wav(dir.path(), "deep.wav", spec(44100, 1, 24, hound::SampleFormat::Int), 300)?;

    let audio = AudioFile::open(&path)?;

    // Fixture writes value << 8 at 24 bits, which scales back to value
    assert_eq!(audio.samples[0], -10000);
    assert_eq!(audio.samples[150], 5000);

    Ok(())
}

#[test]
fn test_audio_file_float_is_converted() -> Result<()> {
    let dir = TempDir::new()?;
    let path = write_wav(dir.path(), "float.wav", spec(44100, 2, 32, hound::SampleFormat::Float), 100)?;

    let audio = AudioFile::open(&path)?;

    assert_eq!(audio.channels, 2);
    assert_eq!(audio.samples.len(), 200);
    assert!(audio.samples.iter().all(|s| s.abs() <= 10000));

    Ok(())
}

#[tokio::test]
async fn test_file_backend_replays_in_target_format() -> Result<()> {
    let dir = TempDir::new()?;
    // 1 second of 88.2kHz stereo → 44.1kHz mono after conversion
    let path = write_wav(dir.path(), "stereo.wav", spec(88200, 2, 16, hound::SampleFormat::Int), 88200)?;

    let mut backend = FileBackend::open(&path, AudioBackendConfig::default())?;
    let mut rx = backend.start().await?;
    assert!(backend.is_capturing());

    let mut frames = Vec::new();
    while let Some(frame) = rx.recv().await {
        frames.push(frame);
    }

    assert_eq!(frames.len(), 10, "1 second in 100ms frames");
    assert!(frames.iter().all(|f| f.sample_rate == 44100 && f.channels == 1));
    assert_eq!(frames[3].timestamp_ms, 300);
    let total: usize = frames.iter().map(|f| f.samples.len()).sum();
    assert_eq!(total, 44100);

    backend.stop().await?;
    assert!(!backend.is_capturing());

    Ok(())
}

#[tokio::test]
async fn test_file_backend_cannot_restart() -> Result<()> {
    let dir = TempDir::new()?;
    let path = write_wav(dir.path(), "once.wav", spec(16000, 1, 16, hound::SampleFormat::Int), 1600)?;

    let mut backend = FileBackend::open(&path, AudioBackendConfig::default())?;
    let _rx = backend.start().await?;
    assert!(backend.start().await.is_err(), "second start while capturing should fail");

    backend.stop().await?;
    assert!(backend.start().await.is_err(), "file is only replayed once");

    Ok(())
}

#[tokio::test]
async fn test_file_capture_yields_one_capped_clip_in_target_format() -> Result<()> {
    let dir = TempDir::new()?;
    let path = dir.path().join("song.wav");

    // 3 seconds of a quiet 440Hz tone, 48kHz stereo
    let mut writer = hound::WavWriter::create(&path, spec(48000, 2, 16, hound::SampleFormat::Int))?;
    for i in 0..48000 * 3 {
        let t = i as f32 / 48000.0;
        let value = (6000.0 * (2.0 * std::f32::consts::PI * 440.0 * t).sin()) as i16;
        writer.write_sample(value)?;
        writer.write_sample(value)?;
    }
    writer.finalize()?;

    let config = AudioBackendConfig {
        target_sample_rate: 16000,
        target_channels: 1,
        buffer_duration_ms: 100,
    };
    let capture = BackendCapture::new(AudioSource::File(path), config);

    let clip = capture.capture(Duration::from_secs(1)).await?;

    let reader = hound::WavReader::new(Cursor::new(clip.bytes.clone()))?;
    let wav = reader.spec();
    assert_eq!(wav.sample_rate, 16000);
    assert_eq!(wav.channels, 1);
    assert_eq!(wav.bits_per_sample, 16);

    let samples = reader.into_samples::<i16>().collect::<Result<Vec<_>, _>>()?;
    assert_eq!(samples.len(), 16000, "capped at one second");
    assert_eq!(clip.duration_ms, 1000);

    let peak = samples.iter().map(|&s| (s as i32).abs()).max().unwrap_or(0);
    assert_eq!(peak, i16::MAX as i32, "clip is peak-normalized");

    // Each capture opens and releases its own backend, so a second one works
    let again = capture.capture(Duration::from_secs(1)).await?;
    assert_eq!(again.duration_ms, 1000);

    Ok(())
}

#[tokio::test]
async fn test_file_capture_reports_missing_file() {
    let capture = BackendCapture::new(
        AudioSource::File("/nonexistent/clip.wav".into()),
        AudioBackendConfig::default(),
    );

    let result = capture.capture(Duration::from_secs(1)).await;

    assert!(matches!(result, Err(soundtrack_finder::CaptureError::File { .. })));
}
