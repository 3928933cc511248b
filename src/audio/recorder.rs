use std::io::Cursor;
use std::time::Duration;

use tokio::time::Instant;
use tracing::{debug, info, warn};

use super::backend::{AudioBackend, AudioFrame};
use super::convert;
use crate::error::CaptureError;

/// One encoded recording, ready for upload
#[derive(Debug, Clone)]
pub struct AudioClip {
    /// Complete WAV file (16-bit PCM)
    pub bytes: Vec<u8>,
    /// Sample rate in Hz
    pub sample_rate: u32,
    /// Number of channels
    pub channels: u16,
    /// Audio length in milliseconds
    pub duration_ms: u64,
}

impl AudioClip {
    pub const MIME_TYPE: &'static str = "audio/wav";

    /// Encode interleaved samples as an in-memory WAV file
    pub fn encode(samples: &[i16], sample_rate: u32, channels: u16) -> Result<Self, CaptureError> {
        let spec = hound::WavSpec {
            channels,
            sample_rate,
            bits_per_sample: 16,
            sample_format: hound::SampleFormat::Int,
        };

        let mut cursor = Cursor::new(Vec::with_capacity(44 + samples.len() * 2));
        {
            let mut writer = hound::WavWriter::new(&mut cursor, spec)?;
            for &sample in samples {
                writer.write_sample(sample)?;
            }
            writer.finalize()?;
        }

        let frames = samples.len() as u64 / channels.max(1) as u64;
        let duration_ms = if sample_rate == 0 {
            0
        } else {
            frames * 1000 / sample_rate as u64
        };

        Ok(Self {
            bytes: cursor.into_inner(),
            sample_rate,
            channels,
            duration_ms,
        })
    }

    /// Payload size in bytes
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

/// A single fixed-length recording
///
/// `record` consumes the recorder, so one recorder yields at most one clip.
pub struct TimedRecorder {
    duration: Duration,
    normalize: bool,
    samples: Vec<i16>,
    format: Option<(u32, u16)>,
    received_ms: u64,
}

impl TimedRecorder {
    pub fn new(duration: Duration) -> Self {
        Self {
            duration,
            normalize: true,
            samples: Vec::new(),
            format: None,
            received_ms: 0,
        }
    }

    /// Enable or disable peak normalization of the finished clip
    pub fn with_normalization(mut self, normalize: bool) -> Self {
        self.normalize = normalize;
        self
    }

    /// Record from `backend` until the duration elapses or the source ends
    ///
    /// Once started, the backend is always stopped before returning, including
    /// when the recording produced nothing.
    pub async fn record(mut self, backend: &mut dyn AudioBackend) -> Result<AudioClip, CaptureError> {
        info!(
            "Recording {}s from {}",
            self.duration.as_secs_f32(),
            backend.name()
        );

        let mut audio_rx = backend.start().await?;
        let started = Instant::now();
        // An unrepresentable deadline means the source decides when to stop
        let deadline = started.checked_add(self.duration);

        loop {
            tokio::select! {
                _ = sleep_until_deadline(deadline) => {
                    debug!("Recording duration elapsed");
                    break;
                }
                frame = audio_rx.recv() => match frame {
                    Some(frame) => self.accept(frame),
                    None => {
                        debug!("Audio source closed before the duration elapsed");
                        break;
                    }
                },
            }
        }

        drop(audio_rx);
        if let Err(e) = backend.stop().await {
            warn!("Failed to stop {}: {}", backend.name(), e);
        }

        self.finish()
    }

    fn accept(&mut self, frame: AudioFrame) {
        self.received_ms += frame.duration_ms();

        match self.format {
            None => self.format = Some((frame.sample_rate, frame.channels)),
            Some(format) if format != (frame.sample_rate, frame.channels) => {
                warn!(
                    "Dropping frame with format {}Hz/{}ch (recording is {}Hz/{}ch)",
                    frame.sample_rate, frame.channels, format.0, format.1
                );
                return;
            }
            Some(_) => {}
        }

        self.samples.extend_from_slice(&frame.samples);
    }

    fn finish(mut self) -> Result<AudioClip, CaptureError> {
        let (sample_rate, channels) = match self.format {
            Some(format) if !self.samples.is_empty() => format,
            _ => return Err(CaptureError::Empty),
        };

        debug!("Received {}ms of audio", self.received_ms);

        // Cap at the requested duration; file input may deliver more than that
        let max_frames = self.duration.as_millis().saturating_mul(sample_rate as u128) / 1000;
        let max_samples = usize::try_from(max_frames)
            .unwrap_or(usize::MAX)
            .saturating_mul(channels.max(1) as usize);
        if max_samples > 0 && self.samples.len() > max_samples {
            self.samples.truncate(max_samples);
        }

        if self.normalize {
            convert::normalize_peak(&mut self.samples);
        }

        let clip = AudioClip::encode(&self.samples, sample_rate, channels)?;

        info!(
            "Recording complete: {:.1}s, {} bytes",
            clip.duration_ms as f64 / 1000.0,
            clip.len()
        );

        Ok(clip)
    }
}

async fn sleep_until_deadline(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => tokio::time::sleep_until(deadline).await,
        None => std::future::pending().await,
    }
}
