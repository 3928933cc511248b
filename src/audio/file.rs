use std::path::{Path, PathBuf};

use hound::{SampleFormat, WavReader};
use tokio::sync::mpsc;
use tracing::info;

use super::backend::{AudioBackend, AudioBackendConfig, AudioFrame};
use super::convert::FormatConverter;
use crate::error::CaptureError;

pub struct AudioFile {
    pub path: String,
    pub duration_seconds: f64,
    pub sample_rate: u32,
    pub channels: u16,
    pub samples: Vec<i16>,
}

impl AudioFile {
    pub fn open(path: impl AsRef<Path>) -> Result<Self, CaptureError> {
        let path = path.as_ref();
        info!("Opening audio file: {}", path.display());

        let file_error = |reason: String| CaptureError::File {
            path: path.display().to_string(),
            reason,
        };

        let reader = WavReader::open(path).map_err(|e| file_error(e.to_string()))?;

        let spec = reader.spec();
        let samples: Vec<i16> = match (spec.sample_format, spec.bits_per_sample) {
            (SampleFormat::Int, 16) => reader
                .into_samples::<i16>()
                .collect::<Result<Vec<_>, _>>()
                .map_err(|e| file_error(e.to_string()))?,
            (SampleFormat::Int, bits) if bits <= 32 => {
                let shift = bits as i32 - 16;
                reader
                    .into_samples::<i32>()
                    .map(|s| s.map(|v| rescale_int(v, shift)))
                    .collect::<Result<Vec<_>, _>>()
                    .map_err(|e| file_error(e.to_string()))?
            }
            (SampleFormat::Float, 32) => reader
                .into_samples::<f32>()
                .map(|s| s.map(|v| (v.clamp(-1.0, 1.0) * i16::MAX as f32) as i16))
                .collect::<Result<Vec<_>, _>>()
                .map_err(|e| file_error(e.to_string()))?,
            (format, bits) => {
                return Err(file_error(format!(
                    "unsupported sample format {:?} at {} bits",
                    format, bits
                )))
            }
        };

        let duration_seconds = if spec.sample_rate == 0 || spec.channels == 0 {
            0.0
        } else {
            samples.len() as f64 / (spec.sample_rate as f64 * spec.channels as f64)
        };

        info!(
            "Audio file loaded: {:.1}s, {}Hz, {} channels, {} samples",
            duration_seconds,
            spec.sample_rate,
            spec.channels,
            samples.len()
        );

        Ok(Self {
            path: path.display().to_string(),
            duration_seconds,
            sample_rate: spec.sample_rate,
            channels: spec.channels,
            samples,
        })
    }
}

fn rescale_int(value: i32, shift: i32) -> i16 {
    let scaled = if shift >= 0 {
        value >> shift
    } else {
        value << -shift
    };
    scaled.clamp(i16::MIN as i32, i16::MAX as i32) as i16
}

/// Replays a WAV file as a stream of frames
///
/// Frames are emitted as fast as the receiver accepts them. The channel
/// closes once the file is exhausted.
pub struct FileBackend {
    path: PathBuf,
    config: AudioBackendConfig,
    audio: Option<AudioFile>,
    task: Option<tokio::task::JoinHandle<()>>,
    capturing: bool,
}

impl FileBackend {
    pub fn open(path: impl Into<PathBuf>, config: AudioBackendConfig) -> Result<Self, CaptureError> {
        let path = path.into();
        let audio = AudioFile::open(&path)?;

        Ok(Self {
            path,
            config,
            audio: Some(audio),
            task: None,
            capturing: false,
        })
    }
}

#[async_trait::async_trait]
impl AudioBackend for FileBackend {
    async fn start(&mut self) -> Result<mpsc::Receiver<AudioFrame>, CaptureError> {
        if self.capturing {
            return Err(CaptureError::AlreadyCapturing);
        }

        let audio = self.audio.take().ok_or_else(|| CaptureError::File {
            path: self.path.display().to_string(),
            reason: "file already replayed".to_string(),
        })?;

        let mut converter = FormatConverter::new(
            audio.sample_rate,
            audio.channels,
            self.config.target_sample_rate,
            self.config.target_channels,
        )?;
        let samples = converter.convert(&audio.samples)?;
        let sample_rate = converter.target_rate();
        let channels = converter.target_channels();
        let chunk_len = self.config.samples_per_buffer();

        let (tx, rx) = mpsc::channel(64);
        let buffer_ms = self.config.buffer_duration_ms;

        let task = tokio::spawn(async move {
            for (index, chunk) in samples.chunks(chunk_len).enumerate() {
                let frame = AudioFrame {
                    samples: chunk.to_vec(),
                    sample_rate,
                    channels,
                    timestamp_ms: index as u64 * buffer_ms,
                };
                if tx.send(frame).await.is_err() {
                    break;
                }
            }
        });

        info!("Replaying {} as audio input", self.path.display());

        self.task = Some(task);
        self.capturing = true;

        Ok(rx)
    }

    async fn stop(&mut self) -> Result<(), CaptureError> {
        if !self.capturing {
            return Ok(());
        }

        if let Some(task) = self.task.take() {
            task.abort();
        }

        self.capturing = false;

        Ok(())
    }

    fn is_capturing(&self) -> bool {
        self.capturing
    }

    fn name(&self) -> &str {
        "WAV file"
    }
}
