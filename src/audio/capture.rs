use std::time::Duration;

use super::backend::{AudioBackendConfig, AudioBackendFactory, AudioSource};
use super::recorder::{AudioClip, TimedRecorder};
use crate::error::CaptureError;

/// Produces one clip of the requested length
#[async_trait::async_trait]
pub trait AudioCapture: Send + Sync {
    async fn capture(&self, duration: Duration) -> Result<AudioClip, CaptureError>;
}

/// Captures from a fresh backend for every call
///
/// Each call opens the source, records once and releases it, so nothing is
/// held between listen cycles.
pub struct BackendCapture {
    source: AudioSource,
    config: AudioBackendConfig,
    normalize: bool,
}

impl BackendCapture {
    pub fn new(source: AudioSource, config: AudioBackendConfig) -> Self {
        Self {
            source,
            config,
            normalize: true,
        }
    }

    pub fn with_normalization(mut self, normalize: bool) -> Self {
        self.normalize = normalize;
        self
    }
}

#[async_trait::async_trait]
impl AudioCapture for BackendCapture {
    async fn capture(&self, duration: Duration) -> Result<AudioClip, CaptureError> {
        let mut backend = AudioBackendFactory::create(self.source.clone(), self.config.clone())?;

        TimedRecorder::new(duration)
            .with_normalization(self.normalize)
            .record(backend.as_mut())
            .await
    }
}
