use reqwest::multipart::{Form, Part};
use serde_json::Value;
use tracing::{debug, info, warn};

use super::response::{parse_response, status_code, IdentifiedSong};
use super::signature::{self, DATA_TYPE, SIGNATURE_VERSION};
use crate::audio::AudioClip;
use crate::config::RecognitionConfig;

/// Maps a recorded clip to a song
///
/// `None` covers both "no match" and "could not ask"; callers treat them alike.
#[async_trait::async_trait]
pub trait SongRecognizer: Send + Sync {
    async fn recognize(&self, clip: &AudioClip) -> Option<IdentifiedSong>;
}

/// Client for an ACRCloud-style identify endpoint
pub struct RecognitionClient {
    http: reqwest::Client,
    config: RecognitionConfig,
}

impl RecognitionClient {
    pub fn new(config: RecognitionConfig) -> reqwest::Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(config.timeout())
            .build()?;

        Ok(Self { http, config })
    }

    /// Full URL of the identify endpoint
    pub fn endpoint(&self) -> String {
        let base = match &self.config.base_url {
            Some(url) => url.trim_end_matches('/').to_string(),
            None => format!("https://{}", self.config.host),
        };
        format!("{}{}", base, signature::HTTP_URI)
    }

    fn build_form(&self, clip: &AudioClip, timestamp: i64) -> reqwest::Result<Form> {
        let signed = signature::sign_request(
            &self.config.access_key,
            &self.config.access_secret,
            timestamp,
        );

        let sample = Part::bytes(clip.bytes.clone())
            .file_name("audio.wav")
            .mime_str(AudioClip::MIME_TYPE)?;

        Ok(Form::new()
            .text("access_key", signed.access_key)
            .text("data_type", DATA_TYPE)
            .text("signature_version", SIGNATURE_VERSION)
            .text("signature", signed.signature)
            .text("sample_bytes", clip.len().to_string())
            .text("timestamp", signed.timestamp)
            .part("sample", sample))
    }

    async fn submit(&self, clip: &AudioClip) -> reqwest::Result<Value> {
        let timestamp = chrono::Utc::now().timestamp();
        let form = self.build_form(clip, timestamp)?;

        let response = self.http.post(self.endpoint()).multipart(form).send().await?;
        debug!("Recognition service answered {}", response.status());

        response.json::<Value>().await
    }
}

#[async_trait::async_trait]
impl SongRecognizer for RecognitionClient {
    async fn recognize(&self, clip: &AudioClip) -> Option<IdentifiedSong> {
        info!("Sending {} bytes to {} for recognition", clip.len(), self.endpoint());

        let body = match self.submit(clip).await {
            Ok(body) => body,
            Err(e) if e.is_timeout() => {
                warn!("Recognition request timed out after {}s", self.config.timeout_secs);
                return None;
            }
            Err(e) => {
                warn!("Recognition request failed: {}", e);
                return None;
            }
        };

        match parse_response(&body) {
            Some(song) => {
                info!("Recognized: {}", song);
                Some(song)
            }
            None => {
                match status_code(&body) {
                    Some((code, msg)) => info!("No song recognized (code {}: {})", code, msg),
                    None => info!("No song recognized"),
                }
                None
            }
        }
    }
}
