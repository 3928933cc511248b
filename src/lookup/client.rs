use tracing::{debug, info, warn};

use super::messages::LookupResponse;
use crate::config::LookupConfig;
use crate::recognition::IdentifiedSong;

/// Finds the movies and TV shows that use a song
///
/// Returns the service's answer as-is; `None` when it could not be reached or
/// did not answer with JSON.
#[async_trait::async_trait]
pub trait SoundtrackLookup: Send + Sync {
    async fn find(&self, song: &IdentifiedSong) -> Option<LookupResponse>;
}

/// HTTP client for the soundtrack-finder service
pub struct SoundtrackClient {
    http: reqwest::Client,
    endpoint: String,
    timeout_secs: u64,
}

impl SoundtrackClient {
    pub fn new(config: &LookupConfig) -> reqwest::Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(config.timeout())
            .build()?;

        Ok(Self {
            http,
            endpoint: config.endpoint(),
            timeout_secs: config.timeout_secs,
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

#[async_trait::async_trait]
impl SoundtrackLookup for SoundtrackClient {
    async fn find(&self, song: &IdentifiedSong) -> Option<LookupResponse> {
        info!("Looking up soundtracks for {} at {}", song, self.endpoint);

        let response = match self.http.post(&self.endpoint).json(song).send().await {
            Ok(response) => response,
            Err(e) if e.is_timeout() => {
                warn!("Soundtrack lookup timed out after {}s", self.timeout_secs);
                return None;
            }
            Err(e) => {
                warn!("Soundtrack lookup failed: {}", e);
                return None;
            }
        };

        let status = response.status();
        match response.json::<LookupResponse>().await {
            Ok(body) => {
                debug!("Soundtrack service answered {} with status {:?}", status, body.status);
                Some(body)
            }
            Err(e) => {
                warn!("Unreadable soundtrack response ({}): {}", status, e);
                None
            }
        }
    }
}
