//! Soundtrack knowledge behind the lookup service

mod llm;
mod prompts;
mod search;

pub use llm::LlmSoundtrackSource;
pub use search::WebSearch;

use crate::error::SourceError;

/// Answers "where was this song used?" as Movies/TV Shows text
#[async_trait::async_trait]
pub trait SoundtrackSource: Send + Sync {
    async fn find_usage(&self, song_title: &str, artist: &str) -> Result<String, SourceError>;
}
