use serde::{Deserialize, Serialize};
use tracing::info;

use super::prompts;
use super::search::WebSearch;
use super::SoundtrackSource;
use crate::config::SourcesConfig;
use crate::error::SourceError;

const SERVICE: &str = "chat completion";

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    temperature: f32,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatReply,
}

#[derive(Debug, Deserialize)]
struct ChatReply {
    #[serde(default)]
    content: Option<String>,
}

/// Soundtrack knowledge from a chat-completion model, cross-checked with web search
///
/// Two model calls per song: a direct answer, then a merge of that answer
/// with search snippets. Without search credentials the merge still runs,
/// with no extra snippets.
pub struct LlmSoundtrackSource {
    http: reqwest::Client,
    base_url: String,
    api_key: String,
    model: String,
    temperature: f32,
    search: Option<WebSearch>,
}

impl LlmSoundtrackSource {
    pub fn new(config: &SourcesConfig) -> reqwest::Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(config.timeout())
            .build()?;

        let search = WebSearch::from_config(http.clone(), config);
        if search.is_none() {
            info!("Web search not configured; using model answers only");
        }

        Ok(Self {
            http,
            base_url: config.openai_base_url.trim_end_matches('/').to_string(),
            api_key: config.openai_api_key.clone().unwrap_or_default(),
            model: config.openai_model.clone(),
            temperature: config.temperature,
            search,
        })
    }

    async fn complete(&self, prompt: &str) -> Result<String, SourceError> {
        let request_error = |e: reqwest::Error| SourceError::Request {
            service: SERVICE,
            reason: e.to_string(),
        };

        let request = ChatRequest {
            model: &self.model,
            messages: vec![ChatMessage {
                role: "system",
                content: prompt,
            }],
            temperature: self.temperature,
        };

        let response: ChatResponse = self
            .http
            .post(format!("{}/chat/completions", self.base_url))
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await
            .and_then(|r| r.error_for_status())
            .map_err(request_error)?
            .json()
            .await
            .map_err(request_error)?;

        response
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .map(|content| content.trim().to_string())
            .filter(|content| !content.is_empty())
            .ok_or(SourceError::EmptyAnswer { service: SERVICE })
    }
}

#[async_trait::async_trait]
impl SoundtrackSource for LlmSoundtrackSource {
    async fn find_usage(&self, song_title: &str, artist: &str) -> Result<String, SourceError> {
        info!("Searching for movies and TV shows featuring '{}' by {}", song_title, artist);

        let first_pass = self.complete(&prompts::placements(song_title, artist)).await?;

        let search_results = match &self.search {
            Some(search) => {
                search
                    .search_or_empty(&prompts::search_query(song_title, artist))
                    .await
            }
            None => Vec::new(),
        };

        let merged = self
            .complete(&prompts::merge(song_title, artist, &first_pass, &search_results))
            .await?;

        Ok(merged)
    }
}
