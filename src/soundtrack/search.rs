use serde::Deserialize;
use tracing::{debug, warn};

use crate::config::SourcesConfig;
use crate::error::SourceError;

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    items: Vec<SearchItem>,
}

#[derive(Debug, Deserialize)]
struct SearchItem {
    #[serde(default)]
    snippet: String,
    #[serde(default)]
    link: String,
}

/// Google Custom Search client
pub struct WebSearch {
    http: reqwest::Client,
    base_url: String,
    api_key: String,
    engine_id: String,
    results: u32,
}

impl WebSearch {
    /// Build from config; `None` when search credentials are not set
    pub fn from_config(http: reqwest::Client, config: &SourcesConfig) -> Option<Self> {
        if !config.search_enabled() {
            return None;
        }

        Some(Self {
            http,
            base_url: config.google_base_url.clone(),
            api_key: config.google_api_key.clone().unwrap_or_default(),
            engine_id: config.google_cse_id.clone().unwrap_or_default(),
            results: config.search_results.clamp(1, 10),
        })
    }

    /// Snippet and link of each result
    pub async fn search(&self, query: &str) -> Result<Vec<String>, SourceError> {
        let request_error = |e: reqwest::Error| SourceError::Request {
            service: "web search",
            reason: e.to_string(),
        };

        let num = self.results.to_string();
        let response = self
            .http
            .get(&self.base_url)
            .query(&[
                ("key", self.api_key.as_str()),
                ("cx", self.engine_id.as_str()),
                ("q", query),
                ("num", num.as_str()),
            ])
            .send()
            .await
            .and_then(|r| r.error_for_status())
            .map_err(request_error)?;

        let body: SearchResponse = response.json().await.map_err(request_error)?;
        debug!("Web search returned {} results", body.items.len());

        Ok(body
            .items
            .into_iter()
            .map(|item| format!("{} {}", item.snippet, item.link).trim().to_string())
            .collect())
    }

    /// Like [`WebSearch::search`], but failures yield no results
    pub async fn search_or_empty(&self, query: &str) -> Vec<String> {
        match self.search(query).await {
            Ok(results) => results,
            Err(e) => {
                warn!("Web search failed, continuing without it: {}", e);
                Vec::new()
            }
        }
    }
}
