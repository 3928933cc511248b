// Integration tests for the model-backed soundtrack source
//
// One local axum app plays both the chat-completion API and the search API.

use anyhow::Result;
use axum::extract::{Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::{json, Value};
use soundtrack_finder::config::SourcesConfig;
use soundtrack_finder::{LlmSoundtrackSource, SourceError, SoundtrackSource};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

#[derive(Clone, Default)]
struct Upstream {
    prompts: Arc<Mutex<Vec<String>>>,
    auth: Arc<Mutex<Vec<String>>>,
    searches: Arc<Mutex<Vec<HashMap<String, String>>>>,
    fail_chat: bool,
}

async fn chat(State(up): State<Upstream>, headers: HeaderMap, Json(body): Json<Value>) -> impl IntoResponse {
    if up.fail_chat {
        return (StatusCode::TOO_MANY_REQUESTS, Json(json!({"error": "rate limited"}))).into_response();
    }

    if let Some(auth) = headers.get("authorization").and_then(|v| v.to_str().ok()) {
        up.auth.lock().unwrap().push(auth.to_string());
    }

    let prompt = body["messages"][0]["content"].as_str().unwrap_or_default().to_string();
    let call = {
        let mut prompts = up.prompts.lock().unwrap();
        prompts.push(prompt);
        prompts.len()
    };

    let content = if call == 1 {
        "Movies:\nDrive (2011)"
    } else {
        "Movies:\nDrive (2011)\n\nTV Shows:\nStranger Things, S01E01 (2016)"
    };

    Json(json!({"choices": [{"message": {"role": "assistant", "content": content}}]})).into_response()
}

async fn search(State(up): State<Upstream>, Query(params): Query<HashMap<String, String>>) -> Json<Value> {
    up.searches.lock().unwrap().push(params);
    Json(json!({"items": [
        {"snippet": "Featured in the Stranger Things premiere", "link": "https://example.com/st"}
    ]}))
}

async fn spawn_upstream(up: Upstream) -> Result<String> {
    let app = Router::new()
        .route("/v1/chat/completions", post(chat))
        .route("/search", get(search))
        .with_state(up);

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await?;
    let addr = listener.local_addr()?;
    tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });
    Ok(format!("http://{}", addr))
}

fn config(base: &str, with_search: bool) -> SourcesConfig {
    SourcesConfig {
        openai_api_key: Some("sk-test".to_string()),
        openai_base_url: format!("{}/v1", base),
        openai_model: "gpt-4".to_string(),
        temperature: 0.5,
        google_api_key: with_search.then(|| "g-key".to_string()),
        google_cse_id: with_search.then(|| "cse-id".to_string()),
        google_base_url: format!("{}/search", base),
        search_results: 10,
        timeout_secs: 5,
    }
}

#[tokio::test]
async fn test_merges_model_answer_with_search_results() -> Result<()> {
    let up = Upstream::default();
    let base = spawn_upstream(up.clone()).await?;
    let source = LlmSoundtrackSource::new(&config(&base, true))?;

    let answer = source.find_usage("Nightcall", "Kavinsky").await?;

    assert_eq!(answer, "Movies:\nDrive (2011)\n\nTV Shows:\nStranger Things, S01E01 (2016)");

    let prompts = up.prompts.lock().unwrap().clone();
    assert_eq!(prompts.len(), 2);
    assert!(prompts[0].contains("'Nightcall' by Kavinsky"));
    assert!(prompts[1].contains("Movies:\nDrive (2011)"), "first answer is carried into the merge");
    assert!(prompts[1].contains("Featured in the Stranger Things premiere https://example.com/st"));

    let searches = up.searches.lock().unwrap().clone();
    assert_eq!(searches.len(), 1);
    assert_eq!(searches[0]["key"], "g-key");
    assert_eq!(searches[0]["cx"], "cse-id");
    assert!(searches[0]["q"].contains("Nightcall"));

    assert!(up.auth.lock().unwrap().iter().all(|a| a == "Bearer sk-test"));

    Ok(())
}

#[tokio::test]
async fn test_works_without_search_credentials() -> Result<()> {
    let up = Upstream::default();
    let base = spawn_upstream(up.clone()).await?;
    let source = LlmSoundtrackSource::new(&config(&base, false))?;

    source.find_usage("Nightcall", "Kavinsky").await?;

    assert!(up.searches.lock().unwrap().is_empty());
    let prompts = up.prompts.lock().unwrap().clone();
    assert_eq!(prompts.len(), 2);
    assert!(prompts[1].contains("(no search results)"));

    Ok(())
}

#[tokio::test]
async fn test_model_failure_is_an_error() -> Result<()> {
    let up = Upstream {
        fail_chat: true,
        ..Default::default()
    };
    let base = spawn_upstream(up.clone()).await?;
    let source = LlmSoundtrackSource::new(&config(&base, true))?;

    let result = source.find_usage("Nightcall", "Kavinsky").await;

    assert!(matches!(result, Err(SourceError::Request { .. })));
    assert!(up.searches.lock().unwrap().is_empty(), "no search after a failed first pass");

    Ok(())
}
