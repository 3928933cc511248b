// Integration tests for the recognition client
//
// A local axum server stands in for the recognition service and records the
// multipart fields it receives.

use anyhow::Result;
use axum::extract::{Multipart, State};
use axum::routing::post;
use axum::{Json, Router};
use serde_json::{json, Value};
use soundtrack_finder::audio::AudioClip;
use soundtrack_finder::config::RecognitionConfig;
use soundtrack_finder::recognition::signature;
use soundtrack_finder::{RecognitionClient, SongRecognizer};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

#[derive(Debug, Clone)]
struct ReceivedField {
    file_name: Option<String>,
    content_type: Option<String>,
    data: Vec<u8>,
}

#[derive(Clone)]
struct FakeService {
    reply: Value,
    delay: Duration,
    received: Arc<Mutex<HashMap<String, ReceivedField>>>,
}

async fn identify(State(service): State<FakeService>, mut multipart: Multipart) -> Json<Value> {
    while let Ok(Some(field)) = multipart.next_field().await {
        let name = field.name().unwrap_or_default().to_string();
        let file_name = field.file_name().map(str::to_string);
        let content_type = field.content_type().map(str::to_string);
        let data = field.bytes().await.map(|b| b.to_vec()).unwrap_or_default();
        service.received.lock().unwrap().insert(
            name,
            ReceivedField {
                file_name,
                content_type,
                data,
            },
        );
    }

    tokio::time::sleep(service.delay).await;
    Json(service.reply.clone())
}

async fn spawn_service(reply: Value, delay: Duration) -> Result<(String, FakeService)> {
    let service = FakeService {
        reply,
        delay,
        received: Arc::new(Mutex::new(HashMap::new())),
    };

    let app = Router::new()
        .route("/v1/identify", post(identify))
        .with_state(service.clone());

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await?;
    let addr = listener.local_addr()?;
    tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });

    Ok((format!("http://{}", addr), service))
}

fn config(base_url: &str, timeout_secs: u64) -> RecognitionConfig {
    RecognitionConfig {
        host: "identify.example.com".to_string(),
        access_key: "test-key".to_string(),
        access_secret: "test-secret".to_string(),
        base_url: Some(base_url.to_string()),
        timeout_secs,
    }
}

fn clip() -> Result<AudioClip> {
    let samples: Vec<i16> = (0..16000).map(|i| ((i % 64) * 100) as i16).collect();
    Ok(AudioClip::encode(&samples, 16000, 1)?)
}

#[tokio::test]
async fn test_recognize_sends_signed_multipart_form() -> Result<()> {
    let reply = json!({
        "status": {"code": 0, "msg": "Success"},
        "metadata": {"music": [
            {"title": "Blinding Lights", "artists": [{"name": "The Weeknd"}]}
        ]}
    });
    let (url, service) = spawn_service(reply, Duration::ZERO).await?;
    let client = RecognitionClient::new(config(&url, 5))?;
    let clip = clip()?;

    let song = client.recognize(&clip).await.expect("song should be recognized");
    assert_eq!(song.song_title, "Blinding Lights");
    assert_eq!(song.artist, "The Weeknd");

    let received = service.received.lock().unwrap().clone();
    let text = |name: &str| String::from_utf8(received[name].data.clone()).unwrap();

    assert_eq!(text("access_key"), "test-key");
    assert_eq!(text("data_type"), "audio");
    assert_eq!(text("signature_version"), "1");
    assert_eq!(text("sample_bytes"), clip.len().to_string());

    let timestamp: i64 = text("timestamp").parse()?;
    let expected = signature::sign_request("test-key", "test-secret", timestamp);
    assert_eq!(text("signature"), expected.signature);

    let sample = &received["sample"];
    assert_eq!(sample.file_name.as_deref(), Some("audio.wav"));
    assert_eq!(sample.content_type.as_deref(), Some("audio/wav"));
    assert_eq!(sample.data, clip.bytes);

    Ok(())
}

#[tokio::test]
async fn test_no_match_is_none() -> Result<()> {
    let reply = json!({"status": {"code": 1001, "msg": "No result"}});
    let (url, _) = spawn_service(reply, Duration::ZERO).await?;
    let client = RecognitionClient::new(config(&url, 5))?;

    assert!(client.recognize(&clip()?).await.is_none());
    Ok(())
}

#[tokio::test]
async fn test_quotes_are_stripped_from_title() -> Result<()> {
    let reply = json!({"metadata": {"music": [
        {"title": "Bohemian\"Rhapsody\"", "artists": [{"name": "Queen"}]}
    ]}});
    let (url, _) = spawn_service(reply, Duration::ZERO).await?;
    let client = RecognitionClient::new(config(&url, 5))?;

    let song = client.recognize(&clip()?).await.expect("song should be recognized");
    assert_eq!(song.song_title, "BohemianRhapsody");
    Ok(())
}

#[tokio::test]
async fn test_unreachable_service_is_none() -> Result<()> {
    // Bind then drop to get a port nothing listens on
    let listener = std::net::TcpListener::bind("127.0.0.1:0")?;
    let addr = listener.local_addr()?;
    drop(listener);

    let client = RecognitionClient::new(config(&format!("http://{}", addr), 5))?;
    assert!(client.recognize(&clip()?).await.is_none());
    Ok(())
}

#[tokio::test]
async fn test_timeout_is_none() -> Result<()> {
    let reply = json!({"metadata": {"music": [{"title": "Late", "artists": []}]}});
    let (url, _) = spawn_service(reply, Duration::from_secs(3)).await?;
    let client = RecognitionClient::new(config(&url, 1))?;

    assert!(client.recognize(&clip()?).await.is_none());
    Ok(())
}

#[test]
fn test_default_endpoint_uses_host() -> Result<()> {
    let mut cfg = config("unused", 5);
    cfg.base_url = None;
    let client = RecognitionClient::new(cfg)?;

    assert_eq!(client.endpoint(), "https://identify.example.com/v1/identify");
    Ok(())
}
