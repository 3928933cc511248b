use super::state::AppState;
use crate::lookup::LookupResponse;
use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    response::{IntoResponse, Json},
};
use serde::Deserialize;
use tracing::{error, info, warn};

pub const MISSING_FIELDS_MESSAGE: &str = "Missing song_title or artist in request body";

// ============================================================================
// Request Types
// ============================================================================

#[derive(Debug, Default, Deserialize)]
pub struct IdentifyRequest {
    pub song_title: Option<String>,
    pub artist: Option<String>,
}

impl IdentifyRequest {
    /// Both fields, trimmed, when present and non-blank
    fn fields(&self) -> Option<(&str, &str)> {
        let title = self.song_title.as_deref().map(str::trim).filter(|s| !s.is_empty())?;
        let artist = self.artist.as_deref().map(str::trim).filter(|s| !s.is_empty())?;
        Some((title, artist))
    }
}

// ============================================================================
// Handlers
// ============================================================================

/// POST /identify (also /find-that-soundtrack)
/// Find movies and TV shows whose soundtrack includes a song
pub async fn identify(
    State(state): State<AppState>,
    body: Result<Json<IdentifyRequest>, JsonRejection>,
) -> impl IntoResponse {
    let req = match body {
        Ok(Json(req)) => req,
        Err(e) => {
            warn!("Rejected identify request: {}", e);
            IdentifyRequest::default()
        }
    };

    let Some((song_title, artist)) = req.fields() else {
        return (
            StatusCode::BAD_REQUEST,
            Json(LookupResponse::error(MISSING_FIELDS_MESSAGE)),
        )
            .into_response();
    };

    info!("Received song: {} by {}", song_title, artist);

    match state.source.find_usage(song_title, artist).await {
        Ok(soundtrack) => (
            StatusCode::OK,
            Json(LookupResponse::success(song_title, artist, soundtrack)),
        )
            .into_response(),
        Err(e) => {
            error!("Soundtrack search failed for {} by {}: {}", song_title, artist, e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(LookupResponse::error(e.to_string())),
            )
                .into_response()
        }
    }
}

/// GET /health
/// Health check endpoint
pub async fn health_check() -> impl IntoResponse {
    (StatusCode::OK, "OK")
}
