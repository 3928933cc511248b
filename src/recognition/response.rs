use serde::{Deserialize, Serialize};
use serde_json::Value;

pub const UNKNOWN_TITLE: &str = "Unknown Title";
pub const UNKNOWN_ARTIST: &str = "Unknown Artist";

/// Top match from the recognition service
///
/// Field names follow the lookup service's JSON body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IdentifiedSong {
    pub song_title: String,
    pub artist: String,
}

impl IdentifiedSong {
    /// Build a song, substituting placeholders for missing or blank fields
    pub fn new(title: Option<&str>, artist: Option<&str>) -> Self {
        let title = title.map(|t| t.replace('"', "")).unwrap_or_default();
        let title = title.trim();
        let artist = artist.map(str::trim).unwrap_or_default();

        Self {
            song_title: if title.is_empty() { UNKNOWN_TITLE } else { title }.to_string(),
            artist: if artist.is_empty() { UNKNOWN_ARTIST } else { artist }.to_string(),
        }
    }
}

impl std::fmt::Display for IdentifiedSong {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} by {}", self.song_title, self.artist)
    }
}

/// Extract the top match from an identify response
///
/// Returns `None` when the response carries no music matches.
pub fn parse_response(body: &Value) -> Option<IdentifiedSong> {
    let top = body.pointer("/metadata/music")?.as_array()?.first()?;

    let title = top.get("title").and_then(Value::as_str);
    let artist = top
        .get("artists")
        .and_then(Value::as_array)
        .and_then(|artists| artists.first())
        .and_then(|a| a.get("name"))
        .and_then(Value::as_str);

    Some(IdentifiedSong::new(title, artist))
}

/// Service status code, when the body carries one
pub fn status_code(body: &Value) -> Option<(i64, String)> {
    let status = body.get("status")?;
    let code = status.get("code")?.as_i64()?;
    let msg = status
        .get("msg")
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string();
    Some((code, msg))
}
