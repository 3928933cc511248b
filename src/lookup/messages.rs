use serde::{Deserialize, Serialize};

pub const STATUS_SUCCESS: &str = "success";
pub const STATUS_ERROR: &str = "error";

const MOVIES_HEADER: &str = "Movies:";
const TV_SHOWS_HEADER: &str = "TV Shows:";

/// Body returned by the lookup service's identify endpoint
///
/// Fields this crate does not read are kept in `extra`, so a body survives
/// a round trip unchanged. A missing `status` reads as empty, which is not
/// a success.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LookupResponse {
    #[serde(default)]
    pub status: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub soundtrack: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub song: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub artist: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl LookupResponse {
    pub fn success(song: &str, artist: &str, soundtrack: String) -> Self {
        Self {
            status: STATUS_SUCCESS.to_string(),
            soundtrack: Some(soundtrack),
            song: Some(song.to_string()),
            artist: Some(artist.to_string()),
            message: None,
            extra: Default::default(),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            status: STATUS_ERROR.to_string(),
            soundtrack: None,
            song: None,
            artist: None,
            message: Some(message.into()),
            extra: Default::default(),
        }
    }

    pub fn is_success(&self) -> bool {
        self.status == STATUS_SUCCESS
    }

    /// Parsed soundtrack, if the call succeeded and the text is parseable
    pub fn soundtrack_result(&self) -> Option<SoundtrackResult> {
        if !self.is_success() {
            return None;
        }
        self.soundtrack.as_deref().and_then(parse_soundtrack)
    }
}

/// Movies and TV shows featuring a song
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SoundtrackResult {
    pub movies: Vec<String>,
    pub tv_shows: Vec<String>,
}

impl SoundtrackResult {
    pub fn is_empty(&self) -> bool {
        self.movies.is_empty() && self.tv_shows.is_empty()
    }
}

/// Split soundtrack text into its "Movies:" and "TV Shows:" sections
///
/// Sections are separated by blank lines; the lines after a header become the
/// entries. Either section may be missing. Returns `None` when neither header
/// appears at the start of any section.
pub fn parse_soundtrack(text: &str) -> Option<SoundtrackResult> {
    let text = text.replace("\r\n", "\n");
    let mut result = SoundtrackResult::default();
    let mut found = false;

    for section in text.split("\n\n") {
        let section = section.trim_start_matches('\n');
        let target = if section.starts_with(MOVIES_HEADER) {
            &mut result.movies
        } else if section.starts_with(TV_SHOWS_HEADER) {
            &mut result.tv_shows
        } else {
            continue;
        };

        found = true;
        *target = section
            .lines()
            .skip(1)
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .map(str::to_string)
            .collect();
    }

    found.then_some(result)
}
