use serde::{Deserialize, Serialize};

use crate::lookup::SoundtrackResult;
use crate::recognition::IdentifiedSong;

pub const IDLE_MESSAGE: &str =
    "Find out which movies and TV shows feature a song in their soundtracks!";
pub const LISTENING_MESSAGE: &str = "Listening... Identifying song...";
pub const RECOGNIZING_MESSAGE: &str = "Identifying song...";
pub const STILL_WORKING_MESSAGE: &str = "Sit tight, almost there...";
pub const NOT_IDENTIFIED_MESSAGE: &str = "Could not identify the song.";
pub const NO_MATCHES_MESSAGE: &str = "Could not find any matches.";

/// Stage of a listen cycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FinderState {
    Idle,
    Listening,
    Recognizing,
    SearchingSoundtrack,
    Done(OutcomeKind),
}

impl FinderState {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Idle => "Ready",
            Self::Listening => "Listening",
            Self::Recognizing => "Recognizing",
            Self::SearchingSoundtrack => "Searching soundtrack",
            Self::Done(OutcomeKind::Success) => "Done",
            Self::Done(OutcomeKind::NoMatch) => "No match",
            Self::Done(OutcomeKind::Error) => "Error",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OutcomeKind {
    Success,
    NoMatch,
    Error,
}

/// Result of one listen cycle
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Outcome {
    /// Song identified and soundtrack placements found
    Success {
        song: IdentifiedSong,
        soundtrack: SoundtrackResult,
    },
    /// Song not identified, or identified without usable placements
    NoMatch { song: Option<IdentifiedSong> },
    /// Capture failed or a step failed unexpectedly
    Error { message: String },
}

impl Outcome {
    pub fn kind(&self) -> OutcomeKind {
        match self {
            Self::Success { .. } => OutcomeKind::Success,
            Self::NoMatch { .. } => OutcomeKind::NoMatch,
            Self::Error { .. } => OutcomeKind::Error,
        }
    }

    pub fn song(&self) -> Option<&IdentifiedSong> {
        match self {
            Self::Success { song, .. } => Some(song),
            Self::NoMatch { song } => song.as_ref(),
            Self::Error { .. } => None,
        }
    }

    /// Status line shown once the cycle is over
    pub fn message(&self) -> String {
        match self {
            Self::Success { .. } => String::new(),
            Self::NoMatch { song: None } => NOT_IDENTIFIED_MESSAGE.to_string(),
            Self::NoMatch { song: Some(_) } => NO_MATCHES_MESSAGE.to_string(),
            Self::Error { message } => message.clone(),
        }
    }
}

/// Snapshot published on every state or message change
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusUpdate {
    pub state: FinderState,
    pub message: String,
    /// Loading flag; true from the start of a cycle until its outcome is known
    pub busy: bool,
}

impl Default for StatusUpdate {
    fn default() -> Self {
        Self {
            state: FinderState::Idle,
            message: IDLE_MESSAGE.to_string(),
            busy: false,
        }
    }
}
