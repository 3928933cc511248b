//! Listen cycle orchestration
//!
//! This module provides the `SongFinder` that drives one request end to end:
//! - Timed audio capture
//! - Song recognition
//! - Soundtrack lookup, with a "still working" reminder
//! - Status publishing and the loading flag
//! - Terminal rendering of the outcome

mod finder;
mod render;
mod state;

pub use finder::{FinderOptions, SongFinder};
pub use render::render;
pub use state::{
    FinderState, Outcome, OutcomeKind, StatusUpdate, IDLE_MESSAGE, LISTENING_MESSAGE,
    NOT_IDENTIFIED_MESSAGE, NO_MATCHES_MESSAGE, RECOGNIZING_MESSAGE, STILL_WORKING_MESSAGE,
};
