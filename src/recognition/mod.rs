//! Song recognition
//!
//! Signs a recorded clip and submits it to the recognition service, then
//! reduces the answer to a single `IdentifiedSong`.

mod client;
mod response;
pub mod signature;

pub use client::{RecognitionClient, SongRecognizer};
pub use response::{parse_response, IdentifiedSong, UNKNOWN_ARTIST, UNKNOWN_TITLE};
