pub mod client;
pub mod messages;

pub use client::{SoundtrackClient, SoundtrackLookup};
pub use messages::{parse_soundtrack, LookupResponse, SoundtrackResult, STATUS_ERROR, STATUS_SUCCESS};
