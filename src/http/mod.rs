//! HTTP lookup service
//!
//! This module provides the soundtrack-finder REST API:
//! - POST /identify - Movies/TV shows for `{song_title, artist}`
//! - POST /find-that-soundtrack - Same handler, older path
//! - GET /health - Health check

mod handlers;
mod routes;
mod state;

pub use handlers::{IdentifyRequest, MISSING_FIELDS_MESSAGE};
pub use routes::create_router;
pub use state::AppState;
