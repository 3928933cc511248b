use crate::soundtrack::SoundtrackSource;
use std::sync::Arc;

/// Shared application state for HTTP handlers
#[derive(Clone)]
pub struct AppState {
    /// Where soundtrack answers come from
    pub source: Arc<dyn SoundtrackSource>,
}

impl AppState {
    pub fn new(source: Arc<dyn SoundtrackSource>) -> Self {
        Self { source }
    }
}
