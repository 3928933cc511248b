pub mod audio;
pub mod config;
pub mod error;
pub mod finder;
pub mod http;
pub mod lookup;
pub mod recognition;
pub mod soundtrack;

pub use audio::{
    AudioBackend, AudioBackendConfig, AudioBackendFactory, AudioCapture, AudioClip, AudioFile,
    AudioFrame, AudioSource, BackendCapture, TimedRecorder,
};
pub use config::Config;
pub use error::{CaptureError, FinderError, SourceError};
pub use finder::{FinderOptions, FinderState, Outcome, SongFinder, StatusUpdate};
pub use http::{create_router, AppState};
pub use lookup::{parse_soundtrack, LookupResponse, SoundtrackClient, SoundtrackLookup, SoundtrackResult};
pub use recognition::{IdentifiedSong, RecognitionClient, SongRecognizer};
pub use soundtrack::{LlmSoundtrackSource, SoundtrackSource};
