pub mod backend;
pub mod capture;
pub mod convert;
pub mod file;
pub mod microphone;
pub mod recorder;

pub use backend::{AudioBackend, AudioBackendConfig, AudioBackendFactory, AudioFrame, AudioSource};
pub use capture::{AudioCapture, BackendCapture};
pub use file::{AudioFile, FileBackend};
pub use microphone::MicrophoneBackend;
pub use recorder::{AudioClip, TimedRecorder};
