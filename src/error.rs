//! Error types shared across the crate
//!
//! Only hard failures get an error type. Recognition and lookup failures are
//! soft: their clients return `None` and log the cause.

use thiserror::Error;

/// Failure to produce an audio clip
#[derive(Debug, Error)]
pub enum CaptureError {
    /// The input device could not be acquired (permission denied, no device)
    #[error("microphone unavailable: {0}")]
    DeviceUnavailable(String),

    /// The input stream failed after it was opened
    #[error("audio stream error: {0}")]
    Stream(String),

    /// The WAV input file could not be read
    #[error("failed to read audio file {path}: {reason}")]
    File { path: String, reason: String },

    /// The session ended without receiving a single sample
    #[error("no audio captured")]
    Empty,

    /// The captured samples could not be encoded
    #[error("failed to encode clip: {0}")]
    Encode(#[from] hound::Error),

    /// Sample rate conversion could not be set up or failed
    #[error("resampling failed: {0}")]
    Resample(String),

    /// Capture already started on this backend
    #[error("already capturing")]
    AlreadyCapturing,
}

/// Failure to start a listen cycle
///
/// Failures inside a cycle end up in its `Outcome` instead.
#[derive(Debug, Error)]
pub enum FinderError {
    /// A listen cycle is already running
    #[error("a listen cycle is already in progress")]
    Busy,
}

/// Failure of a soundtrack source inside the lookup service
#[derive(Debug, Error)]
pub enum SourceError {
    #[error("request to {service} failed: {reason}")]
    Request { service: &'static str, reason: String },

    #[error("{service} returned an empty answer")]
    EmptyAnswer { service: &'static str },
}
