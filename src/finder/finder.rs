use std::panic::AssertUnwindSafe;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use futures::FutureExt;
use tokio::sync::watch;
use tracing::{error, info, warn};

use super::state::{
    FinderState, Outcome, StatusUpdate, LISTENING_MESSAGE, NOT_IDENTIFIED_MESSAGE, NO_MATCHES_MESSAGE,
    RECOGNIZING_MESSAGE, STILL_WORKING_MESSAGE,
};
use crate::audio::AudioCapture;
use crate::error::FinderError;
use crate::lookup::SoundtrackLookup;
use crate::recognition::SongRecognizer;

/// Timing of a listen cycle
#[derive(Debug, Clone)]
pub struct FinderOptions {
    /// Length of the recording
    pub capture_duration: Duration,
    /// Delay before the "still working" message during lookup
    pub still_working_after: Duration,
}

impl Default for FinderOptions {
    fn default() -> Self {
        Self {
            capture_duration: Duration::from_secs(10),
            still_working_after: Duration::from_secs(5),
        }
    }
}

/// Runs capture → recognition → lookup for one user request at a time
pub struct SongFinder {
    capture: Arc<dyn AudioCapture>,
    recognizer: Arc<dyn SongRecognizer>,
    lookup: Arc<dyn SoundtrackLookup>,
    options: FinderOptions,

    /// Loading flag; a second `run` while set is rejected
    busy: Arc<AtomicBool>,

    status_tx: watch::Sender<StatusUpdate>,

    /// Outcome of the most recent cycle, cleared when a new one starts
    last_outcome: Mutex<Option<Outcome>>,
}

/// Clears the loading flag however the cycle ends
struct BusyGuard(Arc<AtomicBool>);

impl Drop for BusyGuard {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

impl SongFinder {
    pub fn new(
        capture: Arc<dyn AudioCapture>,
        recognizer: Arc<dyn SongRecognizer>,
        lookup: Arc<dyn SoundtrackLookup>,
        options: FinderOptions,
    ) -> Self {
        let (status_tx, _) = watch::channel(StatusUpdate::default());

        Self {
            capture,
            recognizer,
            lookup,
            options,
            busy: Arc::new(AtomicBool::new(false)),
            status_tx,
            last_outcome: Mutex::new(None),
        }
    }

    /// Receive every status change
    pub fn subscribe(&self) -> watch::Receiver<StatusUpdate> {
        self.status_tx.subscribe()
    }

    /// Current status snapshot
    pub fn status(&self) -> StatusUpdate {
        self.status_tx.borrow().clone()
    }

    pub fn is_busy(&self) -> bool {
        self.busy.load(Ordering::SeqCst)
    }

    /// Outcome of the last completed cycle
    pub fn last_outcome(&self) -> Option<Outcome> {
        self.last_outcome
            .lock()
            .map(|guard| guard.clone())
            .unwrap_or_else(|poisoned| poisoned.into_inner().clone())
    }

    /// Run one listen cycle
    ///
    /// Fails only when another cycle is already running. Every other failure
    /// is reported through the returned `Outcome`.
    pub async fn run(&self) -> Result<Outcome, FinderError> {
        if self
            .busy
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            warn!("Listen cycle already in progress");
            return Err(FinderError::Busy);
        }
        let _guard = BusyGuard(Arc::clone(&self.busy));

        self.set_last_outcome(None);

        let outcome = self.run_cycle().await;
        match outcome.song() {
            Some(song) => info!("Listen cycle finished ({:?}) for {}", outcome.kind(), song),
            None => info!("Listen cycle finished ({:?})", outcome.kind()),
        }

        self.set_last_outcome(Some(outcome.clone()));
        self.status_tx.send_replace(StatusUpdate {
            state: FinderState::Done(outcome.kind()),
            message: outcome.message(),
            busy: false,
        });

        Ok(outcome)
    }

    async fn run_cycle(&self) -> Outcome {
        self.publish(FinderState::Listening, LISTENING_MESSAGE);

        let captured = AssertUnwindSafe(self.capture.capture(self.options.capture_duration))
            .catch_unwind()
            .await;
        let clip = match captured {
            Ok(Ok(clip)) => clip,
            Ok(Err(e)) => {
                error!("Capture failed: {}", e);
                return Outcome::Error {
                    message: format!("Could not record audio: {}", e),
                };
            }
            Err(_) => {
                error!("Capture panicked");
                return Outcome::Error {
                    message: "Could not record audio.".to_string(),
                };
            }
        };

        self.publish(FinderState::Recognizing, RECOGNIZING_MESSAGE);

        let song = match AssertUnwindSafe(self.recognizer.recognize(&clip))
            .catch_unwind()
            .await
        {
            Ok(Some(song)) => song,
            Ok(None) => {
                info!("Song not identified");
                return Outcome::NoMatch { song: None };
            }
            Err(_) => {
                error!("Recognition panicked");
                return Outcome::Error {
                    message: NOT_IDENTIFIED_MESSAGE.to_string(),
                };
            }
        };

        self.publish(
            FinderState::SearchingSoundtrack,
            &format!(
                "Song identified: {} by {}. Searching soundtrack...",
                song.song_title, song.artist
            ),
        );

        let response = {
            let lookup = AssertUnwindSafe(self.lookup.find(&song)).catch_unwind();
            tokio::pin!(lookup);
            let still_working = tokio::time::sleep(self.options.still_working_after);
            tokio::pin!(still_working);
            let mut reminded = false;

            loop {
                tokio::select! {
                    response = &mut lookup => break response,
                    _ = &mut still_working, if !reminded => {
                        reminded = true;
                        self.publish(FinderState::SearchingSoundtrack, STILL_WORKING_MESSAGE);
                    }
                }
            }
        };

        match response {
            Ok(Some(response)) => match response.soundtrack_result() {
                Some(soundtrack) => {
                    if soundtrack.is_empty() {
                        warn!("Soundtrack answer for {} lists no titles", song);
                    }
                    info!(
                        "Found {} movies and {} TV shows for {}",
                        soundtrack.movies.len(),
                        soundtrack.tv_shows.len(),
                        song
                    );
                    Outcome::Success { song, soundtrack }
                }
                None => {
                    info!("No soundtrack matches (status {:?})", response.status);
                    Outcome::NoMatch { song: Some(song) }
                }
            },
            Ok(None) => Outcome::NoMatch { song: Some(song) },
            Err(_) => {
                error!("Soundtrack lookup panicked");
                Outcome::Error {
                    message: NO_MATCHES_MESSAGE.to_string(),
                }
            }
        }
    }

    fn publish(&self, state: FinderState, message: &str) {
        info!("[{}] {}", state.as_str(), message);
        self.status_tx.send_replace(StatusUpdate {
            state,
            message: message.to_string(),
            busy: true,
        });
    }

    fn set_last_outcome(&self, outcome: Option<Outcome>) {
        match self.last_outcome.lock() {
            Ok(mut guard) => *guard = outcome,
            Err(poisoned) => *poisoned.into_inner() = outcome,
        }
    }
}
