//! Speech synthesis and playback
//!
//! At most one playback is active per [`PlaybackSlot`]. The slot is owned by
//! the caller; starting a new speech stops whatever the slot held first.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use async_trait::async_trait;
use tokio::sync::watch;

use super::playback::AudioSink;
use crate::error::SynthesisFailure;
use crate::notify::Notifier;
use crate::{Error, Result};

/// Text-to-speech backend
#[async_trait]
pub trait Synthesizer: Send + Sync {
    /// Synthesize `text` in `voice`, returning encoded audio (MP3)
    ///
    /// # Errors
    ///
    /// Returns [`Error::SynthesisUnavailable`] when the service refuses
    async fn synthesize(&self, text: &str, voice: &str) -> Result<Vec<u8>>;
}

/// How a speech request ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpeechOutcome {
    /// Played to the end
    Finished,
    /// Synthesis or playback failed; already reported to the user
    Failed,
    /// Stopped or superseded before finishing
    Cancelled,
}

#[derive(Debug)]
struct Control {
    stopped: AtomicBool,
    stop_tx: watch::Sender<bool>,
}

impl Control {
    fn stop(&self) {
        self.stopped.store(true, Ordering::Release);
        self.stop_tx.send_replace(true);
    }

    fn is_stopped(&self) -> bool {
        self.stopped.load(Ordering::Acquire)
    }
}

/// Handle to one speech request
///
/// Dropping the handle stops playback.
#[derive(Debug)]
pub struct PlaybackHandle {
    id: u64,
    control: Arc<Control>,
    done: Arc<AtomicBool>,
}

impl PlaybackHandle {
    /// Request identifier, unique per speaker
    #[must_use]
    pub const fn id(&self) -> u64 {
        self.id
    }

    /// Halt and discard this playback; safe to call repeatedly
    pub fn stop(&self) {
        if !self.is_done() {
            tracing::debug!(playback = self.id, "stopping playback");
        }
        self.control.stop();
    }

    /// Whether the request has resolved
    #[must_use]
    pub fn is_done(&self) -> bool {
        self.done.load(Ordering::Acquire)
    }
}

impl Drop for PlaybackHandle {
    fn drop(&mut self) {
        self.control.stop();
    }
}

/// Caller-owned holder for the single active playback
#[derive(Debug, Default)]
pub struct PlaybackSlot {
    current: Option<PlaybackHandle>,
}

impl PlaybackSlot {
    /// Empty slot
    #[must_use]
    pub const fn new() -> Self {
        Self { current: None }
    }

    /// Stop and discard the held playback, if any
    pub fn stop_speaking(&mut self) {
        if let Some(handle) = self.current.take() {
            handle.stop();
        }
    }

    /// Id of the held playback
    #[must_use]
    pub fn current_id(&self) -> Option<u64> {
        self.current.as_ref().map(PlaybackHandle::id)
    }

    /// Whether the held playback is still in flight
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.current.as_ref().is_some_and(|h| !h.is_done())
    }
}

/// Speech synthesis client
pub struct Speaker {
    synthesizer: Arc<dyn Synthesizer>,
    sink: Arc<dyn AudioSink>,
    notifier: Notifier,
    next_id: AtomicU64,
}

impl Speaker {
    /// Create a speaker
    #[must_use]
    pub fn new(
        synthesizer: Arc<dyn Synthesizer>,
        sink: Arc<dyn AudioSink>,
        notifier: Notifier,
    ) -> Self {
        Self {
            synthesizer,
            sink,
            notifier,
            next_id: AtomicU64::new(1),
        }
    }

    /// Speak `text` in `voice`, replacing whatever `slot` was playing
    ///
    /// `on_complete` fires exactly once: when playback ends, when synthesis
    /// fails (after notifying the user), or when the request is stopped or
    /// superseded. Returns the new playback id. Must be called within a tokio
    /// runtime.
    pub fn speak<F>(&self, slot: &mut PlaybackSlot, text: &str, voice: &str, on_complete: F) -> u64
    where
        F: FnOnce(SpeechOutcome) + Send + 'static,
    {
        slot.stop_speaking();

        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let (stop_tx, stop_rx) = watch::channel(false);
        let control = Arc::new(Control {
            stopped: AtomicBool::new(false),
            stop_tx,
        });
        let done = Arc::new(AtomicBool::new(false));

        let request = SpeechRequest {
            id,
            text: text.to_string(),
            voice: voice.to_string(),
            synthesizer: Arc::clone(&self.synthesizer),
            sink: Arc::clone(&self.sink),
            notifier: self.notifier.clone(),
            control: Arc::clone(&control),
        };
        let task_done = Arc::clone(&done);
        tokio::spawn(async move {
            let outcome = request.run(stop_rx).await;
            task_done.store(true, Ordering::Release);
            tracing::debug!(playback = id, ?outcome, "speech resolved");
            on_complete(outcome);
        });

        slot.current = Some(PlaybackHandle { id, control, done });
        id
    }
}

struct SpeechRequest {
    id: u64,
    text: String,
    voice: String,
    synthesizer: Arc<dyn Synthesizer>,
    sink: Arc<dyn AudioSink>,
    notifier: Notifier,
    control: Arc<Control>,
}

impl SpeechRequest {
    async fn run(self, mut stop_rx: watch::Receiver<bool>) -> SpeechOutcome {
        tracing::debug!(playback = self.id, voice = %self.voice, "speaking");

        let synthesized = tokio::select! {
            // Resolves on stop, or when the handle is dropped
            _ = async { let _ = stop_rx.wait_for(|stopped| *stopped).await; } => {
                return SpeechOutcome::Cancelled;
            }
            result = self.synthesizer.synthesize(&self.text, &self.voice) => result,
        };

        let audio = match synthesized {
            Ok(audio) => audio,
            Err(e) => {
                if self.control.is_stopped() {
                    return SpeechOutcome::Cancelled;
                }
                self.report(&e);
                return SpeechOutcome::Failed;
            }
        };

        if self.control.is_stopped() {
            return SpeechOutcome::Cancelled;
        }

        let sink = Arc::clone(&self.sink);
        let control = Arc::clone(&self.control);
        let played =
            tokio::task::spawn_blocking(move || sink.play(&audio, &control.stopped)).await;

        if self.control.is_stopped() {
            return SpeechOutcome::Cancelled;
        }

        match played {
            Ok(Ok(())) => SpeechOutcome::Finished,
            Ok(Err(e)) => {
                tracing::warn!(playback = self.id, error = %e, "playback failed");
                self.notifier.info("Voice temporarily unavailable");
                SpeechOutcome::Failed
            }
            Err(e) => {
                tracing::error!(playback = self.id, error = %e, "playback task failed");
                self.notifier.info("Voice temporarily unavailable");
                SpeechOutcome::Failed
            }
        }
    }

    /// Map a synthesis failure to a user notice; never fatal
    fn report(&self, error: &Error) {
        tracing::warn!(playback = self.id, error = %error, "speech synthesis failed");
        match error {
            Error::SynthesisUnavailable(SynthesisFailure::RateLimited) => self.notifier.info(
                "Voice temporarily unavailable due to rate limits. Text will still appear.",
            ),
            Error::SynthesisUnavailable(SynthesisFailure::TermsRequired) => self.notifier.info(
                "Voice service requires acceptance of terms. Text will still appear.",
            ),
            Error::SynthesisUnavailable(SynthesisFailure::Unavailable(detail)) => {
                self.notifier.error(format!("Voice unavailable: {detail}"));
            }
            _ => self.notifier.info("Voice temporarily unavailable"),
        }
    }
}
