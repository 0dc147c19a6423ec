//! Silence-gated recording
//!
//! A recording session buffers microphone audio while sampling its energy on a
//! short timer. It ends on an explicit [`RecordingHandle::stop`] or after
//! continuous silence, then releases the microphone and transcribes the
//! utterance. Results are delivered through the callbacks given to
//! [`Recorder::start_listening`]; errors never reach the caller's control flow.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use async_trait::async_trait;
use tokio::sync::oneshot;
use tokio::time::{Instant, MissedTickBehavior};

use super::capture::{AudioStream, Microphone, Utterance, rms_energy};
use super::silence::SilenceDetector;
use crate::config::SilenceSettings;
use crate::notify::Notifier;
use crate::{Error, Result};

/// Speech-to-text backend
#[async_trait]
pub trait Transcriber: Send + Sync {
    /// Transcribe one utterance; single attempt, no retry
    ///
    /// # Errors
    ///
    /// Returns [`Error::TranscriptionFailed`] when the service rejects the audio
    async fn transcribe(&self, utterance: &Utterance) -> Result<String>;
}

/// Lifecycle of a recording session
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordingState {
    /// Microphone held, audio buffering
    Recording,
    /// Microphone released
    Stopped,
}

/// Why a recording ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    /// Continuous silence reached the configured duration
    Silence,
    /// Stopped explicitly; the utterance is still transcribed
    Manual,
    /// Discarded without transcription
    Aborted,
}

#[derive(Debug)]
struct Shared {
    recording: AtomicBool,
    aborted: AtomicBool,
}

/// Handle to an active recording session
///
/// Dropping the handle aborts the session.
#[derive(Debug)]
pub struct RecordingHandle {
    id: u64,
    stop_tx: Option<oneshot::Sender<StopReason>>,
    shared: Arc<Shared>,
}

impl RecordingHandle {
    /// Session identifier, unique per recorder
    #[must_use]
    pub const fn id(&self) -> u64 {
        self.id
    }

    /// Current state
    #[must_use]
    pub fn state(&self) -> RecordingState {
        if self.shared.recording.load(Ordering::Acquire) {
            RecordingState::Recording
        } else {
            RecordingState::Stopped
        }
    }

    /// Whether the microphone is still held
    #[must_use]
    pub fn is_recording(&self) -> bool {
        self.state() == RecordingState::Recording
    }

    /// Stop recording and transcribe what was captured
    ///
    /// No-op if the session already stopped.
    pub fn stop(&mut self) {
        if let Some(tx) = self.stop_tx.take() {
            let _ = tx.send(StopReason::Manual);
        }
    }

    /// Stop recording and discard the audio; no callback will fire
    pub fn abort(&mut self) {
        self.shared.aborted.store(true, Ordering::Release);
        if let Some(tx) = self.stop_tx.take() {
            let _ = tx.send(StopReason::Aborted);
        }
    }
}

impl Drop for RecordingHandle {
    fn drop(&mut self) {
        self.abort();
    }
}

/// Starts silence-gated recording sessions
pub struct Recorder {
    microphone: Arc<dyn Microphone>,
    transcriber: Arc<dyn Transcriber>,
    settings: SilenceSettings,
    notifier: Notifier,
    next_id: AtomicU64,
}

impl Recorder {
    /// Create a recorder
    #[must_use]
    pub fn new(
        microphone: Arc<dyn Microphone>,
        transcriber: Arc<dyn Transcriber>,
        settings: SilenceSettings,
        notifier: Notifier,
    ) -> Self {
        Self {
            microphone,
            transcriber,
            settings,
            notifier,
            next_id: AtomicU64::new(1),
        }
    }

    /// Acquire the microphone and start a recording session
    ///
    /// Exactly one of `on_transcript` or `on_error` is called when the session
    /// resolves, unless it is aborted. Microphone failures call `on_error`
    /// immediately and return `None`. Must be called within a tokio runtime.
    pub fn start_listening<T, E>(&self, on_transcript: T, on_error: E) -> Option<RecordingHandle>
    where
        T: FnOnce(String) + Send + 'static,
        E: FnOnce(Error) + Send + 'static,
    {
        let stream = match self.microphone.open() {
            Ok(stream) => stream,
            Err(e) => {
                tracing::warn!(error = %e, "microphone unavailable");
                self.notifier.error("Microphone access denied");
                on_error(e);
                return None;
            }
        };

        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let shared = Arc::new(Shared {
            recording: AtomicBool::new(true),
            aborted: AtomicBool::new(false),
        });
        let (stop_tx, stop_rx) = oneshot::channel();

        let session = Session {
            id,
            stream,
            stop_rx,
            shared: Arc::clone(&shared),
            transcriber: Arc::clone(&self.transcriber),
            settings: self.settings,
            notifier: self.notifier.clone(),
        };
        tokio::spawn(session.run(on_transcript, on_error));

        tracing::info!(recording = id, "listening");
        Some(RecordingHandle {
            id,
            stop_tx: Some(stop_tx),
            shared,
        })
    }
}

struct Session {
    id: u64,
    stream: Box<dyn AudioStream>,
    stop_rx: oneshot::Receiver<StopReason>,
    shared: Arc<Shared>,
    transcriber: Arc<dyn Transcriber>,
    settings: SilenceSettings,
    notifier: Notifier,
}

impl Session {
    async fn run<T, E>(mut self, on_transcript: T, on_error: E)
    where
        T: FnOnce(String) + Send + 'static,
        E: FnOnce(Error) + Send + 'static,
    {
        let sample_rate = self.stream.sample_rate();
        let mut detector = SilenceDetector::new(&self.settings);
        let mut samples = Vec::new();

        let mut ticker = tokio::time::interval(self.settings.sample_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        let reason = loop {
            tokio::select! {
                stop = &mut self.stop_rx => {
                    // Sender dropped without a message means the handle went away
                    break stop.unwrap_or(StopReason::Aborted);
                }
                _ = ticker.tick() => {
                    let frames = self.stream.take_buffer();
                    let energy = rms_energy(&frames);
                    samples.extend_from_slice(&frames);

                    if detector.observe(energy, Instant::now()) {
                        tracing::info!(recording = self.id, "auto-stopping after silence");
                        break StopReason::Silence;
                    }
                }
            }
        };

        samples.extend(self.stream.take_buffer());
        self.stream.close();
        self.shared.recording.store(false, Ordering::Release);
        tracing::debug!(
            recording = self.id,
            ?reason,
            samples = samples.len(),
            "recording stopped"
        );

        if reason == StopReason::Aborted || self.shared.aborted.load(Ordering::Acquire) {
            return;
        }

        let utterance = Utterance::new(samples, sample_rate);
        let result = if utterance.is_empty() {
            tracing::debug!(recording = self.id, "no audio captured, skipping transcription");
            Ok(String::new())
        } else {
            self.transcriber.transcribe(&utterance).await
        };

        if self.shared.aborted.load(Ordering::Acquire) {
            return;
        }

        match result {
            Ok(transcript) => on_transcript(transcript),
            Err(e) => {
                let detail = match &e {
                    Error::TranscriptionFailed(detail) => detail.clone(),
                    other => other.to_string(),
                };
                self.notifier.error(format!("Transcription failed: {detail}"));
                on_error(e);
            }
        }
    }
}
