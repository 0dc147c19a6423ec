//! Turn sequencer for the voice interview loop
//!
//! Chains "interviewer speaks" → "listen" → "transcript becomes input". The
//! sequencer is driven explicitly: the owner reports appended turns through
//! [`TurnSequencer::on_turn_appended`] and feeds back the [`VoiceEvent`]s that
//! voice operations emit on completion. Only one voice operation runs at a
//! time: speech resolves before listening starts, and an interviewer turn that
//! arrives mid-recording is spoken once the recording resolves.
//!
//! ```text
//!            assistant turn            speech done
//!   ┌──────┐ ───────────────► ┌──────────┐ ───────────► ┌───────────┐
//!   │ IDLE │                  │ SPEAKING │              │ LISTENING │
//!   └──────┘ ◄─────────────── └──────────┘              └───────────┘
//!      ▲ │     voice off                                      │
//!      │ │ user sends                       transcript/error  │
//!      │ ▼                                                    │
//!   ┌───────────────────┐                                     │
//!   │ AWAITING_RESPONSE │          ◄──────────────────────────┘
//!   └───────────────────┘
//! ```

use std::sync::Arc;

use crate::notify::Notifier;
use crate::transcript::{Role, Turn};
use crate::voice::{PlaybackSlot, RecordingHandle, Recorder, Speaker, SpeechOutcome};

/// Observable state of the interview loop
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TurnState {
    /// Nothing in flight
    Idle,
    /// Waiting on the backend for the interviewer's reply
    AwaitingResponse,
    /// Interviewer audio playing
    Speaking,
    /// Microphone capturing, or its utterance being transcribed
    Listening,
}

/// Completion of an asynchronous voice operation
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VoiceEvent {
    /// A speech request resolved
    SpeechFinished {
        /// Sequencer-assigned speech number
        speech: u64,
        /// How it ended
        outcome: SpeechOutcome,
    },
    /// A recording produced a transcript (possibly empty)
    Transcript {
        /// Sequencer-assigned recording number
        recording: u64,
        /// Transcribed text
        text: String,
    },
    /// A recording failed; already reported to the user
    ListenFailed {
        /// Sequencer-assigned recording number
        recording: u64,
        /// Failure description
        error: String,
    },
}

/// Where voice completions are delivered
pub type VoiceEventSink = Arc<dyn Fn(VoiceEvent) + Send + Sync>;

/// Recorder and speaker used by the sequencer
pub struct VoiceServices {
    /// Silence-gated recorder
    pub recorder: Recorder,
    /// Speech synthesis client
    pub speaker: Speaker,
}

struct ActiveRecording {
    number: u64,
    handle: RecordingHandle,
}

/// Drives automatic speak/listen transitions
pub struct TurnSequencer {
    voice: Option<VoiceServices>,
    sink: VoiceEventSink,
    notifier: Notifier,
    voice_output: bool,
    interviewer_voice: Option<String>,
    last_spoken: Option<usize>,
    pending_speech: Option<String>,
    awaiting_response: bool,
    speaking: Option<u64>,
    playback: PlaybackSlot,
    recording: Option<ActiveRecording>,
    next_number: u64,
    ended: bool,
}

impl TurnSequencer {
    /// Create a sequencer
    ///
    /// With `voice` set to `None` the loop is text-only: nothing is spoken and
    /// listening requests are refused with a notice.
    #[must_use]
    pub fn new(
        voice: Option<VoiceServices>,
        voice_output: bool,
        sink: VoiceEventSink,
        notifier: Notifier,
    ) -> Self {
        Self {
            voice,
            sink,
            notifier,
            voice_output,
            interviewer_voice: None,
            last_spoken: None,
            pending_speech: None,
            awaiting_response: false,
            speaking: None,
            playback: PlaybackSlot::new(),
            recording: None,
            next_number: 1,
            ended: false,
        }
    }

    /// Current loop state
    #[must_use]
    pub fn state(&self) -> TurnState {
        if self.ended {
            TurnState::Idle
        } else if self.recording.is_some() {
            TurnState::Listening
        } else if self.speaking.is_some() {
            TurnState::Speaking
        } else if self.awaiting_response {
            TurnState::AwaitingResponse
        } else {
            TurnState::Idle
        }
    }

    /// Whether the microphone is currently held
    #[must_use]
    pub fn is_recording(&self) -> bool {
        self.recording
            .as_ref()
            .is_some_and(|r| r.handle.is_recording())
    }

    /// Whether interviewer turns are spoken
    #[must_use]
    pub const fn voice_output_enabled(&self) -> bool {
        self.voice_output
    }

    /// Whether voice services are available at all
    #[must_use]
    pub const fn has_voice(&self) -> bool {
        self.voice.is_some()
    }

    /// Whether the loop has been ended
    #[must_use]
    pub const fn is_ended(&self) -> bool {
        self.ended
    }

    /// Index of the last turn handed to speech
    #[must_use]
    pub const fn last_spoken(&self) -> Option<usize> {
        self.last_spoken
    }

    /// Start a fresh interview loop with the interviewer's voice
    pub fn begin(&mut self, interviewer_voice: Option<String>) {
        self.reset();
        self.interviewer_voice = interviewer_voice;
    }

    /// Record whether a backend reply is pending
    pub const fn set_awaiting_response(&mut self, awaiting: bool) {
        self.awaiting_response = awaiting;
    }

    /// React to a newly appended turn
    ///
    /// Each assistant turn is spoken at most once.
    pub fn on_turn_appended(&mut self, index: usize, turn: &Turn) {
        if self.ended
            || !self.voice_output
            || turn.role != Role::Assistant
            || self.last_spoken == Some(index)
        {
            return;
        }
        if self.voice.is_none() || self.interviewer_voice.is_none() {
            return;
        }

        self.last_spoken = Some(index);

        if self.recording.is_some() {
            tracing::debug!(index, "recording in progress, deferring speech");
            self.pending_speech = Some(turn.content.clone());
            return;
        }

        self.speak(&turn.content);
    }

    fn speak(&mut self, text: &str) {
        let (Some(voice), Some(voice_id)) = (&self.voice, &self.interviewer_voice) else {
            return;
        };

        let number = self.next_number;
        self.next_number += 1;
        self.speaking = Some(number);

        let sink = Arc::clone(&self.sink);
        voice
            .speaker
            .speak(&mut self.playback, text, voice_id, move |outcome| {
                sink(VoiceEvent::SpeechFinished {
                    speech: number,
                    outcome,
                });
            });
    }

    fn start_listening(&mut self) {
        let Some(voice) = &self.voice else {
            self.notifier.info("Voice input is disabled");
            return;
        };

        // Drop any session still transcribing; its result is discarded
        if let Some(mut previous) = self.recording.take() {
            previous.handle.abort();
        }

        let number = self.next_number;
        self.next_number += 1;

        let on_transcript = {
            let sink = Arc::clone(&self.sink);
            move |text: String| {
                sink(VoiceEvent::Transcript {
                    recording: number,
                    text,
                });
            }
        };
        let on_error = {
            let sink = Arc::clone(&self.sink);
            move |error: crate::Error| {
                sink(VoiceEvent::ListenFailed {
                    recording: number,
                    error: error.to_string(),
                });
            }
        };

        if let Some(handle) = voice.recorder.start_listening(on_transcript, on_error) {
            self.recording = Some(ActiveRecording { number, handle });
        }
    }

    /// Toggle the microphone
    ///
    /// Stopping keeps the captured audio and transcribes it. Starting halts any
    /// interviewer speech first. Returns whether a recording is now active.
    pub fn toggle_listening(&mut self) -> bool {
        if self.ended {
            return false;
        }

        if let Some(active) = self.recording.as_mut() {
            if active.handle.is_recording() {
                active.handle.stop();
                return false;
            }
        }

        self.stop_speaking();
        self.start_listening();
        self.is_recording()
    }

    /// Toggle interviewer speech; disabling halts active playback
    ///
    /// Returns the new setting.
    pub fn toggle_voice_output(&mut self) -> bool {
        if self.voice_output {
            self.stop_speaking();
            self.pending_speech = None;
        }
        self.voice_output = !self.voice_output;
        tracing::info!(enabled = self.voice_output, "voice output toggled");
        self.voice_output
    }

    fn stop_speaking(&mut self) {
        self.playback.stop_speaking();
        self.speaking = None;
    }

    /// Apply a voice completion
    ///
    /// Returns the transcript when a recording resolved with text for the
    /// caller to use as input. Stale events are ignored.
    pub fn handle(&mut self, event: VoiceEvent) -> Option<String> {
        match event {
            VoiceEvent::SpeechFinished { speech, outcome } => {
                if self.speaking != Some(speech) {
                    return None;
                }
                self.speaking = None;
                self.playback.stop_speaking();

                if self.ended || outcome == SpeechOutcome::Cancelled {
                    return None;
                }
                if self.recording.is_some() {
                    return None;
                }

                tracing::debug!(?outcome, "speech done, listening");
                self.start_listening();
                None
            }
            VoiceEvent::Transcript { recording, text } => {
                if !self.take_recording(recording) || self.ended {
                    return None;
                }
                self.resume_pending_speech();
                Some(text)
            }
            VoiceEvent::ListenFailed { recording, error } => {
                if self.take_recording(recording) {
                    tracing::warn!(%error, "listening failed");
                    self.resume_pending_speech();
                }
                None
            }
        }
    }

    fn take_recording(&mut self, number: u64) -> bool {
        if self.recording.as_ref().is_some_and(|r| r.number == number) {
            self.recording = None;
            true
        } else {
            false
        }
    }

    fn resume_pending_speech(&mut self) {
        if self.ended || !self.voice_output {
            self.pending_speech = None;
            return;
        }
        if let Some(text) = self.pending_speech.take() {
            self.speak(&text);
        }
    }

    /// Leave the loop: stop speech, discard any recording, and make no
    /// further automatic transitions
    pub fn end(&mut self) {
        self.ended = true;
        self.stop_speaking();
        self.pending_speech = None;
        if let Some(mut active) = self.recording.take() {
            active.handle.abort();
        }
    }

    /// Return to the initial state for a new interview
    ///
    /// The voice output setting is kept.
    pub fn reset(&mut self) {
        self.end();
        self.ended = false;
        self.interviewer_voice = None;
        self.last_spoken = None;
        self.awaiting_response = false;
    }
}
