//! Interview Partner - voice client for AI mock interviews
//!
//! This library provides the client side of a mock-interview service:
//! - Silence-gated recording and transcription
//! - Interviewer speech synthesis and playback
//! - Automatic speak/listen turn sequencing
//! - REST client for the interview backend
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────┐
//! │                 Terminal front end                  │
//! │     setup form  │  transcript  │  feedback report   │
//! └────────────────────┬────────────────────────────────┘
//!                      │ Event / Update
//! ┌────────────────────▼────────────────────────────────┐
//! │                       App                           │
//! │   session state  │  TurnSequencer  │  Notifier      │
//! └────────┬───────────────────┬────────────────────────┘
//!          │                   │
//! ┌────────▼─────────┐ ┌───────▼─────────────────────────┐
//! │  BackendClient   │ │  Recorder  │  Speaker           │
//! │  start/chat/     │ │  mic → silence → transcribe     │
//! │  feedback/stt/tts│ │  synthesize → playback          │
//! └──────────────────┘ └─────────────────────────────────┘
//! ```

pub mod app;
pub mod backend;
pub mod config;
pub mod error;
pub mod feedback;
pub mod notify;
pub mod sequencer;
pub mod setup;
pub mod transcript;
pub mod voice;

pub use app::{App, Event, Screen, Update};
pub use backend::{BackendClient, Difficulty, InterviewBackend, InterviewConfig};
pub use config::Config;
pub use error::{Error, Result};
pub use feedback::{FeedbackReport, ScoreBand};
pub use notify::{Notice, NoticeLevel, Notifier};
pub use sequencer::{TurnSequencer, TurnState, VoiceEvent, VoiceServices};
pub use transcript::{Role, Transcript, Turn};
