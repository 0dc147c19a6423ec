//! Interview application state
//!
//! A single event loop owns all session state. User intents and completions of
//! asynchronous work arrive as [`Event`]s on one channel; spawned backend calls
//! and voice callbacks post their results back to the same channel, so state
//! is only ever touched from [`App::handle`]. Changes the front end should
//! render go out as [`Update`]s.

use std::ops::ControlFlow;
use std::sync::Arc;

use tokio::sync::mpsc;

use crate::Error;
use crate::backend::{
    ChatResponse, FeedbackResponse, InterviewBackend, InterviewConfig, StartInterviewResponse,
};
use crate::config::Config;
use crate::feedback::FeedbackReport;
use crate::notify::Notifier;
use crate::sequencer::{TurnSequencer, TurnState, VoiceEvent, VoiceServices};
use crate::transcript::{Transcript, Turn};

/// Closing message appended when the candidate ends the interview
pub const END_MESSAGE: &str =
    "Give me a moment to review your performance and compile detailed feedback...";

/// Which view is active
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Screen {
    /// Collecting role, difficulty and resume
    Setup,
    /// Conversation in progress
    Interview,
    /// Feedback summary shown
    Feedback,
}

/// Input to the application loop
#[derive(Debug)]
pub enum Event {
    /// Start an interview with the given settings
    Start(InterviewConfig),
    /// Send a message; an empty string sends the current draft
    Submit(String),
    /// Replace the draft without sending
    SetDraft(String),
    /// Toggle the microphone
    ToggleListening,
    /// Toggle interviewer speech
    ToggleVoice,
    /// End the interview and request feedback
    EndInterview,
    /// Discard the session and return to setup
    Restart,
    /// Leave the application
    Quit,
    /// Backend answered a start request
    Started(crate::Result<StartInterviewResponse>),
    /// Backend answered a chat message
    Replied {
        /// Session the message belonged to
        session_id: String,
        /// Reply or failure
        result: crate::Result<ChatResponse>,
    },
    /// Backend answered a feedback request
    FeedbackReady {
        /// Session the feedback belongs to
        session_id: String,
        /// Feedback or failure
        result: crate::Result<FeedbackResponse>,
    },
    /// A voice operation resolved
    Voice(VoiceEvent),
}

/// Output for the front end
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Update {
    /// Active view changed
    Screen(Screen),
    /// A turn was appended to the transcript
    Turn(Turn),
    /// Draft text changed
    Draft(String),
    /// A backend request started or finished
    Loading(bool),
    /// Loop state changed
    TurnState(TurnState),
    /// Interviewer speech toggled
    VoiceOutput(bool),
    /// Feedback summary is ready
    Feedback(FeedbackReport),
}

/// State of the current interview session
#[derive(Debug, Default)]
pub struct Session {
    /// Backend session id, set once started
    pub session_id: Option<String>,
    /// Conversation so far
    pub transcript: Transcript,
    /// Whether the interview is still running
    pub interviewing: bool,
    /// Feedback, once fetched
    pub feedback: Option<FeedbackReport>,
    /// Voice the interviewer speaks with
    pub interviewer_voice: Option<String>,
    /// Interviewer display name
    pub interviewer_name: Option<String>,
    /// Pending message text
    pub draft: String,
    /// A backend request is in flight
    pub loading: bool,
}

/// Interview application
pub struct App {
    config: Config,
    backend: Arc<dyn InterviewBackend>,
    sequencer: TurnSequencer,
    notifier: Notifier,
    events: mpsc::UnboundedSender<Event>,
    updates: mpsc::UnboundedSender<Update>,
    screen: Screen,
    session: Session,
    last_state: TurnState,
}

impl App {
    /// Create the application
    ///
    /// Returns the app with the receiving ends of its event and update
    /// channels. With `voice` set to `None` the interview runs text-only.
    #[must_use]
    pub fn new(
        config: Config,
        backend: Arc<dyn InterviewBackend>,
        voice: Option<VoiceServices>,
        notifier: Notifier,
    ) -> (
        Self,
        mpsc::UnboundedReceiver<Event>,
        mpsc::UnboundedReceiver<Update>,
    ) {
        let (events, events_rx) = mpsc::unbounded_channel();
        let (updates, updates_rx) = mpsc::unbounded_channel();

        let voice_tx = events.clone();
        let sink = Arc::new(move |event: VoiceEvent| {
            let _ = voice_tx.send(Event::Voice(event));
        });
        let voice_output = voice.is_some() && config.voice.enabled;
        let sequencer = TurnSequencer::new(voice, voice_output, sink, notifier.clone());

        let app = Self {
            config,
            backend,
            sequencer,
            notifier,
            events,
            updates,
            screen: Screen::Setup,
            session: Session::default(),
            last_state: TurnState::Idle,
        };
        (app, events_rx, updates_rx)
    }

    /// Sender for posting events to this app
    #[must_use]
    pub fn sender(&self) -> mpsc::UnboundedSender<Event> {
        self.events.clone()
    }

    /// Active view
    #[must_use]
    pub const fn screen(&self) -> Screen {
        self.screen
    }

    /// Current session state
    #[must_use]
    pub const fn session(&self) -> &Session {
        &self.session
    }

    /// Current loop state
    #[must_use]
    pub fn turn_state(&self) -> TurnState {
        self.sequencer.state()
    }

    /// Whether interviewer speech is on
    #[must_use]
    pub const fn voice_output_enabled(&self) -> bool {
        self.sequencer.voice_output_enabled()
    }

    /// Process events until [`Event::Quit`]
    pub async fn run(mut self, mut events: mpsc::UnboundedReceiver<Event>) {
        while let Some(event) = events.recv().await {
            if self.handle(event).is_break() {
                break;
            }
        }
        self.sequencer.end();
        tracing::debug!("application loop exited");
    }

    /// Apply one event
    pub fn handle(&mut self, event: Event) -> ControlFlow<()> {
        match event {
            Event::Start(config) => self.start(config),
            Event::Submit(text) => self.submit(text),
            Event::SetDraft(text) => self.set_draft(text),
            Event::ToggleListening => self.toggle_listening(),
            Event::ToggleVoice => self.toggle_voice(),
            Event::EndInterview => self.end_interview(),
            Event::Restart => self.restart(),
            Event::Quit => return ControlFlow::Break(()),
            Event::Started(result) => self.on_started(result),
            Event::Replied { session_id, result } => self.on_replied(&session_id, result),
            Event::FeedbackReady { session_id, result } => {
                self.on_feedback(&session_id, result);
            }
            Event::Voice(event) => {
                if let Some(text) = self.sequencer.handle(event) {
                    self.apply_transcript(&text);
                }
            }
        }

        self.publish_turn_state();
        ControlFlow::Continue(())
    }

    fn emit(&self, update: Update) {
        let _ = self.updates.send(update);
    }

    fn publish_turn_state(&mut self) {
        let state = self.sequencer.state();
        if state != self.last_state {
            self.last_state = state;
            self.emit(Update::TurnState(state));
        }
    }

    fn set_screen(&mut self, screen: Screen) {
        if self.screen != screen {
            self.screen = screen;
            self.emit(Update::Screen(screen));
        }
    }

    fn set_loading(&mut self, loading: bool) {
        if self.session.loading != loading {
            self.session.loading = loading;
            self.emit(Update::Loading(loading));
        }
    }

    fn set_draft(&mut self, text: String) {
        if self.session.draft != text {
            self.session.draft.clone_from(&text);
            self.emit(Update::Draft(text));
        }
    }

    fn append_turn(&mut self, turn: Turn) {
        let index = self.session.transcript.push(turn.clone());
        self.sequencer.on_turn_appended(index, &turn);
        self.emit(Update::Turn(turn));
    }

    fn start(&mut self, config: InterviewConfig) {
        if self.screen != Screen::Setup || self.session.loading {
            return;
        }

        self.set_loading(true);
        let backend = Arc::clone(&self.backend);
        let events = self.events.clone();
        tokio::spawn(async move {
            let result = backend.start_interview(&config).await;
            let _ = events.send(Event::Started(result));
        });
    }

    fn on_started(&mut self, result: crate::Result<StartInterviewResponse>) {
        self.set_loading(false);
        if self.screen != Screen::Setup {
            return;
        }

        let response = match result {
            Ok(response) => response,
            Err(e) => {
                tracing::error!(error = %e, "failed to start interview");
                self.notifier.error(format!(
                    "Failed to start interview. Make sure the backend is running on {}",
                    self.config.backend_url
                ));
                return;
            }
        };

        let voice = response
            .interviewer_voice
            .clone()
            .unwrap_or_else(|| self.config.voice.default_voice.clone());
        tracing::info!(
            session_id = %response.session_id,
            interviewer = ?response.interviewer_name,
            voice = %voice,
            "interview started"
        );

        self.session = Session {
            session_id: Some(response.session_id),
            interviewing: true,
            interviewer_voice: Some(voice.clone()),
            interviewer_name: response.interviewer_name,
            ..Session::default()
        };
        self.sequencer.begin(Some(voice));
        self.set_screen(Screen::Interview);
        self.append_turn(Turn::assistant(response.greeting));
    }

    fn submit(&mut self, text: String) {
        if self.screen != Screen::Interview || !self.session.interviewing || self.session.loading
        {
            return;
        }
        let Some(session_id) = self.session.session_id.clone() else {
            return;
        };

        let message = if text.trim().is_empty() {
            self.session.draft.trim().to_string()
        } else {
            text.trim().to_string()
        };
        if message.is_empty() {
            return;
        }

        self.set_draft(String::new());
        self.append_turn(Turn::user(message.clone()));
        self.set_loading(true);
        self.sequencer.set_awaiting_response(true);

        let backend = Arc::clone(&self.backend);
        let events = self.events.clone();
        tokio::spawn(async move {
            let result = backend.chat(&session_id, &message).await;
            let _ = events.send(Event::Replied { session_id, result });
        });
    }

    fn on_replied(&mut self, session_id: &str, result: crate::Result<ChatResponse>) {
        if self.session.session_id.as_deref() != Some(session_id) {
            tracing::debug!(session_id, "ignoring reply for a previous session");
            return;
        }

        self.set_loading(false);
        self.sequencer.set_awaiting_response(false);

        match result {
            Ok(reply) => {
                if self.session.interviewing {
                    self.append_turn(Turn::assistant(reply.response));
                }
            }
            Err(Error::SessionExpired) => {
                self.notifier.error(
                    "Session expired. The server may have restarted. Please start a new interview.",
                );
                self.restart();
            }
            Err(e) => {
                tracing::error!(error = %e, "failed to send message");
                self.notifier
                    .error("Failed to send message. Please try again.");
            }
        }
    }

    fn end_interview(&mut self) {
        if self.screen != Screen::Interview || self.session.loading {
            return;
        }
        let Some(session_id) = self.session.session_id.clone() else {
            return;
        };

        self.sequencer.end();
        if self.session.interviewing {
            self.session.interviewing = false;
            self.append_turn(Turn::assistant(END_MESSAGE));
        }
        self.set_loading(true);

        let backend = Arc::clone(&self.backend);
        let events = self.events.clone();
        tokio::spawn(async move {
            let result = backend.feedback(&session_id).await;
            let _ = events.send(Event::FeedbackReady { session_id, result });
        });
    }

    fn on_feedback(&mut self, session_id: &str, result: crate::Result<FeedbackResponse>) {
        if self.session.session_id.as_deref() != Some(session_id) {
            return;
        }
        self.set_loading(false);

        match result {
            Ok(feedback) => {
                let report = FeedbackReport::new(feedback);
                self.session.feedback = Some(report.clone());
                self.set_screen(Screen::Feedback);
                self.emit(Update::Feedback(report));
            }
            Err(e) => {
                tracing::error!(error = %e, "failed to get feedback");
                self.notifier
                    .error("Failed to get feedback. Please try again.");
            }
        }
    }

    fn restart(&mut self) {
        tracing::info!("returning to setup");
        self.sequencer.reset();
        self.session = Session::default();
        self.emit(Update::Loading(false));
        self.emit(Update::VoiceOutput(self.sequencer.voice_output_enabled()));
        self.set_screen(Screen::Setup);
    }

    fn toggle_listening(&mut self) {
        if self.screen != Screen::Interview || !self.session.interviewing || self.session.loading
        {
            return;
        }
        if !self.sequencer.has_voice() {
            self.notifier.info("Voice input is disabled");
            return;
        }
        self.sequencer.toggle_listening();
    }

    fn toggle_voice(&mut self) {
        if !self.sequencer.has_voice() {
            self.notifier.info("Voice output is disabled");
            return;
        }
        let enabled = self.sequencer.toggle_voice_output();
        self.emit(Update::VoiceOutput(enabled));
    }

    fn apply_transcript(&mut self, text: &str) {
        let text = text.trim();
        if text.is_empty() {
            self.notifier.info("No speech detected");
            return;
        }
        if self.screen != Screen::Interview || !self.session.interviewing {
            return;
        }

        self.set_draft(text.to_string());
        if self.config.voice.auto_send {
            self.submit(String::new());
        }
    }
}
