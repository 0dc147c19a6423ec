//! Shared test utilities
//!
//! In-memory stand-ins for the backend, microphone, transcriber, synthesizer
//! and speakers so the voice loop can run without audio hardware.

#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::mpsc;
use tokio::time::Instant;

use interview_partner::backend::{ChatResponse, FeedbackResponse, StartInterviewResponse};
use interview_partner::config::SilenceSettings;
use interview_partner::error::SynthesisFailure;
use interview_partner::voice::{
    AudioSink, AudioStream, Microphone, Recorder, SAMPLE_RATE, Speaker, Synthesizer, Transcriber,
    Utterance,
};
use interview_partner::{
    App, Config, Error, Event, InterviewBackend, InterviewConfig, Notice, Notifier, Result,
    VoiceServices,
};

pub const GREETING: &str = "Hi, I'm Alex. Tell me about yourself.";
pub const REPLY: &str = "Great. How does ownership work in Rust?";

/// How the fake backend answers chat messages
#[derive(Debug, Clone)]
pub enum ChatScript {
    Reply(String),
    Expired,
    Fail,
}

/// In-memory interview backend
pub struct FakeBackend {
    pub start_fails: AtomicBool,
    pub chat: Mutex<ChatScript>,
    pub feedback_fails: AtomicBool,
    pub messages: Mutex<Vec<String>>,
    pub voice: Option<String>,
}

impl FakeBackend {
    pub fn new() -> Self {
        Self {
            start_fails: AtomicBool::new(false),
            chat: Mutex::new(ChatScript::Reply(REPLY.to_string())),
            feedback_fails: AtomicBool::new(false),
            messages: Mutex::new(Vec::new()),
            voice: Some("Celeste-PlayAI".to_string()),
        }
    }

    pub fn set_chat(&self, script: ChatScript) {
        *self.chat.lock().unwrap() = script;
    }

    pub fn messages(&self) -> Vec<String> {
        self.messages.lock().unwrap().clone()
    }
}

#[async_trait]
impl InterviewBackend for FakeBackend {
    async fn start_interview(&self, _config: &InterviewConfig) -> Result<StartInterviewResponse> {
        if self.start_fails.load(Ordering::SeqCst) {
            return Err(Error::Backend {
                status: 500,
                detail: "boom".to_string(),
            });
        }
        Ok(StartInterviewResponse {
            session_id: "session-1".to_string(),
            greeting: GREETING.to_string(),
            interviewer_voice: self.voice.clone(),
            interviewer_name: Some("Alex".to_string()),
        })
    }

    async fn chat(&self, _session_id: &str, message: &str) -> Result<ChatResponse> {
        self.messages.lock().unwrap().push(message.to_string());
        let script = self.chat.lock().unwrap().clone();
        match script {
            ChatScript::Reply(response) => Ok(ChatResponse { response }),
            ChatScript::Expired => Err(Error::SessionExpired),
            ChatScript::Fail => Err(Error::Backend {
                status: 500,
                detail: "internal error".to_string(),
            }),
        }
    }

    async fn feedback(&self, _session_id: &str) -> Result<FeedbackResponse> {
        if self.feedback_fails.load(Ordering::SeqCst) {
            return Err(Error::Backend {
                status: 500,
                detail: "internal error".to_string(),
            });
        }
        Ok(FeedbackResponse {
            strengths: vec!["Clear communication".to_string()],
            improvements: vec!["Go deeper on lifetimes".to_string()],
            technical_score: 85,
            communication_score: 55,
            overall_feedback: "Promising candidate.".to_string(),
        })
    }
}

type Amplitude = Arc<dyn Fn(Duration) -> f32 + Send + Sync>;

/// Microphone whose level follows a script over time since opening
pub struct ScriptedMicrophone {
    amplitude: Amplitude,
    chunk: usize,
    deny: bool,
    pub opens: Arc<AtomicUsize>,
    pub closes: Arc<AtomicUsize>,
}

impl ScriptedMicrophone {
    /// Constant-valued chunks whose level is `amplitude(elapsed)`
    pub fn new(amplitude: impl Fn(Duration) -> f32 + Send + Sync + 'static) -> Self {
        Self {
            amplitude: Arc::new(amplitude),
            chunk: 160,
            deny: false,
            opens: Arc::new(AtomicUsize::new(0)),
            closes: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Always loud, so recordings only end when stopped
    pub fn loud() -> Self {
        Self::new(|_| 0.3)
    }

    /// Always quiet
    pub fn quiet() -> Self {
        Self::new(|_| 0.0)
    }

    /// Yields no samples at all
    pub fn empty() -> Self {
        Self {
            chunk: 0,
            ..Self::quiet()
        }
    }

    /// Refuses to open
    pub fn denied() -> Self {
        Self {
            deny: true,
            ..Self::quiet()
        }
    }

    pub fn open_count(&self) -> usize {
        self.opens.load(Ordering::SeqCst)
    }

    pub fn close_count(&self) -> usize {
        self.closes.load(Ordering::SeqCst)
    }
}

impl Microphone for ScriptedMicrophone {
    fn open(&self) -> Result<Box<dyn AudioStream>> {
        if self.deny {
            return Err(Error::PermissionDenied("no input device".to_string()));
        }
        self.opens.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(ScriptedStream {
            amplitude: Arc::clone(&self.amplitude),
            chunk: self.chunk,
            opened_at: Instant::now(),
            closed: false,
            closes: Arc::clone(&self.closes),
        }))
    }
}

struct ScriptedStream {
    amplitude: Amplitude,
    chunk: usize,
    opened_at: Instant,
    closed: bool,
    closes: Arc<AtomicUsize>,
}

impl AudioStream for ScriptedStream {
    fn take_buffer(&mut self) -> Vec<f32> {
        if self.closed {
            return Vec::new();
        }
        let level = (self.amplitude)(self.opened_at.elapsed());
        vec![level; self.chunk]
    }

    fn sample_rate(&self) -> u32 {
        SAMPLE_RATE
    }

    fn close(&mut self) {
        if !self.closed {
            self.closed = true;
            self.closes.fetch_add(1, Ordering::SeqCst);
        }
    }
}

/// Transcriber returning queued results, then a fixed text
pub struct FakeTranscriber {
    queued: Mutex<VecDeque<std::result::Result<String, String>>>,
    fallback: String,
    pub calls: Mutex<Vec<(Instant, usize)>>,
}

impl FakeTranscriber {
    pub fn new(fallback: &str) -> Self {
        Self {
            queued: Mutex::new(VecDeque::new()),
            fallback: fallback.to_string(),
            calls: Mutex::new(Vec::new()),
        }
    }

    /// Queue a result for the next call; `Err` becomes a transcription failure
    pub fn push(&self, result: std::result::Result<&str, &str>) {
        self.queued
            .lock()
            .unwrap()
            .push_back(result.map(str::to_string).map_err(str::to_string));
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }
}

#[async_trait]
impl Transcriber for FakeTranscriber {
    async fn transcribe(&self, utterance: &Utterance) -> Result<String> {
        self.calls
            .lock()
            .unwrap()
            .push((Instant::now(), utterance.samples().len()));
        match self.queued.lock().unwrap().pop_front() {
            Some(Ok(text)) => Ok(text),
            Some(Err(detail)) => Err(Error::TranscriptionFailed(detail)),
            None => Ok(self.fallback.clone()),
        }
    }
}

/// Synthesizer echoing the text as "audio"
pub struct FakeSynthesizer {
    pub texts: Mutex<Vec<String>>,
    pub failure: Mutex<Option<SynthesisFailure>>,
    pub delay: Duration,
}

impl FakeSynthesizer {
    pub fn new() -> Self {
        Self {
            texts: Mutex::new(Vec::new()),
            failure: Mutex::new(None),
            delay: Duration::ZERO,
        }
    }

    pub fn with_delay(delay: Duration) -> Self {
        Self {
            delay,
            ..Self::new()
        }
    }

    pub fn fail_with(&self, failure: SynthesisFailure) {
        *self.failure.lock().unwrap() = Some(failure);
    }

    pub fn texts(&self) -> Vec<String> {
        self.texts.lock().unwrap().clone()
    }
}

#[async_trait]
impl Synthesizer for FakeSynthesizer {
    async fn synthesize(&self, text: &str, _voice: &str) -> Result<Vec<u8>> {
        self.texts.lock().unwrap().push(text.to_string());
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        if let Some(failure) = self.failure.lock().unwrap().clone() {
            return Err(Error::SynthesisUnavailable(failure));
        }
        Ok(text.as_bytes().to_vec())
    }
}

/// Speakers that record what they play
///
/// Audio starting with `long` plays until stopped.
pub struct FakeSink {
    pub played: Mutex<Vec<Vec<u8>>>,
    pub interrupted: AtomicUsize,
}

impl FakeSink {
    pub fn new() -> Self {
        Self {
            played: Mutex::new(Vec::new()),
            interrupted: AtomicUsize::new(0),
        }
    }

    pub fn played(&self) -> Vec<String> {
        self.played
            .lock()
            .unwrap()
            .iter()
            .map(|a| String::from_utf8_lossy(a).into_owned())
            .collect()
    }
}

impl AudioSink for FakeSink {
    fn play(&self, audio: &[u8], stop: &AtomicBool) -> Result<()> {
        self.played.lock().unwrap().push(audio.to_vec());
        if audio.starts_with(b"long") {
            while !stop.load(Ordering::Acquire) {
                std::thread::sleep(Duration::from_millis(2));
            }
            self.interrupted.fetch_add(1, Ordering::SeqCst);
        }
        Ok(())
    }
}

/// Short silence window so real-time tests stay fast
pub fn fast_silence() -> SilenceSettings {
    SilenceSettings {
        threshold: 0.02,
        duration: Duration::from_millis(100),
        sample_interval: Duration::from_millis(10),
    }
}

/// Collect every notice received so far
pub fn drain_notices(rx: &mut mpsc::UnboundedReceiver<Notice>) -> Vec<String> {
    let mut out = Vec::new();
    while let Ok(notice) = rx.try_recv() {
        out.push(notice.message);
    }
    out
}

/// Fakes wired into a running app
pub struct Harness {
    pub app: App,
    pub events: mpsc::UnboundedReceiver<Event>,
    pub updates: mpsc::UnboundedReceiver<interview_partner::Update>,
    pub notices: mpsc::UnboundedReceiver<Notice>,
    pub backend: Arc<FakeBackend>,
    pub microphone: Arc<ScriptedMicrophone>,
    pub transcriber: Arc<FakeTranscriber>,
    pub synthesizer: Arc<FakeSynthesizer>,
    pub sink: Arc<FakeSink>,
}

impl Harness {
    /// App with voice enabled
    pub fn voice(config: Config, microphone: ScriptedMicrophone, transcript: &str) -> Self {
        Self::build(config, Some(microphone), transcript)
    }

    /// Text-only app
    pub fn text_only(config: Config) -> Self {
        Self::build(config, None, "")
    }

    fn build(config: Config, microphone: Option<ScriptedMicrophone>, transcript: &str) -> Self {
        let (notifier, notices) = Notifier::channel();
        let backend = Arc::new(FakeBackend::new());
        let has_voice = microphone.is_some();
        let microphone = Arc::new(microphone.unwrap_or_else(ScriptedMicrophone::quiet));
        let transcriber = Arc::new(FakeTranscriber::new(transcript));
        let synthesizer = Arc::new(FakeSynthesizer::new());
        let sink = Arc::new(FakeSink::new());

        let voice = has_voice.then(|| VoiceServices {
            recorder: Recorder::new(
                Arc::clone(&microphone) as Arc<dyn Microphone>,
                Arc::clone(&transcriber) as Arc<dyn Transcriber>,
                config.voice.silence,
                notifier.clone(),
            ),
            speaker: Speaker::new(
                Arc::clone(&synthesizer) as Arc<dyn Synthesizer>,
                Arc::clone(&sink) as Arc<dyn AudioSink>,
                notifier.clone(),
            ),
        });

        let (app, events, updates) = App::new(
            config,
            Arc::clone(&backend) as Arc<dyn InterviewBackend>,
            voice,
            notifier,
        );

        Self {
            app,
            events,
            updates,
            notices,
            backend,
            microphone,
            transcriber,
            synthesizer,
            sink,
        }
    }

    /// Apply `event`, then process follow-up events until none arrive for `quiet`
    pub async fn send(&mut self, event: Event) {
        let _ = self.app.handle(event);
        self.settle().await;
    }

    pub async fn settle(&mut self) {
        let quiet = Duration::from_millis(400);
        while let Ok(Some(event)) = tokio::time::timeout(quiet, self.events.recv()).await {
            if self.app.handle(event).is_break() {
                break;
            }
        }
    }

    pub fn notices(&mut self) -> Vec<String> {
        drain_notices(&mut self.notices)
    }
}

/// Default settings with a short silence window
pub fn test_config() -> Config {
    let mut config = Config::default();
    config.voice.silence = fast_silence();
    config
}

/// Interview settings used by the app tests
pub fn interview() -> InterviewConfig {
    Config::default().interview.to_interview_config(None)
}
