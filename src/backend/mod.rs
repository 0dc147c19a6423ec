//! HTTP client for the interview backend
//!
//! The backend owns all interview logic: question generation, scoring,
//! speech-to-text and text-to-speech. Every call is a single attempt with no
//! retry; timeouts are left to the transport.

mod types;

use async_trait::async_trait;
use reqwest::StatusCode;

pub use types::{
    ChatResponse, Difficulty, FeedbackResponse, InterviewConfig, StartInterviewResponse,
};
use types::{ChatRequest, ErrorBody, FeedbackRequest, TranscribeResponse, TtsRequest};

use crate::error::SynthesisFailure;
use crate::voice::{Synthesizer, Transcriber, Utterance};
use crate::{Error, Result};

/// Interview session operations
#[async_trait]
pub trait InterviewBackend: Send + Sync {
    /// Start a new interview session
    async fn start_interview(&self, config: &InterviewConfig) -> Result<StartInterviewResponse>;

    /// Send a candidate message and get the interviewer's reply
    ///
    /// Returns [`Error::SessionExpired`] when the backend no longer knows the session.
    async fn chat(&self, session_id: &str, message: &str) -> Result<ChatResponse>;

    /// Close the session and fetch the feedback summary
    async fn feedback(&self, session_id: &str) -> Result<FeedbackResponse>;
}

/// Client for the interview backend REST API
#[derive(Debug, Clone)]
pub struct BackendClient {
    client: reqwest::Client,
    base_url: String,
}

impl BackendClient {
    /// Create a client for the backend at `base_url`
    #[must_use]
    pub fn new(base_url: impl Into<String>) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Self {
            client: reqwest::Client::new(),
            base_url,
        }
    }

    /// Backend base URL
    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{path}", self.base_url)
    }

    /// Read the `detail` field from an error response, falling back to the raw body
    async fn error_detail(response: reqwest::Response, fallback: &str) -> String {
        let body = response.text().await.unwrap_or_default();
        serde_json::from_str::<ErrorBody>(&body)
            .ok()
            .and_then(|b| b.detail)
            .unwrap_or_else(|| {
                if body.trim().is_empty() {
                    fallback.to_string()
                } else {
                    body
                }
            })
    }

    /// Read the `detail` field from a TTS error response
    ///
    /// A body that is not JSON reads as `TTS service unavailable`; JSON without
    /// a `detail` string reads as `TTS failed`.
    fn tts_error_detail(body: &str) -> String {
        match serde_json::from_str::<serde_json::Value>(body) {
            Ok(value) => value
                .get("detail")
                .and_then(serde_json::Value::as_str)
                .unwrap_or("TTS failed")
                .to_string(),
            Err(_) => "TTS service unavailable".to_string(),
        }
    }

    async fn post_json<B, T>(&self, path: &str, body: &B) -> Result<T>
    where
        B: serde::Serialize + Sync + ?Sized,
        T: serde::de::DeserializeOwned,
    {
        let response = self
            .client
            .post(self.url(path))
            .json(body)
            .send()
            .await
            .map_err(|e| {
                tracing::error!(path, error = %e, "backend request failed");
                e
            })?;

        let status = response.status();
        tracing::debug!(path, status = %status, "received response");

        if !status.is_success() {
            let detail = Self::error_detail(response, "request failed").await;
            tracing::warn!(path, status = %status, detail = %detail, "backend error");
            return Err(Error::Backend {
                status: status.as_u16(),
                detail,
            });
        }

        Ok(response.json().await?)
    }
}

#[async_trait]
impl InterviewBackend for BackendClient {
    async fn start_interview(&self, config: &InterviewConfig) -> Result<StartInterviewResponse> {
        tracing::info!(role = %config.role, difficulty = %config.difficulty, "starting interview");
        let response: StartInterviewResponse = self.post_json("start_interview", config).await?;
        tracing::debug!(
            session_id = %response.session_id,
            voice = ?response.interviewer_voice,
            "interview started"
        );
        Ok(response)
    }

    async fn chat(&self, session_id: &str, message: &str) -> Result<ChatResponse> {
        let request = ChatRequest {
            session_id,
            message,
        };

        match self.post_json("chat", &request).await {
            Err(Error::Backend { status, .. }) if status == StatusCode::NOT_FOUND.as_u16() => {
                tracing::warn!(session_id, "session not found on backend");
                Err(Error::SessionExpired)
            }
            other => other,
        }
    }

    async fn feedback(&self, session_id: &str) -> Result<FeedbackResponse> {
        self.post_json("feedback_result", &FeedbackRequest { session_id })
            .await
    }
}

#[async_trait]
impl Transcriber for BackendClient {
    async fn transcribe(&self, utterance: &Utterance) -> Result<String> {
        let wav = utterance.to_wav()?;
        tracing::debug!(
            audio_bytes = wav.len(),
            duration_ms = utterance.duration().as_millis(),
            "starting transcription"
        );

        let form = reqwest::multipart::Form::new().part(
            "audio",
            reqwest::multipart::Part::bytes(wav)
                .file_name("recording.wav")
                .mime_str("audio/wav")
                .map_err(|e| Error::TranscriptionFailed(e.to_string()))?,
        );

        let response = self
            .client
            .post(self.url("transcribe"))
            .multipart(form)
            .send()
            .await
            .map_err(|e| {
                tracing::error!(error = %e, "transcription request failed");
                Error::TranscriptionFailed(e.to_string())
            })?;

        let status = response.status();
        if !status.is_success() {
            let detail = Self::error_detail(response, "Transcription failed").await;
            tracing::error!(status = %status, detail = %detail, "transcription API error");
            return Err(Error::TranscriptionFailed(detail));
        }

        let result: TranscribeResponse = response
            .json()
            .await
            .map_err(|e| Error::TranscriptionFailed(format!("invalid response: {e}")))?;

        tracing::info!(transcript = %result.transcript, "transcription complete");
        Ok(result.transcript)
    }
}

#[async_trait]
impl Synthesizer for BackendClient {
    async fn synthesize(&self, text: &str, voice: &str) -> Result<Vec<u8>> {
        tracing::debug!(voice, chars = text.len(), "requesting speech");

        let response = self
            .client
            .post(self.url("tts"))
            .json(&TtsRequest { text, voice })
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let detail = Self::tts_error_detail(&body);
            tracing::warn!(status = %status, detail = %detail, "TTS API error");
            return Err(Error::SynthesisUnavailable(SynthesisFailure::classify(
                &detail,
            )));
        }

        let audio = response.bytes().await?;
        tracing::debug!(audio_bytes = audio.len(), "speech received");
        Ok(audio.to_vec())
    }
}
