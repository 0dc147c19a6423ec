//! Request and response types for the interview backend

use serde::{Deserialize, Serialize};

/// Interview difficulty level
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Difficulty {
    /// Entry level
    Easy,
    /// Mid level
    #[default]
    Medium,
    /// Senior level
    Hard,
}

impl Difficulty {
    /// All levels in display order
    pub const ALL: [Self; 3] = [Self::Easy, Self::Medium, Self::Hard];

    /// Wire name of the level
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Easy => "Easy",
            Self::Medium => "Medium",
            Self::Hard => "Hard",
        }
    }

    /// Human-readable description for the setup form
    #[must_use]
    pub const fn description(self) -> &'static str {
        match self {
            Self::Easy => "Easy - Entry Level",
            Self::Medium => "Medium - Mid Level",
            Self::Hard => "Hard - Senior Level",
        }
    }
}

impl std::fmt::Display for Difficulty {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Difficulty {
    type Err = crate::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|d| d.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| crate::Error::Config(format!("unknown difficulty: {s}")))
    }
}

/// Setup parameters for a new interview
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InterviewConfig {
    /// Target role, e.g. "Software Engineer"
    pub role: String,
    /// Difficulty level
    pub difficulty: Difficulty,
    /// Resume or experience highlights for a personalized interview
    #[serde(skip_serializing_if = "Option::is_none")]
    pub resume_text: Option<String>,
}

/// Response from `POST /start_interview`
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct StartInterviewResponse {
    /// Backend session identifier
    pub session_id: String,
    /// Interviewer's opening message
    pub greeting: String,
    /// TTS voice assigned to the interviewer
    #[serde(default)]
    pub interviewer_voice: Option<String>,
    /// Interviewer display name
    #[serde(default)]
    pub interviewer_name: Option<String>,
}

/// Request body for `POST /chat`
#[derive(Debug, Serialize)]
pub(crate) struct ChatRequest<'a> {
    pub session_id: &'a str,
    pub message: &'a str,
}

/// Response from `POST /chat`
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ChatResponse {
    /// Interviewer's reply
    pub response: String,
}

/// Request body for `POST /feedback_result`
#[derive(Debug, Serialize)]
pub(crate) struct FeedbackRequest<'a> {
    pub session_id: &'a str,
}

/// Response from `POST /feedback_result`
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct FeedbackResponse {
    /// What went well
    pub strengths: Vec<String>,
    /// Areas for improvement
    pub improvements: Vec<String>,
    /// Technical knowledge score (0-100)
    pub technical_score: u32,
    /// Communication score (0-100)
    pub communication_score: u32,
    /// Overall assessment
    pub overall_feedback: String,
}

/// Response from `POST /transcribe`
#[derive(Debug, Deserialize)]
pub(crate) struct TranscribeResponse {
    pub transcript: String,
}

/// Request body for `POST /tts`
#[derive(Debug, Serialize)]
pub(crate) struct TtsRequest<'a> {
    pub text: &'a str,
    pub voice: &'a str,
}

/// Error body returned by the backend on failure
#[derive(Debug, Deserialize)]
pub(crate) struct ErrorBody {
    pub detail: Option<String>,
}
