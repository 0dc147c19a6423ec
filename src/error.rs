//! Error types for the interview client

use thiserror::Error;

/// Result type alias for interview client operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in the interview client
#[derive(Debug, Error)]
pub enum Error {
    /// Configuration error
    #[error("configuration error: {0}")]
    Config(String),

    /// Audio device or codec error
    #[error("audio error: {0}")]
    Audio(String),

    /// Microphone unavailable or access refused
    #[error("microphone access denied: {0}")]
    PermissionDenied(String),

    /// Speech-to-text request failed
    #[error("transcription failed: {0}")]
    TranscriptionFailed(String),

    /// Text-to-speech unavailable
    #[error("speech synthesis unavailable: {0}")]
    SynthesisUnavailable(SynthesisFailure),

    /// Backend no longer knows the interview session
    #[error("session expired")]
    SessionExpired,

    /// Backend answered with a non-success status
    #[error("backend error {status}: {detail}")]
    Backend {
        /// HTTP status code
        status: u16,
        /// Error detail reported by the backend
        detail: String,
    },

    /// IO error
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// HTTP transport error
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    /// Serialization error
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// TOML parsing error
    #[error("toml error: {0}")]
    Toml(#[from] toml::de::Error),
}

/// Why the speech synthesis endpoint refused a request
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SynthesisFailure {
    /// Provider rate limit hit
    RateLimited,
    /// Provider requires terms of service acceptance
    TermsRequired,
    /// Any other failure, with the reported detail
    Unavailable(String),
}

impl SynthesisFailure {
    /// Classify the `detail` text returned by the TTS endpoint
    #[must_use]
    pub fn classify(detail: &str) -> Self {
        let lower = detail.to_lowercase();
        if lower.contains("rate limit") {
            Self::RateLimited
        } else if lower.contains("terms") {
            Self::TermsRequired
        } else {
            Self::Unavailable(detail.to_string())
        }
    }
}

impl std::fmt::Display for SynthesisFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::RateLimited => f.write_str("rate limited"),
            Self::TermsRequired => f.write_str("terms acceptance required"),
            Self::Unavailable(detail) => f.write_str(detail),
        }
    }
}
