//! Configuration management for the interview client

pub mod file;

use std::time::Duration;

use crate::backend::{Difficulty, InterviewConfig};

/// Default backend base URL
pub const DEFAULT_BACKEND_URL: &str = "http://localhost:8000";

/// Voice used when the backend does not assign one
pub const DEFAULT_VOICE: &str = "Ruby-PlayAI";

/// Interview client configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Backend base URL
    pub backend_url: String,

    /// Defaults for the setup step
    pub interview: InterviewDefaults,

    /// Voice configuration
    pub voice: VoiceConfig,
}

/// Defaults offered by the setup step
#[derive(Debug, Clone)]
pub struct InterviewDefaults {
    /// Target role
    pub role: String,

    /// Difficulty level
    pub difficulty: Difficulty,
}

impl Default for InterviewDefaults {
    fn default() -> Self {
        Self {
            role: "Software Engineer".to_string(),
            difficulty: Difficulty::Medium,
        }
    }
}

impl InterviewDefaults {
    /// Build an interview config from these defaults
    #[must_use]
    pub fn to_interview_config(&self, resume_text: Option<String>) -> InterviewConfig {
        InterviewConfig {
            role: self.role.clone(),
            difficulty: self.difficulty,
            resume_text,
        }
    }
}

/// Voice processing configuration
#[derive(Debug, Clone)]
pub struct VoiceConfig {
    /// Enable voice input/output
    pub enabled: bool,

    /// Fallback TTS voice identifier
    pub default_voice: String,

    /// Silence detection settings
    pub silence: SilenceSettings,

    /// Send non-empty transcripts immediately
    pub auto_send: bool,
}

impl Default for VoiceConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            default_voice: DEFAULT_VOICE.to_string(),
            silence: SilenceSettings::default(),
            auto_send: false,
        }
    }
}

/// Silence-gated recording parameters
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SilenceSettings {
    /// RMS energy below which a sample counts as silence
    pub threshold: f32,

    /// Continuous silence that ends a recording
    pub duration: Duration,

    /// Energy sampling interval (~60 Hz)
    pub sample_interval: Duration,
}

impl Default for SilenceSettings {
    fn default() -> Self {
        Self {
            threshold: 0.02,
            duration: Duration::from_secs(5),
            sample_interval: Duration::from_millis(16),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            backend_url: DEFAULT_BACKEND_URL.to_string(),
            interview: InterviewDefaults::default(),
            voice: VoiceConfig::default(),
        }
    }
}

impl Config {
    /// Load configuration (env > toml > default)
    #[must_use]
    pub fn load() -> Self {
        Self::from_file(file::load_config_file())
    }

    /// Load configuration with explicit CLI overrides
    #[must_use]
    pub fn load_with_options(backend_url: Option<String>, disable_voice: bool) -> Self {
        let mut config = Self::load();

        if let Some(url) = backend_url {
            config.backend_url = url;
        }

        if disable_voice {
            tracing::info!("voice explicitly disabled via --disable-voice");
            config.voice.enabled = false;
        }

        config
    }

    /// Merge a parsed config file with environment overrides and defaults
    #[must_use]
    pub fn from_file(fc: file::ConfigFile) -> Self {
        let defaults = Self::default();

        let backend_url = std::env::var("INTERVIEW_BACKEND_URL")
            .ok()
            .or(fc.backend.url)
            .map_or(defaults.backend_url, |url| {
                url.trim_end_matches('/').to_string()
            });

        let role = std::env::var("INTERVIEW_ROLE")
            .ok()
            .or(fc.interview.role)
            .filter(|r| !r.trim().is_empty())
            .unwrap_or(defaults.interview.role);

        let difficulty = std::env::var("INTERVIEW_DIFFICULTY")
            .ok()
            .or(fc.interview.difficulty)
            .and_then(|d| {
                let parsed = d.parse::<Difficulty>();
                if parsed.is_err() {
                    tracing::warn!(difficulty = %d, "unknown difficulty, using default");
                }
                parsed.ok()
            })
            .unwrap_or(defaults.interview.difficulty);

        let enabled = std::env::var("INTERVIEW_VOICE_ENABLED")
            .ok()
            .map(|v| v == "1" || v.eq_ignore_ascii_case("true"))
            .or(fc.voice.enabled)
            .unwrap_or(defaults.voice.enabled);

        let default_voice = std::env::var("INTERVIEW_VOICE")
            .ok()
            .or(fc.voice.default_voice)
            .unwrap_or(defaults.voice.default_voice);

        let silence = SilenceSettings {
            threshold: fc
                .voice
                .silence_threshold
                .filter(|t| t.is_finite() && *t > 0.0)
                .unwrap_or(defaults.voice.silence.threshold),
            duration: fc
                .voice
                .silence_secs
                .filter(|s| *s > 0.0)
                .and_then(|s| Duration::try_from_secs_f64(s).ok())
                .unwrap_or(defaults.voice.silence.duration),
            sample_interval: fc
                .voice
                .sample_interval_ms
                .filter(|ms| *ms > 0)
                .map_or(defaults.voice.silence.sample_interval, Duration::from_millis),
        };

        Self {
            backend_url,
            interview: InterviewDefaults { role, difficulty },
            voice: VoiceConfig {
                enabled,
                default_voice,
                silence,
                auto_send: fc.voice.auto_send.unwrap_or(defaults.voice.auto_send),
            },
        }
    }
}
