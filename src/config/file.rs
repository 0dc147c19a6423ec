//! TOML configuration file loading
//!
//! Supports `~/.config/interview-partner/config.toml` as a persistent config source.
//! All fields are optional; the file is a partial overlay on top of defaults.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

/// Top-level TOML configuration file schema
#[derive(Debug, Default, Deserialize, Serialize)]
pub struct ConfigFile {
    /// Backend service configuration
    #[serde(default)]
    pub backend: BackendFileConfig,

    /// Interview defaults
    #[serde(default)]
    pub interview: InterviewFileConfig,

    /// Voice/audio configuration
    #[serde(default)]
    pub voice: VoiceFileConfig,
}

/// Backend service configuration
#[derive(Debug, Default, Deserialize, Serialize)]
pub struct BackendFileConfig {
    /// Base URL of the interview backend (e.g. `http://localhost:8000`)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
}

/// Defaults for the setup step
#[derive(Debug, Default, Deserialize, Serialize)]
pub struct InterviewFileConfig {
    /// Target role (e.g. "Software Engineer")
    #[serde(skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,

    /// Difficulty ("Easy", "Medium", "Hard")
    #[serde(skip_serializing_if = "Option::is_none")]
    pub difficulty: Option<String>,
}

/// Voice processing configuration
#[derive(Debug, Default, Deserialize, Serialize)]
pub struct VoiceFileConfig {
    /// Enable voice input/output
    #[serde(skip_serializing_if = "Option::is_none")]
    pub enabled: Option<bool>,

    /// Voice used when the backend does not pick one
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default_voice: Option<String>,

    /// RMS energy below which input counts as silence
    #[serde(skip_serializing_if = "Option::is_none")]
    pub silence_threshold: Option<f32>,

    /// Seconds of continuous silence that end a recording
    #[serde(skip_serializing_if = "Option::is_none")]
    pub silence_secs: Option<f64>,

    /// Energy sampling interval in milliseconds
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sample_interval_ms: Option<u64>,

    /// Send transcripts without waiting for confirmation
    #[serde(skip_serializing_if = "Option::is_none")]
    pub auto_send: Option<bool>,
}

/// Load the TOML config file from the standard path
///
/// Returns `ConfigFile::default()` if the file doesn't exist or can't be parsed.
pub fn load_config_file() -> ConfigFile {
    let Some(path) = config_file_path() else {
        return ConfigFile::default();
    };

    load_config_file_from(&path)
}

/// Load the TOML config file from an explicit path
///
/// Returns `ConfigFile::default()` if the file doesn't exist or can't be parsed.
pub fn load_config_file_from(path: &Path) -> ConfigFile {
    if !path.exists() {
        return ConfigFile::default();
    }

    match std::fs::read_to_string(path) {
        Ok(content) => match toml::from_str(&content) {
            Ok(config) => {
                tracing::info!(path = %path.display(), "loaded config file");
                config
            }
            Err(e) => {
                tracing::warn!(
                    path = %path.display(),
                    error = %e,
                    "failed to parse config file, using defaults"
                );
                ConfigFile::default()
            }
        },
        Err(e) => {
            tracing::warn!(
                path = %path.display(),
                error = %e,
                "failed to read config file"
            );
            ConfigFile::default()
        }
    }
}

/// Serialize and write the config file, creating parent directories
///
/// # Errors
///
/// Returns error if the directory or file cannot be written
pub fn write_config_file(path: &Path, config: &ConfigFile) -> crate::Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let content = toml::to_string_pretty(config)
        .map_err(|e| crate::Error::Config(format!("failed to serialize config: {e}")))?;
    std::fs::write(path, content)?;

    Ok(())
}

/// Return the config file path: `~/.config/interview-partner/config.toml`
pub fn config_file_path() -> Option<PathBuf> {
    directories::BaseDirs::new().map(|d| {
        d.config_dir()
            .join("interview-partner")
            .join("config.toml")
    })
}
