//! Interactive prompts: interview setup form and `interview configure`

use std::path::{Path, PathBuf};

use dialoguer::{Confirm, Input, Select};

use crate::Config;
use crate::backend::{Difficulty, InterviewConfig};
use crate::config::file::{
    BackendFileConfig, ConfigFile, InterviewFileConfig, VoiceFileConfig, config_file_path,
    load_config_file, write_config_file,
};

/// Values already supplied on the command line
#[derive(Debug, Clone, Default)]
pub struct SetupArgs {
    /// Target role
    pub role: Option<String>,
    /// Difficulty level
    pub difficulty: Option<Difficulty>,
    /// Resume file to read
    pub resume: Option<PathBuf>,
}

/// Read a resume file, returning `None` for an empty file
///
/// # Errors
///
/// Returns error if the file cannot be read
pub fn load_resume(path: &Path) -> crate::Result<Option<String>> {
    let text = std::fs::read_to_string(path)?;
    let text = text.trim();
    if text.is_empty() {
        Ok(None)
    } else {
        tracing::debug!(path = %path.display(), chars = text.len(), "loaded resume");
        Ok(Some(text.to_string()))
    }
}

/// Collect the interview settings, prompting for anything not given
///
/// With `interactive` off, missing values fall back to the configured
/// defaults and no prompt is shown.
///
/// # Errors
///
/// Returns error if user input fails or the resume cannot be read
pub fn interview_form(
    config: &Config,
    args: SetupArgs,
    interactive: bool,
) -> anyhow::Result<InterviewConfig> {
    let defaults = &config.interview;

    let role = match args.role {
        Some(role) => role,
        None if interactive => Input::new()
            .with_prompt("Target role")
            .default(defaults.role.clone())
            .interact_text()?,
        None => defaults.role.clone(),
    };

    let difficulty = match args.difficulty {
        Some(difficulty) => difficulty,
        None if interactive => {
            let labels: Vec<&str> = Difficulty::ALL.iter().map(|d| d.description()).collect();
            let default = Difficulty::ALL
                .iter()
                .position(|d| *d == defaults.difficulty)
                .unwrap_or(1);
            let idx = Select::new()
                .with_prompt("Difficulty")
                .items(&labels)
                .default(default)
                .interact()?;
            Difficulty::ALL[idx]
        }
        None => defaults.difficulty,
    };

    let resume_path = match args.resume {
        Some(path) => Some(path),
        None if interactive => {
            let input: String = Input::new()
                .with_prompt("Resume file (optional, leave blank to skip)")
                .allow_empty(true)
                .interact_text()?;
            let input = input.trim();
            (!input.is_empty()).then(|| PathBuf::from(input))
        }
        None => None,
    };

    let resume_text = match resume_path {
        Some(path) => load_resume(&path)?,
        None => None,
    };

    let role = role.trim();
    let mut interview = defaults.to_interview_config(resume_text);
    if !role.is_empty() {
        role.clone_into(&mut interview.role);
    }
    interview.difficulty = difficulty;

    Ok(interview)
}

/// Run the interactive configuration wizard
///
/// # Errors
///
/// Returns error if user input fails or config cannot be written
pub fn run_configure() -> anyhow::Result<()> {
    println!("Interview Partner Setup\n");

    let existing = load_config_file();
    let config_path = config_file_path()
        .unwrap_or_else(|| PathBuf::from("~/.config/interview-partner/config.toml"));

    if config_path.exists() {
        println!("Existing config found at {}\n", config_path.display());
    }

    // 1. Backend
    let backend_url: String = Input::new()
        .with_prompt("Backend URL")
        .default(
            existing
                .backend
                .url
                .clone()
                .unwrap_or_else(|| crate::config::DEFAULT_BACKEND_URL.to_string()),
        )
        .interact_text()?;

    // 2. Interview defaults
    let role: String = Input::new()
        .with_prompt("Default role")
        .default(
            existing
                .interview
                .role
                .clone()
                .unwrap_or_else(|| "Software Engineer".to_string()),
        )
        .interact_text()?;

    let current_difficulty = existing
        .interview
        .difficulty
        .as_deref()
        .and_then(|d| d.parse::<Difficulty>().ok())
        .unwrap_or_default();
    let labels: Vec<&str> = Difficulty::ALL.iter().map(|d| d.description()).collect();
    let difficulty_idx = Select::new()
        .with_prompt("Default difficulty")
        .items(&labels)
        .default(
            Difficulty::ALL
                .iter()
                .position(|d| *d == current_difficulty)
                .unwrap_or(1),
        )
        .interact()?;

    // 3. Voice (optional)
    let enable_voice = Confirm::new()
        .with_prompt("Enable voice (microphone and interviewer speech)?")
        .default(existing.voice.enabled.unwrap_or(true))
        .interact()?;

    let voice = if enable_voice {
        let default_voice: String = Input::new()
            .with_prompt("Fallback interviewer voice")
            .default(
                existing
                    .voice
                    .default_voice
                    .clone()
                    .unwrap_or_else(|| crate::config::DEFAULT_VOICE.to_string()),
            )
            .interact_text()?;

        let silence_secs: f64 = Input::new()
            .with_prompt("Seconds of silence that end a recording")
            .default(existing.voice.silence_secs.unwrap_or(5.0))
            .interact_text()?;

        let auto_send = Confirm::new()
            .with_prompt("Send transcripts automatically?")
            .default(existing.voice.auto_send.unwrap_or(false))
            .interact()?;

        VoiceFileConfig {
            enabled: Some(true),
            default_voice: Some(default_voice),
            silence_secs: Some(silence_secs),
            auto_send: Some(auto_send),
            ..existing.voice
        }
    } else {
        VoiceFileConfig {
            enabled: Some(false),
            ..existing.voice
        }
    };

    // 4. Write
    let config_file = ConfigFile {
        backend: BackendFileConfig {
            url: Some(backend_url),
        },
        interview: InterviewFileConfig {
            role: Some(role),
            difficulty: Some(Difficulty::ALL[difficulty_idx].as_str().to_string()),
        },
        voice,
    };

    write_config_file(&config_path, &config_file)?;
    println!("\nConfig written to {}", config_path.display());
    println!("\nSetup complete! Run `interview` to start practicing.");

    Ok(())
}
