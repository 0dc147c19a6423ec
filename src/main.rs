use std::io::IsTerminal;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use std::sync::atomic::AtomicBool;
use std::time::Duration;

use clap::{Parser, Subcommand};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;
use tracing_subscriber::EnvFilter;

use interview_partner::setup::{self, SetupArgs};
use interview_partner::voice::{
    AudioCapture, AudioPlayback, AudioSink, CpalMicrophone, Recorder, Speaker, Synthesizer,
    Transcriber, Utterance, rms_energy, wav_to_samples,
};
use interview_partner::{
    App, BackendClient, Config, Difficulty, Event, Notifier, Role, Screen, TurnState, Update,
    VoiceServices,
};

/// Interview Partner - practice technical interviews by voice
#[derive(Parser)]
#[command(name = "interview", version, about)]
struct Cli {
    /// Interview backend base URL
    #[arg(long, env = "INTERVIEW_BACKEND_URL")]
    backend_url: Option<String>,

    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Disable voice features (text-only interview)
    #[arg(long, env = "INTERVIEW_DISABLE_VOICE")]
    disable_voice: bool,

    /// Target role (skips the prompt)
    #[arg(long)]
    role: Option<String>,

    /// Difficulty: easy, medium or hard (skips the prompt)
    #[arg(long)]
    difficulty: Option<Difficulty>,

    /// Resume file to share with the interviewer
    #[arg(long)]
    resume: Option<PathBuf>,

    /// Accept configured defaults instead of prompting
    #[arg(short, long)]
    yes: bool,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
#[allow(clippy::enum_variant_names)]
enum Command {
    /// Test microphone input and silence detection
    TestMic {
        /// Duration in seconds
        #[arg(short, long, default_value = "5")]
        duration: u64,
    },
    /// Test speaker output
    TestSpeaker,
    /// Test speech synthesis through the backend
    TestTts {
        /// Text to speak
        #[arg(default_value = "Hello! This is a test of the interviewer voice.")]
        text: String,
        /// Voice identifier
        #[arg(long)]
        voice: Option<String>,
    },
    /// Transcribe a WAV file through the backend
    Transcribe {
        /// Path to a WAV file
        path: PathBuf,
    },
    /// Interactive configuration
    Configure,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    // Set up logging based on verbosity; stdout belongs to the interview
    let filter = match cli.verbose {
        0 => "warn",
        1 => "warn,interview_partner=info",
        2 => "info,interview_partner=debug",
        _ => "trace",
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_writer(std::io::stderr)
        .init();

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!("fatal: {e}");
            eprintln!("error: {e}");
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    if let Some(cmd) = cli.command {
        return match cmd {
            Command::TestMic { duration } => test_mic(duration).await,
            Command::TestSpeaker => test_speaker().await,
            Command::TestTts { text, voice } => {
                test_tts(cli.backend_url, &text, voice.as_deref()).await
            }
            Command::Transcribe { path } => transcribe_file(cli.backend_url, &path).await,
            Command::Configure => setup::run_configure(),
        };
    }

    let config = Config::load_with_options(cli.backend_url, cli.disable_voice);
    tracing::debug!(?config, "loaded configuration");

    let interactive = !cli.yes && std::io::stdin().is_terminal();
    let interview = setup::interview_form(
        &config,
        SetupArgs {
            role: cli.role,
            difficulty: cli.difficulty,
            resume: cli.resume,
        },
        interactive,
    )?;

    run_interview(config, interview).await
}

/// Build recorder and speaker, or `None` when audio output is unavailable
fn build_voice(
    config: &Config,
    backend: &Arc<BackendClient>,
    notifier: &Notifier,
) -> Option<VoiceServices> {
    if !config.voice.enabled {
        tracing::info!("voice disabled, running text-only");
        return None;
    }

    let sink = match AudioPlayback::new() {
        Ok(playback) => Arc::new(playback),
        Err(e) => {
            tracing::warn!(error = %e, "audio output unavailable, running text-only");
            notifier.info("Audio unavailable, continuing in text-only mode");
            return None;
        }
    };

    let recorder = Recorder::new(
        Arc::new(CpalMicrophone),
        Arc::clone(backend) as Arc<dyn Transcriber>,
        config.voice.silence,
        notifier.clone(),
    );
    let speaker = Speaker::new(
        Arc::clone(backend) as Arc<dyn Synthesizer>,
        sink,
        notifier.clone(),
    );

    Some(VoiceServices { recorder, speaker })
}

/// Run an interview session in the terminal
async fn run_interview(
    config: Config,
    interview: interview_partner::InterviewConfig,
) -> anyhow::Result<()> {
    let (notifier, mut notices) = Notifier::channel();
    let backend = Arc::new(BackendClient::new(config.backend_url.clone()));
    let voice = build_voice(&config, &backend, &notifier);
    let has_voice = voice.is_some();

    let (app, events_rx, mut updates) = App::new(config, backend, voice, notifier);
    let events = app.sender();
    let app_task = tokio::spawn(app.run(events_rx));

    println!(
        "Starting a {} interview for {}...",
        interview.difficulty, interview.role
    );
    print_help(has_voice);
    let _ = events.send(Event::Start(interview.clone()));

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        tokio::select! {
            line = lines.next_line() => {
                let Some(line) = line? else {
                    let _ = events.send(Event::Quit);
                    break;
                };
                match parse_input(&line) {
                    Input::Event(event) => {
                        let quit = matches!(event, Event::Quit);
                        if events.send(event).is_err() || quit {
                            break;
                        }
                    }
                    Input::Start => {
                        let _ = events.send(Event::Start(interview.clone()));
                    }
                    Input::Help => print_help(has_voice),
                    Input::Unknown(command) => {
                        println!("Unknown command: {command} (type /help)");
                    }
                }
            }
            Some(notice) = notices.recv() => println!("{notice}"),
            Some(update) = updates.recv() => render(update),
        }
    }

    app_task.await?;
    drain(&mut updates);
    Ok(())
}

/// A line typed during the session
enum Input {
    Event(Event),
    Start,
    Help,
    Unknown(String),
}

fn parse_input(line: &str) -> Input {
    let line = line.trim();
    match line {
        "/mic" | "/m" => Input::Event(Event::ToggleListening),
        "/voice" | "/v" => Input::Event(Event::ToggleVoice),
        "/end" => Input::Event(Event::EndInterview),
        "/restart" => Input::Event(Event::Restart),
        "/start" => Input::Start,
        "/quit" | "/exit" | "/q" => Input::Event(Event::Quit),
        "/help" | "/?" => Input::Help,
        cmd if cmd.starts_with('/') => Input::Unknown(cmd.to_string()),
        // Empty line sends the draft
        text => Input::Event(Event::Submit(text.to_string())),
    }
}

fn print_help(has_voice: bool) {
    println!("---");
    println!("Type an answer and press Enter to send.");
    if has_voice {
        println!("  /mic      start or stop recording (Enter sends a transcript)");
        println!("  /voice    mute or unmute the interviewer");
    }
    println!("  /end      finish and get feedback");
    println!("  /restart  discard this interview");
    println!("  /quit     exit");
    println!("---");
}

fn render(update: Update) {
    match update {
        Update::Screen(Screen::Setup) => {
            println!("\nBack at setup. Type /start to begin a new interview, or /quit.");
        }
        Update::Screen(Screen::Interview) => println!("\nInterview started.\n"),
        Update::Screen(Screen::Feedback) | Update::Loading(false) => {}
        Update::Turn(turn) => match turn.role {
            Role::Assistant => println!("\nInterviewer: {}\n", turn.content),
            Role::User => println!("You: {}", turn.content),
        },
        Update::Draft(text) if !text.is_empty() => {
            println!("Transcribed: {text}");
            println!("(press Enter to send, or type a replacement)");
        }
        Update::Draft(_) => {}
        Update::Loading(true) => println!("..."),
        Update::TurnState(TurnState::Listening) => println!("Listening... (/mic to stop)"),
        Update::TurnState(_) => {}
        Update::VoiceOutput(enabled) => {
            println!("Interviewer voice {}", if enabled { "on" } else { "off" });
        }
        Update::Feedback(report) => {
            println!("\n{report}");
            println!("Type /restart for a new interview, or /quit.");
        }
    }
}

fn drain(updates: &mut mpsc::UnboundedReceiver<Update>) {
    while let Ok(update) = updates.try_recv() {
        render(update);
    }
}

/// Test microphone input
async fn test_mic(duration: u64) -> anyhow::Result<()> {
    let threshold = Config::load().voice.silence.threshold;

    println!("Testing microphone for {duration} seconds...");
    println!("Speak into your microphone!\n");

    let mut capture = AudioCapture::new()?;
    capture.start()?;

    let sample_rate = capture.sample_rate();
    println!("Sample rate: {sample_rate} Hz");
    println!("Silence threshold: {threshold:.4} RMS");
    println!("---");

    for i in 0..duration {
        tokio::time::sleep(Duration::from_secs(1)).await;

        let samples = capture.peek_buffer();
        let energy = rms_energy(&samples);
        let peak = samples.iter().map(|s| s.abs()).fold(0.0f32, f32::max);
        let label = if energy < threshold { "silence" } else { "speech" };

        // Visual meter
        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        let meter_len = (energy * 100.0).min(50.0) as usize;
        let meter: String = "█".repeat(meter_len) + &" ".repeat(50 - meter_len);

        println!(
            "[{:2}s] RMS: {:.4} | Peak: {:.4} | {:7} | [{}]",
            i + 1,
            energy,
            peak,
            label,
            meter
        );

        capture.clear_buffer();
    }

    capture.stop();

    println!("\n---");
    println!("If you saw movement in the meter, your mic is working!");
    println!("Speech should read above the threshold and quiet below it.");
    println!("If RMS stayed near 0, check:");
    println!("  1. Is your mic plugged in?");
    println!("  2. Run: pactl info | grep 'Default Source'");
    println!("  3. Run: arecord -l (to list devices)");

    Ok(())
}

/// Test speaker output with a sine wave
async fn test_speaker() -> anyhow::Result<()> {
    println!("Testing speaker output...");
    println!("You should hear a 440Hz tone for 2 seconds\n");

    let playback = AudioPlayback::new()?;

    let sample_rate = interview_partner::voice::PLAYBACK_SAMPLE_RATE;
    let frequency = 440.0_f32;
    #[allow(clippy::cast_precision_loss)]
    let samples: Vec<f32> = (0..sample_rate * 2)
        .map(|i| {
            let t = i as f32 / sample_rate as f32;
            (2.0 * std::f32::consts::PI * frequency * t).sin() * 0.3
        })
        .collect();

    println!("Playing {} samples at {} Hz...", samples.len(), sample_rate);

    tokio::task::spawn_blocking(move || {
        let stop = AtomicBool::new(false);
        playback.play_samples(samples, &stop)
    })
    .await??;

    println!("\n---");
    println!("If you heard the tone, your speakers are working!");
    println!("If you didn't hear anything, check:");
    println!("  1. Run: pactl info | grep 'Default Sink'");
    println!("  2. Run: pactl list sinks short");

    Ok(())
}

/// Test speech synthesis through the backend
async fn test_tts(
    backend_url: Option<String>,
    text: &str,
    voice: Option<&str>,
) -> anyhow::Result<()> {
    let config = Config::load_with_options(backend_url, false);
    let voice = voice.unwrap_or(&config.voice.default_voice);
    println!("Testing TTS with voice {voice}: \"{text}\"\n");

    let backend = BackendClient::new(config.backend_url.clone());

    println!("Synthesizing speech...");
    let mp3_data = backend.synthesize(text, voice).await?;
    println!("Got {} bytes of audio data", mp3_data.len());

    println!("Playing audio...");
    let playback = AudioPlayback::new()?;
    tokio::task::spawn_blocking(move || {
        let stop = AtomicBool::new(false);
        playback.play(&mp3_data, &stop)
    })
    .await??;

    println!("\n---");
    println!("If you heard the speech, TTS is working!");

    Ok(())
}

/// Transcribe a WAV file through the backend
async fn transcribe_file(backend_url: Option<String>, path: &std::path::Path) -> anyhow::Result<()> {
    let config = Config::load_with_options(backend_url, false);
    let wav = std::fs::read(path)?;
    let (samples, sample_rate) = wav_to_samples(&wav)?;
    let utterance = Utterance::new(samples, sample_rate);

    println!(
        "Transcribing {:.1}s of audio at {} Hz...",
        utterance.duration().as_secs_f32(),
        sample_rate
    );

    let backend = BackendClient::new(config.backend_url);
    let transcript = backend.transcribe(&utterance).await?;

    if transcript.trim().is_empty() {
        println!("(no speech detected)");
    } else {
        println!("{transcript}");
    }

    Ok(())
}
