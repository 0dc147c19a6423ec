//! Voice pipeline integration tests
//!
//! Tests the recorder and speaker without requiring audio hardware

use std::sync::Arc;
use std::time::Duration;

use interview_partner::config::SilenceSettings;
use interview_partner::error::SynthesisFailure;
use interview_partner::voice::{
    AudioSink, Microphone, PlaybackSlot, Recorder, RecordingState, SAMPLE_RATE, Speaker,
    SpeechOutcome, Synthesizer, Transcriber, samples_to_wav, wav_to_samples,
};
use interview_partner::{Error, Notifier};
use tokio::sync::mpsc;
use tokio::time::Instant;

mod common;
use common::{FakeSink, FakeSynthesizer, FakeTranscriber, ScriptedMicrophone, drain_notices};

/// Generate sine wave audio samples
fn generate_sine_samples(frequency: f32, duration_secs: f32, amplitude: f32) -> Vec<f32> {
    let num_samples = (SAMPLE_RATE as f32 * duration_secs) as usize;
    (0..num_samples)
        .map(|i| {
            let t = i as f32 / SAMPLE_RATE as f32;
            amplitude * (2.0 * std::f32::consts::PI * frequency * t).sin()
        })
        .collect()
}

enum Outcome {
    Transcript(String),
    Failed(Error),
}

fn recorder(
    microphone: &Arc<ScriptedMicrophone>,
    transcriber: &Arc<FakeTranscriber>,
    notifier: Notifier,
) -> Recorder {
    Recorder::new(
        Arc::clone(microphone) as Arc<dyn Microphone>,
        Arc::clone(transcriber) as Arc<dyn Transcriber>,
        SilenceSettings::default(),
        notifier,
    )
}

fn callbacks(
    tx: &mpsc::UnboundedSender<Outcome>,
) -> (impl FnOnce(String) + Send + 'static, impl FnOnce(Error) + Send + 'static) {
    let on_text = {
        let tx = tx.clone();
        move |text| {
            let _ = tx.send(Outcome::Transcript(text));
        }
    };
    let on_error = {
        let tx = tx.clone();
        move |e| {
            let _ = tx.send(Outcome::Failed(e));
        }
    };
    (on_text, on_error)
}

// =============================================================================
// Recorder
// =============================================================================

#[tokio::test(start_paused = true)]
async fn test_recorder_stops_after_five_seconds_of_silence() {
    let microphone = Arc::new(ScriptedMicrophone::quiet());
    let transcriber = Arc::new(FakeTranscriber::new("hello there"));
    let recorder = recorder(&microphone, &transcriber, Notifier::disabled());

    let (tx, mut rx) = mpsc::unbounded_channel();
    let (on_text, on_error) = callbacks(&tx);
    let start = Instant::now();
    let handle = recorder.start_listening(on_text, on_error).unwrap();
    assert_eq!(handle.state(), RecordingState::Recording);

    match rx.recv().await.unwrap() {
        Outcome::Transcript(text) => assert_eq!(text, "hello there"),
        Outcome::Failed(e) => panic!("unexpected failure: {e}"),
    }

    let (called_at, _) = transcriber.calls.lock().unwrap()[0];
    let elapsed = called_at - start;
    assert!(elapsed >= Duration::from_secs(5), "stopped early: {elapsed:?}");
    assert!(elapsed < Duration::from_millis(5100), "stopped late: {elapsed:?}");

    assert_eq!(handle.state(), RecordingState::Stopped);
    assert_eq!(microphone.close_count(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_recorder_silence_timer_restarts_on_sound() {
    // 3s silence, 1s speech, then silence until stopped
    let microphone = Arc::new(ScriptedMicrophone::new(|elapsed| {
        if elapsed >= Duration::from_secs(3) && elapsed < Duration::from_secs(4) {
            0.3
        } else {
            0.0
        }
    }));
    let transcriber = Arc::new(FakeTranscriber::new("answer"));
    let recorder = recorder(&microphone, &transcriber, Notifier::disabled());

    let (tx, mut rx) = mpsc::unbounded_channel();
    let (on_text, on_error) = callbacks(&tx);
    let start = Instant::now();
    let _handle = recorder.start_listening(on_text, on_error).unwrap();

    assert!(matches!(rx.recv().await, Some(Outcome::Transcript(_))));

    let (called_at, samples) = transcriber.calls.lock().unwrap()[0];
    let elapsed = called_at - start;
    assert!(elapsed >= Duration::from_secs(9), "stopped early: {elapsed:?}");
    assert!(elapsed < Duration::from_millis(9100), "stopped late: {elapsed:?}");
    assert!(samples > 0);
}

#[tokio::test(start_paused = true)]
async fn test_recorder_manual_stop_transcribes() {
    let microphone = Arc::new(ScriptedMicrophone::loud());
    let transcriber = Arc::new(FakeTranscriber::new("stopped by hand"));
    let recorder = recorder(&microphone, &transcriber, Notifier::disabled());

    let (tx, mut rx) = mpsc::unbounded_channel();
    let (on_text, on_error) = callbacks(&tx);
    let mut handle = recorder.start_listening(on_text, on_error).unwrap();

    tokio::time::sleep(Duration::from_secs(2)).await;
    assert!(handle.is_recording());
    handle.stop();

    match rx.recv().await.unwrap() {
        Outcome::Transcript(text) => assert_eq!(text, "stopped by hand"),
        Outcome::Failed(e) => panic!("unexpected failure: {e}"),
    }
    assert_eq!(transcriber.call_count(), 1);
    assert!(!handle.is_recording());
    assert_eq!(microphone.close_count(), 1);

    // Stopping again is harmless
    handle.stop();
}

#[tokio::test(start_paused = true)]
async fn test_recorder_abort_discards_audio() {
    let microphone = Arc::new(ScriptedMicrophone::loud());
    let transcriber = Arc::new(FakeTranscriber::new("never"));
    let recorder = recorder(&microphone, &transcriber, Notifier::disabled());

    let (tx, mut rx) = mpsc::unbounded_channel();
    let (on_text, on_error) = callbacks(&tx);
    let handle = recorder.start_listening(on_text, on_error).unwrap();

    tokio::time::sleep(Duration::from_secs(1)).await;
    drop(handle);
    tokio::time::sleep(Duration::from_secs(10)).await;

    assert!(rx.try_recv().is_err());
    assert_eq!(transcriber.call_count(), 0);
    assert_eq!(microphone.close_count(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_recorder_empty_audio_skips_transcription() {
    let microphone = Arc::new(ScriptedMicrophone::empty());
    let transcriber = Arc::new(FakeTranscriber::new("unused"));
    let recorder = recorder(&microphone, &transcriber, Notifier::disabled());

    let (tx, mut rx) = mpsc::unbounded_channel();
    let (on_text, on_error) = callbacks(&tx);
    let mut handle = recorder.start_listening(on_text, on_error).unwrap();
    handle.stop();

    match rx.recv().await.unwrap() {
        Outcome::Transcript(text) => assert!(text.is_empty()),
        Outcome::Failed(e) => panic!("unexpected failure: {e}"),
    }
    assert_eq!(transcriber.call_count(), 0);
}

#[tokio::test]
async fn test_recorder_microphone_denied() {
    let microphone = Arc::new(ScriptedMicrophone::denied());
    let transcriber = Arc::new(FakeTranscriber::new("unused"));
    let (notifier, mut notices) = Notifier::channel();
    let recorder = recorder(&microphone, &transcriber, notifier);

    let (tx, mut rx) = mpsc::unbounded_channel();
    let (on_text, on_error) = callbacks(&tx);
    assert!(recorder.start_listening(on_text, on_error).is_none());

    assert!(matches!(
        rx.try_recv(),
        Ok(Outcome::Failed(Error::PermissionDenied(_)))
    ));
    assert_eq!(drain_notices(&mut notices), vec!["Microphone access denied"]);
}

#[tokio::test(start_paused = true)]
async fn test_recorder_transcription_failure_notifies() {
    let microphone = Arc::new(ScriptedMicrophone::loud());
    let transcriber = Arc::new(FakeTranscriber::new("unused"));
    transcriber.push(Err("audio too short"));
    let (notifier, mut notices) = Notifier::channel();
    let recorder = recorder(&microphone, &transcriber, notifier);

    let (tx, mut rx) = mpsc::unbounded_channel();
    let (on_text, on_error) = callbacks(&tx);
    let mut handle = recorder.start_listening(on_text, on_error).unwrap();
    tokio::time::sleep(Duration::from_millis(500)).await;
    handle.stop();

    assert!(matches!(
        rx.recv().await,
        Some(Outcome::Failed(Error::TranscriptionFailed(_)))
    ));
    assert_eq!(
        drain_notices(&mut notices),
        vec!["Transcription failed: audio too short"]
    );
}

// =============================================================================
// Speaker
// =============================================================================

fn speaker(
    synthesizer: &Arc<FakeSynthesizer>,
    sink: &Arc<FakeSink>,
    notifier: Notifier,
) -> Speaker {
    Speaker::new(
        Arc::clone(synthesizer) as Arc<dyn Synthesizer>,
        Arc::clone(sink) as Arc<dyn AudioSink>,
        notifier,
    )
}

fn on_complete(
    tx: &mpsc::UnboundedSender<(&'static str, SpeechOutcome)>,
    label: &'static str,
) -> impl FnOnce(SpeechOutcome) + Send + 'static {
    let tx = tx.clone();
    move |outcome| {
        let _ = tx.send((label, outcome));
    }
}

#[tokio::test]
async fn test_speaker_plays_and_completes_once() {
    let synthesizer = Arc::new(FakeSynthesizer::new());
    let sink = Arc::new(FakeSink::new());
    let speaker = speaker(&synthesizer, &sink, Notifier::disabled());
    let mut slot = PlaybackSlot::new();

    let (tx, mut rx) = mpsc::unbounded_channel();
    let id = speaker.speak(&mut slot, "Welcome", "Ruby-PlayAI", on_complete(&tx, "a"));
    assert_eq!(slot.current_id(), Some(id));

    assert_eq!(rx.recv().await, Some(("a", SpeechOutcome::Finished)));
    assert_eq!(sink.played(), vec!["Welcome"]);
    assert!(!slot.is_active());

    drop(tx);
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert!(rx.try_recv().is_err());
}

#[tokio::test]
async fn test_speaker_new_speech_supersedes_old() {
    let synthesizer = Arc::new(FakeSynthesizer::new());
    let sink = Arc::new(FakeSink::new());
    let speaker = speaker(&synthesizer, &sink, Notifier::disabled());
    let mut slot = PlaybackSlot::new();

    let (tx, mut rx) = mpsc::unbounded_channel();
    speaker.speak(&mut slot, "long answer", "Ruby-PlayAI", on_complete(&tx, "first"));

    // Wait for the first playback to start
    while sink.played().is_empty() {
        tokio::time::sleep(Duration::from_millis(5)).await;
    }

    let second = speaker.speak(&mut slot, "next", "Ruby-PlayAI", on_complete(&tx, "second"));
    assert_eq!(slot.current_id(), Some(second));

    let mut outcomes = vec![rx.recv().await.unwrap(), rx.recv().await.unwrap()];
    outcomes.sort_by_key(|(label, _)| *label);
    assert_eq!(
        outcomes,
        vec![
            ("first", SpeechOutcome::Cancelled),
            ("second", SpeechOutcome::Finished)
        ]
    );
    assert_eq!(sink.interrupted.load(std::sync::atomic::Ordering::SeqCst), 1);

    drop(tx);
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert!(rx.try_recv().is_err());
}

#[tokio::test]
async fn test_speaker_stop_during_synthesis() {
    let synthesizer = Arc::new(FakeSynthesizer::with_delay(Duration::from_secs(30)));
    let sink = Arc::new(FakeSink::new());
    let speaker = speaker(&synthesizer, &sink, Notifier::disabled());
    let mut slot = PlaybackSlot::new();

    let (tx, mut rx) = mpsc::unbounded_channel();
    speaker.speak(&mut slot, "Hello", "Ruby-PlayAI", on_complete(&tx, "a"));
    tokio::time::sleep(Duration::from_millis(20)).await;
    slot.stop_speaking();

    let outcome = tokio::time::timeout(Duration::from_secs(2), rx.recv())
        .await
        .unwrap();
    assert_eq!(outcome, Some(("a", SpeechOutcome::Cancelled)));
    assert!(sink.played().is_empty());

    // Stopping an empty slot is a no-op
    slot.stop_speaking();
    assert_eq!(slot.current_id(), None);
}

#[tokio::test]
async fn test_speaker_rate_limit_is_informational() {
    let synthesizer = Arc::new(FakeSynthesizer::new());
    synthesizer.fail_with(SynthesisFailure::RateLimited);
    let sink = Arc::new(FakeSink::new());
    let (notifier, mut notices) = Notifier::channel();
    let speaker = speaker(&synthesizer, &sink, notifier);
    let mut slot = PlaybackSlot::new();

    let (tx, mut rx) = mpsc::unbounded_channel();
    speaker.speak(&mut slot, "Hello", "Ruby-PlayAI", on_complete(&tx, "a"));

    assert_eq!(rx.recv().await, Some(("a", SpeechOutcome::Failed)));
    let notice = notices.recv().await.unwrap();
    assert_eq!(notice.level, interview_partner::NoticeLevel::Info);
    assert_eq!(
        notice.message,
        "Voice temporarily unavailable due to rate limits. Text will still appear."
    );
    assert!(sink.played().is_empty());
}

#[tokio::test]
async fn test_speaker_unavailable_reports_detail() {
    let synthesizer = Arc::new(FakeSynthesizer::new());
    synthesizer.fail_with(SynthesisFailure::Unavailable("model offline".to_string()));
    let sink = Arc::new(FakeSink::new());
    let (notifier, mut notices) = Notifier::channel();
    let speaker = speaker(&synthesizer, &sink, notifier);
    let mut slot = PlaybackSlot::new();

    let (tx, mut rx) = mpsc::unbounded_channel();
    speaker.speak(&mut slot, "Hello", "Ruby-PlayAI", on_complete(&tx, "a"));

    assert_eq!(rx.recv().await, Some(("a", SpeechOutcome::Failed)));
    let notice = notices.recv().await.unwrap();
    assert_eq!(notice.level, interview_partner::NoticeLevel::Error);
    assert_eq!(notice.message, "Voice unavailable: model offline");
}

// =============================================================================
// WAV
// =============================================================================

#[test]
fn test_wav_file_round_trip_preserves_format() {
    let samples = generate_sine_samples(440.0, 0.5, 0.5);
    let wav = samples_to_wav(&samples, SAMPLE_RATE).unwrap();

    assert_eq!(&wav[0..4], b"RIFF");
    assert_eq!(&wav[8..12], b"WAVE");

    let (decoded, rate) = wav_to_samples(&wav).unwrap();
    assert_eq!(rate, SAMPLE_RATE);
    assert_eq!(decoded.len(), samples.len());
    assert!((decoded[100] - samples[100]).abs() < 0.001);
}

#[test]
fn test_wav_rejects_garbage() {
    assert!(wav_to_samples(b"definitely not a wav file").is_err());
}
