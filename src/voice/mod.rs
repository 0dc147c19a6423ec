//! Voice processing module
//!
//! Handles microphone capture, silence-gated recording, transcription, speech
//! synthesis and playback. Transcription and synthesis are served by the
//! interview backend (see [`crate::backend::BackendClient`]).

mod capture;
mod playback;
mod recorder;
mod silence;
mod speaker;

pub use capture::{
    AudioCapture, AudioStream, CpalMicrophone, Microphone, SAMPLE_RATE, Utterance, rms_energy,
    samples_to_wav, wav_to_samples,
};
pub use playback::{AudioPlayback, AudioSink, PLAYBACK_SAMPLE_RATE, decode_mp3, resample};
pub use recorder::{RecordingHandle, RecordingState, Recorder, StopReason, Transcriber};
pub use silence::SilenceDetector;
pub use speaker::{PlaybackHandle, PlaybackSlot, Speaker, SpeechOutcome, Synthesizer};
