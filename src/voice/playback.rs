//! Audio playback to speakers

use std::io::Cursor;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use cpal::SampleRate;
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};

use crate::{Error, Result};

/// Sample rate for playback (matches common TTS output)
pub const PLAYBACK_SAMPLE_RATE: u32 = 24000;

/// Somewhere synthesized speech can be played
///
/// `play` blocks until the audio finishes or `stop` becomes true; callers run
/// it on the blocking pool.
pub trait AudioSink: Send + Sync {
    /// Play encoded audio (MP3), returning early once `stop` is set
    ///
    /// # Errors
    ///
    /// Returns error if decoding or the output device fails
    fn play(&self, audio: &[u8], stop: &AtomicBool) -> Result<()>;
}

/// Plays audio to the default output device
pub struct AudioPlayback {
    config: cpal::StreamConfig,
}

impl AudioPlayback {
    /// Create a new audio playback instance
    ///
    /// # Errors
    ///
    /// Returns error if audio device cannot be opened
    pub fn new() -> Result<Self> {
        let host = cpal::default_host();

        let device = host
            .default_output_device()
            .ok_or_else(|| Error::Audio("no output device available".to_string()))?;

        let supported_config = device
            .supported_output_configs()
            .map_err(|e| Error::Audio(e.to_string()))?
            .find(|c| {
                c.channels() == 1
                    && c.min_sample_rate() <= SampleRate(PLAYBACK_SAMPLE_RATE)
                    && c.max_sample_rate() >= SampleRate(PLAYBACK_SAMPLE_RATE)
            })
            .or_else(|| {
                // Fallback: try stereo
                device.supported_output_configs().ok()?.find(|c| {
                    c.channels() == 2
                        && c.min_sample_rate() <= SampleRate(PLAYBACK_SAMPLE_RATE)
                        && c.max_sample_rate() >= SampleRate(PLAYBACK_SAMPLE_RATE)
                })
            })
            .ok_or_else(|| Error::Audio("no suitable output config found".to_string()))?;

        let config = supported_config
            .with_sample_rate(SampleRate(PLAYBACK_SAMPLE_RATE))
            .config();

        tracing::debug!(
            device = device.name().unwrap_or_default(),
            sample_rate = PLAYBACK_SAMPLE_RATE,
            channels = config.channels,
            "audio playback initialized"
        );

        Ok(Self { config })
    }

    /// Play mono f32 samples at the playback rate until done or stopped
    ///
    /// # Errors
    ///
    /// Returns error if the output stream fails
    pub fn play_samples(&self, samples: Vec<f32>, stop: &AtomicBool) -> Result<()> {
        if samples.is_empty() {
            return Ok(());
        }

        let host = cpal::default_host();
        let device = host
            .default_output_device()
            .ok_or_else(|| Error::Audio("no output device".to_string()))?;

        let channels = usize::from(self.config.channels);
        let sample_count = samples.len();

        let samples = Arc::new(samples);
        let position = Arc::new(AtomicUsize::new(0));
        let finished = Arc::new(AtomicBool::new(false));
        let failure = Arc::new(Mutex::new(None::<String>));

        let stream = {
            let samples = Arc::clone(&samples);
            let position = Arc::clone(&position);
            let finished = Arc::clone(&finished);
            let failure = Arc::clone(&failure);

            device
                .build_output_stream(
                    &self.config,
                    move |data: &mut [f32], _: &cpal::OutputCallbackInfo| {
                        let mut pos = position.load(Ordering::Relaxed);
                        for frame in data.chunks_mut(channels) {
                            let sample = samples.get(pos).copied().unwrap_or(0.0);
                            frame.fill(sample);
                            if pos < samples.len() {
                                pos += 1;
                            }
                        }
                        position.store(pos, Ordering::Relaxed);
                        if pos >= samples.len() {
                            finished.store(true, Ordering::Release);
                        }
                    },
                    move |err| {
                        tracing::error!(error = %err, "audio playback error");
                        if let Ok(mut slot) = failure.lock() {
                            *slot = Some(err.to_string());
                        }
                    },
                    None,
                )
                .map_err(|e| Error::Audio(e.to_string()))?
        };

        stream.play().map_err(|e| Error::Audio(e.to_string()))?;

        let duration_ms = (sample_count as u64 * 1000) / u64::from(PLAYBACK_SAMPLE_RATE);
        let timeout = Duration::from_millis(duration_ms + 500);
        let start = Instant::now();

        while !finished.load(Ordering::Acquire) {
            if stop.load(Ordering::Acquire) {
                tracing::debug!(
                    played = position.load(Ordering::Relaxed),
                    total = sample_count,
                    "playback stopped early"
                );
                return Ok(());
            }
            if start.elapsed() > timeout {
                tracing::warn!("playback did not finish before timeout");
                break;
            }
            std::thread::sleep(Duration::from_millis(20));
        }

        // Let the device drain its last buffer
        std::thread::sleep(Duration::from_millis(100));
        drop(stream);

        if let Some(err) = failure.lock().ok().and_then(|mut f| f.take()) {
            return Err(Error::Audio(err));
        }

        tracing::debug!(samples = sample_count, "playback complete");
        Ok(())
    }
}

impl AudioSink for AudioPlayback {
    fn play(&self, audio: &[u8], stop: &AtomicBool) -> Result<()> {
        let (samples, sample_rate) = decode_mp3(audio)?;
        let samples = if sample_rate == PLAYBACK_SAMPLE_RATE {
            samples
        } else {
            resample(&samples, sample_rate, PLAYBACK_SAMPLE_RATE)?
        };
        self.play_samples(samples, stop)
    }
}

/// Decode MP3 bytes to mono f32 samples and their sample rate
///
/// # Errors
///
/// Returns error if the data is not valid MP3
pub fn decode_mp3(mp3_data: &[u8]) -> Result<(Vec<f32>, u32)> {
    let mut decoder = minimp3::Decoder::new(Cursor::new(mp3_data));
    let mut samples = Vec::new();
    let mut sample_rate = PLAYBACK_SAMPLE_RATE;

    loop {
        match decoder.next_frame() {
            Ok(frame) => {
                #[allow(clippy::cast_sign_loss)]
                {
                    sample_rate = frame.sample_rate as u32;
                }

                if frame.channels == 2 {
                    // Stereo: average channels
                    samples.extend(frame.data.chunks(2).map(|chunk| {
                        let left = f32::from(chunk[0]) / 32768.0;
                        let right = f32::from(chunk.get(1).copied().unwrap_or(chunk[0])) / 32768.0;
                        f32::midpoint(left, right)
                    }));
                } else {
                    samples.extend(frame.data.iter().map(|&s| f32::from(s) / 32768.0));
                }
            }
            Err(minimp3::Error::Eof) => break,
            Err(e) => return Err(Error::Audio(format!("MP3 decode error: {e}"))),
        }
    }

    Ok((samples, sample_rate))
}

/// Resample mono audio using rubato
///
/// # Errors
///
/// Returns error if the resampler cannot be built
#[allow(clippy::cast_possible_truncation)]
pub fn resample(samples: &[f32], from_rate: u32, to_rate: u32) -> Result<Vec<f32>> {
    use rubato::{FftFixedIn, Resampler};

    if samples.is_empty() || from_rate == to_rate {
        return Ok(samples.to_vec());
    }

    let chunk_size = 1024;
    let sub_chunks = 2;

    let mut resampler =
        FftFixedIn::<f64>::new(from_rate as usize, to_rate as usize, chunk_size, sub_chunks, 1)
            .map_err(|e| Error::Audio(format!("resampler init failed: {e}")))?;

    let mut input: Vec<f64> = samples.iter().map(|&s| f64::from(s)).collect();

    // Pad the tail so the last partial chunk is not dropped
    let remainder = input.len() % chunk_size;
    if remainder != 0 {
        input.resize(input.len() + chunk_size - remainder, 0.0);
    }

    let mut output = Vec::with_capacity(samples.len() * to_rate as usize / from_rate as usize + 1);
    for chunk in input.chunks(chunk_size) {
        let result = resampler
            .process(&[chunk.to_vec()], None)
            .map_err(|e| Error::Audio(format!("resample failed: {e}")))?;
        output.extend(result[0].iter().map(|&s| s as f32));
    }

    Ok(output)
}
