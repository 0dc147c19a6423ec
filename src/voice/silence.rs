//! Silence detection over a stream of energy samples

use std::time::Duration;

use tokio::time::Instant;

use crate::config::SilenceSettings;

/// Decides when the speaker has stopped talking
///
/// Tracks when the current run of below-threshold samples began. Any sample at
/// or above the threshold clears the run. Fires once when a run lasts for the
/// configured duration.
#[derive(Debug, Clone)]
pub struct SilenceDetector {
    threshold: f32,
    duration: Duration,
    silence_start: Option<Instant>,
    fired: bool,
}

impl SilenceDetector {
    /// Create a detector from settings
    #[must_use]
    pub const fn new(settings: &SilenceSettings) -> Self {
        Self {
            threshold: settings.threshold,
            duration: settings.duration,
            silence_start: None,
            fired: false,
        }
    }

    /// Feed one energy sample taken at `now`
    ///
    /// Returns `true` exactly once, on the sample where silence has persisted
    /// for the full duration.
    pub fn observe(&mut self, energy: f32, now: Instant) -> bool {
        if self.fired {
            return false;
        }

        if energy < self.threshold {
            let start = *self.silence_start.get_or_insert(now);
            if now.saturating_duration_since(start) >= self.duration {
                tracing::debug!(
                    silent_ms = now.saturating_duration_since(start).as_millis(),
                    "silence timeout reached"
                );
                self.fired = true;
                return true;
            }
        } else {
            if self.silence_start.is_some() {
                tracing::trace!(energy, "sound detected, silence timer reset");
            }
            self.silence_start = None;
        }

        false
    }

    /// When the current silent run began, if one is in progress
    #[must_use]
    pub const fn silence_start(&self) -> Option<Instant> {
        self.silence_start
    }

    /// Whether the detector has already fired
    #[must_use]
    pub const fn has_fired(&self) -> bool {
        self.fired
    }

    /// Clear all state
    pub const fn reset(&mut self) {
        self.silence_start = None;
        self.fired = false;
    }
}
