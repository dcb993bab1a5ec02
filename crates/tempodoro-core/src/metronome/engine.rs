//! Metronome engine.
//!
//! Like the Pomodoro engine this is a plain state machine with no thread
//! of its own. Whoever owns it schedules a repeating timer at
//! [`MetronomeEngine::interval`] and calls [`MetronomeEngine::tick`] on
//! every firing.
//!
//! ```text
//! stopped --start--> running --tick--> running (beat = (beat + 1) % meter)
//!    ^                  |
//!    +-------stop-------+   (beat reset to 0)
//! ```

use std::time::Duration;

use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::error::ValidationError;
use crate::events::Event;

pub const MIN_BPM: u32 = 30;
pub const MAX_BPM: u32 = 300;
pub const DEFAULT_BPM: u32 = 120;
pub const DEFAULT_BEATS_PER_MEASURE: u32 = 4;
/// Beats per measure the metronome can count.
pub const SUPPORTED_METERS: &[u32] = &[2, 3, 4, 6];

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetronomeEngine {
    bpm: u32,
    beats_per_measure: u32,
    current_beat: u32,
    running: bool,
}

impl Default for MetronomeEngine {
    fn default() -> Self {
        Self {
            bpm: DEFAULT_BPM,
            beats_per_measure: DEFAULT_BEATS_PER_MEASURE,
            current_beat: 0,
            running: false,
        }
    }
}

impl MetronomeEngine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a stopped metronome at the given tempo and meter.
    ///
    /// The tempo is clamped; an unsupported meter is rejected.
    pub fn with_tempo(bpm: u32, beats_per_measure: u32) -> Result<Self, ValidationError> {
        let mut engine = Self::default();
        engine.set_bpm(bpm);
        engine.set_beats_per_measure(beats_per_measure)?;
        Ok(engine)
    }

    // ── Queries ──────────────────────────────────────────────────────

    pub fn bpm(&self) -> u32 {
        self.bpm
    }

    pub fn beats_per_measure(&self) -> u32 {
        self.beats_per_measure
    }

    pub fn current_beat(&self) -> u32 {
        self.current_beat
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    /// Time between two beats at the current tempo.
    pub fn interval(&self) -> Duration {
        Duration::from_micros(60_000_000 / u64::from(self.bpm))
    }

    /// The parameters a live timer depends on, or `None` when no timer
    /// should exist. A change in this value means the timer must be
    /// re-created.
    pub fn timer_key(&self) -> Option<(u32, u32)> {
        self.running.then_some((self.bpm, self.beats_per_measure))
    }

    // ── Commands ─────────────────────────────────────────────────────

    /// Set the tempo, clamped to [`MIN_BPM`]..=[`MAX_BPM`]. Returns the
    /// tempo actually applied.
    pub fn set_bpm(&mut self, bpm: u32) -> u32 {
        self.bpm = bpm.clamp(MIN_BPM, MAX_BPM);
        self.bpm
    }

    /// Nudge the tempo up or down, clamped like [`set_bpm`](Self::set_bpm).
    pub fn adjust_bpm(&mut self, delta: i32) -> u32 {
        let target = (i64::from(self.bpm) + i64::from(delta)).clamp(0, i64::from(MAX_BPM));
        self.set_bpm(target as u32)
    }

    pub fn set_beats_per_measure(&mut self, beats: u32) -> Result<(), ValidationError> {
        if !SUPPORTED_METERS.contains(&beats) {
            return Err(ValidationError::UnsupportedMeter {
                value: beats,
                allowed: SUPPORTED_METERS,
            });
        }
        self.beats_per_measure = beats;
        self.current_beat = 0;
        Ok(())
    }

    pub fn start(&mut self) -> Option<Event> {
        if self.running {
            return None;
        }
        self.running = true;
        Some(Event::MetronomeStarted {
            bpm: self.bpm,
            beats_per_measure: self.beats_per_measure,
            at: Utc::now(),
        })
    }

    /// Stop and rewind to the downbeat. Safe to call while stopped.
    pub fn stop(&mut self) -> Option<Event> {
        self.current_beat = 0;
        if !self.running {
            return None;
        }
        self.running = false;
        Some(Event::MetronomeStopped { at: Utc::now() })
    }

    pub fn toggle(&mut self) -> Option<Event> {
        if self.running {
            self.stop()
        } else {
            self.start()
        }
    }

    /// Advance one beat. Returns `None` while stopped.
    pub fn tick(&mut self) -> Option<Event> {
        if !self.running {
            return None;
        }
        self.current_beat = (self.current_beat + 1) % self.beats_per_measure;
        Some(Event::Beat {
            index: self.current_beat,
            accent: self.current_beat == 0,
        })
    }
}
