use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::timer::Phase;

/// Every state change in the system produces an Event.
/// The CLI prints them; tests assert on them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Event {
    MetronomeStarted {
        bpm: u32,
        beats_per_measure: u32,
        at: DateTime<Utc>,
    },
    MetronomeStopped {
        at: DateTime<Utc>,
    },
    /// One metronome beat. `accent` is true on the downbeat.
    Beat {
        index: u32,
        accent: bool,
    },
    PomodoroStarted {
        phase: Phase,
        time_left_secs: u32,
        at: DateTime<Utc>,
    },
    PomodoroPaused {
        phase: Phase,
        time_left_secs: u32,
        at: DateTime<Utc>,
    },
    /// A phase ran out and the engine moved on (stopped).
    PhaseCompleted {
        from: Phase,
        to: Phase,
        completed_cycles: u32,
        at: DateTime<Utc>,
    },
    PomodoroReset {
        at: DateTime<Utc>,
    },
    SessionSaved {
        id: String,
        completed_cycles: u32,
        total_work_minutes: u32,
        at: DateTime<Utc>,
    },
    StateSnapshot {
        phase: Phase,
        running: bool,
        time_left_secs: u32,
        display: String,
        progress_pct: f64,
        session_number: u32,
        completed_cycles: u32,
        total_work_minutes: u32,
        at: DateTime<Utc>,
    },
}

impl Event {
    /// Phase transitions and saves are worth surfacing to a user; beats are not.
    pub fn is_notable(&self) -> bool {
        !matches!(self, Event::Beat { .. } | Event::StateSnapshot { .. })
    }
}
