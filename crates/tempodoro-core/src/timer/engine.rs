//! Pomodoro engine implementation.
//!
//! The engine is a tick-driven state machine. It does not use internal
//! threads - the owner schedules a one-second repeating timer while
//! [`PomodoroEngine::needs_timer`] is true and calls `tick()` on each firing.
//!
//! ## State Transitions
//!
//! ```text
//! work --expire--> break      (completed_cycles % sessions_before_long_break != 0)
//! work --expire--> longBreak  (completed_cycles % sessions_before_long_break == 0)
//! break | longBreak --expire--> work
//! ```
//!
//! Every transition stops the engine; the next phase waits for `toggle()`.
//!
//! ## Usage
//!
//! ```ignore
//! let mut engine = PomodoroEngine::new(PomodoroSettings::default());
//! engine.toggle();
//! // Once per second:
//! engine.tick(); // Returns Some(Event::PhaseCompleted) when the phase ends
//! ```

use chrono::Utc;
use serde::{Deserialize, Serialize};

use super::settings::{
    clamp_to, Phase, PomodoroSettings, BREAK_MINUTES_RANGE, LONG_BREAK_MINUTES_RANGE,
    SESSIONS_BEFORE_LONG_BREAK_RANGE, WORK_MINUTES_RANGE,
};
use crate::events::Event;

/// Core Pomodoro engine.
///
/// Deserializing goes through [`StoredEngine`], so settings read back from
/// disk are clamped and the clock never exceeds its phase.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "StoredEngine")]
pub struct PomodoroEngine {
    settings: PomodoroSettings,
    phase: Phase,
    time_left_secs: u32,
    running: bool,
    completed_cycles: u32,
    /// Minutes of finished work phases since the last save.
    total_work_minutes: u32,
}

/// Persisted engine as written, before validation.
#[derive(Deserialize)]
struct StoredEngine {
    settings: PomodoroSettings,
    phase: Phase,
    time_left_secs: u32,
    #[serde(default)]
    running: bool,
    completed_cycles: u32,
    total_work_minutes: u32,
}

impl From<StoredEngine> for PomodoroEngine {
    fn from(stored: StoredEngine) -> Self {
        let settings = stored.settings.clamped();
        Self {
            time_left_secs: stored
                .time_left_secs
                .min(settings.duration_secs(stored.phase)),
            settings,
            phase: stored.phase,
            running: stored.running,
            completed_cycles: stored.completed_cycles,
            total_work_minutes: stored.total_work_minutes,
        }
    }
}

impl Default for PomodoroEngine {
    fn default() -> Self {
        Self::new(PomodoroSettings::default())
    }
}

impl PomodoroEngine {
    /// Create an engine in the `work` phase, stopped, with a full work phase
    /// on the clock.
    pub fn new(settings: PomodoroSettings) -> Self {
        let settings = settings.clamped();
        Self {
            time_left_secs: settings.duration_secs(Phase::Work),
            settings,
            phase: Phase::Work,
            running: false,
            completed_cycles: 0,
            total_work_minutes: 0,
        }
    }

    // ── Queries ──────────────────────────────────────────────────────

    pub fn settings(&self) -> &PomodoroSettings {
        &self.settings
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn time_left_secs(&self) -> u32 {
        self.time_left_secs
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    pub fn completed_cycles(&self) -> u32 {
        self.completed_cycles
    }

    pub fn total_work_minutes(&self) -> u32 {
        self.total_work_minutes
    }

    /// Whether a one-second timer should currently be live.
    pub fn needs_timer(&self) -> bool {
        self.running && self.time_left_secs > 0
    }

    pub fn phase_duration_secs(&self) -> u32 {
        self.settings.duration_secs(self.phase)
    }

    /// 0.0 .. 100.0 elapsed share of the current phase.
    pub fn progress_pct(&self) -> f64 {
        let total = self.phase_duration_secs();
        if total == 0 {
            return 0.0;
        }
        let elapsed = total.saturating_sub(self.time_left_secs);
        (f64::from(elapsed) / f64::from(total) * 100.0).clamp(0.0, 100.0)
    }

    /// Remaining time as `MM:SS`.
    pub fn display(&self) -> String {
        format!("{:02}:{:02}", self.time_left_secs / 60, self.time_left_secs % 60)
    }

    /// 1-based number of the work session in progress.
    pub fn session_number(&self) -> u32 {
        self.completed_cycles + 1
    }

    /// How many of the `sessions_before_long_break` markers are filled.
    pub fn cycle_dots(&self) -> u32 {
        self.completed_cycles % self.settings.sessions_before_long_break
    }

    /// Build a full state snapshot event.
    pub fn snapshot(&self) -> Event {
        Event::StateSnapshot {
            phase: self.phase,
            running: self.running,
            time_left_secs: self.time_left_secs,
            display: self.display(),
            progress_pct: self.progress_pct(),
            session_number: self.session_number(),
            completed_cycles: self.completed_cycles,
            total_work_minutes: self.total_work_minutes,
            at: Utc::now(),
        }
    }

    // ── Commands ─────────────────────────────────────────────────────

    /// Start or pause. Starting with an empty clock rewinds to a fresh work
    /// phase first.
    pub fn toggle(&mut self) -> Event {
        if !self.running && self.time_left_secs == 0 {
            self.phase = Phase::Work;
            self.time_left_secs = self.settings.duration_secs(Phase::Work);
        }
        self.running = !self.running;
        if self.running {
            Event::PomodoroStarted {
                phase: self.phase,
                time_left_secs: self.time_left_secs,
                at: Utc::now(),
            }
        } else {
            Event::PomodoroPaused {
                phase: self.phase,
                time_left_secs: self.time_left_secs,
                at: Utc::now(),
            }
        }
    }

    /// Stop without touching the clock. Used when restoring a persisted
    /// engine and when a front end takes over the screen.
    pub fn halt(&mut self) {
        self.running = false;
    }

    /// Stop and rewind to a full work phase. Statistics are kept.
    pub fn reset(&mut self) -> Event {
        self.running = false;
        self.phase = Phase::Work;
        self.time_left_secs = self.settings.duration_secs(Phase::Work);
        Event::PomodoroReset { at: Utc::now() }
    }

    /// Zero the cycle count and accumulated work minutes.
    pub fn clear_stats(&mut self) {
        self.completed_cycles = 0;
        self.total_work_minutes = 0;
    }

    /// Call once per second. Returns `Some(Event::PhaseCompleted)` when the
    /// phase runs out.
    pub fn tick(&mut self) -> Option<Event> {
        if !self.needs_timer() {
            return None;
        }
        self.time_left_secs -= 1;
        if self.time_left_secs == 0 {
            return Some(self.complete_phase());
        }
        None
    }

    /// Set the work duration. While sitting idle in the work phase the
    /// clock follows the new value.
    pub fn set_work_minutes(&mut self, minutes: u32) -> u32 {
        self.settings.work_minutes = clamp_to(minutes, &WORK_MINUTES_RANGE);
        if self.phase == Phase::Work && !self.running {
            self.time_left_secs = self.settings.duration_secs(Phase::Work);
        }
        self.settings.work_minutes
    }

    /// Set the short break duration. A break already on the clock keeps
    /// its remaining time.
    pub fn set_break_minutes(&mut self, minutes: u32) -> u32 {
        self.settings.break_minutes = clamp_to(minutes, &BREAK_MINUTES_RANGE);
        self.settings.break_minutes
    }

    /// Set the long break duration. A long break already on the clock
    /// keeps its remaining time.
    pub fn set_long_break_minutes(&mut self, minutes: u32) -> u32 {
        self.settings.long_break_minutes = clamp_to(minutes, &LONG_BREAK_MINUTES_RANGE);
        self.settings.long_break_minutes
    }

    pub fn set_sessions_before_long_break(&mut self, sessions: u32) -> u32 {
        self.settings.sessions_before_long_break =
            clamp_to(sessions, &SESSIONS_BEFORE_LONG_BREAK_RANGE);
        self.settings.sessions_before_long_break
    }

    /// Bring the settings in line with `settings` through the setters,
    /// touching only the values that differ.
    pub fn apply_settings(&mut self, settings: PomodoroSettings) {
        if settings.work_minutes != self.settings.work_minutes {
            self.set_work_minutes(settings.work_minutes);
        }
        if settings.break_minutes != self.settings.break_minutes {
            self.set_break_minutes(settings.break_minutes);
        }
        if settings.long_break_minutes != self.settings.long_break_minutes {
            self.set_long_break_minutes(settings.long_break_minutes);
        }
        if settings.sessions_before_long_break != self.settings.sessions_before_long_break {
            self.set_sessions_before_long_break(settings.sessions_before_long_break);
        }
    }

    // ── Internal ─────────────────────────────────────────────────────

    fn complete_phase(&mut self) -> Event {
        let from = self.phase;
        let next = match from {
            Phase::Work => {
                self.completed_cycles += 1;
                self.total_work_minutes += self.settings.work_minutes;
                if self.completed_cycles % self.settings.sessions_before_long_break == 0 {
                    Phase::LongBreak
                } else {
                    Phase::Break
                }
            }
            Phase::Break | Phase::LongBreak => Phase::Work,
        };
        self.phase = next;
        self.time_left_secs = self.settings.duration_secs(next);
        self.running = false;
        Event::PhaseCompleted {
            from,
            to: next,
            completed_cycles: self.completed_cycles,
            at: Utc::now(),
        }
    }
}
