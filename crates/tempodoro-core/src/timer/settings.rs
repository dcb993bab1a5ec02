use std::ops::RangeInclusive;

use serde::{Deserialize, Serialize};

/// One of the three Pomodoro phases.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Phase {
    Work,
    Break,
    LongBreak,
}

impl Phase {
    pub fn label(self) -> &'static str {
        match self {
            Phase::Work => "Work Time",
            Phase::Break => "Short Break",
            Phase::LongBreak => "Long Break",
        }
    }

    pub fn is_break(self) -> bool {
        !matches!(self, Phase::Work)
    }
}

impl std::fmt::Display for Phase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Phase::Work => "work",
            Phase::Break => "break",
            Phase::LongBreak => "longBreak",
        })
    }
}

pub const WORK_MINUTES_RANGE: RangeInclusive<u32> = 1..=60;
pub const BREAK_MINUTES_RANGE: RangeInclusive<u32> = 1..=30;
pub const LONG_BREAK_MINUTES_RANGE: RangeInclusive<u32> = 1..=60;
pub const SESSIONS_BEFORE_LONG_BREAK_RANGE: RangeInclusive<u32> = 2..=10;

/// Durations (in minutes) and the long-break cadence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PomodoroSettings {
    pub work_minutes: u32,
    pub break_minutes: u32,
    pub long_break_minutes: u32,
    pub sessions_before_long_break: u32,
}

impl Default for PomodoroSettings {
    fn default() -> Self {
        Self {
            work_minutes: 25,
            break_minutes: 5,
            long_break_minutes: 15,
            sessions_before_long_break: 4,
        }
    }
}

impl PomodoroSettings {
    /// Build settings with every value clamped into its allowed range.
    pub fn new(
        work_minutes: u32,
        break_minutes: u32,
        long_break_minutes: u32,
        sessions_before_long_break: u32,
    ) -> Self {
        Self {
            work_minutes: clamp_to(work_minutes, &WORK_MINUTES_RANGE),
            break_minutes: clamp_to(break_minutes, &BREAK_MINUTES_RANGE),
            long_break_minutes: clamp_to(long_break_minutes, &LONG_BREAK_MINUTES_RANGE),
            sessions_before_long_break: clamp_to(
                sessions_before_long_break,
                &SESSIONS_BEFORE_LONG_BREAK_RANGE,
            ),
        }
    }

    /// Re-apply the ranges, e.g. after deserializing hand-edited values.
    pub fn clamped(self) -> Self {
        Self::new(
            self.work_minutes,
            self.break_minutes,
            self.long_break_minutes,
            self.sessions_before_long_break,
        )
    }

    pub fn minutes_for(&self, phase: Phase) -> u32 {
        match phase {
            Phase::Work => self.work_minutes,
            Phase::Break => self.break_minutes,
            Phase::LongBreak => self.long_break_minutes,
        }
    }

    pub fn duration_secs(&self, phase: Phase) -> u32 {
        self.minutes_for(phase).saturating_mul(60)
    }
}

pub(crate) fn clamp_to(value: u32, range: &RangeInclusive<u32>) -> u32 {
    value.clamp(*range.start(), *range.end())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn phase_serializes_camel_case() {
        assert_eq!(serde_json::to_string(&Phase::LongBreak).unwrap(), "\"longBreak\"");
        assert_eq!(serde_json::from_str::<Phase>("\"break\"").unwrap(), Phase::Break);
    }

    #[test]
    fn new_clamps_every_field() {
        let s = PomodoroSettings::new(0, 45, 90, 1);
        assert_eq!(s, PomodoroSettings::new(1, 30, 60, 2));
    }

    #[test]
    fn durations_in_seconds() {
        let s = PomodoroSettings::default();
        assert_eq!(s.duration_secs(Phase::Work), 1500);
        assert_eq!(s.duration_secs(Phase::Break), 300);
        assert_eq!(s.duration_secs(Phase::LongBreak), 900);
    }
}
