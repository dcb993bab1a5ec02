//! Human-readable rendering for terminal output.

use chrono::{DateTime, Local, TimeZone, Utc};
use tempodoro_core::{HistorySummary, SessionRecord};

/// `Today`, `Yesterday`, or `Mar 4, 2026`, in the given zone.
pub fn date_label_in<Tz: TimeZone>(date: DateTime<Utc>, now: DateTime<Utc>, tz: &Tz) -> String
where
    Tz::Offset: std::fmt::Display,
{
    let day = date.with_timezone(tz).date_naive();
    let today = now.with_timezone(tz).date_naive();
    if day == today {
        "Today".to_string()
    } else if today.pred_opt() == Some(day) {
        "Yesterday".to_string()
    } else {
        day.format("%b %-d, %Y").to_string()
    }
}

/// `3:05 PM`, in the given zone.
pub fn clock_time_in<Tz: TimeZone>(date: DateTime<Utc>, tz: &Tz) -> String
where
    Tz::Offset: std::fmt::Display,
{
    date.with_timezone(tz).format("%-I:%M %p").to_string()
}

pub fn session_line(record: &SessionRecord, now: DateTime<Utc>) -> String {
    format!(
        "{id}  {day} {time}  {cycles} cycles  {total}m  {work}m/{brk}m",
        id = record.id,
        day = date_label_in(record.date, now, &Local),
        time = clock_time_in(record.date, &Local),
        cycles = record.completed_cycles,
        total = record.total_work_time,
        work = record.work_duration,
        brk = record.break_duration,
    )
}

pub fn summary_block(summary: &HistorySummary) -> String {
    format!(
        "sessions: {}\ncycles: {}\nfocus minutes: {}\naverage per session: {}m",
        summary.sessions, summary.cycles, summary.work_minutes, summary.average_minutes
    )
}

/// One dot per beat in the measure, the current one filled.
pub fn beat_dots(current: u32, beats_per_measure: u32) -> String {
    (0..beats_per_measure)
        .map(|i| match (i == current, i == 0) {
            (true, true) => "◆",
            (true, false) => "●",
            (false, _) => "○",
        })
        .collect::<Vec<_>>()
        .join(" ")
}

/// Completed work phases toward the next long break.
pub fn cycle_marks(filled: u32, total: u32) -> String {
    (0..total).map(|i| if i < filled { '●' } else { '○' }).collect()
}

/// Fixed-width progress bar for 0..=100.
pub fn progress_bar(pct: f64, width: usize) -> String {
    let filled = ((pct.clamp(0.0, 100.0) / 100.0) * width as f64).round() as usize;
    format!("[{}{}]", "#".repeat(filled), "-".repeat(width - filled))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn at(y: i32, m: u32, d: u32, h: u32, min: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, m, d, h, min, 0).unwrap()
    }

    #[test]
    fn date_labels() {
        let now = at(2026, 3, 4, 18, 0);
        assert_eq!(date_label_in(at(2026, 3, 4, 1, 0), now, &Utc), "Today");
        assert_eq!(date_label_in(at(2026, 3, 3, 23, 59), now, &Utc), "Yesterday");
        assert_eq!(date_label_in(at(2025, 12, 25, 9, 0), now, &Utc), "Dec 25, 2025");
    }

    #[test]
    fn twelve_hour_clock() {
        assert_eq!(clock_time_in(at(2026, 3, 4, 15, 5), &Utc), "3:05 PM");
        assert_eq!(clock_time_in(at(2026, 3, 4, 0, 30), &Utc), "12:30 AM");
    }

    #[test]
    fn dots_mark_current_beat() {
        assert_eq!(beat_dots(0, 3), "◆ ○ ○");
        assert_eq!(beat_dots(2, 4), "○ ○ ● ○");
    }

    #[test]
    fn cycle_marks_fill_from_the_left() {
        assert_eq!(cycle_marks(0, 4), "○○○○");
        assert_eq!(cycle_marks(3, 4), "●●●○");
    }

    #[test]
    fn bar_is_clamped() {
        assert_eq!(progress_bar(50.0, 4), "[##--]");
        assert_eq!(progress_bar(150.0, 4), "[####]");
        assert_eq!(progress_bar(-3.0, 2), "[--]");
    }
}
