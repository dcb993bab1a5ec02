//! The controller ties both engines to a scheduler, a tone emitter and the
//! session log.
//!
//! All user input goes through its methods. After every mutation it
//! re-checks each engine's governing parameters and cancels or re-creates
//! that engine's repeating timer, so there is at most one live timer per
//! engine and a tempo change takes effect on the next beat.

use std::time::Duration;

use chrono::{DateTime, Utc};

use crate::error::ValidationError;
use crate::events::Event;
use crate::metronome::MetronomeEngine;
use crate::scheduler::{Firing, Scheduler, TickSource, TimerHandle};
use crate::storage::{KeyValueStore, SessionLog, SessionRecord};
use crate::timer::PomodoroEngine;
use crate::tone::{click_for, ToneEmitter, PHASE_CHIME};

/// Pomodoro countdown resolution.
pub const POMODORO_TICK: Duration = Duration::from_secs(1);

pub struct Controller<S, T, K>
where
    S: Scheduler,
    T: ToneEmitter,
    K: KeyValueStore,
{
    metronome: MetronomeEngine,
    pomodoro: PomodoroEngine,
    scheduler: S,
    tones: T,
    log: SessionLog<K>,
    volume: u32,
    /// Live metronome timer and the (bpm, meter) it was created for.
    metronome_timer: Option<(TimerHandle, (u32, u32))>,
    pomodoro_timer: Option<TimerHandle>,
}

impl<S, T, K> Controller<S, T, K>
where
    S: Scheduler,
    T: ToneEmitter,
    K: KeyValueStore,
{
    pub fn new(
        metronome: MetronomeEngine,
        pomodoro: PomodoroEngine,
        scheduler: S,
        tones: T,
        store: K,
    ) -> Self {
        let mut controller = Self {
            metronome,
            pomodoro,
            scheduler,
            tones,
            log: SessionLog::new(store),
            volume: 100,
            metronome_timer: None,
            pomodoro_timer: None,
        };
        controller.sync_timers();
        controller
    }

    /// Scale every emitted tone by this volume percentage.
    pub fn with_volume(mut self, volume_pct: u32) -> Self {
        self.volume = volume_pct.min(100);
        self
    }

    // ── Queries ──────────────────────────────────────────────────────

    pub fn metronome(&self) -> &MetronomeEngine {
        &self.metronome
    }

    pub fn pomodoro(&self) -> &PomodoroEngine {
        &self.pomodoro
    }

    pub fn log(&self) -> &SessionLog<K> {
        &self.log
    }

    pub fn log_mut(&mut self) -> &mut SessionLog<K> {
        &mut self.log
    }

    pub fn scheduler(&self) -> &S {
        &self.scheduler
    }

    pub fn tones(&self) -> &T {
        &self.tones
    }

    pub fn tones_mut(&mut self) -> &mut T {
        &mut self.tones
    }

    pub fn now(&self) -> Duration {
        self.scheduler.now()
    }

    /// When the next timer fires, if either engine is running.
    pub fn next_due(&self) -> Option<Duration> {
        self.scheduler.next_due()
    }

    pub fn into_parts(self) -> (MetronomeEngine, PomodoroEngine, K) {
        (self.metronome, self.pomodoro, self.log.into_store())
    }

    // ── Metronome ────────────────────────────────────────────────────

    pub fn set_bpm(&mut self, bpm: u32) -> u32 {
        let applied = self.metronome.set_bpm(bpm);
        self.sync_timers();
        applied
    }

    pub fn adjust_bpm(&mut self, delta: i32) -> u32 {
        let applied = self.metronome.adjust_bpm(delta);
        self.sync_timers();
        applied
    }

    pub fn set_beats_per_measure(&mut self, beats: u32) -> Result<(), ValidationError> {
        self.metronome.set_beats_per_measure(beats)?;
        self.sync_timers();
        Ok(())
    }

    pub fn start_metronome(&mut self) -> Option<Event> {
        let event = self.metronome.start();
        self.sync_timers();
        event
    }

    pub fn stop_metronome(&mut self) -> Option<Event> {
        let event = self.metronome.stop();
        self.sync_timers();
        event
    }

    pub fn toggle_metronome(&mut self) -> Option<Event> {
        let event = self.metronome.toggle();
        self.sync_timers();
        event
    }

    // ── Pomodoro ─────────────────────────────────────────────────────

    pub fn toggle_pomodoro(&mut self) -> Event {
        let event = self.pomodoro.toggle();
        self.sync_timers();
        event
    }

    /// Rewind the Pomodoro to a fresh work phase. The metronome stops too.
    pub fn reset_pomodoro(&mut self) -> Vec<Event> {
        let mut events = vec![self.pomodoro.reset()];
        events.extend(self.metronome.stop());
        self.sync_timers();
        events
    }

    /// Stop both engines without touching either clock, e.g. while the
    /// user edits settings.
    pub fn pause_all(&mut self) -> Vec<Event> {
        let mut events = Vec::new();
        if self.pomodoro.is_running() {
            events.push(self.pomodoro.toggle());
        }
        events.extend(self.metronome.stop());
        self.sync_timers();
        events
    }

    pub fn set_work_minutes(&mut self, minutes: u32) -> u32 {
        let applied = self.pomodoro.set_work_minutes(minutes);
        self.sync_timers();
        applied
    }

    pub fn set_break_minutes(&mut self, minutes: u32) -> u32 {
        self.pomodoro.set_break_minutes(minutes)
    }

    pub fn set_long_break_minutes(&mut self, minutes: u32) -> u32 {
        self.pomodoro.set_long_break_minutes(minutes)
    }

    pub fn set_sessions_before_long_break(&mut self, sessions: u32) -> u32 {
        self.pomodoro.set_sessions_before_long_break(sessions)
    }

    /// Save the current statistics to the session log. Does nothing when no
    /// cycle has been completed yet. On success the Pomodoro is reset and
    /// the metronome stopped.
    pub fn save_session(&mut self, now: DateTime<Utc>) -> Option<(SessionRecord, Event)> {
        let record = self.log.save(&mut self.pomodoro, now)?;
        self.metronome.stop();
        self.sync_timers();
        let event = Event::SessionSaved {
            id: record.id.clone(),
            completed_cycles: record.completed_cycles,
            total_work_minutes: record.total_work_time,
            at: Utc::now(),
        };
        Some((record, event))
    }

    // ── Time ─────────────────────────────────────────────────────────

    /// Fire every timer due up to `now` in time order and return what
    /// happened.
    pub fn advance_to(&mut self, now: Duration) -> Vec<Event> {
        let mut events = Vec::new();
        while let Some(firing) = self.scheduler.pop_due(now) {
            events.extend(self.dispatch(firing));
            self.sync_timers();
        }
        events
    }

    /// Advance by a relative amount of time.
    pub fn advance_by(&mut self, elapsed: Duration) -> Vec<Event> {
        let target = self.scheduler.now() + elapsed;
        self.advance_to(target)
    }

    fn dispatch(&mut self, firing: Firing) -> Option<Event> {
        match firing.source {
            TickSource::Metronome => {
                if self.metronome_timer.map(|(h, _)| h) != Some(firing.handle) {
                    return None;
                }
                let event = self.metronome.tick()?;
                if let Event::Beat { index, .. } = event {
                    self.tones.emit(click_for(index).with_volume(self.volume));
                }
                Some(event)
            }
            TickSource::Pomodoro => {
                if self.pomodoro_timer != Some(firing.handle) {
                    return None;
                }
                let event = self.pomodoro.tick()?;
                let volume = self.volume;
                let chime = PHASE_CHIME.map(|t| t.with_volume(volume));
                self.tones.emit_cue(&chime);
                if let Event::PhaseCompleted { from, to, completed_cycles, .. } = &event {
                    tracing::info!(%from, %to, completed_cycles, "phase completed");
                }
                Some(event)
            }
        }
    }

    /// Make the live timers match the engines' governing parameters.
    fn sync_timers(&mut self) {
        let wanted = self.metronome.timer_key();
        if self.metronome_timer.map(|(_, key)| key) != wanted {
            if let Some((handle, _)) = self.metronome_timer.take() {
                self.scheduler.cancel(handle);
            }
            if let Some(key) = wanted {
                let handle = self
                    .scheduler
                    .schedule_repeating(self.metronome.interval(), TickSource::Metronome);
                self.metronome_timer = Some((handle, key));
            }
        }

        let wanted = self.pomodoro.needs_timer();
        if self.pomodoro_timer.is_some() != wanted {
            if let Some(handle) = self.pomodoro_timer.take() {
                self.scheduler.cancel(handle);
            }
            if wanted {
                self.pomodoro_timer = Some(
                    self.scheduler
                        .schedule_repeating(POMODORO_TICK, TickSource::Pomodoro),
                );
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scheduler::IntervalScheduler;
    use crate::storage::MemoryStore;
    use crate::timer::{Phase, PomodoroSettings};
    use crate::tone::{RecordingEmitter, ACCENT_CLICK, BEAT_CLICK};

    type TestController = Controller<IntervalScheduler, RecordingEmitter, MemoryStore>;

    fn controller(settings: PomodoroSettings) -> TestController {
        Controller::new(
            MetronomeEngine::new(),
            PomodoroEngine::new(settings),
            IntervalScheduler::new(),
            RecordingEmitter::new(),
            MemoryStore::new(),
        )
    }

    fn secs(n: u64) -> Duration {
        Duration::from_secs(n)
    }

    #[test]
    fn no_timers_while_idle() {
        let c = controller(PomodoroSettings::default());
        assert_eq!(c.scheduler().live(), 0);
        assert_eq!(c.next_due(), None);
    }

    #[test]
    fn metronome_beats_at_tempo_and_clicks() {
        let mut c = controller(PomodoroSettings::default());
        c.start_metronome();
        let events = c.advance_by(secs(2));
        // 120 bpm -> a beat every 500 ms.
        assert_eq!(events.len(), 4);
        assert_eq!(c.metronome().current_beat(), 0);
        let tones = &c.tones().tones;
        assert_eq!(tones.len(), 4);
        assert_eq!(tones[0], BEAT_CLICK);
        assert_eq!(tones[3], ACCENT_CLICK);
    }

    #[test]
    fn tempo_change_recreates_the_timer() {
        let mut c = controller(PomodoroSettings::default());
        c.start_metronome();
        c.advance_by(Duration::from_millis(500));
        c.set_bpm(60);
        assert_eq!(c.scheduler().live_for(TickSource::Metronome), 1);
        assert_eq!(c.next_due(), Some(secs(1) + Duration::from_millis(500)));
        assert!(c.advance_by(Duration::from_millis(900)).is_empty());
        assert_eq!(c.advance_by(Duration::from_millis(100)).len(), 1);
    }

    #[test]
    fn stopping_cancels_the_timer_and_rewinds() {
        let mut c = controller(PomodoroSettings::default());
        c.start_metronome();
        c.advance_by(Duration::from_millis(1000));
        assert_eq!(c.metronome().current_beat(), 2);
        c.stop_metronome();
        assert_eq!(c.metronome().current_beat(), 0);
        assert_eq!(c.scheduler().live(), 0);
        assert!(c.advance_by(secs(5)).is_empty());
    }

    #[test]
    fn pomodoro_counts_down_and_chimes_on_transition() {
        let mut c = controller(PomodoroSettings::new(1, 1, 1, 2));
        c.toggle_pomodoro();
        let events = c.advance_by(secs(59));
        assert!(events.is_empty());
        assert_eq!(c.pomodoro().time_left_secs(), 1);

        let events = c.advance_by(secs(1));
        assert!(matches!(
            events.as_slice(),
            [Event::PhaseCompleted { from: Phase::Work, to: Phase::Break, .. }]
        ));
        assert_eq!(c.tones().tones.len(), 2);
        assert!(!c.pomodoro().is_running());
        assert_eq!(c.scheduler().live_for(TickSource::Pomodoro), 0);
        // Nothing more happens without a restart.
        assert!(c.advance_by(secs(120)).is_empty());
    }

    #[test]
    fn engines_run_independently() {
        let mut c = controller(PomodoroSettings::new(1, 1, 1, 2));
        c.toggle_pomodoro();
        c.start_metronome();
        let events = c.advance_by(secs(3));
        let beats = events.iter().filter(|e| matches!(e, Event::Beat { .. })).count();
        assert_eq!(beats, 6);
        assert_eq!(c.pomodoro().time_left_secs(), 57);

        c.toggle_metronome();
        c.advance_by(secs(3));
        assert_eq!(c.pomodoro().time_left_secs(), 54);
    }

    #[test]
    fn pause_resume_restarts_the_second() {
        let mut c = controller(PomodoroSettings::default());
        c.toggle_pomodoro();
        c.advance_by(Duration::from_millis(1500));
        assert_eq!(c.pomodoro().time_left_secs(), 1499);
        c.toggle_pomodoro();
        c.advance_by(secs(10));
        assert_eq!(c.pomodoro().time_left_secs(), 1499);
        c.toggle_pomodoro();
        c.advance_by(Duration::from_millis(999));
        assert_eq!(c.pomodoro().time_left_secs(), 1499);
        c.advance_by(Duration::from_millis(1));
        assert_eq!(c.pomodoro().time_left_secs(), 1498);
    }

    #[test]
    fn reset_also_stops_the_metronome() {
        let mut c = controller(PomodoroSettings::default());
        c.toggle_pomodoro();
        c.start_metronome();
        c.advance_by(secs(2));
        let events = c.reset_pomodoro();
        assert_eq!(events.len(), 2);
        assert!(!c.metronome().is_running());
        assert_eq!(c.pomodoro().time_left_secs(), 1500);
        assert_eq!(c.scheduler().live(), 0);
    }

    #[test]
    fn save_session_snapshots_and_resets() {
        let mut c = controller(PomodoroSettings::new(1, 1, 1, 2));
        assert!(c.save_session(Utc::now()).is_none());

        c.toggle_pomodoro();
        c.advance_by(secs(60));
        c.start_metronome();
        let (record, event) = c.save_session(Utc::now()).unwrap();
        assert_eq!(record.completed_cycles, 1);
        assert_eq!(record.total_work_time, 1);
        assert!(matches!(event, Event::SessionSaved { completed_cycles: 1, .. }));
        assert_eq!(c.pomodoro().completed_cycles(), 0);
        assert_eq!(c.pomodoro().phase(), Phase::Work);
        assert!(!c.metronome().is_running());
        assert_eq!(c.log().len(), 1);
    }

    #[test]
    fn volume_scales_clicks() {
        let mut c = controller(PomodoroSettings::default()).with_volume(50);
        c.start_metronome();
        c.advance_by(Duration::from_millis(500));
        let tone = c.tones().tones[0];
        assert!((tone.gain - BEAT_CLICK.gain / 2.0).abs() < 1e-6);
    }
}
