//! Repeating-timer scheduler.
//!
//! Engines never own a timer. The controller asks a [`Scheduler`] for a
//! repeating timer per engine, cancels it whenever the engine's governing
//! parameters change, and drains due firings one at a time so a firing
//! can cancel or re-create timers before the next one is handed out.
//!
//! Time is a monotonic offset supplied by the caller: tests advance it by
//! hand, the CLI feeds it from `std::time::Instant`.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Opaque handle returned by [`Scheduler::schedule_repeating`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TimerHandle(u64);

/// Which engine a timer drives.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TickSource {
    Metronome,
    Pomodoro,
}

/// One timer firing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Firing {
    pub handle: TimerHandle,
    pub source: TickSource,
    /// Scheduler time at which the timer was due.
    pub at: Duration,
}

pub trait Scheduler {
    /// Current scheduler time.
    fn now(&self) -> Duration;

    /// Register a timer that first fires one `interval` from now and then
    /// every `interval` after that.
    fn schedule_repeating(&mut self, interval: Duration, source: TickSource) -> TimerHandle;

    /// Cancel a timer. Returns false if the handle was not live.
    fn cancel(&mut self, handle: TimerHandle) -> bool;

    /// Hand out the earliest firing due at or before `until`, moving the
    /// clock to its due time. When nothing is due the clock moves to
    /// `until` and `None` is returned.
    fn pop_due(&mut self, until: Duration) -> Option<Firing>;

    /// Time of the next firing, if any timer is live.
    fn next_due(&self) -> Option<Duration>;
}

/// Smallest interval a timer may have; shorter requests are raised to it.
pub const MIN_INTERVAL: Duration = Duration::from_millis(1);

#[derive(Debug, Clone)]
struct Repeating {
    handle: TimerHandle,
    source: TickSource,
    interval: Duration,
    next_due: Duration,
}

/// In-process scheduler driven by an external clock.
#[derive(Debug, Default, Clone)]
pub struct IntervalScheduler {
    now: Duration,
    next_id: u64,
    timers: Vec<Repeating>,
}

impl IntervalScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of live timers.
    pub fn live(&self) -> usize {
        self.timers.len()
    }

    /// Live timers for one source.
    pub fn live_for(&self, source: TickSource) -> usize {
        self.timers.iter().filter(|t| t.source == source).count()
    }

    pub fn interval_of(&self, handle: TimerHandle) -> Option<Duration> {
        self.timers
            .iter()
            .find(|t| t.handle == handle)
            .map(|t| t.interval)
    }
}

impl Scheduler for IntervalScheduler {
    fn now(&self) -> Duration {
        self.now
    }

    fn schedule_repeating(&mut self, interval: Duration, source: TickSource) -> TimerHandle {
        let interval = interval.max(MIN_INTERVAL);
        self.next_id += 1;
        let handle = TimerHandle(self.next_id);
        self.timers.push(Repeating {
            handle,
            source,
            interval,
            next_due: self.now + interval,
        });
        tracing::debug!(?handle, ?source, ?interval, "timer scheduled");
        handle
    }

    fn cancel(&mut self, handle: TimerHandle) -> bool {
        let before = self.timers.len();
        self.timers.retain(|t| t.handle != handle);
        let removed = self.timers.len() != before;
        if removed {
            tracing::debug!(?handle, "timer cancelled");
        }
        removed
    }

    fn pop_due(&mut self, until: Duration) -> Option<Firing> {
        // Earliest due first; ties go to the older timer.
        let timer = self
            .timers
            .iter_mut()
            .filter(|t| t.next_due <= until)
            .min_by_key(|t| (t.next_due, t.handle));

        match timer {
            Some(timer) => {
                let firing = Firing {
                    handle: timer.handle,
                    source: timer.source,
                    at: timer.next_due,
                };
                timer.next_due += timer.interval;
                self.now = self.now.max(firing.at);
                Some(firing)
            }
            None => {
                self.now = self.now.max(until);
                None
            }
        }
    }

    fn next_due(&self) -> Option<Duration> {
        self.timers.iter().map(|t| t.next_due).min()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ms(n: u64) -> Duration {
        Duration::from_millis(n)
    }

    fn drain(s: &mut IntervalScheduler, until: Duration) -> Vec<Firing> {
        std::iter::from_fn(|| s.pop_due(until)).collect()
    }

    #[test]
    fn repeating_timer_fires_every_interval() {
        let mut s = IntervalScheduler::new();
        let h = s.schedule_repeating(ms(250), TickSource::Metronome);
        let fired = drain(&mut s, ms(1000));
        assert_eq!(fired.len(), 4);
        assert!(fired.iter().all(|f| f.handle == h));
        assert_eq!(fired[0].at, ms(250));
        assert_eq!(fired[3].at, ms(1000));
        assert_eq!(s.now(), ms(1000));
    }

    #[test]
    fn firings_interleave_in_time_order() {
        let mut s = IntervalScheduler::new();
        s.schedule_repeating(ms(400), TickSource::Metronome);
        s.schedule_repeating(ms(1000), TickSource::Pomodoro);
        let sources: Vec<_> = drain(&mut s, ms(1200)).iter().map(|f| f.source).collect();
        assert_eq!(
            sources,
            vec![
                TickSource::Metronome,
                TickSource::Metronome,
                TickSource::Pomodoro,
                TickSource::Metronome,
            ]
        );
    }

    #[test]
    fn cancelled_timer_never_fires() {
        let mut s = IntervalScheduler::new();
        let h = s.schedule_repeating(ms(100), TickSource::Pomodoro);
        assert!(s.cancel(h));
        assert!(!s.cancel(h));
        assert!(drain(&mut s, ms(1000)).is_empty());
        assert_eq!(s.live(), 0);
        assert_eq!(s.next_due(), None);
    }

    #[test]
    fn new_timer_counts_from_current_time() {
        let mut s = IntervalScheduler::new();
        assert!(s.pop_due(ms(700)).is_none());
        s.schedule_repeating(ms(500), TickSource::Metronome);
        assert_eq!(s.next_due(), Some(ms(1200)));
    }

    #[test]
    fn zero_interval_is_raised() {
        let mut s = IntervalScheduler::new();
        let h = s.schedule_repeating(Duration::ZERO, TickSource::Metronome);
        assert_eq!(s.interval_of(h), Some(MIN_INTERVAL));
        assert_eq!(drain(&mut s, ms(5)).len(), 5);
    }
}
