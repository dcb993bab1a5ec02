//! Saved Pomodoro sessions.
//!
//! The whole history is one JSON array under [`SESSIONS_KEY`]. Every write
//! replaces the array wholesale; the in-memory list is a cache that is
//! refreshed by [`SessionLog::load`] and updated alongside each write.
//!
//! Reads never fail: a missing key, unreadable store or malformed JSON all
//! come back as an empty history. Writes that the store rejects leave the
//! cache untouched, so the log never claims something the store lacks.

use std::str::FromStr;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use super::kv::KeyValueStore;
use crate::error::ValidationError;
use crate::timer::PomodoroEngine;

/// Storage key holding the session array.
pub const SESSIONS_KEY: &str = "pomodoroSessions";

/// One saved session. Never modified after creation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionRecord {
    /// Creation time in epoch milliseconds, as a decimal string.
    pub id: String,
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub date: DateTime<Utc>,
    /// Work phase length in minutes.
    pub work_duration: u32,
    pub break_duration: u32,
    pub long_break_duration: u32,
    pub sessions_before_long_break: u32,
    pub completed_cycles: u32,
    /// Minutes spent in finished work phases.
    pub total_work_time: u32,
}

impl SessionRecord {
    /// Snapshot an engine's statistics and settings.
    pub fn from_engine(engine: &PomodoroEngine, at: DateTime<Utc>) -> Self {
        let settings = engine.settings();
        Self {
            id: at.timestamp_millis().to_string(),
            date: at,
            work_duration: settings.work_minutes,
            break_duration: settings.break_minutes,
            long_break_duration: settings.long_break_minutes,
            sessions_before_long_break: settings.sessions_before_long_break,
            completed_cycles: engine.completed_cycles(),
            total_work_time: engine.total_work_minutes(),
        }
    }
}

/// Recency filter for listings.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HistoryFilter {
    #[default]
    All,
    /// Saved within the last 24 hours.
    Today,
    /// Saved within the last 7 days.
    Week,
}

impl HistoryFilter {
    fn window(self) -> Option<Duration> {
        match self {
            HistoryFilter::All => None,
            HistoryFilter::Today => Some(Duration::hours(24)),
            HistoryFilter::Week => Some(Duration::days(7)),
        }
    }

    pub fn matches(self, record: &SessionRecord, now: DateTime<Utc>) -> bool {
        match self.window() {
            None => true,
            Some(window) => record.date >= now - window,
        }
    }
}

impl FromStr for HistoryFilter {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "all" => Ok(HistoryFilter::All),
            "today" => Ok(HistoryFilter::Today),
            "week" | "thisweek" | "this-week" => Ok(HistoryFilter::Week),
            _ => Err(ValidationError::UnknownFilter(s.to_string())),
        }
    }
}

/// Totals over a filtered listing.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistorySummary {
    pub sessions: usize,
    pub cycles: u32,
    pub work_minutes: u32,
    /// Average work minutes per session, rounded.
    pub average_minutes: u32,
}

/// Session history over a key-value store.
pub struct SessionLog<S: KeyValueStore> {
    store: S,
    /// Sorted by date, newest first.
    sessions: Vec<SessionRecord>,
}

impl<S: KeyValueStore> SessionLog<S> {
    /// Wrap a store and load whatever history it holds.
    pub fn new(store: S) -> Self {
        let mut log = Self {
            store,
            sessions: Vec::new(),
        };
        log.load();
        log
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn store_mut(&mut self) -> &mut S {
        &mut self.store
    }

    pub fn into_store(self) -> S {
        self.store
    }

    /// Refresh the cache from the store.
    pub fn load(&mut self) {
        self.sessions = match self.store.get(SESSIONS_KEY) {
            Ok(Some(json)) => match serde_json::from_str::<Vec<SessionRecord>>(&json) {
                Ok(sessions) => sessions,
                Err(e) => {
                    tracing::warn!(error = %e, "session history is malformed; treating as empty");
                    Vec::new()
                }
            },
            Ok(None) => Vec::new(),
            Err(e) => {
                tracing::warn!(error = %e, "cannot read session history; treating as empty");
                Vec::new()
            }
        };
        sort_newest_first(&mut self.sessions);
    }

    /// Every record, newest first.
    pub fn records(&self) -> &[SessionRecord] {
        &self.sessions
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }

    pub fn get(&self, id: &str) -> Option<&SessionRecord> {
        self.sessions.iter().find(|s| s.id == id)
    }

    /// Records matching `filter` relative to `now`, newest first.
    pub fn list(&self, filter: HistoryFilter, now: DateTime<Utc>) -> Vec<&SessionRecord> {
        self.sessions
            .iter()
            .filter(|s| filter.matches(s, now))
            .collect()
    }

    pub fn summary(&self, filter: HistoryFilter, now: DateTime<Utc>) -> HistorySummary {
        let listed = self.list(filter, now);
        let sessions = listed.len();
        let cycles = listed.iter().map(|s| s.completed_cycles).sum();
        let work_minutes: u32 = listed.iter().map(|s| s.total_work_time).sum();
        let average_minutes = if sessions == 0 {
            0
        } else {
            (f64::from(work_minutes) / sessions as f64).round() as u32
        };
        HistorySummary {
            sessions,
            cycles,
            work_minutes,
            average_minutes,
        }
    }

    /// Snapshot the engine into a new record, then clear its statistics and
    /// rewind it to a fresh work phase.
    ///
    /// Does nothing (and returns `None`) when no cycle has been completed or
    /// the store refuses the write; the engine is only reset once the
    /// record is safely stored.
    pub fn save(&mut self, engine: &mut PomodoroEngine, now: DateTime<Utc>) -> Option<SessionRecord> {
        if engine.completed_cycles() == 0 {
            return None;
        }
        let record = self.append(SessionRecord::from_engine(engine, now))?;
        engine.clear_stats();
        engine.reset();
        tracing::info!(
            id = %record.id,
            cycles = record.completed_cycles,
            minutes = record.total_work_time,
            "session saved"
        );
        Some(record)
    }

    /// Add a record, bumping its id until it is unique.
    pub fn append(&mut self, mut record: SessionRecord) -> Option<SessionRecord> {
        while self.get(&record.id).is_some() {
            record.id = match record.id.parse::<i64>() {
                Ok(ms) => (ms + 1).to_string(),
                Err(_) => format!("{}-1", record.id),
            };
        }

        let mut next = self.sessions.clone();
        next.push(record.clone());
        sort_newest_first(&mut next);
        self.commit(next).then_some(record)
    }

    /// Remove one record. Returns false when the id is unknown or the store
    /// refused the write.
    pub fn delete(&mut self, id: &str) -> bool {
        if self.get(id).is_none() {
            return false;
        }
        let next: Vec<SessionRecord> = self
            .sessions
            .iter()
            .filter(|s| s.id != id)
            .cloned()
            .collect();
        self.commit(next)
    }

    /// Drop the whole history, removing the storage key.
    pub fn clear_all(&mut self) -> bool {
        match self.store.remove(SESSIONS_KEY) {
            Ok(()) => {
                self.sessions.clear();
                true
            }
            Err(e) => {
                tracing::warn!(error = %e, "cannot clear session history");
                false
            }
        }
    }

    fn commit(&mut self, next: Vec<SessionRecord>) -> bool {
        let json = match serde_json::to_string(&next) {
            Ok(json) => json,
            Err(e) => {
                tracing::warn!(error = %e, "cannot encode session history");
                return false;
            }
        };
        match self.store.set(SESSIONS_KEY, &json) {
            Ok(()) => {
                self.sessions = next;
                true
            }
            Err(e) => {
                tracing::warn!(error = %e, "cannot write session history");
                false
            }
        }
    }
}

fn sort_newest_first(sessions: &mut [SessionRecord]) {
    sessions.sort_by(|a, b| b.date.cmp(&a.date));
}
