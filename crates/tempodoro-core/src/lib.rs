//! # Tempodoro Core Library
//!
//! Business logic for Tempodoro, a metronome and Pomodoro focus timer with
//! a saved-session history. The CLI is a thin front end over this crate.
//!
//! ## Architecture
//!
//! - **Engines**: [`MetronomeEngine`] and [`PomodoroEngine`] are plain state
//!   machines advanced by `tick()`; neither owns a thread or a timer
//! - **Scheduler**: repeating timers behind the [`Scheduler`] trait, driven
//!   by a caller-supplied clock
//! - **Controller**: [`Controller`] owns both engines and keeps exactly one
//!   live timer per running engine
//! - **Storage**: a key-value capability ([`KeyValueStore`]) backed by SQLite,
//!   the JSON [`SessionLog`], and TOML [`Config`]
//! - **Tones**: the [`ToneEmitter`] capability; the engines only say which
//!   tone to play

pub mod controller;
pub mod error;
pub mod events;
pub mod metronome;
pub mod scheduler;
pub mod storage;
pub mod timer;
pub mod tone;

pub use controller::Controller;
pub use error::{ConfigError, CoreError, DatabaseError, ValidationError};
pub use events::Event;
pub use metronome::MetronomeEngine;
pub use scheduler::{IntervalScheduler, Scheduler, TickSource, TimerHandle};
pub use storage::{
    Config, Database, HistoryFilter, HistorySummary, KeyValueStore, MemoryStore, SessionLog,
    SessionRecord,
};
pub use timer::{Phase, PomodoroEngine, PomodoroSettings};
pub use tone::{RecordingEmitter, SilentEmitter, Tone, ToneEmitter};
