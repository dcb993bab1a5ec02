pub mod config;
pub mod history;
pub mod metronome;
pub mod pomodoro;
