mod engine;
mod settings;

pub use engine::PomodoroEngine;
pub use settings::{
    Phase, PomodoroSettings, BREAK_MINUTES_RANGE, LONG_BREAK_MINUTES_RANGE,
    SESSIONS_BEFORE_LONG_BREAK_RANGE, WORK_MINUTES_RANGE,
};
