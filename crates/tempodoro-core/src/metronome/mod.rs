mod engine;

pub use engine::{
    MetronomeEngine, DEFAULT_BEATS_PER_MEASURE, DEFAULT_BPM, MAX_BPM, MIN_BPM, SUPPORTED_METERS,
};
