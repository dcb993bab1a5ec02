//! Real-time driver for the controller.
//!
//! The core never sleeps. This loop sleeps until the scheduler's next due
//! time, feeds it the elapsed wall time, and hands every event to the
//! caller until the caller says stop or no timer is left.

use std::io::Write;
use std::time::Instant;

use tempodoro_core::tone::{Tone, ToneEmitter};
use tempodoro_core::{
    Config, Controller, Database, Event, IntervalScheduler, MetronomeEngine, PomodoroEngine,
    SilentEmitter,
};

pub type CliController = Controller<IntervalScheduler, Box<dyn ToneEmitter>, Database>;

/// Rings the terminal bell once per tone.
pub struct BellEmitter;

impl ToneEmitter for BellEmitter {
    fn emit(&mut self, _tone: Tone) {
        let mut err = std::io::stderr();
        let _ = err.write_all(b"\x07");
        let _ = err.flush();
    }

    fn emit_cue(&mut self, cue: &[Tone]) {
        // One ring per cue; back-to-back bells merge into one anyway.
        if let Some(first) = cue.first() {
            self.emit(*first);
        }
    }
}

/// Pick a tone emitter from the config and the `--silent` flag.
pub fn tone_emitter(config: &Config, silent: bool) -> Box<dyn ToneEmitter> {
    if silent || !config.sound.enabled {
        return Box::new(SilentEmitter);
    }
    #[cfg(feature = "audio")]
    {
        match tempodoro_core::tone::AudioEmitter::open() {
            Ok(audio) => return Box::new(audio),
            Err(e) => tracing::warn!(error = %e, "falling back to terminal bell"),
        }
    }
    Box::new(BellEmitter)
}

pub fn controller(
    db: Database,
    config: &Config,
    metronome: MetronomeEngine,
    pomodoro: PomodoroEngine,
    tones: Box<dyn ToneEmitter>,
) -> CliController {
    Controller::new(metronome, pomodoro, IntervalScheduler::new(), tones, db)
        .with_volume(config.sound.volume)
}

/// Drive `controller` in real time.
///
/// `on_advance` sees the events of every wake-up (often none: a Pomodoro
/// second that did not end the phase) and returns `false` to end the loop.
/// The loop also ends once no timer is live.
pub fn run<F>(controller: &mut CliController, mut on_advance: F)
where
    F: FnMut(&CliController, &[Event]) -> bool,
{
    let origin = Instant::now();
    let offset = controller.now();

    while let Some(due) = controller.next_due() {
        let elapsed = offset + origin.elapsed();
        if due > elapsed {
            std::thread::sleep(due - elapsed);
        }
        let events = controller.advance_to(offset + origin.elapsed());
        for event in events.iter().filter(|e| e.is_notable()) {
            tracing::debug!(?event, "event");
        }
        if !on_advance(controller, &events) {
            return;
        }
    }
}
