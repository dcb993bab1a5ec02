use std::io::Write;

use chrono::Utc;
use clap::{Subcommand, ValueEnum};
use tempodoro_core::{Config, Database, Event, PomodoroEngine};

use crate::format::{cycle_marks, progress_bar};
use crate::runtime::{self, CliController};

const ENGINE_KEY: &str = "pomodoro_engine";

#[derive(Clone, Copy, ValueEnum)]
pub enum Setting {
    /// Work phase length in minutes (1-60)
    Work,
    /// Short break length in minutes (1-30)
    Break,
    /// Long break length in minutes (1-60)
    LongBreak,
    /// Work sessions before a long break (2-10)
    Sessions,
}

#[derive(Subcommand)]
pub enum PomodoroAction {
    /// Print current timer state as JSON
    Status,
    /// Start the current phase and count it down in the foreground
    Run {
        /// Run the metronome alongside the timer
        #[arg(long)]
        metronome: bool,
        /// Do not make any sound
        #[arg(long)]
        silent: bool,
    },
    /// Rewind to a fresh work phase (statistics are kept)
    Reset,
    /// Change a duration or the long-break cadence
    Set {
        setting: Setting,
        value: u32,
    },
    /// Save completed cycles to the history and start over
    Save,
}

/// Restore the saved engine, paused, with the configured durations.
fn load_engine(db: &Database, config: &Config) -> PomodoroEngine {
    if let Ok(Some(json)) = db.kv_get(ENGINE_KEY) {
        match serde_json::from_str::<PomodoroEngine>(&json) {
            Ok(mut engine) => {
                engine.halt();
                engine.apply_settings(config.pomodoro_settings());
                return engine;
            }
            Err(e) => tracing::warn!(error = %e, "discarding unreadable timer state"),
        }
    }
    config.pomodoro_engine()
}

/// Persist the engine as paused; a later invocation resumes explicitly.
fn save_engine(db: &Database, engine: &PomodoroEngine) -> Result<(), Box<dyn std::error::Error>> {
    let mut paused = engine.clone();
    paused.halt();
    db.kv_set(ENGINE_KEY, &serde_json::to_string(&paused)?)?;
    Ok(())
}

fn print_json(event: &Event) -> Result<(), Box<dyn std::error::Error>> {
    println!("{}", serde_json::to_string_pretty(event)?);
    Ok(())
}

fn draw(controller: &CliController) {
    let engine = controller.pomodoro();
    let mut out = std::io::stdout();
    let _ = write!(
        out,
        "\r{} {:<11} {} session {} {}",
        engine.display(),
        engine.phase().label(),
        progress_bar(engine.progress_pct(), 20),
        engine.session_number(),
        cycle_marks(engine.cycle_dots(), engine.settings().sessions_before_long_break),
    );
    let _ = out.flush();
}

pub fn run(action: PomodoroAction) -> Result<(), Box<dyn std::error::Error>> {
    let mut config = Config::load_or_default();
    let db = Database::open()?;
    let engine = load_engine(&db, &config);

    let silent = matches!(action, PomodoroAction::Run { silent: true, .. });
    let tones = runtime::tone_emitter(&config, silent);
    let mut controller =
        runtime::controller(db, &config, config.metronome_engine(), engine, tones);

    match action {
        PomodoroAction::Status => {
            print_json(&controller.pomodoro().snapshot())?;
        }
        PomodoroAction::Run { metronome, .. } => {
            let started = controller.toggle_pomodoro();
            tracing::info!(phase = %controller.pomodoro().phase(), "phase started");
            if let Ok(line) = serde_json::to_string(&started) {
                println!("{line}");
            }
            if metronome {
                controller.start_metronome();
            }
            draw(&controller);

            let mut completed = None;
            let mut write_failed = false;
            runtime::run(&mut controller, |c, events| {
                if let Err(e) = save_engine(c.log().store(), c.pomodoro()) {
                    if !write_failed {
                        tracing::warn!(error = %e, "cannot persist timer state");
                        write_failed = true;
                    }
                }
                draw(c);
                match events
                    .iter()
                    .find(|e| matches!(e, Event::PhaseCompleted { .. }))
                {
                    Some(event) => {
                        completed = Some(event.clone());
                        false
                    }
                    None => true,
                }
            });
            println!();
            controller.stop_metronome();

            if let Some(event) = completed {
                print_json(&event)?;
            }
        }
        PomodoroAction::Reset => {
            for event in controller.reset_pomodoro() {
                if matches!(event, Event::PomodoroReset { .. }) {
                    print_json(&event)?;
                }
            }
        }
        PomodoroAction::Set { setting, value } => {
            let applied = match setting {
                Setting::Work => controller.set_work_minutes(value),
                Setting::Break => controller.set_break_minutes(value),
                Setting::LongBreak => controller.set_long_break_minutes(value),
                Setting::Sessions => controller.set_sessions_before_long_break(value),
            };
            if applied != value {
                eprintln!("clamped to {applied}");
            }
            let settings = *controller.pomodoro().settings();
            config.pomodoro.work_minutes = settings.work_minutes;
            config.pomodoro.break_minutes = settings.break_minutes;
            config.pomodoro.long_break_minutes = settings.long_break_minutes;
            config.pomodoro.sessions_before_long_break = settings.sessions_before_long_break;
            config.save()?;
            print_json(&controller.pomodoro().snapshot())?;
        }
        PomodoroAction::Save => match controller.save_session(Utc::now()) {
            Some((record, _)) => {
                println!("{}", serde_json::to_string_pretty(&record)?);
            }
            None => {
                eprintln!("nothing to save: complete a work phase first");
            }
        },
    }

    save_engine(controller.log().store(), controller.pomodoro())?;
    Ok(())
}
