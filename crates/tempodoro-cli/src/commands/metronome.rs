use std::io::Write;

use clap::Subcommand;
use tempodoro_core::{Config, Database, Event, PomodoroEngine};

use crate::format::beat_dots;
use crate::runtime;

#[derive(Subcommand)]
pub enum MetronomeAction {
    /// Run the metronome in the foreground
    Run {
        /// Tempo, clamped to 30-300 (default from config)
        #[arg(long)]
        bpm: Option<u32>,
        /// Beats per measure: 2, 3, 4 or 6 (default from config)
        #[arg(long)]
        beats: Option<u32>,
        /// Stop after this many full measures (runs until interrupted otherwise)
        #[arg(long)]
        measures: Option<u32>,
        /// Do not make any sound
        #[arg(long)]
        silent: bool,
        /// Print beats as JSON lines instead of a live display
        #[arg(long)]
        json: bool,
    },
}

pub fn run(action: MetronomeAction) -> Result<(), Box<dyn std::error::Error>> {
    match action {
        MetronomeAction::Run {
            bpm,
            beats,
            measures,
            silent,
            json,
        } => {
            let config = Config::load_or_default();
            let mut metronome = config.metronome_engine();
            if let Some(bpm) = bpm {
                metronome.set_bpm(bpm);
            }
            if let Some(beats) = beats {
                metronome.set_beats_per_measure(beats)?;
            }

            let db = Database::open_memory()?;
            let tones = runtime::tone_emitter(&config, silent);
            let mut controller =
                runtime::controller(db, &config, metronome, PomodoroEngine::default(), tones);

            if let Some(event) = controller.start_metronome() {
                if json {
                    println!("{}", serde_json::to_string(&event)?);
                } else {
                    eprintln!(
                        "{} bpm, {} beats per measure",
                        controller.metronome().bpm(),
                        controller.metronome().beats_per_measure()
                    );
                }
            }

            let mut downbeats = 0;
            runtime::run(&mut controller, |c, events| {
                for event in events {
                    let Event::Beat { index, accent } = event else {
                        continue;
                    };
                    if json {
                        if let Ok(line) = serde_json::to_string(event) {
                            println!("{line}");
                        }
                    } else {
                        let mut out = std::io::stdout();
                        let dots = beat_dots(*index, c.metronome().beats_per_measure());
                        let _ = write!(out, "\r{dots} ");
                        let _ = out.flush();
                    }
                    if *accent {
                        downbeats += 1;
                        if measures.is_some_and(|m| downbeats >= m) {
                            return false;
                        }
                    }
                }
                true
            });

            if !json {
                println!();
            }
            controller.stop_metronome();
        }
    }
    Ok(())
}
