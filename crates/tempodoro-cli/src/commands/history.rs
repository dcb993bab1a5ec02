use std::io::{BufRead, Write};

use chrono::Utc;
use clap::Subcommand;
use tempodoro_core::{Database, HistoryFilter, SessionLog};

use crate::format::{session_line, summary_block};

#[derive(Subcommand)]
pub enum HistoryAction {
    /// List saved sessions, newest first
    List {
        /// all, today (last 24h) or week (last 7 days)
        #[arg(long, default_value = "all")]
        filter: HistoryFilter,
        /// Print the records as a JSON array
        #[arg(long)]
        json: bool,
    },
    /// Totals over saved sessions
    Stats {
        /// all, today (last 24h) or week (last 7 days)
        #[arg(long, default_value = "all")]
        filter: HistoryFilter,
    },
    /// Delete one saved session
    Delete {
        /// Session id as shown by `history list`
        id: String,
    },
    /// Delete every saved session
    Clear {
        /// Skip the confirmation prompt
        #[arg(long)]
        yes: bool,
    },
}

fn confirm(prompt: &str) -> Result<bool, Box<dyn std::error::Error>> {
    let mut err = std::io::stderr();
    write!(err, "{prompt} [y/N] ")?;
    err.flush()?;
    let mut answer = String::new();
    std::io::stdin().lock().read_line(&mut answer)?;
    Ok(matches!(answer.trim().to_ascii_lowercase().as_str(), "y" | "yes"))
}

pub fn run(action: HistoryAction) -> Result<(), Box<dyn std::error::Error>> {
    let mut log = SessionLog::new(Database::open()?);
    let now = Utc::now();

    match action {
        HistoryAction::List { filter, json } => {
            let records = log.list(filter, now);
            if json {
                println!("{}", serde_json::to_string_pretty(&records)?);
            } else if records.is_empty() && !log.is_empty() {
                println!("no sessions in this period ({} saved in total)", log.len());
            } else if records.is_empty() {
                println!("no sessions yet: complete a Pomodoro cycle and run `tempodoro pomodoro save`");
            } else {
                for record in records {
                    println!("{}", session_line(record, now));
                }
            }
        }
        HistoryAction::Stats { filter } => {
            println!("{}", summary_block(&log.summary(filter, now)));
        }
        HistoryAction::Delete { id } => {
            if log.delete(&id) {
                println!("deleted {id}");
            } else {
                return Err(format!("no session with id {id}").into());
            }
        }
        HistoryAction::Clear { yes } => {
            if log.is_empty() {
                println!("history is already empty");
            } else if yes || confirm("Clear all saved sessions?")? {
                if !log.clear_all() {
                    return Err("could not clear history".into());
                }
                println!("history cleared");
            } else {
                println!("kept {} sessions", log.len());
            }
        }
    }
    Ok(())
}
