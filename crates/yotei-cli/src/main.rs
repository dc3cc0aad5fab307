//! `yotei` — analyze Japanese task sentences and place them on a calendar.
//!
//! The engine itself does no I/O and never reads the clock; this binary is
//! the calling layer that loads the busy-interval snapshot, supplies `now`,
//! and serializes results. `--now` pins the anchor instant for
//! reproducible output.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use clap::{Parser, Subcommand};
use serde_json::json;

use yotei_engine::{
    apply_fallback, civil, create_fallback_analysis, find_free_slots, schedule_task, BusyInterval,
    SchedulerConfig, TaskAnalysis,
};

#[derive(Parser)]
#[command(
    name = "yotei",
    version,
    about = "Deterministic scheduling for Japanese natural-language tasks"
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Analyze a task sentence without scheduling it
    Analyze {
        /// The raw sentence, e.g. 「明日9時から30分瞑想します」
        text: String,
        /// Anchor instant (RFC 3339); defaults to the current time
        #[arg(long)]
        now: Option<String>,
    },
    /// List free slots between two instants
    Slots {
        /// JSON file with the existing events (array of busy intervals)
        #[arg(long)]
        events: PathBuf,
        /// Window start (RFC 3339)
        #[arg(long)]
        from: String,
        /// Window end (RFC 3339)
        #[arg(long)]
        to: String,
        /// Minimum slot length in minutes
        #[arg(long, default_value_t = 30)]
        min: i64,
    },
    /// Analyze a sentence and place it against the existing events
    Schedule {
        /// The raw sentence
        text: String,
        /// JSON file with the existing events; empty calendar when omitted
        #[arg(long)]
        events: Option<PathBuf>,
        /// Anchor instant (RFC 3339); defaults to the current time
        #[arg(long)]
        now: Option<String>,
        /// First schedulable hour of the day (JST)
        #[arg(long, default_value_t = 8)]
        work_start: u32,
        /// First non-schedulable hour of the evening (JST)
        #[arg(long, default_value_t = 22)]
        work_end: u32,
        /// How many days ahead to search
        #[arg(long, default_value_t = 7)]
        horizon: i64,
    },
}

fn main() -> Result<()> {
    env_logger::init();
    let cli = Cli::parse();

    match cli.command {
        Command::Analyze { text, now } => {
            let now = resolve_now(now.as_deref())?;
            let fallback = create_fallback_analysis(&text, now);
            println!("{}", serde_json::to_string_pretty(&fallback)?);
        }
        Command::Slots {
            events,
            from,
            to,
            min,
        } => {
            let events = load_events(&events)?;
            let from = parse_instant_arg(&from)?;
            let to = parse_instant_arg(&to)?;
            let slots = find_free_slots(&events, from, to, min);
            println!("{}", serde_json::to_string_pretty(&slots)?);
        }
        Command::Schedule {
            text,
            events,
            now,
            work_start,
            work_end,
            horizon,
        } => {
            let now = resolve_now(now.as_deref())?;
            let events = match events {
                Some(path) => load_events(&path)?,
                None => Vec::new(),
            };
            let config = SchedulerConfig {
                work_start_hour: work_start,
                work_end_hour: work_end,
                horizon_days: horizon,
            };

            // The deterministic local parse is authoritative for explicit
            // time/duration mentions, so run it as a corrective pass even
            // when the analysis came from the analyzer itself.
            let fallback = create_fallback_analysis(&text, now);
            let analysis: TaskAnalysis = apply_fallback(&fallback.analysis, &fallback);

            let placement = schedule_task(&analysis, &events, now, &config);
            println!(
                "{}",
                serde_json::to_string_pretty(&json!({
                    "analysis": &analysis,
                    "duration_explicit": fallback.duration_explicit,
                    "placement": &placement,
                }))?
            );
            if !placement.is_scheduled() {
                std::process::exit(1);
            }
        }
    }
    Ok(())
}

fn resolve_now(arg: Option<&str>) -> Result<DateTime<Utc>> {
    match arg {
        Some(s) => parse_instant_arg(s),
        None => Ok(Utc::now()),
    }
}

fn parse_instant_arg(s: &str) -> Result<DateTime<Utc>> {
    civil::parse_instant(s).with_context(|| format!("cannot parse instant '{s}'"))
}

fn load_events(path: &Path) -> Result<Vec<BusyInterval>> {
    let data = fs::read_to_string(path)
        .with_context(|| format!("cannot read events file '{}'", path.display()))?;
    serde_json::from_str(&data)
        .with_context(|| format!("events file '{}' is not a valid event list", path.display()))
}
