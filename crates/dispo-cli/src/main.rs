//! `dispo` CLI: answer meeting availability requests from calendar files.
//!
//! ## Usage
//!
//! ```sh
//! # Answer one request (request from stdin, reply on stdout)
//! dispo compute --request - --events calendrier.ics < demande.json
//!
//! # Slots as JSON, in another zone
//! dispo compute --request demande.json --events calendar.json --timezone America/New_York --json
//!
//! # Serve the request inbox configured in dispo.toml
//! dispo --config dispo.toml watch
//!
//! # Answer whatever is pending, then exit
//! dispo watch --once
//! ```

mod config;
mod ics;
mod inbox;
mod source;

use std::io::{self, Read};
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use dispo_engine::{answer_request, find_availability, parse_request, AvailabilitySlot};
use serde::Serialize;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::Config;
use crate::inbox::Inbox;
use crate::source::{fetch_period, CalendarFile, EventSource, Retrying};

#[derive(Parser)]
#[command(
    name = "dispo",
    version,
    about = "Find free meeting slots in a calendar"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Configuration file (defaults to ./dispo.toml when present)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Emit logs as JSON lines
    #[arg(long, global = true)]
    log_json: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Answer a single request
    Compute {
        /// Request payload file ("-" reads stdin)
        #[arg(short, long)]
        request: String,
        /// Calendar file: iCalendar (`.ics`) or a JSON array of events
        #[arg(short, long)]
        events: PathBuf,
        /// IANA timezone, overriding the configuration
        #[arg(long)]
        timezone: Option<String>,
        /// Output file (writes to stdout if omitted)
        #[arg(short, long)]
        output: Option<String>,
        /// Print the slots as a JSON array instead of the reply text
        #[arg(long)]
        json: bool,
    },
    /// Poll the request inbox and answer requests as they arrive
    Watch {
        /// Answer pending requests once, then exit
        #[arg(long)]
        once: bool,
    },
}

/// A slot as printed by `compute --json`.
#[derive(Serialize)]
struct SlotOutput {
    start: String,
    end: String,
    duration_minutes: i64,
}

impl From<&AvailabilitySlot> for SlotOutput {
    fn from(slot: &AvailabilitySlot) -> Self {
        Self {
            start: slot.start.to_rfc3339(),
            end: slot.end.to_rfc3339(),
            duration_minutes: slot.duration_minutes,
        }
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.log_json);

    let mut config = Config::load(cli.config.as_deref()).context("Failed to load configuration")?;

    match cli.command {
        Commands::Compute {
            request,
            events,
            timezone,
            output,
            json,
        } => {
            if let Some(zone) = timezone {
                config.timezone = zone;
            }
            let availability = config.availability()?;
            let format = config.response_format();

            let payload = read_input(&request)?;
            let request = parse_request(&payload).context("Invalid request")?;

            let source = Retrying::new(CalendarFile::open(events), &config.retry);
            let (start, end) = fetch_period(&request, availability.timezone);
            let events = source
                .fetch_events(start, end)
                .context("Failed to load calendar events")?;
            tracing::debug!("Loaded {} event(s)", events.len());

            let rendered = if json {
                let slots = find_availability(&events, &request, &availability)
                    .context("Failed to compute availability")?;
                let slots: Vec<SlotOutput> = slots.iter().map(SlotOutput::from).collect();
                serde_json::to_string_pretty(&slots)?
            } else {
                answer_request(&events, &request, &availability, &format)
                    .context("Invalid request")?
            };
            write_output(output.as_deref(), &rendered)?;
        }
        Commands::Watch { once } => {
            Inbox::new(&config)?.run(once);
        }
    }

    Ok(())
}

/// Logs go to stderr; stdout carries only the reply.
fn init_logging(json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    if json {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().json().with_writer(io::stderr))
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().with_writer(io::stderr))
            .init();
    }
}

fn read_input(path: &str) -> Result<String> {
    if path == "-" {
        let mut buf = String::new();
        io::stdin()
            .read_to_string(&mut buf)
            .context("Failed to read from stdin")?;
        Ok(buf)
    } else {
        std::fs::read_to_string(path).with_context(|| format!("Failed to read file: {}", path))
    }
}

fn write_output(path: Option<&str>, content: &str) -> Result<()> {
    match path {
        Some(path) => {
            std::fs::write(path, content)
                .with_context(|| format!("Failed to write file: {}", path))?;
        }
        None => {
            println!("{}", content);
        }
    }
    Ok(())
}
