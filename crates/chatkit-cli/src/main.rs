//! chatkit scenario replay.
//!
//! # Usage
//!
//! ```bash
//! # Replay a scenario file
//! chatkit-replay demos/scenario.json
//!
//! # Replay 200 generated events and print the report as JSON
//! chatkit-replay --seed 42 --events 200 --json
//! ```

use std::{
    io::{self, Write},
    path::PathBuf,
};

use chatkit_cli::{Scenario, render, replay};
use clap::Parser;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// Replays chat scenarios through the chatkit views
#[derive(Parser, Debug)]
#[command(name = "chatkit-replay")]
#[command(about = "Replay a chat scenario and print the resulting lists")]
#[command(version)]
struct Args {
    /// Scenario file (JSON)
    #[arg(required_unless_present = "seed")]
    scenario: Option<PathBuf>,

    /// Generate events from this seed instead of reading a scenario
    #[arg(long, conflicts_with = "scenario")]
    seed: Option<u64>,

    /// Number of generated events
    #[arg(long, default_value = "100", requires = "seed")]
    events: usize,

    /// Print the report as JSON
    #[arg(long)]
    json: bool,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "warn")]
    log_level: String,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&args.log_level));

    tracing_subscriber::registry().with(fmt::layer().with_writer(io::stderr)).with(filter).init();

    let scenario = match (&args.scenario, args.seed) {
        (Some(path), _) => {
            tracing::info!("Loading scenario {}", path.display());
            Scenario::load(path)?
        },
        (None, Some(seed)) => {
            tracing::info!(seed, events = args.events, "Generating scenario");
            Scenario::generated(seed, args.events)
        },
        (None, None) => return Err("either a scenario file or --seed is required".into()),
    };

    let report = replay(scenario).await?;

    let mut out = io::stdout().lock();
    if args.json {
        serde_json::to_writer_pretty(&mut out, &report)?;
        writeln!(out)?;
    } else {
        render(&report, &mut out)?;
    }

    Ok(())
}
