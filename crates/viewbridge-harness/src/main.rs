//! Replay a viewhost trace against a simulated document.
//!
//! # Usage
//!
//! ```bash
//! viewbridge-replay --document document.json --script trace.jsonl
//!
//! # Slower frames, engine-level logging
//! RUST_LOG=viewbridge_core=debug viewbridge-replay -d document.json -s trace.jsonl --tick-ms 33
//! ```
//!
//! Outbound messages are written to stdout, one JSON object per line.

use std::{
    io::{self, Write},
    path::PathBuf,
    time::Duration,
};

use clap::Parser;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};
use viewbridge_harness::{
    SimDocument,
    replay::{parse_script, replay},
};

/// Viewbridge trace replay
#[derive(Parser, Debug)]
#[command(name = "viewbridge-replay")]
#[command(about = "Replay viewhost traffic against a simulated document")]
#[command(version)]
struct Args {
    /// Document description (JSON)
    #[arg(short, long)]
    document: PathBuf,

    /// Replay script (JSON lines)
    #[arg(short, long)]
    script: PathBuf,

    /// Frame interval run after each inbound message, in milliseconds
    #[arg(long, default_value = "16")]
    tick_ms: u64,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info")]
    log_level: String,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&args.log_level));

    tracing_subscriber::registry().with(fmt::layer().with_writer(io::stderr)).with(filter).init();

    let document = SimDocument::from_json(&std::fs::read_to_string(&args.document)?)?;
    let steps = parse_script(&std::fs::read_to_string(&args.script)?)?;
    tracing::info!(document = %args.document.display(), steps = steps.len(), "replaying");

    let outcome = replay(document, &steps, Duration::from_millis(args.tick_ms))?;

    let mut stdout = io::stdout().lock();
    for message in &outcome.outbound {
        writeln!(stdout, "{message}")?;
    }
    for (success, error) in &outcome.render_completions {
        if *success {
            tracing::info!("document rendered");
        } else {
            tracing::warn!(%error, "document failed to render");
        }
    }
    if !outcome.errors.is_empty() {
        tracing::warn!(count = outcome.errors.len(), "errors sent to the viewhost");
    }
    Ok(())
}
