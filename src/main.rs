//! Veille Technologique — Binary Entrypoint
//! One pipeline pass per invocation: fetch configured RSS feeds, curate,
//! translate, summarize, and deliver the newsletter (or write it to disk
//! with `--dry-run`). Scheduling is left to cron or the host.

use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use veille_digest::run::{run, RunOptions, RunStatus};

#[derive(Debug, Parser)]
#[command(name = "veille-digest", about = "Automated tech monitoring digest")]
struct Args {
    /// Path to the configuration file (also $VEILLE_CONFIG_PATH)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Render the newsletter to disk without sending email
    #[arg(long)]
    dry_run: bool,

    /// Ignore the recorded last-execution cutoff
    #[arg(long)]
    force: bool,

    /// Explicit recency window in hours (beats the recorded last run)
    #[arg(long)]
    lookback_hours: Option<u64>,
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("veille_digest=info,warn"));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().compact())
        .init();
}

#[tokio::main]
async fn main() -> ExitCode {
    // Load .env in local/dev; no-op when absent.
    let _ = dotenvy::dotenv();
    init_tracing();

    let args = Args::parse();
    let opts = RunOptions {
        config_path: veille_digest::config::resolve_path(args.config),
        dry_run: args.dry_run,
        force: args.force,
        lookback_hours: args.lookback_hours,
    };

    let report = run(&opts).await;

    println!();
    println!("{}", "=".repeat(50));
    println!("Status:     {}", report.status);
    println!("Message:    {}", report.message);
    if report.status != RunStatus::Error {
        println!("Articles:   {}", report.articles_count);
        println!("Categories: {}", report.categories_count);
    }
    for err in &report.feed_errors {
        println!("Feed error: {} - {}", err.source, err.kind);
    }
    println!("{}", "=".repeat(50));

    match report.status {
        RunStatus::Success | RunStatus::PartialSuccess => ExitCode::SUCCESS,
        RunStatus::Error => ExitCode::FAILURE,
    }
}
