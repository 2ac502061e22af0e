//! qachain - command-line entry point

use anyhow::Result;
use clap::Parser;
use colored::Colorize;
use qachain::cli::{self, Args};
use qachain::config::Settings;
use tracing_subscriber::EnvFilter;

fn main() {
    let args = Args::parse();

    if let Err(err) = run(&args) {
        eprintln!("{} {:#}", "Error:".red().bold(), err);
        std::process::exit(1);
    }
}

fn run(args: &Args) -> Result<()> {
    let settings = Settings::load(args.settings.as_deref())?;
    init_tracing(args, &settings);

    tracing::debug!(
        verbosity = args.verbosity().as_str(),
        config = %args.config_path().display(),
        "Starting"
    );
    cli::run(args, &settings)
}

/// `RUST_LOG` wins, then `-v`, then the settings' filter
fn init_tracing(args: &Args, settings: &Settings) {
    let directive = args
        .verbosity()
        .filter_override()
        .map(str::to_string)
        .unwrap_or_else(|| settings.logging.filter.clone());
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(directive));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}
