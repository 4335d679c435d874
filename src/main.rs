mod analysis;
mod axis;
mod config;
mod correlation;
mod dataset;
mod error;
mod manager;
mod series;
mod stats;
mod summary;
mod transform;

use crate::manager::Manager;
use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Debug, Parser)]
#[command(version, about)]
struct CLI {
    #[arg(long)]
    work_dir: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Analyze every dataset and write results and summaries.
    Analyze,

    /// Print the summary of every dataset.
    Summarize,

    /// Remove all results.
    Clean,
}

fn main() {
    env_logger::Builder::new()
        .format_timestamp_millis()
        .filter_level(log::LevelFilter::Info)
        .parse_default_env()
        .init();

    if let Err(error) = run_cli() {
        log::error!("{error:#?}");
        std::process::exit(1);
    }
}

fn run_cli() -> Result<()> {
    let args = CLI::parse();
    log::info!("{args:#?}");

    let mgr = Manager::new(args.work_dir).context("failed to construct mgr")?;

    match args.command {
        Command::Analyze => mgr.analyze()?,
        Command::Summarize => mgr.summarize()?,
        Command::Clean => mgr.clean()?,
    }

    Ok(())
}
