mod classify;
mod cli;
mod coercion;
mod config;
mod error;
mod grouping;
mod inference;
mod output;
mod plot;
mod privacy;
mod readers;
mod report;
mod stats;
mod types;

use clap::Parser;
use cli::Cli;
use types::Result;

fn main() -> Result<()> {
    env_logger::init();
    let cli = Cli::parse();

    cli::run(&cli, cli::announce)?;
    Ok(())
}
