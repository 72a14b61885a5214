//! Scanflow CLI
//!
//! Command-line front end for the scanflow report pipeline.

mod cli;
mod commands;
mod console;
mod logging;

use anyhow::Result;
use clap::Parser;
use cli::Cli;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    logging::init_logging(cli.verbose, cli.log_json);
    commands::handle_command(cli).await
}
