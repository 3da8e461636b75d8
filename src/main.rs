//! Command-line host for the differential-expression and heatmap pipelines.

use anyhow::Result;
use clap::Parser;
use log::info;

use rnaseq_explorer::cli::{run_cli, Cli};

fn main() -> Result<()> {
    // Initialize logger
    env_logger::init();

    // Parse command line arguments
    let cli = Cli::parse();
    info!("Starting with arguments: {:?}", cli);

    run_cli(cli)?;

    info!("Finished successfully.");
    Ok(())
}
