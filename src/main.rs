//! # datascrub
//!
//! Command-line front end for the cleaning pipeline.
//!
//! ```bash
//! datascrub clean -i dirty.csv -o clean.parquet --method remove
//! datascrub clean --sql-url sqlite://shop.db --query "SELECT * FROM orders" -o orders.xlsx
//! datascrub inspect -i dirty.csv
//! ```
//!
//! Set `RUST_LOG=debug` for per-stage detail.

#![expect(clippy::print_stdout)] // reports go to stdout

mod cli;

use anyhow::Result;
use clap::Parser as _;

fn main() -> Result<()> {
    let cli = cli::Cli::parse();

    let mut config = cli::load_config(cli.config.as_deref())?;
    if cli.log_file {
        config.logging.file_logging = true;
    }
    datascrub::logging::init(&config.logging)?;

    cli::run_command(cli.command, &config)
}
