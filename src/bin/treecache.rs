//! Treecache CLI Binary
//!
//! Command-line interface for the tree cache demonstration.

use anyhow::Context;
use clap::Parser;
use owo_colors::OwoColorize;
use std::process;
use treecache::logging::init_logging;
use treecache::tooling::cli::{Cli, CliContext};

fn main() {
    let cli = Cli::parse();
    match run(cli) {
        Ok(output) => println!("{}", output),
        Err(e) => {
            eprintln!("{} {:#}", "Error:".red().bold(), e);
            process::exit(1);
        }
    }
}

fn run(cli: Cli) -> anyhow::Result<String> {
    let context = CliContext::new(cli.config.clone(), cli.json)
        .context("Failed to load configuration")?
        .with_view(CliContext::view_from_args(&cli));

    let mut logging = context.config().logging.clone();
    if let Some(level) = &cli.log_level {
        logging.level = level.clone();
    }
    init_logging(Some(&logging)).context("Failed to initialize logging")?;

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("Failed to start async runtime")?;
    let output = runtime.block_on(context.execute(&cli.command))?;
    Ok(output)
}
