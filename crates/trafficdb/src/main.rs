use std::io;

use anyhow::Result;
use clap::Parser;
use tracing::{Level, debug};
use trafficdb::commands::Commands;

#[derive(Parser)]
#[clap(name = "trafficdb")]
#[clap(version)]
#[clap(about = "Records for traffic incidents, roads, vehicles and violations", long_about = None)]
struct Cli {
    /// Log verbosity.
    #[clap(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Log output format, "human" or "json".
    #[clap(long, global = true, default_value = "human")]
    log_format: logutil::LogFormat,

    #[clap(subcommand)]
    command: Commands,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let level = match cli.verbose {
        0 => Level::INFO,
        1 => Level::DEBUG,
        _ => Level::TRACE,
    };
    logutil::configure_global_logger(level, cli.log_format, io::stderr);

    debug!(version = env!("CARGO_PKG_VERSION"), "starting...");

    cli.command.run()
}
