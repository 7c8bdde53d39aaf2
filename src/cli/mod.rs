//! CLI entrypoints and command routing.

mod filters;

use anyhow::Result;
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

use crate::logging::{LogLevel, init_logging};

#[derive(Parser, Debug)]
#[command(
    name = "regolith-filters",
    version,
    about = "Check, install and run script filters"
)]
struct Cli {
    #[arg(long, value_enum, global = true, help = "Log level (overrides REGOLITH_LOG)")]
    log_level: Option<LogLevel>,
    #[command(subcommand)]
    command: Command,
}

#[derive(Args, Debug, Clone)]
/// Pipeline configuration options.
struct ConfigArgs {
    #[arg(
        short = 'c',
        long,
        default_value = "filters.toml",
        help = "Pipeline config path"
    )]
    config: PathBuf,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Verify the toolchain of every defined filter
    #[command(alias = "c")]
    Check {
        #[command(flatten)]
        config: ConfigArgs,
    },
    /// Download dependencies of every defined filter
    #[command(alias = "i")]
    Install {
        #[command(flatten)]
        config: ConfigArgs,
    },
    /// Run the configured filter entries in order
    #[command(alias = "r")]
    Run {
        #[command(flatten)]
        config: ConfigArgs,
        #[arg(long, help = "Skip the toolchain check before running")]
        skip_check: bool,
    },
}

/// Entry point for the CLI.
pub fn run() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.log_level)?;

    match cli.command {
        Command::Check { config } => filters::handle_check(&config.config),
        Command::Install { config } => filters::handle_install(&config.config),
        Command::Run { config, skip_check } => filters::handle_run(&config.config, skip_check),
    }
}
