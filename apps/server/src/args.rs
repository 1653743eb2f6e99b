use std::path::PathBuf;

use clap::Parser;

/// Office TV display scheduler.
#[derive(Debug, Parser)]
#[command(name = "tvmagic")]
pub struct CliArgs {
    /// Configuration file for the application
    #[arg(long, default_value = "tvmagic.toml")]
    pub config: PathBuf,
    /// Override the configured listen address for this run only
    #[arg(long)]
    pub address: Option<String>,
}
