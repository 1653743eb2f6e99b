use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use tvmagic_bundle::{generate, scan, split_dirs};

/// Scans template and static directories and renders them into an
/// embeddable source file.
#[derive(Debug, Parser)]
#[command(name = "resource-bundler")]
struct Args {
    /// Comma-separated directories with templates
    #[arg(long, default_value = "")]
    templates: String,
    /// Comma-separated directories with static files
    #[arg(long, default_value = "")]
    files: String,
    /// Meta-template used to generate the output
    #[arg(long)]
    source: PathBuf,
    /// Output file
    #[arg(long)]
    target: PathBuf,
    /// Directory the template and file roots are resolved against
    #[arg(long, default_value = ".")]
    base_dir: PathBuf,
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();

    let args = Args::parse();
    let manifest = scan(
        &args.base_dir,
        &split_dirs(&args.templates),
        &split_dirs(&args.files),
    );
    if !manifest.issues.is_empty() {
        info!(count = manifest.issues.len(), "some entries were skipped");
    }

    match generate(&manifest, &args.source, &args.target) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            error!("bundle generation failed: {err}");
            ExitCode::FAILURE
        }
    }
}
