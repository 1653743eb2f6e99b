mod args;
mod config;
mod logging;
mod pages;

use std::io;

use clap::Parser;
use tracing::{error, info};
use tvmagic_web::WebState;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    logging::init_logging();
    let args = args::CliArgs::parse();

    let load = config::load(&args.config).map_err(io::Error::other)?;
    if load.found {
        info!(path = %args.config.display(), "loaded configuration");
    } else {
        info!(path = %args.config.display(), "configuration file not found, using defaults");
    }
    let config = load.config;
    let address = args.address.unwrap_or(config.server.address);

    let state = WebState::detect(&config.web.root);
    let router = tvmagic_web::router(state, pages::routes(config.ui));

    let listener = tokio::net::TcpListener::bind(&address).await?;
    info!(address = %listener.local_addr()?, "TV Magic is running");

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

/// Resolves on Ctrl-C. If the handler cannot be installed the server keeps
/// running instead of shutting down at once.
async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        error!(error = %err, "failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
}
