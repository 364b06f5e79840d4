//! Pi File Server - Entry Point
//!
//! Loads configuration, sets up logging and serves the configured directory.

use log::{error, info};
use std::process::ExitCode;

use pi_file_server::utils::logging::setup_logging;
use pi_file_server::{Server, ServerConfig, ServerError};

#[tokio::main]
async fn main() -> ExitCode {
    setup_logging();

    info!("Launching file server...");

    match run().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{}", e);
            ExitCode::FAILURE
        }
    }
}

async fn run() -> Result<(), ServerError> {
    let config = ServerConfig::load()?;
    let server = Server::new(config)?;
    server.run().await
}
