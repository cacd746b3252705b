//! Unified parley CLI.
//!
//! This binary provides a unified interface to the parley components:
//! - `parley server` - Run the chat backend server
//!
//! The server can also be run as the standalone `parley-server` binary.

use std::process::ExitCode;

use clap::{Parser, Subcommand};

/// Parley unified CLI.
#[derive(Parser)]
#[command(
    name = "parley",
    version,
    about = "Backend for an AI persona chat service",
    propagate_version = true
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the chat backend server.
    #[command(name = "server", alias = "serve")]
    Server(parley_server::ServerArgs),
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Server(args) => parley_server::cli::run(args).await,
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {}", e);
            ExitCode::FAILURE
        }
    }
}
