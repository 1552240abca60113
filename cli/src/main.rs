//! CLI for Parley
//!
//! Commands:
//! - server run ADDRESS DATA: accept sample uploads
//! - client run ADDRESS SAMPLE: upload one sample

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

mod commands;
mod output;

use commands::client::ClientCommand;
use commands::server::ServerCommand;

#[derive(Parser)]
#[command(name = "parley")]
#[command(about = "Parley - identity handshake and sample upload", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the upload server
    #[command(subcommand)]
    Server(ServerCommand),

    /// Run the upload client
    #[command(subcommand)]
    Client(ClientCommand),
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let result: Result<()> = match cli.command {
        Commands::Server(ServerCommand::Run(args)) => {
            init_tracing(args.verbose);
            commands::server::run(args).await
        }
        Commands::Client(ClientCommand::Run(args)) => {
            init_tracing(args.verbose);
            commands::client::run(args).await
        }
    };

    if let Err(e) = result {
        output::error(&format!("{:#}", e));
        std::process::exit(1);
    }
}

fn init_tracing(verbose: bool) {
    let filter = if verbose {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("debug"))
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_target(false))
        .init();
}
