//! aza - publish build artifacts to Azure Blob Storage
//!
//! Command-line front end for publishing, fetching, and serving artifacts.

use azartifacts::cli::{Cli, Commands};
use azartifacts::config::{load_config, load_config_no_validation, Config};
use azartifacts::error::Result;
use azartifacts::publish::BuildStatus;
use clap::Parser;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[tokio::main]
async fn main() {
    // Parse command-line arguments
    let cli = Cli::parse();
    let config = load(&cli);

    // Initialize logging; the config file can turn on debug output too
    let debug = config.as_ref().map_or(cli.debug, |config| cli.debug_enabled(config));
    init_logging(debug, cli.log_json);

    // Execute the command
    match run(cli, config).await {
        Ok(status) => std::process::exit(status.exit_code()),
        Err(e) => {
            error!("Error: {}", e);
            eprintln!("Error: {}", e);
            std::process::exit(1);
        }
    }
}

fn load(cli: &Cli) -> Result<Config> {
    // Config commands must work even when the file is incomplete
    match &cli.command {
        Commands::Config { .. } => load_config_no_validation(cli.config_file.as_deref()),
        _ => load_config(cli.config_file.as_deref()),
    }
}

async fn run(cli: Cli, config: Result<Config>) -> Result<BuildStatus> {
    info!("Starting aza");
    cli.execute(config?).await
}

fn init_logging(debug: bool, json: bool) {
    let filter = if debug {
        EnvFilter::new("azartifacts=debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| "azartifacts=info".into())
    };

    let registry = tracing_subscriber::registry().with(filter);
    if json {
        registry
            .with(tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        registry
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .init();
    }
}
