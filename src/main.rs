// src/main.rs
//! hostguard command-line entry point
use anyhow::Result;
use clap::Parser;
use hostguard::cli::{run, Cli};
use tracing::{error, info};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    init_logging()?;

    info!("hostguard v{}", env!("CARGO_PKG_VERSION"));

    match run(&cli) {
        Ok(true) => Ok(()),
        Ok(false) => std::process::exit(1),
        Err(err) => {
            error!("{:#}", err);
            std::process::exit(1);
        }
    }
}

fn init_logging() -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let subscriber = FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .finish();

    tracing::subscriber::set_global_default(subscriber)?;
    Ok(())
}
