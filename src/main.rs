//! deflect-geoip - country IP prefix database builder
//!
//! Turns the five RIR delegated-extended statistics files into a
//! versioned, checksummed `countrydb.csv.gz` release.

use anyhow::Result;
use clap::Parser;
use tracing::Level;
use tracing_subscriber::FmtSubscriber;

use deflect_geoip::cli::{Cli, Commands};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Setup logging based on verbosity
    let log_level = if cli.verbose {
        Level::DEBUG
    } else if cli.quiet {
        Level::ERROR
    } else {
        Level::INFO
    };

    let subscriber = FmtSubscriber::builder()
        .with_max_level(log_level)
        .with_target(false)
        .with_thread_ids(false)
        .without_time()
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let config = cli.config.as_deref();

    match cli.command {
        Commands::Build { out, version_label } => {
            deflect_geoip::commands::build::run(out, version_label, config).await
        }
        Commands::Sources => deflect_geoip::commands::sources::run(config),
        Commands::Verify { out } => deflect_geoip::commands::verify::run(out, config),
        Commands::Version => {
            println!("deflect-geoip {}", env!("CARGO_PKG_VERSION"));
            Ok(())
        }
    }
}
