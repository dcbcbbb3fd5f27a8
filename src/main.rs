//! ParcelView - cadastral parcel search server and CLI
//!
//! # Usage
//!
//! ```bash
//! # Start the server (API + embedded frontend) on 127.0.0.1:8000
//! parcelview serve
//!
//! # Look up parcels through a running server and download a KML
//! parcelview query 3RP123456 4/DP765432 --export kml
//!
//! # Convert a saved GeoJSON file offline
//! parcelview export --input parcels.geojson --format shp
//! ```

use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};
use tracing::debug;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use parcelview::cli::{load_config, CliError, ConfigArgs, ExportArgs, QueryArgs};
#[cfg(feature = "web")]
use parcelview::cli::ServeArgs;
use parcelview::config::Config;
use parcelview::constants::APP_NAME;

/// ParcelView - QLD/NSW lot/plan parcel search with KML and Shapefile export
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Configuration file (defaults to the platform config directory)
    #[arg(long, global = true, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Run the HTTP API and embedded frontend
    #[cfg(feature = "web")]
    Serve(ServeArgs),
    /// Search identifiers through a backend, select and export results
    Query(QueryArgs),
    /// Export a GeoJSON file to KML or a zipped Shapefile
    Export(ExportArgs),
    /// Show or initialise the configuration file
    Config(ConfigArgs),
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| filter.into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let result = match &cli.command {
        Commands::Config(args) => config_path(cli.config.as_deref()).and_then(|path| args.execute(&path)),
        Commands::Export(args) => args.execute(),
        Commands::Query(args) => match config_path(cli.config.as_deref()).and_then(|p| load_config(&p)) {
            Ok(config) => args.execute(&config).await,
            Err(e) => Err(e),
        },
        #[cfg(feature = "web")]
        Commands::Serve(args) => match config_path(cli.config.as_deref()).and_then(|p| load_config(&p)) {
            Ok(config) => args.execute(config).await,
            Err(e) => Err(e),
        },
    };

    if let Err(e) = result {
        eprintln!("Error: {e}");
        std::process::exit(e.exit_code().code());
    }

    Ok(())
}

/// `--config` if given, else the platform config file.
fn config_path(explicit: Option<&Path>) -> Result<PathBuf, CliError> {
    let path = match explicit {
        Some(path) => path.to_path_buf(),
        None => Config::config_file_path().map_err(|e| CliError::io(format!("{e:#}")))?,
    };
    debug!("{} config: {}", APP_NAME, path.display());
    Ok(path)
}
