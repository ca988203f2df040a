//! Climate Service - HTTP API
//!
//! Serves read-only aggregations over daily precipitation and temperature
//! observations:
//! 1. Loads configuration (climate.toml, or --config)
//! 2. Opens the observation store (postgres snapshot, postgres live, or CSV)
//! 3. Serves the JSON API until the process is stopped
//!
//! Usage:
//!   cargo run --release                            # climate.toml or defaults
//!   cargo run --release -- --config prod.toml      # explicit config file
//!   cargo run --release -- --port 8080 --workers 8 # override listener
//!
//! Environment:
//!   DATABASE_URL - PostgreSQL connection string (unless set in config)
//!   RUST_LOG     - overrides logging.level

use clap::Parser;
use climate_service::config::{self, ServiceConfig, StoreConfig, StoreMode};
use climate_service::endpoint::{self, Router};
use climate_service::ingest;
use climate_service::store::{self, ClimateStore, PostgresStore};
use climate_service::db;
use std::error::Error;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "climate_service")]
#[command(about = "Read-only JSON API over daily climate observations")]
#[command(version)]
struct Cli {
    #[arg(short, long, help = "Path to configuration file [default: climate.toml if present]")]
    config: Option<PathBuf>,

    #[arg(long, help = "Listen host (overrides server.host)")]
    host: Option<String>,

    #[arg(short, long, help = "Listen port (overrides server.port)")]
    port: Option<u16>,

    #[arg(short, long, help = "Worker threads (overrides server.workers)")]
    workers: Option<usize>,
}

fn main() {
    let cli = Cli::parse();

    let config = match load_config(&cli) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Failed to load configuration: {}", e);
            std::process::exit(1);
        }
    };

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.logging.level));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    info!("Starting climate service");

    let store = match open_store(&config.store) {
        Ok(store) => store,
        Err(e) => {
            error!("Failed to open store: {}", e);
            std::process::exit(1);
        }
    };

    let router = Router::new(store);
    if let Err(e) =
        endpoint::start_endpoint_server(&config.bind_address(), config.server.workers, router)
    {
        error!("Server error: {}", e);
        std::process::exit(1);
    }
}

fn load_config(cli: &Cli) -> Result<ServiceConfig, config::ConfigError> {
    let mut config = config::load_config_or_default(cli.config.as_deref())?;

    if let Some(host) = &cli.host {
        config.server.host = host.clone();
    }
    if let Some(port) = cli.port {
        config.server.port = port;
    }
    if let Some(workers) = cli.workers {
        config.server.workers = workers;
    }

    config.validate()?;
    Ok(config)
}

fn open_store(store_config: &StoreConfig) -> Result<Arc<dyn ClimateStore>, Box<dyn Error>> {
    match store_config {
        StoreConfig::Csv {
            measurements,
            stations,
        } => {
            info!(measurements = %measurements.display(), stations = %stations.display(), "Loading CSV snapshot");
            let snapshot = ingest::csv::load_store(measurements, stations)?;
            info!(
                observations = snapshot.observation_count(),
                stations = snapshot.station_count(),
                "Snapshot loaded"
            );
            Ok(Arc::new(snapshot))
        }
        StoreConfig::Postgres { mode, database_url } => {
            let mut client = db::connect_and_verify(database_url.as_deref())?;
            info!("Connected to database");

            match mode {
                StoreMode::Snapshot => {
                    let snapshot = store::load_snapshot(&mut client)?;
                    info!(
                        observations = snapshot.observation_count(),
                        stations = snapshot.station_count(),
                        "Snapshot loaded from database"
                    );
                    Ok(Arc::new(snapshot))
                }
                StoreMode::Live => {
                    info!("Serving live from database");
                    Ok(Arc::new(PostgresStore::new(client)))
                }
            }
        }
    }
}
