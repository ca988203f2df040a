//! Climate CSV Import
//!
//! Loads the measurement and station CSV exports into postgres so the
//! service can run against the database backend:
//! 1. Parse both exports (strict dates, non-empty station ids)
//! 2. Create the schema if missing (sql/001_climate_schema.sql)
//! 3. Optionally truncate existing rows
//! 4. Insert stations then measurements in one transaction, preserving
//!    file order as row order
//!
//! Usage:
//!   cargo run --bin import_climate_csv -- \
//!       --measurements Resources/hawaii_measurements.csv \
//!       --stations Resources/hawaii_stations.csv [--truncate]
//!
//! Environment:
//!   DATABASE_URL - PostgreSQL connection string (from .env), unless
//!                  --database-url is given

use clap::Parser;
use climate_service::db;
use climate_service::ingest::csv::{StationRecord, read_observations, read_station_records};
use climate_service::model::Observation;
use postgres::Client;
use rust_decimal::Decimal;
use rust_decimal::prelude::FromPrimitive;
use std::error::Error;
use std::fs::File;
use std::path::PathBuf;
use tracing::{error, info};

const SCHEMA_SQL: &str = include_str!("../../sql/001_climate_schema.sql");

#[derive(Parser)]
#[command(name = "import_climate_csv")]
#[command(about = "Load climate CSV exports into postgres")]
struct Args {
    #[arg(long, help = "Measurement export (station,date,prcp,tobs)")]
    measurements: PathBuf,

    #[arg(long, help = "Station export (station,name[,latitude,longitude,elevation])")]
    stations: PathBuf,

    #[arg(long, help = "PostgreSQL URL [default: DATABASE_URL]")]
    database_url: Option<String>,

    #[arg(long, help = "Delete existing rows before importing")]
    truncate: bool,
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();
    if let Err(e) = run(&args) {
        error!("Import failed: {}", e);
        std::process::exit(1);
    }
}

fn run(args: &Args) -> Result<(), Box<dyn Error>> {
    info!(path = %args.stations.display(), "Reading station export");
    let stations = read_station_records(File::open(&args.stations)?)?;

    info!(path = %args.measurements.display(), "Reading measurement export");
    let observations = read_observations(File::open(&args.measurements)?)?;
    info!(
        stations = stations.len(),
        observations = observations.len(),
        "Exports parsed"
    );

    let mut client = db::connect_with_validation(args.database_url.as_deref())?;
    info!("Connected to database");

    client.batch_execute(SCHEMA_SQL)?;
    info!("Schema verified");

    let (station_rows, measurement_rows) =
        import(&mut client, &stations, &observations, args.truncate)?;
    info!(station_rows, measurement_rows, "Import complete");

    Ok(())
}

fn import(
    client: &mut Client,
    stations: &[StationRecord],
    observations: &[Observation],
    truncate: bool,
) -> Result<(u64, u64), Box<dyn Error>> {
    let mut tx = client.transaction()?;

    if truncate {
        tx.batch_execute("TRUNCATE measurement, station RESTART IDENTITY")?;
        info!("Existing rows removed");
    }

    let insert_station = tx.prepare(
        "INSERT INTO station (station, name, latitude, longitude, elevation)
         VALUES ($1, $2, $3, $4, $5)
         ON CONFLICT (station) DO UPDATE SET
            name = EXCLUDED.name,
            latitude = EXCLUDED.latitude,
            longitude = EXCLUDED.longitude,
            elevation = EXCLUDED.elevation",
    )?;

    let mut station_rows = 0;
    for station in stations {
        station_rows += tx.execute(
            &insert_station,
            &[
                &station.station,
                &station.name,
                &station.latitude,
                &station.longitude,
                &station.elevation,
            ],
        )?;
    }

    let insert_measurement = tx.prepare(
        "INSERT INTO measurement (station, date, prcp, tobs) VALUES ($1, $2, $3, $4)",
    )?;

    let mut measurement_rows = 0;
    for observation in observations {
        let prcp = observation
            .precipitation
            .map(|p| to_decimal(p, 2, "prcp"))
            .transpose()?;
        let tobs = to_decimal(observation.temperature, 1, "tobs")?;

        measurement_rows += tx.execute(
            &insert_measurement,
            &[&observation.station_id, &observation.date, &prcp, &tobs],
        )?;

        if measurement_rows % 5000 == 0 {
            info!(measurement_rows, "Inserting measurements");
        }
    }

    tx.commit()?;
    Ok((station_rows, measurement_rows))
}

fn to_decimal(value: f64, scale: u32, column: &str) -> Result<Decimal, String> {
    Decimal::from_f64(value)
        .map(|d| d.round_dp(scale))
        .ok_or_else(|| format!("{} value {} cannot be stored as NUMERIC", column, value))
}
