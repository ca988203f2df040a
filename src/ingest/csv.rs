/// CSV export reader for the climate dataset.
///
/// Measurement export shape (header row required, extra columns ignored):
///
/// ```text
/// station,date,prcp,tobs
/// USC00519397,2010-01-01,0.08,65
/// USC00519397,2010-01-02,,63      <- empty prcp = no measurement
/// ```
///
/// Station export shape:
///
/// ```text
/// station,name,latitude,longitude,elevation
/// USC00519397,"WAIKIKI 717.2, HI US",21.2716,-157.8168,3
/// ```
///
/// Dates go through the same strict `YYYY-MM-DD` parser as the HTTP layer,
/// so a row that loads is a row the API can echo back. Station ids must be
/// unique within the station export, and precipitation must not be negative.
///
/// Line numbers in errors are physical lines, so a quoted field spanning
/// several lines does not shift the rows after it.

use serde::Deserialize;
use serde::de::DeserializeOwned;
use std::collections::HashSet;
use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::model::{Observation, Station, parse_iso_date};
use crate::store::MemoryStore;

#[derive(Debug, Error)]
pub enum CsvIngestError {
    #[error("failed to open {path}: {source}")]
    Open {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("CSV parsing error: {0}")]
    Csv(#[from] ::csv::Error),

    #[error("line {line}: invalid date '{value}', expected YYYY-MM-DD")]
    InvalidDate { line: u64, value: String },

    #[error("line {line}: empty station id")]
    EmptyStationId { line: u64 },

    #[error("line {line}: duplicate station id '{station}'")]
    DuplicateStationId { line: u64, station: String },

    #[error("line {line}: negative precipitation {value}")]
    NegativePrecipitation { line: u64, value: f64 },
}

// ---------------------------------------------------------------------------
// Raw records
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
struct MeasurementRecord {
    station: String,
    date: String,
    prcp: Option<f64>,
    tobs: f64,
}

/// Full station row, including the location columns the API does not serve.
#[derive(Debug, Clone, Deserialize)]
pub struct StationRecord {
    pub station: String,
    pub name: String,
    #[serde(default)]
    pub latitude: Option<f64>,
    #[serde(default)]
    pub longitude: Option<f64>,
    #[serde(default)]
    pub elevation: Option<f64>,
}

// ---------------------------------------------------------------------------
// Readers
// ---------------------------------------------------------------------------

/// Deserializes every row of `reader`, paired with the line it starts on.
fn read_records<R: Read, T: DeserializeOwned>(reader: R) -> Result<Vec<(u64, T)>, CsvIngestError> {
    let mut csv_reader = ::csv::Reader::from_reader(reader);
    let headers = csv_reader.headers()?.clone();
    let mut records = Vec::new();

    for result in csv_reader.records() {
        let raw = result?;
        let line = raw.position().map(|p| p.line()).unwrap_or_default();
        records.push((line, raw.deserialize(Some(&headers))?));
    }

    Ok(records)
}

/// Parses a measurement export, preserving row order.
pub fn read_observations<R: Read>(reader: R) -> Result<Vec<Observation>, CsvIngestError> {
    let mut observations = Vec::new();

    for (line, record) in read_records::<_, MeasurementRecord>(reader)? {
        if record.station.trim().is_empty() {
            return Err(CsvIngestError::EmptyStationId { line });
        }

        let date = parse_iso_date(record.date.trim()).ok_or_else(|| {
            CsvIngestError::InvalidDate {
                line,
                value: record.date.clone(),
            }
        })?;

        if let Some(value) = record.prcp.filter(|p| *p < 0.0) {
            return Err(CsvIngestError::NegativePrecipitation { line, value });
        }

        observations.push(Observation {
            station_id: record.station.trim().to_string(),
            date,
            precipitation: record.prcp,
            temperature: record.tobs,
        });
    }

    Ok(observations)
}

/// Parses a station export into full records, preserving row order.
pub fn read_station_records<R: Read>(reader: R) -> Result<Vec<StationRecord>, CsvIngestError> {
    let mut seen = HashSet::new();
    let mut records = Vec::new();

    for (line, mut record) in read_records::<_, StationRecord>(reader)? {
        record.station = record.station.trim().to_string();
        if record.station.is_empty() {
            return Err(CsvIngestError::EmptyStationId { line });
        }
        if !seen.insert(record.station.clone()) {
            return Err(CsvIngestError::DuplicateStationId {
                line,
                station: record.station,
            });
        }

        records.push(record);
    }

    Ok(records)
}

/// Parses a station export, preserving row order.
pub fn read_stations<R: Read>(reader: R) -> Result<Vec<Station>, CsvIngestError> {
    Ok(read_station_records(reader)?
        .into_iter()
        .map(|record| Station {
            station_id: record.station,
            name: record.name,
        })
        .collect())
}

/// Loads both exports from disk into a snapshot store.
pub fn load_store(measurements: &Path, stations: &Path) -> Result<MemoryStore, CsvIngestError> {
    let observations = read_observations(open(measurements)?)?;
    let stations = read_stations(open(stations)?)?;
    Ok(MemoryStore::new(observations, stations))
}

fn open(path: &Path) -> Result<File, CsvIngestError> {
    File::open(path).map_err(|source| CsvIngestError::Open {
        path: path.to_path_buf(),
        source,
    })
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
