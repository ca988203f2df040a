/// Postgres-backed store.
///
/// `PostgresStore` queries the `measurement` and `station` tables on every
/// call through one shared connection. `postgres::Client` needs `&mut self`
/// for queries, so access goes through a `Mutex`; the lock is held for the
/// SQL round-trip only and released before the HTTP response is written.
///
/// `load_snapshot` reads both tables once into a `MemoryStore` for the
/// default snapshot mode.

use ::postgres::types::FromSql;
use ::postgres::{Client, Row};
use chrono::NaiveDate;
use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;
use std::sync::Mutex;

use super::{ClimateStore, MemoryStore, StationCount, StoreError};
use crate::model::{Observation, Station};

const SELECT_OBSERVATIONS: &str = "SELECT station, date, prcp, tobs FROM measurement";
const SELECT_STATIONS: &str = "SELECT station, name FROM station ORDER BY id";

// ---------------------------------------------------------------------------
// Live store
// ---------------------------------------------------------------------------

pub struct PostgresStore {
    client: Mutex<Client>,
}

impl PostgresStore {
    pub fn new(client: Client) -> Self {
        Self {
            client: Mutex::new(client),
        }
    }

    /// Runs `f` with exclusive access to the connection.
    fn with_client<T>(
        &self,
        f: impl FnOnce(&mut Client) -> Result<T, StoreError>,
    ) -> Result<T, StoreError> {
        let mut client = self.client.lock().map_err(|_| StoreError::Poisoned)?;
        f(&mut client)
    }
}

impl ClimateStore for PostgresStore {
    fn latest_date(&self) -> Result<Option<NaiveDate>, StoreError> {
        self.with_client(|client| {
            let row = client.query_one("SELECT MAX(date) FROM measurement", &[])?;
            let latest: Option<NaiveDate> = column(&row, 0, "MAX(date)")?;
            Ok(latest)
        })
    }

    fn observations_between(
        &self,
        start: NaiveDate,
        end: Option<NaiveDate>,
    ) -> Result<Vec<Observation>, StoreError> {
        let rows = self.with_client(|client| {
            let query = format!(
                "{} WHERE date >= $1 AND ($2::date IS NULL OR date <= $2) ORDER BY id",
                SELECT_OBSERVATIONS
            );
            Ok(client.query(query.as_str(), &[&start, &end])?)
        })?;

        rows.iter().map(observation_from_row).collect()
    }

    fn observation_counts(&self) -> Result<Vec<StationCount>, StoreError> {
        let rows = self.with_client(|client| {
            Ok(client.query(
                "SELECT station, COUNT(*) FROM measurement GROUP BY station",
                &[],
            )?)
        })?;

        rows.iter()
            .map(|row| {
                let station_id: String = column(row, 0, "station")?;
                let count: i64 = column(row, 1, "COUNT(*)")?;
                let count = u64::try_from(count).map_err(|_| {
                    StoreError::InvalidRow(format!("negative count for {}", station_id))
                })?;
                Ok(StationCount { station_id, count })
            })
            .collect()
    }

    fn stations(&self) -> Result<Vec<Station>, StoreError> {
        let rows = self.with_client(|client| Ok(client.query(SELECT_STATIONS, &[])?))?;
        rows.iter().map(station_from_row).collect()
    }
}

// ---------------------------------------------------------------------------
// Snapshot loading
// ---------------------------------------------------------------------------

/// Reads every observation and station into an in-memory snapshot.
pub fn load_snapshot(client: &mut Client) -> Result<MemoryStore, StoreError> {
    let query = format!("{} ORDER BY id", SELECT_OBSERVATIONS);
    let observations = client
        .query(query.as_str(), &[])?
        .iter()
        .map(observation_from_row)
        .collect::<Result<Vec<_>, _>>()?;

    let stations = client
        .query(SELECT_STATIONS, &[])?
        .iter()
        .map(station_from_row)
        .collect::<Result<Vec<_>, _>>()?;

    Ok(MemoryStore::new(observations, stations))
}

// ---------------------------------------------------------------------------
// Row conversion
// ---------------------------------------------------------------------------

/// Reads one column, turning a type mismatch or unexpected NULL into
/// `InvalidRow` instead of a panic.
fn column<'a, T: FromSql<'a>>(row: &'a Row, idx: usize, name: &str) -> Result<T, StoreError> {
    row.try_get(idx)
        .map_err(|e| StoreError::InvalidRow(format!("column {}: {}", name, e)))
}

fn observation_from_row(row: &Row) -> Result<Observation, StoreError> {
    let station_id: String = column(row, 0, "station")?;
    let date: NaiveDate = column(row, 1, "date")?;
    let prcp: Option<Decimal> = column(row, 2, "prcp")?;
    let tobs: Decimal = column(row, 3, "tobs")?;

    let precipitation = prcp.map(|p| decimal_to_f64(p, "prcp")).transpose()?;
    let temperature = decimal_to_f64(tobs, "tobs")?;

    Ok(Observation {
        station_id,
        date,
        precipitation,
        temperature,
    })
}

fn station_from_row(row: &Row) -> Result<Station, StoreError> {
    Ok(Station {
        station_id: column(row, 0, "station")?,
        name: column(row, 1, "name")?,
    })
}

fn decimal_to_f64(value: Decimal, column: &str) -> Result<f64, StoreError> {
    value
        .to_f64()
        .ok_or_else(|| StoreError::InvalidRow(format!("{} value {} is not representable", column, value)))
}
