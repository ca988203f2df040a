/// Query layer: the four aggregations the API serves.
///
/// Every function is a one-shot read against a `ClimateStore`; nothing here
/// holds state between calls.
///
/// The "trailing year" is the 365-day window ending at the latest date in
/// the dataset (not the current date, and not calendar-year aligned):
/// `cutoff = latest - 365 days`, rows with `date >= cutoff` are in.

use chrono::{Days, NaiveDate};
use std::collections::BTreeMap;
use thiserror::Error;

use crate::model::{Station, TemperatureObservation, TemperatureStats};
use crate::store::{ClimateStore, StationCount, StoreError};

/// Length of the trailing window in days.
pub const TRAILING_WINDOW_DAYS: u64 = 365;

#[derive(Debug, Error)]
pub enum QueryError {
    #[error("dataset contains no observations")]
    EmptyDataset,

    #[error(transparent)]
    Store(#[from] StoreError),
}

// ---------------------------------------------------------------------------
// Trailing window
// ---------------------------------------------------------------------------

/// First date inside the trailing window ending at `latest`.
pub fn trailing_year_cutoff(latest: NaiveDate) -> NaiveDate {
    latest
        .checked_sub_days(Days::new(TRAILING_WINDOW_DAYS))
        .unwrap_or(NaiveDate::MIN)
}

fn trailing_window_start(store: &dyn ClimateStore) -> Result<NaiveDate, QueryError> {
    let latest = store.latest_date()?.ok_or(QueryError::EmptyDataset)?;
    Ok(trailing_year_cutoff(latest))
}

// ---------------------------------------------------------------------------
// Aggregations
// ---------------------------------------------------------------------------

/// Precipitation for every date in the trailing year.
///
/// Multiple stations report on the same date, but the map holds one value per
/// date: the last row in store order overwrites earlier ones. Existing
/// clients depend on that; it is not an aggregate.
pub fn trailing_year_precipitation(
    store: &dyn ClimateStore,
) -> Result<BTreeMap<NaiveDate, Option<f64>>, QueryError> {
    let cutoff = trailing_window_start(store)?;

    let mut by_date = BTreeMap::new();
    for observation in store.observations_between(cutoff, None)? {
        by_date.insert(observation.date, observation.precipitation);
    }

    Ok(by_date)
}

/// All stations, in store order.
pub fn list_stations(store: &dyn ClimateStore) -> Result<Vec<Station>, QueryError> {
    Ok(store.stations()?)
}

/// Picks the station with the most observations.
///
/// Ties go to the lexicographically smallest station id, so the choice does
/// not depend on how the store happens to order its counts.
pub fn most_active_station(counts: Vec<StationCount>) -> Option<String> {
    counts
        .into_iter()
        .max_by(|a, b| {
            a.count
                .cmp(&b.count)
                .then_with(|| b.station_id.cmp(&a.station_id))
        })
        .map(|c| c.station_id)
}

/// Trailing-year temperatures for the most active station, in store order.
///
/// The window is anchored on the latest date across the whole dataset, not
/// the chosen station's own latest reading.
pub fn most_active_station_temperatures(
    store: &dyn ClimateStore,
) -> Result<Vec<TemperatureObservation>, QueryError> {
    let cutoff = trailing_window_start(store)?;
    let station_id =
        most_active_station(store.observation_counts()?).ok_or(QueryError::EmptyDataset)?;

    Ok(store
        .observations_between(cutoff, None)?
        .into_iter()
        .filter(|o| o.station_id == station_id)
        .map(|o| TemperatureObservation {
            date: o.date,
            temperature: o.temperature,
        })
        .collect())
}

/// Min/avg/max temperature for `start..=end` (or everything from `start`
/// when `end` is `None`).
///
/// Returns `Ok(None)` when no rows match, including `start > end`.
pub fn temperature_stats(
    store: &dyn ClimateStore,
    start: NaiveDate,
    end: Option<NaiveDate>,
) -> Result<Option<TemperatureStats>, QueryError> {
    if end.is_some_and(|end| start > end) {
        return Ok(None);
    }

    let rows = store.observations_between(start, end)?;
    Ok(TemperatureStats::from_temperatures(
        rows.iter().map(|o| o.temperature),
    ))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
