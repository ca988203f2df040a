/// Shared data types for the climate dataset.
///
/// Observations and stations are loaded once and never mutated. Everything
/// the HTTP layer serializes is defined here so the store, the query layer
/// and the router agree on one shape.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Date format used on the wire and in the CSV exports.
pub const DATE_FORMAT: &str = "%Y-%m-%d";

// ---------------------------------------------------------------------------
// Store entities
// ---------------------------------------------------------------------------

/// One dated measurement row tied to a station.
///
/// `(station_id, date)` is not unique; duplicates are kept and take part in
/// every aggregation.
#[derive(Debug, Clone, PartialEq)]
pub struct Observation {
    pub station_id: String,
    pub date: NaiveDate,
    /// Daily precipitation; `None` when nothing was measured that day.
    pub precipitation: Option<f64>,
    /// Observed temperature in the dataset's native unit.
    pub temperature: f64,
}

/// A named physical sensor location.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Station {
    #[serde(rename = "station")]
    pub station_id: String,
    pub name: String,
}

// ---------------------------------------------------------------------------
// Aggregation results
// ---------------------------------------------------------------------------

/// A `(date, temperature)` pair from the most active station.
///
/// Field names match what existing clients of `/api/v1.0/tobs` read.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TemperatureObservation {
    #[serde(rename = "data")]
    pub date: NaiveDate,
    #[serde(rename = "tobs")]
    pub temperature: f64,
}

/// Min/avg/max over a non-empty set of temperatures.
///
/// Only built when at least one row matched; the empty case is `None` at the
/// call site, which keeps the three values populated or absent together.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TemperatureStats {
    pub min: f64,
    pub avg: f64,
    pub max: f64,
}

impl TemperatureStats {
    /// Folds temperatures into stats. Returns `None` for an empty input.
    ///
    /// The mean is clamped into `[min, max]`. This intentionally departs from
    /// the plain `sum / count` value: summation rounding can put that a few
    /// ULPs outside the observed range, and the clamp keeps `min <= avg <= max`.
    pub fn from_temperatures<I>(temperatures: I) -> Option<Self>
    where
        I: IntoIterator<Item = f64>,
    {
        let mut count = 0usize;
        let mut sum = 0.0;
        let mut min = f64::INFINITY;
        let mut max = f64::NEG_INFINITY;

        for t in temperatures {
            count += 1;
            sum += t;
            min = min.min(t);
            max = max.max(t);
        }

        if count == 0 {
            return None;
        }

        let avg = (sum / count as f64).max(min).min(max);
        Some(TemperatureStats { min, avg, max })
    }
}

// ---------------------------------------------------------------------------
// Date parsing
// ---------------------------------------------------------------------------

/// Strictly parses a `YYYY-MM-DD` date.
///
/// chrono alone accepts unpadded fields and signed years, so the shape is
/// checked first: exactly ten ASCII bytes, digits everywhere except the two
/// hyphens.
pub fn parse_iso_date(s: &str) -> Option<NaiveDate> {
    let bytes = s.as_bytes();
    if bytes.len() != 10 {
        return None;
    }

    let shape_ok = bytes.iter().enumerate().all(|(i, b)| match i {
        4 | 7 => *b == b'-',
        _ => b.is_ascii_digit(),
    });
    if !shape_ok {
        return None;
    }

    NaiveDate::parse_from_str(s, DATE_FORMAT).ok()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
