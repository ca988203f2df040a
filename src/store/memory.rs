/// Immutable in-memory snapshot of the dataset.
///
/// Loaded once at startup (from the CSV exports or from postgres) and
/// shared read-only by every request thread, so no locking is needed.

use chrono::NaiveDate;
use std::collections::HashMap;

use super::{ClimateStore, StationCount, StoreError};
use crate::model::{Observation, Station};

#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    observations: Vec<Observation>,
    stations: Vec<Station>,
}

impl MemoryStore {
    pub fn new(observations: Vec<Observation>, stations: Vec<Station>) -> Self {
        Self {
            observations,
            stations,
        }
    }

    pub fn observation_count(&self) -> usize {
        self.observations.len()
    }

    pub fn station_count(&self) -> usize {
        self.stations.len()
    }
}

impl ClimateStore for MemoryStore {
    fn latest_date(&self) -> Result<Option<NaiveDate>, StoreError> {
        Ok(self.observations.iter().map(|o| o.date).max())
    }

    fn observations_between(
        &self,
        start: NaiveDate,
        end: Option<NaiveDate>,
    ) -> Result<Vec<Observation>, StoreError> {
        Ok(self
            .observations
            .iter()
            .filter(|o| o.date >= start && end.is_none_or(|end| o.date <= end))
            .cloned()
            .collect())
    }

    fn observation_counts(&self) -> Result<Vec<StationCount>, StoreError> {
        let mut counts: HashMap<&str, u64> = HashMap::new();
        for observation in &self.observations {
            *counts.entry(observation.station_id.as_str()).or_insert(0) += 1;
        }

        Ok(counts
            .into_iter()
            .map(|(station_id, count)| StationCount {
                station_id: station_id.to_string(),
                count,
            })
            .collect())
    }

    fn stations(&self) -> Result<Vec<Station>, StoreError> {
        Ok(self.stations.clone())
    }
}
