/// Read access to the climate dataset.
///
/// The query layer only needs four primitives: the latest observation date,
/// an inclusive date-range scan, per-station observation counts, and the
/// full station list. `ClimateStore` is exactly that surface, so the same
/// aggregations run against an in-memory snapshot or a live database.
///
/// Implementations must be safe to share across request threads.

use chrono::NaiveDate;
use thiserror::Error;

use crate::model::{Observation, Station};

pub mod memory;
pub mod postgres;

pub use self::memory::MemoryStore;
pub use self::postgres::{PostgresStore, load_snapshot};

/// Failure reading from the backing store.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("database query failed: {0}")]
    Query(#[from] ::postgres::Error),

    #[error("store connection lock poisoned by a panicked request")]
    Poisoned,

    #[error("invalid row in store: {0}")]
    InvalidRow(String),
}

/// Observation count for one station.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StationCount {
    pub station_id: String,
    pub count: u64,
}

/// Read-only view over observations and stations.
///
/// "Store order" is the order rows were loaded in (ascending row id for
/// postgres). Scans return rows in that order.
pub trait ClimateStore: Send + Sync {
    /// Latest observation date, or `None` if there are no observations.
    fn latest_date(&self) -> Result<Option<NaiveDate>, StoreError>;

    /// Observations with `start <= date` and, when given, `date <= end`.
    fn observations_between(
        &self,
        start: NaiveDate,
        end: Option<NaiveDate>,
    ) -> Result<Vec<Observation>, StoreError>;

    /// Number of observations per distinct station id. Order is unspecified.
    fn observation_counts(&self) -> Result<Vec<StationCount>, StoreError>;

    /// Every station, in store order.
    fn stations(&self) -> Result<Vec<Station>, StoreError>;
}
