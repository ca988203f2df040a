/// climate_service: read-only JSON API over a daily climate-observation dataset.
///
/// # Module structure
///
/// ```text
/// climate_service
/// ├── model       — shared data types (Observation, Station, TemperatureStats, …)
/// ├── config      — service configuration loader (climate.toml)
/// ├── db          — postgres connection and table validation
/// ├── store
/// │   ├── memory   — immutable in-memory snapshot
/// │   └── postgres — live postgres store + snapshot loader
/// ├── ingest
/// │   ├── csv      — measurement/station CSV export reader
/// │   └── fixtures (test only) — small representative CSV payloads
/// ├── analysis
/// │   └── climate  — trailing-year and temperature-range aggregations
/// └── endpoint    — HTTP router and server
/// ```

/// Public modules
pub mod analysis;
pub mod config;
pub mod db;
pub mod endpoint;
pub mod ingest;
pub mod model;
pub mod store;
