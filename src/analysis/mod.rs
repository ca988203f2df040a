/// Aggregations over the climate dataset.
///
/// Submodules:
/// - `climate` — trailing-year precipitation/temperature and date-range
///   temperature statistics.

pub mod climate;
