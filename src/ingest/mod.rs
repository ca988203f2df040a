/// Readers for the dataset's flat-file exports.
///
/// Submodules:
/// - `csv` — `measurements.csv` / `stations.csv` reader
/// - `fixtures` (test only) — small representative CSV payloads

pub mod csv;

#[cfg(test)]
pub(crate) mod fixtures;
