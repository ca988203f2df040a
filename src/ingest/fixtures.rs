/// Test fixtures: a trimmed slice of the Hawaii station dataset.
///
/// Shaped so each aggregation has something to bite on:
///   - latest date is 2017-08-23, so the trailing window starts 2016-08-23
///     and the 2016-08-22 row falls just outside it
///   - 2016-08-23 and 2017-08-23 each appear for two stations (last row wins
///     in the precipitation map: 1.79 and 0.45)
///   - USC00519281 has the most rows (7)
///   - 2017-01-01..=2017-01-05 matches exactly three rows: 60, 65, 70
///   - 2017-01-03 has no precipitation measurement

use super::csv::{read_observations, read_stations};
use crate::store::MemoryStore;

pub(crate) fn fixture_measurements_csv() -> &'static str {
    "station,date,prcp,tobs
USC00519397,2016-08-22,0.40,76
USC00519397,2016-08-23,0.00,81
USC00519281,2016-08-23,1.79,77
USC00519281,2016-08-24,2.15,77
USC00519281,2017-01-01,0.00,60
USC00519281,2017-01-03,,65
USC00513117,2017-01-05,0.01,70
USC00519281,2017-01-06,0.00,75
USC00519281,2017-08-22,0.50,76
USC00519397,2017-08-23,0.00,81
USC00519281,2017-08-23,0.45,79
"
}

pub(crate) fn fixture_stations_csv() -> &'static str {
    "station,name,latitude,longitude,elevation
USC00519397,\"WAIKIKI 717.2, HI US\",21.2716,-157.8168,3.0
USC00519281,\"WAIHEE 837.5, HI US\",21.45167,-157.84889,32.9
USC00513117,\"KANEOHE 838.1, HI US\",21.4234,-157.8015,14.6
"
}

pub(crate) fn fixture_store() -> MemoryStore {
    let observations =
        read_observations(fixture_measurements_csv().as_bytes()).expect("fixture should parse");
    let stations = read_stations(fixture_stations_csv().as_bytes()).expect("fixture should parse");
    MemoryStore::new(observations, stations)
}
