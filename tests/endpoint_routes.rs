/// Integration tests for the HTTP routes
///
/// Drives the router end to end (URL → parse → query → JSON) against an
/// in-memory store built from CSV text, the same path the service takes
/// with the csv backend. No network or database needed.
///
/// Run with: cargo test --test endpoint_routes

use climate_service::endpoint::{RangeStatsResponse, Router, StartStatsResponse};
use climate_service::ingest::csv::{read_observations, read_stations};
use climate_service::model::{Observation, Station};
use climate_service::store::{ClimateStore, MemoryStore, StationCount, StoreError};

use chrono::NaiveDate;
use pretty_assertions::assert_eq;
use serde_json::{Value, json};
use std::sync::Arc;
use tiny_http::Method;

// ---------------------------------------------------------------------------
// Test Helpers
// ---------------------------------------------------------------------------

const MEASUREMENTS: &str = "station,date,prcp,tobs
USC00519397,2016-08-21,0.10,78
USC00519397,2016-08-23,0.00,81
USC00513117,2016-08-23,0.15,76
USC00513117,2016-12-31,0.02,62
USC00513117,2017-01-01,,60
USC00519523,2017-01-02,0.00,65
USC00513117,2017-01-05,0.30,70
USC00513117,2017-01-06,0.00,74
USC00519397,2017-08-23,0.00,81
USC00513117,2017-08-23,0.08,82
";

const STATIONS: &str = "station,name,latitude,longitude,elevation
USC00519397,\"WAIKIKI 717.2, HI US\",21.2716,-157.8168,3.0
USC00513117,\"KANEOHE 838.1, HI US\",21.4234,-157.8015,14.6
USC00519523,\"WAIMANALO EXPERIMENTAL FARM, HI US\",21.33556,-157.71139,19.5
";

fn router() -> Router {
    let observations = read_observations(MEASUREMENTS.as_bytes()).expect("measurements should parse");
    let stations = read_stations(STATIONS.as_bytes()).expect("stations should parse");
    Router::new(Arc::new(MemoryStore::new(observations, stations)))
}

fn empty_router() -> Router {
    Router::new(Arc::new(MemoryStore::default()))
}

/// Store whose backend is gone: every primitive fails.
struct FailingStore;

impl ClimateStore for FailingStore {
    fn latest_date(&self) -> Result<Option<NaiveDate>, StoreError> {
        Err(StoreError::Poisoned)
    }

    fn observations_between(
        &self,
        _start: NaiveDate,
        _end: Option<NaiveDate>,
    ) -> Result<Vec<Observation>, StoreError> {
        Err(StoreError::Poisoned)
    }

    fn observation_counts(&self) -> Result<Vec<StationCount>, StoreError> {
        Err(StoreError::Poisoned)
    }

    fn stations(&self) -> Result<Vec<Station>, StoreError> {
        Err(StoreError::Poisoned)
    }
}

fn get_json(router: &Router, url: &str) -> (u16, Value) {
    let response = router.route(&Method::Get, url);
    assert_eq!(response.content_type, "application/json", "{} should return JSON", url);
    let body = serde_json::from_str(&response.body)
        .unwrap_or_else(|e| panic!("{} returned invalid JSON ({}): {}", url, e, response.body));
    (response.status, body)
}

// ---------------------------------------------------------------------------
// 1. Index
// ---------------------------------------------------------------------------

#[test]
fn test_index_lists_routes() {
    let response = router().route(&Method::Get, "/");

    assert_eq!(response.status, 200);
    assert!(response.content_type.starts_with("text/html"));
    for route in ["/api/v1.0/precipitation", "/api/v1.0/stations", "/api/v1.0/tobs"] {
        assert!(response.body.contains(route), "index should mention {}", route);
    }
}

#[test]
fn test_index_never_fails_on_empty_store() {
    assert_eq!(empty_router().route(&Method::Get, "/").status, 200);
}

// ---------------------------------------------------------------------------
// 2. Precipitation
// ---------------------------------------------------------------------------

#[test]
fn test_precipitation_covers_trailing_year_only() {
    let (status, body) = get_json(&router(), "/api/v1.0/precipitation");
    assert_eq!(status, 200);

    let map = body.as_object().expect("precipitation should be a JSON object");
    let keys: Vec<&str> = map.keys().map(String::as_str).collect();

    // 2017-08-23 - 365 days = 2016-08-23; 2016-08-21 is outside
    assert!(!keys.contains(&"2016-08-21"));
    assert!(keys.iter().all(|k| *k >= "2016-08-23" && *k <= "2017-08-23"));
    assert_eq!(keys.first(), Some(&"2016-08-23"));
    assert_eq!(keys.last(), Some(&"2017-08-23"));
}

#[test]
fn test_precipitation_values_and_nulls() {
    let (_, body) = get_json(&router(), "/api/v1.0/precipitation");

    // later row in store order wins for shared dates
    assert_eq!(body["2016-08-23"], json!(0.15));
    assert_eq!(body["2017-08-23"], json!(0.08));
    // no measurement that day
    assert_eq!(body["2017-01-01"], Value::Null);
}

#[test]
fn test_precipitation_empty_store_is_500() {
    let (status, body) = get_json(&empty_router(), "/api/v1.0/precipitation");
    assert_eq!(status, 500);
    assert!(body["error"].is_string());
}

// ---------------------------------------------------------------------------
// 3. Stations
// ---------------------------------------------------------------------------

#[test]
fn test_stations_one_entry_per_station_in_store_order() {
    let (status, body) = get_json(&router(), "/api/v1.0/stations");
    assert_eq!(status, 200);
    assert_eq!(
        body,
        json!([
            { "station": "USC00519397", "name": "WAIKIKI 717.2, HI US" },
            { "station": "USC00513117", "name": "KANEOHE 838.1, HI US" },
            { "station": "USC00519523", "name": "WAIMANALO EXPERIMENTAL FARM, HI US" },
        ])
    );
}

#[test]
fn test_stations_empty_store_is_empty_array() {
    let (status, body) = get_json(&empty_router(), "/api/v1.0/stations");
    assert_eq!(status, 200);
    assert_eq!(body, json!([]));
}

// ---------------------------------------------------------------------------
// 4. Tobs
// ---------------------------------------------------------------------------

#[test]
fn test_tobs_returns_most_active_station_year() {
    let (status, body) = get_json(&router(), "/api/v1.0/tobs");
    assert_eq!(status, 200);

    // USC00513117 has 6 rows, all inside the window
    assert_eq!(
        body,
        json!([
            { "data": "2016-08-23", "tobs": 76.0 },
            { "data": "2016-12-31", "tobs": 62.0 },
            { "data": "2017-01-01", "tobs": 60.0 },
            { "data": "2017-01-05", "tobs": 70.0 },
            { "data": "2017-01-06", "tobs": 74.0 },
            { "data": "2017-08-23", "tobs": 82.0 },
        ])
    );
}

#[test]
fn test_tobs_tie_resolves_to_smallest_station_id() {
    let measurements = "station,date,prcp,tobs
USC00519397,2017-08-22,0.0,80
USC00519397,2017-08-23,0.0,81
USC00511918,2017-08-22,0.0,70
USC00511918,2017-08-23,0.0,71
";
    let store = MemoryStore::new(read_observations(measurements.as_bytes()).unwrap(), vec![]);
    let router = Router::new(Arc::new(store));

    for _ in 0..3 {
        let (_, body) = get_json(&router, "/api/v1.0/tobs");
        assert_eq!(
            body,
            json!([
                { "data": "2017-08-22", "tobs": 70.0 },
                { "data": "2017-08-23", "tobs": 71.0 },
            ])
        );
    }
}

#[test]
fn test_tobs_empty_store_is_500() {
    let (status, _) = get_json(&empty_router(), "/api/v1.0/tobs");
    assert_eq!(status, 500);
}

// ---------------------------------------------------------------------------
// 5. Temperature stats
// ---------------------------------------------------------------------------

#[test]
fn test_start_end_range_stats() {
    let (status, body) = get_json(&router(), "/api/v1.0/2017-01-01/2017-01-05");
    assert_eq!(status, 200);

    let parsed: RangeStatsResponse = serde_json::from_value(body.clone()).unwrap();
    assert_eq!(parsed.stats.min_temp, Some(60.0));
    assert_eq!(parsed.stats.avg_temp, Some(65.0));
    assert_eq!(parsed.stats.max_temp, Some(70.0));

    assert_eq!(body["start_date"], "2017-01-01");
    assert_eq!(body["end_date"], "2017-01-05");
}

#[test]
fn test_start_only_stats() {
    let (status, body) = get_json(&router(), "/api/v1.0/2017-01-06");
    assert_eq!(status, 200);
    assert_eq!(
        body,
        json!({ "date": "2017-01-06", "min_temp": 74.0, "avg_temp": 79.0, "max_temp": 82.0 })
    );
}

#[test]
fn test_start_stats_ordering_holds() {
    let router = router();
    for start in ["2016-01-01", "2016-08-23", "2016-12-31", "2017-01-02", "2017-08-23"] {
        let (_, body) = get_json(&router, &format!("/api/v1.0/{}", start));
        let parsed: StartStatsResponse = serde_json::from_value(body).unwrap();
        let (min, avg, max) = (
            parsed.stats.min_temp.unwrap(),
            parsed.stats.avg_temp.unwrap(),
            parsed.stats.max_temp.unwrap(),
        );
        assert!(min <= avg && avg <= max, "{}: {} <= {} <= {}", start, min, avg, max);
    }
}

#[test]
fn test_no_matching_rows_is_all_null() {
    let (status, body) = get_json(&router(), "/api/v1.0/2020-01-01");
    assert_eq!(status, 200);
    assert_eq!(
        body,
        json!({ "date": "2020-01-01", "min_temp": null, "avg_temp": null, "max_temp": null })
    );
}

#[test]
fn test_reversed_range_is_all_null_not_error() {
    let (status, body) = get_json(&router(), "/api/v1.0/2017-01-05/2017-01-01");
    assert_eq!(status, 200);
    assert_eq!(body["min_temp"], Value::Null);
    assert_eq!(body["avg_temp"], Value::Null);
    assert_eq!(body["max_temp"], Value::Null);
}

#[test]
fn test_malformed_start_is_400() {
    let (status, body) = get_json(&router(), "/api/v1.0/not-a-date");
    assert_eq!(status, 400);
    assert!(body["message"].as_str().unwrap().contains("start"));
}

#[test]
fn test_malformed_dates_are_400() {
    let router = router();
    for url in [
        "/api/v1.0/2017-1-01",
        "/api/v1.0/2017-02-30",
        "/api/v1.0/01-01-2017/2017-01-05",
        "/api/v1.0/2017-01-01/tomorrow",
    ] {
        let (status, _) = get_json(&router, url);
        assert_eq!(status, 400, "{} should be rejected", url);
    }
}

#[test]
fn test_router_survives_bad_requests() {
    let router = router();
    let _ = router.route(&Method::Get, "/api/v1.0/not-a-date");
    let _ = router.route(&Method::Delete, "/api/v1.0/stations");
    let _ = router.route(&Method::Get, "/nowhere");

    let (status, _) = get_json(&router, "/api/v1.0/stations");
    assert_eq!(status, 200);
}

// ---------------------------------------------------------------------------
// 6. Store failures
// ---------------------------------------------------------------------------

#[test]
fn test_store_failure_is_500_with_generic_body() {
    let router = Router::new(Arc::new(FailingStore));

    for url in [
        "/api/v1.0/stations",
        "/api/v1.0/2017-01-01",
        "/api/v1.0/2017-01-01/2017-01-05",
        "/api/v1.0/precipitation",
        "/api/v1.0/tobs",
    ] {
        let (status, body) = get_json(&router, url);
        assert_eq!(status, 500, "{} should fail", url);
        assert_eq!(body, json!({ "error": "Internal server error" }), "{} leaked details", url);
    }
}

#[test]
fn test_router_keeps_serving_after_store_failure() {
    let router = Router::new(Arc::new(FailingStore));
    let _ = router.route(&Method::Get, "/api/v1.0/stations");

    let response = router.route(&Method::Get, "/");
    assert_eq!(response.status, 200);

    let (status, _) = get_json(&router, "/api/v1.0/not-a-date");
    assert_eq!(status, 400);
}
