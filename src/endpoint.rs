/// HTTP endpoint for the climate dataset
///
/// Read-only JSON API over the observation store. Every route is a
/// stateless GET; requests are handled concurrently on a worker pool and
/// share one injected `ClimateStore`.
///
/// Endpoints:
/// - GET /                         - HTML index of the routes below
/// - GET /api/v1.0/precipitation   - trailing-year precipitation by date
/// - GET /api/v1.0/stations        - station list
/// - GET /api/v1.0/tobs            - trailing-year temperatures, most active station
/// - GET /api/v1.0/{start}         - min/avg/max temperature from start
/// - GET /api/v1.0/{start}/{end}   - min/avg/max temperature, start..=end
/// - GET /health                   - service health check

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::io::Cursor;
use std::sync::Arc;
use std::time::Instant;
use thiserror::Error;
use threadpool::ThreadPool;
use tiny_http::{Header, Method, Request, Server, StatusCode};
use tracing::{error, info, warn};

use crate::analysis::climate::{self, QueryError};
use crate::model::{TemperatureStats, parse_iso_date};
use crate::store::ClimateStore;

const API_PREFIX: &str = "/api/v1.0/";

const AVAILABLE_ENDPOINTS: &[&str] = &[
    "/",
    "/api/v1.0/precipitation",
    "/api/v1.0/stations",
    "/api/v1.0/tobs",
    "/api/v1.0/{start}",
    "/api/v1.0/{start}/{end}",
    "/health",
];

const INDEX_HTML: &str = "Welcome to the Climate App!<br/>\
Available Routes:<br/>\
1. /api/v1.0/precipitation - Precipitation data for the last 12 months<br/>\
2. /api/v1.0/stations - List of stations<br/>\
3. /api/v1.0/tobs - Temperature observations for the last 12 months<br/>\
4. /api/v1.0/start_date - Minimum temperature, average temperature, and maximum temperature for a specified start date<br/>\
5. /api/v1.0/start_date/end_date - Minimum temperature, average temperature, and maximum temperature for a specified start and end date<br/>";

const CONTENT_TYPE_JSON: &str = "application/json";
const CONTENT_TYPE_HTML: &str = "text/html; charset=utf-8";

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Per-request failure, mapped onto an HTTP status by `status_code`.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("invalid {param} date '{value}': expected YYYY-MM-DD")]
    MalformedDate { param: &'static str, value: String },

    #[error("no route for {0}")]
    NotFound(String),

    #[error("method {0} not allowed")]
    MethodNotAllowed(String),

    #[error(transparent)]
    Query(#[from] QueryError),

    #[error("failed to serialize response: {0}")]
    Serialize(#[from] serde_json::Error),
}

impl ApiError {
    pub fn status_code(&self) -> u16 {
        match self {
            ApiError::MalformedDate { .. } => 400,
            ApiError::NotFound(_) => 404,
            ApiError::MethodNotAllowed(_) => 405,
            ApiError::Query(_) | ApiError::Serialize(_) => 500,
        }
    }
}

/// Failure starting the HTTP listener.
#[derive(Debug, Error)]
pub enum ServerError {
    #[error("failed to start HTTP server on {addr}: {source}")]
    Bind {
        addr: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },
}

// ---------------------------------------------------------------------------
// Response Types
// ---------------------------------------------------------------------------

/// Temperature aggregate fields; all three are null together when no rows
/// matched.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TemperatureStatsData {
    pub min_temp: Option<f64>,
    pub avg_temp: Option<f64>,
    pub max_temp: Option<f64>,
}

impl From<Option<TemperatureStats>> for TemperatureStatsData {
    fn from(stats: Option<TemperatureStats>) -> Self {
        TemperatureStatsData {
            min_temp: stats.map(|s| s.min),
            avg_temp: stats.map(|s| s.avg),
            max_temp: stats.map(|s| s.max),
        }
    }
}

/// Response for /api/v1.0/{start}
#[derive(Debug, Serialize, Deserialize)]
pub struct StartStatsResponse {
    pub date: NaiveDate,
    #[serde(flatten)]
    pub stats: TemperatureStatsData,
}

/// Response for /api/v1.0/{start}/{end}
#[derive(Debug, Serialize, Deserialize)]
pub struct RangeStatsResponse {
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    #[serde(flatten)]
    pub stats: TemperatureStatsData,
}

/// A fully rendered response, independent of the HTTP library.
#[derive(Debug, Clone, PartialEq)]
pub struct EndpointResponse {
    pub status: u16,
    pub content_type: &'static str,
    pub body: String,
}

impl EndpointResponse {
    fn json<T: Serialize>(status: u16, value: &T) -> Result<Self, ApiError> {
        Ok(EndpointResponse {
            status,
            content_type: CONTENT_TYPE_JSON,
            body: serde_json::to_string_pretty(value)?,
        })
    }

    fn html(body: &str) -> Self {
        EndpointResponse {
            status: 200,
            content_type: CONTENT_TYPE_HTML,
            body: body.to_string(),
        }
    }

    fn into_http(self) -> tiny_http::Response<Cursor<Vec<u8>>> {
        let response = tiny_http::Response::from_data(self.body.into_bytes())
            .with_status_code(StatusCode::from(self.status));

        match Header::from_bytes(&b"Content-Type"[..], self.content_type.as_bytes()) {
            Ok(header) => response.with_header(header),
            Err(()) => response,
        }
    }
}

// ---------------------------------------------------------------------------
// Routing
// ---------------------------------------------------------------------------

/// Maps requests onto query-layer calls against an injected store.
#[derive(Clone)]
pub struct Router {
    store: Arc<dyn ClimateStore>,
}

impl Router {
    pub fn new(store: Arc<dyn ClimateStore>) -> Self {
        Self { store }
    }

    /// Routes one request. Never fails: errors become JSON error responses.
    pub fn route(&self, method: &Method, url: &str) -> EndpointResponse {
        match self.dispatch(method, url) {
            Ok(response) => response,
            Err(e) => error_response(&e),
        }
    }

    fn dispatch(&self, method: &Method, url: &str) -> Result<EndpointResponse, ApiError> {
        if *method != Method::Get {
            return Err(ApiError::MethodNotAllowed(method.to_string()));
        }

        let path = url.split('?').next().unwrap_or(url);
        let store = self.store.as_ref();

        match path {
            "/" => return Ok(EndpointResponse::html(INDEX_HTML)),
            "/health" => return handle_health(),
            _ => {}
        }

        let Some(rest) = path.strip_prefix(API_PREFIX) else {
            return Err(ApiError::NotFound(path.to_string()));
        };

        let segments: Vec<&str> = rest.split('/').collect();
        match segments.as_slice() {
            ["precipitation"] => {
                EndpointResponse::json(200, &climate::trailing_year_precipitation(store)?)
            }
            ["stations"] => EndpointResponse::json(200, &climate::list_stations(store)?),
            ["tobs"] => {
                EndpointResponse::json(200, &climate::most_active_station_temperatures(store)?)
            }
            [start] if !start.is_empty() => handle_start(store, start),
            [start, end] if !start.is_empty() && !end.is_empty() => {
                handle_start_end(store, start, end)
            }
            _ => Err(ApiError::NotFound(path.to_string())),
        }
    }
}

/// Handle /health endpoint
fn handle_health() -> Result<EndpointResponse, ApiError> {
    EndpointResponse::json(
        200,
        &serde_json::json!({
            "status": "ok",
            "service": env!("CARGO_PKG_NAME"),
            "version": env!("CARGO_PKG_VERSION"),
        }),
    )
}

/// Handle /api/v1.0/{start} endpoint
fn handle_start(store: &dyn ClimateStore, start: &str) -> Result<EndpointResponse, ApiError> {
    let start_date = parse_date_param("start", start)?;
    let stats = climate::temperature_stats(store, start_date, None)?;

    EndpointResponse::json(
        200,
        &StartStatsResponse {
            date: start_date,
            stats: stats.into(),
        },
    )
}

/// Handle /api/v1.0/{start}/{end} endpoint
fn handle_start_end(
    store: &dyn ClimateStore,
    start: &str,
    end: &str,
) -> Result<EndpointResponse, ApiError> {
    let start_date = parse_date_param("start", start)?;
    let end_date = parse_date_param("end", end)?;
    let stats = climate::temperature_stats(store, start_date, Some(end_date))?;

    EndpointResponse::json(
        200,
        &RangeStatsResponse {
            start_date,
            end_date,
            stats: stats.into(),
        },
    )
}

fn parse_date_param(param: &'static str, value: &str) -> Result<NaiveDate, ApiError> {
    parse_iso_date(value).ok_or_else(|| ApiError::MalformedDate {
        param,
        value: value.to_string(),
    })
}

/// Renders an error as JSON. Server-side details are logged, not returned.
fn error_response(e: &ApiError) -> EndpointResponse {
    let status = e.status_code();

    let body = match e {
        ApiError::NotFound(_) => serde_json::json!({
            "error": "Not found",
            "message": e.to_string(),
            "available_endpoints": AVAILABLE_ENDPOINTS,
        }),
        ApiError::MalformedDate { .. } => serde_json::json!({
            "error": "Bad request",
            "message": e.to_string(),
        }),
        ApiError::MethodNotAllowed(_) => serde_json::json!({
            "error": "Method not allowed",
            "message": e.to_string(),
        }),
        ApiError::Query(_) | ApiError::Serialize(_) => {
            error!(error = %e, "request failed");
            serde_json::json!({ "error": "Internal server error" })
        }
    };

    EndpointResponse {
        status,
        content_type: CONTENT_TYPE_JSON,
        body: body.to_string(),
    }
}

// ---------------------------------------------------------------------------
// HTTP Server
// ---------------------------------------------------------------------------

/// Start HTTP endpoint server on `addr`, handling requests on `workers`
/// threads. Blocks for the life of the server.
pub fn start_endpoint_server(addr: &str, workers: usize, router: Router) -> Result<(), ServerError> {
    let server = Server::http(addr).map_err(|source| ServerError::Bind {
        addr: addr.to_string(),
        source,
    })?;
    let pool = ThreadPool::new(workers.max(1));

    info!(addr, workers, "HTTP endpoint listening");
    for endpoint in AVAILABLE_ENDPOINTS {
        info!("   GET {}", endpoint);
    }

    for request in server.incoming_requests() {
        let router = router.clone();
        pool.execute(move || handle_request(&router, request));
    }

    Ok(())
}

fn handle_request(router: &Router, request: Request) {
    let started = Instant::now();
    let method = request.method().clone();
    let url = request.url().to_string();

    let response = router.route(&method, &url);
    let status = response.status;

    if let Err(e) = request.respond(response.into_http()) {
        warn!(%method, url = %url, error = %e, "failed to send response");
        return;
    }

    info!(
        %method,
        url = %url,
        status,
        elapsed_ms = started.elapsed().as_millis() as u64,
        "request handled"
    );
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ingest::fixtures::fixture_store;
    use crate::store::MemoryStore;

    fn fixture_router() -> Router {
        Router::new(Arc::new(fixture_store()))
    }

    fn get(router: &Router, url: &str) -> (u16, serde_json::Value) {
        let response = router.route(&Method::Get, url);
        assert_eq!(response.content_type, CONTENT_TYPE_JSON);
        let json = serde_json::from_str(&response.body).expect("body should be JSON");
        (response.status, json)
    }

    #[test]
    fn test_index_is_html() {
        let response = fixture_router().route(&Method::Get, "/");
        assert_eq!(response.status, 200);
        assert_eq!(response.content_type, CONTENT_TYPE_HTML);
        assert!(response.body.contains("/api/v1.0/precipitation"));
    }

    #[test]
    fn test_fixed_routes_win_over_start_param() {
        let router = fixture_router();
        let (status, json) = get(&router, "/api/v1.0/stations");
        assert_eq!(status, 200);
        assert!(json.is_array());

        let (status, json) = get(&router, "/api/v1.0/precipitation");
        assert_eq!(status, 200);
        assert!(json.is_object());
    }

    #[test]
    fn test_query_string_is_ignored() {
        let (status, _) = get(&fixture_router(), "/api/v1.0/stations?format=json");
        assert_eq!(status, 200);
    }

    #[test]
    fn test_malformed_end_names_end_param() {
        let (status, json) = get(&fixture_router(), "/api/v1.0/2017-01-01/2017-1-5");
        assert_eq!(status, 400);
        let message = json["message"].as_str().unwrap();
        assert!(message.contains("end"), "message should name the end param: {}", message);
        assert!(message.contains("2017-1-5"));
    }

    #[test]
    fn test_unknown_paths_are_404() {
        let router = fixture_router();
        for url in ["/api/v1.0/", "/api/v1.0/stations/", "/api/v1.0/a/b/c", "/nope", "/api/v2.0/tobs"] {
            let (status, json) = get(&router, url);
            assert_eq!(status, 404, "{} should be 404", url);
            assert!(json["available_endpoints"].is_array());
        }
    }

    #[test]
    fn test_non_get_is_405() {
        let response = fixture_router().route(&Method::Post, "/api/v1.0/stations");
        assert_eq!(response.status, 405);
    }

    #[test]
    fn test_empty_store_precipitation_is_generic_500() {
        let router = Router::new(Arc::new(MemoryStore::default()));
        let (status, json) = get(&router, "/api/v1.0/precipitation");
        assert_eq!(status, 500);
        assert_eq!(json, serde_json::json!({ "error": "Internal server error" }));
    }

    #[test]
    fn test_stats_data_from_none_is_all_null() {
        let data = TemperatureStatsData::from(None);
        assert_eq!(data.min_temp, None);
        assert_eq!(data.avg_temp, None);
        assert_eq!(data.max_temp, None);
    }

    #[test]
    fn test_health() {
        let (status, json) = get(&fixture_router(), "/health");
        assert_eq!(status, 200);
        assert_eq!(json["status"], "ok");
        assert_eq!(json["service"], "climate_service");
    }
}
