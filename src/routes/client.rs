//! Route-matrix client for the Google Routes API.
//!
//! Every hub is sent as both an origin and a destination. Large hub lists
//! are split into batches that fit the per-request element limit and
//! fetched concurrently.

use crate::models::Hub;
use chrono::{DateTime, SecondsFormat, Utc};
use futures::future::try_join_all;
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, info};

/// Only the fields the aggregator consumes.
pub const FIELD_MASK: &str = "originIndex,destinationIndex,duration,staticDuration,status";

const MATRIX_PATH: &str = "/distanceMatrix/v2:computeRouteMatrix";

/// Errors from the route-matrix API.
#[derive(Debug, Error)]
pub enum RoutesError {
    #[error("no Routes API key configured (set GOOGLE_MAPS_API_KEY or [routes].api_key)")]
    MissingApiKey,

    #[error("failed to build HTTP client: {0}")]
    Client(#[source] reqwest::Error),

    #[error("route matrix request timed out after {0}s")]
    Timeout(u64),

    #[error("cannot connect to Routes API at {0}")]
    Connect(String),

    #[error("route matrix request failed: {0}")]
    Request(#[source] reqwest::Error),

    #[error("Routes API error {status}: {body}")]
    Api { status: StatusCode, body: String },

    #[error("failed to parse route matrix response: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("malformed duration: {0:?}")]
    InvalidDuration(String),
}

/// Settings for the route-matrix client.
#[derive(Debug, Clone)]
pub struct RoutesClientConfig {
    pub api_key: Option<String>,
    pub base_url: String,
    pub timeout_seconds: u64,
    /// Upper bound on origins × destinations per request.
    pub max_elements_per_request: usize,
}

impl Default for RoutesClientConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: "https://routes.googleapis.com".to_string(),
            timeout_seconds: 60,
            max_elements_per_request: 625,
        }
    }
}

/// One origin/destination pair from the matrix.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RouteElement {
    pub origin_index: usize,
    pub destination_index: usize,
    /// Traffic-aware travel time.
    pub duration_secs: u64,
    /// Travel time without traffic.
    pub static_duration_secs: u64,
    /// `google.rpc.Code`; 0 is OK.
    pub status_code: i32,
}

impl RouteElement {
    pub fn is_ok(&self) -> bool {
        self.status_code == 0
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct MatrixRequest<'a> {
    origins: Vec<MatrixWaypoint>,
    destinations: Vec<MatrixWaypoint>,
    travel_mode: &'a str,
    routing_preference: &'a str,
    departure_time: String,
}

#[derive(Debug, Serialize)]
struct MatrixWaypoint {
    waypoint: Waypoint,
}

#[derive(Debug, Serialize)]
struct Waypoint {
    location: Location,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct Location {
    lat_lng: LatLng,
}

#[derive(Debug, Serialize)]
struct LatLng {
    latitude: f64,
    longitude: f64,
}

impl From<&Hub> for MatrixWaypoint {
    fn from(hub: &Hub) -> Self {
        Self {
            waypoint: Waypoint {
                location: Location {
                    lat_lng: LatLng {
                        latitude: hub.coords.lat,
                        longitude: hub.coords.lng,
                    },
                },
            },
        }
    }
}

// Proto3 JSON omits zero-valued fields, so everything defaults.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawElement {
    #[serde(default)]
    origin_index: usize,
    #[serde(default)]
    destination_index: usize,
    #[serde(default)]
    status: RawStatus,
    #[serde(default)]
    duration: Option<String>,
    #[serde(default)]
    static_duration: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct RawStatus {
    #[serde(default)]
    code: i32,
}

impl TryFrom<RawElement> for RouteElement {
    type Error = RoutesError;

    fn try_from(raw: RawElement) -> Result<Self, Self::Error> {
        Ok(Self {
            origin_index: raw.origin_index,
            destination_index: raw.destination_index,
            duration_secs: parse_duration_secs(raw.duration.as_deref())?,
            static_duration_secs: parse_duration_secs(raw.static_duration.as_deref())?,
            status_code: raw.status.code,
        })
    }
}

/// Parse a protobuf JSON duration such as `"754s"` into whole seconds.
fn parse_duration_secs(value: Option<&str>) -> Result<u64, RoutesError> {
    let Some(value) = value else {
        return Ok(0);
    };

    let invalid = || RoutesError::InvalidDuration(value.to_string());
    let digits = value.strip_suffix('s').ok_or_else(invalid)?;
    let whole = digits.split_once('.').map_or(digits, |(whole, _)| whole);

    whole.parse::<u64>().map_err(|_| invalid())
}

/// Parse a `computeRouteMatrix` response body.
pub fn parse_matrix_response(body: &str) -> Result<Vec<RouteElement>, RoutesError> {
    let raw: Vec<RawElement> = serde_json::from_str(body)?;
    raw.into_iter().map(RouteElement::try_from).collect()
}

/// A contiguous block of the full matrix.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Batch {
    origin_offset: usize,
    origin_count: usize,
    destination_offset: usize,
    destination_count: usize,
}

fn plan_batches(hub_count: usize, max_elements: usize) -> Vec<Batch> {
    let max_elements = max_elements.max(1);
    let destination_chunk = hub_count.min(max_elements).max(1);
    let origin_chunk = (max_elements / destination_chunk).max(1);

    let mut batches = Vec::new();
    for origin_offset in (0..hub_count).step_by(origin_chunk) {
        for destination_offset in (0..hub_count).step_by(destination_chunk) {
            batches.push(Batch {
                origin_offset,
                origin_count: origin_chunk.min(hub_count - origin_offset),
                destination_offset,
                destination_count: destination_chunk.min(hub_count - destination_offset),
            });
        }
    }
    batches
}

/// Client for the route-matrix endpoint.
pub struct RoutesClient {
    config: RoutesClientConfig,
    http_client: reqwest::Client,
}

impl RoutesClient {
    pub fn new(config: RoutesClientConfig) -> Result<Self, RoutesError> {
        let http_client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .build()
            .map_err(RoutesError::Client)?;

        Ok(Self {
            config,
            http_client,
        })
    }

    /// Fetch the full hub × hub matrix for a departure time.
    ///
    /// Indices in the returned elements refer to positions in `hubs`.
    pub async fn compute_route_matrix(
        &self,
        hubs: &[Hub],
        departure_time: DateTime<Utc>,
    ) -> Result<Vec<RouteElement>, RoutesError> {
        let api_key = self
            .config
            .api_key
            .as_deref()
            .filter(|k| !k.is_empty())
            .ok_or(RoutesError::MissingApiKey)?;

        if hubs.is_empty() {
            return Ok(Vec::new());
        }

        let batches = plan_batches(hubs.len(), self.config.max_elements_per_request);
        info!(
            "Requesting {}x{} route matrix for {} in {} batch(es)",
            hubs.len(),
            hubs.len(),
            departure_time,
            batches.len()
        );

        let requests = batches
            .iter()
            .map(|batch| self.fetch_batch(api_key, hubs, *batch, departure_time));
        let results = try_join_all(requests).await?;

        let elements: Vec<RouteElement> = results.into_iter().flatten().collect();
        info!("Received {} route elements", elements.len());

        Ok(elements)
    }

    async fn fetch_batch(
        &self,
        api_key: &str,
        hubs: &[Hub],
        batch: Batch,
        departure_time: DateTime<Utc>,
    ) -> Result<Vec<RouteElement>, RoutesError> {
        let origins = &hubs[batch.origin_offset..batch.origin_offset + batch.origin_count];
        let destinations =
            &hubs[batch.destination_offset..batch.destination_offset + batch.destination_count];

        let request = MatrixRequest {
            origins: origins.iter().map(MatrixWaypoint::from).collect(),
            destinations: destinations.iter().map(MatrixWaypoint::from).collect(),
            travel_mode: "DRIVE",
            routing_preference: "TRAFFIC_AWARE",
            departure_time: departure_time.to_rfc3339_opts(SecondsFormat::Secs, true),
        };

        let url = format!("{}{}", self.config.base_url.trim_end_matches('/'), MATRIX_PATH);
        debug!("POST {} ({:?})", url, batch);

        let response = self
            .http_client
            .post(&url)
            .header("X-Goog-Api-Key", api_key)
            .header("X-Goog-FieldMask", FIELD_MASK)
            .json(&request)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    RoutesError::Timeout(self.config.timeout_seconds)
                } else if e.is_connect() {
                    RoutesError::Connect(self.config.base_url.clone())
                } else {
                    RoutesError::Request(e)
                }
            })?;

        let status = response.status();
        let body = response.text().await.map_err(RoutesError::Request)?;
        if !status.is_success() {
            return Err(RoutesError::Api { status, body });
        }

        let mut elements = parse_matrix_response(&body)?;
        for element in &mut elements {
            element.origin_index += batch.origin_offset;
            element.destination_index += batch.destination_offset;
        }

        Ok(elements)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hubs::bangalore_hubs;
    use chrono::TimeZone;
    use serde_json::json;
    use wiremock::matchers::{body_partial_json, header, headers, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const FIXTURE: &str = include_str!("../../fixtures/route_matrix.json");

    fn test_config(base_url: &str) -> RoutesClientConfig {
        RoutesClientConfig {
            api_key: Some("test-key".to_string()),
            base_url: base_url.to_string(),
            timeout_seconds: 5,
            max_elements_per_request: 625,
        }
    }

    fn departure() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 7, 27, 17, 0, 0).unwrap()
    }

    #[test]
    fn test_parse_duration() {
        assert_eq!(parse_duration_secs(Some("754s")).unwrap(), 754);
        assert_eq!(parse_duration_secs(Some("1800.4s")).unwrap(), 1800);
        assert_eq!(parse_duration_secs(Some("0s")).unwrap(), 0);
        assert_eq!(parse_duration_secs(None).unwrap(), 0);
        assert!(parse_duration_secs(Some("754")).is_err());
        assert!(parse_duration_secs(Some("-5s")).is_err());
    }

    #[test]
    fn test_parse_fixture_defaults_omitted_fields() {
        let elements = parse_matrix_response(FIXTURE).unwrap();
        assert_eq!(elements.len(), 9);

        // Omitted originIndex / destinationIndex mean 0.
        assert_eq!(elements[2].origin_index, 0);
        assert_eq!(elements[2].destination_index, 0);

        let failed = &elements[5];
        assert!(!failed.is_ok());
        assert_eq!(failed.status_code, 5);
        assert_eq!(failed.duration_secs, 0);
    }

    #[test]
    fn test_plan_batches_single_request() {
        let batches = plan_batches(19, 625);
        assert_eq!(batches.len(), 1);
        assert_eq!(batches[0].origin_count, 19);
        assert_eq!(batches[0].destination_count, 19);
    }

    #[test]
    fn test_plan_batches_covers_matrix() {
        let batches = plan_batches(30, 625);
        // 625 / 30 = 20 origins per batch.
        assert_eq!(batches.len(), 2);
        assert_eq!(batches[1].origin_offset, 20);
        assert_eq!(batches[1].origin_count, 10);

        let covered: usize = batches
            .iter()
            .map(|b| b.origin_count * b.destination_count)
            .sum();
        assert_eq!(covered, 900);
        assert!(batches
            .iter()
            .all(|b| b.origin_count * b.destination_count <= 625));
    }

    #[test]
    fn test_plan_batches_splits_destinations_when_needed() {
        let batches = plan_batches(5, 3);
        assert!(batches.iter().all(|b| b.origin_count * b.destination_count <= 3));

        let covered: usize = batches
            .iter()
            .map(|b| b.origin_count * b.destination_count)
            .sum();
        assert_eq!(covered, 25);
    }

    #[tokio::test]
    async fn test_compute_route_matrix_sends_expected_request() {
        let mock_server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path(MATRIX_PATH))
            .and(header("X-Goog-Api-Key", "test-key"))
            .and(headers("X-Goog-FieldMask", FIELD_MASK.split(',').collect()))
            .and(body_partial_json(json!({
                "travelMode": "DRIVE",
                "routingPreference": "TRAFFIC_AWARE",
                "departureTime": "2025-07-27T17:00:00Z"
            })))
            .respond_with(ResponseTemplate::new(200).set_body_string(FIXTURE))
            .expect(1)
            .mount(&mock_server)
            .await;

        let client = RoutesClient::new(test_config(&mock_server.uri())).unwrap();
        let hubs = bangalore_hubs();
        let elements = client
            .compute_route_matrix(&hubs[..3], departure())
            .await
            .unwrap();

        assert_eq!(elements.len(), 9);
    }

    #[tokio::test]
    async fn test_compute_route_matrix_offsets_batched_indices() {
        let mock_server = MockServer::start().await;

        let batch_body = json!([
            {"destinationIndex": 1, "status": {}, "duration": "120s", "staticDuration": "100s"}
        ]);

        Mock::given(method("POST"))
            .and(path(MATRIX_PATH))
            .respond_with(ResponseTemplate::new(200).set_body_json(batch_body))
            .expect(3)
            .mount(&mock_server)
            .await;

        let mut config = test_config(&mock_server.uri());
        config.max_elements_per_request = 3;
        let client = RoutesClient::new(config).unwrap();

        let hubs = bangalore_hubs();
        let mut elements = client
            .compute_route_matrix(&hubs[..3], departure())
            .await
            .unwrap();
        elements.sort_by_key(|e| e.origin_index);

        let origins: Vec<_> = elements.iter().map(|e| e.origin_index).collect();
        assert_eq!(origins, vec![0, 1, 2]);
    }

    #[tokio::test]
    async fn test_compute_route_matrix_api_error() {
        let mock_server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path(MATRIX_PATH))
            .respond_with(
                ResponseTemplate::new(403).set_body_string("API key not valid."),
            )
            .mount(&mock_server)
            .await;

        let client = RoutesClient::new(test_config(&mock_server.uri())).unwrap();
        let hubs = bangalore_hubs();
        let err = client
            .compute_route_matrix(&hubs[..2], departure())
            .await
            .unwrap_err();

        match err {
            RoutesError::Api { status, body } => {
                assert_eq!(status, StatusCode::FORBIDDEN);
                assert!(body.contains("API key not valid"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn test_missing_api_key() {
        let mut config = RoutesClientConfig::default();
        config.api_key = Some(String::new());
        let client = RoutesClient::new(config).unwrap();

        let err = client
            .compute_route_matrix(&bangalore_hubs(), departure())
            .await
            .unwrap_err();
        assert!(matches!(err, RoutesError::MissingApiKey));
    }
}
