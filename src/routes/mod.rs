//! Route-matrix access.

pub mod client;

pub use client::{RouteElement, RoutesClient, RoutesClientConfig, RoutesError};

use crate::analysis::hub_delay_report;
use crate::models::{Hub, HubAverage};
use chrono::{DateTime, Utc};

/// Fetch the matrix for `hubs` and reduce it to per-hub averages.
pub async fn fetch_hub_averages(
    client: &RoutesClient,
    hubs: &[Hub],
    departure_time: DateTime<Utc>,
) -> Result<Vec<HubAverage>, RoutesError> {
    let elements = client.compute_route_matrix(hubs, departure_time).await?;
    Ok(hub_delay_report(&elements, hubs))
}
