//! Deterministic heatmap construction.
//!
//! Used when no LLM is involved: hub averages become points weighted by
//! their delay, incidents become points at their hub weighted by severity
//! and type.

use crate::hubs::find_hub;
use crate::models::{HeatmapPoint, Hub, HubAverage, Incident};
use tracing::warn;

/// One point per hub average.
pub fn hub_points(averages: &[HubAverage]) -> Vec<HeatmapPoint> {
    averages
        .iter()
        .map(|avg| HeatmapPoint {
            location: avg.coords,
            weight: avg.average_delay_percent,
        })
        .collect()
}

/// One point per incident at a known hub.
pub fn incident_points(incidents: &[Incident], hubs: &[Hub]) -> Vec<HeatmapPoint> {
    incidents
        .iter()
        .filter_map(|incident| match find_hub(hubs, &incident.location) {
            Some(hub) => Some(HeatmapPoint {
                location: hub.coords,
                weight: incident.weight(),
            }),
            None => {
                warn!(
                    "Dropping incident {} at unknown location {:?}",
                    incident.incident_id, incident.location
                );
                None
            }
        })
        .collect()
}

/// Hub congestion points followed by incident points.
pub fn build_heatmap(
    averages: &[HubAverage],
    incidents: &[Incident],
    hubs: &[Hub],
) -> Vec<HeatmapPoint> {
    let mut points = hub_points(averages);
    points.extend(incident_points(incidents, hubs));
    points
}
