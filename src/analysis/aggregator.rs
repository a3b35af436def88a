//! Delay aggregation.
//!
//! Turns raw route-matrix elements into per-hub average delay
//! percentages.

use crate::models::{Hub, HubAverage};
use crate::routes::RouteElement;
use std::collections::HashMap;
use tracing::{debug, warn};

/// A route from one hub whose live duration exceeds the static one.
#[derive(Debug, Clone, PartialEq)]
pub struct DelayedRoute {
    pub origin_name: String,
    pub delay_percent: f64,
}

/// Percentage by which live travel time exceeds the no-traffic time.
///
/// Returns `None` when the static duration is not positive.
pub fn delay_percent(duration_secs: u64, static_duration_secs: u64) -> Option<f64> {
    let static_minutes = static_duration_secs as f64 / 60.0;
    if static_minutes <= 0.0 {
        return None;
    }

    let live_minutes = duration_secs as f64 / 60.0;
    Some((live_minutes - static_minutes) / static_minutes * 100.0)
}

/// Keep successful routes with a strictly positive delay.
pub fn collect_delayed_routes(elements: &[RouteElement], hubs: &[Hub]) -> Vec<DelayedRoute> {
    let mut routes = Vec::new();

    for element in elements.iter().filter(|e| e.is_ok()) {
        let Some(delay) = delay_percent(element.duration_secs, element.static_duration_secs)
        else {
            continue;
        };
        if delay <= 0.0 {
            continue;
        }

        let Some(origin) = hubs.get(element.origin_index) else {
            warn!(
                "Skipping route with unknown origin index {}",
                element.origin_index
            );
            continue;
        };

        routes.push(DelayedRoute {
            origin_name: origin.name.clone(),
            delay_percent: delay,
        });
    }

    debug!(
        "{} of {} routes are delayed",
        routes.len(),
        elements.len()
    );
    routes
}

/// Average delayed routes per origin hub, in first-appearance order.
pub fn aggregate_hub_delays(routes: &[DelayedRoute], hubs: &[Hub]) -> Vec<HubAverage> {
    let mut order: Vec<&str> = Vec::new();
    let mut totals: HashMap<&str, (f64, usize)> = HashMap::new();

    for route in routes {
        let entry = totals.entry(route.origin_name.as_str()).or_insert_with(|| {
            order.push(route.origin_name.as_str());
            (0.0, 0)
        });
        entry.0 += route.delay_percent;
        entry.1 += 1;
    }

    order
        .into_iter()
        .filter_map(|name| {
            let hub = hubs.iter().find(|h| h.name == name)?;
            let (total, count) = totals[name];
            Some(HubAverage {
                hub_name: name.to_string(),
                coords: hub.coords,
                average_delay_percent: round2(total / count as f64),
            })
        })
        .collect()
}

/// Full pipeline from matrix elements to hub averages.
pub fn hub_delay_report(elements: &[RouteElement], hubs: &[Hub]) -> Vec<HubAverage> {
    let routes = collect_delayed_routes(elements, hubs);
    aggregate_hub_delays(&routes, hubs)
}

/// Two decimals, exact ties to even.
fn round2(value: f64) -> f64 {
    (value * 100.0).round_ties_even() / 100.0
}
