//! Data models for the traffic agent.
//!
//! This module contains the core data structures shared by the route
//! client, the aggregator, the agent tools and the heatmap builder.

use serde::{Deserialize, Serialize};
use std::fmt;

/// A latitude/longitude pair.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coords {
    pub lat: f64,
    pub lng: f64,
}

impl Coords {
    pub const fn new(lat: f64, lng: f64) -> Self {
        Self { lat, lng }
    }
}

/// A named point used as both origin and destination of route queries.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Hub {
    pub name: String,
    #[serde(flatten)]
    pub coords: Coords,
}

impl Hub {
    pub fn new(name: impl Into<String>, lat: f64, lng: f64) -> Self {
        Self {
            name: name.into(),
            coords: Coords::new(lat, lng),
        }
    }
}

/// Average delay for one origin hub across all of its delayed routes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HubAverage {
    pub hub_name: String,
    pub coords: Coords,
    /// Rounded to two decimals.
    pub average_delay_percent: f64,
}

/// A single weighted point for the visualization layer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HeatmapPoint {
    pub location: Coords,
    pub weight: f64,
}

/// Kind of a reported incident.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum IncidentType {
    Accident,
    RoadClosure,
    HeavyTraffic,
    #[serde(untagged)]
    Other(String),
}

impl fmt::Display for IncidentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IncidentType::Accident => write!(f, "ACCIDENT"),
            IncidentType::RoadClosure => write!(f, "ROAD_CLOSURE"),
            IncidentType::HeavyTraffic => write!(f, "HEAVY_TRAFFIC"),
            IncidentType::Other(s) => write!(f, "{}", s),
        }
    }
}

impl IncidentType {
    /// Multiplier applied on top of the severity weight.
    pub fn weight_factor(&self) -> f64 {
        match self {
            IncidentType::RoadClosure => 1.5,
            IncidentType::Accident => 1.25,
            IncidentType::HeavyTraffic | IncidentType::Other(_) => 1.0,
        }
    }
}

/// Severity level of an incident.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum IncidentSeverity {
    Low,
    Medium,
    High,
    Severe,
}

impl fmt::Display for IncidentSeverity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IncidentSeverity::Low => write!(f, "LOW"),
            IncidentSeverity::Medium => write!(f, "MEDIUM"),
            IncidentSeverity::High => write!(f, "HIGH"),
            IncidentSeverity::Severe => write!(f, "SEVERE"),
        }
    }
}

impl IncidentSeverity {
    /// Base heatmap weight for this severity.
    pub fn base_weight(&self) -> f64 {
        match self {
            IncidentSeverity::Low => 25.0,
            IncidentSeverity::Medium => 50.0,
            IncidentSeverity::High => 75.0,
            IncidentSeverity::Severe => 100.0,
        }
    }
}

/// A traffic incident at a named location.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Incident {
    pub incident_id: String,
    #[serde(rename = "type")]
    pub incident_type: IncidentType,
    pub severity: IncidentSeverity,
    /// Hub name the incident is reported at.
    pub location: String,
    pub description: String,
    /// Routes in "<origin> to <destination>" form.
    pub routes_affected: Vec<String>,
}

impl Incident {
    /// Heatmap weight derived from severity and type.
    pub fn weight(&self) -> f64 {
        self.severity.base_weight() * self.incident_type.weight_factor()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_severity_ordering() {
        assert!(IncidentSeverity::Low < IncidentSeverity::Medium);
        assert!(IncidentSeverity::Medium < IncidentSeverity::High);
        assert!(IncidentSeverity::High < IncidentSeverity::Severe);
    }

    #[test]
    fn test_incident_type_wire_names() {
        let json = serde_json::to_string(&IncidentType::RoadClosure).unwrap();
        assert_eq!(json, "\"ROAD_CLOSURE\"");

        let parsed: IncidentType = serde_json::from_str("\"HEAVY_TRAFFIC\"").unwrap();
        assert_eq!(parsed, IncidentType::HeavyTraffic);

        let other: IncidentType = serde_json::from_str("\"PROTEST\"").unwrap();
        assert_eq!(other, IncidentType::Other("PROTEST".to_string()));
        assert_eq!(other.to_string(), "PROTEST");
    }

    #[test]
    fn test_incident_serializes_type_key() {
        let incident = Incident {
            incident_id: "INC900".to_string(),
            incident_type: IncidentType::Accident,
            severity: IncidentSeverity::Low,
            location: "MG Road".to_string(),
            description: "Minor collision.".to_string(),
            routes_affected: vec![],
        };
        let value = serde_json::to_value(&incident).unwrap();
        assert_eq!(value["type"], "ACCIDENT");
        assert_eq!(value["severity"], "LOW");
        assert!(value.get("incident_type").is_none());
    }

    #[test]
    fn test_incident_weight() {
        let mut incident = Incident {
            incident_id: "INC901".to_string(),
            incident_type: IncidentType::RoadClosure,
            severity: IncidentSeverity::Severe,
            location: "HSR Layout".to_string(),
            description: String::new(),
            routes_affected: vec![],
        };
        assert_eq!(incident.weight(), 150.0);

        incident.incident_type = IncidentType::HeavyTraffic;
        incident.severity = IncidentSeverity::Medium;
        assert_eq!(incident.weight(), 50.0);
    }

    #[test]
    fn test_hub_serializes_flat_coords() {
        let hub = Hub::new("MG Road", 12.9753, 77.6049);
        let value = serde_json::to_value(&hub).unwrap();
        assert_eq!(value["name"], "MG Road");
        assert_eq!(value["lat"], 12.9753);
        assert_eq!(value["lng"], 77.6049);
    }
}
