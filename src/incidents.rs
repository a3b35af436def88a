//! Mock incident database.

use crate::models::{Incident, IncidentSeverity, IncidentType};

/// Current incidents in Bangalore. Static demo data.
pub fn mock_incidents() -> Vec<Incident> {
    vec![
        Incident {
            incident_id: "INC001".to_string(),
            incident_type: IncidentType::Accident,
            severity: IncidentSeverity::High,
            location: "Marathahalli Bridge".to_string(),
            description: "Multi-vehicle pile-up on Marathahalli Bridge.".to_string(),
            routes_affected: vec!["Marathahalli Bridge to Silk Board Junction".to_string()],
        },
        Incident {
            incident_id: "INC002".to_string(),
            incident_type: IncidentType::RoadClosure,
            severity: IncidentSeverity::Severe,
            location: "Silk Board Junction".to_string(),
            description: "Silk Board flyover is completely closed.".to_string(),
            routes_affected: vec!["Silk Board Junction to Electronic City Phase 1".to_string()],
        },
        Incident {
            incident_id: "INC003".to_string(),
            incident_type: IncidentType::HeavyTraffic,
            severity: IncidentSeverity::Medium,
            location: "Outer Ring Road (ORR)".to_string(),
            description: "Unusually heavy traffic on the ORR.".to_string(),
            routes_affected: vec!["Manyata Tech Park to Marathahalli Bridge".to_string()],
        },
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hubs::{bangalore_hubs, find_hub};

    #[test]
    fn test_mock_incidents_shape() {
        let incidents = mock_incidents();
        assert_eq!(incidents.len(), 3);

        let ids: Vec<_> = incidents.iter().map(|i| i.incident_id.as_str()).collect();
        assert_eq!(ids, vec!["INC001", "INC002", "INC003"]);
        assert_eq!(incidents[1].severity, IncidentSeverity::Severe);
    }

    #[test]
    fn test_incident_locations_are_known_hubs() {
        let hubs = bangalore_hubs();
        for incident in mock_incidents() {
            assert!(
                find_hub(&hubs, &incident.location).is_some(),
                "unknown location {}",
                incident.location
            );
        }
    }
}
