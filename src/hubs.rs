//! Built-in catalog of Bangalore traffic hubs.

use crate::models::Hub;
use anyhow::{bail, Result};
use std::collections::HashSet;

/// Hub names and coordinates, in request order.
const BANGALORE_HUBS: &[(&str, f64, f64)] = &[
    ("Silk Board Junction", 12.9165, 77.6206),
    ("Marathahalli Bridge", 12.9569, 77.7011),
    ("KR Puram Hanging Bridge", 12.9950, 77.6800),
    ("Hebbal Flyover", 13.0400, 77.5900),
    ("Tin Factory Junction", 12.9915, 77.6698),
    ("Majestic (Kempegowda Bus Station)", 12.9800, 77.5700),
    ("Central Silk Board", 12.9176, 77.6253),
    ("Electronic City Phase 1", 12.8400, 77.6600),
    ("Whitefield (ITPL)", 12.9900, 77.7400),
    ("Manyata Tech Park", 13.0400, 77.6200),
    ("Outer Ring Road (ORR)", 12.9288, 77.6754),
    ("Koramangala (Inner Ring Road)", 12.9300, 77.6200),
    ("Indiranagar (100 Feet Road)", 12.9699, 77.6499),
    ("MG Road", 12.9753, 77.6049),
    ("Jayanagar 4th Block", 12.9300, 77.5800),
    ("Malleshwaram 8th Cross", 13.0000, 77.5700),
    ("HSR Layout", 12.9121, 77.6446),
    ("BTM Layout", 12.9200, 77.6100),
    ("Sarjapur Road", 12.9245, 77.6764),
];

/// The default hub list.
pub fn bangalore_hubs() -> Vec<Hub> {
    BANGALORE_HUBS
        .iter()
        .map(|&(name, lat, lng)| Hub::new(name, lat, lng))
        .collect()
}

/// Look up a hub by exact name.
pub fn find_hub<'a>(hubs: &'a [Hub], name: &str) -> Option<&'a Hub> {
    hubs.iter().find(|h| h.name == name)
}

/// Reject empty lists and duplicate names.
pub fn validate_hubs(hubs: &[Hub]) -> Result<()> {
    if hubs.is_empty() {
        bail!("Hub list is empty");
    }

    let mut seen = HashSet::new();
    for hub in hubs {
        if !seen.insert(hub.name.as_str()) {
            bail!("Duplicate hub name: {}", hub.name);
        }
        if !(-90.0..=90.0).contains(&hub.coords.lat) || !(-180.0..=180.0).contains(&hub.coords.lng)
        {
            bail!("Hub {} has out-of-range coordinates", hub.name);
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_catalog_order_and_size() {
        let hubs = bangalore_hubs();
        assert_eq!(hubs.len(), 19);
        assert_eq!(hubs[0].name, "Silk Board Junction");
        assert_eq!(hubs[18].name, "Sarjapur Road");
        assert!(validate_hubs(&hubs).is_ok());
    }

    #[test]
    fn test_find_hub() {
        let hubs = bangalore_hubs();
        let hub = find_hub(&hubs, "Hebbal Flyover").unwrap();
        assert_eq!(hub.coords.lat, 13.04);
        assert_eq!(hub.coords.lng, 77.59);
        assert!(find_hub(&hubs, "hebbal flyover").is_none());
    }

    #[test]
    fn test_validate_rejects_duplicates() {
        let hubs = vec![Hub::new("A", 1.0, 1.0), Hub::new("A", 2.0, 2.0)];
        let err = validate_hubs(&hubs).unwrap_err();
        assert!(err.to_string().contains("Duplicate hub name"));
    }

    #[test]
    fn test_validate_rejects_empty_and_bad_coords() {
        assert!(validate_hubs(&[]).is_err());
        assert!(validate_hubs(&[Hub::new("Nowhere", 123.0, 0.0)]).is_err());
    }
}
