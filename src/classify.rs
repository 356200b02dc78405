// Bike type classification under uncertainty.
//
// The export never says whether a bike was mechanical or electric, so the
// type is decided from, in order: community-maintained id lists, a pricing
// heuristic, and id-range fleet knowledge. Reference-set membership always
// overrides the heuristics.
use std::collections::HashSet;

use serde::Deserialize;

use crate::types::{BikeType, Trip};

/// Known-id reference sets, usually loaded from a bundled JSON file with
/// `mecaniques` / `electriques` arrays. Consumed read-only.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct BikeRegistry {
    #[serde(rename = "mecaniques", default)]
    pub mechanical: HashSet<String>,
    #[serde(rename = "electriques", default)]
    pub electric: HashSet<String>,
}

impl BikeRegistry {
    pub fn from_json(text: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(text)
    }
}

/// Digits of a bike id, with padding and prefixes like `B-` stripped.
pub fn clean_bike_id(raw: &str) -> String {
    raw.chars().filter(|c| c.is_ascii_digit()).collect()
}

/// Numeric core of a bike id; 0 when there are no digits (or they overflow).
pub fn numeric_bike_id(raw: &str) -> u32 {
    clean_bike_id(raw).parse().unwrap_or(0)
}

/// Decide the vehicle type of a trip. Total and deterministic.
///
/// Tie-break order, first match wins:
/// 1. registry membership of the cleaned id (electric checked first),
/// 2. short paid trip (`cost > 0`, `duration <= 30`) implies electric,
///    since the base mechanical tier is usually free,
/// 3. electric fleet id ranges [3000, 4000) and >= 8000,
/// 4. mechanical.
pub fn classify(trip: &Trip, registry: &BikeRegistry) -> BikeType {
    let clean = clean_bike_id(&trip.bike_id);
    if registry.electric.contains(&clean) {
        return BikeType::Electric;
    }
    if registry.mechanical.contains(&clean) {
        return BikeType::Mechanical;
    }

    if trip.cost > 0.0 && trip.duration_minutes <= 30 {
        return BikeType::Electric;
    }

    let id = numeric_bike_id(&trip.bike_id);
    if (3000..4000).contains(&id) || id >= 8000 {
        return BikeType::Electric;
    }
    BikeType::Mechanical
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn trip(bike: &str, duration: u32, cost: f64) -> Trip {
        let start = NaiveDate::from_ymd_opt(2024, 6, 1)
            .unwrap()
            .and_hms_opt(12, 0, 0)
            .unwrap();
        Trip {
            id: "900001".to_string(),
            start_date: start,
            end_date: start,
            bike_id: bike.to_string(),
            duration_minutes: duration,
            cost,
            service: "Bicing".to_string(),
        }
    }

    fn registry(mec: &[&str], elec: &[&str]) -> BikeRegistry {
        BikeRegistry {
            mechanical: mec.iter().map(|s| s.to_string()).collect(),
            electric: elec.iter().map(|s| s.to_string()).collect(),
        }
    }

    #[test]
    fn registry_overrides_every_heuristic() {
        let reg = registry(&["8500"], &["120"]);
        // 8500 is in the electric id range but the list says mechanical.
        assert_eq!(classify(&trip("8500", 10, 1.0), &reg), BikeType::Mechanical);
        // 120 is a low id, paid nothing, yet listed electric.
        assert_eq!(classify(&trip("120", 60, 0.0), &reg), BikeType::Electric);
    }

    #[test]
    fn cleaned_id_is_used_for_lookup() {
        let reg = registry(&[], &["2456"]);
        assert_eq!(classify(&trip("B-2456", 40, 0.0), &reg), BikeType::Electric);
        // Lookup is exact on the cleaned digits; a zero-padded id is a
        // different key and falls through to the heuristics.
        assert_eq!(classify(&trip("002456", 40, 0.0), &reg), BikeType::Mechanical);
    }

    #[test]
    fn short_paid_trip_is_electric() {
        let reg = BikeRegistry::default();
        assert_eq!(classify(&trip("150", 20, 0.35), &reg), BikeType::Electric);
        // Long paid trips do not trigger the heuristic.
        assert_eq!(classify(&trip("150", 45, 0.70), &reg), BikeType::Mechanical);
        // Short free trips do not either.
        assert_eq!(classify(&trip("150", 20, 0.0), &reg), BikeType::Mechanical);
    }

    #[test]
    fn electric_id_ranges() {
        let reg = BikeRegistry::default();
        assert_eq!(classify(&trip("2999", 40, 0.0), &reg), BikeType::Mechanical);
        assert_eq!(classify(&trip("3000", 40, 0.0), &reg), BikeType::Electric);
        assert_eq!(classify(&trip("3999", 40, 0.0), &reg), BikeType::Electric);
        assert_eq!(classify(&trip("4000", 40, 0.0), &reg), BikeType::Mechanical);
        assert_eq!(classify(&trip("7999", 40, 0.0), &reg), BikeType::Mechanical);
        assert_eq!(classify(&trip("8000", 40, 0.0), &reg), BikeType::Electric);
    }

    #[test]
    fn heuristic_order_is_cost_before_id_range() {
        // Mechanical-range id, but short and paid: the cost heuristic wins.
        let reg = BikeRegistry::default();
        assert_eq!(classify(&trip("500", 15, 0.35), &reg), BikeType::Electric);
    }

    #[test]
    fn unparseable_ids_default_to_mechanical() {
        let reg = BikeRegistry::default();
        assert_eq!(classify(&trip("?", 40, 0.0), &reg), BikeType::Mechanical);
    }

    #[test]
    fn registry_loads_from_json() {
        let reg =
            BikeRegistry::from_json(r#"{"mecaniques":["100"],"electriques":["8400"]}"#).unwrap();
        assert!(reg.mechanical.contains("100"));
        assert!(reg.electric.contains("8400"));
        let empty = BikeRegistry::from_json("{}").unwrap();
        assert!(empty.mechanical.is_empty());
    }
}
