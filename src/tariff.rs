// Tariff catalog and the banded per-trip cost model.
//
// Pricing is a flat charge for the first 30 minutes, a per-30-minute rate
// up to the two hour mark, and a per-hour penalty rate beyond that. Only
// the first two bands distinguish mechanical from electric.
use once_cell::sync::Lazy;

use crate::types::{BikeType, TariffRules};

/// Built-in pricing plans, yearly fee in euros. Band values follow the
/// published Bicing rates; the metropolitan passes share bands with their
/// base plan and differ only in the subscription fee.
pub static TARIFFS: Lazy<Vec<TariffRules>> = Lazy::new(|| {
    vec![
        TariffRules {
            id: "plana".to_string(),
            name: "Tarifa Plana".to_string(),
            price: 50.0,
            base_mec: 0.0,
            base_elec: 0.35,
            mid_mec: 0.70,
            mid_elec: 0.90,
            max_price: 5.0,
        },
        TariffRules {
            id: "us".to_string(),
            name: "Tarifa d'ús".to_string(),
            price: 35.0,
            base_mec: 0.35,
            base_elec: 0.55,
            mid_mec: 0.70,
            mid_elec: 0.90,
            max_price: 5.0,
        },
        TariffRules {
            id: "metro_plana".to_string(),
            name: "Abonament Metropolità (Plana)".to_string(),
            price: 65.0,
            base_mec: 0.0,
            base_elec: 0.35,
            mid_mec: 0.70,
            mid_elec: 0.90,
            max_price: 5.0,
        },
        TariffRules {
            id: "metro_us".to_string(),
            name: "Abonament Metropolità (Ús)".to_string(),
            price: 53.0,
            base_mec: 0.35,
            base_elec: 0.55,
            mid_mec: 0.70,
            mid_elec: 0.90,
            max_price: 5.0,
        },
    ]
});

pub fn find_tariff(id: &str) -> Option<&'static TariffRules> {
    TARIFFS.iter().find(|t| t.id == id)
}

/// Cost of one trip under a tariff. Never negative.
///
/// - Base band: flat charge for the first 30 minutes, by type.
/// - Mid band (minute 30-120): per started 30-minute block, by type.
/// - Overage band (beyond minute 120): per started hour, type-independent.
pub fn trip_cost(duration_minutes: u32, bike_type: BikeType, tariff: &TariffRules) -> f64 {
    let mut cost = match bike_type {
        BikeType::Electric => tariff.base_elec,
        BikeType::Mechanical => tariff.base_mec,
    };

    if duration_minutes > 30 {
        let excess = duration_minutes.min(120) - 30;
        let rate = match bike_type {
            BikeType::Electric => tariff.mid_elec,
            BikeType::Mechanical => tariff.mid_mec,
        };
        cost += excess.div_ceil(30) as f64 * rate;
    }

    if duration_minutes > 120 {
        let excess = duration_minutes - 120;
        cost += excess.div_ceil(60) as f64 * tariff.max_price;
    }

    cost
}
