use chrono::NaiveDate;

use bicing_report::classify::BikeRegistry;
use bicing_report::merge::merge;
use bicing_report::parser::parse;
use bicing_report::stats::{aggregate, date_bounds};
use bicing_report::tariff::TARIFFS;
use bicing_report::types::TypeFilter;

// A realistic export: preamble junk before the header, semicolon
// delimiter, Catalan columns, European decimals, and a metro row that must
// be filtered out.
const EXPORT_PAGE_1: &str = "\
Zona d'usuari - Consum
Perfil;Particular

Número liquidació;Servei;Matrícula;Data d'inici;Data de fi;Unitats;Import
910001;Bicing;745;02/01/2024 08:10;02/01/2024 08:25;15 min;0,00 €
910002;Bicing;8415;02/01/2024 18:30;02/01/2024 18:50;20 min;0,35 €
910003;Metro;-;03/01/2024 09:00;;1;1,10 €
910004;Bicing;3120;03/01/2024 09:12;03/01/2024 10:27;75 min;1,40 €
910005;Bicing;745;04/01/2024 01:30;04/01/2024 01:45;15 min;0,00 €
";

// A second page overlapping the first: one duplicate settlement id plus a
// new trip.
const EXPORT_PAGE_2: &str = "\
Número liquidació;Servei;Matrícula;Data d'inici;Data de fi;Unitats;Import
910005;Bicing;745;04/01/2024 01:30;04/01/2024 01:45;15 min;0,00 €
910006;Bicing;745;20/02/2024 07:55;20/02/2024 08:05;10 min;0,00 €
";

#[test]
fn export_pages_merge_into_one_report() {
    let page1 = parse(EXPORT_PAGE_1).expect("page 1 should parse");
    let page2 = parse(EXPORT_PAGE_2).expect("page 2 should parse");
    assert_eq!(page1.len(), 4); // metro row excluded
    assert_eq!(page2.len(), 2);

    let outcome = merge(vec![page1, page2]);
    assert_eq!(outcome.trips.len(), 5);
    assert_eq!(outcome.duplicates_removed, 1);

    let bounds = date_bounds(&outcome.trips).expect("non-empty trip set");
    assert_eq!(bounds.min, NaiveDate::from_ymd_opt(2024, 1, 2).unwrap());
    assert_eq!(bounds.max, NaiveDate::from_ymd_opt(2024, 2, 20).unwrap());

    let snap = aggregate(
        &outcome.trips,
        bounds.min,
        bounds.max,
        &TARIFFS[0],
        TypeFilter::All,
        &BikeRegistry::default(),
    );

    assert_eq!(snap.total_trips, 5);
    assert_eq!(snap.total_minutes, 15 + 20 + 75 + 15 + 10);
    assert_eq!(snap.unique_bikes, 3);
    assert_eq!(snap.repeated_bikes, 1);

    // 8415 is electric (short paid trip), 3120 is electric (legacy id
    // range); bike 745 stays mechanical.
    assert_eq!(snap.electric_count, 2);
    assert_eq!(snap.mechanical_count, 3);

    // Daily series spans the whole inclusive range without gaps.
    assert_eq!(snap.trips_by_date.len(), 50);

    // Bike 745: three uses, largest gap Jan 4 -> Feb 20 (47 days).
    assert_eq!(snap.destiny_bikes.len(), 1);
    assert_eq!(snap.destiny_bikes[0].id, "745");
    assert_eq!(snap.destiny_bikes[0].gap_days, 47);

    // Night owl: the 01:30 trip counts as small-hours riding.
    let nightowl = snap
        .achievements
        .iter()
        .find(|a| a.id == "nightowl")
        .unwrap();
    assert!(nightowl.unlocked);

    // Tarifa Plana: mechanical short trips are free, the 20-minute
    // electric trip pays the base, the 75-minute electric trip pays the
    // base plus two mid blocks.
    let expected = 0.35 + (0.35 + 2.0 * 0.90);
    assert!((snap.total_cost - expected).abs() < 1e-9);
}

#[test]
fn reparsing_the_same_text_is_stable() {
    let a = parse(EXPORT_PAGE_1).unwrap();
    let b = parse(EXPORT_PAGE_1).unwrap();
    assert_eq!(a, b);

    // Merging a batch with itself drops exactly one batch's worth.
    let outcome = merge(vec![a.clone(), b]);
    assert_eq!(outcome.trips.len(), a.len());
    assert_eq!(outcome.duplicates_removed, a.len());
}
