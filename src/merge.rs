// Merge trips parsed from several export files into one deduplicated set.
//
// Smou paginates long histories, so users upload overlapping exports. The
// settlement id is the preferred dedup key; positional placeholder ids are
// only stable within a single file, so those records fall back to a
// composite (start timestamp, bike id) key.
use std::collections::HashSet;

use crate::parser::PLACEHOLDER_PREFIX;
use crate::types::{MergeOutcome, Trip};

fn dedup_key(trip: &Trip) -> String {
    if trip.id.starts_with(PLACEHOLDER_PREFIX) {
        format!("{}-{}", trip.start_date.and_utc().timestamp(), trip.bike_id)
    } else {
        trip.id.clone()
    }
}

/// Concatenate all batches and drop duplicates, first occurrence wins.
/// The number of dropped records is surfaced so the caller can report it.
pub fn merge(batches: Vec<Vec<Trip>>) -> MergeOutcome {
    let total: usize = batches.iter().map(Vec::len).sum();
    let mut seen: HashSet<String> = HashSet::with_capacity(total);
    let mut trips = Vec::with_capacity(total);

    for trip in batches.into_iter().flatten() {
        if seen.insert(dedup_key(&trip)) {
            trips.push(trip);
        }
    }

    let duplicates_removed = total - trips.len();
    MergeOutcome {
        trips,
        duplicates_removed,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use crate::types::Trip;

    fn trip(id: &str, bike: &str, day: u32, hour: u32) -> Trip {
        let start = NaiveDate::from_ymd_opt(2024, 3, day)
            .unwrap()
            .and_hms_opt(hour, 0, 0)
            .unwrap();
        Trip {
            id: id.to_string(),
            start_date: start,
            end_date: start,
            bike_id: bike.to_string(),
            duration_minutes: 15,
            cost: 0.0,
            service: "Bicing".to_string(),
        }
    }

    #[test]
    fn merging_a_batch_with_itself_drops_one_copy() {
        let batch = vec![trip("900001", "100", 1, 8), trip("900002", "200", 2, 9)];
        let out = merge(vec![batch.clone(), batch]);
        assert_eq!(out.trips.len(), 2);
        assert_eq!(out.duplicates_removed, 2);
    }

    #[test]
    fn placeholder_ids_dedup_by_start_and_bike() {
        // Same positional id but different trips: both must survive.
        let a = trip("row-1", "100", 1, 8);
        let b = trip("row-1", "200", 2, 9);
        // Same start and bike from another file: a duplicate.
        let c = trip("row-7", "100", 1, 8);
        let out = merge(vec![vec![a, b], vec![c]]);
        assert_eq!(out.trips.len(), 2);
        assert_eq!(out.duplicates_removed, 1);
    }

    #[test]
    fn first_occurrence_wins() {
        let mut first = trip("900001", "100", 1, 8);
        first.duration_minutes = 10;
        let mut second = trip("900001", "100", 1, 8);
        second.duration_minutes = 99;
        let out = merge(vec![vec![first], vec![second]]);
        assert_eq!(out.trips.len(), 1);
        assert_eq!(out.trips[0].duration_minutes, 10);
    }

    #[test]
    fn empty_input_is_fine() {
        let out = merge(vec![]);
        assert!(out.trips.is_empty());
        assert_eq!(out.duplicates_removed, 0);
    }
}
