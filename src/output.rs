// File export and console preview helpers for the report binary.
use serde::Serialize;
use std::error::Error;
use tabled::{settings::Style, Table, Tabled};

use crate::classify::{classify, BikeRegistry};
use crate::tariff::trip_cost;
use crate::types::{BikeStat, BikeType, DayStat, DestinyBike, TariffRules, Trip};
use crate::util::{format_number, format_short_date};

pub fn write_csv<T: Serialize>(path: &str, rows: &[T]) -> Result<(), Box<dyn Error>> {
    let mut wtr = csv::Writer::from_path(path)?;
    for r in rows {
        wtr.serialize(r)?;
    }
    wtr.flush()?;
    Ok(())
}

pub fn write_json<T: Serialize>(path: &str, value: &T) -> Result<(), Box<dyn Error>> {
    let s = serde_json::to_string_pretty(value)?;
    std::fs::write(path, s)?;
    Ok(())
}

pub fn preview_table_rows<T>(rows: &[T], max_rows: usize)
where
    T: Tabled + Clone,
{
    let slice: Vec<T> = rows.iter().cloned().take(max_rows).collect();
    if slice.is_empty() {
        println!("(no rows)\n");
        return;
    }
    let table_str = Table::new(slice).with(Style::markdown()).to_string();
    println!("{}\n", table_str);
}

#[derive(Debug, Serialize, Tabled, Clone)]
pub struct TopBikeRow {
    #[serde(rename = "Rank")]
    #[tabled(rename = "Rank")]
    pub rank: usize,
    #[serde(rename = "Bike")]
    #[tabled(rename = "Bike")]
    pub bike: String,
    #[serde(rename = "Trips")]
    #[tabled(rename = "Trips")]
    pub trips: u32,
    #[serde(rename = "Minutes")]
    #[tabled(rename = "Minutes")]
    pub minutes: u32,
    #[serde(rename = "FirstUsed")]
    #[tabled(rename = "FirstUsed")]
    pub first_used: String,
    #[serde(rename = "LastUsed")]
    #[tabled(rename = "LastUsed")]
    pub last_used: String,
}

#[derive(Debug, Serialize, Tabled, Clone)]
pub struct TopDayRow {
    #[serde(rename = "Rank")]
    #[tabled(rename = "Rank")]
    pub rank: usize,
    #[serde(rename = "Date")]
    #[tabled(rename = "Date")]
    pub date: String,
    #[serde(rename = "Trips")]
    #[tabled(rename = "Trips")]
    pub trips: u32,
}

#[derive(Debug, Serialize, Tabled, Clone)]
pub struct DestinyBikeRow {
    #[serde(rename = "Bike")]
    #[tabled(rename = "Bike")]
    pub bike: String,
    #[serde(rename = "GapDays")]
    #[tabled(rename = "GapDays")]
    pub gap_days: i64,
    #[serde(rename = "From")]
    #[tabled(rename = "From")]
    pub from: String,
    #[serde(rename = "To")]
    #[tabled(rename = "To")]
    pub to: String,
    #[serde(rename = "TotalUses")]
    #[tabled(rename = "TotalUses")]
    pub total_uses: u32,
}

#[derive(Debug, Serialize, Tabled, Clone)]
pub struct TripExportRow {
    #[serde(rename = "Start")]
    #[tabled(rename = "Start")]
    pub start: String,
    #[serde(rename = "End")]
    #[tabled(rename = "End")]
    pub end: String,
    #[serde(rename = "Minutes")]
    #[tabled(rename = "Minutes")]
    pub minutes: u32,
    #[serde(rename = "Bike")]
    #[tabled(rename = "Bike")]
    pub bike: String,
    #[serde(rename = "Type")]
    #[tabled(rename = "Type")]
    pub bike_type: String,
    #[serde(rename = "Cost")]
    #[tabled(rename = "Cost")]
    pub cost: String,
}

pub fn top_bike_rows(bikes: &[BikeStat]) -> Vec<TopBikeRow> {
    bikes
        .iter()
        .enumerate()
        .map(|(idx, b)| TopBikeRow {
            rank: idx + 1,
            bike: b.id.clone(),
            trips: b.count,
            minutes: b.minutes,
            first_used: format_short_date(b.first_used.date()),
            last_used: format_short_date(b.last_used.date()),
        })
        .collect()
}

pub fn top_day_rows(days: &[DayStat]) -> Vec<TopDayRow> {
    days.iter()
        .enumerate()
        .map(|(idx, d)| TopDayRow {
            rank: idx + 1,
            date: d.formatted_date.clone(),
            trips: d.count,
        })
        .collect()
}

pub fn destiny_bike_rows(bikes: &[DestinyBike]) -> Vec<DestinyBikeRow> {
    bikes
        .iter()
        .map(|b| DestinyBikeRow {
            bike: b.id.clone(),
            gap_days: b.gap_days,
            from: format_short_date(b.date_a.date()),
            to: format_short_date(b.date_b.date()),
            total_uses: b.total_uses,
        })
        .collect()
}

/// Rows for the full trip-table export: each trip with its classified type
/// and the cost it would have under `tariff`.
pub fn trip_export_rows(
    trips: &[Trip],
    tariff: &TariffRules,
    registry: &BikeRegistry,
) -> Vec<TripExportRow> {
    trips
        .iter()
        .map(|t| {
            let bike_type = classify(t, registry);
            let cost = trip_cost(t.duration_minutes, bike_type, tariff);
            TripExportRow {
                start: t.start_date.format("%d/%m/%Y %H:%M").to_string(),
                end: t.end_date.format("%d/%m/%Y %H:%M").to_string(),
                minutes: t.duration_minutes,
                bike: t.bike_id.clone(),
                bike_type: match bike_type {
                    BikeType::Electric => "Elèctrica".to_string(),
                    BikeType::Mechanical => "Mecànica".to_string(),
                },
                cost: format_number(cost, 2),
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    #[test]
    fn trip_rows_carry_type_and_tariff_cost() {
        let start = NaiveDate::from_ymd_opt(2024, 3, 5)
            .unwrap()
            .and_hms_opt(8, 15, 0)
            .unwrap();
        let trips = vec![Trip {
            id: "900001".to_string(),
            start_date: start,
            end_date: start,
            bike_id: "8400".to_string(),
            duration_minutes: 20,
            cost: 0.0,
            service: "Bicing".to_string(),
        }];
        let tariff = crate::tariff::TARIFFS[0].clone();
        let rows = trip_export_rows(&trips, &tariff, &BikeRegistry::default());
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].bike_type, "Elèctrica");
        assert_eq!(rows[0].cost, "0.35");
        assert_eq!(rows[0].start, "05/03/2024 08:15");
    }
}
