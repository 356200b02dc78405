use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

/// One completed Bicing rental, normalized from a Smou export row.
///
/// `duration_minutes` is the authoritative duration; the date pair is kept
/// as reported and `end_date >= start_date` is not guaranteed.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Trip {
    pub id: String,
    pub start_date: NaiveDateTime,
    pub end_date: NaiveDateTime,
    pub bike_id: String,
    pub duration_minutes: u32,
    /// Cost as reported by the export. May be 0 even for billable trips.
    pub cost: f64,
    pub service: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum BikeType {
    Mechanical,
    Electric,
}

/// Type filter applied by the aggregation engine. An excluded trip
/// contributes to nothing, including scalar totals.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TypeFilter {
    #[default]
    All,
    Mechanical,
    Electric,
}

impl TypeFilter {
    pub fn keeps(self, t: BikeType) -> bool {
        match self {
            TypeFilter::All => true,
            TypeFilter::Mechanical => t == BikeType::Mechanical,
            TypeFilter::Electric => t == BikeType::Electric,
        }
    }
}

/// A named pricing plan: flat yearly fee plus banded per-trip charges.
/// All amounts are euros and must be >= 0.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TariffRules {
    pub id: String,
    pub name: String,
    /// Flat yearly subscription fee.
    pub price: f64,
    /// First 30 minutes, charged flat.
    pub base_mec: f64,
    pub base_elec: f64,
    /// Per 30-minute block between minute 30 and 120.
    pub mid_mec: f64,
    pub mid_elec: f64,
    /// Per 60-minute block beyond minute 120, type-independent.
    pub max_price: f64,
}

/// Coarse fleet-era tag derived from the numeric bike id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum IdRange {
    Old,
    Mid,
    New,
}

/// Per-bike usage derived during aggregation.
#[derive(Debug, Clone, Serialize)]
pub struct BikeStat {
    pub id: String,
    pub count: u32,
    pub minutes: u32,
    /// Chronologically ascending.
    pub usage_dates: Vec<NaiveDateTime>,
    /// Most recent first, with the tariff-computed cost substituted for the
    /// raw reported cost.
    pub trips: Vec<Trip>,
    pub first_used: NaiveDateTime,
    pub last_used: NaiveDateTime,
    pub range: IdRange,
}

#[derive(Debug, Clone, Serialize)]
pub struct DayStat {
    /// ISO `YYYY-MM-DD`.
    pub date: String,
    pub formatted_date: String,
    pub count: u32,
}

/// A bike the rider came back to after an unusually long gap (> 30 days).
#[derive(Debug, Clone, Serialize)]
pub struct DestinyBike {
    pub id: String,
    pub gap_days: i64,
    pub date_a: NaiveDateTime,
    pub date_b: NaiveDateTime,
    pub total_uses: u32,
}

#[derive(Debug, Clone, Serialize)]
pub struct HourPoint {
    pub hour: String,
    pub count: u32,
}

#[derive(Debug, Clone, Serialize)]
pub struct WeekdayPoint {
    pub day: String,
    pub full_day: String,
    pub count: u32,
}

#[derive(Debug, Clone, Serialize)]
pub struct DatePoint {
    /// Display label, `DD/MM/YYYY`.
    pub date: String,
    pub iso_date: String,
    pub count: u32,
}

#[derive(Debug, Clone, Serialize)]
pub struct WeekPoint {
    /// `YYYY-Wnn`.
    pub week: String,
    pub count: u32,
}

#[derive(Debug, Clone, Serialize)]
pub struct MonthPoint {
    /// `YYYY-MM`.
    pub month: String,
    pub label: String,
    pub count: u32,
}

#[derive(Debug, Clone, Serialize)]
pub struct MonthNamePoint {
    pub month: String,
    pub count: u32,
}

#[derive(Debug, Clone, Serialize)]
pub struct YearPoint {
    pub year: i32,
    pub count: u32,
}

/// Average numeric bike id per calendar month. Months without a single
/// numeric id observation are omitted entirely.
#[derive(Debug, Clone, Serialize)]
pub struct AvgIdMonthPoint {
    pub month: String,
    pub label: String,
    pub avg_id: u32,
    pub count: u32,
}

#[derive(Debug, Clone, Serialize)]
pub struct HistogramBin {
    pub bin_start: u32,
    pub range: String,
    pub full_range: String,
    pub count: u32,
}

#[derive(Debug, Clone, Serialize)]
pub struct GenerationStat {
    pub name: &'static str,
    pub count: u32,
}

#[derive(Debug, Clone, Serialize)]
pub struct Achievement {
    pub id: &'static str,
    pub title: &'static str,
    pub desc: &'static str,
    pub unlocked: bool,
    pub progress: String,
}

/// The full statistics snapshot consumed by the presentation layer.
///
/// Derived from scratch on every change of trips, date range, tariff or
/// type filter; callers memoize by input identity. Trip lists inside the
/// ranked members are shared data and must be treated read-only.
#[derive(Debug, Clone, Serialize)]
pub struct StatsSnapshot {
    pub total_trips: u32,
    pub total_minutes: u64,
    /// Sum of tariff-computed costs over retained trips.
    pub total_cost: f64,
    pub unique_bikes: usize,
    pub repeated_bikes: usize,
    pub average_minutes: u32,
    pub estimated_distance_km: f64,
    pub co2_saved_kg: f64,
    pub electric_count: u32,
    pub mechanical_count: u32,
    pub avg_cost_per_trip_with_subscription: f64,
    pub longest_streak: u32,

    pub top_days: Vec<DayStat>,
    pub longest_trips: Vec<Trip>,
    pub top_bikes: Vec<BikeStat>,
    pub all_bikes: Vec<BikeStat>,
    pub destiny_bikes: Vec<DestinyBike>,
    pub avg_id_by_month: Vec<AvgIdMonthPoint>,
    /// 0 when no numeric id was observed in range.
    pub max_bike_id: u32,
    pub min_bike_id: u32,

    pub busiest_weekday: String,
    pub busiest_hour: String,

    pub trips_by_hour: Vec<HourPoint>,
    pub trips_by_day: Vec<WeekdayPoint>,
    pub trips_by_month_name: Vec<MonthNamePoint>,
    pub trips_by_date: Vec<DatePoint>,
    pub trips_by_week: Vec<WeekPoint>,
    pub trips_by_month: Vec<MonthPoint>,
    pub trips_by_year: Vec<YearPoint>,

    /// Rows are weekdays with Monday = 0, columns are hours 0-23.
    pub heatmap: [[u32; 24]; 7],
    pub id_histogram: Vec<HistogramBin>,
    pub generation_stats: Vec<GenerationStat>,
    pub achievements: Vec<Achievement>,
}

/// Result of merging several parsed batches into one deduplicated set.
#[derive(Debug, Clone)]
pub struct MergeOutcome {
    pub trips: Vec<Trip>,
    pub duplicates_removed: usize,
}

/// Start-date bounds of a trip set, used to seed the default report range.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DateBounds {
    pub min: NaiveDate,
    pub max: NaiveDate,
    /// Distinct years, most recent first.
    pub years: Vec<i32>,
}
