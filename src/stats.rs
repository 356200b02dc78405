// Single-pass statistics aggregation over the merged trip set.
//
// Everything the dashboard shows comes out of one snapshot struct, rebuilt
// from scratch whenever trips, date range, tariff or type filter change.
// The pass classifies each trip, prices it under the selected tariff and
// feeds every time bucket and per-bike accumulator at once; ranking, gap
// filling and scalar summaries happen afterwards.
use std::collections::{BTreeMap, BTreeSet, HashMap};

use chrono::{Datelike, NaiveDate, NaiveDateTime, Timelike};

use crate::classify::{classify, numeric_bike_id, BikeRegistry};
use crate::tariff::trip_cost;
use crate::types::{
    Achievement, AvgIdMonthPoint, BikeStat, BikeType, DateBounds, DatePoint, DayStat, DestinyBike,
    GenerationStat, HistogramBin, HourPoint, IdRange, MonthNamePoint, MonthPoint, StatsSnapshot,
    TariffRules, Trip, TypeFilter, WeekPoint, WeekdayPoint, YearPoint,
};
use crate::util::{format_long_date, format_month_label, format_short_date, DAY_NAMES, MONTH_ABBR};

const HISTOGRAM_BIN_SIZE: u32 = 500;
const DESTINY_GAP_DAYS: f64 = 30.0;
const TOP_LIST_LEN: usize = 50;
const DESTINY_LIST_LEN: usize = 20;

/// Assumed riding speed: one kilometre per 5 minutes.
const MINUTES_PER_KM: f64 = 5.0;
/// Saved emissions versus driving, kg CO2 per km.
const CO2_KG_PER_KM: f64 = 0.12;

#[derive(Default)]
struct BikeAcc {
    seq: usize,
    count: u32,
    minutes: u32,
    dates: Vec<NaiveDateTime>,
    trips: Vec<Trip>,
}

/// Week key matching the dashboard's week numbering:
/// `ceil((days_since_jan1 + jan1_weekday_from_sunday + 1) / 7)`.
fn week_key(d: NaiveDate) -> String {
    let jan1 = NaiveDate::from_ymd_opt(d.year(), 1, 1).unwrap_or(d);
    let days = (d - jan1).num_days();
    let offset = jan1.weekday().num_days_from_sunday() as i64;
    let week = (days + offset + 1 + 6) / 7;
    format!("{}-W{:02}", d.year(), week)
}

fn id_range(id_num: u32) -> IdRange {
    if id_num < 3000 {
        IdRange::Old
    } else if id_num >= 8000 {
        IdRange::New
    } else {
        IdRange::Mid
    }
}

/// Start-date bounds and distinct years of a trip set, used to seed the
/// default reporting range. `None` for an empty set.
pub fn date_bounds(trips: &[Trip]) -> Option<DateBounds> {
    let mut it = trips.iter().map(|t| t.start_date.date());
    let first = it.next()?;
    let (mut min, mut max) = (first, first);
    for d in it {
        min = min.min(d);
        max = max.max(d);
    }
    let mut years: Vec<i32> = trips
        .iter()
        .map(|t| t.start_date.year())
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect();
    years.reverse();
    Some(DateBounds { min, max, years })
}

/// Build the full statistics snapshot for the trips whose start date falls
/// inside `[range_start, range_end]` (whole days, inclusive) and whose
/// classified type passes `type_filter`.
///
/// Pure function of its inputs: identical inputs yield an identical
/// snapshot, so callers are free to memoize.
pub fn aggregate(
    trips: &[Trip],
    range_start: NaiveDate,
    range_end: NaiveDate,
    tariff: &TariffRules,
    type_filter: TypeFilter,
    registry: &BikeRegistry,
) -> StatsSnapshot {
    let mut bike_usage: HashMap<String, BikeAcc> = HashMap::new();
    let mut hour_counts = [0u32; 24];
    let mut weekday_counts = [0u32; 7];
    let mut month_name_counts = [0u32; 12];
    let mut daily_counts: BTreeMap<NaiveDate, u32> = BTreeMap::new();
    let mut weekly_counts: BTreeMap<String, u32> = BTreeMap::new();
    let mut monthly_counts: BTreeMap<(i32, u32), u32> = BTreeMap::new();
    let mut monthly_id_sums: BTreeMap<(i32, u32), (u64, u32)> = BTreeMap::new();
    let mut yearly_counts: BTreeMap<i32, u32> = BTreeMap::new();
    let mut unique_years: BTreeSet<i32> = BTreeSet::new();
    let mut heatmap = [[0u32; 24]; 7];
    let mut histogram: BTreeMap<u32, u32> = BTreeMap::new();

    let mut gen_mec = 0u32;
    let mut gen_elec_old = 0u32;
    let mut gen_elec_new = 0u32;
    let mut electric_count = 0u32;
    let mut mechanical_count = 0u32;
    let mut min_bike_id: Option<u32> = None;
    let mut max_bike_id = 0u32;
    let mut total_cost = 0f64;
    let mut total_minutes = 0u64;
    let mut retained: Vec<Trip> = Vec::new();

    for t in trips {
        let day = t.start_date.date();
        if day < range_start || day > range_end {
            continue;
        }
        let bike_type = classify(t, registry);
        if !type_filter.keeps(bike_type) {
            continue;
        }

        let computed_cost = trip_cost(t.duration_minutes, bike_type, tariff);
        total_cost += computed_cost;
        total_minutes += u64::from(t.duration_minutes);
        if bike_type == BikeType::Electric {
            electric_count += 1;
        } else {
            mechanical_count += 1;
        }

        unique_years.insert(day.year());
        *yearly_counts.entry(day.year()).or_default() += 1;
        month_name_counts[day.month0() as usize] += 1;

        let id_num = numeric_bike_id(&t.bike_id);
        if id_num > 0 {
            max_bike_id = max_bike_id.max(id_num);
            min_bike_id = Some(min_bike_id.map_or(id_num, |m| m.min(id_num)));
            let bin = id_num / HISTOGRAM_BIN_SIZE * HISTOGRAM_BIN_SIZE;
            *histogram.entry(bin).or_default() += 1;
            match (bike_type, id_num) {
                (BikeType::Electric, n) if n >= 8000 => gen_elec_new += 1,
                (BikeType::Electric, _) => gen_elec_old += 1,
                (BikeType::Mechanical, _) => gen_mec += 1,
            }
        }

        let next_seq = bike_usage.len();
        let acc = bike_usage.entry(t.bike_id.clone()).or_insert_with(|| BikeAcc {
            seq: next_seq,
            ..BikeAcc::default()
        });
        acc.count += 1;
        acc.minutes += t.duration_minutes;
        acc.dates.push(t.start_date);
        acc.trips.push(Trip {
            cost: computed_cost,
            ..t.clone()
        });

        let hour = t.start_date.hour() as usize;
        let weekday = day.weekday().num_days_from_monday() as usize;
        hour_counts[hour] += 1;
        weekday_counts[weekday] += 1;
        heatmap[weekday][hour] += 1;

        *daily_counts.entry(day).or_default() += 1;
        let month_key = (day.year(), day.month());
        *monthly_counts.entry(month_key).or_default() += 1;
        if id_num > 0 {
            let entry = monthly_id_sums.entry(month_key).or_insert((0, 0));
            entry.0 += u64::from(id_num);
            entry.1 += 1;
        }
        *weekly_counts.entry(week_key(day)).or_default() += 1;

        retained.push(t.clone());
    }

    // Daily and monthly series are gap-filled over the whole requested
    // range so charts never show a tripless day or month as a hole.
    let mut trips_by_date = Vec::new();
    let mut cursor = range_start;
    while cursor <= range_end {
        trips_by_date.push(DatePoint {
            date: format_short_date(cursor),
            iso_date: cursor.format("%Y-%m-%d").to_string(),
            count: daily_counts.get(&cursor).copied().unwrap_or(0),
        });
        let Some(next) = cursor.succ_opt() else { break };
        cursor = next;
    }

    let mut trips_by_month = Vec::new();
    let mut avg_id_by_month = Vec::new();
    if range_start <= range_end {
        let (mut year, mut month) = (range_start.year(), range_start.month());
        loop {
            let key = (year, month);
            let label = format_month_label(year, month);
            trips_by_month.push(MonthPoint {
                month: format!("{}-{:02}", year, month),
                label: label.clone(),
                count: monthly_counts.get(&key).copied().unwrap_or(0),
            });
            // Months with no numeric-id observation are left out entirely.
            if let Some(&(sum, count)) = monthly_id_sums.get(&key) {
                avg_id_by_month.push(AvgIdMonthPoint {
                    month: format!("{}-{:02}", year, month),
                    label,
                    avg_id: (sum as f64 / count as f64).round() as u32,
                    count,
                });
            }
            if year == range_end.year() && month == range_end.month() {
                break;
            }
            month += 1;
            if month > 12 {
                month = 1;
                year += 1;
            }
        }
    }

    let trips_by_week = weekly_counts
        .into_iter()
        .map(|(week, count)| WeekPoint { week, count })
        .collect();
    let trips_by_year = yearly_counts
        .iter()
        .map(|(&year, &count)| YearPoint { year, count })
        .collect();
    let trips_by_hour: Vec<HourPoint> = (0..24)
        .map(|h| HourPoint {
            hour: format!("{:02}h", h),
            count: hour_counts[h],
        })
        .collect();
    let trips_by_day = DAY_NAMES
        .iter()
        .zip(weekday_counts.iter())
        .map(|(name, &count)| WeekdayPoint {
            day: name[..3].to_string(),
            full_day: name.to_string(),
            count,
        })
        .collect();
    let trips_by_month_name = MONTH_ABBR
        .iter()
        .zip(month_name_counts.iter())
        .map(|(name, &count)| MonthNamePoint {
            month: name.to_string(),
            count,
        })
        .collect();

    // Per-bike ranking. HashMap order is arbitrary, so bikes are first put
    // back in first-encountered order; the count sort below is stable and
    // keeps that order for ties.
    let mut accs: Vec<(String, BikeAcc)> = bike_usage.into_iter().collect();
    accs.sort_by_key(|(_, acc)| acc.seq);

    let mut bike_list: Vec<BikeStat> = Vec::with_capacity(accs.len());
    let mut destiny_bikes: Vec<DestinyBike> = Vec::new();
    for (id, mut acc) in accs {
        acc.dates.sort();
        acc.trips.sort_by(|a, b| b.start_date.cmp(&a.start_date));
        let (Some(&first_used), Some(&last_used)) = (acc.dates.first(), acc.dates.last()) else {
            continue;
        };

        if acc.dates.len() > 1 {
            let mut max_gap_secs = 0i64;
            let mut gap_a = acc.dates[0];
            let mut gap_b = acc.dates[1];
            for pair in acc.dates.windows(2) {
                let gap = (pair[1] - pair[0]).num_seconds();
                if gap > max_gap_secs {
                    max_gap_secs = gap;
                    gap_a = pair[0];
                    gap_b = pair[1];
                }
            }
            let gap_days = max_gap_secs as f64 / 86_400.0;
            if gap_days > DESTINY_GAP_DAYS {
                destiny_bikes.push(DestinyBike {
                    id: id.clone(),
                    gap_days: gap_days.round() as i64,
                    date_a: gap_a,
                    date_b: gap_b,
                    total_uses: acc.count,
                });
            }
        }

        bike_list.push(BikeStat {
            range: id_range(numeric_bike_id(&id)),
            id,
            count: acc.count,
            minutes: acc.minutes,
            usage_dates: acc.dates,
            trips: acc.trips,
            first_used,
            last_used,
        });
    }

    let unique_bikes = bike_list.len();
    let repeated_bikes = bike_list.iter().filter(|b| b.count > 1).count();

    let mut top_bikes = bike_list.clone();
    top_bikes.sort_by(|a, b| b.count.cmp(&a.count));
    top_bikes.truncate(TOP_LIST_LEN);

    let mut all_bikes = bike_list;
    all_bikes.sort_by_key(|b| numeric_bike_id(&b.id));

    destiny_bikes.sort_by(|a, b| b.gap_days.cmp(&a.gap_days));
    destiny_bikes.truncate(DESTINY_LIST_LEN);

    let mut top_days: Vec<DayStat> = daily_counts
        .iter()
        .map(|(&date, &count)| DayStat {
            date: date.format("%Y-%m-%d").to_string(),
            formatted_date: format_long_date(date),
            count,
        })
        .collect();
    top_days.sort_by(|a, b| b.count.cmp(&a.count));
    top_days.truncate(TOP_LIST_LEN);

    let mut longest_trips = retained.clone();
    longest_trips.sort_by(|a, b| b.duration_minutes.cmp(&a.duration_minutes));
    longest_trips.truncate(TOP_LIST_LEN);

    // Longest run of consecutive calendar days with at least one trip.
    let mut longest_streak = 0u32;
    let mut current_streak = 0u32;
    let mut prev_day: Option<NaiveDate> = None;
    for &day in daily_counts.keys() {
        current_streak = match prev_day {
            Some(prev) if (day - prev).num_days() == 1 => current_streak + 1,
            _ => 1,
        };
        longest_streak = longest_streak.max(current_streak);
        prev_day = Some(day);
    }

    let busiest_hour = busiest_label(&hour_counts, |h| format!("{:02}h", h));
    let busiest_weekday = busiest_label(&weekday_counts, |d| DAY_NAMES[d].to_string());

    let total_trips = retained.len() as u32;
    let average_minutes = if total_trips > 0 {
        (total_minutes as f64 / total_trips as f64).round() as u32
    } else {
        0
    };
    let estimated_distance_km = total_minutes as f64 / MINUTES_PER_KM;
    let co2_saved_kg = estimated_distance_km * CO2_KG_PER_KM;
    let years_paid = unique_years.len().max(1) as f64;
    let avg_cost_per_trip_with_subscription = if total_trips > 0 {
        (total_cost + tariff.price * years_paid) / total_trips as f64
    } else {
        0.0
    };

    let id_histogram = histogram
        .into_iter()
        .map(|(bin_start, count)| HistogramBin {
            bin_start,
            range: format!("{:.1}k", bin_start as f64 / 1000.0),
            full_range: format!("{} - {}", bin_start, bin_start + HISTOGRAM_BIN_SIZE - 1),
            count,
        })
        .collect();

    let generation_stats = vec![
        GenerationStat {
            name: "Mecàniques (Originals)",
            count: gen_mec,
        },
        GenerationStat {
            name: "Elèctriques (Clàssiques)",
            count: gen_elec_old,
        },
        GenerationStat {
            name: "Elèctriques (Nova Flota)",
            count: gen_elec_new,
        },
    ];

    let min_bike_id = min_bike_id.unwrap_or(0);
    let night_trips: u32 = hour_counts[..5].iter().sum();
    let longest_duration = longest_trips.first().map(|t| t.duration_minutes);

    let achievements = vec![
        Achievement {
            id: "explorer",
            title: "Explorador",
            desc: "Utilitzar 50 bicis diferents",
            unlocked: unique_bikes >= 50,
            progress: format!("{}/50", unique_bikes.min(50)),
        },
        Achievement {
            id: "veteran",
            title: "Veterà",
            desc: "Trobar una bici amb matrícula inferior a 1000",
            unlocked: min_bike_id > 0 && min_bike_id < 1000,
            progress: if min_bike_id > 0 && min_bike_id < 1000 {
                "Trobat".to_string()
            } else {
                "Pendent".to_string()
            },
        },
        Achievement {
            id: "futurist",
            title: "Futurista",
            desc: "Provar la nova flota (matrícules 8000+)",
            unlocked: gen_elec_new > 0,
            progress: if gen_elec_new > 0 {
                "Desbloquejat".to_string()
            } else {
                "Pendent".to_string()
            },
        },
        Achievement {
            id: "loyal",
            title: "Fidel",
            desc: "Repetir bici 10+ vegades",
            unlocked: repeated_bikes > 10,
            progress: format!("{}/10", repeated_bikes.min(10)),
        },
        Achievement {
            id: "marathon",
            title: "Marató",
            desc: "Un viatge de 45 minuts o més",
            unlocked: longest_duration.is_some_and(|m| m >= 45),
            progress: match longest_duration {
                Some(m) => format!("{}m / 45m", m),
                None => "0m".to_string(),
            },
        },
        Achievement {
            id: "nightowl",
            title: "Nocturn",
            desc: "Viatjar de matinada (00h-05h)",
            unlocked: night_trips > 0,
            progress: if night_trips > 0 {
                "Sí".to_string()
            } else {
                "Mai".to_string()
            },
        },
    ];

    StatsSnapshot {
        total_trips,
        total_minutes,
        total_cost,
        unique_bikes,
        repeated_bikes,
        average_minutes,
        estimated_distance_km,
        co2_saved_kg,
        electric_count,
        mechanical_count,
        avg_cost_per_trip_with_subscription,
        longest_streak,
        top_days,
        longest_trips,
        top_bikes,
        all_bikes,
        destiny_bikes,
        avg_id_by_month,
        max_bike_id,
        min_bike_id,
        busiest_weekday,
        busiest_hour,
        trips_by_hour,
        trips_by_day,
        trips_by_month_name,
        trips_by_date,
        trips_by_week,
        trips_by_month,
        trips_by_year,
        heatmap,
        id_histogram,
        generation_stats,
        achievements,
    }
}

/// Label of the bucket with the strictly highest count, `-` when all are
/// zero. Earlier buckets win ties.
fn busiest_label<F>(counts: &[u32], label: F) -> String
where
    F: Fn(usize) -> String,
{
    let mut best: Option<usize> = None;
    let mut best_count = 0u32;
    for (i, &c) in counts.iter().enumerate() {
        if c > best_count {
            best_count = c;
            best = Some(i);
        }
    }
    best.map(label).unwrap_or_else(|| "-".to_string())
}
