// Entry point and high-level CLI flow.
//
// The binary drives the ingestion-and-aggregation pipeline end to end:
// - Option [1] reads one or more Smou activity exports (already converted
//   to delimited text), parses them and merges out duplicates.
// - Option [2] picks a tariff, aggregates the full date range and prints
//   the report, exporting the snapshot to JSON and the trip table to CSV.
use once_cell::sync::Lazy;
use std::io::{self, Write};
use std::sync::Mutex;

use bicing_report::classify::BikeRegistry;
use bicing_report::types::{TariffRules, Trip, TypeFilter};
use bicing_report::{merge, output, parser, stats, tariff, util};

/// Simple in-memory app state so exports are parsed once but reports can
/// be generated repeatedly in a single run.
static APP_STATE: Lazy<Mutex<AppState>> = Lazy::new(|| Mutex::new(AppState { trips: None }));

struct AppState {
    trips: Option<Vec<Trip>>,
}

/// Optional sidecar file with community-confirmed bike ids.
const REGISTRY_FILE: &str = "bicing_ids.json";

const SNAPSHOT_FILE: &str = "summary.json";
const TRIPS_FILE: &str = "trips.csv";

fn read_line(prompt: &str) -> String {
    print!("{}", prompt);
    let _ = io::stdout().flush();
    let mut buf = String::new();
    io::stdin().read_line(&mut buf).ok();
    buf.trim().to_string()
}

/// Ask the user whether to go back to the menu after generating a report.
fn prompt_back_to_menu() -> bool {
    loop {
        match read_line("Back to menu (Y/N): ").to_uppercase().as_str() {
            "Y" => return true,
            "N" => return false,
            _ => println!("Invalid choice. Please enter Y or N."),
        }
    }
}

/// Handle option [1]: parse every given export and merge the batches.
///
/// A header failure in any file aborts the load; a load that parses fine
/// but produces zero trips is reported as its own condition, since that
/// means well-formed files with no Bicing activity rather than bad files.
fn handle_load() {
    let input = read_line("Export file paths (space separated): ");
    if input.is_empty() {
        println!("No files given.\n");
        return;
    }

    let mut batches = Vec::new();
    for path in input.split_whitespace() {
        let text = match std::fs::read_to_string(path) {
            Ok(t) => t,
            Err(e) => {
                eprintln!("Failed to read {}: {}\n", path, e);
                return;
            }
        };
        match parser::parse(&text) {
            Ok(batch) => {
                println!("{}: {} trips", path, util::format_int(batch.len() as i64));
                batches.push(batch);
            }
            Err(e) => {
                eprintln!("Failed to parse {}: {}\n", path, e);
                return;
            }
        }
    }

    let outcome = merge::merge(batches);
    if outcome.trips.is_empty() {
        println!(
            "Files were read but contained no Bicing trips. \
             Check that they are Smou activity exports.\n"
        );
        return;
    }
    println!(
        "Loaded {} unique trips ({} duplicates removed).\n",
        util::format_int(outcome.trips.len() as i64),
        util::format_int(outcome.duplicates_removed as i64)
    );
    let mut state = APP_STATE.lock().unwrap();
    state.trips = Some(outcome.trips);
}

fn prompt_tariff() -> &'static TariffRules {
    loop {
        println!("Select tariff:");
        for (idx, t) in tariff::TARIFFS.iter().enumerate() {
            println!("[{}] {} ({} EUR/any)", idx + 1, t.name, t.price);
        }
        if let Ok(n) = read_line("Enter choice: ").parse::<usize>() {
            if (1..=tariff::TARIFFS.len()).contains(&n) {
                return &tariff::TARIFFS[n - 1];
            }
        }
        println!("Invalid choice.\n");
    }
}

fn load_registry() -> BikeRegistry {
    std::fs::read_to_string(REGISTRY_FILE)
        .ok()
        .and_then(|text| BikeRegistry::from_json(&text).ok())
        .unwrap_or_default()
}

/// Handle option [2]: aggregate the loaded trips over their full date
/// range and print/export the report.
fn handle_report() {
    let trips = {
        let state = APP_STATE.lock().unwrap();
        state.trips.clone()
    };
    let Some(trips) = trips else {
        println!("Error: No data loaded. Please load the export files first (option 1).\n");
        return;
    };
    let Some(bounds) = stats::date_bounds(&trips) else {
        println!("Error: No data loaded. Please load the export files first (option 1).\n");
        return;
    };

    let selected = prompt_tariff();
    let registry = load_registry();

    println!(
        "\nGenerating report for {} - {} ({})...\n",
        util::format_short_date(bounds.min),
        util::format_short_date(bounds.max),
        selected.name
    );
    let snap = stats::aggregate(
        &trips,
        bounds.min,
        bounds.max,
        selected,
        TypeFilter::All,
        &registry,
    );

    println!(
        "Trips: {}   Minutes: {}   Cost under tariff: {} EUR",
        util::format_int(snap.total_trips as i64),
        util::format_int(snap.total_minutes as i64),
        util::format_number(snap.total_cost, 2)
    );
    println!(
        "Bikes: {} unique, {} repeated   Electric: {}   Mechanical: {}",
        util::format_int(snap.unique_bikes as i64),
        util::format_int(snap.repeated_bikes as i64),
        util::format_int(snap.electric_count as i64),
        util::format_int(snap.mechanical_count as i64)
    );
    println!(
        "Average trip: {} min   Distance: {} km   CO2 saved: {} kg",
        snap.average_minutes,
        util::format_number(snap.estimated_distance_km, 2),
        util::format_number(snap.co2_saved_kg, 2)
    );
    println!(
        "Avg cost per trip (incl. subscription): {} EUR",
        util::format_number(snap.avg_cost_per_trip_with_subscription, 2)
    );
    println!(
        "Longest streak: {} days   Busiest: {} at {}\n",
        snap.longest_streak, snap.busiest_weekday, snap.busiest_hour
    );

    println!("Achievements:");
    for a in &snap.achievements {
        let mark = if a.unlocked { "x" } else { " " };
        println!("  [{}] {} - {} ({})", mark, a.title, a.desc, a.progress);
    }
    println!();

    println!("Top bikes:");
    output::preview_table_rows(&output::top_bike_rows(&snap.top_bikes), 5);
    println!("Top days:");
    output::preview_table_rows(&output::top_day_rows(&snap.top_days), 5);
    println!("Destiny bikes (reused after a 30+ day gap):");
    output::preview_table_rows(&output::destiny_bike_rows(&snap.destiny_bikes), 5);

    if let Err(e) = output::write_json(SNAPSHOT_FILE, &snap) {
        eprintln!("Write error: {}", e);
    } else {
        println!("(Full snapshot exported to {})", SNAPSHOT_FILE);
    }
    let rows = output::trip_export_rows(&trips, selected, &registry);
    if let Err(e) = output::write_csv(TRIPS_FILE, &rows) {
        eprintln!("Write error: {}", e);
    } else {
        println!("(Trip table exported to {})\n", TRIPS_FILE);
    }
}

fn main() {
    loop {
        println!("Bicing report");
        println!("[1] Load export files");
        println!("[2] Generate report\n");
        match read_line("Enter choice: ").as_str() {
            "1" => handle_load(),
            "2" => {
                println!();
                handle_report();
                if !prompt_back_to_menu() {
                    println!("Exiting the program.");
                    break;
                }
            }
            _ => println!("Invalid choice. Please enter 1 or 2.\n"),
        }
    }
}
