// Tolerant parser for Smou activity exports.
//
// The exports have no fixed schema: the header row can sit anywhere in the
// first lines after preamble junk, the delimiter varies between comma,
// semicolon and tab, and column names come in Catalan, Spanish or English.
// The header is located by substring co-occurrence, the delimiter by
// majority count, and every data row is parsed best-effort: a row that
// cannot be understood is dropped, never fatal.
use csv::ReaderBuilder;
use thiserror::Error;

use crate::types::Trip;
use crate::util::{normalize, parse_cost_eur, parse_date_flexible, parse_duration_minutes};

/// How far into the file the header row may appear.
const HEADER_SCAN_LINES: usize = 50;

/// Column-name pairs whose co-occurrence (normalized) identifies the header
/// row. Evaluated top to bottom; first match wins. New export formats are
/// supported by adding a pair here.
const HEADER_RULES: &[(&str, &str)] = &[
    ("matricula", "inici"),
    ("liquidacio", "inici"),
    ("matricula", "import"),
];

const START_PATTERNS: &[&str] = &["inici", "start"];
const END_PATTERNS: &[&str] = &["fi", "end"];
const BIKE_PATTERNS: &[&str] = &["matricula", "bike"];
const DURATION_PATTERNS: &[&str] = &["unitats", "durada", "tiempo", "time"];
const COST_PATTERNS: &[&str] = &["import", "cost"];
const SERVICE_PATTERNS: &[&str] = &["servei", "service"];
const SETTLEMENT_PATTERNS: &[&str] = &["liquidacio", "id"];

/// Normalized token that marks a row as belonging to the bike service.
/// Rows carrying a different service (metro, bus) are excluded.
const SERVICE_TOKEN: &str = "bicing";

/// Canonical service tag stamped on every produced trip.
pub const SERVICE_NAME: &str = "Bicing";

/// Prefix of synthetic trip ids assigned when the export carries no
/// settlement number. Positional, so NOT unique across files; the merger
/// falls back to a composite key for these.
pub const PLACEHOLDER_PREFIX: &str = "row-";

#[derive(Debug, Error)]
pub enum ParseError {
    #[error("no s'ha trobat la capçalera (Matrícula, Data d'inici)")]
    HeaderNotFound,
}

struct Columns {
    start: Option<usize>,
    end: Option<usize>,
    bike: Option<usize>,
    duration: Option<usize>,
    cost: Option<usize>,
    service: Option<usize>,
    settlement: Option<usize>,
}

fn resolve_column(headers: &[String], patterns: &[&str]) -> Option<usize> {
    headers
        .iter()
        .position(|h| patterns.iter().any(|p| h.contains(p)))
}

/// Pick the delimiter that occurs strictly most often in the header line.
/// Ties default to comma.
fn infer_delimiter(header_line: &str) -> u8 {
    let tabs = header_line.matches('\t').count();
    let semis = header_line.matches(';').count();
    let commas = header_line.matches(',').count();
    if tabs > commas && tabs > semis {
        b'\t'
    } else if semis > commas && semis > tabs {
        b';'
    } else {
        b','
    }
}

/// Parse one raw export into trip records.
///
/// The only fatal condition is failing to locate a header row within the
/// first [`HEADER_SCAN_LINES`] lines. Malformed rows and rows belonging to
/// other services are skipped silently.
pub fn parse(raw_text: &str) -> Result<Vec<Trip>, ParseError> {
    let lines: Vec<&str> = raw_text.lines().collect();

    let mut header_idx = None;
    for (i, line) in lines.iter().take(HEADER_SCAN_LINES).enumerate() {
        let norm = normalize(line);
        if HEADER_RULES
            .iter()
            .any(|(a, b)| norm.contains(a) && norm.contains(b))
        {
            header_idx = Some(i);
            break;
        }
    }
    let header_idx = header_idx.ok_or(ParseError::HeaderNotFound)?;
    let delimiter = infer_delimiter(lines[header_idx]);

    // Feed everything from the header line on through the csv reader so
    // quoted fields are split consistently for header and data alike.
    let body = lines[header_idx..].join("\n");
    let mut reader = ReaderBuilder::new()
        .delimiter(delimiter)
        .has_headers(false)
        .flexible(true)
        .from_reader(body.as_bytes());

    let mut records = reader.records();
    let header = match records.next() {
        Some(Ok(rec)) => rec,
        _ => return Err(ParseError::HeaderNotFound),
    };
    let headers: Vec<String> = header.iter().map(normalize).collect();

    let cols = Columns {
        start: resolve_column(&headers, START_PATTERNS),
        end: resolve_column(&headers, END_PATTERNS),
        bike: resolve_column(&headers, BIKE_PATTERNS),
        duration: resolve_column(&headers, DURATION_PATTERNS),
        cost: resolve_column(&headers, COST_PATTERNS),
        service: resolve_column(&headers, SERVICE_PATTERNS),
        settlement: resolve_column(&headers, SETTLEMENT_PATTERNS),
    };

    let mut trips = Vec::new();
    for (row_no, record) in records.enumerate() {
        let Ok(record) = record else { continue };
        let field = |idx: Option<usize>| idx.and_then(|i| record.get(i)).map(str::trim);

        let Some(start) = field(cols.start).and_then(parse_date_flexible) else {
            continue;
        };

        if let Some(svc) = field(cols.service) {
            let svc = normalize(svc);
            if !svc.is_empty() && !svc.contains(SERVICE_TOKEN) {
                continue;
            }
        }

        let end = field(cols.end)
            .and_then(parse_date_flexible)
            .unwrap_or(start);
        let duration = field(cols.duration).map(parse_duration_minutes).unwrap_or(0);
        let cost = field(cols.cost).map(parse_cost_eur).unwrap_or(0.0);
        let bike_id = field(cols.bike).unwrap_or("?").to_string();
        let id = match field(cols.settlement) {
            Some(v) if !v.is_empty() => v.to_string(),
            _ => format!("{}{}", PLACEHOLDER_PREFIX, row_no + 1),
        };

        trips.push(Trip {
            id,
            start_date: start,
            end_date: end,
            bike_id,
            duration_minutes: duration,
            cost,
            service: SERVICE_NAME.to_string(),
        });
    }

    Ok(trips)
}
