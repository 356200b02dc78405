// Utility helpers for text normalization, date/number parsing and display
// formatting.
//
// This module centralizes all the "dirty" handling of Smou exports so the
// rest of the code can assume clean, typed values. The exports mix Catalan
// and Spanish column names, `DD/MM/YYYY` dates and European decimals.
use chrono::{Datelike, NaiveDate, NaiveDateTime};
use num_format::{Locale, ToFormattedString};

/// Weekday names as shown on the dashboard, Monday first.
pub const DAY_NAMES: [&str; 7] = [
    "Dilluns",
    "Dimarts",
    "Dimecres",
    "Dijous",
    "Divendres",
    "Dissabte",
    "Diumenge",
];

/// Short month names, January first.
pub const MONTH_ABBR: [&str; 12] = [
    "Gen", "Feb", "Mar", "Abr", "Mai", "Jun", "Jul", "Ago", "Set", "Oct", "Nov", "Des",
];

const MONTH_LONG: [&str; 12] = [
    "gener",
    "febrer",
    "març",
    "abril",
    "maig",
    "juny",
    "juliol",
    "agost",
    "setembre",
    "octubre",
    "novembre",
    "desembre",
];

fn fold_accent(c: char) -> char {
    match c {
        'à' | 'á' | 'â' | 'ä' => 'a',
        'è' | 'é' | 'ê' | 'ë' => 'e',
        'ì' | 'í' | 'î' | 'ï' => 'i',
        'ò' | 'ó' | 'ô' | 'ö' => 'o',
        'ù' | 'ú' | 'û' | 'ü' => 'u',
        'ç' => 'c',
        'ñ' => 'n',
        _ => c,
    }
}

/// Lowercase, trim and strip the accents that appear in Catalan/Spanish
/// headers ("Matrícula", "Número liquidació"), so header matching can use
/// plain ASCII substrings.
pub fn normalize(s: &str) -> String {
    s.trim().to_lowercase().chars().map(fold_accent).collect()
}

/// Parse `DD/MM/YYYY[ HH:MM[:SS]]` into a local-calendar timestamp.
///
/// - A missing time component defaults to midnight.
/// - Individual time fields that fail to parse fall back to 0, and a time
///   that is out of range degrades to midnight rather than dropping the row.
/// - Returns `None` when the date part itself is absent or malformed.
pub fn parse_date_flexible(raw: &str) -> Option<NaiveDateTime> {
    let clean = raw.trim();
    if clean.is_empty() {
        return None;
    }
    let mut parts = clean.splitn(2, ' ');
    let date = NaiveDate::parse_from_str(parts.next()?, "%d/%m/%Y").ok()?;

    let (mut hour, mut min, mut sec) = (0u32, 0u32, 0u32);
    if let Some(time_part) = parts.next() {
        let mut fields = time_part.trim().split(':');
        hour = fields.next().and_then(|v| v.parse().ok()).unwrap_or(0);
        min = fields.next().and_then(|v| v.parse().ok()).unwrap_or(0);
        sec = fields.next().and_then(|v| v.parse().ok()).unwrap_or(0);
    }
    date.and_hms_opt(hour, min, sec)
        .or_else(|| date.and_hms_opt(0, 0, 0))
}

/// Extract the duration in minutes from cells like `13`, `13 min` or
/// `Unitats: 13`. The first contiguous run of digits wins; anything else
/// yields 0.
pub fn parse_duration_minutes(raw: &str) -> u32 {
    let digits: String = raw
        .chars()
        .skip_while(|c| !c.is_ascii_digit())
        .take_while(|c| c.is_ascii_digit())
        .collect();
    digits.parse().unwrap_or(0)
}

/// Parse a European-style money cell (`1.234,56 €`) into euros.
///
/// Currency symbols and whitespace are stripped first. When a comma is
/// present it is the decimal point and any dot is a thousands separator;
/// otherwise the string is assumed to be dot-decimal already. Unparseable
/// or negative values yield 0.
pub fn parse_cost_eur(raw: &str) -> f64 {
    let mut clean: String = raw
        .chars()
        .filter(|c| *c != '€' && !c.is_whitespace())
        .collect();
    if clean.contains(',') {
        clean.retain(|c| c != '.');
        clean = clean.replace(',', ".");
    }
    clean.parse::<f64>().unwrap_or(0.0).max(0.0)
}

/// Display label for a calendar date, `DD/MM/YYYY`.
pub fn format_short_date(d: NaiveDate) -> String {
    d.format("%d/%m/%Y").to_string()
}

/// Long Catalan date, e.g. `3 d'abril de 2024`.
pub fn format_long_date(d: NaiveDate) -> String {
    let month = MONTH_LONG[d.month0() as usize];
    let de = if month.starts_with(['a', 'o']) { "d'" } else { "de " };
    format!("{} {}{} de {}", d.day(), de, month, d.year())
}

/// Short month label for chart axes, e.g. `Gen 24`.
pub fn format_month_label(year: i32, month: u32) -> String {
    let idx = (month.clamp(1, 12) - 1) as usize;
    format!("{} {:02}", MONTH_ABBR[idx], year.rem_euclid(100))
}

/// Fixed-decimal formatting with thousands separators (`1,234,567.89`),
/// used for money and distance figures in console output.
pub fn format_number(n: f64, decimals: usize) -> String {
    let neg = n.is_sign_negative();
    let s = format!("{:.*}", decimals, n.abs());
    let mut parts = s.split('.');
    let int_val: i64 = parts.next().unwrap_or("0").parse().unwrap_or(0);
    let mut res = int_val.to_formatted_string(&Locale::en);
    if let Some(frac) = parts.next() {
        res.push('.');
        res.push_str(frac);
    }
    if neg {
        format!("-{}", res)
    } else {
        res
    }
}

/// Thousands-separated integer, used for row/trip counts in console
/// messages (e.g. `9,855 trips loaded`).
pub fn format_int<T>(n: T) -> String
where
    T: ToFormattedString,
{
    n.to_formatted_string(&Locale::en)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_strips_accents_and_case() {
        assert_eq!(normalize("  Matrícula  "), "matricula");
        assert_eq!(normalize("Número liquidació"), "numero liquidacio");
        assert_eq!(normalize("DATA D'INICI"), "data d'inici");
    }

    #[test]
    fn date_with_full_time() {
        let dt = parse_date_flexible("05/03/2024 14:30:15").unwrap();
        assert_eq!(dt.to_string(), "2024-03-05 14:30:15");
    }

    #[test]
    fn date_without_time_is_midnight() {
        let dt = parse_date_flexible("31/12/2023").unwrap();
        assert_eq!(dt.to_string(), "2023-12-31 00:00:00");
    }

    #[test]
    fn date_with_partial_time() {
        let dt = parse_date_flexible("01/01/2024 09:05").unwrap();
        assert_eq!(dt.to_string(), "2024-01-01 09:05:00");
    }

    #[test]
    fn bad_dates_are_rejected() {
        assert!(parse_date_flexible("").is_none());
        assert!(parse_date_flexible("2024-03-05").is_none());
        assert!(parse_date_flexible("32/01/2024").is_none());
    }

    #[test]
    fn out_of_range_time_degrades_to_midnight() {
        let dt = parse_date_flexible("05/03/2024 99:00").unwrap();
        assert_eq!(dt.to_string(), "2024-03-05 00:00:00");
    }

    #[test]
    fn duration_takes_first_digit_run() {
        assert_eq!(parse_duration_minutes("13"), 13);
        assert_eq!(parse_duration_minutes("13 min"), 13);
        assert_eq!(parse_duration_minutes("durada: 45m"), 45);
        assert_eq!(parse_duration_minutes("1h 30m"), 1);
        assert_eq!(parse_duration_minutes("cap"), 0);
    }

    #[test]
    fn cost_handles_european_decimals() {
        assert_eq!(parse_cost_eur("0,35 €"), 0.35);
        assert_eq!(parse_cost_eur("1.234,56"), 1234.56);
        assert_eq!(parse_cost_eur("2.50"), 2.50);
        assert_eq!(parse_cost_eur(""), 0.0);
        assert_eq!(parse_cost_eur("gratis"), 0.0);
    }

    #[test]
    fn long_date_contracts_before_vowels() {
        let d = NaiveDate::from_ymd_opt(2024, 4, 3).unwrap();
        assert_eq!(format_long_date(d), "3 d'abril de 2024");
        let d = NaiveDate::from_ymd_opt(2024, 1, 15).unwrap();
        assert_eq!(format_long_date(d), "15 de gener de 2024");
    }

    #[test]
    fn month_label_uses_two_digit_year() {
        assert_eq!(format_month_label(2024, 1), "Gen 24");
        assert_eq!(format_month_label(2019, 12), "Des 19");
    }

    #[test]
    fn number_formatting() {
        assert_eq!(format_number(1234567.891, 2), "1,234,567.89");
        assert_eq!(format_number(-42.5, 2), "-42.50");
        assert_eq!(format_number(3.0, 0), "3");
        assert_eq!(format_int(9855i64), "9,855");
    }
}
