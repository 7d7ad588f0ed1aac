use chrono::{DateTime, Duration, NaiveDate, NaiveDateTime, SecondsFormat, Utc};

use crate::parser::types::CellValue;

/// ISO-8601 without offset, tried after RFC 3339.
const ISO_NAIVE_FMTS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M",
];
const ISO_DATE_FMT: &str = "%Y-%m-%d";

/// Local patterns, day first.
const LOCAL_DT_FMTS: &[&str] = &["%d/%m/%Y %H:%M:%S", "%d/%m/%Y %H:%M"];

const MS_PER_DAY: f64 = 86_400_000.0;

/// Spreadsheet day zero. Engines count 1900 as a leap year, so serial 1 is
/// 1899-12-31 and serial 61 is 1900-03-01.
fn serial_epoch() -> NaiveDateTime {
    NaiveDate::from_ymd_opt(1899, 12, 30)
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .unwrap_or_default()
}

/// Parse a date in any of the accepted shapes, in order: ISO-8601,
/// spreadsheet serial number, `dd/mm/yyyy HH:mm:ss`, `dd/mm/yyyy HH:mm`.
/// Times without an offset are taken as UTC. Never fails; `None` when no
/// shape produces a valid instant.
pub fn parse_flexible_date(input: &str) -> Option<DateTime<Utc>> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return None;
    }
    parse_iso(trimmed)
        .or_else(|| parse_serial_str(trimmed))
        .or_else(|| parse_local(trimmed))
}

/// Cell-aware variant: numeric cells are read as serial dates directly.
pub fn parse_cell_date(cell: &CellValue) -> Option<DateTime<Utc>> {
    match cell {
        CellValue::Number(n) => serial_to_datetime(*n),
        CellValue::Text(s) => parse_flexible_date(s),
        CellValue::Empty | CellValue::Bool(_) => None,
    }
}

fn parse_iso(s: &str) -> Option<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Utc));
    }
    ISO_NAIVE_FMTS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(s, fmt).ok())
        .or_else(|| {
            NaiveDate::parse_from_str(s, ISO_DATE_FMT)
                .ok()
                .and_then(|d| d.and_hms_opt(0, 0, 0))
        })
        .map(|naive| naive.and_utc())
}

fn parse_local(s: &str) -> Option<DateTime<Utc>> {
    LOCAL_DT_FMTS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(s, fmt).ok())
        .map(|naive| naive.and_utc())
}

/// Plain decimal literal: optional sign, digits, optional fraction.
/// Rejects "inf", "NaN", exponents and the like that `f64::from_str` accepts.
fn is_decimal_literal(s: &str) -> bool {
    let body = s.strip_prefix(['-', '+']).unwrap_or(s);
    let mut parts = body.splitn(2, '.');
    let int_part = parts.next().unwrap_or("");
    let frac_part = parts.next();
    let digits = |p: &str| p.chars().all(|c| c.is_ascii_digit());
    match frac_part {
        Some(frac) => {
            (!int_part.is_empty() || !frac.is_empty()) && digits(int_part) && digits(frac)
        }
        None => !int_part.is_empty() && digits(int_part),
    }
}

fn parse_serial_str(s: &str) -> Option<DateTime<Utc>> {
    if !is_decimal_literal(s) {
        return None;
    }
    s.parse::<f64>().ok().and_then(serial_to_datetime)
}

/// Spreadsheet serial day number → instant. Fractional days carry the
/// time of day, rounded to the millisecond.
pub fn serial_to_datetime(serial: f64) -> Option<DateTime<Utc>> {
    if !serial.is_finite() {
        return None;
    }
    let millis = (serial * MS_PER_DAY).round();
    if millis.abs() > i64::MAX as f64 {
        return None;
    }
    let delta = Duration::try_milliseconds(millis as i64)?;
    serial_epoch()
        .checked_add_signed(delta)
        .map(|naive| naive.and_utc())
}

/// ISO-8601 string used for every timestamp stored on a ticket.
pub fn format_iso(dt: &DateTime<Utc>) -> String {
    dt.to_rfc3339_opts(SecondsFormat::AutoSi, true)
}

/// Serde-compatible deserializers for use with `#[serde(deserialize_with = "de::...")]`.
pub mod de {
    use chrono::{DateTime, Utc};
    use serde::{self, Deserialize, Deserializer};

    /// "2025-04-01T08:00:00" / "01/04/2025 08:00" / "45748.33" → Some(instant), "" or null → None
    pub fn flexible_datetime_opt<'de, D>(deserializer: D) -> Result<Option<DateTime<Utc>>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = Option::<String>::deserialize(deserializer)?;
        match s.as_deref().map(str::trim) {
            None | Some("") => Ok(None),
            Some(text) => super::parse_flexible_date(text)
                .map(Some)
                .ok_or_else(|| serde::de::Error::custom(format!("invalid date: {:?}", text))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Datelike, TimeZone, Timelike};

    fn utc(y: i32, mo: u32, d: u32, h: u32, mi: u32, s: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, mo, d, h, mi, s).unwrap()
    }

    #[test]
    fn test_iso_variants() {
        assert_eq!(parse_flexible_date("2025-04-01T08:00:00"), Some(utc(2025, 4, 1, 8, 0, 0)));
        assert_eq!(parse_flexible_date("2025-04-01 08:00:00"), Some(utc(2025, 4, 1, 8, 0, 0)));
        assert_eq!(parse_flexible_date("2025-04-01T08:00"), Some(utc(2025, 4, 1, 8, 0, 0)));
        assert_eq!(parse_flexible_date("2025-04-01"), Some(utc(2025, 4, 1, 0, 0, 0)));
        assert_eq!(parse_flexible_date("2025-04-01T08:00:00-03:00"), Some(utc(2025, 4, 1, 11, 0, 0)));
        assert_eq!(parse_flexible_date("2025-04-01T08:00:00Z"), Some(utc(2025, 4, 1, 8, 0, 0)));
    }

    #[test]
    fn test_iso_round_trip() {
        let instants = [
            utc(2025, 4, 1, 8, 0, 0),
            utc(1999, 12, 31, 23, 59, 59),
            utc(2024, 2, 29, 12, 30, 15) + Duration::milliseconds(250),
            utc(2030, 1, 1, 0, 0, 0) + Duration::nanoseconds(123_456_789),
        ];
        for t in instants {
            assert_eq!(parse_flexible_date(&format_iso(&t)), Some(t), "{}", format_iso(&t));
        }
    }

    #[test]
    fn test_serial_date_epoch_and_time_of_day() {
        // 45675 days after 1899-12-30 is 2025-01-18 (cross-check: 45658 is 2025-01-01); .6667 of a day is ~16:00.
        let dt = parse_flexible_date("45675.6667").unwrap();
        assert_eq!((dt.year(), dt.month(), dt.day()), (2025, 1, 18));
        assert_eq!(dt.hour(), 16);
        assert_eq!(dt.minute(), 0);
    }

    #[test]
    fn test_serial_date_known_values() {
        assert_eq!(parse_flexible_date("45658"), Some(utc(2025, 1, 1, 0, 0, 0)));
        assert_eq!(parse_flexible_date("61"), Some(utc(1900, 3, 1, 0, 0, 0)));
        assert_eq!(parse_flexible_date("45658.5"), Some(utc(2025, 1, 1, 12, 0, 0)));
        assert_eq!(parse_cell_date(&CellValue::Number(45658.25)), Some(utc(2025, 1, 1, 6, 0, 0)));
    }

    #[test]
    fn test_local_patterns() {
        assert_eq!(parse_flexible_date("05/01/2026 16:24:10"), Some(utc(2026, 1, 5, 16, 24, 10)));
        assert_eq!(parse_flexible_date("05/01/2026 16:24"), Some(utc(2026, 1, 5, 16, 24, 0)));
    }

    #[test]
    fn test_invalid_inputs_yield_none() {
        for input in ["", "   ", "not-a-date", "32/01/2025 10:00", "2025-13-01", "NaN", "inf", "1e5", ".", "-", "31/02/2025 10:00"] {
            assert_eq!(parse_flexible_date(input), None, "input {input:?}");
        }
        assert_eq!(parse_cell_date(&CellValue::Number(f64::NAN)), None);
        assert_eq!(parse_cell_date(&CellValue::Number(f64::INFINITY)), None);
        assert_eq!(parse_cell_date(&CellValue::Number(1e300)), None);
        assert_eq!(parse_cell_date(&CellValue::Empty), None);
        assert_eq!(parse_cell_date(&CellValue::Bool(true)), None);
    }

    #[test]
    fn test_de_flexible_datetime_opt() {
        #[derive(serde::Deserialize)]
        struct Stamp {
            #[serde(default, deserialize_with = "de::flexible_datetime_opt")]
            at: Option<DateTime<Utc>>,
        }
        let p: Stamp = serde_json::from_str(r#"{"at": "01/04/2025 08:00"}"#).unwrap();
        assert_eq!(p.at, Some(utc(2025, 4, 1, 8, 0, 0)));
        let p: Stamp = serde_json::from_str(r#"{"at": null}"#).unwrap();
        assert!(p.at.is_none());
        let p: Stamp = serde_json::from_str("{}").unwrap();
        assert!(p.at.is_none());
        assert!(serde_json::from_str::<Stamp>(r#"{"at": "garbage"}"#).is_err());
    }
}
