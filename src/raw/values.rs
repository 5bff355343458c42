// src/raw/values.rs

use chrono::{Duration, NaiveDate};
use once_cell::sync::Lazy;
use regex::Regex;

static ISO_PREFIX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(\d{4})-(\d{2})-(\d{2})").expect("ISO date regex should be valid"));
static DOTTED: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(\d{1,2})\.(\d{1,2})\.(\d{2}|\d{4})$").expect("dotted date regex should be valid")
});
static SERIAL: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\d{5,7}(\.\d+)?$").expect("serial date regex should be valid"));

/// Trim whitespace, including the non-breaking spaces Sheets likes to keep.
pub fn clean_str(raw: &str) -> String {
    raw.trim_matches(|c: char| c.is_whitespace() || c == '\u{a0}')
        .to_string()
}

/// Parse a spreadsheet number; accepts a decimal comma. Empty or non-numeric → `None`.
pub fn parse_number(raw: &str) -> Option<f64> {
    let s = raw.trim();
    if s.is_empty() {
        return None;
    }
    s.replace(',', ".")
        .parse::<f64>()
        .ok()
        .filter(|v| v.is_finite())
}

/// Parse the date shapes found in the sheets:
///  - anything starting with `YYYY-MM-DD`
///  - `d.m.yy` / `dd.mm.yyyy` (two-digit years below 50 are 20xx)
///  - a Sheets serial day number of five to seven digits (days since 1899-12-30)
pub fn parse_date(raw: &str) -> Option<NaiveDate> {
    let s = raw.trim();
    if s.is_empty() {
        return None;
    }

    if let Some(c) = ISO_PREFIX.captures(s) {
        return NaiveDate::from_ymd_opt(c[1].parse().ok()?, c[2].parse().ok()?, c[3].parse().ok()?);
    }

    if let Some(c) = DOTTED.captures(s) {
        let day: u32 = c[1].parse().ok()?;
        let month: u32 = c[2].parse().ok()?;
        let mut year: i32 = c[3].parse().ok()?;
        if year < 100 {
            year += if year < 50 { 2000 } else { 1900 };
        }
        return NaiveDate::from_ymd_opt(year, month, day);
    }

    if SERIAL.is_match(s) {
        let days = s.parse::<f64>().ok()?.trunc() as i64;
        let epoch = NaiveDate::from_ymd_opt(1899, 12, 30)?;
        return epoch.checked_add_signed(Duration::days(days));
    }

    None
}

pub fn format_date(date: NaiveDate) -> String {
    date.format("%Y-%m-%d").to_string()
}

/// `YYYY-MM-DD` if the value parses as a date, else `None`.
pub fn normalize_date(raw: &str) -> Option<String> {
    parse_date(raw).map(format_date)
}

/// Normalised date when parseable, otherwise the trimmed label itself.
pub fn date_or_label(raw: &str) -> String {
    normalize_date(raw).unwrap_or_else(|| clean_str(raw))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn numbers_accept_decimal_comma() {
        assert_eq!(parse_number("1,5"), Some(1.5));
        assert_eq!(parse_number(" 2 "), Some(2.0));
        assert_eq!(parse_number("0"), Some(0.0));
        assert_eq!(parse_number(""), None);
        assert_eq!(parse_number("x"), None);
        assert_eq!(parse_number("NaN"), None);
    }

    #[test]
    fn dotted_dates_expand_two_digit_years() {
        assert_eq!(normalize_date("01.01.24").as_deref(), Some("2024-01-01"));
        assert_eq!(normalize_date("8.1.24").as_deref(), Some("2024-01-08"));
        assert_eq!(normalize_date("15.03.99").as_deref(), Some("1999-03-15"));
        assert_eq!(normalize_date("15.03.2023").as_deref(), Some("2023-03-15"));
        assert_eq!(normalize_date("31.02.24"), None);
    }

    #[test]
    fn iso_prefix_and_serial_dates() {
        assert_eq!(
            normalize_date("2024-01-08T19:00:00").as_deref(),
            Some("2024-01-08")
        );
        assert_eq!(normalize_date("45292").as_deref(), Some("2024-01-01"));
        assert_eq!(normalize_date("next week"), None);
    }

    #[test]
    fn short_numbers_are_not_serial_dates() {
        assert_eq!(normalize_date("2023"), None);
        assert_eq!(normalize_date("1"), None);
        assert_eq!(normalize_date("12.5"), None);
        assert_eq!(normalize_date("45299.75").as_deref(), Some("2024-01-08"));
    }

    #[test]
    fn unparseable_dates_fall_back_to_label() {
        assert_eq!(date_or_label(" 01.01.24 "), "2024-01-01");
        assert_eq!(date_or_label(" Concert "), "Concert");
    }

    #[test]
    fn clean_str_strips_nbsp() {
        assert_eq!(clean_str("\u{a0} Anna \t"), "Anna");
    }
}
