//! Date normalization for statement text.
//!
//! Statements print dates in many shapes. [`normalize_date`] tries an
//! ordered list of interpretations and keeps the first one that yields a
//! real calendar date. Day-first comes before month-first, so an ambiguous
//! `03/04/2023` is always the 3rd of April.

use crate::error::{Error, Result};
use chrono::NaiveDate;
use regex::Regex;
use std::sync::OnceLock;

/// Regex fragment matching one date-shaped token.
pub const DATE_TOKEN: &str = concat!(
    r"(?:\d{1,2}[/-]\d{1,2}[/-]\d{2,4}",
    r"|\d{4}[/-]\d{1,2}[/-]\d{1,2}",
    r"|\d{1,2}[\s-](?i:Jan|Feb|Mar|Apr|May|Jun|Jul|Aug|Sep|Oct|Nov|Dec)[a-zA-Z]*[\s-]\d{2,4})"
);

/// A single interpretation of a date string.
pub type DateCandidate = fn(&str) -> Option<NaiveDate>;

/// Interpretations in priority order.
pub const DATE_CANDIDATES: [DateCandidate; 4] = [
    parse_day_month_year,
    parse_month_day_year,
    parse_year_month_day,
    parse_textual,
];

/// Formats tried by the last-resort direct parse.
const TEXTUAL_FORMATS: &[&str] = &[
    // two-digit years first; %Y would accept "23" as the year 23
    "%d %b %y", // 1 Apr 23
    "%d-%b-%y", // 01-Apr-23
    "%d %b %Y", // 1 Apr 2023
    "%d-%b-%Y", // 01-Apr-2023
    "%d %B %Y", // 01 April 2023
    "%b %d, %Y", // Apr 1, 2023
    "%B %d, %Y", // April 1, 2023
    "%d.%m.%Y", // 01.04.2023
    "%Y%m%d",   // 20230401
];

fn numeric_dmy_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^(\d{1,2})[/-](\d{1,2})[/-](\d{2}|\d{4})$").expect("dmy regex"))
}

fn numeric_ymd_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^(\d{4})[/-](\d{1,2})[/-](\d{1,2})$").expect("ymd regex"))
}

fn date_token_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(DATE_TOKEN).expect("date token regex"))
}

fn leading_date_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(&format!(r"^\s*({})", DATE_TOKEN)).expect("leading date regex"))
}

/// Normalize a date substring into a calendar date.
pub fn normalize_date(raw: &str) -> Result<NaiveDate> {
    let s = raw.trim();
    DATE_CANDIDATES
        .iter()
        .find_map(|candidate| candidate(s))
        .ok_or_else(|| Error::DateFormat(raw.to_string()))
}

/// Every date-shaped substring of `text`, in order of appearance.
pub fn find_date_tokens(text: &str) -> Vec<&str> {
    date_token_re().find_iter(text).map(|m| m.as_str()).collect()
}

/// The date token a line starts with, if any.
pub fn leading_date_token(line: &str) -> Option<&str> {
    leading_date_re()
        .captures(line)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str())
}

/// Expand a two-digit year the way chrono's `%y` does.
fn expand_year(raw: &str) -> Option<i32> {
    let year: i32 = raw.parse().ok()?;
    match raw.len() {
        2 if year < 70 => Some(2000 + year),
        2 => Some(1900 + year),
        4 => Some(year),
        _ => None,
    }
}

fn numeric_parts(s: &str) -> Option<(u32, u32, &str)> {
    let caps = numeric_dmy_re().captures(s)?;
    let first = caps.get(1)?.as_str().parse().ok()?;
    let second = caps.get(2)?.as_str().parse().ok()?;
    Some((first, second, caps.get(3)?.as_str()))
}

/// `dd/mm/yyyy`, `dd-mm-yy`
pub fn parse_day_month_year(s: &str) -> Option<NaiveDate> {
    let (day, month, year) = numeric_parts(s)?;
    NaiveDate::from_ymd_opt(expand_year(year)?, month, day)
}

/// `mm/dd/yyyy`, `mm-dd-yy`
pub fn parse_month_day_year(s: &str) -> Option<NaiveDate> {
    let (month, day, year) = numeric_parts(s)?;
    NaiveDate::from_ymd_opt(expand_year(year)?, month, day)
}

/// `yyyy-mm-dd`, `yyyy/mm/dd`
pub fn parse_year_month_day(s: &str) -> Option<NaiveDate> {
    let caps = numeric_ymd_re().captures(s)?;
    let year = caps.get(1)?.as_str().parse().ok()?;
    let month = caps.get(2)?.as_str().parse().ok()?;
    let day = caps.get(3)?.as_str().parse().ok()?;
    NaiveDate::from_ymd_opt(year, month, day)
}

/// Month names and other direct formats.
pub fn parse_textual(s: &str) -> Option<NaiveDate> {
    let collapsed = s.split_whitespace().collect::<Vec<_>>().join(" ");
    TEXTUAL_FORMATS
        .iter()
        .find_map(|format| NaiveDate::parse_from_str(&collapsed, format).ok())
}
