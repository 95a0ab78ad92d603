//! Date-phrase recognition and the relative periods understood by the pattern rules.

use crate::guard;
use chrono::{Datelike, Duration, NaiveDate};
use once_cell::sync::Lazy;
use regex::{Captures, Regex};
use serde::Serialize;
use std::fmt;

const MONTHS: [&str; 12] = [
    "january",
    "february",
    "march",
    "april",
    "may",
    "june",
    "july",
    "august",
    "september",
    "october",
    "november",
    "december",
];

/// Inclusive calendar range, `start <= end`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct DateRange {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl DateRange {
    pub fn new(start: NaiveDate, end: NaiveDate) -> Option<Self> {
        (start <= end).then_some(Self { start, end })
    }

    /// Parses a pair of `YYYY-MM-DD` strings.
    pub fn from_iso(start: &str, end: &str) -> Option<Self> {
        let start = NaiveDate::parse_from_str(start.trim(), "%Y-%m-%d").ok()?;
        let end = NaiveDate::parse_from_str(end.trim(), "%Y-%m-%d").ok()?;
        Self::new(start, end)
    }

    pub fn start_iso(&self) -> String {
        self.start.format("%Y-%m-%d").to_string()
    }

    pub fn end_iso(&self) -> String {
        self.end.format("%Y-%m-%d").to_string()
    }

    /// Number of calendar days covered, counting both ends.
    pub fn days(&self) -> i64 {
        (self.end - self.start).num_days() + 1
    }
}

impl fmt::Display for DateRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} to {}", self.start_iso(), self.end_iso())
    }
}

type DateRule = fn(&str) -> Option<DateRange>;

// Order matters: the first rule producing a range wins.
const DATE_RULES: &[(&str, DateRule)] = &[
    ("week_number", parse_week_number),
    ("month_day_span", parse_month_day_span),
    ("iso_range", parse_iso_range),
    ("cross_month", parse_cross_month),
    ("between", parse_between),
    ("cross_month_trailing_year", parse_cross_month_trailing_year),
];

static WEEK_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\bweek\s+(\d{1,2})\s+(?:of\s+)?(\d{4})\b").expect("week regex"));
static MONTH_SPAN_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\b([a-z]+)\s+(\d{1,2})\s*-\s*(\d{1,2}),?\s+(\d{4})\b").expect("month span regex")
});
static ISO_RANGE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\b(\d{4}-\d{2}-\d{2})\s+to\s+(\d{4}-\d{2}-\d{2})\b").expect("iso range regex")
});
static CROSS_MONTH_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?:\bfrom\s+)?\b([a-z]+)\s+(\d{1,2}),?\s*(\d{4})\s+to\s+([a-z]+)\s+(\d{1,2}),?\s*(\d{4})\b",
    )
    .expect("cross month regex")
});
static BETWEEN_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"\bbetween\s+([a-z]+)\s+(\d{1,2}),?\s*(\d{4})\s+and\s+([a-z]+)\s+(\d{1,2}),?\s*(\d{4})\b",
    )
    .expect("between regex")
});
static TRAILING_YEAR_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?:\bfrom\s+)?\b([a-z]+)\s+(\d{1,2})\s+to\s+([a-z]+)\s+(\d{1,2}),?\s*(\d{4})\b")
        .expect("trailing year regex")
});

/// Recognises an absolute date-range phrase. Guard rejections and unknown
/// phrasings both yield `None`.
pub fn parse_date_range(text: &str) -> Option<DateRange> {
    if !guard::validate(text) {
        return None;
    }
    let lowered = text.to_lowercase();
    DATE_RULES.iter().find_map(|(name, rule)| {
        let range = rule(&lowered)?;
        tracing::debug!(rule = name, %range, "date phrase recognised");
        Some(range)
    })
}

/// Full month name, its three-letter abbreviation, or "sept".
pub fn month_number(name: &str) -> Option<u32> {
    let name = name.to_lowercase();
    let name = if name == "sept" { "sep" } else { name.as_str() };
    MONTHS
        .iter()
        .position(|month| *month == name || month.get(..3) == Some(name))
        .map(|idx| idx as u32 + 1)
}

/// Monday of week `week` counted from the week holding January 4.
pub fn week_start(year: i32, week: u32) -> Option<NaiveDate> {
    if !(1..=53).contains(&week) {
        return None;
    }
    let anchor = NaiveDate::from_ymd_opt(year, 1, 4)?;
    let monday = anchor - Duration::days(i64::from(anchor.weekday().num_days_from_monday()));
    monday.checked_add_signed(Duration::weeks(i64::from(week) - 1))
}

fn number<T: std::str::FromStr>(caps: &Captures<'_>, idx: usize) -> Option<T> {
    caps.get(idx)?.as_str().parse().ok()
}

fn date_from(caps: &Captures<'_>, month: usize, day: usize, year: i32) -> Option<NaiveDate> {
    let month = month_number(caps.get(month)?.as_str())?;
    NaiveDate::from_ymd_opt(year, month, number(caps, day)?)
}

fn parse_week_number(text: &str) -> Option<DateRange> {
    let caps = WEEK_RE.captures(text)?;
    let start = week_start(number(&caps, 2)?, number(&caps, 1)?)?;
    DateRange::new(start, start + Duration::days(6))
}

fn parse_month_day_span(text: &str) -> Option<DateRange> {
    let caps = MONTH_SPAN_RE.captures(text)?;
    let year = number(&caps, 4)?;
    let start = date_from(&caps, 1, 2, year)?;
    let month = start.month();
    let end = NaiveDate::from_ymd_opt(year, month, number(&caps, 3)?)?;
    DateRange::new(start, end)
}

fn parse_iso_range(text: &str) -> Option<DateRange> {
    let caps = ISO_RANGE_RE.captures(text)?;
    DateRange::from_iso(caps.get(1)?.as_str(), caps.get(2)?.as_str())
}

fn parse_cross_month(text: &str) -> Option<DateRange> {
    let caps = CROSS_MONTH_RE.captures(text)?;
    let start = date_from(&caps, 1, 2, number(&caps, 3)?)?;
    let end = date_from(&caps, 4, 5, number(&caps, 6)?)?;
    DateRange::new(start, end)
}

fn parse_between(text: &str) -> Option<DateRange> {
    let caps = BETWEEN_RE.captures(text)?;
    let start = date_from(&caps, 1, 2, number(&caps, 3)?)?;
    let end = date_from(&caps, 4, 5, number(&caps, 6)?)?;
    DateRange::new(start, end)
}

fn parse_cross_month_trailing_year(text: &str) -> Option<DateRange> {
    let caps = TRAILING_YEAR_RE.captures(text)?;
    let year = number(&caps, 5)?;
    let start = date_from(&caps, 1, 2, year)?;
    let end = date_from(&caps, 3, 4, year)?;
    DateRange::new(start, end)
}

/// Relative windows the platform evaluates server-side through its date functions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case", tag = "period", content = "days")]
pub enum RelativePeriod {
    Today,
    Yesterday,
    ThisWeek,
    LastWeek,
    ThisMonth,
    LastMonth,
    LastDays(u32),
}

static LAST_DAYS_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(?:last|past)\s+(\d{1,3})\s+days?$").expect("last days regex")
});

impl RelativePeriod {
    /// Parses a standalone period phrase such as `"last week"` or `"past 3 days"`.
    pub fn parse(raw: &str) -> Option<Self> {
        let value = guard::normalize(raw.trim_matches(['"', '\'']));
        let period = match value.as_str() {
            "today" => RelativePeriod::Today,
            "yesterday" => RelativePeriod::Yesterday,
            "this week" => RelativePeriod::ThisWeek,
            "last week" | "past week" => RelativePeriod::LastWeek,
            "this month" => RelativePeriod::ThisMonth,
            "last month" | "past month" => RelativePeriod::LastMonth,
            other => {
                let caps = LAST_DAYS_RE.captures(other)?;
                RelativePeriod::LastDays(number(&caps, 1)?)
            }
        };
        Some(period)
    }

    /// Start and end date-function calls bounding the period.
    pub fn bounds(&self) -> (String, String) {
        let (start, end) = match self {
            RelativePeriod::Today => ("beginningOfToday()", "endOfToday()"),
            RelativePeriod::Yesterday => ("beginningOfYesterday()", "endOfYesterday()"),
            RelativePeriod::ThisWeek => ("beginningOfThisWeek()", "endOfThisWeek()"),
            RelativePeriod::LastWeek => ("beginningOfLastWeek()", "endOfLastWeek()"),
            RelativePeriod::ThisMonth => ("beginningOfThisMonth()", "endOfThisMonth()"),
            RelativePeriod::LastMonth => ("beginningOfLastMonth()", "endOfLastMonth()"),
            RelativePeriod::LastDays(days) => {
                return (
                    format!("javascript:gs.daysAgoStart({days})"),
                    "javascript:gs.daysAgoEnd(0)".to_string(),
                )
            }
        };
        (format!("javascript:gs.{start}"), format!("javascript:gs.{end}"))
    }

    pub fn label(&self) -> String {
        match self {
            RelativePeriod::Today => "today".to_string(),
            RelativePeriod::Yesterday => "yesterday".to_string(),
            RelativePeriod::ThisWeek => "this week".to_string(),
            RelativePeriod::LastWeek => "last week".to_string(),
            RelativePeriod::ThisMonth => "this month".to_string(),
            RelativePeriod::LastMonth => "last month".to_string(),
            RelativePeriod::LastDays(1) => "last 1 day".to_string(),
            RelativePeriod::LastDays(days) => format!("last {days} days"),
        }
    }

    /// Approximate span in days, used by size estimation.
    pub fn approx_days(&self) -> u32 {
        match self {
            RelativePeriod::Today | RelativePeriod::Yesterday => 1,
            RelativePeriod::ThisWeek | RelativePeriod::LastWeek => 7,
            RelativePeriod::ThisMonth | RelativePeriod::LastMonth => 31,
            RelativePeriod::LastDays(days) => *days,
        }
    }
}
