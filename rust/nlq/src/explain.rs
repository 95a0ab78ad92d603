//! Human-readable descriptions of existing filter maps.

use crate::{
    filter::{
        is_date_field, FilterKey, FilterMap, ASSIGNED_TO_FIELD, CALLER_FIELD, CREATED_FIELD,
        DESCRIPTION_FIELD, OR_SEPARATOR, PRIORITY_FIELD, SEGMENT_SEPARATOR, STATE_FIELD,
    },
    parser::no_filters_explanation,
    query::compiler::compile_condition,
    time::{DateRange, RelativePeriod},
    validation,
};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Serialize, Serializer};
use std::fmt;

static PRIORITY_VALUE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"priority=(\d+)").expect("priority value regex"));
static DAYS_AGO_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"daysAgoStart\((\d+)\)").expect("days ago regex"));
static GENERATED_DATE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"dateGenerate\('(\d{4}-\d{2}-\d{2})'").expect("generated date regex")
});
static CONDITION_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"^([a-z0-9_.]+?)(!=|>=|<=|BETWEEN|DOESNOTCONTAIN|CONTAINS|STARTSWITH|ISNOTEMPTY|ISEMPTY|ON|=|>|<)(.*)$",
    )
    .expect("condition regex")
});

const NAMED_PERIODS: [RelativePeriod; 6] = [
    RelativePeriod::Today,
    RelativePeriod::Yesterday,
    RelativePeriod::ThisWeek,
    RelativePeriod::LastWeek,
    RelativePeriod::ThisMonth,
    RelativePeriod::LastMonth,
];

const STATE_NAMES: &[(&str, &str)] = &[
    ("1", "New"),
    ("2", "In Progress"),
    ("3", "On Hold"),
    ("6", "Resolved"),
    ("7", "Closed"),
    ("8", "Canceled"),
    ("10", "Pending"),
];

/// Coarse expected result-set size. Serialized as its label.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResultSize {
    Small,
    Medium,
    Large,
    Unfiltered,
}

impl ResultSize {
    pub fn label(self) -> &'static str {
        match self {
            ResultSize::Small => "Small (< 50 records)",
            ResultSize::Medium => "Medium (50-200 records)",
            ResultSize::Large => "Large (> 200 records)",
            ResultSize::Unfiltered => "Large (all records)",
        }
    }
}

impl fmt::Display for ResultSize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl Serialize for ResultSize {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.label())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FilterExplanation {
    pub explanation: String,
    pub sql_equivalent: String,
    pub potential_issues: Vec<String>,
    pub suggestions: Vec<String>,
    pub estimated_size: ResultSize,
}

/// Describes `filters` without modifying them.
pub fn explain(filters: &FilterMap, table: &str) -> FilterExplanation {
    let review = validation::inspect(filters);
    FilterExplanation {
        explanation: describe(filters, table),
        sql_equivalent: sql_equivalent(filters, table),
        potential_issues: review.warnings,
        suggestions: review.suggestions,
        estimated_size: estimate_size(filters),
    }
}

type Describer = fn(&str, &str) -> String;

/// Field name to phrasing. Fields not listed fall back to `field: value`.
const DESCRIBERS: &[(&str, Describer)] = &[
    (PRIORITY_FIELD, describe_priority),
    (STATE_FIELD, describe_state),
    (ASSIGNED_TO_FIELD, describe_assignment),
    (CALLER_FIELD, describe_caller),
    (DESCRIPTION_FIELD, describe_description),
];

pub fn describe(filters: &FilterMap, table: &str) -> String {
    if filters.is_empty() {
        return no_filters_explanation(table);
    }
    let parts: Vec<String> = filters
        .iter()
        .map(|(key, value)| describe_entry(key, value))
        .collect();
    format!("Will find {table} records where: {}", parts.join(" AND "))
}

fn describe_entry(key: &str, value: &str) -> String {
    match FilterKey::classify(key) {
        FilterKey::CompleteQuery => format!("Custom query: {value}"),
        FilterKey::Complete(_) => match leading_field(value) {
            Some(field) => describe_field(field, value),
            None => format!("Custom query: {value}"),
        },
        FilterKey::Field {
            field,
            op: Some(op),
        } => format!("{field} {} {value}", op.symbol()),
        FilterKey::Field { field, op: None } => describe_field(field, value),
    }
}

fn describe_field(field: &str, value: &str) -> String {
    if is_date_field(field) {
        return describe_date(field, value);
    }
    DESCRIBERS
        .iter()
        .find(|(name, _)| *name == field)
        .map(|(_, describer)| describer(field, value))
        .unwrap_or_else(|| format!("{field}: {value}"))
}

fn leading_field(fragment: &str) -> Option<&str> {
    CONDITION_RE
        .captures(fragment)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str())
}

fn describe_priority(_field: &str, value: &str) -> String {
    if value.contains(OR_SEPARATOR) {
        let levels: Vec<&str> = PRIORITY_VALUE_RE
            .captures_iter(value)
            .filter_map(|caps| caps.get(1).map(|m| m.as_str()))
            .collect();
        return format!("Priority levels: {}", levels.join(", "));
    }
    format!("Priority: {}", value.trim_start_matches("priority="))
}

fn describe_date(field: &str, value: &str) -> String {
    let subject = if field == CREATED_FIELD {
        "Created".to_string()
    } else {
        field.to_string()
    };

    if let Some(period) = detect_period(value) {
        return match period {
            RelativePeriod::LastDays(days) => format!("{subject} in last {days} days"),
            named => format!("{subject} {}", named.label()),
        };
    }
    if let Some(range) = generated_range(value) {
        return format!(
            "{subject} between {} and {}",
            range.start_iso(),
            range.end_iso()
        );
    }
    format!("{subject}: {value}")
}

fn describe_state(_field: &str, value: &str) -> String {
    if value.contains("!=") {
        return "Excluding resolved/closed records".to_string();
    }
    let codes: Vec<&str> = value
        .split(OR_SEPARATOR)
        .map(|term| term.trim().trim_start_matches("state="))
        .collect();
    let names: Vec<&str> = codes
        .iter()
        .map(|code| {
            STATE_NAMES
                .iter()
                .find(|(candidate, _)| candidate == code)
                .map_or(*code, |(_, name)| *name)
        })
        .collect();
    format!("State: {}", names.join(", "))
}

fn describe_assignment(_field: &str, value: &str) -> String {
    if value.eq_ignore_ascii_case("NULL") || value.contains("ISEMPTY") {
        "Unassigned records".to_string()
    } else if value.contains("getUserID()") {
        "Assigned to current user".to_string()
    } else {
        format!("Assigned to: {}", value.trim_start_matches("assigned_to="))
    }
}

fn describe_caller(field: &str, value: &str) -> String {
    if !value.contains("!=") {
        return format!("{field}: {}", value.trim_start_matches("caller_id="));
    }
    let ids: Vec<&str> = value
        .split(SEGMENT_SEPARATOR)
        .filter_map(|segment| segment.split_once("!=").map(|(_, id)| id))
        .collect();
    format!("Excluding callers: {}", ids.join(", "))
}

fn describe_description(_field: &str, value: &str) -> String {
    match value.split_once("CONTAINS") {
        Some((_, keyword)) => format!("Description contains '{keyword}'"),
        None => format!("Description: {value}"),
    }
}

fn detect_period(value: &str) -> Option<RelativePeriod> {
    if let Some(days) = DAYS_AGO_RE
        .captures(value)
        .and_then(|caps| caps.get(1)?.as_str().parse().ok())
    {
        return Some(RelativePeriod::LastDays(days));
    }
    NAMED_PERIODS
        .into_iter()
        .find(|period| value.contains(period.bounds().0.as_str()))
}

fn generated_range(value: &str) -> Option<DateRange> {
    let mut dates = GENERATED_DATE_RE
        .captures_iter(value)
        .filter_map(|caps| caps.get(1).map(|m| m.as_str()));
    let start = dates.next()?;
    let end = dates.next()?;
    DateRange::from_iso(start, end)
}

/// Pseudo-SQL rendering for debugging. Never executed.
pub fn sql_equivalent(filters: &FilterMap, table: &str) -> String {
    let conditions: Vec<String> = filters
        .iter()
        .filter_map(|(key, value)| compile_condition(key, value))
        .flat_map(|fragment| sql_groups(&fragment))
        .collect();
    if conditions.is_empty() {
        return format!("SELECT * FROM {table}");
    }
    format!("SELECT * FROM {table} WHERE {}", conditions.join(" AND "))
}

/// Splits a fragment on `^`, folding `^OR` terms into parenthesised groups.
fn sql_groups(fragment: &str) -> Vec<String> {
    let mut groups: Vec<Vec<String>> = Vec::new();
    for segment in fragment.split(SEGMENT_SEPARATOR) {
        let segment = segment.trim();
        if segment.is_empty() {
            continue;
        }
        match (segment.strip_prefix("OR"), groups.last_mut()) {
            (Some(rest), Some(group)) => group.push(sql_term(rest)),
            _ => groups.push(vec![sql_term(segment)]),
        }
    }
    groups
        .into_iter()
        .map(|terms| {
            if terms.len() == 1 {
                terms.into_iter().next().unwrap_or_default()
            } else {
                format!("({})", terms.join(" OR "))
            }
        })
        .collect()
}

fn sql_term(term: &str) -> String {
    let Some(caps) = CONDITION_RE.captures(term) else {
        return format!("({term})");
    };
    let field = caps.get(1).map_or("", |m| m.as_str());
    let op = caps.get(2).map_or("", |m| m.as_str());
    let value = caps.get(3).map_or("", |m| m.as_str());

    match op {
        "BETWEEN" => match value.split_once('@') {
            Some((start, end)) => format!("{field} BETWEEN '{start}' AND '{end}'"),
            None => format!("{field} BETWEEN '{value}'"),
        },
        "CONTAINS" => format!("{field} LIKE '%{value}%'"),
        "DOESNOTCONTAIN" => format!("{field} NOT LIKE '%{value}%'"),
        "STARTSWITH" => format!("{field} LIKE '{value}%'"),
        "ISEMPTY" => format!("{field} IS NULL"),
        "ISNOTEMPTY" => format!("{field} IS NOT NULL"),
        "=" if value.eq_ignore_ascii_case("NULL") => format!("{field} IS NULL"),
        _ => format!("{field} {op} '{value}'"),
    }
}

pub fn estimate_size(filters: &FilterMap) -> ResultSize {
    if filters.is_empty() {
        return ResultSize::Unfiltered;
    }

    let mut score = 0.0;
    if let Some(priority) = filters.get(PRIORITY_FIELD) {
        if priority.contains('1') {
            score += 1.0;
        }
        if priority.contains(OR_SEPARATOR) {
            score -= 0.5;
        }
    }

    score += filters
        .iter()
        .filter(|(key, value)| match FilterKey::classify(key) {
            FilterKey::Field { field, .. } => is_date_field(field),
            _ => value.contains(CREATED_FIELD),
        })
        .map(|(_, value)| date_weight(value))
        .fold(0.0, f64::max);

    if score >= 2.0 {
        ResultSize::Small
    } else if score >= 1.0 {
        ResultSize::Medium
    } else {
        ResultSize::Large
    }
}

fn date_weight(value: &str) -> f64 {
    let days = match detect_period(value) {
        Some(period) => i64::from(period.approx_days()),
        None => match generated_range(value) {
            Some(range) => range.days(),
            None => return 0.0,
        },
    };
    if days <= 1 {
        2.0
    } else if days <= 7 {
        1.0
    } else {
        0.0
    }
}
