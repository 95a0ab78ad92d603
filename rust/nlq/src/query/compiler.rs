//! Serialises a [`FilterMap`] into the platform's encoded query string.

use crate::{
    filter::{
        is_date_field, FilterKey, FilterMap, CALLER_FIELD, CREATED_FIELD, OR_SEPARATOR,
        PRIORITY_FIELD, SEGMENT_SEPARATOR,
    },
    normalize::{normalize_exclusion, normalize_priority},
    time::{parse_date_range, DateRange, RelativePeriod},
};
use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};

/// Characters the platform reads as query syntax and must receive verbatim.
const QUERY_SAFE: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'~')
    .remove(b'^')
    .remove(b'=')
    .remove(b'!')
    .remove(b'<')
    .remove(b'>')
    .remove(b'@')
    .remove(b'(')
    .remove(b')')
    .remove(b':')
    .remove(b',')
    .remove(b'\'');

const VALUE_OPERATORS: &[&str] = &["!=", ">=", "<=", "=", ">", "<"];
const WORD_OPERATORS: &[&str] = &[
    "BETWEEN",
    "CONTAINS",
    "DOESNOTCONTAIN",
    "STARTSWITH",
    "ENDSWITH",
    "ISEMPTY",
    "ISNOTEMPTY",
    "NOT IN",
    "IN",
    "ON",
    "LIKE",
];

/// Encoded query string for `filters`.
pub fn compile(filters: &FilterMap) -> String {
    encode_query(&compile_raw(filters))
}

/// Unencoded query string: every fragment in map order joined by `^`.
pub fn compile_raw(filters: &FilterMap) -> String {
    filters
        .iter()
        .filter_map(|(key, value)| compile_condition(key, value))
        .collect::<Vec<_>>()
        .join(SEGMENT_SEPARATOR)
}

pub fn encode_query(raw: &str) -> String {
    utf8_percent_encode(raw, QUERY_SAFE).to_string()
}

/// Query fragment for a single map entry, `None` when the entry contributes nothing.
pub fn compile_condition(key: &str, value: &str) -> Option<String> {
    let value = value.trim();
    if value.is_empty() {
        return None;
    }

    let condition = match FilterKey::classify(key) {
        FilterKey::CompleteQuery | FilterKey::Complete(_) => value.to_string(),
        FilterKey::Field {
            field,
            op: Some(op),
        } => format!("{field}{}{value}", op.symbol()),
        FilterKey::Field { field, op: None } => field_condition(field, value),
    };
    Some(condition)
}

fn field_condition(field: &str, value: &str) -> String {
    if field == PRIORITY_FIELD && value.contains(',') && !value.contains(OR_SEPARATOR) {
        return normalize_priority(value);
    }
    if has_field_prefix(field, value) {
        return value.to_string();
    }
    if value.contains(OR_SEPARATOR) {
        return value
            .split(OR_SEPARATOR)
            .map(|term| prefix_term(field, term))
            .collect::<Vec<_>>()
            .join(OR_SEPARATOR);
    }
    if starts_with_operator(value) {
        return value
            .split(SEGMENT_SEPARATOR)
            .map(|segment| prefix_term(field, segment))
            .collect::<Vec<_>>()
            .join(SEGMENT_SEPARATOR);
    }
    if is_date_field(field) {
        if let Some(range) = parse_date_range(value) {
            return date_range_fragment(field, &range);
        }
        if let Some(period) = RelativePeriod::parse(value) {
            return relative_period_fragment(field, period);
        }
    }
    if value.eq_ignore_ascii_case("NULL") {
        return format!("{field}ISEMPTY");
    }
    format!("{field}={value}")
}

/// True when `value` is already a `<field><operator>...` condition.
pub(crate) fn has_field_prefix(field: &str, value: &str) -> bool {
    value.strip_prefix(field).is_some_and(|rest| {
        VALUE_OPERATORS.iter().any(|op| rest.starts_with(op))
            || WORD_OPERATORS.iter().any(|op| rest.starts_with(op))
    })
}

fn starts_with_operator(value: &str) -> bool {
    VALUE_OPERATORS.iter().any(|op| value.starts_with(op))
}

fn prefix_term(field: &str, term: &str) -> String {
    let term = term.trim();
    if has_field_prefix(field, term) {
        term.to_string()
    } else if starts_with_operator(term) {
        format!("{field}{term}")
    } else {
        format!("{field}={term}")
    }
}

/// `priority=1^ORpriority=2` style chain. Empty values are skipped.
pub fn or_chain<S: AsRef<str>>(field: &str, values: &[S]) -> String {
    values
        .iter()
        .map(|value| value.as_ref().trim())
        .filter(|value| !value.is_empty())
        .map(|value| format!("{field}={value}"))
        .collect::<Vec<_>>()
        .join(OR_SEPARATOR)
}

/// `caller_id!=a^caller_id!=b` style chain. Empty ids are skipped.
pub fn exclusion_chain<S: AsRef<str>>(field: &str, ids: &[S]) -> String {
    ids.iter()
        .map(|id| id.as_ref().trim())
        .filter(|id| !id.is_empty())
        .map(|id| format!("{field}!={id}"))
        .collect::<Vec<_>>()
        .join(SEGMENT_SEPARATOR)
}

/// Whole-day range covering `range.start` 00:00:00 to `range.end` 23:59:59.
pub fn date_range_fragment(field: &str, range: &DateRange) -> String {
    format!(
        "{field}BETWEENjavascript:gs.dateGenerate('{}','00:00:00')@javascript:gs.dateGenerate('{}','23:59:59')",
        range.start_iso(),
        range.end_iso()
    )
}

pub fn relative_period_fragment(field: &str, period: RelativePeriod) -> String {
    let (start, end) = period.bounds();
    format!("{field}BETWEEN{start}@{end}")
}

/// Structured description of a filter assembled from explicit parts rather
/// than natural language.
#[derive(Debug, Clone, Default)]
pub struct CompleteFilterSpec {
    pub date_range: Option<DateRange>,
    pub period: Option<RelativePeriod>,
    pub priorities: Vec<String>,
    pub exclude_callers: Vec<String>,
    pub extra: FilterMap,
}

/// Builds a raw query string from `spec`. An explicit date range wins over a
/// relative period; `extra` entries for the date, priority and caller fields
/// are ignored.
pub fn build_complete_filter(spec: &CompleteFilterSpec) -> String {
    let mut parts = Vec::new();

    if let Some(range) = &spec.date_range {
        parts.push(date_range_fragment(CREATED_FIELD, range));
    } else if let Some(period) = spec.period {
        parts.push(relative_period_fragment(CREATED_FIELD, period));
    }

    let priorities: Vec<&str> = spec
        .priorities
        .iter()
        .map(|p| p.trim().trim_start_matches(['p', 'P']))
        .collect();
    let priority_chain = or_chain(PRIORITY_FIELD, &priorities);
    if !priority_chain.is_empty() {
        parts.push(priority_chain);
    }

    parts.extend(
        spec.exclude_callers
            .iter()
            .map(|caller| normalize_exclusion(caller))
            .filter(|chain| !chain.is_empty()),
    );

    parts.extend(spec.extra.iter().filter_map(|(key, value)| {
        match FilterKey::classify(key) {
            FilterKey::Field { field, .. }
                if field == CREATED_FIELD || field == PRIORITY_FIELD || field == CALLER_FIELD =>
            {
                None
            }
            _ => compile_condition(key, value),
        }
    }));

    parts.join(SEGMENT_SEPARATOR)
}
