//! Anti-pattern checks over filter maps and compiled query strings.
//!
//! Nothing here rejects a filter: findings are warnings and suggestions, and
//! the only mutation is the optional `corrected_filters` copy.

use crate::{
    filter::{
        is_date_field, ComparisonOp, FilterKey, FilterMap, COMPLETE_QUERY_KEY, OR_SEPARATOR,
        PRIORITY_FIELD,
    },
    normalize::normalize_priority,
};
use serde::Serialize;
use tracing::debug;

const TEXTUAL_PRIORITIES: &[&str] = &["critical", "high", "medium", "low"];
const MIN_HIGH_PRIORITY_INCIDENTS: usize = 2;
const LARGE_RESULT_COUNT: usize = 1000;
const COMPLEX_CONDITION_COUNT: usize = 5;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ValidationResult {
    pub is_valid: bool,
    pub warnings: Vec<String>,
    pub suggestions: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub corrected_filters: Option<FilterMap>,
}

impl Default for ValidationResult {
    fn default() -> Self {
        Self {
            is_valid: true,
            warnings: Vec::new(),
            suggestions: Vec::new(),
            corrected_filters: None,
        }
    }
}

impl ValidationResult {
    pub fn has_issues(&self) -> bool {
        !self.is_valid || !self.warnings.is_empty()
    }

    fn absorb(&mut self, review: FieldReview) {
        self.warnings.extend(review.warnings);
        self.suggestions.extend(review.suggestions);
    }
}

#[derive(Debug, Default)]
struct FieldReview {
    warnings: Vec<String>,
    suggestions: Vec<String>,
    correction: Option<String>,
}

impl FieldReview {
    fn warn(&mut self, warning: impl Into<String>, suggestion: impl Into<String>) {
        self.warnings.push(warning.into());
        self.suggestions.push(suggestion.into());
    }
}

/// Checks every entry of `filters` and rewrites the ones with a known
/// canonical form. `corrected_filters` is set only when something changed.
pub fn validate_and_improve(filters: &FilterMap, table: &str) -> ValidationResult {
    let mut result = ValidationResult::default();
    let mut corrected = filters.clone();
    let mut changed = false;

    for (key, value) in filters.iter() {
        let mut review = review_entry(key, value);
        if let Some(replacement) = review.correction.take() {
            if replacement != value {
                debug!(table, key, %replacement, "corrected filter value");
                corrected.insert(key, replacement);
                changed = true;
            }
        }
        result.absorb(review);
    }

    for field in open_ended_suffix_ranges(filters) {
        result.warnings.push(format!(
            "Date range incomplete for {field} - may return more results than expected"
        ));
        result
            .suggestions
            .push(format!("Add {field}_lte to close the range"));
    }

    if changed {
        result.corrected_filters = Some(corrected);
    }
    result
}

/// Same checks as [`validate_and_improve`] without producing corrections.
pub fn inspect(filters: &FilterMap) -> ValidationResult {
    let mut result = validate_and_improve(filters, "");
    result.corrected_filters = None;
    result
}

fn review_entry(key: &str, value: &str) -> FieldReview {
    match FilterKey::classify(key) {
        FilterKey::Field { field, op: None } if field == PRIORITY_FIELD => review_priority(value),
        FilterKey::Field { field, op: None } if is_date_field(field) => review_date(field, value),
        _ => FieldReview::default(),
    }
}

fn review_priority(value: &str) -> FieldReview {
    let mut review = FieldReview::default();
    let has_or = value.contains(OR_SEPARATOR);

    if value.contains(',') && !has_or {
        let canonical = normalize_priority(value);
        review.warn(
            format!("Priority filter '{value}' uses comma syntax instead of OR"),
            format!("For multiple priorities, use: '{canonical}' instead of comma-separated values"),
        );
        review.correction = Some(canonical);
    }

    if has_or {
        let terms: Vec<&str> = value.split(OR_SEPARATOR).map(str::trim).collect();
        if terms.iter().any(|term| !term.starts_with("priority=")) {
            review.warn(
                format!("OR syntax detected but missing 'priority=' prefix: {value}"),
                "Ensure OR filters start with field name: 'priority=1^ORpriority=2'",
            );
            let prefixed = terms
                .iter()
                .map(|term| {
                    if term.starts_with("priority=") {
                        (*term).to_string()
                    } else {
                        normalize_priority(term)
                    }
                })
                .collect::<Vec<_>>()
                .join(OR_SEPARATOR);
            review.correction = Some(prefixed);
        }
    }

    let lowered = value.to_lowercase();
    let textual = TEXTUAL_PRIORITIES.iter().any(|level| lowered.contains(level));
    if textual && !value.chars().any(|ch| ch.is_ascii_digit()) {
        review
            .suggestions
            .push("Consider using numeric priority format (1, 2, 3) for better compatibility".into());
    }

    review
}

fn review_date(field: &str, value: &str) -> FieldReview {
    let mut review = FieldReview::default();
    let has_between = value.contains("BETWEEN");
    let has_lower = value.contains('>');
    let has_upper = value.contains('<');

    if (has_lower || has_upper) && !has_between {
        review.warn(
            format!("Date filter uses old comparison syntax: {value}"),
            format!(
                "Use BETWEEN syntax: '{field}BETWEENjavascript:gs.dateGenerate(...)@javascript:gs.dateGenerate(...)'"
            ),
        );
        if has_lower && !has_upper {
            review.warn(
                "Date range incomplete - may return more results than expected",
                "Add end date for complete range",
            );
        } else if let Some(between) = comparison_to_between(field, value) {
            review.correction = Some(between);
        }
    }

    if has_between && !value.contains("javascript:") {
        review.warn(
            "BETWEEN syntax detected but missing JavaScript date functions",
            "Use JavaScript date generation: 'javascript:gs.dateGenerate()' or 'javascript:gs.beginningOfLastWeek()'",
        );
    }

    if has_between && !value.contains('@') {
        review.warn(
            "Date range incomplete - BETWEEN is missing the '@' separated end bound",
            "Use '@' to separate dates: 'BETWEEN...@javascript:gs.dateGenerate()'",
        );
    }

    review
}

/// Rewrites `>=a^<=b` (with or without field prefixes) as a BETWEEN range.
fn comparison_to_between(field: &str, value: &str) -> Option<String> {
    let mut lower = None;
    let mut upper = None;
    for segment in value.split('^') {
        let segment = segment.trim();
        let segment = segment.strip_prefix(field).unwrap_or(segment);
        if let Some(bound) = segment.strip_prefix(">=") {
            lower = Some(bound.trim());
        } else if let Some(bound) = segment.strip_prefix("<=") {
            upper = Some(bound.trim());
        }
    }
    let (lower, upper) = (lower?, upper?);
    Some(format!(
        "{field}BETWEEN{}@{}",
        date_bound(lower, "00:00:00"),
        date_bound(upper, "23:59:59")
    ))
}

fn date_bound(raw: &str, default_time: &str) -> String {
    if raw.starts_with("javascript:") {
        return raw.to_string();
    }
    let raw = raw.trim_matches(['\'', '"']);
    match raw.split_once(' ') {
        Some((date, time)) if time.contains(':') => {
            format!("javascript:gs.dateGenerate('{date}','{}')", time.trim())
        }
        _ => format!("javascript:gs.dateGenerate('{raw}','{default_time}')"),
    }
}

fn open_ended_suffix_ranges(filters: &FilterMap) -> Vec<String> {
    let mut lower_only = Vec::new();
    for key in filters.keys() {
        if let FilterKey::Field {
            field,
            op: Some(op),
        } = FilterKey::classify(key)
        {
            let is_lower = matches!(op, ComparisonOp::Gte | ComparisonOp::Gt);
            let closed = filters.contains_key(&format!("{field}_lte"))
                || filters.contains_key(&format!("{field}_lt"));
            if is_lower && is_date_field(field) && !closed {
                lower_only.push(field.to_string());
            }
        }
    }
    lower_only
}

/// Sanity check of a result count returned for `filters` on `table`.
pub fn validate_result_count(table: &str, filters: &FilterMap, count: usize) -> ValidationResult {
    let mut result = ValidationResult::default();
    if table == "incident" && is_high_priority(filters) && count < MIN_HIGH_PRIORITY_INCIDENTS {
        result
            .warnings
            .push(format!("Low P1/P2 incident count ({count}) - verify completeness"));
        result
            .suggestions
            .push("Cross-verify with individual incident lookups or broader query".into());
    }
    result
}

fn is_high_priority(filters: &FilterMap) -> bool {
    filters
        .get(PRIORITY_FIELD)
        .is_some_and(|value| value.contains('1') || value.contains('2'))
}

pub fn suggest_query_improvements(filters: &FilterMap, count: usize) -> Vec<String> {
    let mut suggestions: Vec<String> = Vec::new();

    if count == 0 {
        suggestions.extend(
            [
                "Try broader date range or check filter syntax",
                "Verify field names match the table schema",
                "Check if date format is correct (YYYY-MM-DD)",
                "Verify caller_id exclusions are not too restrictive",
            ]
            .map(String::from),
        );
    }

    if filters.contains_key(PRIORITY_FIELD) && count < 3 {
        suggestions.extend(
            [
                "Consider using OR syntax: 'priority=1^ORpriority=2'",
                "Check if priority values are numeric (1, 2) vs text ('1 - Critical')",
            ]
            .map(String::from),
        );
    }

    if count > LARGE_RESULT_COUNT {
        suggestions.extend(
            [
                "Consider adding more specific filters to reduce result set",
                "Add date range or caller exclusions to narrow results",
            ]
            .map(String::from),
        );
    }

    suggestions
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct QueryDebugInfo {
    pub query_length: usize,
    pub condition_count: usize,
    pub components: Vec<String>,
    pub potential_issues: Vec<String>,
    pub recommendations: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub original_filter_count: Option<usize>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub original_filters: Vec<String>,
}

type QueryAnalyzer = fn(&str, &mut QueryDebugInfo);

const ANALYZERS: &[QueryAnalyzer] = &[
    analyze_dates,
    analyze_priority,
    analyze_caller_exclusion,
    analyze_date_functions,
    analyze_encoding,
];

/// Breaks a compiled query string into recognised components and flags
/// construction problems. `filters` is the map the query was built from, when known.
pub fn debug_query_construction(query: &str, filters: Option<&FilterMap>) -> QueryDebugInfo {
    let mut info = QueryDebugInfo {
        query_length: query.chars().count(),
        condition_count: if query.is_empty() {
            0
        } else {
            query.matches('^').count() + 1
        },
        ..Default::default()
    };

    for analyze in ANALYZERS {
        analyze(query, &mut info);
    }

    if info.condition_count > COMPLEX_CONDITION_COUNT {
        info.recommendations
            .push("Consider simplifying complex query for better performance".into());
    }

    if let Some(filters) = filters.filter(|f| !f.is_empty()) {
        info.original_filter_count = Some(filters.len());
        info.original_filters = filters.keys().map(str::to_string).collect();
        if filters.contains_key(COMPLETE_QUERY_KEY) {
            info.components
                .push("Using complete query construction".into());
        }
        for (key, value) in filters.iter() {
            if value.contains(',') && !value.contains(OR_SEPARATOR) && !value.contains("javascript:") {
                info.potential_issues
                    .push(format!("Field '{key}' may use comma syntax instead of OR"));
            }
        }
    }

    info
}

fn analyze_dates(query: &str, info: &mut QueryDebugInfo) {
    if !query.contains("sys_created_on") {
        return;
    }
    info.components.push("Date filtering".into());
    if query.contains("BETWEEN") {
        info.components.push("BETWEEN syntax (correct)".into());
    } else if query.contains(">=") || query.contains("<=") {
        info.potential_issues
            .push("Using old date comparison syntax".into());
        info.recommendations
            .push("Update to BETWEEN syntax for better reliability".into());
    }
}

fn analyze_priority(query: &str, info: &mut QueryDebugInfo) {
    if !query.contains("priority=") {
        return;
    }
    info.components.push("Priority filtering".into());
    if query.contains(OR_SEPARATOR) {
        info.components.push("OR logic (correct)".into());
    } else {
        info.potential_issues
            .push("Single priority or missing OR syntax".into());
    }
}

fn analyze_caller_exclusion(query: &str, info: &mut QueryDebugInfo) {
    let excluded = query.matches("caller_id!=").count();
    if excluded > 0 {
        info.components.push("Caller exclusion".into());
        info.components.push(format!("{excluded} caller(s) excluded"));
    }
}

fn analyze_date_functions(query: &str, info: &mut QueryDebugInfo) {
    if query.contains("javascript:gs.") {
        info.components.push("JavaScript date functions".into());
        if query.contains("@javascript:") {
            info.components.push("Proper date range separators".into());
        }
    }
    if query.contains("BETWEEN") && !query.contains('@') {
        info.potential_issues
            .push("Missing date range separator (@)".into());
    }
}

fn analyze_encoding(query: &str, info: &mut QueryDebugInfo) {
    if query.contains(' ') {
        info.potential_issues.push("Unencoded spaces in query".into());
        info.recommendations.push("Ensure proper URL encoding".into());
    }
}
