//! Natural-language parsing: templates first, then pattern rules, exclusion
//! phrases and absolute date ranges, finishing with a keyword fallback.

pub mod exclusions;
pub mod patterns;
pub mod templates;

use crate::{
    filter::{FilterMap, CREATED_FIELD, DESCRIPTION_FIELD, SEGMENT_SEPARATOR},
    guard,
    keywords::KeywordExtractor,
    query::compiler::date_range_fragment,
    time::parse_date_range,
    validation::validate_and_improve,
};
use serde::Serialize;
use tracing::{debug, warn};

pub use exclusions::parse_exclusions;
pub use patterns::parse_patterns;
pub use templates::{get_templates, match_template};

pub const DATE_RANGE_CONFIDENCE: f64 = 0.3;
pub const KEYWORD_CONFIDENCE: f64 = 0.5;
const EXPLANATION_SEPARATOR: &str = " | ";

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ParseResult {
    pub filters: FilterMap,
    pub confidence: f64,
    pub explanation: String,
    pub suggestions: Vec<String>,
    pub template_used: Option<String>,
}

impl ParseResult {
    /// Empty result explaining that `table` will be returned unfiltered.
    pub fn unfiltered(table: &str) -> Self {
        Self {
            explanation: no_filters_explanation(table),
            ..Default::default()
        }
    }
}

pub fn no_filters_explanation(table: &str) -> String {
    format!("No filters applied - will return all {table} records")
}

/// Parses `text` into filters for `table`. Never fails: unrecognised input
/// degrades to a keyword search or an empty result.
pub fn parse_natural_language(
    text: &str,
    table: &str,
    extractor: &dyn KeywordExtractor,
) -> ParseResult {
    if let Err(rejection) = guard::check(text) {
        warn!(%rejection, table, "natural language input rejected");
        let mut result = ParseResult::unfiltered(table);
        result.suggestions.push(format!(
            "Query was not parsed because the {rejection}; shorten or simplify the request"
        ));
        return result;
    }

    let normalized = guard::normalize(text);
    let mut explanations = Vec::new();
    let mut confidence;
    let mut template_used = None;
    let mut filters;

    if let Some(template) = match_template(&normalized) {
        explanations.push(format!("Used predefined template: {}", template.name));
        confidence = template.confidence;
        filters = template.filters;
        template_used = Some(template.name);
    } else {
        let matches = parse_patterns(&normalized);
        confidence = matches.confidence;
        filters = matches.filters;
        explanations.extend(matches.explanations);
    }

    if let Some(exclusion) = parse_exclusions(&normalized) {
        let mut added = false;
        for (key, value) in exclusion.filters.iter() {
            let merged = match filters.get(key) {
                None => Some(value.to_string()),
                Some(existing) => append_exclusions(existing, value),
            };
            if let Some(merged) = merged {
                filters.insert(key, merged);
                added = true;
            }
        }
        if added {
            confidence += exclusion.confidence;
            explanations.push(exclusion.explanation);
        }
    }

    if !filters.mentions_field(CREATED_FIELD) {
        if let Some(range) = parse_date_range(&normalized) {
            debug!(%range, "absolute date range detected");
            filters.insert(CREATED_FIELD, date_range_fragment(CREATED_FIELD, &range));
            confidence += DATE_RANGE_CONFIDENCE;
            explanations.push(format!(
                "Detected date range: {} to {}",
                range.start_iso(),
                range.end_iso()
            ));
        }
    }

    if filters.is_empty() {
        confidence = 0.0;
        if let Some(keyword) = extractor.extract(text).into_iter().next() {
            debug!(%keyword, "falling back to keyword search");
            filters.insert(
                DESCRIPTION_FIELD,
                format!("{DESCRIPTION_FIELD}CONTAINS{keyword}"),
            );
            confidence = KEYWORD_CONFIDENCE;
            explanations.push(format!("Using keyword search for: {keyword}"));
        }
    }

    let validation = validate_and_improve(&filters, table);
    if let Some(corrected) = validation.corrected_filters {
        filters = corrected;
        explanations.extend(validation.suggestions.iter().cloned());
    }

    let explanation = if explanations.is_empty() {
        no_filters_explanation(table)
    } else {
        explanations.join(EXPLANATION_SEPARATOR)
    };

    ParseResult {
        filters,
        confidence: confidence.min(1.0),
        explanation,
        suggestions: validation.suggestions,
        template_used,
    }
}

/// `existing` extended with the segments of `extra` it lacks, or `None` when
/// nothing is new.
fn append_exclusions(existing: &str, extra: &str) -> Option<String> {
    let present: Vec<&str> = existing.split(SEGMENT_SEPARATOR).collect();
    let missing: Vec<&str> = extra
        .split(SEGMENT_SEPARATOR)
        .filter(|segment| !segment.is_empty() && !present.contains(segment))
        .collect();
    if missing.is_empty() {
        return None;
    }
    Some(
        std::iter::once(existing)
            .chain(missing)
            .collect::<Vec<_>>()
            .join(SEGMENT_SEPARATOR),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::keywords::StopwordExtractor;
    use pretty_assertions::assert_eq;

    fn parse(text: &str) -> ParseResult {
        parse_natural_language(text, "incident", &StopwordExtractor)
    }

    #[test]
    fn p1_and_p2_uses_template() {
        let result = parse("P1 and P2 incidents");
        assert_eq!(result.template_used.as_deref(), Some("p1_p2_all_states"));
        assert_eq!(result.filters.get("priority"), Some("priority=1^ORpriority=2"));
        assert_eq!(result.confidence, 0.9);
    }

    #[test]
    fn week_number_becomes_date_range() {
        let result = parse("week 35 2025 incidents");
        assert_eq!(
            result.filters.get("sys_created_on"),
            Some(
                "sys_created_onBETWEENjavascript:gs.dateGenerate('2025-08-25','00:00:00')@javascript:gs.dateGenerate('2025-08-31','23:59:59')"
            )
        );
        assert_eq!(result.confidence, DATE_RANGE_CONFIDENCE);
        assert_eq!(result.explanation, "Detected date range: 2025-08-25 to 2025-08-31");
    }

    #[test]
    fn template_keeps_exclusions() {
        let result = parse("High priority incidents from last week excluding LogicMonitor");
        assert_eq!(result.template_used.as_deref(), Some("high_priority_last_week"));
        assert!(result.filters.contains_key("_complete_query"));
        assert_eq!(
            result.filters.get("_complete_caller_exclusion"),
            Some("caller_id!=1727339e47d99190c43d3171e36d43ad")
        );
        assert!((result.confidence - 1.0).abs() < 1e-9);
    }

    #[test]
    fn pattern_exclusion_is_not_counted_twice() {
        let result = parse("urgent tickets excluding logicmonitor");
        assert_eq!(result.filters.get("priority"), Some("1"));
        assert!((result.confidence - 0.4).abs() < 1e-9);
        assert_eq!(result.explanation.matches(" | ").count(), 1);
    }

    #[test]
    fn field_exclusion_extends_entity_exclusion() {
        let result = parse("p2 incidents last 3 days excluding caller abc and logicmonitor");
        assert_eq!(result.filters.get("priority"), Some("2"));
        assert_eq!(
            result.filters.get("_complete_caller_exclusion"),
            Some("caller_id!=1727339e47d99190c43d3171e36d43ad^caller_id!=abc")
        );
        assert!(result
            .explanation
            .contains("Detected exclusion: caller != abc"));
    }

    #[test]
    fn relative_time_suppresses_absolute_range() {
        let result = parse("pending tickets from last week");
        assert!(result.filters.get("sys_created_on").is_some_and(|v| v.contains("LastWeek")));
        assert_eq!(result.filters.len(), 2);
    }

    #[test]
    fn falls_back_to_keyword_search() {
        let result = parse("VPN outage on db01");
        assert_eq!(
            result.filters.get("short_description"),
            Some("short_descriptionCONTAINSvpn")
        );
        assert_eq!(result.confidence, KEYWORD_CONFIDENCE);
        assert_eq!(result.explanation, "Using keyword search for: vpn");
    }

    #[test]
    fn empty_input_has_no_filters() {
        let result = parse("");
        assert!(result.filters.is_empty());
        assert_eq!(result.confidence, 0.0);
        assert_eq!(
            result.explanation,
            "No filters applied - will return all incident records"
        );
        assert_eq!(result.template_used, None);
    }

    #[test]
    fn pathological_input_is_rejected_quietly() {
        for text in ["x".repeat(5000), "-".repeat(200)] {
            let result = parse(&text);
            assert!(result.filters.is_empty());
            assert_eq!(result.confidence, 0.0);
            assert_eq!(result.suggestions.len(), 1);
        }
    }

    #[test]
    fn confidence_is_capped() {
        let result = parse("urgent open unassigned tickets from today excluding logicmonitor");
        assert!(result.confidence <= 1.0);
        assert!(result.confidence > 0.9);
    }
}
