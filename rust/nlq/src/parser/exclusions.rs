//! Field-targeted exclusion phrases such as "without caller jane doe".

use super::ParseResult;
use crate::{
    filter::{exclusion_key, FilterMap, ASSIGNED_TO_FIELD, CALLER_FIELD},
    normalize::{normalize_exclusion, normalize_exclusion_for, resolve_entity},
};
use once_cell::sync::Lazy;
use regex::Regex;

pub const EXCLUSION_CONFIDENCE: f64 = 0.2;

const STOP_WORDS: &[&str] = &[
    "from", "in", "on", "incidents", "incident", "tickets", "ticket", "and", "or", "between",
    "created", "with",
];

/// Phrase alias, target field, synthetic key name.
const FIELD_ALIASES: &[(&str, &str, &str)] = &[
    ("caller", CALLER_FIELD, "caller"),
    ("reporter", CALLER_FIELD, "caller"),
    ("user", CALLER_FIELD, "caller"),
    ("assignee", ASSIGNED_TO_FIELD, "assigned_to"),
];

static FIELD_EXCLUSION_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\b(?:exclud(?:e|ing)|not|without)\s+(caller|reporter|assignee|user)\s+([\w\s]+)")
        .expect("field exclusion regex")
});
static BARE_EXCLUSION_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\b(?:exclud(?:e|ing)|without)\s+([\w\s]+)").expect("bare exclusion regex")
});

/// Detects an exclusion phrase. Returns `None` when the text has none.
pub fn parse_exclusions(text: &str) -> Option<ParseResult> {
    let lowered = text.to_lowercase();
    parse_field_exclusion(&lowered).or_else(|| parse_known_entity_exclusion(&lowered))
}

fn parse_field_exclusion(text: &str) -> Option<ParseResult> {
    let caps = FIELD_EXCLUSION_RE.captures(text)?;
    let alias = caps.get(1)?.as_str();
    let value = leading_phrase(caps.get(2)?.as_str())?;
    let (_, field, key_name) = FIELD_ALIASES
        .iter()
        .find(|(candidate, _, _)| *candidate == alias)?;

    let mut filters = FilterMap::new();
    filters.insert(exclusion_key(key_name), normalize_exclusion_for(field, &value));
    Some(exclusion_result(filters, alias, &value))
}

fn parse_known_entity_exclusion(text: &str) -> Option<ParseResult> {
    let caps = BARE_EXCLUSION_RE.captures(text)?;
    let value = leading_phrase(caps.get(1)?.as_str())?;
    resolve_entity(&value)?;

    let mut filters = FilterMap::new();
    filters.insert(exclusion_key("caller"), normalize_exclusion(&value));
    Some(exclusion_result(filters, "caller", &value))
}

fn exclusion_result(filters: FilterMap, alias: &str, value: &str) -> ParseResult {
    ParseResult {
        filters,
        confidence: EXCLUSION_CONFIDENCE,
        explanation: format!("Detected exclusion: {alias} != {value}"),
        ..Default::default()
    }
}

/// Words up to the first stop word.
fn leading_phrase(raw: &str) -> Option<String> {
    let words: Vec<&str> = raw
        .split_whitespace()
        .take_while(|word| !STOP_WORDS.contains(word))
        .collect();
    (!words.is_empty()).then(|| words.join(" "))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn resolves_known_caller() {
        let result = parse_exclusions("P1 incidents excluding caller LogicMonitor Integration from last week")
            .expect("exclusion");
        assert_eq!(
            result.filters.get("_complete_caller_exclusion"),
            Some("caller_id!=1727339e47d99190c43d3171e36d43ad")
        );
        assert_eq!(
            result.explanation,
            "Detected exclusion: caller != logicmonitor integration"
        );
        assert_eq!(result.confidence, EXCLUSION_CONFIDENCE);
    }

    #[test]
    fn maps_assignee_alias() {
        let result = parse_exclusions("tickets without assignee abc123 created today").expect("exclusion");
        assert_eq!(
            result.filters.get("_complete_assigned_to_exclusion"),
            Some("assigned_to!=abc123")
        );
    }

    #[test]
    fn raw_identifiers_pass_through() {
        let result = parse_exclusions("not reporter 6816f79cc0a8016401c5a33be04be441").expect("exclusion");
        assert_eq!(
            result.filters.get("_complete_caller_exclusion"),
            Some("caller_id!=6816f79cc0a8016401c5a33be04be441")
        );
    }

    #[test]
    fn bare_known_entity_is_accepted() {
        let result = parse_exclusions("high priority last week excluding logicmonitor").expect("exclusion");
        assert_eq!(
            result.filters.get("_complete_caller_exclusion"),
            Some("caller_id!=1727339e47d99190c43d3171e36d43ad")
        );
    }

    #[test]
    fn no_exclusion_phrase() {
        assert_eq!(parse_exclusions("p1 incidents from last week"), None);
        assert_eq!(parse_exclusions("without delay"), None);
        assert_eq!(parse_exclusions("excluding caller from"), None);
    }
}
