//! Regex rule table turning phrases into individual filter entries.

use crate::{
    filter::{
        exclusion_key, FilterMap, ASSIGNED_TO_FIELD, CREATED_FIELD, PRIORITY_FIELD, STATE_FIELD,
    },
    normalize::{normalize_exclusion, resolve_entity},
    query::compiler::{compile_condition, relative_period_fragment},
    time::RelativePeriod,
};
use once_cell::sync::Lazy;
use regex::{Captures, Regex};
use tracing::debug;

pub const RULE_CONFIDENCE: f64 = 0.2;

const P1_P2: &str = "priority=1^ORpriority=2";
const OPEN_STATES: &str = "state=1^ORstate=2^ORstate=3";
const CLOSED_STATES: &str = "state=6^ORstate=7";
const CURRENT_USER: &str = "javascript:gs.getUserID()";

#[derive(Debug, Clone, Copy)]
enum Effect {
    Set(&'static str, &'static str),
    Period(RelativePeriod),
    LastDays,
    KnownEntityExclusion,
}

struct PatternRule {
    name: &'static str,
    regex: Regex,
    effect: Effect,
}

// Later rules overwrite earlier ones on the same key.
static RULES: Lazy<Vec<PatternRule>> = Lazy::new(|| {
    use Effect::*;
    [
        ("priority_1", r"\b(critical|p1|priority\s*1|urgent)\b", Set(PRIORITY_FIELD, "1")),
        ("priority_2", r"\b(high|p2|priority\s*2|important)\b", Set(PRIORITY_FIELD, "2")),
        ("priority_3", r"\b(medium|p3|priority\s*3|normal)\b", Set(PRIORITY_FIELD, "3")),
        ("priority_4", r"\b(low|p4|priority\s*4)\b", Set(PRIORITY_FIELD, "4")),
        (
            "priority_1_2",
            r"\b(p1\s*and\s*p2|high\s*priority|critical\s*and\s*high)\b",
            Set(PRIORITY_FIELD, P1_P2),
        ),
        ("last_week", r"\b(last\s*week|past\s*week)\b", Period(RelativePeriod::LastWeek)),
        ("this_week", r"\b(this\s*week|current\s*week)\b", Period(RelativePeriod::ThisWeek)),
        ("today", r"\btoday('s)?\b", Period(RelativePeriod::Today)),
        ("yesterday", r"\byesterday\b", Period(RelativePeriod::Yesterday)),
        ("last_days", r"\b(?:last|past)\s*(\d{1,4})\s*days?\b", LastDays),
        ("last_month", r"\b(past\s*month|last\s*month)\b", Period(RelativePeriod::LastMonth)),
        ("this_month", r"\b(this\s*month|current\s*month)\b", Period(RelativePeriod::ThisMonth)),
        ("state_open", r"\b(new|open|active)\b", Set(STATE_FIELD, OPEN_STATES)),
        ("state_closed", r"\b(resolved|closed|completed)\b", Set(STATE_FIELD, CLOSED_STATES)),
        ("state_in_progress", r"\b(in\s*progress|working)\b", Set(STATE_FIELD, "2")),
        ("state_pending", r"\b(pending|waiting)\b", Set(STATE_FIELD, "10")),
        ("state_cancelled", r"\b(cancelled|canceled)\b", Set(STATE_FIELD, "8")),
        (
            "unassigned",
            r"\b(unassigned|not\s*assigned|no\s*assignee)\b",
            Set(ASSIGNED_TO_FIELD, "NULL"),
        ),
        (
            "assigned_to_me",
            r"\b(assigned\s*to\s*me|my\s*tickets|my\s*incidents)\b",
            Set(ASSIGNED_TO_FIELD, CURRENT_USER),
        ),
        (
            "exclusion",
            r"\b(?:exclud(?:e|ing)|not|without)\s+([a-z][a-z0-9 ]*)",
            KnownEntityExclusion,
        ),
    ]
    .into_iter()
    .map(|(name, pattern, effect)| PatternRule {
        name,
        regex: Regex::new(pattern).expect("pattern rule regex"),
        effect,
    })
    .collect()
});

#[derive(Debug, Clone, Default, PartialEq)]
pub struct PatternMatches {
    pub filters: FilterMap,
    pub confidence: f64,
    pub explanations: Vec<String>,
}

/// Applies every rule to already-normalised text.
pub fn parse_patterns(normalized: &str) -> PatternMatches {
    let mut matches = PatternMatches::default();

    for rule in RULES.iter() {
        let Some(caps) = rule.regex.captures(normalized) else {
            continue;
        };
        let Some((key, value)) = apply(rule.effect, &caps) else {
            continue;
        };
        let matched = caps.get(0).map_or("", |m| m.as_str()).trim();
        debug!(rule = rule.name, matched, %key, "pattern rule fired");

        let rendered = compile_condition(&key, &value).unwrap_or_else(|| value.clone());
        matches
            .explanations
            .push(format!("Detected '{matched}' -> {rendered}"));
        matches.filters.insert(key, value);
        matches.confidence += RULE_CONFIDENCE;
    }

    matches
}

fn apply(effect: Effect, caps: &Captures<'_>) -> Option<(String, String)> {
    match effect {
        Effect::Set(key, value) => Some((key.to_string(), value.to_string())),
        Effect::Period(period) => Some((
            CREATED_FIELD.to_string(),
            relative_period_fragment(CREATED_FIELD, period),
        )),
        Effect::LastDays => {
            let days = caps.get(1)?.as_str().parse().ok()?;
            Some((
                CREATED_FIELD.to_string(),
                relative_period_fragment(CREATED_FIELD, RelativePeriod::LastDays(days)),
            ))
        }
        Effect::KnownEntityExclusion => {
            let target = caps.get(1)?.as_str();
            resolve_entity(target)?;
            Some((exclusion_key("caller"), normalize_exclusion(target)))
        }
    }
}
