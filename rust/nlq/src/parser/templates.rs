//! Canned whole-intent filters matched before the per-rule pattern pass.

use crate::filter::FilterMap;
use indexmap::IndexMap;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;

pub const TEMPLATE_CONFIDENCE: f64 = 0.9;

const P1_P2: &str = "priority=1^ORpriority=2";
const NOT_CLOSED: &str = "state!=6^state!=7^state!=8";

#[derive(Debug, Clone, Copy)]
pub struct FilterTemplate {
    pub name: &'static str,
    pub description: &'static str,
    pub use_case: &'static str,
    entries: &'static [(&'static str, &'static str)],
}

impl FilterTemplate {
    /// Fresh copy of the template's filters.
    pub fn filters(&self) -> FilterMap {
        self.entries.iter().copied().collect()
    }
}

static TEMPLATES: &[FilterTemplate] = &[
    FilterTemplate {
        name: "high_priority_last_week",
        description: "P1 and P2 records created during the previous calendar week",
        use_case: "Weekly review of high-priority work",
        entries: &[(
            "_complete_query",
            "sys_created_onBETWEENjavascript:gs.beginningOfLastWeek()@javascript:gs.endOfLastWeek()^priority=1^ORpriority=2",
        )],
    },
    FilterTemplate {
        name: "critical_recent",
        description: "P1 records created in the last 7 days",
        use_case: "Checking on recent critical incidents",
        entries: &[
            ("priority", "1"),
            (
                "sys_created_on",
                "sys_created_onBETWEENjavascript:gs.daysAgoStart(7)@javascript:gs.daysAgoEnd(0)",
            ),
        ],
    },
    FilterTemplate {
        name: "unassigned_recent",
        description: "Records with no assignee created in the last 3 days",
        use_case: "Finding work that still needs an owner",
        entries: &[
            ("assigned_to", "NULL"),
            (
                "sys_created_on",
                "sys_created_onBETWEENjavascript:gs.daysAgoStart(3)@javascript:gs.daysAgoEnd(0)",
            ),
        ],
    },
    FilterTemplate {
        name: "resolved_this_month",
        description: "Resolved or closed records created this month",
        use_case: "Monthly resolution reporting",
        entries: &[
            ("state", "state=6^ORstate=7"),
            (
                "sys_created_on",
                "sys_created_onBETWEENjavascript:gs.beginningOfThisMonth()@javascript:gs.endOfThisMonth()",
            ),
        ],
    },
    FilterTemplate {
        name: "active_p1_p2",
        description: "P1 and P2 records that are not resolved, closed or cancelled",
        use_case: "Tracking open high-priority work",
        entries: &[("priority", P1_P2), ("state", NOT_CLOSED)],
    },
    FilterTemplate {
        name: "p1_p2_all_states",
        description: "P1 and P2 records in any state",
        use_case: "Complete high-priority history",
        entries: &[("priority", P1_P2)],
    },
];

// First match wins.
static TRIGGERS: Lazy<Vec<(Regex, &'static str)>> = Lazy::new(|| {
    [
        (
            r"(high\s*priority|critical|p1\s*p2).*(last\s*week|past\s*week)",
            "high_priority_last_week",
        ),
        (
            r"(critical|p1).*(recent|today|yesterday|days?)",
            "critical_recent",
        ),
        (
            r"(unassigned|no\s*assignee).*(recent|today|days?)",
            "unassigned_recent",
        ),
        (r"(resolved|closed).*(this\s*month|month)", "resolved_this_month"),
        (r"(active|open).*(critical|high|p1|p2)", "active_p1_p2"),
        (r"\b(p1\s*and\s*p2|p1\s*p2)\b", "p1_p2_all_states"),
    ]
    .into_iter()
    .map(|(pattern, name)| (Regex::new(pattern).expect("template trigger regex"), name))
    .collect()
});

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TemplateMatch {
    pub name: String,
    pub filters: FilterMap,
    pub confidence: f64,
}

/// Matches already-normalised text against the template triggers.
pub fn match_template(normalized: &str) -> Option<TemplateMatch> {
    let name = TRIGGERS
        .iter()
        .find(|(regex, _)| regex.is_match(normalized))
        .map(|(_, name)| *name)?;
    let template = find(name)?;
    tracing::debug!(template = name, "template matched");
    Some(TemplateMatch {
        name: name.to_string(),
        filters: template.filters(),
        confidence: TEMPLATE_CONFIDENCE,
    })
}

pub fn find(name: &str) -> Option<&'static FilterTemplate> {
    TEMPLATES.iter().find(|template| template.name == name)
}

pub fn catalogue() -> &'static [FilterTemplate] {
    TEMPLATES
}

/// Snapshot of every template keyed by name. Each call returns new maps.
pub fn get_templates() -> IndexMap<String, FilterMap> {
    TEMPLATES
        .iter()
        .map(|template| (template.name.to_string(), template.filters()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn matched(text: &str) -> Option<String> {
        match_template(text).map(|m| m.name)
    }

    #[test]
    fn every_trigger_names_a_template() {
        for (_, name) in TRIGGERS.iter() {
            assert!(find(name).is_some(), "missing template {name}");
        }
        assert_eq!(get_templates().len(), 6);
    }

    #[test]
    fn matches_high_priority_last_week() {
        for text in [
            "high priority incidents from last week",
            "critical tickets from past week",
            "p1 p2 last week",
        ] {
            assert_eq!(matched(text).as_deref(), Some("high_priority_last_week"));
        }
    }

    #[test]
    fn matches_recent_and_monthly_templates() {
        for text in ["critical incidents from yesterday", "p1 from today", "critical recent"] {
            assert_eq!(matched(text).as_deref(), Some("critical_recent"), "{text}");
        }
        assert_eq!(matched("unassigned recent").as_deref(), Some("unassigned_recent"));
        assert_eq!(
            matched("resolved this month").as_deref(),
            Some("resolved_this_month")
        );
    }

    #[test]
    fn matches_active_and_all_states() {
        for text in ["active critical incidents", "open high priority", "active p1"] {
            assert_eq!(matched(text).as_deref(), Some("active_p1_p2"), "{text}");
        }
        for text in ["p1 and p2", "p1 p2", "p1 and p2 incidents"] {
            assert_eq!(matched(text).as_deref(), Some("p1_p2_all_states"), "{text}");
        }
    }

    #[test]
    fn unrelated_text_has_no_template() {
        assert_eq!(matched("random query text"), None);
    }

    #[test]
    fn template_copies_are_independent() {
        let mut first = get_templates();
        if let Some(filters) = first.get_mut("p1_p2_all_states") {
            filters.insert("priority", "4");
        }
        let second = get_templates();
        assert_eq!(
            second["p1_p2_all_states"].get("priority"),
            Some("priority=1^ORpriority=2")
        );
        assert_eq!(
            match_template("p1 and p2").map(|m| m.confidence),
            Some(TEMPLATE_CONFIDENCE)
        );
    }
}
