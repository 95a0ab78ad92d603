//! Canonicalisation of priority lists and caller exclusions.

use crate::filter::{CALLER_FIELD, OR_SEPARATOR, PRIORITY_FIELD, SEGMENT_SEPARATOR};

/// Integration accounts callers commonly want to filter out, keyed by alias.
const KNOWN_ENTITIES: &[(&str, &str)] = &[
    ("logicmonitor integration", "1727339e47d99190c43d3171e36d43ad"),
    ("logicmonitor", "1727339e47d99190c43d3171e36d43ad"),
];

/// Resolves a free-text entity name to its record identifier.
pub fn resolve_entity(name: &str) -> Option<&'static str> {
    let needle = name.trim().to_lowercase();
    if needle.is_empty() {
        return None;
    }
    KNOWN_ENTITIES
        .iter()
        .find(|(alias, _)| needle == *alias || needle.contains(alias))
        .map(|(_, id)| *id)
}

/// Rewrites `"1,2"`, `"P1,P2"`, `"priority=1,2"` or `'["1","2"]'` as
/// `priority=1^ORpriority=2`. `^OR` chains are returned as is.
pub fn normalize_priority(raw: &str) -> String {
    let cleaned: String = raw
        .chars()
        .filter(|ch| !matches!(ch, '[' | ']' | '"' | '\''))
        .collect();
    let cleaned = cleaned.trim();

    if cleaned.is_empty() {
        return String::new();
    }
    if cleaned.contains(OR_SEPARATOR) {
        return cleaned.to_string();
    }

    let values: Vec<&str> = cleaned
        .split(',')
        .map(str::trim)
        .map(|token| token.strip_prefix("priority=").unwrap_or(token).trim())
        .map(|token| token.trim_start_matches(['p', 'P']))
        .filter(|token| !token.is_empty())
        .collect();

    values
        .iter()
        .map(|value| format!("{PRIORITY_FIELD}={value}"))
        .collect::<Vec<_>>()
        .join(OR_SEPARATOR)
}

/// Caller exclusion using `caller_id` as the target field.
pub fn normalize_exclusion(raw: &str) -> String {
    normalize_exclusion_for(CALLER_FIELD, raw)
}

/// Produces a `<field>!=<id>` chain joined by the segment separator.
pub fn normalize_exclusion_for(field: &str, raw: &str) -> String {
    let raw = raw.trim();
    if raw.is_empty() {
        return String::new();
    }
    if raw.contains("!=") {
        return raw.to_string();
    }

    raw.split(',')
        .map(str::trim)
        .filter(|token| !token.is_empty())
        .map(|token| match resolve_entity(token) {
            Some(id) => format!("{field}!={id}"),
            None => format!("{field}!={token}"),
        })
        .collect::<Vec<_>>()
        .join(SEGMENT_SEPARATOR)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalizes_priority_lists() {
        assert_eq!(normalize_priority("1,2"), "priority=1^ORpriority=2");
        assert_eq!(normalize_priority("P1,P2"), "priority=1^ORpriority=2");
        assert_eq!(normalize_priority("p1, p2"), "priority=1^ORpriority=2");
        assert_eq!(normalize_priority(r#"["1","2"]"#), "priority=1^ORpriority=2");
        assert_eq!(
            normalize_priority("1,2,3"),
            "priority=1^ORpriority=2^ORpriority=3"
        );
        assert_eq!(normalize_priority("1"), "priority=1");
        assert_eq!(normalize_priority("P3"), "priority=3");
        assert_eq!(normalize_priority(""), "");
    }

    #[test]
    fn prefixed_comma_lists_become_or_chains() {
        assert_eq!(normalize_priority("priority=1,2"), "priority=1^ORpriority=2");
        assert_eq!(
            normalize_priority("priority=1, priority=3"),
            "priority=1^ORpriority=3"
        );
        assert_eq!(normalize_priority("priority=2"), "priority=2");
    }

    #[test]
    fn priority_normalization_is_idempotent() {
        for raw in [
            "1",
            "P2",
            "1,2",
            "P1,P2,P3",
            r#"["4"]"#,
            "priority=1,2",
            "priority=1^ORpriority=2",
        ] {
            let once = normalize_priority(raw);
            assert_eq!(normalize_priority(&once), once, "input {raw}");
        }
    }

    #[test]
    fn resolves_known_entities() {
        let expected = "caller_id!=1727339e47d99190c43d3171e36d43ad";
        assert_eq!(normalize_exclusion("logicmonitor"), expected);
        assert_eq!(normalize_exclusion("LogicMonitor Integration"), expected);
        assert_eq!(normalize_exclusion("the logicmonitor account"), expected);
    }

    #[test]
    fn splits_raw_identifiers_in_order() {
        assert_eq!(
            normalize_exclusion("sys_id1,sys_id2"),
            "caller_id!=sys_id1^caller_id!=sys_id2"
        );
        assert_eq!(normalize_exclusion("abc123"), "caller_id!=abc123");
        assert_eq!(
            normalize_exclusion_for("assigned_to", "u1, u2"),
            "assigned_to!=u1^assigned_to!=u2"
        );
    }

    #[test]
    fn known_entities_inside_lists_keep_their_neighbours() {
        assert_eq!(
            normalize_exclusion("sid1,logicmonitor,sid2"),
            "caller_id!=sid1^caller_id!=1727339e47d99190c43d3171e36d43ad^caller_id!=sid2"
        );
    }

    #[test]
    fn leaves_formatted_exclusions_alone() {
        assert_eq!(
            normalize_exclusion("caller_id!=abc^caller_id!=def"),
            "caller_id!=abc^caller_id!=def"
        );
        assert_eq!(normalize_exclusion("  "), "");
    }
}
