//! Structured request context merged on top of parsed filters.

use super::compiler::date_range_fragment;
use crate::{
    filter::{FilterMap, CREATED_FIELD, SEGMENT_SEPARATOR},
    normalize::normalize_exclusion,
    time::DateRange,
};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

pub const CONTEXT_DATE_RANGE_KEY: &str = "_complete_context_date_range";
pub const CONTEXT_CALLER_EXCLUSION_KEY: &str = "_complete_context_caller_exclusion";
pub const STATE_EXCLUSION_KEY: &str = "_complete_state_exclusion";
pub const CONTEXT_ASSIGNMENT_KEY: &str = "_complete_context_assignment";

const NOT_CLOSED: &str = "state!=6^state!=7^state!=8";
const ASSIGNED_TO_CURRENT_USER: &str = "assigned_to=javascript:gs.getUserID()";

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct FilterContext {
    #[serde(default)]
    pub date_range: Option<ContextDateRange>,
    #[serde(default)]
    pub exclude_caller: Option<CallerList>,
    #[serde(default)]
    pub exclude_resolved: bool,
    #[serde(default)]
    pub user_assigned_only: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct ContextDateRange {
    pub start: String,
    pub end: String,
}

/// A single caller or a list of callers.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(untagged)]
pub enum CallerList {
    One(String),
    Many(Vec<String>),
}

impl CallerList {
    pub fn entries(&self) -> Vec<&str> {
        match self {
            CallerList::One(caller) => vec![caller.as_str()],
            CallerList::Many(callers) => callers.iter().map(String::as_str).collect(),
        }
    }
}

/// Filters contributed by `context`. Every effect writes its own synthetic key.
pub fn apply_context(context: &FilterContext, table: &str) -> FilterMap {
    let mut filters = FilterMap::new();

    if let Some(raw) = &context.date_range {
        match DateRange::from_iso(&raw.start, &raw.end) {
            Some(range) => {
                filters.insert(
                    CONTEXT_DATE_RANGE_KEY,
                    date_range_fragment(CREATED_FIELD, &range),
                );
            }
            None => warn!(
                table,
                start = %raw.start,
                end = %raw.end,
                "ignoring invalid context date range"
            ),
        }
    }

    if let Some(callers) = &context.exclude_caller {
        let chain = callers
            .entries()
            .into_iter()
            .map(normalize_exclusion)
            .filter(|fragment| !fragment.is_empty())
            .collect::<Vec<_>>()
            .join(SEGMENT_SEPARATOR);
        if !chain.is_empty() {
            filters.insert(CONTEXT_CALLER_EXCLUSION_KEY, chain);
        }
    }

    if context.exclude_resolved {
        filters.insert(STATE_EXCLUSION_KEY, NOT_CLOSED);
    }

    if context.user_assigned_only {
        filters.insert(CONTEXT_ASSIGNMENT_KEY, ASSIGNED_TO_CURRENT_USER);
    }

    debug!(table, count = filters.len(), "context filters built");
    filters
}

/// Adds `context_filters` entries whose keys are absent from `filters`.
/// Returns the keys that were inserted.
pub fn merge_context(filters: &mut FilterMap, context_filters: &FilterMap) -> Vec<String> {
    context_filters
        .iter()
        .filter_map(|(key, value)| filters.insert_if_absent(key, value).then(|| key.to_string()))
        .collect()
}
