//! Ordered field-to-fragment map shared by every stage of the translator.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// Separator joining filter fragments (logical AND).
pub const SEGMENT_SEPARATOR: &str = "^";
/// Separator joining same-field alternatives (logical OR).
pub const OR_SEPARATOR: &str = "^OR";

pub const COMPLETE_QUERY_KEY: &str = "_complete_query";
pub const COMPLETE_PREFIX: &str = "_complete_";

pub const PRIORITY_FIELD: &str = "priority";
pub const STATE_FIELD: &str = "state";
pub const ASSIGNED_TO_FIELD: &str = "assigned_to";
pub const CALLER_FIELD: &str = "caller_id";
pub const CREATED_FIELD: &str = "sys_created_on";
pub const DESCRIPTION_FIELD: &str = "short_description";

const DATE_FIELDS: &[&str] = &[
    "sys_created_on",
    "sys_updated_on",
    "opened_at",
    "resolved_at",
    "closed_at",
    "start_date",
    "end_date",
];

pub fn is_date_field(field: &str) -> bool {
    DATE_FIELDS.contains(&field)
}

/// Name of the synthetic key carrying a pre-built exclusion chain for `name`.
pub fn exclusion_key(name: &str) -> String {
    format!("{COMPLETE_PREFIX}{name}_exclusion")
}

/// Insertion-ordered filter map. Re-inserting a key replaces its value in place.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FilterMap(IndexMap<String, String>);

impl FilterMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) -> Option<String> {
        self.0.insert(key.into(), value.into())
    }

    /// Inserts only when `key` is absent. Returns whether the value was stored.
    pub fn insert_if_absent(&mut self, key: impl Into<String>, value: impl Into<String>) -> bool {
        let key = key.into();
        if self.0.contains_key(&key) {
            return false;
        }
        self.0.insert(key, value.into());
        true
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.0.get(key).map(String::as_str)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.0.contains_key(key)
    }

    pub fn remove(&mut self, key: &str) -> Option<String> {
        self.0.shift_remove(key)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    /// Copies every entry of `other` over `self`, last write wins.
    pub fn extend(&mut self, other: &FilterMap) {
        for (key, value) in other.iter() {
            self.insert(key, value);
        }
    }

    /// True when any entry constrains `field`, either directly, through a
    /// comparison-suffixed key, or inside a raw complete-query fragment.
    pub fn mentions_field(&self, field: &str) -> bool {
        self.iter().any(|(key, value)| match FilterKey::classify(key) {
            FilterKey::Field { field: f, .. } => f == field,
            FilterKey::CompleteQuery | FilterKey::Complete(_) => value.contains(field),
        })
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for FilterMap {
    fn from_iter<T: IntoIterator<Item = (K, V)>>(iter: T) -> Self {
        Self(
            iter.into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ComparisonOp {
    Gte,
    Lte,
    Gt,
    Lt,
}

impl ComparisonOp {
    pub fn symbol(self) -> &'static str {
        match self {
            ComparisonOp::Gte => ">=",
            ComparisonOp::Lte => "<=",
            ComparisonOp::Gt => ">",
            ComparisonOp::Lt => "<",
        }
    }
}

// `_gte`/`_lte` must be tried before `_gt`/`_lt`.
const SUFFIXES: &[(&str, ComparisonOp)] = &[
    ("_gte", ComparisonOp::Gte),
    ("_lte", ComparisonOp::Lte),
    ("_gt", ComparisonOp::Gt),
    ("_lt", ComparisonOp::Lt),
];

/// How the compiler and explainer should treat a map key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterKey<'a> {
    /// `_complete_query`: value inserted verbatim.
    CompleteQuery,
    /// Any other `_complete_<name>` key, e.g. `_complete_caller_exclusion`.
    Complete(&'a str),
    /// A real remote field, optionally decorated with a comparison suffix.
    Field {
        field: &'a str,
        op: Option<ComparisonOp>,
    },
}

impl<'a> FilterKey<'a> {
    pub fn classify(key: &'a str) -> Self {
        if key == COMPLETE_QUERY_KEY {
            return FilterKey::CompleteQuery;
        }
        if let Some(name) = key.strip_prefix(COMPLETE_PREFIX) {
            return FilterKey::Complete(name);
        }
        for (suffix, op) in SUFFIXES {
            if let Some(field) = key.strip_suffix(suffix) {
                if !field.is_empty() {
                    return FilterKey::Field {
                        field,
                        op: Some(*op),
                    };
                }
            }
        }
        FilterKey::Field {
            field: key,
            op: None,
        }
    }

    pub fn is_synthetic(&self) -> bool {
        !matches!(self, FilterKey::Field { .. })
    }

    /// `Some(name)` for `_complete_<name>_exclusion` keys.
    pub fn exclusion_name(&self) -> Option<&'a str> {
        match self {
            FilterKey::Complete(name) => name.strip_suffix("_exclusion"),
            _ => None,
        }
    }
}
