// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Condition sets, snapshots and field paths.
//!
//! A [`ConditionSet`] is what a caller expects, a [`Snapshot`] is what one query
//! observed. Both are string-to-string maps keyed by condition name (`Available`,
//! `Progressing`, ...) or by any caller-chosen field key (`readyReplicas`, `uid`).
//! A [`FieldPath`] says how one key is read from the cluster.

use crate::constants::{
    CONDITION_AVAILABLE, CONDITION_DEGRADED, CONDITION_PROGRESSING, STATUS_FALSE, STATUS_TRUE,
};
use crate::jsonpath::{JsonPathError, Template};
use chrono::{DateTime, Utc};
use std::collections::BTreeMap;
use std::fmt;

/// Expected values keyed by condition name. Keys are unique, order is irrelevant.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConditionSet {
    entries: BTreeMap<String, String>,
}

impl ConditionSet {
    /// An empty set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or replace one expectation.
    #[must_use]
    pub fn with(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.entries.insert(key.into(), value.into());
        self
    }

    /// `Available=True, Progressing=False, Degraded=False`.
    #[must_use]
    pub fn healthy_operator() -> Self {
        Self::new()
            .with(CONDITION_AVAILABLE, STATUS_TRUE)
            .with(CONDITION_PROGRESSING, STATUS_FALSE)
            .with(CONDITION_DEGRADED, STATUS_FALSE)
    }

    /// Parse `key=value` pairs as accepted on the command line.
    ///
    /// # Errors
    ///
    /// Returns the offending pair when it has no `=` or an empty key.
    pub fn parse_pairs<'a>(pairs: impl IntoIterator<Item = &'a str>) -> Result<Self, String> {
        let mut set = Self::new();
        for pair in pairs {
            match pair.split_once('=') {
                Some((key, value)) if !key.trim().is_empty() => {
                    set.entries
                        .insert(key.trim().to_string(), value.trim().to_string());
                }
                _ => return Err(pair.to_string()),
            }
        }
        Ok(set)
    }

    /// The expected value for `key`.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries.get(key).map(String::as_str)
    }

    /// Iterate `(key, expected)` in key order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Expected keys in key order.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    /// Number of expectations.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// True when nothing is expected.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for ConditionSet {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            entries: iter
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }
}

impl<const N: usize> From<[(&str, &str); N]> for ConditionSet {
    fn from(pairs: [(&str, &str); N]) -> Self {
        pairs.into_iter().collect()
    }
}

impl fmt::Display for ConditionSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write_map(f, &self.entries)
    }
}

/// Values observed by one query at one point in time. Never mutated after creation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Snapshot {
    values: BTreeMap<String, String>,
    observed_at: Option<DateTime<Utc>>,
}

impl Snapshot {
    /// A snapshot of `values` observed now.
    #[must_use]
    pub fn new(values: BTreeMap<String, String>) -> Self {
        Self {
            values,
            observed_at: Some(Utc::now()),
        }
    }

    /// The snapshot reported when no query ever succeeded.
    #[must_use]
    pub fn empty() -> Self {
        Self {
            values: BTreeMap::new(),
            observed_at: None,
        }
    }

    /// The observed value for `key`.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&str> {
        self.values.get(key).map(String::as_str)
    }

    /// Iterate `(key, observed)` in key order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.values.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// True when nothing was observed.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// When the query ran, `None` for [`Snapshot::empty`].
    #[must_use]
    pub fn observed_at(&self) -> Option<DateTime<Utc>> {
        self.observed_at
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for Snapshot {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self::new(
            iter.into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }
}

impl fmt::Display for Snapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.values.is_empty() {
            return f.write_str("<nothing observed>");
        }
        write_map(f, &self.values)
    }
}

fn write_map(f: &mut fmt::Formatter<'_>, map: &BTreeMap<String, String>) -> fmt::Result {
    f.write_str("{")?;
    for (i, (k, v)) in map.iter().enumerate() {
        if i > 0 {
            f.write_str(", ")?;
        }
        write!(f, "{k}={v:?}")?;
    }
    f.write_str("}")
}

/// How one snapshot key is read: a validated jsonpath template plus an optional
/// value substituted when the field reads as empty.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldPath {
    template: Template,
    default: Option<String>,
}

impl FieldPath {
    /// Validate a jsonpath template such as `{.status.readyReplicas}`.
    ///
    /// # Errors
    ///
    /// Returns [`JsonPathError`] when the template is not in the supported subset.
    pub fn parse(template: &str) -> Result<Self, JsonPathError> {
        Ok(Self {
            template: Template::parse(template)?,
            default: None,
        })
    }

    /// `.status.conditions[?(@.type=="<name>")].status`
    #[must_use]
    pub fn condition_status(name: &str) -> Self {
        Self::concatenated_conditions(&[name])
    }

    /// Several condition statuses concatenated in order, e.g. `TrueFalseFalse`.
    #[must_use]
    pub fn concatenated_conditions(names: &[&str]) -> Self {
        Self {
            template: Template::condition_statuses(names),
            default: None,
        }
    }

    /// Report `default` instead of an empty read (Kubernetes omits zero counters).
    #[must_use]
    pub fn with_default(mut self, default: impl Into<String>) -> Self {
        self.default = Some(default.into());
        self
    }

    /// The template text handed to the client.
    #[must_use]
    pub fn as_str(&self) -> &str {
        self.template.as_str()
    }

    /// The parsed template.
    #[must_use]
    pub fn template(&self) -> &Template {
        &self.template
    }

    /// Normalise a raw read: trim whitespace and stray quotes, then apply the default.
    #[must_use]
    pub fn normalize(&self, raw: &str) -> String {
        let trimmed = raw.trim();
        let value = trimmed
            .strip_prefix('\'')
            .and_then(|v| v.strip_suffix('\''))
            .unwrap_or(trimmed)
            .trim();
        match (&self.default, value.is_empty()) {
            (Some(default), true) => default.clone(),
            _ => value.to_string(),
        }
    }
}

#[cfg(test)]
#[path = "condition_tests.rs"]
mod condition_tests;
