// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Snapshot-versus-expectation matching.
//!
//! Pure functions, no side effects. A key missing from the snapshot never matches;
//! the poll loop reads that as "not converged yet" so freshly created resources whose
//! status has not been populated simply keep being polled.

use crate::condition::{ConditionSet, Snapshot};
use std::fmt;
use std::str::FromStr;

/// How an observed value is compared with the expected one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MatchMode {
    /// Character-equal
    #[default]
    Exact,
    /// Observed contains expected
    Substring,
    /// Observed is non-empty and differs from expected (uid or secret churn)
    Differs,
}

impl MatchMode {
    /// Compare one observed value with one expected value.
    #[must_use]
    pub fn accepts(self, observed: &str, expected: &str) -> bool {
        match self {
            MatchMode::Exact => observed == expected,
            MatchMode::Substring => observed.contains(expected),
            MatchMode::Differs => !observed.is_empty() && observed != expected,
        }
    }
}

impl fmt::Display for MatchMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            MatchMode::Exact => "exact",
            MatchMode::Substring => "substring",
            MatchMode::Differs => "differs",
        })
    }
}

impl FromStr for MatchMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "exact" => Ok(MatchMode::Exact),
            "substring" | "contains" => Ok(MatchMode::Substring),
            "differs" | "changed" => Ok(MatchMode::Differs),
            other => Err(format!(
                "unknown match mode '{other}' (expected exact, substring or differs)"
            )),
        }
    }
}

/// One expectation the snapshot does not satisfy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Mismatch {
    /// The condition key
    pub key: String,
    /// The expected value
    pub expected: String,
    /// The observed value, `None` when the key was not observed at all
    pub observed: Option<String>,
}

/// True when every expected key is observed and accepted under `mode`.
#[must_use]
pub fn matches(observed: &Snapshot, expected: &ConditionSet, mode: MatchMode) -> bool {
    expected.iter().all(|(key, want)| {
        observed
            .get(key)
            .is_some_and(|got| mode.accepts(got, want))
    })
}

/// Every expectation the snapshot fails, in key order.
#[must_use]
pub fn mismatches(observed: &Snapshot, expected: &ConditionSet, mode: MatchMode) -> Vec<Mismatch> {
    expected
        .iter()
        .filter_map(|(key, want)| match observed.get(key) {
            Some(got) if mode.accepts(got, want) => None,
            got => Some(Mismatch {
                key: key.to_string(),
                expected: want.to_string(),
                observed: got.map(str::to_string),
            }),
        })
        .collect()
}

#[cfg(test)]
#[path = "matcher_tests.rs"]
mod matcher_tests;
