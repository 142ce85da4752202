// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! The bounded-retry convergence loop.
//!
//! [`run`] samples a [`SnapshotSource`] at a fixed interval until the snapshot
//! matches an expected [`ConditionSet`] or the timeout elapses.
//!
//! # Rules
//!
//! - The first matching sample returns [`Outcome::Converged`] immediately; a state
//!   that already holds on the first tick returns without sleeping.
//! - A failed sample (API hiccup, resource not created yet, selector briefly matching
//!   two pods during a rollout) counts as "not yet" and is retried. It is logged and
//!   its text is kept for the timeout report.
//! - Every tick is followed by a sleep of exactly `interval`; there is no backoff.
//! - `timeout` is a hard ceiling: the loop returns [`Outcome::TimedOut`] no later than
//!   `timeout + interval` after it started (plus `stable_for` when a stability
//!   re-check is requested). Each sample is cut off at that deadline, and a sleep
//!   only follows a tick that ended before `timeout`.
//! - Caller errors (invalid spec, expected keys the source never reports) return
//!   [`Outcome::QueryError`] before the first sample.
//!
//! Each call owns its own clock and history; concurrent calls share nothing.
//!
//! # Example
//!
//! ```rust,no_run
//! use clusterwait::client::ResourceRef;
//! use clusterwait::condition::ConditionSet;
//! use clusterwait::matcher::MatchMode;
//! use clusterwait::oc::OcClient;
//! use clusterwait::poll::{run, PollSpec};
//! use clusterwait::query::ConditionQuery;
//!
//! # async fn example() -> Result<(), clusterwait::errors::ConvergenceError> {
//! let oc = OcClient::default();
//! let query = ConditionQuery::conditions(
//!     &oc,
//!     ResourceRef::cluster("co", "kube-apiserver"),
//!     &["Available", "Progressing", "Degraded"],
//! );
//! let spec = PollSpec::from_secs(15, 900);
//! let snapshot = run(&spec, &query, &ConditionSet::healthy_operator(), MatchMode::Exact)
//!     .await
//!     .into_result()?;
//! # Ok(())
//! # }
//! ```

use crate::condition::{ConditionSet, Snapshot};
use crate::constants::{DEFAULT_POLL_INTERVAL_SECS, DEFAULT_POLL_TIMEOUT_SECS};
use crate::errors::{ConvergenceError, QueryError};
use crate::matcher::{matches, mismatches, MatchMode};
use crate::query::SnapshotSource;
use std::time::Duration;
use tokio::time::{sleep, timeout, Instant};
use tracing::{debug, info, warn};

/// Interval, timeout and optional stability window of one poll.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollSpec {
    /// Sleep between two samples
    pub interval: Duration,
    /// Overall budget
    pub timeout: Duration,
    /// When set, a match must still hold after this delay to count
    pub stable_for: Option<Duration>,
}

impl Default for PollSpec {
    fn default() -> Self {
        Self::from_secs(DEFAULT_POLL_INTERVAL_SECS, DEFAULT_POLL_TIMEOUT_SECS)
    }
}

impl PollSpec {
    /// A spec without stability re-check.
    #[must_use]
    pub fn new(interval: Duration, timeout: Duration) -> Self {
        Self {
            interval,
            timeout,
            stable_for: None,
        }
    }

    /// Shorthand for whole seconds.
    #[must_use]
    pub fn from_secs(interval_secs: u64, timeout_secs: u64) -> Self {
        Self::new(
            Duration::from_secs(interval_secs),
            Duration::from_secs(timeout_secs),
        )
    }

    /// Require a match to survive `delay` before it counts.
    #[must_use]
    pub fn with_stability(mut self, delay: Duration) -> Self {
        self.stable_for = Some(delay);
        self
    }

    /// Multiply the timeout, e.g. for single-node clusters.
    #[must_use]
    pub fn scaled(mut self, factor: u32) -> Self {
        self.timeout = self.timeout.saturating_mul(factor.max(1));
        self
    }

    /// Check `interval > 0` and `timeout > interval`.
    ///
    /// # Errors
    ///
    /// Returns [`QueryError::InvalidSpec`] describing the violated invariant.
    pub fn validate(&self) -> Result<(), QueryError> {
        if self.interval.is_zero() {
            return Err(QueryError::InvalidSpec(
                "interval must be greater than zero".to_string(),
            ));
        }
        if self.timeout <= self.interval {
            return Err(QueryError::InvalidSpec(format!(
                "timeout {:?} must be greater than interval {:?}",
                self.timeout, self.interval
            )));
        }
        Ok(())
    }
}

/// Diagnostic context of a poll that ran out of time.
#[derive(Debug, Clone)]
pub struct TimedOut {
    /// What was sampled
    pub target: String,
    /// What was expected
    pub expected: ConditionSet,
    /// How values were compared
    pub mode: MatchMode,
    /// Last successful sample, [`Snapshot::empty`] if none succeeded
    pub last: Snapshot,
    /// Samples taken
    pub attempts: u32,
    /// Samples that failed with a query error
    pub failed_attempts: u32,
    /// Wall-clock time spent
    pub elapsed: Duration,
    /// The configured budget
    pub timeout: Duration,
    /// Text of the most recent query error
    pub last_error: Option<String>,
}

/// Result of one [`run`]. Produced once, never mutated.
#[derive(Debug)]
pub enum Outcome {
    /// The expected state was observed; holds the matching sample
    Converged(Snapshot),
    /// The budget ran out
    TimedOut(Box<TimedOut>),
    /// The request can never converge
    QueryError(QueryError),
}

impl Outcome {
    /// True for [`Outcome::Converged`].
    #[must_use]
    pub fn is_converged(&self) -> bool {
        matches!(self, Outcome::Converged(_))
    }

    /// The converged snapshot, or the last observed one for a timeout.
    #[must_use]
    pub fn snapshot(&self) -> Option<&Snapshot> {
        match self {
            Outcome::Converged(s) => Some(s),
            Outcome::TimedOut(t) => Some(&t.last),
            Outcome::QueryError(_) => None,
        }
    }

    /// Turn a non-converged outcome into an error carrying the full report.
    ///
    /// # Errors
    ///
    /// Returns [`ConvergenceError::TimedOut`] or [`ConvergenceError::Query`].
    pub fn into_result(self) -> Result<Snapshot, ConvergenceError> {
        match self {
            Outcome::Converged(s) => Ok(s),
            Outcome::TimedOut(t) => Err(ConvergenceError::TimedOut(t)),
            Outcome::QueryError(e) => Err(ConvergenceError::Query(e)),
        }
    }

    /// Test assertion: return the converged snapshot or fail with `context` and the
    /// diagnostic report.
    ///
    /// # Panics
    ///
    /// Panics when the outcome is not [`Outcome::Converged`].
    #[track_caller]
    pub fn expect_converged(self, context: &str) -> Snapshot {
        match self.into_result() {
            Ok(s) => s,
            Err(e) => panic!("{context}: {e}"),
        }
    }
}

/// Poll `source` until it matches `expected` under `mode` or `spec.timeout` elapses.
pub async fn run<Q>(
    spec: &PollSpec,
    source: &Q,
    expected: &ConditionSet,
    mode: MatchMode,
) -> Outcome
where
    Q: SnapshotSource + ?Sized,
{
    if let Err(e) = spec.validate() {
        return Outcome::QueryError(e);
    }
    let target = source.describe();
    let available = source.keys();
    if let Some(key) = expected.keys().find(|k| !available.iter().any(|a| a == k)) {
        return Outcome::QueryError(QueryError::UnknownKey {
            key: key.to_string(),
            target,
            available,
        });
    }

    let start = Instant::now();
    let deadline = start + spec.timeout + spec.interval;
    let mut last = Snapshot::empty();
    let mut attempts: u32 = 0;
    let mut failed_attempts: u32 = 0;
    let mut last_error: Option<String> = None;

    debug!(
        resource = %target,
        expected = %expected,
        mode = %mode,
        interval = ?spec.interval,
        timeout = ?spec.timeout,
        "Waiting for convergence"
    );

    loop {
        attempts += 1;
        let budget = deadline.saturating_duration_since(Instant::now());

        match sample(source, budget).await {
            Ok(snapshot) if matches(&snapshot, expected, mode) => {
                let Some(delay) = spec.stable_for else {
                    info!(
                        resource = %target,
                        observed = %snapshot,
                        attempt = attempts,
                        elapsed = ?start.elapsed(),
                        "Resource converged"
                    );
                    return Outcome::Converged(snapshot);
                };

                debug!(resource = %target, delay = ?delay, "Matched, re-checking for stability");
                sleep(delay).await;
                let budget = (deadline + delay).saturating_duration_since(Instant::now());
                match sample(source, budget).await {
                    Ok(again) if matches(&again, expected, mode) => {
                        info!(
                            resource = %target,
                            observed = %again,
                            attempt = attempts,
                            elapsed = ?start.elapsed(),
                            "Resource converged and stayed stable"
                        );
                        return Outcome::Converged(again);
                    }
                    Ok(again) => {
                        debug!(resource = %target, observed = %again, "State flapped during stability window");
                        last = again;
                    }
                    Err(e) => {
                        failed_attempts += 1;
                        warn!(resource = %target, error = %e, "Stability re-check failed, will retry");
                        last_error = Some(e.to_string());
                    }
                }
            }
            Ok(snapshot) => {
                let pending: Vec<String> = mismatches(&snapshot, expected, mode)
                    .into_iter()
                    .map(|m| m.key)
                    .collect();
                debug!(
                    resource = %target,
                    observed = %snapshot,
                    pending = ?pending,
                    attempt = attempts,
                    "Not converged yet"
                );
                last = snapshot;
            }
            Err(e) if e.is_caller_error() => return Outcome::QueryError(e),
            Err(e) => {
                failed_attempts += 1;
                warn!(
                    resource = %target,
                    attempt = attempts,
                    error = %e,
                    "Query failed, treating as not converged"
                );
                last_error = Some(e.to_string());
            }
        }

        let elapsed = start.elapsed();
        if elapsed >= spec.timeout {
            warn!(
                resource = %target,
                expected = %expected,
                observed = %last,
                attempts = attempts,
                elapsed = ?elapsed,
                "Timed out waiting for convergence"
            );
            return Outcome::TimedOut(Box::new(TimedOut {
                target,
                expected: expected.clone(),
                mode,
                last,
                attempts,
                failed_attempts,
                elapsed,
                timeout: spec.timeout,
                last_error,
            }));
        }

        sleep(spec.interval).await;
    }
}

async fn sample<Q>(source: &Q, budget: Duration) -> Result<Snapshot, QueryError>
where
    Q: SnapshotSource + ?Sized,
{
    match timeout(budget, source.query()).await {
        Ok(result) => result,
        Err(_) => Err(QueryError::Deadline(budget)),
    }
}

#[cfg(test)]
#[path = "poll_tests.rs"]
mod poll_tests;
