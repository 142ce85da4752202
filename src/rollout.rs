// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Replica rollout convergence.
//!
//! A rollout is complete once every status counter equals `.spec.replicas`. The wait
//! runs in two phases, each with its own clock:
//!
//! 1. poll until `.spec.replicas` is populated (a freshly created object may not have
//!    been defaulted yet)
//! 2. poll until every status counter equals it; counters Kubernetes omits while zero
//!    read as `"0"`

use crate::client::{ClusterClient, ResourceRef};
use crate::condition::{ConditionSet, FieldPath};
use crate::constants::{CONTROL_PLANE_MACHINE_SET_NAME, KEY_DESIRED_REPLICAS};
use crate::errors::QueryError;
use crate::jsonpath::JsonPathError;
use crate::matcher::MatchMode;
use crate::poll::{run, Outcome, PollSpec};
use crate::query::ConditionQuery;
use tracing::info;

/// The cluster's `ControlPlaneMachineSet` in `namespace`.
#[must_use]
pub fn control_plane_machine_set(namespace: &str) -> ResourceRef {
    ResourceRef::namespaced("controlplanemachineset", CONTROL_PLANE_MACHINE_SET_NAME, namespace)
}

/// Wait until every `.status.<field>` of `target` equals its `.spec.replicas`.
///
/// Returns the outcome of the first phase if it does not converge, otherwise the
/// outcome of the second. An empty `status_fields` is rejected before any read.
pub async fn wait_for_rollout<C>(
    client: &C,
    target: &ResourceRef,
    status_fields: &[&str],
    spec: &PollSpec,
) -> Outcome
where
    C: ClusterClient + ?Sized,
{
    if status_fields.is_empty() {
        return Outcome::QueryError(QueryError::InvalidSpec(format!(
            "no status fields to compare for {target}"
        )));
    }

    let desired_query = match field_path("{.spec.replicas}") {
        Ok(path) => ConditionQuery::new(client, target.clone()).field(KEY_DESIRED_REPLICAS, path),
        Err(outcome) => return outcome,
    };
    let populated = ConditionSet::new().with(KEY_DESIRED_REPLICAS, "");
    let desired = match run(spec, &desired_query, &populated, MatchMode::Differs).await {
        Outcome::Converged(snapshot) => snapshot
            .get(KEY_DESIRED_REPLICAS)
            .map(str::to_string)
            .unwrap_or_default(),
        other => return other,
    };
    info!(resource = %target, desired = %desired, "Waiting for rollout to reach desired replicas");

    let mut status_query = ConditionQuery::new(client, target.clone());
    let mut expected = ConditionSet::new();
    for field in status_fields {
        match field_path(&format!("{{.status.{field}}}")) {
            Ok(path) => status_query = status_query.field(*field, path.with_default("0")),
            Err(outcome) => return outcome,
        }
        expected = expected.with(*field, desired.as_str());
    }

    run(spec, &status_query, &expected, MatchMode::Exact).await
}

fn field_path(template: &str) -> Result<FieldPath, Outcome> {
    FieldPath::parse(template)
        .map_err(|e: JsonPathError| Outcome::QueryError(QueryError::InvalidSpec(e.to_string())))
}

#[cfg(test)]
#[path = "rollout_tests.rs"]
mod rollout_tests;
