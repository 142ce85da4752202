// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Cluster operator waits.
//!
//! Most end-to-end suites start or end by waiting for one or more `ClusterOperator`s
//! to settle. Two shapes are supported:
//!
//! - [`wait_co_becomes`] compares individual condition statuses, e.g.
//!   `{Available: True, Progressing: True}` while a rollout is underway
//! - [`wait_cos_healthy`] reads `Available`, `Progressing` and `Degraded` as one
//!   concatenated `State` value and waits for `TrueFalseFalse` on every named
//!   operator concurrently

use crate::client::{ClusterClient, ResourceRef};
use crate::condition::ConditionSet;
use crate::constants::{
    CONDITION_AVAILABLE, CONDITION_DEGRADED, CONDITION_PROGRESSING, HEALTHY_OPERATOR_STATE,
    KEY_OPERATOR_STATE, KIND_CLUSTER_OPERATOR,
};
use crate::errors::ClientError;
use crate::matcher::MatchMode;
use crate::poll::{run, Outcome, PollSpec};
use crate::query::ConditionQuery;
use futures::future::join_all;
use tracing::info;

/// Reference to the cluster operator `name`.
#[must_use]
pub fn cluster_operator(name: &str) -> ResourceRef {
    ResourceRef::cluster(KIND_CLUSTER_OPERATOR, name)
}

/// Wait until operator `name` reports exactly the condition statuses in `expected`.
pub async fn wait_co_becomes<C>(
    client: &C,
    name: &str,
    expected: &ConditionSet,
    spec: &PollSpec,
) -> Outcome
where
    C: ClusterClient + ?Sized,
{
    let names: Vec<&str> = expected.keys().collect();
    let query = ConditionQuery::conditions(client, cluster_operator(name), &names);
    run(spec, &query, expected, MatchMode::Exact).await
}

/// Wait until every operator in `names` is healthy. The waits run concurrently, each
/// with its own clock; outcomes are returned in input order.
pub async fn wait_cos_healthy<C>(
    client: &C,
    names: &[String],
    spec: &PollSpec,
) -> Vec<(String, Outcome)>
where
    C: ClusterClient + ?Sized,
{
    info!(operators = ?names, "Waiting for cluster operators to become healthy");
    let expected = ConditionSet::new().with(KEY_OPERATOR_STATE, HEALTHY_OPERATOR_STATE);

    let waits = names.iter().map(|name| {
        let expected = &expected;
        async move {
            let query = ConditionQuery::concatenated(
                client,
                cluster_operator(name),
                KEY_OPERATOR_STATE,
                &[CONDITION_AVAILABLE, CONDITION_PROGRESSING, CONDITION_DEGRADED],
            );
            let outcome = run(spec, &query, expected, MatchMode::Substring).await;
            (name.clone(), outcome)
        }
    });
    join_all(waits).await
}

/// Names of every cluster operator.
///
/// # Errors
///
/// Returns [`ClientError`] when the operators cannot be listed.
pub async fn list_cluster_operators<C>(client: &C) -> Result<Vec<String>, ClientError>
where
    C: ClusterClient + ?Sized,
{
    client.list_names(KIND_CLUSTER_OPERATOR, None, "").await
}

#[cfg(test)]
#[path = "operators_tests.rs"]
mod operators_tests;
