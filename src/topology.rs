// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Cluster topology probes.
//!
//! Single-node clusters restart their only API server during many operator rollouts,
//! so waits that take minutes on a highly available cluster take several times longer
//! there. [`effective_spec`] stretches a poll budget accordingly.

use crate::client::ClusterClient;
use crate::constants::{KIND_NODE, MASTER_NODE_SELECTOR, WORKER_NODE_SELECTOR};
use crate::errors::ClientError;
use crate::poll::PollSpec;
use tracing::{debug, info, warn};

/// True when the cluster has exactly one master and one worker node and they are the
/// same node.
///
/// # Errors
///
/// Returns [`ClientError`] when the nodes cannot be listed.
pub async fn is_single_node<C>(client: &C) -> Result<bool, ClientError>
where
    C: ClusterClient + ?Sized,
{
    let masters = client
        .list_names(KIND_NODE, None, MASTER_NODE_SELECTOR)
        .await?;
    let workers = client
        .list_names(KIND_NODE, None, WORKER_NODE_SELECTOR)
        .await?;
    debug!(masters = ?masters, workers = ?workers, "Listed cluster nodes");

    Ok(matches!(
        (masters.as_slice(), workers.as_slice()),
        ([master], [worker]) if master == worker
    ))
}

/// `spec` with its timeout multiplied by `multiplier` on a single-node cluster.
///
/// A topology probe that fails leaves the spec unscaled; the failure is logged.
pub async fn effective_spec<C>(client: &C, spec: PollSpec, multiplier: u32) -> PollSpec
where
    C: ClusterClient + ?Sized,
{
    if multiplier <= 1 {
        return spec;
    }
    match is_single_node(client).await {
        Ok(true) => {
            let scaled = spec.scaled(multiplier);
            info!(
                multiplier = multiplier,
                timeout = ?scaled.timeout,
                "Single-node cluster detected, extending poll timeout"
            );
            scaled
        }
        Ok(false) => spec,
        Err(e) => {
            warn!(error = %e, "Could not determine cluster topology, keeping poll timeout");
            spec
        }
    }
}

#[cfg(test)]
#[path = "topology_tests.rs"]
mod topology_tests;
