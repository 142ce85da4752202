// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

// Common test utilities for integration tests

#![allow(dead_code)]

use clusterwait::config::Config;
use clusterwait::kube_client::KubeClusterClient;
use serde_json::{json, Value};

/// Get a cluster client or skip the test if no cluster is reachable
pub async fn get_cluster_client_or_skip() -> Option<KubeClusterClient> {
    match KubeClusterClient::from_config(&Config::default()).await {
        Ok(client) => Some(client),
        Err(e) => {
            eprintln!("Skipping integration test: no reachable cluster: {}", e);
            None
        }
    }
}

/// A name unlikely to collide with a previous run
pub fn unique_name(prefix: &str) -> String {
    format!("{}-{}", prefix, chrono::Utc::now().timestamp_millis())
}

/// A ClusterOperator document with the given condition statuses
pub fn cluster_operator(name: &str, available: &str, progressing: &str, degraded: &str) -> Value {
    json!({
        "apiVersion": "config.openshift.io/v1",
        "kind": "ClusterOperator",
        "metadata": { "name": name },
        "status": {
            "conditions": [
                { "type": "Available", "status": available },
                { "type": "Progressing", "status": progressing },
                { "type": "Degraded", "status": degraded }
            ]
        }
    })
}

/// A namespaced ConfigMap document
pub fn config_map(namespace: &str, name: &str) -> Value {
    json!({
        "apiVersion": "v1",
        "kind": "ConfigMap",
        "metadata": { "name": name, "namespace": namespace },
        "data": { "probe": "true" }
    })
}
