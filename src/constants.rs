// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Global constants for clusterwait.
//!
//! This module contains all numeric and string constants used throughout the codebase.
//! Constants are organized by category for easy maintenance. Anything a caller may
//! want to change at runtime is surfaced through [`crate::config::Config`] instead.

// ============================================================================
// Condition Constants
// ============================================================================

/// Condition type reported by cluster operators and deployments when serving
pub const CONDITION_AVAILABLE: &str = "Available";

/// Condition type reported while a rollout is in flight
pub const CONDITION_PROGRESSING: &str = "Progressing";

/// Condition type reported when an operator is unhealthy
pub const CONDITION_DEGRADED: &str = "Degraded";

/// Condition status value for a satisfied condition
pub const STATUS_TRUE: &str = "True";

/// Condition status value for an unsatisfied condition
pub const STATUS_FALSE: &str = "False";

/// Concatenated `Available`/`Progressing`/`Degraded` statuses of a healthy operator
pub const HEALTHY_OPERATOR_STATE: &str = "TrueFalseFalse";

/// Snapshot key used for the concatenated operator state field
pub const KEY_OPERATOR_STATE: &str = "State";

// ============================================================================
// Kind Constants
// ============================================================================

/// Kind name for `ClusterOperator` resources (cluster scoped)
pub const KIND_CLUSTER_OPERATOR: &str = "ClusterOperator";

/// Kind name for `Deployment` resources
pub const KIND_DEPLOYMENT: &str = "Deployment";

/// Kind name for `Node` resources
pub const KIND_NODE: &str = "Node";

/// Kind name for `Namespace` resources
pub const KIND_NAMESPACE: &str = "Namespace";

/// Short names accepted by the CLI and resolved to full kinds by the kube backend.
///
/// The `oc` backend passes kinds through untouched, so both spellings work there.
pub const KIND_ALIASES: &[(&str, &str)] = &[
    ("co", KIND_CLUSTER_OPERATOR),
    ("clusteroperator", KIND_CLUSTER_OPERATOR),
    ("clusteroperators", KIND_CLUSTER_OPERATOR),
    ("deploy", KIND_DEPLOYMENT),
    ("deployment", KIND_DEPLOYMENT),
    ("deployments", KIND_DEPLOYMENT),
    ("no", KIND_NODE),
    ("node", KIND_NODE),
    ("nodes", KIND_NODE),
    ("ns", KIND_NAMESPACE),
    ("namespace", KIND_NAMESPACE),
    ("namespaces", KIND_NAMESPACE),
    ("po", "Pod"),
    ("pod", "Pod"),
    ("pods", "Pod"),
    ("cm", "ConfigMap"),
    ("configmap", "ConfigMap"),
    ("secret", "Secret"),
    ("secrets", "Secret"),
    ("sts", "StatefulSet"),
    ("statefulset", "StatefulSet"),
    ("ds", "DaemonSet"),
    ("daemonset", "DaemonSet"),
    ("cpms", "ControlPlaneMachineSet"),
    ("controlplanemachineset", "ControlPlaneMachineSet"),
    ("machineset", "MachineSet"),
    ("machine", "Machine"),
];

/// Name of the singleton `ControlPlaneMachineSet`
pub const CONTROL_PLANE_MACHINE_SET_NAME: &str = "cluster";

// ============================================================================
// Rollout Constants
// ============================================================================

/// Status counters that must all reach `.spec.replicas` for a workload rollout
pub const WORKLOAD_ROLLOUT_FIELDS: &[&str] = &[
    "replicas",
    "readyReplicas",
    "updatedReplicas",
    "availableReplicas",
];

/// Status counters that must all reach `.spec.replicas` for a machine set rollout
pub const MACHINE_SET_ROLLOUT_FIELDS: &[&str] = &["replicas", "readyReplicas", "updatedReplicas"];

/// Snapshot key holding the desired replica count
pub const KEY_DESIRED_REPLICAS: &str = "desiredReplicas";

// ============================================================================
// Namespace and Label Constants
// ============================================================================

/// Namespace hosting the machine API components
pub const DEFAULT_MACHINE_API_NAMESPACE: &str = "openshift-machine-api";

/// Label selector matching control-plane nodes
pub const MASTER_NODE_SELECTOR: &str = "node-role.kubernetes.io/master";

/// Label selector matching worker nodes
pub const WORKER_NODE_SELECTOR: &str = "node-role.kubernetes.io/worker";

/// Label applied to namespaces created by scoped test resources
pub const MANAGED_BY_LABEL: &str = "app.kubernetes.io/managed-by";

/// Value of [`MANAGED_BY_LABEL`] on namespaces created by this crate
pub const MANAGED_BY_VALUE: &str = "clusterwait";

// ============================================================================
// Polling Constants
// ============================================================================

/// Default interval between two polls (seconds)
pub const DEFAULT_POLL_INTERVAL_SECS: u64 = 15;

/// Default overall poll budget (seconds)
pub const DEFAULT_POLL_TIMEOUT_SECS: u64 = 300;

/// Default delay before re-checking a converged state for stability (seconds)
pub const DEFAULT_STABLE_DELAY_SECS: u64 = 100;

/// Timeout multiplier applied on single-node clusters
pub const DEFAULT_SINGLE_NODE_TIMEOUT_MULTIPLIER: u32 = 3;

// ============================================================================
// CLI Backend Constants
// ============================================================================

/// Default `oc` executable looked up on `PATH`
pub const DEFAULT_OC_BINARY: &str = "oc";

/// Fragment `oc` prints on stderr when a resource does not exist
pub const OC_NOT_FOUND_MARKER: &str = "NotFound";

/// Environment variable selecting the log output format (`text` or `json`)
pub const LOG_FORMAT_ENV: &str = "RUST_LOG_FORMAT";

/// Environment variable pointing at a configuration file
pub const CONFIG_PATH_ENV: &str = "CLUSTERWAIT_CONFIG";
