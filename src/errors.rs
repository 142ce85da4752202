// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Error types for clusterwait.
//!
//! This module provides one error family per failure mode of the engine:
//! - [`ClientError`] - a single call through the cluster client failed
//! - [`QueryError`] - one condition query failed (transient, retried by the poll loop)
//! - [`CreateError`] - creating a scoped test resource failed (fatal, never retried)
//! - [`ReleaseError`] - releasing a scoped test resource failed
//! - [`ConvergenceError`] - a poll did not converge, carrying the full diagnostic
//! - [`ConfigError`] - configuration could not be loaded or is invalid

use crate::jsonpath::JsonPathError;
use crate::poll::TimedOut;
use thiserror::Error;

/// Errors returned by a [`crate::client::ClusterClient`] implementation.
#[derive(Error, Debug)]
pub enum ClientError {
    /// The addressed resource does not exist.
    #[error("{kind} '{name}' not found{}", namespace_suffix(.namespace))]
    NotFound {
        /// Resource kind as passed by the caller
        kind: String,
        /// Resource name
        name: String,
        /// Namespace, `None` for cluster-scoped resources
        namespace: Option<String>,
    },

    /// The CLI exited unsuccessfully.
    #[error("command `{command}` failed: {stderr}")]
    Command {
        /// Rendered command line
        command: String,
        /// Trimmed standard error output
        stderr: String,
    },

    /// The CLI could not be spawned or its pipes failed.
    #[error("failed to run cluster CLI: {0}")]
    Io(#[from] std::io::Error),

    /// The Kubernetes API returned an error.
    #[error("Kubernetes API error: {0}")]
    Kube(#[from] kube::Error),

    /// No usable kubeconfig could be loaded.
    #[error("failed to load kubeconfig: {0}")]
    Kubeconfig(String),

    /// The kind is not served by the API server.
    #[error("kind '{0}' is not served by the cluster")]
    UnknownKind(String),

    /// The manifest handed to `create` is malformed.
    #[error("invalid manifest: {0}")]
    InvalidManifest(String),

    /// The backend cannot apply this kind of patch.
    #[error("patch type '{0}' is not supported by this backend")]
    UnsupportedPatch(&'static str),

    /// The jsonpath expression could not be evaluated.
    #[error(transparent)]
    JsonPath(#[from] JsonPathError),

    /// A payload could not be (de)serialized.
    #[error("serialization failed: {0}")]
    Serde(#[from] serde_json::Error),
}

fn namespace_suffix(namespace: &Option<String>) -> String {
    namespace
        .as_ref()
        .map(|ns| format!(" in namespace '{ns}'"))
        .unwrap_or_default()
}

impl ClientError {
    /// True when the error means the resource is absent.
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        match self {
            ClientError::NotFound { .. } => true,
            ClientError::Kube(kube::Error::Api(resp)) => resp.code == 404,
            _ => false,
        }
    }
}

/// Errors produced by a single condition query.
///
/// Inside the poll loop every variant is treated as "not yet converged". Only the
/// caller-error variants are raised before polling starts.
#[derive(Error, Debug)]
pub enum QueryError {
    /// No resource matched the target.
    #[error("no {kind} matches {target}")]
    NotFound {
        /// Resource kind
        kind: String,
        /// Rendered target
        target: String,
    },

    /// A label selector matched more than one resource.
    #[error("selector '{selector}' matched {} {kind} resources: {}", .matches.len(), .matches.join(", "))]
    Ambiguous {
        /// Resource kind
        kind: String,
        /// Label selector
        selector: String,
        /// Names of every match
        matches: Vec<String>,
    },

    /// The underlying cluster call failed.
    #[error(transparent)]
    Client(#[from] ClientError),

    /// The query did not return before the remaining poll budget ran out.
    #[error("query did not finish within {0:?}")]
    Deadline(std::time::Duration),

    /// An expected key is not extracted by the query.
    #[error("expected key '{key}' is not queried on {target}; queried keys: {}", .available.join(", "))]
    UnknownKey {
        /// The offending key
        key: String,
        /// Rendered target
        target: String,
        /// Keys the query does extract
        available: Vec<String>,
    },

    /// The `PollSpec` violates its invariants.
    #[error("invalid poll spec: {0}")]
    InvalidSpec(String),
}

impl QueryError {
    /// True when this error is a caller error rather than transient cluster state.
    #[must_use]
    pub fn is_caller_error(&self) -> bool {
        matches!(
            self,
            QueryError::UnknownKey { .. } | QueryError::InvalidSpec(_)
        )
    }
}

/// Errors raised while creating or mutating a scoped test resource.
#[derive(Error, Debug)]
pub enum CreateError {
    /// The manifest lacks `kind` or `metadata.name`.
    #[error("invalid manifest: {0}")]
    InvalidManifest(String),

    /// The cluster rejected the request.
    #[error("failed to {what}: {source}")]
    Client {
        /// The rejected action, e.g. `create Namespace/e2e`
        what: String,
        /// Underlying failure
        #[source]
        source: ClientError,
    },

    /// A mutation was attempted on a handle that is not live.
    #[error("resource handle for {0} is not live")]
    NotLive(String),
}

/// Errors raised while releasing a scoped test resource.
#[derive(Error, Debug)]
#[error("failed to release {what}: {source}")]
pub struct ReleaseError {
    /// Rendered release action
    pub what: String,
    /// Underlying failure
    #[source]
    pub source: ClientError,
}

/// A poll that ended without converging.
#[derive(Error, Debug)]
pub enum ConvergenceError {
    /// The timeout elapsed; the message is the full diagnostic report.
    #[error("{0}")]
    TimedOut(Box<TimedOut>),

    /// The caller asked for something that can never converge.
    #[error(transparent)]
    Query(#[from] QueryError),
}

/// Errors raised while loading or validating configuration.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// The configuration file could not be read.
    #[error("failed to read config file {path}: {source}")]
    Read {
        /// File path
        path: String,
        /// Underlying I/O error
        #[source]
        source: std::io::Error,
    },

    /// The configuration file is not valid YAML for [`crate::config::Config`].
    #[error("failed to parse config file {path}: {source}")]
    Parse {
        /// File path
        path: String,
        /// Underlying parse error
        #[source]
        source: serde_yaml::Error,
    },

    /// A value violates an invariant.
    #[error("invalid configuration: {0}")]
    Invalid(String),
}

#[cfg(test)]
#[path = "errors_tests.rs"]
mod errors_tests;
