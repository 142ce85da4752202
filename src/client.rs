// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! The cluster client seam.
//!
//! Everything the engine knows about a live cluster goes through [`ClusterClient`].
//! Its four reads/writes map one-to-one onto the `oc` sub-commands the end-to-end
//! suites shell out to (`get -o=jsonpath=...`, `create -f`, `patch --type=...`,
//! `delete`). Two implementations ship with the crate:
//!
//! - [`crate::oc::OcClient`] - runs the `oc` binary
//! - [`crate::kube_client::KubeClusterClient`] - talks to the API server with `kube`
//!
//! Tests implement the trait with scripted in-memory clusters.

use crate::constants::KIND_ALIASES;
use crate::errors::ClientError;
use async_trait::async_trait;
use serde_json::Value;
use std::fmt;

/// Lower-cased full kind name for a kind or short name (`co` -> `clusteroperator`).
#[must_use]
pub fn canonical_kind(kind: &str) -> String {
    let lower = kind.to_ascii_lowercase();
    KIND_ALIASES
        .iter()
        .find(|(alias, _)| *alias == lower)
        .map_or(lower.clone(), |(_, full)| full.to_ascii_lowercase())
}

/// A single named resource.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ResourceRef {
    /// Resource kind or short name (`co`, `deployment`, `Secret`, ...)
    pub kind: String,
    /// Resource name
    pub name: String,
    /// Namespace, `None` for cluster-scoped resources
    pub namespace: Option<String>,
}

impl ResourceRef {
    /// A cluster-scoped resource.
    pub fn cluster(kind: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            name: name.into(),
            namespace: None,
        }
    }

    /// A namespaced resource.
    pub fn namespaced(
        kind: impl Into<String>,
        name: impl Into<String>,
        namespace: impl Into<String>,
    ) -> Self {
        Self {
            kind: kind.into(),
            name: name.into(),
            namespace: Some(namespace.into()),
        }
    }

    /// Build a reference from a manifest's `kind`, `metadata.name` and `metadata.namespace`.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::InvalidManifest`] when `kind` or `metadata.name` is missing.
    pub fn from_manifest(manifest: &Value) -> Result<Self, ClientError> {
        let kind = manifest
            .get("kind")
            .and_then(Value::as_str)
            .ok_or_else(|| ClientError::InvalidManifest("missing 'kind'".to_string()))?;
        let metadata = manifest.get("metadata");
        let name = metadata
            .and_then(|m| m.get("name"))
            .and_then(Value::as_str)
            .ok_or_else(|| ClientError::InvalidManifest("missing 'metadata.name'".to_string()))?;
        let namespace = metadata
            .and_then(|m| m.get("namespace"))
            .and_then(Value::as_str)
            .map(str::to_string);

        Ok(Self {
            kind: kind.to_string(),
            name: name.to_string(),
            namespace,
        })
    }
}

impl fmt::Display for ResourceRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.namespace {
            Some(ns) => write!(f, "{}/{} -n {}", self.kind, self.name, ns),
            None => write!(f, "{}/{}", self.kind, self.name),
        }
    }
}

/// What a condition query reads from: one named resource, or a label selector that
/// must resolve to exactly one resource.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Target {
    /// A named resource
    Named(ResourceRef),
    /// A label selector; zero or several matches fail the query
    Selected {
        /// Resource kind
        kind: String,
        /// Namespace, `None` for cluster-scoped kinds
        namespace: Option<String>,
        /// Label selector in `kubectl -l` syntax
        selector: String,
    },
}

impl Target {
    /// The kind being queried.
    #[must_use]
    pub fn kind(&self) -> &str {
        match self {
            Target::Named(r) => &r.kind,
            Target::Selected { kind, .. } => kind,
        }
    }
}

impl From<ResourceRef> for Target {
    fn from(r: ResourceRef) -> Self {
        Target::Named(r)
    }
}

impl fmt::Display for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Target::Named(r) => r.fmt(f),
            Target::Selected {
                kind,
                namespace: Some(ns),
                selector,
            } => write!(f, "{kind} -l {selector} -n {ns}"),
            Target::Selected {
                kind,
                namespace: None,
                selector,
            } => write!(f, "{kind} -l {selector}"),
        }
    }
}

/// Patch flavours, mirroring `oc patch --type=...`.
#[derive(Debug, Clone, PartialEq)]
pub enum PatchKind {
    /// JSON merge patch (`--type=merge`)
    Merge(Value),
    /// JSON patch operations array (`--type=json`)
    Json(Value),
}

impl PatchKind {
    /// The `--type` value for this patch.
    #[must_use]
    pub fn type_name(&self) -> &'static str {
        match self {
            PatchKind::Merge(_) => "merge",
            PatchKind::Json(_) => "json",
        }
    }

    /// The patch body.
    #[must_use]
    pub fn body(&self) -> &Value {
        match self {
            PatchKind::Merge(v) | PatchKind::Json(v) => v,
        }
    }
}

/// Synchronous-RPC view of the cluster used by queries and resource lifecycles.
///
/// Implementations must be cheap to share across concurrent polls; all methods take
/// `&self`.
#[async_trait]
pub trait ClusterClient: Send + Sync {
    /// Read one resource through a jsonpath template.
    ///
    /// Fields absent on the resource render as the empty string; only a missing
    /// resource is an error ([`ClientError::NotFound`]).
    async fn get(&self, resource: &ResourceRef, jsonpath: &str) -> Result<String, ClientError>;

    /// Names of all resources of `kind` matching `selector`.
    async fn list_names(
        &self,
        kind: &str,
        namespace: Option<&str>,
        selector: &str,
    ) -> Result<Vec<String>, ClientError>;

    /// Create a resource from a manifest and return its reference.
    async fn create(&self, manifest: &Value) -> Result<ResourceRef, ClientError>;

    /// Patch a resource.
    async fn patch(&self, resource: &ResourceRef, patch: &PatchKind) -> Result<(), ClientError>;

    /// Delete a resource. A missing resource yields [`ClientError::NotFound`].
    async fn delete(&self, resource: &ResourceRef) -> Result<(), ClientError>;
}

#[cfg(test)]
#[path = "client_tests.rs"]
mod client_tests;
