// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Condition queries: one read of cluster state per call.
//!
//! A [`ConditionQuery`] pairs a [`Target`] with a set of keyed [`FieldPath`]s. Each
//! call resolves the target (a label selector must yield exactly one resource), reads
//! every field and returns a [`Snapshot`] holding exactly the requested keys. A call
//! either returns every field or fails as a whole.
//!
//! # Example
//!
//! ```rust,no_run
//! use clusterwait::client::ResourceRef;
//! use clusterwait::oc::OcClient;
//! use clusterwait::query::{ConditionQuery, SnapshotSource};
//!
//! # async fn example() -> Result<(), clusterwait::errors::QueryError> {
//! let oc = OcClient::default();
//! let query = ConditionQuery::conditions(
//!     &oc,
//!     ResourceRef::cluster("co", "image-registry"),
//!     &["Available", "Progressing", "Degraded"],
//! );
//! let snapshot = query.query().await?;
//! println!("{snapshot}");
//! # Ok(())
//! # }
//! ```

use crate::client::{ClusterClient, ResourceRef, Target};
use crate::condition::{FieldPath, Snapshot};
use crate::errors::{ClientError, QueryError};
use async_trait::async_trait;
use std::collections::BTreeMap;
use tracing::debug;

/// Anything the poll loop can sample.
#[async_trait]
pub trait SnapshotSource: Send + Sync {
    /// Human-readable name of what is sampled, used in logs and reports.
    fn describe(&self) -> String;

    /// Keys every successful snapshot contains.
    fn keys(&self) -> Vec<String>;

    /// Take one snapshot.
    async fn query(&self) -> Result<Snapshot, QueryError>;
}

/// Reads keyed fields of one resource through a [`ClusterClient`].
pub struct ConditionQuery<'c, C: ClusterClient + ?Sized> {
    client: &'c C,
    target: Target,
    fields: BTreeMap<String, FieldPath>,
}

impl<'c, C: ClusterClient + ?Sized> ConditionQuery<'c, C> {
    /// A query with no fields yet.
    pub fn new(client: &'c C, target: impl Into<Target>) -> Self {
        Self {
            client,
            target: target.into(),
            fields: BTreeMap::new(),
        }
    }

    /// One field per condition name, read from `.status.conditions[].status`.
    pub fn conditions(client: &'c C, target: impl Into<Target>, names: &[&str]) -> Self {
        names.iter().fold(Self::new(client, target), |query, name| {
            query.field(*name, FieldPath::condition_status(name))
        })
    }

    /// A single field `key` holding the condition statuses concatenated in order.
    pub fn concatenated(
        client: &'c C,
        target: impl Into<Target>,
        key: &str,
        names: &[&str],
    ) -> Self {
        Self::new(client, target).field(key, FieldPath::concatenated_conditions(names))
    }

    /// Add or replace a field.
    #[must_use]
    pub fn field(mut self, key: impl Into<String>, path: FieldPath) -> Self {
        self.fields.insert(key.into(), path);
        self
    }

    /// The queried target.
    pub fn target(&self) -> &Target {
        &self.target
    }

    async fn resolve(&self) -> Result<ResourceRef, QueryError> {
        let (kind, namespace, selector) = match &self.target {
            Target::Named(resource) => return Ok(resource.clone()),
            Target::Selected {
                kind,
                namespace,
                selector,
            } => (kind, namespace, selector),
        };

        let mut names = self
            .client
            .list_names(kind, namespace.as_deref(), selector)
            .await?;
        match names.len() {
            0 => Err(QueryError::NotFound {
                kind: kind.clone(),
                target: self.target.to_string(),
            }),
            1 => Ok(ResourceRef {
                kind: kind.clone(),
                name: names.remove(0),
                namespace: namespace.clone(),
            }),
            _ => Err(QueryError::Ambiguous {
                kind: kind.clone(),
                selector: selector.clone(),
                matches: names,
            }),
        }
    }
}

#[async_trait]
impl<'c, C: ClusterClient + ?Sized> SnapshotSource for ConditionQuery<'c, C> {
    fn describe(&self) -> String {
        self.target.to_string()
    }

    fn keys(&self) -> Vec<String> {
        self.fields.keys().cloned().collect()
    }

    async fn query(&self) -> Result<Snapshot, QueryError> {
        let resource = self.resolve().await?;

        let mut values = BTreeMap::new();
        for (key, path) in &self.fields {
            let raw = self
                .client
                .get(&resource, path.as_str())
                .await
                .map_err(|e| not_found_or_client(e, &resource))?;
            values.insert(key.clone(), path.normalize(&raw));
        }

        let snapshot = Snapshot::new(values);
        debug!(resource = %resource, snapshot = %snapshot, "Queried resource state");
        Ok(snapshot)
    }
}

fn not_found_or_client(err: ClientError, resource: &ResourceRef) -> QueryError {
    if err.is_not_found() {
        QueryError::NotFound {
            kind: resource.kind.clone(),
            target: resource.to_string(),
        }
    } else {
        QueryError::Client(err)
    }
}

#[cfg(test)]
#[path = "query_tests.rs"]
mod query_tests;
