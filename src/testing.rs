// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! An in-memory [`ClusterClient`] for exercising waits without a cluster.
//!
//! [`ScriptedCluster`] stores resources as JSON documents and renders jsonpath reads
//! with the same evaluator the kube backend uses. State changes are scheduled against
//! the tokio clock, so tests under `#[tokio::test(start_paused = true)]` see them at
//! deterministic poll ticks. Failures can be injected for gets and creates.

use crate::client::{canonical_kind, ClusterClient, PatchKind, ResourceRef};
use crate::errors::ClientError;
use crate::jsonpath::Template;
use async_trait::async_trait;
use serde_json::Value;
use std::collections::{BTreeMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tokio::time::Instant;

type Key = (String, Option<String>, String);

fn key_of(resource: &ResourceRef) -> Key {
    (
        canonical_kind(&resource.kind),
        resource.namespace.clone(),
        resource.name.clone(),
    )
}

struct Scheduled {
    at: Instant,
    resource: ResourceRef,
    document: Option<Value>,
}

#[derive(Default)]
struct State {
    objects: BTreeMap<Key, Value>,
    scheduled: Vec<Scheduled>,
    get_failures: VecDeque<String>,
    create_failure: Option<String>,
}

/// Counters of calls made against a [`ScriptedCluster`].
#[derive(Debug, Default)]
pub struct CallCounts {
    /// `get` calls
    pub gets: AtomicUsize,
    /// `list_names` calls
    pub lists: AtomicUsize,
    /// `create` calls
    pub creates: AtomicUsize,
    /// `patch` calls
    pub patches: AtomicUsize,
    /// `delete` calls
    pub deletes: AtomicUsize,
}

/// A scripted, in-memory cluster.
pub struct ScriptedCluster {
    state: Mutex<State>,
    epoch: Instant,
    /// Call counters, readable from tests
    pub calls: CallCounts,
}

impl Default for ScriptedCluster {
    fn default() -> Self {
        Self::new()
    }
}

impl ScriptedCluster {
    /// An empty cluster whose schedule clock starts now.
    #[must_use]
    pub fn new() -> Self {
        Self {
            state: Mutex::new(State::default()),
            epoch: Instant::now(),
            calls: CallCounts::default(),
        }
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Store a resource document; kind, name and namespace come from the manifest.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::InvalidManifest`] when the document lacks kind or name.
    pub fn insert(&self, document: Value) -> Result<ResourceRef, ClientError> {
        let resource = ResourceRef::from_manifest(&document)?;
        self.lock().objects.insert(key_of(&resource), document);
        Ok(resource)
    }

    /// Replace `resource` with `document` once `after` has elapsed since creation.
    pub fn schedule(&self, after: Duration, resource: &ResourceRef, document: Value) {
        self.lock().scheduled.push(Scheduled {
            at: self.epoch + after,
            resource: resource.clone(),
            document: Some(document),
        });
    }

    /// Remove `resource` once `after` has elapsed since creation.
    pub fn schedule_removal(&self, after: Duration, resource: &ResourceRef) {
        self.lock().scheduled.push(Scheduled {
            at: self.epoch + after,
            resource: resource.clone(),
            document: None,
        });
    }

    /// Make the next `count` gets fail with `message`.
    pub fn fail_next_gets(&self, count: usize, message: &str) {
        let mut state = self.lock();
        for _ in 0..count {
            state.get_failures.push_back(message.to_string());
        }
    }

    /// Make every create fail with `message`.
    pub fn fail_creates(&self, message: &str) {
        self.lock().create_failure = Some(message.to_string());
    }

    /// The stored document, if any.
    #[must_use]
    pub fn document(&self, resource: &ResourceRef) -> Option<Value> {
        self.apply_due();
        self.lock().objects.get(&key_of(resource)).cloned()
    }

    /// True when the resource exists.
    #[must_use]
    pub fn contains(&self, resource: &ResourceRef) -> bool {
        self.document(resource).is_some()
    }

    /// Number of `get` calls so far.
    #[must_use]
    pub fn get_count(&self) -> usize {
        self.calls.gets.load(Ordering::SeqCst)
    }

    fn apply_due(&self) {
        let now = Instant::now();
        let mut state = self.lock();
        let mut due: Vec<Scheduled> = Vec::new();
        let mut pending = Vec::new();
        for item in state.scheduled.drain(..) {
            if item.at <= now {
                due.push(item);
            } else {
                pending.push(item);
            }
        }
        state.scheduled = pending;
        due.sort_by_key(|s| s.at);
        for item in due {
            let key = key_of(&item.resource);
            match item.document {
                Some(doc) => {
                    state.objects.insert(key, doc);
                }
                None => {
                    state.objects.remove(&key);
                }
            }
        }
    }

    fn not_found(resource: &ResourceRef) -> ClientError {
        ClientError::NotFound {
            kind: resource.kind.clone(),
            name: resource.name.clone(),
            namespace: resource.namespace.clone(),
        }
    }
}

fn selector_matches(labels: Option<&Value>, selector: &str) -> bool {
    selector
        .split(',')
        .map(str::trim)
        .filter(|term| !term.is_empty())
        .all(|term| {
            let (key, want, negate) = if let Some((k, v)) = term.split_once("!=") {
                (k.trim(), Some(v.trim()), true)
            } else if let Some((k, v)) = term
                .split_once("==")
                .or_else(|| term.split_once('='))
            {
                (k.trim(), Some(v.trim()), false)
            } else {
                (term, None, false)
            };
            let got = labels.and_then(|l| l.get(key)).and_then(Value::as_str);
            match (want, negate) {
                (None, _) => got.is_some(),
                (Some(v), false) => got == Some(v),
                (Some(v), true) => got != Some(v),
            }
        })
}

fn merge_patch(target: &mut Value, patch: &Value) {
    match patch {
        Value::Object(fields) => {
            if !target.is_object() {
                *target = Value::Object(serde_json::Map::new());
            }
            if let Value::Object(existing) = target {
                for (k, v) in fields {
                    if v.is_null() {
                        existing.remove(k);
                    } else {
                        merge_patch(existing.entry(k.clone()).or_insert(Value::Null), v);
                    }
                }
            }
        }
        other => *target = other.clone(),
    }
}

fn json_patch(target: &mut Value, ops: &Value) -> Result<(), ClientError> {
    let ops = ops
        .as_array()
        .ok_or_else(|| ClientError::InvalidManifest("json patch must be an array".to_string()))?;
    for op in ops {
        let kind = op.get("op").and_then(Value::as_str).unwrap_or_default();
        let path = op.get("path").and_then(Value::as_str).unwrap_or_default();
        let (parent, leaf) = path
            .rsplit_once('/')
            .ok_or_else(|| ClientError::InvalidManifest(format!("bad json patch path '{path}'")))?;
        let container = target
            .pointer_mut(parent)
            .and_then(Value::as_object_mut)
            .ok_or_else(|| ClientError::InvalidManifest(format!("no object at '{parent}'")))?;
        let leaf = leaf.replace("~1", "/").replace("~0", "~");
        match kind {
            "add" | "replace" => {
                let value = op.get("value").cloned().unwrap_or(Value::Null);
                container.insert(leaf, value);
            }
            "remove" => {
                container.remove(&leaf);
            }
            other => {
                return Err(ClientError::InvalidManifest(format!(
                    "unsupported json patch op '{other}'"
                )))
            }
        }
    }
    Ok(())
}

#[async_trait]
impl ClusterClient for ScriptedCluster {
    async fn get(&self, resource: &ResourceRef, jsonpath: &str) -> Result<String, ClientError> {
        self.calls.gets.fetch_add(1, Ordering::SeqCst);
        self.apply_due();
        let template = Template::parse(jsonpath)?;

        let mut state = self.lock();
        if let Some(message) = state.get_failures.pop_front() {
            return Err(ClientError::Command {
                command: format!("get {resource}"),
                stderr: message,
            });
        }
        state
            .objects
            .get(&key_of(resource))
            .map(|doc| template.render(doc))
            .ok_or_else(|| Self::not_found(resource))
    }

    async fn list_names(
        &self,
        kind: &str,
        namespace: Option<&str>,
        selector: &str,
    ) -> Result<Vec<String>, ClientError> {
        self.calls.lists.fetch_add(1, Ordering::SeqCst);
        self.apply_due();
        let kind = canonical_kind(kind);

        let state = self.lock();
        Ok(state
            .objects
            .iter()
            .filter(|((k, ns, _), _)| *k == kind && ns.as_deref() == namespace)
            .filter(|(_, doc)| selector_matches(doc.pointer("/metadata/labels"), selector))
            .map(|((_, _, name), _)| name.clone())
            .collect())
    }

    async fn create(&self, manifest: &Value) -> Result<ResourceRef, ClientError> {
        self.calls.creates.fetch_add(1, Ordering::SeqCst);
        let resource = ResourceRef::from_manifest(manifest)?;

        let mut state = self.lock();
        if let Some(message) = &state.create_failure {
            return Err(ClientError::Command {
                command: format!("create {resource}"),
                stderr: message.clone(),
            });
        }
        let key = key_of(&resource);
        if state.objects.contains_key(&key) {
            return Err(ClientError::Command {
                command: format!("create {resource}"),
                stderr: format!("{resource} AlreadyExists"),
            });
        }
        state.objects.insert(key, manifest.clone());
        Ok(resource)
    }

    async fn patch(&self, resource: &ResourceRef, patch: &PatchKind) -> Result<(), ClientError> {
        self.calls.patches.fetch_add(1, Ordering::SeqCst);
        self.apply_due();

        let mut state = self.lock();
        let doc = state
            .objects
            .get_mut(&key_of(resource))
            .ok_or_else(|| Self::not_found(resource))?;
        match patch {
            PatchKind::Merge(body) => {
                merge_patch(doc, body);
                Ok(())
            }
            PatchKind::Json(ops) => json_patch(doc, ops),
        }
    }

    async fn delete(&self, resource: &ResourceRef) -> Result<(), ClientError> {
        self.calls.deletes.fetch_add(1, Ordering::SeqCst);
        self.apply_due();

        self.lock()
            .objects
            .remove(&key_of(resource))
            .map(|_| ())
            .ok_or_else(|| Self::not_found(resource))
    }
}

#[cfg(test)]
#[path = "testing_tests.rs"]
mod testing_tests;
