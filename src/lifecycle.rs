// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Scoped test resources with guaranteed release.
//!
//! End-to-end tests create throwaway objects (namespaces, config maps, deployments)
//! or temporarily patch shared ones, wait for the cluster to react, and must undo the
//! change whatever happens. [`ResourceLifecycle`] creates a [`ResourceHandle`] whose
//! [`ResourceHandle::release`] deletes the object (or applies a revert patch).
//!
//! # State machine
//!
//! ```text
//! create() ok  -> Created -> mutate()* -> release() -> Released
//! create() err -> no handle, nothing to release
//! ```
//!
//! A failed `create` returns no handle at all, so there is never anything to release
//! for it. `release` is idempotent: a second call, or a release that finds the object
//! already gone, is a no-op.
//!
//! # Scoped helpers
//!
//! [`with_resource`] and [`with_patch`] run an async body between acquisition and
//! release and release on every exit path: success, error, and panic. A panic is
//! resumed once the release has run.
//!
//! ```rust,no_run
//! use clusterwait::lifecycle::{namespace_manifest, with_resource};
//! use clusterwait::oc::OcClient;
//!
//! # async fn example() -> anyhow::Result<()> {
//! let oc = OcClient::default();
//! let manifest = namespace_manifest("e2e-probe")?;
//! with_resource(&oc, &manifest, |ns| async move {
//!     println!("working in {ns}");
//!     Ok::<_, anyhow::Error>(())
//! })
//! .await
//! # }
//! ```

use crate::client::{ClusterClient, PatchKind, ResourceRef};
use crate::constants::{MANAGED_BY_LABEL, MANAGED_BY_VALUE};
use crate::errors::{CreateError, ReleaseError};
use futures::FutureExt;
use k8s_openapi::api::core::v1::Namespace;
use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;
use std::future::Future;
use std::panic::{resume_unwind, AssertUnwindSafe};
use tracing::{debug, error, info, warn};

/// Where a [`ResourceHandle`] is in its life.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleState {
    /// Live; release is owed
    Created,
    /// Released; terminal
    Released,
}

impl fmt::Display for LifecycleState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            LifecycleState::Created => "Created",
            LifecycleState::Released => "Released",
        })
    }
}

#[derive(Debug, Clone)]
enum ReleaseAction {
    Delete,
    Revert(PatchKind),
}

/// Creates scoped resources through a [`ClusterClient`].
pub struct ResourceLifecycle<'c, C: ClusterClient + ?Sized> {
    client: &'c C,
}

impl<'c, C: ClusterClient + ?Sized> ResourceLifecycle<'c, C> {
    /// Bind to a client.
    pub fn new(client: &'c C) -> Self {
        Self { client }
    }

    /// Create `manifest`; the handle deletes it on release.
    ///
    /// # Errors
    ///
    /// Returns [`CreateError::InvalidManifest`] for a manifest without kind or name and
    /// [`CreateError::Client`] when the cluster rejects it. Neither is retried.
    pub async fn create(&self, manifest: &Value) -> Result<ResourceHandle<'c, C>, CreateError> {
        let declared = ResourceRef::from_manifest(manifest)
            .map_err(|e| CreateError::InvalidManifest(e.to_string()))?;

        let resource = self
            .client
            .create(manifest)
            .await
            .map_err(|source| CreateError::Client {
                what: format!("create {declared}"),
                source,
            })?;

        info!(resource = %resource, "Created scoped resource");
        Ok(ResourceHandle::new(self.client, resource, ReleaseAction::Delete))
    }

    /// Apply `patch` to an existing resource; the handle applies `revert` on release.
    ///
    /// # Errors
    ///
    /// Returns [`CreateError::Client`] when the patch is rejected. No release is owed.
    pub async fn patch_scoped(
        &self,
        target: &ResourceRef,
        patch: &PatchKind,
        revert: PatchKind,
    ) -> Result<ResourceHandle<'c, C>, CreateError> {
        self.client
            .patch(target, patch)
            .await
            .map_err(|source| CreateError::Client {
                what: format!("patch {target}"),
                source,
            })?;

        info!(resource = %target, patch = %patch.body(), "Applied scoped patch");
        Ok(ResourceHandle::new(
            self.client,
            target.clone(),
            ReleaseAction::Revert(revert),
        ))
    }
}

/// A live scoped resource. Dropping it while still [`LifecycleState::Created`] logs a
/// leak warning; it does not release.
pub struct ResourceHandle<'c, C: ClusterClient + ?Sized> {
    client: &'c C,
    resource: ResourceRef,
    action: ReleaseAction,
    state: LifecycleState,
}

impl<'c, C: ClusterClient + ?Sized> ResourceHandle<'c, C> {
    fn new(client: &'c C, resource: ResourceRef, action: ReleaseAction) -> Self {
        Self {
            client,
            resource,
            action,
            state: LifecycleState::Created,
        }
    }

    /// The managed resource.
    #[must_use]
    pub fn resource(&self) -> &ResourceRef {
        &self.resource
    }

    /// Current state.
    #[must_use]
    pub fn state(&self) -> LifecycleState {
        self.state
    }

    /// Patch the live resource.
    ///
    /// # Errors
    ///
    /// Returns [`CreateError::NotLive`] after release and [`CreateError::Client`] when
    /// the patch is rejected.
    pub async fn mutate(&mut self, patch: &PatchKind) -> Result<(), CreateError> {
        if self.state != LifecycleState::Created {
            return Err(CreateError::NotLive(self.resource.to_string()));
        }
        self.client
            .patch(&self.resource, patch)
            .await
            .map_err(|source| CreateError::Client {
                what: format!("patch {}", self.resource),
                source,
            })?;
        debug!(resource = %self.resource, patch = %patch.body(), "Mutated scoped resource");
        Ok(())
    }

    /// Undo the acquisition. Idempotent; a resource that is already gone counts as
    /// released.
    ///
    /// # Errors
    ///
    /// Returns [`ReleaseError`] when the cluster rejects the delete or revert. The
    /// handle stays [`LifecycleState::Created`] so the release can be retried.
    pub async fn release(&mut self) -> Result<(), ReleaseError> {
        if self.state == LifecycleState::Released {
            debug!(resource = %self.resource, "Already released");
            return Ok(());
        }

        let (what, result) = match &self.action {
            ReleaseAction::Delete => (
                format!("delete {}", self.resource),
                self.client.delete(&self.resource).await,
            ),
            ReleaseAction::Revert(revert) => (
                format!("revert patch on {}", self.resource),
                self.client.patch(&self.resource, revert).await,
            ),
        };

        match result {
            Ok(()) => {
                info!(resource = %self.resource, "Released scoped resource");
            }
            Err(e) if e.is_not_found() => {
                debug!(resource = %self.resource, "Resource already gone, nothing to release");
            }
            Err(source) => return Err(ReleaseError { what, source }),
        }
        self.state = LifecycleState::Released;
        Ok(())
    }
}

impl<C: ClusterClient + ?Sized> Drop for ResourceHandle<'_, C> {
    fn drop(&mut self) {
        if self.state == LifecycleState::Created {
            warn!(
                resource = %self.resource,
                "Scoped resource dropped without release, it is left on the cluster"
            );
        }
    }
}

/// A `Namespace` manifest labelled as managed by this crate.
///
/// # Errors
///
/// Returns [`CreateError::InvalidManifest`] if the object cannot be serialised.
pub fn namespace_manifest(name: &str) -> Result<Value, CreateError> {
    let namespace = Namespace {
        metadata: ObjectMeta {
            name: Some(name.to_string()),
            labels: Some(BTreeMap::from([(
                MANAGED_BY_LABEL.to_string(),
                MANAGED_BY_VALUE.to_string(),
            )])),
            ..Default::default()
        },
        ..Default::default()
    };

    // apiVersion and kind are emitted by the k8s-openapi serializer
    serde_json::to_value(&namespace).map_err(|e| CreateError::InvalidManifest(e.to_string()))
}

/// Create `manifest`, run `body` with its reference, then delete it.
///
/// The release runs after a successful body, a failed body, and a panicking body.
/// A release failure is returned only when the body itself succeeded; otherwise it is
/// logged and the body's error wins.
///
/// # Errors
///
/// Returns the create error, the body's error, or the release error.
pub async fn with_resource<C, T, E, F, Fut>(client: &C, manifest: &Value, body: F) -> Result<T, E>
where
    C: ClusterClient + ?Sized,
    E: From<CreateError> + From<ReleaseError>,
    F: FnOnce(ResourceRef) -> Fut,
    Fut: Future<Output = Result<T, E>>,
{
    let handle = ResourceLifecycle::new(client).create(manifest).await?;
    scoped(handle, body).await
}

/// Patch `target`, run `body`, then apply `revert`.
///
/// Release semantics are those of [`with_resource`].
///
/// # Errors
///
/// Returns the patch error, the body's error, or the revert error.
pub async fn with_patch<C, T, E, F, Fut>(
    client: &C,
    target: &ResourceRef,
    patch: &PatchKind,
    revert: PatchKind,
    body: F,
) -> Result<T, E>
where
    C: ClusterClient + ?Sized,
    E: From<CreateError> + From<ReleaseError>,
    F: FnOnce(ResourceRef) -> Fut,
    Fut: Future<Output = Result<T, E>>,
{
    let handle = ResourceLifecycle::new(client)
        .patch_scoped(target, patch, revert)
        .await?;
    scoped(handle, body).await
}

async fn scoped<C, T, E, F, Fut>(mut handle: ResourceHandle<'_, C>, body: F) -> Result<T, E>
where
    C: ClusterClient + ?Sized,
    E: From<ReleaseError>,
    F: FnOnce(ResourceRef) -> Fut,
    Fut: Future<Output = Result<T, E>>,
{
    let outcome = AssertUnwindSafe(body(handle.resource().clone()))
        .catch_unwind()
        .await;
    let released = handle.release().await;

    match outcome {
        Err(panic) => {
            if let Err(e) = released {
                error!(error = %e, "Release failed while unwinding a panicked scope");
            }
            resume_unwind(panic)
        }
        Ok(Err(e)) => {
            if let Err(release_err) = released {
                warn!(error = %release_err, "Release failed after scope returned an error");
            }
            Err(e)
        }
        Ok(Ok(value)) => {
            released?;
            Ok(value)
        }
    }
}

#[cfg(test)]
#[path = "lifecycle_tests.rs"]
mod lifecycle_tests;
