// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! [`ClusterClient`] backed by the Kubernetes API through `kube`.
//!
//! Kinds are resolved with API discovery (run once per client and cached), so short
//! names such as `co` work for any resource the server serves, including OpenShift
//! config types. Objects are fetched as [`DynamicObject`]s and jsonpath templates are
//! evaluated locally with [`crate::jsonpath`].
//!
//! JSON patches (`--type=json`) are not supported by this backend; merge patches are.

use crate::client::{canonical_kind, ClusterClient, PatchKind, ResourceRef};
use crate::config::Config;
use crate::errors::ClientError;
use crate::jsonpath::Template;
use async_trait::async_trait;
use kube::api::{Api, DeleteParams, DynamicObject, ListParams, Patch, PatchParams, PostParams};
use kube::config::{KubeConfigOptions, Kubeconfig};
use kube::discovery::{ApiCapabilities, ApiResource, Discovery, Scope};
use kube::Client;
use serde_json::Value;
use tokio::sync::OnceCell;
use tracing::debug;

type ServedResource = (ApiResource, ApiCapabilities);

/// Talks to the API server directly.
pub struct KubeClusterClient {
    client: Client,
    served: OnceCell<Vec<ServedResource>>,
}

impl KubeClusterClient {
    /// Wrap an existing client.
    #[must_use]
    pub fn new(client: Client) -> Self {
        Self {
            client,
            served: OnceCell::new(),
        }
    }

    /// Build a client from the configured kubeconfig, or the ambient one when unset.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::Kubeconfig`] when the kubeconfig cannot be loaded and
    /// [`ClientError::Kube`] when the client cannot be built.
    pub async fn from_config(config: &Config) -> Result<Self, ClientError> {
        let client = match &config.kubeconfig {
            Some(path) => {
                let kubeconfig = Kubeconfig::read_from(path)
                    .map_err(|e| ClientError::Kubeconfig(e.to_string()))?;
                let kube_config =
                    kube::Config::from_custom_kubeconfig(kubeconfig, &KubeConfigOptions::default())
                        .await
                        .map_err(|e| ClientError::Kubeconfig(e.to_string()))?;
                Client::try_from(kube_config)?
            }
            None => Client::try_default().await?,
        };
        Ok(Self::new(client))
    }

    async fn served(&self) -> Result<&[ServedResource], ClientError> {
        let served = self
            .served
            .get_or_try_init(|| async {
                debug!("Running API discovery");
                let discovery = Discovery::new(self.client.clone()).run().await?;
                let resources: Vec<ServedResource> = discovery
                    .groups()
                    .flat_map(|group| group.recommended_resources())
                    .collect();
                debug!(count = resources.len(), "API discovery complete");
                Ok::<_, ClientError>(resources)
            })
            .await?;
        Ok(served.as_slice())
    }

    async fn api(&self, kind: &str, namespace: Option<&str>) -> Result<Api<DynamicObject>, ClientError> {
        let served = self.served().await?;
        let (resource, caps) =
            find_resource(served, kind).ok_or_else(|| ClientError::UnknownKind(kind.to_string()))?;

        Ok(match (&caps.scope, namespace) {
            (Scope::Namespaced, Some(ns)) => Api::namespaced_with(self.client.clone(), ns, resource),
            (Scope::Namespaced, None) => Api::default_namespaced_with(self.client.clone(), resource),
            (Scope::Cluster, _) => Api::all_with(self.client.clone(), resource),
        })
    }
}

/// The served resource whose kind, plural or short alias matches `kind`.
fn find_resource<'a>(served: &'a [ServedResource], kind: &str) -> Option<&'a ServedResource> {
    let wanted = canonical_kind(kind);
    served.iter().find(|(resource, _)| {
        resource.kind.eq_ignore_ascii_case(&wanted) || resource.plural.eq_ignore_ascii_case(&wanted)
    })
}

/// Render `jsonpath` against a fetched object.
fn render(object: &DynamicObject, jsonpath: &str) -> Result<String, ClientError> {
    let template = Template::parse(jsonpath)?;
    let document = serde_json::to_value(object)?;
    Ok(template.render(&document))
}

fn map_kube(err: kube::Error, resource: &ResourceRef) -> ClientError {
    let err = ClientError::from(err);
    if err.is_not_found() {
        ClientError::NotFound {
            kind: resource.kind.clone(),
            name: resource.name.clone(),
            namespace: resource.namespace.clone(),
        }
    } else {
        err
    }
}

#[async_trait]
impl ClusterClient for KubeClusterClient {
    async fn get(&self, resource: &ResourceRef, jsonpath: &str) -> Result<String, ClientError> {
        let api = self.api(&resource.kind, resource.namespace.as_deref()).await?;
        let object = api
            .get(&resource.name)
            .await
            .map_err(|e| map_kube(e, resource))?;
        render(&object, jsonpath)
    }

    async fn list_names(
        &self,
        kind: &str,
        namespace: Option<&str>,
        selector: &str,
    ) -> Result<Vec<String>, ClientError> {
        let api = self.api(kind, namespace).await?;
        let params = if selector.is_empty() {
            ListParams::default()
        } else {
            ListParams::default().labels(selector)
        };
        let list = api.list(&params).await?;
        Ok(list
            .items
            .into_iter()
            .filter_map(|object| object.metadata.name)
            .collect())
    }

    async fn create(&self, manifest: &Value) -> Result<ResourceRef, ClientError> {
        let declared = ResourceRef::from_manifest(manifest)?;
        let api = self.api(&declared.kind, declared.namespace.as_deref()).await?;
        let object: DynamicObject = serde_json::from_value(manifest.clone())?;

        let created = api.create(&PostParams::default(), &object).await?;
        Ok(ResourceRef {
            kind: declared.kind,
            name: created.metadata.name.unwrap_or(declared.name),
            namespace: created.metadata.namespace.or(declared.namespace),
        })
    }

    async fn patch(&self, resource: &ResourceRef, patch: &PatchKind) -> Result<(), ClientError> {
        let body = match patch {
            PatchKind::Merge(body) => body,
            PatchKind::Json(_) => return Err(ClientError::UnsupportedPatch(patch.type_name())),
        };
        let api = self.api(&resource.kind, resource.namespace.as_deref()).await?;
        api.patch(&resource.name, &PatchParams::default(), &Patch::Merge(body))
            .await
            .map_err(|e| map_kube(e, resource))?;
        Ok(())
    }

    async fn delete(&self, resource: &ResourceRef) -> Result<(), ClientError> {
        let api = self.api(&resource.kind, resource.namespace.as_deref()).await?;
        api.delete(&resource.name, &DeleteParams::default())
            .await
            .map_err(|e| map_kube(e, resource))?;
        Ok(())
    }
}

#[cfg(test)]
#[path = "kube_client_tests.rs"]
mod kube_client_tests;
