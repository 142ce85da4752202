// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! [`ClusterClient`] backed by the `oc` command line tool.
//!
//! Reads use `oc get -o=jsonpath=...`, so the jsonpath dialect is exactly the one
//! `oc` implements. A non-zero exit whose stderr mentions `NotFound` maps to
//! [`ClientError::NotFound`]; anything else becomes [`ClientError::Command`] with the
//! trimmed stderr.
//!
//! Child processes are killed when the calling future is dropped, so a query cut
//! short by the poll deadline does not leave `oc` running.

use crate::client::{ClusterClient, PatchKind, ResourceRef};
use crate::config::Config;
use crate::constants::{DEFAULT_OC_BINARY, OC_NOT_FOUND_MARKER};
use crate::errors::ClientError;
use async_trait::async_trait;
use serde_json::Value;
use std::path::PathBuf;
use std::process::Stdio;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tracing::debug;

/// Impersonated user for admin calls
const ADMIN_USER: &str = "system:admin";

/// Runs `oc` sub-commands.
#[derive(Debug, Clone)]
pub struct OcClient {
    binary: String,
    kubeconfig: Option<PathBuf>,
    as_admin: bool,
}

impl Default for OcClient {
    fn default() -> Self {
        Self::new(DEFAULT_OC_BINARY)
    }
}

impl OcClient {
    /// A client running `binary` with the ambient kubeconfig.
    pub fn new(binary: impl Into<String>) -> Self {
        Self {
            binary: binary.into(),
            kubeconfig: None,
            as_admin: false,
        }
    }

    /// A client configured from [`Config`].
    #[must_use]
    pub fn from_config(config: &Config) -> Self {
        Self {
            binary: config.oc_binary.clone(),
            kubeconfig: config.kubeconfig.clone(),
            as_admin: config.as_admin,
        }
    }

    /// Use an explicit kubeconfig.
    #[must_use]
    pub fn with_kubeconfig(mut self, path: impl Into<PathBuf>) -> Self {
        self.kubeconfig = Some(path.into());
        self
    }

    /// Impersonate `system:admin` on every call.
    #[must_use]
    pub fn as_admin(mut self, as_admin: bool) -> Self {
        self.as_admin = as_admin;
        self
    }

    fn global_args(&self) -> Vec<String> {
        let mut args = Vec::new();
        if let Some(path) = &self.kubeconfig {
            args.push(format!("--kubeconfig={}", path.display()));
        }
        if self.as_admin {
            args.push(format!("--as={ADMIN_USER}"));
        }
        args
    }

    async fn run(&self, args: Vec<String>, stdin: Option<String>) -> Result<String, ClientError> {
        let mut full = self.global_args();
        full.extend(args);
        let rendered = format!("{} {}", self.binary, full.join(" "));
        debug!(command = %rendered, "Running oc");

        let mut child = Command::new(&self.binary)
            .args(&full)
            .stdin(if stdin.is_some() {
                Stdio::piped()
            } else {
                Stdio::null()
            })
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()?;

        if let (Some(input), Some(mut pipe)) = (stdin, child.stdin.take()) {
            pipe.write_all(input.as_bytes()).await?;
            // Closing stdin lets `oc create -f -` see end of input
            drop(pipe);
        }

        let output = child.wait_with_output().await?;
        if output.status.success() {
            Ok(String::from_utf8_lossy(&output.stdout).into_owned())
        } else {
            Err(ClientError::Command {
                command: rendered,
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            })
        }
    }
}

fn scope_args(namespace: Option<&str>) -> Vec<String> {
    namespace
        .map(|ns| vec!["-n".to_string(), ns.to_string()])
        .unwrap_or_default()
}

fn get_args(resource: &ResourceRef, jsonpath: &str) -> Vec<String> {
    let mut args = vec![
        "get".to_string(),
        resource.kind.clone(),
        resource.name.clone(),
    ];
    args.extend(scope_args(resource.namespace.as_deref()));
    args.push(format!("-o=jsonpath={jsonpath}"));
    args
}

fn list_args(kind: &str, namespace: Option<&str>, selector: &str) -> Vec<String> {
    let mut args = vec!["get".to_string(), kind.to_string()];
    args.extend(scope_args(namespace));
    if !selector.is_empty() {
        args.push("-l".to_string());
        args.push(selector.to_string());
    }
    args.push("-o=jsonpath={.items[*].metadata.name}".to_string());
    args
}

fn patch_args(resource: &ResourceRef, patch: &PatchKind) -> Vec<String> {
    let mut args = vec![
        "patch".to_string(),
        resource.kind.clone(),
        resource.name.clone(),
    ];
    args.extend(scope_args(resource.namespace.as_deref()));
    args.push(format!("--type={}", patch.type_name()));
    args.push("-p".to_string());
    args.push(patch.body().to_string());
    args
}

fn delete_args(resource: &ResourceRef) -> Vec<String> {
    let mut args = vec![
        "delete".to_string(),
        resource.kind.clone(),
        resource.name.clone(),
    ];
    args.extend(scope_args(resource.namespace.as_deref()));
    args
}

/// Map a failed command touching `resource` to `NotFound` when `oc` says so.
fn classify(err: ClientError, resource: &ResourceRef) -> ClientError {
    match err {
        ClientError::Command { stderr, .. } if stderr.contains(OC_NOT_FOUND_MARKER) => {
            ClientError::NotFound {
                kind: resource.kind.clone(),
                name: resource.name.clone(),
                namespace: resource.namespace.clone(),
            }
        }
        other => other,
    }
}

#[async_trait]
impl ClusterClient for OcClient {
    async fn get(&self, resource: &ResourceRef, jsonpath: &str) -> Result<String, ClientError> {
        self.run(get_args(resource, jsonpath), None)
            .await
            .map_err(|e| classify(e, resource))
    }

    async fn list_names(
        &self,
        kind: &str,
        namespace: Option<&str>,
        selector: &str,
    ) -> Result<Vec<String>, ClientError> {
        let out = self.run(list_args(kind, namespace, selector), None).await?;
        Ok(out.split_whitespace().map(str::to_string).collect())
    }

    async fn create(&self, manifest: &Value) -> Result<ResourceRef, ClientError> {
        let resource = ResourceRef::from_manifest(manifest)?;
        let body = serde_json::to_string(manifest)?;
        self.run(
            vec!["create".to_string(), "-f".to_string(), "-".to_string()],
            Some(body),
        )
        .await?;
        Ok(resource)
    }

    async fn patch(&self, resource: &ResourceRef, patch: &PatchKind) -> Result<(), ClientError> {
        self.run(patch_args(resource, patch), None)
            .await
            .map(|_| ())
            .map_err(|e| classify(e, resource))
    }

    async fn delete(&self, resource: &ResourceRef) -> Result<(), ClientError> {
        self.run(delete_args(resource), None)
            .await
            .map(|_| ())
            .map_err(|e| classify(e, resource))
    }
}

#[cfg(test)]
#[path = "oc_tests.rs"]
mod oc_tests;
