// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Unit tests for `lifecycle.rs`

#[cfg(test)]
mod tests {
    use super::super::{
        namespace_manifest, with_patch, with_resource, LifecycleState, ResourceLifecycle,
    };
    use crate::client::{ClusterClient, PatchKind, ResourceRef};
    use crate::constants::{MANAGED_BY_LABEL, MANAGED_BY_VALUE};
    use crate::errors::CreateError;
    use crate::testing::ScriptedCluster;
    use futures::FutureExt;
    use serde_json::json;
    use std::panic::AssertUnwindSafe;
    use std::sync::atomic::Ordering;

    fn config_map(name: &str) -> serde_json::Value {
        json!({
            "apiVersion": "v1",
            "kind": "ConfigMap",
            "metadata": { "name": name, "namespace": "e2e" },
            "data": { "mode": "default" }
        })
    }

    fn cm_ref(name: &str) -> ResourceRef {
        ResourceRef::namespaced("ConfigMap", name, "e2e")
    }

    #[test]
    fn test_namespace_manifest_is_labelled() {
        let manifest = namespace_manifest("e2e-probe").unwrap();
        assert_eq!(manifest["apiVersion"], "v1");
        assert_eq!(manifest["kind"], "Namespace");
        assert_eq!(manifest["metadata"]["name"], "e2e-probe");
        assert_eq!(
            manifest["metadata"]["labels"][MANAGED_BY_LABEL],
            MANAGED_BY_VALUE
        );
    }

    #[tokio::test]
    async fn test_create_then_release_deletes() {
        let cluster = ScriptedCluster::new();
        let lifecycle = ResourceLifecycle::new(&cluster);

        let mut handle = lifecycle.create(&config_map("probe")).await.unwrap();
        assert_eq!(handle.state(), LifecycleState::Created);
        assert_eq!(handle.resource(), &cm_ref("probe"));
        assert!(cluster.contains(&cm_ref("probe")));

        handle.release().await.unwrap();
        assert_eq!(handle.state(), LifecycleState::Released);
        assert!(!cluster.contains(&cm_ref("probe")));
    }

    #[tokio::test]
    async fn test_release_is_idempotent() {
        let cluster = ScriptedCluster::new();
        let mut handle = ResourceLifecycle::new(&cluster)
            .create(&config_map("probe"))
            .await
            .unwrap();

        handle.release().await.unwrap();
        handle.release().await.unwrap();
        assert_eq!(cluster.calls.deletes.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_release_of_externally_deleted_resource_succeeds() {
        let cluster = ScriptedCluster::new();
        let mut handle = ResourceLifecycle::new(&cluster)
            .create(&config_map("probe"))
            .await
            .unwrap();
        cluster.delete(&cm_ref("probe")).await.unwrap();

        handle.release().await.unwrap();
        assert_eq!(handle.state(), LifecycleState::Released);
    }

    #[tokio::test]
    async fn test_failed_create_returns_error_and_owes_nothing() {
        let cluster = ScriptedCluster::new();
        cluster.fail_creates("dial tcp 10.0.0.1:6443: connect: connection refused");

        let result = ResourceLifecycle::new(&cluster)
            .create(&config_map("probe"))
            .await;

        match result {
            Err(CreateError::Client { what, source }) => {
                assert_eq!(what, "create ConfigMap/probe -n e2e");
                assert!(source.to_string().contains("connection refused"));
            }
            Err(other) => panic!("expected a client error, got {other:?}"),
            Ok(_) => panic!("create should fail"),
        }
        assert_eq!(cluster.calls.creates.load(Ordering::SeqCst), 1);
        assert_eq!(cluster.calls.deletes.load(Ordering::SeqCst), 0);
        assert_eq!(cluster.get_count(), 0);
    }

    #[tokio::test]
    async fn test_invalid_manifest_is_rejected_locally() {
        let cluster = ScriptedCluster::new();
        let result = ResourceLifecycle::new(&cluster)
            .create(&json!({ "kind": "ConfigMap" }))
            .await;

        assert!(matches!(result, Err(CreateError::InvalidManifest(_))));
        assert_eq!(cluster.calls.creates.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_mutate_live_and_released_handle() {
        let cluster = ScriptedCluster::new();
        let mut handle = ResourceLifecycle::new(&cluster)
            .create(&config_map("probe"))
            .await
            .unwrap();

        let patch = PatchKind::Merge(json!({ "data": { "mode": "strict" } }));
        handle.mutate(&patch).await.unwrap();
        assert_eq!(
            cluster.document(&cm_ref("probe")).unwrap()["data"]["mode"],
            "strict"
        );

        handle.release().await.unwrap();
        assert!(matches!(
            handle.mutate(&patch).await,
            Err(CreateError::NotLive(_))
        ));
    }

    #[tokio::test]
    async fn test_patch_scoped_reverts_on_release() {
        let cluster = ScriptedCluster::new();
        cluster.insert(config_map("shared")).unwrap();

        let mut handle = ResourceLifecycle::new(&cluster)
            .patch_scoped(
                &cm_ref("shared"),
                &PatchKind::Merge(json!({ "data": { "mode": "debug" } })),
                PatchKind::Merge(json!({ "data": { "mode": "default" } })),
            )
            .await
            .unwrap();
        assert_eq!(
            cluster.document(&cm_ref("shared")).unwrap()["data"]["mode"],
            "debug"
        );

        handle.release().await.unwrap();
        let doc = cluster.document(&cm_ref("shared")).unwrap();
        assert_eq!(doc["data"]["mode"], "default");
    }

    #[tokio::test]
    async fn test_patch_scoped_on_missing_target_fails() {
        let cluster = ScriptedCluster::new();
        let result = ResourceLifecycle::new(&cluster)
            .patch_scoped(
                &cm_ref("absent"),
                &PatchKind::Merge(json!({})),
                PatchKind::Merge(json!({})),
            )
            .await;
        assert!(matches!(result, Err(CreateError::Client { .. })));
    }

    // ========================================================================
    // Scoped helpers
    // ========================================================================

    #[tokio::test]
    async fn test_with_resource_releases_after_success() {
        let cluster = ScriptedCluster::new();

        let seen = with_resource(&cluster, &config_map("probe"), |r| {
            let cluster = &cluster;
            async move {
                assert!(cluster.contains(&r));
                Ok::<_, anyhow::Error>(r.name)
            }
        })
        .await
        .unwrap();

        assert_eq!(seen, "probe");
        assert!(!cluster.contains(&cm_ref("probe")));
    }

    #[tokio::test]
    async fn test_with_resource_releases_after_error() {
        let cluster = ScriptedCluster::new();

        let result: anyhow::Result<()> =
            with_resource(&cluster, &config_map("probe"), |_| async {
                anyhow::bail!("assertion in test body failed")
            })
            .await;

        assert!(result.is_err());
        assert!(!cluster.contains(&cm_ref("probe")));
    }

    #[tokio::test]
    async fn test_with_resource_releases_after_panic() {
        let cluster = ScriptedCluster::new();
        let manifest = config_map("probe");

        let scope = with_resource::<_, (), anyhow::Error, _, _>(
            &cluster,
            &manifest,
            |_| async { panic!("test body panicked") },
        );
        let caught = AssertUnwindSafe(scope).catch_unwind().await;

        assert!(caught.is_err());
        assert!(!cluster.contains(&cm_ref("probe")));
        assert_eq!(cluster.calls.deletes.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_with_resource_skips_body_when_create_fails() {
        let cluster = ScriptedCluster::new();
        cluster.fail_creates("quota exceeded");
        let mut ran = false;

        let result = with_resource(&cluster, &config_map("probe"), |_| {
            ran = true;
            async { Ok::<_, anyhow::Error>(()) }
        })
        .await;

        assert!(result.is_err());
        assert!(!ran);
        assert_eq!(cluster.calls.deletes.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_with_patch_reverts_after_error() {
        let cluster = ScriptedCluster::new();
        cluster.insert(config_map("shared")).unwrap();

        let result: anyhow::Result<()> = with_patch(
            &cluster,
            &cm_ref("shared"),
            &PatchKind::Merge(json!({ "data": { "mode": "debug" } })),
            PatchKind::Merge(json!({ "data": { "mode": "default" } })),
            |_| async { anyhow::bail!("operator never became healthy") },
        )
        .await;

        assert!(result.is_err());
        let doc = cluster.document(&cm_ref("shared")).unwrap();
        assert_eq!(doc["data"]["mode"], "default");
    }
}
