// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Unit tests for `testing.rs`

#[cfg(test)]
mod tests {
    use super::super::ScriptedCluster;
    use crate::client::{ClusterClient, PatchKind, ResourceRef};
    use serde_json::json;
    use std::time::Duration;

    fn operator(name: &str, available: &str) -> serde_json::Value {
        json!({
            "apiVersion": "config.openshift.io/v1",
            "kind": "ClusterOperator",
            "metadata": { "name": name },
            "status": { "conditions": [
                { "type": "Available", "status": available },
                { "type": "Degraded", "status": "False" }
            ]}
        })
    }

    #[tokio::test]
    async fn test_get_renders_jsonpath() {
        let cluster = ScriptedCluster::new();
        let co = cluster.insert(operator("dns", "True")).unwrap();

        let out = cluster
            .get(&co, "{.status.conditions[?(@.type==\"Available\")].status}")
            .await
            .unwrap();
        assert_eq!(out, "True");
        assert_eq!(cluster.get_count(), 1);
    }

    #[tokio::test]
    async fn test_short_kind_addresses_same_object() {
        let cluster = ScriptedCluster::new();
        cluster.insert(operator("dns", "True")).unwrap();

        let out = cluster
            .get(&ResourceRef::cluster("co", "dns"), "{.metadata.name}")
            .await
            .unwrap();
        assert_eq!(out, "dns");
    }

    #[tokio::test]
    async fn test_get_missing_is_not_found() {
        let cluster = ScriptedCluster::new();
        let err = cluster
            .get(&ResourceRef::cluster("co", "missing"), "{.metadata.name}")
            .await
            .unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn test_injected_get_failures_are_consumed_in_order() {
        let cluster = ScriptedCluster::new();
        let co = cluster.insert(operator("dns", "True")).unwrap();
        cluster.fail_next_gets(1, "connection refused");

        let err = cluster.get(&co, "{.metadata.name}").await.unwrap_err();
        assert!(err.to_string().contains("connection refused"));
        assert!(!err.is_not_found());
        assert_eq!(cluster.get(&co, "{.metadata.name}").await.unwrap(), "dns");
    }

    #[tokio::test(start_paused = true)]
    async fn test_scheduled_change_applies_after_delay() {
        let cluster = ScriptedCluster::new();
        let co = cluster.insert(operator("dns", "False")).unwrap();
        cluster.schedule(Duration::from_secs(3), &co, operator("dns", "True"));
        let path = "{.status.conditions[?(@.type==\"Available\")].status}";

        tokio::time::sleep(Duration::from_secs(2)).await;
        assert_eq!(cluster.get(&co, path).await.unwrap(), "False");

        tokio::time::sleep(Duration::from_secs(1)).await;
        assert_eq!(cluster.get(&co, path).await.unwrap(), "True");
    }

    #[tokio::test(start_paused = true)]
    async fn test_scheduled_removal() {
        let cluster = ScriptedCluster::new();
        let co = cluster.insert(operator("dns", "True")).unwrap();
        cluster.schedule_removal(Duration::from_secs(1), &co);

        assert!(cluster.contains(&co));
        tokio::time::sleep(Duration::from_secs(1)).await;
        assert!(!cluster.contains(&co));
    }

    #[tokio::test]
    async fn test_list_names_filters_by_selector_and_namespace() {
        let cluster = ScriptedCluster::new();
        for (name, ns, app) in [
            ("web-1", "shop", "web"),
            ("web-2", "other", "web"),
            ("db-1", "shop", "db"),
        ] {
            cluster
                .insert(json!({
                    "kind": "Pod",
                    "metadata": { "name": name, "namespace": ns, "labels": { "app": app } }
                }))
                .unwrap();
        }

        let names = cluster.list_names("po", Some("shop"), "app=web").await.unwrap();
        assert_eq!(names, vec!["web-1".to_string()]);

        let names = cluster.list_names("Pod", Some("shop"), "app!=web").await.unwrap();
        assert_eq!(names, vec!["db-1".to_string()]);

        let names = cluster.list_names("pods", Some("shop"), "app").await.unwrap();
        assert_eq!(names.len(), 2);
    }

    #[tokio::test]
    async fn test_create_rejects_duplicates() {
        let cluster = ScriptedCluster::new();
        let manifest = json!({ "kind": "Namespace", "metadata": { "name": "e2e" } });

        let created = cluster.create(&manifest).await.unwrap();
        assert_eq!(created, ResourceRef::cluster("Namespace", "e2e"));

        let err = cluster.create(&manifest).await.unwrap_err();
        assert!(err.to_string().contains("AlreadyExists"));
    }

    #[tokio::test]
    async fn test_fail_creates() {
        let cluster = ScriptedCluster::new();
        cluster.fail_creates("admission webhook denied the request");

        let manifest = json!({ "kind": "Namespace", "metadata": { "name": "e2e" } });
        assert!(cluster.create(&manifest).await.is_err());
        assert!(!cluster.contains(&ResourceRef::cluster("Namespace", "e2e")));
    }

    #[tokio::test]
    async fn test_merge_patch_sets_and_removes_fields() {
        let cluster = ScriptedCluster::new();
        let cm = cluster
            .insert(json!({
                "kind": "ConfigMap",
                "metadata": { "name": "cfg", "namespace": "e2e" },
                "data": { "a": "1", "b": "2" }
            }))
            .unwrap();

        cluster
            .patch(&cm, &PatchKind::Merge(json!({ "data": { "a": "9", "b": null } })))
            .await
            .unwrap();

        let doc = cluster.document(&cm).unwrap();
        assert_eq!(doc["data"], json!({ "a": "9" }));
    }

    #[tokio::test]
    async fn test_json_patch_replace_and_remove() {
        let cluster = ScriptedCluster::new();
        let deploy = cluster
            .insert(json!({
                "kind": "Deployment",
                "metadata": { "name": "web", "namespace": "e2e" },
                "spec": { "replicas": 1, "paused": true }
            }))
            .unwrap();

        cluster
            .patch(
                &deploy,
                &PatchKind::Json(json!([
                    { "op": "replace", "path": "/spec/replicas", "value": 3 },
                    { "op": "remove", "path": "/spec/paused" }
                ])),
            )
            .await
            .unwrap();

        let doc = cluster.document(&deploy).unwrap();
        assert_eq!(doc["spec"], json!({ "replicas": 3 }));
    }

    #[tokio::test]
    async fn test_delete_missing_is_not_found() {
        let cluster = ScriptedCluster::new();
        let err = cluster
            .delete(&ResourceRef::cluster("Namespace", "gone"))
            .await
            .unwrap_err();
        assert!(err.is_not_found());
    }
}
