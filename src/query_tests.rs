// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Unit tests for `query.rs`

#[cfg(test)]
mod tests {
    use super::super::{ConditionQuery, SnapshotSource};
    use crate::client::{ResourceRef, Target};
    use crate::condition::FieldPath;
    use crate::errors::QueryError;
    use crate::testing::ScriptedCluster;
    use serde_json::json;

    fn operator(name: &str) -> serde_json::Value {
        json!({
            "kind": "ClusterOperator",
            "metadata": { "name": name },
            "status": { "conditions": [
                { "type": "Available", "status": "True" },
                { "type": "Progressing", "status": "False" },
                { "type": "Degraded", "status": "False" }
            ]}
        })
    }

    fn pod(name: &str, app: &str, ready: &str) -> serde_json::Value {
        json!({
            "kind": "Pod",
            "metadata": { "name": name, "namespace": "e2e", "labels": { "app": app } },
            "status": { "conditions": [ { "type": "Ready", "status": ready } ] }
        })
    }

    fn selected(selector: &str) -> Target {
        Target::Selected {
            kind: "pod".to_string(),
            namespace: Some("e2e".to_string()),
            selector: selector.to_string(),
        }
    }

    #[tokio::test]
    async fn test_conditions_query_reads_every_key() {
        let cluster = ScriptedCluster::new();
        cluster.insert(operator("ingress")).unwrap();

        let query = ConditionQuery::conditions(
            &cluster,
            ResourceRef::cluster("co", "ingress"),
            &["Available", "Progressing", "Degraded"],
        );
        let snapshot = query.query().await.unwrap();

        assert_eq!(snapshot.get("Available"), Some("True"));
        assert_eq!(snapshot.get("Progressing"), Some("False"));
        assert_eq!(snapshot.get("Degraded"), Some("False"));
        assert!(snapshot.observed_at().is_some());
    }

    #[tokio::test]
    async fn test_concatenated_query() {
        let cluster = ScriptedCluster::new();
        cluster.insert(operator("ingress")).unwrap();

        let query = ConditionQuery::concatenated(
            &cluster,
            ResourceRef::cluster("co", "ingress"),
            "State",
            &["Available", "Progressing", "Degraded"],
        );
        assert_eq!(query.keys(), vec!["State".to_string()]);

        let snapshot = query.query().await.unwrap();
        assert_eq!(snapshot.get("State"), Some("TrueFalseFalse"));
    }

    #[tokio::test]
    async fn test_absent_condition_reads_as_empty() {
        let cluster = ScriptedCluster::new();
        cluster.insert(operator("ingress")).unwrap();

        let query = ConditionQuery::conditions(
            &cluster,
            ResourceRef::cluster("co", "ingress"),
            &["Upgradeable"],
        );
        let snapshot = query.query().await.unwrap();
        assert_eq!(snapshot.get("Upgradeable"), Some(""));
    }

    #[tokio::test]
    async fn test_field_default_applies_to_empty_reads() {
        let cluster = ScriptedCluster::new();
        cluster
            .insert(json!({
                "kind": "Deployment",
                "metadata": { "name": "web", "namespace": "e2e" },
                "status": { "replicas": 2 }
            }))
            .unwrap();

        let query = ConditionQuery::new(&cluster, ResourceRef::namespaced("deploy", "web", "e2e"))
            .field(
                "replicas",
                FieldPath::parse("{.status.replicas}").unwrap().with_default("0"),
            )
            .field(
                "readyReplicas",
                FieldPath::parse("{.status.readyReplicas}")
                    .unwrap()
                    .with_default("0"),
            );
        let snapshot = query.query().await.unwrap();

        assert_eq!(snapshot.get("replicas"), Some("2"));
        assert_eq!(snapshot.get("readyReplicas"), Some("0"));
    }

    #[tokio::test]
    async fn test_missing_resource_is_not_found() {
        let cluster = ScriptedCluster::new();
        let query = ConditionQuery::conditions(
            &cluster,
            ResourceRef::cluster("co", "absent"),
            &["Available"],
        );

        let err = query.query().await.unwrap_err();
        assert!(matches!(err, QueryError::NotFound { .. }));
        assert!(!err.is_caller_error());
    }

    #[tokio::test]
    async fn test_selector_resolves_single_match() {
        let cluster = ScriptedCluster::new();
        cluster.insert(pod("web-abc", "web", "True")).unwrap();
        cluster.insert(pod("db-xyz", "db", "False")).unwrap();

        let query = ConditionQuery::conditions(&cluster, selected("app=web"), &["Ready"]);
        let snapshot = query.query().await.unwrap();
        assert_eq!(snapshot.get("Ready"), Some("True"));
    }

    #[tokio::test]
    async fn test_selector_without_match_is_not_found() {
        let cluster = ScriptedCluster::new();
        cluster.insert(pod("db-xyz", "db", "False")).unwrap();

        let query = ConditionQuery::conditions(&cluster, selected("app=web"), &["Ready"]);
        assert!(matches!(
            query.query().await.unwrap_err(),
            QueryError::NotFound { .. }
        ));
    }

    #[tokio::test]
    async fn test_selector_with_several_matches_is_ambiguous() {
        let cluster = ScriptedCluster::new();
        cluster.insert(pod("web-old", "web", "True")).unwrap();
        cluster.insert(pod("web-new", "web", "False")).unwrap();

        let query = ConditionQuery::conditions(&cluster, selected("app=web"), &["Ready"]);
        match query.query().await.unwrap_err() {
            QueryError::Ambiguous { matches, .. } => assert_eq!(matches.len(), 2),
            other => panic!("expected Ambiguous, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_failed_read_fails_whole_query() {
        let cluster = ScriptedCluster::new();
        cluster.insert(operator("ingress")).unwrap();
        let query = ConditionQuery::conditions(
            &cluster,
            ResourceRef::cluster("co", "ingress"),
            &["Available", "Degraded"],
        );
        cluster.fail_next_gets(1, "etcdserver: request timed out");

        let err = query.query().await.unwrap_err();
        assert!(matches!(err, QueryError::Client(_)));
        assert!(query.query().await.is_ok());
    }

    #[test]
    fn test_describe_names_target() {
        let cluster = ScriptedCluster::new();
        let query = ConditionQuery::conditions(&cluster, selected("app=web"), &["Ready"]);
        assert_eq!(query.describe(), "pod -l app=web -n e2e");
        assert_eq!(query.target(), &selected("app=web"));
    }
}
