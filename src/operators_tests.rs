// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Unit tests for `operators.rs`

#[cfg(test)]
mod tests {
    use super::super::{cluster_operator, list_cluster_operators, wait_co_becomes, wait_cos_healthy};
    use crate::condition::ConditionSet;
    use crate::poll::{Outcome, PollSpec};
    use crate::testing::ScriptedCluster;
    use serde_json::{json, Value};
    use std::time::Duration;
    use tokio::time::Instant;

    fn co(name: &str, available: &str, progressing: &str, degraded: &str) -> Value {
        json!({
            "kind": "ClusterOperator",
            "metadata": { "name": name },
            "status": { "conditions": [
                { "type": "Degraded", "status": degraded },
                { "type": "Progressing", "status": progressing },
                { "type": "Available", "status": available },
                { "type": "Upgradeable", "status": "True" }
            ]}
        })
    }

    #[tokio::test(start_paused = true)]
    async fn test_wait_co_becomes_progressing() {
        let cluster = ScriptedCluster::new();
        cluster.insert(co("kube-apiserver", "True", "False", "False")).unwrap();
        cluster.schedule(
            Duration::from_secs(30),
            &cluster_operator("kube-apiserver"),
            co("kube-apiserver", "True", "True", "False"),
        );

        let expected = ConditionSet::from([("Available", "True"), ("Progressing", "True")]);
        let start = Instant::now();
        let outcome = wait_co_becomes(
            &cluster,
            "kube-apiserver",
            &expected,
            &PollSpec::from_secs(15, 300),
        )
        .await;

        assert!(outcome.is_converged());
        assert_eq!(start.elapsed(), Duration::from_secs(30));
    }

    #[tokio::test(start_paused = true)]
    async fn test_healthy_state_reads_in_fixed_order() {
        // Conditions are listed out of order on the object
        let cluster = ScriptedCluster::new();
        cluster.insert(co("dns", "True", "False", "False")).unwrap();

        let results = wait_cos_healthy(&cluster, &["dns".to_string()], &PollSpec::from_secs(1, 5)).await;

        assert_eq!(results.len(), 1);
        let snapshot = results[0].1.snapshot().unwrap();
        assert_eq!(snapshot.get("State"), Some("TrueFalseFalse"));
        assert!(results[0].1.is_converged());
    }

    #[tokio::test(start_paused = true)]
    async fn test_wait_cos_healthy_runs_concurrently() {
        let cluster = ScriptedCluster::new();
        cluster.insert(co("dns", "True", "True", "False")).unwrap();
        cluster.insert(co("ingress", "False", "True", "False")).unwrap();
        cluster.insert(co("network", "True", "False", "True")).unwrap();
        cluster.schedule(
            Duration::from_secs(2),
            &cluster_operator("dns"),
            co("dns", "True", "False", "False"),
        );
        cluster.schedule(
            Duration::from_secs(4),
            &cluster_operator("ingress"),
            co("ingress", "True", "False", "False"),
        );

        let names = vec!["dns".to_string(), "ingress".to_string(), "network".to_string()];
        let start = Instant::now();
        let results = wait_cos_healthy(&cluster, &names, &PollSpec::from_secs(1, 6)).await;

        assert_eq!(
            results.iter().map(|(n, _)| n.as_str()).collect::<Vec<_>>(),
            vec!["dns", "ingress", "network"]
        );
        assert!(results[0].1.is_converged());
        assert!(results[1].1.is_converged());
        match &results[2].1 {
            Outcome::TimedOut(report) => {
                assert_eq!(report.last.get("State"), Some("TrueFalseTrue"));
            }
            other => panic!("network should time out, got {other:?}"),
        }
        // Bounded by the slowest wait, not the sum
        assert!(start.elapsed() <= Duration::from_secs(7));
    }

    #[tokio::test]
    async fn test_list_cluster_operators() {
        let cluster = ScriptedCluster::new();
        cluster.insert(co("dns", "True", "False", "False")).unwrap();
        cluster.insert(co("etcd", "True", "False", "False")).unwrap();

        let mut names = list_cluster_operators(&cluster).await.unwrap();
        names.sort();
        assert_eq!(names, vec!["dns".to_string(), "etcd".to_string()]);
    }
}
