// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Unit tests for `errors.rs`

#[cfg(test)]
mod tests {
    use super::super::{ClientError, QueryError};
    use kube::core::Status;

    #[test]
    fn test_not_found_display_with_namespace() {
        let err = ClientError::NotFound {
            kind: "deployment".to_string(),
            name: "image-registry".to_string(),
            namespace: Some("openshift-image-registry".to_string()),
        };
        assert_eq!(
            err.to_string(),
            "deployment 'image-registry' not found in namespace 'openshift-image-registry'"
        );
        assert!(err.is_not_found());
    }

    #[test]
    fn test_not_found_display_cluster_scoped() {
        let err = ClientError::NotFound {
            kind: "co".to_string(),
            name: "dns".to_string(),
            namespace: None,
        };
        assert_eq!(err.to_string(), "co 'dns' not found");
    }

    #[test]
    fn test_kube_404_is_not_found() {
        let err = ClientError::Kube(kube::Error::Api(
            Status::failure("secrets \"x\" not found", "NotFound")
                .with_code(404)
                .boxed(),
        ));
        assert!(err.is_not_found());
    }

    #[test]
    fn test_kube_500_is_not_not_found() {
        let err = ClientError::Kube(kube::Error::Api(
            Status::failure("etcdserver: request timed out", "InternalError")
                .with_code(500)
                .boxed(),
        ));
        assert!(!err.is_not_found());
    }

    #[test]
    fn test_command_error_is_not_not_found() {
        let err = ClientError::Command {
            command: "oc get co dns".to_string(),
            stderr: "Unable to connect to the server".to_string(),
        };
        assert!(!err.is_not_found());
        assert!(err.to_string().contains("Unable to connect"));
    }

    #[test]
    fn test_ambiguous_lists_matches() {
        let err = QueryError::Ambiguous {
            kind: "pod".to_string(),
            selector: "app=router".to_string(),
            matches: vec!["router-a".to_string(), "router-b".to_string()],
        };
        let text = err.to_string();
        assert!(text.contains("matched 2 pod resources"));
        assert!(text.contains("router-a, router-b"));
        assert!(!err.is_caller_error());
    }

    #[test]
    fn test_caller_errors() {
        let unknown = QueryError::UnknownKey {
            key: "Upgradeable".to_string(),
            target: "co/dns".to_string(),
            available: vec!["Available".to_string()],
        };
        assert!(unknown.is_caller_error());
        assert!(QueryError::InvalidSpec("interval must be > 0".to_string()).is_caller_error());
    }
}
