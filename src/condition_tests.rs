// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Unit tests for `condition.rs`

#[cfg(test)]
mod tests {
    use super::super::{ConditionSet, FieldPath, Snapshot};
    use crate::jsonpath::Template;
    use serde_json::json;

    #[test]
    fn test_healthy_operator_set() {
        let set = ConditionSet::healthy_operator();
        assert_eq!(set.len(), 3);
        assert_eq!(set.get("Available"), Some("True"));
        assert_eq!(set.get("Progressing"), Some("False"));
        assert_eq!(set.get("Degraded"), Some("False"));
    }

    #[test]
    fn test_with_replaces_existing_key() {
        let set = ConditionSet::new()
            .with("Available", "False")
            .with("Available", "True");
        assert_eq!(set.len(), 1);
        assert_eq!(set.get("Available"), Some("True"));
    }

    #[test]
    fn test_parse_pairs() {
        let set = ConditionSet::parse_pairs(["Available=True", " Degraded = False "]).unwrap();
        assert_eq!(set.get("Available"), Some("True"));
        assert_eq!(set.get("Degraded"), Some("False"));
    }

    #[test]
    fn test_parse_pairs_allows_empty_value() {
        let set = ConditionSet::parse_pairs(["readyReplicas="]).unwrap();
        assert_eq!(set.get("readyReplicas"), Some(""));
    }

    #[test]
    fn test_parse_pairs_rejects_malformed() {
        assert_eq!(
            ConditionSet::parse_pairs(["Available"]).unwrap_err(),
            "Available"
        );
        assert_eq!(ConditionSet::parse_pairs(["=True"]).unwrap_err(), "=True");
    }

    #[test]
    fn test_condition_set_display_is_sorted() {
        let set = ConditionSet::from([("Progressing", "False"), ("Available", "True")]);
        assert_eq!(
            set.to_string(),
            r#"{Available="True", Progressing="False"}"#
        );
    }

    #[test]
    fn test_snapshot_records_observation_time() {
        let snapshot: Snapshot = [("Available", "True")].into_iter().collect();
        assert!(snapshot.observed_at().is_some());
        assert_eq!(snapshot.get("Available"), Some("True"));
        assert!(!snapshot.is_empty());
    }

    #[test]
    fn test_empty_snapshot_display() {
        let snapshot = Snapshot::empty();
        assert!(snapshot.is_empty());
        assert!(snapshot.observed_at().is_none());
        assert_eq!(snapshot.to_string(), "<nothing observed>");
    }

    #[test]
    fn test_field_path_rejects_invalid_template() {
        assert!(FieldPath::parse("{.status.replicas").is_err());
        assert!(FieldPath::parse("{.status.replicas}").is_ok());
    }

    #[test]
    fn test_condition_status_template_text() {
        let field = FieldPath::condition_status("Available");
        assert_eq!(
            field.as_str(),
            r#"{.status.conditions[?(@.type=="Available")].status}"#
        );
    }

    #[test]
    fn test_generated_template_matches_parsed_template() {
        let generated = FieldPath::concatenated_conditions(&["Available", "Progressing", "Degraded"]);
        let reparsed = Template::parse(generated.as_str()).unwrap();
        let doc = json!({
            "status": { "conditions": [
                { "type": "Degraded", "status": "False" },
                { "type": "Available", "status": "True" },
                { "type": "Progressing", "status": "True" }
            ]}
        });

        assert_eq!(generated.template().render(&doc), "TrueTrueFalse");
        assert_eq!(reparsed.render(&doc), "TrueTrueFalse");
    }

    #[test]
    fn test_normalize_trims_and_strips_quotes() {
        let field = FieldPath::parse("{.status.phase}").unwrap();
        assert_eq!(field.normalize("  Running\n"), "Running");
        assert_eq!(field.normalize("'Running'"), "Running");
        assert_eq!(field.normalize("  'Running'\n"), "Running");
    }

    #[test]
    fn test_normalize_keeps_unpaired_quotes() {
        let field = FieldPath::condition_status("Ready");
        assert_eq!(field.normalize("it's"), "it's");
        assert_eq!(field.normalize("'quoted"), "'quoted");
        assert_eq!(field.normalize("quoted'"), "quoted'");
        assert_eq!(field.normalize("'"), "'");
        assert_eq!(field.normalize("''a'"), "'a");
    }

    #[test]
    fn test_normalize_applies_default_only_when_empty() {
        let field = FieldPath::parse("{.status.readyReplicas}")
            .unwrap()
            .with_default("0");
        assert_eq!(field.normalize(""), "0");
        assert_eq!(field.normalize("  "), "0");
        assert_eq!(field.normalize("3"), "3");
    }
}
