#[cfg(test)]
mod tests {
    use std::path::Path;

    use chrono::{TimeZone, Utc};

    use crate::result::{BenchmarkResult, FailureKind, IterationFailure, Metadata, ResultSet};

    fn failure(iteration: u32, message: &str) -> IterationFailure {
        IterationFailure {
            iteration,
            kind: FailureKind::ProcessFailure,
            message: message.to_string(),
        }
    }

    #[test]
    fn test_from_attempts_with_samples() {
        let result = BenchmarkResult::from_attempts(vec![3.0, 1.0, 2.0], vec![failure(4, "boom")]);
        assert_eq!(result.aggregate, Some(2.0));
        assert!(result.failure.is_none());
        assert!(!result.is_failed());
        assert_eq!(result.usable_aggregate(), Some(2.0));
        assert_eq!(result.samples, vec![3.0, 1.0, 2.0]);
    }

    #[test]
    fn test_from_attempts_without_samples_is_failed() {
        let result = BenchmarkResult::from_attempts(Vec::new(), vec![failure(1, "first"), failure(2, "second")]);
        assert_eq!(result.failure.as_deref(), Some("second"));
        assert_eq!(result.aggregate, None);
        assert!(result.stats.is_none());
        assert!(result.is_failed());
        assert_eq!(result.usable_aggregate(), None);
    }

    #[test]
    fn test_metadata_timestamp_is_rfc3339() {
        let ts = Utc.with_ymd_and_hms(2024, 2, 29, 8, 30, 0).unwrap();
        let meta = Metadata::new(Path::new("/opt/ladybird"), ts);
        assert_eq!(meta.timestamp, "2024-02-29T08:30:00Z");
        assert_eq!(meta.executable, "/opt/ladybird");
        assert!(!meta.interrupted);
    }

    #[test]
    fn test_unknown_fields_are_ignored() {
        let json = r#"{
            "metadata": {
                "executable": "/opt/engine",
                "timestamp": "2024-01-01T00:00:00Z",
                "host": "ci-runner-7"
            },
            "entries": {
                "A": { "samples": [1.0, 2.0], "aggregate": 1.5, "score": 99 },
                "B": { "aggregate": null, "failure": "timed out" }
            },
            "schema": 2
        }"#;
        let set: ResultSet = serde_json::from_str(json).expect("forward compatible parse");
        assert_eq!(set.entries.len(), 2);
        assert_eq!(set.entries["A"].aggregate, Some(1.5));
        assert!(set.entries["B"].is_failed());
        assert_eq!(set.metadata.harness_version, "");
    }

    #[test]
    fn test_failed_entries_serialize_null_aggregate() {
        let ts = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let mut set = ResultSet::new(Metadata::new(Path::new("/opt/engine"), ts));
        set.entries
            .insert("A".to_string(), BenchmarkResult::failed("input 'a.html' not found"));
        let value = serde_json::to_value(&set).expect("serialize");
        assert!(value["entries"]["A"]["aggregate"].is_null());
        assert_eq!(value["entries"]["A"]["failure"], "input 'a.html' not found");
        assert!(value["metadata"]["timestamp"].is_string());
        assert!(set.has_failures());
    }

    #[test]
    fn test_save_and_load() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("results.json");
        let ts = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let mut set = ResultSet::new(Metadata::new(Path::new("/opt/engine"), ts));
        set.entries.insert(
            "A".to_string(),
            BenchmarkResult::from_attempts(vec![10.0, 12.0, 14.0], vec![failure(4, "exit 1")]),
        );
        set.save(&path).expect("save");
        let loaded = ResultSet::load(&path).expect("load");
        assert_eq!(loaded, set);
    }

    #[test]
    fn test_save_into_missing_dir_fails() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("missing").join("results.json");
        let ts = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let set = ResultSet::new(Metadata::new(Path::new("/opt/engine"), ts));
        let err = set.save(&path).unwrap_err();
        assert_eq!(err.kind(), "OutputWriteFailure");
        assert!(!path.exists());
    }

    #[test]
    fn test_entry_without_aggregate_counts_as_failed_case() {
        let json = r#"{
            "metadata": { "executable": "/opt/engine", "timestamp": "2024-01-01T00:00:00Z" },
            "entries": {
                "A": { "samples": [1.0], "aggregate": 1.0 },
                "B": { "samples": [] }
            }
        }"#;
        let set: ResultSet = serde_json::from_str(json).expect("parse");
        let failed: Vec<&str> = set.failed_cases().map(|(name, _)| name.as_str()).collect();
        assert_eq!(failed, vec!["B"]);
        assert!(set.has_failures());
    }
}
