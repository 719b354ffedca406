#[cfg(test)]
mod tests {
    use std::path::Path;

    use chrono::{TimeZone, Utc};

    use crate::compare::{Classification, Comparator, classify_delta};
    use crate::config::CompareConfig;
    use crate::result::{BenchmarkResult, Metadata, ResultSet};

    fn result_set(entries: &[(&str, Option<f64>)]) -> ResultSet {
        let ts = Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap();
        let mut set = ResultSet::new(Metadata::new(Path::new("/opt/engine"), ts));
        for (name, aggregate) in entries {
            let result = match aggregate {
                Some(v) => BenchmarkResult::from_attempts(vec![*v], Vec::new()),
                None => BenchmarkResult::failed("exited with exit status: 1"),
            };
            set.entries.insert(name.to_string(), result);
        }
        set
    }

    fn comparator(threshold: f64) -> Comparator {
        Comparator::new(CompareConfig {
            threshold_percent: threshold,
            ..CompareConfig::default()
        })
    }

    #[test]
    fn test_same_file_is_unchanged() {
        let a = result_set(&[("A", Some(100.0)), ("B", Some(3.25)), ("C", Some(0.5))]);
        let cmp = Comparator::default().compare(&a, &a);
        assert_eq!(cmp.rows.len(), 3);
        for row in &cmp.rows {
            assert_eq!(row.classification, Classification::Unchanged);
            assert_eq!(row.delta_percent, Some(0.0));
        }
        assert!(cmp.added.is_empty());
        assert!(cmp.removed.is_empty());
    }

    #[test]
    fn test_regression_scenario() {
        let old = result_set(&[("A", Some(100.0))]);
        let new = result_set(&[("A", Some(120.0))]);
        let cmp = comparator(5.0).compare(&old, &new);
        let row = cmp.row("A").expect("row A");
        assert_eq!(row.classification, Classification::Regressed);
        assert_eq!(row.delta_percent, Some(20.0));
        assert!(cmp.has_regressions());
    }

    #[test]
    fn test_improvement_scenario() {
        let old = result_set(&[("A", Some(200.0))]);
        let new = result_set(&[("A", Some(150.0))]);
        let cmp = comparator(5.0).compare(&old, &new);
        let row = cmp.row("A").expect("row A");
        assert_eq!(row.classification, Classification::Improved);
        assert_eq!(row.delta_percent, Some(-25.0));
        assert!((row.speedup().expect("speedup") - 4.0 / 3.0).abs() < 1e-9);
    }

    #[test]
    fn test_threshold_boundary_is_a_regression() {
        let old = result_set(&[("A", Some(100.0)), ("B", Some(100.0))]);
        let new = result_set(&[("A", Some(105.0)), ("B", Some(95.0))]);
        let cmp = comparator(5.0).compare(&old, &new);
        assert_eq!(cmp.row("A").unwrap().classification, Classification::Regressed);
        assert_eq!(cmp.row("B").unwrap().classification, Classification::Improved);

        assert_eq!(classify_delta(5.0, 5.0), Classification::Regressed);
        assert_eq!(classify_delta(4.999, 5.0), Classification::Unchanged);
        assert_eq!(classify_delta(-5.0, 5.0), Classification::Improved);
        assert_eq!(classify_delta(0.0, 0.0), Classification::Unchanged);
        assert_eq!(classify_delta(0.1, 0.0), Classification::Regressed);
    }

    #[test]
    fn test_added_and_removed_cases() {
        let old = result_set(&[("A", Some(10.0)), ("B", Some(10.0))]);
        let new = result_set(&[("A", Some(11.0)), ("C", Some(10.0))]);
        let cmp = comparator(5.0).compare(&old, &new);
        assert_eq!(cmp.removed, vec!["B".to_string()]);
        assert_eq!(cmp.added, vec!["C".to_string()]);
        assert_eq!(cmp.rows.len(), 1);
        assert_eq!(cmp.rows[0].name, "A");
        assert!(cmp.rows[0].delta_percent.is_some());
    }

    #[test]
    fn test_failures_never_get_a_delta() {
        let old = result_set(&[("A", None), ("B", Some(10.0)), ("C", None), ("D", Some(10.0))]);
        let new = result_set(&[("A", Some(10.0)), ("B", None), ("C", None), ("D", Some(10.0))]);
        let cmp = comparator(5.0).compare(&old, &new);
        let a = cmp.row("A").unwrap();
        assert_eq!(a.classification, Classification::FailedOld);
        assert_eq!(a.delta_percent, None);
        assert_eq!(a.old_aggregate, None);
        assert_eq!(cmp.row("B").unwrap().classification, Classification::FailedNew);
        assert_eq!(cmp.row("C").unwrap().classification, Classification::FailedBoth);
        assert_eq!(cmp.row("D").unwrap().classification, Classification::Unchanged);
        let summary = cmp.summary();
        assert_eq!(summary.failed, 3);
        assert_eq!(summary.unchanged, 1);
    }

    #[test]
    fn test_zero_baseline_has_no_delta() {
        let old = result_set(&[("A", Some(0.0)), ("B", Some(0.0))]);
        let new = result_set(&[("A", Some(0.0)), ("B", Some(3.0))]);
        let cmp = comparator(5.0).compare(&old, &new);
        let a = cmp.row("A").unwrap();
        assert_eq!(a.delta_percent, None);
        assert_eq!(a.classification, Classification::Unchanged);
        let b = cmp.row("B").unwrap();
        assert_eq!(b.delta_percent, None);
        assert_eq!(b.classification, Classification::Regressed);
    }

    #[test]
    fn test_sort_order_is_worst_first_and_stable() {
        let old = result_set(&[
            ("fast", Some(100.0)),
            ("slow", Some(100.0)),
            ("slower", Some(100.0)),
            ("same_a", Some(100.0)),
            ("same_b", Some(100.0)),
            ("broken", None),
            ("gone_bad", Some(100.0)),
        ]);
        let new = result_set(&[
            ("fast", Some(80.0)),
            ("slow", Some(110.0)),
            ("slower", Some(150.0)),
            ("same_a", Some(100.0)),
            ("same_b", Some(100.0)),
            ("broken", Some(100.0)),
            ("gone_bad", None),
        ]);
        let cmp = comparator(5.0).compare(&old, &new);
        let names: Vec<&str> = cmp.rows.iter().map(|r| r.name.as_str()).collect();
        assert_eq!(
            names,
            vec!["slower", "slow", "same_a", "same_b", "fast", "gone_bad", "broken"]
        );

        let again = comparator(5.0).compare(&old, &new);
        assert_eq!(cmp, again);
    }

    #[test]
    fn test_negative_threshold_is_treated_as_magnitude() {
        let old = result_set(&[("A", Some(100.0))]);
        let new = result_set(&[("A", Some(103.0))]);
        let cmp = comparator(-5.0).compare(&old, &new);
        assert_eq!(cmp.threshold_percent, 5.0);
        assert_eq!(cmp.row("A").unwrap().classification, Classification::Unchanged);
    }

    #[test]
    fn test_compare_files_rejects_garbage() {
        let dir = tempfile::tempdir().expect("tempdir");
        let good = dir.path().join("good.json");
        let bad = dir.path().join("bad.json");
        result_set(&[("A", Some(1.0))]).save(&good).expect("save");
        std::fs::write(&bad, "{ not json").expect("write bad file");

        let err = Comparator::default().compare_files(&good, &bad).unwrap_err();
        assert_eq!(err.kind(), "InvalidResultFile");
        assert!(err.to_string().contains("bad.json"));

        let missing = dir.path().join("missing.json");
        let err = Comparator::default().compare_files(&missing, &good).unwrap_err();
        assert_eq!(err.kind(), "InvalidResultFile");

        let cmp = Comparator::default().compare_files(&good, &good).expect("compare");
        assert_eq!(cmp.rows.len(), 1);
    }

    #[test]
    fn test_report_lists_added_removed_and_summary() {
        let old = result_set(&[("A", Some(100.0)), ("B", Some(10.0))]);
        let new = result_set(&[("A", Some(120.0)), ("C", Some(10.0))]);
        let cmp = comparator(5.0).compare(&old, &new);
        let text = crate::report::render_comparison(&cmp);
        assert!(text.contains("+20.00%"), "{}", text);
        assert!(text.contains("regressed"));
        assert!(text.contains("Added: C"));
        assert!(text.contains("Removed: B"));
        assert!(text.contains("1 regressed, 0 improved, 0 unchanged, 0 failed, 1 added, 1 removed"));
    }
}
