//! Old-vs-new comparison of two result sets.

use std::cmp::Ordering;
use std::fmt;
use std::path::Path;

use serde::Serialize;
use tracing::debug;

use crate::config::CompareConfig;
use crate::error::HarnessError;
use crate::result::{BenchmarkResult, ResultSet};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum Classification {
    Regressed,
    Improved,
    Unchanged,
    FailedNew,
    FailedOld,
    FailedBoth,
}

impl Classification {
    pub fn as_str(self) -> &'static str {
        match self {
            Classification::Regressed => "regressed",
            Classification::Improved => "improved",
            Classification::Unchanged => "unchanged",
            Classification::FailedNew => "failed-new",
            Classification::FailedOld => "failed-old",
            Classification::FailedBoth => "failed-both",
        }
    }

    pub fn is_failure(self) -> bool {
        matches!(
            self,
            Classification::FailedNew | Classification::FailedOld | Classification::FailedBoth
        )
    }

    fn rank(self) -> u8 {
        match self {
            Classification::Regressed => 0,
            Classification::Improved => 1,
            Classification::Unchanged => 2,
            Classification::FailedNew => 3,
            Classification::FailedOld => 4,
            Classification::FailedBoth => 5,
        }
    }
}

impl fmt::Display for Classification {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ComparisonRow {
    pub name: String,
    pub old_aggregate: Option<f64>,
    pub new_aggregate: Option<f64>,
    pub delta_percent: Option<f64>,
    pub classification: Classification,
}

impl ComparisonRow {
    /// `old / new`; above 1.0 means the new build is faster.
    pub fn speedup(&self) -> Option<f64> {
        match (self.old_aggregate, self.new_aggregate) {
            (Some(old), Some(new)) if new > 0.0 => Some(old / new),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Summary {
    pub regressed: usize,
    pub improved: usize,
    pub unchanged: usize,
    pub failed: usize,
    pub added: usize,
    pub removed: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Comparison {
    pub threshold_percent: f64,
    pub rows: Vec<ComparisonRow>,
    /// Present only in the new result set.
    pub added: Vec<String>,
    /// Present only in the old result set.
    pub removed: Vec<String>,
}

impl Comparison {
    pub fn row(&self, name: &str) -> Option<&ComparisonRow> {
        self.rows.iter().find(|r| r.name == name)
    }

    pub fn has_regressions(&self) -> bool {
        self.rows.iter().any(|r| r.classification == Classification::Regressed)
    }

    pub fn summary(&self) -> Summary {
        let mut summary = Summary {
            added: self.added.len(),
            removed: self.removed.len(),
            ..Summary::default()
        };
        for row in &self.rows {
            match row.classification {
                Classification::Regressed => summary.regressed += 1,
                Classification::Improved => summary.improved += 1,
                Classification::Unchanged => summary.unchanged += 1,
                _ => summary.failed += 1,
            }
        }
        summary
    }
}

#[derive(Debug, Clone, Default)]
pub struct Comparator {
    config: CompareConfig,
}

impl Comparator {
    pub fn new(config: CompareConfig) -> Self {
        Self { config }
    }

    pub fn compare_files(&self, old: &Path, new: &Path) -> Result<Comparison, HarnessError> {
        let old = ResultSet::load(old)?;
        let new = ResultSet::load(new)?;
        Ok(self.compare(&old, &new))
    }

    pub fn compare(&self, old: &ResultSet, new: &ResultSet) -> Comparison {
        let threshold = self.config.threshold_percent.abs();
        let mut rows = Vec::new();
        let mut removed = Vec::new();

        for (name, old_result) in &old.entries {
            match new.entries.get(name) {
                Some(new_result) => rows.push(compare_entry(name, old_result, new_result, threshold)),
                None => removed.push(name.clone()),
            }
        }
        let added: Vec<String> = new
            .entries
            .keys()
            .filter(|name| !old.entries.contains_key(*name))
            .cloned()
            .collect();

        rows.sort_by(row_order);
        debug!(
            "compared {} rows ({} added, {} removed) at {}%",
            rows.len(),
            added.len(),
            removed.len(),
            threshold
        );
        Comparison {
            threshold_percent: threshold,
            rows,
            added,
            removed,
        }
    }
}

/// Classify a relative change. The threshold itself counts as a change, so a
/// delta of exactly `threshold` is a regression.
pub fn classify_delta(delta_percent: f64, threshold: f64) -> Classification {
    if delta_percent == 0.0 {
        Classification::Unchanged
    } else if delta_percent >= threshold {
        Classification::Regressed
    } else if delta_percent <= -threshold {
        Classification::Improved
    } else {
        Classification::Unchanged
    }
}

fn compare_entry(name: &str, old: &BenchmarkResult, new: &BenchmarkResult, threshold: f64) -> ComparisonRow {
    let old_value = old.usable_aggregate();
    let new_value = new.usable_aggregate();
    let (delta_percent, classification) = match (old_value, new_value) {
        (None, None) => (None, Classification::FailedBoth),
        (None, Some(_)) => (None, Classification::FailedOld),
        (Some(_), None) => (None, Classification::FailedNew),
        (Some(o), Some(n)) if o == 0.0 => {
            let class = if n == 0.0 {
                Classification::Unchanged
            } else {
                Classification::Regressed
            };
            (None, class)
        }
        (Some(o), Some(n)) => {
            let delta = (n - o) / o * 100.0;
            (Some(delta), classify_delta(delta, threshold))
        }
    };
    ComparisonRow {
        name: name.to_string(),
        old_aggregate: old_value,
        new_aggregate: new_value,
        delta_percent,
        classification,
    }
}

/// Numeric rows first, worst delta first; the rest by classification.
/// Names break every tie so the order is reproducible.
fn row_order(a: &ComparisonRow, b: &ComparisonRow) -> Ordering {
    match (a.delta_percent, b.delta_percent) {
        (Some(da), Some(db)) => db.total_cmp(&da).then_with(|| a.name.cmp(&b.name)),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => a
            .classification
            .rank()
            .cmp(&b.classification.rank())
            .then_with(|| a.name.cmp(&b.name)),
    }
}
