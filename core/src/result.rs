//! Result file model and persistence.
//!
//! A [`ResultSet`] is written once per run and never mutated afterwards.
//! Loading tolerates unknown fields so older comparators can read newer files.

use std::collections::BTreeMap;
use std::fs;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use tempfile::NamedTempFile;

use crate::error::HarnessError;
use crate::stats::{self, SampleStats};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FailureKind {
    Timeout,
    ProcessFailure,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IterationFailure {
    /// 1-based iteration number.
    pub iteration: u32,
    pub kind: FailureKind,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct BenchmarkResult {
    #[serde(default)]
    pub samples: Vec<f64>,
    #[serde(default)]
    pub aggregate: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stats: Option<SampleStats>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub failure: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub iteration_failures: Vec<IterationFailure>,
}

impl BenchmarkResult {
    /// Build a result from successful samples and per-iteration failures.
    /// With no samples at all the case is failed; the last failure's
    /// message becomes the reason.
    pub fn from_attempts(samples: Vec<f64>, iteration_failures: Vec<IterationFailure>) -> Self {
        if samples.is_empty() {
            let reason = iteration_failures
                .last()
                .map(|f| f.message.clone())
                .unwrap_or_else(|| "no iterations completed".to_string());
            return Self {
                samples,
                aggregate: None,
                stats: None,
                failure: Some(reason),
                iteration_failures,
            };
        }
        Self {
            aggregate: stats::median(&samples),
            stats: SampleStats::from_samples(&samples),
            samples,
            failure: None,
            iteration_failures,
        }
    }

    pub fn failed(reason: impl Into<String>) -> Self {
        Self {
            failure: Some(reason.into()),
            ..Self::default()
        }
    }

    /// A recorded failure, or a file that carries no aggregate at all.
    pub fn is_failed(&self) -> bool {
        self.failure.is_some() || self.aggregate.is_none()
    }

    pub fn usable_aggregate(&self) -> Option<f64> {
        if self.failure.is_some() {
            return None;
        }
        self.aggregate.filter(|v| v.is_finite())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Metadata {
    pub executable: String,
    pub timestamp: String,
    #[serde(default)]
    pub harness_version: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout_secs: Option<f64>,
    #[serde(default)]
    pub interrupted: bool,
}

impl Metadata {
    pub fn new(executable: &Path, timestamp: DateTime<Utc>) -> Self {
        Self {
            executable: executable.display().to_string(),
            timestamp: timestamp.to_rfc3339_opts(SecondsFormat::Secs, true),
            harness_version: env!("CARGO_PKG_VERSION").to_string(),
            timeout_secs: None,
            interrupted: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResultSet {
    pub metadata: Metadata,
    #[serde(default)]
    pub entries: BTreeMap<String, BenchmarkResult>,
}

impl ResultSet {
    pub fn new(metadata: Metadata) -> Self {
        Self {
            metadata,
            entries: BTreeMap::new(),
        }
    }

    pub fn failed_cases(&self) -> impl Iterator<Item = (&String, &BenchmarkResult)> {
        self.entries.iter().filter(|(_, r)| r.is_failed())
    }

    pub fn has_failures(&self) -> bool {
        self.failed_cases().next().is_some()
    }

    pub fn load(path: &Path) -> Result<Self, HarnessError> {
        let data = fs::read(path).map_err(|e| HarnessError::invalid_result_file(path, e.to_string()))?;
        serde_json::from_slice(&data).map_err(|e| HarnessError::invalid_result_file(path, e.to_string()))
    }

    /// Write pretty JSON next to `path` and rename it into place, so a failed
    /// write never leaves a truncated file behind.
    pub fn save(&self, path: &Path) -> Result<(), HarnessError> {
        let dir = parent_dir(path);
        let tmp = NamedTempFile::new_in(&dir).map_err(|e| HarnessError::output_write(path, e.to_string()))?;
        {
            let mut writer = BufWriter::new(tmp.as_file());
            serde_json::to_writer_pretty(&mut writer, self)
                .map_err(|e| HarnessError::output_write(path, e.to_string()))?;
            writer
                .write_all(b"\n")
                .and_then(|_| writer.flush())
                .map_err(|e| HarnessError::output_write(path, e.to_string()))?;
        }
        tmp.persist(path)
            .map_err(|e| HarnessError::output_write(path, e.error.to_string()))?;
        Ok(())
    }
}

fn parent_dir(path: &Path) -> PathBuf {
    match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
        _ => PathBuf::from("."),
    }
}
