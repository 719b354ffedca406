//! Benchmark definitions.
//!
//! The built-in suite mirrors the page benchmarks the harness has always
//! shipped with; a manifest file (TOML, YAML or JSON) can replace it when a
//! different set of pages needs to be driven.

use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::error::HarnessError;

pub const DEFAULT_ITERATIONS: u32 = 5;

/// A single named, repeatable workload handed to the engine executable.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BenchmarkCase {
    pub name: String,
    pub input: String,
    pub iterations: u32,
}

impl BenchmarkCase {
    pub fn new(name: impl Into<String>, input: impl Into<String>, iterations: u32) -> Self {
        Self {
            name: name.into(),
            input: input.into(),
            iterations,
        }
    }

    /// URLs are passed through untouched; anything else is a local path.
    pub fn is_url(&self) -> bool {
        self.input.contains("://")
    }

    pub fn local_input(&self) -> Option<&Path> {
        if self.is_url() { None } else { Some(Path::new(&self.input)) }
    }
}

struct BuiltinCase {
    name: &'static str,
    input: &'static str,
}

static BUILTIN_CASES: &[BuiltinCase] = &[
    BuiltinCase {
        name: "Speedometer2",
        input: "benchmarks/Speedometer2/index.html",
    },
    BuiltinCase {
        name: "Speedometer3",
        input: "benchmarks/Speedometer3/index.html",
    },
    BuiltinCase {
        name: "StyleBench",
        input: "benchmarks/StyleBench/index.html",
    },
];

/// Ordered, name-unique collection of benchmark cases.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Suite {
    cases: Vec<BenchmarkCase>,
}

impl Suite {
    pub fn new(cases: Vec<BenchmarkCase>) -> Result<Self, HarnessError> {
        let mut seen = HashSet::new();
        for case in &cases {
            if case.name.trim().is_empty() {
                return Err(HarnessError::invalid_suite("benchmark name must not be empty"));
            }
            if case.input.trim().is_empty() {
                return Err(HarnessError::invalid_suite(format!(
                    "benchmark '{}' has an empty input",
                    case.name
                )));
            }
            if case.iterations == 0 {
                return Err(HarnessError::invalid_suite(format!(
                    "benchmark '{}' must run at least one iteration",
                    case.name
                )));
            }
            if !seen.insert(case.name.as_str()) {
                return Err(HarnessError::invalid_suite(format!(
                    "duplicate benchmark name '{}'",
                    case.name
                )));
            }
        }
        Ok(Self { cases })
    }

    pub fn builtin() -> Self {
        Self {
            cases: BUILTIN_CASES
                .iter()
                .map(|c| BenchmarkCase::new(c.name, c.input, DEFAULT_ITERATIONS))
                .collect(),
        }
    }

    /// Load a manifest; the format follows the file extension.
    pub fn from_manifest(path: &Path) -> Result<Self, HarnessError> {
        let text = fs::read_to_string(path)
            .map_err(|e| HarnessError::invalid_suite(format!("cannot read '{}': {}", path.display(), e)))?;
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_ascii_lowercase())
            .unwrap_or_default();
        let manifest = parse_manifest(&text, &ext)
            .map_err(|e| HarnessError::invalid_suite(format!("cannot parse '{}': {}", path.display(), e)))?;
        let base_dir = path.parent().unwrap_or_else(|| Path::new(""));
        let cases = manifest
            .cases
            .into_iter()
            .map(|entry| {
                let input = resolve_input(base_dir, &entry.input);
                BenchmarkCase::new(entry.name, input, entry.iterations.unwrap_or(DEFAULT_ITERATIONS))
            })
            .collect();
        Self::new(cases)
    }

    pub fn cases(&self) -> &[BenchmarkCase] {
        &self.cases
    }

    pub fn len(&self) -> usize {
        self.cases.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cases.is_empty()
    }

    /// Restrict the suite to a comma-separated selection; `all` keeps
    /// everything. Order follows the suite, not the selection.
    pub fn select(self, selection: &str) -> Result<Self, HarnessError> {
        let trimmed = selection.trim();
        if trimmed.is_empty() || trimmed.eq_ignore_ascii_case("all") {
            return Ok(self);
        }
        let wanted: Vec<&str> = trimmed
            .split(',')
            .map(|s| s.trim())
            .filter(|s| !s.is_empty())
            .collect();
        for name in &wanted {
            if !self.cases.iter().any(|c| c.name == *name) {
                return Err(HarnessError::invalid_suite(format!("Invalid benchmark argument: {}", name)));
            }
        }
        let cases = self
            .cases
            .into_iter()
            .filter(|c| wanted.contains(&c.name.as_str()))
            .collect();
        Ok(Self { cases })
    }

    /// Replace every case's iteration count.
    pub fn with_iterations(mut self, iterations: u32) -> Result<Self, HarnessError> {
        if iterations == 0 {
            return Err(HarnessError::invalid_suite("--iterations must be at least 1"));
        }
        for case in &mut self.cases {
            case.iterations = iterations;
        }
        Ok(self)
    }
}

#[derive(Debug, Deserialize)]
struct Manifest {
    #[serde(rename = "case", alias = "cases", default)]
    cases: Vec<ManifestCase>,
}

#[derive(Debug, Deserialize)]
struct ManifestCase {
    name: String,
    input: String,
    #[serde(default)]
    iterations: Option<u32>,
}

fn parse_manifest(text: &str, ext: &str) -> anyhow::Result<Manifest> {
    let manifest = match ext {
        "toml" => toml::from_str(text)?,
        "yaml" | "yml" => serde_yaml::from_str(text)?,
        "json" => serde_json::from_str(text)?,
        other => anyhow::bail!("unsupported manifest extension '{}' (expected toml, yaml or json)", other),
    };
    Ok(manifest)
}

fn resolve_input(base_dir: &Path, input: &str) -> String {
    if input.contains("://") {
        return input.to_string();
    }
    let path = Path::new(input);
    if path.is_absolute() || base_dir.as_os_str().is_empty() {
        return input.to_string();
    }
    let joined: PathBuf = base_dir.join(path);
    joined.to_string_lossy().into_owned()
}
