use std::fs;
use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result};
use serde::Deserialize;

pub const DEFAULT_TIMEOUT_SECS: u64 = 300;
pub const DEFAULT_THRESHOLD_PERCENT: f64 = 5.0;

/// Knobs for a benchmark run. Passed by value into [`crate::runner::Runner`].
#[derive(Debug, Clone, PartialEq)]
pub struct RunnerConfig {
    pub timeout: Duration,
    /// Arguments placed before the benchmark input on every invocation.
    pub extra_args: Vec<String>,
    /// Exit 0 even when some cases failed.
    pub allow_partial: bool,
    /// Poll interval while waiting on the engine process.
    pub poll_interval: Duration,
}

impl Default for RunnerConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            extra_args: Vec::new(),
            allow_partial: false,
            poll_interval: Duration::from_millis(5),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct CompareConfig {
    pub threshold_percent: f64,
    /// Exit non-zero when any row regressed.
    pub fail_on_regression: bool,
}

impl Default for CompareConfig {
    fn default() -> Self {
        Self {
            threshold_percent: DEFAULT_THRESHOLD_PERCENT,
            fail_on_regression: false,
        }
    }
}

/// On-disk configuration (`--config webbench.toml`). Every key is optional;
/// absent or non-positive values keep the defaults.
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(rename_all = "kebab-case")]
pub struct ConfigFile {
    #[serde(default)]
    pub run: RunSection,
    #[serde(default)]
    pub compare: CompareSection,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(rename_all = "kebab-case")]
pub struct RunSection {
    #[serde(default)]
    pub iterations: Option<u32>,
    #[serde(default)]
    pub timeout_secs: Option<f64>,
    #[serde(default)]
    pub args: Option<Vec<String>>,
    #[serde(default)]
    pub allow_partial: Option<bool>,
    #[serde(default)]
    pub suite: Option<String>,
    #[serde(default)]
    pub output: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(rename_all = "kebab-case")]
pub struct CompareSection {
    #[serde(default)]
    pub threshold: Option<f64>,
    #[serde(default)]
    pub fail_on_regression: Option<bool>,
}

impl ConfigFile {
    pub fn load(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path).with_context(|| format!("read config {}", path.display()))?;
        toml::from_str(&text).with_context(|| format!("parse config {}", path.display()))
    }

    pub fn apply_run(&self, cfg: &mut RunnerConfig) {
        if let Some(secs) = self.run.timeout_secs.filter(|v| v.is_finite() && *v > 0.0) {
            cfg.timeout = Duration::from_secs_f64(secs);
        }
        if let Some(args) = &self.run.args {
            cfg.extra_args = args.clone();
        }
        if let Some(allow) = self.run.allow_partial {
            cfg.allow_partial = allow;
        }
    }

    pub fn apply_compare(&self, cfg: &mut CompareConfig) {
        if let Some(t) = self.compare.threshold.filter(|v| v.is_finite() && *v >= 0.0) {
            cfg.threshold_percent = t;
        }
        if let Some(fail) = self.compare.fail_on_regression {
            cfg.fail_on_regression = fail;
        }
    }

    pub fn iterations(&self) -> Option<u32> {
        self.run.iterations.filter(|v| *v > 0)
    }
}
