use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

/// Errors surfaced by the harness.
///
/// `BenchmarkTimeout` and `BenchmarkProcessFailure` describe a single
/// iteration; the runner records them in the result file instead of
/// propagating them. Every other variant aborts the run.
#[derive(Debug)]
pub enum HarnessError {
    ExecutableNotFound { path: PathBuf, reason: String },
    BenchmarkTimeout { timeout: Duration },
    BenchmarkProcessFailure { status: String, detail: Option<String> },
    InvalidResultFile { path: PathBuf, reason: String },
    OutputWriteFailure { path: PathBuf, reason: String },
    SpawnFailure { program: PathBuf, reason: String },
    InvalidSuite(String),
}

impl HarnessError {
    pub fn executable_not_found<T: Into<String>>(path: impl Into<PathBuf>, reason: T) -> Self {
        HarnessError::ExecutableNotFound {
            path: path.into(),
            reason: reason.into(),
        }
    }

    pub fn invalid_result_file<T: Into<String>>(path: impl Into<PathBuf>, reason: T) -> Self {
        HarnessError::InvalidResultFile {
            path: path.into(),
            reason: reason.into(),
        }
    }

    pub fn output_write<T: Into<String>>(path: impl Into<PathBuf>, reason: T) -> Self {
        HarnessError::OutputWriteFailure {
            path: path.into(),
            reason: reason.into(),
        }
    }

    pub fn invalid_suite<T: Into<String>>(msg: T) -> Self {
        HarnessError::InvalidSuite(msg.into())
    }

    /// Taxonomy name printed in diagnostics, e.g. `ExecutableNotFound`.
    pub fn kind(&self) -> &'static str {
        match self {
            HarnessError::ExecutableNotFound { .. } => "ExecutableNotFound",
            HarnessError::BenchmarkTimeout { .. } => "BenchmarkTimeout",
            HarnessError::BenchmarkProcessFailure { .. } => "BenchmarkProcessFailure",
            HarnessError::InvalidResultFile { .. } => "InvalidResultFile",
            HarnessError::OutputWriteFailure { .. } => "OutputWriteFailure",
            HarnessError::SpawnFailure { .. } => "SpawnFailure",
            HarnessError::InvalidSuite(_) => "InvalidSuite",
        }
    }
}

impl fmt::Display for HarnessError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: ", self.kind())?;
        match self {
            HarnessError::ExecutableNotFound { path, reason } => {
                write!(f, "executable '{}' {}", path.display(), reason)
            }
            HarnessError::BenchmarkTimeout { timeout } => {
                write!(f, "timed out after {:.2}s", timeout.as_secs_f64())
            }
            HarnessError::BenchmarkProcessFailure { status, detail } => match detail {
                Some(detail) => write!(f, "exited with {} ({})", status, detail),
                None => write!(f, "exited with {}", status),
            },
            HarnessError::InvalidResultFile { path, reason } => {
                write!(f, "cannot load '{}': {}", path.display(), reason)
            }
            HarnessError::OutputWriteFailure { path, reason } => {
                write!(f, "cannot write '{}': {}", path.display(), reason)
            }
            HarnessError::SpawnFailure { program, reason } => {
                write!(f, "failed to start '{}': {}", program.display(), reason)
            }
            HarnessError::InvalidSuite(msg) => write!(f, "{}", msg),
        }
    }
}

impl std::error::Error for HarnessError {}
