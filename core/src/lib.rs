//! Browser engine benchmark harness.
//!
//! The runner drives an engine executable over a suite of pages and writes a
//! [`result::ResultSet`]; the comparator diffs two such files.

pub mod compare;
pub mod config;
pub mod error;
pub mod exec;
pub mod report;
pub mod result;
pub mod runner;
pub mod stats;
pub mod suite;

#[cfg(test)]
mod compare_test;
#[cfg(test)]
mod result_test;

pub use crate::compare::{Classification, Comparator, Comparison, ComparisonRow};
pub use crate::config::{CompareConfig, ConfigFile, RunnerConfig};
pub use crate::error::HarnessError;
pub use crate::exec::{ExecOutcome, Executor, Invocation, ProcessExecutor};
pub use crate::result::{BenchmarkResult, Metadata, ResultSet};
pub use crate::runner::{RunEvent, Runner};
pub use crate::suite::{BenchmarkCase, Suite};
