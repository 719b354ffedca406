use std::fs;
use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use chrono::Utc;
use tracing::{debug, info, warn};

use crate::config::RunnerConfig;
use crate::error::HarnessError;
use crate::exec::{ExecOutcome, Executor, Invocation};
use crate::result::{BenchmarkResult, FailureKind, IterationFailure, Metadata, ResultSet};
use crate::suite::{BenchmarkCase, Suite};

/// Progress notifications emitted while a run is in flight.
#[derive(Debug, Clone, PartialEq)]
pub enum RunEvent<'a> {
    CaseStarted { case: &'a BenchmarkCase },
    IterationCompleted { case: &'a str, iteration: u32, sample_ms: f64 },
    IterationFailed { case: &'a str, failure: &'a IterationFailure },
    CaseFinished { case: &'a str, result: &'a BenchmarkResult },
    Interrupted,
}

type Observer<'a> = Box<dyn FnMut(&RunEvent<'_>) + 'a>;

/// Drives the engine executable over a suite, one iteration at a time.
pub struct Runner<'a, E: Executor> {
    config: RunnerConfig,
    executor: E,
    cancel: Arc<AtomicBool>,
    observer: Option<Observer<'a>>,
}

impl<'a, E: Executor> Runner<'a, E> {
    pub fn new(config: RunnerConfig, executor: E) -> Self {
        Self {
            config,
            executor,
            cancel: Arc::new(AtomicBool::new(false)),
            observer: None,
        }
    }

    /// Share a flag that stops the run between iterations once set.
    pub fn with_cancel_flag(mut self, cancel: Arc<AtomicBool>) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn with_observer(mut self, observer: impl FnMut(&RunEvent<'_>) + 'a) -> Self {
        self.observer = Some(Box::new(observer));
        self
    }

    /// The executable must be an existing, executable regular file.
    pub fn validate_executable(path: &Path) -> Result<(), HarnessError> {
        let meta = fs::metadata(path).map_err(|_| HarnessError::executable_not_found(path, "not found"))?;
        if !meta.is_file() {
            return Err(HarnessError::executable_not_found(path, "is not a regular file"));
        }
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            if meta.permissions().mode() & 0o111 == 0 {
                return Err(HarnessError::executable_not_found(path, "is not executable"));
            }
        }
        Ok(())
    }

    /// Run every case and return the collected results without writing them.
    pub fn run(&mut self, executable: &Path, suite: &Suite) -> Result<ResultSet, HarnessError> {
        Self::validate_executable(executable)?;

        let mut metadata = Metadata::new(executable, Utc::now());
        metadata.timeout_secs = Some(self.config.timeout.as_secs_f64());
        let mut results = ResultSet::new(metadata);

        for case in suite.cases() {
            if self.cancelled() {
                break;
            }
            self.emit(&RunEvent::CaseStarted { case });
            info!("running {} ({} iterations)", case.name, case.iterations);

            let result = match self.run_case(executable, case)? {
                Some(result) => result,
                None => break,
            };
            self.emit(&RunEvent::CaseFinished {
                case: &case.name,
                result: &result,
            });
            results.entries.insert(case.name.clone(), result);
        }

        if self.cancelled() {
            warn!("run interrupted after {} of {} cases", results.entries.len(), suite.len());
            results.metadata.interrupted = true;
            self.emit(&RunEvent::Interrupted);
        }
        Ok(results)
    }

    /// Run the suite and atomically write the result file.
    pub fn run_to_file(&mut self, executable: &Path, suite: &Suite, output: &Path) -> Result<ResultSet, HarnessError> {
        Self::validate_executable(executable)?;
        check_output_dir(output)?;
        let results = self.run(executable, suite)?;
        results.save(output)?;
        info!("wrote {} entries to {}", results.entries.len(), output.display());
        Ok(results)
    }

    /// `Ok(None)` when cancelled before any attempt was made for this case.
    fn run_case(&mut self, executable: &Path, case: &BenchmarkCase) -> Result<Option<BenchmarkResult>, HarnessError> {
        if let Some(input) = case.local_input()
            && !input.exists()
        {
            warn!("benchmark '{}' input {} not found", case.name, input.display());
            return Ok(Some(BenchmarkResult::failed(format!(
                "input '{}' not found",
                input.display()
            ))));
        }

        let mut args = self.config.extra_args.clone();
        args.push(case.input.clone());
        let invocation = Invocation {
            program: executable.to_path_buf(),
            args,
            timeout: self.config.timeout,
        };

        let mut samples = Vec::with_capacity(case.iterations as usize);
        let mut failures = Vec::new();
        for iteration in 1..=case.iterations {
            if self.cancelled() {
                break;
            }
            let outcome = self.executor.execute(&invocation)?;
            match classify(&outcome, iteration, invocation.timeout) {
                Ok(sample_ms) => {
                    debug!("{} iteration {}: {:.3}ms", case.name, iteration, sample_ms);
                    self.emit(&RunEvent::IterationCompleted {
                        case: &case.name,
                        iteration,
                        sample_ms,
                    });
                    samples.push(sample_ms);
                }
                Err(failure) => {
                    warn!("{} iteration {} failed: {}", case.name, iteration, failure.message);
                    self.emit(&RunEvent::IterationFailed {
                        case: &case.name,
                        failure: &failure,
                    });
                    failures.push(failure);
                }
            }
        }

        if samples.is_empty() && failures.is_empty() {
            return Ok(None);
        }
        Ok(Some(BenchmarkResult::from_attempts(samples, failures)))
    }

    fn cancelled(&self) -> bool {
        self.cancel.load(Ordering::SeqCst)
    }

    fn emit(&mut self, event: &RunEvent<'_>) {
        if let Some(observer) = self.observer.as_mut() {
            observer(event);
        }
    }
}

/// Turn one outcome into a sample in milliseconds or a recorded failure.
fn classify(outcome: &ExecOutcome, iteration: u32, timeout: Duration) -> Result<f64, IterationFailure> {
    if outcome.timed_out {
        let err = HarnessError::BenchmarkTimeout { timeout };
        return Err(IterationFailure {
            iteration,
            kind: FailureKind::Timeout,
            message: err.to_string(),
        });
    }
    if outcome.exit_code != Some(0) {
        let err = HarnessError::BenchmarkProcessFailure {
            status: outcome.status.clone(),
            detail: outcome.last_stderr_line().map(str::to_string),
        };
        return Err(IterationFailure {
            iteration,
            kind: FailureKind::ProcessFailure,
            message: err.to_string(),
        });
    }
    Ok(outcome
        .reported_ms()
        .unwrap_or_else(|| outcome.duration.as_secs_f64() * 1000.0))
}

fn check_output_dir(output: &Path) -> Result<(), HarnessError> {
    if output.is_dir() {
        return Err(HarnessError::output_write(output, "is a directory"));
    }
    match output.parent() {
        Some(dir) if !dir.as_os_str().is_empty() && !dir.is_dir() => Err(HarnessError::output_write(
            output,
            format!("directory '{}' does not exist", dir.display()),
        )),
        _ => Ok(()),
    }
}
