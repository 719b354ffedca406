//! Process execution seam.
//!
//! The runner never touches `std::process` directly; it goes through
//! [`Executor`] so tests can substitute deterministic timings.

use std::io::{self, Read};
use std::path::PathBuf;
use std::process::{Child, Command, ExitStatus, Stdio};
use std::sync::mpsc::{self, Receiver};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::{Duration, Instant};

use tracing::{debug, warn};

use crate::error::HarnessError;

/// Line prefix an engine may print to report its own timing in milliseconds.
pub const TIMING_PREFIX: &str = "BENCH_TIME_MS=";

/// Minimum time given to the pipe readers to drain after the engine exits.
const DRAIN_GRACE: Duration = Duration::from_millis(250);

#[derive(Debug, Clone, PartialEq)]
pub struct Invocation {
    pub program: PathBuf,
    pub args: Vec<String>,
    pub timeout: Duration,
}

/// What the runner learns from one finished (or killed) invocation.
#[derive(Debug, Clone, PartialEq)]
pub struct ExecOutcome {
    /// `None` when the process was killed by a signal or by the timeout.
    pub exit_code: Option<i32>,
    pub status: String,
    pub duration: Duration,
    pub stdout: String,
    pub stderr: String,
    pub timed_out: bool,
}

impl ExecOutcome {
    pub fn success(&self) -> bool {
        !self.timed_out && self.exit_code == Some(0)
    }

    /// Last engine-reported timing on stdout, if any.
    pub fn reported_ms(&self) -> Option<f64> {
        parse_reported_time(&self.stdout)
    }

    pub fn last_stderr_line(&self) -> Option<&str> {
        self.stderr.lines().rev().map(str::trim).find(|l| !l.is_empty())
    }
}

pub trait Executor {
    /// Run one invocation to completion or timeout. `Err` is reserved for
    /// failures to start the process at all.
    fn execute(&mut self, invocation: &Invocation) -> Result<ExecOutcome, HarnessError>;
}

/// Spawns the real engine process and polls it until exit or timeout.
#[derive(Debug, Clone)]
pub struct ProcessExecutor {
    poll_interval: Duration,
}

impl ProcessExecutor {
    pub fn new(poll_interval: Duration) -> Self {
        Self {
            poll_interval: poll_interval.max(Duration::from_millis(1)),
        }
    }
}

impl Default for ProcessExecutor {
    fn default() -> Self {
        Self::new(Duration::from_millis(5))
    }
}

impl Executor for ProcessExecutor {
    fn execute(&mut self, invocation: &Invocation) -> Result<ExecOutcome, HarnessError> {
        let started = Instant::now();
        let mut child = Command::new(&invocation.program)
            .args(&invocation.args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|err| HarnessError::SpawnFailure {
                program: invocation.program.clone(),
                reason: err.to_string(),
            })?;

        let stdout_reader = child.stdout.take().map(PipeReader::spawn);
        let stderr_reader = child.stderr.take().map(PipeReader::spawn);

        let deadline = started + invocation.timeout;
        let waited = wait_with_timeout(&mut child, deadline, self.poll_interval);
        let duration = started.elapsed();

        match waited {
            Ok(Some(status)) => {
                // Helper processes can inherit the pipes and outlive the engine,
                // so draining is bounded by the iteration deadline too.
                let drain_until = deadline.max(Instant::now() + DRAIN_GRACE);
                let (stdout, stdout_closed) = collect_output(stdout_reader, drain_until);
                let (stderr, stderr_closed) = collect_output(stderr_reader, drain_until);
                if !(stdout_closed && stderr_closed) {
                    warn!(
                        "{} exited but its output pipes are still held open; using output read so far",
                        invocation.program.display()
                    );
                }
                debug!(
                    "{} finished with {} after {:.3}s",
                    invocation.program.display(),
                    status,
                    duration.as_secs_f64()
                );
                Ok(ExecOutcome {
                    exit_code: status.code(),
                    status: status.to_string(),
                    duration,
                    stdout,
                    stderr,
                    timed_out: false,
                })
            }
            Ok(None) => {
                if let Err(err) = child.kill() {
                    warn!("failed to kill timed out process: {}", err);
                }
                let _ = child.wait();
                let now = Instant::now();
                let (stdout, _) = collect_output(stdout_reader, now);
                let (stderr, _) = collect_output(stderr_reader, now);
                Ok(ExecOutcome {
                    exit_code: None,
                    status: "timeout".to_string(),
                    duration,
                    stdout,
                    stderr,
                    timed_out: true,
                })
            }
            Err(err) => {
                let _ = child.kill();
                let _ = child.wait();
                Err(HarnessError::SpawnFailure {
                    program: invocation.program.clone(),
                    reason: format!("wait failed: {}", err),
                })
            }
        }
    }
}

fn wait_with_timeout(child: &mut Child, deadline: Instant, poll: Duration) -> io::Result<Option<ExitStatus>> {
    loop {
        if let Some(status) = child.try_wait()? {
            return Ok(Some(status));
        }
        let now = Instant::now();
        if now >= deadline {
            return Ok(None);
        }
        thread::sleep(poll.min(deadline - now));
    }
}

/// Drains one child pipe on a helper thread. The bytes read so far stay
/// readable while the thread is still blocked on the pipe.
struct PipeReader {
    buf: Arc<Mutex<Vec<u8>>>,
    closed: Receiver<()>,
}

impl PipeReader {
    fn spawn<R: Read + Send + 'static>(mut pipe: R) -> Self {
        let buf = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&buf);
        let (tx, closed) = mpsc::channel();
        thread::spawn(move || {
            let mut chunk = [0u8; 8192];
            loop {
                match pipe.read(&mut chunk) {
                    Ok(0) => break,
                    Ok(n) => match sink.lock() {
                        Ok(mut out) => out.extend_from_slice(&chunk[..n]),
                        Err(_) => break,
                    },
                    Err(err) if err.kind() == io::ErrorKind::Interrupted => continue,
                    Err(_) => break,
                }
            }
            let _ = tx.send(());
        });
        Self { buf, closed }
    }

    /// Wait for EOF until `deadline`, then return what was read and whether
    /// the pipe actually closed.
    fn collect(self, deadline: Instant) -> (String, bool) {
        let wait = deadline.saturating_duration_since(Instant::now());
        let closed = self.closed.recv_timeout(wait).is_ok();
        let bytes = self.buf.lock().map(|out| out.clone()).unwrap_or_default();
        (String::from_utf8_lossy(&bytes).into_owned(), closed)
    }
}

fn collect_output(reader: Option<PipeReader>, deadline: Instant) -> (String, bool) {
    match reader {
        Some(reader) => reader.collect(deadline),
        None => (String::new(), true),
    }
}

/// Extract the last `BENCH_TIME_MS=<float>` value from engine output.
/// Non-finite and negative values are ignored.
pub fn parse_reported_time(stdout: &str) -> Option<f64> {
    stdout
        .lines()
        .rev()
        .filter_map(|line| line.trim().strip_prefix(TIMING_PREFIX))
        .filter_map(|raw| raw.trim().parse::<f64>().ok())
        .find(|v| v.is_finite() && *v >= 0.0)
}
