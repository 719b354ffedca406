use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Once};
use std::time::Duration;

use anyhow::Context;
use clap::{Args, Parser, Subcommand};
use webbench_core::{
    CompareConfig, ConfigFile, ProcessExecutor, RunEvent, Runner, RunnerConfig, Suite,
    compare::Comparator,
    report::{render_comparison, render_run_summary},
    result::ResultSet,
};


static TRACE_INIT: Once = Once::new();
const DEFAULT_TRACE_FILTER: &str = "webbench_core=debug,webbench=info";

/// Everything ran and nothing failed (or the failure policy allowed it).
const EXIT_OK: i32 = 0;
/// Nothing could be run or compared; no output was written.
const EXIT_FATAL: i32 = 1;
/// The run finished but some benchmarks failed, or a regression was found
/// with `--fail-on-regression`.
const EXIT_FAILURES: i32 = 2;

#[derive(Debug, Parser)]
#[command(
    name = "webbench",
    author,
    version,
    about = "Browser engine benchmark harness",
    long_about = None,
    after_help = "Ctrl-C during `run` stops after the current iteration and writes partial results; \
a second Ctrl-C aborts without writing.\n\
Set WEBBENCH_TRACE=1 (or a tracing filter) for diagnostic logs on stderr."
)]
struct CliArgs {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Run the benchmark suite against an engine executable.
    Run(RunArgs),
    /// Compare two result files and report regressions.
    Compare(CompareArgs),
}

#[derive(Debug, Args)]
struct RunArgs {
    /// Path to the engine executable
    #[arg(long, value_name = "PATH")]
    executable: PathBuf,
    /// Result file to write
    #[arg(long, short = 'o', value_name = "PATH")]
    output: Option<PathBuf>,
    /// Iterations per benchmark (overrides the suite)
    #[arg(long, value_name = "N", value_parser = clap::value_parser!(u32).range(1..))]
    iterations: Option<u32>,
    /// Per-iteration timeout in seconds
    #[arg(long, value_name = "SECONDS", value_parser = parse_positive_secs)]
    timeout: Option<f64>,
    /// Benchmarks to run (comma-separated, or `all`)
    #[arg(long, default_value = "all")]
    benchmarks: String,
    /// Suite manifest (TOML, YAML or JSON) replacing the built-in suite
    #[arg(long, value_name = "FILE")]
    suite: Option<PathBuf>,
    /// Extra argument passed to the engine before the benchmark input (repeatable)
    #[arg(long = "arg", value_name = "ARG", allow_hyphen_values = true)]
    engine_args: Vec<String>,
    /// Exit 0 even if some benchmarks failed
    #[arg(long)]
    allow_partial: bool,
    /// Configuration file with [run] / [compare] sections
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,
}

#[derive(Debug, Args)]
struct CompareArgs {
    /// Old (baseline) result file
    #[arg(short = 'o', long = "old", value_name = "FILE")]
    old: PathBuf,
    /// New result file
    #[arg(short = 'n', long = "new", value_name = "FILE")]
    new: PathBuf,
    /// Relative change (percent) at which a benchmark counts as changed
    #[arg(long, value_name = "PERCENT", value_parser = parse_threshold)]
    threshold: Option<f64>,
    /// Exit non-zero when any benchmark regressed
    #[arg(long)]
    fail_on_regression: bool,
    /// Configuration file with [run] / [compare] sections
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,
}

fn parse_positive_secs(raw: &str) -> Result<f64, String> {
    let value: f64 = raw.trim().parse().map_err(|_| format!("'{}' is not a number", raw))?;
    if value.is_finite() && value > 0.0 {
        Ok(value)
    } else {
        Err("timeout must be a positive number of seconds".to_string())
    }
}

fn parse_threshold(raw: &str) -> Result<f64, String> {
    let value: f64 = raw
        .trim()
        .trim_end_matches('%')
        .parse()
        .map_err(|_| format!("'{}' is not a number", raw))?;
    if value.is_finite() && value >= 0.0 {
        Ok(value)
    } else {
        Err("threshold must be a non-negative percentage".to_string())
    }
}

/// What `WEBBENCH_TRACE` asks for.
#[derive(Debug, Clone, PartialEq, Eq)]
enum TraceRequest {
    Off,
    /// Plain switch; the filter comes from `RUST_LOG` or the built-in default.
    On,
    Filter(String),
}

impl TraceRequest {
    fn parse(raw: &str) -> Self {
        let value = raw.trim();
        match value.to_ascii_lowercase().as_str() {
            "" | "0" | "false" | "off" | "no" => TraceRequest::Off,
            "1" | "true" | "on" | "yes" => TraceRequest::On,
            _ => TraceRequest::Filter(value.to_string()),
        }
    }

    fn filter_expr(self, rust_log: Option<String>) -> Option<String> {
        match self {
            TraceRequest::Off => None,
            TraceRequest::On => Some(rust_log.unwrap_or_else(|| DEFAULT_TRACE_FILTER.to_string())),
            TraceRequest::Filter(expr) => Some(expr),
        }
    }
}

fn maybe_init_tracing() {
    let request = match std::env::var("WEBBENCH_TRACE") {
        Ok(raw) => TraceRequest::parse(&raw),
        Err(_) => return,
    };
    let Some(expr) = request.filter_expr(std::env::var("RUST_LOG").ok()) else {
        return;
    };

    TRACE_INIT.call_once(|| {
        use tracing_subscriber::EnvFilter;

        let filter = EnvFilter::try_new(&expr).unwrap_or_else(|err| {
            eprintln!("ignoring WEBBENCH_TRACE filter '{}': {}", expr, err);
            EnvFilter::new(DEFAULT_TRACE_FILTER)
        });
        let _ = tracing_subscriber::fmt()
            .with_writer(std::io::stderr)
            .with_target(false)
            .with_env_filter(filter)
            .try_init();
    });
}

/// Set the returned flag on the first Ctrl-C so the runner can stop between
/// iterations and still write what it has. A second Ctrl-C exits immediately
/// with [`EXIT_FATAL`].
fn install_interrupt_flag() -> Arc<AtomicBool> {
    let flag = Arc::new(AtomicBool::new(false));
    let handler_flag = flag.clone();
    let spawned = std::thread::Builder::new()
        .name("webbench-ctrl-c".to_string())
        .spawn(move || {
            let runtime = match tokio::runtime::Builder::new_current_thread().enable_all().build() {
                Ok(rt) => rt,
                Err(err) => {
                    tracing::warn!("interrupt handler unavailable: {}", err);
                    return;
                }
            };
            runtime.block_on(async {
                if tokio::signal::ctrl_c().await.is_err() {
                    return;
                }
                eprintln!("\nInterrupted; finishing the current iteration. Press Ctrl-C again to abort.");
                handler_flag.store(true, Ordering::SeqCst);
                // The handler replaced the default SIGINT action, so a second
                // Ctrl-C has to end the process here.
                if tokio::signal::ctrl_c().await.is_ok() {
                    eprintln!("Aborted; no results written.");
                    std::process::exit(EXIT_FATAL);
                }
            });
        });
    if let Err(err) = spawned {
        tracing::warn!("failed to spawn interrupt handler: {}", err);
    }
    flag
}

fn load_config(path: Option<&Path>) -> anyhow::Result<ConfigFile> {
    match path {
        Some(path) => ConfigFile::load(path),
        None => Ok(ConfigFile::default()),
    }
}

fn build_runner_config(args: &RunArgs, file: &ConfigFile) -> RunnerConfig {
    let mut config = RunnerConfig::default();
    file.apply_run(&mut config);
    if let Some(secs) = args.timeout {
        config.timeout = Duration::from_secs_f64(secs);
    }
    if !args.engine_args.is_empty() {
        config.extra_args = args.engine_args.clone();
    }
    if args.allow_partial {
        config.allow_partial = true;
    }
    config
}

fn build_compare_config(args: &CompareArgs, file: &ConfigFile) -> CompareConfig {
    let mut config = CompareConfig::default();
    file.apply_compare(&mut config);
    if let Some(threshold) = args.threshold {
        config.threshold_percent = threshold;
    }
    if args.fail_on_regression {
        config.fail_on_regression = true;
    }
    config
}

fn build_suite(args: &RunArgs, file: &ConfigFile) -> anyhow::Result<Suite> {
    let manifest = args
        .suite
        .clone()
        .or_else(|| file.run.suite.as_ref().map(PathBuf::from));
    let suite = match manifest {
        Some(path) => Suite::from_manifest(&path)?,
        None => Suite::builtin(),
    };
    let suite = suite.select(&args.benchmarks)?;
    let suite = match args.iterations.or_else(|| file.iterations()) {
        Some(n) => suite.with_iterations(n)?,
        None => suite,
    };
    if suite.is_empty() {
        anyhow::bail!("no benchmarks selected");
    }
    Ok(suite)
}

/// Exit code for a finished run.
fn run_exit_code(results: &ResultSet, allow_partial: bool) -> i32 {
    if allow_partial || (!results.has_failures() && !results.metadata.interrupted) {
        EXIT_OK
    } else {
        EXIT_FAILURES
    }
}

fn cmd_run(args: RunArgs) -> anyhow::Result<i32> {
    let file = load_config(args.config.as_deref())?;
    let config = build_runner_config(&args, &file);
    let suite = build_suite(&args, &file)?;
    let output = args
        .output
        .clone()
        .or_else(|| file.run.output.as_ref().map(PathBuf::from))
        .unwrap_or_else(|| PathBuf::from("results.json"));

    // Reject a bad executable before installing handlers or printing anything.
    Runner::<ProcessExecutor>::validate_executable(&args.executable)?;

    let allow_partial = config.allow_partial;
    let executor = ProcessExecutor::new(config.poll_interval);
    let cancel = install_interrupt_flag();
    let mut runner = Runner::new(config, executor)
        .with_cancel_flag(cancel)
        .with_observer(|event| match event {
            RunEvent::CaseStarted { case } => {
                println!("Running '{}' ({} iterations)", case.name, case.iterations);
            }
            RunEvent::IterationCompleted {
                case,
                iteration,
                sample_ms,
            } => {
                println!("Iteration {}: Completed '{}' in {:.2} ms", iteration, case, sample_ms);
            }
            RunEvent::IterationFailed { case, failure } => {
                eprintln!("Iteration {}: '{}' failed: {}", failure.iteration, case, failure.message);
            }
            RunEvent::CaseFinished { .. } | RunEvent::Interrupted => {}
        });

    let results = runner
        .run_to_file(&args.executable, &suite, &output)
        .context("benchmark run aborted")?;

    println!();
    print!("{}", render_run_summary(&results));
    println!("\nResults written to {}", output.display());
    for (name, result) in results.failed_cases() {
        eprintln!("Benchmark '{}' failed: {}", name, result.failure.as_deref().unwrap_or("unknown"));
    }
    Ok(run_exit_code(&results, allow_partial))
}

fn cmd_compare(args: CompareArgs) -> anyhow::Result<i32> {
    let file = load_config(args.config.as_deref())?;
    let config = build_compare_config(&args, &file);
    let fail_on_regression = config.fail_on_regression;
    let comparison = Comparator::new(config).compare_files(&args.old, &args.new)?;
    print!("{}", render_comparison(&comparison));
    if fail_on_regression && comparison.has_regressions() {
        return Ok(EXIT_FAILURES);
    }
    Ok(EXIT_OK)
}

fn main() {
    maybe_init_tracing();

    let CliArgs { command } = CliArgs::parse();
    let outcome = match command {
        Commands::Run(args) => cmd_run(args),
        Commands::Compare(args) => cmd_compare(args),
    };

    match outcome {
        Ok(code) => std::process::exit(code),
        Err(err) => {
            eprintln!("Error: {:#}", err);
            std::process::exit(EXIT_FATAL);
        }
    }
}
