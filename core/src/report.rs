//! Plain-text tables for terminal output.

use std::fmt::Write as _;

use crate::compare::Comparison;
use crate::result::ResultSet;

const MISSING: &str = "—";

/// Column-aligned table; the first column is left-aligned, the rest right-aligned.
struct Table {
    headers: Vec<String>,
    rows: Vec<Vec<String>>,
}

impl Table {
    fn new(headers: &[&str]) -> Self {
        Self {
            headers: headers.iter().map(|h| h.to_string()).collect(),
            rows: Vec::new(),
        }
    }

    fn push(&mut self, row: Vec<String>) {
        self.rows.push(row);
    }

    fn render(&self) -> String {
        let mut widths: Vec<usize> = self.headers.iter().map(|h| h.chars().count()).collect();
        for row in &self.rows {
            for (idx, cell) in row.iter().enumerate() {
                if idx < widths.len() {
                    widths[idx] = widths[idx].max(cell.chars().count());
                }
            }
        }

        let mut out = String::new();
        self.render_line(&mut out, &self.headers, &widths);
        let rule: Vec<String> = widths.iter().map(|w| "-".repeat(*w)).collect();
        self.render_line(&mut out, &rule, &widths);
        for row in &self.rows {
            self.render_line(&mut out, row, &widths);
        }
        out
    }

    fn render_line(&self, out: &mut String, cells: &[String], widths: &[usize]) {
        let mut line = String::new();
        for (idx, width) in widths.iter().enumerate() {
            let cell = cells.get(idx).map(String::as_str).unwrap_or("");
            let pad = width.saturating_sub(cell.chars().count());
            if idx > 0 {
                line.push_str("  ");
            }
            if idx == 0 {
                line.push_str(cell);
                line.push_str(&" ".repeat(pad));
            } else {
                line.push_str(&" ".repeat(pad));
                line.push_str(cell);
            }
        }
        out.push_str(line.trim_end());
        out.push('\n');
    }
}

fn ms(value: Option<f64>) -> String {
    value.map(|v| format!("{:.2}", v)).unwrap_or_else(|| MISSING.to_string())
}

/// Per-case timing table printed at the end of a run.
pub fn render_run_summary(results: &ResultSet) -> String {
    let mut table = Table::new(&["Benchmark", "Mean ± σ (ms)", "Median (ms)", "Range (ms)", "Runs", "Status"]);
    for (name, result) in &results.entries {
        let attempts = result.samples.len() + result.iteration_failures.len();
        let (mean, range) = match result.stats {
            Some(stats) => (
                format!("{:.2} ± {:.2}", stats.mean, stats.std_dev),
                format!("{:.2} … {:.2}", stats.min, stats.max),
            ),
            None => (MISSING.to_string(), MISSING.to_string()),
        };
        let status = match &result.failure {
            Some(reason) => format!("FAIL: {}", reason),
            None if !result.iteration_failures.is_empty() => {
                format!("OK ({} failed)", result.iteration_failures.len())
            }
            None => "OK".to_string(),
        };
        table.push(vec![
            name.clone(),
            mean,
            ms(result.aggregate),
            range,
            format!("{}/{}", result.samples.len(), attempts),
            status,
        ]);
    }

    let mut out = table.render();
    if results.metadata.interrupted {
        out.push_str("\nRun was interrupted; results above are partial.\n");
    }
    out
}

/// Human-readable comparison report.
pub fn render_comparison(comparison: &Comparison) -> String {
    let mut table = Table::new(&["Benchmark", "Old (ms)", "New (ms)", "Delta", "Speedup", "Result"]);
    for row in &comparison.rows {
        table.push(vec![
            row.name.clone(),
            ms(row.old_aggregate),
            ms(row.new_aggregate),
            row.delta_percent
                .map(|d| format!("{:+.2}%", d))
                .unwrap_or_else(|| MISSING.to_string()),
            row.speedup()
                .map(|s| format!("{:.3}", s))
                .unwrap_or_else(|| MISSING.to_string()),
            row.classification.to_string(),
        ]);
    }

    let mut out = table.render();
    if !comparison.added.is_empty() {
        let _ = writeln!(out, "\nAdded: {}", comparison.added.join(", "));
    }
    if !comparison.removed.is_empty() {
        let _ = writeln!(out, "\nRemoved: {}", comparison.removed.join(", "));
    }
    let summary = comparison.summary();
    let _ = writeln!(
        out,
        "\n{} regressed, {} improved, {} unchanged, {} failed, {} added, {} removed (threshold ±{:.2}%)",
        summary.regressed,
        summary.improved,
        summary.unchanged,
        summary.failed,
        summary.added,
        summary.removed,
        comparison.threshold_percent
    );
    out
}
