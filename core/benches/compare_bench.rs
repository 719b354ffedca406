use std::hint::black_box;
use std::path::Path;

use chrono::Utc;
use criterion::{Criterion, criterion_group, criterion_main};
use webbench_core::compare::Comparator;
use webbench_core::result::{BenchmarkResult, Metadata, ResultSet};

fn synthetic_set(cases: usize, scale: f64) -> ResultSet {
    let mut set = ResultSet::new(Metadata::new(Path::new("/opt/engine"), Utc::now()));
    for idx in 0..cases {
        let base = 50.0 + (idx % 97) as f64 * scale;
        let samples = (0..10).map(|i| base + i as f64 * 0.25).collect();
        set.entries
            .insert(format!("case_{:05}", idx), BenchmarkResult::from_attempts(samples, Vec::new()));
    }
    set
}

fn bench_compare(c: &mut Criterion) {
    let old = synthetic_set(10_000, 1.0);
    let new = synthetic_set(10_000, 1.07);
    let comparator = Comparator::default();
    c.bench_function("compare_10k_cases", |b| {
        b.iter(|| {
            let cmp = comparator.compare(black_box(&old), black_box(&new));
            black_box(cmp.summary());
        });
    });
}

criterion_group!(compare, bench_compare);
criterion_main!(compare);
