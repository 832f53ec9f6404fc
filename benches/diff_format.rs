//! Benchmarks for the diff and format stages of a cycle.
//!
//! Run with: `cargo bench --bench diff_format`

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};

use eth_family_bot::{diff, diff_by_id, format, LeaderboardEntry, Snapshot};

/// Leaderboard of `n` members where every `every`th member renamed.
fn make_pair(n: u64, every: u64) -> (Snapshot, Snapshot) {
    let old: Snapshot = (0..n)
        .map(|fid| LeaderboardEntry::new(fid, format!("caster{:04}", fid)))
        .collect();
    let new: Snapshot = (0..n)
        .map(|fid| {
            let name = if fid % every == 0 {
                format!("caster{:04}.eth", fid)
            } else {
                format!("caster{:04}", fid)
            };
            LeaderboardEntry::new(fid, name)
        })
        .collect();
    (old, new)
}

fn bench_diff(c: &mut Criterion) {
    let mut group = c.benchmark_group("diff");

    for n in [150u64, 1_000, 10_000] {
        let (old, new) = make_pair(n, 5);
        group.throughput(Throughput::Elements(n));

        group.bench_with_input(BenchmarkId::new("aligned", n), &(&old, &new), |b, (old, new)| {
            b.iter(|| diff(black_box(old), black_box(new)).unwrap())
        });
        group.bench_with_input(BenchmarkId::new("keyed", n), &(&old, &new), |b, (old, new)| {
            b.iter(|| diff_by_id(black_box(old), black_box(new)))
        });
    }

    group.finish();
}

fn bench_format(c: &mut Criterion) {
    let mut group = c.benchmark_group("format");

    for changed_every in [50u64, 5, 1] {
        let (old, new) = make_pair(150, changed_every);
        let changes = diff(&old, &new).unwrap();
        group.throughput(Throughput::Elements(changes.len() as u64));

        group.bench_with_input(
            BenchmarkId::new("changes", changes.len()),
            &changes,
            |b, changes| b.iter(|| format(black_box(changes)).unwrap()),
        );
    }

    group.finish();
}

criterion_group!(benches, bench_diff, bench_format);
criterion_main!(benches);
