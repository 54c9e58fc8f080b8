//! Partition allocator benchmarks.

use criterion::{BatchSize, BenchmarkId, Criterion, criterion_group, criterion_main};
use tierpart_core::TieredPartition;

fn build(nblks: usize, granularity: usize, tiers: usize) -> TieredPartition {
    let bytes = TieredPartition::required_bytes(nblks, granularity, tiers)
        .expect("valid layout parameters");
    TieredPartition::with_tiers(vec![0u8; bytes], nblks, granularity, tiers)
        .expect("layout should succeed")
}

fn bench_layout(c: &mut Criterion) {
    let mut group = c.benchmark_group("layout");

    for &nblks in &[8usize, 64, 512] {
        group.bench_with_input(BenchmarkId::new("4tiers", nblks), &nblks, |b, &n| {
            b.iter(|| {
                let partition = build(n, 16, 4);
                criterion::black_box(partition);
            });
        });
    }
    group.finish();
}

fn bench_allocate_release_cycle(c: &mut Criterion) {
    let mut group = c.benchmark_group("allocate_release_cycle");

    // Home tier always has capacity: every allocation is a head pop and
    // every release is a head insert.
    group.bench_function("home_tier_pop", |b| {
        let partition = build(64, 16, 4);
        b.iter(|| {
            let offset = partition.allocate(16, 16).expect("pop");
            partition.release(16, 16, offset).expect("insert");
            criterion::black_box(offset);
        });
    });

    for &size in &[16usize, 32, 64, 128] {
        group.bench_with_input(BenchmarkId::new("per_size", size), &size, |b, &sz| {
            let partition = build(64, 16, 4);
            b.iter(|| {
                let offset = partition.allocate(sz, 16).expect("allocate");
                partition.release(sz, 16, offset).expect("release");
                criterion::black_box(offset);
            });
        });
    }
    group.finish();
}

fn bench_borrow_and_split(c: &mut Criterion) {
    let mut group = c.benchmark_group("borrow_and_split");

    // Each iteration starts from a partition whose tier 0 is drained, so
    // the allocation walks the upper tiers and splits; the release then
    // merges the block with its own spare.
    group.bench_function("split_then_merge", |b| {
        b.iter_batched(
            || {
                let partition = build(8, 16, 4);
                while partition.query(0).map(|t| t.free_count) != Some(0) {
                    partition.allocate(16, 16).expect("drain tier 0");
                }
                partition
            },
            |partition| {
                let offset = partition.allocate(16, 16).expect("split");
                partition.release(16, 16, offset).expect("merge");
                criterion::black_box(offset);
            },
            BatchSize::SmallInput,
        );
    });
    group.finish();
}

fn bench_snapshot(c: &mut Criterion) {
    let mut group = c.benchmark_group("snapshot");

    for &nblks in &[8usize, 64, 512] {
        group.bench_with_input(BenchmarkId::new("full_chains", nblks), &nblks, |b, &n| {
            let partition = build(n, 16, 4);
            b.iter(|| {
                let snapshot = partition.snapshot();
                criterion::black_box(snapshot);
            });
        });
    }
    group.finish();
}

criterion_group!(
    benches,
    bench_layout,
    bench_allocate_release_cycle,
    bench_borrow_and_split,
    bench_snapshot
);
criterion_main!(benches);
