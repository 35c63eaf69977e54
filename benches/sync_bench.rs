use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use dirsync::sync::scanner::collect;
use dirsync::sync::strategy::{classify, classify_with, Comparison};
use dirsync::{SyncContext, SyncEngine};
use std::fs;
use std::path::Path;
use std::sync::Arc;
use tempfile::TempDir;

fn setup_files(root: &Path, count: usize) {
    for i in 0..count {
        let dir = root.join(format!("dir_{}", i % 10));
        fs::create_dir_all(&dir).unwrap();
        fs::write(dir.join(format!("file_{}.txt", i)), format!("content_{}", i)).unwrap();
    }
}

fn engine() -> SyncEngine {
    SyncEngine::new(Arc::new(SyncContext::in_memory()))
}

fn bench_snapshot(c: &mut Criterion) {
    let mut group = c.benchmark_group("snapshot");

    for file_count in [100, 1000, 5000].iter() {
        let source = TempDir::new().unwrap();
        setup_files(source.path(), *file_count);

        group.bench_with_input(
            BenchmarkId::from_parameter(file_count),
            file_count,
            |b, _| {
                b.iter(|| black_box(collect(source.path()).unwrap()));
            },
        );
    }
    group.finish();
}

fn bench_classify(c: &mut Criterion) {
    let mut group = c.benchmark_group("classify");

    for file_count in [100, 1000, 5000].iter() {
        let source = TempDir::new().unwrap();
        let dest = TempDir::new().unwrap();
        setup_files(source.path(), *file_count);
        // Half the files on the other side, so every category shows up
        setup_files(dest.path(), *file_count / 2);

        let a = collect(source.path()).unwrap();
        let b = collect(dest.path()).unwrap();

        group.bench_with_input(
            BenchmarkId::new("metadata", file_count),
            file_count,
            |bench, _| {
                bench.iter(|| black_box(classify(&a, &b)));
            },
        );

        group.bench_with_input(
            BenchmarkId::new("checksum", file_count),
            file_count,
            |bench, _| {
                bench.iter(|| {
                    // Fresh snapshots so hashes are not served from cache
                    let mut a = a.clone();
                    let mut b = b.clone();
                    black_box(classify_with(Comparison::Checksum, &mut a, &mut b).unwrap())
                });
            },
        );
    }
    group.finish();
}

fn bench_sync_fresh(c: &mut Criterion) {
    let mut group = c.benchmark_group("sync_fresh");
    group.sample_size(10);

    for file_count in [100, 1000].iter() {
        group.bench_with_input(
            BenchmarkId::from_parameter(file_count),
            file_count,
            |b, &count| {
                b.iter(|| {
                    let source = TempDir::new().unwrap();
                    let dest = TempDir::new().unwrap();
                    setup_files(source.path(), count);
                    black_box(engine().sync(source.path(), dest.path()).unwrap())
                });
            },
        );
    }
    group.finish();
}

fn bench_sync_idempotent(c: &mut Criterion) {
    c.bench_function("sync_idempotent_1000_files", |b| {
        let source = TempDir::new().unwrap();
        let dest = TempDir::new().unwrap();
        setup_files(source.path(), 1000);

        let engine = engine();
        engine.sync(source.path(), dest.path()).unwrap();

        b.iter(|| {
            // Everything is SameInBoth after the first pass
            let report = engine.sync(source.path(), dest.path()).unwrap();
            assert!(report.is_noop());
            black_box(report)
        });
    });
}

criterion_group!(
    benches,
    bench_snapshot,
    bench_classify,
    bench_sync_fresh,
    bench_sync_idempotent
);
criterion_main!(benches);
