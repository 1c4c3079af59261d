//! Differ benchmarks for pollwatch-core

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use pollwatch_core::{diff, FileRecord, Snapshot};
use std::path::Path;
use std::time::{Duration, UNIX_EPOCH};

/// Build a flat tree of `files` entries spread over 100 directories
fn build_snapshot(files: usize) -> Snapshot {
    let mtime = UNIX_EPOCH + Duration::from_secs(1_700_000_000);
    (0..files)
        .map(|i| {
            FileRecord::file(
                format!("/repo/dir{:03}/file{:06}.rs", i % 100, i),
                (i % 4096) as u64,
                0o100644,
                mtime,
            )
        })
        .collect()
}

fn bench_diff_unchanged(c: &mut Criterion) {
    let small = build_snapshot(100);
    let large = build_snapshot(10_000);

    c.bench_function("diff_unchanged_small", |b| {
        b.iter(|| black_box(diff(&small, &small)))
    });

    c.bench_function("diff_unchanged_large", |b| {
        b.iter(|| black_box(diff(&large, &large)))
    });
}

fn bench_diff_changes(c: &mut Criterion) {
    let old = build_snapshot(10_000);

    // A handful of writes on an otherwise idle tree
    let mut written = old.clone();
    for i in 0..5 {
        let path = format!("/repo/dir{:03}/file{:06}.rs", i % 100, i);
        let mut record = written.get(Path::new(&path)).cloned().unwrap();
        record.size += 1;
        written.insert(record);
    }

    c.bench_function("diff_writes_large", |b| {
        b.iter(|| black_box(diff(&old, &written)))
    });

    // A burst of renames exercising the pairing pass
    let mut renamed = old.clone();
    for i in 0..200 {
        let path = format!("/repo/dir{:03}/file{:06}.rs", i % 100, i);
        let mut record = renamed.remove(Path::new(&path)).unwrap();
        record.path = format!("/repo/dir{:03}/moved{:06}.rs", i % 100, i).into();
        renamed.insert(record);
    }

    c.bench_function("diff_renames_large", |b| {
        b.iter(|| black_box(diff(&old, &renamed)))
    });
}

criterion_group!(benches, bench_diff_unchanged, bench_diff_changes);
criterion_main!(benches);
