//! Micro-benchmarks for build and point lookup.

use std::fs;

use criterion::{criterion_group, criterion_main, BatchSize, Criterion};
use tempfile::tempdir;

use linedex::{BPlusTree, Key};

const KEY_LEN: usize = 8;
const RECORDS: u32 = 2_000;

fn record_content() -> String {
    let mut content = String::new();
    for n in 0..RECORDS {
        content.push_str(&format!("{:08} payload for record {}\n", n, n));
    }
    content
}

fn bench_build(c: &mut Criterion) {
    let dir = tempdir().unwrap();
    let record_path = dir.path().join("records.txt");
    fs::write(&record_path, record_content()).unwrap();

    let mut run = 0u64;
    c.bench_function("build_2k_records", |b| {
        b.iter_batched(
            || {
                run += 1;
                dir.path().join(format!("bench-{run}.idx"))
            },
            |index_path| {
                BPlusTree::build(&record_path, index_path, KEY_LEN).unwrap();
            },
            BatchSize::PerIteration,
        )
    });
}

fn bench_find(c: &mut Criterion) {
    let dir = tempdir().unwrap();
    let record_path = dir.path().join("records.txt");
    fs::write(&record_path, record_content()).unwrap();

    let (mut tree, _) =
        BPlusTree::build(&record_path, dir.path().join("find.idx"), KEY_LEN).unwrap();

    let mut n = 0u32;
    c.bench_function("find_in_2k", |b| {
        b.iter(|| {
            n = (n + 997) % RECORDS;
            let key = Key::new(format!("{:08}", n).into_bytes(), KEY_LEN).unwrap();
            tree.find(&key).unwrap().unwrap();
        })
    });
}

criterion_group!(benches, bench_build, bench_find);
criterion_main!(benches);
