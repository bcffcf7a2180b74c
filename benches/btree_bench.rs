//! Benchmarks for B+-tree operations.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use rowindexdb::index::{BPlusTree, Key, KeyType, RowLocator};

const FANOUTS: [usize; 3] = [4, 16, 64];

fn scrambled_keys(n: usize) -> Vec<i32> {
    (0..n as i32).map(|i| i.wrapping_mul(7919) % (n as i32)).collect()
}

fn build(fanout: usize, keys: &[i32]) -> BPlusTree {
    let mut tree = BPlusTree::new(KeyType::Int, fanout).unwrap();
    for &k in keys {
        tree.insert(Key::Int(k), RowLocator::new(k as u32, 0)).unwrap();
    }
    tree
}

fn bench_insert(c: &mut Criterion) {
    let mut group = c.benchmark_group("insert");
    let keys = scrambled_keys(10_000);

    for fanout in FANOUTS {
        group.bench_with_input(BenchmarkId::new("fanout", fanout), &keys, |b, keys| {
            b.iter(|| black_box(build(fanout, keys)));
        });
    }

    group.finish();
}

fn bench_find(c: &mut Criterion) {
    let mut group = c.benchmark_group("find");
    let keys = scrambled_keys(10_000);

    for fanout in FANOUTS {
        let tree = build(fanout, &keys);
        group.bench_with_input(BenchmarkId::new("fanout", fanout), &keys, |b, keys| {
            b.iter(|| {
                for &k in keys {
                    black_box(tree.find(&Key::Int(k)).unwrap());
                }
            });
        });
    }

    group.finish();
}

fn bench_scan(c: &mut Criterion) {
    let mut group = c.benchmark_group("scan");
    let keys = scrambled_keys(10_000);

    for fanout in FANOUTS {
        let tree = build(fanout, &keys);
        group.bench_function(BenchmarkId::new("fanout", fanout), |b| {
            b.iter(|| black_box(tree.open_scan().filter_map(Result::ok).count()));
        });
    }

    group.finish();
}

fn bench_delete(c: &mut Criterion) {
    let mut group = c.benchmark_group("delete");
    let keys = scrambled_keys(10_000);

    for fanout in FANOUTS {
        group.bench_with_input(BenchmarkId::new("fanout", fanout), &keys, |b, keys| {
            b.iter_batched(
                || build(fanout, keys),
                |mut tree| {
                    for &k in keys {
                        tree.delete(&Key::Int(k)).unwrap();
                    }
                    black_box(tree)
                },
                criterion::BatchSize::LargeInput,
            );
        });
    }

    group.finish();
}

criterion_group!(benches, bench_insert, bench_find, bench_scan, bench_delete);
criterion_main!(benches);
