use btree::{BTree, Mode};
use criterion::{criterion_group, criterion_main, BatchSize, Criterion};
use tempfile::tempdir;

const N: i64 = 1_000;

fn btree_insert_sequential(c: &mut Criterion) {
    c.bench_function("btree_insert_1k_sequential", |b| {
        b.iter_batched(
            || {
                let dir = tempdir().unwrap();
                let path = dir.path().join("bench.idx");
                let mut tree = BTree::new(32, 8);
                tree.open(&path, Mode::Write).unwrap();
                (dir, tree)
            },
            |(_dir, mut tree)| {
                for i in 0..N {
                    tree.insert_i64(format!("k{:06}", i).as_bytes(), i).unwrap();
                }
                tree.close().unwrap();
            },
            BatchSize::SmallInput,
        );
    });
}

fn btree_insert_small_nodes(c: &mut Criterion) {
    c.bench_function("btree_insert_1k_small_nodes", |b| {
        b.iter_batched(
            || {
                let dir = tempdir().unwrap();
                let path = dir.path().join("bench.idx");
                let mut tree = BTree::with_node_size(16, 8, 256);
                tree.open(&path, Mode::Write).unwrap();
                (dir, tree)
            },
            |(_dir, mut tree)| {
                for i in 0..N {
                    tree.insert_i64(format!("k{:06}", i).as_bytes(), i).unwrap();
                }
                tree.close().unwrap();
            },
            BatchSize::SmallInput,
        );
    });
}

fn btree_retrieve_hit(c: &mut Criterion) {
    let dir = tempdir().unwrap();
    let path = dir.path().join("bench.idx");
    let mut tree = BTree::new(32, 8);
    tree.open(&path, Mode::Write).unwrap();
    for i in 0..N {
        tree.insert_i64(format!("k{:06}", i).as_bytes(), i).unwrap();
    }
    tree.close().unwrap();
    tree.open(&path, Mode::Read).unwrap();

    c.bench_function("btree_retrieve_hit_1k", |b| {
        b.iter(|| {
            for i in 0..N {
                let key = format!("k{:06}", i);
                criterion::black_box(tree.retrieve_i64(key.as_bytes()));
            }
        });
    });
}

fn btree_retrieve_miss(c: &mut Criterion) {
    let dir = tempdir().unwrap();
    let path = dir.path().join("bench.idx");
    let mut tree = BTree::new(32, 8);
    tree.open(&path, Mode::Write).unwrap();
    for i in 0..N {
        tree.insert_i64(format!("k{:06}", i).as_bytes(), i).unwrap();
    }
    tree.close().unwrap();
    tree.open(&path, Mode::Read).unwrap();

    c.bench_function("btree_retrieve_miss_1k", |b| {
        b.iter(|| {
            for i in 0..N {
                let key = format!("miss{:06}", i);
                criterion::black_box(tree.retrieve_i64(key.as_bytes()));
            }
        });
    });
}

criterion_group!(
    benches,
    btree_insert_sequential,
    btree_insert_small_nodes,
    btree_retrieve_hit,
    btree_retrieve_miss,
);

criterion_main!(benches);
