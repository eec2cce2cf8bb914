//! Buffer pool benchmarks.

use std::sync::Arc;

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use rand::prelude::*;

use burrow_storage::buffer::{BufferPoolConfig, BufferPoolManager, LruReplacer};
use burrow_storage::disk::MemDiskManager;
use burrow_storage::hash::ExtendibleHashTable;

const PAGE_SIZE: usize = 4096;

fn replacer_churn_benchmark(c: &mut Criterion) {
    c.bench_function("replacer_churn_1000", |b| {
        b.iter(|| {
            let replacer = LruReplacer::new();
            for i in 0..1000u32 {
                replacer.insert(i);
            }
            let mut victims = 0;
            while replacer.victim().is_some() {
                victims += 1;
            }
            black_box(victims)
        })
    });
}

fn hash_insert_benchmark(c: &mut Criterion) {
    c.bench_function("hash_insert_1000", |b| {
        b.iter(|| {
            let table = ExtendibleHashTable::new(16);
            for i in 0..1000u64 {
                table.insert(i, i * 2);
            }
            black_box(table.num_buckets())
        })
    });
}

fn hash_find_benchmark(c: &mut Criterion) {
    let table = ExtendibleHashTable::new(16);
    for i in 0..1000u64 {
        table.insert(i, i * 2);
    }

    c.bench_function("hash_find_1000", |b| {
        b.iter(|| {
            for i in 0..1000u64 {
                black_box(table.find(&i));
            }
        })
    });
}

fn fetch_hit_benchmark(c: &mut Criterion) {
    let disk = Arc::new(MemDiskManager::new(PAGE_SIZE));
    let pool = BufferPoolManager::new(BufferPoolConfig::new(64), disk, None).unwrap();

    let ids: Vec<_> = (0..64)
        .map(|_| {
            let frame = pool.new_page().unwrap().unwrap();
            let id = frame.page_id();
            pool.unpin_page(id, false);
            id
        })
        .collect();

    let mut rng = StdRng::seed_from_u64(7);

    c.bench_function("fetch_hit", |b| {
        b.iter(|| {
            let id = *ids.choose(&mut rng).unwrap();
            let frame = pool.fetch_page(id).unwrap().unwrap();
            pool.unpin_page(id, false);
            black_box(frame.page_id())
        })
    });
}

criterion_group!(
    benches,
    replacer_churn_benchmark,
    hash_insert_benchmark,
    hash_find_benchmark,
    fetch_hit_benchmark,
);
criterion_main!(benches);
