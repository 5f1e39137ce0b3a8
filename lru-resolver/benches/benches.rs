use std::time::Instant;

use criterion::{black_box, criterion_group, criterion_main, Criterion};

use lru_resolver::lru::LRUCache;

fn filled_cache(capacity: usize) -> LRUCache<String> {
    let cache = LRUCache::new(capacity).unwrap();
    for i in 0..capacity {
        cache.update(format!("host-{}", i), format!("10.0.{}.{}", i / 256, i % 256));
    }

    cache
}

fn resolve_benchmarks(c: &mut Criterion) {
    c.bench_function("resolve a present key", |b| {
        let cache = filled_cache(1024);
        b.iter(|| black_box(cache.resolve(black_box("host-512"))))
    });

    c.bench_function("resolve an absent key", |b| {
        let cache = filled_cache(1024);
        b.iter(|| black_box(cache.resolve(black_box("unknown-host"))))
    });
}

fn update_benchmarks(c: &mut Criterion) {
    c.bench_function("update an existing key", |b| {
        let cache = filled_cache(1024);
        b.iter(|| cache.update("host-512".to_owned(), "127.0.0.1".to_owned()))
    });

    c.bench_function("insert with eviction", |b| {
        let cache = filled_cache(1024);
        let mut next = 0;
        b.iter(|| {
            next += 1;
            cache.update(format!("new-host-{}", next), "127.0.0.1".to_owned());
        })
    });
}

fn contention_benchmarks(c: &mut Criterion) {
    c.bench_function("mixed access from 4 threads", |b| {
        b.iter_custom(|iters| {
            let cache = filled_cache(1024);

            let start = Instant::now();
            std::thread::scope(|scope| {
                for thread in 0..4 {
                    let cache = &cache;
                    let _ = scope.spawn(move || {
                        for i in 0..iters as usize {
                            let key = format!("host-{}", (thread * 97 + i) % 2048);
                            if i % 10 == 0 {
                                cache.update(key, "127.0.0.1".to_owned());
                            } else {
                                let _ = black_box(cache.resolve(&key));
                            }
                        }
                    });
                }
            });
            start.elapsed()
        })
    });
}

criterion_group!(
    benches,
    resolve_benchmarks,
    update_benchmarks,
    contention_benchmarks
);
criterion_main!(benches);
