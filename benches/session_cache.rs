use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use rand::{rngs::StdRng, Rng, SeedableRng};
use std::sync::Arc;

use authhub::identity::generate_session_key;
use authhub::session::{MemorySessionStore, SessionCache};
use authhub::{Permit, Token};

fn populated(n: usize, max_cached: usize) -> (SessionCache, Vec<String>) {
    let cache = SessionCache::new(Arc::new(MemorySessionStore::new()), max_cached);
    let expires = chrono::Utc::now() + chrono::Duration::hours(1);
    let keys: Vec<String> = (0..n).map(|i| format!("session-{:08}", i)).collect();
    for (i, k) in keys.iter().enumerate() {
        let token = Token::new(format!("user{}", i % 1024), expires, Permit::new(vec![(i % 251) as u8; 8]));
        cache.write(k, &token).unwrap();
    }
    (cache, keys)
}

fn bench_session_cache(c: &mut Criterion) {
    let n = 100_000usize;
    let mut group = c.benchmark_group("session_cache");
    group.sample_size(20);
    group.throughput(Throughput::Elements(1));

    // All reads hit the in-memory cache
    let (cache, keys) = populated(n, 0);
    group.bench_with_input(BenchmarkId::new("read_hit", n), &n, |b, _| {
        let mut rng = StdRng::seed_from_u64(0xBEEF_CAFE);
        b.iter(|| {
            let k = &keys[rng.gen_range(0..keys.len())];
            criterion::black_box(cache.read(k).unwrap());
        });
    });

    // Cache bounded to a tenth of the sessions; most reads go through to the store
    let (bounded, keys) = populated(n, n / 10);
    group.bench_with_input(BenchmarkId::new("read_through", n), &n, |b, _| {
        let mut rng = StdRng::seed_from_u64(0xFACE_FEED);
        b.iter(|| {
            let k = &keys[rng.gen_range(0..keys.len())];
            criterion::black_box(bounded.read(k).unwrap());
        });
    });

    group.bench_function("generate_session_key", |b| {
        b.iter(|| criterion::black_box(generate_session_key().unwrap()));
    });
    group.finish();
}

criterion_group!(benches, bench_session_cache);
criterion_main!(benches);
