use criterion::{criterion_group, criterion_main, BatchSize, Criterion};
use engine::Engine;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

const N_KEYS: usize = 10_000;

fn corpus() -> Vec<Vec<u8>> {
    let mut rng = StdRng::seed_from_u64(0xC0FFEE);
    (0..N_KEYS)
        .map(|i| {
            let len = rng.gen_range(8..=24);
            let mut key = format!("{:06}/", i).into_bytes();
            key.extend((0..len).map(|_| b"abcdefgh"[rng.gen_range(0..8)]));
            key
        })
        .collect()
}

fn build_engine(keys: &[Vec<u8>]) -> Engine {
    let mut engine = Engine::in_memory();
    for key in keys {
        engine.put(key).unwrap();
    }
    engine
}

fn insert_benchmark(c: &mut Criterion) {
    let keys = corpus();
    c.bench_function("put_10k", |b| {
        b.iter_batched(
            || keys.clone(),
            |keys| {
                let mut engine = Engine::in_memory();
                for key in &keys {
                    engine.put(key).unwrap();
                }
                engine
            },
            BatchSize::LargeInput,
        );
    });
}

fn lookup_benchmark(c: &mut Criterion) {
    let keys = corpus();
    let engine = build_engine(&keys);
    c.bench_function("contains_10k", |b| {
        b.iter(|| {
            let mut hits = 0usize;
            for key in &keys {
                if engine.contains(key) {
                    hits += 1;
                }
            }
            hits
        });
    });
}

fn walk_benchmark(c: &mut Criterion) {
    let keys = corpus();
    let engine = build_engine(&keys);
    c.bench_function("keys_walk_10k", |b| {
        b.iter(|| {
            let mut total = 0usize;
            engine.keys(false, |key| total += key.len());
            total
        });
    });
}

fn optimize_benchmark(c: &mut Criterion) {
    let keys = corpus();
    c.bench_function("optimize_10k", |b| {
        b.iter_batched(
            || build_engine(&keys),
            |mut engine| {
                engine.optimize(&mut StdRng::seed_from_u64(1)).unwrap();
                engine
            },
            BatchSize::LargeInput,
        );
    });
}

criterion_group!(
    benches,
    insert_benchmark,
    lookup_benchmark,
    walk_benchmark,
    optimize_benchmark
);
criterion_main!(benches);
