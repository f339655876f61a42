use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};

use std::collections::BTreeMap;

use worldforge_core::WorldId;
use worldforge_jobs::{InMemoryJobStore, Job, JobStore};

fn seed_store(store: &InMemoryJobStore, world_id: WorldId, count: usize) {
    for i in 0..count {
        let mut parameters = BTreeMap::new();
        parameters.insert("index".to_string(), i.to_string());
        let job = Job::new(world_id, "generateChunk", "Generate chunk", None, parameters);
        store.insert(job).unwrap();
    }
}

fn bench_insert(c: &mut Criterion) {
    let mut group = c.benchmark_group("job_store_insert");

    for count in [100usize, 1_000] {
        group.throughput(Throughput::Elements(count as u64));
        group.bench_with_input(BenchmarkId::from_parameter(count), &count, |b, &count| {
            b.iter(|| {
                let store = InMemoryJobStore::new();
                seed_store(&store, WorldId::new(), count);
                black_box(store)
            });
        });
    }

    group.finish();
}

fn bench_claim_drain(c: &mut Criterion) {
    let mut group = c.benchmark_group("job_store_claim_drain");

    for count in [100usize, 1_000] {
        group.throughput(Throughput::Elements(count as u64));
        group.bench_with_input(BenchmarkId::from_parameter(count), &count, |b, &count| {
            b.iter(|| {
                let store = InMemoryJobStore::new();
                seed_store(&store, WorldId::new(), count);
                while let Some(job) = store.claim_next().unwrap() {
                    black_box(job);
                }
            });
        });
    }

    group.finish();
}

criterion_group!(benches, bench_insert, bench_claim_drain);
criterion_main!(benches);
