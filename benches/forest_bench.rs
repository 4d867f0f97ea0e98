use annforest::{ingest, ForestIndex, VectorStore};
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use ndarray::Array1;
use rand::rngs::StdRng;
use rand::SeedableRng;
use rand_distr::{Distribution, Normal};

fn random_store(seed: u64, n: usize, dim: usize) -> VectorStore {
    let mut rng = StdRng::seed_from_u64(seed);
    let normal = Normal::new(0.0f32, 1.0).unwrap();
    let items = (0..n).map(|i| {
        let v: Vec<f32> = (0..dim).map(|_| normal.sample(&mut rng)).collect();
        (format!("id-{i}"), v)
    });
    let (store, _) = ingest(dim, items).unwrap();
    store
}

fn brute_force_query(store: &VectorStore, query: usize, k: usize) -> Vec<(usize, f32)> {
    let q = store.get(query).unwrap();
    let q = q.to_owned();
    let mut dists: Vec<(usize, f32)> = (0..store.len())
        .filter(|&i| i != query)
        .map(|i| {
            let v: Array1<f32> = store.get(i).unwrap().to_owned();
            let diff = &q - &v;
            (i, diff.dot(&diff).sqrt())
        })
        .collect();
    dists.sort_by(|a, b| a.1.partial_cmp(&b.1).unwrap());
    dists.truncate(k);
    dists
}

fn bench_build(c: &mut Criterion) {
    let mut group = c.benchmark_group("build");
    group.sample_size(10);

    for &n in &[1_000usize, 10_000] {
        let store = random_store(42, n, 64);
        group.bench_with_input(BenchmarkId::from_parameter(n), &store, |b, store| {
            b.iter(|| {
                ForestIndex::builder()
                    .ntree(10)
                    .leaf_capacity(16)
                    .seed(1)
                    .build(black_box(store))
                    .unwrap()
            })
        });
    }
    group.finish();
}

fn bench_query(c: &mut Criterion) {
    let mut group = c.benchmark_group("query_k10");

    for &n in &[1_000usize, 10_000, 50_000] {
        let store = random_store(42, n, 64);
        let forest = ForestIndex::builder()
            .ntree(10)
            .leaf_capacity(16)
            .seed(1)
            .build(&store)
            .unwrap();

        group.bench_with_input(
            BenchmarkId::new("forest", n),
            &(&forest, &store),
            |b, (forest, store)| {
                let mut i = 0;
                b.iter(|| {
                    i = (i + 1) % n;
                    black_box(forest.query(store, i, 10).unwrap())
                })
            },
        );

        group.bench_with_input(BenchmarkId::new("brute_force", n), &store, |b, store| {
            let mut i = 0;
            b.iter(|| {
                i = (i + 1) % n;
                black_box(brute_force_query(store, i, 10))
            })
        });
    }
    group.finish();
}

fn bench_search_k(c: &mut Criterion) {
    let mut group = c.benchmark_group("search_k_sweep");

    let n = 20_000;
    let store = random_store(42, n, 64);
    let forest = ForestIndex::builder()
        .ntree(10)
        .leaf_capacity(16)
        .seed(1)
        .build(&store)
        .unwrap();

    for &search_k in &[100usize, 400, 1_600, 6_400] {
        group.bench_with_input(
            BenchmarkId::from_parameter(search_k),
            &search_k,
            |b, &search_k| {
                let mut i = 0;
                b.iter(|| {
                    i = (i + 1) % n;
                    black_box(forest.query_with(&store, i, 10, search_k).unwrap())
                })
            },
        );
    }
    group.finish();
}

criterion_group!(benches, bench_build, bench_query, bench_search_k);
criterion_main!(benches);
