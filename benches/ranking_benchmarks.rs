use criterion::{Criterion, black_box, criterion_group, criterion_main};
use georank::spatial::Rect;
use georank::{Config, Engine, Entity, Point, Query, SpatialIndex, Weights};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

fn dataset(n: usize) -> Vec<Entity> {
    let mut rng = StdRng::seed_from_u64(1);
    (0..n)
        .map(|i| {
            let lat = 37.9838 + rng.random_range(-0.25..0.25);
            let lon = 23.7275 + rng.random_range(-0.25..0.25);
            let rating = rng.random_range(1.0..5.0);
            let reviews = rng.random_range(0..5000);
            Entity::new(i as u64 + 1, lat, lon, rating, reviews)
        })
        .collect()
}

fn reference() -> Point {
    Point::new(23.7275, 37.9838)
}

fn bench_engine_build(c: &mut Criterion) {
    let mut group = c.benchmark_group("engine_build");
    for n in [1_000, 10_000, 100_000] {
        let entities = dataset(n);
        group.bench_function(format!("bulk_load_{}", n), |b| {
            b.iter(|| Engine::new(black_box(entities.clone())).unwrap())
        });
    }
    group.finish();
}

fn bench_top_k(c: &mut Criterion) {
    let engine = Engine::new(dataset(100_000)).unwrap();
    let mut group = c.benchmark_group("top_k");

    for k in [10, 100] {
        group.bench_function(format!("full_scan_k{}", k), |b| {
            let query = Query::new(reference(), k);
            b.iter(|| engine.top_k(black_box(&query)).unwrap())
        });

        group.bench_function(format!("radius_2km_k{}", k), |b| {
            let query = Query::new(reference(), k).with_max_distance(2_000.0);
            b.iter(|| engine.top_k(black_box(&query)).unwrap())
        });
    }

    group.bench_function("weighted_k10", |b| {
        let query = Query::new(reference(), 10)
            .with_weights(Weights::new(3.0, 1.0, 2.0))
            .with_max_distance(5_000.0);
        b.iter(|| engine.top_k(black_box(&query)).unwrap())
    });

    group.finish();
}

fn bench_range_query(c: &mut Criterion) {
    let engine = Engine::new(dataset(100_000)).unwrap();
    let rect = Rect::new(23.70, 37.96, 23.76, 38.01).unwrap();

    c.bench_function("range_query_city_center", |b| {
        b.iter(|| engine.index().query_within(black_box(&rect)).count())
    });
}

fn bench_incremental_insert(c: &mut Criterion) {
    let entities = dataset(10_000);

    c.bench_function("incremental_insert_10k", |b| {
        b.iter(|| {
            let mut index = SpatialIndex::new(&Config::default()).unwrap();
            for entity in &entities {
                index.insert(black_box(entity)).unwrap();
            }
            index.len()
        })
    });
}

criterion_group!(
    benches,
    bench_engine_build,
    bench_top_k,
    bench_range_query,
    bench_incremental_insert
);
criterion_main!(benches);
