//! Criterion benchmarks for the intersection welder's online insertion path.
//!
//! Run with: cargo bench --bench welder_bench

use criterion::{black_box, criterion_group, criterion_main, Criterion};

use urban_fabric::geometry::Vec2;
use urban_fabric::road::class::{RoadClass, RoadMaterial};
use urban_fabric::rng::Mulberry32;
use urban_fabric::welder::IntersectionWelder;

fn random_segment(rng: &mut Mulberry32, bounds: f64) -> [Vec2; 2] {
    let p0 = Vec2::new(rng.range_f64(0.0, bounds), rng.range_f64(0.0, bounds));
    let angle = rng.range_f64(0.0, std::f64::consts::TAU);
    let len = rng.range_f64(40.0, 120.0);
    let p1 = p0 + Vec2::new(angle.cos(), angle.sin()) * len;
    [p0, p1]
}

fn bench_insert_into_empty_graph(c: &mut Criterion) {
    c.bench_function("welder_insert_single_road_empty_graph", |b| {
        b.iter(|| {
            let mut welder = IntersectionWelder::new();
            black_box(welder.insert_road(
                &[Vec2::new(0.0, 0.0), Vec2::new(100.0, 0.0)],
                RoadClass::Street,
                RoadMaterial::Asphalt,
            ))
        });
    });
}

fn bench_insert_against_dense_network(c: &mut Criterion) {
    let mut group = c.benchmark_group("welder_insert_into_dense_network");
    group.sample_size(50);

    // Pre-seed a welder with a moderately dense random network, then measure
    // the cost of welding one more road into it — this is the online
    // per-crossing-check path the layout generator leans on heavily.
    let mut seed_rng = Mulberry32::new(12345);
    let mut seeded = IntersectionWelder::new();
    for _ in 0..200 {
        let [p0, p1] = random_segment(&mut seed_rng, 2000.0);
        let _ = seeded.insert_road(&[p0, p1], RoadClass::Local, RoadMaterial::Asphalt);
    }

    group.bench_function("200_existing_roads", |b| {
        b.iter_batched(
            || {
                let mut rng = Mulberry32::new(99);
                random_segment(&mut rng, 2000.0)
            },
            |[p0, p1]| {
                let mut welder = seeded_clone(&seeded);
                black_box(welder.insert_road(&[p0, p1], RoadClass::Local, RoadMaterial::Asphalt))
            },
            criterion::BatchSize::SmallInput,
        );
    });

    group.finish();
}

fn seeded_clone(welder: &IntersectionWelder) -> IntersectionWelder {
    IntersectionWelder::from_graph(welder.graph().clone())
}

criterion_group!(benches, bench_insert_into_empty_graph, bench_insert_against_dense_network);
criterion_main!(benches);
