use criterion::{black_box, criterion_group, criterion_main};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use phtree_rs::spatial::distance::DistanceEuclidean;
use phtree_rs::spatial::PhBox;
use phtree_rs::tree::PhTree;

const ENTRY_COUNT: usize = 100_000;
const COORDINATE_RANGE: i64 = 1 << 20;

fn random_points(count: usize, seed: u64) -> Vec<[i64; 3]> {
    let mut rng = StdRng::seed_from_u64(seed);
    (0..count)
        .map(|_| {
            [
                rng.gen_range(-COORDINATE_RANGE..COORDINATE_RANGE),
                rng.gen_range(-COORDINATE_RANGE..COORDINATE_RANGE),
                rng.gen_range(-COORDINATE_RANGE..COORDINATE_RANGE),
            ]
        })
        .collect()
}

fn populated_tree(points: &[[i64; 3]]) -> PhTree<u32, 3> {
    let mut tree: PhTree<u32, 3> = PhTree::new();
    for (index, point) in points.iter().enumerate() {
        tree.try_emplace(point, index as u32);
    }
    tree
}

fn criterion_benchmark(c: &mut criterion::Criterion) {
    let points = random_points(ENTRY_COUNT, 42);

    c.bench_function("insert 100k", |b| {
        b.iter(|| {
            let tree = populated_tree(black_box(&points));
            black_box(tree.len())
        })
    });

    let tree = populated_tree(&points);

    c.bench_function("point lookup", |b| {
        let mut index = 0;
        b.iter(|| {
            index = (index + 1) % points.len();
            black_box(tree.get(&points[index]))
        })
    });

    c.bench_function("window query 1%", |b| {
        let mut rng = StdRng::seed_from_u64(7);
        let extent = COORDINATE_RANGE / 50;
        b.iter(|| {
            let corner = [
                rng.gen_range(-COORDINATE_RANGE..COORDINATE_RANGE - extent),
                rng.gen_range(-COORDINATE_RANGE..COORDINATE_RANGE - extent),
                rng.gen_range(-COORDINATE_RANGE..COORDINATE_RANGE - extent),
            ];
            let window = PhBox::new(
                corner,
                [corner[0] + extent, corner[1] + extent, corner[2] + extent],
            );
            black_box(tree.query(&window).count())
        })
    });

    c.bench_function("knn 10", |b| {
        let mut rng = StdRng::seed_from_u64(13);
        b.iter(|| {
            let center = [
                rng.gen_range(-COORDINATE_RANGE..COORDINATE_RANGE),
                rng.gen_range(-COORDINATE_RANGE..COORDINATE_RANGE),
                rng.gen_range(-COORDINATE_RANGE..COORDINATE_RANGE),
            ];
            black_box(tree.knn(10, &center, DistanceEuclidean).count())
        })
    });

    c.bench_function("erase and reinsert", |b| {
        let mut tree = populated_tree(&points);
        let mut index = 0;
        b.iter(|| {
            index = (index + 1) % points.len();
            tree.erase(&points[index]);
            tree.try_emplace(&points[index], index as u32);
        })
    });
}

criterion_group!(benches, criterion_benchmark);
criterion_main!(benches);
