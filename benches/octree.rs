/// Benchmark suite for octree construction and ray queries
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use glam::Vec3;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use voxel_raster::*;

fn random_points(n: usize, seed: u64) -> Vec<Vec3> {
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    (0..n)
        .map(|_| Vec3::new(rng.gen(), rng.gen(), rng.gen()))
        .collect()
}

/// Points on the surface of the unit sphere centered in the box.
fn sphere_tree(max_depth: u32) -> Octree {
    let mut tree = Octree::new(OctreeConfig { max_depth });
    tree.set_aabb(Vec3::ZERO, Vec3::ONE).unwrap();
    for p in random_points(50_000, 1) {
        let dir = (p - Vec3::splat(0.5)).normalize_or_zero();
        tree.add_point(Vec3::splat(0.5) + dir * 0.4).unwrap();
    }
    tree
}

fn camera_rays(n: usize) -> Vec<Ray> {
    let mut rng = ChaCha8Rng::seed_from_u64(2);
    let origin = Vec3::new(0.5, 0.5, 3.0);
    (0..n)
        .map(|_| {
            let target = Vec3::new(rng.gen(), rng.gen(), 0.5);
            Ray::new(origin, target - origin)
        })
        .collect()
}

fn bench_add_point(c: &mut Criterion) {
    let mut group = c.benchmark_group("octree_add_point");
    let points = random_points(10_000, 3);
    for depth in [5u32, 7, 9] {
        group.bench_with_input(BenchmarkId::from_parameter(depth), &depth, |b, &depth| {
            b.iter(|| {
                let mut tree = Octree::new(OctreeConfig { max_depth: depth });
                tree.set_aabb(Vec3::ZERO, Vec3::ONE).unwrap();
                for &p in &points {
                    tree.add_point(black_box(p)).unwrap();
                }
                black_box(tree.node_count())
            });
        });
    }
    group.finish();
}

fn bench_closest_leaf(c: &mut Criterion) {
    let tree = sphere_tree(7);
    let rays = camera_rays(1024);

    c.bench_function("octree_closest_leaf_1024", |b| {
        b.iter(|| {
            let mut hits = 0;
            for ray in &rays {
                if tree.closest_leaf(black_box(ray.origin), black_box(ray.direction)).is_some() {
                    hits += 1;
                }
            }
            black_box(hits)
        });
    });

    c.bench_function("octree_closest_leaves_1024", |b| {
        b.iter(|| black_box(tree.closest_leaves(black_box(&rays))));
    });
}

fn bench_is_inside(c: &mut Criterion) {
    let tree = sphere_tree(7);
    let points = random_points(4096, 4);

    c.bench_function("octree_is_inside_4096", |b| {
        b.iter(|| points.iter().filter(|&&p| tree.is_inside(black_box(p))).count());
    });
}

criterion_group!(benches, bench_add_point, bench_closest_leaf, bench_is_inside);
criterion_main!(benches);
