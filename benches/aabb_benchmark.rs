// benches/aabb_benchmark.rs
use std::f32::consts::PI;

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use glam::{Mat4, Quat, Vec3};
use rand::Rng;

use sandbox3d::engine_lib::collision::Aabb;

fn random_box(rng: &mut impl Rng) -> Aabb {
    let center = Vec3::new(rng.gen_range(-10.0..10.0), rng.gen_range(-2.0..2.0), rng.gen_range(-10.0..10.0));
    let half = Vec3::new(rng.gen_range(0.1..2.0), rng.gen_range(0.1..2.0), rng.gen_range(0.1..2.0));
    Aabb::new(center - half, center + half)
}

fn random_transform(rng: &mut impl Rng) -> Mat4 {
    Mat4::from_scale_rotation_translation(
        Vec3::splat(rng.gen_range(0.5..3.0)),
        Quat::from_euler(
            glam::EulerRot::XYZ,
            rng.gen_range(-PI..PI),
            rng.gen_range(-PI..PI),
            rng.gen_range(-PI..PI),
        ),
        Vec3::new(rng.gen_range(-5.0..5.0), rng.gen_range(-5.0..5.0), rng.gen_range(-5.0..5.0)),
    )
}

fn aabb_benchmark_fn(c: &mut Criterion) {
    let mut rng = rand::thread_rng();

    const NUM_BOXES: usize = 100;
    let boxes: Vec<Aabb> = (0..NUM_BOXES).map(|_| random_box(&mut rng)).collect();
    let transforms: Vec<Mat4> = (0..NUM_BOXES).map(|_| random_transform(&mut rng)).collect();
    let player = random_box(&mut rng);

    let mut group = c.benchmark_group("AabbOperations");

    group.bench_function("transform_100_boxes", |b| {
        b.iter(|| {
            boxes
                .iter()
                .zip(&transforms)
                .map(|(aabb, m)| black_box(aabb).transformed(black_box(m)))
                .fold(Vec3::ZERO, |acc, t| acc + t.center())
        })
    });

    group.bench_function("player_vs_100_boxes", |b| {
        b.iter(|| {
            boxes
                .iter()
                .filter(|aabb| Aabb::check_collision(black_box(&player), black_box(aabb)))
                .count()
        })
    });
    group.finish();
}

criterion_group!(benches, aabb_benchmark_fn);
criterion_main!(benches);
