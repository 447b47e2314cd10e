use criterion::{black_box, criterion_group, criterion_main, Criterion};

use lattice_types::Root;
use lattice_work::{to_multiplier, Difficulty, DifficultyV1, WorkGenerator, WorkThresholds};

fn bench_difficulty(c: &mut Criterion) {
    let root = Root::new([0x42; 32]);
    c.bench_function("difficulty_v1", |b| {
        b.iter(|| black_box(DifficultyV1.get_difficulty(black_box(&root), black_box(12345))))
    });
}

fn bench_multipliers(c: &mut Criterion) {
    let thresholds = WorkThresholds::publish_full();
    c.bench_function("normalized_multiplier", |b| {
        b.iter(|| {
            let raw = to_multiplier(black_box(0xfffffffc00000000), thresholds.epoch_1);
            black_box(thresholds.normalized_multiplier(raw, thresholds.epoch_1))
        })
    });
}

fn bench_generation(c: &mut Criterion) {
    let generator = WorkGenerator::new();
    let root = Root::new([0x42; 32]);
    c.bench_function("generate_dev_epoch_1", |b| {
        b.iter(|| {
            black_box(
                generator
                    .generate(&DifficultyV1, black_box(&root), 0xfe00000000000000)
                    .unwrap(),
            )
        })
    });
}

criterion_group!(benches, bench_difficulty, bench_multipliers, bench_generation);
criterion_main!(benches);
