use std::hint::black_box;

use criterion::{BatchSize, Criterion, criterion_group, criterion_main};
use int_ranges::RangeSet;
use rand::prelude::*;
use range_set_blaze::RangeSetBlaze;

const RANGE_MAX: i32 = 100_000;
const REMOVALS: usize = 1000;

fn generate_random_values(count: usize) -> Vec<i32> {
    let mut rng = StdRng::seed_from_u64(7);
    (0..count).map(|_| rng.random_range(0..RANGE_MAX)).collect()
}

fn removal_benchmark(c: &mut Criterion) {
    let holes = generate_random_values(REMOVALS);

    let mut base = RangeSet::new();
    base.add_range(0, RANGE_MAX).unwrap();
    let base_blaze = RangeSetBlaze::from_iter([0..=RANGE_MAX]);

    let mut group = c.benchmark_group("Removal Performance");

    // punching holes splits the single range over and over
    group.bench_function("RangeSet - Punch Holes", |b| {
        b.iter_batched(
            || base.clone(),
            |mut set| {
                for &v in black_box(&holes) {
                    set.remove(v).unwrap();
                }
                set
            },
            BatchSize::SmallInput,
        )
    });

    group.bench_function("RangeSetBlaze - Punch Holes", |b| {
        b.iter_batched(
            || base_blaze.clone(),
            |mut set| {
                for &v in black_box(&holes) {
                    set.remove(v);
                }
                set
            },
            BatchSize::SmallInput,
        )
    });

    let spans: Vec<(i32, i32)> = holes.iter().map(|&v| (v, v.saturating_add(25))).collect();
    group.bench_function("RangeSet - Remove Ranges", |b| {
        b.iter_batched(
            || base.clone(),
            |mut set| {
                for &(start, end) in black_box(&spans) {
                    set.remove_range(start, end).unwrap();
                }
                set
            },
            BatchSize::SmallInput,
        )
    });

    group.finish();
}

criterion_group!(benches, removal_benchmark);
criterion_main!(benches);
