use std::{hint::black_box, sync::Arc, time::Duration};

use criterion::{BatchSize, Criterion, criterion_group, criterion_main};

use visitgate::{
    AccessController, AccessControllerOptions, ExpectedConcurrency, Ipv4KeyEncoder, ManualClock,
    SweepInterval, VisitLimit, WindowDuration,
};

fn opts(window_s: u64, limit: usize, expected: usize) -> AccessControllerOptions {
    AccessControllerOptions {
        window: WindowDuration::try_from(Duration::from_secs(window_s)).unwrap(),
        sweep_interval: SweepInterval::try_from(Duration::from_secs(1)).unwrap(),
        limit: VisitLimit::try_from(limit).unwrap(),
        expected_concurrency: ExpectedConcurrency::try_from(expected).unwrap(),
    }
}

fn bench_hot_key(c: &mut Criterion) {
    let mut group = c.benchmark_group("access_controller/hot_key");
    group.sample_size(200);

    group.bench_function("try_admit/denied", |b| {
        let controller = AccessController::new(opts(3600, 100, 16)).unwrap();
        for _ in 0..100 {
            controller.try_admit(1);
        }

        b.iter(|| black_box(controller.try_admit(black_box(1))));
    });

    group.bench_function("try_admit_text/denied", |b| {
        let controller = AccessController::new(opts(3600, 100, 16)).unwrap();
        for _ in 0..100 {
            controller.try_admit_text("10.0.0.1");
        }

        b.iter(|| black_box(controller.try_admit_text(black_box("10.0.0.1"))));
    });

    group.finish();
}

fn bench_many_keys(c: &mut Criterion) {
    let mut group = c.benchmark_group("access_controller/many_keys");
    group.sample_size(100);

    for key_space in [1_000_u64, 100_000] {
        group.bench_function(format!("try_admit/keys={key_space}"), |b| {
            let controller = AccessController::new(opts(3600, 64, 1_000)).unwrap();
            let mut idx = 0_u64;

            b.iter(|| {
                idx = idx.wrapping_add(1);
                black_box(controller.try_admit(black_box(1 + idx % key_space)))
            });
        });
    }

    group.finish();
}

fn bench_sweep(c: &mut Criterion) {
    let mut group = c.benchmark_group("access_controller/sweep");
    group.sample_size(20);

    for keys in [1_000_u64, 50_000] {
        group.bench_function(format!("expire_and_compact/keys={keys}"), |b| {
            b.iter_batched(
                || {
                    let clock = Arc::new(ManualClock::new());
                    let controller = AccessController::with_parts(
                        opts(30, 4, 100),
                        clock.clone(),
                        Arc::new(Ipv4KeyEncoder),
                    )
                    .unwrap();
                    controller.stop_sweeper();
                    for key in 1..=keys {
                        controller.try_admit(key);
                    }
                    clock.advance(Duration::from_secs(31));
                    controller
                },
                |controller| black_box(controller.sweep()),
                BatchSize::LargeInput,
            );
        });
    }

    group.finish();
}

criterion_group!(benches, bench_hot_key, bench_many_keys, bench_sweep);
criterion_main!(benches);
