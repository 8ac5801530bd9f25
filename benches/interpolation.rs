use criterion::{black_box, criterion_group, criterion_main, BatchSize, Criterion};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use ephemeris_compute::jplephem::names::indices;
use ephemeris_compute::jplephem::synthetic::{self, SyntheticConfig};
use ephemeris_compute::jplephem::{chebyshev, EphemerisFile};
use ephemeris_compute::orbits::solve_kepler;
use ephemeris_compute::{CollectingSink, EphemerisDriver, EphemerisRequest, Settings};

fn synthetic_file() -> EphemerisFile {
    let bytes = synthetic::to_bytes(&SyntheticConfig::default()).unwrap();
    EphemerisFile::from_bytes(bytes).unwrap()
}

/// Random Julian dates inside the file's coverage
fn sample_times(file: &EphemerisFile, rng: &mut StdRng, n: usize) -> Vec<f64> {
    (0..n)
        .map(|_| rng.gen_range(file.jd_start()..file.jd_end()))
        .collect()
}

fn bench_lookup_and_evaluate(c: &mut Criterion) {
    let file = synthetic_file();
    let mut rng = StdRng::seed_from_u64(0xDE430);
    let times = sample_times(&file, &mut rng, 10_000);

    c.bench_function("chebyshev/position_mars", |b| {
        b.iter(|| {
            for &jd in &times {
                black_box(file.position(indices::MARS, black_box(jd)).unwrap());
            }
        })
    });

    c.bench_function("chebyshev/state_moon", |b| {
        b.iter(|| {
            for &jd in &times {
                black_box(file.state(indices::MOON, black_box(jd)).unwrap());
            }
        })
    });

    // Block selection excluded
    let block = file.lookup(indices::JUPITER, times[0]).unwrap();
    c.bench_function("chebyshev/evaluate_block", |b| {
        b.iter(|| black_box(chebyshev::evaluate(&block, black_box(times[0]))))
    });
}

fn bench_solve_kepler(c: &mut Criterion) {
    let mut rng = StdRng::seed_from_u64(0xBADF00D);

    c.bench_function("solve_kepler/e<=0.25", |b| {
        b.iter_batched(
            || {
                (0..10_000)
                    .map(|_| {
                        let m = rng.gen_range(-std::f64::consts::PI..std::f64::consts::PI);
                        let e = rng.gen_range(0.0..=0.25);
                        (m, e)
                    })
                    .collect::<Vec<_>>()
            },
            |cases| {
                for (m, e) in cases {
                    black_box(solve_kepler(black_box(m), black_box(e)).unwrap());
                }
            },
            BatchSize::LargeInput,
        )
    });
}

fn bench_driver_step(c: &mut Criterion) {
    let settings = Settings {
        jd_min: 2_451_545.0,
        jd_max: 2_451_645.0,
        jd_step: 1.0,
        use_orbital_elements: 1,
        output_format: 3,
        objects: "sun mercury venus mars jupiter saturn uranus neptune pluto".to_string(),
        ..Default::default()
    };
    let request = EphemerisRequest::from_settings(settings).unwrap();

    c.bench_function("driver/orbital_100_steps_9_bodies", |b| {
        b.iter(|| {
            let mut driver = EphemerisDriver::new(request.clone()).unwrap();
            let mut sink = CollectingSink::default();
            black_box(driver.run(&mut sink).unwrap())
        })
    });
}

criterion_group!(
    benches,
    bench_lookup_and_evaluate,
    bench_solve_kepler,
    bench_driver_step
);
criterion_main!(benches);
