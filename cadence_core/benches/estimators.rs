use cadence_core::config::SensorPosition;
use cadence_core::estimators::{autocorrelation_bpm, estimate_all, frequency_sweep_bpm};
use cadence_core::filter::BandPassFilter;
use cadence_core::fusion::fuse;
use criterion::{BatchSize, Criterion, black_box, criterion_group, criterion_main};

const FS: u32 = 50;

// Vertical gait magnitude: gravity plus a step harmonic plus white noise.
fn synth_gait(n: usize, bpm: f64, noise_amp: f64, seed: u32) -> Vec<f64> {
    let mut state = seed.max(1);
    let mut next_unit = || {
        let mut x = state;
        x ^= x << 13;
        x ^= x >> 17;
        x ^= x << 5;
        state = x;
        f64::from(x) / (f64::from(u32::MAX) + 1.0)
    };
    let step_hz = bpm / 60.0;
    (0..n)
        .map(|i| {
            let t = i as f64 / f64::from(FS);
            let p = std::f64::consts::TAU * step_hz * t;
            let noise = (next_unit() * 2.0 - 1.0) * noise_amp;
            9.81 + 1.5 * (p.sin() + 0.25 * (2.0 * p).sin()) + noise
        })
        .collect()
}

fn group_from_env<'a>(
    c: &'a mut Criterion,
    name: &str,
) -> criterion::BenchmarkGroup<'a, criterion::measurement::WallTime> {
    let mut g = c.benchmark_group(name);
    //   BENCH_SAMPLE_SIZE=10 BENCH_MEAS_MS=50 cargo bench -p cadence_core --bench estimators
    if let Ok(ss) = std::env::var("BENCH_SAMPLE_SIZE") {
        if let Ok(n) = ss.parse::<usize>() {
            g.sample_size(n.max(10));
        }
    } else {
        g.sample_size(50);
    }
    if let Ok(ms) = std::env::var("BENCH_MEAS_MS")
        && let Ok(ms_u64) = ms.parse::<u64>()
    {
        g.measurement_time(std::time::Duration::from_millis(ms_u64));
    }
    g
}

pub fn bench_cycle(c: &mut Criterion) {
    let mut g = group_from_env(c, "analysis_cycle");
    let profile = SensorPosition::Waist.profile();
    let filter = BandPassFilter::new(FS, &profile);

    // One full buffer (10 s at 50 Hz) per cycle.
    for &bpm in &[70.0f64, 100.0, 140.0] {
        let trace = synth_gait(500, bpm, 0.05, 0xC0FFEE);
        g.bench_function(format!("cycle_{bpm}bpm"), |b| {
            b.iter_batched(
                || trace.clone(),
                |t| {
                    let filtered = filter.filter(black_box(&t));
                    let estimates =
                        estimate_all(&filtered, FS, profile.peak_threshold, (40.0, 160.0));
                    black_box(fuse(&estimates));
                },
                BatchSize::SmallInput,
            )
        });
    }
    g.finish();
}

pub fn bench_estimators(c: &mut Criterion) {
    let mut g = group_from_env(c, "estimators");
    let profile = SensorPosition::Waist.profile();
    let filtered = BandPassFilter::new(FS, &profile).filter(&synth_gait(500, 100.0, 0.05, 7));
    let fs = f64::from(FS);

    g.bench_function("autocorrelation", |b| {
        b.iter(|| black_box(autocorrelation_bpm(black_box(&filtered), fs)))
    });
    g.bench_function("frequency_sweep", |b| {
        b.iter(|| black_box(frequency_sweep_bpm(black_box(&filtered), fs)))
    });
    g.finish();
}

criterion_group!(benches, bench_cycle, bench_estimators);
criterion_main!(benches);
