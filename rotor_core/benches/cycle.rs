use criterion::{BatchSize, Criterion, black_box, criterion_group, criterion_main};
use rotor_core::config::{EncoderCfg, ScaleCfg, SetPointCfg};
use rotor_core::mocks::NullDriver;
use rotor_core::{Edge, Fixed, build_core};
use rotor_traits::ManualClock;

// One second of edges at a given pulse rate, followed by the clock tick.
fn second_of_edges(pps: usize) -> Vec<Edge> {
    let mut v = Vec::with_capacity(pps + 1);
    v.extend((0..pps).map(|i| Edge::Primary {
        secondary_high: i % 997 == 0,
    }));
    v.push(Edge::Clock);
    v
}

pub fn bench_cycle(c: &mut Criterion) {
    let mut g = c.benchmark_group("cycle");
    //   BENCH_SAMPLE_SIZE=10 BENCH_MEAS_MS=50 cargo bench -p rotor_core --bench cycle
    if let Ok(ss) = std::env::var("BENCH_SAMPLE_SIZE") {
        if let Ok(n) = ss.parse::<usize>() {
            g.sample_size(n.max(1));
        }
    } else {
        g.sample_size(50);
    }
    if let Ok(ms) = std::env::var("BENCH_MEAS_MS")
        && let Ok(ms_u64) = ms.parse::<u64>()
    {
        g.measurement_time(std::time::Duration::from_millis(ms_u64));
    }

    for &pps in &[400usize, 4_000, 40_000] {
        let edges = second_of_edges(pps);
        g.bench_function(format!("edges_per_tick_{pps}"), |b| {
            b.iter_batched(
                || {
                    build_core(
                        NullDriver,
                        Some(Box::new(ManualClock::new())),
                        EncoderCfg::default(),
                        ScaleCfg::default(),
                        SetPointCfg::default(),
                    )
                    .unwrap()
                },
                |mut core| {
                    for e in &edges {
                        black_box(core.handle(*e));
                    }
                },
                BatchSize::SmallInput,
            )
        });
    }

    g.bench_function("speed_estimate", |b| {
        let est = rotor_core::speed::SpeedEstimator::new(400, 6, 3, 2);
        let cycle = Fixed::new(1_000, 3);
        b.iter(|| black_box(est.estimate(black_box(137), black_box(cycle))));
    });
    g.finish();
}

criterion_group!(cycle, bench_cycle);
criterion_main!(cycle);
