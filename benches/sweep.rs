use anyhow::Result;
use criterion::{black_box, criterion_group, criterion_main, Criterion};
use ep_abc::{
    EpAbc, EpSettings, GuardPolicy, Moments, Predicate, ScalarGaussian, Simulator,
};
use rand::Rng;
use rand_distr::StandardNormal;

struct NoisyShift;

impl Simulator for NoisyShift {
    type Observation = f64;

    fn dim(&self) -> usize {
        1
    }

    fn simulate<R: Rng + ?Sized>(&self, theta: &[f64], rng: &mut R) -> Result<f64> {
        Ok(theta[0] + rng.sample::<f64, _>(StandardNormal))
    }
}

fn make_engine(
    num_simulations: usize,
) -> EpAbc<ScalarGaussian, NoisyShift, Predicate<impl Fn(&f64, &f64) -> bool + Send + Sync>> {
    let data: Vec<f64> = (0..20).map(|i| 0.1 * i as f64 - 1.0).collect();
    EpAbc::new(
        ScalarGaussian,
        NoisyShift,
        Predicate(|observed: &f64, simulated: &f64| (observed - simulated).abs() <= 0.5),
        data,
        Moments {
            mean: 0.0,
            cov: 1.0,
        },
        EpSettings {
            num_simulations,
            guard: GuardPolicy::MinFraction(0.001),
            seed: 42,
        },
    )
    .unwrap()
}

fn criterion_benchmark(c: &mut Criterion) {
    for num_simulations in [500, 5000] {
        c.bench_function(&format!("pass normal {}", num_simulations), |b| {
            b.iter(|| {
                let mut engine = make_engine(black_box(num_simulations));
                engine.run_pass().unwrap()
            })
        });
    }
}

criterion_group!(benches, criterion_benchmark);
criterion_main!(benches);
